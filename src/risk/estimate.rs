//! Raw hazard-per-trip ratio.

use super::RiskCell;

/// `hazard / (exposure + epsilon)`; finite and non-negative for `epsilon > 0`.
pub fn raw_risk(hazard: f64, exposure: u64, epsilon: f64) -> f64 {
    hazard / (exposure as f64 + epsilon)
}

pub fn apply_raw_risk(cells: &mut [RiskCell], epsilon: f64) {
    for cell in cells {
        cell.raw_risk = raw_risk(cell.hazard, cell.exposure, epsilon);
    }
}
