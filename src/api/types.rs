//! Shared DTOs for JSON responses.

use serde::Serialize;

use crate::risk::RiskCell;

#[derive(Debug, Clone, Serialize)]
pub struct CellDto {
    pub station_id: String,
    pub time_bucket: String,
    pub hazard: f64,
    pub exposure: u64,
    pub raw_risk: f64,
    pub smoothed_risk: f64,
    pub tier: usize,
    pub tier_label: String,
    /// False when the cell was absent and answered with the global mean.
    pub observed: bool,
}

impl From<RiskCell> for CellDto {
    fn from(value: RiskCell) -> Self {
        CellDto {
            station_id: value.station_id,
            time_bucket: value.time_bucket,
            hazard: value.hazard,
            exposure: value.exposure,
            raw_risk: value.raw_risk,
            smoothed_risk: value.smoothed_risk,
            tier: value.tier,
            tier_label: value.tier_label,
            observed: true,
        }
    }
}
