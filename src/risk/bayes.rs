//! Empirical Bayes shrinkage of per-cell risk toward the pooled mean.
//!
//! The prior mean is pooled hazard over pooled exposure, so every trip carries
//! the same weight. A cell keeps `exposure / (exposure + k)` of its own ratio
//! and takes the rest from the prior.

use serde::{Deserialize, Serialize};

use super::RiskCell;
use crate::error::{RiskError, RiskResult};

/// Pooled statistics of one smoothing pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalPrior {
    pub mean: f64,
    pub total_hazard: f64,
    pub total_exposure: u64,
    pub cells: usize,
}

/// Pool hazard and exposure over every cell.
///
/// Fails when nothing was exposed; the ratio would only reflect `epsilon`.
pub fn estimate_prior(cells: &[RiskCell], epsilon: f64) -> RiskResult<GlobalPrior> {
    let total_hazard: f64 = cells.iter().map(|c| c.hazard).sum();
    let total_exposure: u64 = cells.iter().map(|c| c.exposure).sum();
    if total_exposure == 0 {
        return Err(RiskError::UndefinedGlobalMean { cells: cells.len() });
    }
    Ok(GlobalPrior {
        mean: total_hazard / (total_exposure as f64 + epsilon),
        total_hazard,
        total_exposure,
        cells: cells.len(),
    })
}

/// λ = exposure / (exposure + k), in `[0, 1)`.
pub fn shrinkage_weight(exposure: u64, k: f64) -> f64 {
    let exposure = exposure as f64;
    exposure / (exposure + k)
}

/// λ·raw + (1 − λ)·μ.
pub fn shrink(raw_risk: f64, exposure: u64, prior_mean: f64, k: f64) -> f64 {
    let weight = shrinkage_weight(exposure, k);
    weight * raw_risk + (1.0 - weight) * prior_mean
}

/// Two passes: the prior over all cells, then per-cell shrinkage.
///
/// Expects `raw_risk` to be filled in already.
pub fn smooth(cells: &mut [RiskCell], epsilon: f64, k: f64) -> RiskResult<GlobalPrior> {
    let prior = estimate_prior(cells, epsilon)?;
    for cell in cells.iter_mut() {
        cell.smoothed_risk = shrink(cell.raw_risk, cell.exposure, prior.mean, k);
    }
    Ok(prior)
}
