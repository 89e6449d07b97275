//! Quantile-based ordinal tiers.

use serde::{Deserialize, Serialize};

use super::RiskCell;

/// Cut points computed from one tiering pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierCuts {
    pub quantiles: Vec<f64>,
    pub cut_points: Vec<f64>,
    pub labels: Vec<String>,
}

impl TierCuts {
    /// Cut points are the requested quantiles of `values`.
    pub fn from_values(values: &[f64], quantiles: &[f64], labels: &[String]) -> Self {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        sorted.sort_by(f64::total_cmp);
        Self {
            quantiles: quantiles.to_vec(),
            cut_points: quantiles.iter().map(|q| quantile(&sorted, *q)).collect(),
            labels: labels.to_vec(),
        }
    }

    /// Number of cut points at or below `value`: a value equal to a cut point
    /// lands in the higher tier.
    ///
    /// When every scored value is equal all cut points coincide, so every
    /// cell lands in the top tier.
    pub fn tier(&self, value: f64) -> usize {
        self.cut_points.iter().filter(|cut| value >= **cut).count()
    }

    pub fn label(&self, tier: usize) -> &str {
        self.labels.get(tier).map(String::as_str).unwrap_or("")
    }
}

/// Linearly interpolated quantile of ascending `sorted`.
///
/// Positions follow `q·(n − 1)`; empty input yields `+∞` so nothing is tiered
/// above the first bucket.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::INFINITY,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = pos.floor() as usize;
            let upper = pos.ceil() as usize;
            let frac = pos - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * frac
        }
    }
}

/// Derive cut points from the smoothed risks of `cells` and tier them.
pub fn assign_tiers(cells: &mut [RiskCell], quantiles: &[f64], labels: &[String]) -> TierCuts {
    let values: Vec<f64> = cells.iter().map(|c| c.smoothed_risk).collect();
    let cuts = TierCuts::from_values(&values, quantiles, labels);
    for cell in cells.iter_mut() {
        cell.tier = cuts.tier(cell.smoothed_risk);
        cell.tier_label = cuts.label(cell.tier).to_string();
    }
    cuts
}
