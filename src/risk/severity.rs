//! Collision severity scoring.

use crate::{config::SeverityWeights, data::Collision};

/// Weighted sum of injury and fatality counts; `>= 0` for admissible weights.
pub fn severity(collision: &Collision, weights: &SeverityWeights) -> f64 {
    weights.cyclist_injured * f64::from(collision.cyclists_injured)
        + weights.cyclist_killed * f64::from(collision.cyclists_killed)
        + weights.other_injured * f64::from(collision.others_injured)
        + weights.other_killed * f64::from(collision.others_killed)
}
