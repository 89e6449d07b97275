//! Station×time collision risk per bike-share trip.
//!
//! Collisions are snapped to their nearest dock, weighted by severity, and
//! divided by trip exposure per station and time bucket; the noisy ratio is
//! then shrunk toward the network-wide rate with Empirical Bayes and binned
//! into quantile tiers.

pub mod api;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod risk;
pub mod spatial;

pub use config::{RiskConfig, SeverityWeights, Settings};
pub use error::{RiskError, RiskResult};
