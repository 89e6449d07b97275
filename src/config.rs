//! Runtime configuration for citibike-risk.

use std::{
    env,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    error::{RiskError, RiskResult},
    risk::bucket::Granularity,
};

/// Filesystem layout resolved from `.env` and defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Root folder for input tables.
    pub data_dir: PathBuf,
    /// Root folder for scored outputs.
    pub outputs_dir: PathBuf,
}

impl Settings {
    /// Load configuration from environment with reasonable defaults.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        let outputs_dir = env::var("OUTPUTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./outputs"));

        std::fs::create_dir_all(&data_dir).context("creating data dir")?;
        std::fs::create_dir_all(&outputs_dir).context("creating outputs dir")?;

        Ok(Self {
            data_dir,
            outputs_dir,
        })
    }

    pub fn join_data<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.data_dir.join(path)
    }

    pub fn join_output<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.outputs_dir.join(path)
    }
}

/// Linear weights applied to a collision's injury and fatality counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityWeights {
    pub cyclist_injured: f64,
    pub cyclist_killed: f64,
    pub other_injured: f64,
    pub other_killed: f64,
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self::new(1.0, 5.0, 1.0, 5.0)
    }
}

impl SeverityWeights {
    pub const fn new(
        cyclist_injured: f64,
        cyclist_killed: f64,
        other_injured: f64,
        other_killed: f64,
    ) -> Self {
        Self {
            cyclist_injured,
            cyclist_killed,
            other_injured,
            other_killed,
        }
    }

    pub fn as_array(&self) -> [f64; 4] {
        [
            self.cyclist_injured,
            self.cyclist_killed,
            self.other_injured,
            self.other_killed,
        ]
    }
}

impl FromStr for SeverityWeights {
    type Err = String;

    /// Parse `w1,w2,w3,w4`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = parse_f64_list(s)?;
        match values.as_slice() {
            [w1, w2, w3, w4] => Ok(Self::new(*w1, *w2, *w3, *w4)),
            _ => Err(format!(
                "expected four comma separated weights, got {}",
                values.len()
            )),
        }
    }
}

/// Every tunable of the scoring pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Maximum collision-to-station distance in metres (inclusive).
    pub distance_threshold_m: f64,
    pub severity_weights: SeverityWeights,
    /// Added to exposure in every ratio so zero-exposure cells stay finite.
    pub epsilon: f64,
    /// Exposure at which a cell's own ratio and the global mean weigh equally.
    pub eb_pseudo_count_k: f64,
    pub time_bucket_granularity: Granularity,
    /// Quantile levels whose values become the tier cut points.
    pub tier_quantiles: Vec<f64>,
    /// One label per tier, `tier_quantiles.len() + 1` in total.
    pub tier_labels: Vec<String>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            distance_threshold_m: 300.0,
            severity_weights: SeverityWeights::default(),
            epsilon: 1.0,
            eb_pseudo_count_k: 50.0,
            time_bucket_granularity: Granularity::Date,
            tier_quantiles: vec![0.25, 0.5, 0.75],
            tier_labels: ["low", "medium", "high", "very_high"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl RiskConfig {
    /// Build from `RISK_*` environment variables, falling back to defaults.
    pub fn from_env() -> RiskResult<Self> {
        let mut config = Self::default();
        if let Some(v) = env_parse::<f64>("RISK_DISTANCE_THRESHOLD_M")? {
            config.distance_threshold_m = v;
        }
        if let Some(v) = env_parse::<SeverityWeights>("RISK_SEVERITY_WEIGHTS")? {
            config.severity_weights = v;
        }
        if let Some(v) = env_parse::<f64>("RISK_EPSILON")? {
            config.epsilon = v;
        }
        if let Some(v) = env_parse::<f64>("RISK_EB_K")? {
            config.eb_pseudo_count_k = v;
        }
        if let Some(v) = env_parse::<Granularity>("RISK_TIME_BUCKET")? {
            config.time_bucket_granularity = v;
        }
        if let Ok(raw) = env::var("RISK_TIER_QUANTILES") {
            config.tier_quantiles = parse_f64_list(&raw).map_err(|e| {
                RiskError::Configuration(format!("RISK_TIER_QUANTILES: {e}"))
            })?;
        }
        if let Ok(raw) = env::var("RISK_TIER_LABELS") {
            config.tier_labels = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        Ok(config)
    }

    /// Reject out-of-range tunables before any data is touched.
    pub fn validate(&self) -> RiskResult<()> {
        if !(self.distance_threshold_m.is_finite() && self.distance_threshold_m > 0.0) {
            return Err(RiskError::Configuration(format!(
                "distance threshold must be > 0 m, got {}",
                self.distance_threshold_m
            )));
        }
        for (name, weight) in ["w1", "w2", "w3", "w4"]
            .iter()
            .zip(self.severity_weights.as_array())
        {
            if !(weight.is_finite() && weight >= 0.0) {
                return Err(RiskError::Configuration(format!(
                    "severity weight {name} must be >= 0, got {weight}"
                )));
            }
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(RiskError::Configuration(format!(
                "epsilon must be > 0, got {}",
                self.epsilon
            )));
        }
        if !(self.eb_pseudo_count_k.is_finite() && self.eb_pseudo_count_k > 0.0) {
            return Err(RiskError::Configuration(format!(
                "EB pseudo-count k must be > 0, got {}",
                self.eb_pseudo_count_k
            )));
        }
        let mut previous = 0.0;
        for &level in &self.tier_quantiles {
            if !(level > previous && level < 1.0) {
                return Err(RiskError::Configuration(format!(
                    "tier quantiles must be strictly increasing inside (0, 1), got {:?}",
                    self.tier_quantiles
                )));
            }
            previous = level;
        }
        if self.tier_labels.len() != self.tier_quantiles.len() + 1 {
            return Err(RiskError::Configuration(format!(
                "{} tier quantiles need {} labels, got {}",
                self.tier_quantiles.len(),
                self.tier_quantiles.len() + 1,
                self.tier_labels.len()
            )));
        }
        Ok(())
    }
}

fn env_parse<T>(key: &str) -> RiskResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| RiskError::Configuration(format!("{key}={raw:?}: {e}"))),
        Err(_) => Ok(None),
    }
}

fn parse_f64_list(raw: &str) -> Result<Vec<f64>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().map_err(|e| format!("{s:?}: {e}")))
        .collect()
}
