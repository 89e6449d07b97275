//! Command-line interface wiring for citibike-risk.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::{
    config::{RiskConfig, SeverityWeights, Settings},
    risk::bucket::Granularity,
    spatial::IndexKind,
};

pub mod assign;
pub mod score;
pub mod serve;
pub mod stations;

/// Top-level CLI definition.
#[derive(Debug, Parser)]
#[command(author, version, about = "Bike-share collision risk per trip", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Parse CLI arguments from the environment.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Dispatch the selected sub-command.
    pub async fn dispatch(self, settings: Settings) -> Result<()> {
        match self.command {
            Commands::Stations(args) => stations::run(args, settings).await,
            Commands::Assign(args) => assign::run(args, settings).await,
            Commands::Score(args) => score::run(args, settings).await,
            Commands::Serve(args) => serve::run(args, settings).await,
        }
    }
}

/// Supported sub-commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Derive the station table from trip records.
    Stations(stations::Args),
    /// Assign collisions to their nearest station and report coverage.
    Assign(assign::Args),
    /// Run the full risk-per-trip pipeline.
    Score(score::Args),
    /// Serve the scored tables as JSON.
    Serve(serve::Args),
}

/// Input table locations shared by `assign` and `score`.
#[derive(Debug, Clone, ClapArgs)]
pub struct InputArgs {
    /// Station CSV; defaults to `<DATA_DIR>/clean/stations.csv`.
    #[arg(long)]
    pub stations: Option<PathBuf>,
    /// Trip file or `YYYY/MM` partition root; defaults to `<DATA_DIR>/trips`.
    #[arg(long)]
    pub trips: Option<PathBuf>,
    /// Collision CSV; defaults to `<DATA_DIR>/clean/collisions.csv`.
    #[arg(long)]
    pub collisions: Option<PathBuf>,
    /// Spatial index backend.
    #[arg(long, value_enum, default_value_t = IndexKind::Rtree)]
    pub index: IndexKind,
}

impl InputArgs {
    pub fn stations_path(&self, settings: &Settings) -> PathBuf {
        self.stations
            .clone()
            .unwrap_or_else(|| settings.join_data("clean/stations.csv"))
    }

    pub fn trips_path(&self, settings: &Settings) -> PathBuf {
        self.trips
            .clone()
            .unwrap_or_else(|| settings.join_data("trips"))
    }

    pub fn collisions_path(&self, settings: &Settings) -> PathBuf {
        self.collisions
            .clone()
            .unwrap_or_else(|| settings.join_data("clean/collisions.csv"))
    }
}

/// Per-run overrides of the `RISK_*` environment configuration.
#[derive(Debug, Clone, Default, ClapArgs)]
pub struct ConfigArgs {
    /// Maximum collision-to-station distance in metres.
    #[arg(long)]
    pub distance_threshold_m: Option<f64>,
    /// Severity weights `w1,w2,w3,w4` (cyclists injured, cyclists killed,
    /// others injured, others killed).
    #[arg(long)]
    pub severity_weights: Option<SeverityWeights>,
    /// Exposure guard added to every ratio denominator.
    #[arg(long)]
    pub epsilon: Option<f64>,
    /// Empirical Bayes pseudo-count k.
    #[arg(long)]
    pub eb_k: Option<f64>,
    /// Time bucket granularity.
    #[arg(long, value_enum)]
    pub time_bucket: Option<Granularity>,
    /// Tier quantile levels, e.g. `0.25,0.5,0.75`.
    #[arg(long, value_delimiter = ',')]
    pub tier_quantiles: Option<Vec<f64>>,
    /// Tier labels, one more than the quantile levels.
    #[arg(long, value_delimiter = ',')]
    pub tier_labels: Option<Vec<String>>,
}

impl ConfigArgs {
    /// Environment configuration with these overrides applied, validated.
    pub fn resolve(&self) -> Result<RiskConfig> {
        let mut config = RiskConfig::from_env()?;
        if let Some(v) = self.distance_threshold_m {
            config.distance_threshold_m = v;
        }
        if let Some(v) = self.severity_weights {
            config.severity_weights = v;
        }
        if let Some(v) = self.epsilon {
            config.epsilon = v;
        }
        if let Some(v) = self.eb_k {
            config.eb_pseudo_count_k = v;
        }
        if let Some(v) = self.time_bucket {
            config.time_bucket_granularity = v;
        }
        if let Some(v) = &self.tier_quantiles {
            config.tier_quantiles = v.clone();
        }
        if let Some(v) = &self.tier_labels {
            config.tier_labels = v.clone();
        }
        config.validate()?;
        Ok(config)
    }
}
