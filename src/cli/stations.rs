//! CLI entry-point for deriving the station table from trips.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{config::Settings, data};

/// Args for the `stations` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Trip file or `YYYY/MM` partition root; defaults to `<DATA_DIR>/trips`.
    #[arg(long)]
    pub trips: Option<PathBuf>,
    /// Output CSV; defaults to `<DATA_DIR>/clean/stations.csv`.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let root = args.trips.unwrap_or_else(|| settings.join_data("trips"));
    let out = args
        .out
        .unwrap_or_else(|| settings.join_data("clean/stations.csv"));

    let files = data::trips::discover_trip_files(&root)?;
    if files.is_empty() {
        bail!("no trip files found under {}", root.display());
    }
    let stations = data::stations::derive_stations(&files)?;
    data::stations::validate_stations(&stations)?;
    data::stations::write_stations(&stations, &out)?;
    info!(stations = stations.len(), path = %out.display(), "station table ready");
    Ok(())
}
