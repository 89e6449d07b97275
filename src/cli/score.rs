//! CLI entry-point for the risk-per-trip pipeline.

use anyhow::Result;
use chrono::Utc;
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use super::{ConfigArgs, InputArgs};
use crate::{
    config::Settings,
    data,
    error::RiskError,
    risk::{self, aggregate::CellEnumeration, output, Dataset},
};

/// Args for the `score` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub config: ConfigArgs,
    /// Emit every station for every observed bucket, not only observed cells.
    #[arg(long)]
    pub dense: bool,
    /// Write cell tables as Parquet instead of CSV.
    #[arg(long)]
    pub parquet: bool,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let config = args.config.resolve()?;

    let stations = data::stations::load_stations(&args.input.stations_path(&settings))?;
    if stations.is_empty() {
        return Err(RiskError::EmptyDataset("stations").into());
    }
    let trip_files = data::trips::discover_trip_files(&args.input.trips_path(&settings))?;
    let trips = data::trips::load_trips(&trip_files, &stations)?;
    let collisions = data::collisions::load_collisions(&args.input.collisions_path(&settings))?;
    info!(
        stations = stations.len(),
        trips = trips.len(),
        collisions = collisions.len(),
        "inputs loaded"
    );

    let dataset = Dataset {
        stations: &stations,
        trips: &trips,
        collisions: &collisions,
    };
    let enumeration = if args.dense {
        CellEnumeration::Dense
    } else {
        CellEnumeration::Sparse
    };
    let scored = risk::score_with(
        dataset,
        &config,
        &config.time_bucket_granularity,
        args.input.index,
        enumeration,
    )?;

    let ext = if args.parquet { "parquet" } else { "csv" };
    output::persist_cells(
        scored.cells.cells(),
        &settings.join_output(output::CELLS_FILE).with_extension(ext),
    )?;
    output::persist_cells(
        scored.stations.cells(),
        &settings.join_output(output::STATIONS_FILE).with_extension(ext),
    )?;
    output::persist_assignments(
        &scored.assignments,
        &settings.join_output(output::ASSIGNMENTS_FILE),
    )?;

    let summary = output::RunSummary {
        generated_at: Utc::now().to_rfc3339(),
        config: config.clone(),
        stations: stations.len(),
        trips: trips.len(),
        collisions: collisions.len(),
        assignment: scored.report,
        cell_prior: *scored.cells.prior(),
        cell_tiers: scored.cells.cuts().clone(),
        station_prior: *scored.stations.prior(),
        station_tiers: scored.stations.cuts().clone(),
    };
    output::persist_summary(&summary, &settings.join_output(output::SUMMARY_FILE))?;
    Ok(())
}
