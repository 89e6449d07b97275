//! CLI entry-point for collision-to-station assignment.

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use super::{ConfigArgs, InputArgs};
use crate::{
    config::Settings,
    data,
    error::RiskError,
    risk::{self, output},
    spatial,
};

/// Args for the `assign` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub config: ConfigArgs,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let config = args.config.resolve()?;
    let stations = data::stations::load_stations(&args.input.stations_path(&settings))?;
    if stations.is_empty() {
        return Err(RiskError::EmptyDataset("stations").into());
    }
    let collisions = data::collisions::load_collisions(&args.input.collisions_path(&settings))?;
    if collisions.is_empty() {
        return Err(RiskError::EmptyDataset("collisions").into());
    }

    let index = spatial::build_index(&stations, args.input.index);
    let (assignments, report) = risk::assign_collisions(&collisions, index.as_ref(), &config);

    let out = settings.join_output(output::ASSIGNMENTS_FILE);
    output::persist_assignments(&assignments, &out)?;
    info!(
        assigned = report.assigned,
        unassigned = report.unassigned,
        "assignment audit complete"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
