//! Persisting and reloading scored tables.

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use polars::prelude::{
    CsvWriter, DataFrame, DataType, NamedFrom, ParquetReader, ParquetWriter, SerReader, SerWriter,
    Series,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{bayes::GlobalPrior, tier::TierCuts, AssignedCollision, AssignmentReport, RiskCell};
use crate::config::RiskConfig;

pub const CELLS_FILE: &str = "risk_cells.csv";
pub const STATIONS_FILE: &str = "station_risk.csv";
pub const ASSIGNMENTS_FILE: &str = "collision_assignments.csv";
pub const SUMMARY_FILE: &str = "run_summary.json";

/// Run metadata written next to the tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub generated_at: String,
    pub config: RiskConfig,
    pub stations: usize,
    pub trips: usize,
    pub collisions: usize,
    pub assignment: AssignmentReport,
    pub cell_prior: GlobalPrior,
    pub cell_tiers: TierCuts,
    pub station_prior: GlobalPrior,
    pub station_tiers: TierCuts,
}

/// Write cells as CSV, or Parquet when `path` ends in `.parquet`.
pub fn persist_cells(cells: &[RiskCell], path: &Path) -> Result<()> {
    let mut df = DataFrame::new(vec![
        Series::new(
            "station_id".into(),
            cells
                .iter()
                .map(|c| c.station_id.clone())
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "time_bucket".into(),
            cells
                .iter()
                .map(|c| c.time_bucket.clone())
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "hazard".into(),
            cells.iter().map(|c| c.hazard).collect::<Vec<_>>(),
        ),
        Series::new(
            "exposure".into(),
            cells.iter().map(|c| c.exposure).collect::<Vec<_>>(),
        ),
        Series::new(
            "raw_risk".into(),
            cells.iter().map(|c| c.raw_risk).collect::<Vec<_>>(),
        ),
        Series::new(
            "smoothed_risk".into(),
            cells.iter().map(|c| c.smoothed_risk).collect::<Vec<_>>(),
        ),
        Series::new(
            "tier".into(),
            cells.iter().map(|c| c.tier as u32).collect::<Vec<_>>(),
        ),
        Series::new(
            "tier_label".into(),
            cells
                .iter()
                .map(|c| c.tier_label.clone())
                .collect::<Vec<_>>(),
        ),
    ])?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    if path.extension().and_then(|s| s.to_str()) == Some("parquet") {
        ParquetWriter::new(file).finish(&mut df)?;
    } else {
        let mut file = file;
        CsvWriter::new(&mut file).finish(&mut df)?;
    }
    info!(path = %path.display(), rows = df.height(), "wrote risk cells");
    Ok(())
}

/// Write the per-collision assignment audit.
pub fn persist_assignments(assignments: &[AssignedCollision], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    for row in assignments {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = assignments.len(), "wrote collision assignments");
    Ok(())
}

pub fn persist_summary(summary: &RunSummary, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    serde_json::to_writer_pretty(file, summary)?;
    info!(path = %path.display(), "wrote run summary");
    Ok(())
}

/// Locate a cell table written by [`persist_cells`] under `dir`.
///
/// `file` names the CSV; a `.parquet` sibling is accepted too. When both
/// exist the more recently written one wins.
pub fn locate_table(dir: &Path, file: &str) -> Option<PathBuf> {
    let csv = dir.join(file);
    let parquet = csv.with_extension("parquet");
    [csv, parquet]
        .into_iter()
        .filter_map(|path| {
            let modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok()?;
            Some((modified, path))
        })
        .max_by_key(|(modified, _)| *modified)
        .map(|(_, path)| path)
}

/// Read back a table written by [`persist_cells`], CSV or Parquet by extension.
pub fn load_cells(path: &Path) -> Result<Vec<RiskCell>> {
    if path.extension().and_then(|s| s.to_str()) == Some("parquet") {
        return load_parquet_cells(path);
    }
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("open {}", path.display()))?;
    let mut cells = Vec::new();
    for result in reader.deserialize::<RiskCell>() {
        cells.push(result.with_context(|| format!("parse {}", path.display()))?);
    }
    Ok(cells)
}

fn load_parquet_cells(path: &Path) -> Result<Vec<RiskCell>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let df = ParquetReader::new(file).finish()?;

    let column = |name: &str, dtype: DataType| -> Result<Series> {
        let series = df
            .column(name)
            .with_context(|| format!("{} lacks column {name}", path.display()))?
            .cast(&dtype)?;
        Ok(series)
    };
    let station_ids = column("station_id", DataType::String)?;
    let buckets = column("time_bucket", DataType::String)?;
    let hazard = column("hazard", DataType::Float64)?;
    let exposure = column("exposure", DataType::UInt64)?;
    let raw = column("raw_risk", DataType::Float64)?;
    let smoothed = column("smoothed_risk", DataType::Float64)?;
    let tiers = column("tier", DataType::UInt32)?;
    let labels = column("tier_label", DataType::String)?;

    let cells = station_ids
        .str()?
        .into_iter()
        .zip(buckets.str()?)
        .zip(hazard.f64()?)
        .zip(exposure.u64()?)
        .zip(raw.f64()?)
        .zip(smoothed.f64()?)
        .zip(tiers.u32()?)
        .zip(labels.str()?)
        .map(
            |(((((((station_id, bucket), hazard), exposure), raw), smoothed), tier), label)| {
                RiskCell {
                    station_id: station_id.unwrap_or_default().to_string(),
                    time_bucket: bucket.unwrap_or_default().to_string(),
                    hazard: hazard.unwrap_or_default(),
                    exposure: exposure.unwrap_or_default(),
                    raw_risk: raw.unwrap_or_default(),
                    smoothed_risk: smoothed.unwrap_or_default(),
                    tier: tier.unwrap_or_default() as usize,
                    tier_label: label.unwrap_or_default().to_string(),
                }
            },
        )
        .collect();
    Ok(cells)
}

pub fn load_summary(path: &Path) -> Result<RunSummary> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let summary = serde_json::from_reader(file)?;
    Ok(summary)
}
