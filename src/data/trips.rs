//! Trip table discovery, loading and validation.

use std::{
    collections::HashSet,
    fs::File,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use polars::prelude::{DataFrame, DataType, ParquetReader, SerReader};
use serde::Deserialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::{parse_timestamp, Station, Trip};
use crate::error::RiskError;

/// Trip export row as written by the cleaning stage.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TripRow {
    #[serde(default)]
    pub start_station_id: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub start_station_name: Option<String>,
    #[serde(default)]
    pub start_lat: Option<f64>,
    #[serde(default)]
    pub start_lng: Option<f64>,
}

/// Collect trip files under `root`, in sorted order.
///
/// `root` may be a single file, a flat directory of files, or a partition
/// tree `<root>/YYYY/MM/*`. Partition directories whose names are not a
/// numeric year and a month in `1..=12` are skipped.
pub fn discover_trip_files(root: &Path) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(3)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("walking {}", root.display()))?;
        if !entry.file_type().is_file() || !is_table_file(entry.path()) {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let parts: Vec<&str> = relative
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect();
        let accepted = match parts.as_slice() {
            [_file] => true,
            [year, month, _file] => is_partition(year, month),
            _ => false,
        };
        if accepted {
            files.push(entry.into_path());
        } else {
            debug!(path = %entry.path().display(), "skipping file outside YYYY/MM layout");
        }
    }
    info!(root = %root.display(), files = files.len(), "discovered trip files");
    Ok(files)
}

fn is_table_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("csv") | Some("parquet")
    )
}

fn is_partition(year: &str, month: &str) -> bool {
    let numeric = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    numeric(year)
        && numeric(month)
        && month
            .parse::<u32>()
            .map(|m| (1..=12).contains(&m))
            .unwrap_or(false)
}

/// Read raw trip rows from a CSV or Parquet file.
pub fn read_trip_rows(path: &Path) -> Result<Vec<TripRow>> {
    let rows = match path.extension().and_then(|s| s.to_str()) {
        Some("parquet") => read_parquet_rows(path)?,
        _ => {
            let mut reader = csv::Reader::from_path(path)
                .with_context(|| format!("open trips {}", path.display()))?;
            let mut rows = Vec::new();
            for result in reader.deserialize() {
                let row: TripRow =
                    result.with_context(|| format!("parse trips {}", path.display()))?;
                rows.push(row);
            }
            rows
        }
    };
    debug!(path = %path.display(), rows = rows.len(), "read trip rows");
    Ok(rows)
}

fn read_parquet_rows(path: &Path) -> Result<Vec<TripRow>> {
    let file = File::open(path).with_context(|| format!("open trips {}", path.display()))?;
    let df = ParquetReader::new(file).finish()?;

    let ids = string_column(&df, "start_station_id")?;
    let started = string_column(&df, "started_at")?;
    let names = optional_string_column(&df, "start_station_name")?;
    let lats = optional_f64_column(&df, "start_lat")?;
    let lngs = optional_f64_column(&df, "start_lng")?;

    let rows = (0..df.height())
        .map(|idx| TripRow {
            start_station_id: ids[idx].clone(),
            started_at: started[idx].clone(),
            start_station_name: names.as_ref().and_then(|col| col[idx].clone()),
            start_lat: lats.as_ref().and_then(|col| col[idx]),
            start_lng: lngs.as_ref().and_then(|col| col[idx]),
        })
        .collect();
    Ok(rows)
}

fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df.column(name)?.cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

fn optional_string_column(df: &DataFrame, name: &str) -> Result<Option<Vec<Option<String>>>> {
    if df.column(name).is_ok() {
        string_column(df, name).map(Some)
    } else {
        Ok(None)
    }
}

fn optional_f64_column(df: &DataFrame, name: &str) -> Result<Option<Vec<Option<f64>>>> {
    if df.column(name).is_err() {
        return Ok(None);
    }
    let series = df.column(name)?.cast(&DataType::Float64)?;
    let values = series.f64()?.into_iter().collect();
    Ok(Some(values))
}

/// Validate one raw row against the station table.
pub fn validate_trip(row: &TripRow, line: usize, known: &HashSet<&str>) -> Result<Trip, RiskError> {
    let station = row
        .start_station_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RiskError::invalid_row("trips", line, "missing start_station_id"))?;
    if !known.contains(station) {
        return Err(RiskError::invalid_row(
            "trips",
            line,
            format!("unknown start station {station:?}"),
        ));
    }
    let raw_ts = row
        .started_at
        .as_deref()
        .ok_or_else(|| RiskError::invalid_row("trips", line, "missing started_at"))?;
    let started_at = parse_timestamp(raw_ts).ok_or_else(|| {
        RiskError::invalid_row("trips", line, format!("unparseable started_at {raw_ts:?}"))
    })?;
    Ok(Trip {
        start_station_id: station.to_string(),
        started_at,
    })
}

/// Load and validate all trips from `files`.
///
/// Every row is checked; the invalid count is logged and the first failure
/// returned so no partial table ever reaches the pipeline.
pub fn load_trips(files: &[PathBuf], stations: &[Station]) -> Result<Vec<Trip>> {
    let known: HashSet<&str> = stations.iter().map(|s| s.station_id.as_str()).collect();
    let mut trips = Vec::new();
    let mut line = 0usize;
    let mut invalid = 0usize;
    let mut first_error = None;
    for path in files {
        for row in read_trip_rows(path)? {
            line += 1;
            match validate_trip(&row, line, &known) {
                Ok(trip) => trips.push(trip),
                Err(err) => {
                    invalid += 1;
                    first_error.get_or_insert(err);
                }
            }
        }
    }
    if let Some(err) = first_error {
        warn!(invalid, rows = line, "trip validation failed");
        return Err(err.into());
    }
    info!(rows = trips.len(), files = files.len(), "loaded trips");
    Ok(trips)
}
