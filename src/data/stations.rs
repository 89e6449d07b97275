//! Station table loading, validation and derivation from trips.

use std::{
    collections::{BTreeMap, HashSet},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{info, warn};

use super::{trips::read_trip_rows, Station};
use crate::{error::RiskError, spatial::GeoPoint};

/// Station export row with every field optional, so blank cells reach
/// validation instead of failing the CSV parse.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StationRow {
    #[serde(default)]
    pub station_id: Option<String>,
    #[serde(default)]
    pub station_name: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// Trim the id and name and require both coordinates.
pub fn validate_station_row(row: &StationRow, line: usize) -> Result<Station, RiskError> {
    let station_id = row
        .station_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RiskError::invalid_row("stations", line, "empty station_id"))?
        .to_string();
    let (Some(latitude), Some(longitude)) = (row.latitude, row.longitude) else {
        return Err(RiskError::invalid_row(
            "stations",
            line,
            format!("missing coordinates for {station_id:?}"),
        ));
    };
    let station_name = row
        .station_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    Ok(Station {
        station_id,
        station_name,
        latitude,
        longitude,
    })
}

/// Load `station_id,station_name?,latitude,longitude` rows.
pub fn load_stations(path: &Path) -> Result<Vec<Station>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("open stations {}", path.display()))?;
    let mut stations = Vec::new();
    for (idx, result) in reader.deserialize().enumerate() {
        let row: StationRow =
            result.with_context(|| format!("parse stations {}", path.display()))?;
        stations.push(validate_station_row(&row, idx + 1)?);
    }
    validate_stations(&stations)?;
    info!(rows = stations.len(), path = %path.display(), "loaded stations");
    Ok(stations)
}

/// Ids must be non-empty and unique, coordinates in range.
pub fn validate_stations(stations: &[Station]) -> Result<(), RiskError> {
    let mut seen = HashSet::new();
    for (idx, station) in stations.iter().enumerate() {
        let line = idx + 1;
        if station.station_id.trim().is_empty() {
            return Err(RiskError::invalid_row("stations", line, "empty station_id"));
        }
        if !station.location().is_valid() {
            return Err(RiskError::invalid_row(
                "stations",
                line,
                format!(
                    "coordinates out of range ({}, {})",
                    station.latitude, station.longitude
                ),
            ));
        }
        if !seen.insert(station.station_id.as_str()) {
            return Err(RiskError::invalid_row(
                "stations",
                line,
                format!("duplicate station_id {:?}", station.station_id),
            ));
        }
    }
    Ok(())
}

#[derive(Default)]
struct StationTally {
    names: IndexMap<String, usize>,
    lat_sum: f64,
    lng_sum: f64,
    located: usize,
}

/// Derive a station table from trip start records.
///
/// The canonical name is the most frequent `start_station_name` (ties go to
/// the lexicographically smallest); the position is the mean start coordinate.
/// Stations that never appear with valid coordinates are dropped.
pub fn derive_stations(files: &[PathBuf]) -> Result<Vec<Station>> {
    let mut tallies: BTreeMap<String, StationTally> = BTreeMap::new();
    let mut rows = 0usize;
    let mut skipped = 0usize;
    for path in files {
        for row in read_trip_rows(path)? {
            rows += 1;
            let Some(id) = row
                .start_station_id
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
            else {
                skipped += 1;
                continue;
            };
            let tally = tallies.entry(id.to_string()).or_default();
            if let Some(name) = row.start_station_name.filter(|n| !n.trim().is_empty()) {
                *tally.names.entry(name).or_insert(0) += 1;
            }
            match (row.start_lat, row.start_lng) {
                (Some(lat), Some(lng)) if GeoPoint::new(lat, lng).is_valid() => {
                    tally.lat_sum += lat;
                    tally.lng_sum += lng;
                    tally.located += 1;
                }
                _ => skipped += 1,
            }
        }
    }

    let mut stations = Vec::with_capacity(tallies.len());
    for (station_id, tally) in tallies {
        if tally.located == 0 {
            warn!(%station_id, "station has no trips with coordinates; dropped");
            continue;
        }
        let station_name = tally
            .names
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(name, _)| name.clone());
        stations.push(Station {
            station_id,
            station_name,
            latitude: tally.lat_sum / tally.located as f64,
            longitude: tally.lng_sum / tally.located as f64,
        });
    }
    info!(rows, skipped, stations = stations.len(), "derived stations from trips");
    Ok(stations)
}

/// Write the station table as CSV.
pub fn write_stations(stations: &[Station], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    for station in stations {
        writer.serialize(station)?;
    }
    writer.flush()?;
    info!(rows = stations.len(), path = %path.display(), "wrote stations");
    Ok(())
}
