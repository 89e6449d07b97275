//! Input tables: records, loaders and validation.
//!
//! Loaders return `anyhow` errors for I/O and parsing problems and wrap
//! [`RiskError::InvalidInputRow`](crate::error::RiskError) for rows that parse
//! but violate a precondition.

pub mod collisions;
pub mod stations;
pub mod trips;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::spatial::GeoPoint;

/// A bike-share dock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub station_id: String,
    #[serde(default)]
    pub station_name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl Station {
    pub fn new(station_id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            station_id: station_id.into(),
            station_name: None,
            latitude,
            longitude,
        }
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// A trip start; only the departure station and time feed exposure.
#[derive(Debug, Clone, PartialEq)]
pub struct Trip {
    pub start_station_id: String,
    pub started_at: NaiveDateTime,
}

/// A geolocated crash with injury and fatality counts.
#[derive(Debug, Clone, PartialEq)]
pub struct Collision {
    pub collision_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: NaiveDateTime,
    pub cyclists_injured: u32,
    pub cyclists_killed: u32,
    pub others_injured: u32,
    pub others_killed: u32,
}

impl Collision {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parse the timestamp layouts found in trip and crash exports.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}
