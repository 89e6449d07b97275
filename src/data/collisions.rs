//! Collision table loading and validation.

use std::{collections::HashSet, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use super::{parse_timestamp, Collision};
use crate::{error::RiskError, spatial::GeoPoint};

/// Cleaned crash export row; every field optional so gaps surface as
/// validation failures rather than CSV parse errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollisionRow {
    #[serde(default)]
    pub collision_id: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub cyclists_injured: Option<i64>,
    #[serde(default)]
    pub cyclists_killed: Option<i64>,
    #[serde(default)]
    pub others_injured: Option<i64>,
    #[serde(default)]
    pub others_killed: Option<i64>,
}

pub fn validate_collision(row: &CollisionRow, line: usize) -> Result<Collision, RiskError> {
    let invalid = |reason: String| RiskError::invalid_row("collisions", line, reason);

    let collision_id = row
        .collision_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid("missing collision_id".into()))?
        .to_string();
    let (Some(latitude), Some(longitude)) = (row.latitude, row.longitude) else {
        return Err(invalid("missing coordinates".into()));
    };
    if !GeoPoint::new(latitude, longitude).is_valid() {
        return Err(invalid(format!(
            "coordinates out of range ({latitude}, {longitude})"
        )));
    }
    let raw_ts = row
        .timestamp
        .as_deref()
        .ok_or_else(|| invalid("missing timestamp".into()))?;
    let timestamp =
        parse_timestamp(raw_ts).ok_or_else(|| invalid(format!("unparseable timestamp {raw_ts:?}")))?;

    let count = |name: &str, value: Option<i64>| -> Result<u32, RiskError> {
        let value = value.ok_or_else(|| invalid(format!("missing {name}")))?;
        u32::try_from(value)
            .map_err(|_| invalid(format!("{name} must be a non-negative count, got {value}")))
    };

    Ok(Collision {
        collision_id,
        latitude,
        longitude,
        timestamp,
        cyclists_injured: count("cyclists_injured", row.cyclists_injured)?,
        cyclists_killed: count("cyclists_killed", row.cyclists_killed)?,
        others_injured: count("others_injured", row.others_injured)?,
        others_killed: count("others_killed", row.others_killed)?,
    })
}

/// Load and validate the collision table.
pub fn load_collisions(path: &Path) -> Result<Vec<Collision>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("open collisions {}", path.display()))?;
    let mut seen = HashSet::new();
    let mut collisions = Vec::new();
    let mut rows = 0usize;
    let mut invalid = 0usize;
    let mut first_error = None;
    for result in reader.deserialize() {
        let row: CollisionRow =
            result.with_context(|| format!("parse collisions {}", path.display()))?;
        rows += 1;
        let checked = validate_collision(&row, rows).and_then(|collision| {
            if seen.insert(collision.collision_id.clone()) {
                Ok(collision)
            } else {
                Err(RiskError::invalid_row(
                    "collisions",
                    rows,
                    format!("duplicate collision_id {:?}", collision.collision_id),
                ))
            }
        });
        match checked {
            Ok(collision) => collisions.push(collision),
            Err(err) => {
                invalid += 1;
                first_error.get_or_insert(err);
            }
        }
    }
    if let Some(err) = first_error {
        warn!(invalid, rows, "collision validation failed");
        return Err(err.into());
    }
    info!(rows = collisions.len(), path = %path.display(), "loaded collisions");
    Ok(collisions)
}
