//! Grouping of hazard and exposure into station×time cells.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::{bucket::TimeBucketer, bucket::ALL_BUCKET, AssignedCollision, CellKey, RiskCell};
use crate::data::{Station, Trip};

/// Whether cells outside the observed trip/collision domain are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellEnumeration {
    /// Only (station, bucket) pairs that saw a trip or an assigned collision.
    #[default]
    Sparse,
    /// Every station crossed with every observed bucket.
    Dense,
}

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    hazard: f64,
    exposure: u64,
}

/// Sum severities and count trips per (station, bucket).
///
/// Collisions without an assigned station contribute nothing. Output is
/// ordered by station id, then bucket key.
pub fn aggregate(
    collisions: &[AssignedCollision],
    trips: &[Trip],
    stations: &[Station],
    bucketer: &dyn TimeBucketer,
    enumeration: CellEnumeration,
) -> Vec<RiskCell> {
    let mut totals: BTreeMap<CellKey, Totals> = BTreeMap::new();

    for trip in trips {
        let key = (trip.start_station_id.clone(), bucketer.bucket(&trip.started_at));
        totals.entry(key).or_default().exposure += 1;
    }
    for collision in collisions {
        let Some(station_id) = &collision.station_id else {
            continue;
        };
        let key = (station_id.clone(), bucketer.bucket(&collision.timestamp));
        totals.entry(key).or_default().hazard += collision.severity;
    }

    if enumeration == CellEnumeration::Dense {
        let buckets: BTreeSet<String> = totals.keys().map(|(_, b)| b.clone()).collect();
        for station in stations {
            for bucket in &buckets {
                totals
                    .entry((station.station_id.clone(), bucket.clone()))
                    .or_default();
            }
        }
    }

    debug!(cells = totals.len(), ?enumeration, "aggregated cells");
    totals
        .into_iter()
        .map(|((station_id, time_bucket), t)| {
            RiskCell::new(station_id, time_bucket, t.hazard, t.exposure)
        })
        .collect()
}

/// Re-key cells and re-sum their raw hazard and exposure.
///
/// Estimates on the result must be recomputed; smoothed values of the input
/// are ignored.
pub fn rollup<F>(cells: &[RiskCell], key: F) -> Vec<RiskCell>
where
    F: Fn(&RiskCell) -> CellKey,
{
    let mut totals: BTreeMap<CellKey, Totals> = BTreeMap::new();
    for cell in cells {
        let entry = totals.entry(key(cell)).or_default();
        entry.hazard += cell.hazard;
        entry.exposure += cell.exposure;
    }
    totals
        .into_iter()
        .map(|((station_id, time_bucket), t)| {
            RiskCell::new(station_id, time_bucket, t.hazard, t.exposure)
        })
        .collect()
}

/// Station-level totals with the time dimension collapsed to [`ALL_BUCKET`].
pub fn collapse_time(cells: &[RiskCell]) -> Vec<RiskCell> {
    rollup(cells, |cell| (cell.station_id.clone(), ALL_BUCKET.to_string()))
}
