//! Radius-bounded nearest-station lookups.
//!
//! The aggregator only sees [`NearestStation`]; the R-tree is the default
//! backend and the brute-force scan exists for tiny networks and as a
//! reference in tests.

pub mod brute;
pub mod haversine;
pub mod rtree;

use clap::ValueEnum;
use serde::Serialize;

pub use brute::BruteForceIndex;
pub use haversine::{haversine_m, GeoPoint, EARTH_RADIUS_M};
pub use rtree::RTreeIndex;

use crate::data::Station;

/// Distances closer than this are treated as equal when breaking ties.
pub const TIE_TOLERANCE_M: f64 = 1e-6;

/// Result of a nearest-station query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StationMatch<'a> {
    pub station_id: &'a str,
    pub distance_m: f64,
}

/// Capability interface for spatial assignment.
///
/// Implementations return the station minimising haversine distance to
/// `point` provided that distance is `<= max_radius_m`. Stations within
/// [`TIE_TOLERANCE_M`] of the minimum are resolved to the lowest station id
/// in byte order.
pub trait NearestStation: Send + Sync {
    fn nearest(&self, point: GeoPoint, max_radius_m: f64) -> Option<StationMatch<'_>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Selectable index backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum IndexKind {
    #[default]
    Rtree,
    Brute,
}

/// Build the selected backend over the station set.
pub fn build_index(stations: &[Station], kind: IndexKind) -> Box<dyn NearestStation> {
    match kind {
        IndexKind::Rtree => Box::new(RTreeIndex::new(stations)),
        IndexKind::Brute => Box::new(BruteForceIndex::new(stations)),
    }
}

/// Pick the winner among `(station_id, distance)` candidates.
///
/// Independent of candidate order: the minimum distance is found first, then
/// the lowest id among everything within tolerance of it.
pub(crate) fn select_nearest<'a, I>(candidates: I, max_radius_m: f64) -> Option<StationMatch<'a>>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let in_range: Vec<(&str, f64)> = candidates
        .into_iter()
        .filter(|(_, d)| *d <= max_radius_m)
        .collect();
    let min_distance = in_range
        .iter()
        .map(|(_, d)| *d)
        .fold(f64::INFINITY, f64::min);
    in_range
        .into_iter()
        .filter(|(_, d)| *d <= min_distance + TIE_TOLERANCE_M)
        .min_by(|a, b| a.0.cmp(b.0))
        .map(|(station_id, distance_m)| StationMatch {
            station_id,
            distance_m,
        })
}
