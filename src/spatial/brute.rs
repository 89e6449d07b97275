//! Linear scan over all stations.

use super::{haversine_m, select_nearest, GeoPoint, NearestStation, StationMatch};
use crate::data::Station;

pub struct BruteForceIndex {
    stations: Vec<(String, GeoPoint)>,
}

impl BruteForceIndex {
    pub fn new(stations: &[Station]) -> Self {
        Self {
            stations: stations
                .iter()
                .map(|s| (s.station_id.clone(), s.location()))
                .collect(),
        }
    }
}

impl NearestStation for BruteForceIndex {
    fn nearest(&self, point: GeoPoint, max_radius_m: f64) -> Option<StationMatch<'_>> {
        select_nearest(
            self.stations
                .iter()
                .map(|(id, loc)| (id.as_str(), haversine_m(point, *loc))),
            max_radius_m,
        )
    }

    fn len(&self) -> usize {
        self.stations.len()
    }
}
