//! R-tree over station coordinates.
//!
//! Stations are bulk loaded as `[lng, lat]` points. A query converts the
//! search radius into a degree envelope that fully contains the spherical
//! cap around the point, pulls the stations inside it, and ranks them by
//! exact haversine distance.

use rstar::{primitives::GeomWithData, RTree, AABB};

use super::{haversine_m, select_nearest, GeoPoint, NearestStation, StationMatch, EARTH_RADIUS_M};
use crate::data::Station;

type StationEntry = GeomWithData<[f64; 2], usize>;

// keeps envelope edges from clipping stations sitting exactly on the radius
const ENVELOPE_PAD: f64 = 1.0 + 1e-6;

pub struct RTreeIndex {
    tree: RTree<StationEntry>,
    ids: Vec<String>,
    locations: Vec<GeoPoint>,
}

impl RTreeIndex {
    pub fn new(stations: &[Station]) -> Self {
        let ids = stations.iter().map(|s| s.station_id.clone()).collect();
        let locations: Vec<GeoPoint> = stations.iter().map(Station::location).collect();
        let entries = locations
            .iter()
            .enumerate()
            .map(|(idx, loc)| GeomWithData::new([loc.lng, loc.lat], idx))
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
            ids,
            locations,
        }
    }

    fn candidates(&self, point: GeoPoint, max_radius_m: f64) -> Vec<usize> {
        envelopes(point, max_radius_m)
            .iter()
            .flat_map(|env| self.tree.locate_in_envelope(env))
            .map(|entry| entry.data)
            .collect()
    }
}

impl NearestStation for RTreeIndex {
    fn nearest(&self, point: GeoPoint, max_radius_m: f64) -> Option<StationMatch<'_>> {
        let mut candidates = self.candidates(point, max_radius_m);
        // wrapped envelopes can overlap near the poles
        candidates.sort_unstable();
        candidates.dedup();
        select_nearest(
            candidates.into_iter().map(|idx| {
                (
                    self.ids[idx].as_str(),
                    haversine_m(point, self.locations[idx]),
                )
            }),
            max_radius_m,
        )
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Degree envelopes covering every point within `radius_m` of `point`.
///
/// Returns two boxes when the cap crosses the antimeridian.
fn envelopes(point: GeoPoint, radius_m: f64) -> Vec<AABB<[f64; 2]>> {
    let angular = (radius_m / EARTH_RADIUS_M) * ENVELOPE_PAD;
    let d_lat = angular.to_degrees();
    let min_lat = (point.lat - d_lat).max(-90.0);
    let max_lat = (point.lat + d_lat).min(90.0);

    let lat_rad = point.lat.to_radians();
    let reaches_pole = point.lat.abs() + d_lat >= 90.0;
    if reaches_pole || angular >= std::f64::consts::FRAC_PI_2 {
        return vec![AABB::from_corners([-180.0, min_lat], [180.0, max_lat])];
    }

    let ratio = (angular.sin() / lat_rad.cos()).min(1.0);
    let d_lng = ratio.asin().to_degrees() * ENVELOPE_PAD;
    let min_lng = point.lng - d_lng;
    let max_lng = point.lng + d_lng;

    let mut boxes = vec![AABB::from_corners(
        [min_lng.max(-180.0), min_lat],
        [max_lng.min(180.0), max_lat],
    )];
    if min_lng < -180.0 {
        boxes.push(AABB::from_corners([min_lng + 360.0, min_lat], [180.0, max_lat]));
    }
    if max_lng > 180.0 {
        boxes.push(AABB::from_corners([-180.0, min_lat], [max_lng - 360.0, max_lat]));
    }
    boxes
}
