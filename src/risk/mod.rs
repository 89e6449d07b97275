//! Risk-per-trip scoring pipeline.
//!
//! Stages run in a fixed order over an immutable snapshot: spatial assignment,
//! severity, aggregation, raw ratio, Empirical Bayes smoothing, tiering. The
//! station rollup is re-aggregated from raw sums and goes through the same
//! estimator, smoother and tiering on its own.

pub mod aggregate;
pub mod bayes;
pub mod bucket;
pub mod estimate;
pub mod output;
pub mod severity;
pub mod tier;

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    config::RiskConfig,
    data::{Collision, Station, Trip},
    error::{RiskError, RiskResult},
    spatial::{self, IndexKind, NearestStation},
};

use self::{
    aggregate::CellEnumeration,
    bayes::GlobalPrior,
    bucket::TimeBucketer,
    tier::TierCuts,
};

/// `(station_id, time_bucket)`.
pub type CellKey = (String, String);

/// One station×time cell and its estimates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskCell {
    pub station_id: String,
    pub time_bucket: String,
    pub hazard: f64,
    pub exposure: u64,
    pub raw_risk: f64,
    pub smoothed_risk: f64,
    pub tier: usize,
    pub tier_label: String,
}

impl RiskCell {
    pub fn new(
        station_id: impl Into<String>,
        time_bucket: impl Into<String>,
        hazard: f64,
        exposure: u64,
    ) -> Self {
        Self {
            station_id: station_id.into(),
            time_bucket: time_bucket.into(),
            hazard,
            exposure,
            raw_risk: 0.0,
            smoothed_risk: 0.0,
            tier: 0,
            tier_label: String::new(),
        }
    }
}

/// A collision after spatial assignment and scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignedCollision {
    pub collision_id: String,
    pub station_id: Option<String>,
    pub distance_m: Option<f64>,
    pub severity: f64,
    #[serde(skip)]
    pub timestamp: NaiveDateTime,
}

/// Coverage of spatial assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentReport {
    pub total: usize,
    pub assigned: usize,
    pub unassigned: usize,
    /// Assigned share in `[0, 1]`.
    pub coverage: f64,
}

/// Attach the nearest station within the threshold and a severity to each
/// collision.
pub fn assign_collisions(
    collisions: &[Collision],
    index: &dyn NearestStation,
    config: &RiskConfig,
) -> (Vec<AssignedCollision>, AssignmentReport) {
    let mut report = AssignmentReport {
        total: collisions.len(),
        ..AssignmentReport::default()
    };
    let assigned = collisions
        .iter()
        .map(|collision| {
            let hit = index.nearest(collision.location(), config.distance_threshold_m);
            match hit {
                Some(_) => report.assigned += 1,
                None => report.unassigned += 1,
            }
            AssignedCollision {
                collision_id: collision.collision_id.clone(),
                station_id: hit.map(|m| m.station_id.to_string()),
                distance_m: hit.map(|m| m.distance_m),
                severity: severity::severity(collision, &config.severity_weights),
                timestamp: collision.timestamp,
            }
        })
        .collect();
    if report.total > 0 {
        report.coverage = report.assigned as f64 / report.total as f64;
    }
    info!(
        total = report.total,
        assigned = report.assigned,
        unassigned = report.unassigned,
        coverage_pct = report.coverage * 100.0,
        threshold_m = config.distance_threshold_m,
        "assigned collisions to stations"
    );
    (assigned, report)
}

/// Fully estimated cells plus the statistics they were computed from.
#[derive(Debug, Clone)]
pub struct RiskTable {
    cells: Vec<RiskCell>,
    prior: GlobalPrior,
    cuts: TierCuts,
    lookup: HashMap<CellKey, usize>,
}

impl RiskTable {
    /// Raw ratio, EB smoothing and tiering over freshly aggregated cells.
    pub fn estimate(mut cells: Vec<RiskCell>, config: &RiskConfig) -> RiskResult<Self> {
        estimate::apply_raw_risk(&mut cells, config.epsilon);
        let prior = bayes::smooth(&mut cells, config.epsilon, config.eb_pseudo_count_k)?;
        let cuts = tier::assign_tiers(&mut cells, &config.tier_quantiles, &config.tier_labels);
        let lookup = cells
            .iter()
            .enumerate()
            .map(|(idx, c)| ((c.station_id.clone(), c.time_bucket.clone()), idx))
            .collect();
        Ok(Self {
            cells,
            prior,
            cuts,
            lookup,
        })
    }

    pub fn cells(&self) -> &[RiskCell] {
        &self.cells
    }

    pub fn prior(&self) -> &GlobalPrior {
        &self.prior
    }

    pub fn cuts(&self) -> &TierCuts {
        &self.cuts
    }

    pub fn get(&self, station_id: &str, time_bucket: &str) -> Option<&RiskCell> {
        self.lookup
            .get(&(station_id.to_string(), time_bucket.to_string()))
            .map(|idx| &self.cells[*idx])
    }

    /// Smoothed risk of a cell; an absent cell has no evidence and resolves
    /// to the global mean.
    pub fn smoothed_risk(&self, station_id: &str, time_bucket: &str) -> f64 {
        self.get(station_id, time_bucket)
            .map(|c| c.smoothed_risk)
            .unwrap_or(self.prior.mean)
    }
}

/// Everything one scoring run produces.
#[derive(Debug, Clone)]
pub struct ScoreOutput {
    pub cells: RiskTable,
    pub stations: RiskTable,
    pub assignments: Vec<AssignedCollision>,
    pub report: AssignmentReport,
}

/// Validated inputs for one run.
#[derive(Debug, Clone, Copy)]
pub struct Dataset<'a> {
    pub stations: &'a [Station],
    pub trips: &'a [Trip],
    pub collisions: &'a [Collision],
}

impl Dataset<'_> {
    pub fn ensure_non_empty(&self) -> RiskResult<()> {
        if self.stations.is_empty() {
            return Err(RiskError::EmptyDataset("stations"));
        }
        if self.trips.is_empty() {
            return Err(RiskError::EmptyDataset("trips"));
        }
        if self.collisions.is_empty() {
            return Err(RiskError::EmptyDataset("collisions"));
        }
        Ok(())
    }
}

/// Score with the configured granularity and the default R-tree index.
pub fn score(data: Dataset<'_>, config: &RiskConfig) -> RiskResult<ScoreOutput> {
    score_with(
        data,
        config,
        &config.time_bucket_granularity,
        IndexKind::default(),
        CellEnumeration::default(),
    )
}

/// Score with an explicit bucketing function, index backend and cell
/// enumeration.
pub fn score_with(
    data: Dataset<'_>,
    config: &RiskConfig,
    bucketer: &dyn TimeBucketer,
    index_kind: IndexKind,
    enumeration: CellEnumeration,
) -> RiskResult<ScoreOutput> {
    config.validate()?;
    data.ensure_non_empty()?;

    let index = spatial::build_index(data.stations, index_kind);
    let (assignments, report) = assign_collisions(data.collisions, index.as_ref(), config);
    if report.assigned == 0 {
        warn!("no collision fell within the distance threshold of any station");
    }

    let aggregated = aggregate::aggregate(
        &assignments,
        data.trips,
        data.stations,
        bucketer,
        enumeration,
    );
    let station_totals = aggregate::collapse_time(&aggregated);

    let cells = RiskTable::estimate(aggregated, config)?;
    info!(
        cells = cells.cells().len(),
        mu = cells.prior().mean,
        cut_points = ?cells.cuts().cut_points,
        "scored station-time cells"
    );
    let stations = RiskTable::estimate(station_totals, config)?;
    info!(
        stations = stations.cells().len(),
        mu = stations.prior().mean,
        "scored station rollup"
    );

    Ok(ScoreOutput {
        cells,
        stations,
        assignments,
        report,
    })
}
