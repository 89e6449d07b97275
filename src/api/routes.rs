//! HTTP route handlers for Axum.

use std::cmp::Ordering;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::warn;

use super::{types::CellDto, AppState};
use crate::{
    config::Settings,
    risk::{output, RiskCell},
};

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

const MAX_CELLS: usize = 500;

#[derive(Debug, Deserialize)]
pub struct CellQuery {
    pub station: Option<String>,
    pub bucket: Option<String>,
    pub tier: Option<String>,
}

pub async fn list_cells(
    state: State<AppState>,
    Query(query): Query<CellQuery>,
) -> ApiResult<Vec<CellDto>> {
    let mut cells = load_table(&state.settings, output::CELLS_FILE)?;
    if let Some(station) = &query.station {
        cells.retain(|c| &c.station_id == station);
    }
    if let Some(bucket) = &query.bucket {
        cells.retain(|c| &c.time_bucket == bucket);
    }
    if let Some(tier) = &query.tier {
        cells.retain(|c| c.tier_label.eq_ignore_ascii_case(tier) || c.tier.to_string() == *tier);
    }
    sort_by_risk(&mut cells);
    cells.truncate(MAX_CELLS);
    Ok(Json(cells.into_iter().map(CellDto::from).collect()))
}

pub async fn list_stations(state: State<AppState>) -> ApiResult<Vec<CellDto>> {
    let mut cells = load_table(&state.settings, output::STATIONS_FILE)?;
    sort_by_risk(&mut cells);
    Ok(Json(cells.into_iter().map(CellDto::from).collect()))
}

/// A cell absent from the table answers with zero evidence and the global
/// mean from the run summary.
pub async fn get_cell(
    Path((station_id, bucket)): Path<(String, String)>,
    state: State<AppState>,
) -> ApiResult<CellDto> {
    let cells = load_table(&state.settings, output::CELLS_FILE)?;
    if let Some(cell) = cells
        .into_iter()
        .find(|c| c.station_id == station_id && c.time_bucket == bucket)
    {
        return Ok(Json(cell.into()));
    }

    let summary_path = state.settings.join_output(output::SUMMARY_FILE);
    if !summary_path.exists() {
        return Err((
            StatusCode::NOT_FOUND,
            "run_summary.json missing; run score first".to_string(),
        ));
    }
    let summary = output::load_summary(&summary_path).map_err(internal)?;
    let mean = summary.cell_prior.mean;
    let tier = summary.cell_tiers.tier(mean);
    Ok(Json(CellDto {
        station_id,
        time_bucket: bucket,
        hazard: 0.0,
        exposure: 0,
        raw_risk: 0.0,
        smoothed_risk: mean,
        tier,
        tier_label: summary.cell_tiers.label(tier).to_string(),
        observed: false,
    }))
}

fn load_table(settings: &Settings, file: &str) -> Result<Vec<RiskCell>, (StatusCode, String)> {
    let Some(path) = output::locate_table(&settings.outputs_dir, file) else {
        warn!(file, dir = %settings.outputs_dir.display(), "table missing; run score first");
        return Ok(Vec::new());
    };
    output::load_cells(&path).map_err(internal)
}

fn sort_by_risk(cells: &mut [RiskCell]) {
    cells.sort_by(|a, b| {
        b.smoothed_risk
            .partial_cmp(&a.smoothed_risk)
            .unwrap_or(Ordering::Equal)
    });
}

fn internal(err: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}
