//! HTTP handlers for farm analysis endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::grid::{compass_direction, create_custom_grid, create_farm_grid, FarmGrid};
use shared::models::{FarmAnalysisRequest, FarmGridAnalysis, GridPreviewQuery};
use shared::types::GridSize;
use shared::validation::{validate_area_hectares, validate_grid_size};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::{FarmAnalysisReport, FarmHistory, GridInsights};
use crate::AppState;

/// Longest history the API serves
pub const MAX_HISTORY_MONTHS: u32 = 36;

/// Grid analysis body; `rows`/`cols` override the area-based grid
#[derive(Debug, Deserialize)]
pub struct GridAnalysisRequest {
    #[serde(flatten)]
    pub farm: FarmAnalysisRequest,
    pub rows: Option<usize>,
    pub cols: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryRequest {
    #[serde(flatten)]
    pub farm: FarmAnalysisRequest,
    pub months: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ZoneDirection {
    pub zone_id: String,
    pub direction: &'static str,
}

#[derive(Debug, Serialize)]
pub struct GridPreviewResponse {
    #[serde(flatten)]
    pub grid: FarmGrid,
    pub directions: Vec<ZoneDirection>,
}

fn validated(request: &FarmAnalysisRequest) -> AppResult<()> {
    request.validate()?;
    validate_area_hectares(request.area_hectares)?;
    Ok(())
}

fn custom_size(rows: Option<usize>, cols: Option<usize>) -> AppResult<Option<GridSize>> {
    let size = match (rows, cols) {
        (None, None) => return Ok(None),
        (Some(rows), Some(cols)) => GridSize::new(rows, cols),
        (Some(n), None) | (None, Some(n)) => GridSize::new(n, n),
    };
    validate_grid_size(size)?;
    Ok(Some(size))
}

async fn run_grid(state: &AppState, input: GridAnalysisRequest) -> AppResult<FarmGridAnalysis> {
    validated(&input.farm)?;
    let farm = input.farm.coordinates();
    let farm_id = input.farm.farm_id();
    let ceiling = input
        .farm
        .max_cloud_cover
        .unwrap_or(state.config.cascade.default_cloud_ceiling);
    let today = Utc::now().date_naive();

    let analysis = match custom_size(input.rows, input.cols)? {
        Some(size) => {
            state
                .grid_service
                .analyze_custom(&farm_id, &farm, size, ceiling, today)
                .await?
        }
        None => {
            state
                .grid_service
                .analyze(&farm_id, &farm, ceiling, today)
                .await
        }
    };
    Ok(analysis)
}

/// Per-zone grid analysis
pub async fn analyze_grid(
    State(state): State<AppState>,
    Json(input): Json<GridAnalysisRequest>,
) -> AppResult<Json<FarmGridAnalysis>> {
    Ok(Json(run_grid(&state, input).await?))
}

/// Grid analysis with statistics, a farmer summary and per-zone actions
pub async fn grid_insights(
    State(state): State<AppState>,
    Json(input): Json<GridAnalysisRequest>,
) -> AppResult<Json<GridInsights>> {
    let analysis = run_grid(&state, input).await?;
    Ok(Json(GridInsights::from_analysis(analysis)))
}

/// Whole-farm observation with derived estimates
pub async fn analyze_farm(
    State(state): State<AppState>,
    Json(input): Json<FarmAnalysisRequest>,
) -> AppResult<Json<FarmAnalysisReport>> {
    validated(&input)?;
    let ceiling = input
        .max_cloud_cover
        .unwrap_or(state.config.cascade.default_cloud_ceiling);
    let report = state
        .farm_service
        .analyze(
            &input.farm_id(),
            &input.coordinates(),
            ceiling,
            Utc::now().date_naive(),
        )
        .await;
    Ok(Json(report))
}

/// Monthly NDVI series with trend
pub async fn farm_history(
    State(state): State<AppState>,
    Json(input): Json<HistoryRequest>,
) -> AppResult<Json<FarmHistory>> {
    validated(&input.farm)?;
    let months = input.months.unwrap_or(state.config.analysis.history_months);
    if months == 0 || months > MAX_HISTORY_MONTHS {
        return Err(AppError::validation(
            "months",
            format!("Months must be between 1 and {}", MAX_HISTORY_MONTHS),
        ));
    }
    let ceiling = input
        .farm
        .max_cloud_cover
        .unwrap_or(state.config.cascade.default_cloud_ceiling);
    let history = state
        .farm_service
        .history(
            &input.farm.farm_id(),
            &input.farm.coordinates(),
            months,
            ceiling,
            Utc::now().date_naive(),
        )
        .await;
    Ok(Json(history))
}

/// Zone geometries only, no imagery
pub async fn grid_preview(
    Query(query): Query<GridPreviewQuery>,
) -> AppResult<Json<GridPreviewResponse>> {
    query.validate()?;
    validate_area_hectares(query.area)?;
    let farm = shared::models::FarmCoordinates::new(query.lat, query.lng, query.area);

    let grid = match custom_size(query.rows, query.cols)? {
        Some(size) => create_custom_grid(&farm, size),
        None => create_farm_grid(&farm),
    };
    let size = grid.grid_size();
    let directions = grid
        .zones
        .iter()
        .map(|z| ZoneDirection {
            zone_id: z.zone_id.clone(),
            direction: compass_direction(z.row, z.col, size),
        })
        .collect();

    Ok(Json(GridPreviewResponse { grid, directions }))
}
