//! Route definitions for the farm grid analysis API

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/analysis", analysis_routes())
}

/// Farm analysis routes
fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/grid", post(handlers::analyze_grid))
        .route("/grid/preview", get(handlers::grid_preview))
        .route("/grid/insights", post(handlers::grid_insights))
        .route("/farm", post(handlers::analyze_farm))
        .route("/history", post(handlers::farm_history))
}
