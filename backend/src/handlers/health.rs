//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::services::{CircuitState, CircuitStats};
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub imagery: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circuit: Option<CircuitStats>,
    pub cached_collections: u64,
}

/// Health check endpoint handler.
///
/// "degraded" when no imagery backend is configured or its circuit is open;
/// analysis still answers, with synthetic data.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let circuit = state.resilience.as_ref().map(|caller| caller.stats());
    let healthy = circuit
        .as_ref()
        .is_some_and(|stats| stats.state != CircuitState::Open);

    Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        imagery: if circuit.is_some() {
            "configured"
        } else {
            "not_configured"
        }
        .to_string(),
        circuit,
        cached_collections: state.cache.entry_count(),
    })
}
