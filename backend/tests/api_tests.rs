//! HTTP API tests
//!
//! Exercises the router end to end with `tower::ServiceExt::oneshot`:
//! - Health reporting with and without an imagery backend
//! - Grid, whole-farm and history endpoints on synthetic data
//! - Validation failures mapped to 400 responses

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use common::{test_config, ScriptedImagery};
use farm_grid_backend::external::ImageryClient;
use farm_grid_backend::{create_app, AppState, Config};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app_without_backend() -> Router {
    create_app(AppState::with_client(Config::default(), None))
}

fn app_with_backend() -> Router {
    let mock: Arc<dyn ImageryClient> = Arc::new(ScriptedImagery::empty());
    create_app(AppState::with_client(test_config(), Some(mock)))
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn post(app: Router, uri: &str, body: Value) -> Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_degraded_without_backend() {
    let response = get(app_without_backend(), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["imagery"], "not_configured");
    assert!(body.get("circuit").is_none());
}

#[tokio::test]
async fn test_health_reports_circuit_when_configured() {
    let response = get(app_with_backend(), "/api/v1/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["circuit"]["state"], "closed");
}

// ============================================================================
// Analysis endpoints
// ============================================================================

#[tokio::test]
async fn test_grid_analysis_response_shape() {
    let response = post(
        app_without_backend(),
        "/api/v1/analysis/grid",
        json!({ "farm_id": "demo", "latitude": 41.9, "longitude": -93.6, "area_hectares": 5.0 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["farm_id"], "demo");
    assert_eq!(body["grid_size"]["rows"], 3);
    assert_eq!(body["satellite_source"], "COPERNICUS/S2_SR_HARMONIZED");
    assert_eq!(body["resolution_meters"], 10);
    assert_eq!(body["zones"].as_array().unwrap().len(), 9);
    assert_eq!(body["heatmap_data"].as_array().unwrap().len(), 3);
    assert!(body["problem_zones"].is_array());
    assert!(body["analysis_timestamp"].is_string());

    let zone = &body["zones"][0];
    assert_eq!(zone["zone_id"], "NW");
    assert!(zone["health"].is_number());
    assert!(zone["status"].is_string());
    assert_eq!(zone["used_fallback"], true);
}

#[tokio::test]
async fn test_grid_analysis_custom_size() {
    let response = post(
        app_without_backend(),
        "/api/v1/analysis/grid",
        json!({ "latitude": 41.9, "longitude": -93.6, "area_hectares": 5.0, "rows": 2, "cols": 3 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["zones"].as_array().unwrap().len(), 6);
    assert_eq!(body["farm_id"], "41.900000_-93.600000");
}

#[tokio::test]
async fn test_invalid_latitude_rejected() {
    let response = post(
        app_without_backend(),
        "/api/v1/analysis/grid",
        json!({ "latitude": 95.0, "longitude": -93.6, "area_hectares": 5.0 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["field"], "latitude");
}

#[tokio::test]
async fn test_oversized_custom_grid_rejected() {
    let response = post(
        app_without_backend(),
        "/api/v1/analysis/grid",
        json!({ "latitude": 41.9, "longitude": -93.6, "area_hectares": 5.0, "rows": 12 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_grid_insights() {
    let response = post(
        app_without_backend(),
        "/api/v1/analysis/grid/insights",
        json!({ "latitude": 41.9, "longitude": -93.6, "area_hectares": 30.0 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["zones"].as_array().unwrap().len(), 16);
    assert_eq!(body["analysis"]["zones"].as_array().unwrap().len(), 16);
    assert!(body["summary"].is_string());
    assert_eq!(body["ndvi_statistics"]["total_count"], 16);
    assert!(body["spatial_variability"]["uniformity_score"].is_number());
}

#[tokio::test]
async fn test_grid_preview() {
    let response = get(
        app_without_backend(),
        "/api/v1/analysis/grid/preview?lat=41.9&lng=-93.6&area=1.5",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["zones"].as_array().unwrap().len(), 4);
    assert_eq!(body["directions"][0]["zone_id"], "NW");
    assert_eq!(body["directions"][0]["direction"], "northwest");
}

#[tokio::test]
async fn test_farm_analysis_endpoint() {
    let response = post(
        app_without_backend(),
        "/api/v1/analysis/farm",
        json!({ "farm_id": "f1", "latitude": 41.9, "longitude": -93.6, "area_hectares": 25.0 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["farm_id"], "f1");
    assert_eq!(body["resolution_meters"], 30);
    assert_eq!(body["observation"]["used_fallback"], true);
    assert_eq!(body["estimates"]["calibrated"], false);
}

#[tokio::test]
async fn test_history_endpoint() {
    let response = post(
        app_with_backend(),
        "/api/v1/analysis/history",
        json!({ "latitude": 41.9, "longitude": -93.6, "area_hectares": 5.0, "months": 3 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["months_requested"], 3);
    assert!(body["points"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_history_months_bounded() {
    let response = post(
        app_without_backend(),
        "/api/v1/analysis/history",
        json!({ "latitude": 41.9, "longitude": -93.6, "area_hectares": 5.0, "months": 48 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error"]["field"], "months");
}
