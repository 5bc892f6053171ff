//! WebAssembly module for Farm Grid Analysis
//!
//! Provides client-side computation for:
//! - Grid previews before a farm is submitted
//! - Spectral indices from raw band reflectances
//! - Zone health scores and status bands
//! - Offline input validation

use chrono::NaiveDate;
use serde::Deserialize;
use shared::grid::{create_custom_grid, create_farm_grid};
use shared::indices::{BandReflectance, SpectralIndices};
use shared::scoring::zone_health_score;
use shared::season::{interpret_ndvi, seasonal_context};
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {}

#[derive(Deserialize)]
struct GridInput {
    latitude: f64,
    longitude: f64,
    area_hectares: f64,
    rows: Option<usize>,
    cols: Option<usize>,
}

fn to_js(message: String) -> JsValue {
    JsValue::from_str(&message)
}

fn validate_farm(latitude: f64, longitude: f64, area_hectares: f64) -> Result<(), ValidationError> {
    validate_coordinates(latitude, longitude)?;
    validate_area_hectares(area_hectares)
}

fn grid_json(input_json: &str) -> Result<String, String> {
    let input: GridInput =
        serde_json::from_str(input_json).map_err(|e| format!("Invalid farm JSON: {}", e))?;
    validate_farm(input.latitude, input.longitude, input.area_hectares)
        .map_err(|e| e.to_string())?;

    let farm = FarmCoordinates::new(input.latitude, input.longitude, input.area_hectares);
    let grid = match (input.rows, input.cols) {
        (None, None) => create_farm_grid(&farm),
        (rows, cols) => {
            let rows = rows.or(cols).unwrap_or(1);
            let size = GridSize::new(rows, cols.unwrap_or(rows));
            validate_grid_size(size).map_err(|e| e.to_string())?;
            create_custom_grid(&farm, size)
        }
    };
    serde_json::to_string(&grid).map_err(|e| e.to_string())
}

fn indices_json(bands_json: &str) -> Result<String, String> {
    let bands: BandReflectance =
        serde_json::from_str(bands_json).map_err(|e| format!("Invalid bands JSON: {}", e))?;
    serde_json::to_string(&SpectralIndices::from_bands(&bands)).map_err(|e| e.to_string())
}

fn ndvi_status_for(ndvi: Option<f64>, latitude: f64, date: &str) -> Result<String, String> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| format!("Invalid date {}: {}", date, e))?;
    let context = seasonal_context(date, latitude);
    Ok(interpret_ndvi(ndvi, &context).as_str().to_string())
}

/// Plan a farm grid from `{latitude, longitude, area_hectares, rows?, cols?}`
#[wasm_bindgen]
pub fn preview_grid(input_json: &str) -> Result<String, JsValue> {
    grid_json(input_json).map_err(to_js)
}

/// All nine indices for a band JSON object; masked indices are null
#[wasm_bindgen]
pub fn compute_indices(bands_json: &str) -> Result<String, JsValue> {
    indices_json(bands_json).map_err(to_js)
}

/// NDVI, or `undefined` when NIR + red is zero
#[wasm_bindgen]
pub fn compute_ndvi(nir: f64, red: f64) -> Option<f64> {
    shared::indices::ndvi(&BandReflectance {
        nir,
        red,
        ..Default::default()
    })
}

/// Weighted zone health score in 0..100
#[wasm_bindgen]
pub fn zone_health(
    ndvi: Option<f64>,
    ndwi: Option<f64>,
    moisture: Option<f64>,
    bsi: Option<f64>,
) -> f64 {
    zone_health_score(ndvi, ndwi, moisture, bsi)
}

/// Status band for a zone score
#[wasm_bindgen]
pub fn zone_status(score: f64) -> String {
    ZoneStatus::from_score(score).to_string()
}

/// Seasonal NDVI interpretation for an ISO date (`YYYY-MM-DD`)
#[wasm_bindgen]
pub fn ndvi_status(ndvi: Option<f64>, latitude: f64, date: &str) -> Result<String, JsValue> {
    ndvi_status_for(ndvi, latitude, date).map_err(to_js)
}

/// Validate farm inputs; returns the first problem, or `undefined` when valid
#[wasm_bindgen]
pub fn validate_farm_input(latitude: f64, longitude: f64, area_hectares: f64) -> Option<String> {
    validate_farm(latitude, longitude, area_hectares)
        .err()
        .map(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_grid_by_area() {
        let json = grid_json(r#"{"latitude": 41.9, "longitude": -93.6, "area_hectares": 1.5}"#)
            .unwrap();
        let grid: shared::grid::FarmGrid = serde_json::from_str(&json).unwrap();
        assert_eq!(grid.zones.len(), 4);
        assert_eq!(grid.zones[0].zone_id, "NW");
    }

    #[test]
    fn test_preview_grid_custom_and_invalid() {
        let json = grid_json(
            r#"{"latitude": 41.9, "longitude": -93.6, "area_hectares": 5.0, "rows": 2, "cols": 3}"#,
        )
        .unwrap();
        let grid: shared::grid::FarmGrid = serde_json::from_str(&json).unwrap();
        assert_eq!(grid.zones.len(), 6);

        assert!(grid_json(r#"{"latitude": 95.0, "longitude": 0.0, "area_hectares": 5.0}"#).is_err());
        assert!(grid_json(
            r#"{"latitude": 0.0, "longitude": 0.0, "area_hectares": 5.0, "rows": 11}"#
        )
        .is_err());
        assert!(grid_json("not json").is_err());
    }

    #[test]
    fn test_compute_ndvi() {
        let ndvi = compute_ndvi(0.8, 0.2).unwrap();
        assert!((ndvi - 0.6).abs() < 1e-9);
        assert_eq!(compute_ndvi(0.0, 0.0), None);
    }

    #[test]
    fn test_indices_json_masks_zero_denominators() {
        let json = indices_json(
            r#"{"blue": 0.0, "green": 0.0, "red": 0.0, "nir": 0.0, "swir1": 0.0, "swir2": 0.0}"#,
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["ndvi"].is_null());
        assert_eq!(value["bi"], 0.0);
    }

    #[test]
    fn test_zone_status_bands() {
        assert_eq!(zone_status(80.0), "healthy");
        assert_eq!(zone_status(60.0), "moderate");
        assert_eq!(zone_status(40.0), "degraded");
        assert_eq!(zone_status(10.0), "critical");
        assert_eq!(zone_health(None, None, None, None), 0.0);
    }

    #[test]
    fn test_ndvi_status_by_season() {
        assert_eq!(
            ndvi_status_for(Some(0.05), 41.9, "2024-07-15").unwrap(),
            "unexpected_low"
        );
        assert_eq!(
            ndvi_status_for(Some(0.05), 41.9, "2024-01-15").unwrap(),
            "expected_low"
        );
        assert_eq!(ndvi_status_for(None, 41.9, "2024-07-15").unwrap(), "normal");
        assert!(ndvi_status_for(Some(0.5), 41.9, "July").is_err());
    }

    #[test]
    fn test_validate_farm_input() {
        assert_eq!(validate_farm_input(41.9, -93.6, 5.0), None);
        assert!(validate_farm_input(41.9, -193.6, 5.0).is_some());
        assert!(validate_farm_input(41.9, -93.6, 0.0).is_some());
    }
}
