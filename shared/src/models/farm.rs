//! Farm location models and analysis requests

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::geometry::{buffer_radius_m, FarmGeometry};
use crate::types::GpsCoordinates;

/// Smallest farm area the analysis works with
pub const MIN_AREA_HECTARES: f64 = 0.1;

/// Farm center and area. The area is clamped to at least 0.1 ha on construction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FarmCoordinates {
    latitude: f64,
    longitude: f64,
    area_hectares: f64,
}

impl FarmCoordinates {
    pub fn new(latitude: f64, longitude: f64, area_hectares: f64) -> Self {
        let area_hectares = if area_hectares.is_finite() {
            area_hectares.max(MIN_AREA_HECTARES)
        } else {
            MIN_AREA_HECTARES
        };
        Self {
            latitude,
            longitude,
            area_hectares,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn area_hectares(&self) -> f64 {
        self.area_hectares
    }

    pub fn center(&self) -> GpsCoordinates {
        GpsCoordinates::new(self.latitude, self.longitude)
    }

    /// Radius of a circular farm with this area, at least 30 m
    pub fn buffer_radius_m(&self) -> f64 {
        buffer_radius_m(self.area_hectares)
    }

    /// Buffered-point geometry covering the whole farm
    pub fn geometry(&self) -> FarmGeometry {
        FarmGeometry::circle(self.center(), self.buffer_radius_m())
    }

    /// Identifier used when the caller supplies none
    pub fn default_id(&self) -> String {
        format!("{:.6}_{:.6}", self.latitude, self.longitude)
    }
}

/// Request body for grid and whole-farm analysis
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FarmAnalysisRequest {
    pub farm_id: Option<String>,
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: f64,
    #[validate(range(min = 0.0001, max = 1000000.0, message = "Area must be positive"))]
    pub area_hectares: f64,
    #[validate(range(min = 0.0, max = 100.0, message = "Cloud ceiling must be between 0 and 100"))]
    pub max_cloud_cover: Option<f64>,
}

impl FarmAnalysisRequest {
    pub fn coordinates(&self) -> FarmCoordinates {
        FarmCoordinates::new(self.latitude, self.longitude, self.area_hectares)
    }

    pub fn farm_id(&self) -> String {
        self.farm_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| self.coordinates().default_id())
    }
}

/// Query for a grid preview (geometry only, no imagery)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GridPreviewQuery {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
    #[validate(range(min = 0.0001, max = 1000000.0))]
    pub area: f64,
    pub rows: Option<usize>,
    pub cols: Option<usize>,
}
