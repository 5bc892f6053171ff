//! Zone geometry and per-zone analysis results

use serde::{Deserialize, Serialize};

use crate::geometry::FarmGeometry;
use crate::types::{Bounds, GpsCoordinates};

/// One cell of a farm grid. Built once by the grid planner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZoneGeometry {
    pub zone_id: String,
    pub row: usize,
    pub col: usize,
    pub center_lat: f64,
    pub center_lng: f64,
    pub bounds: Bounds,
    pub area_hectares: f64,
}

impl ZoneGeometry {
    pub fn new(zone_id: String, row: usize, col: usize, bounds: Bounds, area_hectares: f64) -> Self {
        let center = bounds.center();
        Self {
            zone_id,
            row,
            col,
            center_lat: center.latitude,
            center_lng: center.longitude,
            bounds,
            area_hectares,
        }
    }

    pub fn center(&self) -> GpsCoordinates {
        GpsCoordinates::new(self.center_lat, self.center_lng)
    }

    pub fn geometry(&self) -> FarmGeometry {
        FarmGeometry::rectangle(self.bounds)
    }
}

/// Zone health status by score band
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ZoneStatus {
    Healthy,
    Moderate,
    Degraded,
    Critical,
}

impl ZoneStatus {
    /// >= 75 healthy, >= 55 moderate, >= 35 degraded, else critical
    pub fn from_score(score: f64) -> Self {
        if score >= 75.0 {
            ZoneStatus::Healthy
        } else if score >= 55.0 {
            ZoneStatus::Moderate
        } else if score >= 35.0 {
            ZoneStatus::Degraded
        } else {
            ZoneStatus::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneStatus::Healthy => "healthy",
            ZoneStatus::Moderate => "moderate",
            ZoneStatus::Degraded => "degraded",
            ZoneStatus::Critical => "critical",
        }
    }
}

impl std::fmt::Display for ZoneStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scored result for one zone
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZoneAnalysisResult {
    pub zone_id: String,
    pub row: usize,
    pub col: usize,
    #[serde(rename = "health")]
    pub health_score: f64,
    pub status: ZoneStatus,
    pub ndvi: Option<f64>,
    pub ndwi: Option<f64>,
    pub moisture: Option<f64>,
    pub alerts: Vec<String>,
    pub recommendations: Vec<String>,
    pub data_quality: f64,
    /// Zone area, used to weight the farm score
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub area_hectares: Option<f64>,
    #[serde(default)]
    pub used_fallback: bool,
    #[serde(default)]
    pub quality_summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_bands() {
        assert_eq!(ZoneStatus::from_score(75.0), ZoneStatus::Healthy);
        assert_eq!(ZoneStatus::from_score(74.9), ZoneStatus::Moderate);
        assert_eq!(ZoneStatus::from_score(55.0), ZoneStatus::Moderate);
        assert_eq!(ZoneStatus::from_score(35.0), ZoneStatus::Degraded);
        assert_eq!(ZoneStatus::from_score(34.9), ZoneStatus::Critical);
    }

    #[test]
    fn test_zone_center_from_bounds() {
        let bounds = Bounds {
            north: 42.0,
            south: 41.0,
            east: -93.0,
            west: -94.0,
        };
        let zone = ZoneGeometry::new("C".into(), 1, 1, bounds, 2.5);
        assert_eq!(zone.center(), GpsCoordinates::new(41.5, -93.5));
        assert_eq!(zone.geometry().bounding_box(), bounds);
    }
}
