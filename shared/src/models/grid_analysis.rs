//! Farm-level grid analysis report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::{
    create_heatmap, farmer_summary, identify_problem_zones, overall_health, spatial_variability,
    SpatialVariability,
};
use crate::grid::FarmGrid;
use crate::models::ZoneAnalysisResult;
use crate::source::ImagerySource;
use crate::types::{GpsCoordinates, GridSize};

/// Grid analysis for one farm. Derived entirely from the zone results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FarmGridAnalysis {
    pub farm_id: String,
    pub center: GpsCoordinates,
    pub area_hectares: f64,
    pub grid_size: GridSize,
    pub satellite_source: ImagerySource,
    pub resolution_meters: u32,
    pub overall_health: f64,
    pub zones: Vec<ZoneAnalysisResult>,
    pub problem_zones: Vec<String>,
    pub heatmap_data: Vec<Vec<f64>>,
    pub analysis_timestamp: DateTime<Utc>,
}

impl FarmGridAnalysis {
    /// Assemble the report from a grid and its scored zones
    pub fn assemble(
        farm_id: impl Into<String>,
        grid: &FarmGrid,
        zones: Vec<ZoneAnalysisResult>,
        problem_threshold: f64,
        analysis_timestamp: DateTime<Utc>,
    ) -> Self {
        let problem_zones = identify_problem_zones(&zones, problem_threshold);
        let heatmap_data = create_heatmap(&zones, grid.grid_size());

        Self {
            farm_id: farm_id.into(),
            center: grid.center,
            area_hectares: grid.area_hectares,
            grid_size: grid.grid_size(),
            satellite_source: grid.plan.source,
            resolution_meters: grid.plan.resolution_meters,
            overall_health: overall_health(&zones),
            zones,
            problem_zones,
            heatmap_data,
            analysis_timestamp,
        }
    }

    pub fn spatial_variability(&self) -> SpatialVariability {
        let scores: Vec<f64> = self.zones.iter().map(|z| z.health_score).collect();
        spatial_variability(&scores)
    }

    pub fn zone(&self, zone_id: &str) -> Option<&ZoneAnalysisResult> {
        self.zones.iter().find(|z| z.zone_id == zone_id)
    }

    pub fn farmer_summary(&self) -> String {
        let problems: Vec<&ZoneAnalysisResult> = self
            .problem_zones
            .iter()
            .filter_map(|id| self.zone(id))
            .collect();
        farmer_summary(self.overall_health, &problems)
    }
}
