//! Per-zone grid analysis
//!
//! Fans a farm out into one pipeline per zone, bounded by
//! `analysis.max_concurrent_zones`, and fans back in once every zone has a
//! result. Zones that cannot be observed carry synthetic data, so assembly
//! always sees a full grid.

use chrono::{NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use shared::aggregate::{zone_statistics, SpatialVariability, ZoneStatistics};
use shared::grid::{compass_direction, create_custom_grid, create_farm_grid, FarmGrid, GridPlan};
use shared::models::{FarmCoordinates, FarmGridAnalysis, ZoneAnalysisResult, ZoneGeometry};
use shared::scoring::{analyze_zone, classify_zone_condition, zone_action, ZoneAction, ZoneCondition};
use shared::types::GridSize;
use shared::validation::validate_grid_size;
use std::sync::Arc;

use crate::config::AnalysisConfig;
use crate::error::AppResult;
use crate::services::cascade::{FallbackCascade, ObservationRequest};

/// Plain-language reading of one zone
#[derive(Debug, Clone, Serialize)]
pub struct ZoneInsight {
    pub zone_id: String,
    pub direction: &'static str,
    pub condition: ZoneCondition,
    pub action: Option<ZoneAction>,
}

/// Grid analysis plus farm-wide statistics and per-zone guidance
#[derive(Debug, Clone, Serialize)]
pub struct GridInsights {
    pub summary: String,
    pub spatial_variability: SpatialVariability,
    pub ndvi_statistics: ZoneStatistics,
    pub moisture_statistics: ZoneStatistics,
    pub zones: Vec<ZoneInsight>,
    pub analysis: FarmGridAnalysis,
}

impl GridInsights {
    pub fn from_analysis(analysis: FarmGridAnalysis) -> Self {
        let zones = analysis
            .zones
            .iter()
            .map(|zone| {
                let condition = classify_zone_condition(zone.health_score, zone.ndvi, zone.moisture);
                let action = zone_action(&zone.zone_id, &condition, zone.ndvi, zone.moisture);
                ZoneInsight {
                    zone_id: zone.zone_id.clone(),
                    direction: compass_direction(zone.row, zone.col, analysis.grid_size),
                    condition,
                    action,
                }
            })
            .collect();
        let ndvi: Vec<Option<f64>> = analysis.zones.iter().map(|z| z.ndvi).collect();
        let moisture: Vec<Option<f64>> = analysis.zones.iter().map(|z| z.moisture).collect();

        Self {
            summary: analysis.farmer_summary(),
            spatial_variability: analysis.spatial_variability(),
            ndvi_statistics: zone_statistics(&ndvi),
            moisture_statistics: zone_statistics(&moisture),
            zones,
            analysis,
        }
    }
}

#[derive(Clone)]
pub struct GridAnalysisService {
    cascade: Arc<FallbackCascade>,
    config: AnalysisConfig,
}

impl GridAnalysisService {
    pub fn new(cascade: Arc<FallbackCascade>, config: AnalysisConfig) -> Self {
        Self { cascade, config }
    }

    /// Analyze a farm on the grid its area calls for
    pub async fn analyze(
        &self,
        farm_id: &str,
        farm: &FarmCoordinates,
        cloud_ceiling: f64,
        as_of: NaiveDate,
    ) -> FarmGridAnalysis {
        let grid = create_farm_grid(farm);
        self.analyze_grid(farm_id, &grid, cloud_ceiling, as_of).await
    }

    /// Analyze a farm on a caller-chosen grid
    pub async fn analyze_custom(
        &self,
        farm_id: &str,
        farm: &FarmCoordinates,
        size: GridSize,
        cloud_ceiling: f64,
        as_of: NaiveDate,
    ) -> AppResult<FarmGridAnalysis> {
        validate_grid_size(size)?;
        let grid = create_custom_grid(farm, size);
        Ok(self.analyze_grid(farm_id, &grid, cloud_ceiling, as_of).await)
    }

    async fn analyze_grid(
        &self,
        farm_id: &str,
        grid: &FarmGrid,
        cloud_ceiling: f64,
        as_of: NaiveDate,
    ) -> FarmGridAnalysis {
        tracing::info!(
            "Analyzing {} on a {} grid with {} at {} m",
            farm_id,
            grid.grid_size(),
            grid.plan.source,
            grid.plan.resolution_meters
        );

        let plan = grid.plan;
        let mut zones: Vec<ZoneAnalysisResult> = stream::iter(grid.zones.clone())
            .map(|zone| async move {
                self.analyze_zone(&zone, &plan, cloud_ceiling, as_of).await
            })
            .buffer_unordered(self.config.max_concurrent_zones.max(1))
            .collect()
            .await;
        zones.sort_by_key(|z| (z.row, z.col));

        let analysis = FarmGridAnalysis::assemble(
            farm_id,
            grid,
            zones,
            self.config.problem_zone_threshold,
            Utc::now(),
        );
        tracing::info!(
            "Grid analysis for {} complete: overall {:.1}, {} problem zones",
            farm_id,
            analysis.overall_health,
            analysis.problem_zones.len()
        );
        analysis
    }

    async fn analyze_zone(
        &self,
        zone: &ZoneGeometry,
        plan: &GridPlan,
        cloud_ceiling: f64,
        as_of: NaiveDate,
    ) -> ZoneAnalysisResult {
        let request = ObservationRequest {
            id: zone.zone_id.clone(),
            geometry: zone.geometry(),
            latitude: zone.center_lat,
            source: plan.source,
            scale_meters: plan.resolution_meters,
            cloud_ceiling,
            as_of,
        };
        let observation = self.cascade.observe(&request).await;
        let result = analyze_zone(zone, &observation);
        tracing::debug!(
            "Zone {} scored {:.1} ({})",
            result.zone_id,
            result.health_score,
            result.status
        );
        result
    }
}
