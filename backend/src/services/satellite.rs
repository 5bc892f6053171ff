//! Whole-farm analysis and historical series

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use shared::estimates::{
    classify_vegetation, salinity_level, soil_moisture_level, AdvancedEstimates, SalinityLevel,
    SoilMoisture, VegetationHealth,
};
use shared::geometry::{pixel_coverage, PixelCoverage};
use shared::models::{FarmCoordinates, SatelliteObservation};
use shared::scoring::farm_health_from_indices;
use shared::season::{seasonal_context, SeasonalContext};
use shared::source::{select_source, ImagerySource};
use shared::trend::{ndvi_trend, temporal_variance, NdviTrend, TemporalVariance};
use shared::types::{DateRange, GpsCoordinates};
use std::sync::Arc;

use crate::services::cascade::{FallbackCascade, ObservationRequest};
use crate::services::collector::{CollectionRequest, ImageCollector};

/// Length of one step in the monthly series
const MONTH_DAYS: i64 = 30;

/// Whole-farm observation plus everything derived from it
#[derive(Debug, Clone, Serialize)]
pub struct FarmAnalysisReport {
    pub farm_id: String,
    pub center: GpsCoordinates,
    pub area_hectares: f64,
    pub satellite_source: ImagerySource,
    pub resolution_meters: u32,
    pub health_score: f64,
    pub observation: SatelliteObservation,
    pub vegetation: Option<VegetationHealth>,
    pub salinity: Option<SalinityLevel>,
    pub soil_moisture: Option<SoilMoisture>,
    /// Uncalibrated proxies
    pub estimates: AdvancedEstimates,
    pub pixel_coverage: PixelCoverage,
    pub seasonal_context: SeasonalContext,
    pub quality_summary: String,
    pub analysis_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HistoryPoint {
    pub window_end: NaiveDate,
    pub date_captured: DateTime<Utc>,
    pub ndvi: Option<f64>,
    pub moisture: Option<f64>,
    pub data_quality: f64,
}

/// Monthly NDVI series, oldest first
#[derive(Debug, Clone, Serialize)]
pub struct FarmHistory {
    pub farm_id: String,
    pub months_requested: u32,
    pub points: Vec<HistoryPoint>,
    pub trend: NdviTrend,
    pub variance: TemporalVariance,
}

#[derive(Clone)]
pub struct FarmAnalysisService {
    cascade: Arc<FallbackCascade>,
    collector: Option<ImageCollector>,
}

impl FarmAnalysisService {
    pub fn new(cascade: Arc<FallbackCascade>, collector: Option<ImageCollector>) -> Self {
        Self { cascade, collector }
    }

    pub async fn analyze(
        &self,
        farm_id: &str,
        farm: &FarmCoordinates,
        cloud_ceiling: f64,
        as_of: NaiveDate,
    ) -> FarmAnalysisReport {
        let source = select_source(farm.area_hectares());
        let request = ObservationRequest {
            id: farm_id.to_string(),
            geometry: farm.geometry(),
            latitude: farm.latitude(),
            source,
            scale_meters: source.native_resolution_m(),
            cloud_ceiling,
            as_of,
        };
        tracing::info!(
            "Whole-farm analysis for {} ({:.1} ha, {})",
            farm_id,
            farm.area_hectares(),
            source
        );

        let observation = self.cascade.observe(&request).await;
        let indices = *observation.indices();

        FarmAnalysisReport {
            farm_id: farm_id.to_string(),
            center: farm.center(),
            area_hectares: farm.area_hectares(),
            satellite_source: source,
            resolution_meters: source.native_resolution_m(),
            health_score: farm_health_from_indices(&observation),
            vegetation: indices.ndvi.map(classify_vegetation),
            salinity: indices.si.map(salinity_level),
            soil_moisture: indices.ndmi.map(soil_moisture_level),
            estimates: AdvancedEstimates::from_indices(&indices),
            pixel_coverage: pixel_coverage(farm.latitude(), farm.longitude(), farm.area_hectares()),
            seasonal_context: seasonal_context(
                observation.date_captured().date_naive(),
                farm.latitude(),
            ),
            quality_summary: observation.quality_summary(),
            observation,
            analysis_timestamp: Utc::now(),
        }
    }

    /// One observation per 30-day step over the last `months`.
    ///
    /// Months without imagery are skipped; synthetic data never enters the series.
    pub async fn history(
        &self,
        farm_id: &str,
        farm: &FarmCoordinates,
        months: u32,
        cloud_ceiling: f64,
        as_of: NaiveDate,
    ) -> FarmHistory {
        let mut points = Vec::new();

        if let Some(collector) = &self.collector {
            let source = select_source(farm.area_hectares());
            let geometry = farm.geometry();

            for month in (0..months).rev() {
                let window_end = as_of - Duration::days(i64::from(month) * MONTH_DAYS);
                let request = CollectionRequest {
                    id: farm_id,
                    geometry: &geometry,
                    latitude: farm.latitude(),
                    source,
                    scale_meters: source.native_resolution_m(),
                    range: DateRange::ending_at(window_end, MONTH_DAYS),
                    cloud_ceiling,
                };
                match collector.collect(&request).await {
                    Ok(Some(observation)) => points.push(HistoryPoint {
                        window_end,
                        date_captured: observation.date_captured(),
                        ndvi: observation.ndvi(),
                        moisture: observation.moisture_estimate(),
                        data_quality: observation.data_quality_score(),
                    }),
                    Ok(None) => {
                        tracing::debug!("No imagery for {} ending {}", farm_id, window_end)
                    }
                    Err(err) => {
                        tracing::warn!(
                            "History for {} stopped at {}: {}",
                            farm_id,
                            window_end,
                            err
                        );
                        break;
                    }
                }
            }
        } else {
            tracing::debug!("No imagery backend; empty history for {}", farm_id);
        }

        let ndvi: Vec<f64> = points.iter().filter_map(|p| p.ndvi).collect();
        tracing::info!(
            "History for {}: {} of {} months with imagery",
            farm_id,
            points.len(),
            months
        );

        FarmHistory {
            farm_id: farm_id.to_string(),
            months_requested: months,
            trend: ndvi_trend(&ndvi),
            variance: temporal_variance(&ndvi),
            points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CascadeConfig;

    fn service() -> FarmAnalysisService {
        let cascade = Arc::new(FallbackCascade::new(None, CascadeConfig::default()));
        FarmAnalysisService::new(cascade, None)
    }

    #[tokio::test]
    async fn test_farm_report_from_synthetic_observation() {
        let farm = FarmCoordinates::new(41.9, -93.6, 25.0);
        let date = NaiveDate::from_ymd_opt(2024, 7, 15).unwrap();
        let report = service().analyze("farm-9", &farm, 20.0, date).await;

        assert_eq!(report.satellite_source, ImagerySource::Landsat8);
        assert_eq!(report.resolution_meters, 30);
        assert!(report.observation.used_fallback());
        assert!(report.vegetation.is_some());
        assert!(report.salinity.is_none());
        assert!(!report.estimates.calibrated);
        assert!(report.health_score > 0.0 && report.health_score <= 100.0);
        assert!(report.quality_summary.contains("Fallback data used"));
    }

    #[tokio::test]
    async fn test_history_without_backend_is_empty() {
        let farm = FarmCoordinates::new(41.9, -93.6, 25.0);
        let date = NaiveDate::from_ymd_opt(2024, 7, 15).unwrap();
        let history = service().history("farm-9", &farm, 6, 20.0, date).await;
        assert!(history.points.is_empty());
        assert_eq!(history.months_requested, 6);
        assert_eq!(history.trend.trend, 0.0);
    }
}
