//! Fallback cascade
//!
//! Widens the search window and relaxes the cloud ceiling until imagery turns
//! up, blends in a historical NDVI average when quality is poor, and finally
//! substitutes a seasonal synthetic observation. `observe` never fails.

use chrono::{NaiveDate, TimeZone, Utc};
use rand::Rng;
use shared::geometry::FarmGeometry;
use shared::indices::SpectralIndices;
use shared::models::{CloudMaskingStatus, CompositeMethod, ObservationBuilder, SatelliteObservation};
use shared::quality::{
    assess_quality, needs_corrective_blend, reassess_quality, surface_temperature_estimate,
};
use shared::season::{interpret_ndvi, seasonal_context};
use shared::source::ImagerySource;
use shared::types::DateRange;

use crate::config::CascadeConfig;
use crate::services::collector::{CollectionRequest, ImageCollector};

pub const ISSUE_NO_BACKEND: &str = "No imagery backend configured; synthetic estimate";
pub const ISSUE_NO_IMAGERY: &str = "No imagery found in any search window; synthetic estimate";
pub const SYNTHETIC_SOURCE: &str = "synthetic";

/// What to observe and where
#[derive(Debug, Clone)]
pub struct ObservationRequest {
    pub id: String,
    pub geometry: FarmGeometry,
    pub latitude: f64,
    pub source: ImagerySource,
    pub scale_meters: u32,
    /// Base cloud ceiling C of the first window
    pub cloud_ceiling: f64,
    /// Windows end on this date
    pub as_of: NaiveDate,
}

pub struct FallbackCascade {
    collector: Option<ImageCollector>,
    config: CascadeConfig,
}

impl FallbackCascade {
    /// `collector` is `None` when no imagery backend is configured
    pub fn new(collector: Option<ImageCollector>, config: CascadeConfig) -> Self {
        Self { collector, config }
    }

    pub fn has_backend(&self) -> bool {
        self.collector.is_some()
    }

    pub async fn observe(&self, request: &ObservationRequest) -> SatelliteObservation {
        let Some(collector) = &self.collector else {
            tracing::debug!("No imagery backend; synthetic observation for {}", request.id);
            return self.synthetic(request, ISSUE_NO_BACKEND.to_string());
        };

        for (attempt, &days) in self.config.windows_days.iter().enumerate() {
            let ceiling = self.config.cloud_ceiling_for(attempt, request.cloud_ceiling);
            let collection = CollectionRequest {
                id: &request.id,
                geometry: &request.geometry,
                latitude: request.latitude,
                source: request.source,
                scale_meters: request.scale_meters,
                range: DateRange::ending_at(request.as_of, days),
                cloud_ceiling: ceiling,
            };

            match collector.collect(&collection).await {
                Ok(Some(observation)) => {
                    if attempt > 0 {
                        tracing::info!(
                            "Imagery for {} found in {}-day window at {:.0}% cloud",
                            request.id,
                            days,
                            ceiling
                        );
                    }
                    return self.correct_low_quality(collector, request, observation).await;
                }
                Ok(None) => {
                    tracing::info!(
                        "No imagery for {} in {}-day window at {:.0}% cloud; widening",
                        request.id,
                        days,
                        ceiling
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        "Imagery service failed for {}: {}; substituting synthetic observation",
                        request.id,
                        err
                    );
                    return self.synthetic(request, format!("Imagery service unavailable: {}", err));
                }
            }
        }

        tracing::warn!(
            "No imagery for {} after widest window; substituting synthetic observation",
            request.id
        );
        self.synthetic(request, ISSUE_NO_IMAGERY.to_string())
    }

    /// Blend a historical NDVI average into a low-quality observation
    async fn correct_low_quality(
        &self,
        collector: &ImageCollector,
        request: &ObservationRequest,
        observation: SatelliteObservation,
    ) -> SatelliteObservation {
        if !needs_corrective_blend(observation.quality_issues()) {
            return observation;
        }

        let days = i64::from(self.config.historical_months) * 365 / 12;
        let range = DateRange::ending_at(request.as_of, days);
        let historical = collector
            .historical_ndvi(&request.geometry, request.source, request.scale_meters, &range)
            .await;

        match historical {
            Ok(Some(historical)) => {
                let blended =
                    blend_ndvi(observation.ndvi(), historical, self.config.historical_blend_weight);
                tracing::info!(
                    "Blended {}-month NDVI average {:.3} into {} (now {:.3})",
                    self.config.historical_months,
                    historical,
                    request.id,
                    blended
                );
                apply_ndvi(&observation, blended, request.latitude)
            }
            Ok(None) => {
                tracing::debug!("No historical imagery to blend for {}", request.id);
                observation
            }
            Err(err) => {
                tracing::warn!("Historical blend failed for {}: {}", request.id, err);
                observation
            }
        }
    }

    fn synthetic(&self, request: &ObservationRequest, reason: String) -> SatelliteObservation {
        let mut rng = rand::thread_rng();
        synthetic_observation(
            &request.id,
            request.latitude,
            request.as_of,
            self.config.synthetic_quality_score,
            reason,
            &mut rng,
        )
    }
}

/// `weight * historical + (1 - weight) * current`; the historical value alone
/// when the current NDVI is masked
pub fn blend_ndvi(current: Option<f64>, historical: f64, weight: f64) -> f64 {
    match current {
        Some(current) => weight * historical + (1.0 - weight) * current,
        None => historical,
    }
}

/// Replace NDVI and everything derived from it, then re-assess
fn apply_ndvi(observation: &SatelliteObservation, ndvi: f64, latitude: f64) -> SatelliteObservation {
    let context = seasonal_context(observation.date_captured().date_naive(), latitude);
    let (temperature, _) = surface_temperature_estimate(Some(ndvi));
    let blended = observation
        .to_builder()
        .ndvi(Some(ndvi))
        .surface_temperature(temperature)
        .ndvi_status(interpret_ndvi(Some(ndvi), &context))
        .used_fallback(true)
        .build();
    let issues = reassess_quality(&blended);
    blended.to_builder().quality_issues(issues).build()
}

/// Seasonal stand-in when no usable imagery exists.
///
/// In-season 0.65 NDVI / 45 % moisture, otherwise 0.35 / 35 %, each with a
/// small jitter. Always tagged as fallback data.
pub fn synthetic_observation(
    id: &str,
    latitude: f64,
    as_of: NaiveDate,
    quality_score: f64,
    reason: String,
    rng: &mut impl Rng,
) -> SatelliteObservation {
    let context = seasonal_context(as_of, latitude);
    let (base_ndvi, base_moisture) = if context.is_growing_season() {
        (0.65, 45.0)
    } else {
        (0.35, 35.0)
    };
    let ndvi: f64 = base_ndvi + rng.gen_range(-0.05..=0.05);
    let moisture: f64 = base_moisture + rng.gen_range(-5.0..=5.0);

    let indices = SpectralIndices {
        ndvi: Some(ndvi),
        ndmi: Some(moisture / 100.0),
        ..Default::default()
    };
    let (temperature, _) = surface_temperature_estimate(Some(ndvi));
    let captured = as_of
        .and_hms_opt(12, 0, 0)
        .map(|dt| Utc.from_utc_datetime(&dt))
        .unwrap_or_else(Utc::now);

    let observation = ObservationBuilder::new(id, captured)
        .cloud_coverage_percent(100.0)
        .indices(indices)
        .surface_temperature(temperature)
        .moisture_estimate(Some(moisture))
        .data_quality_score(quality_score)
        .ndvi_status(interpret_ndvi(Some(ndvi), &context))
        .used_fallback(true)
        .cloud_masking_status(CloudMaskingStatus::HighCloud)
        .composite_method(CompositeMethod::Synthetic)
        .data_source(SYNTHETIC_SOURCE)
        .quality_issue(reason)
        .build();

    let mut issues = observation.quality_issues().to_vec();
    issues.extend(assess_quality(&observation));
    observation.to_builder().quality_issues(issues).build()
}
