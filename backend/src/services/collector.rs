//! Image collection and compositing
//!
//! Queries every enabled collection sharing the requested source's resolution,
//! merges the results newest first and walks the compositing decision tree:
//! single image, small mean/std-dev batch, then large median batch.

use chrono::{DateTime, Utc};
use shared::geometry::FarmGeometry;
use shared::indices::SpectralIndices;
use shared::models::{
    CloudMaskingStatus, CompositeMethod, ObservationBuilder, SatelliteObservation,
};
use shared::quality::{
    composite_quality_score, moisture_estimate, reassess_quality, surface_temperature_estimate,
    ISSUE_TEMPERATURE_CLAMPED, MAX_CLOUD_COVERAGE,
};
use shared::season::{interpret_ndvi, seasonal_context};
use shared::source::ImagerySource;
use shared::types::DateRange;
use std::sync::Arc;

use crate::config::CompositingConfig;
use crate::error::AppResult;
use crate::external::{ImageDescriptor, ImageryClient, ReduceRequest, Reducer, RegionReduction};
use crate::services::cache::ObservationCache;
use crate::services::resilience::ResilientCaller;

/// One collection attempt
#[derive(Debug, Clone)]
pub struct CollectionRequest<'a> {
    pub id: &'a str,
    pub geometry: &'a FarmGeometry,
    /// Latitude used for the seasonal context
    pub latitude: f64,
    pub source: ImagerySource,
    /// Scale for multi-image composites
    pub scale_meters: u32,
    pub range: DateRange,
    pub cloud_ceiling: f64,
}

#[derive(Clone)]
pub struct ImageCollector {
    client: Arc<dyn ImageryClient>,
    caller: Arc<ResilientCaller>,
    cache: ObservationCache,
    compositing: CompositingConfig,
    enabled_sources: Vec<ImagerySource>,
}

impl ImageCollector {
    pub fn new(
        client: Arc<dyn ImageryClient>,
        caller: Arc<ResilientCaller>,
        cache: ObservationCache,
        compositing: CompositingConfig,
        enabled_sources: Vec<ImagerySource>,
    ) -> Self {
        Self {
            client,
            caller,
            cache,
            compositing,
            enabled_sources,
        }
    }

    /// Collections queried for `primary`: its enabled companions, or every
    /// enabled source when none of them is enabled
    pub fn sources_for(&self, primary: ImagerySource) -> Vec<ImagerySource> {
        let companions: Vec<ImagerySource> = primary
            .companions()
            .iter()
            .copied()
            .filter(|s| self.enabled_sources.contains(s))
            .collect();
        if companions.is_empty() {
            self.enabled_sources.clone()
        } else {
            companions
        }
    }

    /// Collect an observation, or `None` when no image qualifies.
    ///
    /// Results (including empty ones) are cached; errors are not.
    pub async fn collect(
        &self,
        request: &CollectionRequest<'_>,
    ) -> AppResult<Option<SatelliteObservation>> {
        let sources = self.sources_for(request.source);
        let key = ObservationCache::key(
            request.geometry,
            &request.range,
            request.cloud_ceiling,
            &sources,
        );

        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached.map(|o| o.to_builder().farm_or_zone_id(request.id).build()));
        }

        let images = self
            .find_images(&sources, request.geometry, &request.range, request.cloud_ceiling)
            .await?;
        let observation = self.composite(request, &images).await?;

        self.cache.insert(key, observation.clone()).await;
        Ok(observation)
    }

    /// Mean NDVI over every image in `range`, ignoring cloud ceilings
    pub async fn historical_ndvi(
        &self,
        geometry: &FarmGeometry,
        source: ImagerySource,
        scale_meters: u32,
        range: &DateRange,
    ) -> AppResult<Option<f64>> {
        let sources = self.sources_for(source);
        let images = self.find_images(&sources, geometry, range, 100.0).await?;
        if images.is_empty() {
            return Ok(None);
        }
        let request = ReduceRequest::new(&images, *geometry, Reducer::Mean, scale_meters);
        let reduction = self.reduce(&request).await?;
        Ok(SpectralIndices::from_bands(&reduction.bands).ndvi)
    }

    /// Merged images from `sources` under the ceiling, newest first
    async fn find_images(
        &self,
        sources: &[ImagerySource],
        geometry: &FarmGeometry,
        range: &DateRange,
        cloud_ceiling: f64,
    ) -> AppResult<Vec<ImageDescriptor>> {
        let mut images = Vec::new();
        for &source in sources {
            let found = self
                .caller
                .call("imagery query", || {
                    self.client.query(source, geometry, range, cloud_ceiling)
                })
                .await?;
            tracing::debug!(
                "{} returned {} images for {}",
                source,
                found.len(),
                range.signature()
            );
            images.extend(found);
        }

        images.retain(|i| under_ceiling(i.cloud_cover, cloud_ceiling));
        images.sort_by(|a, b| b.captured_at.cmp(&a.captured_at));
        Ok(images)
    }

    async fn reduce(&self, request: &ReduceRequest) -> AppResult<RegionReduction> {
        self.caller
            .call("imagery reduce", || self.client.reduce(request))
            .await
    }

    /// Walk the compositing decision tree over newest-first `images`
    async fn composite(
        &self,
        request: &CollectionRequest<'_>,
        images: &[ImageDescriptor],
    ) -> AppResult<Option<SatelliteObservation>> {
        let Some(newest) = images.first() else {
            tracing::debug!(
                "No images for {} in {} below {}% cloud",
                request.id,
                request.range.signature(),
                request.cloud_ceiling
            );
            return Ok(None);
        };
        let cfg = &self.compositing;
        let mut best: Option<SatelliteObservation> = None;

        if request.cloud_ceiling <= cfg.single_image_max_cloud {
            let single = std::slice::from_ref(newest);
            let scale = newest.source.native_resolution_m();
            let reduction = self
                .reduce(&ReduceRequest::new(single, *request.geometry, Reducer::Mean, scale))
                .await?;
            let observation = build_observation(
                request,
                single,
                &reduction,
                CompositeMethod::SingleImage,
                single_image_quality(newest.cloud_cover, &reduction),
            );
            let score = observation.data_quality_score();
            if score >= cfg.single_image_early_exit {
                tracing::info!(
                    "Single image for {} scored {:.1}; early exit",
                    request.id,
                    score
                );
                return Ok(Some(observation));
            }
            tracing::debug!("Single image for {} scored {:.1}", request.id, score);
            best = Some(observation);
        }

        let ranked = rank_images(images);

        let small = &ranked[..cfg.small_batch_size.max(1).min(ranked.len())];
        let reduction = self
            .reduce(&ReduceRequest::new(
                small,
                *request.geometry,
                Reducer::MeanStdDev,
                request.scale_meters,
            ))
            .await?;
        let quality = composite_quality_score(
            mean_cloud(small),
            small.len(),
            reduction.ndvi_std_dev.unwrap_or(f64::NAN),
        );
        let observation =
            build_observation(request, small, &reduction, CompositeMethod::MeanStdDev, quality);
        let score = observation.data_quality_score();
        if score >= cfg.small_batch_accept {
            tracing::info!(
                "Mean composite of {} images for {} scored {:.1}; accepted",
                small.len(),
                request.id,
                score
            );
            return Ok(Some(observation));
        }
        tracing::debug!(
            "Mean composite of {} images for {} scored {:.1}",
            small.len(),
            request.id,
            score
        );
        best = Some(better(best, observation));

        if ranked.len() > cfg.small_batch_size {
            let large = &ranked[..cfg.large_batch_size.max(1).min(ranked.len())];
            let reduction = self
                .reduce(&ReduceRequest::new(
                    large,
                    *request.geometry,
                    Reducer::Median,
                    request.scale_meters,
                ))
                .await?;
            let quality = composite_quality_score(
                mean_cloud(large),
                large.len(),
                reduction.ndvi_std_dev.unwrap_or(f64::NAN),
            );
            let observation =
                build_observation(request, large, &reduction, CompositeMethod::Median, quality);
            tracing::info!(
                "Median composite of {} images for {} scored {:.1}",
                large.len(),
                request.id,
                observation.data_quality_score()
            );
            return Ok(Some(observation));
        }

        if let Some(observation) = &best {
            tracing::info!(
                "Using best attempt for {} ({:?}, {:.1})",
                request.id,
                observation.composite_method(),
                observation.data_quality_score()
            );
        }
        Ok(best)
    }
}

/// Strictly below the ceiling; a 100 % ceiling admits every image
pub fn under_ceiling(cloud_cover: f64, cloud_ceiling: f64) -> bool {
    if cloud_ceiling >= 100.0 {
        true
    } else {
        cloud_cover < cloud_ceiling
    }
}

/// Lowest cloud first, newest first among equals
fn rank_images(images: &[ImageDescriptor]) -> Vec<ImageDescriptor> {
    let mut ranked = images.to_vec();
    ranked.sort_by(|a, b| {
        a.cloud_cover
            .total_cmp(&b.cloud_cover)
            .then_with(|| b.captured_at.cmp(&a.captured_at))
    });
    ranked
}

fn mean_cloud(images: &[ImageDescriptor]) -> f64 {
    if images.is_empty() {
        return 100.0;
    }
    images.iter().map(|i| i.cloud_cover).sum::<f64>() / images.len() as f64
}

/// `100 - cloud`, scaled by the share of unmasked pixels
fn single_image_quality(cloud_cover: f64, reduction: &RegionReduction) -> f64 {
    let valid_ratio = if reduction.pixel_count == 0 {
        0.0
    } else {
        reduction.valid_pixels as f64 / reduction.pixel_count as f64
    };
    ((100.0 - cloud_cover) * valid_ratio.min(1.0)).clamp(0.0, 100.0)
}

fn better(current: Option<SatelliteObservation>, candidate: SatelliteObservation) -> SatelliteObservation {
    match current {
        Some(c) if c.data_quality_score() >= candidate.data_quality_score() => c,
        _ => candidate,
    }
}

/// Turn a reduction into a frozen, assessed observation
pub(crate) fn build_observation(
    request: &CollectionRequest<'_>,
    images: &[ImageDescriptor],
    reduction: &RegionReduction,
    method: CompositeMethod,
    quality: f64,
) -> SatelliteObservation {
    let (indices, rejected) = SpectralIndices::from_bands_checked(&reduction.bands);
    let moisture = moisture_estimate(&indices);
    let (temperature, temperature_clamped) = surface_temperature_estimate(indices.ndvi);

    let mut dates: Vec<DateTime<Utc>> = images.iter().map(|i| i.captured_at).collect();
    dates.sort_by(|a, b| b.cmp(a));
    let captured = dates.first().copied().unwrap_or_else(Utc::now);

    let cloud = mean_cloud(images);
    let cloud_status = if cloud > MAX_CLOUD_COVERAGE {
        CloudMaskingStatus::HighCloud
    } else if reduction.cloud_masked {
        CloudMaskingStatus::Masked
    } else {
        CloudMaskingStatus::Ok
    };

    let context = seasonal_context(captured.date_naive(), request.latitude);

    let mut builder = ObservationBuilder::new(request.id, captured)
        .cloud_coverage_percent(cloud)
        .indices(indices)
        .surface_temperature(temperature)
        .moisture_estimate(moisture)
        .pixel_count(reduction.pixel_count)
        .valid_pixels(reduction.valid_pixels)
        .data_quality_score(quality)
        .ndvi_status(interpret_ndvi(indices.ndvi, &context))
        .cloud_masking_status(cloud_status)
        .image_dates(dates)
        .composite_method(method)
        .ndvi_std_dev(reduction.ndvi_std_dev);

    for image in images {
        builder = builder.data_source(image.source.collection_id());
    }
    for index in rejected {
        builder = builder.quality_issue(format!("{} outside valid range (masked)", index.name()));
    }
    if temperature_clamped {
        builder = builder.quality_issue(ISSUE_TEMPERATURE_CLAMPED);
    }

    let observation = builder.build();
    let issues = reassess_quality(&observation);
    observation.to_builder().quality_issues(issues).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shared::indices::BandReflectance;
    use shared::season::NdviStatus;
    use shared::types::GpsCoordinates;

    fn image(id: &str, day: u32, cloud: f64) -> ImageDescriptor {
        ImageDescriptor {
            id: id.to_string(),
            source: ImagerySource::Sentinel2,
            captured_at: Utc.with_ymd_and_hms(2024, 7, day, 16, 0, 0).unwrap(),
            cloud_cover: cloud,
        }
    }

    fn reduction(nir: f64, red: f64) -> RegionReduction {
        RegionReduction {
            bands: BandReflectance {
                blue: 0.04,
                green: 0.08,
                red,
                nir,
                swir1: 0.2,
                swir2: 0.12,
            },
            ndvi_std_dev: Some(0.03),
            pixel_count: 400,
            valid_pixels: 390,
            cloud_masked: true,
        }
    }

    #[test]
    fn test_ceiling_is_exclusive_below_full_cover() {
        assert!(under_ceiling(19.9, 20.0));
        assert!(!under_ceiling(20.0, 20.0));
        assert!(!under_ceiling(40.0, 40.0));
        assert!(under_ceiling(100.0, 100.0));
    }

    #[test]
    fn test_rank_prefers_clear_then_recent() {
        let ranked = rank_images(&[image("a", 1, 10.0), image("b", 5, 3.0), image("c", 9, 3.0)]);
        let ids: Vec<&str> = ranked.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_single_image_quality_scales_by_valid_ratio() {
        let r = reduction(0.5, 0.1);
        assert!((single_image_quality(2.0, &r) - 98.0 * 390.0 / 400.0).abs() < 1e-9);
        let empty = RegionReduction {
            pixel_count: 0,
            valid_pixels: 0,
            ..r
        };
        assert_eq!(single_image_quality(2.0, &empty), 0.0);
    }

    #[test]
    fn test_build_observation_flags_season_and_sources() {
        let geometry = FarmGeometry::circle(GpsCoordinates::new(41.9, -93.6), 80.0);
        let request = CollectionRequest {
            id: "C",
            geometry: &geometry,
            latitude: 41.9,
            source: ImagerySource::Sentinel2,
            scale_meters: 10,
            range: DateRange::ending_at(chrono::NaiveDate::from_ymd_opt(2024, 7, 20).unwrap(), 30),
            cloud_ceiling: 20.0,
        };
        let images = [image("a", 12, 4.0), image("b", 15, 6.0)];
        // NDVI = (0.115 - 0.085) / 0.2 = 0.15 in July
        let observation = build_observation(
            &request,
            &images,
            &reduction(0.115, 0.085),
            CompositeMethod::MeanStdDev,
            90.0,
        );

        assert_eq!(observation.ndvi_status(), NdviStatus::UnexpectedLow);
        assert!(observation
            .quality_issues()
            .iter()
            .any(|i| i.contains("NDVI")));
        assert_eq!(observation.cloud_masking_status(), CloudMaskingStatus::Masked);
        assert_eq!(observation.data_sources(), ["COPERNICUS/S2_SR_HARMONIZED"]);
        assert_eq!(observation.image_dates()[0], images[1].captured_at);
        assert_eq!(observation.date_captured(), images[1].captured_at);
        assert!((observation.cloud_coverage_percent() - 5.0).abs() < 1e-9);
        assert!(!observation.used_fallback());
    }
}
