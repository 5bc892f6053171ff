//! Satellite observation snapshot and its builder
//!
//! The pipeline accumulates flags through [`ObservationBuilder`] and then
//! freezes the result. A built observation only changes by going back through
//! [`SatelliteObservation::to_builder`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::indices::SpectralIndices;
use crate::season::NdviStatus;

/// Cloud handling applied to an observation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CloudMaskingStatus {
    #[default]
    Ok,
    /// Cloud and shadow pixels were masked out
    Masked,
    HighCloud,
}

impl CloudMaskingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudMaskingStatus::Ok => "ok",
            CloudMaskingStatus::Masked => "masked",
            CloudMaskingStatus::HighCloud => "high_cloud",
        }
    }
}

/// How the observation's values were produced
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompositeMethod {
    SingleImage,
    MeanStdDev,
    Median,
    Synthetic,
}

/// Read-only measurement for a farm or zone
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SatelliteObservation {
    farm_or_zone_id: String,
    date_captured: DateTime<Utc>,
    cloud_coverage_percent: f64,
    #[serde(flatten)]
    indices: SpectralIndices,
    surface_temperature: Option<f64>,
    moisture_estimate: Option<f64>,
    pixel_count: u64,
    valid_pixels: u64,
    data_quality_score: f64,
    ndvi_status: NdviStatus,
    quality_issues: Vec<String>,
    used_fallback: bool,
    cloud_masking_status: CloudMaskingStatus,
    data_sources: Vec<String>,
    image_dates: Vec<DateTime<Utc>>,
    composite_method: CompositeMethod,
    ndvi_std_dev: Option<f64>,
}

impl SatelliteObservation {
    pub fn farm_or_zone_id(&self) -> &str {
        &self.farm_or_zone_id
    }

    pub fn date_captured(&self) -> DateTime<Utc> {
        self.date_captured
    }

    pub fn cloud_coverage_percent(&self) -> f64 {
        self.cloud_coverage_percent
    }

    pub fn indices(&self) -> &SpectralIndices {
        &self.indices
    }

    pub fn ndvi(&self) -> Option<f64> {
        self.indices.ndvi
    }

    pub fn ndwi(&self) -> Option<f64> {
        self.indices.ndwi
    }

    pub fn surface_temperature(&self) -> Option<f64> {
        self.surface_temperature
    }

    pub fn moisture_estimate(&self) -> Option<f64> {
        self.moisture_estimate
    }

    pub fn pixel_count(&self) -> u64 {
        self.pixel_count
    }

    pub fn valid_pixels(&self) -> u64 {
        self.valid_pixels
    }

    pub fn data_quality_score(&self) -> f64 {
        self.data_quality_score
    }

    pub fn ndvi_status(&self) -> NdviStatus {
        self.ndvi_status
    }

    pub fn quality_issues(&self) -> &[String] {
        &self.quality_issues
    }

    pub fn used_fallback(&self) -> bool {
        self.used_fallback
    }

    pub fn cloud_masking_status(&self) -> CloudMaskingStatus {
        self.cloud_masking_status
    }

    pub fn data_sources(&self) -> &[String] {
        &self.data_sources
    }

    pub fn image_dates(&self) -> &[DateTime<Utc>] {
        &self.image_dates
    }

    pub fn composite_method(&self) -> CompositeMethod {
        self.composite_method
    }

    pub fn ndvi_std_dev(&self) -> Option<f64> {
        self.ndvi_std_dev
    }

    pub fn image_count(&self) -> usize {
        self.image_dates.len()
    }

    /// One human-readable line describing data quality
    pub fn quality_summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.quality_issues.is_empty() {
            parts.push(format!("Issues: {}", self.quality_issues.join("; ")));
        }
        if self.used_fallback {
            parts.push("Fallback data used (synthetic or historical estimate)".to_string());
        }
        if self.cloud_masking_status != CloudMaskingStatus::Ok {
            parts.push(format!("Cloud status: {}", self.cloud_masking_status.as_str()));
        }
        if self.ndvi_status != NdviStatus::Normal {
            parts.push(format!("NDVI status: {}", self.ndvi_status.as_str()));
        }
        if parts.is_empty() {
            "Data quality good".to_string()
        } else {
            parts.join(". ")
        }
    }

    /// Reopen for modification; the original is left untouched
    pub fn to_builder(&self) -> ObservationBuilder {
        ObservationBuilder {
            inner: self.clone(),
        }
    }
}

/// Accumulates an observation before freezing it
#[derive(Debug, Clone)]
pub struct ObservationBuilder {
    inner: SatelliteObservation,
}

impl ObservationBuilder {
    pub fn new(farm_or_zone_id: impl Into<String>, date_captured: DateTime<Utc>) -> Self {
        Self {
            inner: SatelliteObservation {
                farm_or_zone_id: farm_or_zone_id.into(),
                date_captured,
                cloud_coverage_percent: 0.0,
                indices: SpectralIndices::default(),
                surface_temperature: None,
                moisture_estimate: None,
                pixel_count: 0,
                valid_pixels: 0,
                data_quality_score: 0.0,
                ndvi_status: NdviStatus::Normal,
                quality_issues: Vec::new(),
                used_fallback: false,
                cloud_masking_status: CloudMaskingStatus::Ok,
                data_sources: Vec::new(),
                image_dates: Vec::new(),
                composite_method: CompositeMethod::SingleImage,
                ndvi_std_dev: None,
            },
        }
    }

    pub fn farm_or_zone_id(mut self, id: impl Into<String>) -> Self {
        self.inner.farm_or_zone_id = id.into();
        self
    }

    pub fn cloud_coverage_percent(mut self, value: f64) -> Self {
        self.inner.cloud_coverage_percent = value;
        self
    }

    pub fn indices(mut self, indices: SpectralIndices) -> Self {
        self.inner.indices = indices;
        self
    }

    pub fn ndvi(mut self, value: Option<f64>) -> Self {
        self.inner.indices.ndvi = value;
        self
    }

    pub fn surface_temperature(mut self, value: Option<f64>) -> Self {
        self.inner.surface_temperature = value;
        self
    }

    pub fn moisture_estimate(mut self, value: Option<f64>) -> Self {
        self.inner.moisture_estimate = value;
        self
    }

    pub fn pixel_count(mut self, value: u64) -> Self {
        self.inner.pixel_count = value;
        self
    }

    pub fn valid_pixels(mut self, value: u64) -> Self {
        self.inner.valid_pixels = value;
        self
    }

    pub fn data_quality_score(mut self, value: f64) -> Self {
        self.inner.data_quality_score = value;
        self
    }

    pub fn ndvi_status(mut self, status: NdviStatus) -> Self {
        self.inner.ndvi_status = status;
        self
    }

    pub fn quality_issue(mut self, issue: impl Into<String>) -> Self {
        let issue = issue.into();
        if !self.inner.quality_issues.contains(&issue) {
            self.inner.quality_issues.push(issue);
        }
        self
    }

    /// Replace all quality issues (re-assessment)
    pub fn quality_issues(mut self, issues: Vec<String>) -> Self {
        self.inner.quality_issues.clear();
        issues.into_iter().fold(self, |b, i| b.quality_issue(i))
    }

    pub fn used_fallback(mut self, value: bool) -> Self {
        self.inner.used_fallback = value;
        self
    }

    pub fn cloud_masking_status(mut self, status: CloudMaskingStatus) -> Self {
        self.inner.cloud_masking_status = status;
        self
    }

    pub fn data_source(mut self, source: impl Into<String>) -> Self {
        let source = source.into();
        if !self.inner.data_sources.contains(&source) {
            self.inner.data_sources.push(source);
        }
        self
    }

    pub fn image_dates(mut self, dates: Vec<DateTime<Utc>>) -> Self {
        self.inner.image_dates = dates;
        self
    }

    pub fn composite_method(mut self, method: CompositeMethod) -> Self {
        self.inner.composite_method = method;
        self
    }

    pub fn ndvi_std_dev(mut self, value: Option<f64>) -> Self {
        self.inner.ndvi_std_dev = value;
        self
    }

    /// Freeze. Percentages are clamped to 0..100 and valid pixels to the pixel count.
    pub fn build(self) -> SatelliteObservation {
        let mut observation = self.inner;
        observation.cloud_coverage_percent = clamp_percent(observation.cloud_coverage_percent);
        observation.data_quality_score = clamp_percent(observation.data_quality_score);
        observation.valid_pixels = observation.valid_pixels.min(observation.pixel_count);
        observation
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
