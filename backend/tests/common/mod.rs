//! Shared fixtures: an in-memory imagery backend with scripted responses

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use farm_grid_backend::error::{AppError, AppResult};
use farm_grid_backend::external::{
    ImageDescriptor, ImageryClient, ReduceRequest, Reducer, RegionReduction,
};
use farm_grid_backend::Config;
use shared::geometry::FarmGeometry;
use shared::indices::BandReflectance;
use shared::source::ImagerySource;
use shared::types::DateRange;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Imagery backend double. Queries filter `images` by source, date range and
/// cloud ceiling; reductions return `bands` and record the reducer used.
pub struct ScriptedImagery {
    pub images: Vec<ImageDescriptor>,
    pub bands: BandReflectance,
    pub pixel_count: u64,
    pub valid_pixels: u64,
    pub ndvi_std_dev: Option<f64>,
    /// Every query fails with this HTTP status
    pub fail_status: Option<u16>,
    pub query_calls: AtomicUsize,
    pub reductions: Mutex<Vec<(Reducer, usize)>>,
}

impl ScriptedImagery {
    pub fn new(images: Vec<ImageDescriptor>, bands: BandReflectance) -> Self {
        Self {
            images,
            bands,
            pixel_count: 400,
            valid_pixels: 390,
            ndvi_std_dev: Some(0.02),
            fail_status: None,
            query_calls: AtomicUsize::new(0),
            reductions: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), BandReflectance::default())
    }

    pub fn failing(status: u16) -> Self {
        Self {
            fail_status: Some(status),
            ..Self::empty()
        }
    }

    pub fn queries(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub fn reducers(&self) -> Vec<(Reducer, usize)> {
        self.reductions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageryClient for ScriptedImagery {
    async fn query(
        &self,
        source: ImagerySource,
        _geometry: &FarmGeometry,
        range: &DateRange,
        cloud_ceiling: f64,
    ) -> AppResult<Vec<ImageDescriptor>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.fail_status {
            return Err(AppError::ImageryBackend {
                status: Some(status),
                message: "scripted failure".into(),
            });
        }
        Ok(self
            .images
            .iter()
            .filter(|i| i.source == source)
            .filter(|i| {
                let day = i.captured_at.date_naive();
                day >= range.start && day <= range.end
            })
            .filter(|i| cloud_ceiling >= 100.0 || i.cloud_cover < cloud_ceiling)
            .cloned()
            .collect())
    }

    async fn reduce(&self, request: &ReduceRequest) -> AppResult<RegionReduction> {
        self.reductions
            .lock()
            .unwrap()
            .push((request.reducer, request.image_ids.len()));
        Ok(RegionReduction {
            bands: self.bands,
            ndvi_std_dev: match request.reducer {
                Reducer::Mean => None,
                _ => self.ndvi_std_dev,
            },
            pixel_count: self.pixel_count,
            valid_pixels: self.valid_pixels,
            cloud_masked: true,
        })
    }
}

pub fn image(id: &str, source: ImagerySource, date: NaiveDate, cloud: f64) -> ImageDescriptor {
    ImageDescriptor {
        id: id.to_string(),
        source,
        captured_at: Utc.from_utc_datetime(&date.and_hms_opt(16, 0, 0).unwrap()),
        cloud_cover: cloud,
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Healthy canopy: NDVI 0.6, NDMI ~0.33
pub fn healthy_bands() -> BandReflectance {
    BandReflectance {
        blue: 0.04,
        green: 0.08,
        red: 0.1,
        nir: 0.4,
        swir1: 0.2,
        swir2: 0.12,
    }
}

/// Sparse canopy: NDVI 0.15
pub fn sparse_bands() -> BandReflectance {
    BandReflectance {
        blue: 0.05,
        green: 0.09,
        red: 0.17,
        nir: 0.23,
        swir1: 0.25,
        swir2: 0.18,
    }
}

/// Defaults with near-zero retry delays
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.resilience.base_delay_ms = 1;
    config.resilience.max_delay_ms = 4;
    config
}
