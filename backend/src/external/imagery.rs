//! Imagery backend client
//!
//! The remote geospatial backend filters collections and performs band algebra
//! plus region reduction server-side. Each call is one eager request/response
//! round trip; no expression graph is built locally.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::geometry::FarmGeometry;
use shared::indices::BandReflectance;
use shared::source::ImagerySource;
use shared::types::{DateRange, GpsCoordinates};
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// One image in a collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageDescriptor {
    pub id: String,
    pub source: ImagerySource,
    pub captured_at: DateTime<Utc>,
    /// Scene cloud cover, 0..100
    pub cloud_cover: f64,
}

/// Statistical reducer applied across images and pixels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    Mean,
    /// Mean with an NDVI standard-deviation companion
    MeanStdDev,
    Median,
}

/// Reduce a set of images over a region at a given scale
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReduceRequest {
    pub image_ids: Vec<String>,
    pub geometry: FarmGeometry,
    /// Closed ring for backends that want explicit polygons
    pub polygon: Vec<GpsCoordinates>,
    pub reducer: Reducer,
    pub scale_meters: u32,
    /// Mask cloud and shadow pixels before reducing
    pub cloud_mask: bool,
}

impl ReduceRequest {
    pub fn new(
        images: &[ImageDescriptor],
        geometry: FarmGeometry,
        reducer: Reducer,
        scale_meters: u32,
    ) -> Self {
        Self {
            image_ids: images.iter().map(|i| i.id.clone()).collect(),
            polygon: geometry.polygon(32),
            geometry,
            reducer,
            scale_meters,
            cloud_mask: true,
        }
    }
}

/// Reduced reflectance for a region
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegionReduction {
    pub bands: BandReflectance,
    /// Inter-image NDVI standard deviation, present for `MeanStdDev`
    pub ndvi_std_dev: Option<f64>,
    pub pixel_count: u64,
    pub valid_pixels: u64,
    /// True when cloud or shadow pixels were removed
    pub cloud_masked: bool,
}

/// Typed seam to the imagery backend
#[async_trait]
pub trait ImageryClient: Send + Sync {
    /// Images of `source` intersecting `geometry` in `range` with cloud cover
    /// below `cloud_ceiling`
    async fn query(
        &self,
        source: ImagerySource,
        geometry: &FarmGeometry,
        range: &DateRange,
        cloud_ceiling: f64,
    ) -> AppResult<Vec<ImageDescriptor>>;

    async fn reduce(&self, request: &ReduceRequest) -> AppResult<RegionReduction>;
}

#[derive(Debug, Serialize)]
struct QueryBody<'a> {
    collection: &'a str,
    geometry: &'a FarmGeometry,
    start_date: String,
    end_date: String,
    max_cloud_cover: f64,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    images: Vec<WireImage>,
}

#[derive(Debug, Deserialize)]
struct WireImage {
    id: String,
    /// Milliseconds since the epoch
    time_start: i64,
    cloud_cover: Option<f64>,
}

/// HTTP implementation of [`ImageryClient`]
#[derive(Clone)]
pub struct HttpImageryClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl HttpImageryClient {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("Imagery HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post<B: Serialize + ?Sized, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> AppResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ImageryBackend {
                status: Some(status.as_u16()),
                message: format!("{} - {}", status, body),
            });
        }

        response.json::<T>().await.map_err(|e| AppError::ImageryBackend {
            status: None,
            message: format!("Failed to parse imagery response: {}", e),
        })
    }
}

#[async_trait]
impl ImageryClient for HttpImageryClient {
    async fn query(
        &self,
        source: ImagerySource,
        geometry: &FarmGeometry,
        range: &DateRange,
        cloud_ceiling: f64,
    ) -> AppResult<Vec<ImageDescriptor>> {
        let body = QueryBody {
            collection: source.collection_id(),
            geometry,
            start_date: range.start.format("%Y-%m-%d").to_string(),
            end_date: range.end.format("%Y-%m-%d").to_string(),
            max_cloud_cover: cloud_ceiling,
        };
        let response: QueryResponse = self.post("/v1/collections/query", &body).await?;

        Ok(response
            .images
            .into_iter()
            .filter_map(|image| {
                let captured_at = DateTime::from_timestamp_millis(image.time_start)?;
                Some(ImageDescriptor {
                    id: image.id,
                    source,
                    captured_at,
                    cloud_cover: image.cloud_cover.unwrap_or(0.0).clamp(0.0, 100.0),
                })
            })
            .collect())
    }

    async fn reduce(&self, request: &ReduceRequest) -> AppResult<RegionReduction> {
        self.post("/v1/images/reduce", request).await
    }
}
