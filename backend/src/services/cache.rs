//! TTL cache in front of the image collector
//!
//! Keys are hashes of geometry, date range, cloud ceiling and sources, so
//! zones sharing a window never collide. Empty collection results are cached
//! as `None` to avoid re-querying a window known to be empty.

use moka::future::Cache;
use sha2::{Digest, Sha256};
use shared::geometry::FarmGeometry;
use shared::models::SatelliteObservation;
use shared::source::ImagerySource;
use shared::types::DateRange;
use std::time::Duration;

use crate::config::CacheConfig;

/// Cached outcome of one collection attempt
pub type CachedCollection = Option<SatelliteObservation>;

#[derive(Clone)]
pub struct ObservationCache {
    inner: Cache<String, CachedCollection>,
}

impl ObservationCache {
    pub fn new(config: &CacheConfig) -> Self {
        tracing::info!(
            "Initializing observation cache (ttl {}h, capacity {})",
            config.ttl_hours,
            config.max_capacity
        );
        let inner = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(Duration::from_secs(config.ttl_hours * 3600))
            .build();
        Self { inner }
    }

    /// Cache key for a collection attempt
    pub fn key(
        geometry: &FarmGeometry,
        range: &DateRange,
        cloud_ceiling: f64,
        sources: &[ImagerySource],
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(geometry.signature().as_bytes());
        hasher.update(b"|");
        hasher.update(range.signature().as_bytes());
        hasher.update(format!("|cc{:.1}|", cloud_ceiling).as_bytes());
        for source in sources {
            hasher.update(source.collection_id().as_bytes());
            hasher.update(b",");
        }
        format!("{:x}", hasher.finalize())
    }

    pub async fn get(&self, key: &str) -> Option<CachedCollection> {
        let hit = self.inner.get(key).await;
        if hit.is_some() {
            tracing::debug!("Cache hit for {}", &key[..12.min(key.len())]);
        } else {
            tracing::debug!("Cache miss for {}", &key[..12.min(key.len())]);
        }
        hit
    }

    pub async fn insert(&self, key: String, value: CachedCollection) {
        self.inner.insert(key, value).await;
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}
