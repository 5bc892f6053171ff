//! Configuration management for the farm grid analysis service
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with FGA_ prefix (`FGA_IMAGERY__API_KEY`)

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::source::ImagerySource;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub imagery: ImageryConfig,

    #[serde(default)]
    pub compositing: CompositingConfig,

    #[serde(default)]
    pub cascade: CascadeConfig,

    #[serde(default)]
    pub resilience: ResilienceConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,
}

fn default_environment() -> String {
    "development".to_string()
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Remote imagery backend
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ImageryConfig {
    pub api_endpoint: String,

    /// Empty means no backend: every observation is synthetic
    pub api_key: String,

    /// Collection ids that may be queried
    pub sources: Vec<String>,

    /// Per-call timeout
    pub request_timeout_secs: u64,
}

impl ImageryConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.api_endpoint.trim().is_empty()
    }

    /// Known sources from `sources`; unknown ids are skipped
    pub fn enabled_sources(&self) -> Vec<ImagerySource> {
        self.sources
            .iter()
            .filter_map(|id| {
                let source = ImagerySource::from_collection_id(id.trim());
                if source.is_none() {
                    tracing::warn!("Ignoring unknown imagery source {}", id);
                }
                source
            })
            .collect()
    }
}

/// Thresholds of the compositing decision tree
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CompositingConfig {
    /// Cloud ceiling at or below which a single image is tried first
    pub single_image_max_cloud: f64,
    pub single_image_early_exit: f64,
    pub small_batch_size: usize,
    pub small_batch_accept: f64,
    pub large_batch_size: usize,
}

/// Widening search windows and the historical blend
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CascadeConfig {
    pub default_cloud_ceiling: f64,
    pub windows_days: Vec<i64>,
    pub historical_months: u32,
    /// Weight of the historical NDVI average in the blend
    pub historical_blend_weight: f64,
    pub synthetic_quality_score: f64,
}

impl CascadeConfig {
    /// Cloud ceiling for the `attempt`-th window: C, then 2C, ..., and 100 % for the last
    pub fn cloud_ceiling_for(&self, attempt: usize, base: f64) -> f64 {
        if attempt + 1 >= self.windows_days.len() {
            100.0
        } else {
            (base * 2f64.powi(attempt as i32)).min(100.0)
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ResilienceConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub open_cooldown_secs: u64,
    pub half_open_max_calls: u32,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_hours: u64,
    pub max_capacity: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Zone pipelines in flight per farm
    pub max_concurrent_zones: usize,
    pub problem_zone_threshold: f64,
    pub history_months: u32,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("FGA_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            .set_default("environment", environment.clone())?
            .set_default("server.port", 8000)?
            .set_default("server.host", "0.0.0.0")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (FGA_ prefix)
            .add_source(
                Environment::with_prefix("FGA")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("imagery.sources")
                    .with_list_parse_key("cascade.windows_days")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cascade.windows_days.is_empty() {
            return Err(ConfigError::Message(
                "cascade.windows_days must list at least one window".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.cascade.historical_blend_weight) {
            return Err(ConfigError::Message(
                "cascade.historical_blend_weight must be between 0 and 1".into(),
            ));
        }
        if self.analysis.max_concurrent_zones == 0 {
            return Err(ConfigError::Message(
                "analysis.max_concurrent_zones must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            server: ServerConfig::default(),
            imagery: ImageryConfig::default(),
            compositing: CompositingConfig::default(),
            cascade: CascadeConfig::default(),
            resilience: ResilienceConfig::default(),
            cache: CacheConfig::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for ImageryConfig {
    fn default() -> Self {
        Self {
            api_endpoint: String::new(),
            api_key: String::new(),
            sources: ImagerySource::ALL
                .iter()
                .map(|s| s.collection_id().to_string())
                .collect(),
            request_timeout_secs: 30,
        }
    }
}

impl Default for CompositingConfig {
    fn default() -> Self {
        Self {
            single_image_max_cloud: 5.0,
            single_image_early_exit: 95.0,
            small_batch_size: 3,
            small_batch_accept: 85.0,
            large_batch_size: 8,
        }
    }
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            default_cloud_ceiling: 20.0,
            windows_days: vec![30, 90, 365],
            historical_months: 12,
            historical_blend_weight: 0.5,
            synthetic_quality_score: 30.0,
        }
    }
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            success_threshold: 2,
            open_cooldown_secs: 120,
            half_open_max_calls: 3,
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 24,
            max_capacity: 10_000,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_concurrent_zones: 4,
            problem_zone_threshold: 55.0,
            history_months: 12,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_heuristics() {
        let config = Config::default();
        assert_eq!(config.compositing.single_image_max_cloud, 5.0);
        assert_eq!(config.compositing.small_batch_size, 3);
        assert_eq!(config.compositing.large_batch_size, 8);
        assert_eq!(config.cascade.windows_days, vec![30, 90, 365]);
        assert_eq!(config.resilience.failure_threshold, 3);
        assert!(!config.imagery.is_configured());
        assert_eq!(config.imagery.enabled_sources().len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cloud_ceiling_widening() {
        let cascade = CascadeConfig::default();
        assert_eq!(cascade.cloud_ceiling_for(0, 20.0), 20.0);
        assert_eq!(cascade.cloud_ceiling_for(1, 20.0), 40.0);
        assert_eq!(cascade.cloud_ceiling_for(2, 20.0), 100.0);
        assert_eq!(cascade.cloud_ceiling_for(1, 70.0), 100.0);
    }

    #[test]
    fn test_validate_rejects_bad_weight() {
        let mut config = Config::default();
        config.cascade.historical_blend_weight = 1.5;
        assert!(config.validate().is_err());
    }
}
