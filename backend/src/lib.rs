//! Farm Grid Analysis - backend library
//!
//! Turns a farm's location and area into a zone-by-zone soil and vegetation
//! health report from satellite imagery, degrading to synthetic data rather
//! than failing when imagery is unavailable.

use axum::{routing::get, Router};
use std::{sync::Arc, time::Duration};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod routes;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};

use external::{HttpImageryClient, ImageryClient};
use services::{
    FallbackCascade, FarmAnalysisService, GridAnalysisService, ImageCollector, ObservationCache,
    ResilientCaller,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub grid_service: GridAnalysisService,
    pub farm_service: FarmAnalysisService,
    /// `None` when no imagery backend is configured
    pub resilience: Option<Arc<ResilientCaller>>,
    pub cache: ObservationCache,
}

impl AppState {
    /// Wire services from configuration, using the HTTP imagery client when
    /// credentials are present
    pub fn from_config(config: Config) -> AppResult<Self> {
        let client: Option<Arc<dyn ImageryClient>> = if config.imagery.is_configured() {
            let client = HttpImageryClient::new(
                config.imagery.api_key.clone(),
                config.imagery.api_endpoint.clone(),
                Duration::from_secs(config.imagery.request_timeout_secs),
            )?;
            Some(Arc::new(client))
        } else {
            tracing::warn!("Imagery backend not configured; analysis will use synthetic data");
            None
        };
        Ok(Self::with_client(config, client))
    }

    /// Wire services around an explicit imagery client
    pub fn with_client(config: Config, client: Option<Arc<dyn ImageryClient>>) -> Self {
        let cache = ObservationCache::new(&config.cache);

        let (collector, resilience) = match client {
            Some(client) => {
                let caller = Arc::new(ResilientCaller::new(
                    "imagery",
                    &config.resilience,
                    Duration::from_secs(config.imagery.request_timeout_secs),
                ));
                let collector = ImageCollector::new(
                    client,
                    caller.clone(),
                    cache.clone(),
                    config.compositing.clone(),
                    config.imagery.enabled_sources(),
                );
                (Some(collector), Some(caller))
            }
            None => (None, None),
        };

        let cascade = Arc::new(FallbackCascade::new(
            collector.clone(),
            config.cascade.clone(),
        ));

        Self {
            grid_service: GridAnalysisService::new(cascade.clone(), config.analysis.clone()),
            farm_service: FarmAnalysisService::new(cascade, collector),
            resilience,
            cache,
            config: Arc::new(config),
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Farm Grid Analysis API v1"
}
