//! Analysis services for the farm grid analysis backend

pub mod cache;
pub mod cascade;
pub mod collector;
pub mod grid_analysis;
pub mod resilience;
pub mod satellite;

pub use cache::ObservationCache;
pub use cascade::{FallbackCascade, ObservationRequest};
pub use collector::{CollectionRequest, ImageCollector};
pub use grid_analysis::{GridAnalysisService, GridInsights, ZoneInsight};
pub use resilience::{CircuitBreaker, CircuitState, CircuitStats, ResilientCaller, RetryPolicy};
pub use satellite::{FarmAnalysisReport, FarmAnalysisService, FarmHistory, HistoryPoint};
