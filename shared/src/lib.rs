//! Shared domain model and algorithms for farm grid analysis
//!
//! Everything here is pure and I/O-free so it can run in the backend and, via
//! WASM, in the dashboard. Network access, caching and retries live in the
//! backend crate.

pub mod aggregate;
pub mod estimates;
pub mod geometry;
pub mod grid;
pub mod indices;
pub mod models;
pub mod quality;
pub mod scoring;
pub mod season;
pub mod source;
pub mod trend;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
