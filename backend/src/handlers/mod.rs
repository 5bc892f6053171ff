//! HTTP handlers

pub mod analysis;
pub mod health;

pub use analysis::{analyze_farm, analyze_grid, farm_history, grid_insights, grid_preview};
pub use health::health_check;
