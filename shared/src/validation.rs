//! Validation utilities for farm analysis inputs
//!
//! Pure checks shared by the backend request handlers and the WASM bindings.
//! Analysis algorithms themselves never fail; they clamp or mask instead.

use thiserror::Error;

use crate::types::GridSize;

/// Largest grid the planner will build for a custom request
pub const MAX_GRID_DIMENSION: usize = 10;

/// Input validation failures
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Latitude must be between -90 and 90, got {0}")]
    LatitudeOutOfRange(f64),

    #[error("Longitude must be between -180 and 180, got {0}")]
    LongitudeOutOfRange(f64),

    #[error("Farm area must be a positive finite number of hectares, got {0}")]
    InvalidArea(f64),

    #[error("Cloud ceiling must be between 0 and 100 percent, got {0}")]
    InvalidCloudCeiling(f64),

    #[error("Grid size must be between 1x1 and {max}x{max}, got {rows}x{cols}")]
    InvalidGridSize { rows: usize, cols: usize, max: usize },
}

impl ValidationError {
    /// Name of the offending input field
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::LatitudeOutOfRange(_) => "latitude",
            ValidationError::LongitudeOutOfRange(_) => "longitude",
            ValidationError::InvalidArea(_) => "area_hectares",
            ValidationError::InvalidCloudCeiling(_) => "max_cloud_cover",
            ValidationError::InvalidGridSize { .. } => "grid_size",
        }
    }
}

/// Validate a WGS84 coordinate pair
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), ValidationError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(ValidationError::LatitudeOutOfRange(latitude));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(ValidationError::LongitudeOutOfRange(longitude));
    }
    Ok(())
}

/// Validate a farm area. Small positive areas are accepted and clamped later.
pub fn validate_area_hectares(area_hectares: f64) -> Result<(), ValidationError> {
    if !area_hectares.is_finite() || area_hectares <= 0.0 {
        return Err(ValidationError::InvalidArea(area_hectares));
    }
    Ok(())
}

/// Validate a maximum cloud-cover percentage
pub fn validate_cloud_ceiling(max_cloud_cover: f64) -> Result<(), ValidationError> {
    if !max_cloud_cover.is_finite() || !(0.0..=100.0).contains(&max_cloud_cover) {
        return Err(ValidationError::InvalidCloudCeiling(max_cloud_cover));
    }
    Ok(())
}

/// Validate a custom grid size
pub fn validate_grid_size(size: GridSize) -> Result<(), ValidationError> {
    let in_range = |n: usize| (1..=MAX_GRID_DIMENSION).contains(&n);
    if !in_range(size.rows) || !in_range(size.cols) {
        return Err(ValidationError::InvalidGridSize {
            rows: size.rows,
            cols: size.cols,
            max: MAX_GRID_DIMENSION,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates() {
        assert!(validate_coordinates(41.8781, -87.6298).is_ok());
        assert!(validate_coordinates(-33.9, 151.2).is_ok());
        assert_eq!(
            validate_coordinates(91.0, 0.0),
            Err(ValidationError::LatitudeOutOfRange(91.0))
        );
        assert!(validate_coordinates(0.0, 181.0).is_err());
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_area() {
        assert!(validate_area_hectares(0.05).is_ok());
        assert!(validate_area_hectares(0.0).is_err());
        assert!(validate_area_hectares(-3.0).is_err());
        assert!(validate_area_hectares(f64::INFINITY).is_err());
    }

    #[test]
    fn test_cloud_ceiling_and_grid_size() {
        assert!(validate_cloud_ceiling(20.0).is_ok());
        assert!(validate_cloud_ceiling(100.5).is_err());
        assert!(validate_grid_size(GridSize::new(3, 4)).is_ok());
        let err = validate_grid_size(GridSize::new(0, 4)).unwrap_err();
        assert_eq!(err.field(), "grid_size");
    }
}
