//! Geometry engine
//!
//! Converts a point plus an area into the shapes imagery is reduced over, and
//! converts between meters and degrees using a flat-earth approximation that is
//! accurate enough at farm scale.

use serde::{Deserialize, Serialize};

use crate::types::{Bounds, GpsCoordinates};

/// Meters per degree of latitude
pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

pub const SQUARE_METERS_PER_HECTARE: f64 = 10_000.0;

/// Smallest buffer radius: one Landsat pixel
pub const MIN_BUFFER_RADIUS_M: f64 = 30.0;

/// Landsat pixel footprint (30 m x 30 m) in hectares
pub const LANDSAT_PIXEL_HECTARES: f64 = 0.09;

// Keeps the longitude scale finite at the poles.
const MIN_COS_LATITUDE: f64 = 1e-6;

/// Meters per degree of longitude at the given latitude
pub fn meters_per_degree_lng(latitude: f64) -> f64 {
    METERS_PER_DEGREE_LAT * latitude.to_radians().cos().abs().max(MIN_COS_LATITUDE)
}

/// Convert a distance in meters to (latitude degrees, longitude degrees)
pub fn meters_to_degrees(meters: f64, latitude: f64) -> (f64, f64) {
    (
        meters / METERS_PER_DEGREE_LAT,
        meters / meters_per_degree_lng(latitude),
    )
}

/// Euclidean distance in meters for a degree offset at the given latitude
pub fn degrees_to_meters(lat_degrees: f64, lng_degrees: f64, latitude: f64) -> f64 {
    let lat_m = lat_degrees * METERS_PER_DEGREE_LAT;
    let lng_m = lng_degrees * meters_per_degree_lng(latitude);
    (lat_m * lat_m + lng_m * lng_m).sqrt()
}

/// Radius of a circle with the given area, floored at one Landsat pixel
pub fn buffer_radius_m(area_hectares: f64) -> f64 {
    let area_m2 = area_hectares.max(0.0) * SQUARE_METERS_PER_HECTARE;
    (area_m2 / std::f64::consts::PI).sqrt().max(MIN_BUFFER_RADIUS_M)
}

/// Region an imagery reduction runs over
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FarmGeometry {
    /// Buffered point (whole-farm analysis)
    Circle {
        center: GpsCoordinates,
        radius_m: f64,
    },
    /// Grid zone
    Rectangle { bounds: Bounds },
}

impl FarmGeometry {
    pub fn circle(center: GpsCoordinates, radius_m: f64) -> Self {
        FarmGeometry::Circle { center, radius_m }
    }

    pub fn rectangle(bounds: Bounds) -> Self {
        FarmGeometry::Rectangle { bounds }
    }

    pub fn center(&self) -> GpsCoordinates {
        match self {
            FarmGeometry::Circle { center, .. } => *center,
            FarmGeometry::Rectangle { bounds } => bounds.center(),
        }
    }

    pub fn bounding_box(&self) -> Bounds {
        match self {
            FarmGeometry::Circle { center, radius_m } => {
                let (dlat, dlng) = meters_to_degrees(*radius_m, center.latitude);
                Bounds {
                    north: center.latitude + dlat,
                    south: center.latitude - dlat,
                    east: center.longitude + dlng,
                    west: center.longitude - dlng,
                }
            }
            FarmGeometry::Rectangle { bounds } => *bounds,
        }
    }

    /// Closed polygon ring (first vertex repeated last), counter-clockwise.
    ///
    /// Circles are approximated with `segments` vertices (minimum 8).
    pub fn polygon(&self, segments: usize) -> Vec<GpsCoordinates> {
        match self {
            FarmGeometry::Circle { center, radius_m } => {
                let segments = segments.max(8);
                let (dlat, dlng) = meters_to_degrees(*radius_m, center.latitude);
                let mut ring: Vec<GpsCoordinates> = (0..segments)
                    .map(|i| {
                        let theta = std::f64::consts::TAU * i as f64 / segments as f64;
                        GpsCoordinates::new(
                            center.latitude + dlat * theta.sin(),
                            center.longitude + dlng * theta.cos(),
                        )
                    })
                    .collect();
                ring.push(ring[0]);
                ring
            }
            FarmGeometry::Rectangle { bounds } => vec![
                GpsCoordinates::new(bounds.south, bounds.west),
                GpsCoordinates::new(bounds.south, bounds.east),
                GpsCoordinates::new(bounds.north, bounds.east),
                GpsCoordinates::new(bounds.north, bounds.west),
                GpsCoordinates::new(bounds.south, bounds.west),
            ],
        }
    }

    /// Stable textual form (6 decimal places, ~0.1 m) used in cache keys
    pub fn signature(&self) -> String {
        match self {
            FarmGeometry::Circle { center, radius_m } => format!(
                "circle:{:.6},{:.6}:r{:.1}",
                center.latitude, center.longitude, radius_m
            ),
            FarmGeometry::Rectangle { bounds } => format!(
                "rect:{:.6},{:.6},{:.6},{:.6}",
                bounds.north, bounds.south, bounds.east, bounds.west
            ),
        }
    }
}

/// How many Landsat pixels cover a farm
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PixelCoverage {
    pub pixel_count: u64,
    pub coverage_area_hectares: f64,
    pub center: GpsCoordinates,
    /// NW, NE, SE, SW corners of the circle's bounding box
    pub corners: [GpsCoordinates; 4],
}

/// Pixel coverage for a roughly circular farm
pub fn pixel_coverage(latitude: f64, longitude: f64, area_hectares: f64) -> PixelCoverage {
    let area_hectares = area_hectares.max(0.0);
    let pixel_count = (area_hectares / LANDSAT_PIXEL_HECTARES).ceil() as u64;
    let radius_m = (area_hectares * SQUARE_METERS_PER_HECTARE / std::f64::consts::PI).sqrt();
    let (dlat, dlng) = meters_to_degrees(radius_m, latitude);

    PixelCoverage {
        pixel_count,
        coverage_area_hectares: pixel_count as f64 * LANDSAT_PIXEL_HECTARES,
        center: GpsCoordinates::new(latitude, longitude),
        corners: [
            GpsCoordinates::new(latitude + dlat, longitude - dlng),
            GpsCoordinates::new(latitude + dlat, longitude + dlng),
            GpsCoordinates::new(latitude - dlat, longitude + dlng),
            GpsCoordinates::new(latitude - dlat, longitude - dlng),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meters_to_degrees_at_equator() {
        let (dlat, dlng) = meters_to_degrees(111_320.0, 0.0);
        assert!((dlat - 1.0).abs() < 1e-9);
        assert!((dlng - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_longitude_degrees_widen_with_latitude() {
        let (_, at_equator) = meters_to_degrees(1000.0, 0.0);
        let (_, at_sixty) = meters_to_degrees(1000.0, 60.0);
        assert!((at_sixty / at_equator - 2.0).abs() < 1e-6);
        let (_, at_pole) = meters_to_degrees(1000.0, 90.0);
        assert!(at_pole.is_finite());
    }

    #[test]
    fn test_degrees_to_meters_roundtrip_distance() {
        let (dlat, dlng) = meters_to_degrees(500.0, 41.9);
        let back = degrees_to_meters(dlat, 0.0, 41.9);
        assert!((back - 500.0).abs() < 1e-6);
        let diagonal = degrees_to_meters(dlat, dlng, 41.9);
        assert!((diagonal - 500.0 * 2f64.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_buffer_radius_floor() {
        assert_eq!(buffer_radius_m(0.1), MIN_BUFFER_RADIUS_M);
        let r = buffer_radius_m(100.0);
        assert!((r - (1_000_000.0 / std::f64::consts::PI).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_circle_polygon_is_closed() {
        let geometry = FarmGeometry::circle(GpsCoordinates::new(30.0, 31.0), 200.0);
        let ring = geometry.polygon(16);
        assert_eq!(ring.len(), 17);
        assert_eq!(ring.first(), ring.last());
        let bbox = geometry.bounding_box();
        assert!(bbox.is_well_formed());
        assert!(ring.iter().all(|p| {
            p.latitude <= bbox.north + 1e-12 && p.latitude >= bbox.south - 1e-12
        }));
    }

    #[test]
    fn test_pixel_coverage() {
        let coverage = pixel_coverage(30.0, 31.0, 1.0);
        assert_eq!(coverage.pixel_count, 12);
        assert!((coverage.coverage_area_hectares - 1.08).abs() < 1e-9);
        assert!(coverage.corners[0].latitude > coverage.corners[3].latitude);
        assert!(coverage.corners[1].longitude > coverage.corners[0].longitude);
    }

    proptest::proptest! {
        #[test]
        fn prop_lat_offset_round_trips(meters in 0.0f64..50_000.0, latitude in -80.0f64..80.0) {
            let (dlat, _) = meters_to_degrees(meters, latitude);
            let back = degrees_to_meters(dlat, 0.0, latitude);
            proptest::prop_assert!((back - meters).abs() < 1e-6);
        }

        #[test]
        fn prop_polygon_stays_near_radius(radius in 30.0f64..2_000.0, latitude in -60.0f64..60.0) {
            let center = GpsCoordinates::new(latitude, 10.0);
            let geometry = FarmGeometry::circle(center, radius);
            for point in geometry.polygon(16) {
                let d = degrees_to_meters(
                    point.latitude - center.latitude,
                    point.longitude - center.longitude,
                    latitude,
                );
                proptest::prop_assert!((d - radius).abs() < radius * 1e-6 + 1e-6);
            }
        }
    }
}
