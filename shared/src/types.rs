//! Common types used across the platform

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// GPS coordinates in decimal degrees
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GpsCoordinates {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lng")]
    pub longitude: f64,
}

impl GpsCoordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Axis-aligned bounding box in decimal degrees
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Bounds {
    pub fn center(&self) -> GpsCoordinates {
        GpsCoordinates::new((self.north + self.south) / 2.0, (self.east + self.west) / 2.0)
    }

    pub fn height_degrees(&self) -> f64 {
        self.north - self.south
    }

    pub fn width_degrees(&self) -> f64 {
        self.east - self.west
    }

    /// True when south < north and west < east
    pub fn is_well_formed(&self) -> bool {
        self.south < self.north && self.west < self.east
    }

    pub fn contains(&self, point: &GpsCoordinates) -> bool {
        point.latitude >= self.south
            && point.latitude <= self.north
            && point.longitude >= self.west
            && point.longitude <= self.east
    }
}

/// Grid dimensions (rows run north to south, columns west to east)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GridSize {
    pub rows: usize,
    pub cols: usize,
}

impl GridSize {
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn zone_count(&self) -> usize {
        self.rows * self.cols
    }
}

impl std::fmt::Display for GridSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// Inclusive date range for imagery queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// The `days`-long window that ends on `end`
    pub fn ending_at(end: NaiveDate, days: i64) -> Self {
        Self::new(end - Duration::days(days.max(0)), end)
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Stable textual form used in cache keys
    pub fn signature(&self) -> String {
        format!("{}..{}", self.start.format("%Y-%m-%d"), self.end.format("%Y-%m-%d"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_range_normalizes_order() {
        let a = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let range = DateRange::new(a, b);
        assert_eq!(range.start, b);
        assert_eq!(range.end, a);
        assert_eq!(range.days(), 30);
    }

    #[test]
    fn test_date_range_ending_at() {
        let end = NaiveDate::from_ymd_opt(2024, 7, 15).unwrap();
        let range = DateRange::ending_at(end, 90);
        assert_eq!(range.days(), 90);
        assert_eq!(range.signature(), "2024-04-16..2024-07-15");
    }

    #[test]
    fn test_bounds_center_and_shape() {
        let bounds = Bounds {
            north: 1.0,
            south: -1.0,
            east: 3.0,
            west: 1.0,
        };
        assert!(bounds.is_well_formed());
        assert_eq!(bounds.center(), GpsCoordinates::new(0.0, 2.0));
        assert!(bounds.contains(&GpsCoordinates::new(0.5, 2.5)));
        assert!(!bounds.contains(&GpsCoordinates::new(1.5, 2.5)));
    }
}
