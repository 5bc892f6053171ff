//! Seasonal context
//!
//! Buckets a capture date into a hemisphere-aware season and growing phase,
//! and interprets NDVI against that phase.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Below this NDVI vegetation is sparse
pub const LOW_NDVI_THRESHOLD: f64 = 0.2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GrowingPhase {
    Planting,
    Growing,
    Harvest,
    Dormant,
}

impl GrowingPhase {
    pub fn is_growing(&self) -> bool {
        matches!(self, GrowingPhase::Planting | GrowingPhase::Growing)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Hemisphere {
    Northern,
    Southern,
}

/// NDVI interpreted against the growing phase
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NdviStatus {
    #[default]
    Normal,
    /// Low NDVI outside the growing phase (dormancy)
    ExpectedLow,
    /// Low NDVI while crops should be growing (stress signal)
    UnexpectedLow,
}

impl NdviStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NdviStatus::Normal => "normal",
            NdviStatus::ExpectedLow => "expected_low",
            NdviStatus::UnexpectedLow => "unexpected_low",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeasonalContext {
    pub season: Season,
    pub growing_phase: GrowingPhase,
    pub hemisphere: Hemisphere,
    /// Day of year, shifted half a year for the southern hemisphere
    pub day_of_year: u32,
    pub days_since_optimal_planting: u32,
    pub days_until_harvest: u32,
}

impl SeasonalContext {
    pub fn is_growing_season(&self) -> bool {
        self.growing_phase.is_growing()
    }
}

/// Seasonal context for a capture date at a latitude
pub fn seasonal_context(date: NaiveDate, latitude: f64) -> SeasonalContext {
    let northern = latitude >= 0.0;
    let mut day_of_year = date.ordinal();
    if !northern {
        day_of_year = (day_of_year + 182) % 365;
    }

    let (season, growing_phase) = match day_of_year {
        60..=150 => (Season::Spring, GrowingPhase::Planting),
        151..=243 => (Season::Summer, GrowingPhase::Growing),
        244..=334 => (Season::Fall, GrowingPhase::Harvest),
        _ => (Season::Winter, GrowingPhase::Dormant),
    };

    let (optimal_planting, optimal_harvest) = if northern { (75, 258) } else { (258, 75) };

    SeasonalContext {
        season,
        growing_phase,
        hemisphere: if northern {
            Hemisphere::Northern
        } else {
            Hemisphere::Southern
        },
        day_of_year,
        days_since_optimal_planting: day_of_year.abs_diff(optimal_planting),
        days_until_harvest: day_of_year.abs_diff(optimal_harvest),
    }
}

/// Interpret NDVI; a masked value is treated as normal
pub fn interpret_ndvi(ndvi: Option<f64>, context: &SeasonalContext) -> NdviStatus {
    match ndvi {
        Some(v) if v < LOW_NDVI_THRESHOLD => {
            if context.is_growing_season() {
                NdviStatus::UnexpectedLow
            } else {
                NdviStatus::ExpectedLow
            }
        }
        _ => NdviStatus::Normal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    #[test]
    fn test_northern_seasons() {
        assert_eq!(seasonal_context(date(7, 15), 41.9).season, Season::Summer);
        assert_eq!(seasonal_context(date(4, 1), 41.9).season, Season::Spring);
        assert_eq!(seasonal_context(date(10, 1), 41.9).season, Season::Fall);
        assert_eq!(seasonal_context(date(1, 10), 41.9).season, Season::Winter);
    }

    #[test]
    fn test_southern_hemisphere_is_mirrored() {
        let ctx = seasonal_context(date(7, 15), -33.9);
        assert_eq!(ctx.hemisphere, Hemisphere::Southern);
        assert_eq!(ctx.season, Season::Winter);
        assert!(!ctx.is_growing_season());
        assert_eq!(seasonal_context(date(1, 10), -33.9).season, Season::Summer);
    }

    #[test]
    fn test_ndvi_interpretation() {
        let july = seasonal_context(date(7, 15), 41.9);
        let january = seasonal_context(date(1, 15), 41.9);
        assert_eq!(interpret_ndvi(Some(0.15), &july), NdviStatus::UnexpectedLow);
        assert_eq!(interpret_ndvi(Some(0.15), &january), NdviStatus::ExpectedLow);
        assert_eq!(interpret_ndvi(Some(0.5), &july), NdviStatus::Normal);
        assert_eq!(interpret_ndvi(None, &july), NdviStatus::Normal);
    }

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&NdviStatus::UnexpectedLow).unwrap();
        assert_eq!(json, "\"unexpected_low\"");
    }
}
