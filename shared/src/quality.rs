//! Quality assessment and derived estimates for observations

use crate::indices::SpectralIndices;
use crate::models::SatelliteObservation;
use crate::season::NdviStatus;

pub const ISSUE_LOW_PIXEL_COUNT: &str = "Low pixel count";
pub const ISSUE_LOW_VALID_RATIO: &str = "Low valid pixel ratio";
pub const ISSUE_LOW_QUALITY_SCORE: &str = "Overall data quality score is low";
pub const ISSUE_HIGH_CLOUD: &str = "High cloud coverage";
pub const ISSUE_NDVI_NEAR_ZERO: &str = "NDVI unexpectedly low during growing season";
pub const ISSUE_NDVI_BELOW_SEASON: &str = "NDVI below seasonal expectation";
pub const ISSUE_TEMPERATURE_CLAMPED: &str =
    "Surface temperature estimate outside physical range (clamped)";

pub const MIN_PIXEL_COUNT: u64 = 100;
pub const MIN_VALID_RATIO: f64 = 0.5;
pub const MIN_QUALITY_SCORE: f64 = 60.0;
pub const MAX_CLOUD_COVERAGE: f64 = 50.0;

/// Issues that trigger the historical-average corrective blend
pub const BLEND_TRIGGERS: [&str; 3] = [
    ISSUE_LOW_PIXEL_COUNT,
    ISSUE_LOW_VALID_RATIO,
    ISSUE_LOW_QUALITY_SCORE,
];

/// Quality score for a composite of `image_count` images.
///
/// Base term penalizes cloud cover, plus up to 20 points for corroborating
/// images and up to 10 points for low inter-image NDVI spread.
pub fn composite_quality_score(avg_cloud_cover: f64, image_count: usize, ndvi_std_dev: f64) -> f64 {
    let cloud = avg_cloud_cover.clamp(0.0, 100.0);
    let base = 100.0 - cloud;
    let count_bonus = (3.0 * image_count as f64).min(20.0);
    let spread = if ndvi_std_dev.is_finite() {
        ndvi_std_dev.abs()
    } else {
        1.0
    };
    let variance_bonus = 0.1 * (100.0 - 100.0 * spread);
    (base + count_bonus + variance_bonus).clamp(0.0, 100.0)
}

/// Moisture percentage from NDMI and NDWI.
///
/// `(0.6 NDMI + 0.4 NDWI) * 100`, clamped to 0..100. When one index is
/// masked the other is used alone.
pub fn moisture_estimate(indices: &SpectralIndices) -> Option<f64> {
    let combined = match (indices.ndmi, indices.ndwi) {
        (Some(ndmi), Some(ndwi)) => 0.6 * ndmi + 0.4 * ndwi,
        (Some(ndmi), None) => ndmi,
        (None, Some(ndwi)) => ndwi,
        (None, None) => return None,
    };
    Some((combined * 100.0).clamp(0.0, 100.0))
}

pub const BASE_SURFACE_TEMP_C: f64 = 20.0;
pub const SURFACE_TEMP_RANGE_C: (f64, f64) = (-30.0, 60.0);

/// Surface temperature proxy and whether it had to be clamped.
///
/// An uncalibrated estimate from vegetation cover, not a thermal measurement.
pub fn surface_temperature_estimate(ndvi: Option<f64>) -> (Option<f64>, bool) {
    let Some(ndvi) = ndvi else {
        return (None, false);
    };
    let raw = BASE_SURFACE_TEMP_C + ((0.7 - ndvi) * 50.0).max(0.0);
    let (lo, hi) = SURFACE_TEMP_RANGE_C;
    let clamped = raw.clamp(lo, hi);
    (Some(clamped), clamped != raw)
}

/// Flag quality issues on an observation, in a fixed order
pub fn assess_quality(observation: &SatelliteObservation) -> Vec<String> {
    let mut issues = Vec::new();
    let pixel_count = observation.pixel_count();

    if pixel_count < MIN_PIXEL_COUNT {
        issues.push(ISSUE_LOW_PIXEL_COUNT.to_string());
    }
    let valid_ratio = observation.valid_pixels() as f64 / pixel_count.max(1) as f64;
    if valid_ratio < MIN_VALID_RATIO {
        issues.push(ISSUE_LOW_VALID_RATIO.to_string());
    }
    if observation.data_quality_score() < MIN_QUALITY_SCORE {
        issues.push(ISSUE_LOW_QUALITY_SCORE.to_string());
    }
    if observation.cloud_coverage_percent() > MAX_CLOUD_COVERAGE {
        issues.push(ISSUE_HIGH_CLOUD.to_string());
    }
    if observation.ndvi_status() == NdviStatus::UnexpectedLow {
        match observation.indices().ndvi {
            Some(v) if v.abs() < 0.05 => issues.push(ISSUE_NDVI_NEAR_ZERO.to_string()),
            _ => issues.push(ISSUE_NDVI_BELOW_SEASON.to_string()),
        }
    }

    issues
}

/// True when any issue calls for blending in historical data
pub fn needs_corrective_blend(issues: &[String]) -> bool {
    issues.iter().any(|i| BLEND_TRIGGERS.contains(&i.as_str()))
}

const ASSESSED_ISSUES: [&str; 6] = [
    ISSUE_LOW_PIXEL_COUNT,
    ISSUE_LOW_VALID_RATIO,
    ISSUE_LOW_QUALITY_SCORE,
    ISSUE_HIGH_CLOUD,
    ISSUE_NDVI_NEAR_ZERO,
    ISSUE_NDVI_BELOW_SEASON,
];

/// Issues after the observation's values changed.
///
/// Issues attached by other stages are kept; the ones [`assess_quality`]
/// produces are recomputed.
pub fn reassess_quality(observation: &SatelliteObservation) -> Vec<String> {
    let mut issues: Vec<String> = observation
        .quality_issues()
        .iter()
        .filter(|i| !ASSESSED_ISSUES.contains(&i.as_str()))
        .cloned()
        .collect();
    for issue in assess_quality(observation) {
        if !issues.contains(&issue) {
            issues.push(issue);
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ObservationBuilder;
    use chrono::{TimeZone, Utc};

    fn builder() -> ObservationBuilder {
        let captured = Utc.with_ymd_and_hms(2024, 7, 15, 16, 0, 0).unwrap();
        ObservationBuilder::new("zone-C", captured)
            .pixel_count(400)
            .valid_pixels(380)
            .cloud_coverage_percent(10.0)
            .data_quality_score(90.0)
    }

    #[test]
    fn test_composite_quality_score() {
        let score = composite_quality_score(40.0, 3, 0.05);
        assert!((score - (60.0 + 9.0 + 9.5)).abs() < 1e-9);
        assert_eq!(composite_quality_score(0.0, 8, 0.0), 100.0);
        assert_eq!(composite_quality_score(100.0, 0, 5.0), 0.0);
        let nan_spread = composite_quality_score(20.0, 1, f64::NAN);
        assert!((0.0..=100.0).contains(&nan_spread));
    }

    #[test]
    fn test_moisture_estimate_blends_and_clamps() {
        let indices = SpectralIndices {
            ndmi: Some(0.5),
            ndwi: Some(0.25),
            ..Default::default()
        };
        assert!((moisture_estimate(&indices).unwrap() - 40.0).abs() < 1e-9);
        let dry = SpectralIndices {
            ndmi: Some(-0.4),
            ndwi: Some(-0.6),
            ..Default::default()
        };
        assert_eq!(moisture_estimate(&dry), Some(0.0));
        let one_side = SpectralIndices {
            ndwi: Some(0.3),
            ..Default::default()
        };
        assert!((moisture_estimate(&one_side).unwrap() - 30.0).abs() < 1e-9);
        assert_eq!(moisture_estimate(&SpectralIndices::default()), None);
    }

    #[test]
    fn test_surface_temperature_proxy() {
        // Documented approximation, not a calibrated measurement
        assert_eq!(surface_temperature_estimate(Some(0.8)), (Some(20.0), false));
        let (t, clamped) = surface_temperature_estimate(Some(0.2));
        assert!((t.unwrap() - 45.0).abs() < 1e-9);
        assert!(!clamped);
        assert_eq!(surface_temperature_estimate(Some(-1.0)), (Some(60.0), true));
        assert_eq!(surface_temperature_estimate(None), (None, false));
    }

    #[test]
    fn test_clean_observation_has_no_issues() {
        let observation = builder().ndvi(Some(0.6)).build();
        assert!(assess_quality(&observation).is_empty());
    }

    #[test]
    fn test_flags_are_additive() {
        let observation = builder()
            .pixel_count(50)
            .valid_pixels(10)
            .data_quality_score(40.0)
            .cloud_coverage_percent(70.0)
            .build();
        let issues = assess_quality(&observation);
        assert_eq!(
            issues,
            vec![
                ISSUE_LOW_PIXEL_COUNT,
                ISSUE_LOW_VALID_RATIO,
                ISSUE_LOW_QUALITY_SCORE,
                ISSUE_HIGH_CLOUD
            ]
        );
        assert!(needs_corrective_blend(&issues));
        assert!(!needs_corrective_blend(&[ISSUE_HIGH_CLOUD.to_string()]));
    }

    #[test]
    fn test_ndvi_flags_follow_status() {
        let near_zero = builder()
            .ndvi(Some(0.02))
            .ndvi_status(NdviStatus::UnexpectedLow)
            .build();
        assert_eq!(assess_quality(&near_zero), vec![ISSUE_NDVI_NEAR_ZERO]);

        let low = builder()
            .ndvi(Some(0.15))
            .ndvi_status(NdviStatus::UnexpectedLow)
            .build();
        assert_eq!(assess_quality(&low), vec![ISSUE_NDVI_BELOW_SEASON]);

        let dormant = builder()
            .ndvi(Some(0.15))
            .ndvi_status(NdviStatus::ExpectedLow)
            .build();
        assert!(assess_quality(&dormant).is_empty());
    }

    #[test]
    fn test_reassess_keeps_foreign_issues() {
        let observation = builder()
            .data_quality_score(40.0)
            .quality_issue(ISSUE_LOW_QUALITY_SCORE)
            .quality_issue("NDVI outside valid range (masked)")
            .build();
        let improved = observation.to_builder().data_quality_score(75.0).build();
        assert_eq!(
            reassess_quality(&improved),
            vec!["NDVI outside valid range (masked)".to_string()]
        );
    }
}
