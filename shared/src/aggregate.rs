//! Grid aggregation: farm score, heatmap, problem zones and spread statistics

use serde::{Deserialize, Serialize};

use crate::models::ZoneAnalysisResult;
use crate::types::GridSize;

/// Zones scoring below this are problem zones
pub const DEFAULT_PROBLEM_THRESHOLD: f64 = 55.0;

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Area-weighted mean of zone scores, or a simple mean when any area is missing
pub fn overall_health(zones: &[ZoneAnalysisResult]) -> f64 {
    if zones.is_empty() {
        return 0.0;
    }

    let areas: Option<Vec<f64>> = zones.iter().map(|z| z.area_hectares).collect();
    if let Some(areas) = areas {
        let total: f64 = areas.iter().sum();
        if total > 0.0 {
            let weighted: f64 = zones
                .iter()
                .zip(&areas)
                .map(|(z, a)| z.health_score * a)
                .sum();
            return round1(weighted / total);
        }
    }

    let sum: f64 = zones.iter().map(|z| z.health_score).sum();
    round1(sum / zones.len() as f64)
}

/// Row-major matrix of zone scores; unfilled cells are 0
pub fn create_heatmap(zones: &[ZoneAnalysisResult], size: GridSize) -> Vec<Vec<f64>> {
    let mut heatmap = vec![vec![0.0; size.cols]; size.rows];
    for zone in zones {
        if let Some(cell) = heatmap.get_mut(zone.row).and_then(|r| r.get_mut(zone.col)) {
            *cell = zone.health_score;
        }
    }
    heatmap
}

/// Ids of zones scoring below `threshold`, in input order
pub fn identify_problem_zones(zones: &[ZoneAnalysisResult], threshold: f64) -> Vec<String> {
    zones
        .iter()
        .filter(|z| z.health_score < threshold)
        .map(|z| z.zone_id.clone())
        .collect()
}

/// Spread of zone scores across the farm
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SpatialVariability {
    pub coefficient_of_variation: f64,
    pub range: f64,
    /// 100 = perfectly even, 0 = highly variable
    pub uniformity_score: f64,
    pub std_dev: f64,
    pub mean: f64,
}

pub fn spatial_variability(scores: &[f64]) -> SpatialVariability {
    if scores.len() < 2 {
        return SpatialVariability {
            coefficient_of_variation: 0.0,
            range: 0.0,
            uniformity_score: 100.0,
            std_dev: 0.0,
            mean: scores.first().copied().map(round1).unwrap_or(0.0),
        };
    }

    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();
    let cv = if mean > 0.0 { std_dev / mean * 100.0 } else { 0.0 };
    let max = scores.iter().copied().fold(f64::MIN, f64::max);
    let min = scores.iter().copied().fold(f64::MAX, f64::min);

    SpatialVariability {
        coefficient_of_variation: round1(cv),
        range: round1(max - min),
        uniformity_score: round1((100.0 - cv).max(0.0)),
        std_dev: round1(std_dev),
        mean: round1(mean),
    }
}

/// Summary statistics over a set of values, skipping masked and NaN entries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ZoneStatistics {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub valid_count: usize,
    pub total_count: usize,
    /// Valid ratio (60 %) and consistency (40 %) on a 0..100 scale
    pub quality_score: f64,
}

pub fn zone_statistics(values: &[Option<f64>]) -> ZoneStatistics {
    let mut valid: Vec<f64> = values
        .iter()
        .flatten()
        .copied()
        .filter(|v| !v.is_nan())
        .collect();

    if valid.is_empty() {
        return ZoneStatistics {
            mean: 0.0,
            std_dev: 0.0,
            min: 0.0,
            max: 0.0,
            median: 0.0,
            valid_count: 0,
            total_count: values.len(),
            quality_score: 0.0,
        };
    }

    valid.sort_by(f64::total_cmp);
    let n = valid.len();
    let mean = valid.iter().sum::<f64>() / n as f64;
    let std_dev = if n > 1 {
        (valid.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
    } else {
        0.0
    };
    let mid = n / 2;
    let median = if n % 2 == 0 {
        (valid[mid - 1] + valid[mid]) / 2.0
    } else {
        valid[mid]
    };

    let valid_ratio = n as f64 / values.len() as f64;
    let relative_spread = if mean != 0.0 { std_dev / mean.abs() } else { 0.0 };
    let consistency = 1.0 - relative_spread.min(1.0);

    ZoneStatistics {
        mean,
        std_dev,
        min: valid[0],
        max: valid[n - 1],
        median,
        valid_count: n,
        total_count: values.len(),
        quality_score: (valid_ratio * 0.6 + consistency * 0.4) * 100.0,
    }
}

/// Plain-text summary for the farmer, listing up to three problem zones
pub fn farmer_summary(overall_health: f64, problem_zones: &[&ZoneAnalysisResult]) -> String {
    let headline = if overall_health >= 75.0 {
        "Your farm is healthy!"
    } else if overall_health >= 55.0 {
        "Your farm is doing okay, but some areas need attention."
    } else if overall_health >= 35.0 {
        "Several areas of your farm need care."
    } else {
        "Your farm needs immediate attention."
    };

    let mut summary = format!("{}\n\nOverall Health: {}/100\n", headline, overall_health);

    if problem_zones.is_empty() {
        summary.push_str("\nAll areas of your farm are healthy!");
        return summary;
    }

    summary.push_str(&format!("\n{} area(s) need attention:\n", problem_zones.len()));
    for zone in problem_zones.iter().take(3) {
        summary.push_str(&format!(
            "\n- {} area (Health: {}/100)",
            zone.zone_id, zone.health_score
        ));
        if !zone.alerts.is_empty() {
            summary.push_str(&format!("\n  Issues: {}", zone.alerts.join(", ")));
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ZoneStatus;

    fn zone(id: &str, row: usize, col: usize, score: f64, area: Option<f64>) -> ZoneAnalysisResult {
        ZoneAnalysisResult {
            zone_id: id.to_string(),
            row,
            col,
            health_score: score,
            status: ZoneStatus::from_score(score),
            ndvi: Some(0.5),
            ndwi: Some(0.0),
            moisture: Some(45.0),
            alerts: Vec::new(),
            recommendations: Vec::new(),
            data_quality: 80.0,
            area_hectares: area,
            used_fallback: false,
            quality_summary: String::new(),
        }
    }

    #[test]
    fn test_overall_health_area_weighted() {
        let zones = vec![zone("A", 0, 0, 80.0, Some(3.0)), zone("B", 0, 1, 40.0, Some(1.0))];
        assert_eq!(overall_health(&zones), 70.0);
    }

    #[test]
    fn test_overall_health_falls_back_to_mean() {
        let zones = vec![zone("A", 0, 0, 80.0, Some(3.0)), zone("B", 0, 1, 40.0, None)];
        assert_eq!(overall_health(&zones), 60.0);
        assert_eq!(overall_health(&[]), 0.0);
    }

    #[test]
    fn test_heatmap_fills_known_cells() {
        let zones = vec![zone("NW", 0, 0, 70.0, None), zone("SE", 1, 1, 30.0, None)];
        let heatmap = create_heatmap(&zones, GridSize::new(2, 2));
        assert_eq!(heatmap, vec![vec![70.0, 0.0], vec![0.0, 30.0]]);
        let outside = vec![zone("X", 5, 5, 10.0, None)];
        assert_eq!(create_heatmap(&outside, GridSize::new(1, 1)), vec![vec![0.0]]);
    }

    #[test]
    fn test_problem_zones_keep_order() {
        let zones = vec![
            zone("N", 0, 1, 54.9, None),
            zone("C", 1, 1, 55.0, None),
            zone("S", 2, 1, 20.0, None),
        ];
        assert_eq!(identify_problem_zones(&zones, 55.0), vec!["N", "S"]);
    }

    #[test]
    fn test_spatial_variability() {
        let even = spatial_variability(&[60.0, 60.0, 60.0]);
        assert_eq!(even.uniformity_score, 100.0);
        let outlier = spatial_variability(&[80.0, 80.0, 80.0, 20.0]);
        assert_eq!(outlier.range, 60.0);
        assert!(outlier.uniformity_score < 60.0);
        assert_eq!(spatial_variability(&[42.0]).mean, 42.0);
    }

    #[test]
    fn test_zone_statistics_skip_masked() {
        let stats = zone_statistics(&[Some(1.0), None, Some(3.0), Some(f64::NAN), Some(2.0)]);
        assert_eq!(stats.valid_count, 3);
        assert_eq!(stats.total_count, 5);
        assert_eq!(stats.median, 2.0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 3.0);
        assert!((stats.std_dev - 1.0).abs() < 1e-12);
        let empty = zone_statistics(&[None]);
        assert_eq!(empty.quality_score, 0.0);
    }

    #[test]
    fn test_farmer_summary_limits_zones() {
        let zones: Vec<ZoneAnalysisResult> = (0..5)
            .map(|i| zone(&format!("R0C{}", i), 0, i, 30.0, None))
            .collect();
        let refs: Vec<&ZoneAnalysisResult> = zones.iter().collect();
        let summary = farmer_summary(30.0, &refs);
        assert!(summary.starts_with("Your farm needs immediate attention."));
        assert!(summary.contains("5 area(s) need attention"));
        assert!(summary.contains("R0C2"));
        assert!(!summary.contains("R0C3"));
        assert!(farmer_summary(80.0, &[]).contains("All areas of your farm are healthy!"));
    }
}
