//! Zone and farm health scoring
//!
//! Turns raw indices into a 0..100 health score, a status band, and rule-based
//! alerts and recommendations.

use serde::{Deserialize, Serialize};

use crate::models::{SatelliteObservation, ZoneAnalysisResult, ZoneGeometry, ZoneStatus};

const NDVI_WEIGHT: f64 = 0.40;
const MOISTURE_WEIGHT: f64 = 0.30;
const NDWI_WEIGHT: f64 = 0.20;
const BSI_WEIGHT: f64 = 0.10;

/// NDVI in [-1, 1] rescaled to 0..100
pub fn ndvi_component(ndvi: f64) -> f64 {
    ((ndvi + 1.0) * 50.0).clamp(0.0, 100.0)
}

/// 100 inside the 40..60 % band, linear falloff on both sides
pub fn moisture_component(moisture: f64) -> f64 {
    if (40.0..=60.0).contains(&moisture) {
        100.0
    } else if moisture < 40.0 {
        (moisture * 2.5).max(0.0)
    } else {
        (100.0 - (moisture - 60.0) * 2.5).max(0.0)
    }
}

/// NDWI over a shifted [-0.5, 0.5] window rescaled to 0..100
pub fn ndwi_component(ndwi: f64) -> f64 {
    ((ndwi + 0.5) * 100.0).clamp(0.0, 100.0)
}

/// Inverted BSI: bare soil lowers the score
pub fn bsi_component(bsi: f64) -> f64 {
    (100.0 - (bsi + 1.0) * 50.0).clamp(0.0, 100.0)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Weighted zone health score (40 NDVI / 30 moisture / 20 NDWI / 10 BSI).
///
/// Masked inputs drop out and the remaining weights are renormalized. With
/// every input masked the score is 0.
pub fn zone_health_score(
    ndvi: Option<f64>,
    ndwi: Option<f64>,
    moisture: Option<f64>,
    bsi: Option<f64>,
) -> f64 {
    let components = [
        (ndvi.map(ndvi_component), NDVI_WEIGHT),
        (moisture.map(moisture_component), MOISTURE_WEIGHT),
        (ndwi.map(ndwi_component), NDWI_WEIGHT),
        (bsi.map(bsi_component), BSI_WEIGHT),
    ];

    let (sum, weight) = components
        .iter()
        .filter_map(|(score, w)| score.map(|s| (s * w, *w)))
        .fold((0.0, 0.0), |(sum, weight), (s, w)| (sum + s, weight + w));

    if weight == 0.0 {
        return 0.0;
    }
    round1((sum / weight).clamp(0.0, 100.0))
}

/// Rule-based alerts and recommendations for a zone
pub fn zone_recommendations(
    zone_id: &str,
    health_score: f64,
    ndvi: Option<f64>,
    moisture: Option<f64>,
) -> (Vec<String>, Vec<String>) {
    let mut alerts = Vec::new();
    let mut recommendations = Vec::new();

    match ndvi {
        Some(v) if v < 0.2 => {
            alerts.push(format!("Critical vegetation stress in {}", zone_id));
            recommendations.push("Investigate for pest damage or disease".to_string());
            recommendations.push("Consider soil testing for this area".to_string());
        }
        Some(v) if v < 0.4 => {
            alerts.push(format!("Low vegetation health in {}", zone_id));
            recommendations.push("Monitor closely for improvement".to_string());
        }
        _ => {}
    }

    match moisture {
        Some(m) if m < 20.0 => {
            alerts.push(format!("Very low soil moisture in {}", zone_id));
            recommendations.push("Prioritize irrigation for this zone".to_string());
        }
        Some(m) if m < 35.0 => {
            alerts.push(format!("Low moisture in {}", zone_id));
            recommendations.push("Consider targeted watering".to_string());
        }
        Some(m) if m > 80.0 => {
            alerts.push(format!("Excess moisture in {}", zone_id));
            recommendations.push("Check drainage in this area".to_string());
        }
        _ => {}
    }

    if health_score < 40.0 {
        recommendations.push("This zone needs immediate attention".to_string());
    } else if health_score < 60.0 {
        recommendations.push("Monitor this zone weekly".to_string());
    }

    (alerts, recommendations)
}

/// Score one zone from its observation
pub fn analyze_zone(zone: &ZoneGeometry, observation: &SatelliteObservation) -> ZoneAnalysisResult {
    let indices = observation.indices();
    let moisture = observation.moisture_estimate();
    let health_score = zone_health_score(indices.ndvi, indices.ndwi, moisture, indices.bsi);
    let (alerts, recommendations) =
        zone_recommendations(&zone.zone_id, health_score, indices.ndvi, moisture);

    ZoneAnalysisResult {
        zone_id: zone.zone_id.clone(),
        row: zone.row,
        col: zone.col,
        health_score,
        status: ZoneStatus::from_score(health_score),
        ndvi: indices.ndvi,
        ndwi: indices.ndwi,
        moisture,
        alerts,
        recommendations,
        data_quality: round1(observation.data_quality_score()),
        area_hectares: Some(zone.area_hectares),
        used_fallback: observation.used_fallback(),
        quality_summary: observation.quality_summary(),
    }
}

/// Whole-farm soil health from indices (40 NDVI / 30 NDMI / 30 inverted BSI),
/// scaled by data quality
pub fn farm_health_from_indices(observation: &SatelliteObservation) -> f64 {
    let indices = observation.indices();
    let components = [
        (indices.ndvi.map(ndvi_component), 0.4),
        (indices.ndmi.map(ndvi_component), 0.3),
        (indices.bsi.map(bsi_component), 0.3),
    ];
    let (sum, weight) = components
        .iter()
        .filter_map(|(score, w)| score.map(|s| (s * w, *w)))
        .fold((0.0, 0.0), |(sum, weight), (s, w)| (sum + s, weight + w));
    if weight == 0.0 {
        return 0.0;
    }
    let quality_factor = observation.data_quality_score() / 100.0;
    round1(sum / weight * quality_factor)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

/// Human-readable condition of a zone
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZoneCondition {
    pub status: ZoneStatus,
    pub description: String,
    pub urgency: Urgency,
    pub issues: Vec<String>,
    pub health_score: f64,
}

pub fn classify_zone_condition(
    health_score: f64,
    ndvi: Option<f64>,
    moisture: Option<f64>,
) -> ZoneCondition {
    let status = ZoneStatus::from_score(health_score);
    let (description, urgency) = match status {
        ZoneStatus::Healthy => ("This area is thriving", Urgency::Low),
        ZoneStatus::Moderate => ("This area needs monitoring", Urgency::Medium),
        ZoneStatus::Degraded => ("This area needs attention", Urgency::High),
        ZoneStatus::Critical => ("This area needs immediate action", Urgency::Critical),
    };

    let mut issues = Vec::new();
    if ndvi.is_some_and(|v| v < 0.3) {
        issues.push("Low vegetation".to_string());
    }
    match moisture {
        Some(m) if m < 25.0 => issues.push("Dry soil".to_string()),
        Some(m) if m > 75.0 => issues.push("Excess moisture".to_string()),
        _ => {}
    }

    ZoneCondition {
        status,
        description: description.to_string(),
        urgency,
        issues,
        health_score,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Irrigate,
    Drainage,
    Investigate,
    Fertilize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ActionPriority {
    High,
    Medium,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZoneAction {
    pub action: ActionKind,
    pub description: String,
    pub priority: ActionPriority,
}

/// The single highest-priority action for a zone, if it needs one
pub fn zone_action(
    zone_id: &str,
    condition: &ZoneCondition,
    ndvi: Option<f64>,
    moisture: Option<f64>,
) -> Option<ZoneAction> {
    if condition.urgency == Urgency::Low {
        return None;
    }

    let mut actions = Vec::new();
    match moisture {
        Some(m) if m < 25.0 => actions.push(ZoneAction {
            action: ActionKind::Irrigate,
            description: format!("Water zone {} within 3 days", zone_id),
            priority: if m < 15.0 {
                ActionPriority::High
            } else {
                ActionPriority::Medium
            },
        }),
        Some(m) if m > 75.0 => actions.push(ZoneAction {
            action: ActionKind::Drainage,
            description: format!("Check drainage in zone {}", zone_id),
            priority: ActionPriority::Medium,
        }),
        _ => {}
    }
    match ndvi {
        Some(v) if v < 0.2 => actions.push(ZoneAction {
            action: ActionKind::Investigate,
            description: format!("Inspect zone {} for pest/disease", zone_id),
            priority: ActionPriority::High,
        }),
        Some(v) if v < 0.35 => actions.push(ZoneAction {
            action: ActionKind::Fertilize,
            description: format!("Consider fertilizing zone {}", zone_id),
            priority: ActionPriority::Medium,
        }),
        _ => {}
    }

    // Stable sort keeps moisture actions ahead at equal priority
    actions.sort_by_key(|a| a.priority);
    actions.into_iter().next()
}
