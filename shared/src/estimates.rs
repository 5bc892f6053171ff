//! Interpretation helpers and uncalibrated soil estimates
//!
//! Everything in [`AdvancedEstimates`] is a proxy formula with no ground-truth
//! calibration. Treat the values as relative indicators, not measurements.

use serde::{Deserialize, Serialize};

use crate::indices::SpectralIndices;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VegetationClass {
    Excellent,
    Good,
    Moderate,
    Poor,
    Critical,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VegetationHealth {
    pub classification: VegetationClass,
    pub description: &'static str,
    pub recommendations: Vec<&'static str>,
    /// NDVI rescaled to 0..100
    pub score: f64,
}

pub fn classify_vegetation(ndvi: f64) -> VegetationHealth {
    let (classification, description, recommendations) = if ndvi >= 0.6 {
        (
            VegetationClass::Excellent,
            "Very healthy vegetation with dense green cover",
            vec!["Maintain current practices", "Monitor for optimal harvest timing"],
        )
    } else if ndvi >= 0.4 {
        (
            VegetationClass::Good,
            "Healthy vegetation with good growth",
            vec!["Continue monitoring", "Consider nutrient optimization"],
        )
    } else if ndvi >= 0.2 {
        (
            VegetationClass::Moderate,
            "Moderate vegetation health, some stress indicators",
            vec!["Check soil moisture", "Consider fertilization", "Monitor for pests"],
        )
    } else if ndvi >= 0.1 {
        (
            VegetationClass::Poor,
            "Stressed vegetation, intervention needed",
            vec!["Immediate soil analysis", "Check irrigation", "Pest/disease inspection"],
        )
    } else {
        (
            VegetationClass::Critical,
            "Very poor vegetation health or bare soil",
            vec!["Urgent intervention required", "Soil rehabilitation", "Expert consultation"],
        )
    };

    VegetationHealth {
        classification,
        description,
        recommendations,
        score: ((ndvi + 1.0) * 50.0).clamp(0.0, 100.0),
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SalinityLevel {
    Low,
    Moderate,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
}

/// Salinity level from the salinity index (simplified thresholds)
pub fn salinity_level(si: f64) -> SalinityLevel {
    if si <= 1.2 {
        SalinityLevel::Low
    } else if si <= 2.0 {
        SalinityLevel::Moderate
    } else if si <= 3.0 {
        SalinityLevel::High
    } else {
        SalinityLevel::VeryHigh
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MoistureLevel {
    High,
    Moderate,
    Low,
    #[serde(rename = "Very Low")]
    VeryLow,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SoilMoisture {
    pub level: MoistureLevel,
    pub percentage: f64,
}

/// Soil moisture class from NDMI, which is rescaled from [-1, 1] to a percentage
pub fn soil_moisture_level(ndmi: f64) -> SoilMoisture {
    let percentage = ((ndmi + 1.0) * 50.0).clamp(0.0, 100.0);
    let level = if percentage >= 60.0 {
        MoistureLevel::High
    } else if percentage >= 40.0 {
        MoistureLevel::Moderate
    } else if percentage >= 20.0 {
        MoistureLevel::Low
    } else {
        MoistureLevel::VeryLow
    };
    SoilMoisture {
        level,
        percentage: (percentage * 10.0).round() / 10.0,
    }
}

/// Proxy soil metrics. Uncalibrated estimates, not measurements.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AdvancedEstimates {
    /// Organic matter percent from the coloration index: `max(0, (CI + 1) * 2.5)`
    pub organic_matter_percent: Option<f64>,
    /// Mean of NDVI, EVI and SAVI rescaled to 0..100
    pub crop_vigor: Option<f64>,
    /// 0..100, higher means more bare soil and salt stress
    pub soil_stress: Option<f64>,
    pub calibrated: bool,
}

impl AdvancedEstimates {
    pub fn from_indices(indices: &SpectralIndices) -> Self {
        let organic_matter_percent = indices.ci.map(|ci| ((ci + 1.0) * 2.5).max(0.0));

        let vigor_inputs: Vec<f64> = [indices.ndvi, indices.evi]
            .into_iter()
            .flatten()
            .map(|v| ((v + 1.0) * 50.0).clamp(0.0, 100.0))
            .chain(
                indices
                    .savi
                    .map(|v| ((v + 1.5) / 3.0 * 100.0).clamp(0.0, 100.0)),
            )
            .collect();
        let crop_vigor = (!vigor_inputs.is_empty())
            .then(|| vigor_inputs.iter().sum::<f64>() / vigor_inputs.len() as f64);

        let bare_soil = indices.bsi.map(|b| ((b + 1.0) * 50.0).clamp(0.0, 100.0));
        let salt = indices.si.map(|s| (s / 3.0 * 100.0).clamp(0.0, 100.0));
        let soil_stress = match (bare_soil, salt) {
            (Some(b), Some(s)) => Some(0.6 * b + 0.4 * s),
            (Some(b), None) => Some(b),
            (None, Some(s)) => Some(s),
            (None, None) => None,
        };

        Self {
            organic_matter_percent,
            crop_vigor,
            soil_stress,
            calibrated: false,
        }
    }
}
