//! Time-series helpers for historical observations

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NdviTrend {
    /// Least-squares slope per observation step
    pub trend: f64,
    pub average: f64,
    /// Percent change from first to last observation
    pub improvement: f64,
}

/// NDVI trend over chronologically ordered values
pub fn ndvi_trend(values: &[f64]) -> NdviTrend {
    if values.len() < 2 {
        return NdviTrend {
            trend: 0.0,
            average: values.first().copied().unwrap_or(0.0),
            improvement: 0.0,
        };
    }

    let n = values.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = values.iter().sum::<f64>() / n;
    let (numerator, denominator) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, y)| {
            let dx = i as f64 - x_mean;
            (num + dx * (y - y_mean), den + dx * dx)
        });
    let trend = if denominator != 0.0 {
        numerator / denominator
    } else {
        0.0
    };

    let first = values[0];
    let last = values[values.len() - 1];
    let improvement = if first != 0.0 {
        (last - first) / first.abs() * 100.0
    } else {
        0.0
    };

    NdviTrend {
        trend: (trend * 10_000.0).round() / 10_000.0,
        average: (y_mean * 1000.0).round() / 1000.0,
        improvement: (improvement * 10.0).round() / 10.0,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TemporalVariance {
    pub variance: f64,
    pub std_dev: f64,
    /// `max(0, 100 - CV)`; 0 when the mean is 0
    pub stability: f64,
}

pub fn temporal_variance(values: &[f64]) -> TemporalVariance {
    if values.len() < 2 {
        return TemporalVariance {
            variance: 0.0,
            std_dev: 0.0,
            stability: 100.0,
        };
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();
    let stability = if mean != 0.0 {
        (100.0 - std_dev / mean.abs() * 100.0).max(0.0)
    } else {
        0.0
    };

    TemporalVariance {
        variance: (variance * 10_000.0).round() / 10_000.0,
        std_dev: (std_dev * 1000.0).round() / 1000.0,
        stability: (stability * 10.0).round() / 10.0,
    }
}
