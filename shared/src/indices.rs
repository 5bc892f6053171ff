//! Band-algebra index calculator
//!
//! Every ratio index is `None` when its denominator is exactly zero or when the
//! result is not finite. A value outside its physical range is also masked and
//! reported, so an index is either in range or absent.

use serde::{Deserialize, Serialize};

/// Soil adjustment factor for SAVI
pub const SAVI_L: f64 = 0.5;

/// Surface reflectance per band (unitless, typically 0..1)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct BandReflectance {
    pub blue: f64,
    pub green: f64,
    pub red: f64,
    pub nir: f64,
    pub swir1: f64,
    pub swir2: f64,
}

/// The nine derived indices
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct SpectralIndices {
    pub ndvi: Option<f64>,
    pub ndwi: Option<f64>,
    pub savi: Option<f64>,
    pub evi: Option<f64>,
    pub ndmi: Option<f64>,
    pub bsi: Option<f64>,
    pub si: Option<f64>,
    pub ci: Option<f64>,
    pub bi: Option<f64>,
}

/// Index identifiers, used to report out-of-range values
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpectralIndex {
    Ndvi,
    Ndwi,
    Savi,
    Evi,
    Ndmi,
    Bsi,
    Si,
    Ci,
    Bi,
}

impl SpectralIndex {
    pub const ALL: [SpectralIndex; 9] = [
        SpectralIndex::Ndvi,
        SpectralIndex::Ndwi,
        SpectralIndex::Savi,
        SpectralIndex::Evi,
        SpectralIndex::Ndmi,
        SpectralIndex::Bsi,
        SpectralIndex::Si,
        SpectralIndex::Ci,
        SpectralIndex::Bi,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SpectralIndex::Ndvi => "NDVI",
            SpectralIndex::Ndwi => "NDWI",
            SpectralIndex::Savi => "SAVI",
            SpectralIndex::Evi => "EVI",
            SpectralIndex::Ndmi => "NDMI",
            SpectralIndex::Bsi => "BSI",
            SpectralIndex::Si => "SI",
            SpectralIndex::Ci => "CI",
            SpectralIndex::Bi => "BI",
        }
    }

    /// Physically plausible value range
    pub fn valid_range(&self) -> (f64, f64) {
        match self {
            SpectralIndex::Ndvi
            | SpectralIndex::Ndwi
            | SpectralIndex::Ndmi
            | SpectralIndex::Bsi
            | SpectralIndex::Ci
            | SpectralIndex::Evi => (-1.0, 1.0),
            SpectralIndex::Savi => (-1.5, 1.5),
            SpectralIndex::Si => (0.0, f64::MAX),
            SpectralIndex::Bi => (-0.2, 1.6),
        }
    }
}

impl std::fmt::Display for SpectralIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// `numerator / denominator`, or `None` for a zero denominator or non-finite result
pub fn safe_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    let value = numerator / denominator;
    value.is_finite().then_some(value)
}

pub fn ndvi(b: &BandReflectance) -> Option<f64> {
    safe_ratio(b.nir - b.red, b.nir + b.red)
}

pub fn ndwi(b: &BandReflectance) -> Option<f64> {
    safe_ratio(b.green - b.nir, b.green + b.nir)
}

pub fn savi(b: &BandReflectance) -> Option<f64> {
    safe_ratio(b.nir - b.red, b.nir + b.red + SAVI_L).map(|v| v * (1.0 + SAVI_L))
}

pub fn evi(b: &BandReflectance) -> Option<f64> {
    safe_ratio(b.nir - b.red, b.nir + 6.0 * b.red - 7.5 * b.blue + 1.0).map(|v| v * 2.5)
}

pub fn ndmi(b: &BandReflectance) -> Option<f64> {
    safe_ratio(b.nir - b.swir1, b.nir + b.swir1)
}

pub fn bsi(b: &BandReflectance) -> Option<f64> {
    let soil = b.swir1 + b.red;
    let veg = b.nir + b.blue;
    safe_ratio(soil - veg, soil + veg)
}

pub fn si(b: &BandReflectance) -> Option<f64> {
    safe_ratio(b.green * b.red, b.blue)
}

pub fn ci(b: &BandReflectance) -> Option<f64> {
    safe_ratio(b.red - b.green, b.red + b.green)
}

pub fn bi(b: &BandReflectance) -> Option<f64> {
    let value = (b.blue + b.green + b.red) / 3.0;
    value.is_finite().then_some(value)
}

impl SpectralIndices {
    /// Compute all indices, masking out-of-range results
    pub fn from_bands(bands: &BandReflectance) -> Self {
        Self::from_bands_checked(bands).0
    }

    /// Compute all indices and also return the ones masked for being out of range
    pub fn from_bands_checked(bands: &BandReflectance) -> (Self, Vec<SpectralIndex>) {
        let raw = SpectralIndices {
            ndvi: ndvi(bands),
            ndwi: ndwi(bands),
            savi: savi(bands),
            evi: evi(bands),
            ndmi: ndmi(bands),
            bsi: bsi(bands),
            si: si(bands),
            ci: ci(bands),
            bi: bi(bands),
        };
        raw.range_checked()
    }

    /// Mask any present value outside its physical range
    pub fn range_checked(mut self) -> (Self, Vec<SpectralIndex>) {
        let mut rejected = Vec::new();
        for index in SpectralIndex::ALL {
            let slot = self.slot_mut(index);
            if let Some(value) = *slot {
                let (lo, hi) = index.valid_range();
                if !value.is_finite() || value < lo || value > hi {
                    *slot = None;
                    rejected.push(index);
                }
            }
        }
        (self, rejected)
    }

    pub fn get(&self, index: SpectralIndex) -> Option<f64> {
        match index {
            SpectralIndex::Ndvi => self.ndvi,
            SpectralIndex::Ndwi => self.ndwi,
            SpectralIndex::Savi => self.savi,
            SpectralIndex::Evi => self.evi,
            SpectralIndex::Ndmi => self.ndmi,
            SpectralIndex::Bsi => self.bsi,
            SpectralIndex::Si => self.si,
            SpectralIndex::Ci => self.ci,
            SpectralIndex::Bi => self.bi,
        }
    }

    fn slot_mut(&mut self, index: SpectralIndex) -> &mut Option<f64> {
        match index {
            SpectralIndex::Ndvi => &mut self.ndvi,
            SpectralIndex::Ndwi => &mut self.ndwi,
            SpectralIndex::Savi => &mut self.savi,
            SpectralIndex::Evi => &mut self.evi,
            SpectralIndex::Ndmi => &mut self.ndmi,
            SpectralIndex::Bsi => &mut self.bsi,
            SpectralIndex::Si => &mut self.si,
            SpectralIndex::Ci => &mut self.ci,
            SpectralIndex::Bi => &mut self.bi,
        }
    }

    pub fn masked_count(&self) -> usize {
        SpectralIndex::ALL
            .iter()
            .filter(|i| self.get(**i).is_none())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vegetation() -> BandReflectance {
        BandReflectance {
            blue: 0.04,
            green: 0.08,
            red: 0.2,
            nir: 0.8,
            swir1: 0.25,
            swir2: 0.12,
        }
    }

    #[test]
    fn test_ndvi_known_value() {
        let value = ndvi(&vegetation()).unwrap();
        assert!((value - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_zero_denominator_is_masked_not_zero() {
        let dark = BandReflectance::default();
        assert_eq!(ndvi(&dark), None);
        assert_eq!(ndwi(&dark), None);
        assert_eq!(si(&dark), None);
        assert_eq!(ci(&dark), None);
        // SAVI's +L keeps the denominator non-zero
        assert_eq!(savi(&dark), Some(0.0));
        assert_eq!(bi(&dark), Some(0.0));
    }

    #[test]
    fn test_computed_zero_is_distinct_from_masked() {
        let flat = BandReflectance {
            red: 0.3,
            nir: 0.3,
            ..vegetation()
        };
        assert_eq!(ndvi(&flat), Some(0.0));
    }

    #[test]
    fn test_all_indices_for_vegetation() {
        let (indices, rejected) = SpectralIndices::from_bands_checked(&vegetation());
        assert!(rejected.is_empty());
        assert!((indices.savi.unwrap() - 0.6 / 1.5 * 1.5).abs() < 1e-9);
        assert!((indices.ci.unwrap() - 0.12 / 0.28).abs() < 1e-9);
        assert!((indices.si.unwrap() - 0.4).abs() < 1e-9);
        assert!((indices.bi.unwrap() - 0.32 / 3.0).abs() < 1e-9);
        assert!(indices.ndwi.unwrap() < 0.0);
        assert!(indices.bsi.unwrap() < 0.0);
        assert_eq!(indices.masked_count(), 0);
    }

    #[test]
    fn test_out_of_range_is_masked_and_reported() {
        // A bright blue band shrinks EVI's denominator to 0.15, pushing EVI to 2.5
        let bands = BandReflectance {
            blue: 0.18,
            green: 0.1,
            red: 0.05,
            nir: 0.2,
            swir1: 0.1,
            swir2: 0.05,
        };
        let (indices, rejected) = SpectralIndices::from_bands_checked(&bands);
        assert_eq!(indices.evi, None);
        assert!(rejected.contains(&SpectralIndex::Evi));
        assert!(indices.ndvi.is_some());
    }
}
