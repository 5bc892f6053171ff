//! Imagery sources and source selection

use serde::{Deserialize, Serialize};

/// Satellite collections the analysis can draw from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ImagerySource {
    #[serde(rename = "COPERNICUS/S2_SR_HARMONIZED")]
    Sentinel2,
    #[serde(rename = "LANDSAT/LC08/C02/T1_L2")]
    Landsat8,
    #[serde(rename = "LANDSAT/LC09/C02/T1_L2")]
    Landsat9,
}

impl ImagerySource {
    pub const ALL: [ImagerySource; 3] = [
        ImagerySource::Sentinel2,
        ImagerySource::Landsat8,
        ImagerySource::Landsat9,
    ];

    /// Collection identifier understood by the imagery backend
    pub fn collection_id(&self) -> &'static str {
        match self {
            ImagerySource::Sentinel2 => "COPERNICUS/S2_SR_HARMONIZED",
            ImagerySource::Landsat8 => "LANDSAT/LC08/C02/T1_L2",
            ImagerySource::Landsat9 => "LANDSAT/LC09/C02/T1_L2",
        }
    }

    pub fn from_collection_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.collection_id() == id)
    }

    /// Native ground sampling distance in meters
    pub fn native_resolution_m(&self) -> u32 {
        match self {
            ImagerySource::Sentinel2 => 10,
            ImagerySource::Landsat8 | ImagerySource::Landsat9 => 30,
        }
    }

    /// Sources that share this source's resolution and can be merged with it
    pub fn companions(&self) -> &'static [ImagerySource] {
        match self {
            ImagerySource::Sentinel2 => &[ImagerySource::Sentinel2],
            ImagerySource::Landsat8 | ImagerySource::Landsat9 => {
                &[ImagerySource::Landsat8, ImagerySource::Landsat9]
            }
        }
    }
}

impl std::fmt::Display for ImagerySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.collection_id())
    }
}

/// Farms up to this size get 10 m imagery
pub const FINE_RESOLUTION_MAX_HECTARES: f64 = 10.0;

/// Pick the imagery source for a farm of the given size.
///
/// Small farms need Sentinel-2's 10 m pixels to resolve zones at all; larger
/// farms use Landsat, whose 30 m pixels still give each zone enough samples.
pub fn select_source(area_hectares: f64) -> ImagerySource {
    if area_hectares <= FINE_RESOLUTION_MAX_HECTARES {
        ImagerySource::Sentinel2
    } else {
        ImagerySource::Landsat8
    }
}
