//! Grid planner
//!
//! Chooses grid dimensions and imagery resolution from farm area and tiles a
//! square farm footprint into compass-named zones, north to south and west
//! to east.

use serde::{Deserialize, Serialize};

use crate::geometry::{meters_to_degrees, SQUARE_METERS_PER_HECTARE};
use crate::models::{FarmCoordinates, ZoneGeometry};
use crate::source::ImagerySource;
use crate::types::{Bounds, GpsCoordinates, GridSize};

/// Grid dimensions plus the imagery that resolves them
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GridPlan {
    pub grid_size: GridSize,
    pub source: ImagerySource,
    pub resolution_meters: u32,
}

impl GridPlan {
    fn new(rows: usize, cols: usize, source: ImagerySource) -> Self {
        Self {
            grid_size: GridSize::new(rows, cols),
            source,
            resolution_meters: source.native_resolution_m(),
        }
    }
}

/// Choose the grid for a farm area (hectares)
pub fn plan_for_area(area_hectares: f64) -> GridPlan {
    if area_hectares <= 2.0 {
        GridPlan::new(2, 2, ImagerySource::Sentinel2)
    } else if area_hectares <= 10.0 {
        GridPlan::new(3, 3, ImagerySource::Sentinel2)
    } else if area_hectares <= 50.0 {
        GridPlan::new(4, 4, ImagerySource::Landsat8)
    } else {
        GridPlan::new(5, 5, ImagerySource::Landsat8)
    }
}

const NAMES_2X2: [[&str; 2]; 2] = [["NW", "NE"], ["SW", "SE"]];

const NAMES_3X3: [[&str; 3]; 3] = [["NW", "N", "NE"], ["W", "C", "E"], ["SW", "S", "SE"]];

const NAMES_4X4: [[&str; 4]; 4] = [
    ["NW1", "NW2", "NE1", "NE2"],
    ["NW3", "NW4", "NE3", "NE4"],
    ["SW1", "SW2", "SE1", "SE2"],
    ["SW3", "SW4", "SE3", "SE4"],
];

const NAMES_5X5: [[&str; 5]; 5] = [
    ["NW1", "NW2", "N1", "NE1", "NE2"],
    ["NW3", "NW4", "N2", "NE3", "NE4"],
    ["W1", "W2", "C", "E1", "E2"],
    ["SW1", "SW2", "S1", "SE1", "SE2"],
    ["SW3", "SW4", "S2", "SE3", "SE4"],
];

/// Compass-style zone names, row-major; `R{row}C{col}` for non-standard sizes
pub fn zone_names(size: GridSize) -> Vec<Vec<String>> {
    fn table<const N: usize>(names: &[[&str; N]; N]) -> Vec<Vec<String>> {
        names
            .iter()
            .map(|row| row.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    match (size.rows, size.cols) {
        (2, 2) => table(&NAMES_2X2),
        (3, 3) => table(&NAMES_3X3),
        (4, 4) => table(&NAMES_4X4),
        (5, 5) => table(&NAMES_5X5),
        (rows, cols) => (0..rows)
            .map(|r| (0..cols).map(|c| format!("R{}C{}", r, c)).collect())
            .collect(),
    }
}

/// Compass direction word for a cell ("northwest", "east", "center", ...)
pub fn compass_direction(row: usize, col: usize, size: GridSize) -> &'static str {
    fn third(index: usize, total: usize, low: &'static str, high: &'static str) -> &'static str {
        if total <= 1 {
            return "center";
        }
        let index = index as f64;
        let total = total as f64;
        if index < total / 3.0 {
            low
        } else if index >= total * 2.0 / 3.0 {
            high
        } else {
            "center"
        }
    }

    let vertical = third(row, size.rows, "north", "south");
    let horizontal = third(col, size.cols, "west", "east");

    match (vertical, horizontal) {
        ("center", "center") => "center",
        ("center", h) => h,
        (v, "center") => v,
        ("north", "west") => "northwest",
        ("north", _) => "northeast",
        (_, "west") => "southwest",
        _ => "southeast",
    }
}

/// A farm decomposed into zones
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FarmGrid {
    pub center: GpsCoordinates,
    pub area_hectares: f64,
    pub plan: GridPlan,
    pub zones: Vec<ZoneGeometry>,
}

impl FarmGrid {
    pub fn grid_size(&self) -> GridSize {
        self.plan.grid_size
    }

    pub fn zone(&self, zone_id: &str) -> Option<&ZoneGeometry> {
        self.zones.iter().find(|z| z.zone_id == zone_id)
    }

    pub fn zone_at(&self, row: usize, col: usize) -> Option<&ZoneGeometry> {
        self.zones.iter().find(|z| z.row == row && z.col == col)
    }
}

/// Build the size-appropriate grid for a farm
pub fn create_farm_grid(farm: &FarmCoordinates) -> FarmGrid {
    let plan = plan_for_area(farm.area_hectares());
    build_grid(farm, plan)
}

/// Build a grid with explicit dimensions; the imagery source still follows area
pub fn create_custom_grid(farm: &FarmCoordinates, size: GridSize) -> FarmGrid {
    let mut plan = plan_for_area(farm.area_hectares());
    plan.grid_size = size;
    build_grid(farm, plan)
}

fn build_grid(farm: &FarmCoordinates, plan: GridPlan) -> FarmGrid {
    let center = farm.center();
    let area = farm.area_hectares();
    let GridSize { rows, cols } = plan.grid_size;

    let side_m = (area * SQUARE_METERS_PER_HECTARE).sqrt();
    let (half_lat, half_lng) = meters_to_degrees(side_m / 2.0, center.latitude);
    let north = center.latitude + half_lat;
    let west = center.longitude - half_lng;
    let zone_lat = 2.0 * half_lat / rows.max(1) as f64;
    let zone_lng = 2.0 * half_lng / cols.max(1) as f64;
    let zone_area = area / plan.grid_size.zone_count().max(1) as f64;

    let names = zone_names(plan.grid_size);
    let mut zones = Vec::with_capacity(plan.grid_size.zone_count());
    for (row, row_names) in names.into_iter().enumerate() {
        for (col, zone_id) in row_names.into_iter().enumerate() {
            let bounds = Bounds {
                north: north - row as f64 * zone_lat,
                south: north - (row + 1) as f64 * zone_lat,
                west: west + col as f64 * zone_lng,
                east: west + (col + 1) as f64 * zone_lng,
            };
            zones.push(ZoneGeometry::new(zone_id, row, col, bounds, zone_area));
        }
    }

    FarmGrid {
        center,
        area_hectares: area,
        plan,
        zones,
    }
}
