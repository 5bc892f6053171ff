//! Domain models for farm grid analysis

mod farm;
mod grid_analysis;
mod observation;
mod zone;

pub use farm::*;
pub use grid_analysis::*;
pub use observation::*;
pub use zone::*;
