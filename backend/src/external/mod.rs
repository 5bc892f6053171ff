//! External API integrations

pub mod imagery;

pub use imagery::{
    HttpImageryClient, ImageDescriptor, ImageryClient, ReduceRequest, Reducer, RegionReduction,
};
