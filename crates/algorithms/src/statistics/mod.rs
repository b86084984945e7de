//! Statistical reduction of index rasters
//!
//! - **region**: mean, median, mode and spread of the pixels inside a boundary

pub mod region;

pub use region::{pixel_values, reduce_region, summarize_values, RegionStats, MODE_RESOLUTION};
