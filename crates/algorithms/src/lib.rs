//! # MineScope Algorithms
//!
//! Raster analysis behind the mining-site dashboard.
//!
//! ## Modules
//!
//! - **imagery**: reflectance scaling, the seven spectral indices, boundary
//!   clipping and the per-scene index stack
//! - **statistics**: region reduction (mean, median, mode, spread)

pub mod imagery;
pub mod statistics;

mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::imagery::{
        clip_to_boundary, compute_indices, evi, msavi2, msi, ndvi, ndwi1, ndwi2, nmdi,
        to_reflectance, IndexOptions, SpectralIndex, TemporalLabel,
    };
    pub use crate::statistics::{pixel_values, reduce_region, RegionStats};
    pub use minescope_core::prelude::*;
}
