//! Imagery analysis for mining-site monitoring
//!
//! - Reflectance: digital number to surface reflectance scaling
//! - Spectral indices: NDVI, NDWI1, NDWI2, NMDI, EVI, MSI, MSAVI2
//! - Clip: masking rasters to a site boundary
//! - Calculator: the seven-band index stack of one scene

mod calculator;
mod clip;
mod indices;
mod reflectance;

pub use calculator::{compute_indices, IndexOptions, TemporalLabel};
pub use clip::{boundary_mask, clip_to_boundary, BoundaryMask};
pub use indices::{
    bands, evi, mask_nmdi_range, msavi2, msi, ndvi, ndwi1, ndwi2, nmdi, normalized_difference,
    SpectralIndex,
};
pub use reflectance::{to_reflectance, REFLECTANCE_SCALE};
