//! # MineScope Core
//!
//! Core types and I/O shared by the MineScope crates.
//!
//! This crate provides:
//! - `Raster<T>`: Generic georeferenced raster grid
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `MultiBandImage`: Named bands plus acquisition time and metadata tags
//! - `SiteBoundary` / `RegionOfInterest`: geometries used to query, clip and aggregate
//! - I/O for single-band GeoTIFFs and GeoJSON feature collections

pub mod error;
pub mod image;
pub mod io;
pub mod raster;
pub mod vector;

pub use error::{Error, Result};
pub use image::{MultiBandImage, TagValue};
pub use raster::{GeoTransform, Raster, RasterElement};
pub use vector::{AttributeValue, Feature, FeatureCollection, RegionOfInterest, SiteBoundary};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::image::{MultiBandImage, TagValue};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::vector::{RegionOfInterest, SiteBoundary};
}
