//! # MineScope Colormap
//!
//! Colour ramps and raster-to-RGBA rendering for index map layers.
//!
//! Provides the seven ColorBrewer-derived palettes used by the index layers,
//! a [`VisParams`] value range per layer and [`raster_to_rgba`], which maps
//! a `Raster<T>` onto a palette with no-data left transparent.
//!
//! ## Usage
//!
//! ```ignore
//! use minescope_colormap::{Palette, VisParams, raster_to_rgba};
//!
//! let vis = VisParams::new(-1.0, 1.0, Palette::RdYlGn);
//! let rgba = raster_to_rgba(&ndvi, &vis);
//! ```

mod palette;
mod render;

pub use palette::{evaluate, Palette, PaletteError, Rgb};
pub use render::{raster_to_rgba, VisParams};
