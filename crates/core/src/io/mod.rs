//! Reading and writing single-band GeoTIFFs and rendered RGBA layers

mod geotiff;

pub use geotiff::{
    read_band, read_band_from_buffer, write_index_geotiff, write_index_geotiff_to_buffer,
    write_rgba_tiff,
};
