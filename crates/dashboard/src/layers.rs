//! Map layers: colour-ramped RGBA renderings of one index band.

use std::path::Path;

use minescope_algorithms::imagery::SpectralIndex;
use minescope_algorithms::statistics::RegionStats;
use minescope_colormap::{raster_to_rgba, Palette, VisParams};
use minescope_core::io::write_rgba_tiff;
use minescope_core::{GeoTransform, MultiBandImage};
use tracing::debug;

use crate::error::Result;
use crate::series::SlotLabel;

/// Fixed display range and palette of each index
pub fn vis_params(index: SpectralIndex) -> VisParams {
    match index {
        SpectralIndex::Ndvi => VisParams::new(-1.0, 1.0, Palette::RdYlGn),
        SpectralIndex::Evi => VisParams::new(-1.0, 1.0, Palette::Greens),
        SpectralIndex::Ndwi1 => VisParams::new(-1.0, 1.0, Palette::RdBu),
        SpectralIndex::Ndwi2 => VisParams::new(-1.0, 1.0, Palette::Gray),
        SpectralIndex::Nmdi => VisParams::new(0.0, 2.0, Palette::YlGnBu),
        SpectralIndex::Msi => VisParams::new(0.0, 3.0, Palette::RdBuR),
        SpectralIndex::Msavi2 => VisParams::new(-1.0, 1.0, Palette::YlGn),
    }
}

/// Range of `mean ± 3·sd` of the scene itself, with the index's palette
pub fn data_vis_params(index: SpectralIndex, stats: &RegionStats) -> VisParams {
    VisParams::from_stats(stats.mean, stats.std_dev, vis_params(index).palette)
}

/// Layer name as shown in a map's layer control, e.g. `NDVI 2019`
pub fn layer_name(index: SpectralIndex, label: &SlotLabel) -> String {
    format!("{index} {label}")
}

/// One rendered index band, row-major RGBA with transparent no-data.
#[derive(Debug, Clone, PartialEq)]
pub struct MapLayer {
    pub name: String,
    pub index: SpectralIndex,
    pub vis: VisParams,
    pub rows: usize,
    pub cols: usize,
    pub transform: GeoTransform,
    pub rgba: Vec<u8>,
}

impl MapLayer {
    pub fn render(
        name: impl Into<String>,
        image: &MultiBandImage,
        index: SpectralIndex,
        vis: VisParams,
    ) -> Result<Self> {
        let band = image.require_band(index.name())?;
        let name = name.into();
        debug!(layer = %name, min = vis.min, max = vis.max, palette = %vis.palette, "rendering layer");
        Ok(Self {
            name,
            index,
            vis,
            rows: band.rows(),
            cols: band.cols(),
            transform: *band.transform(),
            rgba: raster_to_rgba(band, &vis),
        })
    }

    pub fn pixel(&self, row: usize, col: usize) -> Option<[u8; 4]> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let i = (row * self.cols + col) * 4;
        Some([self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]])
    }

    /// Number of opaque pixels
    pub fn opaque_count(&self) -> usize {
        self.rgba.chunks_exact(4).filter(|px| px[3] != 0).count()
    }

    /// Write as a georeferenced RGBA TIFF
    pub fn write_tiff<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_rgba_tiff(&self.rgba, self.cols, self.rows, &self.transform, path)?;
        Ok(())
    }
}
