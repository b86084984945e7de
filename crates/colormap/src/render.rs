//! Raster-to-RGBA rendering using index palettes.

use serde::{Deserialize, Serialize};

use crate::palette::{evaluate, Palette, Rgb};
use minescope_core::raster::{Raster, RasterElement};

/// Value range and palette of one map layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisParams {
    /// Value mapped to the first palette stop. Values below are clamped.
    pub min: f64,
    /// Value mapped to the last palette stop. Values above are clamped.
    pub max: f64,
    pub palette: Palette,
}

impl VisParams {
    pub fn new(min: f64, max: f64, palette: Palette) -> Self {
        Self { min, max, palette }
    }

    /// Range of `mean ± 3 * std_dev`, for scenes whose values cluster far
    /// from the fixed range.
    pub fn from_stats(mean: f64, std_dev: f64, palette: Palette) -> Self {
        Self::new(mean - 3.0 * std_dev, mean + 3.0 * std_dev, palette)
    }

    /// Position of `value` along the palette, unclamped
    pub fn normalize(&self, value: f64) -> f64 {
        let range = self.max - self.min;
        if range.abs() > f64::EPSILON {
            (value - self.min) / range
        } else {
            0.5
        }
    }

    pub fn color(&self, value: f64) -> Rgb {
        evaluate(self.palette, self.normalize(value))
    }
}

/// Convert a raster to an RGBA pixel buffer.
///
/// Returns a `Vec<u8>` of length `rows * cols * 4` in row-major order.
/// No-data and non-finite pixels are fully transparent.
pub fn raster_to_rgba<T: RasterElement>(raster: &Raster<T>, vis: &VisParams) -> Vec<u8> {
    let nodata = raster.nodata();
    let mut rgba = vec![0u8; raster.len() * 4];

    for (px, val) in rgba.chunks_exact_mut(4).zip(raster.data().iter()) {
        if val.is_nodata(nodata) {
            continue;
        }
        if let Some(v) = val.to_f64().filter(|v| v.is_finite()) {
            let Rgb { r, g, b } = vis.color(v);
            px.copy_from_slice(&[r, g, b, 255]);
        }
    }

    rgba
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn raster_to_rgba_basic() {
        let mut r = Raster::<f64>::new(2, 2);
        r.set(0, 0, 0.0).unwrap();
        r.set(0, 1, 1.5).unwrap();
        r.set(1, 0, 3.0).unwrap();
        r.set(1, 1, f64::NAN).unwrap();
        r.set_nodata(Some(f64::NAN));

        let vis = VisParams::new(0.0, 3.0, Palette::Gray);
        let rgba = raster_to_rgba(&r, &vis);

        assert_eq!(rgba.len(), 16);
        assert_eq!(&rgba[0..4], &[0, 0, 0, 255]);
        assert_eq!(&rgba[4..8], &[128, 128, 128, 255]);
        assert_eq!(&rgba[8..12], &[255, 255, 255, 255]);
        assert_eq!(&rgba[12..16], &[0, 0, 0, 0]);
    }

    #[test]
    fn out_of_range_values_clamp() {
        let r = Raster::from_vec(vec![-4.0, 9.0], 1, 2).unwrap();
        let rgba = raster_to_rgba(&r, &VisParams::new(-1.0, 1.0, Palette::Gray));
        assert_eq!(&rgba[0..4], &[0, 0, 0, 255]);
        assert_eq!(&rgba[4..8], &[255, 255, 255, 255]);
    }

    #[test]
    fn integer_nodata_transparent() {
        let mut r = Raster::<u16>::from_vec(vec![0, 10_000], 1, 2).unwrap();
        r.set_nodata(Some(0));
        let rgba = raster_to_rgba(&r, &VisParams::new(0.0, 10_000.0, Palette::Gray));
        assert_eq!(rgba[3], 0);
        assert_eq!(rgba[7], 255);
    }

    #[test]
    fn from_stats_spans_three_sigma() {
        let vis = VisParams::from_stats(0.3, 0.1, Palette::RdYlGn);
        assert_relative_eq!(vis.min, 0.0, epsilon = 1e-12);
        assert_relative_eq!(vis.max, 0.6, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_range_uses_midpoint() {
        let vis = VisParams::new(1.0, 1.0, Palette::Gray);
        assert_eq!(vis.color(1.0), Rgb::new(128, 128, 128));
    }

    #[test]
    fn serializes_palette_name() {
        let vis = VisParams::new(0.0, 3.0, Palette::RdBuR);
        let json = serde_json::to_string(&vis).unwrap();
        assert!(json.contains("\"RdBu_r\""));
    }
}
