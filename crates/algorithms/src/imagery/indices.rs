//! Spectral vegetation, water and moisture indices
//!
//! All functions take single-band rasters in surface reflectance (0..1, see
//! [`super::to_reflectance`]) and return a new `f64` raster on the same grid.
//! A pixel is NaN when any input is no-data or when the formula's
//! denominator is exactly zero.

use std::fmt;
use std::str::FromStr;

use crate::maybe_rayon::collect_rows;
use minescope_core::raster::Raster;
use minescope_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Sentinel-2 band names used by the indices
pub mod bands {
    pub const BLUE: &str = "B2";
    pub const GREEN: &str = "B3";
    pub const RED: &str = "B4";
    pub const NIR: &str = "B8";
    pub const NIR_A: &str = "B8A";
    pub const SWIR1: &str = "B11";
    pub const SWIR2: &str = "B12";
}

/// The seven derived bands, in output stacking order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpectralIndex {
    /// Normalized Difference Vegetation Index
    Ndvi,
    /// Normalized Difference Water Index, NIR narrow vs SWIR2 (Gao)
    Ndwi1,
    /// Normalized Difference Water Index, green vs NIR (McFeeters)
    Ndwi2,
    /// Normalized Multi-band Drought Index
    Nmdi,
    /// Enhanced Vegetation Index
    Evi,
    /// Moisture Stress Index
    Msi,
    /// Modified Soil Adjusted Vegetation Index 2
    Msavi2,
}

impl SpectralIndex {
    /// All indices in stacking order
    pub const ALL: [SpectralIndex; 7] = [
        SpectralIndex::Ndvi,
        SpectralIndex::Ndwi1,
        SpectralIndex::Ndwi2,
        SpectralIndex::Nmdi,
        SpectralIndex::Evi,
        SpectralIndex::Msi,
        SpectralIndex::Msavi2,
    ];

    /// Band name of the index in a computed image
    pub fn name(self) -> &'static str {
        match self {
            SpectralIndex::Ndvi => "NDVI",
            SpectralIndex::Ndwi1 => "NDWI1",
            SpectralIndex::Ndwi2 => "NDWI2",
            SpectralIndex::Nmdi => "NMDI",
            SpectralIndex::Evi => "EVI",
            SpectralIndex::Msi => "MSI",
            SpectralIndex::Msavi2 => "MSAVI2",
        }
    }

    /// Source bands the formula reads, in argument order
    pub fn required_bands(self) -> &'static [&'static str] {
        use bands::*;
        match self {
            SpectralIndex::Ndvi => &[NIR, RED],
            SpectralIndex::Ndwi1 => &[NIR_A, SWIR2],
            SpectralIndex::Ndwi2 => &[GREEN, NIR],
            SpectralIndex::Nmdi => &[NIR_A, SWIR1, SWIR2],
            SpectralIndex::Evi => &[NIR, RED, BLUE],
            SpectralIndex::Msi => &[SWIR1, NIR_A],
            SpectralIndex::Msavi2 => &[NIR, RED],
        }
    }
}

impl fmt::Display for SpectralIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SpectralIndex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SpectralIndex::ALL
            .into_iter()
            .find(|idx| idx.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidParameter {
                name: "index",
                value: s.to_string(),
                reason: "expected one of NDVI, NDWI1, NDWI2, NMDI, EVI, MSI, MSAVI2".into(),
            })
    }
}

// ---------------------------------------------------------------------------
// Generic normalized difference
// ---------------------------------------------------------------------------

/// `(a - b) / (a + b)`, NaN where `a + b == 0`
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    pixelwise2(band_a, band_b, |a, b| ratio(a - b, a + b))
}

// ---------------------------------------------------------------------------
// NDVI
// ---------------------------------------------------------------------------

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
///
/// Dense vegetation sits around 0.6 to 0.9, bare spoil heaps and open pits
/// near 0.1, water below 0.
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, red)
}

// ---------------------------------------------------------------------------
// NDWI
// ---------------------------------------------------------------------------

/// Vegetation water content index (Gao, 1996)
///
/// `NDWI1 = (NIR_A - SWIR2) / (NIR_A + SWIR2)`
pub fn ndwi1(nir_a: &Raster<f64>, swir2: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir_a, swir2)
}

/// Open water index (McFeeters, 1996)
///
/// `NDWI2 = (Green - NIR) / (NIR + Green)`
///
/// Positive values indicate water bodies such as tailing ponds.
pub fn ndwi2(green: &Raster<f64>, nir: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(green, nir)
}

// ---------------------------------------------------------------------------
// NMDI
// ---------------------------------------------------------------------------

/// Normalized Multi-band Drought Index (Wang & Qu, 2007)
///
/// `NMDI = (NIR_A - (SWIR1 - SWIR2)) / (NIR_A + (SWIR1 - SWIR2))`
pub fn nmdi(
    nir_a: &Raster<f64>,
    swir1: &Raster<f64>,
    swir2: &Raster<f64>,
) -> Result<Raster<f64>> {
    pixelwise3(nir_a, swir1, swir2, |n, s1, s2| {
        let d = s1 - s2;
        ratio(n - d, n + d)
    })
}

/// Keep NMDI pixels strictly inside (0, 2), NaN elsewhere
pub fn mask_nmdi_range(nmdi: &Raster<f64>) -> Raster<f64> {
    nmdi.map_valid(|v| if v > 0.0 && v < 2.0 { v } else { f64::NAN })
}

// ---------------------------------------------------------------------------
// EVI
// ---------------------------------------------------------------------------

/// Enhanced Vegetation Index (Huete et al., 2002)
///
/// `EVI = 2.5 * (NIR - Red) / (NIR + 6 * Red - 7.5 * Blue + 1)`
pub fn evi(nir: &Raster<f64>, red: &Raster<f64>, blue: &Raster<f64>) -> Result<Raster<f64>> {
    pixelwise3(nir, red, blue, |n, r, b| {
        ratio(2.5 * (n - r), n + 6.0 * r - 7.5 * b + 1.0)
    })
}

// ---------------------------------------------------------------------------
// MSI
// ---------------------------------------------------------------------------

/// Moisture Stress Index
///
/// `MSI = SWIR1 / NIR_A`
///
/// Not bounded; healthy vegetation typically sits between 0.4 and 2.
pub fn msi(swir1: &Raster<f64>, nir_a: &Raster<f64>) -> Result<Raster<f64>> {
    pixelwise2(swir1, nir_a, ratio)
}

// ---------------------------------------------------------------------------
// MSAVI2
// ---------------------------------------------------------------------------

/// Modified Soil Adjusted Vegetation Index (Qi et al., 1994)
///
/// `MSAVI2 = (2 * NIR + 1 - sqrt((2 * NIR + 1)^2 - 8 * (NIR - Red))) / 2`
///
/// A negative radicand yields NaN.
pub fn msavi2(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    pixelwise2(nir, red, |n, r| {
        let k = 2.0 * n + 1.0;
        let radicand = k * k - 8.0 * (n - r);
        if radicand < 0.0 {
            return f64::NAN;
        }
        (k - radicand.sqrt()) / 2.0
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ratio(num: f64, denom: f64) -> f64 {
    if denom == 0.0 {
        f64::NAN
    } else {
        num / denom
    }
}

fn is_nodata_f64(value: f64, nodata: Option<f64>) -> bool {
    if value.is_nan() {
        return true;
    }
    match nodata {
        Some(nd) => (value - nd).abs() < f64::EPSILON,
        None => false,
    }
}

pub(crate) fn check_dimensions(a: &Raster<f64>, b: &Raster<f64>) -> Result<()> {
    if !a.same_grid(b) {
        return Err(Error::SizeMismatch {
            er: a.rows(),
            ec: a.cols(),
            ar: b.rows(),
            ac: b.cols(),
        });
    }
    Ok(())
}

fn pixelwise2<F>(a: &Raster<f64>, b: &Raster<f64>, f: F) -> Result<Raster<f64>>
where
    F: Fn(f64, f64) -> f64 + Sync,
{
    check_dimensions(a, b)?;

    let (rows, cols) = a.shape();
    let (nd_a, nd_b) = (a.nodata(), b.nodata());

    let data = collect_rows(rows, |row| {
        let mut row_data = vec![f64::NAN; cols];
        for (col, out) in row_data.iter_mut().enumerate() {
            let va = unsafe { a.get_unchecked(row, col) };
            let vb = unsafe { b.get_unchecked(row, col) };
            if is_nodata_f64(va, nd_a) || is_nodata_f64(vb, nd_b) {
                continue;
            }
            *out = f(va, vb);
        }
        row_data
    });

    a.with_data(data, Some(f64::NAN))
}

fn pixelwise3<F>(a: &Raster<f64>, b: &Raster<f64>, c: &Raster<f64>, f: F) -> Result<Raster<f64>>
where
    F: Fn(f64, f64, f64) -> f64 + Sync,
{
    check_dimensions(a, b)?;
    check_dimensions(a, c)?;

    let (rows, cols) = a.shape();
    let (nd_a, nd_b, nd_c) = (a.nodata(), b.nodata(), c.nodata());

    let data = collect_rows(rows, |row| {
        let mut row_data = vec![f64::NAN; cols];
        for (col, out) in row_data.iter_mut().enumerate() {
            let va = unsafe { a.get_unchecked(row, col) };
            let vb = unsafe { b.get_unchecked(row, col) };
            let vc = unsafe { c.get_unchecked(row, col) };
            if is_nodata_f64(va, nd_a) || is_nodata_f64(vb, nd_b) || is_nodata_f64(vc, nd_c) {
                continue;
            }
            *out = f(va, vb, vc);
        }
        row_data
    });

    a.with_data(data, Some(f64::NAN))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
