//! Region statistics
//!
//! Reduces one index raster to summary statistics over the valid pixels
//! whose centre lies inside a site boundary.

use std::collections::BTreeMap;

use minescope_core::raster::Raster;
use minescope_core::SiteBoundary;
use serde::{Deserialize, Serialize};

use crate::imagery::boundary_mask;

/// Bin width used to find the most frequent value of a continuous index
pub const MODE_RESOLUTION: f64 = 1e-4;

/// Statistics of one band over one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub mode: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// Valid pixel values of `raster` inside `boundary`, row-major
pub fn pixel_values(raster: &Raster<f64>, boundary: &SiteBoundary) -> Vec<f64> {
    let mask = boundary_mask(raster, boundary);
    let (rows, cols) = raster.shape();

    let mut values = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            if !mask.contains(row, col) {
                continue;
            }
            let val = unsafe { raster.get_unchecked(row, col) };
            if raster.is_nodata(val) || !val.is_finite() {
                continue;
            }
            values.push(val);
        }
    }
    values
}

/// Reduce the pixels of `raster` inside `boundary`.
///
/// Returns `None` when no valid pixel falls inside the boundary.
pub fn reduce_region(raster: &Raster<f64>, boundary: &SiteBoundary) -> Option<RegionStats> {
    summarize_values(pixel_values(raster, boundary))
}

/// Statistics of a list of values; non-finite values are ignored.
///
/// `median` averages the two middle values of an even-sized list. `mode`
/// rounds values to [`MODE_RESOLUTION`] and returns the most frequent bin,
/// the smallest one on ties.
pub fn summarize_values(mut vals: Vec<f64>) -> Option<RegionStats> {
    vals.retain(|v| v.is_finite());
    if vals.is_empty() {
        return None;
    }

    let count = vals.len();
    let sum: f64 = vals.iter().sum();
    let mean = sum / count as f64;
    let var = vals.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / count as f64;
    let std_dev = var.sqrt();

    vals.sort_by(f64::total_cmp);
    let min = vals[0];
    let max = vals[count - 1];

    let median = if count % 2 == 0 {
        (vals[count / 2 - 1] + vals[count / 2]) / 2.0
    } else {
        vals[count / 2]
    };

    Some(RegionStats {
        count,
        mean,
        median,
        mode: mode(&vals),
        std_dev,
        min,
        max,
    })
}

fn mode(vals: &[f64]) -> f64 {
    let mut bins: BTreeMap<i64, usize> = BTreeMap::new();
    for v in vals {
        *bins.entry((v / MODE_RESOLUTION).round() as i64).or_default() += 1;
    }

    // BTreeMap iterates ascending, so the first maximum is the smallest bin
    let mut best = (0i64, 0usize);
    for (bin, n) in bins {
        if n > best.1 {
            best = (bin, n);
        }
    }
    best.0 as f64 * MODE_RESOLUTION
}
