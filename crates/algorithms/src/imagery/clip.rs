//! Masking rasters to a site boundary
//!
//! A pixel is inside the boundary when its centre is. Pixels outside become
//! NaN, so clipped rasters keep the source grid.

use ndarray::Array2;

use crate::maybe_rayon::collect_rows;
use minescope_core::raster::Raster;
use minescope_core::SiteBoundary;

/// Per-pixel inside/outside flags for one grid
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryMask {
    inside: Array2<bool>,
}

impl BoundaryMask {
    pub fn shape(&self) -> (usize, usize) {
        self.inside.dim()
    }

    /// Whether pixel (row, col) lies inside the boundary
    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.inside.get((row, col)).copied().unwrap_or(false)
    }

    /// Number of pixels inside the boundary
    pub fn inside_count(&self) -> usize {
        self.inside.iter().filter(|v| **v).count()
    }

    /// Set every pixel outside the boundary to NaN.
    ///
    /// `raster` must be on the grid the mask was built from.
    pub fn apply(&self, raster: &Raster<f64>) -> Raster<f64> {
        let mut out = raster.map_valid(|v| v);
        if out.shape() != self.shape() {
            out.data_mut().fill(f64::NAN);
            return out;
        }
        ndarray::Zip::from(out.data_mut())
            .and(&self.inside)
            .for_each(|v, &inside| {
                if !inside {
                    *v = f64::NAN;
                }
            });
        out
    }
}

/// Rasterize `boundary` onto the grid of `template` by pixel centres
pub fn boundary_mask(template: &Raster<f64>, boundary: &SiteBoundary) -> BoundaryMask {
    let (rows, cols) = template.shape();
    let Some((min_x, min_y, max_x, max_y)) = boundary.bounds() else {
        return BoundaryMask {
            inside: Array2::from_elem((rows, cols), false),
        };
    };

    let data = collect_rows(rows, |row| {
        let mut row_data = vec![false; cols];
        for (col, out) in row_data.iter_mut().enumerate() {
            let (x, y) = template.pixel_to_geo(col, row);
            if x < min_x || x > max_x || y < min_y || y > max_y {
                continue;
            }
            *out = boundary.contains(x, y);
        }
        row_data
    });

    let inside = Array2::from_shape_vec((rows, cols), data)
        .unwrap_or_else(|_| Array2::from_elem((rows, cols), false));
    BoundaryMask { inside }
}

/// Clip one raster to `boundary`
pub fn clip_to_boundary(raster: &Raster<f64>, boundary: &SiteBoundary) -> Raster<f64> {
    boundary_mask(raster, boundary).apply(raster)
}
