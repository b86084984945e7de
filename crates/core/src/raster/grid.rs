//! Single-band raster grid

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement};
use ndarray::Array2;

/// One georeferenced band.
///
/// Scene bands hold digital numbers with an optional no-data value; derived
/// index bands are `f64` with NaN as no-data.
///
/// ```ignore
/// use minescope_core::Raster;
///
/// let mut red: Raster<f64> = Raster::filled(100, 100, 812.0);
/// red.set(10, 20, 901.0)?;
/// assert_eq!(red.get(10, 20)?, 901.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Raster<T: RasterElement> {
    /// Cells indexed `(row, col)`
    data: Array2<T>,
    transform: GeoTransform,
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            nodata: None,
        }
    }

    /// Zero-filled raster on the default grid
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Raster from row-major cell values
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        let array = Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self::from_array(array))
    }

    /// New cell values on this raster's grid; `data` is row-major
    pub fn with_data<U: RasterElement>(&self, data: Vec<U>, nodata: Option<U>) -> Result<Raster<U>> {
        let mut output = Raster::from_vec(data, self.rows(), self.cols())?;
        output.transform = self.transform;
        output.nodata = nodata;
        Ok(output)
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Same shape and transform, so cells correspond one to one
    pub fn same_grid<U: RasterElement>(&self, other: &Raster<U>) -> bool {
        self.shape() == other.shape() && self.transform == other.transform
    }

    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data.get((row, col)).copied().ok_or(Error::IndexOutOfBounds {
            row,
            col,
            rows: self.rows(),
            cols: self.cols(),
        })
    }

    /// # Safety
    /// `row < self.rows()` and `col < self.cols()`
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        let (rows, cols) = self.shape();
        match self.data.get_mut((row, col)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Error::IndexOutOfBounds { row, col, rows, cols }),
        }
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Map coordinates of the centre of cell `(row, col)`
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Finite, non-no-data cell values, row-major
    pub fn valid_values(&self) -> Vec<f64> {
        self.data
            .iter()
            .filter(|v| !self.is_nodata(**v))
            .filter_map(|v| v.to_f64())
            .filter(|v| v.is_finite())
            .collect()
    }

    pub fn valid_count(&self) -> usize {
        self.valid_values().len()
    }
}

impl Raster<f64> {
    /// Apply `f` to every valid cell; no-data cells become NaN and NaN is the
    /// no-data value of the result.
    pub fn map_valid<F>(&self, f: F) -> Raster<f64>
    where
        F: Fn(f64) -> f64,
    {
        let nodata = self.nodata;
        let data = self.data.mapv(|v| if v.is_nodata(nodata) { f64::NAN } else { f(v) });
        Raster {
            data,
            transform: self.transform,
            nodata: Some(f64::NAN),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_and_access() {
        let mut raster: Raster<u16> = Raster::new(10, 20);
        assert_eq!(raster.shape(), (10, 20));
        raster.set(5, 7, 1342).unwrap();
        assert_eq!(raster.get(5, 7).unwrap(), 1342);
        assert!(raster.get(10, 0).is_err());
        assert!(matches!(
            raster.set(0, 20, 1),
            Err(Error::IndexOutOfBounds { rows: 10, cols: 20, .. })
        ));
    }

    #[test]
    fn from_vec_rejects_wrong_length() {
        assert!(Raster::<f64>::from_vec(vec![1.0; 5], 2, 3).is_err());
    }

    #[test]
    fn with_data_keeps_grid() {
        let mut band: Raster<u16> = Raster::filled(1, 2, 0);
        band.set_transform(GeoTransform::new(46.1, 39.2, 0.001, -0.001));
        let index = band.with_data(vec![0.5, f64::NAN], Some(f64::NAN)).unwrap();
        assert!(index.same_grid(&band));
        assert!(band.with_data(vec![0.5], None).is_err());
    }

    #[test]
    fn valid_values_skip_nodata_and_nan() {
        let mut raster: Raster<f64> = Raster::from_vec(vec![1.0, 2.0, f64::NAN, -9999.0], 2, 2).unwrap();
        raster.set_nodata(Some(-9999.0));
        assert_eq!(raster.valid_values(), vec![1.0, 2.0]);
        assert_eq!(raster.valid_count(), 2);
    }

    #[test]
    fn map_valid_preserves_nodata() {
        let mut raster: Raster<f64> = Raster::from_vec(vec![10.0, 0.0], 1, 2).unwrap();
        raster.set_nodata(Some(0.0));
        let doubled = raster.map_valid(|v| v * 2.0);
        assert_eq!(doubled.get(0, 0).unwrap(), 20.0);
        assert!(doubled.get(0, 1).unwrap().is_nan());
    }

    #[test]
    fn same_grid_compares_transform() {
        let a: Raster<f64> = Raster::new(3, 3);
        let mut b: Raster<f64> = Raster::new(3, 3);
        assert!(a.same_grid(&b));
        b.set_transform(GeoTransform::new(5.0, 5.0, 1.0, -1.0));
        assert!(!a.same_grid(&b));
        assert!(!a.same_grid(&Raster::<f64>::new(3, 4)));
    }
}
