//! Digital number to reflectance scaling

use minescope_core::raster::Raster;

/// Sentinel-2 L2A surface reflectance is stored as DN = reflectance * 10000
pub const REFLECTANCE_SCALE: f64 = 10_000.0;

/// Divide every valid cell by [`REFLECTANCE_SCALE`]; no-data cells become NaN
pub fn to_reflectance(band: &Raster<f64>) -> Raster<f64> {
    band.map_valid(|dn| dn / REFLECTANCE_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_and_masks_nodata() {
        let mut dn = Raster::from_vec(vec![2500.0, 0.0, 10_000.0], 1, 3).unwrap();
        dn.set_nodata(Some(0.0));
        let refl = to_reflectance(&dn);
        assert_eq!(refl.get(0, 0).unwrap(), 0.25);
        assert!(refl.get(0, 1).unwrap().is_nan());
        assert_eq!(refl.get(0, 2).unwrap(), 1.0);
    }
}
