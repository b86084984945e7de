//! Cell value types

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// A type a [`Raster`](super::Raster) cell can hold.
///
/// Scene bands are unsigned digital numbers, index bands are `f64`. A cell is
/// no-data when it equals the raster's no-data value or is NaN.
pub trait RasterElement:
    Copy + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Always false for integer types
    fn is_nan_value(self) -> bool;

    fn is_nodata(&self, nodata: Option<Self>) -> bool {
        self.is_nan_value() || nodata == Some(*self)
    }

    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }
}

macro_rules! impl_integer_element {
    ($($t:ty),*) => {
        $(
            impl RasterElement for $t {
                fn is_nan_value(self) -> bool {
                    false
                }
            }
        )*
    };
}

impl_integer_element!(u8, u16, u32, i16, i32);

impl RasterElement for f32 {
    fn is_nan_value(self) -> bool {
        self.is_nan()
    }
}

impl RasterElement for f64 {
    fn is_nan_value(self) -> bool {
        self.is_nan()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_is_always_nodata() {
        assert!(f64::NAN.is_nodata(None));
        assert!(f64::NAN.is_nodata(Some(-9999.0)));
        assert!(f32::NAN.is_nodata(Some(0.0)));
    }

    #[test]
    fn sentinel_nodata_is_exact() {
        assert!(0u16.is_nodata(Some(0)));
        assert!(!1u16.is_nodata(Some(0)));
        assert!(!0u16.is_nodata(None));
        assert!((-9999.0f64).is_nodata(Some(-9999.0)));
        assert!(!(-9998.5f64).is_nodata(Some(-9999.0)));
    }

    #[test]
    fn widening() {
        assert_eq!(4095u16.to_f64(), Some(4095.0));
        assert_eq!((-3i16).to_f64(), Some(-3.0));
    }
}
