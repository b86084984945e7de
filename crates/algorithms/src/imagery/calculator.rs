//! Seven-band index stack for one scene

use tracing::debug;

use super::clip::boundary_mask;
use super::indices::{self, bands, SpectralIndex};
use super::reflectance::to_reflectance;
use minescope_core::image::{TAG_DATE, TAG_YEAR};
use minescope_core::raster::Raster;
use minescope_core::{MultiBandImage, Result, SiteBoundary, TagValue};

/// Which temporal tags the output image carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TemporalLabel {
    /// `year` only, for one image per year
    #[default]
    Annual,
    /// `year` and `date` (`YYYY-MM-DD`), for several images per year
    Seasonal,
}

/// Options for [`compute_indices`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IndexOptions {
    /// Restrict NMDI to the open interval (0, 2)
    pub mask_nmdi: bool,
    pub label: TemporalLabel,
}

impl IndexOptions {
    pub fn seasonal() -> Self {
        Self {
            label: TemporalLabel::Seasonal,
            ..Self::default()
        }
    }

    pub fn with_nmdi_mask(mut self, mask: bool) -> Self {
        self.mask_nmdi = mask;
        self
    }
}

struct Reflectance {
    blue: Raster<f64>,
    green: Raster<f64>,
    red: Raster<f64>,
    nir: Raster<f64>,
    nir_a: Raster<f64>,
    swir1: Raster<f64>,
    swir2: Raster<f64>,
}

impl Reflectance {
    fn from_image(image: &MultiBandImage) -> Result<Self> {
        let load = |name: &str| image.require_band(name).map(to_reflectance);
        Ok(Self {
            blue: load(bands::BLUE)?,
            green: load(bands::GREEN)?,
            red: load(bands::RED)?,
            nir: load(bands::NIR)?,
            nir_a: load(bands::NIR_A)?,
            swir1: load(bands::SWIR1)?,
            swir2: load(bands::SWIR2)?,
        })
    }

    fn index(&self, index: SpectralIndex) -> Result<Raster<f64>> {
        match index {
            SpectralIndex::Ndvi => indices::ndvi(&self.nir, &self.red),
            SpectralIndex::Ndwi1 => indices::ndwi1(&self.nir_a, &self.swir2),
            SpectralIndex::Ndwi2 => indices::ndwi2(&self.green, &self.nir),
            SpectralIndex::Nmdi => indices::nmdi(&self.nir_a, &self.swir1, &self.swir2),
            SpectralIndex::Evi => indices::evi(&self.nir, &self.red, &self.blue),
            SpectralIndex::Msi => indices::msi(&self.swir1, &self.nir_a),
            SpectralIndex::Msavi2 => indices::msavi2(&self.nir, &self.red),
        }
    }
}

/// Compute NDVI, NDWI1, NDWI2, NMDI, EVI, MSI and MSAVI2 from a raw scene.
///
/// `image` must hold the Sentinel-2 bands B2, B3, B4, B8, B8A, B11 and B12 as
/// digital numbers. Every output band is clipped to `boundary`. The result
/// keeps the scene id, acquisition time and tags, and adds the temporal tags
/// selected by `options.label`.
pub fn compute_indices(
    image: &MultiBandImage,
    boundary: &SiteBoundary,
    options: IndexOptions,
) -> Result<MultiBandImage> {
    let refl = Reflectance::from_image(image)?;
    let mask = boundary_mask(&refl.nir, boundary);
    debug!(
        scene = image.id(),
        inside = mask.inside_count(),
        "computing index stack"
    );

    let time_start = image.time_start();
    let mut out = MultiBandImage::new(image.id(), time_start);
    for (key, value) in image.tags() {
        out = out.with_tag(key.clone(), value.clone());
    }

    for index in SpectralIndex::ALL {
        let mut raster = refl.index(index)?;
        if index == SpectralIndex::Nmdi && options.mask_nmdi {
            raster = indices::mask_nmdi_range(&raster);
        }
        out = out.with_band(index.name(), mask.apply(&raster))?;
    }

    out = out.with_tag(TAG_YEAR, TagValue::Int(i64::from(image.acquisition_year())));
    if options.label == TemporalLabel::Seasonal {
        out = out.with_tag(
            TAG_DATE,
            TagValue::Text(time_start.format("%Y-%m-%d").to_string()),
        );
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};
    use minescope_core::{Error, GeoTransform};

    fn band(value: f64) -> Raster<f64> {
        let mut r = Raster::filled(3, 3, value);
        r.set_transform(GeoTransform::new(0.0, 3.0, 1.0, -1.0));
        r
    }

    fn scene() -> MultiBandImage {
        let t = Utc.with_ymd_and_hms(2020, 8, 17, 9, 40, 0).unwrap();
        let dn = [
            ("B2", 500.0),
            ("B3", 800.0),
            ("B4", 1000.0),
            ("B8", 5000.0),
            ("B8A", 4000.0),
            ("B11", 2000.0),
            ("B12", 1000.0),
        ];
        let mut img = MultiBandImage::new("S2A_20200817", t)
            .with_tag("CLOUDY_PIXEL_PERCENTAGE", TagValue::Float(3.5));
        for (name, v) in dn {
            img = img.with_band(name, band(v)).unwrap();
        }
        img
    }

    fn whole_grid() -> SiteBoundary {
        SiteBoundary::from_rect(0.0, 0.0, 3.0, 3.0)
    }

    #[test]
    fn test_stack_order_and_count() {
        let out = compute_indices(&scene(), &whole_grid(), IndexOptions::default()).unwrap();
        assert_eq!(
            out.band_names(),
            vec!["NDVI", "NDWI1", "NDWI2", "NMDI", "EVI", "MSI", "MSAVI2"]
        );
    }

    #[test]
    fn test_values_use_reflectance() {
        let out = compute_indices(&scene(), &whole_grid(), IndexOptions::default()).unwrap();
        let at = |name: &str| out.band(name).unwrap().get(1, 1).unwrap();

        assert_relative_eq!(at("NDVI"), 0.4 / 0.6, epsilon = 1e-12);
        assert_relative_eq!(at("MSI"), 0.5, epsilon = 1e-12);
        assert_relative_eq!(at("EVI"), 1.0 / 1.725, epsilon = 1e-12);
        assert_relative_eq!(at("NMDI"), 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_tags() {
        let out = compute_indices(&scene(), &whole_grid(), IndexOptions::seasonal()).unwrap();
        assert_eq!(out.tag(TAG_YEAR).and_then(TagValue::as_int), Some(2020));
        assert_eq!(out.tag(TAG_DATE).and_then(TagValue::as_text), Some("2020-08-17"));
        assert_eq!(
            out.tag("CLOUDY_PIXEL_PERCENTAGE").and_then(TagValue::as_float),
            Some(3.5)
        );
        assert_eq!(out.time_start(), scene().time_start());

        let annual = compute_indices(&scene(), &whole_grid(), IndexOptions::default()).unwrap();
        assert!(annual.tag(TAG_DATE).is_none());
    }

    #[test]
    fn test_clip_applies_to_every_band() {
        let corner = SiteBoundary::from_rect(0.0, 2.0, 1.0, 3.0);
        let out = compute_indices(&scene(), &corner, IndexOptions::default()).unwrap();
        for (_, raster) in out.bands() {
            assert_eq!(raster.valid_count(), 1);
            assert!(!raster.get(0, 0).unwrap().is_nan());
        }
    }

    #[test]
    fn test_missing_band() {
        let img = scene().select(&["B2", "B3", "B4", "B8", "B8A", "B11"]).unwrap();
        let err = compute_indices(&img, &whole_grid(), IndexOptions::default()).unwrap_err();
        assert!(matches!(err, Error::MissingBand { ref band, .. } if band == "B12"));
    }

    #[test]
    fn test_nmdi_mask_option() {
        let mut img = MultiBandImage::new("s", scene().time_start());
        // d = SWIR1 - SWIR2 = -0.3 -> NMDI = 0.7 / 0.1
        for (name, v) in [
            ("B2", 500.0),
            ("B3", 800.0),
            ("B4", 1000.0),
            ("B8", 5000.0),
            ("B8A", 4000.0),
            ("B11", 1000.0),
            ("B12", 4000.0),
        ] {
            img = img.with_band(name, band(v)).unwrap();
        }
        let plain = compute_indices(&img, &whole_grid(), IndexOptions::default()).unwrap();
        assert_relative_eq!(plain.band("NMDI").unwrap().get(0, 0).unwrap(), 7.0, epsilon = 1e-9);

        let masked = compute_indices(
            &img,
            &whole_grid(),
            IndexOptions::default().with_nmdi_mask(true),
        )
        .unwrap();
        assert!(masked.band("NMDI").unwrap().get(0, 0).unwrap().is_nan());
    }

    #[test]
    fn test_deterministic() {
        let a = compute_indices(&scene(), &whole_grid(), IndexOptions::default()).unwrap();
        let b = compute_indices(&scene(), &whole_grid(), IndexOptions::default()).unwrap();
        for ((_, ra), (_, rb)) in a.bands().zip(b.bands()) {
            let bits_a: Vec<u64> = ra.data().iter().map(|v| v.to_bits()).collect();
            let bits_b: Vec<u64> = rb.data().iter().map(|v| v.to_bits()).collect();
            assert_eq!(bits_a, bits_b);
        }
    }
}
