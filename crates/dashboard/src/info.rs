//! Reference text shown beside each index.

use minescope_algorithms::imagery::SpectralIndex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexInfo {
    pub index: SpectralIndex,
    pub name: &'static str,
    /// LaTeX, in Sentinel-2 band names
    pub equation: &'static str,
    pub description: &'static str,
    /// How to read high and low values
    pub interpretation: &'static str,
}

pub fn index_info(index: SpectralIndex) -> IndexInfo {
    let (name, equation, description, interpretation) = match index {
        SpectralIndex::Ndvi => (
            "Normalized Difference Vegetation Index",
            r"\mathrm{NDVI} = \frac{B8 - B4}{B8 + B4}",
            "Contrast between near-infrared reflected by leaf structure and red absorbed by chlorophyll.",
            "Dense healthy vegetation is above 0.6, bare soil and rock are near 0, water is negative.",
        ),
        SpectralIndex::Ndwi1 => (
            "Normalized Difference Water Index (Gao)",
            r"\mathrm{NDWI_1} = \frac{B8A - B12}{B8A + B12}",
            "Water content of vegetation canopies from narrow near-infrared against shortwave infrared.",
            "Higher values mean more canopy water; strongly negative values indicate dry or bare surfaces.",
        ),
        SpectralIndex::Ndwi2 => (
            "Normalized Difference Water Index (McFeeters)",
            r"\mathrm{NDWI_2} = \frac{B3 - B8}{B3 + B8}",
            "Open water delineation from green against near-infrared.",
            "Positive values mark open water such as tailings ponds and pit lakes.",
        ),
        SpectralIndex::Nmdi => (
            "Normalized Multi-band Drought Index",
            r"\mathrm{NMDI} = \frac{B8A - (B11 - B12)}{B8A + (B11 - B12)}",
            "Soil and vegetation moisture from one near-infrared and two shortwave infrared bands.",
            "Values rise with moisture; the meaningful range is between 0 and 2.",
        ),
        SpectralIndex::Evi => (
            "Enhanced Vegetation Index",
            r"\mathrm{EVI} = 2.5 \cdot \frac{B8 - B4}{B8 + 6 \cdot B4 - 7.5 \cdot B2 + 1}",
            "Vegetation greenness corrected for atmospheric and canopy background effects.",
            "Behaves like NDVI but saturates less over dense vegetation; typical values are 0.2 to 0.8.",
        ),
        SpectralIndex::Msi => (
            "Moisture Stress Index",
            r"\mathrm{MSI} = \frac{B11}{B8A}",
            "Ratio of shortwave infrared to narrow near-infrared reflectance.",
            "Higher values mean more water stress; green vegetation is usually between 0.4 and 2.",
        ),
        SpectralIndex::Msavi2 => (
            "Modified Soil Adjusted Vegetation Index 2",
            r"\mathrm{MSAVI_2} = \frac{2 \cdot B8 + 1 - \sqrt{(2 \cdot B8 + 1)^2 - 8 \cdot (B8 - B4)}}{2}",
            "Vegetation index that reduces the influence of bright bare soil.",
            "Suited to sparse cover around mine workings; values near 0 are bare ground.",
        ),
    };
    IndexInfo {
        index,
        name,
        equation,
        description,
        interpretation,
    }
}
