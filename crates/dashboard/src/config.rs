//! Dashboard configuration: the monitored sites and where their data lives.
//!
//! A configuration is a JSON document; every field except `sites` is
//! optional. [`DashboardConfig::default`] carries the four built-in sites.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use minescope_algorithms::imagery::IndexOptions;
use minescope_archive::{AnnualPolicy, SelectionMode};
use minescope_core::{AttributeValue, FeatureCollection, RegionOfInterest, SiteBoundary};
use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, Result};
use crate::series::SeriesRequest;

/// Map zoom level used by every site page
pub const DEFAULT_ZOOM: u8 = 13;

/// Histogram bin count used when a site does not set one
pub const DEFAULT_HISTOGRAM_BINS: usize = 20;

// ---------------------------------------------------------------------------
// Boundary filters
// ---------------------------------------------------------------------------

/// Attribute filter narrowing the mine polygon collection to one site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoundaryFilter {
    /// Features whose `key` attribute is one of `values`
    AttributeIn {
        key: String,
        values: Vec<AttributeValue>,
    },
    /// Features whose `key` attribute equals `value`
    AttributeEq { key: String, value: AttributeValue },
}

impl BoundaryFilter {
    pub fn area_in(values: &[f64]) -> Self {
        BoundaryFilter::AttributeIn {
            key: "AREA".into(),
            values: values.iter().copied().map(AttributeValue::Float).collect(),
        }
    }

    pub fn apply(&self, features: &FeatureCollection) -> FeatureCollection {
        match self {
            BoundaryFilter::AttributeIn { key, values } => features.filter_in(key, values),
            BoundaryFilter::AttributeEq { key, value } => features.filter_eq(key, value),
        }
    }
}

// ---------------------------------------------------------------------------
// Sites
// ---------------------------------------------------------------------------

fn default_zoom() -> u8 {
    DEFAULT_ZOOM
}

fn default_bins() -> usize {
    DEFAULT_HISTOGRAM_BINS
}

/// One monitored mine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Short identifier used on the command line
    pub id: String,
    /// Page header
    pub header: String,
    /// Map centre `[lat, lon]`
    pub center: [f64; 2],
    #[serde(default = "default_zoom")]
    pub zoom: u8,
    /// Region passed to scene searches
    pub roi: RegionOfInterest,
    pub boundary: BoundaryFilter,
    pub start_year: i32,
    /// Inclusive
    pub end_year: i32,
    #[serde(default)]
    pub mode: SelectionMode,
    /// Append the latest clear scene after the yearly series
    #[serde(default)]
    pub include_latest: bool,
    /// Restrict NMDI to (0, 2)
    #[serde(default)]
    pub mask_nmdi: bool,
    #[serde(default = "default_bins")]
    pub histogram_bins: usize,
}

impl SiteConfig {
    pub fn years(&self) -> Vec<i32> {
        (self.start_year..=self.end_year).collect()
    }

    /// Series request covering the whole configured year range
    pub fn series_request(&self) -> SeriesRequest {
        SeriesRequest {
            site: self.id.clone(),
            region: self.roi.clone(),
            years: self.years(),
            mode: self.mode,
            include_latest: self.include_latest,
            options: IndexOptions::default().with_nmdi_mask(self.mask_nmdi),
        }
    }

    /// The site footprint out of the full mine polygon collection
    pub fn boundary(&self, features: &FeatureCollection) -> Result<SiteBoundary> {
        let selected = self.boundary.apply(features);
        tracing::debug!(site = %self.id, matched = selected.len(), "filtered boundary features");
        Ok(SiteBoundary::from_features(&selected)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(DashboardError::Config("site id must not be empty".into()));
        }
        if self.end_year < self.start_year {
            return Err(DashboardError::Config(format!(
                "site '{}': end_year {} is before start_year {}",
                self.id, self.end_year, self.start_year
            )));
        }
        if self.histogram_bins == 0 {
            return Err(DashboardError::Config(format!(
                "site '{}': histogram_bins must be positive",
                self.id
            )));
        }
        if let RegionOfInterest::Polygon { ring } = &self.roi {
            if ring.len() < 3 {
                return Err(DashboardError::Config(format!(
                    "site '{}': polygon region needs at least 3 vertices",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Whole configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// GeoJSON feature collection with every mine polygon
    #[serde(default)]
    pub boundaries: Option<PathBuf>,
    /// STAC ItemCollection JSON of the local scene archive
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    pub sites: Vec<SiteConfig>,
}

impl DashboardConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: DashboardConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file. Relative data paths resolve against the
    /// file's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Self::from_json(&std::fs::read_to_string(path)?)?;
        if let Some(dir) = path.parent() {
            let resolve = |p: PathBuf| if p.is_relative() { dir.join(p) } else { p };
            config.boundaries = config.boundaries.map(resolve);
            config.catalog = config.catalog.map(resolve);
        }
        Ok(config)
    }

    pub fn site(&self, id: &str) -> Result<&SiteConfig> {
        self.sites
            .iter()
            .find(|s| s.id.eq_ignore_ascii_case(id))
            .ok_or_else(|| DashboardError::UnknownSite(id.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.sites.is_empty() {
            return Err(DashboardError::Config("no sites configured".into()));
        }
        let mut seen = HashSet::new();
        for site in &self.sites {
            site.validate()?;
            if !seen.insert(site.id.to_ascii_lowercase()) {
                return Err(DashboardError::Config(format!("duplicate site id '{}'", site.id)));
            }
        }
        Ok(())
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        let annual = |id: &str, header: &str, (lat, lon): (f64, f64), areas: &[f64]| SiteConfig {
            id: id.into(),
            header: header.into(),
            center: [lat, lon],
            zoom: DEFAULT_ZOOM,
            roi: RegionOfInterest::point(lon, lat),
            boundary: BoundaryFilter::area_in(areas),
            start_year: 2018,
            end_year: 2022,
            mode: SelectionMode::Annual(AnnualPolicy::Lowest),
            include_latest: true,
            mask_nmdi: false,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
        };

        let sites = vec![
            annual(
                "kajaran",
                "Kajaran Mine - Armenia",
                (39.146828, 46.147651),
                &[4.46054124, 0.94310862, 0.9555462, 0.40513458],
            ),
            annual(
                "dome",
                "Dome Mine - Timmins, Ontario, Canada",
                (48.458284, -81.240261),
                &[8.93758181, 3.93418783],
            ),
            annual(
                "assarel",
                "Assarel Medet - Bulgaria",
                (42.545207, 24.119465),
                &[6.47028179, 9.57015368],
            ),
            SiteConfig {
                id: "adamow".into(),
                header: "KWB Adamów".into(),
                center: [52.010558, 18.629901],
                zoom: DEFAULT_ZOOM,
                roi: RegionOfInterest::point(18.629901, 52.010558),
                boundary: BoundaryFilter::AttributeEq {
                    key: "system:index".into(),
                    value: AttributeValue::String("000000000000000016ed".into()),
                },
                start_year: 2018,
                end_year: 2023,
                mode: SelectionMode::SeasonalPair,
                include_latest: false,
                mask_nmdi: false,
                histogram_bins: DEFAULT_HISTOGRAM_BINS,
            },
        ];

        Self {
            boundaries: None,
            catalog: None,
            sites,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINES: &str = r#"{
      "type": "FeatureCollection",
      "features": [
        {"type": "Feature", "id": "000000000000000016ed",
         "properties": {"AREA": 12.5},
         "geometry": {"type": "Polygon", "coordinates": [[[18.6,52.0],[18.7,52.0],[18.7,52.1],[18.6,52.1],[18.6,52.0]]]}},
        {"type": "Feature", "id": "a1",
         "properties": {"AREA": 6.47028179},
         "geometry": {"type": "Polygon", "coordinates": [[[24.1,42.5],[24.2,42.5],[24.2,42.6],[24.1,42.5]]]}},
        {"type": "Feature", "id": "a2",
         "properties": {"AREA": 9.57015368},
         "geometry": {"type": "Polygon", "coordinates": [[[24.0,42.5],[24.1,42.5],[24.1,42.6],[24.0,42.5]]]}}
      ]
    }"#;

    #[test]
    fn default_sites_are_valid() {
        let config = DashboardConfig::default();
        config.validate().unwrap();
        assert_eq!(config.sites.len(), 4);

        let kajaran = config.site("Kajaran").unwrap();
        assert_eq!(kajaran.years(), vec![2018, 2019, 2020, 2021, 2022]);
        assert!(kajaran.include_latest);

        let adamow = config.site("adamow").unwrap();
        assert_eq!(adamow.mode, SelectionMode::SeasonalPair);
        assert_eq!(adamow.years().len(), 6);
        assert!(!adamow.include_latest);
    }

    #[test]
    fn unknown_site() {
        assert!(matches!(
            DashboardConfig::default().site("bingham"),
            Err(DashboardError::UnknownSite(_))
        ));
    }

    #[test]
    fn boundary_filters_select_site_polygons() {
        let features = FeatureCollection::from_geojson_str(MINES).unwrap();
        let config = DashboardConfig::default();

        let assarel = config.site("assarel").unwrap().boundary(&features).unwrap();
        assert_eq!(assarel.shape().0.len(), 2);

        let adamow = config.site("adamow").unwrap().boundary(&features).unwrap();
        assert_eq!(adamow.shape().0.len(), 1);
        assert!(adamow.contains(18.65, 52.05));

        assert!(config.site("dome").unwrap().boundary(&features).is_err());
    }

    #[test]
    fn json_with_defaults() {
        let config = DashboardConfig::from_json(
            r#"{
              "catalog": "scenes/items.json",
              "sites": [{
                "id": "kajaran",
                "header": "Kajaran",
                "center": [39.146828, 46.147651],
                "roi": {"point": {"lon": 46.147651, "lat": 39.146828}},
                "boundary": {"type": "attribute_in", "key": "AREA", "values": [4.46054124]},
                "start_year": 2018,
                "end_year": 2022,
                "mode": {"mode": "annual", "policy": "second_lowest"},
                "mask_nmdi": true
              }]
            }"#,
        )
        .unwrap();
        let site = &config.sites[0];
        assert_eq!(site.zoom, DEFAULT_ZOOM);
        assert_eq!(site.histogram_bins, DEFAULT_HISTOGRAM_BINS);
        assert_eq!(site.mode, SelectionMode::Annual(AnnualPolicy::SecondLowest));
        assert!(site.series_request().options.mask_nmdi);
        assert_eq!(config.catalog, Some(PathBuf::from("scenes/items.json")));
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let mut config = DashboardConfig::default();
        config.sites[0].end_year = 2010;
        assert!(matches!(config.validate(), Err(DashboardError::Config(_))));

        let mut config = DashboardConfig::default();
        config.sites[1].id = "KAJARAN".into();
        assert!(config.validate().is_err());

        let mut config = DashboardConfig::default();
        config.sites[2].histogram_bins = 0;
        assert!(config.validate().is_err());

        assert!(DashboardConfig::from_json(r#"{"sites": []}"#).is_err());
    }

    #[test]
    fn load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DashboardConfig::default();
        config.boundaries = Some(PathBuf::from("mines.geojson"));
        config.catalog = Some(PathBuf::from("/data/items.json"));
        let path = dir.path().join("minescope.json");
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = DashboardConfig::load(&path).unwrap();
        assert_eq!(loaded.boundaries, Some(dir.path().join("mines.geojson")));
        assert_eq!(loaded.catalog, Some(PathBuf::from("/data/items.json")));
        let ids: Vec<&str> = loaded.sites.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["kajaran", "dome", "assarel", "adamow"]);
    }
}
