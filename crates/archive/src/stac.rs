//! STAC (SpatioTemporal Asset Catalog) scene archive on local disk.
//!
//! Reads a STAC ItemCollection JSON file, as returned by a STAC API
//! `/search` and saved to disk, whose data assets are single-band GeoTIFFs.
//! Relative asset hrefs resolve against the directory of the JSON file.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use minescope_core::io::read_band;
use minescope_core::{MultiBandImage, TagValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::archive::ImageArchive;
use crate::error::{ArchiveError, Result};
use crate::query::{SceneCollection, SceneQuery};
use crate::scene::{SceneRecord, CLOUD_COVER_PROPERTY};

/// Sentinel-2 bands loaded for index computation
pub const DEFAULT_BANDS: &[&str] = &["B2", "B3", "B4", "B8", "B8A", "B11", "B12"];

/// Digital number marking missing pixels in Sentinel-2 L2A products
pub const DEFAULT_NODATA: f64 = 0.0;

/// Earth Search common-name asset key of a Sentinel-2 band
fn common_name(band: &str) -> Option<&'static str> {
    match band {
        "B1" => Some("coastal"),
        "B2" => Some("blue"),
        "B3" => Some("green"),
        "B4" => Some("red"),
        "B5" => Some("rededge1"),
        "B6" => Some("rededge2"),
        "B7" => Some("rededge3"),
        "B8" => Some("nir"),
        "B8A" => Some("nir08"),
        "B9" => Some("nir09"),
        "B11" => Some("swir16"),
        "B12" => Some("swir22"),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Catalog types
// ---------------------------------------------------------------------------

/// A STAC Item Collection (GeoJSON FeatureCollection).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItemCollection {
    #[serde(rename = "type")]
    pub type_: String,

    pub features: Vec<StacItem>,
}

impl StacItemCollection {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// A single STAC Item (GeoJSON Feature).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItem {
    #[serde(rename = "type")]
    pub type_: String,

    pub id: String,

    /// Bounding box `[west, south, east, north]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,

    pub properties: StacItemProperties,

    pub assets: HashMap<String, StacAsset>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

impl StacItem {
    pub fn asset(&self, key: &str) -> Option<&StacAsset> {
        self.assets.get(key)
    }

    /// Asset of a Sentinel-2 band, by band name (`B8A`) or common name (`nir08`)
    pub fn band_asset(&self, band: &str) -> Option<&StacAsset> {
        self.asset(band)
            .or_else(|| common_name(band).and_then(|name| self.asset(name)))
    }

    /// Cloud cover from `eo:cloud_cover`, else from `CLOUDY_PIXEL_PERCENTAGE`
    pub fn cloud_cover(&self) -> Option<f64> {
        self.properties.eo_cloud_cover.or_else(|| {
            self.properties
                .extra
                .get(CLOUD_COVER_PROPERTY)
                .and_then(serde_json::Value::as_f64)
        })
    }

    /// Scene metadata of this item
    pub fn to_record(&self) -> Result<SceneRecord> {
        let datetime = self.properties.datetime.as_deref().ok_or_else(|| {
            ArchiveError::Catalog(format!("item '{}' has no datetime", self.id))
        })?;
        let time_start = DateTime::parse_from_rfc3339(datetime)
            .map_err(|e| ArchiveError::InvalidDate(format!("{datetime}: {e}")))?
            .with_timezone(&Utc);

        let bbox = match self.bbox.as_deref() {
            Some([w, s, e, n]) => Some([*w, *s, *e, *n]),
            // 3D bbox: [w, s, zmin, e, n, zmax]
            Some([w, s, _, e, n, _]) => Some([*w, *s, *e, *n]),
            _ => None,
        };

        let properties: BTreeMap<String, serde_json::Value> = self
            .properties
            .extra
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(SceneRecord {
            id: self.id.clone(),
            time_start,
            cloud_cover: self.cloud_cover(),
            bbox,
            properties,
        })
    }
}

/// STAC Item properties.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItemProperties {
    /// ISO 8601 datetime.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    /// Cloud cover percentage (EO extension).
    #[serde(rename = "eo:cloud_cover", skip_serializing_if = "Option::is_none")]
    pub eo_cloud_cover: Option<f64>,

    /// Platform name (e.g., "sentinel-2a").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// All other properties we don't model explicitly.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A single STAC Asset (file reference).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacAsset {
    /// Path or URL of the asset file.
    pub href: String,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Archive
// ---------------------------------------------------------------------------

/// Scene archive backed by a STAC ItemCollection file.
#[derive(Debug, Clone)]
pub struct LocalStacArchive {
    base_dir: PathBuf,
    items: Vec<StacItem>,
    bands: Vec<String>,
    nodata: Option<f64>,
}

impl LocalStacArchive {
    /// Read the ItemCollection at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let archive = Self::from_json(&text, base_dir)?;
        debug!(path = %path.display(), items = archive.items.len(), "opened STAC catalog");
        Ok(archive)
    }

    /// Parse an ItemCollection; relative hrefs resolve against `base_dir`
    pub fn from_json(text: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let collection: StacItemCollection = serde_json::from_str(text)?;
        if collection.type_ != "FeatureCollection" {
            return Err(ArchiveError::Catalog(format!(
                "expected a FeatureCollection, got '{}'",
                collection.type_
            )));
        }
        Ok(Self {
            base_dir: base_dir.into(),
            items: collection.features,
            bands: DEFAULT_BANDS.iter().map(|b| b.to_string()).collect(),
            nodata: Some(DEFAULT_NODATA),
        })
    }

    /// Bands loaded by [`ImageArchive::load`]
    pub fn with_bands(mut self, bands: &[&str]) -> Self {
        self.bands = bands.iter().map(|b| b.to_string()).collect();
        self
    }

    /// Raw value treated as no-data in every band
    pub fn with_nodata(mut self, nodata: Option<f64>) -> Self {
        self.nodata = nodata;
        self
    }

    pub fn items(&self) -> &[StacItem] {
        &self.items
    }

    fn resolve(&self, href: &str) -> PathBuf {
        let href = href.strip_prefix("file://").unwrap_or(href);
        let path = Path::new(href);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

impl ImageArchive for LocalStacArchive {
    fn search(&self, query: &SceneQuery) -> Result<SceneCollection> {
        let mut found = Vec::new();
        for item in &self.items {
            match item.to_record() {
                Ok(record) if query.matches(&record) => found.push(record),
                Ok(_) => {}
                Err(e) => warn!(item = %item.id, error = %e, "skipping unreadable STAC item"),
            }
        }
        Ok(SceneCollection::new(found))
    }

    fn load(&self, scene: &SceneRecord) -> Result<MultiBandImage> {
        let item = self
            .items
            .iter()
            .find(|item| item.id == scene.id)
            .ok_or_else(|| ArchiveError::SceneNotFound(scene.id.clone()))?;
        let record = item.to_record()?;

        let mut image = MultiBandImage::new(&record.id, record.time_start);
        for band in &self.bands {
            let asset = item.band_asset(band).ok_or_else(|| ArchiveError::MissingAsset {
                scene: item.id.clone(),
                band: band.clone(),
            })?;
            let path = self.resolve(&asset.href);
            debug!(scene = %item.id, band = %band, path = %path.display(), "reading band");
            image = image.with_band(band.clone(), read_band(&path, self.nodata)?)?;
        }

        if let Some(cc) = record.cloud_cover {
            image = image.with_tag(CLOUD_COVER_PROPERTY, TagValue::Float(cc));
        }
        for (key, value) in &record.properties {
            if key == CLOUD_COVER_PROPERTY {
                continue;
            }
            let tag = match value {
                serde_json::Value::Number(n) => match n.as_i64() {
                    Some(i) => TagValue::Int(i),
                    None => TagValue::Float(n.as_f64().unwrap_or(f64::NAN)),
                },
                serde_json::Value::String(s) => TagValue::Text(s.clone()),
                _ => continue,
            };
            image = image.with_tag(key.clone(), tag);
        }
        Ok(image)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use minescope_core::RegionOfInterest;

    const FIXTURE: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "id": "S2B_34TGN_20210714_0_L2A",
      "bbox": [23.6, 41.9, 24.9, 42.9],
      "properties": {
        "datetime": "2021-07-14T09:20:29Z",
        "eo:cloud_cover": 0.8,
        "platform": "sentinel-2b",
        "s2:mgrs_tile": "34TGN",
        "sat:relative_orbit": 36
      },
      "assets": {
        "red": {"href": "bands/B04.tif", "type": "image/tiff; application=geotiff", "roles": ["data"]},
        "B8A": {"href": "/data/B8A.tif", "roles": ["data"]}
      },
      "collection": "sentinel-2-l2a"
    },
    {
      "type": "Feature",
      "id": "S2A_34TGN_20210719_0_L2A",
      "bbox": [23.6, 41.9, 24.9, 42.9],
      "properties": {
        "datetime": "2021-07-19T09:20:31Z",
        "CLOUDY_PIXEL_PERCENTAGE": 14.5
      },
      "assets": {}
    }
  ]
}"#;

    fn catalog() -> LocalStacArchive {
        LocalStacArchive::from_json(FIXTURE, "/catalogs/assarel").unwrap()
    }

    #[test]
    fn parse_records() {
        let archive = catalog();
        assert_eq!(archive.items().len(), 2);

        let rec = archive.items()[0].to_record().unwrap();
        assert_eq!(rec.date(), "2021-07-14");
        assert_eq!(rec.cloud_cover, Some(0.8));
        assert_eq!(rec.bbox, Some([23.6, 41.9, 24.9, 42.9]));
        assert_eq!(rec.property("s2:mgrs_tile"), Some(&serde_json::json!("34TGN")));

        let rec = archive.items()[1].to_record().unwrap();
        assert_eq!(rec.cloud_cover, Some(14.5));
    }

    #[test]
    fn band_assets_by_name_or_common_name() {
        let archive = catalog();
        let item = &archive.items()[0];
        assert_eq!(item.band_asset("B4").unwrap().href, "bands/B04.tif");
        assert_eq!(item.band_asset("B8A").unwrap().href, "/data/B8A.tif");
        assert!(item.band_asset("B12").is_none());
    }

    #[test]
    fn hrefs_resolve_against_catalog_dir() {
        let archive = catalog();
        assert_eq!(
            archive.resolve("bands/B04.tif"),
            PathBuf::from("/catalogs/assarel/bands/B04.tif")
        );
        assert_eq!(archive.resolve("/data/B8A.tif"), PathBuf::from("/data/B8A.tif"));
        assert_eq!(archive.resolve("file:///data/B8A.tif"), PathBuf::from("/data/B8A.tif"));
    }

    #[test]
    fn search_filters_by_cloud_cover() {
        let query = SceneQuery::new(RegionOfInterest::point(24.119465, 42.545207)).cloud_cover_below(10.0);
        let found = catalog().search(&query).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found.first().unwrap().id, "S2B_34TGN_20210714_0_L2A");
    }

    #[test]
    fn load_reports_missing_asset() {
        let archive = catalog();
        let rec = archive.items()[1].to_record().unwrap();
        assert!(matches!(
            archive.load(&rec),
            Err(ArchiveError::MissingAsset { ref band, .. }) if band == "B2"
        ));
    }

    #[test]
    fn rejects_non_collection() {
        let err = LocalStacArchive::from_json(r#"{"type": "Feature", "features": []}"#, ".");
        assert!(matches!(err, Err(ArchiveError::Catalog(_))));
    }
}
