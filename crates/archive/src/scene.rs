//! Scene metadata as returned by an archive search.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Image property holding the scene cloud percentage (Sentinel-2 metadata name)
pub const CLOUD_COVER_PROPERTY: &str = "CLOUDY_PIXEL_PERCENTAGE";

/// One scene in an archive, without its pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    pub id: String,
    pub time_start: DateTime<Utc>,
    /// Cloud cover percentage, 0..=100
    pub cloud_cover: Option<f64>,
    /// Footprint `[west, south, east, north]`
    pub bbox: Option<[f64; 4]>,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl SceneRecord {
    pub fn new(id: impl Into<String>, time_start: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            time_start,
            cloud_cover: None,
            bbox: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_cloud_cover(mut self, cloud_cover: f64) -> Self {
        self.cloud_cover = Some(cloud_cover);
        self
    }

    pub fn with_bbox(mut self, bbox: [f64; 4]) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }

    pub fn year(&self) -> i32 {
        self.time_start.year()
    }

    /// Acquisition date as `YYYY-MM-DD`
    pub fn date(&self) -> String {
        self.time_start.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn date_and_year() {
        let t = Utc.with_ymd_and_hms(2022, 5, 9, 9, 5, 59).unwrap();
        let scene = SceneRecord::new("S2A", t).with_cloud_cover(1.2);
        assert_eq!(scene.year(), 2022);
        assert_eq!(scene.date(), "2022-05-09");
        assert_eq!(scene.cloud_cover, Some(1.2));
    }

    #[test]
    fn properties_survive_serialization() {
        let t = Utc.with_ymd_and_hms(2022, 5, 9, 0, 0, 0).unwrap();
        let scene = SceneRecord::new("S2A", t).with_property("MGRS_TILE", serde_json::json!("34TGN"));
        let json = serde_json::to_string(&scene).unwrap();
        let back: SceneRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.property("MGRS_TILE"), Some(&serde_json::json!("34TGN")));
    }
}
