//! Scene queries and ordered search results.

use std::cmp::Ordering;

use chrono::{DateTime, TimeZone, Utc};
use minescope_core::RegionOfInterest;
use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, Result};
use crate::scene::SceneRecord;

// ---------------------------------------------------------------------------
// Date windows
// ---------------------------------------------------------------------------

/// Half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

fn midnight(year: i32, month: u32, day: u32) -> Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .ok_or_else(|| ArchiveError::InvalidDate(format!("{year:04}-{month:02}-{day:02}")))
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            return Err(ArchiveError::InvalidDate(format!(
                "range end {end} is not after start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// `[Jan 1 year, Jan 1 year+1)`
    pub fn year(year: i32) -> Result<Self> {
        Self::new(midnight(year, 1, 1)?, midnight(year + 1, 1, 1)?)
    }

    /// `[day 1 of month, day 1 of the next month)`
    pub fn month(year: i32, month: u32) -> Result<Self> {
        let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        Self::new(midnight(year, month, 1)?, midnight(next_year, next_month, 1)?)
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t < self.end
    }

    /// `YYYY-MM-DD/YYYY-MM-DD`, end exclusive
    pub fn label(&self) -> String {
        format!(
            "{}/{}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Filter over scene metadata.
///
/// A scene matches when it intersects the region, was acquired inside the
/// date range, has a cloud cover strictly below the limit, and carries every
/// property filter. Unset filters match everything.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneQuery {
    pub region: RegionOfInterest,
    pub dates: Option<DateRange>,
    pub max_cloud_cover: Option<f64>,
    pub properties: Vec<(String, serde_json::Value)>,
}

impl SceneQuery {
    pub fn new(region: RegionOfInterest) -> Self {
        Self {
            region,
            dates: None,
            max_cloud_cover: None,
            properties: Vec::new(),
        }
    }

    pub fn dates(mut self, dates: DateRange) -> Self {
        self.dates = Some(dates);
        self
    }

    /// Keep scenes with cloud cover `< limit`; scenes without cloud cover are dropped
    pub fn cloud_cover_below(mut self, limit: f64) -> Self {
        self.max_cloud_cover = Some(limit);
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.push((key.into(), value));
        self
    }

    pub fn matches(&self, scene: &SceneRecord) -> bool {
        if let Some(bbox) = scene.bbox {
            if !self.region.intersects_bbox(bbox) {
                return false;
            }
        }
        if let Some(dates) = &self.dates {
            if !dates.contains(scene.time_start) {
                return false;
            }
        }
        if let Some(limit) = self.max_cloud_cover {
            match scene.cloud_cover {
                Some(cc) if cc < limit => {}
                _ => return false,
            }
        }
        self.properties
            .iter()
            .all(|(key, value)| scene.property(key) == Some(value))
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Ordered scene search results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneCollection {
    scenes: Vec<SceneRecord>,
}

fn cloud_order(a: &SceneRecord, b: &SceneRecord) -> Ordering {
    match (a.cloud_cover, b.cloud_cover) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl SceneCollection {
    pub fn new(scenes: Vec<SceneRecord>) -> Self {
        Self { scenes }
    }

    /// Ascending cloud cover; scenes without cloud cover last, ties keep order
    pub fn sort_by_cloud_cover(mut self) -> Self {
        self.scenes.sort_by(cloud_order);
        self
    }

    /// Most recent first, ties keep order
    pub fn sort_by_time_desc(mut self) -> Self {
        self.scenes.sort_by(|a, b| b.time_start.cmp(&a.time_start));
        self
    }

    pub fn first(&self) -> Option<&SceneRecord> {
        self.scenes.first()
    }

    pub fn nth(&self, index: usize) -> Option<&SceneRecord> {
        self.scenes.get(index)
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneRecord> {
        self.scenes.iter()
    }

    pub fn into_vec(self) -> Vec<SceneRecord> {
        self.scenes
    }
}

impl FromIterator<SceneRecord> for SceneCollection {
    fn from_iter<I: IntoIterator<Item = SceneRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap()
    }

    fn region() -> RegionOfInterest {
        RegionOfInterest::point(24.119465, 42.545207)
    }

    #[test]
    fn year_range_is_half_open() {
        let r = DateRange::year(2020).unwrap();
        assert!(r.contains(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()));
        assert!(r.contains(at(2020, 12, 31)));
        assert!(!r.contains(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()));
        assert_eq!(r.label(), "2020-01-01/2021-01-01");
    }

    #[test]
    fn month_range_rolls_over_december() {
        assert_eq!(DateRange::month(2020, 5).unwrap().label(), "2020-05-01/2020-06-01");
        assert_eq!(DateRange::month(2020, 12).unwrap().label(), "2020-12-01/2021-01-01");
        assert!(DateRange::month(2020, 13).is_err());
    }

    #[test]
    fn query_filters() {
        let inside = SceneRecord::new("a", at(2020, 6, 1))
            .with_cloud_cover(5.0)
            .with_bbox([23.5, 42.0, 24.9, 43.0]);
        let outside = inside.clone().with_bbox([0.0, 0.0, 1.0, 1.0]);
        let cloudy = inside.clone().with_cloud_cover(10.0);

        let q = SceneQuery::new(region())
            .dates(DateRange::year(2020).unwrap())
            .cloud_cover_below(10.0);
        assert!(q.matches(&inside));
        assert!(!q.matches(&outside));
        assert!(!q.matches(&cloudy));
        assert!(!q.matches(&SceneRecord::new("b", at(2020, 6, 1))));
    }

    #[test]
    fn property_filter() {
        let scene = SceneRecord::new("a", at(2020, 6, 1)).with_property("SPACECRAFT", serde_json::json!("S2B"));
        let q = SceneQuery::new(region()).property("SPACECRAFT", serde_json::json!("S2B"));
        assert!(q.matches(&scene));
        let q = SceneQuery::new(region()).property("SPACECRAFT", serde_json::json!("S2A"));
        assert!(!q.matches(&scene));
    }

    #[test]
    fn cloud_sort_is_stable_with_missing_last() {
        let scenes: SceneCollection = [
            SceneRecord::new("none", at(2020, 1, 1)),
            SceneRecord::new("b", at(2020, 2, 1)).with_cloud_cover(3.0),
            SceneRecord::new("a", at(2020, 3, 1)).with_cloud_cover(1.0),
            SceneRecord::new("b2", at(2020, 4, 1)).with_cloud_cover(3.0),
        ]
        .into_iter()
        .collect();

        let sorted = scenes.sort_by_cloud_cover();
        let ids: Vec<&str> = sorted.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "b2", "none"]);
    }

    #[test]
    fn time_sort_newest_first() {
        let scenes = SceneCollection::new(vec![
            SceneRecord::new("old", at(2019, 1, 1)),
            SceneRecord::new("new", at(2023, 1, 1)),
        ])
        .sort_by_time_desc();
        assert_eq!(scenes.first().map(|s| s.id.as_str()), Some("new"));
        assert_eq!(scenes.nth(1).map(|s| s.id.as_str()), Some("old"));
        assert!(scenes.nth(2).is_none());
    }
}
