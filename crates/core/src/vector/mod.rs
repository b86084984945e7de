//! Vector data: feature collections, site boundaries and query regions
//!
//! Mine footprints come from a polygon feature collection (GeoJSON) that is
//! narrowed down by attribute filters, e.g. every feature whose `AREA` is in
//! a given list. The filtered polygons form a [`SiteBoundary`].

use geo::{BoundingRect, Contains, Intersects};
use geo_types::{Coord, Geometry, LineString, MultiPolygon, Point, Polygon, Rect};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(v) => Some(*v as f64),
            AttributeValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Equality that treats integer and float attributes as numbers.
    ///
    /// Numbers match within one relative epsilon, so a decimal literal
    /// parsed by different readers still compares equal.
    pub fn matches(&self, other: &AttributeValue) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => (a - b).abs() <= f64::EPSILON * a.abs().max(b.abs()),
            _ => self == other,
        }
    }

    fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => AttributeValue::Null,
            serde_json::Value::Bool(b) => AttributeValue::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => AttributeValue::Int(i),
                None => AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => AttributeValue::String(s.clone()),
            other => AttributeValue::String(other.to_string()),
        }
    }
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone)]
pub struct Feature {
    pub geometry: Option<Geometry<f64>>,
    pub properties: HashMap<String, AttributeValue>,
    pub id: Option<String>,
}

impl Feature {
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: HashMap::new(),
            id: None,
        }
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    /// Property value, falling back to the feature id for `system:index`
    fn attribute(&self, key: &str) -> Option<AttributeValue> {
        if let Some(v) = self.properties.get(key) {
            return Some(v.clone());
        }
        if key == "system:index" || key == "id" {
            return self.id.clone().map(AttributeValue::String);
        }
        None
    }

    fn from_geojson(feature: geojson::Feature) -> Result<Self> {
        let geometry = feature
            .geometry
            .map(Geometry::<f64>::try_from)
            .transpose()?;
        let properties = feature
            .properties
            .unwrap_or_default()
            .iter()
            .map(|(k, v)| (k.clone(), AttributeValue::from_json(v)))
            .collect();
        let id = feature.id.map(|id| match id {
            geojson::feature::Id::String(s) => s,
            geojson::feature::Id::Number(n) => n.to_string(),
        });
        Ok(Self {
            geometry,
            properties,
            id,
        })
    }
}

/// Collection of features
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self { features: Vec::new() }
    }

    /// Parse a GeoJSON `FeatureCollection` (a lone `Feature` is accepted too)
    pub fn from_geojson_str(text: &str) -> Result<Self> {
        let parsed: geojson::GeoJson = text.parse()?;
        let features = match parsed {
            geojson::GeoJson::FeatureCollection(fc) => fc
                .features
                .into_iter()
                .map(Feature::from_geojson)
                .collect::<Result<Vec<_>>>()?,
            geojson::GeoJson::Feature(f) => vec![Feature::from_geojson(f)?],
            geojson::GeoJson::Geometry(g) => vec![Feature::new(Geometry::<f64>::try_from(g)?)],
        };
        Ok(Self { features })
    }

    /// Read a GeoJSON file
    pub fn read_geojson<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_geojson_str(&text)
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Features whose `key` attribute equals `value`
    pub fn filter_eq(&self, key: &str, value: &AttributeValue) -> FeatureCollection {
        self.filter_in(key, std::slice::from_ref(value))
    }

    /// Features whose `key` attribute equals any of `values`
    pub fn filter_in(&self, key: &str, values: &[AttributeValue]) -> FeatureCollection {
        let features = self
            .features
            .iter()
            .filter(|f| {
                f.attribute(key)
                    .is_some_and(|attr| values.iter().any(|v| attr.matches(v)))
            })
            .cloned()
            .collect();
        FeatureCollection { features }
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

/// Polygonal footprint of a mine, used to clip rasters and aggregate values.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteBoundary {
    shape: MultiPolygon<f64>,
}

impl SiteBoundary {
    pub fn new(shape: MultiPolygon<f64>) -> Result<Self> {
        if shape.0.is_empty() {
            return Err(Error::EmptyBoundary("no polygons".into()));
        }
        Ok(Self { shape })
    }

    pub fn from_polygon(polygon: Polygon<f64>) -> Self {
        Self {
            shape: MultiPolygon::new(vec![polygon]),
        }
    }

    /// Axis-aligned rectangle boundary, mostly useful for tests
    pub fn from_rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        let rect = Rect::new(Coord { x: min_x, y: min_y }, Coord { x: max_x, y: max_y });
        Self::from_polygon(rect.to_polygon())
    }

    /// Union of the polygonal geometries of a feature collection
    pub fn from_features(features: &FeatureCollection) -> Result<Self> {
        let mut polygons = Vec::new();
        for feature in features.iter() {
            match &feature.geometry {
                Some(Geometry::Polygon(p)) => polygons.push(p.clone()),
                Some(Geometry::MultiPolygon(mp)) => polygons.extend(mp.0.iter().cloned()),
                _ => {}
            }
        }
        if polygons.is_empty() {
            return Err(Error::EmptyBoundary(format!(
                "{} feature(s) without polygon geometry",
                features.len()
            )));
        }
        Ok(Self {
            shape: MultiPolygon::new(polygons),
        })
    }

    pub fn shape(&self) -> &MultiPolygon<f64> {
        &self.shape
    }

    /// Whether the map coordinate lies strictly inside the footprint
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.shape.contains(&Point::new(x, y))
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)`
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        self.shape
            .bounding_rect()
            .map(|r| (r.min().x, r.min().y, r.max().x, r.max().y))
    }
}

/// Point or polygon bounding a scene query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionOfInterest {
    Point { lon: f64, lat: f64 },
    Polygon { ring: Vec<[f64; 2]> },
}

impl RegionOfInterest {
    pub fn point(lon: f64, lat: f64) -> Self {
        RegionOfInterest::Point { lon, lat }
    }

    pub fn to_geometry(&self) -> Geometry<f64> {
        match self {
            RegionOfInterest::Point { lon, lat } => Geometry::Point(Point::new(*lon, *lat)),
            RegionOfInterest::Polygon { ring } => {
                let coords: Vec<Coord<f64>> = ring.iter().map(|[x, y]| Coord { x: *x, y: *y }).collect();
                Geometry::Polygon(Polygon::new(LineString::new(coords), vec![]))
            }
        }
    }

    /// Whether the region touches a `[west, south, east, north]` footprint
    pub fn intersects_bbox(&self, bbox: [f64; 4]) -> bool {
        let rect = Rect::new(
            Coord { x: bbox[0], y: bbox[1] },
            Coord { x: bbox[2], y: bbox[3] },
        );
        self.to_geometry().intersects(&rect)
    }
}
