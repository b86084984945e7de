//! Multi-band images keyed by acquisition time
//!
//! A [`MultiBandImage`] is the unit that flows between the archive, the
//! index calculator and the presentation layer. Images are never mutated in
//! place by the pipeline: every transformation builds a new image.

use chrono::{DateTime, Datelike, Utc};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::raster::Raster;

/// Metadata tag value attached to an image
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl TagValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            TagValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            TagValue::Int(v) => Some(*v as f64),
            TagValue::Float(v) => Some(*v),
            TagValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TagValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Int(v) => write!(f, "{v}"),
            TagValue::Float(v) => write!(f, "{v}"),
            TagValue::Text(s) => f.write_str(s),
        }
    }
}

/// Tag holding the acquisition year
pub const TAG_YEAR: &str = "year";
/// Tag holding the acquisition date as `YYYY-MM-DD`
pub const TAG_DATE: &str = "date";

/// Named bands on a common grid plus acquisition time and tags.
///
/// Band order is the insertion order, which is the stacking order of
/// derived outputs.
#[derive(Debug, Clone)]
pub struct MultiBandImage {
    id: String,
    time_start: DateTime<Utc>,
    bands: Vec<(String, Raster<f64>)>,
    tags: BTreeMap<String, TagValue>,
}

impl MultiBandImage {
    /// Create an image without bands
    pub fn new(id: impl Into<String>, time_start: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            time_start,
            bands: Vec::new(),
            tags: BTreeMap::new(),
        }
    }

    /// Add a band, consuming and returning the image.
    ///
    /// All bands must share the grid of the first band.
    pub fn with_band(mut self, name: impl Into<String>, raster: Raster<f64>) -> Result<Self> {
        let name = name.into();
        if self.band(&name).is_some() {
            return Err(Error::DuplicateBand(name));
        }
        if let Some((_, first)) = self.bands.first() {
            if !first.same_grid(&raster) {
                return Err(Error::SizeMismatch {
                    er: first.rows(),
                    ec: first.cols(),
                    ar: raster.rows(),
                    ac: raster.cols(),
                });
            }
        }
        self.bands.push((name, raster));
        Ok(self)
    }

    /// Set a metadata tag, consuming and returning the image
    pub fn with_tag(mut self, key: impl Into<String>, value: TagValue) -> Self {
        self.tags.insert(key.into(), value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn time_start(&self) -> DateTime<Utc> {
        self.time_start
    }

    /// Calendar year of the acquisition timestamp
    pub fn acquisition_year(&self) -> i32 {
        self.time_start.year()
    }

    pub fn band(&self, name: &str) -> Option<&Raster<f64>> {
        self.bands.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    /// Look up a band or fail with [`Error::MissingBand`]
    pub fn require_band(&self, name: &str) -> Result<&Raster<f64>> {
        self.band(name).ok_or_else(|| Error::MissingBand {
            band: name.to_string(),
            available: self.band_names().join(", "),
        })
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn bands(&self) -> impl Iterator<Item = (&str, &Raster<f64>)> {
        self.bands.iter().map(|(n, r)| (n.as_str(), r))
    }

    pub fn tag(&self, key: &str) -> Option<&TagValue> {
        self.tags.get(key)
    }

    pub fn tags(&self) -> &BTreeMap<String, TagValue> {
        &self.tags
    }

    /// Keep a subset of bands, in the order given
    pub fn select(&self, names: &[&str]) -> Result<MultiBandImage> {
        let mut out = MultiBandImage {
            id: self.id.clone(),
            time_start: self.time_start,
            bands: Vec::with_capacity(names.len()),
            tags: self.tags.clone(),
        };
        for name in names {
            out.bands.push((name.to_string(), self.require_band(name)?.clone()));
        }
        Ok(out)
    }
}
