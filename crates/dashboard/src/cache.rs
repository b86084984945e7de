//! Process-lifetime memoization of built series.
//!
//! A cache is bound to one archive: the key covers the request and the
//! boundary but not the archive the series was built from. Entries are never
//! evicted and a failed build is not stored.

use std::collections::HashMap;
use std::sync::Arc;

use minescope_algorithms::imagery::IndexOptions;
use minescope_archive::{ImageArchive, SelectionMode};
use minescope_core::{RegionOfInterest, SiteBoundary};
use tracing::debug;

use crate::error::Result;
use crate::series::{build_series, IndexSeries, SeriesRequest};

/// Exact inputs of one series build. Floating-point inputs are compared by bit
/// pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    site: String,
    region: Vec<u64>,
    years: Vec<i32>,
    mode: SelectionMode,
    include_latest: bool,
    options: IndexOptions,
    boundary: Vec<u64>,
}

fn region_bits(region: &RegionOfInterest) -> Vec<u64> {
    match region {
        RegionOfInterest::Point { lon, lat } => vec![lon.to_bits(), lat.to_bits()],
        RegionOfInterest::Polygon { ring } => ring
            .iter()
            .flat_map(|[x, y]| [x.to_bits(), y.to_bits()])
            .collect(),
    }
}

/// Polygon and ring sizes followed by coordinate bit patterns
fn boundary_bits(boundary: &SiteBoundary) -> Vec<u64> {
    let mut bits = Vec::new();
    for polygon in &boundary.shape().0 {
        bits.push(polygon.interiors().len() as u64 + 1);
        let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
        for ring in rings {
            bits.push(ring.0.len() as u64);
            bits.extend(ring.0.iter().flat_map(|c| [c.x.to_bits(), c.y.to_bits()]));
        }
    }
    bits
}

impl SeriesKey {
    pub fn new(request: &SeriesRequest, boundary: &SiteBoundary) -> Self {
        Self {
            site: request.site.clone(),
            region: region_bits(&request.region),
            years: request.years.clone(),
            mode: request.mode,
            include_latest: request.include_latest,
            options: request.options,
            boundary: boundary_bits(boundary),
        }
    }
}

#[derive(Debug, Default)]
pub struct SeriesCache {
    entries: HashMap<SeriesKey, Arc<IndexSeries>>,
    hits: u64,
    misses: u64,
}

impl SeriesCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached series for these inputs, building it on the first request
    pub fn get_or_build<A: ImageArchive + ?Sized>(
        &mut self,
        archive: &A,
        request: &SeriesRequest,
        boundary: &SiteBoundary,
    ) -> Result<Arc<IndexSeries>> {
        let key = SeriesKey::new(request, boundary);
        if let Some(series) = self.entries.get(&key) {
            self.hits += 1;
            debug!(site = %request.site, "series cache hit");
            return Ok(Arc::clone(series));
        }

        self.misses += 1;
        let series = Arc::new(build_series(archive, request, boundary)?);
        self.entries.insert(key, Arc::clone(&series));
        Ok(series)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use chrono::{TimeZone, Utc};
    use minescope_archive::{MemoryArchive, SceneCollection, SceneQuery, SceneRecord};
    use minescope_core::{MultiBandImage, Raster};

    /// Counts searches to observe whether a build happened
    struct CountingArchive {
        inner: MemoryArchive,
        searches: Cell<usize>,
    }

    impl ImageArchive for CountingArchive {
        fn search(&self, query: &SceneQuery) -> minescope_archive::Result<SceneCollection> {
            self.searches.set(self.searches.get() + 1);
            self.inner.search(query)
        }

        fn load(&self, scene: &SceneRecord) -> minescope_archive::Result<MultiBandImage> {
            self.inner.load(scene)
        }
    }

    fn archive() -> CountingArchive {
        let t = Utc.with_ymd_and_hms(2020, 6, 1, 10, 0, 0).unwrap();
        let mut image = MultiBandImage::new("s", t);
        for band in ["B2", "B3", "B4", "B8", "B8A", "B11", "B12"] {
            image = image.with_band(band, Raster::filled(2, 2, 2000.0)).unwrap();
        }
        let mut inner = MemoryArchive::new();
        inner.insert(SceneRecord::new("s", t).with_cloud_cover(1.0), image);
        CountingArchive {
            inner,
            searches: Cell::new(0),
        }
    }

    fn request(years: Vec<i32>) -> SeriesRequest {
        SeriesRequest {
            site: "kajaran".into(),
            region: RegionOfInterest::point(46.147651, 39.146828),
            years,
            mode: SelectionMode::default(),
            include_latest: false,
            options: IndexOptions::default(),
        }
    }

    #[test]
    fn repeated_request_hits() {
        let a = archive();
        let boundary = SiteBoundary::from_rect(-5.0, -5.0, 5.0, 5.0);
        let mut cache = SeriesCache::new();

        let first = cache.get_or_build(&a, &request(vec![2020]), &boundary).unwrap();
        let searches = a.searches.get();
        let second = cache.get_or_build(&a, &request(vec![2020]), &boundary).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(a.searches.get(), searches);
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
    }

    #[test]
    fn different_inputs_miss() {
        let a = archive();
        let boundary = SiteBoundary::from_rect(-5.0, -5.0, 5.0, 5.0);
        let other_boundary = SiteBoundary::from_rect(-5.0, -5.0, 5.0, 6.0);
        let mut cache = SeriesCache::new();

        cache.get_or_build(&a, &request(vec![2020]), &boundary).unwrap();
        cache.get_or_build(&a, &request(vec![2019, 2020]), &boundary).unwrap();
        cache.get_or_build(&a, &request(vec![2020]), &other_boundary).unwrap();
        let mut masked = request(vec![2020]);
        masked.options = masked.options.with_nmdi_mask(true);
        cache.get_or_build(&a, &masked, &boundary).unwrap();

        assert_eq!(cache.len(), 4);
        assert_eq!(cache.hits(), 0);
    }

    #[test]
    fn key_holds_boundary_coordinates() {
        let boundary = SiteBoundary::from_rect(46.14, 39.14, 46.15, 39.16);
        let key = SeriesKey::new(&request(vec![2020]), &boundary);
        assert_eq!(key, SeriesKey::new(&request(vec![2020]), &boundary.clone()));
        assert!(key.boundary.contains(&46.15f64.to_bits()));
        assert!(key.boundary.contains(&39.16f64.to_bits()));

        let shifted = SiteBoundary::from_rect(46.14, 39.14, 46.15, 39.16 + f64::EPSILON * 64.0);
        assert_ne!(key, SeriesKey::new(&request(vec![2020]), &shifted));
    }

    #[test]
    fn failed_builds_are_not_cached() {
        let a = archive();
        let boundary = SiteBoundary::from_rect(-5.0, -5.0, 5.0, 5.0);
        let mut cache = SeriesCache::new();
        assert!(cache.get_or_build(&a, &request(vec![]), &boundary).is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.misses(), 1);
    }
}
