//! Image selection policies.
//!
//! Each policy is a pure function over an [`ImageArchive`]: it searches,
//! orders and picks, and never caches or retries.

use std::fmt;

use minescope_core::{MultiBandImage, RegionOfInterest};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::archive::ImageArchive;
use crate::error::{ArchiveError, Result};
use crate::query::{DateRange, SceneQuery};
use crate::scene::SceneRecord;

/// Cloud cover percentage a "latest clear" scene must stay strictly below
pub const LATEST_CLEAR_MAX_CLOUD: f64 = 10.0;

/// Which scene of a year, ranked by ascending cloud cover, represents it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnualPolicy {
    #[default]
    Lowest,
    SecondLowest,
}

impl AnnualPolicy {
    /// Zero-based position in the cloud-sorted scene list
    pub fn rank(self) -> usize {
        match self {
            AnnualPolicy::Lowest => 0,
            AnnualPolicy::SecondLowest => 1,
        }
    }
}

/// Seasonal windows of the seasonal-pair policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    May,
    August,
}

impl Season {
    /// In output order
    pub const PAIR: [Season; 2] = [Season::May, Season::August];

    pub fn month(self) -> u32 {
        match self {
            Season::May => 5,
            Season::August => 8,
        }
    }

    pub fn window(self, year: i32) -> Result<DateRange> {
        DateRange::month(year, self.month())
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Season::May => f.write_str("May"),
            Season::August => f.write_str("August"),
        }
    }
}

/// How a year is turned into scenes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "policy")]
pub enum SelectionMode {
    /// One scene per year
    Annual(AnnualPolicy),
    /// Lowest-cloud scene of May and of August
    SeasonalPair,
}

impl Default for SelectionMode {
    fn default() -> Self {
        SelectionMode::Annual(AnnualPolicy::Lowest)
    }
}

impl SelectionMode {
    /// Number of slots one year produces
    pub fn slots_per_year(self) -> usize {
        match self {
            SelectionMode::Annual(_) => 1,
            SelectionMode::SeasonalPair => 2,
        }
    }
}

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

fn lowest_cloud<A: ImageArchive + ?Sized>(
    archive: &A,
    region: &RegionOfInterest,
    window: DateRange,
    rank: usize,
) -> Result<Option<SceneRecord>> {
    let found = archive
        .search(&SceneQuery::new(region.clone()).dates(window))?
        .sort_by_cloud_cover();
    debug!(window = %window.label(), candidates = found.len(), rank, "ranking scenes");
    Ok(found.nth(rank).cloned())
}

/// Annual-best: the scene at `policy.rank()` after sorting the year's
/// scenes by ascending cloud cover.
pub fn select_annual<A: ImageArchive + ?Sized>(
    archive: &A,
    region: &RegionOfInterest,
    year: i32,
    policy: AnnualPolicy,
) -> Result<SceneRecord> {
    lowest_cloud(archive, region, DateRange::year(year)?, policy.rank())?.ok_or_else(|| {
        ArchiveError::NoImageAvailable {
            window: format!("{year} ({policy:?})"),
        }
    })
}

/// Lowest-cloud scene of one seasonal window; `None` when the window is empty
pub fn select_season<A: ImageArchive + ?Sized>(
    archive: &A,
    region: &RegionOfInterest,
    year: i32,
    season: Season,
) -> Result<Option<SceneRecord>> {
    lowest_cloud(archive, region, season.window(year)?, 0)
}

/// Seasonal-pair: `[May, August]`, each `None` when its window has no scene
pub fn select_seasonal_pair<A: ImageArchive + ?Sized>(
    archive: &A,
    region: &RegionOfInterest,
    year: i32,
) -> Result<[Option<SceneRecord>; 2]> {
    Ok([
        select_season(archive, region, year, Season::May)?,
        select_season(archive, region, year, Season::August)?,
    ])
}

/// Latest-clear: the most recent scene with cloud cover below
/// [`LATEST_CLEAR_MAX_CLOUD`], across the whole archive.
pub fn select_latest_clear<A: ImageArchive + ?Sized>(
    archive: &A,
    region: &RegionOfInterest,
) -> Result<SceneRecord> {
    let found = archive
        .search(&SceneQuery::new(region.clone()).cloud_cover_below(LATEST_CLEAR_MAX_CLOUD))?
        .sort_by_time_desc();
    debug!(candidates = found.len(), "selecting latest clear scene");
    found.first().cloned().ok_or_else(|| ArchiveError::NoImageAvailable {
        window: format!("latest scene below {LATEST_CLEAR_MAX_CLOUD}% cloud"),
    })
}

/// Scenes representing `year` under `mode`, one entry per slot.
///
/// Annual mode fails with [`ArchiveError::NoImageAvailable`] when the year
/// has too few scenes; seasonal mode reports empty windows as `None`.
pub fn select_scenes<A: ImageArchive + ?Sized>(
    archive: &A,
    region: &RegionOfInterest,
    year: i32,
    mode: SelectionMode,
) -> Result<Vec<Option<SceneRecord>>> {
    match mode {
        SelectionMode::Annual(policy) => Ok(vec![Some(select_annual(archive, region, year, policy)?)]),
        SelectionMode::SeasonalPair => Ok(select_seasonal_pair(archive, region, year)?.into()),
    }
}

/// [`select_scenes`] followed by loading every selected scene
pub fn select_images<A: ImageArchive + ?Sized>(
    archive: &A,
    region: &RegionOfInterest,
    year: i32,
    mode: SelectionMode,
) -> Result<Vec<Option<MultiBandImage>>> {
    select_scenes(archive, region, year, mode)?
        .into_iter()
        .map(|slot| slot.map(|scene| archive.load(&scene)).transpose())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;
    use chrono::{TimeZone, Utc};
    use minescope_core::Raster;

    fn add(archive: &mut MemoryArchive, id: &str, (y, m, d): (i32, u32, u32), cloud: f64) {
        let t = Utc.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap();
        let image = MultiBandImage::new(id, t)
            .with_band("B4", Raster::filled(1, 1, 1.0))
            .unwrap();
        archive.insert(SceneRecord::new(id, t).with_cloud_cover(cloud), image);
    }

    fn region() -> RegionOfInterest {
        RegionOfInterest::point(46.147651, 39.146828)
    }

    fn archive() -> MemoryArchive {
        let mut a = MemoryArchive::new();
        add(&mut a, "2019-jan", (2019, 1, 20), 40.0);
        add(&mut a, "2019-mar", (2019, 3, 2), 4.0);
        add(&mut a, "2019-jul", (2019, 7, 9), 0.5);
        add(&mut a, "2019-oct", (2019, 10, 30), 9.0);
        add(&mut a, "2020-may-a", (2020, 5, 3), 30.0);
        add(&mut a, "2020-may-b", (2020, 5, 28), 2.0);
        add(&mut a, "2021-aug", (2021, 8, 12), 12.0);
        add(&mut a, "2023-feb", (2023, 2, 1), 18.0);
        a
    }

    #[test]
    fn annual_lowest_and_second_lowest() {
        let a = archive();
        let best = select_annual(&a, &region(), 2019, AnnualPolicy::Lowest).unwrap();
        assert_eq!(best.id, "2019-jul");
        let second = select_annual(&a, &region(), 2019, AnnualPolicy::SecondLowest).unwrap();
        assert_eq!(second.id, "2019-mar");
        assert!(second.cloud_cover >= best.cloud_cover);
    }

    #[test]
    fn annual_ranks_five_scenes_by_cloud_cover() {
        let mut a = MemoryArchive::new();
        for (i, cloud) in [2.0, 5.0, 9.0, 1.0, 7.0].into_iter().enumerate() {
            add(&mut a, &format!("c{cloud}"), (2018, i as u32 + 3, 14), cloud);
        }
        let best = select_annual(&a, &region(), 2018, AnnualPolicy::Lowest).unwrap();
        assert_eq!(best.cloud_cover, Some(1.0));
        let second = select_annual(&a, &region(), 2018, AnnualPolicy::SecondLowest).unwrap();
        assert_eq!(second.cloud_cover, Some(2.0));
    }

    #[test]
    fn annual_respects_year_bounds() {
        let best = select_annual(&archive(), &region(), 2020, AnnualPolicy::Lowest).unwrap();
        assert_eq!(best.year(), 2020);
    }

    #[test]
    fn annual_with_too_few_scenes() {
        let a = archive();
        assert!(matches!(
            select_annual(&a, &region(), 2022, AnnualPolicy::Lowest),
            Err(ArchiveError::NoImageAvailable { .. })
        ));
        assert!(matches!(
            select_annual(&a, &region(), 2021, AnnualPolicy::SecondLowest),
            Err(ArchiveError::NoImageAvailable { .. })
        ));
    }

    #[test]
    fn seasonal_pair_with_missing_window() {
        let [may, august] = select_seasonal_pair(&archive(), &region(), 2020).unwrap();
        assert_eq!(may.unwrap().id, "2020-may-b");
        assert!(august.is_none());

        let [may, august] = select_seasonal_pair(&archive(), &region(), 2021).unwrap();
        assert!(may.is_none());
        assert_eq!(august.unwrap().id, "2021-aug");
    }

    #[test]
    fn latest_clear_skips_recent_cloudy_scenes() {
        // 2023-feb (18%) and 2021-aug (12%) are too cloudy
        let latest = select_latest_clear(&archive(), &region()).unwrap();
        assert_eq!(latest.id, "2020-may-b");
    }

    #[test]
    fn latest_clear_on_empty_archive() {
        assert!(matches!(
            select_latest_clear(&MemoryArchive::new(), &region()),
            Err(ArchiveError::NoImageAvailable { .. })
        ));
    }

    #[test]
    fn select_images_loads_slots() {
        let a = archive();
        let images = select_images(&a, &region(), 2020, SelectionMode::SeasonalPair).unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].as_ref().map(|i| i.id()), Some("2020-may-b"));
        assert!(images[1].is_none());

        let images = select_images(&a, &region(), 2019, SelectionMode::default()).unwrap();
        assert_eq!(images.len(), 1);
    }

    #[test]
    fn selection_mode_config_form() {
        let mode: SelectionMode =
            serde_json::from_str(r#"{"mode": "annual", "policy": "second_lowest"}"#).unwrap();
        assert_eq!(mode, SelectionMode::Annual(AnnualPolicy::SecondLowest));
        let mode: SelectionMode = serde_json::from_str(r#"{"mode": "seasonal_pair"}"#).unwrap();
        assert_eq!(mode.slots_per_year(), 2);
    }
}
