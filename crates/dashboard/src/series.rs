//! Index series: one computed index image per time slot of a site.
//!
//! Building a series runs selection, loading and index computation once per
//! slot. A slot that fails keeps its place in the series as an
//! [`SlotContent::Unavailable`] marker, so one bad year never hides the rest.

use std::fmt;

use minescope_algorithms::imagery::{compute_indices, IndexOptions, TemporalLabel};
use minescope_archive::{
    select_latest_clear, select_scenes, ArchiveError, ImageArchive, SceneRecord, Season,
    SelectionMode,
};
use minescope_core::{MultiBandImage, RegionOfInterest, SiteBoundary};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{DashboardError, Result};

/// Everything that determines the content of a series
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRequest {
    pub site: String,
    pub region: RegionOfInterest,
    /// Ascending, without duplicates
    pub years: Vec<i32>,
    pub mode: SelectionMode,
    /// Append the latest clear scene when it is newer than every year
    pub include_latest: bool,
    /// The temporal label is derived from `mode` and overrides the one set here
    pub options: IndexOptions,
}

impl SeriesRequest {
    fn index_options(&self) -> IndexOptions {
        let label = match self.mode {
            SelectionMode::Annual(_) => TemporalLabel::Annual,
            SelectionMode::SeasonalPair => TemporalLabel::Seasonal,
        };
        IndexOptions {
            label,
            ..self.options
        }
    }

    fn validate(&self) -> Result<()> {
        if self.years.is_empty() {
            return Err(DashboardError::Config(format!("site '{}': no years requested", self.site)));
        }
        if self.years.windows(2).any(|w| w[0] >= w[1]) {
            return Err(DashboardError::Config(format!(
                "site '{}': years must be strictly ascending",
                self.site
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

/// Temporal tag of one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotLabel {
    pub year: i32,
    /// Set for seasonal-pair slots
    pub season: Option<Season>,
    /// The appended latest-clear slot
    pub latest: bool,
}

impl SlotLabel {
    pub fn annual(year: i32) -> Self {
        Self {
            year,
            season: None,
            latest: false,
        }
    }

    pub fn seasonal(year: i32, season: Season) -> Self {
        Self {
            year,
            season: Some(season),
            latest: false,
        }
    }

    pub fn latest(year: i32) -> Self {
        Self {
            year,
            season: None,
            latest: true,
        }
    }

    fn sort_key(&self) -> (i32, u32) {
        let within_year = match (self.latest, self.season) {
            (true, _) => 13,
            (false, Some(season)) => season.month(),
            (false, None) => 0,
        };
        (self.year, within_year)
    }
}

impl fmt::Display for SlotLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.latest, self.season) {
            (true, _) => write!(f, "latest {}", self.year),
            (false, Some(season)) => write!(f, "{season} {}", self.year),
            (false, None) => write!(f, "{}", self.year),
        }
    }
}

/// Why a slot holds no image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableKind {
    /// No scene matched the slot's window and policy
    NoImageAvailable,
    /// The selected scene lacks a band an index needs
    MissingBand,
    /// Any other archive or computation failure
    Failed,
}

impl UnavailableKind {
    fn of_archive(err: &ArchiveError) -> Self {
        match err {
            ArchiveError::NoImageAvailable { .. } => UnavailableKind::NoImageAvailable,
            ArchiveError::MissingAsset { .. } => UnavailableKind::MissingBand,
            ArchiveError::Core(inner) => Self::of_core(inner),
            _ => UnavailableKind::Failed,
        }
    }

    fn of_core(err: &minescope_core::Error) -> Self {
        match err {
            minescope_core::Error::MissingBand { .. } => UnavailableKind::MissingBand,
            _ => UnavailableKind::Failed,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SlotContent {
    /// Seven-band index image, clipped to the site boundary
    Image(MultiBandImage),
    Unavailable {
        kind: UnavailableKind,
        message: String,
    },
}

#[derive(Debug, Clone)]
pub struct SeriesSlot {
    pub label: SlotLabel,
    pub content: SlotContent,
}

impl SeriesSlot {
    pub fn with_image(label: SlotLabel, image: MultiBandImage) -> Self {
        Self {
            label,
            content: SlotContent::Image(image),
        }
    }

    pub fn unavailable(label: SlotLabel, kind: UnavailableKind, message: String) -> Self {
        Self {
            label,
            content: SlotContent::Unavailable { kind, message },
        }
    }

    pub fn image(&self) -> Result<&MultiBandImage> {
        match &self.content {
            SlotContent::Image(image) => Ok(image),
            SlotContent::Unavailable { message, .. } => Err(DashboardError::SlotUnavailable {
                label: self.label.to_string(),
                reason: message.clone(),
            }),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.content, SlotContent::Image(_))
    }

    pub fn unavailable_kind(&self) -> Option<UnavailableKind> {
        match self.content {
            SlotContent::Image(_) => None,
            SlotContent::Unavailable { kind, .. } => Some(kind),
        }
    }
}

// ---------------------------------------------------------------------------
// Series
// ---------------------------------------------------------------------------

/// Slots in chronological order with unique labels.
#[derive(Debug, Clone, Default)]
pub struct IndexSeries {
    slots: Vec<SeriesSlot>,
}

impl IndexSeries {
    /// Fails unless the labels are strictly chronological
    pub fn from_slots(slots: Vec<SeriesSlot>) -> Result<Self> {
        if let Some(pair) = slots
            .windows(2)
            .find(|w| w[0].label.sort_key() >= w[1].label.sort_key())
        {
            return Err(DashboardError::Config(format!(
                "series slot '{}' does not follow '{}'",
                pair[1].label, pair[0].label
            )));
        }
        Ok(Self { slots })
    }

    pub fn slots(&self) -> &[SeriesSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn labels(&self) -> Vec<SlotLabel> {
        self.slots.iter().map(|s| s.label).collect()
    }

    /// Slots holding an image
    pub fn available(&self) -> impl Iterator<Item = (&SlotLabel, &MultiBandImage)> {
        self.slots.iter().filter_map(|s| match &s.content {
            SlotContent::Image(image) => Some((&s.label, image)),
            SlotContent::Unavailable { .. } => None,
        })
    }

    pub fn find(&self, label: &SlotLabel) -> Option<&SeriesSlot> {
        self.slots.iter().find(|s| &s.label == label)
    }

    /// Like [`find`](Self::find) but fails with [`DashboardError::NoSuchSlot`]
    pub fn slot(&self, label: &SlotLabel) -> Result<&SeriesSlot> {
        self.find(label)
            .ok_or_else(|| DashboardError::NoSuchSlot(label.to_string()))
    }

    /// First slot of `year`, the latest slot included
    pub fn find_year(&self, year: i32) -> Option<&SeriesSlot> {
        self.slots.iter().find(|s| s.label.year == year)
    }

    pub fn latest(&self) -> Option<&SeriesSlot> {
        self.slots.iter().find(|s| s.label.latest)
    }
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

fn compute_slot<A: ImageArchive + ?Sized>(
    archive: &A,
    label: SlotLabel,
    scene: &SceneRecord,
    boundary: &SiteBoundary,
    options: IndexOptions,
) -> SeriesSlot {
    let image = match archive.load(scene) {
        Ok(image) => image,
        Err(err) => {
            warn!(slot = %label, scene = %scene.id, error = %err, "scene could not be loaded");
            return SeriesSlot::unavailable(label, UnavailableKind::of_archive(&err), err.to_string());
        }
    };
    match compute_indices(&image, boundary, options) {
        Ok(indices) => {
            debug!(slot = %label, scene = %scene.id, "computed indices");
            SeriesSlot::with_image(label, indices)
        }
        Err(err) => {
            warn!(slot = %label, scene = %scene.id, error = %err, "index computation failed");
            SeriesSlot::unavailable(label, UnavailableKind::of_core(&err), err.to_string())
        }
    }
}

fn year_slots<A: ImageArchive + ?Sized>(
    archive: &A,
    request: &SeriesRequest,
    year: i32,
    boundary: &SiteBoundary,
    options: IndexOptions,
) -> Vec<SeriesSlot> {
    let labels: Vec<SlotLabel> = match request.mode {
        SelectionMode::Annual(_) => vec![SlotLabel::annual(year)],
        SelectionMode::SeasonalPair => Season::PAIR
            .iter()
            .map(|&season| SlotLabel::seasonal(year, season))
            .collect(),
    };

    let scenes = match select_scenes(archive, &request.region, year, request.mode) {
        Ok(scenes) => scenes,
        Err(err) => {
            warn!(site = %request.site, year, error = %err, "scene selection failed");
            let kind = UnavailableKind::of_archive(&err);
            return labels
                .into_iter()
                .map(|label| SeriesSlot::unavailable(label, kind, err.to_string()))
                .collect();
        }
    };

    labels
        .into_iter()
        .zip(scenes)
        .map(|(label, scene)| match scene {
            Some(scene) => compute_slot(archive, label, &scene, boundary, options),
            None => {
                warn!(site = %request.site, slot = %label, "no scene in window");
                SeriesSlot::unavailable(
                    label,
                    UnavailableKind::NoImageAvailable,
                    format!("no scene for {label}"),
                )
            }
        })
        .collect()
}

/// Build the series of `request`, clipped to `boundary`.
///
/// Only an invalid request is an error; selection, loading and computation
/// failures become unavailable slots. The latest clear scene is appended
/// when its year is after every requested year and skipped otherwise.
pub fn build_series<A: ImageArchive + ?Sized>(
    archive: &A,
    request: &SeriesRequest,
    boundary: &SiteBoundary,
) -> Result<IndexSeries> {
    request.validate()?;
    let options = request.index_options();

    let mut slots: Vec<SeriesSlot> = Vec::new();
    for &year in &request.years {
        slots.extend(year_slots(archive, request, year, boundary, options));
    }

    if request.include_latest {
        let last_year = request.years.iter().copied().max().unwrap_or(i32::MIN);
        match select_latest_clear(archive, &request.region) {
            Ok(scene) if scene.year() > last_year => {
                let label = SlotLabel::latest(scene.year());
                slots.push(compute_slot(archive, label, &scene, boundary, options));
            }
            Ok(scene) => {
                debug!(site = %request.site, scene = %scene.id, "latest clear scene is not newer than the series");
            }
            Err(err) => {
                warn!(site = %request.site, error = %err, "no latest clear scene");
            }
        }
    }

    let series = IndexSeries::from_slots(slots)?;
    debug!(
        site = %request.site,
        slots = series.len(),
        available = series.available().count(),
        "series built"
    );
    Ok(series)
}
