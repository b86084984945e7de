//! The image archive capability and an in-memory implementation.

use minescope_core::{MultiBandImage, TagValue};
use tracing::debug;

use crate::error::{ArchiveError, Result};
use crate::query::{SceneCollection, SceneQuery};
use crate::scene::{SceneRecord, CLOUD_COVER_PROPERTY};

/// Source of satellite scenes.
///
/// `search` returns scene metadata in archive order; callers sort and pick.
/// `load` fetches the raw bands of one scene as digital numbers.
pub trait ImageArchive {
    fn search(&self, query: &SceneQuery) -> Result<SceneCollection>;

    fn load(&self, scene: &SceneRecord) -> Result<MultiBandImage>;
}

impl<A: ImageArchive + ?Sized> ImageArchive for &A {
    fn search(&self, query: &SceneQuery) -> Result<SceneCollection> {
        (**self).search(query)
    }

    fn load(&self, scene: &SceneRecord) -> Result<MultiBandImage> {
        (**self).load(scene)
    }
}

/// Scenes held in memory, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    scenes: Vec<(SceneRecord, MultiBandImage)>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scene. The record id and time are taken from the image.
    ///
    /// When the image has a numeric `CLOUDY_PIXEL_PERCENTAGE` tag and the
    /// record has no cloud cover, the tag fills it in.
    pub fn insert(&mut self, mut record: SceneRecord, image: MultiBandImage) {
        record.id = image.id().to_string();
        record.time_start = image.time_start();
        if record.cloud_cover.is_none() {
            record.cloud_cover = image.tag(CLOUD_COVER_PROPERTY).and_then(TagValue::as_float);
        }
        self.scenes.push((record, image));
    }

    /// Builder-style [`MemoryArchive::insert`]
    pub fn with_scene(mut self, record: SceneRecord, image: MultiBandImage) -> Self {
        self.insert(record, image);
        self
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

impl ImageArchive for MemoryArchive {
    fn search(&self, query: &SceneQuery) -> Result<SceneCollection> {
        let found: SceneCollection = self
            .scenes
            .iter()
            .filter(|(record, _)| query.matches(record))
            .map(|(record, _)| record.clone())
            .collect();
        debug!(matched = found.len(), total = self.scenes.len(), "memory archive search");
        Ok(found)
    }

    fn load(&self, scene: &SceneRecord) -> Result<MultiBandImage> {
        self.scenes
            .iter()
            .find(|(record, _)| record.id == scene.id)
            .map(|(_, image)| image.clone())
            .ok_or_else(|| ArchiveError::SceneNotFound(scene.id.clone()))
    }
}
