//! # MineScope Archive
//!
//! Satellite scene archives and the policies that pick which scene
//! represents a year or a season.
//!
//! - [`ImageArchive`]: search scene metadata, then load the pixels of one scene
//! - [`MemoryArchive`]: scenes held in memory, for tests and demos
//! - [`LocalStacArchive`]: a STAC ItemCollection on disk whose assets are
//!   single-band GeoTIFFs
//! - [`selector`]: annual-best, seasonal-pair and latest-clear selection

pub mod archive;
pub mod error;
pub mod query;
pub mod scene;
pub mod selector;
pub mod stac;

pub use archive::{ImageArchive, MemoryArchive};
pub use error::{ArchiveError, Result};
pub use query::{DateRange, SceneCollection, SceneQuery};
pub use scene::{SceneRecord, CLOUD_COVER_PROPERTY};
pub use selector::{
    select_annual, select_images, select_latest_clear, select_scenes, select_season,
    select_seasonal_pair, AnnualPolicy, Season, SelectionMode, LATEST_CLEAR_MAX_CLOUD,
};
pub use stac::{LocalStacArchive, StacAsset, StacItem, StacItemCollection};
