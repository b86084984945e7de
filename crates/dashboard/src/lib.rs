//! # MineScope Dashboard
//!
//! Turns archive scenes into what a mining-site dashboard shows: an index
//! series per site, statistic line charts, value histograms and colour-ramped
//! map layers.
//!
//! - [`config`]: sites, their boundaries and selection settings
//! - [`series`]: per-slot selection and index computation
//! - [`cache`]: process-lifetime memoization of built series
//! - [`charts`]: stat summaries, line charts and histograms
//! - [`layers`]: visualization ranges and RGBA map layers
//! - [`info`]: equations and descriptions of the indices

pub mod cache;
pub mod charts;
pub mod config;
pub mod error;
pub mod info;
pub mod layers;
pub mod series;

pub use cache::{SeriesCache, SeriesKey};
pub use charts::{summarize, Histogram, LineChart, StatKind, StatSummary, Trace};
pub use config::{BoundaryFilter, DashboardConfig, SiteConfig};
pub use error::{DashboardError, Result};
pub use info::{index_info, IndexInfo};
pub use layers::{data_vis_params, layer_name, vis_params, MapLayer};
pub use series::{build_series, IndexSeries, SeriesRequest, SeriesSlot, SlotContent, SlotLabel, UnavailableKind};
