//! Chart-ready data: statistic summaries, line charts and histograms.

use minescope_algorithms::imagery::SpectralIndex;
use minescope_algorithms::statistics::{reduce_region, RegionStats};
use minescope_core::SiteBoundary;
use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, Result};
use crate::series::IndexSeries;

// ---------------------------------------------------------------------------
// Statistic summaries
// ---------------------------------------------------------------------------

/// Statistics plotted per time slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    Mean,
    Median,
    Mode,
}

impl StatKind {
    /// In trace order
    pub const ALL: [StatKind; 3] = [StatKind::Mean, StatKind::Median, StatKind::Mode];

    pub fn trace_name(self) -> &'static str {
        match self {
            StatKind::Mean => "Mean",
            StatKind::Median => "Median",
            StatKind::Mode => "Mode",
        }
    }

    pub fn of(self, stats: &RegionStats) -> f64 {
        match self {
            StatKind::Mean => stats.mean,
            StatKind::Median => stats.median,
            StatKind::Mode => stats.mode,
        }
    }
}

/// Region statistics of one slot; `None` when the slot is unavailable or has
/// no valid pixel inside the boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatPoint {
    pub label: String,
    pub stats: Option<RegionStats>,
}

/// Statistics of one index across a series, indexed by slot position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatSummary {
    pub index: SpectralIndex,
    pub points: Vec<StatPoint>,
}

impl StatSummary {
    pub fn get(&self, time_index: usize, kind: StatKind) -> Option<f64> {
        self.points
            .get(time_index)?
            .stats
            .as_ref()
            .map(|stats| kind.of(stats))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.points.iter().map(|p| p.label.clone()).collect()
    }

    /// One trace per [`StatKind`], gaps where a slot has no statistics
    pub fn line_chart(&self) -> LineChart {
        let traces = StatKind::ALL
            .into_iter()
            .map(|kind| Trace {
                name: kind.trace_name().to_string(),
                y: (0..self.len()).map(|t| self.get(t, kind)).collect(),
            })
            .collect();
        LineChart {
            title: format!("Change in {} statistics", self.index),
            x_title: "Year".into(),
            y_title: "Value".into(),
            x: self.labels(),
            traces,
        }
    }
}

/// Reduce `index` of every slot of `series` over `boundary`
pub fn summarize(series: &IndexSeries, index: SpectralIndex, boundary: &SiteBoundary) -> StatSummary {
    let points = series
        .slots()
        .iter()
        .map(|slot| StatPoint {
            label: slot.label.to_string(),
            stats: slot
                .image()
                .ok()
                .and_then(|image| image.band(index.name()))
                .and_then(|band| reduce_region(band, boundary)),
        })
        .collect();
    StatSummary { index, points }
}

// ---------------------------------------------------------------------------
// Line chart
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub name: String,
    /// Serialized as `null` where the value is missing
    pub y: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineChart {
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    pub x: Vec<String>,
    pub traces: Vec<Trace>,
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

/// Equal-width histogram.
///
/// `edges` has `counts.len() + 1` entries. Every bin is half-open except the
/// last, which also holds the maximum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub counts: Vec<u64>,
    pub edges: Vec<f64>,
}

impl Histogram {
    /// Bin the finite entries of `values` into `bins` bins spanning their range.
    ///
    /// Without finite values the range is `[0, 1]`; a single distinct value
    /// `v` gets the range `[v - 0.5, v + 0.5]`.
    pub fn compute(values: &[f64], bins: usize) -> Result<Self> {
        if bins == 0 {
            return Err(DashboardError::ZeroBins);
        }

        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let (mut lo, mut hi) = finite
            .iter()
            .fold(None, |acc: Option<(f64, f64)>, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
            .unwrap_or((0.0, 1.0));
        if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }

        let width = (hi - lo) / bins as f64;
        let edges: Vec<f64> = (0..=bins)
            .map(|i| if i == bins { hi } else { lo + i as f64 * width })
            .collect();

        let mut counts = vec![0u64; bins];
        let norm = bins as f64 / (hi - lo);
        for &v in &finite {
            let mut idx = (((v - lo) * norm).floor() as usize).min(bins - 1);
            // Rounding in the scaled position can land one bin off
            if idx > 0 && v < edges[idx] {
                idx -= 1;
            } else if idx + 1 < bins && v >= edges[idx + 1] {
                idx += 1;
            }
            counts[idx] += 1;
        }

        Ok(Self { counts, edges })
    }

    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    /// Bar positions: midpoints of consecutive edges
    pub fn centers(&self) -> Vec<f64> {
        self.edges.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};
    use minescope_core::{MultiBandImage, Raster};

    use crate::series::{SeriesSlot, SlotLabel, UnavailableKind};

    #[test]
    fn numpy_style_bins() {
        let h = Histogram::compute(&[0.0, 1.0, 2.0, 3.0, 4.0], 4).unwrap();
        assert_eq!(h.edges, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        // The maximum lands in the closed last bin
        assert_eq!(h.counts, vec![1, 1, 1, 2]);
        assert_eq!(h.centers(), vec![0.5, 1.5, 2.5, 3.5]);
    }

    #[test]
    fn counts_rise_with_repeats() {
        let h = Histogram::compute(&[1.0, 2.0, 2.0, 3.0, 3.0, 3.0], 3).unwrap();
        assert_eq!(h.counts, vec![1, 2, 3]);
        assert_eq!(h.total(), 6);
    }

    #[test]
    fn nan_is_ignored() {
        let h = Histogram::compute(&[f64::NAN, 0.25, 0.75, f64::INFINITY], 2).unwrap();
        assert_eq!(h.counts, vec![1, 1]);
        assert_eq!(h.total(), 2);
    }

    #[test]
    fn degenerate_and_empty_ranges() {
        let h = Histogram::compute(&[0.3, 0.3, 0.3], 2).unwrap();
        assert_relative_eq!(h.edges[0], -0.2, epsilon = 1e-12);
        assert_relative_eq!(h.edges[2], 0.8, epsilon = 1e-12);
        assert_eq!(h.counts, vec![0, 3]);

        let h = Histogram::compute(&[f64::NAN], 20).unwrap();
        assert_eq!(h.edges.first(), Some(&0.0));
        assert_eq!(h.edges.last(), Some(&1.0));
        assert_eq!(h.total(), 0);
        assert_eq!(h.bins(), 20);
    }

    #[test]
    fn counts_cover_every_value() {
        let values: Vec<f64> = (0..1000).map(|i| ((i * 37) % 101) as f64 / 50.0 - 1.0).collect();
        for bins in [20, 60] {
            let h = Histogram::compute(&values, bins).unwrap();
            assert_eq!(h.total(), 1000);
            assert_eq!(h.edges.len(), bins + 1);
            assert_eq!(h.edges.last(), Some(&1.0));
        }
    }

    #[test]
    fn zero_bins_rejected() {
        assert!(matches!(Histogram::compute(&[1.0], 0), Err(DashboardError::ZeroBins)));
    }

    fn ndvi_slot(year: i32, values: Vec<f64>) -> SeriesSlot {
        let t = Utc.with_ymd_and_hms(year, 7, 1, 0, 0, 0).unwrap();
        let image = MultiBandImage::new(year.to_string(), t)
            .with_band("NDVI", Raster::from_vec(values, 2, 2).unwrap())
            .unwrap();
        SeriesSlot::with_image(SlotLabel::annual(year), image)
    }

    #[test]
    fn summary_and_chart() {
        let series = IndexSeries::from_slots(vec![
            ndvi_slot(2019, vec![0.1, 0.2, 0.2, 0.5]),
            SeriesSlot::unavailable(SlotLabel::annual(2020), UnavailableKind::NoImageAvailable, "none".into()),
            ndvi_slot(2021, vec![f64::NAN, 0.4, 0.4, 0.4]),
        ])
        .unwrap();
        let boundary = SiteBoundary::from_rect(-1.0, -3.0, 3.0, 1.0);

        let summary = summarize(&series, SpectralIndex::Ndvi, &boundary);
        assert_eq!(summary.len(), 3);
        assert_relative_eq!(summary.get(0, StatKind::Mean).unwrap(), 0.25, epsilon = 1e-12);
        assert_relative_eq!(summary.get(0, StatKind::Median).unwrap(), 0.2, epsilon = 1e-12);
        assert_relative_eq!(summary.get(0, StatKind::Mode).unwrap(), 0.2, epsilon = 1e-9);
        assert_eq!(summary.get(1, StatKind::Mean), None);
        assert_relative_eq!(summary.get(2, StatKind::Mean).unwrap(), 0.4, epsilon = 1e-12);
        assert_eq!(summary.get(3, StatKind::Mean), None);

        let chart = summary.line_chart();
        assert_eq!(chart.title, "Change in NDVI statistics");
        assert_eq!(chart.x, vec!["2019", "2020", "2021"]);
        let names: Vec<&str> = chart.traces.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Mean", "Median", "Mode"]);
        assert_eq!(chart.traces[0].y[1], None);

        let json = serde_json::to_value(&chart).unwrap();
        assert!(json["traces"][0]["y"][1].is_null());
    }

    #[test]
    fn summary_of_absent_band_is_empty() {
        let series = IndexSeries::from_slots(vec![ndvi_slot(2019, vec![0.1; 4])]).unwrap();
        let boundary = SiteBoundary::from_rect(-1.0, -3.0, 3.0, 1.0);
        let summary = summarize(&series, SpectralIndex::Msi, &boundary);
        assert_eq!(summary.get(0, StatKind::Median), None);
    }
}
