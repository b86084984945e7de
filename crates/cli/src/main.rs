//! MineScope CLI - spectral index monitoring of mining sites

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use minescope_algorithms::imagery::SpectralIndex;
use minescope_algorithms::statistics::{pixel_values, summarize_values};
use minescope_archive::{
    select_scenes, DateRange, ImageArchive, LocalStacArchive, SceneQuery, Season, LATEST_CLEAR_MAX_CLOUD,
};
use minescope_core::{FeatureCollection, SiteBoundary};
use minescope_dashboard::{
    build_series, data_vis_params, index_info, layer_name, summarize, vis_params, DashboardConfig,
    Histogram, IndexSeries, MapLayer, SeriesSlot, SiteConfig, SlotLabel, StatKind,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "minescope")]
#[command(author, version, about = "Spectral index monitoring of mining sites", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Dashboard configuration (JSON); the built-in sites when absent
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// STAC ItemCollection of the scene archive, overriding the configuration
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// GeoJSON with the mine polygons, overriding the configuration
    #[arg(long, global = true)]
    boundaries: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the configured sites
    Sites,
    /// List the archive scenes of a site, lowest cloud cover first
    Scenes {
        /// Site id
        site: String,
        /// Restrict to one calendar year
        #[arg(short, long)]
        year: Option<i32>,
    },
    /// Mean, median and mode of one index across the site's series
    Series {
        /// Site id
        site: String,
        /// Index: NDVI, NDWI1, NDWI2, NMDI, EVI, MSI, MSAVI2
        #[arg(short, long, value_parser = parse_index)]
        index: SpectralIndex,
        /// Print the line chart as JSON
        #[arg(long)]
        json: bool,
    },
    /// Value histogram of one index in one series slot
    Histogram {
        /// Site id
        site: String,
        #[arg(short, long, value_parser = parse_index)]
        index: SpectralIndex,
        #[command(flatten)]
        slot: SlotArgs,
        /// Number of bins; the site's setting when absent
        #[arg(short, long)]
        bins: Option<usize>,
        /// Print the histogram as JSON
        #[arg(long)]
        json: bool,
    },
    /// Render one index of one series slot as an RGBA GeoTIFF
    Render {
        /// Site id
        site: String,
        #[arg(short, long, value_parser = parse_index)]
        index: SpectralIndex,
        #[command(flatten)]
        slot: SlotArgs,
        /// Output file
        output: PathBuf,
        /// Stretch to mean +/- 3 sd of the slot instead of the fixed range
        #[arg(long)]
        data_range: bool,
    },
}

#[derive(Args)]
struct SlotArgs {
    /// Year of the slot
    #[arg(short, long, required_unless_present = "latest")]
    year: Option<i32>,
    /// Season of a seasonal-pair site
    #[arg(short, long, requires = "year")]
    season: Option<SeasonArg>,
    /// The latest clear scene appended after the series
    #[arg(long, conflicts_with_all = ["year", "season"])]
    latest: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum SeasonArg {
    May,
    August,
}

impl From<SeasonArg> for Season {
    fn from(arg: SeasonArg) -> Self {
        match arg {
            SeasonArg::May => Season::May,
            SeasonArg::August => Season::August,
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn parse_index(s: &str) -> std::result::Result<SpectralIndex, String> {
    s.parse().map_err(|e: minescope_core::Error| e.to_string())
}

/// Configuration and data paths after applying the command-line overrides
struct Workspace {
    config: DashboardConfig,
    catalog: Option<PathBuf>,
    boundaries: Option<PathBuf>,
}

impl Workspace {
    fn load(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => DashboardConfig::load(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?,
            None => DashboardConfig::default(),
        };
        Ok(Self {
            catalog: cli.catalog.clone().or_else(|| config.catalog.clone()),
            boundaries: cli.boundaries.clone().or_else(|| config.boundaries.clone()),
            config,
        })
    }

    fn site(&self, id: &str) -> Result<&SiteConfig> {
        Ok(self.config.site(id)?)
    }

    fn archive(&self) -> Result<LocalStacArchive> {
        let path = self
            .catalog
            .as_deref()
            .context("No scene catalog configured; pass --catalog")?;
        let pb = spinner("Reading catalog...");
        let archive = LocalStacArchive::open(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        pb.finish_and_clear();
        info!("Catalog: {} scenes", archive.items().len());
        Ok(archive)
    }

    fn boundary(&self, site: &SiteConfig) -> Result<SiteBoundary> {
        let path = self
            .boundaries
            .as_deref()
            .context("No boundary collection configured; pass --boundaries")?;
        let features = FeatureCollection::read_geojson(path)
            .with_context(|| format!("Failed to read boundaries {}", path.display()))?;
        site.boundary(&features)
            .with_context(|| format!("No boundary polygons for site '{}'", site.id))
    }
}

fn series_for(site: &SiteConfig, archive: &impl ImageArchive, boundary: &SiteBoundary) -> Result<IndexSeries> {
    let pb = spinner(&format!("Building {} series...", site.id));
    let series = build_series(archive, &site.series_request(), boundary)
        .with_context(|| format!("Failed to build series for '{}'", site.id))?;
    pb.finish_and_clear();
    Ok(series)
}

fn find_slot<'a>(series: &'a IndexSeries, args: &SlotArgs) -> Result<&'a SeriesSlot> {
    if args.latest {
        return series.latest().context("The series has no latest clear slot");
    }
    let year = args.year.context("--year or --latest is required")?;
    match args.season {
        Some(season) => Ok(series.slot(&SlotLabel::seasonal(year, season.into()))?),
        None => series
            .find(&SlotLabel::annual(year))
            .or_else(|| series.find_year(year))
            .with_context(|| format!("No series slot for {year}")),
    }
}

fn fmt_stat(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"))
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;
    let workspace = Workspace::load(&cli)?;

    match &cli.command {
        // ── Sites ────────────────────────────────────────────────────
        Commands::Sites => {
            for site in &workspace.config.sites {
                println!("{}: {}", site.id, site.header);
                println!("  Centre: {:.6}, {:.6} (zoom {})", site.center[0], site.center[1], site.zoom);
                println!("  Years: {}-{}", site.start_year, site.end_year);
                println!("  Selection: {:?}", site.mode);
                if site.include_latest {
                    println!("  Latest clear scene: below {LATEST_CLEAR_MAX_CLOUD}% cloud");
                }
            }
        }

        // ── Scenes ───────────────────────────────────────────────────
        Commands::Scenes { site, year } => {
            let site = workspace.site(site)?;
            let archive = workspace.archive()?;
            let mut query = SceneQuery::new(site.roi.clone());
            if let Some(year) = year {
                query = query.dates(DateRange::year(*year)?);
            }
            let scenes = archive.search(&query)?.sort_by_cloud_cover();
            println!("{} scenes for {}", scenes.len(), site.header);
            for scene in scenes.iter() {
                println!("  {}  {}  cloud {}", scene.date(), scene.id, fmt_stat(scene.cloud_cover));
            }
            if let Some(year) = year {
                let selected = select_scenes(&archive, &site.roi, *year, site.mode)?;
                for scene in selected.iter().flatten() {
                    println!("Selected: {}", scene.id);
                }
            }
        }

        // ── Series ───────────────────────────────────────────────────
        Commands::Series { site, index, json } => {
            let site = workspace.site(site)?;
            let archive = workspace.archive()?;
            let boundary = workspace.boundary(site)?;
            let series = series_for(site, &archive, &boundary)?;
            let summary = summarize(&series, *index, &boundary);

            if *json {
                println!("{}", serde_json::to_string_pretty(&summary.line_chart())?);
                return Ok(());
            }

            let about = index_info(*index);
            println!("{} ({})", about.name, index);
            println!("  {}", about.description);
            println!("{:<14} {:>10} {:>10} {:>10}", "Slot", "Mean", "Median", "Mode");
            for (t, slot) in series.slots().iter().enumerate() {
                let row: Vec<String> = StatKind::ALL
                    .into_iter()
                    .map(|kind| fmt_stat(summary.get(t, kind)))
                    .collect();
                println!("{:<14} {:>10} {:>10} {:>10}", slot.label.to_string(), row[0], row[1], row[2]);
            }
        }

        // ── Histogram ────────────────────────────────────────────────
        Commands::Histogram {
            site,
            index,
            slot,
            bins,
            json,
        } => {
            let site = workspace.site(site)?;
            let archive = workspace.archive()?;
            let boundary = workspace.boundary(site)?;
            let series = series_for(site, &archive, &boundary)?;
            let slot = find_slot(&series, slot)?;
            let band = slot.image()?.require_band(index.name())?;
            let hist = Histogram::compute(&pixel_values(band, &boundary), bins.unwrap_or(site.histogram_bins))?;

            if *json {
                println!("{}", serde_json::to_string_pretty(&hist)?);
                return Ok(());
            }
            println!("{} histogram, {} ({} pixels)", index, slot.label, hist.total());
            for (center, count) in hist.centers().iter().zip(&hist.counts) {
                println!("  {center:>9.4}  {count}");
            }
        }

        // ── Render ───────────────────────────────────────────────────
        Commands::Render {
            site,
            index,
            slot,
            output,
            data_range,
        } => {
            let start = Instant::now();
            let site = workspace.site(site)?;
            let archive = workspace.archive()?;
            let boundary = workspace.boundary(site)?;
            let series = series_for(site, &archive, &boundary)?;
            let slot = find_slot(&series, slot)?;
            let image = slot.image()?;

            let vis = if *data_range {
                let band = image.require_band(index.name())?;
                let stats = summarize_values(pixel_values(band, &boundary))
                    .context("No valid pixels inside the boundary")?;
                data_vis_params(*index, &stats)
            } else {
                vis_params(*index)
            };

            let pb = spinner("Writing output...");
            let layer = MapLayer::render(layer_name(*index, &slot.label), image, *index, vis)?;
            layer
                .write_tiff(output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            pb.finish_and_clear();
            info!("Range {:.3}..{:.3}, palette {}", vis.min, vis.max, vis.palette);
            done(&layer.name, output, start.elapsed());
        }
    }

    Ok(())
}
