//! geoavail - satellite image availability for an area of interest
//!
//! Counts Sentinel-1, Sentinel-2, Landsat-8 and Landsat-9 acquisitions per
//! calendar date over a region, either once or in an interactive session
//! that re-queries after edits, and summarizes radar backscatter samples
//! per land-cover class.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Invalid arguments or runtime error (catalog, config, I/O)

mod analysis;
mod catalog;
mod cli;
mod config;
mod error;
mod models;
mod region;
mod report;
mod session;

use analysis::{aggregate, compute_class_stats, AvailabilityQuery, SampleTable};
use anyhow::{Context, Result};
use catalog::{ImageryCatalog, MemoryCatalog, StacCatalog};
use cli::{Args, AvailabilityArgs, BoxplotArgs, CatalogArgs, Command, WatchArgs};
use config::{Config, CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use region::Region;
use report::{render_availability, render_boxplot, write_output, AvailabilityReport, BoxplotReport};
use session::commands::USAGE;
use session::{parse_command, AvailabilitySession, SessionCommand, TerminalSurface};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("geoavail v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Command failed: {}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .geoavail.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize the STAC endpoint, collections, chart and box-plot settings.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    match args.command {
        Some(Command::Availability(ref a)) => run_availability(a, &config, args.quiet).await,
        Some(Command::Watch(ref w)) => run_watch(w, &config).await,
        Some(Command::Boxplot(ref b)) => run_boxplot(b, &config),
        None => anyhow::bail!("A command is required (availability, watch, boxplot)"),
    }
}

/// One-shot availability query.
async fn run_availability(args: &AvailabilityArgs, config: &Config, quiet: bool) -> Result<()> {
    let start_time = Instant::now();

    let region = match (&args.region, &args.bbox) {
        (Some(path), _) => load_region(path)?,
        (None, Some(bbox)) => Region::from_bbox(bbox)?,
        (None, None) => anyhow::bail!("Either --region or --bbox is required"),
    };
    let query = AvailabilityQuery::parse(region, &args.start, &args.end)?;
    if query.is_empty_range() {
        warn!(
            "End date {} is not after start date {}; nothing to query",
            query.end, query.start
        );
    }

    let catalog = build_catalog(&args.catalog, config)?;
    info!("Querying {} for {} .. {}", catalog.describe(), query.start, query.end);

    let spinner = if quiet || args.output.is_none() {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]")?);
        pb.set_message("Querying catalog...");
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    };

    let result = aggregate(catalog.as_ref(), &query).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let table = result?;

    let duration = start_time.elapsed().as_secs_f64();
    let report = AvailabilityReport::new(catalog.describe(), query, table).with_duration(duration);
    let output = render_availability(&report, args.format, &config.chart)?;

    match &args.output {
        Some(path) => {
            write_output(path, &output)?;
            if !quiet {
                println!("📊 Availability Summary:");
                println!("   Dates with images: {}", report.table.len());
                println!("   Total images: {}", report.table.totals.total());
                println!("   Duration: {:.1}s", duration);
                println!("\n✅ Report saved to: {}", path.display());
            }
        }
        None => print!("{}", output),
    }

    Ok(())
}

/// Interactive session reading edit commands from stdin.
async fn run_watch(args: &WatchArgs, config: &Config) -> Result<()> {
    let catalog = build_catalog(&args.catalog, config)?;
    let surface = TerminalSurface::new(args.format, config.chart.clone(), catalog.describe());
    let debounce = Duration::from_millis(config.session.debounce_ms);

    let mut session = AvailabilitySession::new(catalog, surface, debounce).with_dates(
        args.start.clone().unwrap_or_default(),
        args.end.clone().unwrap_or_default(),
    );
    if let Some(ref bbox) = args.bbox {
        session = session.with_region(Region::from_bbox(bbox)?);
    }

    let (tx, rx) = mpsc::channel(32);
    let worker = tokio::spawn(session.run(rx));

    println!("{}", USAGE);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(Some(SessionCommand::Edit(edit))) => {
                if tx.send(edit).await.is_err() {
                    break;
                }
            }
            Ok(Some(SessionCommand::Help)) => println!("{}", USAGE),
            Ok(Some(SessionCommand::Quit)) => break,
            Ok(None) => {}
            Err(e) => eprintln!("⚠️  {}", e),
        }
    }

    // Closing the channel lets pending work drain before the session ends.
    drop(tx);
    let surface = worker.await.context("Session task failed")?;
    info!("Session ended after {} redraws", surface.redraws());

    Ok(())
}

/// Per-class backscatter statistics from a samples CSV.
fn run_boxplot(args: &BoxplotArgs, config: &Config) -> Result<()> {
    let table = SampleTable::from_path(&args.samples, &config.boxplot.class_column)?;
    info!(
        "Loaded {} samples with {} bands from {}",
        table.samples.len(),
        table.bands.len(),
        args.samples.display()
    );

    let classes = compute_class_stats(&table, &config.boxplot);
    let report = BoxplotReport::new(args.samples.display().to_string(), classes);
    let output = render_boxplot(&report, args.format, &config.boxplot)?;

    match &args.output {
        Some(path) => {
            write_output(path, &output)?;
            println!("✅ Box-plot statistics saved to: {}", path.display());
        }
        None => print!("{}", output),
    }

    Ok(())
}

/// Fixture-backed catalog when `--fixture` is given, otherwise the STAC API.
fn build_catalog(args: &CatalogArgs, config: &Config) -> Result<Arc<dyn ImageryCatalog>> {
    match args.fixture {
        Some(ref path) => {
            info!("Using fixture catalog: {}", path.display());
            Ok(Arc::new(MemoryCatalog::from_fixture_file(path)?))
        }
        None => Ok(Arc::new(StacCatalog::new(config.catalog.clone())?)),
    }
}

fn load_region(path: &Path) -> Result<Region> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read region file: {}", path.display()))?;
    Region::from_geojson(&content)
        .with_context(|| format!("Invalid region in {}", path.display()))
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
