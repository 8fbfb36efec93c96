//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// geoavail - satellite image availability for an area of interest
///
/// Counts Sentinel-1, Sentinel-2, Landsat-8 and Landsat-9 acquisitions per
/// date over a region, and summarizes radar backscatter per land-cover class.
///
/// Examples:
///   geoavail availability --start 2021-01-01 --end 2021-03-01 --bbox 76.8,12.9,76.9,13.0
///   geoavail availability --start 2021-01-01 --end 2021-03-01 --region aoi.geojson --format json
///   geoavail watch --start 2021-01-01 --end 2021-02-01
///   geoavail boxplot --samples samples.csv
///   geoavail --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .geoavail.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Generate a default .geoavail.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Count image acquisitions per date for a region and date range
    Availability(AvailabilityArgs),

    /// Interactive session: edit region and dates on stdin, results redraw after a quiet period
    Watch(WatchArgs),

    /// Per-class backscatter statistics for box plots
    Boxplot(BoxplotArgs),
}

/// Catalog selection shared by availability commands.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct CatalogArgs {
    /// STAC API root URL
    #[arg(long, value_name = "URL", env = "GEOAVAIL_STAC_URL")]
    pub stac_url: Option<String>,

    /// Answer queries from a JSON fixture file instead of the STAC API
    #[arg(long, value_name = "FILE")]
    pub fixture: Option<PathBuf>,

    /// Catalog request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct AvailabilityArgs {
    /// Start date, inclusive (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub start: String,

    /// End date, exclusive (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub end: String,

    /// GeoJSON file with the area of interest
    #[arg(long, value_name = "FILE", required_unless_present = "bbox", conflicts_with = "bbox")]
    pub region: Option<PathBuf>,

    /// Area of interest as MIN_LON,MIN_LAT,MAX_LON,MAX_LAT
    #[arg(long, value_name = "BBOX", allow_hyphen_values = true)]
    pub bbox: Option<String>,

    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Output format
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write the result to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct WatchArgs {
    /// Initial start date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub start: Option<String>,

    /// Initial end date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub end: Option<String>,

    /// Initial area of interest as MIN_LON,MIN_LAT,MAX_LON,MAX_LAT
    #[arg(long, value_name = "BBOX", allow_hyphen_values = true)]
    pub bbox: Option<String>,

    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Quiet period in milliseconds before a query is issued
    #[arg(long, value_name = "MS")]
    pub debounce_ms: Option<u64>,

    /// Output format for each redraw
    #[arg(long, default_value = "chart", value_name = "FORMAT")]
    pub format: OutputFormat,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct BoxplotArgs {
    /// CSV file with one row per sample: class column plus one column per band
    #[arg(long, value_name = "FILE")]
    pub samples: PathBuf,

    /// Name of the class column
    #[arg(long, value_name = "NAME")]
    pub class_column: Option<String>,

    /// Samples used per class
    #[arg(long, value_name = "COUNT")]
    pub points_per_class: Option<usize>,

    /// Output format
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write the result to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
    /// CSV table
    Csv,
    /// Terminal chart
    Chart,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        let catalog = match &self.command {
            None => return Err("A command is required (availability, watch, boxplot)".to_string()),
            Some(Command::Availability(a)) => &a.catalog,
            Some(Command::Watch(w)) => &w.catalog,
            Some(Command::Boxplot(b)) => {
                if b.points_per_class == Some(0) {
                    return Err("Points per class must be at least 1".to_string());
                }
                if !b.samples.is_file() {
                    return Err(format!(
                        "Samples file does not exist: {}",
                        b.samples.display()
                    ));
                }
                return Ok(());
            }
        };

        // Validate STAC URL format (not needed with a fixture)
        if catalog.fixture.is_none() {
            if let Some(ref url) = catalog.stac_url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err("STAC URL must start with 'http://' or 'https://'".to_string());
                }
            }
        }

        // Validate timeout if provided
        if let Some(timeout) = catalog.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref fixture) = catalog.fixture {
            if !fixture.is_file() {
                return Err(format!("Fixture file does not exist: {}", fixture.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(argv)
    }

    #[test]
    fn test_parse_availability_bbox() {
        let args = parse(&[
            "geoavail",
            "availability",
            "--start",
            "2021-01-01",
            "--end",
            "2021-02-01",
            "--bbox",
            "-10.5,5,-9.5,6",
            "--format",
            "csv",
        ])
        .unwrap();

        match args.command {
            Some(Command::Availability(a)) => {
                assert_eq!(a.bbox.as_deref(), Some("-10.5,5,-9.5,6"));
                assert_eq!(a.format, OutputFormat::Csv);
                assert!(a.region.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_availability_requires_region() {
        assert!(parse(&[
            "geoavail",
            "availability",
            "--start",
            "2021-01-01",
            "--end",
            "2021-02-01",
        ])
        .is_err());
    }

    #[test]
    fn test_watch_defaults_to_chart() {
        let args = parse(&["geoavail", "watch", "--debounce-ms", "100"]).unwrap();
        match args.command {
            Some(Command::Watch(w)) => {
                assert_eq!(w.format, OutputFormat::Chart);
                assert_eq!(w.debounce_ms, Some(100));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_validation_requires_command() {
        let args = parse(&["geoavail"]).unwrap();
        assert!(args.validate().is_err());

        let args = parse(&["geoavail", "--init-config"]).unwrap();
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_url() {
        let args = parse(&["geoavail", "watch", "--stac-url", "ftp://example.com"]).unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let args = parse(&["geoavail", "watch", "-v", "-q"]).unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = parse(&["geoavail", "watch"]).unwrap();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
