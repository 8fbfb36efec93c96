//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.geoavail.toml` files.

use crate::cli::{Args, CatalogArgs, Command};
use crate::models::Archive;
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".geoavail.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Catalog settings.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Interactive session settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Availability chart settings.
    #[serde(default)]
    pub chart: ChartConfig,

    /// Box-plot statistics settings.
    #[serde(default)]
    pub boxplot: BoxplotConfig,
}

/// STAC catalog settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// STAC API root URL.
    #[serde(default = "default_stac_url")]
    pub stac_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Number of retries on transient failure.
    #[serde(default = "default_retries")]
    pub retries: usize,

    /// Items requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Pages followed before the query is rejected as too large.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Collection mapping per archive.
    #[serde(default)]
    pub archives: ArchivesConfig,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            stac_url: default_stac_url(),
            timeout_seconds: default_timeout(),
            retries: default_retries(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            archives: ArchivesConfig::default(),
        }
    }
}

fn default_stac_url() -> String {
    "https://earth-search.aws.element84.com/v1".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_retries() -> usize {
    2
}

fn default_page_size() -> usize {
    250
}

fn default_max_pages() -> usize {
    40
}

/// Where an archive lives in the STAC catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveSource {
    /// STAC collection id.
    pub collection: String,

    /// Optional `platform` property filter, for collections shared by several satellites.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl ArchiveSource {
    fn new(collection: &str, platform: Option<&str>) -> Self {
        Self {
            collection: collection.to_string(),
            platform: platform.map(String::from),
        }
    }
}

/// Collection mapping for the four archives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivesConfig {
    #[serde(default = "default_s1")]
    pub s1: ArchiveSource,
    #[serde(default = "default_s2")]
    pub s2: ArchiveSource,
    #[serde(default = "default_l8")]
    pub l8: ArchiveSource,
    #[serde(default = "default_l9")]
    pub l9: ArchiveSource,
}

impl Default for ArchivesConfig {
    fn default() -> Self {
        Self {
            s1: default_s1(),
            s2: default_s2(),
            l8: default_l8(),
            l9: default_l9(),
        }
    }
}

impl ArchivesConfig {
    pub fn source(&self, archive: Archive) -> &ArchiveSource {
        match archive {
            Archive::S1 => &self.s1,
            Archive::S2 => &self.s2,
            Archive::L8 => &self.l8,
            Archive::L9 => &self.l9,
        }
    }
}

fn default_s1() -> ArchiveSource {
    ArchiveSource::new("sentinel-1-grd", None)
}

fn default_s2() -> ArchiveSource {
    ArchiveSource::new("sentinel-2-l2a", None)
}

fn default_l8() -> ArchiveSource {
    ArchiveSource::new("landsat-c2-l2", Some("landsat-8"))
}

fn default_l9() -> ArchiveSource {
    ArchiveSource::new("landsat-c2-l2", Some("landsat-9"))
}

/// Interactive session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Quiet period after the last edit before a query is issued.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    300
}

/// Availability chart settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Chart title.
    #[serde(default = "default_chart_title")]
    pub title: String,

    /// Width of the longest terminal bar in characters.
    #[serde(default = "default_chart_width")]
    pub width: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            title: default_chart_title(),
            width: default_chart_width(),
        }
    }
}

fn default_chart_title() -> String {
    "Satellite Image Availability".to_string()
}

fn default_chart_width() -> usize {
    60
}

/// How class values are encoded in the samples table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassEncoding {
    /// Remapped WorldCover index 0-10.
    #[default]
    Index,
    /// Raw WorldCover code 10, 20, ..., 100.
    Code,
}

/// Box-plot statistics settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxplotConfig {
    /// Name of the land-cover class column.
    #[serde(default = "default_class_column")]
    pub class_column: String,

    /// Encoding of class values.
    #[serde(default)]
    pub class_encoding: ClassEncoding,

    /// Samples used per class.
    #[serde(default = "default_points_per_class")]
    pub points_per_class: usize,

    /// Band values below this (dB) are treated as border noise and dropped.
    #[serde(default = "default_mask_below")]
    pub mask_below: f64,

    /// Lower bound of the chart window (dB).
    #[serde(default = "default_chart_min")]
    pub chart_min: f64,

    /// Upper bound of the chart window (dB).
    #[serde(default = "default_chart_max")]
    pub chart_max: f64,
}

impl Default for BoxplotConfig {
    fn default() -> Self {
        Self {
            class_column: default_class_column(),
            class_encoding: ClassEncoding::default(),
            points_per_class: default_points_per_class(),
            mask_below: default_mask_below(),
            chart_min: default_chart_min(),
            chart_max: default_chart_max(),
        }
    }
}

fn default_class_column() -> String {
    "classification".to_string()
}

fn default_points_per_class() -> usize {
    50
}

fn default_mask_below() -> f64 {
    -30.0
}

fn default_chart_min() -> f64 {
    -30.0
}

fn default_chart_max() -> f64 {
    0.0
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Reject settings that would make every query or class come back empty.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.catalog.max_pages > 0, "catalog.max_pages must be at least 1");
        ensure!(self.catalog.page_size > 0, "catalog.page_size must be at least 1");
        ensure!(
            self.boxplot.points_per_class > 0,
            "boxplot.points_per_class must be at least 1"
        );
        Ok(())
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &Args) {
        match &args.command {
            Some(Command::Availability(a)) => self.merge_catalog_args(&a.catalog),
            Some(Command::Watch(w)) => {
                self.merge_catalog_args(&w.catalog);
                if let Some(debounce_ms) = w.debounce_ms {
                    self.session.debounce_ms = debounce_ms;
                }
            }
            Some(Command::Boxplot(b)) => {
                if let Some(ref column) = b.class_column {
                    self.boxplot.class_column = column.clone();
                }
                if let Some(points) = b.points_per_class {
                    self.boxplot.points_per_class = points;
                }
            }
            None => {}
        }
    }

    fn merge_catalog_args(&mut self, catalog: &CatalogArgs) {
        if let Some(ref url) = catalog.stac_url {
            self.catalog.stac_url = url.clone();
        }
        if let Some(timeout) = catalog.timeout {
            self.catalog.timeout_seconds = timeout;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.session.debounce_ms, 300);
        assert_eq!(config.catalog.archives.s1.collection, "sentinel-1-grd");
        assert_eq!(
            config.catalog.archives.source(Archive::L9).platform.as_deref(),
            Some("landsat-9")
        );
        assert_eq!(config.boxplot.points_per_class, 50);
        assert_eq!(config.boxplot.mask_below, -30.0);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[catalog]
stac_url = "https://planetarycomputer.microsoft.com/api/stac/v1"
max_pages = 5

[catalog.archives.s2]
collection = "sentinel-2-l1c"

[session]
debounce_ms = 500

[boxplot]
class_encoding = "code"
points_per_class = 20
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(
            config.catalog.stac_url,
            "https://planetarycomputer.microsoft.com/api/stac/v1"
        );
        assert_eq!(config.catalog.max_pages, 5);
        assert_eq!(config.catalog.page_size, 250);
        assert_eq!(config.catalog.archives.s2.collection, "sentinel-2-l1c");
        assert_eq!(config.catalog.archives.s2.platform, None);
        assert_eq!(config.catalog.archives.l8, default_l8());
        assert_eq!(config.session.debounce_ms, 500);
        assert_eq!(config.boxplot.class_encoding, ClassEncoding::Code);
        assert_eq!(config.boxplot.points_per_class, 20);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[catalog]"));
        assert!(toml_str.contains("[session]"));
        assert!(toml_str.contains("[boxplot]"));

        let round: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(round.catalog.archives.l8.platform.as_deref(), Some("landsat-8"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[chart]\nwidth = 40\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.chart.width, 40);
        assert_eq!(config.chart.title, "Satellite Image Availability");
    }

    #[test]
    fn test_load_rejects_zero_limits() {
        let dir = tempfile::tempdir().unwrap();
        for content in [
            "[catalog]\nmax_pages = 0\n",
            "[catalog]\npage_size = 0\n",
            "[boxplot]\npoints_per_class = 0\n",
        ] {
            let path = dir.path().join(CONFIG_FILE);
            std::fs::write(&path, content).unwrap();

            let err = Config::load(&path).unwrap_err();
            assert!(format!("{:#}", err).contains("must be at least 1"), "{}", content);
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(Config::load(Path::new("/nonexistent/.geoavail.toml")).is_err());
    }
}
