//! In-memory imagery catalog.
//!
//! Serves acquisitions from a fixed list of records, either built in code or
//! loaded from a JSON fixture file. Records the number of queries it answered
//! and can simulate latency and per-archive failures.

use super::{in_window, ImageryCatalog};
use crate::error::CatalogError;
use crate::models::Archive;
use crate::region::Region;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A single catalogued image.
#[derive(Debug, Clone)]
pub struct AcquisitionRecord {
    pub archive: Archive,
    pub time: DateTime<Utc>,
    /// Image footprint; `None` matches every region.
    pub footprint: Option<Region>,
}

/// Fixture file layout.
#[derive(Debug, Deserialize)]
struct FixtureFile {
    acquisitions: Vec<FixtureRecord>,
}

#[derive(Debug, Deserialize)]
struct FixtureRecord {
    archive: Archive,
    time: DateTime<Utc>,
    #[serde(default)]
    footprint: Option<FixtureFootprint>,
}

/// Footprints are given either as a bbox array or a GeoJSON geometry.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FixtureFootprint {
    BBox([f64; 4]),
    GeoJson(Value),
}

impl FixtureFootprint {
    fn into_region(self) -> Result<Region, CatalogError> {
        match self {
            FixtureFootprint::BBox([a, b, c, d]) => Ok(Region::rectangle(a, b, c, d)),
            FixtureFootprint::GeoJson(value) => Region::from_geojson(&value.to_string())
                .map_err(|e| CatalogError::Fixture(e.to_string())),
        }
    }
}

/// Catalog backed by an in-memory record list.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    records: Arc<Vec<AcquisitionRecord>>,
    queries: Arc<AtomicUsize>,
    latency: Option<Duration>,
    failing: HashSet<Archive>,
}

impl MemoryCatalog {
    pub fn new(records: Vec<AcquisitionRecord>) -> Self {
        Self {
            records: Arc::new(records),
            ..Self::default()
        }
    }

    /// Load records from a JSON fixture file.
    pub fn from_fixture_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::Fixture(format!("{}: {}", path.display(), e)))?;
        Self::from_fixture_json(&content)
    }

    /// Parse records from fixture JSON text.
    pub fn from_fixture_json(content: &str) -> Result<Self, CatalogError> {
        let fixture: FixtureFile =
            serde_json::from_str(content).map_err(|e| CatalogError::Fixture(e.to_string()))?;

        let records = fixture
            .acquisitions
            .into_iter()
            .map(|r| {
                Ok(AcquisitionRecord {
                    archive: r.archive,
                    time: r.time,
                    footprint: r.footprint.map(FixtureFootprint::into_region).transpose()?,
                })
            })
            .collect::<Result<Vec<_>, CatalogError>>()?;

        debug!("Loaded {} fixture acquisitions", records.len());
        Ok(Self::new(records))
    }

    /// Delay every answer, as a remote catalog would.
    #[cfg(test)]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every query for `archive` fail with a timeout.
    #[cfg(test)]
    pub fn fail_archive(mut self, archive: Archive) -> Self {
        self.failing.insert(archive);
        self
    }

    /// Number of queries answered so far, shared between clones.
    #[cfg(test)]
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageryCatalog for MemoryCatalog {
    async fn list_acquisitions(
        &self,
        archive: Archive,
        region: &Region,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DateTime<Utc>>, CatalogError> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.failing.contains(&archive) {
            return Err(CatalogError::Timeout(
                self.latency.map(|l| l.as_secs()).unwrap_or(0),
            ));
        }

        let times = self
            .records
            .iter()
            .filter(|r| r.archive == archive)
            .filter(|r| in_window(&r.time, start, end))
            .filter(|r| r.footprint.as_ref().map_or(true, |f| f.intersects(region)))
            .map(|r| r.time)
            .collect();

        Ok(times)
    }

    fn describe(&self) -> String {
        format!("in-memory catalog ({} records)", self.records.len())
    }
}
