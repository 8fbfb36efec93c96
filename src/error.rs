//! Error types.
//!
//! Catalog failures are kept distinct from "no images found": an aggregation
//! either yields a complete table or one of these errors, never a partial
//! table.

use crate::models::Archive;
use thiserror::Error;

/// Errors raised by an imagery catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog request timed out after {0}s")]
    Timeout(u64),

    #[error("catalog quota exceeded (HTTP 429): {0}")]
    Quota(String),

    #[error("cannot connect to catalog at {0}")]
    Connect(String),

    #[error("catalog returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("catalog request failed: {0}")]
    Request(String),

    #[error("failed to decode catalog response: {0}")]
    Decode(String),

    #[error("result set exceeds {pages} pages; narrow the region or date range")]
    LimitExceeded { pages: usize },

    #[error("fixture error: {0}")]
    Fixture(String),

    #[error("no collection configured for archive {0}")]
    Unconfigured(Archive),
}

impl CatalogError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            CatalogError::Connect(_) => true,
            CatalogError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Errors raised while computing an availability table.
#[derive(Error, Debug)]
pub enum AvailabilityError {
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("{archive} query failed: {source}")]
    Catalog {
        archive: Archive,
        #[source]
        source: CatalogError,
    },

    #[error("aggregation task failed: {0}")]
    Task(String),
}

/// Errors raised while parsing a region.
#[derive(Error, Debug)]
pub enum RegionError {
    #[error("invalid GeoJSON: {0}")]
    GeoJson(String),

    #[error("unsupported geometry type '{0}'")]
    Unsupported(String),

    #[error("geometry has no coordinates")]
    Empty,

    #[error("invalid bounding box '{0}', expected MIN_LON,MIN_LAT,MAX_LON,MAX_LAT")]
    BBox(String),
}

/// Errors raised while loading samples or computing box-plot statistics.
#[derive(Error, Debug)]
pub enum StatsError {
    #[error("failed to read samples: {0}")]
    Csv(#[from] csv::Error),

    #[error("samples have no '{0}' column")]
    MissingClassColumn(String),

    #[error("samples have no band columns")]
    NoBands,
}
