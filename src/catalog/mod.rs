//! Imagery catalogs.
//!
//! A catalog answers one question: which images of an archive intersect a
//! region within a half-open date window, reported as capture timestamps.

pub mod memory;
pub mod stac;

pub use memory::MemoryCatalog;
pub use stac::StacCatalog;

use crate::error::CatalogError;
use crate::models::Archive;
use crate::region::Region;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

/// Source of image acquisition timestamps.
#[async_trait]
pub trait ImageryCatalog: Send + Sync {
    /// Capture times of every `archive` image whose footprint intersects
    /// `region` and whose capture time lies in `[start, end)`.
    async fn list_acquisitions(
        &self,
        archive: Archive,
        region: &Region,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DateTime<Utc>>, CatalogError>;

    /// Short description for logs and report metadata.
    fn describe(&self) -> String;
}

/// Midnight UTC at the beginning of `date`.
pub fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::default()))
}

/// Whether `time` falls in the half-open window `[start, end)`.
pub fn in_window(time: &DateTime<Utc>, start: NaiveDate, end: NaiveDate) -> bool {
    *time >= day_start(start) && *time < day_start(end)
}
