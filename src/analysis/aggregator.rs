//! Availability aggregation.
//!
//! Turns per-archive acquisition timestamps into one row per calendar date.
//! Each archive's timestamps become a date histogram; the histograms are then
//! joined on date with missing entries counting as zero.

use crate::catalog::ImageryCatalog;
use crate::error::AvailabilityError;
use crate::models::{AcquisitionEvent, Archive, ArchiveCounts, AvailabilityTable, DateRow};
use crate::region::Region;
use chrono::{DateTime, NaiveDate, Utc};
use futures::future::try_join_all;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Images per calendar date for one archive.
pub type Histogram = BTreeMap<NaiveDate, u32>;

/// Region and half-open date window of one aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailabilityQuery {
    pub region: Region,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl AvailabilityQuery {
    /// Build a query from user-entered date text.
    pub fn parse(region: Region, start: &str, end: &str) -> Result<Self, AvailabilityError> {
        Ok(Self {
            region,
            start: parse_date(start)?,
            end: parse_date(end)?,
        })
    }

    /// Equal or inverted bounds select nothing.
    pub fn is_empty_range(&self) -> bool {
        self.start >= self.end
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(text: &str) -> Result<NaiveDate, AvailabilityError> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|_| AvailabilityError::InvalidDate(text.to_string()))
}

/// Count acquisitions per UTC calendar date.
pub fn frequency_histogram(archive: Archive, timestamps: &[DateTime<Utc>]) -> Histogram {
    let mut histogram = Histogram::new();
    for time in timestamps {
        let event = AcquisitionEvent::from_timestamp(archive, *time);
        *histogram.entry(event.date).or_default() += 1;
    }
    histogram
}

/// Join per-archive histograms into date rows, ascending by date.
///
/// Every date present in any histogram yields exactly one row; archives
/// without an entry for that date count zero.
pub fn merge_histograms(histograms: &[(Archive, Histogram)]) -> Vec<DateRow> {
    let dates: BTreeSet<NaiveDate> = histograms
        .iter()
        .flat_map(|(_, h)| h.keys().copied())
        .collect();

    dates
        .into_iter()
        .map(|date| {
            let mut counts = ArchiveCounts::default();
            for (archive, histogram) in histograms {
                let count = histogram.get(&date).copied().unwrap_or(0);
                counts.set(*archive, counts.get(*archive) + count);
            }
            DateRow { date, counts }
        })
        .collect()
}

/// Query all archives and build the availability table.
///
/// Returns an empty table without contacting the catalog when the date range
/// is empty. Any catalog failure fails the whole aggregation.
pub async fn aggregate<C>(
    catalog: &C,
    query: &AvailabilityQuery,
) -> Result<AvailabilityTable, AvailabilityError>
where
    C: ImageryCatalog + ?Sized,
{
    if query.is_empty_range() {
        debug!(
            "Empty date range {} .. {}, skipping catalog queries",
            query.start, query.end
        );
        return Ok(AvailabilityTable::default());
    }

    info!(
        "Aggregating availability for {} from {} to {}",
        query.region, query.start, query.end
    );

    let histograms = try_join_all(Archive::ALL.iter().map(|&archive| async move {
        let times = catalog
            .list_acquisitions(archive, &query.region, query.start, query.end)
            .await
            .map_err(|source| AvailabilityError::Catalog { archive, source })?;
        debug!("{}: {} acquisitions", archive, times.len());
        Ok::<_, AvailabilityError>((archive, frequency_histogram(archive, &times)))
    }))
    .await?;

    let table = AvailabilityTable::from_rows(merge_histograms(&histograms));
    info!(
        "Found {} images on {} dates",
        table.totals.total(),
        table.len()
    );
    Ok(table)
}
