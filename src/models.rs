//! Data models for image availability.
//!
//! This module contains the core data structures shared by the catalog,
//! the aggregator and the renderers: archives, acquisition events,
//! per-date rows and the finished availability table.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the four satellite archives queried for availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Archive {
    /// Sentinel-1 GRD (radar)
    S1,
    /// Sentinel-2 (multispectral)
    S2,
    /// Landsat-8 Collection 2 Level 2
    L8,
    /// Landsat-9 Collection 2 Level 2
    L9,
}

impl Archive {
    /// All archives in chart column order.
    pub const ALL: [Archive; 4] = [Archive::S1, Archive::S2, Archive::L8, Archive::L9];

    /// Human readable name used for chart legends.
    pub fn display_name(&self) -> &'static str {
        match self {
            Archive::S1 => "Sentinel-1",
            Archive::S2 => "Sentinel-2",
            Archive::L8 => "Landsat-8",
            Archive::L9 => "Landsat-9",
        }
    }

    /// Column key used in JSON and CSV output.
    pub fn key(&self) -> &'static str {
        match self {
            Archive::S1 => "s1",
            Archive::S2 => "s2",
            Archive::L8 => "l8",
            Archive::L9 => "l9",
        }
    }

    /// Series color of the stacked column chart.
    pub fn color(&self) -> &'static str {
        match self {
            Archive::S1 => "blue",
            Archive::S2 => "green",
            Archive::L8 => "red",
            Archive::L9 => "purple",
        }
    }

    /// Glyph used by the terminal chart.
    pub fn glyph(&self) -> char {
        match self {
            Archive::S1 => '#',
            Archive::S2 => '=',
            Archive::L8 => '+',
            Archive::L9 => '*',
        }
    }
}

impl fmt::Display for Archive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for Archive {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s1" | "sentinel-1" | "sentinel1" => Ok(Archive::S1),
            "s2" | "sentinel-2" | "sentinel2" => Ok(Archive::S2),
            "l8" | "landsat-8" | "landsat8" => Ok(Archive::L8),
            "l9" | "landsat-9" | "landsat9" => Ok(Archive::L9),
            other => Err(format!("unknown archive '{}'", other)),
        }
    }
}

/// A single image acquisition, truncated to its UTC calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AcquisitionEvent {
    pub archive: Archive,
    pub date: NaiveDate,
}

impl AcquisitionEvent {
    /// Build an event from a capture timestamp.
    pub fn from_timestamp(archive: Archive, time: DateTime<Utc>) -> Self {
        Self {
            archive,
            date: time.date_naive(),
        }
    }
}

/// Image counts per archive for one date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveCounts {
    pub s1: u32,
    pub s2: u32,
    pub l8: u32,
    pub l9: u32,
}

impl ArchiveCounts {
    pub fn get(&self, archive: Archive) -> u32 {
        match archive {
            Archive::S1 => self.s1,
            Archive::S2 => self.s2,
            Archive::L8 => self.l8,
            Archive::L9 => self.l9,
        }
    }

    pub fn set(&mut self, archive: Archive, count: u32) {
        match archive {
            Archive::S1 => self.s1 = count,
            Archive::S2 => self.s2 = count,
            Archive::L8 => self.l8 = count,
            Archive::L9 => self.l9 = count,
        }
    }

    /// Sum over all archives.
    pub fn total(&self) -> u32 {
        Archive::ALL.iter().map(|a| self.get(*a)).sum()
    }
}

/// Availability of all archives on one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRow {
    /// Calendar date, serialized as `YYYY-MM-DD`.
    pub date: NaiveDate,
    /// Images per archive captured on this date.
    #[serde(flatten)]
    pub counts: ArchiveCounts,
}

impl DateRow {
    /// Chart label for the row.
    pub fn label(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// The finished, chronologically ordered availability table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityTable {
    pub rows: Vec<DateRow>,
    pub totals: ArchiveCounts,
}

impl AvailabilityTable {
    /// Creates a table from rows already sorted by date.
    pub fn from_rows(rows: Vec<DateRow>) -> Self {
        let mut totals = ArchiveCounts::default();
        for row in &rows {
            for archive in Archive::ALL {
                totals.set(archive, totals.get(archive) + row.counts.get(archive));
            }
        }
        Self { rows, totals }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Largest per-date total, used to scale charts.
    pub fn max_daily_total(&self) -> u32 {
        self.rows.iter().map(|r| r.counts.total()).max().unwrap_or(0)
    }
}
