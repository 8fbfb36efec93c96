//! Chart surfaces for the interactive session.

use crate::analysis::AvailabilityQuery;
use crate::cli::OutputFormat;
use crate::config::ChartConfig;
use crate::error::AvailabilityError;
use crate::models::AvailabilityTable;
use crate::report::{render_availability, AvailabilityReport};
use tracing::error;

/// Where session results are displayed. Each call replaces what was shown before.
pub trait ChartSurface: Send {
    /// Display the result of request `seq`.
    fn show(&mut self, seq: u64, query: &AvailabilityQuery, table: &AvailabilityTable);

    /// Report that request `seq` failed.
    fn fail(&mut self, seq: u64, error: &AvailabilityError);
}

/// Prints every result to stdout in the chosen format.
pub struct TerminalSurface {
    format: OutputFormat,
    chart: ChartConfig,
    catalog: String,
    redraws: usize,
}

impl TerminalSurface {
    pub fn new(format: OutputFormat, chart: ChartConfig, catalog: String) -> Self {
        Self {
            format,
            chart,
            catalog,
            redraws: 0,
        }
    }

    /// Number of results displayed so far.
    pub fn redraws(&self) -> usize {
        self.redraws
    }
}

impl ChartSurface for TerminalSurface {
    fn show(&mut self, seq: u64, query: &AvailabilityQuery, table: &AvailabilityTable) {
        let report = AvailabilityReport::new(self.catalog.clone(), query.clone(), table.clone());
        match render_availability(&report, self.format, &self.chart) {
            Ok(output) => {
                self.redraws += 1;
                println!("\n── request #{} ──", seq);
                println!("{}", output);
            }
            Err(e) => error!("Failed to render request #{}: {}", seq, e),
        }
    }

    fn fail(&mut self, seq: u64, error: &AvailabilityError) {
        eprintln!("\n❌ Request #{} failed: {}", seq, error);
    }
}
