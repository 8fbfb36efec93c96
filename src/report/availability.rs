//! Availability report generation.
//!
//! Renders an availability table as Markdown, JSON, CSV or a terminal
//! stacked column chart (one bar per date, one glyph per archive).

use crate::analysis::AvailabilityQuery;
use crate::cli::OutputFormat;
use crate::config::ChartConfig;
use crate::models::{Archive, AvailabilityTable};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Metadata about how a report was produced.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Catalog that answered the query.
    pub catalog: String,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Time spent querying, if measured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

/// A complete availability report.
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityReport {
    pub metadata: ReportMetadata,
    pub query: AvailabilityQuery,
    #[serde(flatten)]
    pub table: AvailabilityTable,
}

impl AvailabilityReport {
    pub fn new(catalog: String, query: AvailabilityQuery, table: AvailabilityTable) -> Self {
        Self {
            metadata: ReportMetadata {
                catalog,
                generated_at: Utc::now(),
                duration_seconds: None,
            },
            query,
            table,
        }
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.metadata.duration_seconds = Some(seconds);
        self
    }
}

/// Render a report in the requested format.
pub fn render_availability(
    report: &AvailabilityReport,
    format: OutputFormat,
    chart: &ChartConfig,
) -> Result<String> {
    match format {
        OutputFormat::Markdown => Ok(generate_markdown_report(report, chart)),
        OutputFormat::Json => generate_json_report(report),
        OutputFormat::Csv => generate_csv_report(&report.table),
        OutputFormat::Chart => Ok(generate_chart(&report.table, chart)),
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &AvailabilityReport, chart: &ChartConfig) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", chart.title));
    output.push_str(&generate_query_section(report));
    output.push_str(&generate_summary_section(&report.table));
    output.push_str(&generate_dates_section(&report.table));

    output
}

fn generate_query_section(report: &AvailabilityReport) -> String {
    let mut section = String::new();

    section.push_str("## Query\n\n");
    section.push_str(&format!("- **Region:** {}\n", report.query.region));
    section.push_str(&format!(
        "- **Period:** {} to {} (end exclusive)\n",
        report.query.start, report.query.end
    ));
    section.push_str(&format!("- **Catalog:** {}\n", report.metadata.catalog));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        report.metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(duration) = report.metadata.duration_seconds {
        section.push_str(&format!("- **Duration:** {:.1}s\n", duration));
    }
    section.push('\n');

    section
}

fn generate_summary_section(table: &AvailabilityTable) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    let names: Vec<_> = Archive::ALL.iter().map(|a| a.display_name()).collect();
    section.push_str(&format!("| {} | **Total** |\n", names.join(" | ")));
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    let totals: Vec<_> = Archive::ALL
        .iter()
        .map(|a| table.totals.get(*a).to_string())
        .collect();
    section.push_str(&format!(
        "| {} | **{}** |\n\n",
        totals.join(" | "),
        table.totals.total()
    ));

    section
}

fn generate_dates_section(table: &AvailabilityTable) -> String {
    let mut section = String::new();

    section.push_str("## Images per Date\n\n");

    if table.is_empty() {
        section.push_str("No images were found for this region and period.\n\n");
        return section;
    }

    let names: Vec<_> = Archive::ALL.iter().map(|a| a.display_name()).collect();
    section.push_str(&format!("| Date | {} | Total |\n", names.join(" | ")));
    section.push_str("|:---|:---:|:---:|:---:|:---:|:---:|\n");

    for row in &table.rows {
        let counts: Vec<_> = Archive::ALL
            .iter()
            .map(|a| row.counts.get(*a).to_string())
            .collect();
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            row.label(),
            counts.join(" | "),
            row.counts.total()
        ));
    }
    section.push('\n');

    section
}

/// Generate a JSON report.
pub fn generate_json_report(report: &AvailabilityReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Generate a CSV table with one row per date.
pub fn generate_csv_report(table: &AvailabilityTable) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["date"];
    header.extend(Archive::ALL.iter().map(|a| a.key()));
    writer.write_record(&header)?;

    for row in &table.rows {
        let mut record = vec![row.label()];
        record.extend(Archive::ALL.iter().map(|a| row.counts.get(*a).to_string()));
        writer.write_record(&record)?;
    }

    let bytes = writer.into_inner().map_err(|e| anyhow::anyhow!("{}", e))?;
    Ok(String::from_utf8(bytes)?)
}

/// Generate a terminal stacked column chart, drawn horizontally.
pub fn generate_chart(table: &AvailabilityTable, chart: &ChartConfig) -> String {
    let mut output = String::new();

    output.push_str(&format!("{}\n", chart.title));
    let legend: Vec<_> = Archive::ALL
        .iter()
        .map(|a| format!("{} {} ({})", a.glyph(), a.display_name(), a.color()))
        .collect();
    output.push_str(&format!("{}\n\n", legend.join("  ")));

    if table.is_empty() {
        output.push_str("(no images)\n");
        return output;
    }

    let max_total = table.max_daily_total() as usize;
    let bar_width = max_total.min(chart.width.max(1));
    let scale = bar_width as f64 / max_total as f64;

    for row in &table.rows {
        let mut bar = String::new();
        for archive in Archive::ALL {
            let count = row.counts.get(archive) as usize;
            if count == 0 {
                continue;
            }
            let len = ((count as f64 * scale).round() as usize).max(1);
            bar.extend(std::iter::repeat(archive.glyph()).take(len));
        }
        output.push_str(&format!(
            "{} |{:<width$} {}\n",
            row.label(),
            bar,
            row.counts.total(),
            width = bar_width
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArchiveCounts, DateRow};
    use crate::region::Region;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, d).unwrap()
    }

    fn create_test_table() -> AvailabilityTable {
        AvailabilityTable::from_rows(vec![
            DateRow {
                date: day(1),
                counts: ArchiveCounts { s1: 2, s2: 1, l8: 0, l9: 0 },
            },
            DateRow {
                date: day(2),
                counts: ArchiveCounts { s1: 0, s2: 1, l8: 0, l9: 1 },
            },
        ])
    }

    fn create_test_report(table: AvailabilityTable) -> AvailabilityReport {
        let query = AvailabilityQuery {
            region: Region::rectangle(0.0, 0.0, 1.0, 1.0),
            start: day(1),
            end: day(31),
        };
        AvailabilityReport::new("test catalog".to_string(), query, table).with_duration(1.5)
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report(create_test_table());
        let markdown = generate_markdown_report(&report, &ChartConfig::default());

        assert!(markdown.contains("# Satellite Image Availability"));
        assert!(markdown.contains("## Query"));
        assert!(markdown.contains("test catalog"));
        assert!(markdown.contains("- **Duration:** 1.5s"));
        assert!(markdown.contains("| 2 | 2 | 0 | 1 | **5** |"));
        assert!(markdown.contains("| 2021-01-01 | 2 | 1 | 0 | 0 | 3 |"));
        assert!(markdown.contains("| 2021-01-02 | 0 | 1 | 0 | 1 | 2 |"));
    }

    #[test]
    fn test_markdown_empty_table() {
        let report = create_test_report(AvailabilityTable::default());
        let markdown = generate_markdown_report(&report, &ChartConfig::default());
        assert!(markdown.contains("No images were found"));
        assert!(markdown.contains("**0**"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report(create_test_table());
        let json = generate_json_report(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["rows"][0]["date"], "2021-01-01");
        assert_eq!(value["rows"][0]["s1"], 2);
        assert_eq!(value["totals"]["l9"], 1);
        assert_eq!(value["query"]["start"], "2021-01-01");
        assert_eq!(value["query"]["region"]["type"], "rectangle");
        assert_eq!(value["metadata"]["catalog"], "test catalog");
    }

    #[test]
    fn test_generate_csv_report() {
        let csv = generate_csv_report(&create_test_table()).unwrap();
        assert_eq!(
            csv,
            "date,s1,s2,l8,l9\n2021-01-01,2,1,0,0\n2021-01-02,0,1,0,1\n"
        );
    }

    #[test]
    fn test_generate_chart() {
        let chart = generate_chart(&create_test_table(), &ChartConfig::default());
        let lines: Vec<_> = chart.lines().collect();

        assert_eq!(lines[0], "Satellite Image Availability");
        assert!(lines[1].contains("# Sentinel-1"));
        assert_eq!(lines[3], "2021-01-01 |##= 3");
        assert_eq!(lines[4], "2021-01-02 |=*  2");
    }

    #[test]
    fn test_chart_scales_to_width() {
        let table = AvailabilityTable::from_rows(vec![DateRow {
            date: day(1),
            counts: ArchiveCounts { s1: 100, s2: 0, l8: 0, l9: 1 },
        }]);
        let config = ChartConfig {
            width: 10,
            ..ChartConfig::default()
        };
        let chart = generate_chart(&table, &config);
        let bar_line = chart.lines().nth(3).unwrap();

        // small counts still get one glyph
        assert!(bar_line.starts_with("2021-01-01 |##########*"));
        assert!(bar_line.ends_with(" 101"));
    }

    #[test]
    fn test_chart_empty() {
        let chart = generate_chart(&AvailabilityTable::default(), &ChartConfig::default());
        assert!(chart.contains("(no images)"));
    }
}
