//! Backscatter box-plot reports.

use crate::analysis::{BandStats, ClassStats};
use crate::cli::OutputFormat;
use crate::config::BoxplotConfig;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Width of the terminal plot area in characters.
const PLOT_WIDTH: usize = 31;

#[derive(Debug, Clone, Serialize)]
pub struct BoxplotMetadata {
    /// Samples file the statistics were computed from.
    pub source: String,
    pub generated_at: DateTime<Utc>,
}

/// Statistics for every class found in a samples file.
#[derive(Debug, Clone, Serialize)]
pub struct BoxplotReport {
    pub metadata: BoxplotMetadata,
    pub classes: Vec<ClassStats>,
}

impl BoxplotReport {
    pub fn new(source: String, classes: Vec<ClassStats>) -> Self {
        Self {
            metadata: BoxplotMetadata {
                source,
                generated_at: Utc::now(),
            },
            classes,
        }
    }
}

pub fn render_boxplot(
    report: &BoxplotReport,
    format: OutputFormat,
    config: &BoxplotConfig,
) -> Result<String> {
    match format {
        OutputFormat::Markdown => Ok(generate_markdown(report)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Csv => generate_csv(report),
        OutputFormat::Chart => Ok(generate_chart(report, config)),
    }
}

fn generate_markdown(report: &BoxplotReport) -> String {
    let mut output = String::new();

    output.push_str("# Backscatter Profiles\n\n");
    output.push_str(&format!("- **Samples:** {}\n", report.metadata.source));
    output.push_str(&format!(
        "- **Generated:** {}\n\n",
        report.metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    if report.classes.is_empty() {
        output.push_str("No samples with a known land-cover class.\n");
        return output;
    }

    for class in &report.classes {
        output.push_str(&format!(
            "## Backscatter Profile for Class: {}\n\n",
            class.class.name
        ));
        output.push_str(&format!(
            "*Class {} | Samples: {} | Color: #{}*\n\n",
            class.class.index, class.samples, class.class.color
        ));
        output.push_str("| Band | Median | Min | Max | P25 | P75 |\n");
        output.push_str("|:---|---:|---:|---:|---:|---:|\n");
        for band in &class.bands {
            let s = &band.stats;
            output.push_str(&format!(
                "| {} | {:.2} | {:.2} | {:.2} | {:.2} | {:.2} |\n",
                band.band, s.median, s.min, s.max, s.p25, s.p75
            ));
        }
        output.push('\n');
    }

    output
}

fn generate_csv(report: &BoxplotReport) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["class", "class_index", "band", "median", "min", "max", "p25", "p75"])?;

    for class in &report.classes {
        for band in &class.bands {
            let s = &band.stats;
            writer.write_record([
                class.class.name.to_string(),
                class.class.index.to_string(),
                band.band.clone(),
                s.median.to_string(),
                s.min.to_string(),
                s.max.to_string(),
                s.p25.to_string(),
                s.p75.to_string(),
            ])?;
        }
    }

    let bytes = writer.into_inner().map_err(|e| anyhow::anyhow!("{}", e))?;
    Ok(String::from_utf8(bytes)?)
}

fn generate_chart(report: &BoxplotReport, config: &BoxplotConfig) -> String {
    let mut output = String::new();
    let label_width = report
        .classes
        .iter()
        .flat_map(|c| c.bands.iter().map(|b| b.band.len()))
        .max()
        .unwrap_or(0);

    for class in &report.classes {
        output.push_str(&format!(
            "Backscatter Profile for Class: {} (n={})\n",
            class.class.name, class.samples
        ));
        output.push_str(&format!(
            "{:label_width$}  {:<w$}{}\n",
            "",
            format!("{}", config.chart_min),
            config.chart_max,
            w = PLOT_WIDTH - 1
        ));
        for band in &class.bands {
            output.push_str(&format!(
                "{:label_width$} [{}] median {:.2} dB\n",
                band.band,
                box_line(&band.stats, config.chart_min, config.chart_max),
                band.stats.median
            ));
        }
        output.push('\n');
    }

    output
}

/// Draw whiskers `-`, box `=` and median `|` within the plot window.
fn box_line(stats: &BandStats, lo: f64, hi: f64) -> String {
    let span = (hi - lo).max(f64::EPSILON);
    let position = |v: f64| {
        let x = ((v - lo) / span * (PLOT_WIDTH - 1) as f64).round();
        x.clamp(0.0, (PLOT_WIDTH - 1) as f64) as usize
    };

    let mut cells = vec![' '; PLOT_WIDTH];
    for cell in &mut cells[position(stats.min)..=position(stats.max)] {
        *cell = '-';
    }
    for cell in &mut cells[position(stats.p25)..=position(stats.p75)] {
        *cell = '=';
    }
    cells[position(stats.median)] = '|';

    cells.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::boxplot::{BandSummary, LandCoverClass};

    fn create_test_report() -> BoxplotReport {
        let class = *LandCoverClass::by_index(0).unwrap();
        BoxplotReport::new(
            "samples.csv".to_string(),
            vec![ClassStats {
                class,
                samples: 4,
                bands: vec![BandSummary {
                    band: "VV".to_string(),
                    stats: BandStats {
                        median: -6.0,
                        min: -10.0,
                        max: -2.0,
                        p25: -8.0,
                        p75: -4.0,
                    },
                }],
            }],
        )
    }

    #[test]
    fn test_markdown() {
        let markdown = generate_markdown(&create_test_report());
        assert!(markdown.contains("## Backscatter Profile for Class: Tree Cover"));
        assert!(markdown.contains("Samples: 4"));
        assert!(markdown.contains("| VV | -6.00 | -10.00 | -2.00 | -8.00 | -4.00 |"));
    }

    #[test]
    fn test_markdown_no_classes() {
        let report = BoxplotReport::new("empty.csv".to_string(), vec![]);
        assert!(generate_markdown(&report).contains("No samples"));
    }

    #[test]
    fn test_csv() {
        let csv = generate_csv(&create_test_report()).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], "class,class_index,band,median,min,max,p25,p75");
        assert_eq!(lines[1], "Tree Cover,0,VV,-6,-10,-2,-8,-4");
    }

    #[test]
    fn test_box_line() {
        let stats = create_test_report().classes[0].bands[0].stats;
        let line = box_line(&stats, -30.0, 0.0);
        assert_eq!(line.len(), PLOT_WIDTH);
        assert_eq!(line, format!("{}--==|==--  ", " ".repeat(20)));
    }

    #[test]
    fn test_box_line_clamps_to_window() {
        let stats = BandStats {
            median: -20.0,
            min: -45.0,
            max: 5.0,
            p25: -25.0,
            p75: -15.0,
        };
        let line = box_line(&stats, -30.0, 0.0);
        assert!(line.starts_with('-'));
        assert!(line.ends_with('-'));
        assert_eq!(line.chars().nth(10), Some('|'));
    }

    #[test]
    fn test_json() {
        let report = create_test_report();
        let json = render_boxplot(&report, OutputFormat::Json, &BoxplotConfig::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["classes"][0]["class"]["name"], "Tree Cover");
        assert_eq!(value["classes"][0]["bands"][0]["stats"]["median"], -6.0);
    }
}
