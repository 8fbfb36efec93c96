//! Backscatter statistics per land-cover class.
//!
//! Samples are radar backscatter values (one column per band) labelled with
//! an ESA WorldCover class. For each class and band this module computes the
//! five numbers a box plot needs: median, min, max and the 25th/75th
//! percentiles.

use crate::config::{BoxplotConfig, ClassEncoding};
use crate::error::StatsError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// One ESA WorldCover land-cover class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LandCoverClass {
    /// Remapped continuous index, 0-10.
    pub index: u8,
    /// Raw WorldCover code.
    pub code: u16,
    pub name: &'static str,
    /// Palette color, hex without `#`.
    pub color: &'static str,
}

const fn class(index: u8, code: u16, name: &'static str, color: &'static str) -> LandCoverClass {
    LandCoverClass {
        index,
        code,
        name,
        color,
    }
}

/// The 11 WorldCover classes in index order.
pub const WORLDCOVER_CLASSES: [LandCoverClass; 11] = [
    class(0, 10, "Tree Cover", "006400"),
    class(1, 20, "Shrubland", "ffbb22"),
    class(2, 30, "Grassland", "ffff4c"),
    class(3, 40, "Cropland", "f096ff"),
    class(4, 50, "Built-up", "fa0000"),
    class(5, 60, "Bare / sparse Vegetation", "b4b4b4"),
    class(6, 70, "Snow and Ice", "f0f0f0"),
    class(7, 80, "Permanent Water Bodies", "0064c8"),
    class(8, 90, "Herbaceous Wetland", "0096a0"),
    class(9, 95, "Mangroves", "00cf75"),
    class(10, 100, "Moss and Lichen", "fae6a0"),
];

impl LandCoverClass {
    pub fn by_index(index: i64) -> Option<&'static LandCoverClass> {
        WORLDCOVER_CLASSES.iter().find(|c| i64::from(c.index) == index)
    }

    pub fn by_code(code: i64) -> Option<&'static LandCoverClass> {
        WORLDCOVER_CLASSES.iter().find(|c| i64::from(c.code) == code)
    }

    fn lookup(value: i64, encoding: ClassEncoding) -> Option<&'static LandCoverClass> {
        match encoding {
            ClassEncoding::Index => Self::by_index(value),
            ClassEncoding::Code => Self::by_code(value),
        }
    }
}

/// A labelled sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub class_value: i64,
    /// Band values aligned with `SampleTable::bands`.
    pub values: Vec<Option<f64>>,
}

impl Sample {
    /// Every band has a value at or above `mask_below`.
    fn is_unmasked(&self, mask_below: f64) -> bool {
        self.values
            .iter()
            .all(|v| matches!(v, Some(v) if *v >= mask_below))
    }
}

/// Samples with their band names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleTable {
    pub bands: Vec<String>,
    pub samples: Vec<Sample>,
}

impl SampleTable {
    /// Load samples from a CSV file.
    pub fn from_path(path: &Path, class_column: &str) -> Result<Self, StatsError> {
        let reader = csv::Reader::from_path(path)?;
        Self::from_csv(reader, class_column)
    }

    /// Load samples from CSV data.
    ///
    /// Band columns are the columns other than `class_column` whose non-empty
    /// values are all numeric; anything else (ids, geometry) is ignored.
    #[cfg(test)]
    pub fn from_reader<R: Read>(reader: R, class_column: &str) -> Result<Self, StatsError> {
        Self::from_csv(csv::Reader::from_reader(reader), class_column)
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>, class_column: &str) -> Result<Self, StatsError> {
        let headers = reader.headers()?.clone();
        let class_idx = headers
            .iter()
            .position(|h| h.trim() == class_column)
            .ok_or_else(|| StatsError::MissingClassColumn(class_column.to_string()))?;

        let records = reader.records().collect::<Result<Vec<_>, _>>()?;

        let band_idx: Vec<usize> = (0..headers.len())
            .filter(|&i| i != class_idx)
            .filter(|&i| {
                records.iter().all(|r| {
                    let v = r.get(i).unwrap_or("").trim();
                    v.is_empty() || v.parse::<f64>().is_ok()
                })
            })
            .collect();

        if band_idx.is_empty() {
            return Err(StatsError::NoBands);
        }

        let bands = band_idx
            .iter()
            .map(|&i| headers.get(i).unwrap_or("").trim().to_string())
            .collect();

        let mut samples = Vec::with_capacity(records.len());
        for (line, record) in records.iter().enumerate() {
            let raw = record.get(class_idx).unwrap_or("").trim();
            let class_value = match raw.parse::<f64>() {
                Ok(v) if v.fract() == 0.0 => v as i64,
                _ => {
                    warn!("Skipping sample {}: class value '{}' is not an integer", line + 1, raw);
                    continue;
                }
            };

            let values = band_idx
                .iter()
                .map(|&i| {
                    record
                        .get(i)
                        .and_then(|v| v.trim().parse::<f64>().ok())
                        .filter(|v| v.is_finite())
                })
                .collect();

            samples.push(Sample {
                class_value,
                values,
            });
        }

        debug!("Loaded {} samples with bands {:?}", samples.len(), bands);
        Ok(Self { bands, samples })
    }
}

/// Five-number summary of one band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandStats {
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub p25: f64,
    pub p75: f64,
}

impl BandStats {
    /// Summarize a set of values. `None` when empty.
    pub fn from_values(mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(|a, b| a.total_cmp(b));

        Some(Self {
            median: percentile(&values, 50.0),
            min: values[0],
            max: values[values.len() - 1],
            p25: percentile(&values, 25.0),
            p75: percentile(&values, 75.0),
        })
    }
}

/// Percentile of sorted values, interpolating linearly between closest ranks.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandSummary {
    pub band: String,
    pub stats: BandStats,
}

/// Statistics of every band for one land-cover class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassStats {
    pub class: LandCoverClass,
    /// Samples used after the per-class cap.
    pub samples: usize,
    pub bands: Vec<BandSummary>,
}

/// Group samples by class and summarize each band.
///
/// Classes come out in index order. A sample with any band value missing or
/// below `mask_below` is dropped first; then at most `points_per_class` of the
/// remaining samples are used per class, in input order. Classes left without
/// samples are omitted.
pub fn compute_class_stats(table: &SampleTable, config: &BoxplotConfig) -> Vec<ClassStats> {
    let mut groups: BTreeMap<u8, (&'static LandCoverClass, Vec<&Sample>)> = BTreeMap::new();
    let mut unknown = 0;
    let mut masked = 0;

    for sample in &table.samples {
        let Some(class) = LandCoverClass::lookup(sample.class_value, config.class_encoding) else {
            unknown += 1;
            continue;
        };
        if !sample.is_unmasked(config.mask_below) {
            masked += 1;
            continue;
        }
        let (_, members) = groups.entry(class.index).or_insert((class, Vec::new()));
        if members.len() < config.points_per_class {
            members.push(sample);
        }
    }

    if masked > 0 {
        debug!("Dropped {} samples with masked band values", masked);
    }
    if unknown > 0 {
        warn!("Skipped {} samples with unknown land-cover class", unknown);
    }

    groups
        .into_values()
        .map(|(class, members)| {
            let bands = table
                .bands
                .iter()
                .enumerate()
                .filter_map(|(i, band)| {
                    let values: Vec<f64> = members
                        .iter()
                        .filter_map(|s| s.values.get(i).copied().flatten())
                        .collect();
                    BandStats::from_values(values).map(|stats| BandSummary {
                        band: band.clone(),
                        stats,
                    })
                })
                .collect();

            ClassStats {
                class: *class,
                samples: members.len(),
                bands,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &str = "\
system:index,classification,VV,VH,.geo
a,0,-8,-14,{}
b,0,-6,-12,{}
c,0,-10,-16,{}
d,0,-4,-35,{}
e,4,-2,-9,{}
f,42,-5,-5,{}
g,x,-5,-5,{}
";

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_percentile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert!(approx(percentile(&v, 50.0), 2.5));
        assert!(approx(percentile(&v, 25.0), 1.75));
        assert!(approx(percentile(&v, 75.0), 3.25));
        assert!(approx(percentile(&v, 0.0), 1.0));
        assert!(approx(percentile(&v, 100.0), 4.0));
        assert!(approx(percentile(&[7.0], 25.0), 7.0));
        assert!(percentile(&[], 50.0).is_nan());
    }

    #[test]
    fn test_band_stats() {
        let stats = BandStats::from_values(vec![5.0, 1.0, 3.0, 2.0, 4.0]).unwrap();
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.p25, 2.0);
        assert_eq!(stats.p75, 4.0);
        assert!(BandStats::from_values(vec![]).is_none());
    }

    #[test]
    fn test_class_lookup() {
        assert_eq!(LandCoverClass::by_index(3).map(|c| c.name), Some("Cropland"));
        assert_eq!(LandCoverClass::by_code(95).map(|c| c.index), Some(9));
        assert!(LandCoverClass::by_index(11).is_none());
        assert!(LandCoverClass::by_code(11).is_none());
    }

    #[test]
    fn test_load_detects_band_columns() {
        let table = SampleTable::from_reader(SAMPLES.as_bytes(), "classification").unwrap();
        assert_eq!(table.bands, vec!["VV", "VH"]);
        // the non-integer class row is skipped
        assert_eq!(table.samples.len(), 6);
        assert_eq!(table.samples[0].values, vec![Some(-8.0), Some(-14.0)]);
    }

    #[test]
    fn test_missing_class_column() {
        let result = SampleTable::from_reader("a,b\n1,2\n".as_bytes(), "classification");
        assert!(matches!(result, Err(StatsError::MissingClassColumn(_))));
    }

    #[test]
    fn test_no_band_columns() {
        let result = SampleTable::from_reader("classification,name\n1,x\n".as_bytes(), "classification");
        assert!(matches!(result, Err(StatsError::NoBands)));
    }

    #[test]
    fn test_class_stats_with_mask_and_cap() {
        let table = SampleTable::from_reader(SAMPLES.as_bytes(), "classification").unwrap();
        let config = BoxplotConfig {
            points_per_class: 4,
            ..BoxplotConfig::default()
        };

        let stats = compute_class_stats(&table, &config);

        // class 42 is unknown, only Tree Cover and Built-up remain
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].class.name, "Tree Cover");
        assert_eq!(stats[1].class.name, "Built-up");

        // sample d has VH at -35 dB, below the edge mask, so it is dropped whole
        assert_eq!(stats[0].samples, 3);

        let vv = &stats[0].bands[0];
        assert_eq!(vv.band, "VV");
        assert_eq!(vv.stats.min, -10.0);
        assert_eq!(vv.stats.max, -6.0);
        assert!(approx(vv.stats.median, -8.0));

        let vh = &stats[0].bands[1];
        assert_eq!(vh.stats.min, -16.0);
        assert_eq!(vh.stats.max, -12.0);
    }

    #[test]
    fn test_masked_samples_do_not_count_toward_cap() {
        let csv = "classification,VV,VH\n0,-40,-10\n0,-5,-31\n0,-4,-12\n0,-3,-13\n0,-2,-14\n";
        let table = SampleTable::from_reader(csv.as_bytes(), "classification").unwrap();
        let config = BoxplotConfig {
            points_per_class: 2,
            ..BoxplotConfig::default()
        };

        let stats = compute_class_stats(&table, &config);
        assert_eq!(stats[0].samples, 2);
        let vv = &stats[0].bands[0].stats;
        assert_eq!(vv.min, -4.0);
        assert_eq!(vv.max, -3.0);
    }

    #[test]
    fn test_fully_masked_class_is_omitted() {
        let csv = "classification,VV\n0,-5\n7,-35\n7,\n";
        let table = SampleTable::from_reader(csv.as_bytes(), "classification").unwrap();

        let stats = compute_class_stats(&table, &BoxplotConfig::default());
        let names: Vec<_> = stats.iter().map(|s| s.class.name).collect();
        assert_eq!(names, vec!["Tree Cover"]);
    }

    #[test]
    fn test_points_per_class_cap_keeps_input_order() {
        let table = SampleTable::from_reader(SAMPLES.as_bytes(), "classification").unwrap();
        let config = BoxplotConfig {
            points_per_class: 2,
            ..BoxplotConfig::default()
        };

        let stats = compute_class_stats(&table, &config);
        let vv = &stats[0].bands[0].stats;
        assert_eq!(stats[0].samples, 2);
        assert_eq!(vv.min, -8.0);
        assert_eq!(vv.max, -6.0);
    }

    #[test]
    fn test_code_encoding() {
        let csv = "classification,VV\n10,-5\n100,-7\n0,-1\n";
        let table = SampleTable::from_reader(csv.as_bytes(), "classification").unwrap();
        let config = BoxplotConfig {
            class_encoding: ClassEncoding::Code,
            ..BoxplotConfig::default()
        };

        let stats = compute_class_stats(&table, &config);
        let names: Vec<_> = stats.iter().map(|s| s.class.name).collect();
        assert_eq!(names, vec!["Tree Cover", "Moss and Lichen"]);
    }

    #[test]
    fn test_bundled_samples() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/samples.csv");
        let table = SampleTable::from_path(&path, "classification").unwrap();
        let stats = compute_class_stats(&table, &BoxplotConfig::default());

        let indexes: Vec<u8> = stats.iter().map(|c| c.class.index).collect();
        assert_eq!(indexes, vec![0, 3, 4, 7]);

        // 0_3 carries a masked VH value
        let tree = &stats[0];
        assert_eq!(tree.samples, 3);
        assert_eq!(tree.bands[1].band, "VH");
        assert!(approx(tree.bands[1].stats.median, -14.02));

        let water = &stats[3];
        assert!(approx(water.bands[0].stats.min, -23.15));
    }
}
