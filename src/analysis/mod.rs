//! Analysis modules: per-date availability aggregation and per-class
//! backscatter statistics.

pub mod aggregator;
pub mod boxplot;

pub use aggregator::*;
pub use boxplot::{compute_class_stats, BandStats, ClassStats, SampleTable};
