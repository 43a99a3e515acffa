//! Statistics and risk aggregation over Monte Carlo outputs.
//!
//! Two layers:
//!
//! - [`stats`]-level free functions over plain slices (moments, interpolated
//!   percentiles, histograms, Pearson/Spearman correlation)
//! - [`MetricSample`] and [`summarize`], which turn a [`MonteCarloResult`]
//!   into a [`SimulationSummary`] per output metric
//!
//! ```ignore
//! use dcfsim_core::analysis::{summarize_with, SummaryOptions};
//!
//! let options = SummaryOptions::default().with_thresholds([0.0, 25.0]);
//! let summary = summarize_with(&result, "share_price", &options)?;
//! println!("P(price < 25) = {:.1}%", summary.probability_below[1].1 * 100.0);
//! ```
//!
//! [`MonteCarloResult`]: crate::model::MonteCarloResult

mod sensitivity;
mod stats;
mod summary;

pub use sensitivity::{Sensitivity, sensitivity_ranking};
pub use stats::{
    HistogramBin, excess_kurtosis, histogram, kurtosis, mean, mode_estimate, pearson,
    percentile_sorted, ranks, skewness, spearman, std_dev,
};
pub use summary::{
    ConfidenceInterval, DEFAULT_CONFIDENCE_LEVELS, DEFAULT_HISTOGRAM_BINS, DEFAULT_PERCENTILES,
    MetricSample, SimulationSummary, SummaryOptions, summarize, summarize_all, summarize_with,
};
