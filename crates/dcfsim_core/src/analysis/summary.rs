//! Distributional summaries and risk measures for one output metric.
//!
//! Everything here is computed over successful iterations only; failed
//! iterations are counted, never sampled. Successful iterations that did not
//! produce the metric are counted separately as missing.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::stats::{self, HistogramBin};
use crate::error::StatisticsError;
use crate::model::MonteCarloResult;

/// Percentiles reported when none are requested
pub const DEFAULT_PERCENTILES: [f64; 7] = [5.0, 10.0, 25.0, 50.0, 75.0, 90.0, 95.0];

/// Confidence intervals reported when none are requested
pub const DEFAULT_CONFIDENCE_LEVELS: [f64; 3] = [90.0, 95.0, 99.0];

/// Bins used for the histogram and the mode estimate
pub const DEFAULT_HISTOGRAM_BINS: usize = 50;

/// Which extra quantities a summary carries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryOptions {
    /// Percentiles in `[0, 100]`
    pub percentiles: Vec<f64>,
    /// Two-sided interval levels in `(0, 100)`
    pub confidence_levels: Vec<f64>,
    /// Values for which `P(X < threshold)` is reported
    pub thresholds: Vec<f64>,
    pub histogram_bins: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            percentiles: DEFAULT_PERCENTILES.to_vec(),
            confidence_levels: DEFAULT_CONFIDENCE_LEVELS.to_vec(),
            thresholds: Vec::new(),
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
        }
    }
}

impl SummaryOptions {
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: impl IntoIterator<Item = f64>) -> Self {
        self.thresholds = thresholds.into_iter().collect();
        self
    }
}

/// Two-sided interval `[P(alpha/2), P(1 - alpha/2)]` for `level = 1 - alpha`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub level: f64,
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    #[must_use]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Summary of one output metric over a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub metric: String,
    pub mean: f64,
    pub median: f64,
    /// Center of the fullest histogram bin
    pub mode_estimate: f64,
    pub std: f64,
    /// Standard error of the mean
    pub std_error: f64,
    pub min: f64,
    pub max: f64,
    /// (percentile, value)
    pub percentiles: Vec<(f64, f64)>,
    pub confidence_intervals: Vec<ConfidenceInterval>,
    pub var_95: f64,
    pub var_99: f64,
    pub cvar_95: f64,
    pub cvar_99: f64,
    pub skewness: f64,
    /// Fourth standardized moment (3 for a normal law)
    pub kurtosis: f64,
    /// `kurtosis - 3`
    pub excess_kurtosis: f64,
    /// (threshold, fraction of outcomes strictly below it)
    pub probability_below: Vec<(f64, f64)>,
    pub histogram: Vec<HistogramBin>,
    /// Successful iterations that produced this metric
    pub n_valid: usize,
    pub n_failed: usize,
    /// Successful iterations whose outputs lack this metric
    pub n_missing: usize,
}

impl SimulationSummary {
    /// Previously computed value for percentile `p`, if it was requested
    #[must_use]
    pub fn percentile(&self, p: f64) -> Option<f64> {
        self.percentiles
            .iter()
            .find(|(q, _)| (q - p).abs() < 1e-9)
            .map(|&(_, v)| v)
    }

    #[must_use]
    pub fn confidence_interval(&self, level: f64) -> Option<ConfidenceInterval> {
        self.confidence_intervals
            .iter()
            .find(|ci| (ci.level - level).abs() < 1e-9)
            .copied()
    }

    /// Iterations in the batch, whatever their outcome
    #[must_use]
    pub fn n_total(&self) -> usize {
        self.n_valid + self.n_failed + self.n_missing
    }

    #[must_use]
    pub fn failure_rate(&self) -> f64 {
        match self.n_total() {
            0 => 0.0,
            total => self.n_failed as f64 / total as f64,
        }
    }

    /// True when every iteration contributed a value
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.n_failed == 0 && self.n_missing == 0
    }
}

/// Sorted, non-empty population of one metric's successful outputs
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    sorted: Vec<f64>,
}

impl MetricSample {
    /// `None` when there is nothing to summarize
    #[must_use]
    pub fn new(mut values: Vec<f64>) -> Option<Self> {
        values.retain(|v| v.is_finite());
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);
        Some(Self { sorted: values })
    }

    pub fn from_result(result: &MonteCarloResult, metric: &str) -> Result<Self, StatisticsError> {
        Self::new(result.metric_values(metric)).ok_or_else(|| StatisticsError::NoValidSamples {
            metric: metric.to_string(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Values in ascending order
    #[must_use]
    pub fn sorted(&self) -> &[f64] {
        &self.sorted
    }

    #[must_use]
    pub fn mean(&self) -> f64 {
        stats::mean(&self.sorted)
    }

    #[must_use]
    pub fn median(&self) -> f64 {
        stats::percentile_sorted(&self.sorted, 50.0)
    }

    #[must_use]
    pub fn std(&self) -> f64 {
        stats::std_dev(&self.sorted)
    }

    #[must_use]
    pub fn std_error(&self) -> f64 {
        self.std() / (self.len() as f64).sqrt()
    }

    #[must_use]
    pub fn min(&self) -> f64 {
        self.sorted[0]
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        self.sorted[self.sorted.len() - 1]
    }

    pub fn percentile(&self, p: f64) -> Result<f64, StatisticsError> {
        if !(0.0..=100.0).contains(&p) {
            return Err(StatisticsError::InvalidPercentile(p));
        }
        Ok(stats::percentile_sorted(&self.sorted, p))
    }

    pub fn confidence_interval(&self, level: f64) -> Result<ConfidenceInterval, StatisticsError> {
        check_confidence(level)?;
        let alpha = 1.0 - level / 100.0;
        Ok(ConfidenceInterval {
            level,
            lower: self.percentile(100.0 * alpha / 2.0)?,
            upper: self.percentile(100.0 * (1.0 - alpha / 2.0))?,
        })
    }

    /// The `(100 - confidence)`-th percentile: `confidence`% of outcomes are at or above it
    pub fn value_at_risk(&self, confidence: f64) -> Result<f64, StatisticsError> {
        check_confidence(confidence)?;
        self.percentile(100.0 - confidence)
    }

    /// Mean of the outcomes at or below [`Self::value_at_risk`]
    pub fn conditional_value_at_risk(&self, confidence: f64) -> Result<f64, StatisticsError> {
        let var = self.value_at_risk(confidence)?;
        // The minimum is always at or below an interpolated percentile
        let tail = self.sorted.partition_point(|&x| x <= var).max(1);
        Ok(stats::mean(&self.sorted[..tail]))
    }

    /// Fraction of outcomes strictly below `threshold`
    #[must_use]
    pub fn probability_below(&self, threshold: f64) -> f64 {
        self.sorted.partition_point(|&x| x < threshold) as f64 / self.len() as f64
    }

    #[must_use]
    pub fn skewness(&self) -> f64 {
        stats::skewness(&self.sorted)
    }

    #[must_use]
    pub fn kurtosis(&self) -> f64 {
        stats::kurtosis(&self.sorted)
    }

    #[must_use]
    pub fn excess_kurtosis(&self) -> f64 {
        stats::excess_kurtosis(&self.sorted)
    }

    #[must_use]
    pub fn histogram(&self, bins: usize) -> Vec<HistogramBin> {
        stats::histogram(&self.sorted, bins)
    }

    #[must_use]
    pub fn mode_estimate(&self, bins: usize) -> f64 {
        stats::mode_estimate(&self.sorted, bins)
    }
}

fn check_confidence(level: f64) -> Result<(), StatisticsError> {
    if level > 0.0 && level < 100.0 {
        Ok(())
    } else {
        Err(StatisticsError::InvalidConfidence(level))
    }
}

/// Summarize `metric` with the default options
pub fn summarize(
    result: &MonteCarloResult,
    metric: &str,
) -> Result<SimulationSummary, StatisticsError> {
    summarize_with(result, metric, &SummaryOptions::default())
}

pub fn summarize_with(
    result: &MonteCarloResult,
    metric: &str,
    options: &SummaryOptions,
) -> Result<SimulationSummary, StatisticsError> {
    let sample = MetricSample::from_result(result, metric)?;
    let bins = options.histogram_bins.max(1);

    let percentiles = options
        .percentiles
        .iter()
        .map(|&p| Ok((p, sample.percentile(p)?)))
        .collect::<Result<Vec<_>, StatisticsError>>()?;
    let confidence_intervals = options
        .confidence_levels
        .iter()
        .map(|&level| sample.confidence_interval(level))
        .collect::<Result<Vec<_>, _>>()?;
    let probability_below = options
        .thresholds
        .iter()
        .map(|&t| (t, sample.probability_below(t)))
        .collect();

    let n_missing = result.n_valid().saturating_sub(sample.len());
    if n_missing > 0 {
        warn!(
            metric,
            missing = n_missing,
            "successful iterations did not produce the metric"
        );
    }

    Ok(SimulationSummary {
        metric: metric.to_string(),
        mean: sample.mean(),
        median: sample.median(),
        mode_estimate: sample.mode_estimate(bins),
        std: sample.std(),
        std_error: sample.std_error(),
        min: sample.min(),
        max: sample.max(),
        percentiles,
        confidence_intervals,
        var_95: sample.value_at_risk(95.0)?,
        var_99: sample.value_at_risk(99.0)?,
        cvar_95: sample.conditional_value_at_risk(95.0)?,
        cvar_99: sample.conditional_value_at_risk(99.0)?,
        skewness: sample.skewness(),
        kurtosis: sample.kurtosis(),
        excess_kurtosis: sample.excess_kurtosis(),
        probability_below,
        histogram: sample.histogram(bins),
        n_valid: sample.len(),
        n_failed: result.n_failed(),
        n_missing,
    })
}

/// One summary per output metric, in name order
pub fn summarize_all(
    result: &MonteCarloResult,
    options: &SummaryOptions,
) -> Result<Vec<SimulationSummary>, StatisticsError> {
    result
        .output_names()
        .iter()
        .map(|metric| summarize_with(result, metric, options))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IterationResult, Outputs, Parameters};

    fn result_from(values: &[f64], failures: usize) -> MonteCarloResult {
        let mut iterations: Vec<IterationResult> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                IterationResult::success(i, Parameters::new(), Outputs::from([("v".into(), v)]))
            })
            .collect();
        for k in 0..failures {
            iterations.push(IterationResult::failure(
                values.len() + k,
                Parameters::new(),
                "bad row",
            ));
        }
        MonteCarloResult {
            variables: vec![],
            iterations,
            warnings: vec![],
        }
    }

    fn one_to_hundred() -> Vec<f64> {
        (1..=100).map(f64::from).collect()
    }

    #[test]
    fn test_summary_over_uniform_grid() {
        let options = SummaryOptions::default().with_thresholds([10.5, 50.0, 1000.0]);
        let summary = summarize_with(&result_from(&one_to_hundred(), 3), "v", &options).unwrap();

        assert_eq!(summary.n_valid, 100);
        assert_eq!(summary.n_failed, 3);
        assert_eq!(summary.n_missing, 0);
        assert!(!summary.is_complete());
        assert_eq!(summary.mean, 50.5);
        assert_eq!(summary.median, 50.5);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 100.0);
        assert!(summary.skewness.abs() < 1e-9);
        // Discrete uniform: m4/m2^2 = 3(3n^2 - 7) / (5(n^2 - 1)) = 1.79976...
        assert!((summary.kurtosis - 1.799_759_975_997_6).abs() < 1e-9);
        assert!((summary.excess_kurtosis - (summary.kurtosis - 3.0)).abs() < 1e-12);

        // rank = 0.05 * 99 = 4.95 -> 5.95
        assert!((summary.var_95 - 5.95).abs() < 1e-9);
        assert_eq!(summary.percentile(5.0), Some(summary.var_95));
        // Outcomes 1..=5 sit at or below VaR(95)
        assert!((summary.cvar_95 - 3.0).abs() < 1e-12);
        assert!(summary.cvar_99 <= summary.var_99);

        let ci90 = summary.confidence_interval(90.0).unwrap();
        assert!((ci90.lower - 5.95).abs() < 1e-9);
        assert!((ci90.upper - 95.05).abs() < 1e-9);

        assert_eq!(
            summary.probability_below,
            vec![(10.5, 0.10), (50.0, 0.49), (1000.0, 1.0)]
        );
        assert_eq!(summary.histogram.len(), DEFAULT_HISTOGRAM_BINS);
        assert!((summary.failure_rate() - 3.0 / 103.0).abs() < 1e-12);
    }

    #[test]
    fn test_percentiles_are_monotone() {
        let values: Vec<f64> = (0..997).map(|i| ((i * 7919) % 997) as f64 * 0.37).collect();
        let sample = MetricSample::new(values).unwrap();
        let p10 = sample.percentile(10.0).unwrap();
        let p50 = sample.percentile(50.0).unwrap();
        let p90 = sample.percentile(90.0).unwrap();
        assert!(p10 <= p50 && p50 <= p90);
    }

    #[test]
    fn test_invalid_arguments() {
        let sample = MetricSample::new(one_to_hundred()).unwrap();
        assert_eq!(
            sample.percentile(101.0),
            Err(StatisticsError::InvalidPercentile(101.0))
        );
        assert_eq!(
            sample.value_at_risk(100.0),
            Err(StatisticsError::InvalidConfidence(100.0))
        );
        assert!(sample.confidence_interval(0.0).is_err());
    }

    #[test]
    fn test_no_valid_samples() {
        let result = result_from(&[], 5);
        assert_eq!(
            summarize(&result, "v"),
            Err(StatisticsError::NoValidSamples {
                metric: "v".to_string()
            })
        );
    }

    #[test]
    fn test_single_value_summary() {
        let summary = summarize(&result_from(&[42.0], 0), "v").unwrap();
        assert_eq!(summary.median, 42.0);
        assert_eq!(summary.var_99, 42.0);
        assert_eq!(summary.cvar_99, 42.0);
        assert_eq!(summary.mode_estimate, 42.0);
        assert_eq!(summary.std, 0.0);
    }

    #[test]
    fn test_summarize_all_covers_every_output() {
        let mut result = result_from(&[1.0, 2.0], 0);
        result.iterations[0]
            .outputs
            .as_mut()
            .unwrap()
            .insert("w".into(), 5.0);
        let summaries = summarize_all(&result, &SummaryOptions::default()).unwrap();
        let metrics: Vec<&str> = summaries.iter().map(|s| s.metric.as_str()).collect();
        assert_eq!(metrics, ["v", "w"]);
        assert_eq!(summaries[1].n_valid, 1);
        assert_eq!(summaries[1].n_missing, 1);
        assert_eq!(summaries[1].n_total(), 2);
        assert!(summaries[0].is_complete());
    }

    #[test]
    fn test_rows_without_the_metric_are_counted_missing() {
        let mut result = result_from(&one_to_hundred(), 4);
        for it in result.iterations.iter_mut().take(50) {
            it.outputs = Some(Outputs::from([("other".into(), 0.0)]));
        }

        let summary = summarize(&result, "v").unwrap();
        assert_eq!(summary.n_valid, 50);
        assert_eq!(summary.n_failed, 4);
        assert_eq!(summary.n_missing, 50);
        assert_eq!(summary.n_total(), result.len());
        assert!(!summary.is_complete());
        assert!((summary.failure_rate() - 4.0 / 104.0).abs() < 1e-12);
    }
}
