//! Simulation results
//!
//! Contains the per-iteration records produced by the runner, the batch-level
//! container handed to the aggregator, and the flat table used for export.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Sampled inputs for one iteration, keyed by variable name
pub type Parameters = BTreeMap<String, f64>;

/// Valuation outputs for one iteration, keyed by metric name
pub type Outputs = BTreeMap<String, f64>;

/// Outcome of feeding one sample row through the valuation function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationResult {
    pub index: usize,
    pub inputs: Parameters,
    pub outputs: Option<Outputs>,
    pub failed: bool,
    pub failure_reason: Option<String>,
}

impl IterationResult {
    #[must_use]
    pub fn success(index: usize, inputs: Parameters, outputs: Outputs) -> Self {
        Self {
            index,
            inputs,
            outputs: Some(outputs),
            failed: false,
            failure_reason: None,
        }
    }

    #[must_use]
    pub fn failure(index: usize, inputs: Parameters, reason: impl Into<String>) -> Self {
        Self {
            index,
            inputs,
            outputs: None,
            failed: true,
            failure_reason: Some(reason.into()),
        }
    }

    /// Value of `metric`, if this iteration succeeded and produced it
    #[must_use]
    pub fn output(&self, metric: &str) -> Option<f64> {
        self.outputs.as_ref()?.get(metric).copied()
    }
}

/// Non-fatal signal that a batch's statistics should be treated as degraded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConvergenceWarning {
    /// More iterations failed than the configured threshold allows
    FailureRate {
        failed: usize,
        total: usize,
        threshold: f64,
    },
    /// Too few iterations per variable for meaningful stratification
    UndersizedSample {
        iterations: usize,
        variables: usize,
        minimum: usize,
    },
}

impl fmt::Display for ConvergenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvergenceWarning::FailureRate {
                failed,
                total,
                threshold,
            } => {
                let rate = if *total == 0 {
                    0.0
                } else {
                    *failed as f64 / *total as f64
                };
                write!(
                    f,
                    "{failed} of {total} iterations failed ({:.2}%), above the {:.2}% threshold",
                    rate * 100.0,
                    threshold * 100.0
                )
            }
            ConvergenceWarning::UndersizedSample {
                iterations,
                variables,
                minimum,
            } => write!(
                f,
                "{iterations} iterations for {variables} variables is below the recommended minimum of {minimum}"
            ),
        }
    }
}

/// Results from a Monte Carlo batch, in input-row order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    /// Input variable names in column order
    pub variables: Vec<String>,
    pub iterations: Vec<IterationResult>,
    pub warnings: Vec<ConvergenceWarning>,
}

impl MonteCarloResult {
    #[must_use]
    pub fn len(&self) -> usize {
        self.iterations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iterations.is_empty()
    }

    #[must_use]
    pub fn n_failed(&self) -> usize {
        self.iterations.iter().filter(|it| it.failed).count()
    }

    #[must_use]
    pub fn n_valid(&self) -> usize {
        self.len() - self.n_failed()
    }

    #[must_use]
    pub fn failure_rate(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.n_failed() as f64 / self.len() as f64
        }
    }

    /// True when any convergence warning was raised for this batch
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn successful(&self) -> impl Iterator<Item = &IterationResult> {
        self.iterations.iter().filter(|it| !it.failed)
    }

    /// Values of `metric` over successful iterations, in row order
    #[must_use]
    pub fn metric_values(&self, metric: &str) -> Vec<f64> {
        self.successful().filter_map(|it| it.output(metric)).collect()
    }

    /// Union of output metric names across successful iterations
    #[must_use]
    pub fn output_names(&self) -> BTreeSet<String> {
        self.successful()
            .filter_map(|it| it.outputs.as_ref())
            .flat_map(|outputs| outputs.keys().cloned())
            .collect()
    }

    /// Flatten into one row per iteration: inputs, then outputs, then failure info
    #[must_use]
    pub fn to_table(&self) -> ResultTable {
        let outputs: Vec<String> = self.output_names().into_iter().collect();
        let mut columns = self.variables.clone();
        columns.extend(outputs.iter().cloned());

        let rows = self
            .iterations
            .iter()
            .map(|it| {
                let mut values: Vec<Option<f64>> = self
                    .variables
                    .iter()
                    .map(|name| it.inputs.get(name).copied())
                    .collect();
                values.extend(outputs.iter().map(|name| it.output(name)));
                ResultRow {
                    index: it.index,
                    values,
                    failed: it.failed,
                    failure_reason: it.failure_reason.clone(),
                }
            })
            .collect();

        ResultTable {
            input_columns: self.variables.len(),
            columns,
            rows,
        }
    }
}

/// Tabular view of a batch for export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    pub columns: Vec<String>,
    /// Number of leading columns that are inputs
    pub input_columns: usize,
    pub rows: Vec<ResultRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub index: usize,
    /// Aligned with `ResultTable::columns`; `None` where a failed row has no output
    pub values: Vec<Option<f64>>,
    pub failed: bool,
    pub failure_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(x: f64) -> Parameters {
        Parameters::from([("x".to_string(), x)])
    }

    fn sample_result() -> MonteCarloResult {
        MonteCarloResult {
            variables: vec!["x".into()],
            iterations: vec![
                IterationResult::success(0, inputs(1.0), Outputs::from([("v".into(), 10.0)])),
                IterationResult::failure(1, inputs(-1.0), "negative price"),
                IterationResult::success(2, inputs(2.0), Outputs::from([("v".into(), 20.0)])),
            ],
            warnings: vec![],
        }
    }

    #[test]
    fn test_counts_and_metric_values() {
        let result = sample_result();
        assert_eq!(result.n_failed(), 1);
        assert_eq!(result.n_valid(), 2);
        assert!((result.failure_rate() - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(result.metric_values("v"), vec![10.0, 20.0]);
        assert!(result.metric_values("missing").is_empty());
    }

    #[test]
    fn test_to_table_layout() {
        let table = sample_result().to_table();

        assert_eq!(table.columns, vec!["x".to_string(), "v".to_string()]);
        assert_eq!(table.input_columns, 1);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[1].values, vec![Some(-1.0), None]);
        assert!(table.rows[1].failed);
        assert_eq!(table.rows[1].failure_reason.as_deref(), Some("negative price"));
        assert_eq!(table.rows[2].values, vec![Some(2.0), Some(20.0)]);
    }

    #[test]
    fn test_warning_messages() {
        let warning = ConvergenceWarning::FailureRate {
            failed: 5,
            total: 100,
            threshold: 0.01,
        };
        assert_eq!(
            warning.to_string(),
            "5 of 100 iterations failed (5.00%), above the 1.00% threshold"
        );
    }
}
