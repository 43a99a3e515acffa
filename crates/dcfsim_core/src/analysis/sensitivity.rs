//! Input-to-output rank correlations (tornado-chart data).

use serde::{Deserialize, Serialize};

use super::stats::spearman;
use crate::error::StatisticsError;
use crate::model::MonteCarloResult;

/// How strongly one input moves one output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensitivity {
    pub variable: String,
    /// Spearman rank correlation with the output metric
    pub correlation: f64,
}

/// Rank every input variable by its Spearman correlation with `metric`,
/// strongest absolute relation first.
///
/// Only successful iterations that produced `metric` take part. Ties keep
/// registry order.
pub fn sensitivity_ranking(
    result: &MonteCarloResult,
    metric: &str,
) -> Result<Vec<Sensitivity>, StatisticsError> {
    let rows: Vec<_> = result
        .successful()
        .filter_map(|it| it.output(metric).map(|y| (it, y)))
        .collect();
    if rows.is_empty() {
        return Err(StatisticsError::NoValidSamples {
            metric: metric.to_string(),
        });
    }

    let outputs: Vec<f64> = rows.iter().map(|&(_, y)| y).collect();
    let mut ranking: Vec<Sensitivity> = result
        .variables
        .iter()
        .map(|name| {
            let inputs: Vec<f64> = rows
                .iter()
                .map(|(it, _)| it.inputs.get(name).copied().unwrap_or(f64::NAN))
                .collect();
            Sensitivity {
                variable: name.clone(),
                correlation: spearman(&inputs, &outputs),
            }
        })
        .collect();

    ranking.sort_by(|a, b| b.correlation.abs().total_cmp(&a.correlation.abs()));
    Ok(ranking)
}
