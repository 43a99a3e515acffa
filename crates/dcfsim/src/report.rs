//! Plain-text rendering of run results

use dcfsim_core::analysis::{Sensitivity, SimulationSummary};
use dcfsim_core::model::{ConvergenceWarning, Outputs};

use crate::util::format::{format_number, format_percentage};

/// Width of the label column
const LABEL_WIDTH: usize = 14;

/// Number of drivers shown in the sensitivity table
pub const TOP_DRIVERS: usize = 5;

fn row(label: &str, value: impl AsRef<str>) -> String {
    format!("  {:<width$}{}", label, value.as_ref(), width = LABEL_WIDTH)
}

fn num(value: f64) -> String {
    format_number(value, 2)
}

fn percentile_label(p: f64) -> String {
    if p.fract() == 0.0 {
        format!("P{p:.0}")
    } else {
        format!("P{p}")
    }
}

/// Render one metric's summary as an indented block
pub fn render_summary(summary: &SimulationSummary) -> String {
    let mut header = format!(
        "{} (valid {}, failed {}, failure rate {})",
        summary.metric,
        summary.n_valid,
        summary.n_failed,
        format_percentage(summary.failure_rate())
    );
    if summary.n_missing > 0 {
        header.push_str(&format!(
            "; {} of {} iterations did not produce this metric",
            summary.n_missing,
            summary.n_total()
        ));
    }
    let mut lines = vec![header];

    lines.push(row("mean", num(summary.mean)));
    lines.push(row("median", num(summary.median)));
    lines.push(row("mode", num(summary.mode_estimate)));
    lines.push(row(
        "std",
        format!("{} (std error {})", num(summary.std), format_number(summary.std_error, 4)),
    ));
    lines.push(row(
        "range",
        format!("[{}, {}]", num(summary.min), num(summary.max)),
    ));

    if !summary.percentiles.is_empty() {
        let cells: Vec<String> = summary
            .percentiles
            .iter()
            .map(|&(p, v)| format!("{}={}", percentile_label(p), num(v)))
            .collect();
        lines.push(row("percentiles", cells.join("  ")));
    }

    for ci in &summary.confidence_intervals {
        lines.push(row(
            &format!("{}% CI", ci.level),
            format!(
                "[{}, {}] width {}",
                num(ci.lower),
                num(ci.upper),
                num(ci.width())
            ),
        ));
    }

    lines.push(row(
        "VaR 95/99",
        format!("{} / {}", num(summary.var_95), num(summary.var_99)),
    ));
    lines.push(row(
        "CVaR 95/99",
        format!("{} / {}", num(summary.cvar_95), num(summary.cvar_99)),
    ));
    lines.push(row(
        "skew/kurt",
        format!(
            "{} / {} (excess {})",
            format_number(summary.skewness, 3),
            format_number(summary.kurtosis, 3),
            format_number(summary.excess_kurtosis, 3)
        ),
    ));

    for &(threshold, probability) in &summary.probability_below {
        lines.push(row(
            &format!("P(< {})", num(threshold)),
            format_percentage(probability),
        ));
    }

    lines.join("\n")
}

/// Render the strongest `top` input drivers of `metric`
pub fn render_sensitivity(metric: &str, ranking: &[Sensitivity], top: usize) -> String {
    let mut lines = vec![format!("Top drivers of {metric} (Spearman rank correlation)")];
    let name_width = ranking
        .iter()
        .take(top)
        .map(|s| s.variable.len())
        .max()
        .unwrap_or(0);

    for s in ranking.iter().take(top) {
        lines.push(format!(
            "  {:<width$}  {:>+.3}",
            s.variable,
            s.correlation,
            width = name_width
        ));
    }
    lines.join("\n")
}

/// Render convergence warnings; empty when there are none
pub fn render_warnings(warnings: &[ConvergenceWarning]) -> String {
    warnings
        .iter()
        .map(|w| format!("warning: {w}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the deterministic base-case outputs
pub fn render_base_case(outputs: &Outputs) -> String {
    let mut lines = vec!["Base case".to_string()];
    lines.extend(outputs.iter().map(|(name, value)| row(name, num(*value))));
    lines.join("\n")
}
