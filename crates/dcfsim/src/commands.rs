//! Subcommand implementations. Each returns the text to print.

use std::collections::BTreeMap;

use color_eyre::eyre::{Result, WrapErr, bail};
use dcfsim_core::analysis::{SummaryOptions, sensitivity_ranking, summarize_with};
use dcfsim_core::config::SimulationConfig;
use dcfsim_core::simulation::{MonteCarloConfig, base_case, monte_carlo_simulate_with_progress};
use tracing::{debug, info};

use crate::cli::{CheckArgs, Cli, Command, RunArgs};
use crate::dcf::{DcfModel, OUTPUT_METRICS, SHARE_PRICE};
use crate::export::{RunExport, export_json};
use crate::report::{
    TOP_DRIVERS, render_base_case, render_sensitivity, render_summary, render_warnings,
};
use crate::storage::load_registry;

/// Dispatch a parsed command line
pub fn execute(cli: &Cli) -> Result<String> {
    match &cli.command {
        Command::Run(args) => run(args),
        Command::Check(args) => check(args),
    }
}

fn load_config(path: &std::path::Path) -> Result<SimulationConfig> {
    let registry = load_registry(path)
        .wrap_err_with(|| format!("Failed to load registry {}", path.display()))?;
    SimulationConfig::try_from(registry)
        .wrap_err_with(|| format!("Invalid registry {}", path.display()))
}

fn correlation_note(config: &SimulationConfig) -> String {
    let outcome = config.correlation().repair_outcome();
    match outcome.shift {
        Some(shift) => format!(
            "correlation matrix {n}x{n} repaired (min eigenvalue {:.4}, diagonal shift {:.4})",
            outcome.min_eigenvalue,
            shift,
            n = config.correlation().dim()
        ),
        None => format!(
            "correlation matrix {n}x{n} is positive semidefinite (min eigenvalue {:.4})",
            outcome.min_eigenvalue,
            n = config.correlation().dim()
        ),
    }
}

/// Requested metrics, checked against what the model produces.
///
/// No request means `share_price`; `all` expands to every output metric.
fn resolve_metrics(requested: &[String]) -> Result<Vec<String>> {
    if requested.is_empty() {
        return Ok(vec![SHARE_PRICE.to_string()]);
    }
    if requested.iter().any(|m| m == "all") {
        return Ok(OUTPUT_METRICS.iter().map(|m| m.to_string()).collect());
    }
    for metric in requested {
        if !OUTPUT_METRICS.contains(&metric.as_str()) {
            bail!(
                "unknown metric '{metric}' (expected one of: {}, or all)",
                OUTPUT_METRICS.join(", ")
            );
        }
    }
    Ok(requested.to_vec())
}

/// Sample, value and summarize a registry against the demo DCF model
pub fn run(args: &RunArgs) -> Result<String> {
    let metrics = resolve_metrics(&args.metrics)?;
    let config = load_config(&args.registry)?;
    let model = DcfModel::default();
    let mc = MonteCarloConfig::new(args.iterations, args.seed)
        .workers(args.workers)
        .failure_threshold(args.failure_threshold);

    let progress = |completed: usize, total: usize| {
        debug!(completed, total, "simulation progress");
    };
    let result = monte_carlo_simulate_with_progress(&config, &model, &mc, Some(&progress))
        .wrap_err("Simulation could not start")?;
    info!(
        valid = result.n_valid(),
        failed = result.n_failed(),
        "simulation finished"
    );

    let options = SummaryOptions::default().with_thresholds(args.thresholds.iter().copied());

    let mut sections = vec![
        format!(
            "dcfsim: {} iterations, seed {}, {} variables",
            args.iterations,
            args.seed,
            config.n_variables()
        ),
        correlation_note(&config),
    ];

    if args.base_case {
        let outputs = base_case(&config, &model).wrap_err("Base case valuation failed")?;
        sections.push(render_base_case(&outputs));
    }

    let mut summaries = Vec::with_capacity(metrics.len());
    let mut sensitivity = BTreeMap::new();
    for metric in &metrics {
        let summary = summarize_with(&result, metric, &options)
            .wrap_err_with(|| format!("Failed to summarize {metric}"))?;
        let ranking = sensitivity_ranking(&result, metric)?;

        sections.push(render_summary(&summary));
        sections.push(render_sensitivity(metric, &ranking, TOP_DRIVERS));
        summaries.push(summary);
        sensitivity.insert(metric.clone(), ranking);
    }

    let warnings = render_warnings(&result.warnings);
    if !warnings.is_empty() {
        sections.push(warnings);
    }

    if let Some(path) = &args.export_json {
        let export = RunExport::new(&mc, &result, summaries, sensitivity);
        export_json(path, &export).wrap_err("Failed to export run")?;
        sections.push(format!("exported {}", path.display()));
    }

    Ok(sections.join("\n\n"))
}

/// Configure a registry without sampling and describe the result
pub fn check(args: &CheckArgs) -> Result<String> {
    let config = load_config(&args.registry)?;

    let mut lines = vec![
        format!(
            "{}: {} variables",
            args.registry.display(),
            config.n_variables()
        ),
        correlation_note(&config),
    ];
    for conflict in config.correlation().conflicts() {
        lines.push(format!(
            "conflicting declarations for {} <-> {}: {} replaced by {}",
            conflict.first, conflict.second, conflict.previous, conflict.coefficient
        ));
    }

    let outputs = base_case(&config, &DcfModel::default())
        .wrap_err("Base case valuation failed")?;
    lines.push(render_base_case(&outputs));

    Ok(lines.join("\n"))
}
