use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::SimulationConfig;
use crate::error::{ConfigError, ValuationError};
use crate::model::{
    ConvergenceWarning, IterationResult, MonteCarloResult, Outputs, Parameters, Progress,
};
use crate::sampler::{self, SampleTable};

/// Failure rate above which a batch is flagged as degraded
pub const DEFAULT_FAILURE_THRESHOLD: f64 = 0.01;

/// Fewer iterations than this many per variable is flagged as undersized
pub const MIN_ITERATIONS_PER_VARIABLE: usize = 10;

// Chunks handed to each worker; more than one keeps the tail balanced
const CHUNKS_PER_WORKER: usize = 4;

// Sequential runs report progress this many times over the batch
const SEQUENTIAL_PROGRESS_STEPS: usize = 100;

/// The external valuation function: named inputs to named outputs.
///
/// Implementations are called concurrently from worker threads and must not
/// rely on shared mutable state. An `Err` marks only the current row as failed.
pub trait Valuation: Sync {
    fn evaluate(&self, inputs: &Parameters) -> Result<Outputs, ValuationError>;
}

impl<F, E> Valuation for F
where
    F: Fn(&Parameters) -> Result<Outputs, E> + Sync,
    E: fmt::Display,
{
    fn evaluate(&self, inputs: &Parameters) -> Result<Outputs, ValuationError> {
        self(inputs).map_err(|err| ValuationError::new(err.to_string()))
    }
}

/// Knobs for one Monte Carlo batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    pub iterations: usize,
    pub seed: u64,
    /// Worker threads; `1` runs sequentially, `0` uses one per available core
    pub workers: usize,
    /// Failure fraction above which a [`ConvergenceWarning::FailureRate`] is raised
    pub failure_threshold: f64,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            iterations: 10_000,
            seed: 42,
            workers: 1,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
        }
    }
}

impl MonteCarloConfig {
    #[must_use]
    pub fn new(iterations: usize, seed: u64) -> Self {
        Self {
            iterations,
            seed,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn failure_threshold(mut self, threshold: f64) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.iterations == 0 {
            return Err(ConfigError::InvalidOption {
                name: "iterations",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.failure_threshold) {
            return Err(ConfigError::InvalidOption {
                name: "failure_threshold",
                reason: format!("{} is outside [0, 1]", self.failure_threshold),
            });
        }
        Ok(())
    }
}

/// Sample `mc.iterations` rows from `config` and drive them through `valuation`
pub fn monte_carlo_simulate<V: Valuation + ?Sized>(
    config: &SimulationConfig,
    valuation: &V,
    mc: &MonteCarloConfig,
) -> Result<MonteCarloResult, ConfigError> {
    monte_carlo_simulate_with_progress(config, valuation, mc, None)
}

/// Same as [`monte_carlo_simulate`], reporting `(completed, total)` to `progress`
pub fn monte_carlo_simulate_with_progress<V: Valuation + ?Sized>(
    config: &SimulationConfig,
    valuation: &V,
    mc: &MonteCarloConfig,
    progress: Option<&dyn Progress>,
) -> Result<MonteCarloResult, ConfigError> {
    mc.validate()?;
    debug!(
        iterations = mc.iterations,
        seed = mc.seed,
        workers = mc.workers,
        variables = config.n_variables(),
        "monte carlo run starting"
    );

    let table = sampler::sample(config, mc.iterations, mc.seed);
    let iterations = run(&table, valuation, mc.workers, progress)?;
    let warnings = check_convergence(&iterations, table.n_columns(), mc.failure_threshold);

    let result = MonteCarloResult {
        variables: table.names().to_vec(),
        iterations,
        warnings,
    };
    debug!(
        valid = result.n_valid(),
        failed = result.n_failed(),
        "monte carlo run finished"
    );
    Ok(result)
}

/// Convenience entry point with the default failure threshold
pub fn simulate<V: Valuation + ?Sized>(
    config: &SimulationConfig,
    valuation: &V,
    iterations: usize,
    seed: u64,
    workers: usize,
) -> Result<MonteCarloResult, ConfigError> {
    let mc = MonteCarloConfig::new(iterations, seed).workers(workers);
    monte_carlo_simulate(config, valuation, &mc)
}

/// Evaluate the valuation once at every variable's base value
pub fn base_case<V: Valuation + ?Sized>(
    config: &SimulationConfig,
    valuation: &V,
) -> Result<Outputs, ValuationError> {
    valuation.evaluate(&config.base_parameters())
}

/// Feed every row of `table` through `valuation`.
///
/// Results come back in row order whatever the execution mode. A row fails
/// when its sample carries a domain fault, the valuation returns an error or
/// panics, or any output is not finite; the batch always completes.
pub fn run<V: Valuation + ?Sized>(
    table: &SampleTable,
    valuation: &V,
    workers: usize,
    progress: Option<&dyn Progress>,
) -> Result<Vec<IterationResult>, ConfigError> {
    if workers == 1 || table.n_rows() < 2 {
        return Ok(run_sequential(table, valuation, progress));
    }

    #[cfg(feature = "parallel")]
    {
        run_parallel(table, valuation, workers, progress)
    }

    #[cfg(not(feature = "parallel"))]
    {
        debug!(workers, "parallel feature disabled, running sequentially");
        Ok(run_sequential(table, valuation, progress))
    }
}

fn run_sequential<V: Valuation + ?Sized>(
    table: &SampleTable,
    valuation: &V,
    progress: Option<&dyn Progress>,
) -> Vec<IterationResult> {
    let total = table.n_rows();
    let stride = total.div_ceil(SEQUENTIAL_PROGRESS_STEPS).max(1);

    (0..total)
        .map(|i| {
            let result = evaluate_row(table, valuation, i);
            let completed = i + 1;
            if let Some(progress) = progress
                && (completed % stride == 0 || completed == total)
            {
                progress.report(completed, total);
            }
            result
        })
        .collect()
}

#[cfg(feature = "parallel")]
fn run_parallel<V: Valuation + ?Sized>(
    table: &SampleTable,
    valuation: &V,
    workers: usize,
    progress: Option<&dyn Progress>,
) -> Result<Vec<IterationResult>, ConfigError> {
    use rayon::iter::{IntoParallelIterator, ParallelIterator};
    use std::sync::atomic::{AtomicUsize, Ordering};

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|err| ConfigError::InvalidOption {
            name: "workers",
            reason: err.to_string(),
        })?;

    let total = table.n_rows();
    let chunk_size = total
        .div_ceil(pool.current_num_threads() * CHUNKS_PER_WORKER)
        .max(1);
    let num_chunks = total.div_ceil(chunk_size);
    let completed = AtomicUsize::new(0);
    debug!(
        threads = pool.current_num_threads(),
        chunk_size, num_chunks, "dispatching chunks"
    );

    // Each chunk is evaluated in order on one worker; collecting an indexed
    // parallel iterator keeps chunk order, so flattening restores row order.
    let chunks: Vec<Vec<IterationResult>> = pool.install(|| {
        (0..num_chunks)
            .into_par_iter()
            .map(|c| {
                let start = c * chunk_size;
                let end = (start + chunk_size).min(total);
                let results: Vec<IterationResult> = (start..end)
                    .map(|i| evaluate_row(table, valuation, i))
                    .collect();

                let done = completed.fetch_add(end - start, Ordering::Relaxed) + (end - start);
                if let Some(progress) = progress {
                    progress.report(done, total);
                }
                results
            })
            .collect()
    });

    Ok(chunks.into_iter().flatten().collect())
}

fn evaluate_row<V: Valuation + ?Sized>(
    table: &SampleTable,
    valuation: &V,
    index: usize,
) -> IterationResult {
    let inputs = table.parameters(index);
    if let Some(fault) = table.fault(index) {
        return IterationResult::failure(index, inputs, fault.to_string());
    }

    match panic::catch_unwind(AssertUnwindSafe(|| valuation.evaluate(&inputs))) {
        Ok(Ok(outputs)) => {
            if let Some((name, value)) = outputs.iter().find(|(_, v)| !v.is_finite()) {
                let reason = format!("output '{name}' is not finite ({value})");
                IterationResult::failure(index, inputs, reason)
            } else {
                IterationResult::success(index, inputs, outputs)
            }
        }
        Ok(Err(err)) => IterationResult::failure(index, inputs, err.message),
        Err(payload) => {
            let reason = format!("valuation panicked: {}", panic_message(payload.as_ref()));
            IterationResult::failure(index, inputs, reason)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

/// Post-run checks that flag, but never abort, a degraded batch
#[must_use]
pub fn check_convergence(
    iterations: &[IterationResult],
    variables: usize,
    failure_threshold: f64,
) -> Vec<ConvergenceWarning> {
    let mut warnings = Vec::new();
    let total = iterations.len();

    let minimum = variables * MIN_ITERATIONS_PER_VARIABLE;
    if total < minimum {
        warnings.push(ConvergenceWarning::UndersizedSample {
            iterations: total,
            variables,
            minimum,
        });
    }

    let failed = iterations.iter().filter(|it| it.failed).count();
    if total > 0 && failed as f64 / total as f64 > failure_threshold {
        warnings.push(ConvergenceWarning::FailureRate {
            failed,
            total,
            threshold: failure_threshold,
        });
    }

    for warning in &warnings {
        warn!(%warning, "convergence warning");
    }
    warnings
}
