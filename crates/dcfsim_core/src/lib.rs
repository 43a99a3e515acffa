//! Probabilistic valuation engine
//!
//! This crate wraps a deterministic valuation function in a Monte Carlo layer
//! that quantifies output uncertainty under uncertain, correlated inputs.
//! It supports:
//! - Marginal distributions (normal, lognormal, triangular, scaled beta, fixed)
//! - Pairwise correlations assembled into a repaired, positive-semidefinite matrix
//! - Latin Hypercube sampling with a Gaussian copula
//! - Sequential or worker-pool execution with per-iteration failure isolation
//! - Percentiles, confidence intervals, VaR/CVaR, moments and sensitivity ranking
//!
//! # Builder DSL
//!
//! ```ignore
//! use dcfsim_core::config::RegistryBuilder;
//! use dcfsim_core::simulation::simulate;
//! use dcfsim_core::analysis::summarize;
//!
//! let config = RegistryBuilder::new()
//!     .lognormal("price_factor", -0.02, 0.2, 1.0)
//!     .normal("volume_factor", 1.0, 0.08, 1.0)
//!     .correlate("volume_factor", "price_factor", 0.4)
//!     .build()?;
//!
//! let result = simulate(&config, &valuation, 20_000, 42, 4)?;
//! let summary = summarize(&result, "value")?;
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod analysis;
pub mod correlation;
pub mod error;
pub mod sampler;
pub mod simulation;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod config;
pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use analysis::{SimulationSummary, SummaryOptions, summarize, summarize_with};
pub use config::{RegistryBuilder, SimulationConfig, configure};
pub use error::{ConfigError, DomainError, StatisticsError, ValuationError};
pub use model::{
    ConvergenceWarning, Distribution, IterationResult, MonteCarloResult, Outputs, Parameters,
    RegistryConfig, Variable, VariableRegistry,
};
pub use simulation::{MonteCarloConfig, Valuation, base_case, monte_carlo_simulate, simulate};
