//! Simulation configuration
//!
//! `SimulationConfig` bundles a validated [`VariableRegistry`] with the
//! correlation matrix derived from it. It is built once per calibration and
//! shared read-only by every run.
//!
//! # Builder DSL
//!
//! ```ignore
//! use dcfsim_core::config::RegistryBuilder;
//!
//! let config = RegistryBuilder::new()
//!     .lognormal("revenue_growth_mult", -0.02, 0.20, 1.0)
//!     .normal("ebitda_margin_mult", 1.0, 0.08, 1.0)
//!     .triangular("wacc_adj", -0.01, 0.0, 0.015, 0.0)
//!     .correlate("ebitda_margin_mult", "revenue_growth_mult", 0.4)
//!     .build()?;
//! ```

use tracing::info;

use crate::correlation::CorrelationMatrix;
use crate::error::ConfigError;
use crate::model::{Parameters, RegistryConfig, Variable, VariableRegistry};

pub mod builder;

pub use builder::RegistryBuilder;

/// Everything the sampler needs: variables in column order plus their
/// (possibly repaired) correlation matrix and its Cholesky factor
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    registry: VariableRegistry,
    correlation: CorrelationMatrix,
}

impl SimulationConfig {
    pub fn new(registry: VariableRegistry) -> Result<Self, ConfigError> {
        let correlation = CorrelationMatrix::from_registry(&registry)?;
        let repair = correlation.repair_outcome();
        info!(
            variables = registry.len(),
            repaired = repair.repaired(),
            conflicts = correlation.conflicts().len(),
            "simulation configured"
        );
        Ok(Self {
            registry,
            correlation,
        })
    }

    #[must_use]
    pub fn registry(&self) -> &VariableRegistry {
        &self.registry
    }

    #[must_use]
    pub fn correlation(&self) -> &CorrelationMatrix {
        &self.correlation
    }

    #[must_use]
    pub fn n_variables(&self) -> usize {
        self.registry.len()
    }

    /// Configuration whose every variable is pinned to its base value.
    ///
    /// Sampling it yields identical rows, so a run over it reproduces the
    /// deterministic base case.
    #[must_use]
    pub fn at_base_values(&self) -> Self {
        Self {
            registry: self.registry.at_base_values(),
            correlation: self.correlation.clone(),
        }
    }

    /// Base values as a parameter mapping
    #[must_use]
    pub fn base_parameters(&self) -> Parameters {
        self.registry
            .variables()
            .iter()
            .map(|v| (v.name.clone(), v.base_value))
            .collect()
    }

    /// Serializable form of the registry this configuration was built from
    #[must_use]
    pub fn to_registry_config(&self) -> RegistryConfig {
        RegistryConfig::from(&self.registry)
    }
}

impl TryFrom<RegistryConfig> for SimulationConfig {
    type Error = ConfigError;

    fn try_from(config: RegistryConfig) -> Result<Self, Self::Error> {
        Self::new(VariableRegistry::try_from(config)?)
    }
}

impl TryFrom<VariableRegistry> for SimulationConfig {
    type Error = ConfigError;

    fn try_from(registry: VariableRegistry) -> Result<Self, Self::Error> {
        Self::new(registry)
    }
}

/// Validate `variables` and build the correlation structure in one step
pub fn configure(variables: Vec<Variable>) -> Result<SimulationConfig, ConfigError> {
    SimulationConfig::new(VariableRegistry::new(variables)?)
}
