//! Registry Builder
//!
//! Fluent construction of a [`SimulationConfig`]. Distribution parameter
//! errors are deferred to [`RegistryBuilder::build`] so calls can be chained.

use super::SimulationConfig;
use crate::error::ConfigError;
use crate::model::{CorrelationSpec, Distribution, Variable, VariableRegistry};

/// Builder for a registry plus its correlation structure
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    variables: Vec<Variable>,
    // First deferred construction error, reported by `build`
    error: Option<ConfigError>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Variables
    // =========================================================================

    /// Add a fully specified variable
    #[must_use]
    pub fn variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    #[must_use]
    pub fn normal(self, name: &str, mean: f64, std: f64, base_value: f64) -> Self {
        let dist = Distribution::normal(mean, std);
        self.push(name, dist, base_value)
    }

    /// Lognormal with log-space parameters
    #[must_use]
    pub fn lognormal(self, name: &str, mean: f64, std: f64, base_value: f64) -> Self {
        let dist = Distribution::lognormal(mean, std);
        self.push(name, dist, base_value)
    }

    #[must_use]
    pub fn triangular(self, name: &str, min: f64, mode: f64, max: f64, base_value: f64) -> Self {
        let dist = Distribution::triangular(min, mode, max);
        self.push(name, dist, base_value)
    }

    /// Beta rescaled to `[low, high]`
    #[must_use]
    pub fn beta(
        self,
        name: &str,
        alpha: f64,
        beta: f64,
        low: f64,
        high: f64,
        base_value: f64,
    ) -> Self {
        let dist = Distribution::scaled_beta(alpha, beta, low, high);
        self.push(name, dist, base_value)
    }

    #[must_use]
    pub fn fixed(self, name: &str, value: f64) -> Self {
        let dist = Distribution::fixed(value);
        self.push(name, dist, value)
    }

    // =========================================================================
    // Correlations
    // =========================================================================

    /// Declare a correlation on the already-added variable `name`
    #[must_use]
    pub fn correlate(mut self, name: &str, other: &str, coefficient: f64) -> Self {
        match self.variables.iter_mut().find(|v| v.name == name) {
            Some(variable) => variable.correlations.push(CorrelationSpec {
                with: other.to_string(),
                coefficient,
            }),
            None => self.defer(ConfigError::UnknownVariable {
                variable: name.to_string(),
                other: other.to_string(),
            }),
        }
        self
    }

    // =========================================================================
    // Build
    // =========================================================================

    pub fn build_registry(self) -> Result<VariableRegistry, ConfigError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        VariableRegistry::new(self.variables)
    }

    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        SimulationConfig::new(self.build_registry()?)
    }

    fn push(
        mut self,
        name: &str,
        distribution: Result<Distribution, ConfigError>,
        base_value: f64,
    ) -> Self {
        match distribution {
            Ok(distribution) => self
                .variables
                .push(Variable::new(name, distribution, base_value)),
            Err(err) => self.defer(ConfigError::InvalidVariable {
                name: name.to_string(),
                source: Box::new(err),
            }),
        }
        self
    }

    fn defer(&mut self, err: ConfigError) {
        self.error.get_or_insert(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chains_variables_and_correlations() {
        let config = RegistryBuilder::new()
            .lognormal("growth", -0.02, 0.20, 1.0)
            .normal("margin", 1.0, 0.08, 1.0)
            .triangular("wacc_adj", -0.01, 0.0, 0.015, 0.0)
            .beta("retention", 8.0, 3.0, 0.4, 1.0, 0.75)
            .fixed("tax_rate", 0.25)
            .correlate("margin", "growth", 0.4)
            .build()
            .unwrap();

        assert_eq!(config.n_variables(), 5);
        let names: Vec<&str> = config.registry().names().collect();
        assert_eq!(names, ["growth", "margin", "wacc_adj", "retention", "tax_rate"]);
        assert_eq!(config.correlation().get("growth", "margin"), Some(0.4));
    }

    #[test]
    fn test_builder_reports_first_bad_distribution() {
        let err = RegistryBuilder::new()
            .normal("ok", 0.0, 1.0, 0.0)
            .triangular("bad", 2.0, 1.0, 0.0, 1.0)
            .normal("worse", 0.0, -1.0, 0.0)
            .build()
            .unwrap_err();

        match err {
            ConfigError::InvalidVariable { name, .. } => assert_eq!(name, "bad"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_correlate_before_declaring_variable_fails() {
        let err = RegistryBuilder::new()
            .correlate("missing", "other", 0.5)
            .normal("other", 0.0, 1.0, 0.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownVariable { .. }));
    }
}
