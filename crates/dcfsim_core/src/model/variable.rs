//! Input variables and the validated registry that holds them.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::distribution::Distribution;
use crate::error::ConfigError;

/// A declared pairwise correlation with another variable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationSpec<S = String> {
    pub with: S,
    pub coefficient: f64,
}

/// One uncertain input of the valuation function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub distribution: Distribution,
    pub base_value: f64,
    /// Declaration order matters: later declarations of the same pair win
    #[serde(default)]
    pub correlations: Vec<CorrelationSpec>,
}

impl Variable {
    #[must_use]
    pub fn new(name: impl Into<String>, distribution: Distribution, base_value: f64) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            distribution,
            base_value,
            correlations: Vec::new(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn correlated_with(mut self, other: impl Into<String>, coefficient: f64) -> Self {
        self.correlations.push(CorrelationSpec {
            with: other.into(),
            coefficient,
        });
        self
    }
}

/// Serializable registry document: the calibration artifact loaded once per run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub variables: Vec<Variable>,
}

/// Validated, ordered set of variables with name lookup.
///
/// Column `j` of every sample table corresponds to `variables()[j]`.
#[derive(Debug, Clone)]
pub struct VariableRegistry {
    variables: Vec<Variable>,
    index: FxHashMap<String, usize>,
}

impl VariableRegistry {
    pub fn new(variables: Vec<Variable>) -> Result<Self, ConfigError> {
        if variables.is_empty() {
            return Err(ConfigError::EmptyRegistry);
        }

        let mut index = FxHashMap::default();
        for (i, variable) in variables.iter().enumerate() {
            if index.insert(variable.name.clone(), i).is_some() {
                return Err(ConfigError::DuplicateVariable(variable.name.clone()));
            }
        }

        for variable in &variables {
            if !variable.base_value.is_finite() {
                return Err(ConfigError::InvalidVariable {
                    name: variable.name.clone(),
                    source: Box::new(ConfigError::InvalidOption {
                        name: "base_value",
                        reason: format!("{} is not finite", variable.base_value),
                    }),
                });
            }

            for corr in &variable.correlations {
                if corr.with == variable.name {
                    return Err(ConfigError::SelfCorrelation(variable.name.clone()));
                }
                if !index.contains_key(&corr.with) {
                    return Err(ConfigError::UnknownVariable {
                        variable: variable.name.clone(),
                        other: corr.with.clone(),
                    });
                }
                if !corr.coefficient.is_finite() || !(-1.0..=1.0).contains(&corr.coefficient) {
                    return Err(ConfigError::CoefficientOutOfRange {
                        variable: variable.name.clone(),
                        other: corr.with.clone(),
                        coefficient: corr.coefficient,
                    });
                }
            }
        }

        Ok(Self { variables, index })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.index_of(name).map(|i| &self.variables[i])
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|v| v.name.as_str())
    }

    /// Every declared correlation as `(from, to, coefficient)` indices, in declaration order
    pub fn declared_correlations(&self) -> impl Iterator<Item = CorrelationSpec<(usize, usize)>> {
        self.variables.iter().enumerate().flat_map(move |(i, v)| {
            v.correlations.iter().map(move |c| CorrelationSpec {
                with: (i, self.index[&c.with]),
                coefficient: c.coefficient,
            })
        })
    }

    /// Copy of this registry with every distribution replaced by `Fixed(base_value)`
    #[must_use]
    pub fn at_base_values(&self) -> Self {
        let variables = self
            .variables
            .iter()
            .map(|v| Variable {
                distribution: Distribution::from_base_value(v.base_value),
                ..v.clone()
            })
            .collect();
        Self {
            variables,
            index: self.index.clone(),
        }
    }
}

impl TryFrom<RegistryConfig> for VariableRegistry {
    type Error = ConfigError;

    fn try_from(config: RegistryConfig) -> Result<Self, Self::Error> {
        Self::new(config.variables)
    }
}

impl From<&VariableRegistry> for RegistryConfig {
    fn from(registry: &VariableRegistry) -> Self {
        Self {
            variables: registry.variables.clone(),
        }
    }
}
