use std::fmt;

/// Fatal configuration-time errors. Any of these aborts a run before sampling.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidDistribution {
        kind: &'static str,
        reason: String,
    },
    /// A variable failed validation; `source` holds the underlying problem
    InvalidVariable {
        name: String,
        source: Box<ConfigError>,
    },
    EmptyRegistry,
    DuplicateVariable(String),
    UnknownVariable {
        variable: String,
        other: String,
    },
    SelfCorrelation(String),
    CoefficientOutOfRange {
        variable: String,
        other: String,
        coefficient: f64,
    },
    /// Symmetric eigen-decomposition did not converge
    EigenDecompositionFailed,
    /// Correlation repair produced a matrix that still fails validation
    RepairFailed(String),
    InvalidOption {
        name: &'static str,
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidDistribution { kind, reason } => {
                write!(f, "invalid {kind} distribution: {reason}")
            }
            ConfigError::InvalidVariable { name, source } => {
                write!(f, "variable '{name}': {source}")
            }
            ConfigError::EmptyRegistry => write!(f, "variable registry is empty"),
            ConfigError::DuplicateVariable(name) => {
                write!(f, "variable '{name}' is declared more than once")
            }
            ConfigError::UnknownVariable { variable, other } => write!(
                f,
                "variable '{variable}' declares a correlation with unknown variable '{other}'"
            ),
            ConfigError::SelfCorrelation(name) => {
                write!(f, "variable '{name}' declares a correlation with itself")
            }
            ConfigError::CoefficientOutOfRange {
                variable,
                other,
                coefficient,
            } => write!(
                f,
                "correlation {variable} <-> {other} = {coefficient} is outside [-1, 1]"
            ),
            ConfigError::EigenDecompositionFailed => {
                write!(f, "eigen-decomposition of the correlation matrix did not converge")
            }
            ConfigError::RepairFailed(reason) => {
                write!(f, "correlation matrix repair failed: {reason}")
            }
            ConfigError::InvalidOption { name, reason } => {
                write!(f, "invalid option '{name}': {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidVariable { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// An inverse-CDF argument outside the open interval (0, 1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DomainError {
    pub value: f64,
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "inverse CDF argument {} is outside the open interval (0, 1)",
            self.value
        )
    }
}

impl std::error::Error for DomainError {}

/// A single row rejected by the external valuation function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuationError {
    pub message: String,
}

impl ValuationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ValuationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValuationError {}

impl From<String> for ValuationError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for ValuationError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<DomainError> for ValuationError {
    fn from(err: DomainError) -> Self {
        Self::new(err.to_string())
    }
}

/// Errors raised while aggregating iteration outputs
#[derive(Debug, Clone, PartialEq)]
pub enum StatisticsError {
    /// No successful iteration produced the requested metric
    NoValidSamples { metric: String },
    InvalidPercentile(f64),
    InvalidConfidence(f64),
    UnknownVariable(String),
}

impl fmt::Display for StatisticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatisticsError::NoValidSamples { metric } => {
                write!(f, "no successful iterations produced metric '{metric}'")
            }
            StatisticsError::InvalidPercentile(p) => {
                write!(f, "percentile {p} is outside [0, 100]")
            }
            StatisticsError::InvalidConfidence(c) => {
                write!(f, "confidence level {c} is outside (0, 100)")
            }
            StatisticsError::UnknownVariable(name) => {
                write!(f, "variable '{name}' is not part of the run")
            }
        }
    }
}

impl std::error::Error for StatisticsError {}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_invalid_variable_chains_source() {
        let err = ConfigError::InvalidVariable {
            name: "oil_price".into(),
            source: Box::new(ConfigError::InvalidDistribution {
                kind: "normal",
                reason: "std must be positive".into(),
            }),
        };

        assert_eq!(
            err.to_string(),
            "variable 'oil_price': invalid normal distribution: std must be positive"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn test_domain_error_converts_to_valuation_error() {
        let err: ValuationError = DomainError { value: 1.0 }.into();
        assert!(err.message.contains("outside the open interval"));
    }
}
