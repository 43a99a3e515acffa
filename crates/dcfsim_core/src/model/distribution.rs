//! Marginal probability laws for input variables.
//!
//! A [`Distribution`] can only be obtained through validated constructors (or by
//! deserializing a [`DistributionSpec`], which runs the same validation), so every
//! value in circulation has legal parameters. Sampling code never re-checks them.

use std::f64::consts::SQRT_2;

use rand::Rng;
use rand_distr::Distribution as _;
use serde::{Deserialize, Serialize};
use statrs::function::beta::inv_beta_reg;
use statrs::function::erf::{erfc, erfc_inv};

use crate::error::{ConfigError, DomainError};

fn default_high() -> f64 {
    1.0
}

/// Raw, unvalidated distribution parameters as they appear in a registry file.
///
/// Lognormal parameters are in log-space: `X = exp(mean + std * Z)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DistributionSpec {
    Normal {
        mean: f64,
        std: f64,
    },
    LogNormal {
        mean: f64,
        std: f64,
    },
    Triangular {
        min: f64,
        mode: f64,
        max: f64,
    },
    /// Beta(alpha, beta) rescaled from [0, 1] onto [low, high]
    Beta {
        alpha: f64,
        beta: f64,
        #[serde(default)]
        low: f64,
        #[serde(default = "default_high")]
        high: f64,
    },
    /// Degenerate law that always yields `value`
    Fixed {
        value: f64,
    },
}

impl DistributionSpec {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            DistributionSpec::Normal { .. } => "normal",
            DistributionSpec::LogNormal { .. } => "lognormal",
            DistributionSpec::Triangular { .. } => "triangular",
            DistributionSpec::Beta { .. } => "beta",
            DistributionSpec::Fixed { .. } => "fixed",
        }
    }

    fn params(&self) -> Vec<f64> {
        match *self {
            DistributionSpec::Normal { mean, std } | DistributionSpec::LogNormal { mean, std } => {
                vec![mean, std]
            }
            DistributionSpec::Triangular { min, mode, max } => vec![min, mode, max],
            DistributionSpec::Beta {
                alpha,
                beta,
                low,
                high,
            } => vec![alpha, beta, low, high],
            DistributionSpec::Fixed { value } => vec![value],
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let kind = self.kind();
        let invalid = |reason: &str| ConfigError::InvalidDistribution {
            kind,
            reason: reason.to_string(),
        };

        if self.params().iter().any(|p| !p.is_finite()) {
            return Err(invalid("parameters must be finite"));
        }

        match *self {
            DistributionSpec::Normal { std, .. } | DistributionSpec::LogNormal { std, .. } => {
                if std <= 0.0 {
                    return Err(invalid("std must be positive"));
                }
            }
            DistributionSpec::Triangular { min, mode, max } => {
                if !(min <= mode && mode <= max) {
                    return Err(invalid("requires min <= mode <= max"));
                }
            }
            DistributionSpec::Beta {
                alpha,
                beta,
                low,
                high,
            } => {
                if alpha <= 0.0 || beta <= 0.0 {
                    return Err(invalid("alpha and beta must be positive"));
                }
                if low >= high {
                    return Err(invalid("requires low < high"));
                }
            }
            DistributionSpec::Fixed { .. } => {}
        }
        Ok(())
    }
}

/// A validated marginal distribution. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DistributionSpec", into = "DistributionSpec")]
pub struct Distribution(DistributionSpec);

impl TryFrom<DistributionSpec> for Distribution {
    type Error = ConfigError;

    fn try_from(spec: DistributionSpec) -> Result<Self, Self::Error> {
        spec.validate()?;
        Ok(Self(spec))
    }
}

impl From<Distribution> for DistributionSpec {
    fn from(dist: Distribution) -> Self {
        dist.0
    }
}

impl Distribution {
    pub fn normal(mean: f64, std: f64) -> Result<Self, ConfigError> {
        DistributionSpec::Normal { mean, std }.try_into()
    }

    /// Lognormal with log-space parameters `mean` and `std`
    pub fn lognormal(mean: f64, std: f64) -> Result<Self, ConfigError> {
        DistributionSpec::LogNormal { mean, std }.try_into()
    }

    /// Lognormal multiplier with `E[X] = 1`, i.e. log-space mean `-std^2 / 2`
    pub fn lognormal_unit_mean(std: f64) -> Result<Self, ConfigError> {
        Self::lognormal(-0.5 * std * std, std)
    }

    pub fn triangular(min: f64, mode: f64, max: f64) -> Result<Self, ConfigError> {
        DistributionSpec::Triangular { min, mode, max }.try_into()
    }

    pub fn beta(alpha: f64, beta: f64) -> Result<Self, ConfigError> {
        Self::scaled_beta(alpha, beta, 0.0, 1.0)
    }

    pub fn scaled_beta(alpha: f64, beta: f64, low: f64, high: f64) -> Result<Self, ConfigError> {
        DistributionSpec::Beta {
            alpha,
            beta,
            low,
            high,
        }
        .try_into()
    }

    pub fn fixed(value: f64) -> Result<Self, ConfigError> {
        DistributionSpec::Fixed { value }.try_into()
    }

    /// Base values are validated finite by the registry
    pub(crate) fn from_base_value(value: f64) -> Self {
        Self(DistributionSpec::Fixed { value })
    }

    #[must_use]
    pub fn spec(&self) -> &DistributionSpec {
        &self.0
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.0.kind()
    }

    /// Quantile function. Monotonic non-decreasing in `u`.
    pub fn inverse_cdf(&self, u: f64) -> Result<f64, DomainError> {
        if !(u > 0.0 && u < 1.0) {
            return Err(DomainError { value: u });
        }

        let x = match self.0 {
            DistributionSpec::Normal { mean, std } => mean + std * standard_normal_quantile(u),
            DistributionSpec::LogNormal { mean, std } => {
                (mean + std * standard_normal_quantile(u)).exp()
            }
            DistributionSpec::Triangular { min, mode, max } => {
                triangular_quantile(min, mode, max, u)
            }
            DistributionSpec::Beta {
                alpha,
                beta,
                low,
                high,
            } => low + (high - low) * inv_beta_reg(alpha, beta, u),
            DistributionSpec::Fixed { value } => value,
        };
        Ok(x)
    }

    #[must_use]
    pub fn mean(&self) -> f64 {
        match self.0 {
            DistributionSpec::Normal { mean, .. } => mean,
            DistributionSpec::LogNormal { mean, std } => (mean + 0.5 * std * std).exp(),
            DistributionSpec::Triangular { min, mode, max } => (min + mode + max) / 3.0,
            DistributionSpec::Beta {
                alpha,
                beta,
                low,
                high,
            } => low + (high - low) * alpha / (alpha + beta),
            DistributionSpec::Fixed { value } => value,
        }
    }

    #[must_use]
    pub fn variance(&self) -> f64 {
        match self.0 {
            DistributionSpec::Normal { std, .. } => std * std,
            DistributionSpec::LogNormal { mean, std } => {
                let s2 = std * std;
                (s2.exp() - 1.0) * (2.0 * mean + s2).exp()
            }
            DistributionSpec::Triangular { min, mode, max } => {
                (min * min + mode * mode + max * max - min * mode - min * max - mode * max) / 18.0
            }
            DistributionSpec::Beta {
                alpha,
                beta,
                low,
                high,
            } => {
                let sum = alpha + beta;
                let width = high - low;
                width * width * alpha * beta / (sum * sum * (sum + 1.0))
            }
            DistributionSpec::Fixed { .. } => 0.0,
        }
    }

    #[must_use]
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Closed support bounds; unbounded sides are infinite
    #[must_use]
    pub fn support(&self) -> (f64, f64) {
        match self.0 {
            DistributionSpec::Normal { .. } => (f64::NEG_INFINITY, f64::INFINITY),
            DistributionSpec::LogNormal { .. } => (0.0, f64::INFINITY),
            DistributionSpec::Triangular { min, max, .. } => (min, max),
            DistributionSpec::Beta { low, high, .. } => (low, high),
            DistributionSpec::Fixed { value } => (value, value),
        }
    }

    /// Draw `n` independent values (no stratification, no correlation).
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Result<Vec<f64>, ConfigError> {
        let kind = self.kind();
        let invalid = |e: &dyn std::fmt::Display| ConfigError::InvalidDistribution {
            kind,
            reason: e.to_string(),
        };

        match self.0 {
            DistributionSpec::Normal { mean, std } => rand_distr::Normal::new(mean, std)
                .map(|d| (0..n).map(|_| d.sample(rng)).collect())
                .map_err(|e| invalid(&e)),
            DistributionSpec::LogNormal { mean, std } => rand_distr::LogNormal::new(mean, std)
                .map(|d| (0..n).map(|_| d.sample(rng)).collect())
                .map_err(|e| invalid(&e)),
            DistributionSpec::Triangular { min, max, .. } if min == max => Ok(vec![min; n]),
            DistributionSpec::Triangular { min, mode, max } => {
                rand_distr::Triangular::new(min, max, mode)
                    .map(|d| (0..n).map(|_| d.sample(rng)).collect())
                    .map_err(|e| invalid(&e))
            }
            DistributionSpec::Beta {
                alpha,
                beta,
                low,
                high,
            } => rand_distr::Beta::new(alpha, beta)
                .map(|d| {
                    (0..n)
                        .map(|_| low + (high - low) * d.sample(rng))
                        .collect()
                })
                .map_err(|e| invalid(&e)),
            DistributionSpec::Fixed { value } => Ok(vec![value; n]),
        }
    }
}

/// Standard normal quantile, `Phi^-1(u)`
#[must_use]
#[inline]
pub fn standard_normal_quantile(u: f64) -> f64 {
    -SQRT_2 * erfc_inv(2.0 * u)
}

/// Standard normal CDF, `Phi(z)`
#[must_use]
#[inline]
pub fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / SQRT_2)
}

fn triangular_quantile(min: f64, mode: f64, max: f64, u: f64) -> f64 {
    let width = max - min;
    if width == 0.0 {
        return min;
    }
    let split = (mode - min) / width;
    if u < split {
        min + (u * width * (mode - min)).sqrt()
    } else {
        max - ((1.0 - u) * width * (max - mode)).sqrt()
    }
}
