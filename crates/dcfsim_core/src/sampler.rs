//! Latin Hypercube sampling with a Gaussian copula.
//!
//! 1. Stratify each column of an `N x M` uniform matrix into `N` equal strata,
//!    one draw per stratum, rows randomly permuted.
//! 2. Map to standard-normal space, mix the columns with the Cholesky factor of
//!    the correlation matrix, and map back to uniforms.
//! 3. Push each column through its variable's inverse CDF.
//!
//! The linear mixing in step 2 only approximately preserves the per-column
//! stratification of step 1; marginals stay exact.

use nalgebra::DMatrix;
use rand::distr::Open01;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::config::SimulationConfig;
use crate::error::{ConfigError, DomainError};
use crate::model::{Parameters, standard_normal_cdf, standard_normal_quantile};

/// `N x M` matrix of sampled values, column `j` labelled by variable `j`.
///
/// Rows whose inverse-CDF transform hit a [`DomainError`] keep `NaN` cells and
/// are reported through [`SampleTable::fault`]; the runner turns them into
/// failed iterations.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTable {
    names: Vec<String>,
    values: DMatrix<f64>,
    faults: FxHashMap<usize, DomainError>,
}

impl SampleTable {
    /// Build a table from raw values, for callers that bring their own samples.
    ///
    /// `names` must hold exactly one entry per column.
    pub fn from_values(names: Vec<String>, values: DMatrix<f64>) -> Result<Self, ConfigError> {
        if names.len() != values.ncols() {
            return Err(ConfigError::InvalidOption {
                name: "names",
                reason: format!(
                    "{} names for {} columns",
                    names.len(),
                    values.ncols()
                ),
            });
        }
        Ok(Self {
            names,
            values,
            faults: FxHashMap::default(),
        })
    }

    /// Mark `row` as hit by a domain fault
    #[cfg(test)]
    pub(crate) fn with_fault(mut self, row: usize, fault: DomainError) -> Self {
        self.faults.insert(row, fault);
        self
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.values.ncols()
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    #[must_use]
    pub fn get(&self, row: usize, column: usize) -> f64 {
        self.values[(row, column)]
    }

    #[must_use]
    pub fn row(&self, row: usize) -> Vec<f64> {
        self.values.row(row).iter().copied().collect()
    }

    #[must_use]
    pub fn column(&self, column: usize) -> Vec<f64> {
        self.values.column(column).iter().copied().collect()
    }

    #[must_use]
    pub fn column_by_name(&self, name: &str) -> Option<Vec<f64>> {
        let j = self.names.iter().position(|n| n == name)?;
        Some(self.column(j))
    }

    /// Inputs mapping for one row, as handed to the valuation function
    #[must_use]
    pub fn parameters(&self, row: usize) -> Parameters {
        self.names
            .iter()
            .enumerate()
            .map(|(j, name)| (name.clone(), self.values[(row, j)]))
            .collect()
    }

    #[must_use]
    pub fn fault(&self, row: usize) -> Option<&DomainError> {
        self.faults.get(&row)
    }

    #[must_use]
    pub fn n_faults(&self) -> usize {
        self.faults.len()
    }

    /// Pearson correlation matrix of the columns
    #[must_use]
    pub fn empirical_correlation(&self) -> DMatrix<f64> {
        let m = self.n_columns();
        let columns: Vec<Vec<f64>> = (0..m).map(|j| self.column(j)).collect();
        DMatrix::from_fn(m, m, |i, j| {
            if i == j {
                1.0
            } else {
                crate::analysis::pearson(&columns[i], &columns[j])
            }
        })
    }
}

/// `n x m` Latin Hypercube on the open unit cube.
///
/// Each column holds exactly one value in every stratum `(k/n, (k+1)/n)`,
/// in random row order.
pub fn latin_hypercube<R: Rng + ?Sized>(rng: &mut R, n: usize, m: usize) -> DMatrix<f64> {
    let mut u = DMatrix::<f64>::zeros(n, m);
    let width = 1.0 / n as f64;
    let mut strata: Vec<usize> = (0..n).collect();

    for j in 0..m {
        strata.shuffle(rng);
        for (i, &k) in strata.iter().enumerate() {
            let lower = k as f64 * width;
            let upper = (k + 1) as f64 * width;
            // Rounding can land exactly on a stratum edge; redraw
            u[(i, j)] = loop {
                let offset: f64 = rng.sample(Open01);
                let value = (k as f64 + offset) * width;
                if value > lower && value < upper {
                    break value;
                }
            };
        }
    }
    u
}

/// Impose correlation on standard-normal columns: `Z * L^T`
#[must_use]
pub fn correlate(z: &DMatrix<f64>, cholesky: &DMatrix<f64>) -> DMatrix<f64> {
    z * cholesky.transpose()
}

/// Draw a correlated Latin Hypercube sample table.
///
/// The same `seed` and configuration always reproduce the same table.
#[must_use]
pub fn sample(config: &SimulationConfig, n: usize, seed: u64) -> SampleTable {
    let mut rng = StdRng::seed_from_u64(seed);
    let variables = config.registry().variables();
    let m = variables.len();

    let uniforms = latin_hypercube(&mut rng, n, m);
    let normals = uniforms.map(standard_normal_quantile);
    let correlated = correlate(&normals, config.correlation().cholesky());

    let mut values = DMatrix::<f64>::zeros(n, m);
    let mut faults = FxHashMap::default();
    for (j, variable) in variables.iter().enumerate() {
        for i in 0..n {
            let u = standard_normal_cdf(correlated[(i, j)]);
            match variable.distribution.inverse_cdf(u) {
                Ok(x) => values[(i, j)] = x,
                Err(err) => {
                    values[(i, j)] = f64::NAN;
                    faults.entry(i).or_insert(err);
                }
            }
        }
    }

    debug!(
        rows = n,
        columns = m,
        seed,
        faults = faults.len(),
        "sample table drawn"
    );

    SampleTable {
        names: variables.iter().map(|v| v.name.clone()).collect(),
        values,
        faults,
    }
}
