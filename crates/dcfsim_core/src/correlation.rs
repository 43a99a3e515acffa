//! Correlation matrix assembly and positive-semidefinite repair.
//!
//! The registry's pairwise declarations are written symmetrically into an
//! identity matrix. If the result has a negative eigenvalue, the diagonal is
//! shifted by `|lambda_min| + REPAIR_EPSILON` and the matrix is rescaled back to
//! unit diagonal, which makes every eigenvalue strictly positive.

use nalgebra::{Cholesky, DMatrix, SymmetricEigen};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ConfigError;
use crate::model::VariableRegistry;

/// Diagonal shift added on top of `|lambda_min|` during repair
pub const REPAIR_EPSILON: f64 = 0.01;

const EIGEN_MAX_ITERATIONS: usize = 10_000;
const SYMMETRY_TOLERANCE: f64 = 1e-9;
const PSD_TOLERANCE: f64 = 1e-9;
const CHOLESKY_TOLERANCE: f64 = 1e-12;

/// A pair declared more than once with different coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationConflict {
    pub first: String,
    pub second: String,
    pub previous: f64,
    /// The later declaration, which is the one kept
    pub coefficient: f64,
}

/// What repair did to the assembled matrix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RepairOutcome {
    /// Minimum eigenvalue before repair
    pub min_eigenvalue: f64,
    /// Diagonal shift applied, if the matrix needed repair
    pub shift: Option<f64>,
}

impl RepairOutcome {
    #[must_use]
    pub fn repaired(&self) -> bool {
        self.shift.is_some()
    }
}

/// Repaired correlation matrix indexed by variable name, with its Cholesky factor
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    names: Vec<String>,
    matrix: DMatrix<f64>,
    cholesky: DMatrix<f64>,
    repair: RepairOutcome,
    conflicts: Vec<CorrelationConflict>,
}

impl CorrelationMatrix {
    pub fn from_registry(registry: &VariableRegistry) -> Result<Self, ConfigError> {
        let (assembled, conflicts) = assemble(registry);
        let (matrix, repair) = repair(assembled)?;
        let cholesky = cholesky_lower(&matrix)?;

        debug!(
            variables = registry.len(),
            repaired = repair.repaired(),
            conflicts = conflicts.len(),
            "correlation matrix built"
        );

        Ok(Self {
            names: registry.names().map(str::to_string).collect(),
            matrix,
            cholesky,
            repair,
            conflicts,
        })
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Lower-triangular `L` with `L * L^T = matrix`
    #[must_use]
    pub fn cholesky(&self) -> &DMatrix<f64> {
        &self.cholesky
    }

    #[must_use]
    pub fn repair_outcome(&self) -> RepairOutcome {
        self.repair
    }

    #[must_use]
    pub fn conflicts(&self) -> &[CorrelationConflict] {
        &self.conflicts
    }

    /// Coefficient between two variables by name
    #[must_use]
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == a)?;
        let j = self.names.iter().position(|n| n == b)?;
        Some(self.matrix[(i, j)])
    }
}

/// Write every declared coefficient symmetrically into an identity matrix.
///
/// Declarations are applied in registry order (variable order, then each
/// variable's list order); a later declaration of the same pair overwrites an
/// earlier one and is reported as a conflict when the values differ.
#[must_use]
pub fn assemble(registry: &VariableRegistry) -> (DMatrix<f64>, Vec<CorrelationConflict>) {
    let n = registry.len();
    let mut matrix = DMatrix::<f64>::identity(n, n);
    let mut declared: FxHashMap<(usize, usize), f64> = FxHashMap::default();
    let mut conflicts = Vec::new();

    for decl in registry.declared_correlations() {
        let (i, j) = decl.with;
        let key = (i.min(j), i.max(j));

        if let Some(previous) = declared.insert(key, decl.coefficient)
            && previous != decl.coefficient
        {
            let first = registry.variables()[key.0].name.clone();
            let second = registry.variables()[key.1].name.clone();
            warn!(
                %first,
                %second,
                previous,
                coefficient = decl.coefficient,
                "conflicting correlation declarations, keeping the later one"
            );
            conflicts.push(CorrelationConflict {
                first,
                second,
                previous,
                coefficient: decl.coefficient,
            });
        }

        matrix[(i, j)] = decl.coefficient;
        matrix[(j, i)] = decl.coefficient;
    }

    (matrix, conflicts)
}

/// Minimum eigenvalue of a symmetric matrix
pub fn min_eigenvalue(matrix: &DMatrix<f64>) -> Result<f64, ConfigError> {
    let eigen = SymmetricEigen::try_new(matrix.clone(), f64::EPSILON, EIGEN_MAX_ITERATIONS)
        .ok_or(ConfigError::EigenDecompositionFailed)?;
    Ok(eigen
        .eigenvalues
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min))
}

/// Check shape, unit diagonal, symmetry and coefficient range
pub fn validate(matrix: &DMatrix<f64>) -> Result<(), ConfigError> {
    let n = matrix.nrows();
    if n == 0 || matrix.ncols() != n {
        return Err(ConfigError::RepairFailed(
            "correlation matrix must be square and non-empty".to_string(),
        ));
    }

    for i in 0..n {
        if matrix[(i, i)] != 1.0 {
            return Err(ConfigError::RepairFailed(format!(
                "diagonal entry {i} is {} instead of 1",
                matrix[(i, i)]
            )));
        }
        for j in (i + 1)..n {
            let (a, b) = (matrix[(i, j)], matrix[(j, i)]);
            if !a.is_finite() || !(-1.0..=1.0).contains(&a) {
                return Err(ConfigError::RepairFailed(format!(
                    "entry ({i}, {j}) = {a} is outside [-1, 1]"
                )));
            }
            if (a - b).abs() > SYMMETRY_TOLERANCE {
                return Err(ConfigError::RepairFailed(format!(
                    "entries ({i}, {j}) and ({j}, {i}) differ"
                )));
            }
        }
    }
    Ok(())
}

/// Repair a symmetric unit-diagonal matrix so that it is positive-semidefinite.
///
/// Matrices that are already PSD are returned unchanged. Round-off negatives
/// within `PSD_TOLERANCE` of zero count as PSD, so exact `+-1` declarations
/// keep their value.
pub fn repair(matrix: DMatrix<f64>) -> Result<(DMatrix<f64>, RepairOutcome), ConfigError> {
    validate(&matrix)?;

    let n = matrix.nrows();
    let mut matrix = (&matrix + matrix.transpose()) * 0.5;
    let min_eig = min_eigenvalue(&matrix)?;
    let mut outcome = RepairOutcome {
        min_eigenvalue: min_eig,
        shift: None,
    };

    if min_eig < -PSD_TOLERANCE {
        let shift = min_eig.abs() + REPAIR_EPSILON;
        for i in 0..n {
            matrix[(i, i)] += shift;
        }

        let scale: Vec<f64> = (0..n).map(|i| matrix[(i, i)].sqrt()).collect();
        for i in 0..n {
            for j in 0..n {
                matrix[(i, j)] /= scale[i] * scale[j];
            }
        }
        outcome.shift = Some(shift);

        info!(
            min_eigenvalue = min_eig,
            shift, "correlation matrix was not positive-semidefinite, repaired"
        );
    }

    for i in 0..n {
        matrix[(i, i)] = 1.0;
    }

    validate(&matrix)?;
    let repaired_min = min_eigenvalue(&matrix)?;
    if repaired_min < -PSD_TOLERANCE {
        return Err(ConfigError::RepairFailed(format!(
            "minimum eigenvalue {repaired_min} after repair"
        )));
    }

    Ok((matrix, outcome))
}

/// Lower Cholesky factor of a PSD matrix.
///
/// Falls back to a pivot-tolerant factorization when the matrix is only
/// semidefinite (for example a pair declared with coefficient 1).
pub fn cholesky_lower(matrix: &DMatrix<f64>) -> Result<DMatrix<f64>, ConfigError> {
    if let Some(chol) = Cholesky::new(matrix.clone()) {
        return Ok(chol.l());
    }

    let n = matrix.nrows();
    let mut l = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        for j in 0..=i {
            let mut sum = matrix[(i, j)];
            for k in 0..j {
                sum -= l[(i, k)] * l[(j, k)];
            }

            if i == j {
                if sum < -PSD_TOLERANCE {
                    return Err(ConfigError::RepairFailed(
                        "matrix is not positive-semidefinite".to_string(),
                    ));
                }
                l[(i, i)] = sum.max(0.0).sqrt();
            } else if l[(j, j)] > CHOLESKY_TOLERANCE {
                l[(i, j)] = sum / l[(j, j)];
            }
        }
    }
    Ok(l)
}
