#![allow(clippy::needless_range_loop)]
//! Matrix decompositions.
//!
//! Cholesky factorisation for the small Newton systems of the
//! case-probability classifier, and the symmetric eigen-decomposition
//! of a kinship matrix used for principal-component removal.

use crate::dense::DenseMatrix;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinalgError {
    #[error("Matrix is not positive definite")]
    NotPositiveDefinite,

    #[error("Matrix is not square: {nrows} x {ncols}")]
    NotSquare { nrows: usize, ncols: usize },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Eigen-decomposition produced a non-finite eigenvalue")]
    NonFiniteEigenvalue,
}

/// Result of a Cholesky decomposition.
pub struct CholeskyDecomp {
    /// Lower triangular factor L such that A = L * L'.
    pub l: DenseMatrix,
}

impl CholeskyDecomp {
    /// Compute the Cholesky decomposition of a symmetric positive definite matrix.
    pub fn new(a: &DenseMatrix) -> Result<Self, LinalgError> {
        let n = a.nrows();
        if n != a.ncols() {
            return Err(LinalgError::NotSquare {
                nrows: n,
                ncols: a.ncols(),
            });
        }
        let mut l = DenseMatrix::zeros(n, n);

        for j in 0..n {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l.get(j, k) * l.get(j, k);
            }
            let diag = a.get(j, j) - sum;
            if diag <= 0.0 || !diag.is_finite() {
                return Err(LinalgError::NotPositiveDefinite);
            }
            l.set(j, j, diag.sqrt());

            for i in (j + 1)..n {
                let mut sum = 0.0;
                for k in 0..j {
                    sum += l.get(i, k) * l.get(j, k);
                }
                l.set(i, j, (a.get(i, j) - sum) / l.get(j, j));
            }
        }

        Ok(CholeskyDecomp { l })
    }

    /// Solve L * L' * x = b.
    pub fn solve(&self, b: &[f64]) -> Vec<f64> {
        let n = self.l.nrows();
        assert_eq!(b.len(), n);

        // Forward substitution: L * y = b
        let mut y = vec![0.0; n];
        for i in 0..n {
            let mut sum = 0.0;
            for j in 0..i {
                sum += self.l.get(i, j) * y[j];
            }
            y[i] = (b[i] - sum) / self.l.get(i, i);
        }

        // Backward substitution: L' * x = y
        let mut x = vec![0.0; n];
        for i in (0..n).rev() {
            let mut sum = 0.0;
            for j in (i + 1)..n {
                sum += self.l.get(j, i) * x[j];
            }
            x[i] = (y[i] - sum) / self.l.get(i, i);
        }

        x
    }
}

/// Symmetric eigen-decomposition `A = U diag(S) U'`.
///
/// Eigenvalues are stored in ascending order and column `j` of
/// `eigenvectors` belongs to `eigenvalues[j]`, so the leading principal
/// components occupy the *last* columns.
#[derive(Debug, Clone)]
pub struct EigenDecomposition {
    pub eigenvalues: Vec<f64>,
    pub eigenvectors: DenseMatrix,
}

impl EigenDecomposition {
    /// Wrap a precomputed decomposition, checking that the shapes agree.
    pub fn new(eigenvalues: Vec<f64>, eigenvectors: DenseMatrix) -> Result<Self, LinalgError> {
        if eigenvalues.len() != eigenvectors.ncols() {
            return Err(LinalgError::DimensionMismatch {
                expected: eigenvectors.ncols(),
                got: eigenvalues.len(),
            });
        }
        Ok(Self {
            eigenvalues,
            eigenvectors,
        })
    }

    /// Decompose a symmetric matrix with faer's self-adjoint solver.
    /// Only the lower triangle of `a` is read.
    pub fn symmetric(a: &DenseMatrix) -> Result<Self, LinalgError> {
        let n = a.nrows();
        if n != a.ncols() {
            return Err(LinalgError::NotSquare {
                nrows: n,
                ncols: a.ncols(),
            });
        }

        let evd = a.as_faer().selfadjoint_eigendecomposition(faer::Side::Lower);
        let s = evd.s().column_vector();
        let u = evd.u();

        let mut order: Vec<usize> = (0..n).collect();
        let values: Vec<f64> = (0..n).map(|i| s.read(i)).collect();
        if values.iter().any(|v| !v.is_finite()) {
            return Err(LinalgError::NonFiniteEigenvalue);
        }
        order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));

        let eigenvalues = order.iter().map(|&k| values[k]).collect();
        let eigenvectors = DenseMatrix::from_fn(n, n, |i, j| u.read(i, order[j]));

        Ok(Self {
            eigenvalues,
            eigenvectors,
        })
    }

    /// Number of eigenpairs held.
    pub fn len(&self) -> usize {
        self.eigenvalues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eigenvalues.is_empty()
    }

    /// Column indices of the `k` largest eigenpairs, in ascending order.
    pub fn top_indices(&self, k: usize) -> std::ops::Range<usize> {
        let m = self.len();
        m.saturating_sub(k)..m
    }
}
