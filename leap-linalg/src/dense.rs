#![allow(clippy::needless_range_loop)]
//! Dense matrix operations backed by faer.
//!
//! Kinship matrices, eigenvector blocks and the small design matrices
//! of the case-probability classifier all live in a column-major
//! `Mat<f64>`. The wrapper exposes the handful of operations the
//! heritability engine needs: element access, row/column subsetting,
//! matrix-vector products and weighted cross products.

use faer::Mat;

/// A dense matrix wrapper around faer's `Mat<f64>`.
#[derive(Debug, Clone)]
pub struct DenseMatrix {
    inner: Mat<f64>,
}

impl DenseMatrix {
    /// Create a new dense matrix filled with zeros.
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            inner: Mat::zeros(nrows, ncols),
        }
    }

    /// Create a matrix whose (i, j) entry is `f(i, j)`.
    pub fn from_fn<F>(nrows: usize, ncols: usize, f: F) -> Self
    where
        F: FnMut(usize, usize) -> f64,
    {
        Self {
            inner: Mat::from_fn(nrows, ncols, f),
        }
    }

    /// Create a dense matrix from a 2D slice (row-major input).
    pub fn from_row_major(nrows: usize, ncols: usize, data: &[f64]) -> Self {
        assert_eq!(data.len(), nrows * ncols);
        let inner = Mat::from_fn(nrows, ncols, |i, j| data[i * ncols + j]);
        Self { inner }
    }

    /// Create an identity matrix of size n x n.
    pub fn identity(n: usize) -> Self {
        Self::from_fn(n, n, |i, j| if i == j { 1.0 } else { 0.0 })
    }

    /// Create a single-column matrix from a slice.
    pub fn from_column(data: &[f64]) -> Self {
        Self::from_fn(data.len(), 1, |i, _| data[i])
    }

    pub fn nrows(&self) -> usize {
        self.inner.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.inner.ncols()
    }

    pub fn is_square(&self) -> bool {
        self.nrows() == self.ncols()
    }

    /// Get element at (row, col).
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.inner.read(row, col)
    }

    /// Set element at (row, col).
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.inner.write(row, col, value);
    }

    /// Get a reference to the underlying faer matrix.
    pub fn as_faer(&self) -> &Mat<f64> {
        &self.inner
    }

    /// Matrix-vector product: self * v -> result vector.
    pub fn mat_vec(&self, v: &[f64]) -> Vec<f64> {
        assert_eq!(self.ncols(), v.len());
        let n = self.nrows();
        let mut result = vec![0.0; n];
        for j in 0..self.ncols() {
            let vj = v[j];
            for i in 0..n {
                result[i] += self.inner.read(i, j) * vj;
            }
        }
        result
    }

    /// Extract column as a Vec<f64>.
    pub fn col(&self, j: usize) -> Vec<f64> {
        (0..self.nrows()).map(|i| self.inner.read(i, j)).collect()
    }

    /// Keep only the listed rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> DenseMatrix {
        Self::from_fn(rows.len(), self.ncols(), |i, j| self.inner.read(rows[i], j))
    }

    /// Principal submatrix `self[idx, idx]`.
    pub fn principal_submatrix(&self, idx: &[usize]) -> DenseMatrix {
        assert!(self.is_square());
        Self::from_fn(idx.len(), idx.len(), |i, j| self.inner.read(idx[i], idx[j]))
    }

    /// Scalar multiplication.
    pub fn scale(&self, s: f64) -> DenseMatrix {
        Self::from_fn(self.nrows(), self.ncols(), |i, j| self.inner.read(i, j) * s)
    }

    /// Diagonal of a square matrix.
    pub fn diag(&self) -> Vec<f64> {
        let n = self.nrows().min(self.ncols());
        (0..n).map(|i| self.inner.read(i, i)).collect()
    }

    pub fn trace(&self) -> f64 {
        self.diag().iter().sum()
    }

    /// Sum of all entries.
    pub fn sum(&self) -> f64 {
        let mut s = 0.0;
        for j in 0..self.ncols() {
            for i in 0..self.nrows() {
                s += self.inner.read(i, j);
            }
        }
        s
    }

    /// True if square and `|a_ij - a_ji| <= tol` everywhere.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        if !self.is_square() {
            return false;
        }
        let n = self.nrows();
        for j in 0..n {
            for i in (j + 1)..n {
                if (self.inner.read(i, j) - self.inner.read(j, i)).abs() > tol {
                    return false;
                }
            }
        }
        true
    }

    /// Compute X' * diag(w) * X for design matrix X and weight vector w.
    /// Returns a p x p matrix where p = X.ncols().
    pub fn xtwx(&self, w: &[f64]) -> DenseMatrix {
        let n = self.nrows();
        let p = self.ncols();
        assert_eq!(w.len(), n);
        let mut result = DenseMatrix::zeros(p, p);
        for j in 0..p {
            for k in j..p {
                let mut s = 0.0;
                for i in 0..n {
                    s += self.inner.read(i, j) * w[i] * self.inner.read(i, k);
                }
                result.set(j, k, s);
                if j != k {
                    result.set(k, j, s);
                }
            }
        }
        result
    }

    /// Compute X' * v for design matrix X and vector v.
    pub fn xtv(&self, v: &[f64]) -> Vec<f64> {
        let n = self.nrows();
        assert_eq!(v.len(), n);
        (0..self.ncols())
            .map(|j| (0..n).map(|i| self.inner.read(i, j) * v[i]).sum())
            .collect()
    }
}
