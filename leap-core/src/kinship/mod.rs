//! Kinship (relatedness) matrix handling.
//!
//! - [`Relatedness`]: the kinship matrix together with its optional
//!   eigen-decomposition.
//! - [`RetainedMask`]: which individuals enter the pairwise regression.
//! - [`remove_top_pcs`]: deflate the matrix by its leading principal
//!   components, `XXT - U_top diag(S_top) U_top'`.
//! - [`gower_normalize`]: rescale a kinship matrix to unit implied
//!   sample variance.

pub mod related;

use leap_linalg::{DenseMatrix, EigenDecomposition};
use tracing::info;

use crate::error::H2Error;

/// A kinship matrix and, optionally, the eigen-decomposition of that
/// same (uncorrected) matrix.
#[derive(Debug, Clone)]
pub struct Relatedness {
    pub xxt: DenseMatrix,
    pub eigen: Option<EigenDecomposition>,
}

impl Relatedness {
    /// Kinship matrix without an eigen-decomposition. Sufficient as long
    /// as no principal components are removed.
    pub fn new(xxt: DenseMatrix) -> Self {
        Self { xxt, eigen: None }
    }

    /// Kinship matrix with a caller-supplied eigen-decomposition.
    pub fn with_decomposition(xxt: DenseMatrix, eigen: EigenDecomposition) -> Self {
        Self {
            xxt,
            eigen: Some(eigen),
        }
    }

    /// Kinship matrix with its eigen-decomposition computed here.
    pub fn with_eigen(xxt: DenseMatrix) -> Result<Self, H2Error> {
        let eigen = EigenDecomposition::symmetric(&xxt)?;
        Ok(Self::with_decomposition(xxt, eigen))
    }

    pub fn n_samples(&self) -> usize {
        self.xxt.nrows()
    }
}

/// Boolean selection of the individuals used in all second-moment
/// computations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetainedMask(Vec<bool>);

impl RetainedMask {
    /// Every individual retained.
    pub fn all(n: usize) -> Self {
        Self(vec![true; n])
    }

    pub fn from_bools(mask: Vec<bool>) -> Self {
        Self(mask)
    }

    /// Retain exactly the listed individuals.
    pub fn from_indices(n: usize, keep: &[usize]) -> Self {
        let mut mask = vec![false; n];
        for &i in keep {
            if i < n {
                mask[i] = true;
            }
        }
        Self(mask)
    }

    /// Retain everyone except the listed individuals.
    pub fn from_removed(n: usize, removed: &[usize]) -> Self {
        let mut mask = vec![true; n];
        for &i in removed {
            if i < n {
                mask[i] = false;
            }
        }
        Self(mask)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    /// Indices of retained individuals, ascending.
    pub fn indices(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, &keep)| keep.then_some(i))
            .collect()
    }

    pub fn n_retained(&self) -> usize {
        self.0.iter().filter(|&&keep| keep).count()
    }
}

/// Remove the top `num_remove_pcs` principal components from `xxt` in place.
///
/// The leading components are the last columns of the eigenvector
/// matrix (eigenvalues ascending). Removing zero components leaves the
/// matrix untouched and does not require an eigen-decomposition.
pub fn remove_top_pcs(
    xxt: &mut DenseMatrix,
    eigen: Option<&EigenDecomposition>,
    num_remove_pcs: usize,
) -> Result<(), H2Error> {
    if num_remove_pcs == 0 {
        return Ok(());
    }
    let eigen = eigen.ok_or(H2Error::MissingEigenDecomposition { num_remove_pcs })?;
    let n = xxt.nrows();
    let u = &eigen.eigenvectors;
    if u.nrows() != n {
        return Err(H2Error::DimensionMismatch {
            what: "eigenvector rows vs kinship matrix",
            expected: n,
            got: u.nrows(),
        });
    }
    if num_remove_pcs > eigen.len() {
        return Err(H2Error::TooManyPcs {
            requested: num_remove_pcs,
            available: eigen.len(),
        });
    }

    info!("Removing the top {} PCs from the kinship matrix", num_remove_pcs);

    let top = eigen.top_indices(num_remove_pcs);
    for j in 0..n {
        for i in j..n {
            let mut proj = 0.0;
            for k in top.clone() {
                proj += u.get(i, k) * eigen.eigenvalues[k] * u.get(j, k);
            }
            let vij = xxt.get(i, j) - proj;
            xxt.set(i, j, vij);
            if i != j {
                let vji = xxt.get(j, i) - proj;
                xxt.set(j, i, vji);
            }
        }
    }
    Ok(())
}

/// Gower-normalise a kinship matrix:
///
///   K * (n - 1) / (trace(K) - sum(K) / n)
///
/// so that the sample variance of a random effect with covariance K is 1.
pub fn gower_normalize(k: &DenseMatrix) -> Result<DenseMatrix, H2Error> {
    let n = k.nrows();
    if !k.is_square() {
        return Err(H2Error::DimensionMismatch {
            what: "kinship matrix columns",
            expected: n,
            got: k.ncols(),
        });
    }
    if n < 2 {
        return Err(H2Error::TooFewRetained { retained: n });
    }
    let denom = k.trace() - k.sum() / n as f64;
    if !(denom.is_finite() && denom > 0.0) {
        return Err(H2Error::DegenerateKinship(denom));
    }
    Ok(k.scale((n as f64 - 1.0) / denom))
}
