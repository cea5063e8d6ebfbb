//! Individual liability thresholds from PC-based case probabilities.
//!
//! Steps:
//!   1. G = U_top * sqrt(S_top), the top principal components scaled by
//!      the square root of their eigenvalues.
//!   2. Fit a case classifier on G[retained] and score every individual,
//!      giving P_i.
//!   3. Undo the case over-sampling: with sample case fraction P and
//!      prevalence K, r = K(1-P) / (P(1-K)) and
//!        K_i = r P_i / (1 + r P_i - P_i).
//!   4. threshold_i = isf(K_i), with sentinels where K_i leaves (0, 1).

use leap_linalg::{DenseMatrix, EigenDecomposition};
use tracing::debug;

use super::{ProbabilityClassifier, ProbabilityModel};
use crate::error::H2Error;
use crate::kinship::RetainedMask;
use crate::phenotype::case_fraction;
use crate::util::math::normal_isf;

/// Threshold beyond which an individual is certainly unaffected
/// (corrected case probability at or below zero).
pub const POSITIVE_INFINITY_THRESHOLD: f64 = 999_999_999.0;

/// Threshold below which an individual is certainly affected
/// (corrected case probability at or above one).
pub const NEGATIVE_INFINITY_THRESHOLD: f64 = -999_999_999.0;

/// Per-individual case probabilities and liability thresholds, both of
/// length n (all individuals, not only retained ones).
#[derive(Debug, Clone)]
pub struct LiabilityThresholds {
    pub probabilities: Vec<f64>,
    pub thresholds: Vec<f64>,
}

/// Ascertainment-corrected case probability K_i for a sample probability
/// `pi`, given the sample case fraction `p` and population prevalence `k`.
#[inline]
pub fn corrected_probability(pi: f64, p: f64, k: f64) -> f64 {
    let r = k * (1.0 - p) / (p * (1.0 - k));
    r * pi / (1.0 + r * pi - pi)
}

/// Liability threshold for a corrected probability, clamped to the
/// sentinel values outside (0, 1).
pub fn liability_threshold(ki: f64) -> f64 {
    if ki >= 1.0 {
        NEGATIVE_INFINITY_THRESHOLD
    } else if ki <= 0.0 {
        POSITIVE_INFINITY_THRESHOLD
    } else {
        normal_isf(ki)
    }
}

/// Compute case probabilities and liability thresholds for every
/// individual from the top `num_remove_pcs` principal components.
///
/// `phenotype` must already be recoded to {0, 1}.
pub fn estimate_liability_thresholds<C: ProbabilityClassifier>(
    classifier: &C,
    eigen: &EigenDecomposition,
    retained: &RetainedMask,
    phenotype: &[f64],
    num_remove_pcs: usize,
    prevalence: f64,
) -> Result<LiabilityThresholds, H2Error> {
    let n = phenotype.len();
    let u = &eigen.eigenvectors;
    if u.nrows() != n {
        return Err(H2Error::DimensionMismatch {
            what: "eigenvector rows vs phenotype",
            expected: n,
            got: u.nrows(),
        });
    }
    if retained.len() != n {
        return Err(H2Error::DimensionMismatch {
            what: "retained mask vs phenotype",
            expected: n,
            got: retained.len(),
        });
    }
    if num_remove_pcs == 0 || num_remove_pcs > eigen.len() {
        return Err(H2Error::TooManyPcs {
            requested: num_remove_pcs,
            available: eigen.len(),
        });
    }

    let top: Vec<usize> = eigen.top_indices(num_remove_pcs).collect();
    let g = DenseMatrix::from_fn(n, top.len(), |i, j| {
        u.get(i, top[j]) * eigen.eigenvalues[top[j]].max(0.0).sqrt()
    });

    let keep = retained.indices();
    let labels: Vec<f64> = keep.iter().map(|&i| phenotype[i]).collect();
    let model = classifier.fit(&g.select_rows(&keep), &labels)?;
    let probabilities = model.predict_probability(&g);

    let p = case_fraction(phenotype);
    let k = prevalence;
    let thresholds: Vec<f64> = probabilities
        .iter()
        .map(|&pi| liability_threshold(corrected_probability(pi, p, k)))
        .collect();

    debug!(
        "Computed liability thresholds for {} individuals (case fraction {:.4}, prevalence {:.4})",
        n, p, k
    );

    Ok(LiabilityThresholds {
        probabilities,
        thresholds,
    })
}
