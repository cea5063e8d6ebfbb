//! Heritability as a regression slope over pairs of individuals.
//!
//! Every estimator pairs each off-diagonal kinship entry XXT_ij (i < j,
//! both retained) with a phenotype-similarity value y_ij, scales the
//! kinship by an ascertainment coefficient and returns the OLS slope.
//! Diagonal entries carry no information about shared genetics and the
//! lower triangle duplicates the upper one, so both are left out.
//!
//! None of these functions mutate their inputs. NaN or infinite slopes
//! are returned as-is.

use leap_linalg::DenseMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::regression::ols_slope;
use crate::liability::threshold::{corrected_probability, LiabilityThresholds};
use crate::util::math::{liability_scale_factor, normal_isf, normal_pdf, normal_ppf};

/// Which slope estimator produced an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Estimator {
    /// Continuous trait, ascertained in the upper tail.
    ContinuousOneTail,
    /// Continuous trait, ascertained in both tails.
    ContinuousTwoTail,
    /// Case/control trait without individual thresholds.
    BinaryUncorrected,
    /// Case/control trait with PC-based individual thresholds.
    BinaryCorrected,
}

/// Raw output of a slope estimator.
#[derive(Debug, Clone, Copy)]
pub struct SlopeEstimate {
    pub slope: f64,
    pub n_pairs: usize,
}

/// Build (x, y) over the strictly upper triangle of the retained
/// individuals and regress y on x. `pair(a, b)` receives positions in
/// `retained` with a < b.
pub fn upper_triangle_regression<F>(retained: &[usize], mut pair: F) -> SlopeEstimate
where
    F: FnMut(usize, usize) -> (f64, f64),
{
    let m = retained.len();
    let n_pairs = m * m.saturating_sub(1) / 2;
    let mut x = Vec::with_capacity(n_pairs);
    let mut y = Vec::with_capacity(n_pairs);
    for a in 0..m {
        for b in (a + 1)..m {
            let (xv, yv) = pair(a, b);
            x.push(xv);
            y.push(yv);
        }
    }
    SlopeEstimate {
        slope: ols_slope(&x, &y),
        n_pairs: x.len(),
    }
}

/// Continuous phenotype ascertained in the upper tail.
///
/// The phenotype is taken as standardised (mean 0, variance 1). The
/// ascertainment ratio R is inferred from the fraction of retained
/// individuals below the truncation point `t = isf(prevalence)`.
pub fn continuous_one_tail(
    xxt: &DenseMatrix,
    phe: &[f64],
    retained: &[usize],
    prevalence: f64,
    h2coeff: f64,
) -> SlopeEstimate {
    let t = normal_isf(prevalence);
    let phit = normal_pdf(t);

    let k1 = 1.0 - prevalence;
    let k2 = 1.0 - k1;
    let below = retained.iter().filter(|&&i| phe[i] < t).count();
    let p = below as f64 / retained.len() as f64;
    let p2 = 1.0;
    let p1 = k2 * p2 * p / (k1 * (1.0 - p));
    let r = p2 / p1;

    let denom = k1 + r * k2;
    let x_coeff = (((r - 1.0) * phit * t + denom).powi(2) * denom.powi(2)
        - ((r - 1.0) * phit).powi(4))
        / denom.powi(4);
    let offset = ((r - 1.0) * phit / denom).powi(2);

    debug!(
        "One-tail ascertainment: t={:.4}, R={:.4}, xCoeff={:.6}",
        t, r, x_coeff
    );

    let scale = x_coeff * h2coeff;
    upper_triangle_regression(retained, |a, b| {
        let (i, j) = (retained[a], retained[b]);
        (scale * xxt.get(i, j), phe[i] * phe[j] - offset)
    })
}

/// Continuous phenotype ascertained in both tails at the same prevalence.
pub fn continuous_two_tail(
    xxt: &DenseMatrix,
    phe: &[f64],
    retained: &[usize],
    prevalence: f64,
    h2coeff: f64,
) -> SlopeEstimate {
    debug!("Computing h2 for a two-tails ascertained study");

    let t1 = normal_ppf(prevalence);
    let t2 = normal_isf(prevalence);
    let phit1 = normal_pdf(t1);
    let phit2 = normal_pdf(t2);

    let k1 = prevalence;
    let k2 = prevalence;
    let ksum = k1 + k2;

    let x_coeff = ((phit2 * t2 - phit1 * t1 + ksum).powi(2) * ksum.powi(2)
        - (phit2 - phit1).powi(4))
        / ksum.powi(4);
    let intersect = ((phit2 - phit1) / ksum).powi(2);

    let scale = x_coeff * h2coeff;
    upper_triangle_regression(retained, |a, b| {
        let (i, j) = (retained[a], retained[b]);
        (scale * xxt.get(i, j), phe[i] * phe[j] - intersect)
    })
}

/// Case/control phenotype without individual thresholds.
///
/// `phe` is coded {0, 1}; the case fraction is taken over all
/// individuals, not only retained ones.
pub fn binary_uncorrected(
    xxt: &DenseMatrix,
    phe: &[f64],
    retained: &[usize],
    prevalence: f64,
    h2coeff: f64,
) -> SlopeEstimate {
    let k = prevalence;
    let p = observed_case_fraction(phe);

    // Reciprocal of the observed-to-liability conversion factor.
    let x_coeff = h2coeff / liability_scale_factor(k, p);
    let var = p * (1.0 - p);

    upper_triangle_regression(retained, |a, b| {
        let (i, j) = (retained[a], retained[b]);
        (
            x_coeff * xxt.get(i, j),
            (phe[i] - p) * (phe[j] - p) / var,
        )
    })
}

/// Case/control phenotype with individual case probabilities and
/// liability thresholds.
///
/// For retained i, j with probabilities p_i, thresholds t_i,
/// v_i = p_i (1 - p_i) and c = (P - K) / (P (1 - K)):
///
///   y_ij = (phe_i - p_i)(phe_j - p_j) / sqrt(v_i v_j)
///   A_ij = phi(t_i) phi(t_j) (1 - (p_i + p_j) c + p_i p_j c^2) / sqrt(v_i v_j)
///   B_ij = b_i b_j,  b_i = K_i + (1 - K_i) K (1 - P) / (P (1 - K))
///   x_ij = A_ij / B_ij * h2coeff * XXT_ij
pub fn binary_corrected(
    xxt: &DenseMatrix,
    phe: &[f64],
    liability: &LiabilityThresholds,
    retained: &[usize],
    prevalence: f64,
    h2coeff: f64,
) -> SlopeEstimate {
    let k = prevalence;
    let p = observed_case_fraction(phe);
    let c = (p - k) / (p * (1.0 - k));
    let odds = k * (1.0 - p) / (p * (1.0 - k));

    // Per-individual terms, in retained order.
    let probs: Vec<f64> = retained.iter().map(|&i| liability.probabilities[i]).collect();
    let phit: Vec<f64> = retained
        .iter()
        .map(|&i| normal_pdf(liability.thresholds[i]))
        .collect();
    let sd: Vec<f64> = probs.iter().map(|&q| (q * (1.0 - q)).sqrt()).collect();
    let b: Vec<f64> = probs
        .iter()
        .map(|&q| {
            let ki = corrected_probability(q, p, k);
            ki + (1.0 - ki) * odds
        })
        .collect();

    upper_triangle_regression(retained, |a, bb| {
        let (i, j) = (retained[a], retained[bb]);
        let (pa, pb) = (probs[a], probs[bb]);
        let sdsd = sd[a] * sd[bb];
        let y = (phe[i] - pa) * (phe[j] - pb) / sdsd;
        let atag = phit[a] * phit[bb] * (1.0 - (pa + pb) * c + pa * pb * c * c) / sdsd;
        let x = atag / (b[a] * b[bb]) * h2coeff * xxt.get(i, j);
        (x, y)
    })
}

/// Fraction of individuals with a positive phenotype.
fn observed_case_fraction(phe: &[f64]) -> f64 {
    phe.iter().filter(|&&v| v > 0.0).count() as f64 / phe.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinship(n: usize) -> DenseMatrix {
        DenseMatrix::from_fn(n, n, |i, j| {
            if i == j {
                1.0
            } else {
                0.01 * ((i * 7 + j * 7) % 11) as f64
            }
        })
    }

    #[test]
    fn test_pair_count() {
        for n in [2usize, 3, 10, 17] {
            let retained: Vec<usize> = (0..n).collect();
            let est = upper_triangle_regression(&retained, |a, b| (a as f64, b as f64));
            assert_eq!(est.n_pairs, n * (n - 1) / 2);
        }
        assert_eq!(upper_triangle_regression(&[4], |_, _| (0.0, 0.0)).n_pairs, 0);
    }

    #[test]
    fn test_pairs_are_upper_triangle_of_retained() {
        let retained = vec![1, 3, 4];
        let mut seen = Vec::new();
        upper_triangle_regression(&retained, |a, b| {
            seen.push((retained[a], retained[b]));
            (0.0, 0.0)
        });
        assert_eq!(seen, vec![(1, 3), (1, 4), (3, 4)]);
    }

    #[test]
    fn test_binary_uncorrected_h2coeff_scaling() {
        let n = 6;
        let k = kinship(n);
        let phe = vec![0.0, 1.0, 0.0, 1.0, 1.0, 0.0];
        let retained: Vec<usize> = (0..n).collect();
        let est = binary_uncorrected(&k, &phe, &retained, 0.5, 1.0);
        assert!(est.slope.is_finite());
        assert_eq!(est.n_pairs, 15);

        // h2coeff scales x, hence divides the slope.
        let est2 = binary_uncorrected(&k, &phe, &retained, 0.5, 2.0);
        assert!((est2.slope * 2.0 - est.slope).abs() < 1e-10);
    }

    #[test]
    fn test_constant_kinship_gives_nan() {
        let n = 5;
        let k = DenseMatrix::from_fn(n, n, |i, j| if i == j { 1.0 } else { 0.2 });
        let phe = vec![0.3, -1.0, 2.0, 0.1, -0.5];
        let retained: Vec<usize> = (0..n).collect();
        assert!(continuous_two_tail(&k, &phe, &retained, 0.1, 1.0).slope.is_nan());
    }

    #[test]
    fn test_one_tail_without_ascertainment_has_no_offset() {
        // When the fraction below t equals 1 - prevalence, R = 1: the
        // coefficient is 1 and y is the plain product.
        let n = 10;
        let k = kinship(n);
        let t = normal_isf(0.2);
        // 8 of 10 below t.
        let phe: Vec<f64> = (0..n)
            .map(|i| if i < 8 { t - 1.0 - 0.1 * i as f64 } else { t + 1.0 + 0.1 * i as f64 })
            .collect();
        let retained: Vec<usize> = (0..n).collect();
        let est = continuous_one_tail(&k, &phe, &retained, 0.2, 1.0);

        let direct = upper_triangle_regression(&retained, |a, b| {
            (k.get(a, b), phe[a] * phe[b])
        });
        assert!((est.slope - direct.slope).abs() < 1e-9, "{} vs {}", est.slope, direct.slope);
    }

    #[test]
    fn test_corrected_reduces_to_uncorrected_when_unascertained() {
        // P == K and every probability equal to P: the individual
        // coefficients collapse to the population one.
        let n = 8;
        let k = kinship(n);
        let phe = vec![1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];
        let prevalence = 0.5;
        let t = normal_isf(prevalence);
        let liability = LiabilityThresholds {
            probabilities: vec![0.5; n],
            thresholds: vec![t; n],
        };
        let retained: Vec<usize> = (0..n).collect();
        let corrected = binary_corrected(&k, &phe, &liability, &retained, prevalence, 1.0);
        let uncorrected = binary_uncorrected(&k, &phe, &retained, prevalence, 1.0);
        assert!(
            (corrected.slope - uncorrected.slope).abs() < 1e-9,
            "{} vs {}",
            corrected.slope,
            uncorrected.slope
        );
    }

    // Five individuals with distinct off-diagonal kinship values. The
    // expected slopes below were worked out by hand from the closed-form
    // coefficients and an ordinary least-squares fit over the ten pairs.
    fn golden_kinship() -> DenseMatrix {
        DenseMatrix::from_row_major(
            5,
            5,
            &[
                1.0, 0.10, 0.05, 0.20, 0.15, //
                0.10, 1.0, 0.02, 0.08, 0.12, //
                0.05, 0.02, 1.0, 0.04, 0.18, //
                0.20, 0.08, 0.04, 1.0, 0.06, //
                0.15, 0.12, 0.18, 0.06, 1.0,
            ],
        )
    }

    const CONTINUOUS_PHE: [f64; 5] = [-1.0, 0.2, 1.5, 0.9, -0.4];
    const BINARY_PHE: [f64; 5] = [1.0, 1.0, 0.0, 0.0, 0.0];

    fn assert_close(got: f64, expected: f64) {
        assert!(
            (got - expected).abs() < 1e-9 * expected.abs().max(1.0),
            "got {}, expected {}",
            got,
            expected
        );
    }

    #[test]
    fn test_one_tail_golden_slope() {
        // t = isf(0.3) = 0.5244; three of five values fall below it, so
        // P = 0.6 and R = 14/9, giving xCoeff = 1.180435 and an offset
        // of 0.027413 on every product.
        let retained: Vec<usize> = (0..5).collect();
        let est = continuous_one_tail(&golden_kinship(), &CONTINUOUS_PHE, &retained, 0.3, 1.0);
        assert_eq!(est.n_pairs, 10);
        assert_close(est.slope, -3.478_810_630_566_864);

        // h2coeff enters x only.
        let halved = continuous_one_tail(&golden_kinship(), &CONTINUOUS_PHE, &retained, 0.3, 2.0);
        assert_close(halved.slope, -3.478_810_630_566_864 / 2.0);
    }

    #[test]
    fn test_two_tail_golden_slope() {
        // Symmetric tails at 0.2: the densities at both thresholds agree,
        // so the intercept vanishes and xCoeff = 4.744161.
        let retained: Vec<usize> = (0..5).collect();
        let est = continuous_two_tail(&golden_kinship(), &CONTINUOUS_PHE, &retained, 0.2, 1.0);
        assert_close(est.slope, -0.865_592_238_783_602);
    }

    #[test]
    fn test_binary_uncorrected_golden_slope() {
        // P = 0.4 is taken over all five individuals even though the
        // second one is not retained.
        let retained = vec![0, 2, 3, 4];
        let est = binary_uncorrected(&golden_kinship(), &BINARY_PHE, &retained, 0.1, 1.0);
        assert_eq!(est.n_pairs, 6);
        assert_close(est.slope, -4.291_610_274_208_986);
    }

    #[test]
    fn test_binary_corrected_golden_slope() {
        // Individual probabilities and thresholds all differ, so every
        // A_ij / B_ij term is distinct.
        let liability = LiabilityThresholds {
            probabilities: vec![0.7, 0.55, 0.3, 0.25, 0.4],
            thresholds: vec![1.1, 1.3, 1.6, 1.7, 1.45],
        };
        let k = golden_kinship();
        let all: Vec<usize> = (0..5).collect();
        let est = binary_corrected(&k, &BINARY_PHE, &liability, &all, 0.1, 1.0);
        assert_close(est.slope, 3.004_739_340_182_572);

        let subset = vec![0, 1, 3, 4];
        let est = binary_corrected(&k, &BINARY_PHE, &liability, &subset, 0.1, 1.0);
        assert_eq!(est.n_pairs, 6);
        assert_close(est.slope, -18.615_391_088_676_61);
    }
}
