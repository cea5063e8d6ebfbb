//! Standard-normal helpers and liability-scale conversions.

use statrs::distribution::{Continuous, ContinuousCDF, Normal};

fn standard_normal() -> Option<Normal> {
    Normal::new(0.0, 1.0).ok()
}

/// Standard normal density.
#[inline]
pub fn normal_pdf(x: f64) -> f64 {
    standard_normal().map_or(f64::NAN, |norm| norm.pdf(x))
}

/// Quantile function: the `t` with P(Z < t) = p.
///
/// Returns -inf at p = 0, +inf at p = 1 and NaN outside [0, 1].
pub fn normal_ppf(p: f64) -> f64 {
    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    standard_normal().map_or(f64::NAN, |norm| norm.inverse_cdf(p))
}

/// Inverse survival function: the `t` with P(Z > t) = p.
///
/// Taken as `-ppf(p)` so that small tail probabilities keep full
/// precision instead of going through `1 - p`.
pub fn normal_isf(p: f64) -> f64 {
    -normal_ppf(p)
}

/// Factor converting an observed-scale (0/1) heritability into the
/// liability scale for prevalence `k` and sample case fraction `p`:
///
///   K^2 (1-K)^2 / (phi(t)^2 P (1-P)),   t = isf(K)
pub fn liability_scale_factor(prevalence: f64, case_fraction: f64) -> f64 {
    let k = prevalence;
    let p = case_fraction;
    let phit = normal_pdf(normal_isf(k));
    (k * k * (1.0 - k) * (1.0 - k)) / (phit * phit * p * (1.0 - p))
}
