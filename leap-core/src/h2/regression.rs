//! Ordinary least squares slope.

/// Slope of the least-squares line of `y` on `x` (with intercept).
///
/// Returns NaN when `x` is constant or fewer than two points are given;
/// callers decide what to do with a degenerate fit.
pub fn ols_slope(x: &[f64], y: &[f64]) -> f64 {
    assert_eq!(x.len(), y.len());
    let n = x.len();
    // A constant regressor has no slope; checked exactly so that rounding
    // in the mean cannot manufacture one.
    if n < 2 || x.iter().all(|&v| v == x[0]) {
        return f64::NAN;
    }
    let nf = n as f64;
    let mx = x.iter().sum::<f64>() / nf;
    let my = y.iter().sum::<f64>() / nf;

    let (sxx, sxy) = x
        .iter()
        .zip(y)
        .fold((0.0, 0.0), |(sxx, sxy), (&xi, &yi)| {
            let dx = xi - mx;
            (sxx + dx * dx, sxy + dx * (yi - my))
        });
    sxy / sxx
}
