//! L2-penalised logistic regression with an unpenalised intercept.
//!
//! Minimises
//!   -sum_i [y_i eta_i - log(1 + exp(eta_i))] + 1/(2C) * ||beta||^2
//! by Newton-Raphson with step halving, where `eta = b0 + X beta` and C
//! is the inverse regularisation strength. With a large C this is close
//! to the unpenalised maximum-likelihood fit while staying finite under
//! (quasi-)separation.

use leap_linalg::decomposition::CholeskyDecomp;
use leap_linalg::DenseMatrix;
use tracing::{debug, warn};

use super::{ProbabilityClassifier, ProbabilityModel};
use crate::error::H2Error;

/// Configuration for the logistic fit.
#[derive(Debug, Clone)]
pub struct LogisticConfig {
    /// Maximum Newton-Raphson iterations.
    pub max_iter: usize,
    /// Convergence tolerance on the largest coefficient change.
    pub tol: f64,
    /// Inverse regularisation strength C; the ridge penalty is 1/C.
    pub inverse_regularization: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            max_iter: 100,
            tol: 1e-8,
            inverse_regularization: 500_000.0,
        }
    }
}

/// Logistic-regression case classifier.
#[derive(Debug, Clone, Default)]
pub struct LogisticClassifier {
    pub config: LogisticConfig,
}

impl LogisticClassifier {
    pub fn new(config: LogisticConfig) -> Self {
        Self { config }
    }
}

/// A fitted logistic model.
#[derive(Debug, Clone)]
pub struct LogisticModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
}

impl ProbabilityModel for LogisticModel {
    fn predict_probability(&self, features: &DenseMatrix) -> Vec<f64> {
        assert_eq!(features.ncols(), self.coefficients.len());
        features
            .mat_vec(&self.coefficients)
            .into_iter()
            .map(|eta| logistic(self.intercept + eta))
            .collect()
    }
}

impl ProbabilityClassifier for LogisticClassifier {
    type Model = LogisticModel;

    fn fit(&self, features: &DenseMatrix, labels: &[f64]) -> Result<LogisticModel, H2Error> {
        let n = labels.len();
        if features.nrows() != n {
            return Err(H2Error::DimensionMismatch {
                what: "classifier features vs labels",
                expected: n,
                got: features.nrows(),
            });
        }
        if n == 0 {
            return Err(H2Error::Classifier("no training samples".into()));
        }

        // Design matrix [1 | features]
        let p = features.ncols() + 1;
        let x = DenseMatrix::from_fn(n, p, |i, j| {
            if j == 0 {
                1.0
            } else {
                features.get(i, j - 1)
            }
        });
        let lambda = 1.0 / self.config.inverse_regularization;

        let mut beta = vec![0.0; p];
        let mut objective = penalized_nll(&x, labels, &beta, lambda);

        for iter in 0..self.config.max_iter {
            let eta = x.mat_vec(&beta);
            let mu: Vec<f64> = eta.iter().map(|&e| logistic(e)).collect();

            let w: Vec<f64> = mu.iter().map(|&m| (m * (1.0 - m)).max(1e-10)).collect();

            // Gradient of the log-likelihood minus the ridge term.
            let resid: Vec<f64> = labels.iter().zip(&mu).map(|(y, m)| y - m).collect();
            let mut score = x.xtv(&resid);
            let mut info = x.xtwx(&w);
            for j in 1..p {
                score[j] -= lambda * beta[j];
                info.set(j, j, info.get(j, j) + lambda);
            }

            let delta = match CholeskyDecomp::new(&info) {
                Ok(chol) => chol.solve(&score),
                Err(_) => {
                    for j in 0..p {
                        info.set(j, j, info.get(j, j) + 1e-6);
                    }
                    CholeskyDecomp::new(&info)?.solve(&score)
                }
            };

            // Step halving keeps the penalised objective non-increasing.
            let mut step = 1.0;
            let mut candidate: Vec<f64>;
            let mut cand_obj;
            loop {
                candidate = beta.iter().zip(&delta).map(|(b, d)| b + step * d).collect();
                cand_obj = penalized_nll(&x, labels, &candidate, lambda);
                if cand_obj <= objective + 1e-12 * objective.abs() || step < 1e-6 {
                    break;
                }
                step *= 0.5;
            }

            let max_change = delta
                .iter()
                .map(|d| (step * d).abs())
                .fold(0.0_f64, f64::max);
            beta = candidate;
            objective = cand_obj;

            if max_change < self.config.tol {
                debug!(
                    "Logistic regression converged after {} iterations (objective {:.6})",
                    iter + 1,
                    objective
                );
                return Ok(LogisticModel {
                    intercept: beta[0],
                    coefficients: beta[1..].to_vec(),
                    iterations: iter + 1,
                    converged: true,
                });
            }
        }

        warn!(
            "Logistic regression did not converge after {} iterations",
            self.config.max_iter
        );
        Ok(LogisticModel {
            intercept: beta[0],
            coefficients: beta[1..].to_vec(),
            iterations: self.config.max_iter,
            converged: false,
        })
    }
}

/// Logistic function: 1 / (1 + exp(-x))
#[inline]
pub fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// log(1 + exp(x)) without overflow.
#[inline]
fn softplus(x: f64) -> f64 {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

fn penalized_nll(x: &DenseMatrix, y: &[f64], beta: &[f64], lambda: f64) -> f64 {
    let eta = x.mat_vec(beta);
    let nll: f64 = eta
        .iter()
        .zip(y)
        .map(|(&e, &yi)| softplus(e) - yi * e)
        .sum();
    let ridge: f64 = beta[1..].iter().map(|b| b * b).sum();
    nll + 0.5 * lambda * ridge
}
