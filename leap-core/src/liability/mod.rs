//! Liability-threshold modelling of case/control ascertainment.
//!
//! A binary classifier trained on the leading principal components
//! gives each individual a probability of being a case; those
//! probabilities are corrected for the over-sampling of cases and
//! turned into individual liability thresholds.

pub mod logistic;
pub mod threshold;

use leap_linalg::DenseMatrix;

use crate::error::H2Error;

/// A fitted model that scores every row of a feature matrix.
pub trait ProbabilityModel {
    /// Probability of the positive (case) class for each row of `features`.
    fn predict_probability(&self, features: &DenseMatrix) -> Vec<f64>;
}

/// A trainable binary classifier.
pub trait ProbabilityClassifier {
    type Model: ProbabilityModel;

    /// Fit on `features` (n x p) against 0/1 `labels` (length n).
    fn fit(&self, features: &DenseMatrix, labels: &[f64]) -> Result<Self::Model, H2Error>;
}

pub use logistic::{LogisticClassifier, LogisticConfig, LogisticModel};
pub use threshold::{
    estimate_liability_thresholds, LiabilityThresholds, NEGATIVE_INFINITY_THRESHOLD,
    POSITIVE_INFINITY_THRESHOLD,
};
