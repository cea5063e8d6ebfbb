//! Error and warning types for heritability estimation.
//!
//! Structural problems with the inputs are fatal and surface as
//! [`H2Error`]. A degenerate estimate (negative, zero, NaN or infinite
//! slope) is not an error: it is replaced by a placeholder and reported
//! as an [`H2Warning`] alongside the result.

use leap_linalg::LinalgError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum H2Error {
    #[error("Less than two different phenotypes observed (found {distinct})")]
    DegeneratePhenotype { distinct: usize },

    #[error("More than one phenotype found: expected a single column, got {ncols}")]
    MultiplePhenotypeColumns { ncols: usize },

    #[error("Removing {num_remove_pcs} PCs requires an eigen-decomposition of the kinship matrix")]
    MissingEigenDecomposition { num_remove_pcs: usize },

    #[error("Phenotype value at index {index} is not finite")]
    NonFinitePhenotype { index: usize },

    #[error("Dimension mismatch in {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Prevalence must lie strictly between 0 and 1, got {0}")]
    InvalidPrevalence(f64),

    #[error("Cannot remove {requested} PCs: only {available} eigenvectors available")]
    TooManyPcs { requested: usize, available: usize },

    #[error("At least two retained individuals are required, got {retained}")]
    TooFewRetained { retained: usize },

    #[error("Cannot Gower-normalise: trace(K) - sum(K)/n is {0}")]
    DegenerateKinship(f64),

    #[error("Case-probability classifier failed: {0}")]
    Classifier(String),

    #[error(transparent)]
    Linalg(#[from] LinalgError),
}

/// Non-fatal diagnostics attached to an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum H2Warning {
    /// The regression slope was NaN or infinite.
    NonFiniteEstimate { raw: f64 },
    /// The regression slope was zero or negative.
    NonPositiveEstimate { raw: f64 },
}

impl std::fmt::Display for H2Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            H2Warning::NonFiniteEstimate { raw } => write!(
                f,
                "Invalid heritability estimate ({}). Please double-check your input for any errors.",
                raw
            ),
            H2Warning::NonPositiveEstimate { raw } => {
                write!(f, "Non-positive heritability found ({:.6})", raw)
            }
        }
    }
}
