//! leap-linalg: Linear algebra wrappers for leap-rs
//!
//! Dense matrices over faer, the Cholesky solver used by the
//! case-probability classifier, and the symmetric eigen-decomposition
//! used to remove principal components from a kinship matrix.

pub mod dense;
pub mod decomposition;

pub use decomposition::{EigenDecomposition, LinalgError};
pub use dense::DenseMatrix;
