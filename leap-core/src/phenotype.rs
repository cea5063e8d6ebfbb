//! Phenotype extraction and classification.
//!
//! A phenotype with exactly two distinct values is treated as a
//! case/control trait and recoded to {0, 1}; one with more distinct
//! values is treated as continuous.

use leap_linalg::DenseMatrix;
use serde::{Deserialize, Serialize};

use crate::error::H2Error;

/// Kind of trait, decided by the number of distinct phenotype values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhenotypeKind {
    Binary,
    Continuous,
}

/// A phenotype as handed in by a caller: either a plain vector or an
/// n x k matrix that must turn out to have a single column.
#[derive(Debug, Clone, Copy)]
pub enum PhenotypeInput<'a> {
    Vector(&'a [f64]),
    Matrix(&'a DenseMatrix),
}

impl<'a> From<&'a [f64]> for PhenotypeInput<'a> {
    fn from(v: &'a [f64]) -> Self {
        PhenotypeInput::Vector(v)
    }
}

impl<'a> From<&'a Vec<f64>> for PhenotypeInput<'a> {
    fn from(v: &'a Vec<f64>) -> Self {
        PhenotypeInput::Vector(v.as_slice())
    }
}

impl<'a> From<&'a DenseMatrix> for PhenotypeInput<'a> {
    fn from(m: &'a DenseMatrix) -> Self {
        PhenotypeInput::Matrix(m)
    }
}

/// Extract an owned phenotype vector, rejecting multi-column input and
/// non-finite values.
pub fn extract_phenotype(input: PhenotypeInput<'_>) -> Result<Vec<f64>, H2Error> {
    let phe = match input {
        PhenotypeInput::Vector(v) => v.to_vec(),
        PhenotypeInput::Matrix(m) => {
            if m.ncols() != 1 {
                return Err(H2Error::MultiplePhenotypeColumns { ncols: m.ncols() });
            }
            m.col(0)
        }
    };
    if let Some(index) = phe.iter().position(|v| !v.is_finite()) {
        return Err(H2Error::NonFinitePhenotype { index });
    }
    Ok(phe)
}

/// Number of distinct values in a finite phenotype vector.
pub fn count_distinct(phe: &[f64]) -> usize {
    let mut sorted = phe.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted.dedup_by(|a, b| a == b);
    sorted.len()
}

/// Classify a phenotype as binary (two distinct values) or continuous.
pub fn classify(phe: &[f64]) -> Result<PhenotypeKind, H2Error> {
    match count_distinct(phe) {
        d if d < 2 => Err(H2Error::DegeneratePhenotype { distinct: d }),
        2 => Ok(PhenotypeKind::Binary),
        _ => Ok(PhenotypeKind::Continuous),
    }
}

/// Recode a binary phenotype to {0, 1} by comparison with its mean.
///
/// Values at or below the sample mean become 0 (controls), values above
/// become 1 (cases). With exactly two distinct values the mean always
/// falls strictly between them, so the larger value is the case label;
/// coding where the case label is the *smaller* number is not detected.
pub fn recode_binary(phe: &[f64]) -> Vec<f64> {
    if phe.is_empty() {
        return Vec::new();
    }
    let mean = phe.iter().sum::<f64>() / phe.len() as f64;
    phe.iter()
        .map(|&v| if v > mean { 1.0 } else { 0.0 })
        .collect()
}

/// Fraction of entries equal to 1.
pub fn case_fraction(phe: &[f64]) -> f64 {
    if phe.is_empty() {
        return f64::NAN;
    }
    phe.iter().filter(|&&v| v == 1.0).count() as f64 / phe.len() as f64
}
