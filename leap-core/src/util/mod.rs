//! Numerical utilities shared by the estimators.

pub mod math;
