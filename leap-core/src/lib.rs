//! leap-core: heritability estimation under case/control ascertainment
//!
//! Implements the LEAP h2 estimators: pairwise regression of phenotype
//! similarity on kinship, with a liability-threshold correction for
//! ascertained studies, optional removal of population-structure PCs
//! and PC-based individual case probabilities.

pub mod error;
pub mod h2;
pub mod kinship;
pub mod liability;
pub mod phenotype;
pub mod util;

pub use error::{H2Error, H2Warning};
pub use h2::{calc_h2, calc_h2_with_classifier, H2Config, H2Estimate};
pub use kinship::{Relatedness, RetainedMask};
pub use phenotype::PhenotypeKind;
