//! leap-io: input/output for leap-rs
//!
//! Phenotype tables, dense kinship matrices and sample ID matching
//! between them.

pub mod kinship;
pub mod phenotype;
pub mod sample;

pub use kinship::{read_kinship, write_kinship, KinshipMatrix};
pub use phenotype::{parse_phenotype_file, PhenotypeTable};
pub use sample::{align_samples, SampleAlignment};
