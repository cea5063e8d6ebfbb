//! List the individuals removed by the relatedness vertex cut.
//!
//! leap related --kinship-file ... --cutoff 0.05 [--output removed.txt]

use std::path::Path;

use anyhow::{bail, Result};
use clap::Args;
use tracing::info;

use leap_core::kinship::related::vertex_cut;
use leap_io::kinship::read_kinship;
use leap_io::sample::{reorder_vec, write_id_list};

#[derive(Args)]
pub struct RelatedArgs {
    /// Kinship matrix file (first line sample IDs, then n rows of n values)
    #[arg(long)]
    kinship_file: String,

    /// Pairs with kinship above this value are considered related
    #[arg(long)]
    cutoff: f64,

    /// Write removed sample IDs here instead of stdout
    #[arg(long)]
    output: Option<String>,
}

pub fn run(args: RelatedArgs) -> Result<()> {
    if !args.cutoff.is_finite() {
        bail!("Relatedness cutoff must be finite, got {}", args.cutoff);
    }

    let kinship = read_kinship(Path::new(&args.kinship_file))?;
    let removed = vertex_cut(&kinship.matrix, args.cutoff);
    let removed_ids = reorder_vec(&kinship.sample_ids, &removed);

    info!(
        "{} of {} individuals removed at cutoff {}",
        removed_ids.len(),
        kinship.sample_ids.len(),
        args.cutoff
    );

    match args.output {
        Some(path) => {
            write_id_list(Path::new(&path), &removed_ids)?;
            info!("Removed sample IDs written to {}", path);
        }
        None => {
            for id in &removed_ids {
                println!("{}", id);
            }
        }
    }
    Ok(())
}
