//! Estimate heritability from a phenotype table and a kinship matrix.
//!
//! leap h2 --pheno-file ... --kinship-file ... --prevalence 0.001 [--num-remove-pcs 10]

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use leap_core::kinship::related::unrelated_mask;
use leap_core::kinship::{gower_normalize, Relatedness};
use leap_core::{calc_h2, H2Config, H2Estimate};
use leap_io::kinship::read_kinship;
use leap_io::phenotype::{complete_case_indices, parse_phenotype_file};
use leap_io::sample::align_samples;

#[derive(Args)]
pub struct H2Args {
    /// Phenotype file path
    #[arg(long)]
    pheno_file: String,

    /// Phenotype column names (comma-separated); all non-ID columns if empty
    #[arg(long, default_value = "")]
    pheno_cols: String,

    /// Sample ID column name
    #[arg(long, default_value = "IID")]
    sample_id_col: String,

    /// Kinship matrix file (first line sample IDs, then n rows of n values)
    #[arg(long)]
    kinship_file: String,

    /// Population prevalence of the trait
    #[arg(long)]
    prevalence: f64,

    /// Number of top principal components removed from the kinship matrix
    #[arg(long, default_value = "0")]
    num_remove_pcs: usize,

    /// Multiplier on the ascertainment coefficient
    #[arg(long, default_value = "1.0")]
    h2coeff: f64,

    /// Continuous traits: the study was ascertained in both tails
    #[arg(long, default_value = "false")]
    lowtail: bool,

    /// Exclude individuals related above this kinship value
    #[arg(long)]
    relatedness_cutoff: Option<f64>,

    /// Gower-normalise the kinship matrix first
    #[arg(long, default_value = "false")]
    gower: bool,

    /// Write results as JSON to this path
    #[arg(long)]
    output: Option<String>,
}

/// Estimate for one phenotype column.
#[derive(Debug, Serialize)]
struct PhenotypeResult {
    phenotype: String,
    #[serde(flatten)]
    estimate: H2Estimate,
}

#[derive(Debug, Serialize)]
struct H2Report {
    config: H2Config,
    n_samples: usize,
    relatedness_cutoff: Option<f64>,
    n_related_removed: usize,
    results: Vec<PhenotypeResult>,
}

pub fn run(args: H2Args) -> Result<()> {
    info!("=== LEAP heritability estimation ===");
    info!("Phenotype file: {}", args.pheno_file);
    info!("Kinship file: {}", args.kinship_file);
    info!("Prevalence: {}", args.prevalence);

    let pheno_cols: Vec<String> = if args.pheno_cols.is_empty() {
        Vec::new()
    } else {
        args.pheno_cols.split(',').map(|s| s.trim().to_string()).collect()
    };

    let table = parse_phenotype_file(
        Path::new(&args.pheno_file),
        &pheno_cols,
        &args.sample_id_col,
    )?;
    let kinship = read_kinship(Path::new(&args.kinship_file))?;

    // Shared samples in phenotype order, then drop incomplete rows.
    let alignment = align_samples(&table.sample_ids, &kinship.sample_ids)?;
    if alignment.is_empty() {
        bail!("No overlapping samples between phenotype and kinship files");
    }
    let table = table.subset(&alignment.primary);
    let kinship = kinship.subset(&alignment.secondary);

    let complete = complete_case_indices(&table);
    if complete.len() < table.n_samples() {
        info!(
            "Dropping {} samples with missing phenotype values",
            table.n_samples() - complete.len()
        );
    }
    let table = table.subset(&complete);
    let kinship = kinship.subset(&complete);
    let n = table.n_samples();
    if n < 2 {
        bail!("Need at least two samples with complete phenotypes, found {}", n);
    }
    info!("Analysing {} samples", n);

    let mut xxt = kinship.matrix;
    if args.gower {
        xxt = gower_normalize(&xxt)?;
        info!("Kinship matrix Gower-normalised");
    }

    let relatedness = if args.num_remove_pcs > 0 {
        info!("Computing eigen-decomposition of the kinship matrix");
        Relatedness::with_eigen(xxt)?
    } else {
        Relatedness::new(xxt)
    };

    let mask = args
        .relatedness_cutoff
        .map(|cutoff| unrelated_mask(&relatedness.xxt, cutoff));
    let n_related_removed = mask.as_ref().map_or(0, |m| n - m.n_retained());

    let config = H2Config::new(args.prevalence)
        .with_num_remove_pcs(args.num_remove_pcs)
        .with_h2coeff(args.h2coeff)
        .with_lowtail(args.lowtail);

    let results = table
        .columns
        .par_iter()
        .zip(table.values.par_iter())
        .map(|(name, phe)| -> Result<PhenotypeResult> {
            let estimate = calc_h2(phe, &relatedness, mask.as_ref(), &config)
                .with_context(|| format!("h2 estimation failed for phenotype '{}'", name))?;
            Ok(PhenotypeResult {
                phenotype: name.clone(),
                estimate,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    println!(
        "{:<20} {:>10} {:>12} {:<20} {:>10}",
        "phenotype", "h2", "raw", "estimator", "retained"
    );
    for r in &results {
        println!(
            "{:<20} {:>10.6} {:>12.6} {:<20} {:>10}",
            r.phenotype,
            r.estimate.h2,
            r.estimate.raw_estimate,
            format!("{:?}", r.estimate.estimator),
            r.estimate.n_retained
        );
        for w in &r.estimate.warnings {
            println!("  warning: {}", w);
        }
    }

    if let Some(path) = args.output {
        let report = H2Report {
            config,
            n_samples: n,
            relatedness_cutoff: args.relatedness_cutoff,
            n_related_removed,
            results,
        };
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write results to {}", path))?;
        info!("Results written to {}", path);
    }

    Ok(())
}
