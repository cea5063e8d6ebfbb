//! TSV phenotype table parser.
//!
//! Reads tab/space-delimited files with a header line, one sample ID
//! column and any number of phenotype columns. Missing values become NaN.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

/// Phenotype columns for all samples in file order.
#[derive(Debug, Clone)]
pub struct PhenotypeTable {
    pub sample_ids: Vec<String>,
    /// Names of the phenotype columns.
    pub columns: Vec<String>,
    /// `values[c][i]`: column c, sample i (NaN for missing).
    pub values: Vec<Vec<f64>>,
}

impl PhenotypeTable {
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Values of the named column.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|idx| self.values[idx].as_slice())
    }

    /// Keep only the samples at `indices`, in that order.
    pub fn subset(&self, indices: &[usize]) -> PhenotypeTable {
        PhenotypeTable {
            sample_ids: indices.iter().map(|&i| self.sample_ids[i].clone()).collect(),
            columns: self.columns.clone(),
            values: self
                .values
                .iter()
                .map(|col| indices.iter().map(|&i| col[i]).collect())
                .collect(),
        }
    }
}

/// Parse a phenotype file.
///
/// # Arguments
/// - `path`: Path to the TSV or space-delimited file
/// - `pheno_cols`: Names of the phenotype columns; empty means every
///   column other than the sample ID column
/// - `sample_id_col`: Name of the sample ID column (e.g. "IID")
pub fn parse_phenotype_file(
    path: &Path,
    pheno_cols: &[String],
    sample_id_col: &str,
) -> Result<PhenotypeTable> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read phenotype file: {}", path.display()))?;

    let mut lines = contents.lines();
    let header_line = lines
        .next()
        .ok_or_else(|| anyhow::anyhow!("Empty phenotype file"))?;
    let headers = split_fields(header_line);

    let id_idx = headers
        .iter()
        .position(|&h| h == sample_id_col)
        .ok_or_else(|| {
            anyhow::anyhow!("Sample ID column '{}' not found in header", sample_id_col)
        })?;

    let columns: Vec<String> = if pheno_cols.is_empty() {
        headers
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != id_idx)
            .map(|(_, h)| h.to_string())
            .collect()
    } else {
        pheno_cols.to_vec()
    };
    if columns.is_empty() {
        bail!("No phenotype columns in {}", path.display());
    }

    let col_indices: Vec<usize> = columns
        .iter()
        .map(|name| {
            headers
                .iter()
                .position(|&h| h == name.as_str())
                .ok_or_else(|| anyhow::anyhow!("Phenotype column '{}' not found in header", name))
        })
        .collect::<Result<Vec<_>>>()?;
    let min_fields = col_indices.iter().copied().fold(id_idx, usize::max) + 1;

    let mut sample_ids = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); columns.len()];

    for (line_num, line) in lines.enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields = split_fields(line);
        if fields.len() < min_fields {
            bail!(
                "Line {} has too few fields (expected at least {})",
                line_num + 2,
                min_fields
            );
        }

        sample_ids.push(fields[id_idx].to_string());
        for (col, &ci) in values.iter_mut().zip(&col_indices) {
            col.push(parse_value(fields[ci]));
        }
    }

    info!(
        "Read {} samples and {} phenotype column(s) from {}",
        sample_ids.len(),
        columns.len(),
        path.display()
    );

    Ok(PhenotypeTable {
        sample_ids,
        columns,
        values,
    })
}

/// Split on tabs when present, otherwise on runs of whitespace.
fn split_fields(line: &str) -> Vec<&str> {
    if line.contains('\t') {
        line.split('\t').map(|s| s.trim()).collect()
    } else {
        line.split_whitespace().collect()
    }
}

/// Parse a string value to f64, treating NA/missing as NaN.
fn parse_value(s: &str) -> f64 {
    match s {
        "NA" | "na" | "Na" | "." | "" | "-" | "NaN" | "nan" => f64::NAN,
        _ => s.parse().unwrap_or(f64::NAN),
    }
}

/// Indices of samples with a finite value in every phenotype column.
pub fn complete_case_indices(table: &PhenotypeTable) -> Vec<usize> {
    (0..table.n_samples())
        .filter(|&i| table.values.iter().all(|col| col[i].is_finite()))
        .collect()
}
