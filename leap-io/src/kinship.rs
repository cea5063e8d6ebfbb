//! Dense kinship matrix reader/writer.
//!
//! Plain text, tab or whitespace separated:
//! - first non-comment line: the n sample IDs
//! - followed by n rows of n values
//!
//! Lines starting with `#` are skipped.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use leap_linalg::DenseMatrix;

/// A kinship matrix with the sample IDs labelling its rows and columns.
#[derive(Debug, Clone)]
pub struct KinshipMatrix {
    pub sample_ids: Vec<String>,
    pub matrix: DenseMatrix,
}

impl KinshipMatrix {
    /// Restrict to the samples at `indices`, in that order.
    pub fn subset(&self, indices: &[usize]) -> KinshipMatrix {
        KinshipMatrix {
            sample_ids: indices.iter().map(|&i| self.sample_ids[i].clone()).collect(),
            matrix: self.matrix.principal_submatrix(indices),
        }
    }
}

/// Read a dense kinship matrix.
pub fn read_kinship(path: &Path) -> Result<KinshipMatrix> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read kinship file: {}", path.display()))?;

    let mut lines = contents
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'));

    let (_, header) = lines
        .next()
        .ok_or_else(|| anyhow::anyhow!("Empty kinship file: {}", path.display()))?;
    let sample_ids: Vec<String> = header.split_whitespace().map(String::from).collect();
    let n = sample_ids.len();

    let mut data = Vec::with_capacity(n * n);
    let mut n_rows = 0;
    for (line_num, line) in lines {
        if n_rows == n {
            bail!("Line {}: more than {} matrix rows", line_num, n);
        }
        let before = data.len();
        for field in line.split_whitespace() {
            let v: f64 = field
                .parse()
                .with_context(|| format!("Line {}: invalid kinship value '{}'", line_num, field))?;
            data.push(v);
        }
        if data.len() - before != n {
            bail!(
                "Line {}: expected {} values, found {}",
                line_num,
                n,
                data.len() - before
            );
        }
        n_rows += 1;
    }
    if n_rows != n {
        bail!("Expected {} matrix rows, found {}", n, n_rows);
    }

    let matrix = DenseMatrix::from_row_major(n, n, &data);
    if !matrix.is_symmetric(1e-8) {
        warn!("Kinship matrix in {} is not symmetric", path.display());
    }
    info!("Read {}x{} kinship matrix from {}", n, n, path.display());

    Ok(KinshipMatrix { sample_ids, matrix })
}

/// Write a dense kinship matrix in the format read by [`read_kinship`].
pub fn write_kinship(kinship: &KinshipMatrix, path: &Path) -> Result<()> {
    use std::io::{BufWriter, Write};

    let n = kinship.sample_ids.len();
    if kinship.matrix.nrows() != n || kinship.matrix.ncols() != n {
        bail!(
            "Kinship matrix is {}x{} but has {} sample IDs",
            kinship.matrix.nrows(),
            kinship.matrix.ncols(),
            n
        );
    }

    let f = std::fs::File::create(path)
        .with_context(|| format!("Failed to create kinship file: {}", path.display()))?;
    let mut w = BufWriter::new(f);
    writeln!(w, "{}", kinship.sample_ids.join("\t"))?;
    for i in 0..n {
        let row: Vec<String> = (0..n)
            .map(|j| format!("{:.10}", kinship.matrix.get(i, j)))
            .collect();
        writeln!(w, "{}", row.join("\t"))?;
    }
    w.flush()?;
    Ok(())
}
