//! Sample ID matching between the phenotype table and the kinship matrix.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

/// Samples present in both sources, in the order of the primary source.
#[derive(Debug, Clone)]
pub struct SampleAlignment {
    pub ids: Vec<String>,
    /// Index of each shared sample in the primary source.
    pub primary: Vec<usize>,
    /// Index of each shared sample in the secondary source.
    pub secondary: Vec<usize>,
}

impl SampleAlignment {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Match `primary` against `secondary` by sample ID.
///
/// Duplicate IDs within either source are an error, since they make
/// the mapping ambiguous.
pub fn align_samples(primary: &[String], secondary: &[String]) -> Result<SampleAlignment> {
    index_ids(primary).context("duplicate sample ID in phenotype file")?;
    let secondary_map = index_ids(secondary).context("duplicate sample ID in kinship file")?;

    let mut ids = Vec::new();
    let mut primary_idx = Vec::new();
    let mut secondary_idx = Vec::new();
    for (i, id) in primary.iter().enumerate() {
        if let Some(&j) = secondary_map.get(id.as_str()) {
            ids.push(id.clone());
            primary_idx.push(i);
            secondary_idx.push(j);
        }
    }

    info!(
        "{} samples shared ({} phenotype-only, {} kinship-only)",
        ids.len(),
        primary.len() - ids.len(),
        secondary.len() - ids.len()
    );

    Ok(SampleAlignment {
        ids,
        primary: primary_idx,
        secondary: secondary_idx,
    })
}

fn index_ids(ids: &[String]) -> Result<HashMap<&str, usize>> {
    let mut map = HashMap::with_capacity(ids.len());
    for (i, id) in ids.iter().enumerate() {
        if map.insert(id.as_str(), i).is_some() {
            bail!("sample ID '{}' appears more than once", id);
        }
    }
    Ok(map)
}

/// Reorder a vector according to the given index mapping.
pub fn reorder_vec<T: Clone>(data: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| data[i].clone()).collect()
}

/// Write one sample ID per line.
pub fn write_id_list(path: &Path, ids: &[String]) -> Result<()> {
    use std::io::Write;

    let mut f = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for id in ids {
        writeln!(f, "{}", id)?;
    }
    Ok(())
}
