//! Removal of closely related individuals.
//!
//! Pairs whose kinship exceeds a cutoff form the edges of a graph; a
//! greedy vertex cut removes the individual with the most remaining
//! edges until no edge is left. The survivors are the retained set.

use leap_linalg::DenseMatrix;
use tracing::{debug, info};

use super::RetainedMask;

/// Indices (ascending) of the individuals removed by the greedy vertex cut.
///
/// Ties on degree go to the lowest index. A NaN or infinite cutoff
/// removes nobody.
pub fn vertex_cut(k: &DenseMatrix, cutoff: f64) -> Vec<usize> {
    let n = k.nrows();
    if !cutoff.is_finite() {
        return Vec::new();
    }

    let mut neighbours: Vec<Vec<usize>> = vec![Vec::new(); n];
    for i in 0..n {
        for j in (i + 1)..n {
            if k.get(i, j) > cutoff {
                neighbours[i].push(j);
                neighbours[j].push(i);
            }
        }
    }

    let mut degree: Vec<usize> = neighbours.iter().map(|v| v.len()).collect();
    let mut alive = vec![true; n];
    let mut removed = Vec::new();

    loop {
        let mut best: Option<usize> = None;
        for i in 0..n {
            if alive[i] && degree[i] > 0 && best.map_or(true, |b| degree[i] > degree[b]) {
                best = Some(i);
            }
        }
        let Some(victim) = best else { break };

        alive[victim] = false;
        removed.push(victim);
        for &nb in &neighbours[victim] {
            if alive[nb] {
                degree[nb] -= 1;
            }
        }
        debug!("Vertex cut removed individual {} ({} related pairs)", victim, degree[victim]);
        degree[victim] = 0;
    }

    removed.sort_unstable();
    removed
}

/// Retained mask after removing related individuals at `cutoff`.
pub fn unrelated_mask(k: &DenseMatrix, cutoff: f64) -> RetainedMask {
    let removed = vertex_cut(k, cutoff);
    info!(
        "Marking {} individuals to be removed due to high relatedness",
        removed.len()
    );
    RetainedMask::from_removed(k.nrows(), &removed)
}
