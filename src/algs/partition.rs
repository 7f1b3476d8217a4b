//! Graph partitioners used to distribute convexes over processes.

use std::fmt::Debug;

use crate::algs::cuthill_mckee::cuthill_mckee;
use crate::algs::dual_graph::DualGraph;
use crate::algs::threads::chunk_bounds;
use crate::mesh_error::MeshError;

/// Splits the vertices of a dual graph into `nparts` parts.
pub trait GraphPartitioner: Send + Sync + Debug + 'static {
    /// `part[i]` in `0..nparts` for every vertex `i`.
    fn partition(&self, graph: &DualGraph, nparts: usize) -> Result<Vec<usize>, MeshError>;
}

/// Contiguous, balanced chunks of the Cuthill–McKee order. Always available
/// and deterministic; neighbouring convexes tend to land in the same part.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChunkPartitioner;

impl GraphPartitioner for ChunkPartitioner {
    fn partition(&self, graph: &DualGraph, nparts: usize) -> Result<Vec<usize>, MeshError> {
        check_nparts(nparts)?;
        let order = cuthill_mckee(graph);
        let mut part = vec![0; graph.len()];
        for k in 0..nparts {
            for &v in &order[chunk_bounds(order.len(), nparts, k)] {
                part[v] = k;
            }
        }
        Ok(part)
    }
}

pub(crate) fn check_nparts(nparts: usize) -> Result<(), MeshError> {
    if nparts == 0 {
        return Err(MeshError::PreconditionViolation(
            "cannot partition into 0 parts".into(),
        ));
    }
    Ok(())
}

/// Number of edges whose ends lie in different parts.
pub fn edge_cut(graph: &DualGraph, part: &[usize]) -> usize {
    (0..graph.len())
        .flat_map(|u| graph.neighbors(u).iter().map(move |&v| (u, v)))
        .filter(|&(u, v)| u < v && part[u] != part[v])
        .count()
}
