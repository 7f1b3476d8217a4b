//! METIS k-way partitioning of a dual graph.

#![cfg(feature = "metis-support")]

use metis::Idx;

use crate::algs::dual_graph::DualGraph;
use crate::algs::partition::{GraphPartitioner, check_nparts};
use crate::mesh_error::MeshError;

/// [`GraphPartitioner`] backed by `METIS_PartGraphKway`.
#[derive(Clone, Copy, Debug, Default)]
pub struct MetisPartitioner;

impl GraphPartitioner for MetisPartitioner {
    fn partition(&self, graph: &DualGraph, nparts: usize) -> Result<Vec<usize>, MeshError> {
        check_nparts(nparts)?;
        let n = graph.len();
        // METIS rejects the trivial cases
        if nparts == 1 || n == 0 {
            return Ok(vec![0; n]);
        }
        let to_idx = |u: usize| {
            Idx::try_from(u).map_err(|_| {
                MeshError::PreconditionViolation(format!("{u} does not fit a METIS index"))
            })
        };
        let xadj = graph.xadj.iter().map(|&u| to_idx(u)).collect::<Result<Vec<_>, _>>()?;
        let adjncy = graph
            .adjncy
            .iter()
            .map(|&v| to_idx(v))
            .collect::<Result<Vec<_>, _>>()?;
        let vwgt: Vec<Idx> = graph.vwgt.iter().map(|&w| w as Idx).collect();
        let mut part: Vec<Idx> = vec![0; n];

        let metis_err = |e: metis::Error| {
            MeshError::InternalConsistencyFault(format!("METIS failed: {e:?}"))
        };
        metis::Graph::new(1, to_idx(nparts)?, &xadj, &adjncy)
            .map_err(|e| MeshError::PreconditionViolation(format!("invalid dual graph: {e:?}")))?
            .set_vwgt(&vwgt)
            .part_kway(&mut part)
            .map_err(metis_err)?;

        Ok(part.into_iter().map(|p| p as usize).collect())
    }
}
