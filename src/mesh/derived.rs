//! Lazily computed structures derived from the mesh topology.
//!
//! Each structure sits in its own [`Cached`] cell: the first reader after a
//! touch recomputes it while concurrent readers wait, and a touch drops all
//! of them at once. Per-region entries live in `DashMap`s so that readers of
//! different regions do not contend.

use std::sync::Arc;

use dashmap::DashMap;

use crate::algs::cuthill_mckee::cuthill_mckee;
use crate::algs::dual_graph::build_face_dual;
use crate::algs::threads::chunk_bounds;
use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::topology::cache::{Cached, InvalidateCache};
use crate::topology::point::{ConvexId, RegionId};
use crate::topology::region::MeshRegion;

type SharedRegion = Cached<Arc<MeshRegion>>;

/// Per-thread chunks of one region, each filled on demand.
#[derive(Debug)]
struct ThreadPartition {
    parts: Vec<SharedRegion>,
}

impl ThreadPartition {
    fn new(n: usize) -> Self {
        Self {
            parts: (0..n).map(|_| Cached::new("thread sub-region")).collect(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct DerivedCaches {
    cmk: Cached<Vec<ConvexId>>,
    mpi_region: Cached<MeshRegion>,
    mpi_sub: DashMap<RegionId, Arc<SharedRegion>>,
    thread_parts: DashMap<RegionId, Arc<ThreadPartition>>,
}

impl Default for DerivedCaches {
    fn default() -> Self {
        Self {
            cmk: Cached::new("Cuthill-McKee ordering"),
            mpi_region: Cached::new("MPI region"),
            mpi_sub: DashMap::new(),
            thread_parts: DashMap::new(),
        }
    }
}

impl InvalidateCache for DerivedCaches {
    fn invalidate_cache(&mut self) {
        self.cmk.invalidate_cache();
        self.mpi_region.invalidate_cache();
        self.mpi_sub.clear();
        self.thread_parts.clear();
    }
}

/// Which derived structures are currently computed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStatus {
    pub cuthill_mckee: bool,
    pub mpi_region: bool,
    /// Regions with a computed MPI sub-region.
    pub mpi_sub_regions: usize,
    /// Computed per-thread chunks, over all regions.
    pub thread_sub_regions: usize,
}

impl CacheStatus {
    pub fn is_empty(&self) -> bool {
        *self == CacheStatus::default()
    }
}

impl Mesh {
    /// Live convex ids in Cuthill–McKee order over face adjacency.
    pub fn cuthill_mckee_ordering(&self) -> &[ConvexId] {
        self.derived.cmk.get_or_init(|| {
            let cells: Vec<ConvexId> = self.convex_ids().collect();
            let graph = build_face_dual(self, &cells);
            cuthill_mckee(&graph).into_iter().map(|i| cells[i]).collect()
        })
    }

    /// Convexes owned by this process. Every convex when no partitioner is
    /// installed or there is a single process.
    pub fn mpi_region(&self) -> Result<&MeshRegion, MeshError> {
        self.derived
            .mpi_region
            .get_or_try_init(|| self.compute_mpi_region())
    }

    fn compute_mpi_region(&self) -> Result<MeshRegion, MeshError> {
        let size = self.comm.size();
        let Some(partitioner) = self.partitioner.as_ref().filter(|_| size > 1) else {
            return Ok(MeshRegion::all_convexes());
        };
        let rank = self.comm.rank();
        let cells: Vec<ConvexId> = self.convex_ids().collect();
        let graph = build_face_dual(self, &cells);
        let part = partitioner.partition(&graph, size)?;
        if part.len() != cells.len() || part.iter().any(|&p| p >= size) {
            return Err(MeshError::InternalConsistencyFault(format!(
                "partitioner returned {} labels for {} convexes over {size} parts",
                part.len(),
                cells.len()
            )));
        }
        Ok(MeshRegion::from_convexes(
            cells
                .iter()
                .zip(&part)
                .filter(|&(_, &p)| p == rank)
                .map(|(&cv, _)| cv),
        ))
    }

    /// Region `id` restricted to the convexes of [`mpi_region`](Self::mpi_region).
    /// Face entries are kept on owned convexes.
    pub fn mpi_sub_region(&self, id: RegionId) -> Result<Arc<MeshRegion>, MeshError> {
        let cell = self
            .derived
            .mpi_sub
            .entry(id)
            .or_insert_with(|| Arc::new(Cached::new("MPI sub-region")))
            .clone();
        cell.get_or_try_init(|| {
            let mut sub = self.resolved_region(id);
            let owned = self.mpi_region()?;
            if !owned.is_all() {
                sub.retain_convexes(|cv| owned.contains(cv));
            }
            Ok(Arc::new(sub))
        })
        .cloned()
    }

    /// Chunk `thread` of the MPI sub-region of `id`, split over the worker
    /// count of the installed thread distribution. Chunks are disjoint,
    /// cover the sub-region, and keep all faces of a convex together.
    pub fn thread_sub_region(&self, id: RegionId, thread: usize) -> Result<Arc<MeshRegion>, MeshError> {
        let n = self.threads.num_threads().max(1);
        if thread >= n {
            return Err(MeshError::PreconditionViolation(format!(
                "thread {thread} out of range for {n} threads"
            )));
        }
        let partition = self
            .derived
            .thread_parts
            .entry(id)
            .or_insert_with(|| Arc::new(ThreadPartition::new(n)))
            .clone();
        let Some(cell) = partition.parts.get(thread) else {
            return Err(MeshError::InternalConsistencyFault(format!(
                "thread partition of region {id} has {} parts, expected {n}",
                partition.parts.len()
            )));
        };
        cell.get_or_try_init(|| {
            let sub = self.mpi_sub_region(id)?;
            let cvs: Vec<ConvexId> = sub.convexes().collect();
            let mut chunk = MeshRegion::new();
            for &cv in &cvs[chunk_bounds(cvs.len(), n, thread)] {
                for f in sub.faces_of_convex(cv).iter() {
                    chunk.add(cv, f);
                }
            }
            Ok(Arc::new(chunk))
        })
        .cloned()
    }

    /// [`thread_sub_region`](Self::thread_sub_region) for the calling worker.
    pub fn thread_local_sub_region(&self, id: RegionId) -> Result<Arc<MeshRegion>, MeshError> {
        self.thread_sub_region(id, self.threads.current_thread())
    }

    pub fn cache_status(&self) -> CacheStatus {
        CacheStatus {
            cuthill_mckee: self.derived.cmk.is_valid(),
            mpi_region: self.derived.mpi_region.is_valid(),
            mpi_sub_regions: self
                .derived
                .mpi_sub
                .iter()
                .filter(|e| e.value().is_valid())
                .count(),
            thread_sub_regions: self
                .derived
                .thread_parts
                .iter()
                .map(|e| e.value().parts.iter().filter(|c| c.is_valid()).count())
                .sum(),
        }
    }
}
