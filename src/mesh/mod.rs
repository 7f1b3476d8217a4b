//! The [`Mesh`]: points, convexes and regions, with change notification.
//!
//! Every mutating entry point changes the stores, broadcasts the matching
//! [`MeshMessage`] to the subscribed receivers, then *touches* the mesh: the
//! version is bumped, every derived cache is dropped and the registered
//! [`ContextDependent`]s are told. Read entry points never change the
//! stores; they may fill a lazily computed cache.
//!
//! Mutation needs `&mut Mesh`, so there is a single writer; reads and cache
//! fills go through `&Mesh` and may run on several threads at once.

pub mod config;
pub mod convexes;
pub mod derived;
pub mod regions;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use static_assertions::assert_impl_all;

use crate::algs::communicator::{Communicator, NoComm};
use crate::algs::partition::GraphPartitioner;
use crate::algs::threads::{SingleThread, ThreadDistribution};
use crate::debug_invariants::DebugInvariants;
use crate::geometry::point_store::{PointRecord, PointStore};
use crate::geometry::transform::{GeoTransPrecomp, GeometricTransformation};
use crate::mesh_error::MeshError;
use crate::topology::cache::InvalidateCache;
use crate::topology::index_table::BitVector;
use crate::topology::notify::{
    ContextDependent, DependencyId, DependencyList, MeshMessage, MeshReceiver, Notifier,
    SubscriptionId,
};
use crate::topology::point::{ConvexId, PointId};
use crate::topology::region::RegionTable;

pub use config::MeshConfig;
pub use convexes::{ConvexRecord, ConvexStore};
pub use derived::CacheStatus;

static NEXT_UID: AtomicU64 = AtomicU64::new(1);

/// A finite-element mesh.
#[derive(Debug)]
pub struct Mesh {
    uid: u64,
    config: MeshConfig,
    pub(crate) points: PointStore,
    pub(crate) convexes: ConvexStore,
    pub(crate) regions: RegionTable,
    notifier: Notifier,
    dependents: DependencyList,
    pub(crate) derived: derived::DerivedCaches,
    precomp: DashMap<GeometricTransformation, Arc<GeoTransPrecomp>>,
    version: u64,
    pub(crate) partitioner: Option<Arc<dyn GraphPartitioner>>,
    pub(crate) comm: Arc<dyn Communicator>,
    pub(crate) threads: Arc<dyn ThreadDistribution>,
}

assert_impl_all!(Mesh: Send, Sync);

impl Default for Mesh {
    fn default() -> Self {
        Self::with_config(MeshConfig::default())
    }
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MeshConfig) -> Self {
        Self {
            uid: NEXT_UID.fetch_add(1, Ordering::Relaxed),
            points: PointStore::new(config.dim, config.eps),
            config,
            convexes: ConvexStore::default(),
            regions: RegionTable::new(),
            notifier: Notifier::default(),
            dependents: DependencyList::default(),
            derived: derived::DerivedCaches::default(),
            precomp: DashMap::new(),
            version: 0,
            partitioner: None,
            comm: Arc::new(NoComm),
            threads: Arc::new(SingleThread),
        }
    }

    /// Process-unique identity of this mesh object.
    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    /// Number of touches so far; changes on every structural mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Ambient dimension, `None` until fixed by the config or a first point.
    pub fn dim(&self) -> Option<usize> {
        self.points.dim()
    }

    pub fn eps(&self) -> f64 {
        self.points.eps()
    }

    // ---- points ----

    pub fn nb_points(&self) -> usize {
        self.points.len()
    }

    pub fn points_index(&self) -> &BitVector {
        self.points.index()
    }

    pub fn point_ids(&self) -> impl Iterator<Item = PointId> + '_ {
        self.points.ids()
    }

    pub fn is_point_valid(&self, p: PointId) -> bool {
        self.points.contains(p)
    }

    pub fn point(&self, p: PointId) -> Option<&[f64]> {
        self.points.coords(p)
    }

    pub fn point_record(&self, p: PointId) -> Option<&PointRecord> {
        self.points.record(p)
    }

    pub fn point_store(&self) -> &PointStore {
        &self.points
    }

    /// Inserts a point, returning an existing one within `eps` when the
    /// config allows merging. A new isolated point does not touch the mesh.
    pub fn add_point(&mut self, coords: &[f64]) -> Result<PointId, MeshError> {
        self.points.add(coords, self.config.merge_points)
    }

    /// Inserts a point with a fresh id, whatever lies nearby.
    pub fn add_point_unmerged(&mut self, coords: &[f64]) -> Result<PointId, MeshError> {
        self.points.add(coords, false)
    }

    /// Lowest live point within `eps` of `coords`.
    pub fn search_point(&self, coords: &[f64]) -> Option<PointId> {
        self.points.search(coords)
    }

    /// Removes an unused point.
    pub fn remove_point(&mut self, p: PointId) -> Result<(), MeshError> {
        self.points.remove(p)?;
        self.touch();
        Ok(())
    }

    /// Exchanges the ids of two points (one may be free), rewriting the
    /// point lists of every incident convex.
    pub fn swap_points(&mut self, a: PointId, b: PointId) -> Result<(), MeshError> {
        if a == b {
            return if self.points.contains(a) {
                Ok(())
            } else {
                Err(MeshError::point_not_found(a.get()))
            };
        }
        if !self.points.contains(a) && !self.points.contains(b) {
            return Err(MeshError::point_not_found(a.get()));
        }
        let mut incident: Vec<ConvexId> = [a, b]
            .iter()
            .filter_map(|&p| self.points.record(p))
            .flat_map(|r| r.convexes().iter().copied())
            .collect();
        incident.sort_unstable();
        incident.dedup();
        for cv in incident {
            if let Some(pts) = self.convexes.points_mut(cv) {
                for p in pts.iter_mut() {
                    if *p == a {
                        *p = b;
                    } else if *p == b {
                        *p = a;
                    }
                }
            }
        }
        self.points.swap(a, b);
        self.touch();
        Ok(())
    }

    // ---- notification ----

    /// Registers `receiver` for structural change messages. The mesh keeps
    /// only a weak reference.
    pub fn subscribe<R: MeshReceiver + 'static>(&mut self, receiver: &Arc<R>) -> SubscriptionId {
        self.notifier.subscribe(receiver)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    pub fn nb_receivers(&self) -> usize {
        self.notifier.len()
    }

    /// Registers an object to be told about every touch.
    pub fn add_dependent<D: ContextDependent + 'static>(&mut self, dep: &Arc<D>) -> DependencyId {
        self.dependents.add(dep)
    }

    pub fn remove_dependent(&mut self, id: DependencyId) -> bool {
        self.dependents.remove(id)
    }

    /// Marks every derived structure stale and signals the dependents.
    pub(crate) fn touch(&mut self) {
        self.version += 1;
        self.derived.invalidate_cache();
        log::trace!("mesh {} touched, version {}", self.uid, self.version);
        self.dependents.notify(self.version);
    }

    pub(crate) fn precomp(&self, gt: GeometricTransformation) -> Arc<GeoTransPrecomp> {
        self.precomp
            .entry(gt)
            .or_insert_with(|| Arc::new(GeoTransPrecomp::new(gt)))
            .clone()
    }

    // ---- whole-mesh operations ----

    /// Drops every point, convex and region, then broadcasts `Clear`. On a
    /// receiver fault the content is put back.
    pub fn clear(&mut self) -> Result<(), MeshError> {
        let points = std::mem::replace(
            &mut self.points,
            PointStore::new(self.config.dim, self.config.eps),
        );
        let convexes = std::mem::take(&mut self.convexes);
        let regions = std::mem::take(&mut self.regions);
        if let Err(e) = self.notifier.broadcast(&MeshMessage::Clear) {
            self.points = points;
            self.convexes = convexes;
            self.regions = regions;
            return Err(e);
        }
        self.touch();
        Ok(())
    }

    /// Replaces the content with a copy of `other`, ids included. Receivers
    /// see `Clear`, then one `AddConvex` per copied convex; subscriptions,
    /// dependents and capabilities of `self` are kept.
    pub fn copy_from(&mut self, other: &Mesh) -> Result<(), MeshError> {
        self.config = other.config.clone();
        self.replace_content(
            other.points.clone(),
            other.convexes.clone(),
            other.regions.clone(),
        )
    }

    /// Clears the mesh, installs the given stores and announces every convex.
    /// A receiver fault after `Clear` leaves the mesh empty.
    pub(crate) fn replace_content(
        &mut self,
        points: PointStore,
        convexes: ConvexStore,
        regions: RegionTable,
    ) -> Result<(), MeshError> {
        self.clear()?;
        self.points = points;
        self.convexes = convexes;
        self.regions = regions;
        let ids: Vec<ConvexId> = self.convexes.ids().collect();
        for cv in ids {
            if let Err(e) = self.notifier.broadcast(&MeshMessage::AddConvex(cv)) {
                self.points = PointStore::new(self.config.dim, self.config.eps);
                self.convexes.clear();
                self.regions.clear();
                self.touch();
                return Err(e);
            }
        }
        self.touch();
        Ok(())
    }

    // ---- capabilities ----

    /// Installs the graph partitioner and process identity used by
    /// [`mpi_region`](Self::mpi_region).
    pub fn set_partitioning<P, C>(&mut self, partitioner: P, comm: C)
    where
        P: GraphPartitioner,
        C: Communicator,
    {
        self.partitioner = Some(Arc::new(partitioner));
        self.comm = Arc::new(comm);
        self.derived.invalidate_cache();
    }

    /// Back to "every convex belongs to this process".
    pub fn clear_partitioning(&mut self) {
        self.partitioner = None;
        self.comm = Arc::new(NoComm);
        self.derived.invalidate_cache();
    }

    pub fn set_thread_distribution<T: ThreadDistribution>(&mut self, threads: T) {
        self.threads = Arc::new(threads);
        self.derived.invalidate_cache();
    }

    pub fn communicator(&self) -> &dyn Communicator {
        self.comm.as_ref()
    }

    pub fn thread_distribution(&self) -> &dyn ThreadDistribution {
        self.threads.as_ref()
    }
}

impl Drop for Mesh {
    fn drop(&mut self) {
        let this: &Mesh = self;
        if let Err(e) = this.notifier.broadcast(&MeshMessage::Delete(this)) {
            log::error!("receiver fault while deleting mesh {}: {e}", this.uid);
        }
    }
}

impl DebugInvariants for Mesh {
    fn validate_invariants(&self) -> Result<(), MeshError> {
        let fault = |msg: String| Err(MeshError::InternalConsistencyFault(msg));
        for (cv, rec) in self.convexes.iter() {
            if rec.points.len() != rec.structure().nb_points() {
                return fault(format!("convex {cv} has {} points", rec.points.len()));
            }
            for &p in &rec.points {
                let Some(prec) = self.points.record(p) else {
                    return fault(format!("convex {cv} references dead point {p}"));
                };
                if !prec.convexes().contains(&cv) {
                    return fault(format!("point {p} does not list its convex {cv}"));
                }
            }
        }
        for p in self.points.ids() {
            let Some(prec) = self.points.record(p) else {
                continue;
            };
            for &cv in prec.convexes() {
                let uses = self
                    .convexes
                    .get(cv)
                    .is_some_and(|r| r.points.contains(&p));
                if !uses {
                    return fault(format!("point {p} lists convex {cv} which does not use it"));
                }
            }
        }
        for (rid, region) in self.regions.iter() {
            for (cv, mask) in region.masks() {
                let Some(rec) = self.convexes.get(cv) else {
                    return fault(format!("region {rid} contains dead convex {cv}"));
                };
                let nb = rec.structure().nb_faces();
                if mask.iter().filter_map(|f| f.local()).any(|f| f >= nb) {
                    return fault(format!("region {rid} names a missing face of convex {cv}"));
                }
            }
        }
        Ok(())
    }
}
