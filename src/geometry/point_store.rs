//! Deduplicating storage of mesh node coordinates.
//!
//! Points live in an [`IndexTable`] and are additionally bucketed in a grid
//! spatial hash whose cell size is at least `eps`, so that a point within
//! `eps` (infinity norm) of a query always sits in one of the `3^d` cells
//! around the query's cell.

use hashbrown::HashMap;

use crate::mesh_error::MeshError;
use crate::topology::index_table::{BitVector, IndexTable};
use crate::topology::point::{ConvexId, PointId};

/// A stored point: coordinates plus the convexes that reference it.
#[derive(Clone, Debug, PartialEq)]
pub struct PointRecord {
    pub(crate) coords: Vec<f64>,
    pub(crate) convexes: Vec<ConvexId>,
}

impl PointRecord {
    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    /// Live convexes using this point, in attachment order.
    pub fn convexes(&self) -> &[ConvexId] {
        &self.convexes
    }
}

/// Point storage with approximate-equality merging.
#[derive(Clone, Debug)]
pub struct PointStore {
    table: IndexTable<PointRecord>,
    grid: HashMap<Vec<i64>, Vec<PointId>>,
    dim: Option<usize>,
    eps: f64,
    cell: f64,
}

impl PointStore {
    pub fn new(dim: Option<usize>, eps: f64) -> Self {
        let eps = if eps.is_finite() && eps > 0.0 { eps } else { 0.0 };
        Self {
            table: IndexTable::new(),
            grid: HashMap::new(),
            dim,
            eps,
            cell: if eps > 0.0 { eps } else { 1.0 },
        }
    }

    /// Ambient dimension, once known.
    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    pub fn eps(&self) -> f64 {
        self.eps
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn index(&self) -> &BitVector {
        self.table.index()
    }

    pub fn ids(&self) -> impl Iterator<Item = PointId> + '_ {
        self.table.ids().map(PointId::new)
    }

    pub fn contains(&self, id: PointId) -> bool {
        self.table.contains(id.get())
    }

    pub fn record(&self, id: PointId) -> Option<&PointRecord> {
        self.table.get(id.get())
    }

    pub fn coords(&self, id: PointId) -> Option<&[f64]> {
        self.record(id).map(PointRecord::coords)
    }

    /// Inserts `coords`, or returns an existing point within `eps` when
    /// `allow_merge` is set.
    pub fn add(&mut self, coords: &[f64], allow_merge: bool) -> Result<PointId, MeshError> {
        self.check_coords(coords)?;
        if allow_merge {
            if let Some(id) = self.search(coords) {
                return Ok(id);
            }
        }
        let id = PointId::new(self.table.add(PointRecord {
            coords: coords.to_vec(),
            convexes: Vec::new(),
        }));
        self.grid_insert(id, coords);
        Ok(id)
    }

    /// Places a point at an explicit id (file reader).
    pub(crate) fn insert_at(&mut self, id: PointId, coords: &[f64]) -> Result<(), MeshError> {
        self.check_coords(coords)?;
        if self.contains(id) {
            return Err(MeshError::PreconditionViolation(format!(
                "point {id} defined twice"
            )));
        }
        self.table.insert_at(
            id.get(),
            PointRecord {
                coords: coords.to_vec(),
                convexes: Vec::new(),
            },
        );
        self.grid_insert(id, coords);
        Ok(())
    }

    /// Lowest-numbered live point within `eps` of `coords`.
    ///
    /// Walks the `3^d` cells around the query, or the occupied cells when
    /// there are fewer of those.
    pub fn search(&self, coords: &[f64]) -> Option<PointId> {
        if Some(coords.len()) != self.dim {
            return None;
        }
        let base = self.key(coords);
        let d = base.len();
        let mut best: Option<PointId> = None;
        let mut visit = |bucket: &[PointId]| {
            for &id in bucket {
                if best.is_some_and(|b| b <= id) {
                    continue;
                }
                let Some(p) = self.coords(id) else {
                    continue;
                };
                if inf_distance(p, coords) <= self.eps {
                    best = Some(id);
                }
            }
        };
        let neighbours = u32::try_from(d).ok().and_then(|e| 3usize.checked_pow(e));
        match neighbours {
            Some(n) if n <= self.grid.len() => {
                let mut key = base.clone();
                for code in 0..n {
                    let mut c = code;
                    for j in 0..d {
                        key[j] = base[j].saturating_add((c % 3) as i64 - 1);
                        c /= 3;
                    }
                    if let Some(bucket) = self.grid.get(&key) {
                        visit(bucket);
                    }
                }
            }
            _ => {
                for (key, bucket) in &self.grid {
                    let adjacent = key
                        .iter()
                        .zip(&base)
                        .all(|(k, b)| k.abs_diff(*b) <= 1);
                    if adjacent {
                        visit(bucket);
                    }
                }
            }
        }
        best
    }

    /// Frees `id`; fails while a convex still references it.
    pub fn remove(&mut self, id: PointId) -> Result<Vec<f64>, MeshError> {
        let rec = self
            .record(id)
            .ok_or_else(|| MeshError::point_not_found(id.get()))?;
        if let Some(cv) = rec.convexes.first() {
            return Err(MeshError::PreconditionViolation(format!(
                "point {id} is still used by convex {cv}"
            )));
        }
        let coords = rec.coords.clone();
        self.grid_remove(id, &coords);
        self.table.remove(id.get());
        Ok(coords)
    }

    /// Exchanges the payloads of `i` and `j`. Convex point lists are
    /// rewritten by the caller.
    pub(crate) fn swap(&mut self, i: PointId, j: PointId) {
        if i == j {
            return;
        }
        for id in [i, j] {
            if let Some(c) = self.coords(id).map(<[f64]>::to_vec) {
                self.grid_remove(id, &c);
            }
        }
        self.table.swap(i.get(), j.get());
        for id in [i, j] {
            if let Some(c) = self.coords(id).map(<[f64]>::to_vec) {
                self.grid_insert(id, &c);
            }
        }
    }

    pub(crate) fn attach(&mut self, id: PointId, cv: ConvexId) {
        if let Some(rec) = self.table.get_mut(id.get()) {
            rec.convexes.push(cv);
        }
    }

    /// Drops `cv` from the incidence of `id`, returning where it stood.
    pub(crate) fn detach(&mut self, id: PointId, cv: ConvexId) -> Option<usize> {
        let rec = self.table.get_mut(id.get())?;
        let pos = rec.convexes.iter().position(|&c| c == cv)?;
        rec.convexes.remove(pos);
        Some(pos)
    }

    /// Undoes a [`detach`](Self::detach).
    pub(crate) fn attach_at(&mut self, id: PointId, cv: ConvexId, pos: usize) {
        if let Some(rec) = self.table.get_mut(id.get()) {
            let pos = pos.min(rec.convexes.len());
            rec.convexes.insert(pos, cv);
        }
    }

    /// Renames convex `a` to `b` and `b` to `a` in the incidence of `id`.
    pub(crate) fn rename_convex(&mut self, id: PointId, a: ConvexId, b: ConvexId) {
        if let Some(rec) = self.table.get_mut(id.get()) {
            for c in rec.convexes.iter_mut() {
                if *c == a {
                    *c = b;
                } else if *c == b {
                    *c = a;
                }
            }
        }
    }

    pub(crate) fn compaction_moves(&self) -> Vec<(PointId, PointId)> {
        self.table
            .compaction_moves()
            .into_iter()
            .map(|(a, b)| (PointId::new(a), PointId::new(b)))
            .collect()
    }

    /// Applies `f` to every coordinate vector, then rebuilds the hash.
    pub(crate) fn map_coords(&mut self, mut f: impl FnMut(&mut [f64])) {
        let ids: Vec<usize> = self.table.ids().collect();
        for i in ids {
            if let Some(rec) = self.table.get_mut(i) {
                f(&mut rec.coords);
            }
        }
        self.rebuild_grid();
    }

    fn rebuild_grid(&mut self) {
        self.grid.clear();
        let entries: Vec<(PointId, Vec<f64>)> = self
            .table
            .iter()
            .map(|(i, r)| (PointId::new(i), r.coords.clone()))
            .collect();
        for (id, c) in entries {
            self.grid_insert(id, &c);
        }
    }

    /// Forgets a dimension fixed by points that have since been dropped.
    pub(crate) fn reset_dim(&mut self, dim: Option<usize>) {
        if dim.is_some() || self.table.is_empty() {
            self.dim = dim;
        }
    }

    pub(crate) fn clear(&mut self, keep_dim: Option<usize>) {
        self.table.clear();
        self.grid.clear();
        self.dim = keep_dim;
    }

    fn check_coords(&mut self, coords: &[f64]) -> Result<(), MeshError> {
        if coords.is_empty() || coords.iter().any(|c| !c.is_finite()) {
            return Err(MeshError::PreconditionViolation(format!(
                "invalid point coordinates {coords:?}"
            )));
        }
        match self.dim {
            Some(d) if d != coords.len() => Err(MeshError::PreconditionViolation(format!(
                "point of dimension {} in a mesh of dimension {d}",
                coords.len()
            ))),
            Some(_) => Ok(()),
            None => {
                self.dim = Some(coords.len());
                Ok(())
            }
        }
    }

    fn key(&self, coords: &[f64]) -> Vec<i64> {
        // `as` saturates, which only merges far-away cells
        coords
            .iter()
            .map(|&x| (x / self.cell).floor() as i64)
            .collect()
    }

    fn grid_insert(&mut self, id: PointId, coords: &[f64]) {
        let key = self.key(coords);
        self.grid.entry(key).or_default().push(id);
    }

    fn grid_remove(&mut self, id: PointId, coords: &[f64]) {
        let key = self.key(coords);
        if let Some(bucket) = self.grid.get_mut(&key) {
            bucket.retain(|&p| p != id);
            if bucket.is_empty() {
                self.grid.remove(&key);
            }
        }
    }
}

/// Infinity-norm distance.
pub fn inf_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}
