//! Convex storage and the convex-level entry points of [`Mesh`].

use itertools::Itertools;

use crate::geometry::transform::GeometricTransformation;
use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::topology::convex_structure::ConvexStructure;
use crate::topology::index_table::{BitVector, IndexTable};
use crate::topology::notify::MeshMessage;
use crate::topology::point::{ConvexId, FaceId, PointId};
use crate::topology::region::MeshRegion;

/// A stored convex.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvexRecord {
    pub(crate) gt: GeometricTransformation,
    pub(crate) points: Vec<PointId>,
}

impl ConvexRecord {
    #[inline]
    pub fn trans(&self) -> GeometricTransformation {
        self.gt
    }

    #[inline]
    pub fn structure(&self) -> ConvexStructure {
        self.gt.structure()
    }

    /// Point ids in reference-node order.
    #[inline]
    pub fn points(&self) -> &[PointId] {
        &self.points
    }
}

/// Convex records keyed by [`ConvexId`].
#[derive(Clone, Debug, Default)]
pub struct ConvexStore {
    table: IndexTable<ConvexRecord>,
}

impl ConvexStore {
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn index(&self) -> &BitVector {
        self.table.index()
    }

    pub fn ids(&self) -> impl Iterator<Item = ConvexId> + '_ {
        self.table.ids().map(ConvexId::new)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConvexId, &ConvexRecord)> + '_ {
        self.table.iter().map(|(i, r)| (ConvexId::new(i), r))
    }

    pub fn contains(&self, cv: ConvexId) -> bool {
        self.table.contains(cv.get())
    }

    pub fn get(&self, cv: ConvexId) -> Option<&ConvexRecord> {
        self.table.get(cv.get())
    }

    pub(crate) fn add(&mut self, rec: ConvexRecord) -> ConvexId {
        ConvexId::new(self.table.add(rec))
    }

    pub(crate) fn insert_at(&mut self, cv: ConvexId, rec: ConvexRecord) {
        self.table.insert_at(cv.get(), rec);
    }

    pub(crate) fn remove(&mut self, cv: ConvexId) -> Option<ConvexRecord> {
        self.table.remove(cv.get())
    }

    pub(crate) fn points_mut(&mut self, cv: ConvexId) -> Option<&mut Vec<PointId>> {
        self.table.get_mut(cv.get()).map(|r| &mut r.points)
    }

    pub(crate) fn swap(&mut self, a: ConvexId, b: ConvexId) {
        self.table.swap(a.get(), b.get());
    }

    pub(crate) fn compaction_moves(&self) -> Vec<(ConvexId, ConvexId)> {
        self.table
            .compaction_moves()
            .into_iter()
            .map(|(a, b)| (ConvexId::new(a), ConvexId::new(b)))
            .collect()
    }

    pub(crate) fn clear(&mut self) {
        self.table.clear();
    }
}

impl Mesh {
    /// Adds a convex of transformation `gt` on `pts`, or finds the existing
    /// one with the same structure and ordered points.
    ///
    /// Returns `(id, already_present)`. A duplicate is neither broadcast nor
    /// touched. If a receiver rejects `AddConvex`, the convex is taken back
    /// out and the fault returned.
    pub fn add_convex(
        &mut self,
        gt: GeometricTransformation,
        pts: &[PointId],
    ) -> Result<(ConvexId, bool), MeshError> {
        self.check_convex_points(gt, pts)?;
        if let Some(cv) = self.find_convex(gt.structure(), pts) {
            return Ok((cv, true));
        }
        let cv = self.convexes.add(ConvexRecord {
            gt,
            points: pts.to_vec(),
        });
        for &p in pts {
            self.points.attach(p, cv);
        }
        if let Err(e) = self.notifier.broadcast(&MeshMessage::AddConvex(cv)) {
            for &p in pts {
                self.points.detach(p, cv);
            }
            self.convexes.remove(cv);
            return Err(e);
        }
        self.touch();
        Ok((cv, false))
    }

    /// Inserts each coordinate vector (merging within `eps`), then adds the
    /// convex on the resulting points.
    ///
    /// On any error the points created by this call are removed again and
    /// the mesh dimension is restored, so a failed call leaves no trace.
    pub fn add_convex_by_points(
        &mut self,
        gt: GeometricTransformation,
        coords: &[&[f64]],
    ) -> Result<(ConvexId, bool), MeshError> {
        if coords.len() != gt.nb_points() {
            return Err(point_count_mismatch(gt, coords.len()));
        }
        let ambient = self.dim().or_else(|| coords.first().map(|c| c.len()));
        if let Some(d) = ambient {
            if gt.dim() > d {
                return Err(MeshError::PreconditionViolation(format!(
                    "{gt} does not fit a mesh of dimension {d}"
                )));
            }
        }

        let dim_before = self.points.dim();
        let mut fresh = Vec::new();
        let mut pts = Vec::with_capacity(coords.len());
        let mut outcome = Ok(());
        for c in coords {
            let before = self.points.len();
            match self.add_point(c) {
                Ok(p) => {
                    if self.points.len() > before {
                        fresh.push(p);
                    }
                    pts.push(p);
                }
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }
        let outcome = outcome.and_then(|()| self.add_convex(gt, &pts));
        if outcome.is_err() {
            for &p in fresh.iter().rev() {
                if let Err(e) = self.points.remove(p) {
                    log::warn!("could not drop point {p} after a failed insertion: {e}");
                }
            }
            self.points.reset_dim(dim_before);
        }
        outcome
    }

    pub fn add_segment(&mut self, a: PointId, b: PointId) -> Result<ConvexId, MeshError> {
        self.add_simplex(1, &[a, b])
    }

    pub fn add_triangle(&mut self, a: PointId, b: PointId, c: PointId) -> Result<ConvexId, MeshError> {
        self.add_simplex(2, &[a, b, c])
    }

    pub fn add_tetrahedron(
        &mut self,
        a: PointId,
        b: PointId,
        c: PointId,
        d: PointId,
    ) -> Result<ConvexId, MeshError> {
        self.add_simplex(3, &[a, b, c, d])
    }

    /// Simplex of dimension `dim` on `dim + 1` points.
    pub fn add_simplex(&mut self, dim: usize, pts: &[PointId]) -> Result<ConvexId, MeshError> {
        Ok(self.add_convex(GeometricTransformation::simplex(dim)?, pts)?.0)
    }

    /// Parallelepiped of dimension `dim` on `2^dim` points, in lexicographic
    /// reference-node order (bit `j` of the node index is coordinate `j`).
    pub fn add_parallelepiped(&mut self, dim: usize, pts: &[PointId]) -> Result<ConvexId, MeshError> {
        Ok(self.add_convex(GeometricTransformation::parallelepiped(dim)?, pts)?.0)
    }

    /// Prism of dimension `dim`: a `dim - 1` simplex base, then its top copy.
    pub fn add_prism(&mut self, dim: usize, pts: &[PointId]) -> Result<ConvexId, MeshError> {
        Ok(self.add_convex(GeometricTransformation::prism(dim)?, pts)?.0)
    }

    pub fn add_segment_by_points(&mut self, a: &[f64], b: &[f64]) -> Result<ConvexId, MeshError> {
        self.add_simplex_by_points(1, &[a, b])
    }

    pub fn add_triangle_by_points(
        &mut self,
        a: &[f64],
        b: &[f64],
        c: &[f64],
    ) -> Result<ConvexId, MeshError> {
        self.add_simplex_by_points(2, &[a, b, c])
    }

    pub fn add_tetrahedron_by_points(
        &mut self,
        a: &[f64],
        b: &[f64],
        c: &[f64],
        d: &[f64],
    ) -> Result<ConvexId, MeshError> {
        self.add_simplex_by_points(3, &[a, b, c, d])
    }

    pub fn add_simplex_by_points(&mut self, dim: usize, coords: &[&[f64]]) -> Result<ConvexId, MeshError> {
        Ok(self
            .add_convex_by_points(GeometricTransformation::simplex(dim)?, coords)?
            .0)
    }

    pub fn add_parallelepiped_by_points(
        &mut self,
        dim: usize,
        coords: &[&[f64]],
    ) -> Result<ConvexId, MeshError> {
        Ok(self
            .add_convex_by_points(GeometricTransformation::parallelepiped(dim)?, coords)?
            .0)
    }

    pub fn add_prism_by_points(&mut self, dim: usize, coords: &[&[f64]]) -> Result<ConvexId, MeshError> {
        Ok(self
            .add_convex_by_points(GeometricTransformation::prism(dim)?, coords)?
            .0)
    }

    /// Parallelepiped spanned by `vects` from `org`: corner `i` is
    /// `org + Σ_j bit_j(i) vects[j]`.
    pub fn add_parallelepiped_by_vectors(
        &mut self,
        dim: usize,
        org: &[f64],
        vects: &[&[f64]],
    ) -> Result<ConvexId, MeshError> {
        let gt = GeometricTransformation::parallelepiped(dim)?;
        if vects.len() != dim {
            return Err(MeshError::PreconditionViolation(format!(
                "{gt} needs {dim} edge vectors, got {}",
                vects.len()
            )));
        }
        if let Some(v) = vects.iter().find(|v| v.len() != org.len()) {
            return Err(MeshError::PreconditionViolation(format!(
                "edge vector {v:?} does not match origin of dimension {}",
                org.len()
            )));
        }
        let corners: Vec<Vec<f64>> = (0..gt.nb_points())
            .map(|i| {
                let mut x = org.to_vec();
                for (j, v) in vects.iter().enumerate() {
                    if (i >> j) & 1 == 1 {
                        for (xk, vk) in x.iter_mut().zip(v.iter()) {
                            *xk += vk;
                        }
                    }
                }
                x
            })
            .collect();
        let refs: Vec<&[f64]> = corners.iter().map(Vec::as_slice).collect();
        Ok(self.add_convex_by_points(gt, &refs)?.0)
    }

    /// Removes `cv`, strips it from every region, broadcasts
    /// `RemoveConvex(cv)` and touches. On a receiver fault the convex, its
    /// incidence and its region entries are restored.
    pub fn remove_convex(&mut self, cv: ConvexId) -> Result<(), MeshError> {
        let rec = self
            .convexes
            .remove(cv)
            .ok_or_else(|| MeshError::convex_not_found(cv.get()))?;
        let positions: Vec<(PointId, Option<usize>)> = rec
            .points
            .iter()
            .map(|&p| (p, self.points.detach(p, cv)))
            .collect();
        let pruned = self.regions.prune_convex(cv);

        if let Err(e) = self.notifier.broadcast(&MeshMessage::RemoveConvex(cv)) {
            self.regions.restore_convex(cv, pruned);
            for &(p, pos) in positions.iter().rev() {
                if let Some(pos) = pos {
                    self.points.attach_at(p, cv, pos);
                }
            }
            self.convexes.insert_at(cv, rec);
            return Err(e);
        }
        self.touch();
        Ok(())
    }

    /// Removes every convex present in one of `regions`.
    pub fn remove_convexes_of_regions(&mut self, regions: &[MeshRegion]) -> Result<(), MeshError> {
        let doomed: Vec<ConvexId> = regions
            .iter()
            .flat_map(|r| self.resolve_region(r).convexes().collect::<Vec<_>>())
            .sorted_unstable()
            .dedup()
            .collect();
        for cv in doomed {
            self.remove_convex(cv)?;
        }
        Ok(())
    }

    /// Exchanges the ids of `a` and `b` (one of them may be free).
    pub fn swap_convex(&mut self, a: ConvexId, b: ConvexId) -> Result<(), MeshError> {
        if a == b {
            return if self.convexes.contains(a) {
                Ok(())
            } else {
                Err(MeshError::convex_not_found(a.get()))
            };
        }
        if !self.convexes.contains(a) && !self.convexes.contains(b) {
            return Err(MeshError::convex_not_found(a.get()));
        }
        self.apply_convex_swap(a, b);
        if let Err(e) = self.notifier.broadcast(&MeshMessage::SwapConvex(a, b)) {
            self.apply_convex_swap(a, b);
            return Err(e);
        }
        self.touch();
        Ok(())
    }

    /// Swap of store slots, incidence and region entries. An involution.
    fn apply_convex_swap(&mut self, a: ConvexId, b: ConvexId) {
        let touched: Vec<PointId> = [a, b]
            .iter()
            .filter_map(|&cv| self.convexes.get(cv))
            .flat_map(|r| r.points.iter().copied())
            .sorted_unstable()
            .dedup()
            .collect();
        for p in touched {
            self.points.rename_convex(p, a, b);
        }
        self.convexes.swap(a, b);
        self.regions.swap_convex(a, b);
    }

    /// Renumbers points and convexes to contiguous ids from 0, keeping their
    /// relative order. Convex moves go through [`swap_convex`](Self::swap_convex)
    /// so receivers see each renumbering.
    ///
    /// If a receiver rejects a move, the moves already made are swapped back
    /// in reverse order, each announced again, and the fault is returned
    /// with the numbering unchanged.
    pub fn optimize_structure(&mut self) -> Result<(), MeshError> {
        let moves = self.convexes.compaction_moves();
        log::debug!("optimize_structure: {} convex moves", moves.len());
        for (k, &(from, to)) in moves.iter().enumerate() {
            if let Err(e) = self.swap_convex(from, to) {
                for &(a, b) in moves[..k].iter().rev() {
                    self.apply_convex_swap(a, b);
                    if let Err(undo) = self.notifier.broadcast(&MeshMessage::SwapConvex(a, b)) {
                        log::warn!("receiver rejected undoing swap ({a}, {b}): {undo}");
                    }
                }
                self.touch();
                return Err(e);
            }
        }
        for (from, to) in self.points.compaction_moves() {
            self.swap_points(from, to)?;
        }
        crate::debug_invariants!(
            crate::debug_invariants::DebugInvariants::validate_invariants(self),
            "optimize_structure"
        );
        Ok(())
    }

    // ---- queries ----

    pub fn convex(&self, cv: ConvexId) -> Option<&ConvexRecord> {
        self.convexes.get(cv)
    }

    pub fn is_convex_valid(&self, cv: ConvexId) -> bool {
        self.convexes.contains(cv)
    }

    pub fn convex_index(&self) -> &BitVector {
        self.convexes.index()
    }

    pub fn convex_ids(&self) -> impl Iterator<Item = ConvexId> + '_ {
        self.convexes.ids()
    }

    pub fn nb_convex(&self) -> usize {
        self.convexes.len()
    }

    pub(crate) fn convex_or_err(&self, cv: ConvexId) -> Result<&ConvexRecord, MeshError> {
        self.convexes
            .get(cv)
            .ok_or_else(|| MeshError::convex_not_found(cv.get()))
    }

    pub fn trans_of_convex(&self, cv: ConvexId) -> Result<GeometricTransformation, MeshError> {
        Ok(self.convex_or_err(cv)?.gt)
    }

    pub fn structure_of_convex(&self, cv: ConvexId) -> Result<ConvexStructure, MeshError> {
        Ok(self.convex_or_err(cv)?.structure())
    }

    pub fn ind_points_of_convex(&self, cv: ConvexId) -> Result<&[PointId], MeshError> {
        Ok(&self.convex_or_err(cv)?.points)
    }

    /// Coordinates of the points of `cv`, one vector per node.
    pub fn points_of_convex(&self, cv: ConvexId) -> Result<Vec<&[f64]>, MeshError> {
        self.convex_or_err(cv)?
            .points
            .iter()
            .map(|&p| {
                self.points
                    .coords(p)
                    .ok_or_else(|| dangling_point(cv, p))
            })
            .collect()
    }

    /// Live convexes using `p`.
    pub fn convexes_of_point(&self, p: PointId) -> Result<&[ConvexId], MeshError> {
        self.points
            .record(p)
            .map(|r| r.convexes())
            .ok_or_else(|| MeshError::point_not_found(p.get()))
    }

    pub fn first_convex_of_point(&self, p: PointId) -> Result<Option<ConvexId>, MeshError> {
        Ok(self.convexes_of_point(p)?.first().copied())
    }

    /// Point ids of local face `f` of `cv`.
    pub fn ind_points_of_face_of_convex(&self, cv: ConvexId, f: usize) -> Result<Vec<PointId>, MeshError> {
        let rec = self.convex_or_err(cv)?;
        let s = rec.structure();
        if f >= s.nb_faces() {
            return Err(bad_face(cv, f, s));
        }
        Ok(s.ind_points_of_face(f)
            .into_iter()
            .map(|k| rec.points[k])
            .collect())
    }

    /// Convexes other than `cv` holding every point of face `f` of `cv`,
    /// ascending.
    pub fn neighbours_of_convex(&self, cv: ConvexId, f: usize) -> Result<Vec<ConvexId>, MeshError> {
        let face = self.ind_points_of_face_of_convex(cv, f)?;
        let Some((&first, rest)) = face.split_first() else {
            return Ok(Vec::new());
        };
        Ok(self
            .convexes_of_point(first)?
            .iter()
            .copied()
            .filter(|&other| other != cv)
            .filter(|&other| {
                rest.iter().all(|&p| {
                    self.convexes_of_point(p)
                        .map(|cvs| cvs.contains(&other))
                        .unwrap_or(false)
                })
            })
            .sorted_unstable()
            .collect())
    }

    /// Faces of the convexes of `region` that no other convex of `region`
    /// shares. Faces listed in an explicit region are ignored; only its
    /// convexes count.
    pub fn outer_faces(&self, region: &MeshRegion) -> Result<MeshRegion, MeshError> {
        let resolved = self.resolve_region(region);
        let mut out = MeshRegion::new();
        for cv in resolved.convexes() {
            let nb_faces = self.structure_of_convex(cv)?.nb_faces();
            for f in 0..nb_faces {
                let shared = self
                    .neighbours_of_convex(cv, f)?
                    .into_iter()
                    .any(|n| resolved.contains(n));
                if !shared {
                    out.add(cv, face_id(f)?);
                }
            }
        }
        Ok(out)
    }

    // ---- helpers ----

    fn check_convex_points(&self, gt: GeometricTransformation, pts: &[PointId]) -> Result<(), MeshError> {
        if pts.len() != gt.nb_points() {
            return Err(point_count_mismatch(gt, pts.len()));
        }
        if let Some(&p) = pts.iter().find(|&&p| !self.points.contains(p)) {
            return Err(MeshError::point_not_found(p.get()));
        }
        if !pts.iter().all_unique() {
            return Err(MeshError::PreconditionViolation(format!(
                "repeated point in {gt} convex {pts:?}"
            )));
        }
        if let Some(d) = self.dim() {
            if gt.dim() > d {
                return Err(MeshError::PreconditionViolation(format!(
                    "{gt} does not fit a mesh of dimension {d}"
                )));
            }
        }
        Ok(())
    }

    /// Live convex with the same structure and ordered points.
    fn find_convex(&self, s: ConvexStructure, pts: &[PointId]) -> Option<ConvexId> {
        let first = *pts.first()?;
        self.points
            .record(first)?
            .convexes()
            .iter()
            .copied()
            .find(|&cv| {
                self.convexes
                    .get(cv)
                    .is_some_and(|r| r.structure() == s && r.points == pts)
            })
    }
}

pub(crate) fn face_id(f: usize) -> Result<FaceId, MeshError> {
    FaceId::try_face(f)
        .ok_or_else(|| MeshError::PreconditionViolation(format!("face number {f} out of range")))
}

pub(crate) fn bad_face(cv: ConvexId, f: usize, s: ConvexStructure) -> MeshError {
    MeshError::PreconditionViolation(format!(
        "convex {cv} has {} faces, face {f} requested",
        s.nb_faces()
    ))
}

fn point_count_mismatch(gt: GeometricTransformation, got: usize) -> MeshError {
    MeshError::PreconditionViolation(format!(
        "{gt} needs {} points, got {got}",
        gt.nb_points()
    ))
}

fn dangling_point(cv: ConvexId, p: PointId) -> MeshError {
    MeshError::InternalConsistencyFault(format!("convex {cv} references dead point {p}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::MeshConfig;

    fn square() -> (Mesh, [PointId; 4]) {
        let mut m = Mesh::with_config(MeshConfig::default().without_merging());
        let p = [
            m.add_point(&[0.0, 0.0]).unwrap(),
            m.add_point(&[1.0, 0.0]).unwrap(),
            m.add_point(&[0.0, 1.0]).unwrap(),
            m.add_point(&[1.0, 1.0]).unwrap(),
        ];
        (m, p)
    }

    #[test]
    fn duplicate_convex_is_found() {
        let (mut m, p) = square();
        let gt = GeometricTransformation::simplex(2).unwrap();
        let (a, dup) = m.add_convex(gt, &[p[0], p[1], p[2]]).unwrap();
        assert!(!dup);
        let v = m.version();
        let (b, dup) = m.add_convex(gt, &[p[0], p[1], p[2]]).unwrap();
        assert!(dup);
        assert_eq!(a, b);
        assert_eq!(m.nb_convex(), 1);
        assert_eq!(m.version(), v);
        // a different ordering is a different convex
        let (_, dup) = m.add_convex(gt, &[p[1], p[0], p[2]]).unwrap();
        assert!(!dup);
    }

    #[test]
    fn bad_point_lists_are_rejected() {
        let (mut m, p) = square();
        assert!(matches!(
            m.add_triangle(p[0], p[1], PointId::new(9)),
            Err(MeshError::NotFound { what: "point", id: 9 })
        ));
        assert!(matches!(
            m.add_simplex(2, &[p[0], p[1]]),
            Err(MeshError::PreconditionViolation(_))
        ));
        assert!(matches!(
            m.add_triangle(p[0], p[0], p[1]),
            Err(MeshError::PreconditionViolation(_))
        ));
        assert!(matches!(
            m.add_tetrahedron(p[0], p[1], p[2], p[3]),
            Err(MeshError::PreconditionViolation(_))
        ));
        assert_eq!(m.nb_convex(), 0);
    }

    #[test]
    fn neighbours_and_outer_faces() {
        let (mut m, p) = square();
        let t0 = m.add_triangle(p[0], p[1], p[2]).unwrap();
        let t1 = m.add_triangle(p[1], p[3], p[2]).unwrap();
        // face 0 of t0 is opposite node 0: {p1, p2}
        assert_eq!(m.neighbours_of_convex(t0, 0).unwrap(), vec![t1]);
        assert!(m.neighbours_of_convex(t0, 1).unwrap().is_empty());
        let outer = m.outer_faces(&MeshRegion::all_convexes()).unwrap();
        assert_eq!(outer.len(), 4);
        assert!(!outer.contains_face(t0, FaceId::face(0)));
        assert!(matches!(
            m.neighbours_of_convex(t0, 3),
            Err(MeshError::PreconditionViolation(_))
        ));
    }

    #[test]
    fn swap_with_a_hole_moves_incidence() {
        let (mut m, p) = square();
        let t0 = m.add_triangle(p[0], p[1], p[2]).unwrap();
        let free = ConvexId::new(5);
        m.swap_convex(t0, free).unwrap();
        assert!(!m.is_convex_valid(t0));
        assert_eq!(m.ind_points_of_convex(free).unwrap(), &[p[0], p[1], p[2]]);
        assert_eq!(m.convexes_of_point(p[0]).unwrap(), &[free]);
        assert!(m.swap_convex(ConvexId::new(7), ConvexId::new(8)).is_err());
    }

    #[test]
    fn remove_convexes_of_regions_uses_resolution() {
        let (mut m, p) = square();
        let t0 = m.add_triangle(p[0], p[1], p[2]).unwrap();
        m.add_triangle(p[1], p[3], p[2]).unwrap();
        m.remove_convexes_of_regions(&[MeshRegion::from_convexes([t0])]).unwrap();
        assert_eq!(m.nb_convex(), 1);
        m.remove_convexes_of_regions(&[MeshRegion::all_convexes()]).unwrap();
        assert_eq!(m.nb_convex(), 0);
    }

    #[test]
    fn by_points_merges_shared_vertices() {
        let mut m = Mesh::new();
        m.add_triangle_by_points(&[0.0, 0.0], &[1.0, 0.0], &[0.0, 1.0]).unwrap();
        m.add_triangle_by_points(&[1.0, 0.0], &[1.0, 1.0], &[0.0, 1.0 + 1e-12]).unwrap();
        assert_eq!(m.nb_points(), 4);
        assert_eq!(m.nb_convex(), 2);
    }
}
