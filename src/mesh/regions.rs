//! Region entry points of [`Mesh`].
//!
//! A region id that was never written reads as the empty region and is not
//! stored. Every write materializes the region and touches the mesh.

use std::borrow::Cow;

use crate::mesh::Mesh;
use crate::mesh::convexes::bad_face;
use crate::mesh_error::MeshError;
use crate::topology::index_table::BitVector;
use crate::topology::point::{ConvexId, FaceId, RegionId};
use crate::topology::region::MeshRegion;

impl Mesh {
    /// Region `id`, or the shared empty region if it was never written.
    pub fn region(&self, id: RegionId) -> &MeshRegion {
        self.regions.get(id)
    }

    pub fn has_region(&self, id: RegionId) -> bool {
        self.regions.contains(id)
    }

    /// Ids of the materialized regions.
    pub fn regions_index(&self) -> BitVector {
        self.regions.ids().collect()
    }

    /// Replaces region `id` with `region`. Every explicit entry must name a
    /// live convex and one of its faces.
    pub fn set_region(&mut self, id: RegionId, region: MeshRegion) -> Result<(), MeshError> {
        for (cv, face) in region.iter() {
            self.check_region_entry(cv, face)?;
        }
        self.regions.set(id, region);
        self.touch();
        Ok(())
    }

    /// Adds `(cv, face)` to region `id`; returns whether it was new.
    pub fn add_to_region(&mut self, id: RegionId, cv: ConvexId, face: FaceId) -> Result<bool, MeshError> {
        self.check_region_entry(cv, face)?;
        if self.regions.get(id).is_all() {
            return Err(MeshError::PreconditionViolation(format!(
                "region {id} already holds every convex"
            )));
        }
        let added = self.regions.get_or_create(id).add(cv, face);
        self.touch();
        Ok(added)
    }

    /// Removes `(cv, face)` from region `id`; returns whether it was there.
    pub fn remove_from_region(&mut self, id: RegionId, cv: ConvexId, face: FaceId) -> bool {
        let removed = self.regions.get_or_create(id).remove(cv, face);
        self.touch();
        removed
    }

    /// Frees region `id`.
    pub fn clear_region(&mut self, id: RegionId) -> bool {
        let had = self.regions.remove(id).is_some();
        if had {
            self.touch();
        }
        had
    }

    /// Explicit form of `region`: the symbolic all-convexes region becomes
    /// every live convex, whole; an explicit region is returned as is.
    pub fn resolve_region<'a>(&self, region: &'a MeshRegion) -> Cow<'a, MeshRegion> {
        if region.is_all() {
            Cow::Owned(MeshRegion::from_convexes(self.convexes.ids()))
        } else {
            Cow::Borrowed(region)
        }
    }

    /// [`resolve_region`](Self::resolve_region) of the stored region `id`.
    pub fn resolved_region(&self, id: RegionId) -> MeshRegion {
        self.resolve_region(self.regions.get(id)).into_owned()
    }

    fn check_region_entry(&self, cv: ConvexId, face: FaceId) -> Result<(), MeshError> {
        let s = self.structure_of_convex(cv)?;
        match face.local() {
            Some(f) if f >= s.nb_faces() => Err(bad_face(cv, f, s)),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::point::PointId;

    fn two_triangles() -> (Mesh, ConvexId, ConvexId) {
        let mut m = Mesh::new();
        let p: Vec<PointId> = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]
            .iter()
            .map(|c| m.add_point(c).unwrap())
            .collect();
        let a = m.add_triangle(p[0], p[1], p[2]).unwrap();
        let b = m.add_triangle(p[1], p[3], p[2]).unwrap();
        (m, a, b)
    }

    #[test]
    fn unwritten_region_reads_empty() {
        let (m, _, _) = two_triangles();
        assert!(m.region(42).is_empty());
        assert!(!m.has_region(42));
        assert!(m.regions_index().is_empty());
    }

    #[test]
    fn writes_materialize_and_touch() {
        let (mut m, a, b) = two_triangles();
        let v = m.version();
        assert!(m.add_to_region(1, a, FaceId::face(2)).unwrap());
        assert!(!m.add_to_region(1, a, FaceId::face(2)).unwrap());
        assert!(m.has_region(1));
        assert_eq!(m.version(), v + 2);
        assert!(m.remove_from_region(1, a, FaceId::face(2)));
        // an emptied region persists
        assert!(m.has_region(1));
        assert!(m.region(1).is_empty());
        m.set_region(2, MeshRegion::from_convexes([b])).unwrap();
        assert_eq!(m.regions_index().iter().collect::<Vec<_>>(), vec![1, 2]);
        assert!(m.clear_region(2));
        assert!(!m.clear_region(2));
    }

    #[test]
    fn bad_entries_are_rejected() {
        let (mut m, a, _) = two_triangles();
        assert!(matches!(
            m.add_to_region(1, ConvexId::new(9), FaceId::WHOLE),
            Err(MeshError::NotFound { what: "convex", .. })
        ));
        assert!(matches!(
            m.add_to_region(1, a, FaceId::face(3)),
            Err(MeshError::PreconditionViolation(_))
        ));
        assert!(!m.has_region(1));
        m.set_region(3, MeshRegion::all_convexes()).unwrap();
        assert!(m.add_to_region(3, a, FaceId::WHOLE).is_err());
    }

    #[test]
    fn all_convexes_resolves_to_live_ids() {
        let (mut m, a, b) = two_triangles();
        m.remove_convex(a).unwrap();
        let all = MeshRegion::all_convexes();
        let r = m.resolve_region(&all);
        assert_eq!(r.convexes().collect::<Vec<_>>(), vec![b]);
    }
}
