//! Mesh regions: named subsets of convexes and convex faces.
//!
//! A [`MeshRegion`] is either the symbolic "all convexes" region or an
//! explicit, ordered map from convex to a [`FaceMask`] (which faces of that
//! convex belong to the region, [`FaceId::WHOLE`] meaning the convex
//! itself). [`RegionTable`] stores the regions a mesh owns; regions are
//! materialized on first write and read as empty until then.

use std::collections::BTreeMap;

use crate::topology::point::{ConvexId, FaceId, RegionId};

/// Set of faces of one convex. Bit 0 is the whole convex, bit `f + 1`
/// local face `f`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct FaceMask(u64);

impl FaceMask {
    #[inline]
    fn bit(face: FaceId) -> u64 {
        match face.local() {
            None => 1,
            Some(f) => 1u64 << (f + 1),
        }
    }

    pub fn insert(&mut self, face: FaceId) -> bool {
        let b = Self::bit(face);
        let fresh = self.0 & b == 0;
        self.0 |= b;
        fresh
    }

    pub fn remove(&mut self, face: FaceId) -> bool {
        let b = Self::bit(face);
        let was = self.0 & b != 0;
        self.0 &= !b;
        was
    }

    #[inline]
    pub fn contains(self, face: FaceId) -> bool {
        self.0 & Self::bit(face) != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Faces in the set, the whole convex first.
    pub fn iter(self) -> impl Iterator<Item = FaceId> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let tz = bits.trailing_zeros();
            bits &= bits - 1;
            Some(if tz == 0 {
                FaceId::WHOLE
            } else {
                FaceId::face(tz as u16 - 1)
            })
        })
    }

    fn union(self, other: FaceMask) -> FaceMask {
        FaceMask(self.0 | other.0)
    }

    fn intersect(self, other: FaceMask) -> FaceMask {
        FaceMask(self.0 & other.0)
    }
}

impl std::fmt::Debug for FaceMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// A set of convexes and convex faces.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MeshRegion {
    all: bool,
    entries: BTreeMap<ConvexId, FaceMask>,
}

static EMPTY_REGION: MeshRegion = MeshRegion::new();

impl MeshRegion {
    /// An empty explicit region.
    pub const fn new() -> Self {
        Self {
            all: false,
            entries: BTreeMap::new(),
        }
    }

    /// The symbolic region made of every convex of the mesh.
    pub const fn all_convexes() -> Self {
        Self {
            all: true,
            entries: BTreeMap::new(),
        }
    }

    /// Explicit region holding the given convexes whole.
    pub fn from_convexes(cvs: impl IntoIterator<Item = ConvexId>) -> Self {
        cvs.into_iter().map(|cv| (cv, FaceId::WHOLE)).collect()
    }

    pub(crate) fn empty_ref() -> &'static MeshRegion {
        &EMPTY_REGION
    }

    #[inline]
    pub fn is_all(&self) -> bool {
        self.all
    }

    /// Adds `(cv, face)`; returns `true` if it was new. The symbolic
    /// all-convexes region is left unchanged.
    pub fn add(&mut self, cv: ConvexId, face: FaceId) -> bool {
        if self.all {
            return false;
        }
        self.entries.entry(cv).or_default().insert(face)
    }

    /// Removes `(cv, face)`; returns `true` if it was present.
    pub fn remove(&mut self, cv: ConvexId, face: FaceId) -> bool {
        let Some(mask) = self.entries.get_mut(&cv) else {
            return false;
        };
        let was = mask.remove(face);
        if mask.is_empty() {
            self.entries.remove(&cv);
        }
        was
    }

    /// Drops every entry of `cv`, returning its faces.
    pub fn remove_convex(&mut self, cv: ConvexId) -> Option<FaceMask> {
        self.entries.remove(&cv)
    }

    pub(crate) fn restore_convex(&mut self, cv: ConvexId, mask: FaceMask) {
        if !mask.is_empty() {
            self.entries.insert(cv, mask);
        }
    }

    /// Whether the region explicitly holds some face of `cv`.
    pub fn contains(&self, cv: ConvexId) -> bool {
        self.entries.contains_key(&cv)
    }

    pub fn contains_face(&self, cv: ConvexId, face: FaceId) -> bool {
        self.faces_of_convex(cv).contains(face)
    }

    pub fn faces_of_convex(&self, cv: ConvexId) -> FaceMask {
        self.entries.get(&cv).copied().unwrap_or_default()
    }

    /// Explicit convexes, ascending.
    pub fn convexes(&self) -> impl Iterator<Item = ConvexId> + '_ {
        self.entries.keys().copied()
    }

    /// Explicit `(convex, face)` entries, ordered by convex.
    pub fn iter(&self) -> impl Iterator<Item = (ConvexId, FaceId)> + '_ {
        self.entries
            .iter()
            .flat_map(|(&cv, mask)| mask.iter().map(move |f| (cv, f)))
    }

    /// Number of explicit `(convex, face)` entries.
    pub fn len(&self) -> usize {
        self.entries.values().map(|m| m.len()).sum()
    }

    /// Number of distinct explicit convexes.
    pub fn nb_convex(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.all && self.entries.is_empty()
    }

    /// Whether some explicit entry is a face rather than a whole convex.
    pub fn has_faces(&self) -> bool {
        self.entries.values().any(|m| m.iter().any(|f| !f.is_whole()))
    }

    /// Explicit intersection, face by face. Both sides must be explicit.
    pub fn intersection(&self, other: &MeshRegion) -> MeshRegion {
        let mut out = MeshRegion::new();
        for (cv, mask) in &self.entries {
            let m = mask.intersect(other.faces_of_convex(*cv));
            if !m.is_empty() {
                out.entries.insert(*cv, m);
            }
        }
        out
    }

    /// Adds every explicit entry of `other`.
    pub fn merge(&mut self, other: &MeshRegion) {
        if self.all {
            return;
        }
        for (cv, mask) in &other.entries {
            let e = self.entries.entry(*cv).or_default();
            *e = e.union(*mask);
        }
    }

    /// Keeps only the entries whose convex satisfies `keep`.
    pub fn retain_convexes(&mut self, mut keep: impl FnMut(ConvexId) -> bool) {
        self.entries.retain(|&cv, _| keep(cv));
    }

    /// Exchanges the entries of `a` and `b`.
    pub(crate) fn swap_convex(&mut self, a: ConvexId, b: ConvexId) {
        let ma = self.entries.remove(&a);
        let mb = self.entries.remove(&b);
        if let Some(m) = ma {
            self.entries.insert(b, m);
        }
        if let Some(m) = mb {
            self.entries.insert(a, m);
        }
    }

    pub(crate) fn masks(&self) -> impl Iterator<Item = (ConvexId, FaceMask)> + '_ {
        self.entries.iter().map(|(&cv, &m)| (cv, m))
    }
}

impl FromIterator<(ConvexId, FaceId)> for MeshRegion {
    fn from_iter<I: IntoIterator<Item = (ConvexId, FaceId)>>(iter: I) -> Self {
        let mut r = MeshRegion::new();
        for (cv, f) in iter {
            r.add(cv, f);
        }
        r
    }
}

/// Regions owned by a mesh, keyed by region number.
#[derive(Clone, Debug, Default)]
pub struct RegionTable {
    regions: BTreeMap<RegionId, MeshRegion>,
}

impl RegionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored region, or a shared empty one.
    pub fn get(&self, id: RegionId) -> &MeshRegion {
        self.regions.get(&id).unwrap_or(MeshRegion::empty_ref())
    }

    /// The stored region, materializing an empty one if needed.
    pub fn get_or_create(&mut self, id: RegionId) -> &mut MeshRegion {
        self.regions.entry(id).or_default()
    }

    /// Assignment: replaces the whole content.
    pub fn set(&mut self, id: RegionId, region: MeshRegion) -> Option<MeshRegion> {
        self.regions.insert(id, region)
    }

    pub fn remove(&mut self, id: RegionId) -> Option<MeshRegion> {
        self.regions.remove(&id)
    }

    pub fn contains(&self, id: RegionId) -> bool {
        self.regions.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = RegionId> + '_ {
        self.regions.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RegionId, &MeshRegion)> + '_ {
        self.regions.iter().map(|(&id, r)| (id, r))
    }

    /// Strips `cv` from every region; returns what was removed.
    pub(crate) fn prune_convex(&mut self, cv: ConvexId) -> Vec<(RegionId, FaceMask)> {
        self.regions
            .iter_mut()
            .filter_map(|(&id, r)| r.remove_convex(cv).map(|m| (id, m)))
            .collect()
    }

    pub(crate) fn restore_convex(&mut self, cv: ConvexId, pruned: Vec<(RegionId, FaceMask)>) {
        for (id, mask) in pruned {
            self.get_or_create(id).restore_convex(cv, mask);
        }
    }

    pub(crate) fn swap_convex(&mut self, a: ConvexId, b: ConvexId) {
        for r in self.regions.values_mut() {
            r.swap_convex(a, b);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.regions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cv(i: usize) -> ConvexId {
        ConvexId::new(i)
    }

    #[test]
    fn face_mask_iterates_whole_first() {
        let mut m = FaceMask::default();
        m.insert(FaceId::face(2));
        m.insert(FaceId::WHOLE);
        m.insert(FaceId::face(0));
        let faces: Vec<_> = m.iter().collect();
        assert_eq!(faces, vec![FaceId::WHOLE, FaceId::face(0), FaceId::face(2)]);
        assert_eq!(m.len(), 3);
    }

    #[test]
    fn add_remove_entries() {
        let mut r = MeshRegion::new();
        assert!(r.add(cv(3), FaceId::face(1)));
        assert!(!r.add(cv(3), FaceId::face(1)));
        assert!(r.add(cv(1), FaceId::WHOLE));
        assert_eq!(r.len(), 2);
        assert_eq!(r.convexes().collect::<Vec<_>>(), vec![cv(1), cv(3)]);
        assert!(r.remove(cv(3), FaceId::face(1)));
        assert!(!r.contains(cv(3)));
        assert_eq!(r.nb_convex(), 1);
    }

    #[test]
    fn all_region_is_symbolic() {
        let mut r = MeshRegion::all_convexes();
        assert!(r.is_all());
        assert!(!r.is_empty());
        assert!(!r.add(cv(0), FaceId::WHOLE));
        assert_eq!(r.len(), 0);
    }

    #[test]
    fn intersection_is_facewise() {
        let a: MeshRegion = [(cv(0), FaceId::WHOLE), (cv(1), FaceId::face(0)), (cv(2), FaceId::WHOLE)]
            .into_iter()
            .collect();
        let b: MeshRegion = [(cv(1), FaceId::face(1)), (cv(2), FaceId::WHOLE)]
            .into_iter()
            .collect();
        let i = a.intersection(&b);
        assert_eq!(i.iter().collect::<Vec<_>>(), vec![(cv(2), FaceId::WHOLE)]);
    }

    #[test]
    fn table_reads_absent_as_empty() {
        let mut t = RegionTable::new();
        assert!(t.get(7).is_empty());
        assert!(!t.contains(7));
        t.get_or_create(7).add(cv(0), FaceId::WHOLE);
        assert!(t.contains(7));
        assert_eq!(t.get(7).len(), 1);
    }

    #[test]
    fn prune_and_restore() {
        let mut t = RegionTable::new();
        t.get_or_create(1).add(cv(4), FaceId::face(2));
        t.get_or_create(2).add(cv(4), FaceId::WHOLE);
        t.get_or_create(2).add(cv(5), FaceId::WHOLE);
        let pruned = t.prune_convex(cv(4));
        assert_eq!(pruned.len(), 2);
        assert!(t.get(1).is_empty());
        assert!(t.contains(1));
        t.restore_convex(cv(4), pruned);
        assert!(t.get(1).contains_face(cv(4), FaceId::face(2)));
        assert!(t.get(2).contains(cv(4)));
    }

    #[test]
    fn swap_rekeys_entries() {
        let mut t = RegionTable::new();
        t.get_or_create(0).add(cv(1), FaceId::face(0));
        t.swap_convex(cv(1), cv(9));
        assert!(!t.get(0).contains(cv(1)));
        assert!(t.get(0).contains_face(cv(9), FaceId::face(0)));
    }

    #[test]
    fn region_serde_roundtrip() {
        let r: MeshRegion = [(cv(0), FaceId::WHOLE), (cv(3), FaceId::face(2))]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&r).unwrap();
        let back: MeshRegion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
