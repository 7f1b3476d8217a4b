//! Build a CSR (compressed-sparse-row) *dual graph* of a mesh.
//
// Each *convex* is a vertex; an undirected edge joins two convexes that share
// a whole face (same set of point ids). Two convexes touching only at a
// vertex or an edge of a 3D face are not neighbours.
//
// Returned in METIS-ready CSR triples:
//
// * `xadj[i] .. xadj[i+1]`   = neighbour list of convex *i*
// * `adjncy`                 = concatenated neighbour vertices
// * `vwgt[i]`                = vertex weight, default = 1
//
// The dual graph is **symmetrised**, **self-free** and each neighbour list is
// sorted, so every traversal over it is deterministic.

use hashbrown::HashMap;
use itertools::Itertools;

use crate::mesh::Mesh;
use crate::topology::point::{ConvexId, PointId};

/// CSR triple
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DualGraph {
    pub xadj: Vec<usize>,
    pub adjncy: Vec<usize>,
    pub vwgt: Vec<i32>,
}

impl DualGraph {
    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.xadj.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn neighbors(&self, i: usize) -> &[usize] {
        &self.adjncy[self.xadj[i]..self.xadj[i + 1]]
    }

    pub fn degree(&self, i: usize) -> usize {
        self.xadj[i + 1] - self.xadj[i]
    }

    /// Builds a graph from adjacency lists (sorted and deduplicated here).
    pub fn from_adjacency(adj: Vec<Vec<usize>>) -> Self {
        let n = adj.len();
        let mut xadj = Vec::with_capacity(n + 1);
        let mut adjncy = Vec::new();
        xadj.push(0);
        for (i, nbrs) in adj.into_iter().enumerate() {
            adjncy.extend(nbrs.into_iter().filter(|&j| j != i).sorted_unstable().dedup());
            xadj.push(adjncy.len());
        }
        DualGraph {
            xadj,
            adjncy,
            vwgt: vec![1; n],
        }
    }
}

/// Face-adjacency graph of `cells`. Vertex `i` of the graph is `cells[i]`;
/// convexes outside `cells` are ignored.
pub fn build_face_dual(mesh: &Mesh, cells: &[ConvexId]) -> DualGraph {
    let mut owners: HashMap<Vec<PointId>, Vec<usize>> = HashMap::new();
    for (idx, &cv) in cells.iter().enumerate() {
        for key in face_keys(mesh, cv) {
            owners.entry(key).or_default().push(idx);
        }
    }

    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); cells.len()];
    for sharing in owners.values().filter(|o| o.len() > 1) {
        for (&a, &b) in sharing.iter().tuple_combinations() {
            adj[a].push(b);
            adj[b].push(a);
        }
    }
    DualGraph::from_adjacency(adj)
}

/// Sorted point ids of every face of `cv`.
pub(crate) fn face_keys(mesh: &Mesh, cv: ConvexId) -> Vec<Vec<PointId>> {
    let Some(rec) = mesh.convex(cv) else {
        return Vec::new();
    };
    let s = rec.structure();
    (0..s.nb_faces())
        .map(|f| {
            s.ind_points_of_face(f)
                .into_iter()
                .map(|k| rec.points()[k])
                .sorted_unstable()
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_adjacency_is_sorted_and_self_free() {
        let g = DualGraph::from_adjacency(vec![vec![2, 1, 0, 1], vec![0], vec![0]]);
        assert_eq!(g.len(), 3);
        assert_eq!(g.neighbors(0), &[1, 2]);
        assert_eq!(g.degree(1), 1);
        assert_eq!(g.vwgt, vec![1, 1, 1]);
    }

    #[test]
    fn two_triangles_share_one_face() {
        let mut m = Mesh::new();
        let a = m.add_point(&[0.0, 0.0]).unwrap();
        let b = m.add_point(&[1.0, 0.0]).unwrap();
        let c = m.add_point(&[0.0, 1.0]).unwrap();
        let d = m.add_point(&[1.0, 1.0]).unwrap();
        let t0 = m.add_triangle(a, b, c).unwrap();
        let t1 = m.add_triangle(b, d, c).unwrap();
        let g = build_face_dual(&m, &[t0, t1]);
        assert_eq!(g.neighbors(0), &[1]);
        assert_eq!(g.neighbors(1), &[0]);
    }

    #[test]
    fn vertex_contact_is_not_adjacency() {
        let mut m = Mesh::new();
        let o = m.add_point(&[0.0, 0.0]).unwrap();
        let x = m.add_point(&[1.0, 0.0]).unwrap();
        let y = m.add_point(&[0.0, 1.0]).unwrap();
        let t0 = m.add_triangle(o, x, y).unwrap();
        let p = m.add_point(&[-1.0, 0.0]).unwrap();
        let q = m.add_point(&[0.0, -1.0]).unwrap();
        let t1 = m.add_triangle(o, p, q).unwrap();
        let g = build_face_dual(&m, &[t0, t1]);
        assert!(g.neighbors(0).is_empty());
    }
}
