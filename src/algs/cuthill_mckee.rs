//! Cuthill–McKee ordering of a dual graph.
//!
//! Level-synchronous formulation (Azad et al., Algorithms 2 and 3): every
//! frontier is labelled as a block, then the unvisited neighbours of the
//! frontier are reduced to their smallest parent label and sorted by
//! `(parent label, degree, vertex)`. Each connected component is started from
//! a pseudo-peripheral vertex, components are taken in order of their lowest
//! vertex, so the ordering only depends on the graph.

use std::collections::BTreeMap;

use crate::algs::dual_graph::DualGraph;

/// Vertices of `g` in Cuthill–McKee order (not reversed).
pub fn cuthill_mckee(g: &DualGraph) -> Vec<usize> {
    let n = g.len();
    let mut labels: Vec<Option<usize>> = vec![None; n];
    let mut order = Vec::with_capacity(n);

    for seed in 0..n {
        if labels[seed].is_some() {
            continue;
        }
        let root = find_pseudo_peripheral_root(g, seed);
        let mut frontier = vec![root];
        labels[root] = Some(order.len());
        order.push(root);

        while !frontier.is_empty() {
            // SPMSPV + REDUCE: unvisited neighbour -> smallest parent label
            let mut reduced: BTreeMap<usize, usize> = BTreeMap::new();
            for &u in &frontier {
                let Some(lu) = labels[u] else { continue };
                for &v in g.neighbors(u) {
                    if labels[v].is_none() {
                        reduced
                            .entry(v)
                            .and_modify(|l| *l = (*l).min(lu))
                            .or_insert(lu);
                    }
                }
            }
            // SORTPERM
            let mut triples: Vec<(usize, usize, usize)> = reduced
                .into_iter()
                .map(|(v, l)| (l, g.degree(v), v))
                .collect();
            triples.sort_unstable();
            frontier = triples.into_iter().map(|t| t.2).collect();
            for &v in &frontier {
                labels[v] = Some(order.len());
                order.push(v);
            }
        }
    }
    order
}

/// Pseudo-peripheral vertex of the component containing `start`: repeat a
/// level-structure BFS from the minimum-degree vertex of the deepest level
/// until the depth stops growing.
pub fn find_pseudo_peripheral_root(g: &DualGraph, start: usize) -> usize {
    let mut r = start;
    let mut depth = 0;
    loop {
        let levels = level_structure(g, r);
        let Some(last) = levels.last() else {
            return r;
        };
        let candidate = last
            .iter()
            .copied()
            .min_by_key(|&v| (g.degree(v), v))
            .unwrap_or(r);
        if levels.len() <= depth {
            return r;
        }
        depth = levels.len();
        r = candidate;
    }
}

/// BFS levels rooted at `root`.
pub fn level_structure(g: &DualGraph, root: usize) -> Vec<Vec<usize>> {
    let mut seen = vec![false; g.len()];
    seen[root] = true;
    let mut levels = vec![vec![root]];
    loop {
        let mut next = Vec::new();
        for &u in levels.last().map(Vec::as_slice).unwrap_or_default() {
            for &v in g.neighbors(u) {
                if !seen[v] {
                    seen[v] = true;
                    next.push(v);
                }
            }
        }
        if next.is_empty() {
            return levels;
        }
        levels.push(next);
    }
}

/// Largest `|pos(u) - pos(v)|` over the edges of `g` under `order`.
pub fn bandwidth(g: &DualGraph, order: &[usize]) -> usize {
    let mut pos = vec![0; g.len()];
    for (i, &v) in order.iter().enumerate() {
        pos[v] = i;
    }
    (0..g.len())
        .flat_map(|u| g.neighbors(u).iter().map(move |&v| (u, v)))
        .map(|(u, v)| pos[u].abs_diff(pos[v]))
        .max()
        .unwrap_or(0)
}
