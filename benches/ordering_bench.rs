use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use fem_mesh::algs::cuthill_mckee::cuthill_mckee;
use fem_mesh::algs::dual_graph::build_face_dual;
use fem_mesh::prelude::*;

/// `n × n` grid of jittered triangle pairs, inserted in random order so the
/// convex numbering carries no locality.
fn shuffled_triangulation(n: usize, seed: u64) -> Mesh {
    let mut rng = SmallRng::seed_from_u64(seed);
    let h = 1.0 / n as f64;
    let jitter: Vec<[f64; 2]> = (0..(n + 1) * (n + 1))
        .map(|_| [rng.gen_range(-0.2..0.2) * h, rng.gen_range(-0.2..0.2) * h])
        .collect();
    let node = |i: usize, j: usize| {
        let d = jitter[j * (n + 1) + i];
        [i as f64 * h + d[0], j as f64 * h + d[1]]
    };
    let mut cells: Vec<(usize, usize, bool)> = (0..n)
        .flat_map(|j| (0..n).flat_map(move |i| [(i, j, false), (i, j, true)]))
        .collect();
    cells.shuffle(&mut rng);

    let mut m = Mesh::new();
    for (i, j, upper) in cells {
        let (a, b, c) = if upper {
            (node(i + 1, j), node(i + 1, j + 1), node(i, j + 1))
        } else {
            (node(i, j), node(i + 1, j), node(i, j + 1))
        };
        m.add_triangle_by_points(&a, &b, &c)
            .expect("grid triangle");
    }
    m
}

fn bench_ordering(c: &mut Criterion) {
    let mut group = c.benchmark_group("cuthill_mckee");
    for &n in &[16usize, 32, 64] {
        let mesh = shuffled_triangulation(n, 0xC0FFEE);
        let cells: Vec<ConvexId> = mesh.convex_ids().collect();
        group.bench_with_input(BenchmarkId::new("dual_graph", n), &n, |b, _| {
            b.iter(|| build_face_dual(black_box(&mesh), &cells))
        });
        let graph = build_face_dual(&mesh, &cells);
        group.bench_with_input(BenchmarkId::new("order", n), &n, |b, _| {
            b.iter(|| cuthill_mckee(black_box(&graph)))
        });
    }
    group.finish();
}

fn bench_point_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("point_store");
    for &n in &[32usize, 128] {
        group.bench_with_input(BenchmarkId::new("build_merged", n), &n, |b, &n| {
            b.iter(|| shuffled_triangulation(n, 7).nb_points())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ordering, bench_point_merge);
criterion_main!(benches);
