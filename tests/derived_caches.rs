mod util;
use std::collections::BTreeSet;

use fem_mesh::algs::cuthill_mckee::bandwidth;
use fem_mesh::algs::dual_graph::build_face_dual;
use fem_mesh::prelude::*;
use util::*;

#[test]
fn cuthill_mckee_is_a_cached_permutation() {
    let mut m = quad_grid(6, 3);
    m.remove_convex(cid(7)).unwrap();
    let live: Vec<ConvexId> = m.convex_ids().collect();

    let order = m.cuthill_mckee_ordering().to_vec();
    assert_permutation(&order, &live);
    assert!(m.cache_status().cuthill_mckee);
    assert_eq!(m.cuthill_mckee_ordering(), order.as_slice());

    let graph = build_face_dual(&m, &live);
    let vertices: Vec<usize> = order
        .iter()
        .map(|cv| live.iter().position(|c| c == cv).unwrap())
        .collect();
    // levels of a 6x3 strip hold at most three cells
    let bw = bandwidth(&graph, &vertices);
    assert!(bw <= 5, "bandwidth {bw}");

    m.translation(&[1.0, 0.0]).unwrap();
    assert!(!m.cache_status().cuthill_mckee);
}

#[test]
fn thread_chunks_split_a_region() {
    let mut m = quad_grid(5, 2);
    m.set_thread_distribution(FixedThreads(3));
    m.set_region(1, MeshRegion::all_convexes()).unwrap();
    m.add_to_region(2, cid(0), FaceId::face(1)).unwrap();
    m.add_to_region(2, cid(0), FaceId::face(3)).unwrap();
    m.add_to_region(2, cid(9), FaceId::WHOLE).unwrap();

    let chunks: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..3)
            .map(|k| {
                let m = &m;
                s.spawn(move || m.thread_sub_region(1, k).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    let mut seen = BTreeSet::new();
    for c in &chunks {
        for cv in c.convexes() {
            assert!(seen.insert(cv), "{cv} in two chunks");
        }
    }
    assert_eq!(seen.into_iter().collect::<Vec<_>>(), m.convex_ids().collect::<Vec<_>>());
    assert_eq!(m.cache_status().thread_sub_regions, 3);

    let face_chunks: Vec<_> = (0..3).map(|k| m.thread_sub_region(2, k).unwrap()).collect();
    let holder = face_chunks.iter().find(|c| c.contains(cid(0))).unwrap();
    assert_eq!(holder.faces_of_convex(cid(0)).len(), 2);
    assert_eq!(face_chunks.iter().map(|c| c.len()).sum::<usize>(), 3);

    assert_eq!(*m.thread_local_sub_region(1).unwrap(), *chunks[0]);
    assert!(matches!(
        m.thread_sub_region(1, 3),
        Err(MeshError::PreconditionViolation(_))
    ));

    assert!(m.add_to_region(1, cid(0), FaceId::face(0)).is_err());
    m.clear_region(2);
    assert_eq!(m.cache_status().thread_sub_regions, 0);
}

#[test]
fn ranks_own_disjoint_halves() {
    let base = quad_grid(4, 4);
    let owned: Vec<MeshRegion> = (0..2)
        .map(|rank| {
            let mut m = Mesh::new();
            m.copy_from(&base).unwrap();
            m.set_partitioning(ChunkPartitioner, StaticComm::new(rank, 2));
            m.mpi_region().unwrap().clone()
        })
        .collect();
    assert_eq!(owned[0].nb_convex(), 8);
    assert_eq!(owned[1].nb_convex(), 8);
    assert!(owned[0].intersection(&owned[1]).is_empty());

    let mut m = Mesh::new();
    m.copy_from(&base).unwrap();
    m.set_partitioning(ChunkPartitioner, StaticComm::new(1, 2));
    m.add_to_region(3, cid(0), FaceId::face(0)).unwrap();
    m.add_to_region(3, cid(15), FaceId::face(1)).unwrap();
    let sub = m.mpi_sub_region(3).unwrap();
    let want = [cid(0), cid(15)]
        .into_iter()
        .filter(|&cv| owned[1].contains(cv))
        .count();
    assert_eq!(sub.nb_convex(), want);
    for cv in sub.convexes() {
        assert!(owned[1].contains(cv));
        assert!(!sub.faces_of_convex(cv).is_empty());
    }

    m.clear_partitioning();
    assert!(m.mpi_region().unwrap().is_all());
    assert_eq!(m.mpi_sub_region(3).unwrap().nb_convex(), 2);
}
