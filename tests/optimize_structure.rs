mod util;
use fem_mesh::prelude::*;
use util::*;

#[test]
fn ids_become_contiguous_in_order() {
    let mut m = quad_grid(3, 2);
    let extra = m.add_point(&[10.0, 10.0]).unwrap();
    m.add_point(&[11.0, 10.0]).unwrap();
    m.remove_point(extra).unwrap();
    m.remove_convex(cid(1)).unwrap();
    m.remove_convex(cid(3)).unwrap();
    m.add_to_region(5, cid(4), FaceId::face(2)).unwrap();
    m.add_to_region(5, cid(5), FaceId::WHOLE).unwrap();

    let coords_before: Vec<Vec<f64>> = m.point_ids().map(|p| m.point(p).unwrap().to_vec()).collect();
    let geometry_before: Vec<Vec<Vec<f64>>> = m
        .convex_ids()
        .map(|cv| {
            m.points_of_convex(cv)
                .unwrap()
                .into_iter()
                .map(<[f64]>::to_vec)
                .collect()
        })
        .collect();
    let rec = Recorder::new();
    m.subscribe(&rec);

    m.optimize_structure().unwrap();

    assert_eq!(
        rec.take(),
        vec![
            Event::Swap(cid(2), cid(1)),
            Event::Swap(cid(4), cid(2)),
            Event::Swap(cid(5), cid(3)),
        ]
    );
    let n = coords_before.len();
    assert_eq!(m.point_ids().collect::<Vec<_>>(), (0..n).map(pid).collect::<Vec<_>>());
    let coords_after: Vec<Vec<f64>> = m.point_ids().map(|p| m.point(p).unwrap().to_vec()).collect();
    assert_eq!(coords_after, coords_before);

    assert_eq!(m.convex_ids().collect::<Vec<_>>(), (0..4).map(cid).collect::<Vec<_>>());
    for (cv, want) in m.convex_ids().zip(&geometry_before) {
        let got: Vec<Vec<f64>> = m
            .points_of_convex(cv)
            .unwrap()
            .into_iter()
            .map(<[f64]>::to_vec)
            .collect();
        assert_eq!(&got, want);
    }
    let r = m.region(5);
    assert!(r.contains_face(cid(2), FaceId::face(2)));
    assert!(r.contains_face(cid(3), FaceId::WHOLE));
    assert_eq!(r.len(), 2);
}

#[test]
fn compact_mesh_is_left_alone() {
    let mut m = quad_grid(2, 1);
    let v = m.version();
    m.optimize_structure().unwrap();
    assert_eq!(m.version(), v);
}

#[test]
fn rejected_move_restores_numbering() {
    let mut m = quad_grid(3, 2);
    m.remove_convex(cid(1)).unwrap();
    m.remove_convex(cid(3)).unwrap();
    m.add_to_region(5, cid(4), FaceId::face(2)).unwrap();
    let ids_before: Vec<ConvexId> = m.convex_ids().collect();
    let points_before: Vec<Vec<PointId>> = ids_before
        .iter()
        .map(|&cv| m.ind_points_of_convex(cv).unwrap().to_vec())
        .collect();

    let rec = Recorder::new();
    m.subscribe(&rec);
    rec.reject_once_after("SwapConvex", 2);
    assert!(matches!(
        m.optimize_structure(),
        Err(MeshError::InternalConsistencyFault(_))
    ));

    assert_eq!(
        rec.take(),
        vec![
            Event::Swap(cid(2), cid(1)),
            Event::Swap(cid(4), cid(2)),
            Event::Swap(cid(4), cid(2)),
            Event::Swap(cid(2), cid(1)),
        ]
    );
    assert_eq!(m.convex_ids().collect::<Vec<_>>(), ids_before);
    for (&cv, want) in ids_before.iter().zip(&points_before) {
        assert_eq!(m.ind_points_of_convex(cv).unwrap(), want.as_slice());
        for &p in want {
            assert!(m.convexes_of_point(p).unwrap().contains(&cv));
        }
    }
    assert!(m.region(5).contains_face(cid(4), FaceId::face(2)));

    m.optimize_structure().unwrap();
    assert_eq!(m.convex_ids().collect::<Vec<_>>(), (0..4).map(cid).collect::<Vec<_>>());
}
