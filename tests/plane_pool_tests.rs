use brushbsp::math::{Plane, PlaneSide, PlaneType, Vec3};
use brushbsp::planepool::PlanePool;
use cgmath::InnerSpace;
use std::sync::Arc;
use std::thread;

#[test]
fn axial_plane_is_stored_clean() {
    let pool = PlanePool::new();
    // a hair of noise on the other components gets zeroed
    let (index, side) = pool
        .find_plane(&Plane::new(Vec3::new(1.0, 1e-9, 0.0), 32.0))
        .unwrap();

    assert_eq!(PlaneSide::Front, side);
    assert_eq!(PlaneType::X, pool.plane_type(index));
    assert_eq!(Vec3::new(1.0, 0.0, 0.0), pool.get(index).normal);
}

#[test]
fn negative_dominant_axis_flips() {
    let pool = PlanePool::new();
    let (index, side) = pool
        .find_plane(&Plane::new(Vec3::new(-1.0, 0.0, 0.0), 32.0))
        .unwrap();

    assert_eq!(PlaneSide::Back, side);
    let stored = pool.get(index);
    assert_eq!(Vec3::new(1.0, 0.0, 0.0), stored.normal);
    assert_eq!(-32.0, stored.dist);
}

#[test]
fn reverse_query_matches_with_back_side() {
    let pool = PlanePool::new();
    let (a, _) = pool
        .find_plane(&Plane::new(Vec3::new(0.0, 0.0, 1.0), 16.0))
        .unwrap();
    let (b, side) = pool
        .find_plane(&Plane::new(Vec3::new(0.0, 0.0, -1.0), -16.0))
        .unwrap();

    assert_eq!(a, b);
    assert_eq!(PlaneSide::Back, side);
    assert_eq!(1, pool.len());
}

#[test]
fn near_equal_planes_share_an_index() {
    let pool = PlanePool::new();
    let tilted = Vec3::new(1.0, 2.0, 3.0).normalize();
    let (a, _) = pool.find_plane(&Plane::new(tilted, 100.0)).unwrap();
    let (b, _) = pool
        .find_plane(&Plane::new(tilted, 100.00004))
        .unwrap();

    assert_eq!(a, b);
    assert_eq!(1, pool.len());
}

#[test]
fn find_exact_never_reverse_matches() {
    let pool = PlanePool::new();
    let plane = Plane::new(Vec3::new(0.0, 1.0, 0.0), 8.0);
    let a = pool.find_plane_exact(&plane).unwrap();
    let b = pool.find_plane_exact(&-plane).unwrap();

    assert_ne!(a, b);
    assert_eq!(2, pool.len());
}

#[test]
fn non_unit_normal_is_rejected() {
    let pool = PlanePool::new();
    let result = pool.find_plane(&Plane::new(Vec3::new(2.0, 0.0, 0.0), 10.0));
    assert!(result.is_err());
}

#[test]
fn dominant_axis_type_for_tilted_planes() {
    let pool = PlanePool::new();
    let normal = Vec3::new(0.1, 0.2, 0.9).normalize();
    let (index, _) = pool.find_plane(&Plane::new(normal, 0.0)).unwrap();
    assert_eq!(PlaneType::AnyZ, pool.plane_type(index));
}

#[test]
fn concurrent_inserts_converge_on_one_plane() {
    let pool = Arc::new(PlanePool::new());

    let mut handles = Vec::new();
    for flip in [false, true, false, true] {
        let pool = Arc::clone(&pool);
        handles.push(thread::spawn(move || {
            let mut indices = Vec::new();
            for _ in 0..200 {
                let plane = if flip {
                    Plane::new(Vec3::new(0.0, 0.0, -1.0), -64.0)
                } else {
                    Plane::new(Vec3::new(0.0, 0.0, 1.0), 64.0)
                };
                indices.push(pool.find_plane(&plane).unwrap().0);
            }
            indices
        }));
    }

    let mut seen = std::collections::HashSet::new();
    for handle in handles {
        for index in handle.join().unwrap() {
            seen.insert(index);
        }
    }
    assert_eq!(1, seen.len());
    assert_eq!(1, pool.len());
}
