use brushbsp::math::{Plane, Vec3, ON_EPSILON};
use brushbsp::winding::{
    point_on_open_segment, try_merge_windings, SplitResult, Winding, MAX_EDGES,
};
use cgmath::InnerSpace;

fn square_xy() -> Winding {
    Winding::new(vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
    ])
}

#[test]
fn base_winding_lies_on_plane() {
    let plane = Plane::new(Vec3::new(0.0, 0.0, 1.0), 5.0);
    let winding = Winding::base_for_plane(&plane, 1024.0);

    assert_eq!(4, winding.len());
    for p in &winding.points {
        assert!(plane.distance_to(*p).abs() < ON_EPSILON);
    }

    let recovered = winding.plane().unwrap();
    assert!(recovered.normal.dot(plane.normal) > 0.999);
    assert!((recovered.dist - plane.dist).abs() < ON_EPSILON);
}

#[test]
fn base_winding_tilted_plane() {
    let normal = Vec3::new(1.0, 2.0, 3.0).normalize();
    let plane = Plane::new(normal, 10.0);
    let winding = Winding::base_for_plane(&plane, 65536.0);
    let recovered = winding.plane().unwrap();
    assert!(recovered.normal.dot(normal) > 0.9999);
}

#[test]
fn split_front_back_coplanar() {
    let w = square_xy();

    let below = Plane::new(Vec3::new(0.0, 0.0, 1.0), -1.0);
    assert_eq!(SplitResult::Front, w.split(&below, ON_EPSILON));

    let above = Plane::new(Vec3::new(0.0, 0.0, 1.0), 1.0);
    assert_eq!(SplitResult::Back, w.split(&above, ON_EPSILON));

    let on = Plane::new(Vec3::new(0.0, 0.0, 1.0), 0.0);
    assert_eq!(SplitResult::Coplanar, w.split(&on, ON_EPSILON));
}

#[test]
fn split_through_middle_snaps_axial_component() {
    let w = square_xy();
    let plane = Plane::new(Vec3::new(1.0, 0.0, 0.0), 0.5);

    match w.split(&plane, ON_EPSILON) {
        SplitResult::Split(front, back) => {
            assert_eq!(4, front.len());
            assert_eq!(4, back.len());
            // split points must land exactly on the axial plane
            for p in front.points.iter().chain(back.points.iter()) {
                if (p.x - 0.5).abs() < 0.25 {
                    assert_eq!(0.5, p.x);
                }
            }
            assert!((front.area() + back.area() - 1.0).abs() < 1e-9);
        }
        other => panic!("expected a split, got {:?}", other),
    }
}

#[test]
fn clip_front_keep_on() {
    let w = square_xy();
    let on = Plane::new(Vec3::new(0.0, 0.0, 1.0), 0.0);

    assert!(w.clone().clip_front(&on, ON_EPSILON, true).is_some());
    assert!(w.clip_front(&on, ON_EPSILON, false).is_none());
}

#[test]
fn merge_two_squares_into_rectangle() {
    let a = square_xy();
    let b = Winding::new(vec![
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(2.0, 0.0, 0.0),
        Vec3::new(2.0, 1.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
    ]);
    let normal = a.plane().unwrap().normal;

    let merged = try_merge_windings(&a, &b, normal).expect("squares share an edge");
    assert_eq!(4, merged.len());
    assert!((merged.area() - 2.0).abs() < 1e-9);
}

#[test]
fn merge_rejects_disjoint_windings() {
    let a = square_xy();
    let b = Winding::new(vec![
        Vec3::new(5.0, 0.0, 0.0),
        Vec3::new(6.0, 0.0, 0.0),
        Vec3::new(6.0, 1.0, 0.0),
        Vec3::new(5.0, 1.0, 0.0),
    ]);
    let normal = a.plane().unwrap().normal;
    assert!(try_merge_windings(&a, &b, normal).is_none());
}

#[test]
fn merge_rejects_nonconvex_joint() {
    // joined outline would turn outwards at the shared edge
    let a = square_xy();
    let b = Winding::new(vec![
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(2.0, -1.0, 0.0),
        Vec3::new(3.0, 0.5, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
    ]);
    let normal = a.plane().unwrap().normal;
    assert!(try_merge_windings(&a, &b, normal).is_none());
}

#[test]
fn point_on_open_segment_detects_interior_points_only() {
    let a = Vec3::new(0.0, 0.0, 0.0);
    let b = Vec3::new(2.0, 0.0, 0.0);

    assert!(point_on_open_segment(Vec3::new(1.0, 0.0, 0.0), a, b, ON_EPSILON).is_some());
    // endpoints don't count
    assert!(point_on_open_segment(a, a, b, ON_EPSILON).is_none());
    assert!(point_on_open_segment(b, a, b, ON_EPSILON).is_none());
    // off the line doesn't count
    assert!(point_on_open_segment(Vec3::new(1.0, 0.5, 0.0), a, b, ON_EPSILON).is_none());
    // beyond the segment doesn't count
    assert!(point_on_open_segment(Vec3::new(3.0, 0.0, 0.0), a, b, ON_EPSILON).is_none());
}

#[test]
fn winding_cap_is_sane() {
    assert_eq!(64, MAX_EDGES);
}
