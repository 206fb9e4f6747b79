use brushbsp::aabb::Aabb;
use brushbsp::bsp::Tree;
use brushbsp::face::Face;
use brushbsp::math::{PlaneSide, Vec3};
use brushbsp::tjunc::tjunc;
use brushbsp::winding::Winding;

fn quad(points: [(f64, f64); 4]) -> Winding {
    Winding::new(
        points
            .iter()
            .map(|&(x, y)| Vec3::new(x, y, 0.0))
            .collect(),
    )
}

fn tree_with_faces(windings: Vec<Winding>) -> Tree {
    let bounds = Aabb::new_from_min_max(Vec3::new(-64.0, -64.0, -64.0), Vec3::new(64.0, 64.0, 64.0));
    let mut tree = Tree::new(bounds);
    for winding in windings {
        tree.add_face(Face::new(0, PlaneSide::Front, 0, winding, 0));
    }
    tree
}

#[test]
fn vertex_on_neighbouring_edge_is_inserted() {
    // the small quad's corner (1, 0) lies in the middle of the big quad's
    // bottom edge
    let big = quad([(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]);
    let small = quad([(1.0, 0.0), (3.0, 0.0), (3.0, -2.0), (1.0, -2.0)]);
    let mut tree = tree_with_faces(vec![big, small]);

    tjunc(&mut tree);

    let big = &tree.faces[0];
    assert_eq!(5, big.winding.len());
    // inserted between the edge's endpoints, preserving winding order
    let idx = big
        .winding
        .points
        .iter()
        .position(|p| *p == Vec3::new(1.0, 0.0, 0.0))
        .expect("vertex welded in");
    assert_eq!(Vec3::new(0.0, 0.0, 0.0), big.winding.points[idx - 1]);
    assert_eq!(Vec3::new(2.0, 0.0, 0.0), big.winding.points[(idx + 1) % 5]);

    // the welding is mutual: the big quad's corner (2, 0) sits on the
    // small quad's top edge
    assert_eq!(5, tree.faces[1].winding.len());
    assert!(tree.faces[1]
        .winding
        .points
        .contains(&Vec3::new(2.0, 0.0, 0.0)));
}

#[test]
fn matching_edges_are_left_alone() {
    let a = quad([(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]);
    let b = quad([(2.0, 0.0), (4.0, 0.0), (4.0, 2.0), (2.0, 2.0)]);
    let mut tree = tree_with_faces(vec![a, b]);

    tjunc(&mut tree);

    assert_eq!(4, tree.faces[0].winding.len());
    assert_eq!(4, tree.faces[1].winding.len());
    assert_eq!(2, tree.faces.len());
}

#[test]
fn multiple_vertices_insert_in_order_along_the_edge() {
    let big = quad([(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]);
    let s1 = quad([(1.0, 0.0), (2.0, 0.0), (2.0, -1.0), (1.0, -1.0)]);
    let s2 = quad([(3.0, 0.0), (3.5, 0.0), (3.5, -1.0), (3.0, -1.0)]);
    let mut tree = tree_with_faces(vec![big, s1, s2]);

    tjunc(&mut tree);

    let points = &tree.faces[0].winding.points;
    assert_eq!(8, points.len());
    let xs: Vec<f64> = points
        .iter()
        .take_while(|p| p.y == 0.0)
        .map(|p| p.x)
        .collect();
    assert_eq!(vec![0.0, 1.0, 2.0, 3.0, 3.5, 4.0], xs);
}
