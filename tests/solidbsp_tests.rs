use brushbsp::brush::load_entity_brushes;
use brushbsp::bsp::Tree;
use brushbsp::csg::csg_faces;
use brushbsp::game::CONTENTS_EMPTY;
use brushbsp::game::CONTENTS_SOLID;
use brushbsp::map::{MapBrush, MapData, MapEntity, MapFace};
use brushbsp::math::{Plane, Vec3};
use brushbsp::options::Options;
use brushbsp::solidbsp::solid_bsp;
use brushbsp::texinfo::{SurfFlags, TexInfo};

fn epairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn cube_brush(center: Vec3, half: f64, texname: &str, linenum: usize) -> MapBrush {
    let mut faces = Vec::new();
    for axis in 0..3 {
        for sign in [1.0f64, -1.0] {
            let mut normal = Vec3::new(0.0, 0.0, 0.0);
            normal[axis] = sign;
            let dist = center[axis] * sign + half;
            faces.push(MapFace::new(Plane::new(normal, dist), texname, 0, linenum));
        }
    }
    MapBrush::new(faces)
}

fn register_base_texinfo(map: &mut MapData) {
    map.add_miptex("base");
    map.texinfos.find_or_insert(TexInfo::new(
        [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]],
        0,
        SurfFlags::default(),
    ));
}

fn cube_tree() -> (MapData, Tree) {
    let world = MapEntity::new(
        epairs(&[("classname", "worldspawn")]),
        vec![cube_brush(Vec3::new(0.0, 0.0, 0.0), 16.0, "brick", 1)],
    );
    let mut map = MapData::new(vec![world]);
    register_base_texinfo(&mut map);
    let options = Options::default();

    let brushes = load_entity_brushes(&mut map, 0, 0, 0, &options).unwrap();
    let surfaces = csg_faces(&brushes, options.game(), &map.planes);
    let bounds = map.entities[0].bounds;
    let tree = solid_bsp(&bounds, surfaces, 0, &map.planes, options.game()).unwrap();
    (map, tree)
}

fn walk_leaves(tree: &Tree, node: usize, leaves: &mut Vec<usize>, internals: &mut Vec<usize>) {
    if tree.nodes[node].is_leaf() {
        leaves.push(node);
    } else {
        internals.push(node);
        let [front, back] = tree.nodes[node].children;
        walk_leaves(tree, front, leaves, internals);
        walk_leaves(tree, back, leaves, internals);
    }
}

#[test]
fn cube_partitions_into_six_nodes() {
    let (_map, tree) = cube_tree();

    let mut leaves = Vec::new();
    let mut internals = Vec::new();
    walk_leaves(&tree, tree.headnode, &mut leaves, &mut internals);

    assert_eq!(6, internals.len());
    assert_eq!(7, leaves.len());

    let solid: Vec<_> = leaves
        .iter()
        .filter(|&&l| tree.nodes[l].contents.native == CONTENTS_SOLID)
        .collect();
    let empty: Vec<_> = leaves
        .iter()
        .filter(|&&l| tree.nodes[l].contents.native == CONTENTS_EMPTY)
        .collect();
    assert_eq!(1, solid.len());
    assert_eq!(6, empty.len());

    // every empty leaf is bounded by exactly one of the cube's faces
    for &&leaf in &empty {
        assert_eq!(1, tree.nodes[leaf].markfaces.len());
    }
    // the enclosed volume references no faces at all
    assert!(tree.nodes[*solid[0]].markfaces.is_empty());
}

#[test]
fn internal_nodes_have_distinct_children_and_plane_faces() {
    let (_map, tree) = cube_tree();

    let mut leaves = Vec::new();
    let mut internals = Vec::new();
    walk_leaves(&tree, tree.headnode, &mut leaves, &mut internals);

    for &node in &internals {
        let n = &tree.nodes[node];
        assert_ne!(n.children[0], n.children[1]);
        assert!(n.planenum.is_some());
        assert_eq!(1, n.faces.len());
        // the node's faces lie on its plane
        for &face_id in &n.faces {
            assert_eq!(tree.faces[face_id].planenum, n.planenum.unwrap());
        }
    }
}

#[test]
fn working_faces_link_back_to_node_faces() {
    let (_map, tree) = cube_tree();

    let mut leaves = Vec::new();
    let mut internals = Vec::new();
    walk_leaves(&tree, tree.headnode, &mut leaves, &mut internals);

    for &leaf in &leaves {
        for &markface in &tree.nodes[leaf].markfaces {
            assert!(markface < tree.faces.len());
        }
    }
}

#[test]
fn detail_only_geometry_marks_a_detail_separator() {
    let world = MapEntity::new(epairs(&[("classname", "worldspawn")]), vec![]);
    let detail = MapEntity::new(
        epairs(&[("classname", "func_detail")]),
        vec![cube_brush(Vec3::new(0.0, 0.0, 0.0), 16.0, "brick", 4)],
    );
    let mut map = MapData::new(vec![world, detail]);
    register_base_texinfo(&mut map);
    let options = Options::default();

    let brushes = load_entity_brushes(&mut map, 0, 1, 0, &options).unwrap();
    let surfaces = csg_faces(&brushes, options.game(), &map.planes);
    let bounds = map.entities[0].bounds;
    let tree = solid_bsp(&bounds, surfaces, 0, &map.planes, options.game()).unwrap();

    assert!(tree.nodes[tree.headnode].detail_separator);
}

#[test]
fn midsplit_still_produces_a_valid_tree() {
    let world = MapEntity::new(
        epairs(&[("classname", "worldspawn")]),
        vec![
            cube_brush(Vec3::new(-64.0, 0.0, 0.0), 16.0, "brick", 1),
            cube_brush(Vec3::new(64.0, 0.0, 0.0), 16.0, "brick", 8),
        ],
    );
    let mut map = MapData::new(vec![world]);
    register_base_texinfo(&mut map);
    let options = Options::default();

    let brushes = load_entity_brushes(&mut map, 0, 0, 0, &options).unwrap();
    let surfaces = csg_faces(&brushes, options.game(), &map.planes);
    let bounds = map.entities[0].bounds;
    let tree = solid_bsp(&bounds, surfaces, 3, &map.planes, options.game()).unwrap();

    let mut leaves = Vec::new();
    let mut internals = Vec::new();
    walk_leaves(&tree, tree.headnode, &mut leaves, &mut internals);

    let solid = leaves
        .iter()
        .filter(|&&l| tree.nodes[l].contents.native == CONTENTS_SOLID)
        .count();
    assert_eq!(2, solid);
}
