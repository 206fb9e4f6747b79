use brushbsp::aabb::Aabb;
use brushbsp::brush::load_entity_brushes;
use brushbsp::bsp::NO_NODE;
use brushbsp::csg::csg_faces;
use brushbsp::map::{MapBrush, MapData, MapEntity, MapFace};
use brushbsp::math::{Plane, Vec3};
use brushbsp::options::Options;
use brushbsp::planepool::PlanePool;
use brushbsp::portal::{check_portal_symmetry, portalize_tree};
use brushbsp::prtfile::write_portal_file;
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

#[test]
fn empty_tree_gets_the_six_outside_portals() {
    let planes = PlanePool::new();
    let options = Options::default();
    let bounds = Aabb::new_from_min_max(Vec3::new(-64.0, -64.0, -64.0), Vec3::new(64.0, 64.0, 64.0));

    let mut tree = solid_bsp(&bounds, Vec::new(), 0, &planes, options.game()).unwrap();
    portalize_tree(&mut tree, &planes, options.world_extent).unwrap();

    // the lone leaf is ringed by the six outside portals, nothing else
    let mut count = 0;
    let mut cursor = tree.nodes[tree.headnode].portals;
    while let Some(p) = cursor {
        let side = if tree.portals[p].nodes[0] == tree.headnode {
            0
        } else {
            1
        };
        assert_eq!(tree.portals[p].nodes[1 - side], tree.outside_node);
        cursor = tree.portals[p].next[side];
        count += 1;
    }
    assert_eq!(6, count);
    check_portal_symmetry(&tree).unwrap();
}

#[test]
fn cube_world_portal_graph_is_symmetric() {
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
    let mut tree = solid_bsp(&bounds, surfaces, 0, &map.planes, options.game()).unwrap();

    portalize_tree(&mut tree, &map.planes, options.world_extent).unwrap();
    check_portal_symmetry(&tree).unwrap();

    // every linked portal joins two distinct nodes
    for portal in &tree.portals {
        if portal.nodes == [NO_NODE, NO_NODE] {
            continue;
        }
        assert_ne!(portal.nodes[0], portal.nodes[1]);
    }

    let (text, state) = write_portal_file(&mut tree, &map.planes, &options).unwrap();
    assert!(text.starts_with("PRT1\n6\n"));
    assert_eq!(6, state.num_visleafs);
    assert_eq!(6, state.num_visclusters);
    assert!(state.num_visportals > 0);
    // one line per portal after the three header lines
    assert_eq!(3 + state.num_visportals, text.trim_end().lines().count());
}

#[test]
fn portal_windings_lie_on_their_planes() {
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
    let mut tree = solid_bsp(&bounds, surfaces, 0, &map.planes, options.game()).unwrap();
    portalize_tree(&mut tree, &map.planes, options.world_extent).unwrap();

    for portal in &tree.portals {
        if portal.nodes == [NO_NODE, NO_NODE] {
            continue;
        }
        let plane = map.planes.get(portal.planenum);
        for p in &portal.winding.points {
            assert!(plane.distance_to(*p).abs() < 0.01);
        }
    }
}
