use brushbsp::brush::load_entity_brushes;
use brushbsp::csg::csg_faces;
use brushbsp::map::{MapBrush, MapData, MapEntity, MapFace};
use brushbsp::math::{Plane, PlaneSide, Vec3};
use brushbsp::options::Options;
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

fn world_map(brushes: Vec<MapBrush>) -> MapData {
    let world = MapEntity::new(epairs(&[("classname", "worldspawn")]), brushes);
    let mut map = MapData::new(vec![world]);
    map.add_miptex("base");
    map.texinfos.find_or_insert(TexInfo::new(
        [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]],
        0,
        SurfFlags::default(),
    ));
    map
}

fn face_count(surfaces: &[brushbsp::csg::Surface]) -> usize {
    surfaces.iter().map(|s| s.faces.len()).sum()
}

#[test]
fn single_cube_passes_through() {
    let mut map = world_map(vec![cube_brush(Vec3::new(0.0, 0.0, 0.0), 16.0, "brick", 1)]);
    let options = Options::default();
    let brushes = load_entity_brushes(&mut map, 0, 0, 0, &options).unwrap();

    let surfaces = csg_faces(&brushes, options.game(), &map.planes);

    assert_eq!(6, surfaces.len());
    assert_eq!(6, face_count(&surfaces));
}

#[test]
fn identical_cubes_keep_one_set_of_faces() {
    // the earlier-parsed brush wins every coplanar face
    let mut map = world_map(vec![
        cube_brush(Vec3::new(0.0, 0.0, 0.0), 16.0, "brick", 1),
        cube_brush(Vec3::new(0.0, 0.0, 0.0), 16.0, "brick", 8),
    ]);
    let options = Options::default();
    let brushes = load_entity_brushes(&mut map, 0, 0, 0, &options).unwrap();

    let surfaces = csg_faces(&brushes, options.game(), &map.planes);

    assert_eq!(6, face_count(&surfaces));
    for surface in &surfaces {
        assert_eq!(1, surface.faces.len());
        assert_eq!(1, surface.faces[0].linenum);
    }
}

#[test]
fn overlapping_cubes_union_like_a_box() {
    // two cubes sharing their y/z extents merge into one box worth of
    // faces: buried fragments vanish, coplanar fragments re-join
    let mut map = world_map(vec![
        cube_brush(Vec3::new(0.0, 0.0, 0.0), 16.0, "brick", 1),
        cube_brush(Vec3::new(16.0, 0.0, 0.0), 16.0, "brick", 8),
    ]);
    let options = Options::default();
    let brushes = load_entity_brushes(&mut map, 0, 0, 0, &options).unwrap();

    let surfaces = csg_faces(&brushes, options.game(), &map.planes);

    assert_eq!(6, face_count(&surfaces));

    // the merged box spans x in [-16, 32]
    let mut bounds = brushbsp::aabb::Aabb::new();
    for surface in &surfaces {
        for face in &surface.faces {
            for p in &face.winding.points {
                bounds.add_point(*p);
            }
        }
    }
    assert_eq!(Vec3::new(-16.0, -16.0, -16.0), bounds.min);
    assert_eq!(Vec3::new(32.0, 16.0, 16.0), bounds.max);
}

#[test]
fn liquid_brush_mirrors_interior_faces() {
    let mut map = world_map(vec![cube_brush(Vec3::new(0.0, 0.0, 0.0), 16.0, "*water1", 1)]);
    let options = Options::default();
    let game = options.game();
    let brushes = load_entity_brushes(&mut map, 0, 0, 0, &options).unwrap();

    let surfaces = csg_faces(&brushes, game, &map.planes);

    assert_eq!(6, surfaces.len());
    assert_eq!(12, face_count(&surfaces));

    for surface in &surfaces {
        assert_eq!(2, surface.faces.len());
        let (a, b) = (&surface.faces[0], &surface.faces[1]);
        assert_ne!(a.planeside, b.planeside);
        // the mirrored copy faces the liquid volume
        let inward = if a.planeside == PlaneSide::Back { a } else { b };
        assert!(game.is_liquid(&inward.contents[0]) || game.is_liquid(&inward.contents[1]));
        // windings are reverses of each other
        let mut reversed = b.winding.points.clone();
        reversed.reverse();
        assert_eq!(a.winding.points.len(), reversed.len());
    }
}

#[test]
fn solid_face_submerged_in_water_takes_water_in_front() {
    // a solid pillar standing inside a larger water volume
    let mut map = world_map(vec![
        cube_brush(Vec3::new(0.0, 0.0, 0.0), 64.0, "*water1", 1),
        cube_brush(Vec3::new(0.0, 0.0, 0.0), 16.0, "brick", 8),
    ]);
    let options = Options::default();
    let game = options.game();
    let brushes = load_entity_brushes(&mut map, 0, 0, 0, &options).unwrap();

    let surfaces = csg_faces(&brushes, game, &map.planes);

    // the pillar's faces survive with water in front of them
    let pillar_faces: Vec<_> = surfaces
        .iter()
        .flat_map(|s| s.faces.iter())
        .filter(|f| f.linenum == 8)
        .collect();
    assert_eq!(6, pillar_faces.len());
    for face in &pillar_faces {
        assert!(game.is_liquid(&face.contents[0]));
    }

    // the water's faces buried inside the pillar are gone, but its outer
    // shell (12 = 6 outward + 6 mirrored) survives
    let water_faces = face_count(&surfaces) - pillar_faces.len();
    assert_eq!(12, water_faces);
}
