use brushbsp::compile::compile;
use brushbsp::game::{CONTENTS_SOLID, CONTENTS_WATER};
use brushbsp::map::{MapBrush, MapData, MapEntity, MapFace};
use brushbsp::math::{Plane, Vec3};
use brushbsp::options::Options;
use brushbsp::texinfo::{SurfFlags, TexInfo};

fn epairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn box_brush(min: Vec3, max: Vec3, texname: &str, linenum: usize) -> MapBrush {
    let mut faces = Vec::new();
    for axis in 0..3 {
        for sign in [1.0f64, -1.0] {
            let mut normal = Vec3::new(0.0, 0.0, 0.0);
            normal[axis] = sign;
            let dist = if sign > 0.0 { max[axis] } else { -min[axis] };
            faces.push(MapFace::new(Plane::new(normal, dist), texname, 0, linenum));
        }
    }
    MapBrush::new(faces)
}

fn cube_brush(center: Vec3, half: f64, texname: &str, linenum: usize) -> MapBrush {
    let h = Vec3::new(half, half, half);
    box_brush(center - h, center + h, texname, linenum)
}

fn make_map(entities: Vec<MapEntity>) -> MapData {
    let mut map = MapData::new(entities);
    map.add_miptex("base");
    map.texinfos.find_or_insert(TexInfo::new(
        [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]],
        0,
        SurfFlags::default(),
    ));
    map
}

fn cube_world() -> MapData {
    make_map(vec![MapEntity::new(
        epairs(&[("classname", "worldspawn")]),
        vec![cube_brush(Vec3::new(0.0, 0.0, 0.0), 16.0, "brick", 1)],
    )])
}

/// Six slabs enclosing a hollow cavity of ±64 around the origin.
fn room_brushes() -> Vec<MapBrush> {
    let outer = 80.0;
    let inner = 64.0;
    let mut brushes = Vec::new();
    for axis in 0..3 {
        for sign in [1.0f64, -1.0] {
            let mut min = Vec3::new(-outer, -outer, -outer);
            let mut max = Vec3::new(outer, outer, outer);
            if sign > 0.0 {
                min[axis] = inner;
            } else {
                max[axis] = -inner;
            }
            brushes.push(box_brush(min, max, "brick", 1 + axis * 2));
        }
    }
    brushes
}

#[test]
fn unit_cube_world_compiles_to_expected_lumps() {
    let mut map = cube_world();
    let options = Options::default();

    let output = compile(&mut map, &options).unwrap();
    let bsp = &output.bsp;

    assert_eq!(1, bsp.dmodels.len());
    assert_eq!(6, bsp.dfaces.len());
    assert_eq!(8, bsp.dvertexes.len());
    // twelve cube edges plus the reserved edge 0
    assert_eq!(13, bsp.dedges.len());
    assert_eq!(24, bsp.dsurfedges.len());
    assert_eq!(6, bsp.dnodes.len());
    // the shared solid leaf plus six empty leaves
    assert_eq!(7, bsp.dleafs.len());
    assert_eq!(CONTENTS_SOLID, bsp.dleafs[0].contents);
    assert_eq!(6, bsp.dleaffaces.len());
    // six draw planes, six hull-1 planes, five hull-2 planes (the lowered
    // floor plane is shared with hull 1)
    assert_eq!(17, bsp.dplanes.len());
    // two clipping hulls of six nodes each
    assert_eq!(12, bsp.dclipnodes.len());
    assert_eq!(0, bsp.dmodels[0].headnode[1]);
    assert_eq!(6, bsp.dmodels[0].headnode[2]);
    assert_eq!(6, bsp.dmodels[0].visleafs);

    // model bounds round-trip the brush bounds exactly
    assert_eq!([-16.0, -16.0, -16.0], bsp.dmodels[0].mins);
    assert_eq!([16.0, 16.0, 16.0], bsp.dmodels[0].maxs);

    let prt = output.portal_text.as_deref().unwrap();
    assert!(prt.starts_with("PRT1\n6\n"));

    // every surf-edge references a real edge with the right sign
    for &se in &bsp.dsurfedges {
        assert_ne!(0, se);
        assert!((se.unsigned_abs() as usize) < bsp.dedges.len());
    }
    // clipnode children are node indices or content classes
    for clipnode in &bsp.dclipnodes {
        for &child in &clipnode.children {
            assert!(child >= 0 && (child as usize) < bsp.dclipnodes.len() || child < 0);
        }
    }
}

#[test]
fn recompiling_the_same_map_is_deterministic() {
    let options = Options::default();

    let mut first = cube_world();
    let a = compile(&mut first, &options).unwrap();
    let mut second = cube_world();
    let b = compile(&mut second, &options).unwrap();

    assert_eq!(a.portal_text, b.portal_text);
    assert_eq!(a.bsp.entdata, b.bsp.entdata);
    assert_eq!(a.bsp.dplanes, b.bsp.dplanes);
    assert_eq!(a.bsp.dfaces, b.bsp.dfaces);
    assert_eq!(a.bsp.dsurfedges, b.bsp.dsurfedges);
    assert_eq!(a.bsp.dleafs, b.bsp.dleafs);
}

#[test]
fn point_entities_survive_only_in_the_entity_text() {
    let mut map = make_map(vec![
        MapEntity::new(
            epairs(&[("classname", "worldspawn")]),
            vec![cube_brush(Vec3::new(0.0, 0.0, 0.0), 16.0, "brick", 1)],
        ),
        MapEntity::new(
            epairs(&[("classname", "light"), ("origin", "0 0 32")]),
            vec![],
        ),
    ]);
    let options = Options::default();

    let output = compile(&mut map, &options).unwrap();

    assert_eq!(1, output.bsp.dmodels.len());
    assert!(output.bsp.entdata.contains("\"classname\" \"light\""));
    assert!(output.bsp.entdata.contains("\"origin\" \"0 0 32\""));
}

#[test]
fn brush_entities_become_numbered_submodels() {
    let mut map = make_map(vec![
        MapEntity::new(
            epairs(&[("classname", "worldspawn")]),
            vec![cube_brush(Vec3::new(0.0, 0.0, 0.0), 16.0, "brick", 1)],
        ),
        MapEntity::new(
            epairs(&[("classname", "func_wall")]),
            vec![cube_brush(Vec3::new(64.0, 0.0, 0.0), 8.0, "brick", 9)],
        ),
    ]);
    let options = Options::default();

    let output = compile(&mut map, &options).unwrap();

    assert_eq!(2, output.bsp.dmodels.len());
    assert_eq!("*1", map.entities[1].value_for_key("model"));
    assert!(output.bsp.entdata.contains("\"model\" \"*1\""));
}

#[test]
fn water_room_portals_respect_transwater() {
    let build = || {
        let mut brushes = room_brushes();
        brushes.push(cube_brush(Vec3::new(0.0, 0.0, 0.0), 16.0, "*water1", 20));
        make_map(vec![MapEntity::new(
            epairs(&[("classname", "worldspawn")]),
            brushes,
        )])
    };

    let opaque = compile(&mut build(), &Options::default()).unwrap();
    let trans = compile(
        &mut build(),
        &Options {
            transwater: true,
            ..Options::default()
        },
    )
    .unwrap();

    let opaque_state = opaque.portal_state.unwrap();
    let trans_state = trans.portal_state.unwrap();

    // same leaves either way, but the water surface only passes vision
    // when asked to
    assert_eq!(opaque_state.num_visleafs, trans_state.num_visleafs);
    assert!(trans_state.num_visportals > opaque_state.num_visportals);

    // the water volume is a real leaf
    assert!(opaque
        .bsp
        .dleafs
        .iter()
        .any(|leaf| leaf.contents == CONTENTS_WATER));
}

#[test]
fn detail_geometry_collapses_into_one_cluster() {
    let build = |force_prt1: bool| {
        let mut map = make_map(vec![
            MapEntity::new(epairs(&[("classname", "worldspawn")]), room_brushes()),
            MapEntity::new(
                epairs(&[("classname", "func_detail")]),
                vec![cube_brush(Vec3::new(0.0, 0.0, 0.0), 16.0, "brick", 30)],
            ),
        ]);
        let options = Options {
            force_prt1,
            ..Options::default()
        };
        (compile(&mut map, &options).unwrap(), map)
    };

    let (output, map) = build(false);
    let state = output.portal_state.unwrap();
    assert!(state.uses_detail);
    assert!(state.num_visclusters < state.num_visleafs);
    assert!(output.portal_text.as_deref().unwrap().starts_with("PRT2\n"));
    // the dissolved func_detail entity is gone from the entity text
    assert!(!output.bsp.entdata.contains("func_detail"));
    assert_eq!(1, output.bsp.dmodels.len());
    let _ = map;

    let (output, _map) = build(true);
    assert!(output.portal_text.as_deref().unwrap().starts_with("PRT1\n"));
}

#[test]
fn rotation_entity_is_compiled_in_its_local_frame() {
    let mut map = make_map(vec![
        MapEntity::new(
            epairs(&[("classname", "worldspawn")]),
            vec![cube_brush(Vec3::new(0.0, 0.0, 0.0), 16.0, "brick", 1)],
        ),
        MapEntity::new(
            epairs(&[("classname", "rotate_door"), ("target", "t1")]),
            vec![cube_brush(Vec3::new(64.0, 0.0, 0.0), 16.0, "brick", 9)],
        ),
        MapEntity::new(
            epairs(&[
                ("classname", "info_rotate"),
                ("targetname", "t1"),
                ("origin", "64 0 0"),
            ]),
            vec![],
        ),
    ]);
    let options = Options::default();

    let output = compile(&mut map, &options).unwrap();

    assert_eq!("64 0 0", map.entities[1].value_for_key("origin"));
    assert_eq!([-16.0, -16.0, -16.0], output.bsp.dmodels[1].mins);
    assert_eq!([16.0, 16.0, 16.0], output.bsp.dmodels[1].maxs);
}

#[test]
fn lmscale_emits_the_lmshift_lump() {
    let mut map = make_map(vec![MapEntity::new(
        epairs(&[("classname", "worldspawn"), ("_lmscale", "4")]),
        vec![cube_brush(Vec3::new(0.0, 0.0, 0.0), 16.0, "brick", 1)],
    )]);
    let options = Options::default();

    let output = compile(&mut map, &options).unwrap();

    // 4x scale is a shift of 6 (64 units per luxel)
    assert!(output.bsp.needs_lmshifts);
    assert_eq!(6, output.bsp.lmshifts[0]);
    assert_eq!(output.bsp.dfaces.len(), output.bsp.lmshifts.len());
}

#[test]
fn default_lmscale_elides_the_lump() {
    let mut map = cube_world();
    let output = compile(&mut map, &Options::default()).unwrap();
    assert!(!output.bsp.needs_lmshifts);
    assert!(output.bsp.lmshifts.is_empty());
}

#[test]
fn bspx_brushlist_records_model_brushes() {
    let mut map = cube_world();
    let options = Options {
        bspx_brushlist: true,
        ..Options::default()
    };

    let output = compile(&mut map, &options).unwrap();

    assert_eq!(1, output.bsp.bspx_brushes.len());
    let model = &output.bsp.bspx_brushes[0];
    assert_eq!(0, model.modelnum);
    assert_eq!(1, model.brushes.len());
    // an axial cube needs no explicit planes beyond its bounds
    assert!(model.brushes[0].planes.is_empty());
    assert_eq!(CONTENTS_SOLID, model.brushes[0].contents);
}

#[test]
fn skip_textured_faces_honour_include_skip() {
    let build = |include_skip: bool| {
        let mut map = MapData::new(vec![MapEntity::new(
            epairs(&[("classname", "worldspawn")]),
            vec![cube_brush(Vec3::new(0.0, 0.0, 0.0), 16.0, "skip", 1)],
        )]);
        map.add_miptex("skip");
        map.texinfos.find_or_insert(TexInfo::new(
            [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]],
            0,
            SurfFlags {
                native: 0,
                extended: brushbsp::texinfo::TexFlags::SKIP,
            },
        ));
        let options = Options {
            include_skip,
            ..Options::default()
        };
        compile(&mut map, &options).unwrap()
    };

    let without = build(false);
    assert_eq!(0, without.bsp.dleaffaces.len());
    // faces themselves stay present either way
    assert_eq!(6, without.bsp.dfaces.len());
    // a non-native flag forces the sidecar record out
    let sidecar = without.texinfo_sidecar.expect("skip flag needs the sidecar");
    assert_eq!(1, sidecar.num_texinfo);
    assert!(sidecar.flags[0].extended.contains(brushbsp::texinfo::TexFlags::SKIP));

    let with = build(true);
    assert_eq!(6, with.bsp.dleaffaces.len());
}

#[test]
fn plain_maps_need_no_texinfo_sidecar() {
    let mut map = cube_world();
    let output = compile(&mut map, &Options::default()).unwrap();
    assert!(output.texinfo_sidecar.is_none());
}
