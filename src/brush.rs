use crate::aabb::Aabb;
use crate::error::{CompileError, Result};
use crate::face::{Face, DEFAULT_LMSHIFT};
use crate::game::{ContentFlags, ExtContents, GameDef};
use crate::map::MapData;
use crate::math::{snap_coord, Plane, Vec3, ANGLE_EPSILON, NORMAL_EPSILON, ON_EPSILON};
use crate::options::{HullExpansion, Options, TargetGame};
use crate::texinfo::{TexFlags, TexInfo};
use crate::winding::{Winding, MAX_EDGES};
use cgmath::InnerSpace;

// Beveled clipping hulls can generate many extra faces.
pub const MAX_FACES: usize = 128;
pub const MAX_HULL_POINTS: usize = 512;
pub const MAX_HULL_EDGES: usize = 1024;

/// How an entity's rotation offset was established.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rotation {
    None,
    /// Centroid of an origin-textured brush.
    OriginBrush,
    /// `rotate_*` classname with a targeted origin.
    Hipnotic,
}

/// A brush ready for CSG: its content class, working faces and the
/// priority rank of the bucket it was sorted into (lowest clips first).
#[derive(Clone, Debug)]
pub struct Brush {
    pub contents: ContentFlags,
    pub faces: Vec<Face>,
    pub bounds: Aabb,
    pub lmshift: u8,
    pub priority: u8,
}

/// One face plane while a brush is being built or expanded.
#[derive(Clone, Debug)]
struct HullFace {
    plane: Plane,
    texname: String,
    texinfo: usize,
    flags: crate::texinfo::SurfFlags,
    linenum: usize,
}

/// Scratch state for building one brush, including the point/corner/edge
/// records the beveling pass accumulates.
struct HullBrush {
    contents: ContentFlags,
    bounds: Aabb,
    faces: Vec<HullFace>,
    points: Vec<Vec3>,
    corners: Vec<Vec3>,
    edges: Vec<(usize, usize)>,
    linenum: usize,
}

/// Validate a face against the winding invariants; degenerate edges are
/// healed by vertex removal, slightly off-plane points only warn.
pub fn check_face(face: &mut Face, map: &MapData, world_extent: f64) -> Result<()> {
    let plane = face.plane(&map.planes);

    'recheck: loop {
        let w = &face.winding;
        if w.len() < 3 {
            return Err(CompileError::DegenerateFace {
                points: w.len(),
                linenum: face.linenum,
            });
        }

        for i in 0..w.len() {
            let p1 = w.points[i];
            let p2 = w.points[(i + 1) % w.len()];

            for j in 0..3 {
                if p1[j] > world_extent || p1[j] < -world_extent {
                    return Err(CompileError::OutOfRange {
                        value: p1[j],
                        linenum: face.linenum,
                    });
                }
            }

            // check the point is on the face plane
            let dist = plane.distance_to(p1);
            if dist < -ON_EPSILON || dist > ON_EPSILON {
                log::warn!(
                    "line {}: point ({:.3} {:.3} {:.3}) off plane by {:.4}",
                    face.linenum,
                    p1.x,
                    p1.y,
                    p1.z,
                    dist
                );
            }

            // check the edge isn't degenerate
            let edgevec = p2 - p1;
            let length = edgevec.magnitude();
            if length < ON_EPSILON {
                log::warn!(
                    "line {}: healing degenerate edge ({:.6}) at ({:.3} {:.3} {:.3})",
                    face.linenum,
                    length,
                    p1.x,
                    p1.y,
                    p1.z
                );
                face.winding.points.remove(i);
                continue 'recheck;
            }

            let edgenormal = plane.normal.cross(edgevec).normalize();
            let edgedist = p1.dot(edgenormal) + ON_EPSILON;

            // all other points must be on the front side
            for j in 0..w.len() {
                if j == i {
                    continue;
                }
                let dist = w.points[j].dot(edgenormal);
                if dist > edgedist {
                    return Err(CompileError::NonConvexFace {
                        error_size: dist - edgedist,
                        linenum: face.linenum,
                    });
                }
            }
        }

        return Ok(());
    }
}

fn discard_hint_skip_face(game: &dyn GameDef, hullface: &HullFace) -> bool {
    match game.id() {
        // anything not HINT-flagged inside a hint brush is hintskip
        TargetGame::Quake2 => hullface.flags.native & crate::game::Q2_SURF_HINT == 0,
        // anything textured other than "hint" inside a hint brush is
        // hintskip
        _ => !hullface.texname.eq_ignore_ascii_case("hint"),
    }
}

/// Build the working faces of one brush: the base polygon of each face
/// plane clipped against every other face's flipped plane, snapped,
/// translated by the rotation offset and registered with the pools.
fn create_brush_faces(
    map: &MapData,
    hullbrush: &mut HullBrush,
    hullnum: i32,
    rottype: Rotation,
    rotate_offset: Vec3,
    options: &Options,
) -> Result<Vec<Face>> {
    let game = options.game();
    let mut facelist: Vec<Face> = Vec::new();
    let mut min = f64::MAX;
    let mut max = -f64::MAX;

    hullbrush.bounds = Aabb::new();

    for face_index in 0..hullbrush.faces.len() {
        if hullnum <= 0 && hullbrush.contents.is_hint() {
            // don't generate hintskip faces
            if discard_hint_skip_face(game, &hullbrush.faces[face_index]) {
                continue;
            }
        }

        let mapface = hullbrush.faces[face_index].clone();
        let mut w = Some(Winding::base_for_plane(
            &mapface.plane,
            options.world_extent * 2.0,
        ));

        for (other_index, mapface2) in hullbrush.faces.iter().enumerate() {
            if other_index == face_index {
                continue;
            }
            // flip the plane, because we want to keep the back side
            let clipplane = -mapface2.plane;
            w = match w {
                Some(winding) => winding.clip_front(&clipplane, ON_EPSILON, false),
                None => None,
            };
        }

        let Some(w) = w else {
            continue; // overconstrained plane
        };

        if w.len() > MAX_EDGES {
            return Err(CompileError::TooManyFacePoints {
                max: MAX_EDGES,
                linenum: mapface.linenum,
            });
        }

        let mut points = Vec::with_capacity(w.len());
        for p in &w.points {
            let mut snapped = Vec3::new(0.0, 0.0, 0.0);
            for k in 0..3 {
                snapped[k] = snap_coord(p[k] - rotate_offset[k]);
                min = min.min(snapped[k]);
                max = max.max(snapped[k]);
            }
            hullbrush.bounds.add_point(snapped);
            points.push(snapped);
        }

        // account for the rotation offset in the texture projection
        let mut texinfo = mapface.texinfo;
        if options.fix_rotate_obj_texture && rotate_offset != Vec3::new(0.0, 0.0, 0.0) {
            let mut fixed = map.texinfos.get(texinfo);
            for row in 0..2 {
                let vec = Vec3::new(
                    fixed.vecs[row][0],
                    fixed.vecs[row][1],
                    fixed.vecs[row][2],
                );
                fixed.vecs[row][3] += rotate_offset.dot(vec);
            }
            texinfo = map
                .texinfos
                .find_or_insert(TexInfo::new(fixed.vecs, fixed.miptex, fixed.flags));
            hullbrush.faces[face_index].texinfo = texinfo;
        }

        // translate the plane by the rotation offset and re-canonicalise
        let base = mapface.plane.normal * mapface.plane.dist - rotate_offset;
        let plane = Plane::new(mapface.plane.normal, mapface.plane.normal.dot(base));
        let (planenum, planeside) = map.planes.find_plane(&plane)?;

        let mut face = Face::new(
            planenum,
            planeside,
            if hullnum > 0 { 0 } else { texinfo },
            Winding::new(points),
            mapface.linenum,
        );
        face.contents = [game.create_empty_contents(), hullbrush.contents];
        check_face(&mut face, map, options.world_extent)?;
        facelist.push(face);
    }

    // rotatable objects need a bounding box big enough for any rotation;
    // only hipnotic rotation gets this, and never the clipping hulls of
    // Hexen II (handled in its engine)
    let should_expand = rotate_offset != Vec3::new(0.0, 0.0, 0.0)
        && rottype == Rotation::Hipnotic
        && hullnum >= 0
        && game.id() != TargetGame::Hexen2;
    if should_expand && !facelist.is_empty() {
        let delta = max.abs().max(min.abs());
        hullbrush.bounds =
            Aabb::new_from_min_max(Vec3::new(-delta, -delta, -delta), Vec3::new(delta, delta, delta));
    }

    Ok(facelist)
}

// ===========================================================================
// Beveled clipping hull generation, by brute force.
// ===========================================================================

fn add_brush_plane(hullbrush: &mut HullBrush, plane: &Plane) -> Result<()> {
    let len = plane.normal.magnitude();
    if len < 1.0 - NORMAL_EPSILON || len > 1.0 + NORMAL_EPSILON {
        return Err(CompileError::InvalidPlane { length: len });
    }

    for mapface in &hullbrush.faces {
        if crate::math::points_are_equal(mapface.plane.normal, plane.normal)
            && (mapface.plane.dist - plane.dist).abs() < ON_EPSILON
        {
            return Ok(());
        }
    }

    if hullbrush.faces.len() == MAX_FACES {
        return Err(CompileError::TooManyFaces {
            max: MAX_FACES,
            linenum: hullbrush.linenum,
        });
    }

    hullbrush.faces.push(HullFace {
        plane: *plane,
        texname: String::new(),
        texinfo: 0,
        flags: Default::default(),
        linenum: hullbrush.linenum,
    });
    Ok(())
}

/// Add the plane only if every corner point ends up on its back side
/// (flipping if needed); a plane with corners on both sides is not a
/// separator.
fn test_add_plane(hullbrush: &mut HullBrush, plane: &Plane) -> Result<()> {
    // see if the plane has already been added
    for mapface in &hullbrush.faces {
        if plane.epsilon_equal(&mapface.plane) || (-*plane).epsilon_equal(&mapface.plane) {
            return Ok(());
        }
    }

    let mut points_front = false;
    let mut points_back = false;
    for corner in &hullbrush.corners {
        let d = plane.distance_to(*corner);
        if d < -ON_EPSILON {
            if points_front {
                return Ok(());
            }
            points_back = true;
        } else if d > ON_EPSILON {
            if points_back {
                return Ok(());
            }
            points_front = true;
        }
    }

    // the plane is a separator
    if points_front {
        add_brush_plane(hullbrush, &-*plane)
    } else {
        add_brush_plane(hullbrush, plane)
    }
}

/// Register a hull point (deduplicated) and its eight hull-box corners.
fn add_hull_point(hullbrush: &mut HullBrush, p: Vec3, hull_size: &Aabb) -> Result<usize> {
    for (i, pt) in hullbrush.points.iter().enumerate() {
        if crate::math::points_are_equal(p, *pt) {
            return Ok(i);
        }
    }

    if hullbrush.points.len() == MAX_HULL_POINTS {
        return Err(CompileError::TooManyHullPoints {
            max: MAX_HULL_POINTS,
            linenum: hullbrush.linenum,
        });
    }

    let index = hullbrush.points.len();
    hullbrush.points.push(p);

    for x in 0..2 {
        for y in 0..2 {
            for z in 0..2 {
                hullbrush.corners.push(Vec3::new(
                    p.x + hull_size[x].x,
                    p.y + hull_size[y].y,
                    p.z + hull_size[z].z,
                ));
            }
        }
    }

    Ok(index)
}

/// Emit the (up to four per axis pair) bevel planes around one edge.
fn add_hull_edge(hullbrush: &mut HullBrush, p1: Vec3, p2: Vec3, hull_size: &Aabb) -> Result<()> {
    let pt1 = add_hull_point(hullbrush, p1, hull_size)?;
    let pt2 = add_hull_point(hullbrush, p2, hull_size)?;

    for edge in &hullbrush.edges {
        if *edge == (pt1, pt2) || *edge == (pt2, pt1) {
            return Ok(());
        }
    }

    if hullbrush.edges.len() == MAX_HULL_EDGES {
        return Err(CompileError::TooManyHullEdges {
            max: MAX_HULL_EDGES,
            linenum: hullbrush.linenum,
        });
    }

    hullbrush.edges.push((pt1, pt2));

    let edgevec = (p1 - p2).normalize();

    for a in 0..3 {
        let b = (a + 1) % 3;
        let c = (a + 2) % 3;

        let mut planevec = Vec3::new(0.0, 0.0, 0.0);
        planevec[a] = 1.0;
        let normal = planevec.cross(edgevec);
        let length = normal.magnitude();

        // skip edges almost parallel to the hull edge
        if length < ANGLE_EPSILON {
            continue;
        }
        let normal = normal / length;

        for d in 0..2 {
            for e in 0..2 {
                let mut planeorg = p1;
                planeorg[b] += hull_size[d][b];
                planeorg[c] += hull_size[e][c];
                let plane = Plane::new(normal, planeorg.dot(normal));
                test_add_plane(hullbrush, &plane)?;
            }
        }
    }

    Ok(())
}

/// Minkowski-expand the brush by the hull box: push every face plane
/// outward, add the inflated axis planes, then bevel the edges.
fn expand_brush(
    hullbrush: &mut HullBrush,
    hull_size: &Aabb,
    facelist: &[Face],
    expansion: HullExpansion,
) -> Result<()> {
    hullbrush.points.clear();
    hullbrush.corners.clear();
    hullbrush.edges.clear();

    // create all the hull points
    for f in facelist {
        for p in &f.winding.points {
            add_hull_point(hullbrush, *p, hull_size)?;
        }
    }

    // expand all of the planes
    for mapface in &mut hullbrush.faces {
        if mapface.flags.extended.contains(TexFlags::NO_EXPAND) {
            continue;
        }
        let mut corner = Vec3::new(0.0, 0.0, 0.0);
        for x in 0..3 {
            if mapface.plane.normal[x] > 0.0 {
                corner[x] = hull_size.max[x];
            } else if mapface.plane.normal[x] < 0.0 {
                corner[x] = hull_size.min[x];
            }
        }
        mapface.plane.dist += corner.dot(mapface.plane.normal);
    }

    // add any axis planes not contained in the brush to bevel off corners
    for x in 0..3 {
        for s in [-1.0f64, 1.0] {
            let mut normal = Vec3::new(0.0, 0.0, 0.0);
            normal[x] = s;
            let dist = if s == -1.0 {
                -hullbrush.bounds.min[x] + -hull_size.min[x]
            } else {
                hullbrush.bounds.max[x] + hull_size.max[x]
            };
            add_brush_plane(hullbrush, &Plane::new(normal, dist))?;
        }
    }

    // add all of the edge bevels
    if expansion == HullExpansion::FullBevels {
        for f in facelist {
            for i in 0..f.winding.len() {
                let p1 = f.winding.points[i];
                let p2 = f.winding.points[(i + 1) % f.winding.len()];
                add_hull_edge(hullbrush, p1, p2, hull_size)?;
            }
        }
    }

    Ok(())
}

/// Convert one source brush to a working brush for the given hull.
/// `None` when every face was clipped away.
pub fn load_brush(
    map: &MapData,
    mapbrush: &crate::map::MapBrush,
    contents: ContentFlags,
    rotate_offset: Vec3,
    rottype: Rotation,
    hullnum: i32,
    options: &Options,
) -> Result<Option<Brush>> {
    let linenum = mapbrush.linenum();
    if mapbrush.faces.len() > MAX_FACES {
        return Err(CompileError::TooManyFaces {
            max: MAX_FACES,
            linenum,
        });
    }

    let mut hullbrush = HullBrush {
        contents,
        bounds: Aabb::new(),
        faces: mapbrush
            .faces
            .iter()
            .map(|f| HullFace {
                plane: f.plane,
                texname: f.texname.clone(),
                texinfo: f.texinfo,
                flags: f.flags,
                linenum: f.linenum,
            })
            .collect(),
        points: Vec::new(),
        corners: Vec::new(),
        edges: Vec::new(),
        linenum,
    };

    let expand = hullnum > 0 && options.hull_expansion != HullExpansion::None;

    let mut facelist = if expand {
        // for Quake-style clipping hulls the rotation offset is applied
        // after expansion
        create_brush_faces(map, &mut hullbrush, hullnum, Rotation::None, Vec3::new(0.0, 0.0, 0.0), options)?
    } else {
        create_brush_faces(map, &mut hullbrush, hullnum, rottype, rotate_offset, options)?
    };

    if facelist.is_empty() {
        log::warn!("couldn't create brush faces (brush at line {})", linenum);
        return Ok(None);
    }

    if expand {
        let hulls = options.game().hull_sizes();
        let hull_size = &hulls[hullnum as usize];
        expand_brush(&mut hullbrush, hull_size, &facelist, options.hull_expansion)?;
        facelist = create_brush_faces(map, &mut hullbrush, hullnum, rottype, rotate_offset, options)?;
        if facelist.is_empty() {
            log::warn!("couldn't create expanded brush faces (brush at line {})", linenum);
            return Ok(None);
        }
    }

    Ok(Some(Brush {
        contents,
        faces: facelist,
        bounds: hullbrush.bounds,
        lmshift: DEFAULT_LMSHIFT,
        priority: 0,
    }))
}

/// Resolve the exported `origin` key of a `rotate_*` entity from its
/// target entity. Run before brush loading.
pub fn fix_rotate_origin(map: &mut MapData, entity_index: usize) {
    let search = map.entities[entity_index].value_for_key("target").to_string();

    let mut offset = Vec3::new(0.0, 0.0, 0.0);
    let mut found = false;
    if !search.is_empty() {
        if let Some(target) = map.find_target_entity(&search) {
            offset = target.vector_for_key("origin");
            found = true;
        }
    }
    if !found {
        log::warn!(
            "no target for rotation entity \"{}\"",
            map.entities[entity_index].classname()
        );
    }

    let value = format!("{} {} {}", offset.x, offset.y, offset.z);
    map.entities[entity_index].set_key_value("origin", value);
}

/// The six CSG priority buckets, lowest first.
#[derive(Default)]
struct BrushBuckets {
    detail_illusionary: Vec<Brush>,
    liquid: Vec<Brush>,
    detail_fence: Vec<Brush>,
    detail: Vec<Brush>,
    sky: Vec<Brush>,
    solid: Vec<Brush>,
}

impl BrushBuckets {
    fn into_sorted(self) -> Vec<Brush> {
        let mut out = Vec::new();
        for (rank, bucket) in [
            self.detail_illusionary,
            self.liquid,
            self.detail_fence,
            self.detail,
            self.sky,
            self.solid,
        ]
        .into_iter()
        .enumerate()
        {
            for mut brush in bucket {
                brush.priority = rank as u8;
                out.push(brush);
            }
        }
        out
    }
}

/// Classnames whose brushes belong to the world model instead of forming
/// a submodel of their own.
pub fn is_world_brush_entity(classname: &str) -> bool {
    classname.eq_ignore_ascii_case("func_detail")
        || classname.eq_ignore_ascii_case("func_group")
        || classname.eq_ignore_ascii_case("func_detail_illusionary")
        || classname.eq_ignore_ascii_case("func_detail_wall")
        || classname.eq_ignore_ascii_case("func_detail_fence")
        || classname.eq_ignore_ascii_case("func_illusionary_visblocker")
}

/// Of the world brush entities, only the visblocker survives in the
/// entity text lump.
pub fn is_nonremove_world_brush_entity(classname: &str) -> bool {
    classname.eq_ignore_ascii_case("func_illusionary_visblocker")
}

/// Load the brushes of source entity `src_index` for one hull, classified,
/// expanded and sorted into priority order, crediting bounds and resolved
/// origin keys to destination entity `dst_index` (the world when a world
/// brush entity is being merged in). Hull −1 contains every brush (used
/// for the BSPX brush list); hull 0 drops pure-clip brushes.
pub fn load_entity_brushes(
    map: &mut MapData,
    dst_index: usize,
    src_index: usize,
    hullnum: i32,
    options: &Options,
) -> Result<Vec<Brush>> {
    let game = options.game();
    let is_world = dst_index == 0;
    let classname = map.entities[src_index].classname().to_string();

    // classify every source brush up front
    let brush_contents: Vec<ContentFlags> = {
        let entity = &map.entities[src_index];
        entity
            .brushes
            .iter()
            .map(|b| game.classify_brush(b))
            .collect::<Result<_>>()?
    };

    // origin brush support
    let mut rotate_offset = Vec3::new(0.0, 0.0, 0.0);
    let mut rottype = Rotation::None;
    for (i, contents) in brush_contents.iter().enumerate() {
        if !contents.is_origin() {
            continue;
        }
        if is_world {
            log::warn!("ignoring origin brush in worldspawn");
            continue;
        }
        let loaded = {
            let entity = &map.entities[src_index];
            load_brush(
                map,
                &entity.brushes[i],
                *contents,
                Vec3::new(0.0, 0.0, 0.0),
                Rotation::None,
                0,
                options,
            )?
        };
        if let Some(brush) = loaded {
            rotate_offset = brush.bounds.centroid();
            let value = format!("{} {} {}", rotate_offset.x, rotate_offset.y, rotate_offset.z);
            map.entities[dst_index].set_key_value("origin", value);
            rottype = Rotation::OriginBrush;
        }
    }

    // hipnotic rotation entities get their origin from the target entity
    if rottype == Rotation::None && classname.starts_with("rotate_") {
        rotate_offset = map.entities[dst_index].vector_for_key("origin");
        rottype = Rotation::Hipnotic;
    }

    let all_detail = classname.eq_ignore_ascii_case("func_detail");
    let all_detail_fence = classname.eq_ignore_ascii_case("func_detail_fence")
        || classname.eq_ignore_ascii_case("func_detail_wall");
    let all_detail_illusionary = classname.eq_ignore_ascii_case("func_detail_illusionary");

    // entities with custom lightmap scales matter to the light tool
    let mut i = (16.0 * map.entities[src_index].float_for_key("_lmscale")) as i32;
    if i == 0 {
        i = 16;
    }
    let mut lmshift: u8 = 0;
    while i > 1 {
        lmshift += 1;
        i /= 2;
    }

    let mirrorinside = map.entities[src_index].int_for_key("_mirrorinside") != 0;
    let noclipfaces = map.entities[src_index].int_for_key("_noclipfaces") != 0;
    let func_illusionary_visblocker =
        classname.eq_ignore_ascii_case("func_illusionary_visblocker");

    // _omitbrushes 1 just discards all brushes in the entity
    if map.entities[src_index].int_for_key("_omitbrushes") != 0 {
        return Ok(Vec::new());
    }

    let mut buckets = BrushBuckets::default();
    let mut bounds = map.entities[dst_index].bounds;

    for brush_index in 0..map.entities[src_index].brushes.len() {
        let mut contents = brush_contents[brush_index];

        // per-brush settings, inheriting the per-entity ones
        let detail =
            map.entities[src_index].brushes[brush_index].is_detail_tagged() || all_detail;
        let detail_illusionary = all_detail_illusionary;
        let detail_fence = all_detail_fence;

        // origin brushes are always discarded
        if contents.is_origin() {
            continue;
        }

        if options.omit_detail && detail {
            continue;
        }
        if (options.omit_detail || options.omit_detail_illusionary) && detail_illusionary {
            continue;
        }
        if (options.omit_detail || options.omit_detail_fence) && detail_fence {
            continue;
        }

        // turn solid brushes into detail in the draw hull
        if hullnum <= 0 && game.is_solid(&contents) {
            if detail {
                contents = game.create_extended_contents(ExtContents::DETAIL);
            } else if detail_illusionary {
                contents = game.create_extended_contents(ExtContents::DETAIL_ILLUSIONARY);
            } else if detail_fence {
                contents = game.create_extended_contents(ExtContents::DETAIL_FENCE);
            }
        }

        // detail illusionary doesn't exist in the collision hulls
        if game.id() != TargetGame::Quake2 && hullnum != 0 && detail_illusionary {
            continue;
        }

        // clip brushes don't show up in the draw hull, but they extend
        // the model bounds so collision works
        if contents.is_clip() {
            if hullnum == 0 {
                let loaded = load_brush(
                    map,
                    &map.entities[src_index].brushes[brush_index],
                    contents,
                    rotate_offset,
                    rottype,
                    hullnum,
                    options,
                )?;
                if let Some(brush) = loaded {
                    bounds.add_box(&brush.bounds);
                }
                continue;
            }
            if hullnum > 0 {
                contents = game.create_solid_contents();
            }
            // hull -1 (brush export) keeps the clip class
        }

        // hint brushes don't affect the collision hulls
        if contents.is_hint() {
            if hullnum > 0 {
                continue;
            }
            // empty volume, but keep the hint class for face discarding
            contents = game.create_extended_contents(ExtContents::HINT);
        }

        // brush entities never use water merging
        if !is_world && !contents.is_hint() {
            contents = game.create_solid_contents();
        }

        // `_mirrorinside` bmodels become detail fence in the draw hull so
        // their interior faces survive
        if !is_world && hullnum <= 0 && mirrorinside {
            contents = game.create_extended_contents(ExtContents::DETAIL_FENCE);
        }

        // nonsolid brushes don't show up in clipping hulls
        if hullnum > 0 && !game.is_solid(&contents) && !game.is_sky(&contents) {
            continue;
        }

        // sky brushes are solid in the collision hulls
        if hullnum > 0 && game.is_sky(&contents) {
            contents = game.create_solid_contents();
        }

        if mirrorinside {
            contents.extended |= ExtContents::MIRROR_INSIDE;
        }
        if noclipfaces {
            contents.extended |= ExtContents::NO_CLIPPING_SAME_TYPE;
        }
        if func_illusionary_visblocker {
            contents.extended |= ExtContents::ILLUSIONARY_VISBLOCKER;
        }

        let loaded = load_brush(
            map,
            &map.entities[src_index].brushes[brush_index],
            contents,
            rotate_offset,
            rottype,
            hullnum,
            options,
        )?;
        let Some(mut brush) = loaded else {
            continue;
        };
        brush.lmshift = lmshift;
        for face in &mut brush.faces {
            face.lmshift = lmshift;
        }

        bounds.add_box(&brush.bounds);

        if game.is_solid(&brush.contents) && !brush.contents.is_detail(ExtContents::DETAIL) {
            buckets.solid.push(brush);
        } else if game.is_sky(&brush.contents) {
            buckets.sky.push(brush);
        } else if brush.contents.is_detail(ExtContents::DETAIL) {
            buckets.detail.push(brush);
        } else if brush.contents.is_detail(ExtContents::DETAIL_ILLUSIONARY) {
            buckets.detail_illusionary.push(brush);
        } else if brush.contents.is_detail(ExtContents::DETAIL_FENCE) {
            buckets.detail_fence.push(brush);
        } else {
            buckets.liquid.push(brush);
        }
    }

    map.entities[dst_index].bounds = bounds;

    let brushes = buckets.into_sorted();
    log::debug!(
        "entity {}: {} brushes for hull {}",
        src_index,
        brushes.len(),
        hullnum
    );
    Ok(brushes)
}
