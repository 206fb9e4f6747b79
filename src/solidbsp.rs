use crate::aabb::Aabb;
use crate::bsp::{NodeId, Tree};
use crate::csg::Surface;
use crate::error::{CompileError, Result};
use crate::game::{ContentFlags, GameDef};
use crate::math::{Plane, PlaneSide, ON_EPSILON, SIDESPACE};
use crate::planepool::PlanePool;
use crate::winding::{SplitResult, SplitSide};

/// Hard cap on recursion; a tree this deep means runaway splitting.
pub const MAX_BSP_DEPTH: usize = 512;

/// Build the partition tree for one entity's surfaces. The root volume is
/// the entity bounds padded by SIDESPACE so no leaf has zero volume.
pub fn solid_bsp(
    entity_bounds: &Aabb,
    surfaces: Vec<Surface>,
    midsplit_levels: usize,
    planes: &PlanePool,
    game: &dyn GameDef,
) -> Result<Tree> {
    let bounds = entity_bounds.expand_by(SIDESPACE + 1.0);
    let mut tree = Tree::new(bounds);

    let head = tree.headnode;
    partition_surfaces(&mut tree, surfaces, head, 0, midsplit_levels, planes, game)?;

    let (empty, solid) = tree.count_leaves(tree.headnode);
    log::debug!(
        "solidbsp: {} nodes, {} empty-ish leaves, {} solid leaves",
        tree.nodes.len(),
        empty,
        solid
    );
    Ok(tree)
}

/// How a whole surface relates to a candidate splitter plane.
#[derive(Clone, Copy, PartialEq, Eq)]
enum SurfaceSide {
    Front,
    Back,
    On,
    Spanning,
}

fn surface_side(surface: &Surface, plane: &Plane) -> SurfaceSide {
    let mut front = false;
    let mut back = false;
    for face in &surface.faces {
        match face.winding.which_side(plane, ON_EPSILON) {
            None => return SurfaceSide::Spanning,
            Some(SplitSide::Front) => front = true,
            Some(SplitSide::Back) => back = true,
            Some(SplitSide::On) => {}
        }
        if front && back {
            return SurfaceSide::Spanning;
        }
    }
    match (front, back) {
        (true, false) => SurfaceSide::Front,
        (false, true) => SurfaceSide::Back,
        (false, false) => SurfaceSide::On,
        (true, true) => SurfaceSide::Spanning,
    }
}

/// Pick the surface to split with, or `None` to make a leaf. The second
/// value is set when only detail surfaces could split (the node then
/// becomes a detail separator).
fn select_partition(
    surfaces: &[Surface],
    node_bounds: &Aabb,
    midsplit: bool,
    planes: &PlanePool,
) -> Option<(usize, bool)> {
    let candidates: Vec<usize> = (0..surfaces.len())
        .filter(|&i| !surfaces[i].onnode)
        .collect();
    if candidates.is_empty() {
        return None;
    }
    if candidates.len() == 1 {
        let i = candidates[0];
        return Some((i, !surfaces[i].has_structural()));
    }

    let any_structural = candidates.iter().any(|&i| surfaces[i].has_structural());

    if midsplit {
        if let Some(choice) = choose_mid_plane(surfaces, &candidates, node_bounds, any_structural, planes)
        {
            return Some((choice, !surfaces[choice].has_structural()));
        }
    }

    // two passes per candidate class: axial planes first, then any-axis;
    // detail surfaces only become candidates when nothing structural can
    // split
    for structural_pass in [true, false] {
        if structural_pass && !any_structural {
            continue;
        }
        for axial_pass in [true, false] {
            let mut best: Option<(usize, (usize, usize))> = None;

            for &i in &candidates {
                if surfaces[i].has_structural() != structural_pass {
                    continue;
                }
                let plane = planes.get(surfaces[i].planenum);
                let plane_type = planes.plane_type(surfaces[i].planenum);
                if plane_type.is_axial() != axial_pass {
                    continue;
                }

                let mut splits = 0usize;
                let mut front = 0usize;
                let mut back = 0usize;
                for &j in &candidates {
                    if j == i {
                        continue;
                    }
                    match surface_side(&surfaces[j], &plane) {
                        SurfaceSide::Spanning => splits += 1,
                        SurfaceSide::Front => front += 1,
                        SurfaceSide::Back => back += 1,
                        SurfaceSide::On => {}
                    }
                }

                let key = (splits, front.abs_diff(back));
                match best {
                    Some((_, best_key)) if key >= best_key => {}
                    _ => best = Some((i, key)),
                }
            }

            if let Some((i, _)) = best {
                return Some((i, !structural_pass));
            }
        }
    }

    None
}

/// Midsplit override: the axial candidate plane nearest the node's
/// midpoint along its longest axis, to keep the first levels of a large
/// tree from degenerating.
fn choose_mid_plane(
    surfaces: &[Surface],
    candidates: &[usize],
    node_bounds: &Aabb,
    any_structural: bool,
    planes: &PlanePool,
) -> Option<usize> {
    let mid = node_bounds.centroid();
    let long_axis = node_bounds.longest_axis();

    let mut best: Option<(usize, f64)> = None;
    let mut best_any_axis: Option<(usize, f64)> = None;

    for &i in candidates {
        if any_structural && !surfaces[i].has_structural() {
            continue;
        }
        let plane_type = planes.plane_type(surfaces[i].planenum);
        if !plane_type.is_axial() {
            continue;
        }
        let plane = planes.get(surfaces[i].planenum);
        let axis = plane_type.axis();
        let dist = (plane.dist - mid[axis]).abs();

        if axis == long_axis {
            match best {
                Some((_, d)) if dist >= d => {}
                _ => best = Some((i, dist)),
            }
        }
        match best_any_axis {
            Some((_, d)) if dist >= d => {}
            _ => best_any_axis = Some((i, dist)),
        }
    }

    best.or(best_any_axis).map(|(i, _)| i)
}

/// Copy the on-node surface's faces into the tree as this node's faces and
/// point the working faces at their pristine copies.
fn link_node_faces(tree: &mut Tree, node: NodeId, surface: &mut Surface) {
    for face in &mut surface.faces {
        let mut node_face = face.clone();
        node_face.original = None;
        node_face.output_number = None;
        let id = tree.add_face(node_face);
        face.original = Some(id);
        tree.nodes[node].faces.push(id);
    }
    surface.onnode = true;
}

/// Split a surface's faces across the plane, producing up to one surface
/// per side. Fragments keep their ancestor links.
fn divide_surface(surface: Surface, plane: &Plane) -> (Option<Surface>, Option<Surface>) {
    let mut front_faces = Vec::new();
    let mut back_faces = Vec::new();

    for face in surface.faces {
        match face.winding.split(plane, ON_EPSILON) {
            SplitResult::Front => front_faces.push(face),
            SplitResult::Back => back_faces.push(face),
            SplitResult::Coplanar => {
                // barely off the pool plane; side with the facing
                front_faces.push(face);
            }
            SplitResult::Split(fw, bw) => {
                front_faces.push(face.with_winding(fw));
                back_faces.push(face.with_winding(bw));
            }
        }
    }

    let make = |faces: Vec<crate::face::Face>| {
        if faces.is_empty() {
            None
        } else {
            let mut s = Surface {
                planenum: surface.planenum,
                onnode: surface.onnode,
                faces,
                bounds: Aabb::new(),
            };
            s.recalc_bounds();
            Some(s)
        }
    };

    (make(front_faces), make(back_faces))
}

fn divide_node_bounds(tree: &mut Tree, node: NodeId, plane: &Plane, planes: &PlanePool) {
    let bounds = tree.nodes[node].bounds;
    let planenum = tree.nodes[node].planenum.unwrap();
    let plane_type = planes.plane_type(planenum);

    let mut front_bounds = bounds;
    let mut back_bounds = bounds;
    if plane_type.is_axial() {
        let axis = plane_type.axis();
        front_bounds.min[axis] = plane.dist;
        back_bounds.max[axis] = plane.dist;
    }

    let [front, back] = tree.nodes[node].children;
    tree.nodes[front].bounds = front_bounds;
    tree.nodes[back].bounds = back_bounds;
}

/// Seal a node as a leaf: contents from the highest-priority front-side
/// contents of the faces bounding it (solid when nothing bounds it),
/// mark-faces through the ancestor links.
fn leaf_node(tree: &mut Tree, surfaces: Vec<Surface>, node: NodeId, game: &dyn GameDef) {
    let mut contents: Option<ContentFlags> = None;
    let mut markfaces = Vec::new();

    for surface in &surfaces {
        for face in &surface.faces {
            let c = face.contents[0];
            contents = Some(match contents {
                None => c,
                Some(cur) if game.contents_priority(&c) > game.contents_priority(&cur) => c,
                Some(cur) => cur,
            });
            if let Some(original) = face.original {
                if !markfaces.contains(&original) {
                    markfaces.push(original);
                }
            }
        }
    }

    let leaf = &mut tree.nodes[node];
    leaf.planenum = None;
    // a region bounded by no faces is enclosed in solid
    leaf.contents = contents.unwrap_or_else(|| game.create_solid_contents());
    leaf.markfaces = markfaces;
}

fn partition_surfaces(
    tree: &mut Tree,
    surfaces: Vec<Surface>,
    node: NodeId,
    depth: usize,
    midsplit_levels: usize,
    planes: &PlanePool,
    game: &dyn GameDef,
) -> Result<()> {
    if depth > MAX_BSP_DEPTH {
        return Err(CompileError::BspTooDeep { max: MAX_BSP_DEPTH });
    }

    let node_bounds = tree.nodes[node].bounds;
    let midsplit = depth < midsplit_levels;
    let Some((split_index, detail_separator)) =
        select_partition(&surfaces, &node_bounds, midsplit, planes)
    else {
        leaf_node(tree, surfaces, node, game);
        return Ok(());
    };

    let split_planenum = surfaces[split_index].planenum;
    let split_plane = planes.get(split_planenum);

    let front_child = tree.alloc_node();
    let back_child = tree.alloc_node();
    {
        let n = &mut tree.nodes[node];
        n.planenum = Some(split_planenum);
        n.children = [front_child, back_child];
        n.detail_separator = detail_separator;
    }
    divide_node_bounds(tree, node, &split_plane, planes);

    // divide all surfaces into the two children; the ones on the splitter
    // plane contribute node faces first and continue down flagged on-node
    let mut front_list = Vec::new();
    let mut back_list = Vec::new();

    for mut surface in surfaces {
        if surface.planenum == split_planenum {
            link_node_faces(tree, node, &mut surface);

            let mut front_faces = Vec::new();
            let mut back_faces = Vec::new();
            for face in surface.faces.drain(..) {
                match face.planeside {
                    // a face's empty side is the side its normal points to
                    PlaneSide::Front => front_faces.push(face),
                    PlaneSide::Back => back_faces.push(face),
                }
            }
            for (faces, list) in [(front_faces, &mut front_list), (back_faces, &mut back_list)] {
                if !faces.is_empty() {
                    let mut s = Surface {
                        planenum: surface.planenum,
                        onnode: true,
                        faces,
                        bounds: Aabb::new(),
                    };
                    s.recalc_bounds();
                    list.push(s);
                }
            }
            continue;
        }

        let (front, back) = divide_surface(surface, &split_plane);
        if let Some(front) = front {
            front_list.push(front);
        }
        if let Some(back) = back {
            back_list.push(back);
        }
    }

    partition_surfaces(tree, front_list, front_child, depth + 1, midsplit_levels, planes, game)?;
    partition_surfaces(tree, back_list, back_child, depth + 1, midsplit_levels, planes, game)?;
    Ok(())
}
