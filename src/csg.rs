use crate::aabb::Aabb;
use crate::brush::Brush;
use crate::face::Face;
use crate::game::{ExtContents, GameDef};
use crate::math::ON_EPSILON;
use crate::planepool::PlanePool;
use crate::winding::{try_merge_windings, SplitResult};

/// All coplanar faces sharing one pool plane (either side), the unit the
/// partitioner scores and divides.
#[derive(Clone, Debug)]
pub struct Surface {
    pub planenum: usize,
    /// Already used as a splitter somewhere above; no longer a candidate.
    pub onnode: bool,
    pub faces: Vec<Face>,
    pub bounds: Aabb,
}

impl Surface {
    pub fn new(planenum: usize, faces: Vec<Face>) -> Surface {
        let mut surface = Surface {
            planenum,
            onnode: false,
            faces,
            bounds: Aabb::new(),
        };
        surface.recalc_bounds();
        surface
    }

    /// A surface with at least one structural (non-detail) face may split
    /// visibility clusters.
    pub fn has_structural(&self) -> bool {
        self.faces.iter().any(|f| !f.is_detail())
    }

    pub fn recalc_bounds(&mut self) {
        self.bounds = Aabb::new();
        for f in &self.faces {
            self.bounds.add_box(&f.winding.bounds());
        }
    }
}

/// Clip one face against a brush's volume. Fragments outside the brush go
/// to `outside`; the piece inside (if any) is returned. `precedence` makes
/// the clipping brush claim exactly coplanar same-facing faces.
fn clip_to_brush(
    face: Face,
    brush: &Brush,
    precedence: bool,
    planes: &PlanePool,
    outside: &mut Vec<Face>,
) -> Option<Face> {
    let mut remaining = face;
    for clipface in &brush.faces {
        // exactly on one of the brush's planes is handled specially: the
        // face stays outside whole only when it faces the same way and
        // wins precedence; otherwise it counts as inside for this plane
        // and keeps getting clipped by the others
        if clipface.planenum == remaining.planenum {
            if clipface.planeside == remaining.planeside && !precedence {
                outside.push(remaining);
                return None;
            }
            continue;
        }
        let clipplane = planes.face_plane(clipface.planenum, clipface.planeside);
        match remaining.winding.split(&clipplane, ON_EPSILON) {
            SplitResult::Front => {
                // entirely outside this plane, so outside the brush
                outside.push(remaining);
                return None;
            }
            SplitResult::Coplanar => {
                // grazing contact; treat as outside
                outside.push(remaining);
                return None;
            }
            SplitResult::Back => {}
            SplitResult::Split(front, back) => {
                outside.push(remaining.with_winding(front));
                remaining = remaining.with_winding(back);
            }
        }
    }

    // behind every brush plane: inside the volume
    Some(remaining)
}

/// Subtract higher-priority brush volumes from each brush's faces so no
/// output face lies inside a solid, then group the survivors into
/// per-plane surfaces.
pub fn csg_faces(brushes: &[Brush], game: &dyn GameDef, planes: &PlanePool) -> Vec<Surface> {
    let mut kept: Vec<Face> = Vec::new();

    for (i, b1) in brushes.iter().enumerate() {
        let mut outside: Vec<Face> = b1.faces.clone();

        for (j, b2) in brushes.iter().enumerate() {
            if i == j {
                continue;
            }
            if !b1.bounds.intersect(&b2.bounds) {
                continue;
            }
            if (b1.contents.extended | b2.contents.extended)
                .contains(ExtContents::NO_CLIPPING_SAME_TYPE)
                && b1.contents.native == b2.contents.native
            {
                continue;
            }

            // fragments inside an equal-priority brush are discarded too,
            // with the earlier-parsed brush winning coplanar faces
            let precedence = if b2.priority == b1.priority {
                j < i
            } else {
                b2.priority > b1.priority
            };
            let keep_inside = b2.priority < b1.priority;

            let inside = std::mem::take(&mut outside);
            for face in inside {
                if let Some(mut inner) = clip_to_brush(face, b2, precedence, planes, &mut outside)
                {
                    if keep_inside {
                        // a face submerged in a weaker volume survives
                        // with that volume's contents in front of it
                        inner.contents[0] = b2.contents;
                        outside.push(inner);
                    }
                }
            }
        }

        // interior-visible brushes mirror their surviving faces; detail
        // illusionary is double-sided so its inside leaf stays non-solid
        let mirror = game.is_liquid(&b1.contents)
            || b1.contents.extended.contains(ExtContents::MIRROR_INSIDE)
            || b1.contents.extended.contains(ExtContents::DETAIL_ILLUSIONARY);
        if mirror {
            let mirrored: Vec<Face> = outside.iter().map(|f| f.mirrored()).collect();
            outside.extend(mirrored);
        }

        kept.extend(outside);
    }

    let surfaces = build_surfaces(kept, planes);
    log::debug!(
        "csg: {} surfaces from {} brushes",
        surfaces.len(),
        brushes.len()
    );
    surfaces
}

/// Group faces into surfaces keyed by plane index (ignoring side), merging
/// compatible coplanar faces whose outlines join.
pub fn build_surfaces(faces: Vec<Face>, planes: &PlanePool) -> Vec<Surface> {
    let mut order: Vec<usize> = Vec::new();
    let mut grouped: std::collections::HashMap<usize, Vec<Face>> = std::collections::HashMap::new();

    for face in faces {
        if face.winding.len() < 3 {
            continue;
        }
        let entry = grouped.entry(face.planenum).or_default();
        if entry.is_empty() {
            order.push(face.planenum);
        }
        entry.push(face);
    }

    let mut surfaces = Vec::with_capacity(order.len());
    for planenum in order {
        let mut faces = grouped.remove(&planenum).unwrap();
        merge_surface_faces(&mut faces, planes);
        surfaces.push(Surface::new(planenum, faces));
    }
    surfaces
}

fn mergeable(a: &Face, b: &Face) -> bool {
    a.planenum == b.planenum
        && a.planeside == b.planeside
        && a.texinfo == b.texinfo
        && a.contents == b.contents
        && a.lmshift == b.lmshift
}

/// Union coplanar faces pairwise until no outline can be joined.
fn merge_surface_faces(faces: &mut Vec<Face>, planes: &PlanePool) {
    let mut merged_any = true;
    while merged_any {
        merged_any = false;
        'pairs: for i in 0..faces.len() {
            for j in i + 1..faces.len() {
                if !mergeable(&faces[i], &faces[j]) {
                    continue;
                }
                let normal = planes
                    .face_plane(faces[i].planenum, faces[i].planeside)
                    .normal;
                if let Some(winding) =
                    try_merge_windings(&faces[i].winding, &faces[j].winding, normal)
                {
                    let merged = faces[i].with_winding(winding);
                    faces[i] = merged;
                    faces.swap_remove(j);
                    merged_any = true;
                    break 'pairs;
                }
            }
        }
    }
}
