use crate::bsp::Tree;
use crate::math::{Vec3, ON_EPSILON};
use crate::winding::{point_on_open_segment, Winding, MAX_EDGES};
use arrayvec::ArrayVec;
use std::collections::HashMap;

/// Grid cell size of the vertex hash. Coarse is fine; cells are only a
/// pre-filter for the exact segment test.
const HASH_CELL: f64 = 64.0;

type CellKey = (i64, i64, i64);

fn cell_of(p: Vec3) -> CellKey {
    (
        (p.x / HASH_CELL).floor() as i64,
        (p.y / HASH_CELL).floor() as i64,
        (p.z / HASH_CELL).floor() as i64,
    )
}

struct VertexHash {
    cells: HashMap<CellKey, Vec<Vec3>>,
}

impl VertexHash {
    fn new() -> VertexHash {
        VertexHash {
            cells: HashMap::new(),
        }
    }

    fn insert(&mut self, p: Vec3) {
        self.cells.entry(cell_of(p)).or_default().push(p);
    }

    /// Visit every stored vertex whose cell overlaps the segment's
    /// bounding box (expanded a little for the epsilon).
    fn for_each_near_segment(&self, a: Vec3, b: Vec3, mut visit: impl FnMut(Vec3)) {
        let lo = cell_of(Vec3::new(
            a.x.min(b.x) - 1.0,
            a.y.min(b.y) - 1.0,
            a.z.min(b.z) - 1.0,
        ));
        let hi = cell_of(Vec3::new(
            a.x.max(b.x) + 1.0,
            a.y.max(b.y) + 1.0,
            a.z.max(b.z) + 1.0,
        ));
        for x in lo.0..=hi.0 {
            for y in lo.1..=hi.1 {
                for z in lo.2..=hi.2 {
                    if let Some(points) = self.cells.get(&(x, y, z)) {
                        for p in points {
                            visit(*p);
                        }
                    }
                }
            }
        }
    }
}

/// Gather the face's vertices plus every hashed vertex lying on one of
/// its open edges, in winding order. `None` when nothing was inserted.
fn collect_superverts(winding: &Winding, hash: &VertexHash) -> Option<Vec<Vec3>> {
    let mut superverts: Vec<Vec3> = Vec::with_capacity(winding.len());
    let mut inserted = false;

    for i in 0..winding.len() {
        let a = winding.points[i];
        let b = winding.points[(i + 1) % winding.len()];
        superverts.push(a);

        let mut on_edge: Vec<(f64, Vec3)> = Vec::new();
        hash.for_each_near_segment(a, b, |v| {
            if let Some(t) = point_on_open_segment(v, a, b, ON_EPSILON) {
                if !on_edge.iter().any(|(_, seen)| crate::math::points_are_equal(*seen, v)) {
                    on_edge.push((t, v));
                }
            }
        });
        if on_edge.is_empty() {
            continue;
        }
        on_edge.sort_by(|x, y| x.0.partial_cmp(&y.0).unwrap());
        for (_, v) in on_edge {
            superverts.push(v);
            inserted = true;
        }
    }

    inserted.then_some(superverts)
}

/// Rebuild a face from its supervert loop. When the loop exceeds
/// MAX_EDGES the face is chopped along chords; the extra pieces chain in
/// as split ancestors so mark-surface expansion still reaches them.
fn face_from_superverts(tree: &mut Tree, face_id: usize, mut verts: Vec<Vec3>) {
    while verts.len() > MAX_EDGES {
        // split off a full-size chunk; a contiguous run of a convex loop
        // plus the closing chord stays convex
        let chunk: ArrayVec<Vec3, MAX_EDGES> = verts[..MAX_EDGES].iter().copied().collect();

        let mut piece = tree.faces[face_id].with_winding(Winding::new(chunk.to_vec()));
        piece.original = tree.faces[face_id].original;
        let piece_id = tree.add_face(piece);
        tree.faces[face_id].original = Some(piece_id);

        verts.drain(1..MAX_EDGES - 1);
    }
    tree.faces[face_id].winding = Winding::new(verts);
}

/// Eliminate T-junctions: every vertex of any face lying on another
/// face's edge becomes a vertex of that edge too, so renderers don't
/// crack along shared borders.
pub fn tjunc(tree: &mut Tree) {
    let mut hash = VertexHash::new();
    for face in &tree.faces {
        for p in &face.winding.points {
            hash.insert(*p);
        }
    }

    let mut welded = 0usize;
    let mut face_id = 0;
    // faces appended by chord splits are re-examined as the loop reaches
    // them
    while face_id < tree.faces.len() {
        if let Some(superverts) = collect_superverts(&tree.faces[face_id].winding, &hash) {
            welded += superverts.len() - tree.faces[face_id].winding.len();
            face_from_superverts(tree, face_id, superverts);
        }
        face_id += 1;
    }

    log::debug!("tjunc: {} vertices inserted", welded);
}
