use crate::bsp::{NodeId, Tree};
use crate::export::{export_map_plane, export_map_texinfo, BspFile, DEdge, DFace};
use crate::face::FaceId;
use crate::map::MapData;
use crate::math::{snap_point, PlaneSide, Vec3};
use std::collections::HashMap;

/// Vertex and edge dedup state for one entity's face emission.
struct EdgeState {
    vertex_lookup: HashMap<[u64; 3], usize>,
    edge_lookup: HashMap<(usize, usize), usize>,
}

impl EdgeState {
    fn new() -> EdgeState {
        EdgeState {
            vertex_lookup: HashMap::new(),
            edge_lookup: HashMap::new(),
        }
    }

    fn get_vertex(&mut self, bsp: &mut BspFile, p: Vec3) -> usize {
        let snapped = snap_point(p);
        let key = [
            snapped.x.to_bits(),
            snapped.y.to_bits(),
            snapped.z.to_bits(),
        ];
        if let Some(&i) = self.vertex_lookup.get(&key) {
            return i;
        }
        let i = bsp.dvertexes.len();
        bsp.dvertexes
            .push([snapped.x as f32, snapped.y as f32, snapped.z as f32]);
        self.vertex_lookup.insert(key, i);
        i
    }

    /// The signed surf-edge index for the directed edge `v1 -> v2`:
    /// negative when traversing an existing edge backwards. Edge 0 stays
    /// reserved because its sign would be ambiguous.
    fn get_edge(&mut self, bsp: &mut BspFile, v1: Vec3, v2: Vec3) -> i32 {
        let i1 = self.get_vertex(bsp, v1);
        let i2 = self.get_vertex(bsp, v2);

        if let Some(&e) = self.edge_lookup.get(&(i2, i1)) {
            return -(e as i32);
        }
        let e = bsp.dedges.len();
        bsp.dedges.push(DEdge {
            v: [i1 as u32, i2 as u32],
        });
        self.edge_lookup.insert((i1, i2), e);
        e as i32
    }
}

fn export_face(
    state: &mut EdgeState,
    tree: &mut Tree,
    face_id: FaceId,
    map: &MapData,
    bsp: &mut BspFile,
) {
    let winding = tree.faces[face_id].winding.clone();
    if winding.len() < 3 {
        return;
    }

    let firstedge = bsp.dsurfedges.len();
    for i in 0..winding.len() {
        let surfedge = state.get_edge(
            bsp,
            winding.points[i],
            winding.points[(i + 1) % winding.len()],
        );
        bsp.dsurfedges.push(surfedge);
    }

    let face = &tree.faces[face_id];
    let planenum = export_map_plane(&map.planes, face.planenum, bsp);
    let texinfo = export_map_texinfo(map, face.texinfo, bsp);

    let output = bsp.dfaces.len();
    bsp.dfaces.push(DFace {
        planenum: planenum as i32,
        side: match face.planeside {
            PlaneSide::Front => 0,
            PlaneSide::Back => 1,
        },
        firstedge: firstedge as i32,
        numedges: winding.len() as i32,
        texinfo: texinfo as i32,
        styles: [255; 4],
        lightofs: -1,
    });
    bsp.lmshifts.push(face.lmshift);
    tree.faces[face_id].output_number = Some(output);
}

fn emit_node_faces_r(
    state: &mut EdgeState,
    tree: &mut Tree,
    node: NodeId,
    map: &MapData,
    bsp: &mut BspFile,
) {
    if tree.nodes[node].is_leaf() {
        return;
    }

    let firstface = bsp.dfaces.len();
    let face_ids = tree.nodes[node].faces.clone();
    for id in face_ids {
        // each node face plus the pieces the tjunction pass chained off it
        let mut cursor = Some(id);
        while let Some(face_id) = cursor {
            export_face(state, tree, face_id, map, bsp);
            cursor = tree.faces[face_id].original;
        }
    }
    tree.nodes[node].firstface = firstface;
    tree.nodes[node].numfaces = bsp.dfaces.len() - firstface;

    let [front, back] = tree.nodes[node].children;
    emit_node_faces_r(state, tree, front, map, bsp);
    emit_node_faces_r(state, tree, back, map, bsp);
}

/// Emit the entity's faces, edges and surf-edges in pre-order, assigning
/// face output numbers. Returns the entity's first face index.
pub fn make_face_edges(tree: &mut Tree, map: &MapData, bsp: &mut BspFile) -> usize {
    let firstface = bsp.dfaces.len();
    let mut state = EdgeState::new();
    let head = tree.headnode;
    emit_node_faces_r(&mut state, tree, head, map, bsp);
    log::debug!(
        "edges: {} faces, {} edges, {} vertexes",
        bsp.dfaces.len() - firstface,
        bsp.dedges.len(),
        bsp.dvertexes.len()
    );
    firstface
}
