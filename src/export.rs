use crate::aabb::Aabb;
use crate::brush::Brush;
use crate::bsp::{NodeId, Tree};
use crate::error::{CompileError, Result};
use crate::game::{ContentFlags, ExtContents, GameDef};
use crate::map::{MapData, MapEntity};
use crate::math::SIDESPACE;
use crate::options::{Options, TargetGame};
use crate::planepool::PlanePool;
use crate::texinfo::SurfFlags;

// Classic format limits, enforced when no extended format is registered.
const MAX_MAP_PLANES: usize = 32767;
const MAX_MAP_NODES: usize = 32767;
const MAX_MAP_CLIPNODES: usize = 32767;
const MAX_MAP_LEAFS: usize = 8192;
const MAX_MAP_VERTS: usize = 65535;
const MAX_MAP_FACES: usize = 65535;
const MAX_MAP_MARKSURFACES: usize = 65535;
const MAX_MAP_EDGES: usize = 32000;
const MAX_MAP_TEXINFO: usize = 32767;
const MAX_MAP_MODELS: usize = 256;

/// Head-node slots per model record (enough for every supported game's
/// hull table).
pub const MAX_MODEL_HULLS: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DPlane {
    pub normal: [f32; 3],
    pub dist: f32,
    pub plane_type: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DTexInfo {
    pub vecs: [[f32; 4]; 2],
    pub miptex: i32,
    pub flags: i32,
    pub texture_name: String,
    pub value: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DEdge {
    pub v: [u32; 2],
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DFace {
    pub planenum: i32,
    pub side: i32,
    pub firstedge: i32,
    pub numedges: i32,
    pub texinfo: i32,
    pub styles: [u8; 4],
    pub lightofs: i32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DNode {
    pub planenum: i32,
    /// Negative values encode leaf index `-(i + 1)`.
    pub children: [i32; 2],
    pub mins: [i16; 3],
    pub maxs: [i16; 3],
    pub firstface: u32,
    pub numfaces: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DLeaf {
    pub contents: i32,
    pub mins: [i16; 3],
    pub maxs: [i16; 3],
    pub visofs: i32,
    pub firstmarksurface: u32,
    pub nummarksurfaces: u32,
    pub cluster: i32,
    pub area: i32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DClipNode {
    pub planenum: i32,
    /// Negative values encode content classes directly.
    pub children: [i32; 2],
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DModel {
    pub mins: [f32; 3],
    pub maxs: [f32; 3],
    pub origin: [f32; 3],
    pub headnode: [i32; MAX_MODEL_HULLS],
    pub visleafs: i32,
    pub firstface: i32,
    pub numfaces: i32,
}

impl Default for DModel {
    fn default() -> DModel {
        DModel {
            mins: [0.0; 3],
            maxs: [0.0; 3],
            origin: [0.0; 3],
            headnode: [0; MAX_MODEL_HULLS],
            visleafs: 0,
            firstface: 0,
            numfaces: 0,
        }
    }
}

/// One brush of the BSPX brush list: bounds, contents and the non-axial
/// planes (axial ones are implied by the bounds).
#[derive(Clone, Debug)]
pub struct BspxBrush {
    pub bounds: Aabb,
    pub contents: i32,
    pub planes: Vec<DPlane>,
}

#[derive(Clone, Debug)]
pub struct BspxBrushModel {
    pub modelnum: i32,
    pub brushes: Vec<BspxBrush>,
}

/// Extended texinfo sidecar record: flag structs in output-index order.
#[derive(Clone, Debug)]
pub struct ExtendedTexinfoSidecar {
    pub num_texinfo: u32,
    pub surfflags_size: u32,
    pub flags: Vec<SurfFlags>,
}

/// The in-memory BSP record handed to the serialiser collaborator.
#[derive(Default)]
pub struct BspFile {
    pub entdata: String,
    pub dplanes: Vec<DPlane>,
    pub texinfo: Vec<DTexInfo>,
    pub dvertexes: Vec<[f32; 3]>,
    pub dedges: Vec<DEdge>,
    pub dsurfedges: Vec<i32>,
    pub dfaces: Vec<DFace>,
    pub dnodes: Vec<DNode>,
    pub dleafs: Vec<DLeaf>,
    pub dclipnodes: Vec<DClipNode>,
    pub dmodels: Vec<DModel>,
    /// Mark-surfaces.
    pub dleaffaces: Vec<u32>,
    /// Per-face light shift bytes (the LMSHIFT lump).
    pub lmshifts: Vec<u8>,
    pub needs_lmshifts: bool,
    /// The optional BSPX brush list.
    pub bspx_brushes: Vec<BspxBrushModel>,
}

/// Reserve the records whose index zero has special meaning: edge 0 can't
/// be sign-encoded, and leaf 0 is the shared solid leaf.
pub fn begin_bsp_file(bsp: &mut BspFile, game: &dyn GameDef) {
    bsp.dedges.push(DEdge { v: [0, 0] });
    debug_assert_eq!(bsp.dedges.len(), 1);

    bsp.dleafs.push(DLeaf {
        contents: game.create_solid_contents().native,
        mins: [0; 3],
        maxs: [0; 3],
        visofs: -1,
        firstmarksurface: 0,
        nummarksurfaces: 0,
        cluster: -1,
        area: 0,
    });
    debug_assert_eq!(bsp.dleafs.len(), 1);
}

/// Lazy plane numbering: the output index is assigned on first use.
pub fn export_map_plane(planes: &PlanePool, planenum: usize, bsp: &mut BspFile) -> usize {
    planes.assign_output(planenum, |plane, plane_type| {
        let index = bsp.dplanes.len();
        bsp.dplanes.push(DPlane {
            normal: [
                plane.normal.x as f32,
                plane.normal.y as f32,
                plane.normal.z as f32,
            ],
            dist: plane.dist as f32,
            plane_type: plane_type.as_u8() as i32,
        });
        index
    })
}

/// Lazy texinfo numbering.
pub fn export_map_texinfo(map: &MapData, texinfo: usize, bsp: &mut BspFile) -> usize {
    map.texinfos.assign_output(texinfo, |src| {
        let index = bsp.texinfo.len();
        let mut vecs = [[0f32; 4]; 2];
        for i in 0..2 {
            for j in 0..4 {
                vecs[i][j] = src.vecs[i][j] as f32;
            }
        }
        let (texture_name, value) = map
            .miptex
            .get(src.miptex)
            .map(|m| (m.name.clone(), m.value))
            .unwrap_or_default();
        bsp.texinfo.push(DTexInfo {
            vecs,
            miptex: src.miptex as i32,
            flags: src.flags.native,
            texture_name,
            value,
        });
        index
    })
}

/// Detail fence leaves are written as solid so standard renderers treat
/// them as opaque while their faces stay present.
fn remap_contents_for_export(game: &dyn GameDef, contents: &ContentFlags) -> ContentFlags {
    if contents.extended.contains(ExtContents::DETAIL_FENCE) {
        return game.create_solid_contents();
    }
    *contents
}

fn bound_i16(v: f64, round_up: bool) -> i16 {
    let v = if round_up { v.ceil() } else { v.floor() };
    v.clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

fn export_leaf(
    tree: &Tree,
    node: NodeId,
    map: &MapData,
    bsp: &mut BspFile,
    options: &Options,
) -> Result<()> {
    let game = options.game();
    let n = &tree.nodes[node];
    let remapped = remap_contents_for_export(game, &n.contents);

    if !game.validate_leaf_contents(&remapped) {
        return Err(CompileError::InvalidContents {
            leaf: bsp.dleafs.len(),
        });
    }

    let firstmarksurface = bsp.dleaffaces.len();
    for &markface in &n.markfaces {
        let texinfo = map.texinfos.get(tree.faces[markface].texinfo);
        if !options.include_skip && texinfo.flags.extended.contains(crate::texinfo::TexFlags::SKIP)
        {
            continue;
        }

        // emit the face and the t-junction pieces chained off it
        let mut cursor = Some(markface);
        while let Some(face_id) = cursor {
            if let Some(out) = tree.faces[face_id].output_number {
                bsp.dleaffaces.push(out as u32);
            }
            cursor = tree.faces[face_id].original;
        }
    }

    bsp.dleafs.push(DLeaf {
        contents: remapped.native,
        mins: [
            bound_i16(n.bounds.min.x, false),
            bound_i16(n.bounds.min.y, false),
            bound_i16(n.bounds.min.z, false),
        ],
        maxs: [
            bound_i16(n.bounds.max.x, true),
            bound_i16(n.bounds.max.y, true),
            bound_i16(n.bounds.max.z, true),
        ],
        visofs: -1, // no vis info yet
        firstmarksurface: firstmarksurface as u32,
        nummarksurfaces: (bsp.dleaffaces.len() - firstmarksurface) as u32,
        cluster: n.viscluster,
        area: 1,
    });
    Ok(())
}

fn export_draw_nodes_r(
    tree: &Tree,
    node: NodeId,
    map: &MapData,
    bsp: &mut BspFile,
    options: &Options,
) -> Result<()> {
    let game = options.game();
    let our_index = bsp.dnodes.len();

    let n = &tree.nodes[node];
    let planenum = export_map_plane(&map.planes, n.planenum.unwrap(), bsp) as i32;
    bsp.dnodes.push(DNode {
        planenum,
        children: [0, 0],
        mins: [
            bound_i16(n.bounds.min.x, false),
            bound_i16(n.bounds.min.y, false),
            bound_i16(n.bounds.min.z, false),
        ],
        maxs: [
            bound_i16(n.bounds.max.x, true),
            bound_i16(n.bounds.max.y, true),
            bound_i16(n.bounds.max.z, true),
        ],
        firstface: n.firstface as u32,
        numfaces: n.numfaces as u32,
    });

    for i in 0..2 {
        let child = tree.nodes[node].children[i];
        let childnum;
        if tree.nodes[child].is_leaf() {
            // the shared solid leaf, except every leaf is materialised for
            // the cluster-native game
            if game.id() != TargetGame::Quake2 && game.is_solid(&tree.nodes[child].contents) {
                childnum = -1;
            } else {
                childnum = -(bsp.dleafs.len() as i32 + 1);
                export_leaf(tree, child, map, bsp, options)?;
            }
        } else {
            childnum = bsp.dnodes.len() as i32;
            export_draw_nodes_r(tree, child, map, bsp, options)?;
        }
        bsp.dnodes[our_index].children[i] = childnum;
    }

    // both children being the shared solid leaf would make the node
    // indistinguishable from nothing
    assert!(bsp.dnodes[our_index].children[0] != bsp.dnodes[our_index].children[1]);
    Ok(())
}

/// Emit the draw tree and the model record for an entity.
pub fn export_draw_nodes(
    tree: &Tree,
    entity: &MapEntity,
    map: &MapData,
    bsp: &mut BspFile,
    firstface: usize,
    options: &Options,
) -> Result<()> {
    let modelnum = entity.output_model_number.unwrap();
    let head = tree.headnode;

    {
        let model = &mut bsp.dmodels[modelnum];
        model.headnode[0] = bsp.dnodes.len() as i32;
        model.firstface = firstface as i32;
    }

    let leafs_at_start = bsp.dleafs.len();
    if tree.nodes[head].is_leaf() {
        export_leaf(tree, head, map, bsp, options)?;
    } else {
        export_draw_nodes_r(tree, head, map, bsp, options)?;
    }

    let model = &mut bsp.dmodels[modelnum];
    model.numfaces = bsp.dfaces.len() as i32 - firstface as i32;
    model.visleafs = (bsp.dleafs.len() - leafs_at_start) as i32;

    // remove the headnode padding
    let bounds = tree.nodes[head].bounds;
    for i in 0..3 {
        model.mins[i] = (bounds.min[i] + SIDESPACE + 1.0) as f32;
        model.maxs[i] = (bounds.max[i] - SIDESPACE - 1.0) as f32;
    }
    Ok(())
}

fn export_clip_nodes_r(tree: &Tree, node: NodeId, map: &MapData, bsp: &mut BspFile) -> i32 {
    let n = &tree.nodes[node];
    if n.is_leaf() {
        return n.contents.native;
    }

    let nodenum = bsp.dclipnodes.len();
    bsp.dclipnodes.push(DClipNode {
        planenum: 0,
        children: [0, 0],
    });

    let child0 = export_clip_nodes_r(tree, n.children[0], map, bsp);
    let child1 = export_clip_nodes_r(tree, n.children[1], map, bsp);

    let planenum = export_map_plane(&map.planes, n.planenum.unwrap(), bsp) as i32;
    let clipnode = &mut bsp.dclipnodes[nodenum];
    clipnode.planenum = planenum;
    clipnode.children = [child0, child1];

    nodenum as i32
}

/// Emit a clipping-hull tree and record its head in the model.
pub fn export_clip_nodes(
    tree: &Tree,
    entity: &MapEntity,
    map: &MapData,
    bsp: &mut BspFile,
    hullnum: usize,
) {
    let modelnum = entity.output_model_number.unwrap();
    let headnode = export_clip_nodes_r(tree, tree.headnode, map, bsp);
    bsp.dmodels[modelnum].headnode[hullnum] = headnode;
}

/// Append a model's brushes to the BSPX brush list. Axial planes are
/// omitted; the bounds imply them.
pub fn bspx_add_model(bsp: &mut BspFile, modelnum: usize, brushes: &[Brush], planes: &PlanePool) {
    let mut out = BspxBrushModel {
        modelnum: modelnum as i32,
        brushes: Vec::with_capacity(brushes.len()),
    };

    for brush in brushes {
        let mut entry = BspxBrush {
            bounds: brush.bounds,
            contents: brush.contents.native,
            planes: Vec::new(),
        };
        for face in &brush.faces {
            let plane = planes.face_plane(face.planenum, face.planeside);
            let axial = (0..3).any(|i| plane.normal[i] == 1.0 || plane.normal[i] == -1.0);
            if axial {
                continue;
            }
            entry.planes.push(DPlane {
                normal: [
                    plane.normal.x as f32,
                    plane.normal.y as f32,
                    plane.normal.z as f32,
                ],
                dist: plane.dist as f32,
                plane_type: 0,
            });
        }
        out.brushes.push(entry);
    }

    bsp.bspx_brushes.push(out);
}

/// Build the extended texinfo sidecar when any exported texinfo needs it.
pub fn extended_texinfo_sidecar(map: &MapData) -> Option<ExtendedTexinfoSidecar> {
    map.texinfos
        .exported_extended_flags()
        .map(|flags| ExtendedTexinfoSidecar {
            num_texinfo: flags.len() as u32,
            surfflags_size: std::mem::size_of::<SurfFlags>() as u32,
            flags,
        })
}

/// Classic lump limit checks, skipped when an extended format is
/// registered.
pub fn check_limits(bsp: &BspFile) -> Result<()> {
    let checks = [
        (bsp.dplanes.len(), MAX_MAP_PLANES),
        (bsp.dnodes.len(), MAX_MAP_NODES),
        (bsp.dclipnodes.len(), MAX_MAP_CLIPNODES),
        (bsp.dleafs.len(), MAX_MAP_LEAFS),
        (bsp.dvertexes.len(), MAX_MAP_VERTS),
        (bsp.dfaces.len(), MAX_MAP_FACES),
        (bsp.dleaffaces.len(), MAX_MAP_MARKSURFACES),
        (bsp.dedges.len(), MAX_MAP_EDGES),
        (bsp.texinfo.len(), MAX_MAP_TEXINFO),
        (bsp.dmodels.len(), MAX_MAP_MODELS),
    ];
    if checks.iter().any(|&(count, max)| count > max) {
        return Err(CompileError::NoExtendedFormat);
    }
    Ok(())
}
