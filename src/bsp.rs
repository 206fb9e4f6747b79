use crate::aabb::Aabb;
use crate::face::{Face, FaceId};
use crate::game::ContentFlags;
use crate::portal::{Portal, PortalId};

pub type NodeId = usize;

/// Marker for an unset child link.
pub const NO_NODE: NodeId = usize::MAX;

/// One node of the partition tree. Internal nodes reference a splitter
/// plane and two children; leaves carry a content class, the mark-faces on
/// their boundary and their portal list.
#[derive(Clone, Debug)]
pub struct Node {
    /// `None` for leaves.
    pub planenum: Option<usize>,
    pub children: [NodeId; 2],
    pub bounds: Aabb,
    /// Faces lying on this node's plane (the exported ones).
    pub faces: Vec<FaceId>,
    /// Everything below this node belongs to a single visibility cluster.
    pub detail_separator: bool,

    // leaf state
    pub contents: ContentFlags,
    pub markfaces: Vec<FaceId>,
    pub portals: Option<PortalId>,
    pub visleafnum: i32,
    pub viscluster: i32,

    // filled in at export time
    pub firstface: usize,
    pub numfaces: usize,
}

impl Node {
    pub fn new() -> Node {
        Node {
            planenum: None,
            children: [NO_NODE, NO_NODE],
            bounds: Aabb::new(),
            faces: Vec::new(),
            detail_separator: false,
            contents: ContentFlags::default(),
            markfaces: Vec::new(),
            portals: None,
            visleafnum: -99,
            viscluster: -99,
            firstface: 0,
            numfaces: 0,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.planenum.is_none()
    }
}

impl Default for Node {
    fn default() -> Node {
        Node::new()
    }
}

/// A BSP tree for one entity and hull: an arena of nodes, the arena of
/// node faces they reference, and the portal arena built later. Dropping
/// the tree drops everything, which is the whole point of the layout.
pub struct Tree {
    pub nodes: Vec<Node>,
    pub faces: Vec<Face>,
    pub portals: Vec<Portal>,
    pub headnode: NodeId,
    /// Sentinel leaf representing the void around the map; kept solid so
    /// portals against it never reach the output.
    pub outside_node: NodeId,
}

impl Tree {
    pub fn new(bounds: Aabb) -> Tree {
        let mut head = Node::new();
        head.bounds = bounds;
        let outside = Node::new();
        Tree {
            nodes: vec![head, outside],
            faces: Vec::new(),
            portals: Vec::new(),
            headnode: 0,
            outside_node: 1,
        }
    }

    pub fn alloc_node(&mut self) -> NodeId {
        self.nodes.push(Node::new());
        self.nodes.len() - 1
    }

    pub fn add_face(&mut self, face: Face) -> FaceId {
        self.faces.push(face);
        self.faces.len() - 1
    }

    /// Leaf count below a node, split into (empty-ish, solid).
    pub fn count_leaves(&self, node: NodeId) -> (usize, usize) {
        let n = &self.nodes[node];
        match n.planenum {
            None => {
                if n.contents.native == crate::game::CONTENTS_SOLID {
                    (0, 1)
                } else {
                    (1, 0)
                }
            }
            Some(_) => {
                let a = self.count_leaves(n.children[0]);
                let b = self.count_leaves(n.children[1]);
                (a.0 + b.0, a.1 + b.1)
            }
        }
    }
}
