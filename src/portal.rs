use crate::bsp::{NodeId, Tree, NO_NODE};
use crate::error::{CompileError, Result};
use crate::math::{Plane, PlaneSide, ON_EPSILON, SIDESPACE};
use crate::planepool::PlanePool;
use crate::winding::Winding;

pub type PortalId = usize;

/// A convex polygon on a node's splitter plane, shared between the two
/// regions it separates. Dual-linked: each of the two nodes chains it
/// into its own portal list through `next`.
#[derive(Clone, Debug)]
pub struct Portal {
    pub planenum: usize,
    pub winding: Winding,
    /// `nodes[0]` is on the front of the stored plane.
    pub nodes: [NodeId; 2],
    pub next: [Option<PortalId>; 2],
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PortalStats {
    pub node_portals: usize,
    pub clipped_away: usize,
}

fn add_portal_to_nodes(tree: &mut Tree, portal: PortalId, front: NodeId, back: NodeId) {
    debug_assert_eq!(tree.portals[portal].nodes, [NO_NODE, NO_NODE]);

    tree.portals[portal].nodes[0] = front;
    tree.portals[portal].next[0] = tree.nodes[front].portals;
    tree.nodes[front].portals = Some(portal);

    tree.portals[portal].nodes[1] = back;
    tree.portals[portal].next[1] = tree.nodes[back].portals;
    tree.nodes[back].portals = Some(portal);
}

fn remove_portal_from_node(tree: &mut Tree, portal: PortalId, node: NodeId) {
    let mut prev: Option<(PortalId, usize)> = None;
    let mut cursor = tree.nodes[node].portals;

    while let Some(current) = cursor {
        let side = if tree.portals[current].nodes[0] == node {
            0
        } else {
            debug_assert_eq!(tree.portals[current].nodes[1], node);
            1
        };

        if current == portal {
            let next = tree.portals[current].next[side];
            match prev {
                None => tree.nodes[node].portals = next,
                Some((p, pside)) => tree.portals[p].next[pside] = next,
            }
            tree.portals[current].nodes[side] = NO_NODE;
            tree.portals[current].next[side] = None;
            return;
        }

        prev = Some((current, side));
        cursor = tree.portals[current].next[side];
    }

    // the symmetry invariant guarantees we never get here
    debug_assert!(false, "portal not linked into node");
}

/// The six portals of the padded world box, linking the root to the
/// outside sentinel.
fn make_headnode_portals(tree: &mut Tree, planes: &PlanePool, extent: f64) -> Result<()> {
    // pad with some space so there will never be null volume leafs
    let bounds = tree.nodes[tree.headnode].bounds.expand_by(SIDESPACE);
    let head = tree.headnode;
    let outside = tree.outside_node;

    let mut box_planes = [Plane::new(crate::math::Vec3::new(0.0, 0.0, 0.0), 0.0); 6];
    let mut box_portals = [0usize; 6];

    for i in 0..3 {
        for j in 0..2 {
            let n = j * 3 + i;
            let mut normal = crate::math::Vec3::new(0.0, 0.0, 0.0);
            let dist;
            if j == 1 {
                normal[i] = -1.0;
                dist = -bounds[j][i];
            } else {
                normal[i] = 1.0;
                dist = bounds[j][i];
            }
            let plane = Plane::new(normal, dist);
            box_planes[n] = plane;

            let (planenum, side) = planes.find_plane(&plane)?;
            let winding = Winding::base_for_plane(&plane, extent);

            let portal = tree.portals.len();
            tree.portals.push(Portal {
                planenum,
                winding,
                nodes: [NO_NODE, NO_NODE],
                next: [None, None],
            });
            box_portals[n] = portal;

            if side == PlaneSide::Back {
                add_portal_to_nodes(tree, portal, outside, head);
            } else {
                add_portal_to_nodes(tree, portal, head, outside);
            }
        }
    }

    // clip the base windings against each other
    for i in 0..6 {
        for j in 0..6 {
            if i == j {
                continue;
            }
            let clipped = tree.portals[box_portals[i]]
                .winding
                .clone()
                .clip_front(&box_planes[j], ON_EPSILON, true);
            match clipped {
                Some(w) => tree.portals[box_portals[i]].winding = w,
                None => {
                    return Err(CompileError::PortalAsymmetry {
                        detail: "outside portal clipped away".to_string(),
                    })
                }
            }
        }
    }

    Ok(())
}

/// Build the node's splitter polygon: its plane's base winding clipped by
/// every portal bounding the node, then insert it between the children.
fn make_node_portal(
    tree: &mut Tree,
    node: NodeId,
    planes: &PlanePool,
    extent: f64,
    stats: &mut PortalStats,
) -> Result<()> {
    let planenum = tree.nodes[node].planenum.unwrap();
    let plane = planes.get(planenum);
    let mut winding = Some(Winding::base_for_plane(&plane, extent));

    let mut cursor = tree.nodes[node].portals;
    while let Some(portal_id) = cursor {
        let portal = &tree.portals[portal_id];
        let (clipplane, side) = if portal.nodes[0] == node {
            (planes.get(portal.planenum), 0)
        } else {
            debug_assert_eq!(portal.nodes[1], node);
            (-planes.get(portal.planenum), 1)
        };
        cursor = portal.next[side];

        winding = winding.and_then(|w| w.clip_front(&clipplane, ON_EPSILON, true));
        if winding.is_none() {
            log::warn!("new portal was clipped away");
            stats.clipped_away += 1;
            return Ok(());
        }
    }

    let portal = tree.portals.len();
    tree.portals.push(Portal {
        planenum,
        winding: winding.unwrap(),
        nodes: [NO_NODE, NO_NODE],
        next: [None, None],
    });
    let [front, back] = tree.nodes[node].children;
    add_portal_to_nodes(tree, portal, front, back);
    stats.node_portals += 1;
    Ok(())
}

/// Split every portal bounding the node by its plane and relink each half
/// to the child it now borders.
fn split_node_portals(tree: &mut Tree, node: NodeId, planes: &PlanePool) {
    let planenum = tree.nodes[node].planenum.unwrap();
    let plane = planes.get(planenum);
    let [front_child, back_child] = tree.nodes[node].children;

    while let Some(portal_id) = tree.nodes[node].portals {
        let side = if tree.portals[portal_id].nodes[0] == node {
            0
        } else {
            1
        };
        let other_node = tree.portals[portal_id].nodes[1 - side];

        remove_portal_from_node(tree, portal_id, node);
        remove_portal_from_node(tree, portal_id, other_node);

        let split = tree.portals[portal_id]
            .winding
            .split(&plane, ON_EPSILON);

        use crate::winding::SplitResult;
        match split {
            SplitResult::Front | SplitResult::Coplanar => {
                if side == 0 {
                    add_portal_to_nodes(tree, portal_id, front_child, other_node);
                } else {
                    add_portal_to_nodes(tree, portal_id, other_node, front_child);
                }
            }
            SplitResult::Back => {
                if side == 0 {
                    add_portal_to_nodes(tree, portal_id, back_child, other_node);
                } else {
                    add_portal_to_nodes(tree, portal_id, other_node, back_child);
                }
            }
            SplitResult::Split(front_winding, back_winding) => {
                let back_portal = tree.portals.len();
                let template = Portal {
                    planenum: tree.portals[portal_id].planenum,
                    winding: back_winding,
                    nodes: [NO_NODE, NO_NODE],
                    next: [None, None],
                };
                tree.portals.push(template);
                tree.portals[portal_id].winding = front_winding;

                if side == 0 {
                    add_portal_to_nodes(tree, portal_id, front_child, other_node);
                    add_portal_to_nodes(tree, back_portal, back_child, other_node);
                } else {
                    add_portal_to_nodes(tree, portal_id, other_node, front_child);
                    add_portal_to_nodes(tree, back_portal, other_node, back_child);
                }
            }
        }
    }
}

fn cut_node_portals_r(
    tree: &mut Tree,
    node: NodeId,
    planes: &PlanePool,
    extent: f64,
    stats: &mut PortalStats,
) -> Result<()> {
    // stop at leaves and detail separators; everything below a separator
    // is a single cluster
    if tree.nodes[node].is_leaf() || tree.nodes[node].detail_separator {
        return Ok(());
    }

    make_node_portal(tree, node, planes, extent, stats)?;
    split_node_portals(tree, node, planes);

    let [front, back] = tree.nodes[node].children;
    cut_node_portals_r(tree, front, planes, extent, stats)?;
    cut_node_portals_r(tree, back, planes, extent, stats)?;
    Ok(())
}

/// Build the portal graph of the tree.
pub fn portalize_tree(tree: &mut Tree, planes: &PlanePool, world_extent: f64) -> Result<PortalStats> {
    let mut stats = PortalStats::default();
    let extent = world_extent * 2.0;
    make_headnode_portals(tree, planes, extent)?;
    cut_node_portals_r(tree, tree.headnode, planes, extent, &mut stats)?;
    check_portal_symmetry(tree)?;
    log::debug!(
        "portalize: {} node portals ({} clipped away)",
        stats.node_portals,
        stats.clipped_away
    );
    Ok(stats)
}

/// Every linked portal must appear exactly once in each of its two nodes'
/// portal lists.
pub fn check_portal_symmetry(tree: &Tree) -> Result<()> {
    for (id, portal) in tree.portals.iter().enumerate() {
        if portal.nodes == [NO_NODE, NO_NODE] {
            continue; // unlinked (clipped away or superseded)
        }
        for side in 0..2 {
            let node = portal.nodes[side];
            if node == NO_NODE {
                return Err(CompileError::PortalAsymmetry {
                    detail: format!("portal {} linked on one side only", id),
                });
            }
            let mut seen = 0;
            let mut cursor = tree.nodes[node].portals;
            while let Some(current) = cursor {
                let cside = if tree.portals[current].nodes[0] == node { 0 } else { 1 };
                if current == id {
                    if cside != side {
                        return Err(CompileError::PortalAsymmetry {
                            detail: format!("portal {} linked with wrong side", id),
                        });
                    }
                    seen += 1;
                }
                cursor = tree.portals[current].next[cside];
            }
            if seen != 1 {
                return Err(CompileError::PortalAsymmetry {
                    detail: format!("portal {} appears {} times in node {}", id, seen, node),
                });
            }
        }
    }
    Ok(())
}
