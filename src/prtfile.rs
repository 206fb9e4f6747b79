use crate::bsp::{NodeId, Tree};
use crate::error::{CompileError, Result};
use crate::game::{ContentFlags, ExtContents, GameDef};
use crate::math::{qrint, ANGLE_EPSILON, ZERO_EPSILON};
use crate::options::Options;
use crate::planepool::PlanePool;
use crate::portal::Portal;
use std::fmt::Write;

#[derive(Clone, Copy, Debug, Default)]
pub struct PortalState {
    pub num_visportals: usize,
    /// Leafs the player can be in.
    pub num_visleafs: usize,
    /// Clusters of leafs.
    pub num_visclusters: usize,
    pub uses_detail: bool,
}

/// Pass the leaf contents up the stack.
fn cluster_contents(tree: &Tree, node: NodeId, game: &dyn GameDef) -> ContentFlags {
    let n = &tree.nodes[node];
    match n.planenum {
        None => n.contents,
        Some(_) => {
            let a = cluster_contents(tree, n.children[0], game);
            let b = cluster_contents(tree, n.children[1], game);
            game.cluster_contents(&a, &b)
        }
    }
}

/// True when it is possible to see through the portal's two regions.
fn portal_thru(tree: &Tree, portal: &Portal, game: &dyn GameDef, options: &Options) -> bool {
    let contents0 = cluster_contents(tree, portal.nodes[0], game);
    let contents1 = cluster_contents(tree, portal.nodes[1], game);

    // never through a visblocker
    if (contents0.extended | contents1.extended).contains(ExtContents::ILLUSIONARY_VISBLOCKER) {
        return false;
    }

    game.portal_can_see_through(&contents0, &contents1, options.transwater, options.transsky)
}

fn count_portals(tree: &Tree, node: NodeId, state: &mut PortalState, game: &dyn GameDef, options: &Options) {
    let mut cursor = tree.nodes[node].portals;
    while let Some(portal_id) = cursor {
        let portal = &tree.portals[portal_id];
        // only count from the first bordering node
        if portal.nodes[0] == node {
            if portal_thru(tree, portal, game, options) {
                state.num_visportals += 1;
            }
            cursor = portal.next[0];
        } else {
            cursor = portal.next[1];
        }
    }
}

/// Assign leaf and cluster numbers. A negative incoming cluster means we
/// are above any detail separator and clusters are allocated per leaf.
fn number_leafs_r(
    tree: &mut Tree,
    node: NodeId,
    state: &mut PortalState,
    mut cluster: i32,
    game: &dyn GameDef,
    options: &Options,
) {
    if !tree.nodes[node].is_leaf() {
        tree.nodes[node].visleafnum = -99;
        tree.nodes[node].viscluster = -99;

        if cluster < 0 && tree.nodes[node].detail_separator {
            state.uses_detail = true;
            cluster = state.num_visclusters as i32;
            state.num_visclusters += 1;
            tree.nodes[node].viscluster = cluster;
            count_portals(tree, node, state, game, options);
        }

        let [front, back] = tree.nodes[node].children;
        number_leafs_r(tree, front, state, cluster, game, options);
        number_leafs_r(tree, back, state, cluster, game, options);
        return;
    }

    let contents = tree.nodes[node].contents;
    if game.is_solid(&contents) {
        // solid block, viewpoint never inside
        tree.nodes[node].visleafnum = -1;
        tree.nodes[node].viscluster = -1;
        return;
    }

    tree.nodes[node].visleafnum = state.num_visleafs as i32;
    state.num_visleafs += 1;
    tree.nodes[node].viscluster = if cluster < 0 {
        let c = state.num_visclusters as i32;
        state.num_visclusters += 1;
        c
    } else {
        cluster
    };
    count_portals(tree, node, state, game, options);
}

fn write_float(out: &mut String, v: f64) {
    if (v - qrint(v)).abs() < ZERO_EPSILON {
        let _ = write!(out, "{} ", qrint(v) as i64);
    } else {
        let _ = write!(out, "{} ", v);
    }
}

fn write_portals_r(
    tree: &Tree,
    node: NodeId,
    out: &mut String,
    clusters: bool,
    game: &dyn GameDef,
    options: &Options,
    planes: &PlanePool,
) -> Result<()> {
    let n = &tree.nodes[node];
    if !n.is_leaf() && !n.detail_separator {
        write_portals_r(tree, n.children[0], out, clusters, game, options, planes)?;
        write_portals_r(tree, n.children[1], out, clusters, game, options, planes)?;
        return Ok(());
    }
    if n.is_leaf() && game.is_solid(&n.contents) {
        return Ok(());
    }

    let mut cursor = n.portals;
    while let Some(portal_id) = cursor {
        let portal = &tree.portals[portal_id];
        cursor = if portal.nodes[0] == node {
            portal.next[0]
        } else {
            portal.next[1]
        };
        // only write out from the first bordering node
        if portal.nodes[0] != node || portal.winding.is_empty() {
            continue;
        }
        if !portal_thru(tree, portal, game, options) {
            continue;
        }

        let pick = |other: NodeId| -> i32 {
            if clusters {
                tree.nodes[other].viscluster
            } else {
                tree.nodes[other].visleafnum
            }
        };
        let front = pick(portal.nodes[0]);
        let back = pick(portal.nodes[1]);
        if front == -1 || back == -1 {
            return Err(CompileError::PortalAsymmetry {
                detail: "thru-portal borders an unnumbered leaf".to_string(),
            });
        }

        // planes very near an axis changeover can come out turned around;
        // interpret the winding the way the visibility pass will and flip
        // the side order to match
        let stored = planes.get(portal.planenum);
        let flipped = match portal.winding.plane() {
            Some(wplane) => {
                cgmath::InnerSpace::dot(stored.normal, wplane.normal) < 1.0 - ANGLE_EPSILON
            }
            None => false,
        };
        if flipped {
            let _ = write!(out, "{} {} {} ", portal.winding.len(), back, front);
        } else {
            let _ = write!(out, "{} {} {} ", portal.winding.len(), front, back);
        }

        for point in &portal.winding.points {
            out.push('(');
            write_float(out, point.x);
            write_float(out, point.y);
            write_float(out, point.z);
            out.push_str(") ");
        }
        out.push('\n');
    }
    Ok(())
}

fn write_clusters_r(tree: &Tree, node: NodeId, out: &mut String, mut viscluster: i32, game: &dyn GameDef) -> Result<i32> {
    let n = &tree.nodes[node];
    if !n.is_leaf() {
        viscluster = write_clusters_r(tree, n.children[0], out, viscluster, game)?;
        viscluster = write_clusters_r(tree, n.children[1], out, viscluster, game)?;
        return Ok(viscluster);
    }
    if game.is_solid(&n.contents) {
        return Ok(viscluster);
    }

    // moving into the next cluster starts a new line
    if n.viscluster != viscluster {
        out.push_str("-1\n");
        viscluster += 1;
    }
    if n.viscluster != viscluster {
        return Err(CompileError::PortalAsymmetry {
            detail: "detail cluster mismatch".to_string(),
        });
    }

    let _ = write!(out, "{} ", n.visleafnum);
    Ok(viscluster)
}

/// Serialise the portal graph: numbers every leaf/cluster and produces the
/// PRT text in the variant the target game and options call for.
pub fn write_portal_file(
    tree: &mut Tree,
    planes: &PlanePool,
    options: &Options,
) -> Result<(String, PortalState)> {
    let game = options.game();
    let mut state = PortalState::default();
    let head = tree.headnode;
    number_leafs_r(tree, head, &mut state, -1, game, options);

    let mut out = String::new();

    // the cluster-native game uses the PRT1 format with cluster indices
    if game.uses_clusters() {
        let _ = write!(out, "PRT1\n{}\n{}\n", state.num_visclusters, state.num_visportals);
        write_portals_r(tree, head, &mut out, true, game, options, planes)?;
        return Ok((out, state));
    }

    if !state.uses_detail {
        let _ = write!(out, "PRT1\n{}\n{}\n", state.num_visleafs, state.num_visportals);
        write_portals_r(tree, head, &mut out, false, game, options, planes)?;
    } else if options.force_prt1 {
        // a PRT1 for map editors; the visibility pass will reject it
        let _ = write!(out, "PRT1\n{}\n{}\n", state.num_visclusters, state.num_visportals);
        write_portals_r(tree, head, &mut out, true, game, options, planes)?;
    } else {
        let _ = write!(
            out,
            "PRT2\n{}\n{}\n{}\n",
            state.num_visleafs, state.num_visclusters, state.num_visportals
        );
        write_portals_r(tree, head, &mut out, true, game, options, planes)?;
        let check = write_clusters_r(tree, head, &mut out, 0, game)?;
        if check != state.num_visclusters as i32 - 1 {
            return Err(CompileError::PortalAsymmetry {
                detail: "detail cluster mismatch".to_string(),
            });
        }
        out.push_str("-1\n");
    }

    log::info!(
        "{:8} vis leafs, {:8} vis clusters, {:8} vis portals",
        state.num_visleafs,
        state.num_visclusters,
        state.num_visportals
    );
    Ok((out, state))
}
