use crate::brush;
use crate::csg;
use crate::edges;
use crate::error::Result;
use crate::export::{self, BspFile, DModel, ExtendedTexinfoSidecar};
use crate::face::DEFAULT_LMSHIFT;
use crate::map::MapData;
use crate::options::Options;
use crate::portal;
use crate::prtfile::{self, PortalState};
use crate::solidbsp;
use crate::tjunc;

/// Everything a successful compile produces: the typed lump record, the
/// portal file text (worldspawn only) and the optional texinfo sidecar.
pub struct CompileOutput {
    pub bsp: BspFile,
    pub portal_text: Option<String>,
    pub portal_state: Option<PortalState>,
    pub texinfo_sidecar: Option<ExtendedTexinfoSidecar>,
}

/// Run the whole pipeline over every entity. Nothing is produced on
/// error.
pub fn compile(map: &mut MapData, options: &Options) -> Result<CompileOutput> {
    let game = options.game();
    let mut bsp = BspFile::default();
    export::begin_bsp_file(&mut bsp, game);

    // resolve rotation-entity origins from their targets before any
    // brush loading reads the origin key
    for i in 0..map.entities.len() {
        if map.entities[i].classname().starts_with("rotate_") {
            brush::fix_rotate_origin(map, i);
        }
    }

    let mut portal_text = None;
    let mut portal_state = None;

    // world brush entities (func_detail, func_group, ...) dissolve into
    // the world model
    let world_sources: Vec<usize> = (0..map.entities.len())
        .filter(|&i| i == 0 || brush::is_world_brush_entity(map.entities[i].classname()))
        .collect();

    for entity_index in 0..map.entities.len() {
        let is_world = entity_index == 0;
        if !is_world && brush::is_world_brush_entity(map.entities[entity_index].classname()) {
            continue;
        }
        let has_brushes = if is_world {
            world_sources
                .iter()
                .any(|&i| !map.entities[i].brushes.is_empty())
        } else {
            !map.entities[entity_index].brushes.is_empty()
        };
        if !has_brushes {
            // point entities survive only in the entity text lump
            continue;
        }

        let modelnum = bsp.dmodels.len();
        bsp.dmodels.push(DModel::default());
        map.entities[entity_index].output_model_number = Some(modelnum);
        if !is_world {
            map.entities[entity_index].set_key_value("model", format!("*{}", modelnum));
        }

        log::info!("processing entity {} (model {})", entity_index, modelnum);

        let sources: &[usize] = if is_world {
            &world_sources
        } else {
            std::slice::from_ref(&entity_index)
        };

        let hull_count = game.hull_sizes().len();
        for hullnum in 0..hull_count {
            let mut brushes = Vec::new();
            for &src in sources {
                brushes.extend(brush::load_entity_brushes(
                    map,
                    entity_index,
                    src,
                    hullnum as i32,
                    options,
                )?);
            }
            // keep the global list in priority order; parse order breaks
            // ties
            brushes.sort_by_key(|b| b.priority);

            if hullnum > 0 && brushes.is_empty() {
                // nothing collides in this hull
                let empty = game.create_empty_contents().native;
                bsp.dmodels[modelnum].headnode[hullnum] = empty;
                continue;
            }

            let surfaces = csg::csg_faces(&brushes, game, &map.planes);
            let entity_bounds = map.entities[entity_index].bounds;
            let midsplit_levels = if is_world { options.midsplit_levels } else { 0 };
            let mut tree = solidbsp::solid_bsp(
                &entity_bounds,
                surfaces,
                midsplit_levels,
                &map.planes,
                game,
            )?;

            if hullnum == 0 {
                if is_world {
                    portal::portalize_tree(&mut tree, &map.planes, options.world_extent)?;
                    let (text, state) = prtfile::write_portal_file(&mut tree, &map.planes, options)?;
                    portal_text = Some(text);
                    portal_state = Some(state);
                }
                tjunc::tjunc(&mut tree);
                let firstface = edges::make_face_edges(&mut tree, map, &mut bsp);
                export::export_draw_nodes(
                    &tree,
                    &map.entities[entity_index],
                    map,
                    &mut bsp,
                    firstface,
                    options,
                )?;
            } else {
                export::export_clip_nodes(
                    &tree,
                    &map.entities[entity_index],
                    map,
                    &mut bsp,
                    hullnum,
                );
            }
        }

        if options.bspx_brushlist {
            let mut brushes = Vec::new();
            for &src in sources {
                brushes.extend(brush::load_entity_brushes(map, entity_index, src, -1, options)?);
            }
            brushes.sort_by_key(|b| b.priority);
            export::bspx_add_model(&mut bsp, modelnum, &brushes, &map.planes);
        }
    }

    // dissolved world brush entities don't survive in the entity text
    for i in 1..map.entities.len() {
        let classname = map.entities[i].classname().to_string();
        if brush::is_world_brush_entity(&classname)
            && !brush::is_nonremove_world_brush_entity(&classname)
        {
            map.entities[i].epairs.clear();
        }
    }

    bsp.entdata = map.write_entities_to_string();

    bsp.needs_lmshifts = bsp.lmshifts.iter().any(|&s| s != DEFAULT_LMSHIFT);
    if !bsp.needs_lmshifts {
        bsp.lmshifts.clear();
    }

    let texinfo_sidecar = export::extended_texinfo_sidecar(map);

    if !options.extended_limits {
        export::check_limits(&bsp)?;
    }

    log::info!(
        "compiled {} models, {} planes, {} faces, {} leafs",
        bsp.dmodels.len(),
        bsp.dplanes.len(),
        bsp.dfaces.len(),
        bsp.dleafs.len()
    );

    Ok(CompileOutput {
        bsp,
        portal_text,
        portal_state,
        texinfo_sidecar,
    })
}
