use crate::game::{self, GameDef};

/// Which clip-hull expansion steps run for hulls above 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HullExpansion {
    /// No expansion; clip hulls mirror the draw hull.
    None,
    /// Push face planes outward and add the inflated axis planes.
    Standard,
    /// Standard plus the edge bevel pass.
    FullBevels,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetGame {
    Quake,
    Quake2,
    Hexen2,
}

/// The recognised configuration surface.
#[derive(Clone, Debug)]
pub struct Options {
    pub hull_expansion: HullExpansion,
    /// Force an axial midsplit for the top-N recursion levels.
    pub midsplit_levels: usize,
    /// Portals see through water/sky surfaces.
    pub transwater: bool,
    pub transsky: bool,
    /// Downgrade PRT2 output to PRT1.
    pub force_prt1: bool,
    pub omit_detail: bool,
    pub omit_detail_fence: bool,
    pub omit_detail_illusionary: bool,
    /// Absolute coordinate bound; violation is fatal.
    pub world_extent: f64,
    /// Keep "skip"-textured faces in leaf mark-surfaces.
    pub include_skip: bool,
    pub target_game: TargetGame,
    /// Rebase texture projections of rotated brushes by the rotation
    /// offset.
    pub fix_rotate_obj_texture: bool,
    /// An extended-limits output format is registered, so classic lump
    /// limits don't apply.
    pub extended_limits: bool,
    /// Emit the BSPX brush list lump.
    pub bspx_brushlist: bool,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            hull_expansion: HullExpansion::FullBevels,
            midsplit_levels: 0,
            transwater: false,
            transsky: false,
            force_prt1: false,
            omit_detail: false,
            omit_detail_fence: false,
            omit_detail_illusionary: false,
            world_extent: 65536.0,
            include_skip: false,
            target_game: TargetGame::Quake,
            fix_rotate_obj_texture: false,
            extended_limits: false,
            bspx_brushlist: false,
        }
    }
}

impl Options {
    pub fn game(&self) -> &'static dyn GameDef {
        game::game_def(self.target_game)
    }
}
