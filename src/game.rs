use crate::aabb::Aabb;
use crate::error::{CompileError, Result};
use crate::map::MapBrush;
use crate::math::Vec3;
use crate::options::TargetGame;
use bitflags::bitflags;

// Quake native content classes.
pub const CONTENTS_EMPTY: i32 = -1;
pub const CONTENTS_SOLID: i32 = -2;
pub const CONTENTS_WATER: i32 = -3;
pub const CONTENTS_SLIME: i32 = -4;
pub const CONTENTS_LAVA: i32 = -5;
pub const CONTENTS_SKY: i32 = -6;

// Quake II native content bits.
pub const Q2_CONTENTS_SOLID: i32 = 0x1;
pub const Q2_CONTENTS_WINDOW: i32 = 0x2;
pub const Q2_CONTENTS_AUX: i32 = 0x4;
pub const Q2_CONTENTS_LAVA: i32 = 0x8;
pub const Q2_CONTENTS_SLIME: i32 = 0x10;
pub const Q2_CONTENTS_WATER: i32 = 0x20;
pub const Q2_CONTENTS_MIST: i32 = 0x40;
pub const Q2_CONTENTS_PLAYERCLIP: i32 = 0x10000;
pub const Q2_CONTENTS_MONSTERCLIP: i32 = 0x20000;
pub const Q2_CONTENTS_ORIGIN: i32 = 0x0100_0000;
pub const Q2_CONTENTS_DETAIL: i32 = 0x0800_0000;
pub const Q2_CONTENTS_TRANSLUCENT: i32 = 0x1000_0000;

// Quake II native surface bits consulted by the classifier.
pub const Q2_SURF_SKY: i32 = 0x4;
pub const Q2_SURF_TRANS33: i32 = 0x10;
pub const Q2_SURF_TRANS66: i32 = 0x20;
pub const Q2_SURF_NODRAW: i32 = 0x80;
pub const Q2_SURF_HINT: i32 = 0x100;

/// Per-face content bit some editors write on Quake brushes to mark
/// detail.
pub const MAPFACE_DETAIL_BIT: i32 = 1 << 27;

/// Compiler-internal content classes layered over the native ones.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtContents(u16);

bitflags! {
    impl ExtContents: u16 {
        /// Solid geometry that must not split visibility clusters.
        const DETAIL                 = 0x0001;
        /// Non-solid, non-blocking detail (saved as empty).
        const DETAIL_ILLUSIONARY     = 0x0002;
        /// Solid-on-export detail whose interior faces survive.
        const DETAIL_FENCE           = 0x0004;
        /// Origin marker brush, always discarded.
        const ORIGIN                 = 0x0008;
        /// Hint brush steering the partitioner.
        const HINT                   = 0x0010;
        /// Collision-only brush.
        const CLIP                   = 0x0020;
        /// Emit flipped interior faces.
        const MIRROR_INSIDE          = 0x0040;
        /// Skip CSG clipping against brushes of the same contents.
        const NO_CLIPPING_SAME_TYPE  = 0x0080;
        /// Blocks portal visibility despite being non-solid.
        const ILLUSIONARY_VISBLOCKER = 0x0100;
    }
}

/// A content classification: the target game's native value plus the
/// compiler-internal extended bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContentFlags {
    pub native: i32,
    pub extended: ExtContents,
}

impl ContentFlags {
    pub fn is_origin(&self) -> bool {
        self.extended.contains(ExtContents::ORIGIN)
    }

    pub fn is_hint(&self) -> bool {
        self.extended.contains(ExtContents::HINT)
    }

    pub fn is_clip(&self) -> bool {
        self.extended.contains(ExtContents::CLIP)
    }

    pub fn is_detail(&self, kind: ExtContents) -> bool {
        self.extended.contains(kind)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiquidKind {
    Water,
    Slime,
    Lava,
}

/// Everything that varies by target game: the contents model, brush
/// classification, portal visibility, clipping hulls and leaf validation.
pub trait GameDef: Sync {
    fn id(&self) -> TargetGame;

    fn classify_brush(&self, brush: &MapBrush) -> Result<ContentFlags>;

    fn create_empty_contents(&self) -> ContentFlags;
    fn create_solid_contents(&self) -> ContentFlags;
    fn create_sky_contents(&self) -> ContentFlags;
    fn create_liquid_contents(&self, kind: LiquidKind) -> ContentFlags;
    fn create_extended_contents(&self, extended: ExtContents) -> ContentFlags;

    fn is_empty(&self, contents: &ContentFlags) -> bool;
    fn is_solid(&self, contents: &ContentFlags) -> bool;
    fn is_sky(&self, contents: &ContentFlags) -> bool;
    fn is_liquid(&self, contents: &ContentFlags) -> bool;

    /// Rank used when merging leaf/cluster contents; higher wins.
    fn contents_priority(&self, contents: &ContentFlags) -> i32;

    /// Combined contents of two sibling clusters.
    fn cluster_contents(&self, a: &ContentFlags, b: &ContentFlags) -> ContentFlags {
        let native = if self.contents_priority(a) >= self.contents_priority(b) {
            a.native
        } else {
            b.native
        };
        ContentFlags {
            native,
            extended: a.extended | b.extended,
        }
    }

    fn portal_can_see_through(
        &self,
        a: &ContentFlags,
        b: &ContentFlags,
        transwater: bool,
        transsky: bool,
    ) -> bool;

    /// Whether this native contents value may be written to a leaf.
    fn validate_leaf_contents(&self, contents: &ContentFlags) -> bool;

    /// Hull boxes, index 0 being the zero-size draw hull.
    fn hull_sizes(&self) -> &'static [Aabb];

    /// Portal file indices refer to clusters instead of leaves.
    fn uses_clusters(&self) -> bool {
        false
    }
}

// ===========================================================================
// Quake (and Hexen II, which shares the rules but not the hull table)
// ===========================================================================

struct QuakeGame {
    id: TargetGame,
    hulls: &'static [Aabb],
}

static Q1_HULLS: [Aabb; 3] = [
    Aabb {
        min: Vec3 { x: 0.0, y: 0.0, z: 0.0 },
        max: Vec3 { x: 0.0, y: 0.0, z: 0.0 },
        is_valid: true,
    },
    Aabb {
        min: Vec3 { x: -16.0, y: -16.0, z: -24.0 },
        max: Vec3 { x: 16.0, y: 16.0, z: 32.0 },
        is_valid: true,
    },
    Aabb {
        min: Vec3 { x: -32.0, y: -32.0, z: -24.0 },
        max: Vec3 { x: 32.0, y: 32.0, z: 64.0 },
        is_valid: true,
    },
];

static H2_HULLS: [Aabb; 5] = [
    Aabb {
        min: Vec3 { x: 0.0, y: 0.0, z: 0.0 },
        max: Vec3 { x: 0.0, y: 0.0, z: 0.0 },
        is_valid: true,
    },
    Aabb {
        min: Vec3 { x: -16.0, y: -16.0, z: -24.0 },
        max: Vec3 { x: 16.0, y: 16.0, z: 32.0 },
        is_valid: true,
    },
    Aabb {
        min: Vec3 { x: -24.0, y: -24.0, z: -20.0 },
        max: Vec3 { x: 24.0, y: 24.0, z: 20.0 },
        is_valid: true,
    },
    Aabb {
        min: Vec3 { x: -16.0, y: -16.0, z: -12.0 },
        max: Vec3 { x: 16.0, y: 16.0, z: 16.0 },
        is_valid: true,
    },
    Aabb {
        min: Vec3 { x: -8.0, y: -8.0, z: -8.0 },
        max: Vec3 { x: 8.0, y: 8.0, z: 8.0 },
        is_valid: true,
    },
];

impl GameDef for QuakeGame {
    fn id(&self) -> TargetGame {
        self.id
    }

    fn classify_brush(&self, brush: &MapBrush) -> Result<ContentFlags> {
        // check for strong content indicators; first match wins
        for face in &brush.faces {
            let texname = face.texname.as_str();
            if texname.eq_ignore_ascii_case("origin") {
                return Ok(self.create_extended_contents(ExtContents::ORIGIN));
            } else if texname.eq_ignore_ascii_case("hint") {
                return Ok(self.create_extended_contents(ExtContents::HINT));
            } else if texname.eq_ignore_ascii_case("clip") {
                return Ok(self.create_extended_contents(ExtContents::CLIP));
            } else if let Some(rest) = texname.strip_prefix('*') {
                let lower = rest.to_ascii_lowercase();
                let kind = if lower.starts_with("lava") {
                    LiquidKind::Lava
                } else if lower.starts_with("slime") {
                    LiquidKind::Slime
                } else {
                    LiquidKind::Water
                };
                return Ok(self.create_liquid_contents(kind));
            } else if texname.len() >= 3 && texname[..3].eq_ignore_ascii_case("sky") {
                return Ok(self.create_sky_contents());
            }
        }

        // anything else is assumed to be a regular solid
        Ok(self.create_solid_contents())
    }

    fn create_empty_contents(&self) -> ContentFlags {
        ContentFlags {
            native: CONTENTS_EMPTY,
            extended: ExtContents::empty(),
        }
    }

    fn create_solid_contents(&self) -> ContentFlags {
        ContentFlags {
            native: CONTENTS_SOLID,
            extended: ExtContents::empty(),
        }
    }

    fn create_sky_contents(&self) -> ContentFlags {
        ContentFlags {
            native: CONTENTS_SKY,
            extended: ExtContents::empty(),
        }
    }

    fn create_liquid_contents(&self, kind: LiquidKind) -> ContentFlags {
        let native = match kind {
            LiquidKind::Water => CONTENTS_WATER,
            LiquidKind::Slime => CONTENTS_SLIME,
            LiquidKind::Lava => CONTENTS_LAVA,
        };
        ContentFlags {
            native,
            extended: ExtContents::empty(),
        }
    }

    fn create_extended_contents(&self, extended: ExtContents) -> ContentFlags {
        // detail stays solid so it still seals; the other extended
        // classes ride on empty space
        let native = if extended.contains(ExtContents::DETAIL) {
            CONTENTS_SOLID
        } else {
            CONTENTS_EMPTY
        };
        ContentFlags { native, extended }
    }

    fn is_empty(&self, contents: &ContentFlags) -> bool {
        contents.native == CONTENTS_EMPTY
    }

    fn is_solid(&self, contents: &ContentFlags) -> bool {
        contents.native == CONTENTS_SOLID
    }

    fn is_sky(&self, contents: &ContentFlags) -> bool {
        contents.native == CONTENTS_SKY
    }

    fn is_liquid(&self, contents: &ContentFlags) -> bool {
        matches!(
            contents.native,
            CONTENTS_WATER | CONTENTS_SLIME | CONTENTS_LAVA
        )
    }

    fn contents_priority(&self, contents: &ContentFlags) -> i32 {
        if contents.extended.contains(ExtContents::DETAIL_FENCE) {
            5
        } else if contents.extended.contains(ExtContents::DETAIL_ILLUSIONARY) {
            1
        } else {
            match contents.native {
                CONTENTS_SOLID => 7,
                CONTENTS_SKY => 6,
                CONTENTS_LAVA => 4,
                CONTENTS_SLIME => 3,
                CONTENTS_WATER => 2,
                _ => 0,
            }
        }
    }

    fn portal_can_see_through(
        &self,
        a: &ContentFlags,
        b: &ContentFlags,
        transwater: bool,
        transsky: bool,
    ) -> bool {
        let (c0, c1) = (a.native, b.native);
        if c0 == CONTENTS_SOLID || c1 == CONTENTS_SOLID {
            return false;
        }
        if c0 == CONTENTS_SKY && c1 == CONTENTS_SKY {
            return false;
        }
        if c0 == c1 {
            return true;
        }
        let translate = |c: i32| match c {
            CONTENTS_WATER | CONTENTS_SLIME | CONTENTS_LAVA if transwater => CONTENTS_EMPTY,
            CONTENTS_SKY if transsky => CONTENTS_EMPTY,
            other => other,
        };
        translate(c0) == translate(c1)
    }

    fn validate_leaf_contents(&self, contents: &ContentFlags) -> bool {
        matches!(
            contents.native,
            CONTENTS_EMPTY
                | CONTENTS_SOLID
                | CONTENTS_WATER
                | CONTENTS_SLIME
                | CONTENTS_LAVA
                | CONTENTS_SKY
        )
    }

    fn hull_sizes(&self) -> &'static [Aabb] {
        self.hulls
    }
}

// ===========================================================================
// Quake II
// ===========================================================================

struct Quake2Game;

static Q2_HULLS: [Aabb; 1] = [Aabb {
    min: Vec3 { x: 0.0, y: 0.0, z: 0.0 },
    max: Vec3 { x: 0.0, y: 0.0, z: 0.0 },
    is_valid: true,
}];

const Q2_LIQUID: i32 = Q2_CONTENTS_LAVA | Q2_CONTENTS_SLIME | Q2_CONTENTS_WATER;

impl GameDef for Quake2Game {
    fn id(&self) -> TargetGame {
        TargetGame::Quake2
    }

    fn classify_brush(&self, brush: &MapBrush) -> Result<ContentFlags> {
        let mut is_trans = false;
        let mut is_hint = false;
        let first = &brush.faces[0];
        let mut contents = ContentFlags {
            native: first.contents,
            extended: ExtContents::empty(),
        };

        for face in &brush.faces {
            if face.flags.extended.contains(crate::texinfo::TexFlags::SKIP) {
                continue;
            }
            if !is_trans && (face.flags.native & (Q2_SURF_TRANS33 | Q2_SURF_TRANS66)) != 0 {
                is_trans = true;
            }
            if !is_hint && (face.flags.native & Q2_SURF_HINT) != 0 {
                is_hint = true;
            }
            if face.contents != contents.native {
                log::warn!(
                    "mixed face contents ({:#x} != {:#x} at line {})",
                    face.contents,
                    contents.native,
                    face.linenum
                );
                break;
            }
        }

        // if any side is translucent, mark the contents and change solid
        // to window
        if is_trans {
            contents.native |= Q2_CONTENTS_TRANSLUCENT;
            if contents.native & Q2_CONTENTS_SOLID != 0 {
                contents.native = (contents.native & !Q2_CONTENTS_SOLID) | Q2_CONTENTS_WINDOW;
            }
        }

        if contents.native & Q2_CONTENTS_DETAIL != 0 {
            contents.extended |= ExtContents::DETAIL;
        }
        if contents.native & (Q2_CONTENTS_MONSTERCLIP | Q2_CONTENTS_PLAYERCLIP) != 0 {
            contents.extended |= ExtContents::CLIP;
        }
        if contents.native & Q2_CONTENTS_ORIGIN != 0 {
            contents.extended |= ExtContents::ORIGIN;
        }
        if contents.native & Q2_CONTENTS_MIST != 0 {
            contents.extended |= ExtContents::DETAIL_ILLUSIONARY;
        }
        if is_hint {
            contents.extended |= ExtContents::HINT;
        }

        // clip and liquids are already handled like detail
        if contents.extended.contains(ExtContents::DETAIL)
            && contents.native & Q2_CONTENTS_SOLID == 0
        {
            contents.extended &= !ExtContents::DETAIL;
        }

        if contents.native & Q2_CONTENTS_SOLID != 0 && contents.native & Q2_LIQUID != 0 {
            return Err(CompileError::MixedContents {
                linenum: first.linenum,
            });
        }

        Ok(contents)
    }

    fn create_empty_contents(&self) -> ContentFlags {
        ContentFlags::default()
    }

    fn create_solid_contents(&self) -> ContentFlags {
        ContentFlags {
            native: Q2_CONTENTS_SOLID,
            extended: ExtContents::empty(),
        }
    }

    fn create_sky_contents(&self) -> ContentFlags {
        // sky is a surface flag in this game; the volume itself is solid
        ContentFlags {
            native: Q2_CONTENTS_SOLID,
            extended: ExtContents::empty(),
        }
    }

    fn create_liquid_contents(&self, kind: LiquidKind) -> ContentFlags {
        let native = match kind {
            LiquidKind::Water => Q2_CONTENTS_WATER,
            LiquidKind::Slime => Q2_CONTENTS_SLIME,
            LiquidKind::Lava => Q2_CONTENTS_LAVA,
        };
        ContentFlags {
            native,
            extended: ExtContents::empty(),
        }
    }

    fn create_extended_contents(&self, extended: ExtContents) -> ContentFlags {
        let native = if extended.contains(ExtContents::DETAIL) {
            Q2_CONTENTS_SOLID | Q2_CONTENTS_DETAIL
        } else {
            0
        };
        ContentFlags { native, extended }
    }

    fn is_empty(&self, contents: &ContentFlags) -> bool {
        contents.native == 0
    }

    fn is_solid(&self, contents: &ContentFlags) -> bool {
        contents.native & Q2_CONTENTS_SOLID != 0
    }

    fn is_sky(&self, _contents: &ContentFlags) -> bool {
        false
    }

    fn is_liquid(&self, contents: &ContentFlags) -> bool {
        contents.native & Q2_LIQUID != 0
    }

    fn contents_priority(&self, contents: &ContentFlags) -> i32 {
        let c = contents.native;
        if c & Q2_CONTENTS_SOLID != 0 {
            7
        } else if c & Q2_CONTENTS_WINDOW != 0 {
            6
        } else if contents.extended.contains(ExtContents::DETAIL_FENCE) {
            5
        } else if c & Q2_CONTENTS_LAVA != 0 {
            4
        } else if c & Q2_CONTENTS_SLIME != 0 {
            3
        } else if c & Q2_CONTENTS_WATER != 0 {
            2
        } else if c & Q2_CONTENTS_MIST != 0 {
            1
        } else {
            0
        }
    }

    fn cluster_contents(&self, a: &ContentFlags, b: &ContentFlags) -> ContentFlags {
        let mut combined = ContentFlags {
            native: a.native | b.native,
            extended: a.extended | b.extended,
        };
        // a cluster is only solid when both halves are
        if a.native & Q2_CONTENTS_SOLID == 0 || b.native & Q2_CONTENTS_SOLID == 0 {
            combined.native &= !Q2_CONTENTS_SOLID;
        }
        combined
    }

    fn portal_can_see_through(
        &self,
        a: &ContentFlags,
        b: &ContentFlags,
        transwater: bool,
        _transsky: bool,
    ) -> bool {
        let (c0, c1) = (a.native, b.native);
        if c0 & Q2_CONTENTS_SOLID != 0 || c1 & Q2_CONTENTS_SOLID != 0 {
            return false;
        }
        let strip = |c: i32| {
            let mut c = c & !(Q2_CONTENTS_TRANSLUCENT | Q2_CONTENTS_MIST | Q2_CONTENTS_DETAIL);
            if transwater {
                c &= !Q2_LIQUID;
            }
            c
        };
        strip(c0) == strip(c1)
    }

    fn validate_leaf_contents(&self, contents: &ContentFlags) -> bool {
        contents.native >= 0
    }

    fn hull_sizes(&self) -> &'static [Aabb] {
        &Q2_HULLS
    }

    fn uses_clusters(&self) -> bool {
        true
    }
}

static QUAKE: QuakeGame = QuakeGame {
    id: TargetGame::Quake,
    hulls: &Q1_HULLS,
};
static HEXEN2: QuakeGame = QuakeGame {
    id: TargetGame::Hexen2,
    hulls: &H2_HULLS,
};
static QUAKE2: Quake2Game = Quake2Game;

pub fn game_def(target: TargetGame) -> &'static dyn GameDef {
    match target {
        TargetGame::Quake => &QUAKE,
        TargetGame::Hexen2 => &HEXEN2,
        TargetGame::Quake2 => &QUAKE2,
    }
}
