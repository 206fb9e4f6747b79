use crate::game::{ContentFlags, ExtContents};
use crate::math::{Plane, PlaneSide};
use crate::planepool::PlanePool;
use crate::winding::Winding;

/// Index of a face in a tree's face arena.
pub type FaceId = usize;

/// A working polygon flowing through CSG and partitioning. `contents`
/// records the content class on each side of the face: index 0 is the
/// region the normal points into, index 1 the brush behind it.
#[derive(Clone, Debug)]
pub struct Face {
    pub planenum: usize,
    pub planeside: PlaneSide,
    pub texinfo: usize,
    pub contents: [ContentFlags; 2],
    pub winding: Winding,
    /// Pre-split ancestor in the tree's face arena; mark-surface
    /// expansion follows this chain.
    pub original: Option<FaceId>,
    /// Assigned by the edge builder when the face is emitted.
    pub output_number: Option<usize>,
    pub lmshift: u8,
    pub linenum: usize,
}

/// Default light shift: 16 units per lightmap texel.
pub const DEFAULT_LMSHIFT: u8 = 4;

impl Face {
    pub fn new(
        planenum: usize,
        planeside: PlaneSide,
        texinfo: usize,
        winding: Winding,
        linenum: usize,
    ) -> Face {
        Face {
            planenum,
            planeside,
            texinfo,
            contents: [ContentFlags::default(); 2],
            winding,
            original: None,
            output_number: None,
            lmshift: DEFAULT_LMSHIFT,
            linenum,
        }
    }

    /// The plane as the face sees it (flipped for back-side faces).
    pub fn plane(&self, planes: &PlanePool) -> Plane {
        planes.face_plane(self.planenum, self.planeside)
    }

    /// A clone carrying over everything but the winding.
    pub fn with_winding(&self, winding: Winding) -> Face {
        Face {
            winding,
            output_number: None,
            ..self.clone()
        }
    }

    /// Flipped duplicate used for interior-visible liquids: reversed
    /// winding, opposite side, swapped side contents.
    pub fn mirrored(&self) -> Face {
        let mut face = self.with_winding(self.winding.flipped());
        face.planeside = self.planeside.flipped();
        face.contents = [self.contents[1], self.contents[0]];
        face
    }

    pub fn is_detail(&self) -> bool {
        self.contents[0].is_detail(ExtContents::DETAIL)
            || self.contents[1].is_detail(ExtContents::DETAIL)
    }
}
