use thiserror::Error;

/// Fatal compilation failures. Per-face oddities (points slightly off
/// plane, healed degenerate edges, missing rotation targets) are logged
/// and never abort; everything here does, and no output is produced.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid plane normal (vector length {length:.4})")]
    InvalidPlane { length: f64 },

    #[error("line {linenum}: too few points ({points})")]
    DegenerateFace { points: usize, linenum: usize },

    #[error("line {linenum}: non-convex face (error size {error_size:.4})")]
    NonConvexFace { error_size: f64, linenum: usize },

    #[error("line {linenum}: coordinate out of range ({value})")]
    OutOfRange { value: f64, linenum: usize },

    #[error("line {linenum}: face winding exceeds {max} points")]
    TooManyFacePoints { max: usize, linenum: usize },

    #[error("line {linenum}: brush exceeds {max} faces")]
    TooManyFaces { max: usize, linenum: usize },

    #[error("line {linenum}: hull brush exceeds {max} points")]
    TooManyHullPoints { max: usize, linenum: usize },

    #[error("line {linenum}: hull brush exceeds {max} edges")]
    TooManyHullEdges { max: usize, linenum: usize },

    #[error("line {linenum}: mixed face contents in brush")]
    MixedContents { linenum: usize },

    #[error("bsp recursion exceeded {max} levels")]
    BspTooDeep { max: usize },

    #[error("portal graph asymmetry: {detail}")]
    PortalAsymmetry { detail: String },

    #[error("leaf {leaf} has invalid contents for the target game")]
    InvalidContents { leaf: usize },

    #[error("lump limits exceeded for the classic format and no extended format is registered")]
    NoExtendedFormat,
}

pub type Result<T, E = CompileError> = std::result::Result<T, E>;
