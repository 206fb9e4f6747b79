//! Compiles brush-based level geometry into a binary space partition:
//! draw faces with shared edges, per-leaf contents, Minkowski-expanded
//! clipping hulls and the portal graph consumed by a later visibility
//! pass. Parsing the map text and serialising the lumps to disk are the
//! callers' jobs; this crate turns the structured map into the records.

pub mod aabb;
pub mod brush;
pub mod bsp;
pub mod compile;
pub mod csg;
pub mod edges;
pub mod error;
pub mod export;
pub mod face;
pub mod game;
pub mod map;
pub mod math;
pub mod options;
pub mod planepool;
pub mod portal;
pub mod prtfile;
pub mod solidbsp;
pub mod texinfo;
pub mod tjunc;
pub mod winding;

pub use compile::{compile, CompileOutput};
pub use error::{CompileError, Result};
pub use map::{MapBrush, MapData, MapEntity, MapFace};
pub use options::{HullExpansion, Options, TargetGame};
