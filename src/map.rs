use crate::aabb::Aabb;
use crate::math::{Plane, Vec3};
use crate::planepool::PlanePool;
use crate::texinfo::{SurfFlags, TexInfoPool};
use std::fmt::Write as _;

/// One texture referenced by the map, with the Q2-style flag/value pair.
#[derive(Clone, Debug, Default)]
pub struct MiptexEntry {
    pub name: String,
    pub flags: i32,
    pub value: i32,
}

/// A single face line of a source brush, already parsed: the face plane,
/// the texture it samples and its projection record.
#[derive(Clone, Debug)]
pub struct MapFace {
    pub plane: Plane,
    pub texname: String,
    pub texinfo: usize,
    pub flags: SurfFlags,
    /// Native per-face content bits (Quake II format).
    pub contents: i32,
    pub value: i32,
    /// Line in the source map, for diagnostics.
    pub linenum: usize,
}

impl MapFace {
    pub fn new(plane: Plane, texname: impl Into<String>, texinfo: usize, linenum: usize) -> MapFace {
        MapFace {
            plane,
            texname: texname.into(),
            texinfo,
            flags: SurfFlags::default(),
            contents: 0,
            value: 0,
            linenum,
        }
    }

    /// Classic face syntax defines the plane by three clockwise points.
    pub fn from_points(
        points: [Vec3; 3],
        texname: impl Into<String>,
        texinfo: usize,
        linenum: usize,
    ) -> Option<MapFace> {
        let plane = Plane::from_points(points[0], points[1], points[2])?;
        Some(MapFace::new(plane, texname, texinfo, linenum))
    }
}

/// A convex polyhedron from the source map: the intersection of the
/// negative half-spaces of its face planes.
#[derive(Clone, Debug, Default)]
pub struct MapBrush {
    pub faces: Vec<MapFace>,
}

impl MapBrush {
    pub fn new(faces: Vec<MapFace>) -> MapBrush {
        MapBrush { faces }
    }

    pub fn linenum(&self) -> usize {
        self.faces.first().map_or(0, |f| f.linenum)
    }

    /// Editors can mark individual Quake brushes as detail with a content
    /// bit on the first face.
    pub fn is_detail_tagged(&self) -> bool {
        self.faces
            .first()
            .map_or(false, |f| f.contents & crate::game::MAPFACE_DETAIL_BIT != 0)
    }
}

/// A brace-delimited entity: key/value pairs in parse order plus its
/// brushes.
#[derive(Clone, Debug, Default)]
pub struct MapEntity {
    pub epairs: Vec<(String, String)>,
    pub brushes: Vec<MapBrush>,

    // filled in during compilation
    pub bounds: Aabb,
    pub output_model_number: Option<usize>,
}

impl MapEntity {
    pub fn new(epairs: Vec<(String, String)>, brushes: Vec<MapBrush>) -> MapEntity {
        MapEntity {
            epairs,
            brushes,
            bounds: Aabb::new(),
            output_model_number: None,
        }
    }

    pub fn value_for_key(&self, key: &str) -> &str {
        self.epairs
            .iter()
            .find(|(k, _)| k == key)
            .map_or("", |(_, v)| v.as_str())
    }

    pub fn set_key_value(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(pair) = self.epairs.iter_mut().find(|(k, _)| k == key) {
            pair.1 = value;
        } else {
            self.epairs.push((key.to_string(), value));
        }
    }

    pub fn classname(&self) -> &str {
        self.value_for_key("classname")
    }

    /// Parse a `"x y z"` key; zero when absent or malformed.
    pub fn vector_for_key(&self, key: &str) -> Vec3 {
        let mut out = Vec3::new(0.0, 0.0, 0.0);
        let value = self.value_for_key(key);
        for (i, token) in value.split_ascii_whitespace().take(3).enumerate() {
            out[i] = token.parse().unwrap_or(0.0);
        }
        out
    }

    pub fn int_for_key(&self, key: &str) -> i32 {
        parse_int_prefix(self.value_for_key(key))
    }

    pub fn float_for_key(&self, key: &str) -> f64 {
        self.value_for_key(key).trim().parse().unwrap_or(0.0)
    }
}

/// `atoi`-style parse: leading integer prefix, 0 otherwise.
fn parse_int_prefix(s: &str) -> i32 {
    let s = s.trim_start();
    let mut end = 0;
    for (i, c) in s.char_indices() {
        if c == '-' || c == '+' {
            if i > 0 {
                break;
            }
        } else if !c.is_ascii_digit() {
            break;
        }
        end = i + c.len_utf8();
    }
    s[..end].parse().unwrap_or(0)
}

/// The structured form of a parsed map plus the process-wide pools shared
/// by every entity's pipeline.
#[derive(Default)]
pub struct MapData {
    pub entities: Vec<MapEntity>,
    pub planes: PlanePool,
    pub texinfos: TexInfoPool,
    pub miptex: Vec<MiptexEntry>,
}

impl MapData {
    pub fn new(entities: Vec<MapEntity>) -> MapData {
        MapData {
            entities,
            planes: PlanePool::new(),
            texinfos: TexInfoPool::new(),
            miptex: Vec::new(),
        }
    }

    pub fn miptex_name(&self, index: usize) -> &str {
        &self.miptex[index].name
    }

    pub fn add_miptex(&mut self, name: &str) -> usize {
        if let Some(i) = self
            .miptex
            .iter()
            .position(|m| m.name.eq_ignore_ascii_case(name))
        {
            return i;
        }
        self.miptex.push(MiptexEntry {
            name: name.to_string(),
            flags: 0,
            value: 0,
        });
        self.miptex.len() - 1
    }

    pub fn find_target_entity(&self, target: &str) -> Option<&MapEntity> {
        self.entities
            .iter()
            .find(|e| e.value_for_key("targetname").eq_ignore_ascii_case(target))
    }

    /// The entity text lump: every entity's key/value pairs in parse
    /// order, including brushless point entities.
    pub fn write_entities_to_string(&self) -> String {
        let mut out = String::new();
        for entity in &self.entities {
            if entity.epairs.is_empty() {
                continue;
            }
            out.push_str("{\n");
            for (key, value) in &entity.epairs {
                let _ = writeln!(out, "\"{}\" \"{}\"", key, value);
            }
            out.push_str("}\n");
        }
        out
    }
}
