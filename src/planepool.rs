use crate::error::{CompileError, Result};
use crate::math::{qrint, Plane, PlaneSide, PlaneType, NORMAL_EPSILON};
use cgmath::InnerSpace;
use std::collections::HashMap;
use std::sync::Mutex;

/// A canonicalised plane plus its bookkeeping: the axis-type tag and the
/// lazily assigned output index.
#[derive(Clone, Copy, Debug)]
pub struct PoolPlane {
    pub plane: Plane,
    pub plane_type: PlaneType,
    pub output_num: Option<usize>,
}

#[derive(Default)]
struct PoolInner {
    planes: Vec<PoolPlane>,
    // bucket index is the rounded absolute distance; level coordinates
    // are near-integer, so this clusters candidates cheaply
    buckets: HashMap<i64, Vec<usize>>,
}

/// Canonicalises and de-duplicates oriented half-spaces. Append-only and
/// shared by every entity's pipeline, so lookups are internally
/// synchronised.
#[derive(Default)]
pub struct PlanePool {
    inner: Mutex<PoolInner>,
}

fn plane_hash(plane: &Plane) -> i64 {
    qrint(plane.dist.abs()) as i64
}

/// Snap exact ±1 normals to their axis, classify the dominant axis, and
/// (when allowed) flip so the dominant component is positive. Returns the
/// type tag and whether the plane was flipped.
fn normalize_plane(p: &mut Plane, flip: bool) -> (PlaneType, bool) {
    for i in 0..3 {
        if p.normal[i] == 1.0 {
            p.normal[(i + 1) % 3] = 0.0;
            p.normal[(i + 2) % 3] = 0.0;
            return (axial_type(i), false);
        }
        if p.normal[i] == -1.0 {
            if flip {
                p.normal[i] = 1.0;
                p.dist = -p.dist;
            }
            p.normal[(i + 1) % 3] = 0.0;
            p.normal[(i + 2) % 3] = 0.0;
            return (axial_type(i), flip);
        }
    }

    let ax = p.normal.x.abs();
    let ay = p.normal.y.abs();
    let az = p.normal.z.abs();

    let plane_type = if ax >= ay && ax >= az {
        PlaneType::AnyX
    } else if ay >= ax && ay >= az {
        PlaneType::AnyY
    } else {
        PlaneType::AnyZ
    };

    if flip && p.normal[plane_type.axis()] < 0.0 {
        *p = -*p;
        return (plane_type, true);
    }

    (plane_type, false)
}

fn axial_type(axis: usize) -> PlaneType {
    match axis {
        0 => PlaneType::X,
        1 => PlaneType::Y,
        _ => PlaneType::Z,
    }
}

impl PlanePool {
    pub fn new() -> PlanePool {
        PlanePool::default()
    }

    fn insert(inner: &mut PoolInner, plane: &Plane, flip: bool) -> Result<(usize, PlaneSide)> {
        let len = plane.normal.magnitude();
        if len < 1.0 - NORMAL_EPSILON || len > 1.0 + NORMAL_EPSILON {
            return Err(CompileError::InvalidPlane { length: len });
        }

        let mut canonical = *plane;
        let (plane_type, flipped) = normalize_plane(&mut canonical, flip);

        let index = inner.planes.len();
        inner.planes.push(PoolPlane {
            plane: canonical,
            plane_type,
            output_num: None,
        });
        inner
            .buckets
            .entry(plane_hash(&canonical))
            .or_default()
            .push(index);

        let side = if flipped {
            PlaneSide::Back
        } else {
            PlaneSide::Front
        };
        Ok((index, side))
    }

    /// Global plane number plus which side of the stored orientation the
    /// query was on (`Back` means the caller's plane is the flipped one).
    pub fn find_plane(&self, plane: &Plane) -> Result<(usize, PlaneSide)> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(bucket) = inner.buckets.get(&plane_hash(plane)) {
            for &i in bucket {
                let stored = inner.planes[i].plane;
                if stored.epsilon_equal(plane) {
                    return Ok((i, PlaneSide::Front));
                }
                if (-stored).epsilon_equal(plane) {
                    return Ok((i, PlaneSide::Back));
                }
            }
        }
        Self::insert(&mut inner, plane, true)
    }

    /// Exact-orientation lookup; never reverse-matches and never flips a
    /// newly stored plane.
    pub fn find_plane_exact(&self, plane: &Plane) -> Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(bucket) = inner.buckets.get(&plane_hash(plane)) {
            for &i in bucket {
                if inner.planes[i].plane.epsilon_equal(plane) {
                    return Ok(i);
                }
            }
        }
        Self::insert(&mut inner, plane, false).map(|(i, _)| i)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().planes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, planenum: usize) -> Plane {
        self.inner.lock().unwrap().planes[planenum].plane
    }

    pub fn plane_type(&self, planenum: usize) -> PlaneType {
        self.inner.lock().unwrap().planes[planenum].plane_type
    }

    /// The plane as seen by a face stored on the given side.
    pub fn face_plane(&self, planenum: usize, side: PlaneSide) -> Plane {
        let plane = self.get(planenum);
        match side {
            PlaneSide::Front => plane,
            PlaneSide::Back => -plane,
        }
    }

    /// Lazy output numbering: assign via `alloc` on first use.
    pub fn assign_output(
        &self,
        planenum: usize,
        alloc: impl FnOnce(&Plane, PlaneType) -> usize,
    ) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let entry = &inner.planes[planenum];
        if let Some(n) = entry.output_num {
            return n;
        }
        let n = alloc(&entry.plane, entry.plane_type);
        inner.planes[planenum].output_num = Some(n);
        n
    }
}
