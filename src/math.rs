use cgmath::{InnerSpace, Vector3};
use std::ops::Neg;

pub type Vec3 = Vector3<f64>;

// Numerical tolerances. Level coordinates are near-integer, so these are
// tuned for that regime rather than for general CAD input.

/// Thickness of a plane for on/front/back classification.
pub const ON_EPSILON: f64 = 1e-4;
/// Two points or normals are equal within this distance per component.
pub const EQUAL_EPSILON: f64 = 1e-4;
/// A coordinate this close to an integer is snapped to it.
pub const ZERO_EPSILON: f64 = 1e-4;
/// Allowed deviation of a unit normal's length from 1.
pub const NORMAL_EPSILON: f64 = 1e-4;
/// Two directions are parallel if the cross product is shorter than this.
pub const ANGLE_EPSILON: f64 = 1e-5;

/// Padding added around an entity's bounds before partitioning, removed
/// again from the exported model bounds.
pub const SIDESPACE: f64 = 24.0;

#[inline]
pub fn qrint(v: f64) -> f64 {
    v.round()
}

/// Snap a coordinate to the nearest integer when it is within
/// [`ZERO_EPSILON`] of it.
#[inline]
pub fn snap_coord(v: f64) -> f64 {
    let r = qrint(v);
    if (v - r).abs() < ZERO_EPSILON {
        r
    } else {
        v
    }
}

pub fn snap_point(p: Vec3) -> Vec3 {
    Vec3::new(snap_coord(p.x), snap_coord(p.y), snap_coord(p.z))
}

pub fn points_are_equal(a: Vec3, b: Vec3) -> bool {
    (a.x - b.x).abs() < EQUAL_EPSILON
        && (a.y - b.y).abs() < EQUAL_EPSILON
        && (a.z - b.z).abs() < EQUAL_EPSILON
}

/// Which side of a stored plane a face or query ended up on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaneSide {
    Front,
    Back,
}

impl PlaneSide {
    #[inline]
    pub fn index(self) -> usize {
        match self {
            PlaneSide::Front => 0,
            PlaneSide::Back => 1,
        }
    }

    #[inline]
    pub fn flipped(self) -> PlaneSide {
        match self {
            PlaneSide::Front => PlaneSide::Back,
            PlaneSide::Back => PlaneSide::Front,
        }
    }
}

/// Axis classification of a canonical plane. The axial variants mean the
/// normal is exactly that axis; the `Any*` variants record the dominant
/// axis of a tilted plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaneType {
    X,
    Y,
    Z,
    AnyX,
    AnyY,
    AnyZ,
}

impl PlaneType {
    #[inline]
    pub fn is_axial(self) -> bool {
        matches!(self, PlaneType::X | PlaneType::Y | PlaneType::Z)
    }

    /// The (dominant) axis index.
    #[inline]
    pub fn axis(self) -> usize {
        match self {
            PlaneType::X | PlaneType::AnyX => 0,
            PlaneType::Y | PlaneType::AnyY => 1,
            PlaneType::Z | PlaneType::AnyZ => 2,
        }
    }

    /// The on-disk plane type tag, 0..=5.
    #[inline]
    pub fn as_u8(self) -> u8 {
        match self {
            PlaneType::X => 0,
            PlaneType::Y => 1,
            PlaneType::Z => 2,
            PlaneType::AnyX => 3,
            PlaneType::AnyY => 4,
            PlaneType::AnyZ => 5,
        }
    }
}

/// An oriented half-space: points with `normal · p > dist` are in front.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub dist: f64,
}

impl Plane {
    pub fn new(normal: Vec3, dist: f64) -> Plane {
        Plane { normal, dist }
    }

    /// Plane through three points wound clockwise when seen from the front.
    /// Returns `None` for colinear points.
    pub fn from_points(p0: Vec3, p1: Vec3, p2: Vec3) -> Option<Plane> {
        let normal = (p0 - p1).cross(p2 - p1);
        if normal.magnitude2() < ANGLE_EPSILON {
            return None;
        }
        let normal = normal.normalize();
        Some(Plane {
            normal,
            dist: p1.dot(normal),
        })
    }

    #[inline]
    pub fn distance_to(&self, p: Vec3) -> f64 {
        self.normal.dot(p) - self.dist
    }

    pub fn epsilon_equal(&self, other: &Plane) -> bool {
        (self.dist - other.dist).abs() < EQUAL_EPSILON
            && points_are_equal(self.normal, other.normal)
    }
}

impl Neg for Plane {
    type Output = Plane;

    fn neg(self) -> Plane {
        Plane {
            normal: -self.normal,
            dist: -self.dist,
        }
    }
}
