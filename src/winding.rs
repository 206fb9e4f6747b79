use crate::aabb::Aabb;
use crate::math::{Plane, Vec3, ON_EPSILON};
use cgmath::InnerSpace;

/// Maximum vertices a face winding may carry.
pub const MAX_EDGES: usize = 64;

/// Two colinear edges are merged when the turn is below this.
const CONTINUOUS_EPSILON: f64 = 1e-3;

/// An ordered loop of coplanar vertices forming a convex polygon, wound
/// clockwise when seen from the front side of its plane.
#[derive(Clone, Debug, PartialEq)]
pub struct Winding {
    pub points: Vec<Vec3>,
}

/// Result of splitting a winding with a plane.
#[derive(Clone, Debug, PartialEq)]
pub enum SplitResult {
    /// Entirely on the plane within the epsilon.
    Coplanar,
    Front,
    Back,
    Split(Winding, Winding),
}

impl Winding {
    pub fn new(points: Vec<Vec3>) -> Winding {
        Winding { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// A huge square centred on the plane, later whittled down by clipping.
    pub fn base_for_plane(plane: &Plane, extent: f64) -> Winding {
        // find the dominant axis
        let mut max = -1.0;
        let mut axis = usize::MAX;
        for i in 0..3 {
            let v = plane.normal[i].abs();
            if v > max {
                axis = i;
                max = v;
            }
        }

        let mut up = Vec3::new(0.0, 0.0, 0.0);
        if axis == 2 {
            up.x = 1.0;
        } else {
            up.z = 1.0;
        }

        let v = up.dot(plane.normal);
        up = (up - plane.normal * v).normalize();

        let org = plane.normal * plane.dist;
        let right = up.cross(plane.normal);

        let up = up * extent;
        let right = right * extent;

        Winding {
            points: vec![
                org - right + up,
                org + right + up,
                org + right - up,
                org - right - up,
            ],
        }
    }

    pub fn flipped(&self) -> Winding {
        let mut points = self.points.clone();
        points.reverse();
        Winding { points }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new_from_points(&self.points)
    }

    pub fn area(&self) -> f64 {
        let mut total = 0.0;
        for i in 2..self.points.len() {
            let d1 = self.points[i - 1] - self.points[0];
            let d2 = self.points[i] - self.points[0];
            total += d1.cross(d2).magnitude() * 0.5;
        }
        total
    }

    /// The plane of the winding, from the summed edge cross products so
    /// that straight-angle vertices don't break it. `None` for degenerate
    /// loops.
    pub fn plane(&self) -> Option<Plane> {
        let mut normal = Vec3::new(0.0, 0.0, 0.0);
        for i in 2..self.points.len() {
            normal += (self.points[i - 1] - self.points[0])
                .cross(self.points[i] - self.points[0]);
        }
        if normal.magnitude2() < 1e-8 {
            return None;
        }
        // summed cross products of a clockwise loop point against the
        // facing direction
        let normal = -normal.normalize();
        Some(Plane::new(normal, normal.dot(self.points[0])))
    }

    /// Classify and split against a plane. Points within `epsilon` of the
    /// plane are treated as on it and land in both halves; crossing edges
    /// get an intersection point with axial components snapped exactly.
    pub fn split(&self, plane: &Plane, epsilon: f64) -> SplitResult {
        let mut dists = Vec::with_capacity(self.points.len() + 1);
        let mut sides = Vec::with_capacity(self.points.len() + 1);
        let mut counts = [0usize; 3];

        for p in &self.points {
            let d = plane.distance_to(*p);
            let side = if d > epsilon {
                0
            } else if d < -epsilon {
                1
            } else {
                2
            };
            counts[side] += 1;
            dists.push(d);
            sides.push(side);
        }
        dists.push(dists[0]);
        sides.push(sides[0]);

        if counts[0] == 0 && counts[1] == 0 {
            return SplitResult::Coplanar;
        }
        if counts[1] == 0 {
            return SplitResult::Front;
        }
        if counts[0] == 0 {
            return SplitResult::Back;
        }

        let mut front = Vec::with_capacity(self.points.len() + 4);
        let mut back = Vec::with_capacity(self.points.len() + 4);

        for i in 0..self.points.len() {
            let p1 = self.points[i];

            match sides[i] {
                2 => {
                    front.push(p1);
                    back.push(p1);
                    continue;
                }
                0 => front.push(p1),
                _ => back.push(p1),
            }

            if sides[i + 1] == 2 || sides[i + 1] == sides[i] {
                continue;
            }

            // generate a split point
            let p2 = self.points[(i + 1) % self.points.len()];
            let dot = dists[i] / (dists[i] - dists[i + 1]);
            let mut mid = Vec3::new(0.0, 0.0, 0.0);
            for j in 0..3 {
                // avoid round-off error when possible
                if plane.normal[j] == 1.0 {
                    mid[j] = plane.dist;
                } else if plane.normal[j] == -1.0 {
                    mid[j] = -plane.dist;
                } else {
                    mid[j] = p1[j] + dot * (p2[j] - p1[j]);
                }
            }
            front.push(mid);
            back.push(mid);
        }

        // precision errors can leave sliver halves; heal them away
        let mut front = Winding::new(front);
        let mut back = Winding::new(back);
        if fix_duplicate_points(&mut front) < 3 {
            return SplitResult::Back;
        }
        if fix_duplicate_points(&mut back) < 3 {
            return SplitResult::Front;
        }

        SplitResult::Split(front, back)
    }

    /// Clip, keeping the front half. A coplanar winding is kept when
    /// `keep_on` is set.
    pub fn clip_front(self, plane: &Plane, epsilon: f64, keep_on: bool) -> Option<Winding> {
        match self.split(plane, epsilon) {
            SplitResult::Coplanar => {
                if keep_on {
                    Some(self)
                } else {
                    None
                }
            }
            SplitResult::Front => Some(self),
            SplitResult::Back => None,
            SplitResult::Split(front, _) => Some(front),
        }
    }

    /// Which side of the plane the winding lies on, `None` when it spans.
    pub fn which_side(&self, plane: &Plane, epsilon: f64) -> Option<SplitSide> {
        let mut front = false;
        let mut back = false;
        for p in &self.points {
            let d = plane.distance_to(*p);
            if d > epsilon {
                front = true;
            } else if d < -epsilon {
                back = true;
            }
            if front && back {
                return None;
            }
        }
        Some(match (front, back) {
            (true, false) => SplitSide::Front,
            (false, true) => SplitSide::Back,
            _ => SplitSide::On,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitSide {
    Front,
    Back,
    On,
}

/// Try to merge two windings that share an edge on the same plane.
/// Returns the union when the joined outline stays convex.
pub fn try_merge_windings(f1: &Winding, f2: &Winding, normal: Vec3) -> Option<Winding> {
    if f1.len() + f2.len() > MAX_EDGES {
        return None;
    }

    // find a common edge, traversed in opposite directions
    let mut found: Option<(usize, usize)> = None;
    'outer: for i in 0..f1.len() {
        let p1 = f1.points[i];
        let p2 = f1.points[(i + 1) % f1.len()];
        for j in 0..f2.len() {
            let p3 = f2.points[j];
            let p4 = f2.points[(j + 1) % f2.len()];
            if crate::math::points_are_equal(p1, p4) && crate::math::points_are_equal(p2, p3) {
                found = Some((i, j));
                break 'outer;
            }
        }
    }
    let (i, j) = found?;

    let p1 = f1.points[i];
    let p2 = f1.points[(i + 1) % f1.len()];

    // check that the outline stays convex at both joint vertices, and
    // whether either joint becomes colinear and can be dropped
    let back = f1.points[(i + f1.len() - 1) % f1.len()];
    let edge_normal = normal.cross(p1 - back).normalize();
    let delta = f2.points[(j + 2) % f2.len()] - p1;
    let dot = delta.dot(edge_normal);
    if dot > CONTINUOUS_EPSILON {
        return None; // not a convex polygon
    }
    let keep1 = dot < -CONTINUOUS_EPSILON;

    let back = f1.points[(i + 2) % f1.len()];
    let edge_normal = normal.cross(back - p2).normalize();
    let delta = f2.points[(j + f2.len() - 1) % f2.len()] - p2;
    let dot = delta.dot(edge_normal);
    if dot > CONTINUOUS_EPSILON {
        return None;
    }
    let keep2 = dot < -CONTINUOUS_EPSILON;

    // build the merged outline, skipping the joint vertices that became
    // colinear
    let mut points = Vec::with_capacity(f1.len() + f2.len());
    let mut k = (i + 1) % f1.len();
    while k != i {
        if !(k == (i + 1) % f1.len() && !keep2) {
            points.push(f1.points[k]);
        }
        k = (k + 1) % f1.len();
    }
    let mut l = (j + 1) % f2.len();
    while l != j {
        if !(l == (j + 1) % f2.len() && !keep1) {
            points.push(f2.points[l]);
        }
        l = (l + 1) % f2.len();
    }

    Some(Winding::new(points))
}

/// Drop duplicate neighbouring vertices; returns the remaining count
/// (0 when the winding collapses below a triangle).
pub fn fix_duplicate_points(w: &mut Winding) -> usize {
    let mut kept: Vec<Vec3> = Vec::with_capacity(w.len());
    for p in &w.points {
        match kept.last() {
            Some(last) if crate::math::points_are_equal(*p, *last) => {}
            _ => kept.push(*p),
        }
    }
    if kept.len() >= 2 && crate::math::points_are_equal(kept[0], *kept.last().unwrap()) {
        kept.pop();
    }
    if kept.len() < 3 {
        kept.clear();
    }
    w.points = kept;
    w.len()
}

/// Distance classification of a point against the open segment `a..b`.
/// Returns the parametric position when the point is on the segment's
/// interior within `epsilon` (and not at an endpoint).
pub fn point_on_open_segment(p: Vec3, a: Vec3, b: Vec3, epsilon: f64) -> Option<f64> {
    let dir = b - a;
    let len2 = dir.magnitude2();
    if len2 < ON_EPSILON * ON_EPSILON {
        return None;
    }
    let t = (p - a).dot(dir) / len2;
    if t <= 0.0 || t >= 1.0 {
        return None;
    }
    let closest = a + dir * t;
    if (p - closest).magnitude2() > epsilon * epsilon {
        return None;
    }
    if crate::math::points_are_equal(p, a) || crate::math::points_are_equal(p, b) {
        return None;
    }
    Some(t)
}
