use crate::math::Vec3;
use std::ops::{Index, IndexMut};

/// A rectangular minimum bounding volume.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
    pub is_valid: bool,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new()
    }
}

impl Aabb {
    pub fn new() -> Aabb {
        Aabb {
            min: Vec3::new(0.0, 0.0, 0.0),
            max: Vec3::new(0.0, 0.0, 0.0),
            is_valid: false,
        }
    }

    pub fn new_from_min_max(min: Vec3, max: Vec3) -> Aabb {
        Aabb {
            min,
            max,
            is_valid: true,
        }
    }

    pub fn new_from_points(points: &[Vec3]) -> Aabb {
        let mut bounds = Aabb::new();
        bounds.add_points(points);
        bounds
    }

    /// Midpoint between the min and max points.
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn add_point(&mut self, point: Vec3) {
        if self.is_valid {
            self.min.x = self.min.x.min(point.x);
            self.min.y = self.min.y.min(point.y);
            self.min.z = self.min.z.min(point.z);
            self.max.x = self.max.x.max(point.x);
            self.max.y = self.max.y.max(point.y);
            self.max.z = self.max.z.max(point.z);
        } else {
            self.min = point;
            self.max = point;
            self.is_valid = true;
        }
    }

    pub fn add_points(&mut self, points: &[Vec3]) {
        for point in points {
            self.add_point(*point);
        }
    }

    pub fn add_box(&mut self, other: &Aabb) {
        if self.is_valid && other.is_valid {
            self.add_point(other.min);
            self.add_point(other.max);
        } else if other.is_valid {
            *self = *other;
        }
    }

    pub fn expand_by(&self, w: f64) -> Aabb {
        Aabb::new_from_min_max(
            self.min - Vec3::new(w, w, w),
            self.max + Vec3::new(w, w, w),
        )
    }

    pub fn intersect(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Index of the longest axis.
    pub fn longest_axis(&self) -> usize {
        let size = self.max - self.min;
        if size.x >= size.y && size.x >= size.z {
            0
        } else if size.y >= size.z {
            1
        } else {
            2
        }
    }
}

impl Index<usize> for Aabb {
    type Output = Vec3;

    fn index(&self, index: usize) -> &Vec3 {
        match index {
            0 => &self.min,
            1 => &self.max,
            _ => panic!("Index out of bounds"),
        }
    }
}

impl IndexMut<usize> for Aabb {
    fn index_mut(&mut self, index: usize) -> &mut Vec3 {
        match index {
            0 => &mut self.min,
            1 => &mut self.max,
            _ => panic!("Index out of bounds"),
        }
    }
}
