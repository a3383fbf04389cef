use crate::{Point2, Point3, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Parametric domain of a surface, `[min, max]` per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Box2 {
    pub min: Point2,
    pub max: Point2,
}

impl Box2 {
    pub const UNIT: Self = Self {
        min: Point2::ZERO,
        max: Point2::ONE,
    };

    pub fn new(min: Point2, max: Point2) -> Self {
        Self { min, max }
    }

    pub fn size(&self) -> Vector2 {
        self.max - self.min
    }

    /// Map a normalized `[0,1]²` coordinate into this box.
    pub fn lerp(&self, t: Point2) -> Point2 {
        self.min + self.size() * t
    }

    /// Inverse of [`Box2::lerp`]; degenerate axes map to 0.
    pub fn normalize(&self, p: Point2) -> Point2 {
        let size = self.size();
        let nx = if size.x != 0.0 { (p.x - self.min.x) / size.x } else { 0.0 };
        let ny = if size.y != 0.0 { (p.y - self.min.y) / size.y } else { 0.0 };
        Point2::new(nx, ny)
    }

    /// Swap the U and V axes.
    pub fn transposed(&self) -> Self {
        Self {
            min: Point2::new(self.min.y, self.min.x),
            max: Point2::new(self.max.y, self.max.x),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }
}

impl Default for Box2 {
    fn default() -> Self {
        Self::UNIT
    }
}

/// Axis-aligned bounding box of a body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Box3 {
    pub min: Point3,
    pub max: Point3,
}

impl Box3 {
    pub const EMPTY: Self = Self {
        min: Point3::splat(f64::INFINITY),
        max: Point3::splat(f64::NEG_INFINITY),
    };

    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn center(&self) -> Point3 {
        (self.min + self.max) * 0.5
    }

    pub fn extents(&self) -> Vector3 {
        self.max - self.min
    }

    /// Radius of the bounding sphere around the center.
    pub fn radius(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.extents().length() * 0.5
        }
    }

    pub fn add_point(&mut self, p: Point3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

impl Default for Box3 {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::{dvec2, dvec3};

    #[test]
    fn test_box2_lerp_normalize() {
        let b = Box2::new(dvec2(-1.0, 2.0), dvec2(3.0, 4.0));
        let p = b.lerp(dvec2(0.5, 0.25));
        assert_relative_eq!(p.x, 1.0);
        assert_relative_eq!(p.y, 2.5);
        let n = b.normalize(p);
        assert_relative_eq!(n.x, 0.5);
        assert_relative_eq!(n.y, 0.25);
    }

    #[test]
    fn test_box2_degenerate_normalize() {
        let b = Box2::new(dvec2(1.0, 1.0), dvec2(1.0, 2.0));
        assert_eq!(b.normalize(dvec2(1.0, 1.5)).x, 0.0);
    }

    #[test]
    fn test_box3_union_radius() {
        let mut b = Box3::EMPTY;
        assert!(b.is_empty());
        assert_eq!(b.radius(), 0.0);
        b.add_point(dvec3(-1.0, -1.0, -1.0));
        b.add_point(dvec3(1.0, 1.0, 1.0));
        assert_relative_eq!(b.radius(), 3f64.sqrt());
        let u = b.union(&Box3::new(dvec3(0.0, 0.0, 0.0), dvec3(5.0, 1.0, 1.0)));
        assert_eq!(u.max.x, 5.0);
        assert_eq!(u.center(), dvec3(2.0, 0.0, 0.0));
    }
}
