//! Triangle-fan polygons.

use cadtex_math::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::{Surface, SurfacePoint};

/// A planar polygon drawn as a triangle fan from its first point.
///
/// Only `u` addresses the polygon: it selects the nearest of the evenly spaced
/// vertices. `v` is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fan {
    pub points: Vec<Point3>,
    normal: Vector3,
}

impl Fan {
    pub fn new(points: Vec<Point3>) -> Self {
        let normal = newell_normal(&points);
        Self { points, normal }
    }

    pub fn normal(&self) -> Vector3 {
        self.normal
    }

    /// Vertex index addressed by normalized `u`.
    pub fn index_at(&self, u: f64) -> usize {
        let last = self.points.len().saturating_sub(1);
        ((u * last as f64).round().max(0.0) as usize).min(last)
    }
}

/// Polygon normal by Newell's method; +Z for degenerate polygons.
fn newell_normal(points: &[Point3]) -> Vector3 {
    let mut normal = Vector3::ZERO;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        normal.x += (p.y - q.y) * (p.z + q.z);
        normal.y += (p.z - q.z) * (p.x + q.x);
        normal.z += (p.x - q.x) * (p.y + q.y);
    }
    if normal.length() > 1e-12 {
        normal.normalize()
    } else {
        Vector3::Z
    }
}

impl Surface for Fan {
    fn evaluate(&self, u: f64, _v: f64) -> SurfacePoint {
        let Some(&position) = self.points.get(self.index_at(u)) else {
            return SurfacePoint::invalid(Point3::ZERO);
        };
        SurfacePoint::new(position, self.normal, Vector3::ZERO, Vector3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Fan {
        Fan::new(vec![
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        ])
    }

    #[test]
    fn test_fan_normal_ccw() {
        assert!((square().normal() - Vector3::Z).length() < 1e-12);
    }

    #[test]
    fn test_fan_index() {
        let fan = square();
        assert_eq!(fan.index_at(0.0), 0);
        assert_eq!(fan.index_at(0.34), 1);
        assert_eq!(fan.index_at(1.0), 3);
        assert_eq!(fan.point_at(2.0 / 3.0, 0.9), Point3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_empty_fan_is_invalid() {
        let fan = Fan::new(Vec::new());
        assert!(!fan.evaluate(0.5, 0.5).valid);
    }
}
