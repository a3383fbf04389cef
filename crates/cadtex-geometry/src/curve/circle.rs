//! Circle curve.

use cadtex_math::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::{Curve, CurvePoint};

/// A circle in the local XY plane centered on the origin, `t` in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub radius: f64,
}

impl Circle {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }
}

impl Curve for Circle {
    fn evaluate(&self, t: f64) -> CurvePoint {
        let (s, c) = t.sin_cos();
        CurvePoint::new(
            Point3::new(self.radius * c, self.radius * s, 0.0),
            Vector3::new(-self.radius * s, self.radius * c, 0.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_circle_points_on_circle() {
        let circle = Circle::new(2.0);
        for i in 0..8 {
            let t = i as f64 * PI / 4.0;
            let pt = circle.evaluate(t);
            assert!((pt.position.length() - 2.0).abs() < 1e-10);
            assert!(pt.position.dot(pt.tangent).abs() < 1e-10);
        }
    }
}
