//! Ellipse curve.

use cadtex_math::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::{Curve, CurvePoint};

/// An ellipse in the local XY plane with its major axis along X.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub major_radius: f64,
    pub minor_radius: f64,
}

impl Ellipse {
    pub fn new(major_radius: f64, minor_radius: f64) -> Self {
        Self {
            major_radius,
            minor_radius,
        }
    }
}

impl Curve for Ellipse {
    fn evaluate(&self, t: f64) -> CurvePoint {
        let (s, c) = t.sin_cos();
        CurvePoint::new(
            Point3::new(self.major_radius * c, self.minor_radius * s, 0.0),
            Vector3::new(-self.major_radius * s, self.minor_radius * c, 0.0),
        )
    }
}
