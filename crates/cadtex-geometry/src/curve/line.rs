//! Line curve.

use cadtex_math::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::{Curve, CurvePoint};

/// A line along the local X axis: `P(t) = (t, 0, 0)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Line;

impl Curve for Line {
    fn evaluate(&self, t: f64) -> CurvePoint {
        CurvePoint::new(Point3::new(t, 0.0, 0.0), Vector3::X)
    }
}
