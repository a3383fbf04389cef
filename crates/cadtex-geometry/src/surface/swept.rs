//! Surfaces swept from a base curve.

use cadtex_math::{Vector3, Xfo};
use serde::{Deserialize, Serialize};

use super::{Surface, SurfacePoint};
use crate::curve::{Curve, CurveGeometry};

/// The base curve swept along local Z: `P(u, v) = xfo(c(u) + v Z)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearExtrusion {
    pub curve: CurveGeometry,
    pub xfo: Xfo,
}

impl LinearExtrusion {
    pub fn new(curve: CurveGeometry, xfo: Xfo) -> Self {
        Self { curve, xfo }
    }
}

impl Surface for LinearExtrusion {
    fn evaluate(&self, u: f64, v: f64) -> SurfacePoint {
        let c = self.curve.evaluate(u);
        let position = self.xfo.transform_point(c.position + Vector3::Z * v);
        let tangent_u = self.xfo.transform_vector(c.tangent);
        let tangent_v = self.xfo.transform_vector(Vector3::Z);
        if !c.valid {
            return SurfacePoint::invalid(position);
        }
        SurfacePoint::from_tangents(position, tangent_u, tangent_v)
    }
}

/// The placed base curve revolved around Z: `q = xfo(c(v))`, `P(u, v) = Rz(u) q`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revolution {
    pub curve: CurveGeometry,
    pub xfo: Xfo,
}

impl Revolution {
    pub fn new(curve: CurveGeometry, xfo: Xfo) -> Self {
        Self { curve, xfo }
    }
}

/// Distance from the axis below which a profile point is treated as on it.
const ON_AXIS: f64 = 1e-12;

impl Surface for Revolution {
    fn evaluate(&self, u: f64, v: f64) -> SurfacePoint {
        let c = self.curve.evaluate(v);
        let q = self.xfo.transform_point(c.position);
        let dq = self.xfo.transform_vector(c.tangent);

        let (s, co) = u.sin_cos();
        let rotate = |p: Vector3| Vector3::new(co * p.x - s * p.y, s * p.x + co * p.y, p.z);

        let position = rotate(q);
        let tangent_u = rotate(Vector3::new(-q.y, q.x, 0.0));
        let tangent_v = rotate(dq);
        if !c.valid {
            return SurfacePoint::invalid(position);
        }

        if q.truncate().length() < ON_AXIS {
            // the circle of latitude collapses; use the direction of increasing u
            let around = Vector3::new(-s, co, 0.0);
            let cross = around.cross(tangent_v);
            if cross.length() > ON_AXIS {
                return SurfacePoint::new(position, cross.normalize(), tangent_u, tangent_v);
            }
        }
        SurfacePoint::from_tangents(position, tangent_u, tangent_v)
    }
}
