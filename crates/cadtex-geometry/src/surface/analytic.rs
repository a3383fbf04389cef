//! Analytic surfaces in their local frame. The revolution axis is always +Z
//! and `u` is the angle around it.

use cadtex_math::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::{Surface, SurfacePoint};

/// Unit direction of increasing `u` around the Z axis.
fn around_z(u: f64) -> Vector3 {
    let (s, c) = u.sin_cos();
    Vector3::new(-s, c, 0.0)
}

/// `P(u, v) = (u, v, 0)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Plane;

impl Surface for Plane {
    fn evaluate(&self, u: f64, v: f64) -> SurfacePoint {
        SurfacePoint::new(Point3::new(u, v, 0.0), Vector3::Z, Vector3::X, Vector3::Y)
    }
}

/// `P(u, v) = (r cos u, r sin u, v)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cylinder {
    pub radius: f64,
}

impl Cylinder {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }
}

impl Surface for Cylinder {
    fn evaluate(&self, u: f64, v: f64) -> SurfacePoint {
        let (s, c) = u.sin_cos();
        let radial = Vector3::new(c, s, 0.0);
        SurfacePoint::new(
            Point3::new(self.radius * c, self.radius * s, v),
            radial * self.radius.signum(),
            around_z(u) * self.radius,
            Vector3::Z,
        )
    }
}

/// Cone of radius `radius` at `v = 0` opening by `semi_angle`:
/// `P(u, v) = (radius + v sin a)(cos u, sin u, 0) + v cos a Z`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cone {
    pub radius: f64,
    pub semi_angle: f64,
}

impl Cone {
    pub fn new(radius: f64, semi_angle: f64) -> Self {
        Self { radius, semi_angle }
    }
}

impl Surface for Cone {
    fn evaluate(&self, u: f64, v: f64) -> SurfacePoint {
        let (s, c) = u.sin_cos();
        let (sa, ca) = self.semi_angle.sin_cos();
        let rho = self.radius + v * sa;
        let position = Point3::new(rho * c, rho * s, v * ca);
        let tangent_u = around_z(u) * rho;
        let tangent_v = Vector3::new(sa * c, sa * s, ca);
        // closed form keeps the normal defined at the apex
        let sign = if rho < 0.0 { -1.0 } else { 1.0 };
        let normal = Vector3::new(ca * c, ca * s, -sa) * sign;
        SurfacePoint::new(position, normal, tangent_u, tangent_v)
    }
}

/// `u` is longitude and `v` latitude: `P = r(cos v cos u, cos v sin u, sin v)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    pub radius: f64,
}

impl Sphere {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }
}

impl Surface for Sphere {
    fn evaluate(&self, u: f64, v: f64) -> SurfacePoint {
        let (su, cu) = u.sin_cos();
        let (sv, cv) = v.sin_cos();
        let dir = Vector3::new(cv * cu, cv * su, sv);
        SurfacePoint::new(
            dir * self.radius,
            dir,
            around_z(u) * (self.radius * cv),
            Vector3::new(-sv * cu, -sv * su, cv) * self.radius,
        )
    }
}

/// Torus around Z with the tube centered at distance `major_radius`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Torus {
    pub major_radius: f64,
    pub minor_radius: f64,
}

impl Torus {
    pub fn new(major_radius: f64, minor_radius: f64) -> Self {
        Self {
            major_radius,
            minor_radius,
        }
    }
}

impl Surface for Torus {
    fn evaluate(&self, u: f64, v: f64) -> SurfacePoint {
        let (su, cu) = u.sin_cos();
        let (sv, cv) = v.sin_cos();
        let rho = self.major_radius + self.minor_radius * cv;
        let tube = Vector3::new(cv * cu, cv * su, sv);
        SurfacePoint::new(
            Point3::new(rho * cu, rho * su, self.minor_radius * sv),
            tube * self.minor_radius.signum(),
            around_z(u) * rho,
            Vector3::new(-sv * cu, -sv * su, cv) * self.minor_radius,
        )
    }
}
