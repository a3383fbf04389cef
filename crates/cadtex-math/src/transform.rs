use crate::{DQuat, Point3, Vector3};
use glam::DMat4;
use serde::{Deserialize, Serialize};

/// Rigid transform with a per-axis scale: `p' = tr + ori * (sc * p)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Xfo {
    pub tr: Vector3,
    pub ori: DQuat,
    pub sc: Vector3,
}

impl Xfo {
    pub const IDENTITY: Self = Self {
        tr: Vector3::ZERO,
        ori: DQuat::IDENTITY,
        sc: Vector3::ONE,
    };

    pub fn new(tr: Vector3, ori: DQuat, sc: Vector3) -> Self {
        Self { tr, ori, sc }
    }

    pub fn from_translation(tr: Vector3) -> Self {
        Self {
            tr,
            ..Self::IDENTITY
        }
    }

    /// Build from the 10-float on-disk layout `tr(3) ori(4, xyzw) sc(3)`.
    ///
    /// A zero quaternion is treated as identity.
    pub fn from_array(v: &[f64; 10]) -> Self {
        let q = DQuat::from_xyzw(v[3], v[4], v[5], v[6]);
        let ori = if q.length_squared() > 0.0 {
            q.normalize()
        } else {
            DQuat::IDENTITY
        };
        Self {
            tr: Vector3::new(v[0], v[1], v[2]),
            ori,
            sc: Vector3::new(v[7], v[8], v[9]),
        }
    }

    pub fn to_array(&self) -> [f64; 10] {
        [
            self.tr.x, self.tr.y, self.tr.z, self.ori.x, self.ori.y, self.ori.z, self.ori.w,
            self.sc.x, self.sc.y, self.sc.z,
        ]
    }

    pub fn transform_point(&self, p: Point3) -> Point3 {
        self.tr + self.ori * (self.sc * p)
    }

    pub fn transform_vector(&self, v: Vector3) -> Vector3 {
        self.ori * (self.sc * v)
    }

    /// Transform a normal, which follows the inverse-transpose of the scale.
    pub fn transform_normal(&self, n: Vector3) -> Vector3 {
        let inv_sc = Vector3::new(
            if self.sc.x != 0.0 { 1.0 / self.sc.x } else { 0.0 },
            if self.sc.y != 0.0 { 1.0 / self.sc.y } else { 0.0 },
            if self.sc.z != 0.0 { 1.0 / self.sc.z } else { 0.0 },
        );
        (self.ori * (inv_sc * n)).normalize_or_zero()
    }

    pub fn to_mat4(&self) -> DMat4 {
        DMat4::from_scale_rotation_translation(self.sc, self.ori, self.tr)
    }
}

impl Default for Xfo {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::dvec3;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_scale_then_rotate_then_translate() {
        let xfo = Xfo::new(
            dvec3(10.0, 0.0, 0.0),
            DQuat::from_rotation_z(FRAC_PI_2),
            dvec3(2.0, 2.0, 2.0),
        );
        let p = xfo.transform_point(dvec3(1.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 10.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 2.0, epsilon = 1e-12);
        let m = xfo.to_mat4().transform_point3(dvec3(1.0, 0.0, 0.0));
        assert!((m - p).length() < 1e-12);
    }

    #[test]
    fn test_array_roundtrip_and_zero_quat() {
        let xfo = Xfo::from_array(&[1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        assert_eq!(xfo.ori, DQuat::IDENTITY);
        assert_eq!(Xfo::from_array(&xfo.to_array()), xfo);
    }

    #[test]
    fn test_normal_non_uniform_scale() {
        let xfo = Xfo::new(Vector3::ZERO, DQuat::IDENTITY, dvec3(1.0, 4.0, 1.0));
        let n = xfo.transform_normal(dvec3(1.0, 1.0, 0.0).normalize());
        // the normal tilts away from the stretched axis
        assert!(n.x > n.y);
        assert_relative_eq!(n.length(), 1.0, epsilon = 1e-12);
    }
}
