use crate::{DMat2, Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Places a trim curve into its trim set's space: `p' = tr + mat * p`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Xfo2 {
    pub tr: Vector2,
    pub mat: DMat2,
}

impl Xfo2 {
    pub const IDENTITY: Self = Self {
        tr: Vector2::ZERO,
        mat: DMat2::IDENTITY,
    };

    /// `m` is row-major `[m00, m01, m10, m11]` as stored on disk.
    pub fn new(tr: Vector2, m: [f64; 4]) -> Self {
        Self {
            tr,
            mat: DMat2::from_cols(Vector2::new(m[0], m[2]), Vector2::new(m[1], m[3])),
        }
    }

    pub fn rows(&self) -> [f64; 4] {
        [self.mat.x_axis.x, self.mat.y_axis.x, self.mat.x_axis.y, self.mat.y_axis.y]
    }

    pub fn transform_point(&self, p: Point2) -> Point2 {
        self.tr + self.mat * p
    }

    /// Whether the transform reflects, flipping handedness.
    pub fn is_mirroring(&self) -> bool {
        self.mat.determinant() < 0.0
    }
}

impl Default for Xfo2 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::dvec2;

    #[test]
    fn test_row_major_layout() {
        // rotate 90 degrees: [0 -1; 1 0]
        let xfo = Xfo2::new(dvec2(1.0, 0.0), [0.0, -1.0, 1.0, 0.0]);
        let p = xfo.transform_point(dvec2(1.0, 0.0));
        assert!((p - dvec2(1.0, 1.0)).length() < 1e-12);
        assert_eq!(xfo.rows(), [0.0, -1.0, 1.0, 0.0]);
        assert!(!xfo.is_mirroring());
    }

    #[test]
    fn test_mirror() {
        let xfo = Xfo2::new(Vector2::ZERO, [1.0, 0.0, 0.0, -1.0]);
        assert!(xfo.is_mirroring());
    }
}
