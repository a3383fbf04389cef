//! Offset surfaces.

use serde::{Deserialize, Serialize};

use super::{Surface, SurfaceGeometry, SurfacePoint};

/// The basis surface pushed along its normal by `offset`.
///
/// Tangents are taken from the basis surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffsetSurface {
    pub offset: f64,
    pub basis: Box<SurfaceGeometry>,
}

impl OffsetSurface {
    pub fn new(offset: f64, basis: SurfaceGeometry) -> Self {
        Self {
            offset,
            basis: Box::new(basis),
        }
    }
}

impl Surface for OffsetSurface {
    fn evaluate(&self, u: f64, v: f64) -> SurfacePoint {
        let mut pt = self.basis.evaluate(u, v);
        if pt.valid {
            pt.position += pt.normal * self.offset;
        }
        pt
    }
}
