//! Bit flags stored alongside geometry records.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Curve table-of-contents flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct CurveFlags: u32 {
        /// The TOC `param` already holds a tessellation detail.
        const COST_IS_DETAIL = 1 << 0;
        const PERIODIC = 1 << 1;
    }
}

bitflags! {
    /// Surface table-of-contents flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SurfaceFlags: u32 {
        const PERIODIC_U = 1 << 0;
        const PERIODIC_V = 1 << 1;
        const FLIPPED_NORMAL = 1 << 2;
        /// Atlas U runs along the surface's V axis.
        const FLIPPED_UV = 1 << 3;
        const COST_IS_DETAIL_U = 1 << 4;
        const COST_IS_DETAIL_V = 1 << 5;
    }
}

bitflags! {
    /// Flags inside a NURBS payload.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct NurbsFlags: u32 {
        /// Knots are stored as a start value followed by deltas.
        const KNOTS_AS_DELTAS = 1 << 0;
        const PERIODIC = 1 << 1;
    }
}

bitflags! {
    /// Flags on a trim-set curve reference.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct CurveRefFlags: u32 {
        const REVERSED = 1 << 0;
    }
}

impl SurfaceFlags {
    /// Flags after the U and V axes of a surface are exchanged.
    pub fn transposed(self) -> Self {
        let mut out = self & (Self::FLIPPED_NORMAL);
        out.set(Self::PERIODIC_U, self.contains(Self::PERIODIC_V));
        out.set(Self::PERIODIC_V, self.contains(Self::PERIODIC_U));
        out.set(Self::COST_IS_DETAIL_U, self.contains(Self::COST_IS_DETAIL_V));
        out.set(Self::COST_IS_DETAIL_V, self.contains(Self::COST_IS_DETAIL_U));
        out.set(Self::FLIPPED_UV, !self.contains(Self::FLIPPED_UV));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transposed_swaps_axes() {
        let flags = SurfaceFlags::PERIODIC_U | SurfaceFlags::COST_IS_DETAIL_V | SurfaceFlags::FLIPPED_NORMAL;
        let t = flags.transposed();
        assert!(t.contains(SurfaceFlags::PERIODIC_V));
        assert!(!t.contains(SurfaceFlags::PERIODIC_U));
        assert!(t.contains(SurfaceFlags::COST_IS_DETAIL_U));
        assert!(t.contains(SurfaceFlags::FLIPPED_NORMAL));
        assert!(t.contains(SurfaceFlags::FLIPPED_UV));
        assert_eq!(t.transposed(), flags);
    }
}
