//! GPU instance records produced by the layout.
//!
//! All records are plain `f32` structs so they can be handed to the render
//! side as byte slices.

use bytemuck::{Pod, Zeroable};
use cadtex_codec::{TexelAddr, TrimCurveRef};
use serde::{Deserialize, Serialize};

/// One quad of the evaluation pass: which library record to evaluate into
/// which atlas rectangle.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct GeomEvalInstance {
    /// `[x, y, w, h]` in atlas texels.
    pub atlas_rect: [f32; 4],
    /// Payload texel address in the library texture.
    pub lib_addr: [f32; 2],
    /// Swept surfaces: base curve payload. Offset surfaces: basis surface payload.
    pub aux_addr: [f32; 2],
    /// Offset surfaces over a swept basis: the basis' curve payload.
    pub aux2_addr: [f32; 2],
    /// Surface or curve flags after any transposition.
    pub flags: f32,
    pub id: f32,
}

impl GeomEvalInstance {
    pub fn new(atlas_rect: [f32; 4], lib_addr: TexelAddr, flags: u32, id: u32) -> Self {
        Self {
            atlas_rect,
            lib_addr: lib_addr.to_array(),
            aux_addr: [0.0; 2],
            aux2_addr: [0.0; 2],
            flags: flags as f32,
            id: id as f32,
        }
    }
}

/// One trim curve rasterized into a trim-set rectangle.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct TrimCurveInstance {
    /// `[x, y, w, h]` of the trim set in the trim atlas.
    pub trim_rect: [f32; 4],
    /// Extent of the trim set's 2D space, mapped onto `trim_rect`.
    pub trim_size: [f32; 2],
    /// Top-left texel of the curve's samples in the curve atlas.
    pub curve_atlas: [f32; 2],
    pub xfo_tr: [f32; 2],
    /// Row-major 2x2.
    pub xfo_rot: [f32; 4],
    /// Number of segments; the curve has `detail + 1` samples.
    pub detail: f32,
    /// Curve reference flags.
    pub flags: f32,
}

impl TrimCurveInstance {
    pub fn new(trim_rect: [f32; 4], trim_size: [f32; 2], curve_rect: [f32; 4], curve_ref: &TrimCurveRef) -> Self {
        let rows = curve_ref.xfo.rows();
        Self {
            trim_rect,
            trim_size,
            curve_atlas: [curve_rect[0], curve_rect[1]],
            xfo_tr: [curve_ref.xfo.tr.x as f32, curve_ref.xfo.tr.y as f32],
            xfo_rot: rows.map(|m| m as f32),
            detail: curve_rect[2] - 1.0,
            flags: curve_ref.flags.bits() as f32,
        }
    }
}

/// One laid-out trim set, for the pass that resolves winding counts into a mask.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct TrimRectInstance {
    pub trim_rect: [f32; 4],
    /// 1 when no boundary curve was rasterized; the whole rect is then visible.
    pub fill: f32,
    pub id: f32,
    pub _pad: [f32; 2],
}

impl TrimRectInstance {
    pub fn new(trim_rect: [f32; 4], id: u32, has_curves: bool) -> Self {
        Self {
            trim_rect,
            fill: if has_curves { 0.0 } else { 1.0 },
            id: id as f32,
            _pad: [0.0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_sizes() {
        assert_eq!(std::mem::size_of::<GeomEvalInstance>(), 12 * 4);
        assert_eq!(std::mem::size_of::<TrimCurveInstance>(), 16 * 4);
        assert_eq!(std::mem::size_of::<TrimRectInstance>(), 8 * 4);
    }
}
