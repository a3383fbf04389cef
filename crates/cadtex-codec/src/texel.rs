//! Library texture addressing.

use cadtex_core::{CadtexError, Result};
use serde::{Deserialize, Serialize};

/// Bytes per texel of curve and surface library textures (RGBA16).
pub const RGBA16_BYTES: usize = 8;
/// Bytes per texel of body library textures (RGBA32).
pub const RGBA32_BYTES: usize = 16;
/// Curve and surface TOC buffers start with 8 RGBA16 texels of header.
pub const LIBRARY_HEADER_BYTES: usize = 8 * RGBA16_BYTES;
/// Eight half-floats per curve TOC entry.
pub const CURVE_TOC_STRIDE: usize = 16;
/// Nine half-floats per surface TOC entry.
pub const SURFACE_TOC_STRIDE: usize = 18;

/// Texel coordinates of a payload inside a square library texture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TexelAddr {
    pub x: u32,
    pub y: u32,
}

impl TexelAddr {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Byte offset of this texel: `x * bpp + y * bpp * side`.
    pub fn byte_offset(self, bytes_per_texel: usize, side: usize) -> usize {
        self.x as usize * bytes_per_texel + self.y as usize * bytes_per_texel * side
    }

    /// Address of the texel holding `byte_offset`.
    pub fn from_byte_offset(byte_offset: usize, bytes_per_texel: usize, side: usize) -> Self {
        let texel = byte_offset / bytes_per_texel;
        if side == 0 {
            return Self::default();
        }
        Self::new((texel % side) as u32, (texel / side) as u32)
    }

    pub fn to_array(self) -> [f32; 2] {
        [self.x as f32, self.y as f32]
    }
}

/// Side length of a square texture holding `len` bytes.
pub fn square_side(len: usize, bytes_per_texel: usize) -> Result<usize> {
    if len % bytes_per_texel != 0 {
        return Err(CadtexError::InvalidOperation(format!(
            "texture of {len} bytes is not a whole number of {bytes_per_texel}-byte texels"
        )));
    }
    let texels = len / bytes_per_texel;
    let side = (texels as f64).sqrt().round() as usize;
    if side * side != texels {
        return Err(CadtexError::InvalidOperation(format!(
            "texture of {texels} texels is not square"
        )));
    }
    Ok(side)
}

/// Smallest square side that fits `len` bytes.
pub fn side_for_len(len: usize, bytes_per_texel: usize) -> usize {
    let texels = len.div_ceil(bytes_per_texel);
    let mut side = (texels as f64).sqrt().ceil() as usize;
    while side * side < texels {
        side += 1;
    }
    side
}
