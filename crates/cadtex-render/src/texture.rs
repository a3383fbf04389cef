//! Library and layout textures, plus texture readback.

use cadtex_codec::texel::{side_for_len, square_side};
use cadtex_layout::AtlasLayout;

use crate::context::GpuContext;
use crate::error::{RenderError, Result};

/// Texel formats of the uploaded buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibraryFormat {
    /// Curve and surface payloads.
    Rgba16,
    /// Body descriptors.
    Rgba32,
    /// Layout records.
    Float32x4,
}

impl LibraryFormat {
    pub fn bytes_per_texel(self) -> usize {
        match self {
            Self::Rgba16 => 8,
            Self::Rgba32 | Self::Float32x4 => 16,
        }
    }

    pub fn texture_format(self) -> wgpu::TextureFormat {
        match self {
            Self::Rgba16 => wgpu::TextureFormat::Rgba16Uint,
            Self::Rgba32 => wgpu::TextureFormat::Rgba32Uint,
            Self::Float32x4 => wgpu::TextureFormat::Rgba32Float,
        }
    }
}

/// A square read-only texture holding raw library bytes.
pub struct LibraryTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub side: u32,
    pub format: LibraryFormat,
}

impl LibraryTexture {
    /// Upload `bytes`, which must cover a whole square of texels.
    ///
    /// An empty buffer still creates a 1x1 texture so bind groups stay valid.
    pub fn upload(ctx: &GpuContext, label: &str, bytes: &[u8], format: LibraryFormat) -> Result<Self> {
        let bpp = format.bytes_per_texel();
        let side = square_side(bytes.len(), bpp)?;
        if side == 0 {
            return Self::upload_square(ctx, label, &vec![0u8; bpp], 1, format);
        }
        Self::upload_square(ctx, label, bytes, side as u32, format)
    }

    fn upload_square(ctx: &GpuContext, label: &str, bytes: &[u8], side: u32, format: LibraryFormat) -> Result<Self> {
        if side > ctx.max_texture_side() {
            return Err(RenderError::InvalidTexture(format!(
                "{label}: side {side} exceeds device limit {}",
                ctx.max_texture_side()
            )));
        }
        let bpp = format.bytes_per_texel() as u32;
        let size = wgpu::Extent3d {
            width: side,
            height: side,
            depth_or_array_layers: 1,
        };
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: format.texture_format(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        ctx.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytes,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(side * bpp),
                rows_per_image: Some(side),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        log::debug!("uploaded {label}: {side}x{side} {:?}", format);
        Ok(Self {
            texture,
            view,
            side,
            format,
        })
    }
}

/// Records of a layout padded out to a square `Float32x4` texture.
pub fn padded_layout_bytes(layout: &AtlasLayout) -> (u32, Vec<u8>) {
    let bpp = LibraryFormat::Float32x4.bytes_per_texel();
    let side = side_for_len(layout.as_bytes().len(), bpp).max(1);
    let mut bytes = layout.as_bytes().to_vec();
    bytes.resize(side * side * bpp, 0);
    (side as u32, bytes)
}

/// Upload one layout's `[x, y, w, h]` records for the shading stage.
pub fn upload_layout_texture(ctx: &GpuContext, label: &str, layout: &AtlasLayout) -> Result<LibraryTexture> {
    let (side, bytes) = padded_layout_bytes(layout);
    LibraryTexture::upload_square(ctx, label, &bytes, side, LibraryFormat::Float32x4)
}

/// Row pitch of a texture-to-buffer copy.
pub fn padded_bytes_per_row(width: u32, bytes_per_texel: u32) -> u32 {
    let unpadded = width * bytes_per_texel;
    unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT
}

/// Copy a whole texture back to the CPU, tightly packed by rows.
pub fn read_texture(ctx: &GpuContext, texture: &wgpu::Texture, bytes_per_texel: u32) -> Result<Vec<u8>> {
    let (width, height) = (texture.width(), texture.height());
    let padded = padded_bytes_per_row(width, bytes_per_texel);
    let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("cadtex readback"),
        size: padded as u64 * height as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("cadtex readback") });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &buffer,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(height),
            },
        },
        texture.size(),
    );
    ctx.queue.submit(Some(encoder.finish()));

    let slice = buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    ctx.device.poll(wgpu::Maintain::Wait);
    rx.recv()
        .map_err(|_| RenderError::BufferMapping)?
        .map_err(|_| RenderError::BufferMapping)?;

    let row = (width * bytes_per_texel) as usize;
    let data = slice.get_mapped_range();
    let mut out = Vec::with_capacity(row * height as usize);
    for chunk in data.chunks(padded as usize) {
        out.extend_from_slice(&chunk[..row]);
    }
    drop(data);
    buffer.unmap();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_bytes_are_square() {
        let layout = AtlasLayout {
            width: 8,
            height: 4,
            records: vec![[0.0, 0.0, 2.0, 2.0]; 5],
        };
        let (side, bytes) = padded_layout_bytes(&layout);
        assert_eq!(side, 3);
        assert_eq!(bytes.len(), 3 * 3 * 16);
        let floats: &[f32] = bytemuck::cast_slice(&bytes);
        assert_eq!(&floats[16..20], &[0.0, 0.0, 2.0, 2.0]);
        assert!(floats[20..].iter().all(|&f| f == 0.0));
    }

    #[test]
    fn test_empty_layout_gets_one_texel() {
        let (side, bytes) = padded_layout_bytes(&AtlasLayout::default());
        assert_eq!(side, 1);
        assert_eq!(bytes, vec![0u8; 16]);
    }

    #[test]
    fn test_row_pitch_alignment() {
        assert_eq!(padded_bytes_per_row(1, 16), 256);
        assert_eq!(padded_bytes_per_row(16, 16), 256);
        assert_eq!(padded_bytes_per_row(17, 16), 512);
        assert_eq!(LibraryFormat::Rgba16.bytes_per_texel(), 8);
        assert_eq!(LibraryFormat::Rgba32.texture_format(), wgpu::TextureFormat::Rgba32Uint);
    }
}
