//! Render-target atlases that grow with the layout.

use crate::context::GpuContext;
use crate::error::{RenderError, Result};

/// Extent after growing `current` to hold `requested`; `None` when nothing changes.
///
/// Atlases never shrink, so a smaller request on one axis keeps the current side.
pub fn grown_extent(current: (u32, u32), requested: (u32, u32)) -> Option<(u32, u32)> {
    let grown = (current.0.max(requested.0).max(1), current.1.max(requested.1).max(1));
    (grown != current).then_some(grown)
}

/// What happens to the old texels when an atlas grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contents {
    /// Copy the old texture into the new one.
    Preserve,
    /// Leave the new texture cleared; the caller re-renders it.
    Discard,
}

/// One atlas texture the evaluation or trim passes render into.
pub struct AtlasTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    label: String,
}

impl AtlasTexture {
    pub fn new(ctx: &GpuContext, label: &str, format: wgpu::TextureFormat, width: u32, height: u32) -> Result<Self> {
        let (texture, view) = create(ctx, label, format, width.max(1), height.max(1))?;
        Ok(Self {
            texture,
            view,
            format,
            label: label.to_owned(),
        })
    }

    pub fn width(&self) -> u32 {
        self.texture.width()
    }

    pub fn height(&self) -> u32 {
        self.texture.height()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Make room for a `width x height` layout. With [`Contents::Preserve`] the
    /// old texels are copied forward.
    ///
    /// Returns whether the texture was re-allocated.
    pub fn ensure_size(&mut self, ctx: &GpuContext, width: u32, height: u32, contents: Contents) -> Result<bool> {
        let Some((new_w, new_h)) = grown_extent(self.size(), (width, height)) else {
            return Ok(false);
        };
        let limit = ctx.config.max_atlas_size.min(ctx.max_texture_side());
        if new_w > limit || new_h > limit {
            return Err(RenderError::InvalidTexture(format!(
                "{}: {new_w}x{new_h} exceeds the atlas limit {limit}",
                self.label
            )));
        }

        let (texture, view) = create(ctx, &self.label, self.format, new_w, new_h)?;
        if contents == Contents::Preserve {
            self.copy_into(ctx, &texture);
        }

        log::debug!(
            "grew {} from {}x{} to {new_w}x{new_h} ({contents:?})",
            self.label,
            self.width(),
            self.height()
        );
        self.texture = texture;
        self.view = view;
        Ok(true)
    }

    fn copy_into(&self, ctx: &GpuContext, texture: &wgpu::Texture) {
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("atlas copy-forward") });
        encoder.copy_texture_to_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyTexture {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            self.texture.size(),
        );
        ctx.queue.submit(Some(encoder.finish()));
    }
}

fn create(
    ctx: &GpuContext,
    label: &str,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
) -> Result<(wgpu::Texture, wgpu::TextureView)> {
    let limit = ctx.max_texture_side();
    if width > limit || height > limit {
        return Err(RenderError::InvalidTexture(format!(
            "{label}: {width}x{height} exceeds device limit {limit}"
        )));
    }
    let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    Ok((texture, view))
}

/// Every atlas the passes write.
pub struct AtlasSet {
    pub curve_positions: AtlasTexture,
    pub curve_tangents: AtlasTexture,
    pub surface_positions: AtlasTexture,
    pub surface_normals: AtlasTexture,
    /// Winding counts accumulated by the trim fan pass.
    pub trim_counts: AtlasTexture,
    /// Final trim mask sampled by the shading stage.
    pub trim_mask: AtlasTexture,
}

pub const GEOMETRY_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
pub const TRIM_COUNT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R16Float;
pub const TRIM_MASK_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;

impl AtlasSet {
    pub fn new(ctx: &GpuContext) -> Result<Self> {
        let side = ctx.config.initial_atlas_size;
        Ok(Self {
            curve_positions: AtlasTexture::new(ctx, "curve positions", GEOMETRY_FORMAT, side, 1)?,
            curve_tangents: AtlasTexture::new(ctx, "curve tangents", GEOMETRY_FORMAT, side, 1)?,
            surface_positions: AtlasTexture::new(ctx, "surface positions", GEOMETRY_FORMAT, side, side)?,
            surface_normals: AtlasTexture::new(ctx, "surface normals", GEOMETRY_FORMAT, side, side)?,
            trim_counts: AtlasTexture::new(ctx, "trim counts", TRIM_COUNT_FORMAT, side, side)?,
            trim_mask: AtlasTexture::new(ctx, "trim mask", TRIM_MASK_FORMAT, side, side)?,
        })
    }

    /// Grow every atlas to its layout's extent; returns whether any was re-allocated.
    pub fn ensure_sizes(&mut self, ctx: &GpuContext, sizes: &AtlasSizes, contents: Contents) -> Result<bool> {
        let mut grown = false;
        let (curves, surfaces, trims) = (sizes.curves, sizes.surfaces, sizes.trims);
        grown |= self.curve_positions.ensure_size(ctx, curves.0, curves.1, contents)?;
        grown |= self.curve_tangents.ensure_size(ctx, curves.0, curves.1, contents)?;
        grown |= self.surface_positions.ensure_size(ctx, surfaces.0, surfaces.1, contents)?;
        grown |= self.surface_normals.ensure_size(ctx, surfaces.0, surfaces.1, contents)?;
        grown |= self.trim_counts.ensure_size(ctx, trims.0, trims.1, contents)?;
        grown |= self.trim_mask.ensure_size(ctx, trims.0, trims.1, contents)?;
        Ok(grown)
    }

    pub fn sizes(&self) -> AtlasSizes {
        AtlasSizes {
            curves: self.curve_positions.size(),
            surfaces: self.surface_positions.size(),
            trims: self.trim_mask.size(),
        }
    }
}

/// Texture extents of the three atlas families.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AtlasSizes {
    pub curves: (u32, u32),
    pub surfaces: (u32, u32),
    pub trims: (u32, u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grown_extent() {
        assert_eq!(grown_extent((256, 256), (100, 40)), None);
        assert_eq!(grown_extent((256, 256), (300, 40)), Some((300, 256)));
        assert_eq!(grown_extent((256, 1), (16, 3)), Some((256, 3)));
        // zero-sized layouts still leave a texel
        assert_eq!(grown_extent((1, 1), (0, 0)), None);
    }
}
