//! Tessellation and render configuration.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{CadtexError, Result};

/// Controls how densely geometry is tessellated into the atlases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Angular level of detail; each step doubles the segments per full circle.
    pub lod: i32,
    /// Surfaces whose `sizeU * sizeV` falls below this are never laid out.
    pub surface_area_threshold: f64,
    /// Trim-set atlas texels per unit of trim-set size.
    pub trim_texel_scale: f64,
    /// Detail used when an arc radius is smaller than the error tolerance.
    pub fallback_detail: u32,
    /// Upper bound for any per-axis detail.
    pub max_detail: u32,
}

impl LayoutConfig {
    pub const DEFAULT_LOD: i32 = 2;
    pub const MAX_DETAIL: u32 = 1024;
    /// Segments per full circle at `lod == 0`.
    pub const BASE_CIRCLE_SEGMENTS: f64 = 8.0;

    /// Number of segments a full circle receives at this LOD.
    pub fn circle_segments(&self) -> f64 {
        Self::BASE_CIRCLE_SEGMENTS * 2f64.powi(self.lod)
    }

    /// Linear deviation permitted for a circle of `bounding_radius` at this LOD.
    pub fn error_tolerance(&self, bounding_radius: f64) -> f64 {
        bounding_radius * (1.0 - (PI / self.circle_segments()).cos())
    }

    pub fn clamped_max_detail(&self) -> u32 {
        self.max_detail.clamp(1, Self::MAX_DETAIL)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.surface_area_threshold >= 0.0) {
            return Err(CadtexError::Config(format!(
                "surface_area_threshold must be >= 0, got {}",
                self.surface_area_threshold
            )));
        }
        if !(self.trim_texel_scale > 0.0) {
            return Err(CadtexError::Config(format!(
                "trim_texel_scale must be > 0, got {}",
                self.trim_texel_scale
            )));
        }
        if self.fallback_detail == 0 {
            return Err(CadtexError::Config("fallback_detail must be >= 1".into()));
        }
        Ok(())
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| CadtexError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            lod: Self::DEFAULT_LOD,
            surface_area_threshold: 0.0,
            trim_texel_scale: 1.0,
            fallback_detail: 6,
            max_detail: Self::MAX_DETAIL,
        }
    }
}

/// GPU-side knobs for the atlas passes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Half width, in trim-atlas texels, of the antialiasing strips.
    pub strip_half_width: f32,
    pub initial_atlas_size: u32,
    pub max_atlas_size: u32,
}

impl RenderConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.strip_half_width > 0.0) {
            return Err(CadtexError::Config(format!(
                "strip_half_width must be > 0, got {}",
                self.strip_half_width
            )));
        }
        if self.initial_atlas_size == 0 || self.initial_atlas_size > self.max_atlas_size {
            return Err(CadtexError::Config(format!(
                "initial_atlas_size {} must be in [1, {}]",
                self.initial_atlas_size, self.max_atlas_size
            )));
        }
        Ok(())
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| CadtexError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            strip_half_width: 1.0,
            initial_atlas_size: 256,
            max_atlas_size: 8192,
        }
    }
}
