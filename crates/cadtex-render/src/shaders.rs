//! WGSL sources, assembled per pipeline.
//!
//! Evaluation shaders are one program per category: a `CATEGORY` constant
//! followed by the shared reader, NURBS and curve code, the instanced quad and
//! the category's fragment stage.

use bytemuck::{Pod, Zeroable};
use cadtex_geometry::{CurveCategory, SurfaceCategory};

const BINREADER: &str = include_str!("shaders/binreader.wgsl");
const NURBS: &str = include_str!("shaders/nurbs.wgsl");
const CURVES: &str = include_str!("shaders/curves.wgsl");
const EVAL_QUAD: &str = include_str!("shaders/eval_quad.wgsl");
const EVAL_CURVE: &str = include_str!("shaders/eval_curve.wgsl");
const EVAL_SURFACE: &str = include_str!("shaders/eval_surface.wgsl");
const TRIM_COMMON: &str = include_str!("shaders/trim_common.wgsl");
const TRIM_FAN: &str = include_str!("shaders/trim_fan.wgsl");
const TRIM_STRIP: &str = include_str!("shaders/trim_strip.wgsl");
const TRIM_FLATTEN: &str = include_str!("shaders/trim_flatten.wgsl");

/// Uniform block shared by every pass.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Globals {
    /// Render target size in texels.
    pub target_size: [f32; 2],
    /// Strip half width in trim-atlas texels.
    pub half_width: f32,
    pub _pad: f32,
}

impl Globals {
    pub fn new(target: (u32, u32), half_width: f32) -> Self {
        Self {
            target_size: [target.0 as f32, target.1 as f32],
            half_width,
            _pad: 0.0,
        }
    }
}

pub fn curve_category_code(category: CurveCategory) -> u32 {
    match category {
        CurveCategory::Simple => 0,
        CurveCategory::Nurbs => 1,
    }
}

pub fn surface_category_code(category: SurfaceCategory) -> u32 {
    match category {
        SurfaceCategory::Simple => 0,
        SurfaceCategory::Compound => 1,
        SurfaceCategory::Nurbs => 2,
        SurfaceCategory::Fan => 3,
    }
}

fn category_program(code: u32, stage: &str) -> String {
    let header = format!("const CATEGORY: u32 = {code}u;\n");
    [
        header.as_str(),
        BINREADER,
        NURBS,
        CURVES,
        EVAL_QUAD,
        stage,
    ]
    .join("\n")
}

pub fn curve_eval_source(category: CurveCategory) -> String {
    category_program(curve_category_code(category), EVAL_CURVE)
}

pub fn surface_eval_source(category: SurfaceCategory) -> String {
    category_program(surface_category_code(category), EVAL_SURFACE)
}

pub fn trim_fan_source() -> String {
    [TRIM_COMMON, TRIM_FAN].join("\n")
}

pub fn trim_strip_source() -> String {
    [TRIM_COMMON, TRIM_STRIP].join("\n")
}

pub fn trim_flatten_source() -> &'static str {
    TRIM_FLATTEN
}

pub(crate) fn create_module(device: &wgpu::Device, label: &str, source: String) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}
