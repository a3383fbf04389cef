//! Trim passes: winding fans, the flatten pass and boundary strips.
//!
//! The fan pass accumulates signed triangle counts per texel, flatten turns
//! odd counts into the mask, and strips antialias the boundary on top of it.

use std::ops::Range;

use cadtex_layout::{TrimCurveInstance, TrimRectInstance};

use crate::atlas::{AtlasTexture, TRIM_COUNT_FORMAT, TRIM_MASK_FORMAT};
use crate::context::GpuContext;
use crate::eval::QUAD_VERTICES;
use crate::shaders::{create_module, trim_fan_source, trim_flatten_source, trim_strip_source};

pub const TRIM_CURVE_ATTRIBUTES: [wgpu::VertexAttribute; 7] = wgpu::vertex_attr_array![
    0 => Float32x4,
    1 => Float32x2,
    2 => Float32x2,
    3 => Float32x2,
    4 => Float32x4,
    5 => Float32,
    6 => Float32,
];

pub const TRIM_RECT_ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
    0 => Float32x4,
    1 => Float32,
    2 => Float32,
];

/// Vertices per curve segment in each pass.
pub const FAN_VERTICES_PER_SEGMENT: u32 = 3;
pub const STRIP_VERTICES_PER_SEGMENT: u32 = 6;

/// One batch of trim curves sharing a segment count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimDraw {
    pub detail: u32,
    pub instances: Range<u32>,
}

fn curve_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<TrimCurveInstance>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &TRIM_CURVE_ATTRIBUTES,
    }
}

fn rect_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<TrimRectInstance>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &TRIM_RECT_ATTRIBUTES,
    }
}

fn uniform_and_texture_layout(
    device: &wgpu::Device,
    label: &str,
    texture_visibility: wgpu::ShaderStages,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: texture_visibility,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
        ],
    })
}

pub struct TrimPipelines {
    curve_bind_layout: wgpu::BindGroupLayout,
    count_bind_layout: wgpu::BindGroupLayout,
    fan: wgpu::RenderPipeline,
    flatten: wgpu::RenderPipeline,
    strip: wgpu::RenderPipeline,
}

struct PipelineParams<'a> {
    label: &'a str,
    layout: &'a wgpu::PipelineLayout,
    module: &'a wgpu::ShaderModule,
    buffer: wgpu::VertexBufferLayout<'static>,
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
}

fn trim_pipeline(device: &wgpu::Device, params: PipelineParams<'_>) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(params.label),
        layout: Some(params.layout),
        vertex: wgpu::VertexState {
            module: params.module,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[params.buffer],
        },
        fragment: Some(wgpu::FragmentState {
            module: params.module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: params.format,
                blend: params.blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

impl TrimPipelines {
    pub fn new(ctx: &GpuContext) -> Self {
        let device = &ctx.device;
        let curve_bind_layout = uniform_and_texture_layout(device, "trim curve bind layout", wgpu::ShaderStages::VERTEX);
        let count_bind_layout = uniform_and_texture_layout(device, "trim count bind layout", wgpu::ShaderStages::FRAGMENT);

        let curve_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("trim curve pipeline layout"),
            bind_group_layouts: &[&curve_bind_layout],
            push_constant_ranges: &[],
        });
        let count_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("trim flatten pipeline layout"),
            bind_group_layouts: &[&count_bind_layout],
            push_constant_ranges: &[],
        });

        let fan_module = create_module(device, "trim fan", trim_fan_source());
        let strip_module = create_module(device, "trim strip", trim_strip_source());
        let flatten_module = create_module(device, "trim flatten", trim_flatten_source().to_owned());

        let additive = wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        };
        let fan = trim_pipeline(
            device,
            PipelineParams {
                label: "trim fan",
                layout: &curve_pipeline_layout,
                module: &fan_module,
                buffer: curve_layout(),
                format: TRIM_COUNT_FORMAT,
                blend: Some(wgpu::BlendState {
                    color: additive,
                    alpha: additive,
                }),
            },
        );
        let flatten = trim_pipeline(
            device,
            PipelineParams {
                label: "trim flatten",
                layout: &count_pipeline_layout,
                module: &flatten_module,
                buffer: rect_layout(),
                format: TRIM_MASK_FORMAT,
                blend: None,
            },
        );
        let strip = trim_pipeline(
            device,
            PipelineParams {
                label: "trim strip",
                layout: &curve_pipeline_layout,
                module: &strip_module,
                buffer: curve_layout(),
                format: TRIM_MASK_FORMAT,
                blend: None,
            },
        );

        Self {
            curve_bind_layout,
            count_bind_layout,
            fan,
            flatten,
            strip,
        }
    }

    /// Uniforms plus the curve position atlas, for the fan and strip passes.
    pub fn curve_bind_group(
        &self,
        ctx: &GpuContext,
        uniforms: &wgpu::Buffer,
        curve_positions: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        bind(ctx, "trim curve bind group", &self.curve_bind_layout, uniforms, curve_positions)
    }

    /// Uniforms plus the winding counts, for the flatten pass.
    pub fn count_bind_group(&self, ctx: &GpuContext, uniforms: &wgpu::Buffer, counts: &wgpu::TextureView) -> wgpu::BindGroup {
        bind(ctx, "trim count bind group", &self.count_bind_layout, uniforms, counts)
    }

    /// Clear the count atlas and accumulate every curve's winding fan.
    pub fn encode_fans(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        counts: &wgpu::TextureView,
        bind_group: &wgpu::BindGroup,
        curves: Option<&wgpu::Buffer>,
        draws: &[TrimDraw],
    ) {
        let mut pass = begin(encoder, "trim fan pass", counts, wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT));
        let Some(curves) = curves else {
            return;
        };
        pass.set_pipeline(&self.fan);
        pass.set_bind_group(0, bind_group, &[]);
        pass.set_vertex_buffer(0, curves.slice(..));
        draw_segments(&mut pass, draws, FAN_VERTICES_PER_SEGMENT);
    }

    /// Clear the mask and resolve each trim rectangle's counts into it.
    pub fn encode_flatten(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        mask: &wgpu::TextureView,
        bind_group: &wgpu::BindGroup,
        rects: Option<&wgpu::Buffer>,
        rect_count: u32,
    ) {
        let mut pass = begin(encoder, "trim flatten pass", mask, wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT));
        let Some(rects) = rects else {
            return;
        };
        pass.set_pipeline(&self.flatten);
        pass.set_bind_group(0, bind_group, &[]);
        pass.set_vertex_buffer(0, rects.slice(..));
        pass.draw(0..QUAD_VERTICES, 0..rect_count);
    }

    /// Overwrite the mask along every boundary with antialiased coverage.
    ///
    /// `instances` is the contents of `curves`. Each run of curves sharing a
    /// trim rectangle is scissored to it, so strips never spill into a
    /// neighbouring set.
    pub fn encode_strips(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        mask: &AtlasTexture,
        bind_group: &wgpu::BindGroup,
        curves: Option<&wgpu::Buffer>,
        instances: &[TrimCurveInstance],
        draws: &[TrimDraw],
    ) {
        let Some(curves) = curves else {
            return;
        };
        let target = mask.size();
        let mut pass = begin(encoder, "trim strip pass", &mask.view, wgpu::LoadOp::Load);
        pass.set_pipeline(&self.strip);
        pass.set_bind_group(0, bind_group, &[]);
        pass.set_vertex_buffer(0, curves.slice(..));
        for draw in draws {
            if draw.detail == 0 {
                continue;
            }
            let vertices = 0..draw.detail * STRIP_VERTICES_PER_SEGMENT;
            for run in rect_runs(instances, draw.instances.clone()) {
                let Some((x, y, w, h)) = scissor_rect(instances[run.start as usize].trim_rect, target) else {
                    continue;
                };
                pass.set_scissor_rect(x, y, w, h);
                pass.draw(vertices.clone(), run);
            }
        }
    }
}

fn bind(
    ctx: &GpuContext,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    uniforms: &wgpu::Buffer,
    texture: &wgpu::TextureView,
) -> wgpu::BindGroup {
    ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(texture),
            },
        ],
    })
}

fn begin<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
    load: wgpu::LoadOp<wgpu::Color>,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
        })],
        ..Default::default()
    })
}

fn draw_segments(pass: &mut wgpu::RenderPass<'_>, draws: &[TrimDraw], vertices_per_segment: u32) {
    for draw in draws {
        if draw.detail == 0 || draw.instances.is_empty() {
            continue;
        }
        pass.draw(0..draw.detail * vertices_per_segment, draw.instances.clone());
    }
}

/// Texel bounds of a trim rectangle clipped to a `target` extent, as
/// `(x, y, width, height)`; `None` when nothing is left.
pub fn scissor_rect(rect: [f32; 4], target: (u32, u32)) -> Option<(u32, u32, u32, u32)> {
    let clip = |start: f32, len: f32, side: u32| {
        let lo = start.floor().clamp(0.0, side as f32) as u32;
        let hi = (start + len).ceil().clamp(0.0, side as f32) as u32;
        (hi > lo).then_some((lo, hi - lo))
    };
    let (x, w) = clip(rect[0], rect[2], target.0)?;
    let (y, h) = clip(rect[1], rect[3], target.1)?;
    Some((x, y, w, h))
}

/// Split `range` into runs of consecutive instances with the same trim rectangle.
fn rect_runs(instances: &[TrimCurveInstance], range: Range<u32>) -> Vec<Range<u32>> {
    let mut runs: Vec<Range<u32>> = Vec::new();
    for i in range {
        match runs.last_mut() {
            Some(run) if instances[run.start as usize].trim_rect == instances[i as usize].trim_rect => run.end = i + 1,
            _ => runs.push(i..i + 1),
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::Zeroable;

    #[test]
    fn test_curve_attributes_follow_instance_fields() {
        let zero = TrimCurveInstance::zeroed();
        let offsets: Vec<u64> = TRIM_CURVE_ATTRIBUTES.iter().map(|a| a.offset).collect();
        assert_eq!(
            offsets,
            vec![
                bytemuck::offset_of!(zero, TrimCurveInstance, trim_rect) as u64,
                bytemuck::offset_of!(zero, TrimCurveInstance, trim_size) as u64,
                bytemuck::offset_of!(zero, TrimCurveInstance, curve_atlas) as u64,
                bytemuck::offset_of!(zero, TrimCurveInstance, xfo_tr) as u64,
                bytemuck::offset_of!(zero, TrimCurveInstance, xfo_rot) as u64,
                bytemuck::offset_of!(zero, TrimCurveInstance, detail) as u64,
                bytemuck::offset_of!(zero, TrimCurveInstance, flags) as u64,
            ]
        );
        assert_eq!(curve_layout().array_stride, 64);
    }

    #[test]
    fn test_scissor_rect_clips_to_target() {
        assert_eq!(scissor_rect([4.0, 8.0, 16.0, 8.0], (64, 64)), Some((4, 8, 16, 8)));
        // fractional edges widen to whole texels
        assert_eq!(scissor_rect([4.5, 8.0, 2.25, 1.5], (64, 64)), Some((4, 8, 3, 2)));
        assert_eq!(scissor_rect([60.0, -2.0, 10.0, 6.0], (64, 64)), Some((60, 0, 4, 4)));
        assert_eq!(scissor_rect([70.0, 0.0, 4.0, 4.0], (64, 64)), None);
        assert_eq!(scissor_rect([0.0, 0.0, 0.0, 4.0], (64, 64)), None);
    }

    #[test]
    fn test_rect_runs_split_on_rect_change() {
        let at = |x: f32| TrimCurveInstance {
            trim_rect: [x, 0.0, 8.0, 8.0],
            ..TrimCurveInstance::zeroed()
        };
        let instances = [at(0.0), at(0.0), at(8.0), at(0.0), at(0.0)];
        assert_eq!(rect_runs(&instances, 0..5), vec![0..2, 2..3, 3..5]);
        assert_eq!(rect_runs(&instances, 1..4), vec![1..2, 2..3, 3..4]);
        assert!(rect_runs(&instances, 2..2).is_empty());
    }

    #[test]
    fn test_rect_attributes_follow_instance_fields() {
        let zero = TrimRectInstance::zeroed();
        assert_eq!(TRIM_RECT_ATTRIBUTES[1].offset, bytemuck::offset_of!(zero, TrimRectInstance, fill) as u64);
        assert_eq!(TRIM_RECT_ATTRIBUTES[2].offset, bytemuck::offset_of!(zero, TrimRectInstance, id) as u64);
        // padding stays out of the vertex fetch
        assert_eq!(rect_layout().array_stride, 32);
    }
}
