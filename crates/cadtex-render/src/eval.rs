//! Evaluation passes: curve and surface payloads into the geometry atlases.

use std::collections::BTreeMap;
use std::ops::Range;

use cadtex_geometry::{CurveCategory, SurfaceCategory};
use cadtex_layout::GeomEvalInstance;

use crate::atlas::GEOMETRY_FORMAT;
use crate::context::GpuContext;
use crate::shaders::{create_module, curve_eval_source, surface_eval_source};

/// Per-instance attributes matching [`GeomEvalInstance`].
pub const EVAL_INSTANCE_ATTRIBUTES: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
    0 => Float32x4,
    1 => Float32x2,
    2 => Float32x2,
    3 => Float32x2,
    4 => Float32,
    5 => Float32,
];

/// Vertices per instanced quad.
pub const QUAD_VERTICES: u32 = 6;

fn instance_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<GeomEvalInstance>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &EVAL_INSTANCE_ATTRIBUTES,
    }
}

/// The position pipeline and the second-attribute pipeline (tangent or normal)
/// of one category.
struct CategoryPipelines {
    position: wgpu::RenderPipeline,
    attribute: wgpu::RenderPipeline,
}

/// Which output an evaluation pass writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalOutput {
    Position,
    /// Tangents for curves, normals for surfaces.
    Attribute,
}

pub struct EvalPipelines {
    bind_group_layout: wgpu::BindGroupLayout,
    curves: BTreeMap<CurveCategory, CategoryPipelines>,
    surfaces: BTreeMap<SurfaceCategory, CategoryPipelines>,
}

impl EvalPipelines {
    pub fn new(ctx: &GpuContext) -> Self {
        let device = &ctx.device;
        let library_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Uint,
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("eval bind group layout"),
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
                library_entry(1),
                library_entry(2),
            ],
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("eval pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let curves = CurveCategory::ALL
            .into_iter()
            .map(|category| {
                let label = format!("curve eval {category:?}");
                let module = create_module(device, &label, curve_eval_source(category));
                let pipelines = CategoryPipelines {
                    position: eval_pipeline(device, &layout, &module, &label, "fs_position"),
                    attribute: eval_pipeline(device, &layout, &module, &label, "fs_tangent"),
                };
                (category, pipelines)
            })
            .collect();
        let surfaces = SurfaceCategory::ALL
            .into_iter()
            .map(|category| {
                let label = format!("surface eval {category:?}");
                let module = create_module(device, &label, surface_eval_source(category));
                let pipelines = CategoryPipelines {
                    position: eval_pipeline(device, &layout, &module, &label, "fs_position"),
                    attribute: eval_pipeline(device, &layout, &module, &label, "fs_normal"),
                };
                (category, pipelines)
            })
            .collect();

        Self {
            bind_group_layout,
            curves,
            surfaces,
        }
    }

    /// Uniforms plus both library textures.
    pub fn bind_group(
        &self,
        ctx: &GpuContext,
        uniforms: &wgpu::Buffer,
        curve_lib: &wgpu::TextureView,
        surface_lib: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("eval bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(curve_lib),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(surface_lib),
                },
            ],
        })
    }

    fn curve_pipeline(&self, category: CurveCategory, output: EvalOutput) -> Option<&wgpu::RenderPipeline> {
        self.curves.get(&category).map(|p| p.select(output))
    }

    fn surface_pipeline(&self, category: SurfaceCategory, output: EvalOutput) -> Option<&wgpu::RenderPipeline> {
        self.surfaces.get(&category).map(|p| p.select(output))
    }

    /// Clear `target` and draw every curve batch into it.
    pub fn encode_curves(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        output: EvalOutput,
        bind_group: &wgpu::BindGroup,
        instances: Option<&wgpu::Buffer>,
        ranges: &[(CurveCategory, Range<u32>)],
    ) {
        let draws = ranges
            .iter()
            .filter_map(|(category, range)| Some((self.curve_pipeline(*category, output)?, range.clone())));
        encode_pass(encoder, "curve eval pass", target, bind_group, instances, draws);
    }

    /// Clear `target` and draw every surface batch into it.
    pub fn encode_surfaces(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        output: EvalOutput,
        bind_group: &wgpu::BindGroup,
        instances: Option<&wgpu::Buffer>,
        ranges: &[(SurfaceCategory, Range<u32>)],
    ) {
        let draws = ranges
            .iter()
            .filter_map(|(category, range)| Some((self.surface_pipeline(*category, output)?, range.clone())));
        encode_pass(encoder, "surface eval pass", target, bind_group, instances, draws);
    }
}

impl CategoryPipelines {
    fn select(&self, output: EvalOutput) -> &wgpu::RenderPipeline {
        match output {
            EvalOutput::Position => &self.position,
            EvalOutput::Attribute => &self.attribute,
        }
    }
}

fn encode_pass<'a>(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
    bind_group: &wgpu::BindGroup,
    instances: Option<&wgpu::Buffer>,
    draws: impl Iterator<Item = (&'a wgpu::RenderPipeline, Range<u32>)>,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                store: wgpu::StoreOp::Store,
            },
        })],
        ..Default::default()
    });
    let Some(instances) = instances else {
        return;
    };
    pass.set_bind_group(0, bind_group, &[]);
    pass.set_vertex_buffer(0, instances.slice(..));
    for (pipeline, range) in draws {
        if range.is_empty() {
            continue;
        }
        pass.set_pipeline(pipeline);
        pass.draw(0..QUAD_VERTICES, range);
    }
}

fn eval_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    label: &str,
    fragment_entry: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[instance_layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some(fragment_entry),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: GEOMETRY_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}
