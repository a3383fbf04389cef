//! Memoized atlas rendering: library upload, then every evaluation and trim
//! pass for one layout in a single submission.

use std::ops::Range;

use bytemuck::Pod;
use cadtex_layout::{AtlasLayout, LayoutPlan, LibraryBuffers};
use wgpu::util::DeviceExt;

use crate::atlas::{AtlasSet, AtlasSizes, Contents};
use crate::context::GpuContext;
use crate::error::Result;
use crate::eval::{EvalOutput, EvalPipelines};
use crate::shaders::Globals;
use crate::texture::{LibraryFormat, LibraryTexture};
use crate::trim::{TrimDraw, TrimPipelines};

/// The uploaded geometry libraries.
pub struct GpuLibraries {
    pub curves: LibraryTexture,
    pub surfaces: LibraryTexture,
    pub bodies: LibraryTexture,
}

impl GpuLibraries {
    pub fn upload(ctx: &GpuContext, buffers: &LibraryBuffers) -> Result<Self> {
        Ok(Self {
            curves: LibraryTexture::upload(ctx, "curve library", &buffers.curve_texture, LibraryFormat::Rgba16)?,
            surfaces: LibraryTexture::upload(ctx, "surface library", &buffers.surface_texture, LibraryFormat::Rgba16)?,
            bodies: LibraryTexture::upload(ctx, "body library", &buffers.body_texture, LibraryFormat::Rgba32)?,
        })
    }
}

/// What the atlases currently hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderMemo {
    last: Option<(u64, AtlasSizes)>,
}

impl RenderMemo {
    pub fn is_current(&self, generation: u64, sizes: AtlasSizes) -> bool {
        self.last == Some((generation, sizes))
    }

    pub fn record(&mut self, generation: u64, sizes: AtlasSizes) {
        self.last = Some((generation, sizes));
    }

    pub fn clear(&mut self) {
        self.last = None;
    }
}

/// Flatten keyed batches into one instance list plus the range of each batch.
pub fn concat_batches<'a, K, T, I>(batches: I) -> (Vec<T>, Vec<(K, Range<u32>)>)
where
    T: Copy + 'a,
    I: IntoIterator<Item = (K, &'a [T])>,
{
    let mut instances = Vec::new();
    let mut ranges = Vec::new();
    for (key, batch) in batches {
        if batch.is_empty() {
            continue;
        }
        let start = instances.len() as u32;
        instances.extend_from_slice(batch);
        ranges.push((key, start..instances.len() as u32));
    }
    (instances, ranges)
}

fn layout_extent(layout: &AtlasLayout) -> (u32, u32) {
    (layout.width, layout.height)
}

/// Extents the atlases must reach for `plan`.
pub fn required_sizes(plan: &LayoutPlan) -> AtlasSizes {
    AtlasSizes {
        curves: layout_extent(&plan.curve_atlas),
        surfaces: layout_extent(&plan.surface_atlas),
        trims: layout_extent(&plan.trim_atlas),
    }
}

fn instance_buffer<T: Pod>(ctx: &GpuContext, label: &str, instances: &[T]) -> Option<wgpu::Buffer> {
    if instances.is_empty() {
        return None;
    }
    Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(instances),
        usage: wgpu::BufferUsages::VERTEX,
    }))
}

fn uniform_buffer(ctx: &GpuContext, label: &str, globals: Globals) -> wgpu::Buffer {
    ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::bytes_of(&globals),
        usage: wgpu::BufferUsages::UNIFORM,
    })
}

/// Owns the pipelines and atlases, and re-renders them when the layout changes.
pub struct AtlasRenderer {
    eval: EvalPipelines,
    trim: TrimPipelines,
    atlases: AtlasSet,
    memo: RenderMemo,
}

impl AtlasRenderer {
    pub fn new(ctx: &GpuContext) -> Result<Self> {
        Ok(Self {
            eval: EvalPipelines::new(ctx),
            trim: TrimPipelines::new(ctx),
            atlases: AtlasSet::new(ctx)?,
            memo: RenderMemo::default(),
        })
    }

    pub fn atlases(&self) -> &AtlasSet {
        &self.atlases
    }

    /// Force the next [`render`](Self::render) to run every pass.
    pub fn invalidate(&mut self) {
        self.memo.clear();
    }

    /// Fill the atlases for `plan`. Returns `false` when they already hold
    /// this generation at the current size.
    pub fn render(&mut self, ctx: &GpuContext, libs: &GpuLibraries, plan: &LayoutPlan, generation: u64) -> Result<bool> {
        // a resize changes the memo key, so every pass below clears and redraws
        self.atlases.ensure_sizes(ctx, &required_sizes(plan), Contents::Discard)?;
        let sizes = self.atlases.sizes();
        if self.memo.is_current(generation, sizes) {
            return Ok(false);
        }

        let half_width = ctx.config.strip_half_width;
        let curve_globals = uniform_buffer(ctx, "curve globals", Globals::new(sizes.curves, half_width));
        let surface_globals = uniform_buffer(ctx, "surface globals", Globals::new(sizes.surfaces, half_width));
        let trim_globals = uniform_buffer(ctx, "trim globals", Globals::new(sizes.trims, half_width));

        let (curve_instances, curve_ranges) =
            concat_batches(plan.eval.curves.iter().map(|(category, batch)| (*category, batch.as_slice())));
        let (surface_instances, surface_ranges) =
            concat_batches(plan.eval.surfaces.iter().map(|(category, batch)| (*category, batch.as_slice())));
        let (trim_instances, trim_ranges) =
            concat_batches(plan.trim_curves.iter().map(|(detail, batch)| (*detail, batch.as_slice())));
        let trim_draws: Vec<TrimDraw> = trim_ranges
            .into_iter()
            .map(|(detail, instances)| TrimDraw { detail, instances })
            .collect();

        let curve_buffer = instance_buffer(ctx, "curve eval instances", &curve_instances);
        let surface_buffer = instance_buffer(ctx, "surface eval instances", &surface_instances);
        let trim_buffer = instance_buffer(ctx, "trim curve instances", &trim_instances);
        let rect_buffer = instance_buffer(ctx, "trim rect instances", &plan.trim_rects);

        let curve_bind = self
            .eval
            .bind_group(ctx, &curve_globals, &libs.curves.view, &libs.surfaces.view);
        let surface_bind = self
            .eval
            .bind_group(ctx, &surface_globals, &libs.curves.view, &libs.surfaces.view);
        let trim_curve_bind = self
            .trim
            .curve_bind_group(ctx, &trim_globals, &self.atlases.curve_positions.view);
        let trim_count_bind = self
            .trim
            .count_bind_group(ctx, &trim_globals, &self.atlases.trim_counts.view);

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("cadtex atlases") });

        let atlases = &self.atlases;
        for (target, output) in [
            (&atlases.curve_positions.view, EvalOutput::Position),
            (&atlases.curve_tangents.view, EvalOutput::Attribute),
        ] {
            self.eval
                .encode_curves(&mut encoder, target, output, &curve_bind, curve_buffer.as_ref(), &curve_ranges);
        }
        for (target, output) in [
            (&atlases.surface_positions.view, EvalOutput::Position),
            (&atlases.surface_normals.view, EvalOutput::Attribute),
        ] {
            self.eval
                .encode_surfaces(&mut encoder, target, output, &surface_bind, surface_buffer.as_ref(), &surface_ranges);
        }

        // trims read curve positions written above
        self.trim.encode_fans(
            &mut encoder,
            &atlases.trim_counts.view,
            &trim_curve_bind,
            trim_buffer.as_ref(),
            &trim_draws,
        );
        self.trim.encode_flatten(
            &mut encoder,
            &atlases.trim_mask.view,
            &trim_count_bind,
            rect_buffer.as_ref(),
            plan.trim_rects.len() as u32,
        );
        self.trim.encode_strips(
            &mut encoder,
            &atlases.trim_mask,
            &trim_curve_bind,
            trim_buffer.as_ref(),
            &trim_instances,
            &trim_draws,
        );

        ctx.queue.submit(Some(encoder.finish()));
        log::debug!(
            "rendered atlases for generation {generation}: {} curves, {} surfaces, {} trim curves, {} trim sets",
            curve_instances.len(),
            surface_instances.len(),
            trim_instances.len(),
            plan.trim_rects.len()
        );

        self.memo.record(generation, sizes);
        Ok(true)
    }
}
