//! One-shot layout task.
//!
//! The request owns its buffers and moves them onto a worker thread; the
//! result moves them back together with the layout. Nothing is shared between
//! the caller and the worker while the task runs.

use std::thread::{self, JoinHandle};

use cadtex_codec::FormatCodec;
use cadtex_core::{CadtexError, FormatVersion, LayoutConfig, Result};

use crate::engine::{LayoutContext, LayoutPlan, LibraryBuffers};

#[derive(Debug, Clone)]
pub struct LayoutRequest {
    pub buffers: LibraryBuffers,
    pub version: FormatVersion,
    pub config: LayoutConfig,
    pub bounding_radius: f64,
    /// Shader id per body; bodies past the end use shader 0.
    pub body_shader_ids: Option<Vec<u32>>,
    /// Caller-chosen tag echoed in the result, used to memoize GPU passes.
    pub generation: u64,
}

impl LayoutRequest {
    pub fn new(buffers: LibraryBuffers, version: FormatVersion) -> Self {
        Self {
            buffers,
            version,
            config: LayoutConfig::default(),
            bounding_radius: 1.0,
            body_shader_ids: None,
            generation: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayoutResult {
    pub generation: u64,
    pub plan: LayoutPlan,
    /// The request's buffers, handed back for texture upload.
    pub buffers: LibraryBuffers,
}

/// Run a layout on the current thread.
pub fn run_layout(request: LayoutRequest) -> Result<LayoutResult> {
    let LayoutRequest {
        buffers,
        version,
        config,
        bounding_radius,
        body_shader_ids,
        generation,
    } = request;
    let context = LayoutContext::new(buffers, FormatCodec::new(version))?;
    let plan = context.layout(&config, bounding_radius, body_shader_ids.as_deref())?;
    Ok(LayoutResult {
        generation,
        plan,
        buffers: context.into_buffers(),
    })
}

/// Handle to a layout running on its own thread.
#[derive(Debug)]
pub struct LayoutTask {
    generation: u64,
    handle: JoinHandle<Result<LayoutResult>>,
}

impl LayoutTask {
    pub fn spawn(request: LayoutRequest) -> Result<Self> {
        let generation = request.generation;
        let handle = thread::Builder::new()
            .name(format!("cadtex-layout-{generation}"))
            .spawn(move || run_layout(request))?;
        Ok(Self { generation, handle })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the layout. A panic on the worker is reported as an error.
    pub fn join(self) -> Result<LayoutResult> {
        self.handle.join().map_err(|_| {
            CadtexError::InvalidOperation(format!("layout task {} panicked", self.generation))
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_request_lays_out_nothing() {
        let mut request = LayoutRequest::new(LibraryBuffers::default(), FormatVersion::latest());
        request.generation = 3;
        let result = LayoutTask::spawn(request).unwrap().join().unwrap();
        assert_eq!(result.generation, 3);
        assert_eq!(result.plan.stats.curves, 0);
        assert_eq!(result.plan.curve_atlas.width, 0);
        assert!(result.plan.draw_items.is_empty());
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let mut request = LayoutRequest::new(LibraryBuffers::default(), FormatVersion::latest());
        request.config.trim_texel_scale = 0.0;
        assert!(matches!(run_layout(request), Err(CadtexError::Config(_))));
    }
}
