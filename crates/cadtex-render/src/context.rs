//! wgpu device and queue, owned by the caller.

use cadtex_core::RenderConfig;
use wgpu::{Device, Instance, Queue};

use crate::error::{RenderError, Result};

/// Device, queue and the render knobs every pass reads.
pub struct GpuContext {
    pub device: Device,
    pub queue: Queue,
    pub config: RenderConfig,
}

impl GpuContext {
    /// Request a high-performance adapter with default limits.
    pub async fn init() -> Result<Self> {
        Self::init_with(RenderConfig::default()).await
    }

    pub async fn init_with(config: RenderConfig) -> Result<Self> {
        config.validate()?;

        let instance = Instance::new(wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;

        let info = adapter.get_info();
        log::debug!("using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("cadtex device"),
                    ..Default::default()
                },
                None,
            )
            .await?;

        Ok(Self { device, queue, config })
    }

    /// Initialize synchronously (native only).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn init_blocking() -> Result<Self> {
        pollster::block_on(Self::init())
    }

    /// Largest texture side the device accepts.
    pub fn max_texture_side(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }
}
