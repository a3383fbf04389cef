use cadtex_core::CadtexError;
use thiserror::Error;

/// Errors raised while creating GPU resources or running the atlas passes.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("No compatible GPU adapter found")]
    NoAdapter,

    #[error("Failed to request GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("Buffer mapping failed")]
    BufferMapping,

    #[error("Invalid texture: {0}")]
    InvalidTexture(String),

    #[error(transparent)]
    Core(#[from] CadtexError),
}

pub type Result<T> = std::result::Result<T, RenderError>;
