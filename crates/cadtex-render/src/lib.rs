//! cadtex render: wgpu passes that evaluate curves and surfaces into the
//! geometry atlases and rasterize trim sets into the trim mask.

pub mod atlas;
pub mod context;
pub mod error;
pub mod eval;
pub mod renderer;
pub mod shaders;
pub mod texture;
pub mod trim;

pub use atlas::{AtlasSet, AtlasSizes, AtlasTexture, Contents};
pub use context::GpuContext;
pub use error::{RenderError, Result};
pub use eval::{EvalOutput, EvalPipelines};
pub use renderer::{AtlasRenderer, GpuLibraries, RenderMemo};
pub use shaders::Globals;
pub use texture::{read_texture, upload_layout_texture, LibraryFormat, LibraryTexture};
pub use trim::{TrimDraw, TrimPipelines};
