pub mod config;
pub mod error;
pub mod id;
pub mod version;

pub use config::{LayoutConfig, RenderConfig};
pub use error::{CadtexError, Result};
pub use id::{BodyId, CurveId, SurfaceId, TrimSetId};
pub use version::FormatVersion;
