//! cadtex codec: decoding of the binary geometry libraries.
//!
//! Curve and surface libraries are a TOC buffer plus a square RGBA16 payload
//! texture; bodies use an RGBA32 texture; trim sets live in a flat buffer.
//! Every format-version decision goes through [`FormatCodec`].

pub mod body_library;
pub mod builder;
pub mod codec;
pub mod curve_library;
mod fields;
pub mod half;
pub mod reader;
pub mod surface_library;
pub mod texel;
pub mod trim_set_library;
pub mod writer;

pub use body_library::{BodyDescriptor, BodyItemRef, BodyLibrary};
pub use codec::FormatCodec;
pub use curve_library::{CurveDims, CurveLibrary};
pub use reader::BinaryReader;
pub use surface_library::{SurfaceDims, SurfaceLibrary, SurfaceRefs};
pub use texel::TexelAddr;
pub use trim_set_library::{TrimCurveRef, TrimSet, TrimSetLibrary};
pub use writer::BinaryWriter;
