//! cadtex geometry: curves, surfaces, and NURBS.
//!
//! Geometry is modeled as closed variant types ([`CurveGeometry`],
//! [`SurfaceGeometry`]) evaluated by `match`. All evaluation entry points on
//! [`CurveData`] and [`SurfaceData`] take normalized parameters in `[0, 1]`,
//! which is what the atlas tessellation grid addresses.

pub mod curve;
pub mod flags;
pub mod nurbs;
pub mod surface;
pub mod tessellate;

pub use curve::{Curve, CurveCategory, CurveData, CurveGeometry, CurvePoint, CurveType};
pub use flags::{CurveFlags, CurveRefFlags, NurbsFlags, SurfaceFlags};
pub use surface::{Surface, SurfaceCategory, SurfaceData, SurfaceGeometry, SurfacePoint, SurfaceType};
