//! cadtex layout: turns decoded geometry libraries into packed atlases and
//! instance batches.
//!
//! The pass runs off the render thread through [`LayoutTask`]; its output is
//! read-only until the next pass.

pub mod atlas;
pub mod batches;
pub mod detail;
pub mod engine;
pub mod instances;
pub mod packer;
pub mod task;

pub use atlas::{calc_container_size, AtlasLayout};
pub use batches::{
    CurveBatchKey, DetailKey, DrawInstance, DrawItemBatches, EvalBatches, SurfaceBatchKey, TrimCurveBatches,
};
pub use detail::{curve_detail, surface_detail, SurfaceDetail};
pub use engine::{LayoutContext, LayoutPlan, LayoutStats, LibraryBuffers};
pub use instances::{GeomEvalInstance, TrimCurveInstance, TrimRectInstance};
pub use packer::{GrowingPacker, Placement};
pub use task::{run_layout, LayoutRequest, LayoutResult, LayoutTask};
