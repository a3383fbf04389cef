//! Instance batches keyed by small value structs.

use std::collections::BTreeMap;

use cadtex_geometry::{CurveCategory, SurfaceCategory};
use serde::{Deserialize, Serialize};

use crate::instances::{GeomEvalInstance, TrimCurveInstance};

/// Tessellation footprint of a surface batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DetailKey {
    pub u: u32,
    pub v: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SurfaceBatchKey {
    pub shader_id: u32,
    pub category: SurfaceCategory,
    pub detail: DetailKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CurveBatchKey {
    pub shader_id: u32,
    pub detail: u32,
}

/// One drawn instance: `[body_id, draw_item_index_in_body, item_id, trim_set_id]`.
///
/// `item_id` is a surface or curve id; `trim_set_id` is `-1` when untrimmed.
pub type DrawInstance = [f32; 4];

/// Instanced draw items for the external shading stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawItemBatches {
    pub surfaces: BTreeMap<SurfaceBatchKey, Vec<DrawInstance>>,
    pub curves: BTreeMap<CurveBatchKey, Vec<DrawInstance>>,
}

impl DrawItemBatches {
    pub fn push_surface(&mut self, key: SurfaceBatchKey, instance: DrawInstance) {
        self.surfaces.entry(key).or_default().push(instance);
    }

    pub fn push_curve(&mut self, key: CurveBatchKey, instance: DrawInstance) {
        self.curves.entry(key).or_default().push(instance);
    }

    pub fn surface_instances(&self) -> usize {
        self.surfaces.values().map(Vec::len).sum()
    }

    pub fn curve_instances(&self) -> usize {
        self.curves.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty() && self.curves.is_empty()
    }
}

/// Evaluation pass instances, one batch per shader category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvalBatches {
    pub curves: BTreeMap<CurveCategory, Vec<GeomEvalInstance>>,
    pub surfaces: BTreeMap<SurfaceCategory, Vec<GeomEvalInstance>>,
}

impl EvalBatches {
    pub fn curve_batch(&self, category: CurveCategory) -> &[GeomEvalInstance] {
        self.curves.get(&category).map_or(&[], Vec::as_slice)
    }

    pub fn surface_batch(&self, category: SurfaceCategory) -> &[GeomEvalInstance] {
        self.surfaces.get(&category).map_or(&[], Vec::as_slice)
    }
}

/// Trim curve instances grouped by curve detail, so one draw covers curves
/// with the same number of segments.
pub type TrimCurveBatches = BTreeMap<u32, Vec<TrimCurveInstance>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_keys_group_and_order() {
        let mut batches = DrawItemBatches::default();
        let key = |u, v| SurfaceBatchKey {
            shader_id: 0,
            category: SurfaceCategory::Simple,
            detail: DetailKey { u, v },
        };
        batches.push_surface(key(8, 8), [0.0, 0.0, 1.0, -1.0]);
        batches.push_surface(key(8, 8), [0.0, 1.0, 2.0, -1.0]);
        batches.push_surface(key(4, 1), [1.0, 0.0, 3.0, 0.0]);
        assert_eq!(batches.surfaces.len(), 2);
        assert_eq!(batches.surface_instances(), 3);
        assert_eq!(batches.surfaces.keys().next(), Some(&key(4, 1)));
    }
}
