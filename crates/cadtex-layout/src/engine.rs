//! The atlas layout pass over a set of decoded libraries.
//!
//! A pass derives per-item detail, culls small surfaces, packs the curve,
//! surface and trim-set atlases, and emits every instance batch the GPU side
//! consumes. It only reads the libraries, so one [`LayoutContext`] can serve
//! several passes with different configurations.

use std::collections::BTreeSet;

use cadtex_codec::{
    BodyLibrary, CurveLibrary, FormatCodec, SurfaceLibrary, TexelAddr, TrimSet, TrimSetLibrary,
};
use cadtex_core::{BodyId, CadtexError, CurveId, LayoutConfig, Result, SurfaceId, TrimSetId};
use cadtex_geometry::{CurveCategory, CurveFlags, SurfaceCategory, SurfaceFlags, SurfaceGeometry};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::atlas::{pack_size_classes, AtlasLayout};
use crate::batches::{
    CurveBatchKey, DetailKey, DrawItemBatches, EvalBatches, SurfaceBatchKey, TrimCurveBatches,
};
use crate::detail::{curve_detail, max_pow2, surface_detail, SurfaceDetail};
use crate::instances::{GeomEvalInstance, TrimCurveInstance, TrimRectInstance};

/// Raw library buffers, as received from the asset loader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryBuffers {
    pub curve_toc: Vec<u8>,
    pub curve_texture: Vec<u8>,
    pub surface_toc: Vec<u8>,
    pub surface_texture: Vec<u8>,
    pub trim_sets: Vec<u8>,
    pub body_toc: Vec<u8>,
    pub body_texture: Vec<u8>,
}

/// Counters for one layout pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutStats {
    pub curves: usize,
    pub curves_laid_out: usize,
    pub surfaces: usize,
    pub surfaces_laid_out: usize,
    /// Surfaces below the area threshold.
    pub surfaces_culled: usize,
    /// Curves and surfaces with a type code outside the known set.
    pub unsupported: usize,
    /// Curves and surfaces whose payload failed to decode.
    pub decode_failures: usize,
    pub trim_sets_laid_out: usize,
    pub trim_curves: usize,
    /// Trim references to curves that were not laid out.
    pub trim_curves_skipped: usize,
    pub draw_instances: usize,
}

/// Everything a layout pass produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutPlan {
    /// One record per curve id; curves occupy `detail + 1` by 1 texels.
    pub curve_atlas: AtlasLayout,
    /// One record per surface id; `(detail_u + 1) x (detail_v + 1)` texels.
    pub surface_atlas: AtlasLayout,
    /// One record per trim-set id.
    pub trim_atlas: AtlasLayout,
    /// Laid-out trim sets in id order.
    pub trim_rects: Vec<TrimRectInstance>,
    pub eval: EvalBatches,
    pub trim_curves: TrimCurveBatches,
    pub draw_items: DrawItemBatches,
    pub stats: LayoutStats,
}

impl LayoutPlan {
    /// Detail of a laid-out curve.
    pub fn curve_detail(&self, id: CurveId) -> Option<u32> {
        self.curve_atlas.rect(id.index()).map(|r| r[2] as u32 - 1)
    }

    /// `(detail_u, detail_v)` of a laid-out surface, in atlas orientation.
    pub fn surface_detail(&self, id: SurfaceId) -> Option<(u32, u32)> {
        self.surface_atlas
            .rect(id.index())
            .map(|r| (r[2] as u32 - 1, r[3] as u32 - 1))
    }
}

// ---------------------------------------------------------------------------
// Per-item derivation
// ---------------------------------------------------------------------------

/// What the detail pass decided for one item.
#[derive(Debug, Clone, Copy)]
enum Derived<T> {
    Item(T),
    Culled,
    Unsupported,
    Failed,
}

impl<T> Derived<T> {
    fn item(&self) -> Option<&T> {
        match self {
            Derived::Item(item) => Some(item),
            _ => None,
        }
    }

    fn tally(&self, stats: &mut LayoutStats) {
        match self {
            Derived::Item(_) => {}
            Derived::Culled => stats.surfaces_culled += 1,
            Derived::Unsupported => stats.unsupported += 1,
            Derived::Failed => stats.decode_failures += 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CurveItem {
    detail: u32,
    category: CurveCategory,
    addr: TexelAddr,
    flags: CurveFlags,
}

#[derive(Debug, Clone, Copy)]
struct SurfaceItem {
    detail: SurfaceDetail,
    category: SurfaceCategory,
    addr: TexelAddr,
    aux: [f32; 2],
    aux2: [f32; 2],
    trim_set: Option<TrimSetId>,
}

fn classify<T>(what: &str, id: u32, err: CadtexError) -> Derived<T> {
    log::warn!("{what} {id}: {err}; skipped from layout");
    if matches!(err, CadtexError::UnsupportedType { .. }) {
        Derived::Unsupported
    } else {
        Derived::Failed
    }
}

/// Decoded libraries for one layout session.
#[derive(Debug, Clone)]
pub struct LayoutContext {
    curves: CurveLibrary,
    surfaces: SurfaceLibrary,
    trim_sets: TrimSetLibrary,
    bodies: BodyLibrary,
}

impl LayoutContext {
    pub fn new(buffers: LibraryBuffers, codec: FormatCodec) -> Result<Self> {
        let LibraryBuffers {
            curve_toc,
            curve_texture,
            surface_toc,
            surface_texture,
            trim_sets,
            body_toc,
            body_texture,
        } = buffers;
        Ok(Self {
            curves: CurveLibrary::new(curve_toc, curve_texture, codec)?,
            surfaces: SurfaceLibrary::new(surface_toc, surface_texture, codec)?,
            trim_sets: TrimSetLibrary::new(trim_sets, codec)?,
            bodies: BodyLibrary::new(body_toc, body_texture, codec)?,
        })
    }

    pub fn curves(&self) -> &CurveLibrary {
        &self.curves
    }

    pub fn surfaces(&self) -> &SurfaceLibrary {
        &self.surfaces
    }

    pub fn trim_sets(&self) -> &TrimSetLibrary {
        &self.trim_sets
    }

    pub fn bodies(&self) -> &BodyLibrary {
        &self.bodies
    }

    /// End the session and hand the buffers back.
    pub fn into_buffers(self) -> LibraryBuffers {
        let (curve_toc, curve_texture) = self.curves.into_buffers();
        let (surface_toc, surface_texture) = self.surfaces.into_buffers();
        let (body_toc, body_texture) = self.bodies.into_buffers();
        LibraryBuffers {
            curve_toc,
            curve_texture,
            surface_toc,
            surface_texture,
            trim_sets: self.trim_sets.into_buffer(),
            body_toc,
            body_texture,
        }
    }

    /// Run one layout pass.
    ///
    /// `shader_ids[body]` selects the draw batch of each body; missing entries
    /// use shader 0.
    pub fn layout(&self, config: &LayoutConfig, bounding_radius: f64, shader_ids: Option<&[u32]>) -> Result<LayoutPlan> {
        config.validate()?;
        let tolerance = config.error_tolerance(bounding_radius);
        log::debug!("layout pass: bounding radius {bounding_radius}, error tolerance {tolerance}");

        let curves: Vec<Derived<CurveItem>> = (0..self.curves.len() as u32)
            .into_par_iter()
            .map(|i| self.derive_curve(CurveId(i), tolerance, config))
            .collect();
        let surfaces: Vec<Derived<SurfaceItem>> = (0..self.surfaces.len() as u32)
            .into_par_iter()
            .map(|i| self.derive_surface(SurfaceId(i), tolerance, config))
            .collect();

        let mut stats = LayoutStats {
            curves: curves.len(),
            surfaces: surfaces.len(),
            ..LayoutStats::default()
        };
        curves.iter().for_each(|d| d.tally(&mut stats));
        surfaces.iter().for_each(|d| d.tally(&mut stats));

        let curve_atlas = pack_size_classes(
            &curves
                .iter()
                .map(|d| d.item().map(|c| (c.detail + 1, 1)))
                .collect::<Vec<_>>(),
        )?;
        let surface_atlas = pack_size_classes(
            &surfaces
                .iter()
                .map(|d| d.item().map(|s| s.detail.texels()))
                .collect::<Vec<_>>(),
        )?;
        stats.curves_laid_out = curve_atlas.laid_out();
        stats.surfaces_laid_out = surface_atlas.laid_out();

        let eval = eval_batches(&curves, &surfaces, &curve_atlas, &surface_atlas);

        // only trim sets of surfaces that survived culling are rasterized
        let used: BTreeSet<TrimSetId> = surfaces
            .iter()
            .filter_map(|d| d.item().and_then(|s| s.trim_set))
            .collect();
        let trim_sets: Vec<Option<TrimSet>> = (0..self.trim_sets.len() as u32)
            .map(TrimSetId)
            .map(|id| used.contains(&id).then(|| self.trim_sets.trim_set_or_empty(id)))
            .collect();
        let trim_atlas = pack_size_classes(
            &trim_sets
                .iter()
                .map(|set| set.as_ref().map(|set| trim_rect_size(set, config.trim_texel_scale)))
                .collect::<Vec<_>>(),
        )?;
        stats.trim_sets_laid_out = trim_atlas.laid_out();

        let mut trim_curves = TrimCurveBatches::new();
        let mut trim_rects = Vec::with_capacity(used.len());
        for (index, set) in trim_sets.iter().enumerate() {
            let (Some(set), Some(trim_rect)) = (set, trim_atlas.rect(index)) else {
                continue;
            };
            let trim_size = [set.size.x as f32, set.size.y as f32];
            let rasterized = stats.trim_curves;
            for curve_ref in set.curve_refs() {
                let Some(curve_rect) = curve_atlas.rect(curve_ref.curve.index()) else {
                    log::warn!(
                        "trim set {index}: curve {} is not laid out; reference skipped",
                        curve_ref.curve
                    );
                    stats.trim_curves_skipped += 1;
                    continue;
                };
                let instance = TrimCurveInstance::new(trim_rect, trim_size, curve_rect, curve_ref);
                trim_curves.entry(curve_rect[2] as u32 - 1).or_default().push(instance);
                stats.trim_curves += 1;
            }
            trim_rects.push(TrimRectInstance::new(trim_rect, index as u32, stats.trim_curves > rasterized));
        }

        let draw_items = self.draw_batches(&curves, &surfaces, shader_ids);
        stats.draw_instances = draw_items.surface_instances() + draw_items.curve_instances();

        log::info!(
            "layout: {}/{} curves, {}/{} surfaces ({} culled), {} trim sets; atlases {}x{}, {}x{}, {}x{}",
            stats.curves_laid_out,
            stats.curves,
            stats.surfaces_laid_out,
            stats.surfaces,
            stats.surfaces_culled,
            stats.trim_sets_laid_out,
            curve_atlas.width,
            curve_atlas.height,
            surface_atlas.width,
            surface_atlas.height,
            trim_atlas.width,
            trim_atlas.height
        );

        Ok(LayoutPlan {
            curve_atlas,
            surface_atlas,
            trim_atlas,
            trim_rects,
            eval,
            trim_curves,
            draw_items,
            stats,
        })
    }

    fn derive_curve(&self, id: CurveId, tolerance: f64, config: &LayoutConfig) -> Derived<CurveItem> {
        let derive = || -> Result<CurveItem> {
            let curve_type = self.curves.curve_type(id)?;
            // a payload that does not decode is never laid out
            self.curves.curve_data(id)?;
            let dims = self.curves.curve_dims(id)?;
            Ok(CurveItem {
                detail: curve_detail(&dims, tolerance, config),
                category: curve_type.category(),
                addr: self.curves.curve_texel_coords(id)?,
                flags: dims.flags,
            })
        };
        derive().map_or_else(|err| classify("curve", id.0, err), Derived::Item)
    }

    fn derive_surface(&self, id: SurfaceId, tolerance: f64, config: &LayoutConfig) -> Derived<SurfaceItem> {
        let derive = || -> Result<Option<SurfaceItem>> {
            let surface_type = self.surfaces.surface_type(id)?;
            let data = self.surfaces.surface_data(id, &self.curves)?;
            let mut dims = self.surfaces.surface_dims(id, true)?;
            if let Some(trim_set) = dims.trim_set.filter(|t| t.index() >= self.trim_sets.len()) {
                log::warn!("surface {id}: trim set {trim_set} does not exist; drawn untrimmed");
                dims.trim_set = None;
            }
            let detail = match &data.geometry {
                SurfaceGeometry::Fan(fan) => {
                    if dims.area() < config.surface_area_threshold {
                        None
                    } else {
                        Some(fan_detail(fan.points.len(), dims.flags, config))
                    }
                }
                _ => surface_detail(&dims, tolerance, config),
            };
            let Some(detail) = detail else {
                return Ok(None);
            };

            let refs = self.surfaces.surface_refs(id)?;
            let mut aux = [0.0; 2];
            let mut aux2 = [0.0; 2];
            if let Some(curve) = refs.curve {
                aux = self.curves.curve_texel_coords(curve)?.to_array();
            }
            if let Some(basis) = refs.basis {
                aux = self.surfaces.surface_texel_coords(basis)?.to_array();
                if let Some(curve) = self.surfaces.surface_refs(basis)?.curve {
                    aux2 = self.curves.curve_texel_coords(curve)?.to_array();
                }
            }
            Ok(Some(SurfaceItem {
                detail,
                category: surface_type.category(),
                addr: self.surfaces.surface_texel_coords(id)?,
                aux,
                aux2,
                trim_set: dims.trim_set,
            }))
        };
        match derive() {
            Ok(Some(item)) => Derived::Item(item),
            Ok(None) => Derived::Culled,
            Err(err) => classify("surface", id.0, err),
        }
    }

    fn draw_batches(
        &self,
        curves: &[Derived<CurveItem>],
        surfaces: &[Derived<SurfaceItem>],
        shader_ids: Option<&[u32]>,
    ) -> DrawItemBatches {
        let mut batches = DrawItemBatches::default();
        for body_index in 0..self.bodies.len() as u32 {
            let body = self.bodies.body_or_empty(BodyId(body_index));
            let shader_id = shader_ids
                .and_then(|ids| ids.get(body_index as usize))
                .copied()
                .unwrap_or(0);

            for (k, item_ref) in body.surfaces.iter().enumerate() {
                let Some(item) = surfaces.get(item_ref.id as usize).and_then(Derived::item) else {
                    continue;
                };
                let key = SurfaceBatchKey {
                    shader_id,
                    category: item.category,
                    detail: DetailKey {
                        u: item.detail.detail_u,
                        v: item.detail.detail_v,
                    },
                };
                batches.push_surface(
                    key,
                    [
                        body_index as f32,
                        k as f32,
                        item_ref.id as f32,
                        TrimSetId::to_signed(item.trim_set) as f32,
                    ],
                );
            }

            // curve draw items are numbered after the body's surfaces
            let first_curve = body.surfaces.len();
            for (k, item_ref) in body.curves.iter().enumerate() {
                let Some(item) = curves.get(item_ref.id as usize).and_then(Derived::item) else {
                    continue;
                };
                let key = CurveBatchKey {
                    shader_id,
                    detail: item.detail,
                };
                batches.push_curve(
                    key,
                    [body_index as f32, (first_curve + k) as f32, item_ref.id as f32, -1.0],
                );
            }
        }
        batches
    }
}

/// Fans sample one vertex per U step and have no V extent.
fn fan_detail(num_points: usize, flags: SurfaceFlags, config: &LayoutConfig) -> SurfaceDetail {
    let segments = (num_points.saturating_sub(1).max(1) as u32).next_power_of_two();
    SurfaceDetail {
        detail_u: segments.min(max_pow2(config.clamped_max_detail())),
        detail_v: 1,
        flags,
    }
}

/// Texel footprint of a trim set: its size scaled, rounded up, at least 1x1.
pub fn trim_rect_size(set: &TrimSet, scale: f64) -> (u32, u32) {
    let side = |v: f64| {
        let scaled = (v * scale).ceil();
        if scaled.is_finite() && scaled > 1.0 {
            scaled as u32
        } else {
            1
        }
    };
    (side(set.size.x), side(set.size.y))
}

fn eval_batches(
    curves: &[Derived<CurveItem>],
    surfaces: &[Derived<SurfaceItem>],
    curve_atlas: &AtlasLayout,
    surface_atlas: &AtlasLayout,
) -> EvalBatches {
    let mut batches = EvalBatches::default();
    for (index, item) in curves.iter().enumerate() {
        let (Some(item), Some(rect)) = (item.item(), curve_atlas.rect(index)) else {
            continue;
        };
        let instance = GeomEvalInstance::new(rect, item.addr, item.flags.bits(), index as u32);
        batches.curves.entry(item.category).or_default().push(instance);
    }
    for (index, item) in surfaces.iter().enumerate() {
        let (Some(item), Some(rect)) = (item.item(), surface_atlas.rect(index)) else {
            continue;
        };
        let mut instance = GeomEvalInstance::new(rect, item.addr, item.detail.flags.bits(), index as u32);
        instance.aux_addr = item.aux;
        instance.aux2_addr = item.aux2;
        batches.surfaces.entry(item.category).or_default().push(instance);
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadtex_math::Vector2;

    fn set(w: f64, h: f64) -> TrimSet {
        TrimSet {
            size: Vector2::new(w, h),
            perimeter: Vec::new(),
            holes: Vec::new(),
        }
    }

    #[test]
    fn test_trim_rect_size() {
        assert_eq!(trim_rect_size(&set(10.2, 3.0), 1.0), (11, 3));
        assert_eq!(trim_rect_size(&set(10.0, 3.0), 2.0), (20, 6));
        assert_eq!(trim_rect_size(&set(0.0, 0.0), 1.0), (1, 1));
        assert_eq!(trim_rect_size(&set(f64::NAN, -4.0), 1.0), (1, 1));
    }

    #[test]
    fn test_fan_detail() {
        let config = LayoutConfig::default();
        let flags = SurfaceFlags::FLIPPED_NORMAL;
        assert_eq!(fan_detail(3, flags, &config).detail_u, 2);
        assert_eq!(fan_detail(6, flags, &config).detail_u, 8);
        assert_eq!(fan_detail(1, flags, &config).detail_u, 1);
        assert_eq!(fan_detail(6, flags, &config).detail_v, 1);
        assert_eq!(fan_detail(6, flags, &config).flags, flags);
    }
}
