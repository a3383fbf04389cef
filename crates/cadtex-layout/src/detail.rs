//! Per-item tessellation detail from curvature and size.

use cadtex_codec::{CurveDims, SurfaceDims};
use cadtex_core::LayoutConfig;
use cadtex_geometry::{CurveFlags, SurfaceFlags};
use serde::{Deserialize, Serialize};

/// Largest power of two not above `max`, and at least 1.
pub fn max_pow2(max: u32) -> u32 {
    if max <= 1 {
        1
    } else {
        1 << (31 - max.leading_zeros())
    }
}

/// Round to the nearest power of two in log space, clamped to `[1, max_detail]`.
pub fn round_pow2(value: f64, max_detail: u32) -> u32 {
    let limit = max_pow2(max_detail);
    if !(value > 1.0) {
        return 1;
    }
    let exp = value.log2().round();
    if exp >= limit.trailing_zeros() as f64 {
        limit
    } else {
        1 << exp as u32
    }
}

/// Segments needed to keep an arc of total turning `curvature` and length
/// `length` within `tolerance` of its chords, before rounding.
///
/// Zero or NaN curvature is a straight run and needs one segment; infinite
/// curvature needs as many as the clamp allows.
pub fn arc_segments(curvature: f64, length: f64, tolerance: f64, config: &LayoutConfig) -> f64 {
    let curvature = curvature.abs();
    if curvature == 0.0 || curvature.is_nan() {
        return 1.0;
    }
    if curvature.is_infinite() {
        return f64::INFINITY;
    }
    if !(tolerance > 0.0) {
        return f64::INFINITY;
    }
    let radius = length / curvature;
    if !(radius > tolerance) {
        return config.fallback_detail as f64;
    }
    let arc_angle = 2.0 * ((radius - tolerance) / radius).acos();
    if !(arc_angle > 0.0) {
        return f64::INFINITY;
    }
    (curvature / arc_angle).ceil()
}

/// Detail along one axis. With `cost_is_detail`, `param` already is the detail.
pub fn axis_detail(param: f64, length: f64, cost_is_detail: bool, tolerance: f64, config: &LayoutConfig) -> u32 {
    let max = config.clamped_max_detail();
    if cost_is_detail {
        return round_pow2(param, max);
    }
    round_pow2(arc_segments(param, length, tolerance, config), max)
}

pub fn curve_detail(dims: &CurveDims, tolerance: f64, config: &LayoutConfig) -> u32 {
    axis_detail(
        dims.param as f64,
        dims.length as f64,
        dims.flags.contains(CurveFlags::COST_IS_DETAIL),
        tolerance,
        config,
    )
}

/// Tessellation of a surface in atlas orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceDetail {
    pub detail_u: u32,
    pub detail_v: u32,
    /// TOC flags, transposed when the axes were swapped.
    pub flags: SurfaceFlags,
}

impl SurfaceDetail {
    /// Texel footprint `(detail_u + 1, detail_v + 1)`.
    pub fn texels(&self) -> (u32, u32) {
        (self.detail_u + 1, self.detail_v + 1)
    }
}

/// Detail for both axes, or `None` when the surface is too small to lay out.
///
/// The larger detail always ends up on U so that equal footprints share a
/// size class regardless of orientation.
pub fn surface_detail(dims: &SurfaceDims, tolerance: f64, config: &LayoutConfig) -> Option<SurfaceDetail> {
    if dims.area() < config.surface_area_threshold {
        return None;
    }
    let detail_u = axis_detail(
        dims.curvature_u as f64,
        dims.size_u as f64,
        dims.flags.contains(SurfaceFlags::COST_IS_DETAIL_U),
        tolerance,
        config,
    );
    let detail_v = axis_detail(
        dims.curvature_v as f64,
        dims.size_v as f64,
        dims.flags.contains(SurfaceFlags::COST_IS_DETAIL_V),
        tolerance,
        config,
    );
    Some(if detail_u < detail_v {
        SurfaceDetail {
            detail_u: detail_v,
            detail_v: detail_u,
            flags: dims.flags.transposed(),
        }
    } else {
        SurfaceDetail {
            detail_u,
            detail_v,
            flags: dims.flags,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    fn surface(curvature_u: f32, curvature_v: f32) -> SurfaceDims {
        SurfaceDims {
            curvature_u,
            curvature_v,
            size_u: 10.0,
            size_v: 10.0,
            flags: SurfaceFlags::empty(),
            trim_set: None,
        }
    }

    #[test]
    fn test_round_pow2() {
        assert_eq!(round_pow2(0.0, 1024), 1);
        assert_eq!(round_pow2(f64::NAN, 1024), 1);
        assert_eq!(round_pow2(3.0, 1024), 4);
        assert_eq!(round_pow2(5.0, 1024), 4);
        assert_eq!(round_pow2(6.0, 1024), 8);
        assert_eq!(round_pow2(1e9, 1024), 1024);
        assert_eq!(round_pow2(f64::INFINITY, 1024), 1024);
        assert_eq!(round_pow2(100.0, 1000), 128);
        assert_eq!(round_pow2(1e9, 1000), 512);
    }

    #[test]
    fn test_detail_always_pow2_in_range() {
        let config = LayoutConfig::default();
        for i in 0..200 {
            let curvature = i as f64 * 0.37;
            for &length in &[0.0, 0.01, 1.0, 55.0, 1e4] {
                for &tol in &[0.0, 1e-4, 0.1, 3.0] {
                    let d = axis_detail(curvature, length, false, tol, &config);
                    assert!(d.is_power_of_two() && (1..=1024).contains(&d), "{d}");
                }
            }
        }
    }

    #[test]
    fn test_zero_curvature_is_one() {
        let config = LayoutConfig::default();
        let d = surface_detail(&surface(0.0, TAU as f32), 0.01, &config).unwrap();
        // the curved axis moves to U
        assert_eq!(d.detail_v, 1);
        assert!(d.detail_u > 1);
        assert!(d.flags.contains(SurfaceFlags::FLIPPED_UV));
    }

    #[test]
    fn test_full_circle_segments() {
        // r = 10, tolerance at 32 segments per circle
        let config = LayoutConfig::default();
        let tol = config.error_tolerance(10.0);
        let d = axis_detail(TAU, TAU * 10.0, false, tol, &config);
        assert_eq!(d, 32);
    }

    #[test]
    fn test_small_radius_uses_fallback() {
        let config = LayoutConfig::default();
        // radius 0.001 below a tolerance of 0.1: fallback 6 rounds to 8
        assert_eq!(axis_detail(TAU, TAU * 0.001, false, 0.1, &config), 8);
    }

    #[test]
    fn test_infinite_curvature_is_max_detail() {
        let config = LayoutConfig::default();
        let max = max_pow2(config.clamped_max_detail());
        assert_eq!(axis_detail(f64::INFINITY, 10.0, false, 0.01, &config), max);
        // an overflowed half float decodes to inf as well
        let overflowed = f32::INFINITY as f64;
        assert_eq!(axis_detail(overflowed, 1.0, false, 0.5, &config), max);
        assert_eq!(axis_detail(f64::NAN, 10.0, false, 0.01, &config), 1);
        assert_eq!(axis_detail(0.0, 10.0, false, 0.01, &config), 1);
    }

    #[test]
    fn test_cost_is_detail() {
        let config = LayoutConfig::default();
        let dims = CurveDims {
            param: 16.0,
            length: 1.0,
            flags: CurveFlags::COST_IS_DETAIL,
        };
        assert_eq!(curve_detail(&dims, 0.5, &config), 16);
    }

    #[test]
    fn test_area_threshold_culls() {
        let config = LayoutConfig {
            surface_area_threshold: 101.0,
            ..LayoutConfig::default()
        };
        assert!(surface_detail(&surface(1.0, 1.0), 0.01, &config).is_none());
    }
}
