//! CPU tessellation over the same uniform grids the atlas stores.
//!
//! A curve of detail `d` occupies `d + 1` texels; a surface of detail
//! `(du, dv)` occupies `(du + 1) x (dv + 1)` texels, row-major with U along x.
//! These functions produce exactly those samples and serve as the reference
//! for the GPU evaluation passes.

use cadtex_math::{Point3, Vector3};

use crate::curve::CurveData;
use crate::flags::SurfaceFlags;
use crate::surface::SurfaceData;

/// Sample a curve at `detail + 1` evenly spaced normalized parameters.
pub fn tessellate_curve(curve: &CurveData, detail: u32) -> Vec<Point3> {
    let detail = detail.max(1);
    (0..=detail)
        .map(|i| curve.eval_normalized(i as f64 / detail as f64).position)
        .collect()
}

/// A sampled surface grid.
#[derive(Debug, Clone)]
pub struct TessellatedSurface {
    pub detail_u: u32,
    pub detail_v: u32,
    pub positions: Vec<Point3>,
    pub normals: Vec<Vector3>,
    /// False where evaluation hit an unusable rational weight.
    pub valid: Vec<bool>,
}

impl TessellatedSurface {
    pub fn columns(&self) -> usize {
        self.detail_u as usize + 1
    }

    pub fn rows(&self) -> usize {
        self.detail_v as usize + 1
    }

    pub fn index(&self, i: usize, j: usize) -> usize {
        j * self.columns() + i
    }

    pub fn invalid_count(&self) -> usize {
        self.valid.iter().filter(|v| !**v).count()
    }

    /// Two triangles per grid quad, skipping quads that touch an invalid sample.
    pub fn to_triangles(&self) -> Vec<[u32; 3]> {
        let mut triangles = Vec::with_capacity(self.detail_u as usize * self.detail_v as usize * 2);
        for j in 0..self.rows() - 1 {
            for i in 0..self.columns() - 1 {
                let corners = [
                    self.index(i, j),
                    self.index(i + 1, j),
                    self.index(i + 1, j + 1),
                    self.index(i, j + 1),
                ];
                if corners.iter().any(|&c| !self.valid[c]) {
                    continue;
                }
                let [a, b, c, d] = corners.map(|c| c as u32);
                triangles.push([a, b, c]);
                triangles.push([a, c, d]);
            }
        }
        triangles
    }
}

/// Sample a surface on a `(detail_u + 1) x (detail_v + 1)` grid of normalized parameters.
pub fn tessellate_surface(surface: &SurfaceData, flags: SurfaceFlags, detail_u: u32, detail_v: u32) -> TessellatedSurface {
    let detail_u = detail_u.max(1);
    let detail_v = detail_v.max(1);
    let total = (detail_u as usize + 1) * (detail_v as usize + 1);

    let mut positions = Vec::with_capacity(total);
    let mut normals = Vec::with_capacity(total);
    let mut valid = Vec::with_capacity(total);

    for j in 0..=detail_v {
        let v = j as f64 / detail_v as f64;
        for i in 0..=detail_u {
            let u = i as f64 / detail_u as f64;
            let pt = surface.eval_normalized(u, v, flags);
            positions.push(pt.position);
            normals.push(pt.normal);
            valid.push(pt.valid);
        }
    }

    let tess = TessellatedSurface {
        detail_u,
        detail_v,
        positions,
        normals,
        valid,
    };
    let invalid = tess.invalid_count();
    if invalid > 0 {
        log::warn!("{invalid} of {total} surface samples could not be evaluated");
    }
    tess
}
