//! Rational B-spline surfaces.

use cadtex_core::Result;
use cadtex_math::{DVec4, Vector3};
use serde::{Deserialize, Serialize};

use super::basis::calc_basis_values;
use super::curve::validate_dimensions;
use super::knot::{KnotVector, KnotWindow, MAX_DEGREE};
use super::{control_point_tangent, is_usable_weight, DEGENERATE_SPAN_RATIO, DEGENERATE_TANGENT};
use crate::flags::NurbsFlags;
use crate::surface::SurfacePoint;

/// A NURBS surface over a `num_cps_u x num_cps_v` grid stored with U fastest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NurbsSurface {
    pub degree_u: usize,
    pub degree_v: usize,
    pub num_cps_u: usize,
    pub num_cps_v: usize,
    pub control_points: Vec<DVec4>,
    pub knots_u: KnotVector,
    pub knots_v: KnotVector,
    pub flags: NurbsFlags,
    range_u: (f64, f64),
    range_v: (f64, f64),
}

/// Per-direction span evaluation.
struct AxisBasis {
    span: usize,
    window: KnotWindow,
    basis: [f64; MAX_DEGREE + 1],
    derivs: [f64; MAX_DEGREE + 1],
}

impl AxisBasis {
    fn eval(knots: &KnotVector, degree: usize, num_cps: usize, t: f64) -> Self {
        let mut window = KnotWindow::new(degree);
        let span = knots.find_span(t, degree, num_cps, &mut window);
        let mut basis = [0.0; MAX_DEGREE + 1];
        let mut derivs = [0.0; MAX_DEGREE + 1];
        calc_basis_values(t, &window, &mut basis, Some(&mut derivs));
        Self {
            span,
            window,
            basis,
            derivs,
        }
    }

    /// Index, within the active window, of the largest basis value.
    fn dominant(&self, degree: usize) -> usize {
        let mut best = 0;
        for i in 1..=degree {
            if self.basis[i] > self.basis[best] {
                best = i;
            }
        }
        best
    }
}

impl NurbsSurface {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        degree_u: usize,
        degree_v: usize,
        num_cps_u: usize,
        num_cps_v: usize,
        control_points: Vec<DVec4>,
        knots_u: KnotVector,
        knots_v: KnotVector,
        flags: NurbsFlags,
    ) -> Result<Self> {
        validate_dimensions("surface U", degree_u, num_cps_u, knots_u.len())?;
        validate_dimensions("surface V", degree_v, num_cps_v, knots_v.len())?;
        if control_points.len() != num_cps_u * num_cps_v {
            return Err(cadtex_core::CadtexError::Geometry(format!(
                "NURBS surface has {} control points, expected {} x {}",
                control_points.len(),
                num_cps_u,
                num_cps_v
            )));
        }
        let range_u = knots_u.valid_range(degree_u, num_cps_u);
        let range_v = knots_v.valid_range(degree_v, num_cps_v);
        Ok(Self {
            degree_u,
            degree_v,
            num_cps_u,
            num_cps_v,
            control_points,
            knots_u,
            knots_v,
            flags,
            range_u,
            range_v,
        })
    }

    pub fn range_u(&self) -> (f64, f64) {
        self.range_u
    }

    pub fn range_v(&self) -> (f64, f64) {
        self.range_v
    }

    fn cp(&self, i: usize, j: usize) -> DVec4 {
        self.control_points[j * self.num_cps_u + i]
    }

    /// Evaluate position, tangents and normal at absolute parameters `(u, v)`.
    pub fn evaluate(&self, u: f64, v: f64) -> SurfacePoint {
        let (pu, pv) = (self.degree_u, self.degree_v);
        let bu = AxisBasis::eval(&self.knots_u, pu, self.num_cps_u, u);
        let bv = AxisBasis::eval(&self.knots_v, pv, self.num_cps_v, v);

        let mut a = Vector3::ZERO;
        let mut a_u = Vector3::ZERO;
        let mut a_v = Vector3::ZERO;
        let (mut w, mut w_u, mut w_v) = (0.0, 0.0, 0.0);

        for j in 0..=pv {
            let row = bv.span - pv + j;
            for i in 0..=pu {
                let cp = self.cp(bu.span - pu + i, row);
                let pos = cp.truncate();
                let buv = bu.basis[i] * bv.basis[j] * cp.w;
                let dbu = bu.derivs[i] * bv.basis[j] * cp.w;
                let dbv = bu.basis[i] * bv.derivs[j] * cp.w;
                a += buv * pos;
                a_u += dbu * pos;
                a_v += dbv * pos;
                w += buv;
                w_u += dbu;
                w_v += dbv;
            }
        }

        if !is_usable_weight(w) {
            log::warn!("NURBS surface has unusable homogeneous weight {w} at ({u}, {v})");
            return SurfacePoint::invalid(a);
        }

        let position = a / w;
        let mut tangent_u = (a_u - w_u * position) / w;
        let mut tangent_v = (a_v - w_v * position) / w;

        let domain_u = self.range_u.1 - self.range_u.0;
        let domain_v = self.range_v.1 - self.range_v.0;
        let u_near_end = domain_u > 0.0 && (u - self.range_u.0) / domain_u > 0.5;
        let v_near_end = domain_v > 0.0 && (v - self.range_v.0) / domain_v > 0.5;

        if domain_u > 0.0 && is_degenerate(bu.window.span_width(), tangent_u, domain_u) {
            let rows = walk_order(bv.span - pv + bv.dominant(pv), self.num_cps_v, v_near_end);
            let corrected = rows.into_iter().find_map(|row| {
                control_point_tangent(
                    self.num_cps_u,
                    |i| self.cp(i, row).truncate(),
                    bu.span - pu,
                    bu.span,
                    u_near_end,
                )
            });
            if let Some(t) = corrected {
                log::debug!("corrected degenerate U tangent at ({u}, {v})");
                tangent_u = t;
            }
        }

        if domain_v > 0.0 && is_degenerate(bv.window.span_width(), tangent_v, domain_v) {
            let cols = walk_order(bu.span - pu + bu.dominant(pu), self.num_cps_u, u_near_end);
            let corrected = cols.into_iter().find_map(|col| {
                control_point_tangent(
                    self.num_cps_v,
                    |j| self.cp(col, j).truncate(),
                    bv.span - pv,
                    bv.span,
                    v_near_end,
                )
            });
            if let Some(t) = corrected {
                log::debug!("corrected degenerate V tangent at ({u}, {v})");
                tangent_v = t;
            }
        }

        SurfacePoint::from_tangents(position, tangent_u, tangent_v)
    }
}

/// Rows (or columns) to try for a tangent estimate: the dominant one first, then
/// walking toward the interior of the patch, then the remaining ones.
fn walk_order(start: usize, count: usize, near_end: bool) -> Vec<usize> {
    let start = start.min(count.saturating_sub(1));
    let mut order = Vec::with_capacity(count);
    order.push(start);
    if near_end {
        order.extend((0..start).rev());
        order.extend(start + 1..count);
    } else {
        order.extend(start + 1..count);
        order.extend((0..start).rev());
    }
    order
}

fn is_degenerate(span_width: f64, tangent: Vector3, domain: f64) -> bool {
    span_width / domain < DEGENERATE_SPAN_RATIO || tangent.length() * domain < DEGENERATE_TANGENT
}
