//! Rational B-spline curves.

use cadtex_core::{CadtexError, Result};
use cadtex_math::{DVec4, Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::basis::calc_basis_values;
use super::knot::{KnotVector, KnotWindow, MAX_DEGREE};
use super::{control_point_tangent, is_usable_weight, DEGENERATE_SPAN_RATIO, DEGENERATE_TANGENT};
use crate::curve::CurvePoint;
use crate::flags::NurbsFlags;

/// A NURBS curve. Control points are `(x, y, z, weight)` with Cartesian `xyz`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NurbsCurve {
    pub degree: usize,
    pub control_points: Vec<DVec4>,
    pub knots: KnotVector,
    pub flags: NurbsFlags,
    range: (f64, f64),
}

impl NurbsCurve {
    pub fn new(degree: usize, control_points: Vec<DVec4>, knots: KnotVector, flags: NurbsFlags) -> Result<Self> {
        validate_dimensions("curve", degree, control_points.len(), knots.len())?;
        let range = knots.valid_range(degree, control_points.len());
        Ok(Self {
            degree,
            control_points,
            knots,
            flags,
            range,
        })
    }

    /// Parameter range spanned by the valid knots.
    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    fn cp(&self, i: usize) -> Point3 {
        self.control_points[i].truncate()
    }

    /// Evaluate position and tangent at absolute parameter `t`.
    pub fn evaluate(&self, t: f64) -> CurvePoint {
        let p = self.degree;
        let n = self.control_points.len();
        let mut window = KnotWindow::new(p);
        let span = self.knots.find_span(t, p, n, &mut window);

        let mut basis = [0.0; MAX_DEGREE + 1];
        let mut derivs = [0.0; MAX_DEGREE + 1];
        calc_basis_values(t, &window, &mut basis, Some(&mut derivs));

        let mut a = Vector3::ZERO;
        let mut da = Vector3::ZERO;
        let mut w = 0.0;
        let mut dw = 0.0;
        for i in 0..=p {
            let cp = self.control_points[span - p + i];
            let bw = basis[i] * cp.w;
            let dbw = derivs[i] * cp.w;
            a += bw * cp.truncate();
            da += dbw * cp.truncate();
            w += bw;
            dw += dbw;
        }

        if !is_usable_weight(w) {
            log::warn!("NURBS curve has unusable homogeneous weight {w} at t={t}");
            return CurvePoint {
                position: a,
                tangent: da,
                valid: false,
            };
        }

        let position = a / w;
        let mut tangent = (da - dw * position) / w;

        let domain = self.range.1 - self.range.0;
        if domain > 0.0 {
            let span_ratio = window.span_width() / domain;
            if span_ratio < DEGENERATE_SPAN_RATIO || tangent.length() * domain < DEGENERATE_TANGENT {
                let near_end = (t - self.range.0) / domain > 0.5;
                if let Some(corrected) = control_point_tangent(n, |i| self.cp(i), span - p, span, near_end) {
                    log::debug!("corrected degenerate curve tangent at t={t} (span ratio {span_ratio:.4})");
                    tangent = corrected;
                }
            }
        }

        CurvePoint {
            position,
            tangent,
            valid: true,
        }
    }
}

/// Shared dimension checks for NURBS payloads.
pub(crate) fn validate_dimensions(what: &str, degree: usize, num_cps: usize, num_knots: usize) -> Result<()> {
    if degree == 0 || degree > MAX_DEGREE {
        return Err(CadtexError::Geometry(format!(
            "NURBS {what} degree {degree} outside [1, {MAX_DEGREE}]"
        )));
    }
    if num_cps <= degree {
        return Err(CadtexError::Geometry(format!(
            "NURBS {what} needs more than {degree} control points, got {num_cps}"
        )));
    }
    if num_knots != num_cps + degree + 1 {
        return Err(CadtexError::Geometry(format!(
            "NURBS {what} knot count {num_knots} != {num_cps} + {degree} + 1"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use cadtex_math::DVec3;

    fn dvec4(x: f64, y: f64, z: f64, w: f64) -> DVec4 {
        DVec4::new(x, y, z, w)
    }

    fn quarter_circle() -> NurbsCurve {
        let s = std::f64::consts::FRAC_1_SQRT_2;
        NurbsCurve::new(
            2,
            vec![dvec4(1.0, 0.0, 0.0, 1.0), dvec4(1.0, 1.0, 0.0, s), dvec4(0.0, 1.0, 0.0, 1.0)],
            KnotVector::absolute(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]),
            NurbsFlags::empty(),
        )
        .unwrap()
    }

    #[test]
    fn test_rational_quarter_circle_on_circle() {
        let curve = quarter_circle();
        for i in 0..=10 {
            let pt = curve.evaluate(i as f64 / 10.0);
            assert!(pt.valid);
            assert_abs_diff_eq!(pt.position.length(), 1.0, epsilon = 1e-12);
            // tangent is perpendicular to the radius
            assert_abs_diff_eq!(pt.position.dot(pt.tangent), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_zero_weights_flagged_invalid() {
        let curve = NurbsCurve::new(
            1,
            vec![dvec4(0.0, 0.0, 0.0, 0.0), dvec4(1.0, 0.0, 0.0, 0.0)],
            KnotVector::absolute(vec![0.0, 0.0, 1.0, 1.0]),
            NurbsFlags::empty(),
        )
        .unwrap();
        assert!(!curve.evaluate(0.5).valid);
    }

    #[test]
    fn test_collapsed_end_tangent_is_corrected() {
        // the last two control points coincide, so the end derivative vanishes
        let curve = NurbsCurve::new(
            2,
            vec![
                dvec4(0.0, 0.0, 0.0, 1.0),
                dvec4(1.0, 0.0, 0.0, 1.0),
                dvec4(1.0, 0.0, 0.0, 1.0),
            ],
            KnotVector::absolute(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]),
            NurbsFlags::empty(),
        )
        .unwrap();
        let pt = curve.evaluate(1.0);
        assert!(pt.valid);
        assert!(pt.tangent.length() > 0.5);
        assert_abs_diff_eq!(pt.tangent.normalize().dot(DVec3::X), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_bad_knot_count() {
        let err = NurbsCurve::new(
            2,
            vec![dvec4(0.0, 0.0, 0.0, 1.0); 3],
            KnotVector::absolute(vec![0.0, 0.0, 1.0, 1.0]),
            NurbsFlags::empty(),
        );
        assert!(err.is_err());
    }
}
