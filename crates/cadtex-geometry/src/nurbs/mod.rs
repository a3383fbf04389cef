//! NURBS core algorithms: knot spans, basis functions and rational evaluation.

pub mod basis;
pub mod curve;
pub mod knot;
pub mod surface;

pub use basis::calc_basis_values;
pub use curve::NurbsCurve;
pub use knot::{KnotEncoding, KnotVector, KnotWindow, MAX_DEGREE};
pub use surface::NurbsSurface;

/// A knot span narrower than this fraction of the domain is treated as degenerate.
pub const DEGENERATE_SPAN_RATIO: f64 = 0.01;

/// A tangent (per unit of normalized parameter) shorter than this is treated as degenerate.
pub const DEGENERATE_TANGENT: f64 = 0.05;

/// Control points closer than this are considered coincident when walking for a tangent.
const COINCIDENT_CPS: f64 = 1e-12;

/// Whether a homogeneous weight can be divided by.
pub fn is_usable_weight(w: f64) -> bool {
    w.is_finite() && w != 0.0
}

/// Estimate a tangent from a run of control points when the analytic one collapsed.
///
/// `points` are the control points along the parameter direction, `first` and
/// `last` bound the active window. Near the end of the range the walk goes
/// backward from `last`, otherwise forward from `first`, skipping coincident
/// points so that the estimate comes from the non-degenerate side.
fn control_point_tangent<F>(count: usize, point: F, first: usize, last: usize, near_end: bool) -> Option<cadtex_math::Vector3>
where
    F: Fn(usize) -> cadtex_math::Point3,
{
    if count < 2 {
        return None;
    }
    let last = last.min(count - 1);
    if near_end {
        let mut i = last.max(1);
        loop {
            let d = point(i) - point(i - 1);
            if d.length() > COINCIDENT_CPS {
                return Some(d);
            }
            if i == 1 {
                return None;
            }
            i -= 1;
        }
    } else {
        let mut i = first.min(count - 2);
        loop {
            let d = point(i + 1) - point(i);
            if d.length() > COINCIDENT_CPS {
                return Some(d);
            }
            if i + 2 >= count {
                return None;
            }
            i += 1;
        }
    }
}
