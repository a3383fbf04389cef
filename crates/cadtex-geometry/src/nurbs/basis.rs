//! B-spline basis functions over a knot window.

use super::knot::{KnotWindow, MAX_DEGREE};

/// Compute the `degree + 1` non-vanishing basis values at `u`.
///
/// When `derivs` is given it receives the first derivative of each basis
/// function. The derivative is taken from the degree `p - 1` values right
/// before the last round of the triangular recurrence.
pub fn calc_basis_values(u: f64, window: &KnotWindow, basis: &mut [f64], mut derivs: Option<&mut [f64]>) {
    let p = window.degree;
    debug_assert!(p <= MAX_DEGREE);
    debug_assert!(basis.len() > p);

    let w = &window.values;
    let mut left = [0.0; MAX_DEGREE + 1];
    let mut right = [0.0; MAX_DEGREE + 1];

    basis[0] = 1.0;
    if p == 0 {
        if let Some(d) = derivs {
            d[0] = 0.0;
        }
        return;
    }

    for j in 1..=p {
        if j == p {
            if let Some(d) = derivs.as_deref_mut() {
                first_derivatives(p, w, &basis[..p], d);
            }
        }

        left[j] = u - w[p + 1 - j];
        right[j] = w[p + j] - u;
        let mut saved = 0.0;
        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            let temp = if denom != 0.0 { basis[r] / denom } else { 0.0 };
            basis[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        basis[j] = saved;
    }
}

/// `N'_{k,p} = p * (N_{k,p-1} / (u_{k+p} - u_k) - N_{k+1,p-1} / (u_{k+p+1} - u_{k+1}))`
/// expressed in window indices.
fn first_derivatives(p: usize, w: &[f64], lower: &[f64], out: &mut [f64]) {
    let scale = p as f64;
    for k in 0..=p {
        let mut d = 0.0;
        if k >= 1 {
            let denom = w[p + k] - w[k];
            if denom != 0.0 {
                d += lower[k - 1] / denom;
            }
        }
        if k < p {
            let denom = w[p + k + 1] - w[k + 1];
            if denom != 0.0 {
                d -= lower[k] / denom;
            }
        }
        out[k] = scale * d;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nurbs::knot::KnotVector;
    use approx::assert_abs_diff_eq;

    fn eval(knots: &KnotVector, degree: usize, num_cps: usize, u: f64) -> (Vec<f64>, Vec<f64>) {
        let mut window = KnotWindow::new(degree);
        knots.find_span(u, degree, num_cps, &mut window);
        let mut basis = vec![0.0; degree + 1];
        let mut derivs = vec![0.0; degree + 1];
        calc_basis_values(u, &window, &mut basis, Some(&mut derivs));
        (basis, derivs)
    }

    #[test]
    fn test_partition_of_unity() {
        let knots = KnotVector::absolute(vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 3.0, 3.0]);
        for i in 0..=30 {
            let u = i as f64 * 0.1;
            let (basis, derivs) = eval(&knots, 2, 5, u);
            assert_abs_diff_eq!(basis.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
            // derivatives of a partition of unity sum to zero
            assert_abs_diff_eq!(derivs.iter().sum::<f64>(), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_linear_derivative() {
        let knots = KnotVector::absolute(vec![0.0, 0.0, 2.0, 2.0]);
        let (basis, derivs) = eval(&knots, 1, 2, 0.5);
        assert_abs_diff_eq!(basis[0], 0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(basis[1], 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(derivs[0], -0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(derivs[1], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_cubic_bezier_derivatives_match_finite_difference() {
        let knots = KnotVector::absolute(vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
        let h = 1e-6;
        for &u in &[0.2, 0.5, 0.8] {
            let (_, derivs) = eval(&knots, 3, 4, u);
            let (b0, _) = eval(&knots, 3, 4, u - h);
            let (b1, _) = eval(&knots, 3, 4, u + h);
            for k in 0..4 {
                let fd = (b1[k] - b0[k]) / (2.0 * h);
                assert_abs_diff_eq!(derivs[k], fd, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_non_negative() {
        let knots = KnotVector::absolute(vec![0.0, 0.0, 0.0, 0.0, 0.3, 0.7, 1.0, 1.0, 1.0, 1.0]);
        for i in 0..=20 {
            let u = i as f64 / 20.0;
            let (basis, _) = eval(&knots, 3, 6, u);
            for (j, &val) in basis.iter().enumerate() {
                assert!(val >= -1e-15, "negative basis at u={}, j={}: {}", u, j, val);
            }
        }
    }
}
