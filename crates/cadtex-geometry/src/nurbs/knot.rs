//! Knot vector storage and span lookup.

use serde::{Deserialize, Serialize};

/// Highest B-spline degree supported on both the CPU and GPU evaluators.
pub const MAX_DEGREE: usize = 9;

/// Size of the knot window used by basis evaluation.
pub const MAX_WINDOW: usize = 2 * MAX_DEGREE + 1;

/// How knot values are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KnotEncoding {
    /// Every entry is an absolute knot value.
    Absolute,
    /// The first entry is absolute, every following entry is the delta to the previous knot.
    Deltas,
}

/// A knot vector in either of its on-disk encodings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnotVector {
    values: Vec<f64>,
    encoding: KnotEncoding,
}

/// The `2 * degree + 1` absolute knots centered on a span.
///
/// `values[degree]` is the knot at the span index.
#[derive(Debug, Clone, Copy)]
pub struct KnotWindow {
    pub values: [f64; MAX_WINDOW],
    pub degree: usize,
}

impl KnotWindow {
    pub fn new(degree: usize) -> Self {
        Self {
            values: [0.0; MAX_WINDOW],
            degree,
        }
    }

    /// Absolute value of knot `span + offset`.
    pub fn knot(&self, offset: isize) -> f64 {
        self.values[(self.degree as isize + offset) as usize]
    }

    /// Parametric width of the span the window is centered on.
    pub fn span_width(&self) -> f64 {
        self.knot(1) - self.knot(0)
    }
}

impl KnotVector {
    pub fn new(values: Vec<f64>, encoding: KnotEncoding) -> Self {
        Self { values, encoding }
    }

    pub fn absolute(values: Vec<f64>) -> Self {
        Self::new(values, KnotEncoding::Absolute)
    }

    /// Encode absolute knots as a start value plus deltas.
    pub fn deltas_from_absolute(values: &[f64]) -> Self {
        let mut deltas = Vec::with_capacity(values.len());
        let mut prev = 0.0;
        for (i, &k) in values.iter().enumerate() {
            deltas.push(if i == 0 { k } else { k - prev });
            prev = k;
        }
        Self::new(deltas, KnotEncoding::Deltas)
    }

    pub fn encoding(&self) -> KnotEncoding {
        self.encoding
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn raw(&self) -> &[f64] {
        &self.values
    }

    /// Reconstruct every knot as an absolute value.
    pub fn to_absolute(&self) -> Vec<f64> {
        match self.encoding {
            KnotEncoding::Absolute => self.values.clone(),
            KnotEncoding::Deltas => {
                let mut sum = 0.0;
                self.values
                    .iter()
                    .map(|&d| {
                        sum += d;
                        sum
                    })
                    .collect()
            }
        }
    }

    /// Parameter range `[knot[degree], knot[num_cps]]` covered by the curve.
    pub fn valid_range(&self, degree: usize, num_cps: usize) -> (f64, f64) {
        let abs = self.to_absolute();
        (abs[degree], abs[num_cps])
    }

    /// Locate the span containing `u` and fill `window` with the knots around it.
    ///
    /// The returned span lies in `[degree, num_cps - 1]`; parameters outside the
    /// valid range clamp to the first or last span.
    pub fn find_span(&self, u: f64, degree: usize, num_cps: usize, window: &mut KnotWindow) -> usize {
        let span = match self.encoding {
            KnotEncoding::Absolute => find_span_absolute(u, degree, num_cps, &self.values),
            KnotEncoding::Deltas => find_span_deltas(u, degree, num_cps, &self.values),
        };
        self.fill_window(span, degree, window);
        span
    }

    fn fill_window(&self, span: usize, degree: usize, window: &mut KnotWindow) {
        window.degree = degree;
        let first = span - degree;
        let last = span + degree;
        match self.encoding {
            KnotEncoding::Absolute => {
                for (slot, k) in window.values.iter_mut().zip(&self.values[first..=last]) {
                    *slot = *k;
                }
            }
            KnotEncoding::Deltas => {
                let mut sum = 0.0;
                for (i, &d) in self.values.iter().enumerate().take(last + 1) {
                    sum += d;
                    if i >= first {
                        window.values[i - first] = sum;
                    }
                }
            }
        }
    }
}

/// Span search over absolute knots, with early-outs at both ends of the valid range.
pub fn find_span_absolute(u: f64, degree: usize, num_cps: usize, knots: &[f64]) -> usize {
    let last = num_cps - 1;
    if u >= knots[num_cps] {
        return last;
    }
    if u <= knots[degree] {
        return degree;
    }

    let mut low = degree;
    let mut high = num_cps;
    let mut mid = (low + high) / 2;
    while u < knots[mid] || u >= knots[mid + 1] {
        if u < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid.clamp(degree, last)
}

/// Span search over delta-encoded knots, summing while scanning forward.
pub fn find_span_deltas(u: f64, degree: usize, num_cps: usize, deltas: &[f64]) -> usize {
    let last = num_cps - 1;
    let mut knot = 0.0;
    for (i, &d) in deltas.iter().enumerate().take(num_cps + 1) {
        knot += d;
        // `knot` is now knots[i]; the span ending here is i - 1.
        if i > degree && u < knot {
            return (i - 1).clamp(degree, last);
        }
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform() -> Vec<f64> {
        // degree 2, 5 control points
        vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 3.0, 3.0]
    }

    #[test]
    fn test_find_span_uniform() {
        let knots = uniform();
        assert_eq!(find_span_absolute(0.0, 2, 5, &knots), 2);
        assert_eq!(find_span_absolute(0.5, 2, 5, &knots), 2);
        assert_eq!(find_span_absolute(1.0, 2, 5, &knots), 3);
        assert_eq!(find_span_absolute(1.5, 2, 5, &knots), 3);
        assert_eq!(find_span_absolute(2.5, 2, 5, &knots), 4);
        assert_eq!(find_span_absolute(3.0, 2, 5, &knots), 4);
        assert_eq!(find_span_absolute(7.0, 2, 5, &knots), 4);
        assert_eq!(find_span_absolute(-1.0, 2, 5, &knots), 2);
    }

    #[test]
    fn test_deltas_agree_with_absolute() {
        let knots = uniform();
        let deltas = KnotVector::deltas_from_absolute(&knots);
        for i in -4..=40 {
            let u = i as f64 * 0.1;
            assert_eq!(
                find_span_deltas(u, 2, 5, deltas.raw()),
                find_span_absolute(u, 2, 5, &knots),
                "span mismatch at u={}",
                u
            );
        }
    }

    /// `(degree, knots)` pairs: non-uniform, interior multiplicity equal to
    /// the degree, degree one, and an unclamped vector.
    fn sweep_cases() -> Vec<(usize, Vec<f64>)> {
        vec![
            (3, vec![0.0, 0.0, 0.0, 0.0, 0.25, 1.0, 1.5, 3.0, 3.0, 3.0, 3.0]),
            (2, vec![0.0, 0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 3.0]),
            (1, vec![0.0, 0.0, 0.5, 0.75, 2.0, 2.0]),
            (2, vec![0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5]),
        ]
    }

    #[test]
    fn test_find_span_sweep_contract() {
        const STEPS: usize = 256;
        for (degree, absolute) in sweep_cases() {
            let num_cps = absolute.len() - degree - 1;
            for knots in [KnotVector::absolute(absolute.clone()), KnotVector::deltas_from_absolute(&absolute)] {
                let abs = knots.to_absolute();
                let (u0, u1) = knots.valid_range(degree, num_cps);
                let mut window = KnotWindow::new(degree);
                let mut prev = degree;
                for i in 0..=STEPS {
                    let u = u0 + (u1 - u0) * i as f64 / STEPS as f64;
                    let span = knots.find_span(u, degree, num_cps, &mut window);
                    let ctx = format!("{:?} degree {degree} u={u}", knots.encoding());

                    assert!(span >= degree && span <= abs.len() - degree - 2, "{ctx}: span {span}");
                    assert!(span >= prev, "{ctx}: span went back from {prev} to {span}");
                    if i < STEPS {
                        assert!(abs[span] <= u && u < abs[span + 1], "{ctx}: span {span}");
                    } else {
                        // the domain end belongs to the last span
                        assert_eq!(span, num_cps - 1, "{ctx}");
                        assert!(abs[span] < u && u <= abs[span + 1], "{ctx}");
                    }
                    assert_eq!(window.knot(0), abs[span], "{ctx}");
                    prev = span;
                }

                // outside the domain clamps to the end spans
                assert_eq!(knots.find_span(u0 - 1.0, degree, num_cps, &mut window), degree);
                assert_eq!(knots.find_span(u1 + 1.0, degree, num_cps, &mut window), num_cps - 1);
            }
        }
    }

    #[test]
    fn test_window_centered_on_span() {
        let knots = KnotVector::deltas_from_absolute(&uniform());
        let mut window = KnotWindow::new(2);
        let span = knots.find_span(1.5, 2, 5, &mut window);
        assert_eq!(span, 3);
        // knots[1..=5] = 0, 0, 1, 2, 3
        assert_eq!(&window.values[..5], &[0.0, 0.0, 1.0, 2.0, 3.0]);
        assert_eq!(window.knot(0), 1.0);
        assert_eq!(window.span_width(), 1.0);
    }

    #[test]
    fn test_to_absolute_roundtrip() {
        let knots = uniform();
        let deltas = KnotVector::deltas_from_absolute(&knots);
        assert_eq!(deltas.encoding(), KnotEncoding::Deltas);
        assert_eq!(deltas.to_absolute(), knots);
        assert_eq!(deltas.valid_range(2, 5), (0.0, 3.0));
    }
}
