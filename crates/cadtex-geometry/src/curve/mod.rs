//! Curve variants and their evaluation.

mod circle;
mod ellipse;
mod line;

use cadtex_core::{CadtexError, Result};
use cadtex_math::{Point3, Vector3};
use serde::{Deserialize, Serialize};

pub use circle::Circle;
pub use ellipse::Ellipse;
pub use line::Line;

use crate::nurbs::NurbsCurve;

/// Trait for parametric curves evaluated at an absolute parameter.
pub trait Curve {
    /// Evaluate position and tangent at parameter `t`.
    fn evaluate(&self, t: f64) -> CurvePoint;

    fn point_at(&self, t: f64) -> Point3 {
        self.evaluate(t).position
    }

    fn tangent_at(&self, t: f64) -> Vector3 {
        self.evaluate(t).tangent
    }
}

/// Result of evaluating a curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    pub position: Point3,
    pub tangent: Vector3,
    /// False when the rational weight could not be divided by.
    pub valid: bool,
}

impl CurvePoint {
    pub fn new(position: Point3, tangent: Vector3) -> Self {
        Self {
            position,
            tangent,
            valid: true,
        }
    }
}

/// On-disk curve type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum CurveType {
    Line = 20,
    Circle = 21,
    Ellipse = 22,
    NurbsCurve = 26,
}

impl CurveType {
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            20 => Ok(Self::Line),
            21 => Ok(Self::Circle),
            22 => Ok(Self::Ellipse),
            26 => Ok(Self::NurbsCurve),
            _ => Err(CadtexError::UnsupportedType { kind: "curve", code }),
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Line => "CURVE_TYPE_LINE",
            Self::Circle => "CURVE_TYPE_CIRCLE",
            Self::Ellipse => "CURVE_TYPE_ELLIPSE",
            Self::NurbsCurve => "CURVE_TYPE_NURBS_CURVE",
        }
    }

    pub fn category(self) -> CurveCategory {
        match self {
            Self::NurbsCurve => CurveCategory::Nurbs,
            _ => CurveCategory::Simple,
        }
    }
}

/// Curve groups that share an evaluation shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CurveCategory {
    Simple,
    Nurbs,
}

impl CurveCategory {
    pub const ALL: [Self; 2] = [Self::Simple, Self::Nurbs];
}

/// Closed set of supported curve kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CurveGeometry {
    /// Placeholder for a record that failed to decode.
    Empty,
    Line(Line),
    Circle(Circle),
    Ellipse(Ellipse),
    Nurbs(NurbsCurve),
}

impl CurveGeometry {
    pub fn curve_type(&self) -> Option<CurveType> {
        match self {
            Self::Empty => None,
            Self::Line(_) => Some(CurveType::Line),
            Self::Circle(_) => Some(CurveType::Circle),
            Self::Ellipse(_) => Some(CurveType::Ellipse),
            Self::Nurbs(_) => Some(CurveType::NurbsCurve),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl Curve for CurveGeometry {
    fn evaluate(&self, t: f64) -> CurvePoint {
        match self {
            Self::Empty => CurvePoint {
                position: Point3::ZERO,
                tangent: Vector3::ZERO,
                valid: false,
            },
            Self::Line(c) => c.evaluate(t),
            Self::Circle(c) => c.evaluate(t),
            Self::Ellipse(c) => c.evaluate(t),
            Self::Nurbs(c) => c.evaluate(t),
        }
    }
}

/// A decoded curve record: geometry plus its parameter domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveData {
    pub domain: (f64, f64),
    pub geometry: CurveGeometry,
}

impl CurveData {
    pub fn new(domain: (f64, f64), geometry: CurveGeometry) -> Self {
        Self { domain, geometry }
    }

    pub fn empty() -> Self {
        Self::new((0.0, 1.0), CurveGeometry::Empty)
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }

    /// Map a normalized parameter in `[0, 1]` into the domain.
    pub fn param_at(&self, s: f64) -> f64 {
        self.domain.0 + (self.domain.1 - self.domain.0) * s
    }

    /// Evaluate at a normalized parameter; the tangent is per unit of `s`.
    pub fn eval_normalized(&self, s: f64) -> CurvePoint {
        let mut pt = self.geometry.evaluate(self.param_at(s));
        pt.tangent *= self.domain.1 - self.domain.0;
        pt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    #[test]
    fn test_type_codes() {
        assert_eq!(CurveType::from_code(21).unwrap(), CurveType::Circle);
        assert_eq!(CurveType::Circle.name(), "CURVE_TYPE_CIRCLE");
        assert_eq!(CurveType::NurbsCurve.category(), CurveCategory::Nurbs);
        assert!(matches!(
            CurveType::from_code(23),
            Err(CadtexError::UnsupportedType { kind: "curve", code: 23 })
        ));
    }

    #[test]
    fn test_normalized_circle() {
        let data = CurveData::new((0.0, TAU), CurveGeometry::Circle(Circle::new(10.0)));
        let p0 = data.eval_normalized(0.0).position;
        let p1 = data.eval_normalized(0.25).position;
        assert!((p0 - Point3::new(10.0, 0.0, 0.0)).length() < 1e-9);
        assert!((p1 - Point3::new(0.0, 10.0, 0.0)).length() < 1e-9);
    }

    #[test]
    fn test_empty_is_invalid() {
        let data = CurveData::empty();
        assert!(data.is_empty());
        assert!(!data.eval_normalized(0.5).valid);
        assert_eq!(data.geometry.curve_type(), None);
    }
}
