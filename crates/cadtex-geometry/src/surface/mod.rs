//! Surface variants and their evaluation.

mod analytic;
mod fan;
mod offset;
mod swept;

use cadtex_core::{CadtexError, Result};
use cadtex_math::{Box2, Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};

pub use analytic::{Cone, Cylinder, Plane, Sphere, Torus};
pub use fan::Fan;
pub use offset::OffsetSurface;
pub use swept::{LinearExtrusion, Revolution};

use crate::flags::SurfaceFlags;
use crate::nurbs::NurbsSurface;

/// Cross products shorter than this have no usable direction.
const MIN_NORMAL_LENGTH: f64 = 1e-12;

/// Trait for parametric surfaces evaluated at absolute parameters.
pub trait Surface {
    /// Evaluate position, tangents and unit normal at `(u, v)`.
    fn evaluate(&self, u: f64, v: f64) -> SurfacePoint;

    fn point_at(&self, u: f64, v: f64) -> Point3 {
        self.evaluate(u, v).position
    }

    fn normal_at(&self, u: f64, v: f64) -> Vector3 {
        self.evaluate(u, v).normal
    }
}

/// Result of evaluating a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfacePoint {
    pub position: Point3,
    pub normal: Vector3,
    pub tangent_u: Vector3,
    pub tangent_v: Vector3,
    pub valid: bool,
}

impl SurfacePoint {
    pub fn new(position: Point3, normal: Vector3, tangent_u: Vector3, tangent_v: Vector3) -> Self {
        Self {
            position,
            normal,
            tangent_u,
            tangent_v,
            valid: true,
        }
    }

    /// A sample whose rational weight could not be divided by.
    pub fn invalid(position: Point3) -> Self {
        Self {
            position,
            normal: Vector3::ZERO,
            tangent_u: Vector3::ZERO,
            tangent_v: Vector3::ZERO,
            valid: false,
        }
    }

    /// Build a sample whose normal is `tangent_u x tangent_v`.
    ///
    /// Falls back to +Z when the tangents are parallel or vanish.
    pub fn from_tangents(position: Point3, tangent_u: Vector3, tangent_v: Vector3) -> Self {
        let cross = tangent_u.cross(tangent_v);
        let normal = if cross.length() > MIN_NORMAL_LENGTH {
            cross.normalize()
        } else {
            log::debug!("no normal from tangents at {position:?}, using +Z");
            Vector3::Z
        };
        Self::new(position, normal, tangent_u, tangent_v)
    }
}

/// On-disk surface type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum SurfaceType {
    Plane = 0,
    Cone = 1,
    Cylinder = 2,
    Sphere = 3,
    Torus = 4,
    LinearExtrusion = 5,
    Revolution = 6,
    NurbsSurface = 8,
    OffsetSurface = 9,
    PolyPlane = 14,
    Fan = 15,
}

impl SurfaceType {
    pub fn from_code(code: i32) -> Result<Self> {
        Ok(match code {
            0 => Self::Plane,
            1 => Self::Cone,
            2 => Self::Cylinder,
            3 => Self::Sphere,
            4 => Self::Torus,
            5 => Self::LinearExtrusion,
            6 => Self::Revolution,
            8 => Self::NurbsSurface,
            9 => Self::OffsetSurface,
            14 => Self::PolyPlane,
            15 => Self::Fan,
            _ => return Err(CadtexError::UnsupportedType { kind: "surface", code }),
        })
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Plane => "SURFACE_TYPE_PLANE",
            Self::Cone => "SURFACE_TYPE_CONE",
            Self::Cylinder => "SURFACE_TYPE_CYLINDER",
            Self::Sphere => "SURFACE_TYPE_SPHERE",
            Self::Torus => "SURFACE_TYPE_TORUS",
            Self::LinearExtrusion => "SURFACE_TYPE_LINEAR_EXTRUSION",
            Self::Revolution => "SURFACE_TYPE_REVOLUTION",
            Self::NurbsSurface => "SURFACE_TYPE_NURBS_SURFACE",
            Self::OffsetSurface => "SURFACE_TYPE_OFFSET_SURFACE",
            Self::PolyPlane => "SURFACE_TYPE_POLY_PLANE",
            Self::Fan => "SURFACE_TYPE_FAN",
        }
    }

    pub fn category(self) -> SurfaceCategory {
        match self {
            Self::Plane | Self::PolyPlane | Self::Cone | Self::Cylinder | Self::Sphere | Self::Torus => {
                SurfaceCategory::Simple
            }
            Self::LinearExtrusion | Self::Revolution | Self::OffsetSurface => SurfaceCategory::Compound,
            Self::NurbsSurface => SurfaceCategory::Nurbs,
            Self::Fan => SurfaceCategory::Fan,
        }
    }
}

/// Surface groups that share an evaluation shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SurfaceCategory {
    Simple,
    Compound,
    Nurbs,
    Fan,
}

impl SurfaceCategory {
    pub const ALL: [Self; 4] = [Self::Simple, Self::Compound, Self::Nurbs, Self::Fan];
}

/// Closed set of supported surface kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SurfaceGeometry {
    /// Placeholder for a record that failed to decode.
    Empty,
    Plane(Plane),
    PolyPlane(Plane),
    Cone(Cone),
    Cylinder(Cylinder),
    Sphere(Sphere),
    Torus(Torus),
    LinearExtrusion(LinearExtrusion),
    Revolution(Revolution),
    Nurbs(NurbsSurface),
    Offset(OffsetSurface),
    Fan(Fan),
}

impl SurfaceGeometry {
    pub fn surface_type(&self) -> Option<SurfaceType> {
        Some(match self {
            Self::Empty => return None,
            Self::Plane(_) => SurfaceType::Plane,
            Self::PolyPlane(_) => SurfaceType::PolyPlane,
            Self::Cone(_) => SurfaceType::Cone,
            Self::Cylinder(_) => SurfaceType::Cylinder,
            Self::Sphere(_) => SurfaceType::Sphere,
            Self::Torus(_) => SurfaceType::Torus,
            Self::LinearExtrusion(_) => SurfaceType::LinearExtrusion,
            Self::Revolution(_) => SurfaceType::Revolution,
            Self::Nurbs(_) => SurfaceType::NurbsSurface,
            Self::Offset(_) => SurfaceType::OffsetSurface,
            Self::Fan(_) => SurfaceType::Fan,
        })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl Surface for SurfaceGeometry {
    fn evaluate(&self, u: f64, v: f64) -> SurfacePoint {
        match self {
            Self::Empty => SurfacePoint::invalid(Point3::ZERO),
            Self::Plane(s) | Self::PolyPlane(s) => s.evaluate(u, v),
            Self::Cone(s) => s.evaluate(u, v),
            Self::Cylinder(s) => s.evaluate(u, v),
            Self::Sphere(s) => s.evaluate(u, v),
            Self::Torus(s) => s.evaluate(u, v),
            Self::LinearExtrusion(s) => s.evaluate(u, v),
            Self::Revolution(s) => s.evaluate(u, v),
            Self::Nurbs(s) => s.evaluate(u, v),
            Self::Offset(s) => s.evaluate(u, v),
            Self::Fan(s) => s.evaluate(u, v),
        }
    }
}

/// A decoded surface record: geometry plus its parameter domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceData {
    pub domain: Box2,
    pub geometry: SurfaceGeometry,
}

impl SurfaceData {
    pub fn new(domain: Box2, geometry: SurfaceGeometry) -> Self {
        Self { domain, geometry }
    }

    pub fn empty() -> Self {
        Self::new(Box2::UNIT, SurfaceGeometry::Empty)
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }

    /// Evaluate at normalized atlas coordinates `(u, v)` in `[0, 1]²`.
    ///
    /// With `FLIPPED_UV` the atlas U axis runs along the surface V axis, and the
    /// returned tangents follow the atlas axes. `FLIPPED_NORMAL` negates the normal.
    pub fn eval_normalized(&self, u: f64, v: f64, flags: SurfaceFlags) -> SurfacePoint {
        let flipped = flags.contains(SurfaceFlags::FLIPPED_UV);
        let st = if flipped { Point2::new(v, u) } else { Point2::new(u, v) };
        let p = self.domain.lerp(st);
        let size = self.domain.size();

        let mut pt = self.geometry.evaluate(p.x, p.y);
        pt.tangent_u *= size.x;
        pt.tangent_v *= size.y;
        if flipped {
            std::mem::swap(&mut pt.tangent_u, &mut pt.tangent_v);
        }
        if flags.contains(SurfaceFlags::FLIPPED_NORMAL) {
            pt.normal = -pt.normal;
        }
        pt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use cadtex_math::DVec2;

    #[test]
    fn test_type_codes() {
        assert_eq!(SurfaceType::from_code(15).unwrap(), SurfaceType::Fan);
        assert_eq!(SurfaceType::Revolution.category(), SurfaceCategory::Compound);
        assert_eq!(SurfaceType::PolyPlane.category(), SurfaceCategory::Simple);
        assert_eq!(SurfaceType::NurbsSurface.name(), "SURFACE_TYPE_NURBS_SURFACE");
        assert!(SurfaceType::from_code(7).is_err());
        assert!(SurfaceType::from_code(-1).is_err());
    }

    #[test]
    fn test_normalized_plane_maps_domain() {
        let data = SurfaceData::new(
            Box2::new(DVec2::new(-1.0, 0.0), DVec2::new(1.0, 4.0)),
            SurfaceGeometry::Plane(Plane),
        );
        let pt = data.eval_normalized(0.5, 0.25, SurfaceFlags::empty());
        assert_abs_diff_eq!(pt.position.x, 0.0);
        assert_abs_diff_eq!(pt.position.y, 1.0);
        assert_abs_diff_eq!(pt.tangent_u.x, 2.0);
        assert_abs_diff_eq!(pt.tangent_v.y, 4.0);
    }

    #[test]
    fn test_flipped_uv_and_normal() {
        let data = SurfaceData::new(Box2::UNIT, SurfaceGeometry::Plane(Plane));
        let plain = data.eval_normalized(0.2, 0.7, SurfaceFlags::empty());
        let flipped = data.eval_normalized(0.7, 0.2, SurfaceFlags::FLIPPED_UV);
        assert!((plain.position - flipped.position).length() < 1e-12);
        assert_eq!(plain.normal, flipped.normal);
        assert_eq!(flipped.tangent_u, Vector3::Y);

        let negated = data.eval_normalized(0.2, 0.7, SurfaceFlags::FLIPPED_NORMAL);
        assert_eq!(negated.normal, -Vector3::Z);
    }

    #[test]
    fn test_empty_surface() {
        let data = SurfaceData::empty();
        assert!(data.is_empty());
        let pt = data.eval_normalized(0.5, 0.5, SurfaceFlags::empty());
        assert!(!pt.valid);
        assert_eq!(pt.position, Point3::ZERO);
    }

    #[test]
    fn test_parallel_tangents_fall_back_to_z() {
        let pt = SurfacePoint::from_tangents(Point3::ZERO, Vector3::X, Vector3::X * 2.0);
        assert_eq!(pt.normal, Vector3::Z);
    }
}
