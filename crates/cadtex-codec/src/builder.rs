//! Authoring of library buffers in the exact layout the decoders read.
//!
//! Payloads are laid out back to back in the library texture, each starting on
//! a texel boundary, and the texture is padded to the smallest square that fits.

use cadtex_core::{CurveId, SurfaceId};
use cadtex_geometry::nurbs::{NurbsCurve, NurbsSurface};
use cadtex_geometry::{CurveData, CurveFlags, CurveGeometry, SurfaceType};
use cadtex_math::{Box2, Point3, Xfo};

use crate::body_library::{BodyDescriptor, BodyItemRef};
use crate::codec::FormatCodec;
use crate::curve_library::CurveDims;
use crate::surface_library::SurfaceDims;
use crate::texel::{side_for_len, TexelAddr, LIBRARY_HEADER_BYTES, RGBA16_BYTES, RGBA32_BYTES};
use crate::trim_set_library::{TrimCurveRef, TrimSet};
use crate::writer::BinaryWriter;

// ---------------------------------------------------------------------------
// Payload encoders
// ---------------------------------------------------------------------------

/// Type code written for records that should fail to decode.
pub const INVALID_TYPE_CODE: f32 = -1.0;

/// Encode a curve payload. An `Empty` curve gets an invalid type code.
pub fn curve_payload(curve: &CurveData) -> Vec<u8> {
    let mut w = BinaryWriter::new();
    let code = curve.geometry.curve_type().map_or(INVALID_TYPE_CODE, |t| t.code() as f32);
    w.write_f16(code);
    w.write_f16(0.0);
    w.write_f32(curve.domain.0 as f32);
    w.write_f32(curve.domain.1 as f32);
    match &curve.geometry {
        CurveGeometry::Empty | CurveGeometry::Line(_) => {}
        CurveGeometry::Circle(c) => w.write_f32(c.radius as f32),
        CurveGeometry::Ellipse(e) => {
            w.write_f32(e.major_radius as f32);
            w.write_f32(e.minor_radius as f32);
        }
        CurveGeometry::Nurbs(n) => write_nurbs_curve(&mut w, n),
    }
    w.into_bytes()
}

fn write_nurbs_curve(w: &mut BinaryWriter, n: &NurbsCurve) {
    w.write_f16(n.degree as f32);
    w.write_f16(n.control_points.len() as f32);
    w.write_f16(n.knots.len() as f32);
    w.write_f16(n.flags.bits() as f32);
    for cp in &n.control_points {
        w.write_f32s(&cp.as_vec4().to_array());
    }
    for &k in n.knots.raw() {
        w.write_f32(k as f32);
    }
}

/// Type-specific surface parameters, with swept and offset surfaces referring
/// to other records by id.
#[derive(Debug, Clone)]
pub enum SurfaceParams {
    Plane,
    PolyPlane,
    Cylinder { radius: f64 },
    Cone { radius: f64, semi_angle: f64 },
    Sphere { radius: f64 },
    Torus { major_radius: f64, minor_radius: f64 },
    LinearExtrusion { curve: CurveId, xfo: Xfo },
    Revolution { curve: CurveId, xfo: Xfo },
    Nurbs(NurbsSurface),
    Offset { offset: f64, basis: SurfaceId },
    Fan(Vec<Point3>),
}

impl SurfaceParams {
    pub fn surface_type(&self) -> SurfaceType {
        match self {
            Self::Plane => SurfaceType::Plane,
            Self::PolyPlane => SurfaceType::PolyPlane,
            Self::Cylinder { .. } => SurfaceType::Cylinder,
            Self::Cone { .. } => SurfaceType::Cone,
            Self::Sphere { .. } => SurfaceType::Sphere,
            Self::Torus { .. } => SurfaceType::Torus,
            Self::LinearExtrusion { .. } => SurfaceType::LinearExtrusion,
            Self::Revolution { .. } => SurfaceType::Revolution,
            Self::Nurbs(_) => SurfaceType::NurbsSurface,
            Self::Offset { .. } => SurfaceType::OffsetSurface,
            Self::Fan(_) => SurfaceType::Fan,
        }
    }
}

pub fn surface_payload(domain: Box2, params: &SurfaceParams) -> Vec<u8> {
    let mut w = BinaryWriter::new();
    w.write_f16(params.surface_type().code() as f32);
    w.write_f16(0.0);
    w.write_f32s(&[
        domain.min.x as f32,
        domain.min.y as f32,
        domain.max.x as f32,
        domain.max.y as f32,
    ]);
    match params {
        SurfaceParams::Plane | SurfaceParams::PolyPlane => {}
        SurfaceParams::Cylinder { radius } | SurfaceParams::Sphere { radius } => w.write_f32(*radius as f32),
        SurfaceParams::Cone { radius, semi_angle } => w.write_f32s(&[*radius as f32, *semi_angle as f32]),
        SurfaceParams::Torus {
            major_radius,
            minor_radius,
        } => w.write_f32s(&[*major_radius as f32, *minor_radius as f32]),
        SurfaceParams::LinearExtrusion { curve, xfo } | SurfaceParams::Revolution { curve, xfo } => {
            w.write_f32(curve.value() as f32);
            for v in xfo.to_array() {
                w.write_f32(v as f32);
            }
        }
        SurfaceParams::Nurbs(n) => {
            for v in [
                n.degree_u,
                n.degree_v,
                n.num_cps_u,
                n.num_cps_v,
                n.knots_u.len(),
                n.knots_v.len(),
                n.flags.bits() as usize,
                0,
            ] {
                w.write_f16(v as f32);
            }
            for cp in &n.control_points {
                w.write_f32s(&cp.as_vec4().to_array());
            }
            for &k in n.knots_u.raw().iter().chain(n.knots_v.raw()) {
                w.write_f32(k as f32);
            }
        }
        SurfaceParams::Offset { offset, basis } => w.write_f32s(&[*offset as f32, basis.value() as f32]),
        SurfaceParams::Fan(points) => {
            w.write_f16(points.len() as f32);
            w.write_f16(0.0);
            for p in points {
                w.write_f32s(&p.as_vec3().to_array());
            }
        }
    }
    w.into_bytes()
}

/// Header-only payload with an arbitrary type code.
pub fn raw_payload(code: f32, extra: &[u8]) -> Vec<u8> {
    let mut w = BinaryWriter::new();
    w.write_f16(code);
    w.write_f16(0.0);
    w.write_bytes(extra);
    w.into_bytes()
}

// ---------------------------------------------------------------------------
// Library textures
// ---------------------------------------------------------------------------

/// Places payloads into a square texture and reports their texel addresses.
fn pack_texture(payloads: &[Vec<u8>], bytes_per_texel: usize) -> (Vec<TexelAddr>, Vec<u8>) {
    let mut offsets = Vec::with_capacity(payloads.len());
    let mut total = 0;
    for p in payloads {
        offsets.push(total);
        total += p.len().div_ceil(bytes_per_texel).max(1) * bytes_per_texel;
    }
    let side = side_for_len(total, bytes_per_texel);
    let mut data = vec![0u8; side * side * bytes_per_texel];
    let mut addrs = Vec::with_capacity(payloads.len());
    for (p, &offset) in payloads.iter().zip(&offsets) {
        data[offset..offset + p.len()].copy_from_slice(p);
        addrs.push(TexelAddr::from_byte_offset(offset, bytes_per_texel, side));
    }
    (addrs, data)
}

#[derive(Debug, Clone)]
pub struct CurveLibraryBuilder {
    codec: FormatCodec,
    total_area: f32,
    items: Vec<(CurveDims, Vec<u8>)>,
}

impl CurveLibraryBuilder {
    pub fn new(codec: FormatCodec) -> Self {
        Self {
            codec,
            total_area: 0.0,
            items: Vec::new(),
        }
    }

    pub fn total_area(mut self, area: f32) -> Self {
        self.total_area = area;
        self
    }

    pub fn push(&mut self, dims: CurveDims, payload: Vec<u8>) -> CurveId {
        self.items.push((dims, payload));
        CurveId(self.items.len() as u32 - 1)
    }

    pub fn push_curve(&mut self, dims: CurveDims, curve: &CurveData) -> CurveId {
        self.push(dims, curve_payload(curve))
    }

    /// Returns `(toc, texture)`.
    pub fn build(&self) -> (Vec<u8>, Vec<u8>) {
        let payloads: Vec<Vec<u8>> = self.items.iter().map(|(_, p)| p.clone()).collect();
        let (addrs, data) = pack_texture(&payloads, RGBA16_BYTES);

        let mut toc = BinaryWriter::new();
        toc.write_u32(self.items.len() as u32);
        self.codec.write_total_area(&mut toc, self.total_area);
        toc.pad_to(LIBRARY_HEADER_BYTES);
        for ((dims, _), addr) in self.items.iter().zip(addrs) {
            toc.write_uf16(addr.x as f32);
            toc.write_uf16(addr.y as f32);
            toc.write_f16(dims.param);
            toc.write_f16(dims.length);
            toc.write_f16(dims.flags.bits() as f32);
            for _ in 0..3 {
                toc.write_f16(0.0);
            }
        }
        (toc.into_bytes(), data)
    }
}

#[derive(Debug, Clone)]
pub struct SurfaceLibraryBuilder {
    codec: FormatCodec,
    total_area: f32,
    items: Vec<(SurfaceDims, Vec<u8>)>,
}

impl SurfaceLibraryBuilder {
    pub fn new(codec: FormatCodec) -> Self {
        Self {
            codec,
            total_area: 0.0,
            items: Vec::new(),
        }
    }

    pub fn total_area(mut self, area: f32) -> Self {
        self.total_area = area;
        self
    }

    pub fn push(&mut self, dims: SurfaceDims, payload: Vec<u8>) -> SurfaceId {
        self.items.push((dims, payload));
        SurfaceId(self.items.len() as u32 - 1)
    }

    pub fn push_surface(&mut self, dims: SurfaceDims, domain: Box2, params: &SurfaceParams) -> SurfaceId {
        self.push(dims, surface_payload(domain, params))
    }

    pub fn build(&self) -> (Vec<u8>, Vec<u8>) {
        let payloads: Vec<Vec<u8>> = self.items.iter().map(|(_, p)| p.clone()).collect();
        let (addrs, data) = pack_texture(&payloads, RGBA16_BYTES);

        let mut toc = BinaryWriter::new();
        toc.write_u32(self.items.len() as u32);
        self.codec.write_total_area(&mut toc, self.total_area);
        toc.pad_to(LIBRARY_HEADER_BYTES);
        for ((dims, _), addr) in self.items.iter().zip(addrs) {
            toc.write_uf16(addr.x as f32);
            toc.write_uf16(addr.y as f32);
            toc.write_f16(dims.curvature_u);
            toc.write_f16(dims.curvature_v);
            toc.write_f16(dims.size_u);
            toc.write_f16(dims.size_v);
            toc.write_f16(dims.flags.bits() as f32);
            self.codec.write_trim_set_id(&mut toc, dims.trim_set);
        }
        (toc.into_bytes(), data)
    }
}

// ---------------------------------------------------------------------------
// Trim sets and bodies
// ---------------------------------------------------------------------------

pub fn build_trim_sets(codec: &FormatCodec, total_area: f32, sets: &[TrimSet]) -> Vec<u8> {
    let mut w = BinaryWriter::new();
    w.write_u32(sets.len() as u32);
    codec.write_total_area(&mut w, total_area);
    let table = w.len();
    w.pad_to(table + sets.len() * 4);
    for (i, set) in sets.iter().enumerate() {
        w.align(4);
        let offset = w.len();
        w.patch_u32(table + i * 4, offset as u32);
        w.write_f32s(&[set.size.x as f32, set.size.y as f32]);
        w.write_u32(set.holes.len() as u32);
        w.write_u32(set.perimeter.len() as u32);
        write_trim_refs(&mut w, &set.perimeter);
        for hole in &set.holes {
            w.write_u32(hole.len() as u32);
            write_trim_refs(&mut w, hole);
        }
    }
    w.into_bytes()
}

fn write_trim_refs(w: &mut BinaryWriter, refs: &[TrimCurveRef]) {
    for r in refs {
        w.write_f32(r.curve.value() as f32);
        w.write_f32s(&[r.xfo.tr.x as f32, r.xfo.tr.y as f32]);
        for m in r.xfo.rows() {
            w.write_f32(m as f32);
        }
        w.write_f32(r.flags.bits() as f32);
    }
}

/// Returns `(toc, texture)` for a body library.
pub fn build_bodies(codec: &FormatCodec, bodies: &[BodyDescriptor]) -> (Vec<u8>, Vec<u8>) {
    let payloads: Vec<Vec<u8>> = bodies
        .iter()
        .map(|body| {
            let mut w = BinaryWriter::new();
            w.write_f32s(&body.bbox.min.as_vec3().to_array());
            w.write_f32s(&body.bbox.max.as_vec3().to_array());
            w.write_f32(body.surfaces.len() as f32);
            if codec.body_curves {
                w.write_f32(body.curves.len() as f32);
            }
            let curves: &[BodyItemRef] = if codec.body_curves { &body.curves } else { &[] };
            for r in body.surfaces.iter().chain(curves) {
                w.write_f32(r.id as f32);
                for v in r.xfo.to_array() {
                    w.write_f32(v as f32);
                }
                if codec.body_ref_color {
                    w.write_f32s(&r.color.unwrap_or([1.0; 4]));
                }
            }
            w.into_bytes()
        })
        .collect();
    let (addrs, data) = pack_texture(&payloads, RGBA32_BYTES);

    let mut toc = BinaryWriter::new();
    toc.write_u32(bodies.len() as u32);
    for addr in addrs {
        toc.write_f32s(&addr.to_array());
    }
    (toc.into_bytes(), data)
}

/// Convenience for a curve TOC entry.
pub fn curve_dims(param: f32, length: f32, flags: CurveFlags) -> CurveDims {
    CurveDims { param, length, flags }
}

