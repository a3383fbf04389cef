//! Surface library: a TOC buffer plus an RGBA16 payload texture.

use cadtex_core::{CadtexError, CurveId, Result, SurfaceId, TrimSetId};
use cadtex_geometry::nurbs::{KnotVector, NurbsSurface};
use cadtex_geometry::surface::{
    Cone, Cylinder, Fan, LinearExtrusion, OffsetSurface, Plane, Revolution, Sphere, Torus,
};
use cadtex_geometry::{NurbsFlags, SurfaceData, SurfaceFlags, SurfaceGeometry, SurfaceType};
use cadtex_math::{Box2, DVec2};
use serde::{Deserialize, Serialize};

use crate::codec::FormatCodec;
use crate::curve_library::{knot_encoding, CurveLibrary};
use crate::fields::{load_dvec4_array, load_f16_count, load_f64_array, load_point3, load_xfo, to_bits, to_id};
use crate::reader::BinaryReader;
use crate::texel::{square_side, TexelAddr, LIBRARY_HEADER_BYTES, RGBA16_BYTES, SURFACE_TOC_STRIDE};

/// Other library records a surface payload points at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceRefs {
    /// Base curve of a swept surface.
    pub curve: Option<CurveId>,
    /// Basis of an offset surface.
    pub basis: Option<SurfaceId>,
}

/// Tessellation inputs stored in a surface TOC entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceDims {
    pub curvature_u: f32,
    pub curvature_v: f32,
    pub size_u: f32,
    pub size_v: f32,
    pub flags: SurfaceFlags,
    /// `None` when the surface is untrimmed or the id was not requested.
    pub trim_set: Option<TrimSetId>,
}

impl SurfaceDims {
    pub fn area(&self) -> f64 {
        self.size_u as f64 * self.size_v as f64
    }
}

#[derive(Debug, Clone)]
pub struct SurfaceLibrary {
    toc: Vec<u8>,
    data: Vec<u8>,
    side: usize,
    codec: FormatCodec,
    num_surfaces: usize,
    total_area: Option<f32>,
}

impl SurfaceLibrary {
    pub fn new(toc: Vec<u8>, data: Vec<u8>, codec: FormatCodec) -> Result<Self> {
        let side = square_side(data.len(), RGBA16_BYTES)?;
        let (num_surfaces, total_area) = if toc.is_empty() {
            (0, None)
        } else {
            let mut reader = BinaryReader::with_context(&toc, "surface library header");
            (reader.load_u32()? as usize, codec.read_total_area(&mut reader)?)
        };
        log::debug!("surface library: {num_surfaces} surfaces, {side}x{side} texture");
        Ok(Self {
            toc,
            data,
            side,
            codec,
            num_surfaces,
            total_area,
        })
    }

    pub fn len(&self) -> usize {
        self.num_surfaces
    }

    pub fn is_empty(&self) -> bool {
        self.num_surfaces == 0
    }

    pub fn total_area(&self) -> Option<f32> {
        self.total_area
    }

    pub fn texture_side(&self) -> usize {
        self.side
    }

    pub fn texture_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_buffers(self) -> (Vec<u8>, Vec<u8>) {
        (self.toc, self.data)
    }

    fn toc_reader(&self, id: SurfaceId) -> Result<BinaryReader<'_>> {
        if id.index() >= self.num_surfaces {
            return Err(CadtexError::NotFound(format!("surface {id} of {}", self.num_surfaces)));
        }
        let mut reader = BinaryReader::with_context(&self.toc, "surface TOC");
        reader.seek(LIBRARY_HEADER_BYTES + id.index() * SURFACE_TOC_STRIDE)?;
        Ok(reader)
    }

    pub fn surface_texel_coords(&self, id: SurfaceId) -> Result<TexelAddr> {
        let mut reader = self.toc_reader(id)?;
        let x = reader.load_uf16()?;
        let y = reader.load_uf16()?;
        Ok(TexelAddr::new(x as u32, y as u32))
    }

    pub fn seek_surface_data(&self, id: SurfaceId, byte_offset: usize) -> Result<BinaryReader<'_>> {
        let addr = self.surface_texel_coords(id)?;
        let mut reader = BinaryReader::with_context(&self.data, "surface payload");
        reader.seek(addr.byte_offset(RGBA16_BYTES, self.side) + byte_offset)?;
        Ok(reader)
    }

    pub fn surface_type(&self, id: SurfaceId) -> Result<SurfaceType> {
        let code = self.seek_surface_data(id, 0)?.load_f16()?;
        SurfaceType::from_code(code as i32)
    }

    /// Ids referenced by the payload, without resolving them.
    pub fn surface_refs(&self, id: SurfaceId) -> Result<SurfaceRefs> {
        let mut reader = self.seek_surface_data(id, 0)?;
        let surface_type = SurfaceType::from_code(reader.load_f16()? as i32)?;
        // flags and domain
        reader.advance(2 + 16)?;
        Ok(match surface_type {
            SurfaceType::LinearExtrusion | SurfaceType::Revolution => SurfaceRefs {
                curve: Some(CurveId(to_id(reader.load_f32()?, "swept curve id")?)),
                basis: None,
            },
            SurfaceType::OffsetSurface => {
                reader.advance(4)?;
                SurfaceRefs {
                    curve: None,
                    basis: Some(SurfaceId(to_id(reader.load_f32()?, "offset basis surface id")?)),
                }
            }
            _ => SurfaceRefs::default(),
        })
    }

    /// Read the TOC entry. The trim-set id is only decoded when `include_trim_set`
    /// is set, and a stored `-1` always reports no trimming.
    pub fn surface_dims(&self, id: SurfaceId, include_trim_set: bool) -> Result<SurfaceDims> {
        let mut reader = self.toc_reader(id)?;
        reader.advance(4)?;
        let curvature_u = reader.load_f16()?;
        let curvature_v = reader.load_f16()?;
        let size_u = reader.load_f16()?;
        let size_v = reader.load_f16()?;
        let flags = SurfaceFlags::from_bits_truncate(to_bits(reader.load_f16()?));
        let trim_set = if include_trim_set {
            self.codec.read_trim_set_id(&mut reader)?
        } else {
            None
        };
        Ok(SurfaceDims {
            curvature_u,
            curvature_v,
            size_u,
            size_v,
            flags,
            trim_set,
        })
    }

    /// Decode a surface. Swept surfaces resolve their base curve from `curves`.
    pub fn surface_data(&self, id: SurfaceId, curves: &CurveLibrary) -> Result<SurfaceData> {
        self.read_surface(id, curves, true)
    }

    pub fn surface_data_or_empty(&self, id: SurfaceId, curves: &CurveLibrary) -> SurfaceData {
        self.surface_data(id, curves).unwrap_or_else(|err| {
            log::warn!("surface {id}: {err}; using empty placeholder");
            SurfaceData::empty()
        })
    }

    pub fn decode_all(&self, curves: &CurveLibrary) -> Vec<SurfaceData> {
        (0..self.num_surfaces as u32)
            .map(|i| self.surface_data_or_empty(SurfaceId(i), curves))
            .collect()
    }

    fn read_surface(&self, id: SurfaceId, curves: &CurveLibrary, allow_offset: bool) -> Result<SurfaceData> {
        let mut reader = self.seek_surface_data(id, 0)?;
        let surface_type = SurfaceType::from_code(reader.load_f16()? as i32)?;
        let _flags = reader.load_f16()?;
        let d = reader.load_f32_array(4)?;
        let domain = Box2::new(
            DVec2::new(d[0] as f64, d[1] as f64),
            DVec2::new(d[2] as f64, d[3] as f64),
        );
        let r = &mut reader;

        let geometry = match surface_type {
            SurfaceType::Plane => SurfaceGeometry::Plane(Plane),
            SurfaceType::PolyPlane => SurfaceGeometry::PolyPlane(Plane),
            SurfaceType::Cylinder => SurfaceGeometry::Cylinder(Cylinder::new(r.load_f32()? as f64)),
            SurfaceType::Cone => {
                let radius = r.load_f32()? as f64;
                let semi_angle = r.load_f32()? as f64;
                SurfaceGeometry::Cone(Cone::new(radius, semi_angle))
            }
            SurfaceType::Sphere => SurfaceGeometry::Sphere(Sphere::new(r.load_f32()? as f64)),
            SurfaceType::Torus => {
                let major = r.load_f32()? as f64;
                let minor = r.load_f32()? as f64;
                SurfaceGeometry::Torus(Torus::new(major, minor))
            }
            SurfaceType::LinearExtrusion | SurfaceType::Revolution => {
                let curve_id = CurveId(to_id(r.load_f32()?, "swept curve id")?);
                let xfo = load_xfo(r)?;
                let curve = curves.curve_data(curve_id)?.geometry;
                if surface_type == SurfaceType::Revolution {
                    SurfaceGeometry::Revolution(Revolution::new(curve, xfo))
                } else {
                    SurfaceGeometry::LinearExtrusion(LinearExtrusion::new(curve, xfo))
                }
            }
            SurfaceType::NurbsSurface => SurfaceGeometry::Nurbs(read_nurbs_surface(r)?),
            SurfaceType::OffsetSurface => {
                let offset = r.load_f32()? as f64;
                let basis_id = SurfaceId(to_id(r.load_f32()?, "offset basis surface id")?);
                if !allow_offset {
                    return Err(CadtexError::Geometry(format!(
                        "offset surface {id} is itself the basis of an offset surface"
                    )));
                }
                let basis = self.read_surface(basis_id, curves, false)?;
                SurfaceGeometry::Offset(OffsetSurface::new(offset, basis.geometry))
            }
            SurfaceType::Fan => {
                let count = load_f16_count(r, "fan point count")?;
                r.advance(2)?;
                let points = (0..count).map(|_| load_point3(r)).collect::<Result<Vec<_>>>()?;
                SurfaceGeometry::Fan(Fan::new(points))
            }
        };
        Ok(SurfaceData::new(domain, geometry))
    }
}

fn read_nurbs_surface(reader: &mut BinaryReader<'_>) -> Result<NurbsSurface> {
    let degree_u = load_f16_count(reader, "NURBS U degree")?;
    let degree_v = load_f16_count(reader, "NURBS V degree")?;
    let num_u = load_f16_count(reader, "NURBS U control point count")?;
    let num_v = load_f16_count(reader, "NURBS V control point count")?;
    let num_knots_u = load_f16_count(reader, "NURBS U knot count")?;
    let num_knots_v = load_f16_count(reader, "NURBS V knot count")?;
    let flags = NurbsFlags::from_bits_truncate(to_bits(reader.load_f16()?));
    reader.advance(2)?;
    let cps = load_dvec4_array(reader, num_u * num_v)?;
    let knots_u = load_f64_array(reader, num_knots_u)?;
    let knots_v = load_f64_array(reader, num_knots_v)?;
    let encoding = knot_encoding(flags);
    NurbsSurface::new(
        degree_u,
        degree_v,
        num_u,
        num_v,
        cps,
        KnotVector::new(knots_u, encoding),
        KnotVector::new(knots_v, encoding),
        flags,
    )
}
