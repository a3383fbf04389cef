//! Curve library: a TOC buffer plus an RGBA16 payload texture.

use cadtex_core::{CadtexError, CurveId, Result};
use cadtex_geometry::curve::{Circle, Ellipse, Line};
use cadtex_geometry::nurbs::{KnotEncoding, KnotVector, NurbsCurve};
use cadtex_geometry::{CurveData, CurveFlags, CurveGeometry, CurveType, NurbsFlags};
use serde::{Deserialize, Serialize};

use crate::codec::FormatCodec;
use crate::fields::{load_dvec4_array, load_f16_count, load_f64_array, to_bits};
use crate::reader::BinaryReader;
use crate::texel::{square_side, TexelAddr, CURVE_TOC_STRIDE, LIBRARY_HEADER_BYTES, RGBA16_BYTES};

/// Tessellation inputs stored in a curve TOC entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveDims {
    /// Integrated curvature, or a detail when `COST_IS_DETAIL` is set.
    pub param: f32,
    pub length: f32,
    pub flags: CurveFlags,
}

#[derive(Debug, Clone)]
pub struct CurveLibrary {
    toc: Vec<u8>,
    data: Vec<u8>,
    side: usize,
    codec: FormatCodec,
    num_curves: usize,
    total_area: Option<f32>,
}

impl CurveLibrary {
    pub fn new(toc: Vec<u8>, data: Vec<u8>, codec: FormatCodec) -> Result<Self> {
        let side = square_side(data.len(), RGBA16_BYTES)?;
        let (num_curves, total_area) = if toc.is_empty() {
            (0, None)
        } else {
            let mut reader = BinaryReader::with_context(&toc, "curve library header");
            (reader.load_u32()? as usize, codec.read_total_area(&mut reader)?)
        };
        log::debug!("curve library: {num_curves} curves, {side}x{side} texture");
        Ok(Self {
            toc,
            data,
            side,
            codec,
            num_curves,
            total_area,
        })
    }

    pub fn len(&self) -> usize {
        self.num_curves
    }

    pub fn is_empty(&self) -> bool {
        self.num_curves == 0
    }

    pub fn total_area(&self) -> Option<f32> {
        self.total_area
    }

    pub fn codec(&self) -> &FormatCodec {
        &self.codec
    }

    /// Side length of the square payload texture, in texels.
    pub fn texture_side(&self) -> usize {
        self.side
    }

    /// Raw payload texture bytes, ready for upload.
    pub fn texture_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Give back the `(toc, payload)` buffers.
    pub fn into_buffers(self) -> (Vec<u8>, Vec<u8>) {
        (self.toc, self.data)
    }

    fn toc_reader(&self, id: CurveId) -> Result<BinaryReader<'_>> {
        if id.index() >= self.num_curves {
            return Err(CadtexError::NotFound(format!("curve {id} of {}", self.num_curves)));
        }
        let mut reader = BinaryReader::with_context(&self.toc, "curve TOC");
        reader.seek(LIBRARY_HEADER_BYTES + id.index() * CURVE_TOC_STRIDE)?;
        Ok(reader)
    }

    pub fn curve_texel_coords(&self, id: CurveId) -> Result<TexelAddr> {
        let mut reader = self.toc_reader(id)?;
        let x = reader.load_uf16()?;
        let y = reader.load_uf16()?;
        Ok(TexelAddr::new(x as u32, y as u32))
    }

    /// A payload reader positioned `byte_offset` bytes into the curve's record.
    pub fn seek_curve_data(&self, id: CurveId, byte_offset: usize) -> Result<BinaryReader<'_>> {
        let addr = self.curve_texel_coords(id)?;
        let mut reader = BinaryReader::with_context(&self.data, "curve payload");
        reader.seek(addr.byte_offset(RGBA16_BYTES, self.side) + byte_offset)?;
        Ok(reader)
    }

    pub fn curve_type(&self, id: CurveId) -> Result<CurveType> {
        let code = self.seek_curve_data(id, 0)?.load_f16()?;
        CurveType::from_code(code as i32)
    }

    pub fn curve_dims(&self, id: CurveId) -> Result<CurveDims> {
        let mut reader = self.toc_reader(id)?;
        reader.advance(4)?;
        let param = reader.load_f16()?;
        let length = reader.load_f16()?;
        let flags = CurveFlags::from_bits_truncate(to_bits(reader.load_f16()?));
        Ok(CurveDims { param, length, flags })
    }

    pub fn curve_data(&self, id: CurveId) -> Result<CurveData> {
        let mut reader = self.seek_curve_data(id, 0)?;
        let curve_type = CurveType::from_code(reader.load_f16()? as i32)?;
        let _flags = reader.load_f16()?;
        let t0 = reader.load_f32()? as f64;
        let t1 = reader.load_f32()? as f64;

        let geometry = match curve_type {
            CurveType::Line => CurveGeometry::Line(Line),
            CurveType::Circle => CurveGeometry::Circle(Circle::new(reader.load_f32()? as f64)),
            CurveType::Ellipse => {
                let major = reader.load_f32()? as f64;
                let minor = reader.load_f32()? as f64;
                CurveGeometry::Ellipse(Ellipse::new(major, minor))
            }
            CurveType::NurbsCurve => CurveGeometry::Nurbs(read_nurbs_curve(&mut reader)?),
        };
        Ok(CurveData::new((t0, t1), geometry))
    }

    /// Decode one curve, replacing a failed record with an empty placeholder.
    pub fn curve_data_or_empty(&self, id: CurveId) -> CurveData {
        self.curve_data(id).unwrap_or_else(|err| {
            log::warn!("curve {id}: {err}; using empty placeholder");
            CurveData::empty()
        })
    }

    /// Decode every curve; failed records become placeholders.
    pub fn decode_all(&self) -> Vec<CurveData> {
        (0..self.num_curves as u32)
            .map(|i| self.curve_data_or_empty(CurveId(i)))
            .collect()
    }
}

fn read_nurbs_curve(reader: &mut BinaryReader<'_>) -> Result<NurbsCurve> {
    let degree = load_f16_count(reader, "NURBS degree")?;
    let num_cps = load_f16_count(reader, "NURBS control point count")?;
    let num_knots = load_f16_count(reader, "NURBS knot count")?;
    let flags = NurbsFlags::from_bits_truncate(to_bits(reader.load_f16()?));
    let cps = load_dvec4_array(reader, num_cps)?;
    let knots = load_f64_array(reader, num_knots)?;
    NurbsCurve::new(degree, cps, KnotVector::new(knots, knot_encoding(flags)), flags)
}

pub(crate) fn knot_encoding(flags: NurbsFlags) -> KnotEncoding {
    if flags.contains(NurbsFlags::KNOTS_AS_DELTAS) {
        KnotEncoding::Deltas
    } else {
        KnotEncoding::Absolute
    }
}
