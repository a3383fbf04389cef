//! Body library: a TOC of texel addresses plus an RGBA32 descriptor texture.

use cadtex_core::{BodyId, CadtexError, Result};
use cadtex_math::{Box3, Xfo};
use serde::{Deserialize, Serialize};

use crate::codec::FormatCodec;
use crate::fields::{load_point3, to_count, to_id};
use crate::reader::BinaryReader;
use crate::texel::{square_side, TexelAddr, RGBA32_BYTES};

/// An instance of a surface or curve inside a body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyItemRef {
    /// Surface or curve id, depending on the list it sits in.
    pub id: u32,
    pub xfo: Xfo,
    /// Present from the colored-reference format on.
    pub color: Option<[f32; 4]>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyDescriptor {
    pub bbox: Box3,
    pub surfaces: Vec<BodyItemRef>,
    pub curves: Vec<BodyItemRef>,
}

#[derive(Debug, Clone)]
pub struct BodyLibrary {
    toc: Vec<u8>,
    data: Vec<u8>,
    side: usize,
    codec: FormatCodec,
    num_bodies: usize,
}

impl BodyLibrary {
    pub fn new(toc: Vec<u8>, data: Vec<u8>, codec: FormatCodec) -> Result<Self> {
        let side = square_side(data.len(), RGBA32_BYTES)?;
        let num_bodies = if toc.is_empty() {
            0
        } else {
            BinaryReader::with_context(&toc, "body TOC").load_u32()? as usize
        };
        log::debug!("body library: {num_bodies} bodies, {side}x{side} texture");
        Ok(Self {
            toc,
            data,
            side,
            codec,
            num_bodies,
        })
    }

    pub fn len(&self) -> usize {
        self.num_bodies
    }

    pub fn is_empty(&self) -> bool {
        self.num_bodies == 0
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

    pub fn body_texel_coords(&self, id: BodyId) -> Result<TexelAddr> {
        if id.index() >= self.num_bodies {
            return Err(CadtexError::NotFound(format!("body {id} of {}", self.num_bodies)));
        }
        let mut reader = BinaryReader::with_context(&self.toc, "body TOC");
        reader.seek(4 + id.index() * 8)?;
        let x = to_id(reader.load_f32()?, "body texel x")?;
        let y = to_id(reader.load_f32()?, "body texel y")?;
        Ok(TexelAddr::new(x, y))
    }

    pub fn seek_body_data(&self, id: BodyId, byte_offset: usize) -> Result<BinaryReader<'_>> {
        let addr = self.body_texel_coords(id)?;
        let mut reader = BinaryReader::with_context(&self.data, "body descriptor");
        reader.seek(addr.byte_offset(RGBA32_BYTES, self.side) + byte_offset)?;
        Ok(reader)
    }

    pub fn body(&self, id: BodyId) -> Result<BodyDescriptor> {
        let mut reader = self.seek_body_data(id, 0)?;
        let mut bbox = Box3::EMPTY;
        bbox.add_point(load_point3(&mut reader)?);
        bbox.add_point(load_point3(&mut reader)?);
        let num_surfaces = to_count(reader.load_f32()?, "body surface count")?;
        let num_curves = if self.codec.body_curves {
            to_count(reader.load_f32()?, "body curve count")?
        } else {
            0
        };
        let surfaces = self.read_refs(&mut reader, num_surfaces)?;
        let curves = self.read_refs(&mut reader, num_curves)?;
        Ok(BodyDescriptor { bbox, surfaces, curves })
    }

    pub fn body_or_empty(&self, id: BodyId) -> BodyDescriptor {
        self.body(id).unwrap_or_else(|err| {
            log::warn!("body {id}: {err}; using empty placeholder");
            BodyDescriptor::default()
        })
    }

    pub fn decode_all(&self) -> Vec<BodyDescriptor> {
        (0..self.num_bodies as u32)
            .map(|i| self.body_or_empty(BodyId(i)))
            .collect()
    }

    fn read_refs(&self, reader: &mut BinaryReader<'_>, count: usize) -> Result<Vec<BodyItemRef>> {
        let stride = self.codec.body_ref_floats();
        let raw = reader.load_f32_array(count * stride)?;
        raw.chunks_exact(stride)
            .map(|c| {
                let mut xfo = [0.0f64; 10];
                for (dst, src) in xfo.iter_mut().zip(&c[1..11]) {
                    *dst = *src as f64;
                }
                Ok(BodyItemRef {
                    id: to_id(c[0], "body item id")?,
                    xfo: Xfo::from_array(&xfo),
                    color: self.codec.body_ref_color.then(|| [c[11], c[12], c[13], c[14]]),
                })
            })
            .collect()
    }
}
