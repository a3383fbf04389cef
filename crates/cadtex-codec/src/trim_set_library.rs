//! Trim-set buffer: per-surface perimeter and hole loops of placed 2D curves.

use cadtex_core::{CadtexError, CurveId, Result, TrimSetId};
use cadtex_geometry::CurveRefFlags;
use cadtex_math::{Vector2, Xfo2};
use serde::{Deserialize, Serialize};

use crate::codec::FormatCodec;
use crate::fields::{to_bits, to_id};
use crate::reader::BinaryReader;

/// A curve placed into a trim set's 2D space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimCurveRef {
    pub curve: CurveId,
    pub xfo: Xfo2,
    pub flags: CurveRefFlags,
}

impl TrimCurveRef {
    pub fn is_reversed(&self) -> bool {
        self.flags.contains(CurveRefFlags::REVERSED)
    }
}

/// Boundary of a surface's visible parametric region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrimSet {
    pub size: Vector2,
    pub perimeter: Vec<TrimCurveRef>,
    pub holes: Vec<Vec<TrimCurveRef>>,
}

impl TrimSet {
    pub fn is_empty(&self) -> bool {
        self.perimeter.is_empty() && self.holes.iter().all(Vec::is_empty)
    }

    /// Every curve reference, perimeter first.
    pub fn curve_refs(&self) -> impl Iterator<Item = &TrimCurveRef> {
        self.perimeter.iter().chain(self.holes.iter().flatten())
    }
}

#[derive(Debug, Clone)]
pub struct TrimSetLibrary {
    buffer: Vec<u8>,
    codec: FormatCodec,
    num_trim_sets: usize,
    total_area: Option<f32>,
    table_offset: usize,
}

impl TrimSetLibrary {
    pub fn new(buffer: Vec<u8>, codec: FormatCodec) -> Result<Self> {
        if buffer.is_empty() {
            return Ok(Self {
                buffer,
                codec,
                num_trim_sets: 0,
                total_area: None,
                table_offset: 0,
            });
        }
        let mut reader = BinaryReader::with_context(&buffer, "trim-set header");
        let num_trim_sets = reader.load_u32()? as usize;
        let total_area = codec.read_total_area(&mut reader)?;
        let table_offset = reader.position();
        log::debug!("trim-set library: {num_trim_sets} trim sets");
        Ok(Self {
            buffer,
            codec,
            num_trim_sets,
            total_area,
            table_offset,
        })
    }

    pub fn len(&self) -> usize {
        self.num_trim_sets
    }

    pub fn is_empty(&self) -> bool {
        self.num_trim_sets == 0
    }

    pub fn total_area(&self) -> Option<f32> {
        self.total_area
    }

    pub fn codec(&self) -> &FormatCodec {
        &self.codec
    }

    pub fn into_buffer(self) -> Vec<u8> {
        self.buffer
    }

    pub fn trim_set(&self, id: TrimSetId) -> Result<TrimSet> {
        if id.index() >= self.num_trim_sets {
            return Err(CadtexError::NotFound(format!("trim set {id} of {}", self.num_trim_sets)));
        }
        let mut reader = BinaryReader::with_context(&self.buffer, "trim-set record");
        reader.seek(self.table_offset + id.index() * 4)?;
        let offset = reader.load_u32()? as usize;
        if offset % 4 != 0 {
            return Err(CadtexError::Geometry(format!(
                "trim set {id} starts at unaligned offset {offset}"
            )));
        }
        reader.seek(offset)?;

        let size = Vector2::new(reader.load_f32()? as f64, reader.load_f32()? as f64);
        let num_holes = reader.load_u32()? as usize;
        let num_perimeter = reader.load_u32()? as usize;
        let perimeter = read_refs(&mut reader, num_perimeter)?;
        let mut holes = Vec::with_capacity(num_holes.min(reader.remaining() / 4));
        for _ in 0..num_holes {
            let count = reader.load_u32()? as usize;
            holes.push(read_refs(&mut reader, count)?);
        }
        Ok(TrimSet {
            size,
            perimeter,
            holes,
        })
    }

    pub fn trim_set_or_empty(&self, id: TrimSetId) -> TrimSet {
        self.trim_set(id).unwrap_or_else(|err| {
            log::warn!("trim set {id}: {err}; using empty placeholder");
            TrimSet::default()
        })
    }

    pub fn decode_all(&self) -> Vec<TrimSet> {
        (0..self.num_trim_sets as u32)
            .map(|i| self.trim_set_or_empty(TrimSetId(i)))
            .collect()
    }
}

/// Eight floats per reference: curve id, translation, row-major 2x2, flags.
fn read_refs(reader: &mut BinaryReader<'_>, count: usize) -> Result<Vec<TrimCurveRef>> {
    let raw = reader.load_f32_array(count * 8)?;
    raw.chunks_exact(8)
        .map(|c| {
            Ok(TrimCurveRef {
                curve: CurveId(to_id(c[0], "trim curve id")?),
                xfo: Xfo2::new(
                    Vector2::new(c[1] as f64, c[2] as f64),
                    [c[3] as f64, c[4] as f64, c[5] as f64, c[6] as f64],
                ),
                flags: CurveRefFlags::from_bits_truncate(to_bits(c[7])),
            })
        })
        .collect()
}
