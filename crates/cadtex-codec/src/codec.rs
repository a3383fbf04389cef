//! Version-gated field encodings, decided once per load.

use cadtex_core::{FormatVersion, Result, TrimSetId};
use serde::{Deserialize, Serialize};

use crate::reader::BinaryReader;
use crate::writer::BinaryWriter;

/// Packed-pair base before [`FormatVersion::WIDE_PACKED_PAIRS`].
pub const NARROW_PACKED_BASE: u32 = 2048;
/// Packed-pair base from [`FormatVersion::WIDE_PACKED_PAIRS`] on.
pub const WIDE_PACKED_BASE: u32 = 4096;
/// Multiplier of the high digit in the legacy trim-set id encoding.
pub const LEGACY_TRIM_SET_BASE: f32 = 256.0;

/// Every encoding choice that depends on the format version.
///
/// Built once from a [`FormatVersion`]; decoders ask it instead of comparing
/// versions themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatCodec {
    pub version: FormatVersion,
    pub packed_base: u32,
    pub has_total_area: bool,
    pub signed_trim_set_ids: bool,
    pub body_ref_color: bool,
    pub body_curves: bool,
}

impl FormatCodec {
    pub fn new(version: FormatVersion) -> Self {
        Self {
            version,
            packed_base: if version.at_least(FormatVersion::WIDE_PACKED_PAIRS) {
                WIDE_PACKED_BASE
            } else {
                NARROW_PACKED_BASE
            },
            has_total_area: version.at_least(FormatVersion::TOTAL_AREA),
            signed_trim_set_ids: version.at_least(FormatVersion::SIGNED_TRIM_SET_ID),
            body_ref_color: version.at_least(FormatVersion::BODY_REF_COLOR),
            body_curves: version.at_least(FormatVersion::BODY_CURVES),
        }
    }

    /// The optional aggregate area following an item count.
    pub fn read_total_area(&self, reader: &mut BinaryReader<'_>) -> Result<Option<f32>> {
        if self.has_total_area {
            Ok(Some(reader.load_f32()?))
        } else {
            Ok(None)
        }
    }

    /// The two-half-float trim-set id of a surface TOC entry; `-1` means none.
    pub fn read_trim_set_id(&self, reader: &mut BinaryReader<'_>) -> Result<Option<TrimSetId>> {
        let signed = if self.signed_trim_set_ids {
            reader.load_s32_from_2x_f16(self.packed_base)?
        } else {
            let a = reader.load_f16()?;
            let b = reader.load_f16()?;
            (a + b * LEGACY_TRIM_SET_BASE) as i32
        };
        Ok(TrimSetId::from_signed(signed))
    }

    pub fn read_s32_pair(&self, reader: &mut BinaryReader<'_>) -> Result<i32> {
        reader.load_s32_from_2x_f16(self.packed_base)
    }

    pub fn read_u32_pair(&self, reader: &mut BinaryReader<'_>) -> Result<u32> {
        reader.load_u32_from_2x_uf16(self.packed_base)
    }

    pub fn write_total_area(&self, writer: &mut BinaryWriter, area: f32) {
        if self.has_total_area {
            writer.write_f32(area);
        }
    }

    pub fn write_trim_set_id(&self, writer: &mut BinaryWriter, id: Option<TrimSetId>) {
        let signed = TrimSetId::to_signed(id);
        if self.signed_trim_set_ids {
            writer.write_s32_as_2x_f16(signed, self.packed_base);
        } else {
            let hi = (signed as f32 / LEGACY_TRIM_SET_BASE).floor();
            writer.write_f16(signed as f32 - hi * LEGACY_TRIM_SET_BASE);
            writer.write_f16(hi);
        }
    }

    /// Number of `f32` values in one body instance reference.
    pub fn body_ref_floats(&self) -> usize {
        if self.body_ref_color {
            15
        } else {
            11
        }
    }
}

impl Default for FormatCodec {
    fn default() -> Self {
        Self::new(FormatVersion::latest())
    }
}

impl From<FormatVersion> for FormatCodec {
    fn from(version: FormatVersion) -> Self {
        Self::new(version)
    }
}
