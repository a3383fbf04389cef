//! Little-endian encoder mirroring [`BinaryReader`](crate::reader::BinaryReader).
//!
//! Used to author library buffers, mostly for fixtures and tooling.

use crate::half::f32_to_f16;
use crate::reader::UF16_OFFSET;

/// Encode a value in `[0, 4096)` as an unsigned half-float.
pub fn encode_uf16(value: f32) -> u16 {
    if value >= UF16_OFFSET {
        f32_to_f16(UF16_OFFSET - value) | 0x8000
    } else {
        f32_to_f16(value)
    }
}

/// Split `value` into `(lo, hi)` digits with `lo` in `[0, base)`.
pub fn split_packed(value: i64, base: u32) -> (f32, f32) {
    let base = base as i64;
    let hi = value.div_euclid(base);
    let lo = value.rem_euclid(base);
    (lo as f32, hi as f32)
}

/// Growable output buffer.
#[derive(Debug, Clone, Default)]
pub struct BinaryWriter {
    buf: Vec<u8>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Zero-fill up to `len` bytes; never truncates.
    pub fn pad_to(&mut self, len: usize) {
        if self.buf.len() < len {
            self.buf.resize(len, 0);
        }
    }

    pub fn align(&mut self, alignment: usize) {
        let len = self.buf.len().next_multiple_of(alignment);
        self.pad_to(len);
    }

    /// Overwrite a `u32` already written at `offset`.
    pub fn patch_u32(&mut self, offset: usize, value: u32) {
        self.pad_to(offset + 4);
        self.buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_s32(&mut self, value: i32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_f32s(&mut self, values: &[f32]) {
        for &v in values {
            self.write_f32(v);
        }
    }

    pub fn write_f16(&mut self, value: f32) {
        self.write_u16(f32_to_f16(value));
    }

    pub fn write_uf16(&mut self, value: f32) {
        self.write_u16(encode_uf16(value));
    }

    pub fn write_s32_as_2x_f16(&mut self, value: i32, base: u32) {
        let (lo, hi) = split_packed(value as i64, base);
        self.write_uf16(lo);
        self.write_f16(hi);
    }

    pub fn write_u32_as_2x_uf16(&mut self, value: u32, base: u32) {
        let (lo, hi) = split_packed(value as i64, base);
        self.write_uf16(lo);
        self.write_uf16(hi);
    }

    /// `u32` length then one byte per `char`; non Latin-1 characters become `?`.
    pub fn write_string(&mut self, value: &str) {
        let bytes: Vec<u8> = value
            .chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
            .collect();
        self.write_u32(bytes.len() as u32);
        self.write_bytes(&bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::BinaryReader;

    #[test]
    fn test_uf16_covers_0_to_4095() {
        let mut w = BinaryWriter::new();
        for v in 0..4096 {
            w.write_uf16(v as f32);
        }
        let bytes = w.into_bytes();
        let mut r = BinaryReader::new(&bytes);
        for v in 0..4096 {
            assert_eq!(r.load_uf16().unwrap(), v as f32);
        }
    }

    #[test]
    fn test_packed_pairs_both_bases() {
        for base in [2048u32, 4096] {
            let limit = base as i64 * 2048;
            for value in [0i64, 1, base as i64 - 1, base as i64, 123_456, limit - 1, -1, -(base as i64), -77_777] {
                if value >= limit {
                    continue;
                }
                let mut w = BinaryWriter::new();
                w.write_s32_as_2x_f16(value as i32, base);
                if value >= 0 {
                    w.write_u32_as_2x_uf16(value as u32, base);
                }
                let bytes = w.into_bytes();
                let mut r = BinaryReader::new(&bytes);
                assert_eq!(r.load_s32_from_2x_f16(base).unwrap() as i64, value, "base {base}");
                if value >= 0 {
                    assert_eq!(r.load_u32_from_2x_uf16(base).unwrap() as i64, value, "base {base}");
                }
            }
        }
    }

    #[test]
    fn test_pad_and_patch() {
        let mut w = BinaryWriter::new();
        w.write_u8(1);
        w.align(4);
        assert_eq!(w.len(), 4);
        w.patch_u32(8, 7);
        assert_eq!(w.len(), 12);
        assert_eq!(&w.as_bytes()[8..], &7u32.to_le_bytes());
    }
}
