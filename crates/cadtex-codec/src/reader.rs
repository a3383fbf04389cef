//! Cursor-based little-endian decoder over a byte buffer.

use cadtex_core::{CadtexError, Result};

use crate::half::f16_to_f32;

/// Sign bit of a raw half-float.
const HALF_SIGN: u16 = 0x8000;

/// Offset added to negative `uf16` values, which store magnitudes `>= 2048`.
pub const UF16_OFFSET: f32 = 2048.0;

/// A read cursor over a borrowed buffer.
///
/// Every load checks bounds and fails with [`CadtexError::Decode`] rather than
/// reading past the end.
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
    context: &'static str,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_context(data, "binary buffer")
    }

    /// A reader whose errors name `context`, e.g. `"curve payload"`.
    pub fn with_context(data: &'a [u8], context: &'static str) -> Self {
        Self { data, pos: 0, context }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Move the cursor to an absolute byte offset.
    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.data.len() {
            return Err(CadtexError::decode(self.context, offset, 0, self.data.len()));
        }
        self.pos = offset;
        Ok(())
    }

    pub fn advance(&mut self, n: usize) -> Result<()> {
        let target = self
            .pos
            .checked_add(n)
            .ok_or_else(|| CadtexError::decode(self.context, self.pos, n, self.remaining()))?;
        self.seek(target)
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos.checked_add(N).filter(|&end| end <= self.data.len());
        let Some(end) = end else {
            return Err(CadtexError::decode(self.context, self.pos, N, self.remaining()));
        };
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..end]);
        self.pos = end;
        Ok(out)
    }

    pub fn load_u8(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    pub fn load_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    pub fn load_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    pub fn load_s32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    pub fn load_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.take()?))
    }

    pub fn load_f16(&mut self) -> Result<f32> {
        Ok(f16_to_f32(self.load_u16()?))
    }

    /// Unsigned half-float covering integers in `[0, 4096)`.
    ///
    /// Values with the sign bit set encode `2048 - v`, so `-0.0` reads as 2048.
    pub fn load_uf16(&mut self) -> Result<f32> {
        let bits = self.load_u16()?;
        let value = f16_to_f32(bits);
        Ok(if bits & HALF_SIGN != 0 { UF16_OFFSET - value } else { value })
    }

    /// Signed integer from a `uf16` low digit and an `f16` high digit.
    pub fn load_s32_from_2x_f16(&mut self, base: u32) -> Result<i32> {
        let lo = self.load_uf16()?;
        let hi = self.load_f16()?;
        Ok((lo as f64 + hi as f64 * base as f64) as i32)
    }

    /// Unsigned integer from two `uf16` digits.
    pub fn load_u32_from_2x_uf16(&mut self, base: u32) -> Result<u32> {
        let lo = self.load_uf16()?;
        let hi = self.load_uf16()?;
        Ok((lo as f64 + hi as f64 * base as f64) as u32)
    }

    pub fn load_f32_array(&mut self, count: usize) -> Result<Vec<f32>> {
        self.check_array(count, 4)?;
        (0..count).map(|_| self.load_f32()).collect()
    }

    pub fn load_u32_array(&mut self, count: usize) -> Result<Vec<u32>> {
        self.check_array(count, 4)?;
        (0..count).map(|_| self.load_u32()).collect()
    }

    pub fn load_f16_array(&mut self, count: usize) -> Result<Vec<f32>> {
        self.check_array(count, 2)?;
        (0..count).map(|_| self.load_f16()).collect()
    }

    /// A `u32` length followed by one byte per character.
    pub fn load_string(&mut self) -> Result<String> {
        let len = self.load_u32()? as usize;
        self.check_array(len, 1)?;
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes.iter().map(|&b| b as char).collect())
    }

    /// Fail up front when `count` elements cannot fit, before allocating.
    fn check_array(&self, count: usize, elem_size: usize) -> Result<()> {
        let needed = count.checked_mul(elem_size).unwrap_or(usize::MAX);
        if needed > self.remaining() {
            return Err(CadtexError::decode(self.context, self.pos, needed, self.remaining()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_loads() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x00, 0x00, 0x80, 0x3F];
        let mut r = BinaryReader::new(&data);
        assert_eq!(r.load_u16().unwrap(), 0x0201);
        assert_eq!(r.load_u16().unwrap(), 0x0403);
        assert_eq!(r.load_f32().unwrap(), 1.0);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_out_of_bounds_is_decode_error() {
        let data = [0u8; 3];
        let mut r = BinaryReader::with_context(&data, "test payload");
        let err = r.load_u32().unwrap_err();
        assert!(matches!(
            err,
            CadtexError::Decode {
                context: "test payload",
                offset: 0,
                needed: 4,
                available: 3
            }
        ));
        // a failed load does not move the cursor
        assert_eq!(r.position(), 0);
        assert!(r.seek(4).is_err());
        assert!(r.advance(3).is_ok());
        assert!(r.load_u8().is_err());
    }

    #[test]
    fn test_uf16_negative_zero_is_2048() {
        let data = 0x8000u16.to_le_bytes();
        assert_eq!(BinaryReader::new(&data).load_uf16().unwrap(), 2048.0);
        // -1.0 encodes 2049
        let data = 0xBC00u16.to_le_bytes();
        assert_eq!(BinaryReader::new(&data).load_uf16().unwrap(), 2049.0);
    }

    #[test]
    fn test_string() {
        let mut data = 3u32.to_le_bytes().to_vec();
        data.extend_from_slice(&[b'a', 0xE9, b'z']);
        assert_eq!(BinaryReader::new(&data).load_string().unwrap(), "a\u{e9}z");
    }

    #[test]
    fn test_huge_array_fails_without_allocating() {
        let data = [0u8; 8];
        let mut r = BinaryReader::new(&data);
        assert!(r.load_f32_array(usize::MAX / 2).is_err());
        assert_eq!(r.load_f32_array(2).unwrap().len(), 2);
    }
}
