//! Field helpers shared by the library decoders.

use cadtex_core::{CadtexError, Result};
use cadtex_math::{DVec4, Point3, Xfo};

use crate::reader::BinaryReader;

/// Interpret a float-stored count; must be a non-negative integer.
pub(crate) fn to_count(value: f32, what: &str) -> Result<usize> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
        return Err(CadtexError::Geometry(format!("invalid {what}: {value}")));
    }
    Ok(value as usize)
}

/// Interpret a float-stored id; must be a non-negative integer.
pub(crate) fn to_id(value: f32, what: &str) -> Result<u32> {
    to_count(value, what).map(|v| v as u32)
}

/// Float-stored bit flags; non-integral or negative values carry no bits.
pub(crate) fn to_bits(value: f32) -> u32 {
    if value.is_finite() && value >= 0.0 {
        value as u32
    } else {
        0
    }
}

pub(crate) fn load_f16_count(reader: &mut BinaryReader<'_>, what: &str) -> Result<usize> {
    to_count(reader.load_f16()?, what)
}

pub(crate) fn load_point3(reader: &mut BinaryReader<'_>) -> Result<Point3> {
    Ok(Point3::new(
        reader.load_f32()? as f64,
        reader.load_f32()? as f64,
        reader.load_f32()? as f64,
    ))
}

pub(crate) fn load_dvec4_array(reader: &mut BinaryReader<'_>, count: usize) -> Result<Vec<DVec4>> {
    let raw = reader.load_f32_array(count * 4)?;
    Ok(raw
        .chunks_exact(4)
        .map(|c| DVec4::new(c[0] as f64, c[1] as f64, c[2] as f64, c[3] as f64))
        .collect())
}

pub(crate) fn load_f64_array(reader: &mut BinaryReader<'_>, count: usize) -> Result<Vec<f64>> {
    Ok(reader.load_f32_array(count)?.into_iter().map(f64::from).collect())
}

/// Ten floats: translation, quaternion `xyzw`, scale.
pub(crate) fn load_xfo(reader: &mut BinaryReader<'_>) -> Result<Xfo> {
    let raw = reader.load_f32_array(10)?;
    let mut v = [0.0f64; 10];
    for (dst, src) in v.iter_mut().zip(raw) {
        *dst = src as f64;
    }
    Ok(Xfo::from_array(&v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        assert_eq!(to_count(3.0, "n").unwrap(), 3);
        assert!(to_count(-1.0, "n").is_err());
        assert!(to_count(1.5, "n").is_err());
        assert!(to_count(f32::NAN, "n").is_err());
        assert_eq!(to_bits(-4.0), 0);
        assert_eq!(to_bits(12.0), 12);
    }
}
