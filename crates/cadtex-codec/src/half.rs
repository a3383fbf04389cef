//! IEEE-754 binary16 conversion.

const F16_EXP_MASK: u16 = 0x7C00;
const F16_MANT_MASK: u16 = 0x03FF;
const F16_SIGN_MASK: u16 = 0x8000;

/// Decode a half-float bit pattern exactly, including denormals, infinities and NaN.
pub fn f16_to_f32(bits: u16) -> f32 {
    let sign = if bits & F16_SIGN_MASK != 0 { -1.0f32 } else { 1.0 };
    let exp = (bits & F16_EXP_MASK) >> 10;
    let mant = bits & F16_MANT_MASK;
    match exp {
        0 => sign * (mant as f32) * 2f32.powi(-24),
        0x1F => {
            if mant == 0 {
                sign * f32::INFINITY
            } else {
                f32::NAN
            }
        }
        _ => sign * (1.0 + mant as f32 / 1024.0) * 2f32.powi(exp as i32 - 15),
    }
}

/// Encode an `f32` as a half-float with round-to-nearest-even.
///
/// Values beyond the half range become infinities; NaN stays NaN.
pub fn f32_to_f16(value: f32) -> u16 {
    let bits = value.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exp = ((bits >> 23) & 0xFF) as i32;
    let mant = bits & 0x007F_FFFF;

    if exp == 0xFF {
        return if mant == 0 { sign | F16_EXP_MASK } else { sign | 0x7E00 };
    }

    let half_exp = exp - 127 + 15;
    if half_exp >= 0x1F {
        return sign | F16_EXP_MASK;
    }

    if half_exp <= 0 {
        // denormal or zero
        if half_exp < -10 {
            return sign;
        }
        let full = mant | 0x0080_0000;
        let shift = (14 - half_exp) as u32;
        let half_mant = full >> shift;
        let rem = full & ((1 << shift) - 1);
        let halfway = 1 << (shift - 1);
        let rounded = if rem > halfway || (rem == halfway && half_mant & 1 == 1) {
            half_mant + 1
        } else {
            half_mant
        };
        return sign | rounded as u16;
    }

    let half_mant = mant >> 13;
    let rem = mant & 0x1FFF;
    let mut out = ((half_exp as u32) << 10) | half_mant;
    if rem > 0x1000 || (rem == 0x1000 && half_mant & 1 == 1) {
        // carries into the exponent when the mantissa overflows, up to infinity
        out += 1;
    }
    sign | out as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        assert_eq!(f16_to_f32(0x3C00), 1.0);
        assert_eq!(f16_to_f32(0xC000), -2.0);
        assert_eq!(f16_to_f32(0x7BFF), 65504.0);
        assert_eq!(f16_to_f32(0x0001), 2f32.powi(-24));
        assert_eq!(f16_to_f32(0x7C00), f32::INFINITY);
        assert_eq!(f16_to_f32(0xFC00), f32::NEG_INFINITY);
        assert!(f16_to_f32(0x7E00).is_nan());
        assert!(f16_to_f32(0x8000).is_sign_negative());
    }

    #[test]
    fn test_every_half_roundtrips() {
        for bits in 0..=u16::MAX {
            let value = f16_to_f32(bits);
            if value.is_nan() {
                assert!(f16_to_f32(f32_to_f16(value)).is_nan());
            } else {
                assert_eq!(f32_to_f16(value), bits, "bits {bits:#06x} -> {value}");
            }
        }
    }

    #[test]
    fn test_rounding() {
        // 2049 sits between 2048 and 2050 and rounds to even
        assert_eq!(f16_to_f32(f32_to_f16(2049.0)), 2048.0);
        assert_eq!(f16_to_f32(f32_to_f16(2051.0)), 2052.0);
        assert_eq!(f32_to_f16(1.0e6), 0x7C00);
        assert_eq!(f32_to_f16(1.0e-9), 0);
    }
}
