//! Conversions behind the `PK*` and `UP*` instructions.
//!
//! Packing stores the bits of the packed integer in an `f32` register component without
//! converting it, unpacking reads them back the same way.

use crate::instruction::Vec4;

/// Converts a float to IEEE 754 binary16 bits, rounding to nearest even.
pub fn float_to_half(value: f32) -> u16 {
    let bits = value.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exponent = ((bits >> 23) & 0xff) as i32;
    let mantissa = bits & 0x007f_ffff;

    if exponent == 0xff {
        return match mantissa {
            0 => sign | 0x7c00,
            _ => sign | 0x7e00 | (mantissa >> 13) as u16,
        };
    }

    let half_exponent = exponent - 127 + 15;

    if half_exponent >= 0x1f {
        return sign | 0x7c00;
    }

    if half_exponent <= 0 {
        if half_exponent < -10 {
            return sign;
        }

        let mantissa = mantissa | 0x0080_0000;
        let shift = (14 - half_exponent) as u32;
        let halfway = 1 << (shift - 1);
        let remainder = mantissa & ((1 << shift) - 1);
        let mut result = mantissa >> shift;

        if remainder > halfway || (remainder == halfway && result & 1 != 0) {
            result += 1;
        }

        return sign | result as u16;
    }

    let mut result = ((half_exponent as u32) << 10) | (mantissa >> 13);
    let remainder = mantissa & 0x1fff;

    // A carry out of the mantissa correctly bumps the exponent, up to infinity.
    if remainder > 0x1000 || (remainder == 0x1000 && result & 1 != 0) {
        result += 1;
    }

    sign | result as u16
}

/// Converts IEEE 754 binary16 bits to a float.
pub fn half_to_float(half: u16) -> f32 {
    let sign = ((half & 0x8000) as u32) << 16;
    let exponent = ((half >> 10) & 0x1f) as u32;
    let mantissa = (half & 0x03ff) as u32;

    let bits = match exponent {
        0 if mantissa == 0 => sign,
        0 => {
            let mut exponent = 127 - 15 + 1;
            let mut mantissa = mantissa;

            while mantissa & 0x0400 == 0 {
                mantissa <<= 1;
                exponent -= 1;
            }

            sign | (exponent << 23) | ((mantissa & 0x03ff) << 13)
        },
        0x1f => sign | 0x7f80_0000 | (mantissa << 13),
        _ => sign | ((exponent + 127 - 15) << 23) | (mantissa << 13),
    };

    f32::from_bits(bits)
}

fn clamp(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}

fn broadcast_bits(bits: u32) -> Vec4 {
    [f32::from_bits(bits); 4]
}

pub fn pack_half_2(value: Vec4) -> Vec4 {
    let x = float_to_half(value[0]) as u32;
    let y = float_to_half(value[1]) as u32;

    broadcast_bits(x | (y << 16))
}

pub fn pack_unsigned_short_2(value: Vec4) -> Vec4 {
    let pack = |v: f32| (clamp(v, 0.0, 1.0) * 65535.0).round() as u32;

    broadcast_bits(pack(value[0]) | (pack(value[1]) << 16))
}

pub fn pack_byte_4(value: Vec4) -> Vec4 {
    let pack = |v: f32| (clamp(v, -128.0 / 127.0, 1.0) * 127.0 + 128.0).round() as u32;

    broadcast_bits(
        pack(value[0])
            | (pack(value[1]) << 8)
            | (pack(value[2]) << 16)
            | (pack(value[3]) << 24)
    )
}

pub fn pack_unsigned_byte_4(value: Vec4) -> Vec4 {
    let pack = |v: f32| (clamp(v, 0.0, 1.0) * 255.0).round() as u32;

    broadcast_bits(
        pack(value[0])
            | (pack(value[1]) << 8)
            | (pack(value[2]) << 16)
            | (pack(value[3]) << 24)
    )
}

pub fn unpack_half_2(value: f32) -> Vec4 {
    let bits = value.to_bits();
    let x = half_to_float((bits & 0xffff) as u16);
    let y = half_to_float((bits >> 16) as u16);

    [x, y, x, y]
}

pub fn unpack_unsigned_short_2(value: f32) -> Vec4 {
    let bits = value.to_bits();
    let x = (bits & 0xffff) as f32 / 65535.0;
    let y = (bits >> 16) as f32 / 65535.0;

    [x, y, x, y]
}

fn bytes(value: f32) -> [u32; 4] {
    let bits = value.to_bits();

    [bits & 0xff, (bits >> 8) & 0xff, (bits >> 16) & 0xff, bits >> 24]
}

pub fn unpack_byte_4(value: f32) -> Vec4 {
    let b = bytes(value);
    let unpack = |b: u32| (b as f32 - 128.0) / 127.0;

    [unpack(b[0]), unpack(b[1]), unpack(b[2]), unpack(b[3])]
}

pub fn unpack_unsigned_byte_4(value: f32) -> Vec4 {
    let b = bytes(value);
    let unpack = |b: u32| b as f32 / 255.0;

    [unpack(b[0]), unpack(b[1]), unpack(b[2]), unpack(b[3])]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_conversion() {
        assert_eq!(float_to_half(1.0), 0x3c00);
        assert_eq!(float_to_half(-2.0), 0xc000);
        assert_eq!(float_to_half(0.0), 0x0000);
        assert_eq!(float_to_half(-0.0), 0x8000);
        assert_eq!(float_to_half(65504.0), 0x7bff);
        assert_eq!(float_to_half(65520.0), 0x7c00);
        assert_eq!(float_to_half(f32::INFINITY), 0x7c00);
        assert_eq!(float_to_half(5.960_464_5e-8), 0x0001);
        assert!(half_to_float(float_to_half(f32::NAN)).is_nan());

        assert_eq!(half_to_float(0x3c00), 1.0);
        assert_eq!(half_to_float(0x3555), 0.333_251_95);
        assert_eq!(half_to_float(0x0001), 5.960_464_5e-8);
        assert_eq!(half_to_float(0xfc00), f32::NEG_INFINITY);
    }

    #[test]
    fn test_half_rounds_to_even() {
        // 1 + 2^-11 is halfway between 1.0 and the next half, ties to the even 1.0.
        assert_eq!(float_to_half(1.0 + 1.0 / 2048.0), 0x3c00);
        // 1 + 3 * 2^-11 is halfway between two halves, ties to the even one above.
        assert_eq!(float_to_half(1.0 + 3.0 / 2048.0), 0x3c02);
    }

    #[test]
    fn test_pack_half_2() {
        let packed = pack_half_2([1.5, -2.0, 7.0, 9.0]);

        assert_eq!(packed[0].to_bits(), 0xc000_3e00);
        assert_eq!(packed[0].to_bits(), packed[3].to_bits());
        assert_eq!(unpack_half_2(packed[0]), [1.5, -2.0, 1.5, -2.0]);
    }

    #[test]
    fn test_pack_bytes() {
        let packed = pack_unsigned_byte_4([0.0, 1.0, 0.5, 2.0]);
        assert_eq!(packed[0].to_bits(), 0xff80_ff00);

        let unpacked = unpack_unsigned_byte_4(packed[0]);
        assert_eq!(unpacked[0], 0.0);
        assert_eq!(unpacked[1], 1.0);
        assert_eq!(unpacked[3], 1.0);

        let packed = pack_byte_4([-1.0, 0.0, 1.0, -5.0]);
        assert_eq!(packed[0].to_bits(), 0x00ff_8001);
        assert_eq!(unpack_byte_4(packed[0]), [-1.0, 0.0, 1.0, -128.0 / 127.0]);
    }

    #[test]
    fn test_pack_unsigned_short_2() {
        let packed = pack_unsigned_short_2([1.0, 0.0, 0.0, 0.0]);
        assert_eq!(packed[0].to_bits(), 0x0000_ffff);
        assert_eq!(unpack_unsigned_short_2(packed[0]), [1.0, 0.0, 1.0, 0.0]);
    }
}
