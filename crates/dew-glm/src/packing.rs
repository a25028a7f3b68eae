//! Packing of normalized, half-precision and double values into 32-bit
//! integers, and back. The first component always lands in the lowest bits.

use half::f16;
use rhizome_dew_dispatch::{
    Candidate, DispatchError, Integer, IntoOutputs, Number, Operation, Param,
};

// ============================================================================
// Kernels
// ============================================================================

fn unorm(x: Number, max: Number) -> u32 {
    (x.clamp(0.0, 1.0) * max).round() as u32
}

fn snorm(x: Number, max: Number, mask: u32) -> u32 {
    ((x.clamp(-1.0, 1.0) * max).round() as i32 as u32) & mask
}

fn lanes<const N: usize>(p: u32) -> [u32; N] {
    let width = 32 / N;
    let mask = (1u32 << width) - 1;
    std::array::from_fn(|i| (p >> (i * width)) & mask)
}

fn join<const N: usize>(parts: [u32; N]) -> u32 {
    let width = 32 / N;
    parts.iter().enumerate().fold(0, |acc, (i, x)| acc | (x << (i * width)))
}

pub fn pack_unorm_2x16(v: [Number; 2]) -> u32 {
    join(v.map(|x| unorm(x, 65535.0)))
}

pub fn unpack_unorm_2x16(p: u32) -> [Number; 2] {
    lanes::<2>(p).map(|x| Number::from(x) / 65535.0)
}

pub fn pack_snorm_2x16(v: [Number; 2]) -> u32 {
    join(v.map(|x| snorm(x, 32767.0, 0xffff)))
}

pub fn unpack_snorm_2x16(p: u32) -> [Number; 2] {
    lanes::<2>(p).map(|x| (Number::from(x as u16 as i16) / 32767.0).clamp(-1.0, 1.0))
}

pub fn pack_unorm_4x8(v: [Number; 4]) -> u32 {
    join(v.map(|x| unorm(x, 255.0)))
}

pub fn unpack_unorm_4x8(p: u32) -> [Number; 4] {
    lanes::<4>(p).map(|x| Number::from(x) / 255.0)
}

pub fn pack_snorm_4x8(v: [Number; 4]) -> u32 {
    join(v.map(|x| snorm(x, 127.0, 0xff)))
}

pub fn unpack_snorm_4x8(p: u32) -> [Number; 4] {
    lanes::<4>(p).map(|x| (Number::from(x as u8 as i8) / 127.0).clamp(-1.0, 1.0))
}

/// Nearest half-precision values, ties to even. Overflow gives infinity.
pub fn pack_half_2x16(v: [Number; 2]) -> u32 {
    join(v.map(|x| u32::from(f16::from_f32(x as f32).to_bits())))
}

pub fn unpack_half_2x16(p: u32) -> [Number; 2] {
    lanes::<2>(p).map(|x| f16::from_bits(x as u16).to_f64())
}

/// Reassembles a double from its low and high 32-bit words.
pub fn pack_double_2x32(words: [u32; 2]) -> Number {
    Number::from_bits(u64::from(words[0]) | (u64::from(words[1]) << 32))
}

pub fn unpack_double_2x32(x: Number) -> [u32; 2] {
    let bits = x.to_bits();
    [bits as u32, (bits >> 32) as u32]
}

// ============================================================================
// Manifest
// ============================================================================

pub fn operations() -> Vec<Operation> {
    vec![
        Operation::new("packUnorm2x16").overload(Candidate::new(pack_unorm_2x16)),
        Operation::new("unpackUnorm2x16").overload(Candidate::new(unpack_unorm_2x16)),
        Operation::new("packSnorm2x16").overload(Candidate::new(pack_snorm_2x16)),
        Operation::new("unpackSnorm2x16").overload(Candidate::new(unpack_snorm_2x16)),
        Operation::new("packUnorm4x8").overload(Candidate::new(pack_unorm_4x8)),
        Operation::new("unpackUnorm4x8").overload(Candidate::new(unpack_unorm_4x8)),
        Operation::new("packSnorm4x8").overload(Candidate::new(pack_snorm_4x8)),
        Operation::new("unpackSnorm4x8").overload(Candidate::new(unpack_snorm_4x8)),
        Operation::new("packHalf2x16").overload(Candidate::new(pack_half_2x16)),
        Operation::new("unpackHalf2x16").overload(Candidate::new(unpack_half_2x16)),
        Operation::new("packDouble2x32").overload(Candidate::raw(
            vec![Param::of::<[Integer; 2]>()],
            |c| {
                let index = c.index();
                let words = c.next::<[Integer; 2]>()?;
                match (u32::try_from(words[0]), u32::try_from(words[1])) {
                    (Ok(lo), Ok(hi)) => Ok(pack_double_2x32([lo, hi]).into_outputs()),
                    _ => Err(DispatchError::Coercion {
                        op: c.op(),
                        position: index + 1,
                        reason: "value out of range for uint32".into(),
                    }),
                }
            },
        )),
        Operation::new("unpackDouble2x32").overload(Candidate::new(|x: Number| {
            unpack_double_2x32(x).map(Integer::from)
        })),
    ]
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::call;
    use rhizome_dew_dispatch::Value;

    #[test]
    fn test_pack_half() {
        assert_eq!(pack_half_2x16([1.0, -2.0]), 0xc000_3c00);
        assert_eq!(pack_half_2x16([0.0, -0.0]), 0x8000_0000);
        assert_eq!(pack_half_2x16([65504.0, 65520.0]), 0x7c00_7bff);
        assert_eq!(pack_half_2x16([f64::INFINITY, f64::NEG_INFINITY]), 0xfc00_7c00);
        let nan = pack_half_2x16([f64::NAN, 0.0]);
        assert_eq!(nan & 0x7c00, 0x7c00);
        assert_ne!(nan & 0x3ff, 0);
    }

    #[test]
    fn test_half_subnormals_round_to_even() {
        let tiny = 2.0f64.powi(-24);
        assert_eq!(pack_half_2x16([tiny, tiny / 2.0]), 1);
        assert_eq!(pack_half_2x16([tiny * 1.5, 0.0]), 2);
        assert_eq!(unpack_half_2x16(0x8001_0001), [tiny, -tiny]);
    }

    #[test]
    fn test_unpack_half() {
        assert_eq!(unpack_half_2x16(0x7bff_0400), [2.0f64.powi(-14), 65504.0]);
        let [inf, _] = unpack_half_2x16(0x0000_7c00);
        assert_eq!(inf, f64::INFINITY);
        let [nan, _] = unpack_half_2x16(0x0000_7e00);
        assert!(nan.is_nan());
    }

    #[test]
    fn test_unorm_snorm() {
        assert_eq!(pack_unorm_2x16([1.0, 0.0]), 0x0000_ffff);
        assert_eq!(unpack_unorm_2x16(0xffff_0000), [0.0, 1.0]);
        assert_eq!(pack_unorm_4x8([2.0, -1.0, 1.0, 0.0]), 0x00ff_00ff);
        assert_eq!(pack_snorm_4x8([1.0, -1.0, 0.0, 0.5]), 0x4000_817f);
        assert_eq!(unpack_snorm_4x8(0x4000_817f), [1.0, -1.0, 0.0, 64.0 / 127.0]);
        assert_eq!(pack_snorm_2x16([-1.0, 1.0]), 0x7fff_8001);
        assert_eq!(unpack_snorm_2x16(0x7fff_8000), [-1.0, 1.0]);
    }

    #[test]
    fn test_double_words() {
        assert_eq!(pack_double_2x32([0, 0x3ff0_0000]), 1.0);
        assert_eq!(unpack_double_2x32(-2.0), [0, 0xc000_0000]);
    }

    #[test]
    fn test_dispatch() {
        let out = call("packHalf2x16", [Value::from([1.0, -2.0])]).unwrap();
        assert_eq!(out, vec![Value::Int(0xc000_3c00)]);
        let out = call("unpackHalf2x16", [Value::Int(0xc000_3c00)]).unwrap();
        assert_eq!(out, vec![Value::from([1.0, -2.0])]);

        let out = call("unpackDouble2x32", [Value::Float(1.0)]).unwrap();
        assert_eq!(out, vec![Value::from([0i64, 0x3ff0_0000])]);
        let out = call("packDouble2x32", [out[0].clone()]).unwrap();
        assert_eq!(out, vec![Value::Float(1.0)]);
    }

    #[test]
    fn test_out_of_range_words() {
        let err = call("packDouble2x32", [Value::from([-1i64, 0])]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "bad argument #1 to 'packDouble2x32' (value out of range for uint32)"
        );
        let err = call("unpackUnorm2x16", [Value::Int(1 << 40)]).unwrap_err();
        assert!(matches!(err, DispatchError::Coercion { .. }));
    }
}
