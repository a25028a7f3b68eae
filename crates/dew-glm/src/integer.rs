//! Integer and bit-manipulation functions.
//!
//! Bit operations work on the full 64-bit integer width. The carry, borrow
//! and extended-multiply functions work on 32-bit operands and read their
//! arguments as `uint32` or `int32`.

use num_traits::PrimInt;
use rhizome_dew_dispatch::{Candidate, Integer, Operation};

// ============================================================================
// Kernels
// ============================================================================

fn width<T: PrimInt>() -> i64 {
    i64::from(T::zero().count_zeros())
}

pub fn bit_count<T: PrimInt>(x: T) -> Integer {
    Integer::from(x.count_ones())
}

/// Index of the lowest set bit, or -1 for zero.
pub fn find_lsb<T: PrimInt>(x: T) -> Integer {
    if x.is_zero() {
        -1
    } else {
        Integer::from(x.trailing_zeros())
    }
}

/// Index of the highest bit that differs from the sign bit, or -1 when
/// there is none (0 and -1).
pub fn find_msb<T: PrimInt>(x: T) -> Integer {
    let x = if x < T::zero() { !x } else { x };
    if x.is_zero() {
        -1
    } else {
        width::<T>() - 1 - Integer::from(x.leading_zeros())
    }
}

fn field_in_range<T: PrimInt>(offset: Integer, bits: Integer) -> bool {
    offset >= 0 && bits >= 0 && offset.saturating_add(bits) <= width::<T>()
}

/// `bits` bits of `value` starting at `offset`, sign-extended for signed
/// `T`. `None` when the field does not fit.
pub fn bitfield_extract<T: PrimInt>(value: T, offset: Integer, bits: Integer) -> Option<T> {
    if !field_in_range::<T>(offset, bits) {
        return None;
    }
    if bits == 0 {
        return Some(T::zero());
    }
    let w = width::<T>();
    Some((value << (w - offset - bits) as usize) >> (w - bits) as usize)
}

/// `base` with `bits` bits at `offset` replaced by the low bits of
/// `insert`. `None` when the field does not fit.
pub fn bitfield_insert<T: PrimInt>(
    base: T,
    insert: T,
    offset: Integer,
    bits: Integer,
) -> Option<T> {
    if !field_in_range::<T>(offset, bits) {
        return None;
    }
    if bits == 0 {
        return Some(base);
    }
    let low = (!T::zero()).unsigned_shr((width::<T>() - bits) as u32);
    let mask = low << offset as usize;
    Some((base & !mask) | ((insert << offset as usize) & mask))
}

pub fn bitfield_reverse<T: PrimInt>(x: T) -> T {
    x.reverse_bits()
}

/// `(sum, carry)`.
pub fn uadd_carry(a: u32, b: u32) -> (u32, u32) {
    let (sum, carry) = a.overflowing_add(b);
    (sum, u32::from(carry))
}

/// `(difference, borrow)`.
pub fn usub_borrow(a: u32, b: u32) -> (u32, u32) {
    let (diff, borrow) = a.overflowing_sub(b);
    (diff, u32::from(borrow))
}

/// `(msb, lsb)` of the 64-bit product.
pub fn umul_extended(a: u32, b: u32) -> (u32, u32) {
    let p = u64::from(a) * u64::from(b);
    ((p >> 32) as u32, p as u32)
}

/// `(msb, lsb)` of the 64-bit product.
pub fn imul_extended(a: i32, b: i32) -> (i32, i32) {
    let p = i64::from(a) * i64::from(b);
    ((p >> 32) as i32, p as i32)
}

// ============================================================================
// Manifest
// ============================================================================

fn bitwise(name: &'static str, f: fn(Integer) -> Integer) -> Operation {
    Operation::new(name)
        .overload(Candidate::new(move |x: Integer| f(x)))
        .overloads(per_dim!(N => Candidate::new(move |v: [Integer; N]| v.map(f))))
}

pub fn operations() -> Vec<Operation> {
    vec![
        bitwise("bitCount", bit_count),
        bitwise("findLSB", find_lsb),
        bitwise("findMSB", find_msb),
        bitwise("bitfieldReverse", bitfield_reverse),
        Operation::new("bitfieldExtract")
            .overload(Candidate::new(bitfield_extract::<Integer>))
            .overloads(per_dim!(N => Candidate::new(
                |v: [Integer; N], offset: Integer, bits: Integer| {
                    field_in_range::<Integer>(offset, bits)
                        .then(|| v.map(|x| bitfield_extract(x, offset, bits).unwrap_or(0)))
                }
            ))),
        Operation::new("bitfieldInsert")
            .overload(Candidate::new(bitfield_insert::<Integer>))
            .overloads(per_dim!(N => Candidate::new(
                |base: [Integer; N], insert: [Integer; N], offset: Integer, bits: Integer| {
                    field_in_range::<Integer>(offset, bits).then(|| {
                        std::array::from_fn::<Integer, N, _>(|i| {
                            bitfield_insert(base[i], insert[i], offset, bits).unwrap_or(base[i])
                        })
                    })
                }
            ))),
        Operation::new("uaddCarry").overload(Candidate::new(uadd_carry)),
        Operation::new("usubBorrow").overload(Candidate::new(usub_borrow)),
        Operation::new("umulExtended").overload(Candidate::new(umul_extended)),
        Operation::new("imulExtended").overload(Candidate::new(imul_extended)),
    ]
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::call;
    use rhizome_dew_dispatch::{DispatchError, Value};

    #[test]
    fn test_bit_count() {
        assert_eq!(bit_count(7i64), 3);
        assert_eq!(bit_count(-1i64), 64);
        assert_eq!(bit_count(0u32), 0);
    }

    #[test]
    fn test_find_lsb_msb() {
        assert_eq!(find_lsb(0i64), -1);
        assert_eq!(find_lsb(8i64), 3);
        assert_eq!(find_msb(1i64), 0);
        assert_eq!(find_msb(0x100i64), 8);
        assert_eq!(find_msb(0i64), -1);
        assert_eq!(find_msb(-1i64), -1);
        assert_eq!(find_msb(-2i64), 0);
        assert_eq!(find_msb(u32::MAX), 31);
    }

    #[test]
    fn test_bitfield_extract_sign_extends() {
        assert_eq!(bitfield_extract(0x70i64, 4, 4), Some(7));
        assert_eq!(bitfield_extract(0xF0i64, 4, 4), Some(-1));
        assert_eq!(bitfield_extract(0xF0u32, 4, 4), Some(15));
        assert_eq!(bitfield_extract(-1i64, 0, 64), Some(-1));
        assert_eq!(bitfield_extract(123i64, 5, 0), Some(0));
        assert_eq!(bitfield_extract(1i64, 60, 10), None);
        assert_eq!(bitfield_extract(1i64, -1, 2), None);
    }

    #[test]
    fn test_bitfield_insert() {
        assert_eq!(bitfield_insert(0i64, 0b11, 4, 2), Some(0b11_0000));
        assert_eq!(bitfield_insert(0xFFi64, 0, 0, 4), Some(0xF0));
        assert_eq!(bitfield_insert(0i64, -1, 0, 64), Some(-1));
        assert_eq!(bitfield_insert(5i64, 1, 64, 1), None);
    }

    #[test]
    fn test_bitfield_reverse() {
        assert_eq!(bitfield_reverse(1i64), i64::MIN);
        assert_eq!(bitfield_reverse(1u32), 0x8000_0000);
    }

    #[test]
    fn test_carry_borrow_and_extended_multiply() {
        assert_eq!(uadd_carry(u32::MAX, 1), (0, 1));
        assert_eq!(uadd_carry(1, 2), (3, 0));
        assert_eq!(usub_borrow(0, 1), (u32::MAX, 1));
        assert_eq!(umul_extended(u32::MAX, 2), (1, 0xFFFF_FFFE));
        assert_eq!(imul_extended(-1, 1), (-1, -1));
        assert_eq!(imul_extended(i32::MIN, 2), (-1, 0));
    }

    #[test]
    fn test_dispatch_two_outputs() {
        let out = call("uaddCarry", [Value::Int(0xFFFF_FFFF), Value::Int(1)]).unwrap();
        assert_eq!(out, vec![Value::Int(0), Value::Int(1)]);
    }

    #[test]
    fn test_uint32_range_is_a_coercion_error() {
        let err = call("uaddCarry", [Value::Int(-1), Value::Int(0)]).unwrap_err();
        assert!(matches!(err, DispatchError::Coercion { position: 1, .. }));
        assert_eq!(
            err.to_string(),
            "bad argument #1 to 'uaddCarry' (value out of range for uint32)"
        );
    }

    #[test]
    fn test_invalid_field_gives_no_outputs() {
        let out = call("bitfieldExtract", [Value::Int(1), Value::Int(60), Value::Int(10)]).unwrap();
        assert!(out.is_empty());
        let out = call(
            "bitfieldInsert",
            [Value::from([1i64, 2]), Value::from([0i64, 0]), Value::Int(-1), Value::Int(1)],
        )
        .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_integer_vectors() {
        let out = call("bitCount", [Value::from([1i64, 3, 7])]).unwrap();
        assert_eq!(out, vec![Value::from([1i64, 2, 3])]);
        let out = call(
            "bitfieldExtract",
            [Value::from([0x70i64, 0xF0]), Value::Int(4), Value::Int(4)],
        )
        .unwrap();
        assert_eq!(out, vec![Value::from([7i64, -1])]);
    }

    #[test]
    fn test_exact_float_reads_as_integer() {
        assert_eq!(call("findLSB", [Value::Float(8.0)]).unwrap(), vec![Value::Int(3)]);
        let err = call("findLSB", [Value::Float(8.5)]).unwrap_err();
        assert!(matches!(err, DispatchError::Coercion { .. }));
    }
}
