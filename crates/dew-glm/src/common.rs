//! Common functions: abs, sign, rounding, mod, min/max/clamp, mix, step.

use num_traits::Float;
use rhizome_dew_dispatch::{
    Accepts, Broadcast, Candidate, Category, Cursor, DispatchResult, Integer, IntoOutputs,
    Number, Operation, Outputs, Param, Quat,
};

use crate::{componentwise, componentwise2, lit, map2, map3, INTEGRAL};

// ============================================================================
// Kernels
// ============================================================================

/// -1, 0 or 1. NaN maps to 0.
pub fn sign<T: Float>(x: T) -> T {
    if x > T::zero() {
        T::one()
    } else if x < T::zero() {
        -T::one()
    } else {
        T::zero()
    }
}

pub fn fract<T: Float>(x: T) -> T {
    x - x.floor()
}

/// Rounds half-way cases to the nearest even integer.
pub fn round_even<T: Float>(x: T) -> T {
    let floor = x.floor();
    let diff = x - floor;
    let half = lit::<T>(0.5);
    if diff < half {
        floor
    } else if diff > half {
        floor + T::one()
    } else if (floor * half).fract() == T::zero() {
        floor
    } else {
        floor + T::one()
    }
}

/// GLSL `mod`: the result takes the sign of `y`.
pub fn floor_mod<T: Float>(x: T, y: T) -> T {
    x - y * (x / y).floor()
}

/// Integer `mod` with the same flooring. `None` for a zero divisor.
pub fn floor_mod_int(x: Integer, y: Integer) -> Option<Integer> {
    if y == 0 {
        return None;
    }
    let r = x.wrapping_rem(y);
    if r != 0 && (r < 0) != (y < 0) {
        Some(r + y)
    } else {
        Some(r)
    }
}

/// `(fractional, whole)`; both carry the sign of `x`.
pub fn modf<T: Float>(x: T) -> (T, T) {
    (x.fract(), x.trunc())
}

pub fn min<T: PartialOrd>(a: T, b: T) -> T {
    if b < a {
        b
    } else {
        a
    }
}

pub fn max<T: PartialOrd>(a: T, b: T) -> T {
    if a < b {
        b
    } else {
        a
    }
}

pub fn clamp<T: PartialOrd>(x: T, lo: T, hi: T) -> T {
    min(max(x, lo), hi)
}

pub fn mix<T: Float>(a: T, b: T, t: T) -> T {
    a * (T::one() - t) + b * t
}

pub fn step<T: Float>(edge: T, x: T) -> T {
    if x < edge {
        T::zero()
    } else {
        T::one()
    }
}

pub fn smoothstep<T: Float>(edge0: T, edge1: T, x: T) -> T {
    let t = clamp((x - edge0) / (edge1 - edge0), T::zero(), T::one());
    t * t * (lit::<T>(3.0) - lit::<T>(2.0) * t)
}

/// Splits `x` into a mantissa in `[0.5, 1)` and a power of two.
/// Zero, infinities and NaN come back unchanged with exponent 0.
pub fn frexp(x: Number) -> (Number, Integer) {
    if x == 0.0 || !x.is_finite() {
        return (x, 0);
    }
    let bits = x.to_bits();
    let exponent = ((bits >> 52) & 0x7ff) as Integer;
    if exponent == 0 {
        // Subnormal: scale into the normal range first.
        let (m, e) = frexp(x * 2f64.powi(54));
        return (m, e - 54);
    }
    let mantissa = f64::from_bits((bits & !(0x7ff << 52)) | (1022 << 52));
    (mantissa, exponent - 1022)
}

/// `x * 2^exp`, stepping through the exponent so large shifts stay exact.
pub fn ldexp(x: Number, exp: Integer) -> Number {
    let mut exp = exp.clamp(-2200, 2200);
    let mut x = x;
    while exp > 1023 {
        x *= 2f64.powi(1023);
        exp -= 1023;
    }
    while exp < -1022 {
        x *= 2f64.powi(-1022);
        exp += 1022;
    }
    x * 2f64.powi(exp as i32)
}

// ============================================================================
// Manifest
// ============================================================================

fn integer_unary(
    name: &'static str,
    int: fn(Integer) -> Integer,
    float: fn(Number) -> Number,
) -> Operation {
    Operation::new(name)
        .overload(Candidate::new(move |x: Integer| int(x)).when_all(Accepts::INTEGER))
        .overload(Candidate::new(move |x: Number| float(x)))
        .overloads(per_dim!(N => {
            Candidate::new(move |v: [Integer; N]| v.map(int)).when_all(INTEGRAL)
        }))
        .overloads(per_dim!(N => Candidate::new(move |v: [Number; N]| v.map(float))))
}

fn extremum(
    name: &'static str,
    int: fn(Integer, Integer) -> Integer,
    float: fn(Number, Number) -> Number,
) -> Operation {
    Operation::new(name)
        .overload(
            Candidate::raw(vec![Param::of::<Integer>(), Param::rest::<Integer>()], move |c| {
                let first = c.next::<Integer>()?;
                Ok(c.rest::<Integer>()?.into_iter().fold(first, int).into_outputs())
            })
            .when_all(Accepts::INTEGER),
        )
        .overload(Candidate::raw(
            vec![Param::of::<Number>(), Param::rest::<Number>()],
            move |c| {
                let first = c.next::<Number>()?;
                Ok(c.rest::<Number>()?.into_iter().fold(first, float).into_outputs())
            },
        ))
        .overloads(per_dim!(N => Candidate::new(
            move |a: [Integer; N], Broadcast(b): Broadcast<[Integer; N]>| map2(a, b, int)
        ).when_all(INTEGRAL)))
        .overloads(per_dim!(N => Candidate::new(
            move |a: [Number; N], Broadcast(b): Broadcast<[Number; N]>| map2(a, b, float)
        )))
}

/// `smoothstep(number, number, x)` where `x` is a number or any vector.
fn smoothstep_scalar_edges(c: &mut Cursor<'_>) -> DispatchResult<Outputs> {
    let edge0 = c.next::<Number>()?;
    let edge1 = c.next::<Number>()?;
    let f = |x| smoothstep(edge0, edge1, x);
    Ok(match c.peek() {
        Category::Vector(2, _) => c.next::<[Number; 2]>()?.map(f).into_outputs(),
        Category::Vector(3, _) => c.next::<[Number; 3]>()?.map(f).into_outputs(),
        Category::Vector(4, _) => c.next::<[Number; 4]>()?.map(f).into_outputs(),
        _ => f(c.next::<Number>()?).into_outputs(),
    })
}

pub fn operations() -> Vec<Operation> {
    let mut ops = vec![
        integer_unary("abs", Integer::wrapping_abs, Number::abs),
        integer_unary("sign", Integer::signum, sign),
        componentwise("floor", Number::floor),
        componentwise("ceil", Number::ceil),
        componentwise("trunc", Number::trunc),
        componentwise("round", Number::round),
        componentwise("roundEven", round_even),
        componentwise("fract", fract),
        Operation::new("mod")
            .overload(Candidate::new(floor_mod_int).when_all(Accepts::INTEGER))
            .overload(Candidate::new(floor_mod::<Number>))
            .overloads(per_dim!(N => Candidate::new(
                |a: [Integer; N], Broadcast(b): Broadcast<[Integer; N]>| {
                    let out = map2(a, b, floor_mod_int);
                    out.iter().all(Option::is_some).then(|| out.map(|x| x.unwrap_or(0)))
                }
            ).when_all(INTEGRAL)))
            .overloads(per_dim!(N => Candidate::new(
                |a: [Number; N], Broadcast(b): Broadcast<[Number; N]>| map2(a, b, floor_mod)
            ))),
        componentwise2("fmod", |a, b| a % b),
        Operation::new("modf")
            .overload(Candidate::new(modf::<Number>))
            .overloads(per_dim!(N => Candidate::new(|v: [Number; N]| {
                (v.map(Number::fract), v.map(Number::trunc))
            }))),
        extremum("min", min, min),
        extremum("max", max, max),
        Operation::new("clamp")
            .overload(Candidate::new(clamp::<Integer>).when_all(Accepts::INTEGER))
            .overload(Candidate::new(clamp::<Number>))
            .overloads(per_dim!(N => Candidate::new(
                |x: [Integer; N],
                 Broadcast(lo): Broadcast<[Integer; N]>,
                 Broadcast(hi): Broadcast<[Integer; N]>| {
                    map3(x, lo, hi, clamp)
                }
            ).when_all(INTEGRAL)))
            .overloads(per_dim!(N => Candidate::new(
                |x: [Number; N],
                 Broadcast(lo): Broadcast<[Number; N]>,
                 Broadcast(hi): Broadcast<[Number; N]>| {
                    map3(x, lo, hi, clamp)
                }
            ))),
        Operation::new("mix")
            .overload(Candidate::new(mix::<Number>))
            .overloads(per_dim!(N => Candidate::new(
                |a: [Number; N], b: [Number; N], Broadcast(t): Broadcast<[Number; N]>| {
                    map3(a, b, t, mix)
                }
            )))
            .overload(Candidate::new(|a: Quat, b: Quat, t: Number| {
                crate::quaternion::mix(a, b, t)
            })),
        Operation::new("step")
            .overload(Candidate::new(step::<Number>))
            .overloads(per_dim!(N => Candidate::new(
                |Broadcast(edge): Broadcast<[Number; N]>, x: [Number; N]| map2(edge, x, step)
            ))),
        Operation::new("smoothstep")
            .overload(Candidate::raw(
                vec![
                    Param::of::<Number>(),
                    Param::of::<Number>(),
                    Param::new(
                        "number or vector",
                        Accepts::NUMBER
                            .union(Accepts::FLOAT_VECTORS)
                            .union(Accepts::INT_VECTORS),
                    ),
                ],
                smoothstep_scalar_edges,
            ))
            .overloads(per_dim!(N => Candidate::new(
                |e0: [Number; N], e1: [Number; N], x: [Number; N]| map3(e0, e1, x, smoothstep)
            ))),
        Operation::new("fma")
            .overload(Candidate::new(|a: Number, b: Number, c: Number| a.mul_add(b, c)))
            .overloads(per_dim!(N => Candidate::new(
                |a: [Number; N], b: [Number; N], c: [Number; N]| map3(a, b, c, Number::mul_add)
            ))),
        Operation::new("frexp")
            .overload(Candidate::new(frexp))
            .overloads(per_dim!(N => Candidate::new(|v: [Number; N]| {
                let parts = v.map(frexp);
                (parts.map(|p| p.0), parts.map(|p| p.1))
            }))),
        Operation::new("ldexp")
            .overload(Candidate::new(ldexp))
            .overloads(per_dim!(N => Candidate::new(
                |v: [Number; N], Broadcast(e): Broadcast<[Integer; N]>| {
                    std::array::from_fn::<Number, N, _>(|i| ldexp(v[i], e[i]))
                }
            ))),
    ];
    ops.push(
        Operation::new("isnan")
            .overload(Candidate::new(Number::is_nan))
            .overloads(per_dim!(N => Candidate::new(|v: [Number; N]| v.map(Number::is_nan)))),
    );
    ops.push(
        Operation::new("isinf")
            .overload(Candidate::new(Number::is_infinite))
            .overloads(per_dim!(N => Candidate::new(|v: [Number; N]| v.map(Number::is_infinite)))),
    );
    ops
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{assert_close, call};
    use rhizome_dew_dispatch::{DispatchError, Value, Vector};

    #[test]
    fn test_round_even() {
        assert_eq!(round_even(2.5), 2.0);
        assert_eq!(round_even(3.5), 4.0);
        assert_eq!(round_even(-2.5), -2.0);
        assert_eq!(round_even(2.4), 2.0);
        assert_eq!(round_even(2.6), 3.0);
    }

    #[test]
    fn test_floor_mod_sign_follows_divisor() {
        assert_eq!(floor_mod(-1.0, 3.0), 2.0);
        assert_eq!(floor_mod(1.0, -3.0), -2.0);
        assert_eq!(floor_mod_int(-7, 3), Some(2));
        assert_eq!(floor_mod_int(7, -3), Some(-2));
        assert_eq!(floor_mod_int(6, 3), Some(0));
        assert_eq!(floor_mod_int(1, 0), None);
        assert_eq!(floor_mod_int(Integer::MIN, -1), Some(0));
    }

    #[test]
    fn test_frexp_ldexp() {
        assert_eq!(frexp(8.0), (0.5, 4));
        assert_eq!(frexp(-3.0), (-0.75, 2));
        assert_eq!(frexp(0.0), (0.0, 0));
        let tiny = f64::MIN_POSITIVE / 8.0;
        let (m, e) = frexp(tiny);
        assert_eq!(ldexp(m, e), tiny);
        assert_eq!(ldexp(0.5, 4), 8.0);
        assert_eq!(ldexp(1.0, 2000), f64::INFINITY);
    }

    #[test]
    fn test_smoothstep() {
        assert_eq!(smoothstep(0.0, 1.0, 0.5), 0.5);
        assert_eq!(smoothstep(0.0, 1.0, -1.0), 0.0);
        assert_eq!(smoothstep(0.0, 1.0, 2.0), 1.0);
    }

    #[test]
    fn test_clamp_integer_tie_break() {
        assert_eq!(
            call("clamp", [Value::Int(5), Value::Int(0), Value::Int(3)]).unwrap(),
            vec![Value::Int(3)]
        );
        assert_eq!(
            call("clamp", [Value::Int(5), Value::Int(0), Value::Float(3.0)]).unwrap(),
            vec![Value::Float(3.0)]
        );
    }

    #[test]
    fn test_clamp_vector_with_scalar_bounds() {
        let out = call(
            "clamp",
            [Value::from([-1.0, 0.5, 2.0]), Value::Float(0.0), Value::Float(1.0)],
        )
        .unwrap();
        assert_eq!(out, vec![Value::from([0.0, 0.5, 1.0])]);

        let out = call(
            "clamp",
            [Value::from([-1i64, 5, 20]), Value::Int(0), Value::Int(10)],
        )
        .unwrap();
        assert_eq!(out, vec![Value::Vec3(Vector::Int([0, 5, 10]))]);
    }

    #[test]
    fn test_abs_keeps_integers() {
        assert_eq!(call("abs", [Value::Int(-4)]).unwrap(), vec![Value::Int(4)]);
        assert_eq!(call("abs", [Value::Float(-4.5)]).unwrap(), vec![Value::Float(4.5)]);
        assert_eq!(
            call("sign", [Value::from([-2i64, 0, 9])]).unwrap(),
            vec![Value::from([-1i64, 0, 1])]
        );
    }

    #[test]
    fn test_variadic_min_max() {
        assert_eq!(
            call("min", [Value::Int(4), Value::Int(-2), Value::Int(7)]).unwrap(),
            vec![Value::Int(-2)]
        );
        assert_eq!(
            call("max", [Value::Int(4), Value::Float(7.5), Value::Int(7)]).unwrap(),
            vec![Value::Float(7.5)]
        );
        assert_eq!(
            call("max", [Value::from([1.0, 5.0]), Value::Float(2.0)]).unwrap(),
            vec![Value::from([2.0, 5.0])]
        );
    }

    #[test]
    fn test_mod_by_zero_is_a_domain_failure() {
        assert_eq!(call("mod", [Value::Int(5), Value::Int(0)]).unwrap(), vec![]);
        assert_eq!(call("mod", [Value::Int(-5), Value::Int(3)]).unwrap(), vec![Value::Int(1)]);
        let out = call("mod", [Value::Float(5.5), Value::Float(2.0)]).unwrap();
        assert_eq!(out, vec![Value::Float(1.5)]);
    }

    #[test]
    fn test_modf_two_outputs() {
        let out = call("modf", [Value::Float(-2.25)]).unwrap();
        assert_eq!(out, vec![Value::Float(-0.25), Value::Float(-2.0)]);
    }

    #[test]
    fn test_smoothstep_scalar_edges_over_vector() {
        let out = call(
            "smoothstep",
            [Value::Float(0.0), Value::Float(1.0), Value::from([0.0, 0.5, 1.0])],
        )
        .unwrap();
        assert_close(&out[0], &Value::from([0.0, 0.5, 1.0]), "smoothstep");
        let out =
            call("smoothstep", [Value::Float(0.0), Value::Float(2.0), Value::Float(1.0)]).unwrap();
        assert_eq!(out, vec![Value::Float(0.5)]);
    }

    #[test]
    fn test_mix_step_isnan() {
        let out = call(
            "mix",
            [Value::from([0.0, 10.0]), Value::from([10.0, 20.0]), Value::Float(0.5)],
        )
        .unwrap();
        assert_eq!(out, vec![Value::from([5.0, 15.0])]);
        let out = call("step", [Value::Float(0.5), Value::from([0.0, 1.0, 0.5])]).unwrap();
        assert_eq!(out, vec![Value::from([0.0, 1.0, 1.0])]);
        let out = call("isnan", [Value::from([f64::NAN, 1.0])]).unwrap();
        assert_eq!(out, vec![Value::from([true, false])]);
    }

    #[test]
    fn test_vector_length_mismatch_is_a_type_error() {
        let err = call(
            "mix",
            [Value::from([0.0, 1.0]), Value::from([0.0, 1.0, 2.0]), Value::Float(0.5)],
        )
        .unwrap_err();
        assert!(matches!(err, DispatchError::TypeMismatch { position: 2, .. }));
    }
}
