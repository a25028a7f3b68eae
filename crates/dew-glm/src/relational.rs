//! Comparison functions with exact, epsilon and ULP policies.

use rhizome_dew_dispatch::{
    Accepts, Candidate, Category, Coercion, FromArg, Integer, Mismatch, Number, Operation, Param,
    Quat, Value,
};

use crate::{map2, INTEGRAL};

// ============================================================================
// Tolerance
// ============================================================================

/// How two floats are compared for equality.
///
/// A float tolerance argument is an absolute epsilon; an integer one is a
/// maximum distance in units in the last place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tolerance<const N: usize> {
    Exact,
    Epsilon([Number; N]),
    Ulps([Integer; N]),
}

impl<const N: usize> Tolerance<N> {
    fn component(&self, i: usize) -> Tolerance<1> {
        match self {
            Tolerance::Exact => Tolerance::Exact,
            Tolerance::Epsilon(e) => Tolerance::Epsilon([e[i]]),
            Tolerance::Ulps(u) => Tolerance::Ulps([u[i]]),
        }
    }
}

impl Tolerance<1> {
    pub fn equal(&self, a: Number, b: Number) -> bool {
        match self {
            Tolerance::Exact => a == b,
            Tolerance::Epsilon([e]) => (a - b).abs() <= *e,
            Tolerance::Ulps([u]) => ulps_equal(a, b, *u),
        }
    }
}

/// Whether `a` and `b` are at most `max` representable values apart.
/// Floats of opposite sign are only equal when they compare equal.
pub fn ulps_equal(a: Number, b: Number, max: Integer) -> bool {
    if a == b {
        return true;
    }
    if a.is_nan() || b.is_nan() {
        return false;
    }
    let (ia, ib) = (a.to_bits() as i64, b.to_bits() as i64);
    if (ia < 0) != (ib < 0) {
        return false;
    }
    (ia - ib).unsigned_abs() <= max.max(0) as u64
}

fn tolerance_from_vector<const N: usize>(value: &Value) -> Option<Tolerance<N>> {
    let parts = match value {
        Value::Vec2(v) => v.components(),
        Value::Vec3(v) => v.components(),
        Value::Vec4(v) => v.components(),
        _ => return None,
    };
    if parts.len() != N {
        return None;
    }
    let ints: Option<Vec<Integer>> = parts
        .iter()
        .map(|p| match p {
            Value::Int(i) => Some(*i),
            _ => None,
        })
        .collect();
    if let Some(ints) = ints {
        return ints.try_into().ok().map(Tolerance::Ulps);
    }
    let floats: Option<Vec<Number>> = parts
        .iter()
        .map(|p| match p {
            Value::Float(x) => Some(*x),
            _ => None,
        })
        .collect();
    floats?.try_into().ok().map(Tolerance::Epsilon)
}

impl<const N: usize> FromArg for Tolerance<N> {
    fn param() -> Param {
        Param::new(
            "tolerance",
            Accepts::NUMBER
                .union(Accepts::FLOAT_VECTORS)
                .union(Accepts::INT_VECTORS),
        )
    }

    fn from_arg(value: Option<&Value>, coercion: Coercion) -> Result<Self, Mismatch> {
        match coercion.category_of(value) {
            Category::Integer => {
                Integer::from_arg(value, coercion).map(|u| Tolerance::Ulps([u; N]))
            }
            Category::Float => {
                Number::from_arg(value, coercion).map(|e| Tolerance::Epsilon([e; N]))
            }
            Category::Vector(..) => value
                .and_then(tolerance_from_vector)
                .ok_or(Mismatch::Type),
            _ => Err(Mismatch::Type),
        }
    }
}

// ============================================================================
// Kernels
// ============================================================================

pub fn equal<const N: usize>(a: [Number; N], b: [Number; N], tolerance: Tolerance<N>) -> [bool; N] {
    std::array::from_fn(|i| tolerance.component(i).equal(a[i], b[i]))
}

/// Per-column equality: a column is equal when all its rows are.
pub fn equal_columns<const C: usize, const R: usize>(
    a: [[Number; R]; C],
    b: [[Number; R]; C],
    tolerance: Tolerance<1>,
) -> [bool; C] {
    std::array::from_fn(|c| (0..R).all(|r| tolerance.equal(a[c][r], b[c][r])))
}

pub fn not<const N: usize>(v: [bool; N]) -> [bool; N] {
    v.map(|b| !b)
}

// ============================================================================
// Manifest
// ============================================================================

macro_rules! matrix_equality {
    ($negate:expr; $($c:literal x $r:literal),*) => {
        [$(
            Candidate::new(
                move |a: [[Number; $r]; $c], b: [[Number; $r]; $c], t: Option<Tolerance<1>>| {
                    equal_columns(a, b, t.unwrap_or(Tolerance::Exact)).map(|e| e != $negate)
                },
            )
        ),*]
    };
}

fn equality(name: &'static str, negate: bool) -> Operation {
    Operation::new(name)
        .expects("number, vector or quaternion expected")
        .overload(
            Candidate::new(move |a: Integer, b: Integer| (a == b) != negate)
                .when_all(Accepts::INTEGER),
        )
        .overload(Candidate::new(move |a: Number, b: Number, t: Option<Tolerance<1>>| {
            equal([a], [b], t.unwrap_or(Tolerance::Exact))[0] != negate
        }))
        .overloads(per_dim!(N => Candidate::new(
            move |a: [Integer; N], b: [Integer; N]| map2(a, b, |x, y| (x == y) != negate)
        ).when_all(INTEGRAL)))
        .overloads(per_dim!(N => Candidate::new(
            move |a: [bool; N], b: [bool; N]| map2(a, b, |x, y| (x == y) != negate)
        )))
        .overloads(per_dim!(N => Candidate::new(
            move |a: [Number; N], b: [Number; N], t: Option<Tolerance<N>>| {
                equal(a, b, t.unwrap_or(Tolerance::Exact)).map(|e| e != negate)
            }
        )))
        .overload(Candidate::new(move |a: Quat, b: Quat, t: Option<Tolerance<4>>| {
            equal(a.0, b.0, t.unwrap_or(Tolerance::Exact)).map(|e| e != negate)
        }))
        .overloads(matrix_equality!(
            negate; 2 x 2, 2 x 3, 2 x 4, 3 x 2, 3 x 3, 3 x 4, 4 x 2, 4 x 3, 4 x 4
        ))
}

fn ordering(
    name: &'static str,
    int: fn(&Integer, &Integer) -> bool,
    float: fn(&Number, &Number) -> bool,
) -> Operation {
    Operation::new(name)
        .overloads(per_dim!(N => Candidate::new(
            move |a: [Integer; N], b: [Integer; N]| map2(a, b, |x, y| int(&x, &y))
        ).when_all(INTEGRAL)))
        .overloads(per_dim!(N => Candidate::new(
            move |a: [Number; N], b: [Number; N]| map2(a, b, |x, y| float(&x, &y))
        )))
}

pub fn operations() -> Vec<Operation> {
    vec![
        equality("equal", false),
        equality("notEqual", true),
        ordering("lessThan", Integer::lt, Number::lt),
        ordering("lessThanEqual", Integer::le, Number::le),
        ordering("greaterThan", Integer::gt, Number::gt),
        ordering("greaterThanEqual", Integer::ge, Number::ge),
        Operation::new("all")
            .overloads(per_dim!(N => Candidate::new(|v: [bool; N]| v.iter().all(|b| *b)))),
        Operation::new("any")
            .overloads(per_dim!(N => Candidate::new(|v: [bool; N]| v.iter().any(|b| *b)))),
        Operation::new("not_").overloads(per_dim!(N => Candidate::new(not::<N>))),
    ]
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::call;
    use rhizome_dew_dispatch::{DispatchError, Matrix};

    #[test]
    fn test_ulps() {
        let next = f64::from_bits(1.0f64.to_bits() + 1);
        assert!(ulps_equal(1.0, next, 1));
        assert!(!ulps_equal(1.0, next, 0));
        assert!(ulps_equal(0.0, -0.0, 0));
        assert!(!ulps_equal(f64::NAN, f64::NAN, 100));
        assert!(!ulps_equal(1e-300, -1e-300, i64::MAX));
    }

    #[test]
    fn test_integer_equals_float() {
        assert_eq!(
            call("equal", [Value::Int(1), Value::Float(1.0)]).unwrap(),
            vec![Value::Bool(true)]
        );
        assert_eq!(
            call("equal", [Value::Int(1), Value::Int(2)]).unwrap(),
            vec![Value::Bool(false)]
        );
        assert_eq!(
            call("notEqual", [Value::Int(1), Value::Int(2)]).unwrap(),
            vec![Value::Bool(true)]
        );
    }

    #[test]
    fn test_equal_mixed_categories_is_a_type_error() {
        let err = call("equal", [Value::Int(1), Value::from([1.0, 2.0, 3.0])]).unwrap_err();
        assert!(matches!(err, DispatchError::TypeMismatch { position: 2, .. }));
        assert!(err.to_string().contains("vector or quaternion expected"));
        assert!(err.to_string().ends_with("got vec3)"));
    }

    #[test]
    fn test_epsilon_and_ulp_tolerances() {
        let a = Value::from([1.0, 2.0]);
        let b = Value::from([1.05, 2.5]);
        assert_eq!(
            call("equal", [a.clone(), b.clone(), Value::Float(0.1)]).unwrap(),
            vec![Value::from([true, false])]
        );
        assert_eq!(
            call("equal", [a.clone(), b.clone(), Value::from([0.1, 1.0])]).unwrap(),
            vec![Value::from([true, true])]
        );
        let next = Value::Float(f64::from_bits(0.5f64.to_bits() + 2));
        assert_eq!(
            call("equal", [Value::Float(0.5), next.clone(), Value::Int(2)]).unwrap(),
            vec![Value::Bool(true)]
        );
        assert_eq!(
            call("equal", [Value::Float(0.5), next, Value::Int(1)]).unwrap(),
            vec![Value::Bool(false)]
        );
    }

    #[test]
    fn test_wrong_width_tolerance() {
        let err = call(
            "equal",
            [Value::from([1.0, 2.0]), Value::from([1.0, 2.0]), Value::from([0.1, 0.1, 0.1])],
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "bad argument #3 to 'equal' (tolerance expected, got vec3)"
        );
    }

    #[test]
    fn test_matrix_and_quat_equality() {
        let m = Value::Mat(Matrix::M2x3([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]));
        let n = Value::Mat(Matrix::M2x3([[1.0, 2.0, 3.0], [4.0, 5.0, 7.0]]));
        assert_eq!(
            call("equal", [m.clone(), n.clone()]).unwrap(),
            vec![Value::from([true, false])]
        );
        assert_eq!(
            call("equal", [m, n, Value::Float(2.0)]).unwrap(),
            vec![Value::from([true, true])]
        );
        let q = Value::Quat(Quat([0.0, 0.0, 0.0, 1.0]));
        assert_eq!(
            call("notEqual", [q.clone(), q]).unwrap(),
            vec![Value::from([false, false, false, false])]
        );
    }

    #[test]
    fn test_vector_comparisons() {
        let out = call("lessThan", [Value::from([1i64, 5]), Value::from([2i64, 5])]).unwrap();
        assert_eq!(out, vec![Value::from([true, false])]);
        let out = call(
            "greaterThanEqual",
            [Value::from([1.0, 5.0, 0.0]), Value::from([2i64, 5, -1])],
        )
        .unwrap();
        assert_eq!(out, vec![Value::from([false, true, true])]);
        assert_eq!(call("all", [Value::from([true, true])]).unwrap(), vec![Value::Bool(true)]);
        assert_eq!(
            call("any", [Value::from([false, false, false])]).unwrap(),
            vec![Value::Bool(false)]
        );
        assert_eq!(
            call("not_", [Value::from([true, false])]).unwrap(),
            vec![Value::from([false, true])]
        );
    }
}
