//! Typed reads out of an argument channel, with the numeric coercion policy.

use crate::select::{Accepts, Param};
use crate::{
    ArgumentChannel, Category, DispatchError, DispatchResult, Integer, Number, Quat, Value,
};

// ============================================================================
// Coercion policy
// ============================================================================

/// How a float argument is read where an integer is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloatToInt {
    /// Accept only floats holding an exact integer (`3.0`); reject `3.5`.
    #[default]
    Exact,
    /// Truncate toward zero. Must be opted into per operation.
    Truncate,
}

/// Per-operation coercion policy.
///
/// The default is strict: only integers and floats are numbers, and floats
/// narrow to integers only when exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Coercion {
    /// Strings that parse as numbers classify as Integer or Float.
    pub numeric_strings: bool,
    /// Booleans classify as the Integers 0 and 1.
    pub truthy_booleans: bool,
    pub float_to_int: FloatToInt,
}

impl Coercion {
    /// Strict policy.
    pub const STRICT: Coercion = Coercion {
        numeric_strings: false,
        truthy_booleans: false,
        float_to_int: FloatToInt::Exact,
    };

    /// Numeric strings accepted, as the host's own math library does.
    pub const LENIENT: Coercion = Coercion {
        numeric_strings: true,
        truthy_booleans: false,
        float_to_int: FloatToInt::Exact,
    };

    pub fn truncating(mut self) -> Self {
        self.float_to_int = FloatToInt::Truncate;
        self
    }

    /// Category of `value` as seen by operations using this policy.
    pub fn category_of(&self, value: Option<&Value>) -> Category {
        match value {
            None => Category::Absent,
            Some(Value::Str(s)) if self.numeric_strings => match parse_number(s) {
                Some(Scalar::Int(_)) => Category::Integer,
                Some(Scalar::Float(_)) => Category::Float,
                None => Category::String,
            },
            Some(Value::Bool(_)) if self.truthy_booleans => Category::Integer,
            Some(v) => v.category(),
        }
    }

    fn scalar(&self, value: &Value) -> Option<Scalar> {
        match value {
            Value::Int(i) => Some(Scalar::Int(*i)),
            Value::Float(x) => Some(Scalar::Float(*x)),
            Value::Str(s) if self.numeric_strings => parse_number(s),
            Value::Bool(b) if self.truthy_booleans => Some(Scalar::Int(Integer::from(*b))),
            _ => None,
        }
    }

    fn narrow(&self, x: Number) -> Result<Integer, Mismatch> {
        // i64::MAX is not representable; 2^63 is the exclusive upper bound.
        const LIMIT: Number = 9_223_372_036_854_775_808.0;
        let x = match self.float_to_int {
            FloatToInt::Exact if x.fract() != 0.0 => {
                return Err(Mismatch::Coercion("number has no integer representation".into()))
            }
            FloatToInt::Exact => x,
            FloatToInt::Truncate => x.trunc(),
        };
        if x.is_finite() && (-LIMIT..LIMIT).contains(&x) {
            Ok(x as Integer)
        } else {
            Err(Mismatch::Coercion("number has no integer representation".into()))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Scalar {
    Int(Integer),
    Float(Number),
}

/// Parses the numeric strings a scripting host would accept: decimal
/// integers, hex integers and decimal floats. `inf`/`nan` spellings are not
/// numbers.
fn parse_number(s: &str) -> Option<Scalar> {
    let t = s.trim();
    let (negative, body) = match t.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, t.strip_prefix('+').unwrap_or(t)),
    };
    if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        if !hex.starts_with(|c: char| c.is_ascii_hexdigit()) {
            return None;
        }
        let magnitude = u64::from_str_radix(hex, 16).ok()? as Integer;
        return Some(Scalar::Int(if negative {
            magnitude.wrapping_neg()
        } else {
            magnitude
        }));
    }
    if !body.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    if let Ok(i) = t.parse::<Integer>() {
        return Some(Scalar::Int(i));
    }
    t.parse::<Number>().ok().map(Scalar::Float)
}

/// Classifies the argument at `index` under `coercion`.
pub fn classify(channel: &dyn ArgumentChannel, index: usize, coercion: Coercion) -> Category {
    coercion.category_of(channel.arg(index))
}

// ============================================================================
// Typed reads
// ============================================================================

/// Why a single argument could not be read.
#[derive(Debug, Clone, PartialEq)]
pub enum Mismatch {
    /// The category is not one the parameter accepts.
    Type,
    /// The category fits but the value cannot be converted.
    Coercion(String),
}

/// A parameter type that can be read from one argument position.
pub trait FromArg: Sized {
    /// Descriptor used for overload selection and error messages.
    fn param() -> Param;

    /// Converts the argument. `value` is `None` for absent and nil arguments.
    fn from_arg(value: Option<&Value>, coercion: Coercion) -> Result<Self, Mismatch>;
}

impl FromArg for Number {
    fn param() -> Param {
        Param::new("number", Accepts::NUMBER)
    }

    fn from_arg(value: Option<&Value>, coercion: Coercion) -> Result<Self, Mismatch> {
        match value.and_then(|v| coercion.scalar(v)) {
            Some(Scalar::Float(x)) => Ok(x),
            Some(Scalar::Int(i)) => Ok(i as Number),
            None => Err(Mismatch::Type),
        }
    }
}

impl FromArg for Integer {
    fn param() -> Param {
        Param::new("integer", Accepts::NUMBER)
    }

    fn from_arg(value: Option<&Value>, coercion: Coercion) -> Result<Self, Mismatch> {
        match value.and_then(|v| coercion.scalar(v)) {
            Some(Scalar::Int(i)) => Ok(i),
            Some(Scalar::Float(x)) => coercion.narrow(x),
            None => Err(Mismatch::Type),
        }
    }
}

impl FromArg for u32 {
    fn param() -> Param {
        Param::new("uint32", Accepts::NUMBER)
    }

    fn from_arg(value: Option<&Value>, coercion: Coercion) -> Result<Self, Mismatch> {
        let i = Integer::from_arg(value, coercion)?;
        u32::try_from(i).map_err(|_| Mismatch::Coercion("value out of range for uint32".into()))
    }
}

impl FromArg for i32 {
    fn param() -> Param {
        Param::new("int32", Accepts::NUMBER)
    }

    fn from_arg(value: Option<&Value>, coercion: Coercion) -> Result<Self, Mismatch> {
        let i = Integer::from_arg(value, coercion)?;
        i32::try_from(i).map_err(|_| Mismatch::Coercion("value out of range for int32".into()))
    }
}

impl FromArg for bool {
    fn param() -> Param {
        Param::new("boolean", Accepts::BOOLEAN)
    }

    fn from_arg(value: Option<&Value>, _: Coercion) -> Result<Self, Mismatch> {
        match value {
            Some(Value::Bool(b)) => Ok(*b),
            _ => Err(Mismatch::Type),
        }
    }
}

impl FromArg for String {
    fn param() -> Param {
        Param::new("string", Accepts::STRING)
    }

    fn from_arg(value: Option<&Value>, _: Coercion) -> Result<Self, Mismatch> {
        match value {
            Some(Value::Str(s)) => Ok(s.to_string()),
            _ => Err(Mismatch::Type),
        }
    }
}

/// Any present value, unconverted.
impl FromArg for Value {
    fn param() -> Param {
        Param::new("value", Accepts::PRESENT)
    }

    fn from_arg(value: Option<&Value>, _: Coercion) -> Result<Self, Mismatch> {
        value.cloned().ok_or(Mismatch::Type)
    }
}

/// Optional trailing parameter: absent and nil read as `None`.
impl<T: FromArg> FromArg for Option<T> {
    fn param() -> Param {
        T::param().optional()
    }

    fn from_arg(value: Option<&Value>, coercion: Coercion) -> Result<Self, Mismatch> {
        match value {
            None => Ok(None),
            Some(_) => T::from_arg(value, coercion).map(Some),
        }
    }
}

impl FromArg for Quat {
    fn param() -> Param {
        Param::new("quat", Accepts::QUAT)
    }

    fn from_arg(value: Option<&Value>, _: Coercion) -> Result<Self, Mismatch> {
        match value {
            Some(Value::Quat(q)) => Ok(*q),
            _ => Err(Mismatch::Type),
        }
    }
}

macro_rules! vector_arg {
    ($n:literal, $variant:ident, $vec:ident, $ivec:ident, $bvec:ident) => {
        impl FromArg for [Number; $n] {
            fn param() -> Param {
                Param::new(
                    concat!("vec", $n),
                    Accepts::$vec.union(Accepts::$ivec),
                )
            }

            fn from_arg(value: Option<&Value>, _: Coercion) -> Result<Self, Mismatch> {
                match value {
                    Some(Value::$variant(v)) => v.as_float().ok_or(Mismatch::Type),
                    _ => Err(Mismatch::Type),
                }
            }
        }

        impl FromArg for [Integer; $n] {
            fn param() -> Param {
                Param::new(concat!("ivec", $n), Accepts::$ivec)
            }

            fn from_arg(value: Option<&Value>, _: Coercion) -> Result<Self, Mismatch> {
                match value {
                    Some(Value::$variant(v)) => v.as_int().ok_or(Mismatch::Type),
                    _ => Err(Mismatch::Type),
                }
            }
        }

        impl FromArg for [bool; $n] {
            fn param() -> Param {
                Param::new(concat!("bvec", $n), Accepts::$bvec)
            }

            fn from_arg(value: Option<&Value>, _: Coercion) -> Result<Self, Mismatch> {
                match value {
                    Some(Value::$variant(v)) => v.as_bool().ok_or(Mismatch::Type),
                    _ => Err(Mismatch::Type),
                }
            }
        }

        impl FromArg for Broadcast<[Number; $n]> {
            fn param() -> Param {
                Param::new(
                    concat!("number or vec", $n),
                    Accepts::NUMBER.union(Accepts::$vec).union(Accepts::$ivec),
                )
            }

            fn from_arg(value: Option<&Value>, coercion: Coercion) -> Result<Self, Mismatch> {
                match value {
                    Some(Value::$variant(_)) => {
                        <[Number; $n]>::from_arg(value, coercion).map(Broadcast)
                    }
                    _ => Number::from_arg(value, coercion).map(|x| Broadcast([x; $n])),
                }
            }
        }

        impl FromArg for Broadcast<[Integer; $n]> {
            fn param() -> Param {
                Param::new(
                    concat!("integer or ivec", $n),
                    Accepts::NUMBER.union(Accepts::$ivec),
                )
            }

            fn from_arg(value: Option<&Value>, coercion: Coercion) -> Result<Self, Mismatch> {
                match value {
                    Some(Value::$variant(_)) => {
                        <[Integer; $n]>::from_arg(value, coercion).map(Broadcast)
                    }
                    _ => Integer::from_arg(value, coercion).map(|x| Broadcast([x; $n])),
                }
            }
        }
    };
}

vector_arg!(2, Vec2, VEC2, IVEC2, BVEC2);
vector_arg!(3, Vec3, VEC3, IVEC3, BVEC3);
vector_arg!(4, Vec4, VEC4, IVEC4, BVEC4);

macro_rules! matrix_arg {
    ($($c:literal x $r:literal => $variant:ident, $flag:ident;)*) => {
        $(
            impl FromArg for [[Number; $r]; $c] {
                fn param() -> Param {
                    Param::new(concat!("mat", $c, "x", $r), Accepts::$flag)
                }

                fn from_arg(value: Option<&Value>, _: Coercion) -> Result<Self, Mismatch> {
                    match value {
                        Some(Value::Mat(crate::Matrix::$variant(m))) => Ok(*m),
                        _ => Err(Mismatch::Type),
                    }
                }
            }
        )*
    };
}

matrix_arg! {
    2 x 2 => M2x2, MAT2X2;
    2 x 3 => M2x3, MAT2X3;
    2 x 4 => M2x4, MAT2X4;
    3 x 2 => M3x2, MAT3X2;
    3 x 3 => M3x3, MAT3X3;
    3 x 4 => M3x4, MAT3X4;
    4 x 2 => M4x2, MAT4X2;
    4 x 3 => M4x3, MAT4X3;
    4 x 4 => M4x4, MAT4X4;
}

/// A vector parameter that also accepts a scalar, splatted to every
/// component (e.g. one epsilon applied uniformly).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Broadcast<V>(pub V);

// ============================================================================
// Cursor
// ============================================================================

/// Reads successive arguments for one call.
///
/// Each successful [`next`](Self::next) advances exactly one position,
/// whatever the physical size of the value read.
pub struct Cursor<'a> {
    channel: &'a dyn ArgumentChannel,
    op: &'static str,
    coercion: Coercion,
    index: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(channel: &'a dyn ArgumentChannel, op: &'static str, coercion: Coercion) -> Self {
        Self {
            channel,
            op,
            coercion,
            index: 0,
        }
    }

    /// Index of the next argument to be read.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn op(&self) -> &'static str {
        self.op
    }

    /// Arguments not yet read, ignoring trailing nils.
    pub fn remaining(&self) -> usize {
        self.channel.supplied().saturating_sub(self.index)
    }

    /// Category of the next argument.
    pub fn peek(&self) -> Category {
        self.category_at(self.index)
    }

    pub fn category_at(&self, index: usize) -> Category {
        classify(self.channel, index, self.coercion)
    }

    /// Whether the argument at `index` could be read as `T`, judged by
    /// category. Does not advance.
    pub fn is<T: FromArg>(&self, index: usize) -> bool {
        T::param().admits(self.category_at(index))
    }

    /// Reads the next argument as `T`.
    pub fn next<T: FromArg>(&mut self) -> DispatchResult<T> {
        let index = self.index;
        let value = self.channel.arg(index).filter(|v| !v.is_nil());
        match T::from_arg(value, self.coercion) {
            Ok(v) => {
                self.index += 1;
                Ok(v)
            }
            Err(Mismatch::Type) => {
                Err(self.type_error(index, format!("{} expected", T::param().name)))
            }
            Err(Mismatch::Coercion(reason)) => Err(DispatchError::Coercion {
                op: self.op,
                position: index + 1,
                reason,
            }),
        }
    }

    /// Reads every remaining argument as `T`.
    pub fn rest<T: FromArg>(&mut self) -> DispatchResult<Vec<T>> {
        let mut out = Vec::with_capacity(self.remaining());
        while self.remaining() > 0 {
            out.push(self.next()?);
        }
        Ok(out)
    }

    /// A type error at `index` for this call's operation.
    pub fn type_error(&self, index: usize, expected: impl Into<String>) -> DispatchError {
        DispatchError::TypeMismatch {
            op: self.op,
            position: index + 1,
            expected: expected.into(),
            got: self.category_at(index),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArgStack, Elem, Matrix, Vector};

    fn cursor_over(stack: &ArgStack) -> Cursor<'_> {
        Cursor::new(stack, "test", Coercion::STRICT)
    }

    #[test]
    fn test_integer_widens_to_float() {
        let stack = ArgStack::new([Value::Int(3)]);
        let mut c = cursor_over(&stack);
        assert_eq!(c.next::<f64>().unwrap(), 3.0);
        assert_eq!(c.index(), 1);
    }

    #[test]
    fn test_exact_float_narrows_to_integer() {
        let stack = ArgStack::new([Value::Float(3.0), Value::Float(3.5)]);
        let mut c = cursor_over(&stack);
        assert_eq!(c.next::<i64>().unwrap(), 3);
        let err = c.next::<i64>().unwrap_err();
        assert_eq!(
            err,
            DispatchError::Coercion {
                op: "test",
                position: 2,
                reason: "number has no integer representation".into(),
            }
        );
        // A failed read does not advance.
        assert_eq!(c.index(), 1);
    }

    #[test]
    fn test_truncating_policy() {
        let stack = ArgStack::new([Value::Float(-3.7), Value::Float(f64::NAN)]);
        let mut c = Cursor::new(&stack, "test", Coercion::STRICT.truncating());
        assert_eq!(c.next::<i64>().unwrap(), -3);
        assert!(matches!(c.next::<i64>(), Err(DispatchError::Coercion { .. })));
    }

    #[test]
    fn test_uint32_range() {
        let stack = ArgStack::new([Value::Int(-1), Value::Int(u32::MAX as i64)]);
        let mut c = cursor_over(&stack);
        let err = c.next::<u32>().unwrap_err();
        assert!(err.to_string().contains("value out of range for uint32"));
        let stack = ArgStack::new([Value::Int(u32::MAX as i64)]);
        assert_eq!(cursor_over(&stack).next::<u32>().unwrap(), u32::MAX);
    }

    #[test]
    fn test_vector_length_is_never_resliced() {
        let stack = ArgStack::new([Value::Vec4(Vector::Float([1.0, 2.0, 3.0, 4.0]))]);
        let mut c = cursor_over(&stack);
        let err = c.next::<[f64; 3]>().unwrap_err();
        assert_eq!(
            err,
            DispatchError::TypeMismatch {
                op: "test",
                position: 1,
                expected: "vec3 expected".into(),
                got: Category::Vector(4, Elem::Float),
            }
        );
    }

    #[test]
    fn test_int_vector_widens_but_not_back() {
        let stack = ArgStack::new([
            Value::Vec2(Vector::Int([1, 2])),
            Value::Vec2(Vector::Float([1.0, 2.0])),
        ]);
        let mut c = cursor_over(&stack);
        assert_eq!(c.next::<[f64; 2]>().unwrap(), [1.0, 2.0]);
        assert!(c.next::<[i64; 2]>().is_err());
    }

    #[test]
    fn test_matrix_consumes_one_position() {
        let m = Matrix::M4x4([[1.0, 0.0, 0.0, 0.0]; 4]);
        let stack = ArgStack::new([Value::Mat(m), Value::Int(7)]);
        let mut c = cursor_over(&stack);
        c.next::<[[f64; 4]; 4]>().unwrap();
        assert_eq!(c.index(), 1);
        assert_eq!(c.next::<i64>().unwrap(), 7);
    }

    #[test]
    fn test_optional_reads() {
        let stack = ArgStack::new([Value::Float(1.0), Value::Nil]);
        let mut c = cursor_over(&stack);
        assert_eq!(c.next::<Option<f64>>().unwrap(), Some(1.0));
        assert_eq!(c.next::<Option<f64>>().unwrap(), None);
        assert_eq!(c.next::<Option<f64>>().unwrap(), None);
    }

    #[test]
    fn test_broadcast() {
        let stack = ArgStack::new([Value::Float(0.5), Value::Vec3(Vector::Int([1, 2, 3]))]);
        let mut c = cursor_over(&stack);
        assert_eq!(c.next::<Broadcast<[f64; 3]>>().unwrap(), Broadcast([0.5; 3]));
        assert_eq!(
            c.next::<Broadcast<[i64; 3]>>().unwrap(),
            Broadcast([1, 2, 3])
        );
    }

    #[test]
    fn test_numeric_strings_only_when_enabled() {
        let stack = ArgStack::new([Value::Str("42".into()), Value::Str("0x10".into())]);
        assert_eq!(cursor_over(&stack).peek(), Category::String);
        assert!(cursor_over(&stack).next::<i64>().is_err());

        let mut c = Cursor::new(&stack, "test", Coercion::LENIENT);
        assert_eq!(c.peek(), Category::Integer);
        assert_eq!(c.next::<i64>().unwrap(), 42);
        assert_eq!(c.next::<i64>().unwrap(), 16);
    }

    #[test]
    fn test_parse_number_rejects_words() {
        assert_eq!(parse_number(" 2.5 "), Some(Scalar::Float(2.5)));
        assert_eq!(parse_number("-7"), Some(Scalar::Int(-7)));
        assert_eq!(parse_number("1e3"), Some(Scalar::Float(1000.0)));
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("nan"), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_parse_number_hex() {
        assert_eq!(parse_number("0x1F"), Some(Scalar::Int(31)));
        assert_eq!(parse_number("-0x10"), Some(Scalar::Int(-16)));
        assert_eq!(parse_number("0x+5"), None);
        assert_eq!(parse_number("-0x+5"), None);
        assert_eq!(parse_number("0x"), None);
    }

    #[test]
    fn test_truthy_booleans() {
        let stack = ArgStack::new([Value::Bool(true)]);
        let policy = Coercion {
            truthy_booleans: true,
            ..Coercion::STRICT
        };
        let mut c = Cursor::new(&stack, "test", policy);
        assert_eq!(c.peek(), Category::Integer);
        assert_eq!(c.next::<i64>().unwrap(), 1);
    }

    #[test]
    fn test_rest_reads_to_the_top() {
        let stack = ArgStack::new([Value::Int(1), Value::Int(2), Value::Int(3), Value::Nil]);
        let mut c = cursor_over(&stack);
        c.next::<i64>().unwrap();
        assert_eq!(c.rest::<i64>().unwrap(), vec![2, 3]);
        assert_eq!(c.remaining(), 0);
    }

    #[test]
    fn test_is_peeks_without_advancing() {
        let stack = ArgStack::new([Value::Quat(Quat::from_wxyz(1.0, 0.0, 0.0, 0.0))]);
        let c = cursor_over(&stack);
        assert!(c.is::<Quat>(0));
        assert!(!c.is::<[f64; 4]>(0));
        assert!(c.is::<Option<f64>>(1));
        assert_eq!(c.index(), 0);
    }
}
