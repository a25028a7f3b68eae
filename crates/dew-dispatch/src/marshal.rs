//! Routine results back to tagged values.

use crate::{ArgumentChannel, Integer, Matrix, Number, Quat, Value, Vector};

/// A single result convertible to a tagged value.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// The values one call pushes, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outputs(pub Vec<Value>);

impl Outputs {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A routine return type.
///
/// Single values give one output, tuples give one per element, `None` gives
/// zero outputs (the domain-failure signal) and `()` gives none.
pub trait IntoOutputs {
    fn into_outputs(self) -> Outputs;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

macro_rules! into_value {
    ($($ty:ty => |$v:ident| $body:expr;)*) => {
        $(
            impl IntoValue for $ty {
                fn into_value(self) -> Value {
                    let $v = self;
                    $body
                }
            }

            impl From<$ty> for Value {
                fn from(v: $ty) -> Value {
                    v.into_value()
                }
            }

            impl IntoOutputs for $ty {
                fn into_outputs(self) -> Outputs {
                    Outputs(vec![self.into_value()])
                }
            }
        )*
    };
}

into_value! {
    Number => |x| Value::Float(x);
    Integer => |i| Value::Int(i);
    bool => |b| Value::Bool(b);
    u32 => |i| Value::Int(Integer::from(i));
    i32 => |i| Value::Int(Integer::from(i));
    String => |s| Value::Str(s.into());
    &'static str => |s| Value::Str(s.into());
    Quat => |q| Value::Quat(q);
    Matrix => |m| Value::Mat(m);
    [Number; 2] => |v| Value::Vec2(Vector::Float(v));
    [Number; 3] => |v| Value::Vec3(Vector::Float(v));
    [Number; 4] => |v| Value::Vec4(Vector::Float(v));
    [Integer; 2] => |v| Value::Vec2(Vector::Int(v));
    [Integer; 3] => |v| Value::Vec3(Vector::Int(v));
    [Integer; 4] => |v| Value::Vec4(Vector::Int(v));
    [bool; 2] => |v| Value::Vec2(Vector::Bool(v));
    [bool; 3] => |v| Value::Vec3(Vector::Bool(v));
    [bool; 4] => |v| Value::Vec4(Vector::Bool(v));
    [[Number; 2]; 2] => |m| Value::Mat(Matrix::M2x2(m));
    [[Number; 3]; 2] => |m| Value::Mat(Matrix::M2x3(m));
    [[Number; 4]; 2] => |m| Value::Mat(Matrix::M2x4(m));
    [[Number; 2]; 3] => |m| Value::Mat(Matrix::M3x2(m));
    [[Number; 3]; 3] => |m| Value::Mat(Matrix::M3x3(m));
    [[Number; 4]; 3] => |m| Value::Mat(Matrix::M3x4(m));
    [[Number; 2]; 4] => |m| Value::Mat(Matrix::M4x2(m));
    [[Number; 3]; 4] => |m| Value::Mat(Matrix::M4x3(m));
    [[Number; 4]; 4] => |m| Value::Mat(Matrix::M4x4(m));
}

impl IntoOutputs for Value {
    fn into_outputs(self) -> Outputs {
        Outputs(vec![self])
    }
}

impl IntoOutputs for Outputs {
    fn into_outputs(self) -> Outputs {
        self
    }
}

impl IntoOutputs for () {
    fn into_outputs(self) -> Outputs {
        Outputs::default()
    }
}

impl<T: IntoOutputs> IntoOutputs for Option<T> {
    fn into_outputs(self) -> Outputs {
        self.map(IntoOutputs::into_outputs).unwrap_or_default()
    }
}

impl<T: IntoValue> IntoOutputs for Vec<T> {
    fn into_outputs(self) -> Outputs {
        Outputs(self.into_iter().map(IntoValue::into_value).collect())
    }
}

macro_rules! tuple_outputs {
    ($($name:ident),+) => {
        impl<$($name: IntoValue),+> IntoOutputs for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_outputs(self) -> Outputs {
                let ($($name,)+) = self;
                Outputs(vec![$($name.into_value()),+])
            }
        }
    };
}

tuple_outputs!(A, B);
tuple_outputs!(A, B, C);
tuple_outputs!(A, B, C, D);
tuple_outputs!(A, B, C, D, E);

/// Pushes every output onto `channel`; returns how many were pushed.
pub fn push_outputs(channel: &mut dyn ArgumentChannel, outputs: Outputs) -> usize {
    let count = outputs.len();
    for value in outputs.0 {
        channel.push(value);
    }
    count
}
