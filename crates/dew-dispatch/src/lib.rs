//! Overload dispatch between dynamically tagged values and typed math routines.
//!
//! A host scripting environment hands this crate an untyped sequence of
//! [`Value`]s through an [`ArgumentChannel`]. An [`Operation`] inspects the
//! runtime [`Category`] of the leading arguments and the argument count,
//! selects one of its [`Candidate`] overloads, pulls strongly-typed arguments
//! through a [`Cursor`], calls the bound routine and pushes the results back
//! as tagged values.
//!
//! # Quick Start
//!
//! ```
//! use rhizome_dew_dispatch::{ArgStack, Candidate, Operation, OperationTable, Value};
//!
//! fn dot<const N: usize>(a: [f64; N], b: [f64; N]) -> f64 {
//!     a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
//! }
//!
//! let mut table = OperationTable::new();
//! table.register(
//!     Operation::new("dot")
//!         .overload(Candidate::new(dot::<2>))
//!         .overload(Candidate::new(dot::<3>)),
//! );
//!
//! let mut stack = ArgStack::new([Value::from([1.0, 0.0, 0.0]), Value::from([0.0, 1.0, 0.0])]);
//! let pushed = table.call("dot", &mut stack).unwrap();
//! assert_eq!(pushed, 1);
//! assert_eq!(stack.results(), &[Value::Float(0.0)]);
//! ```
//!
//! # Pieces
//!
//! | Piece            | Role                                                        |
//! |------------------|-------------------------------------------------------------|
//! | [`Category`]     | Closed-set classification of one argument                   |
//! | [`Cursor`]       | Typed, coercing reads that advance one position at a time   |
//! | [`Candidate`]    | One overload: parameter descriptors plus the routine        |
//! | [`Operation`]    | Ordered candidates, selection and error reporting           |
//! | [`IntoOutputs`]  | Routine results (single, tuple, `Option`) to tagged values  |
//! | [`OperationTable`] | Name → operation registry, built once and shared         |
//!
//! # Coercion
//!
//! Integers widen to floats everywhere. Floats narrow to integers only when
//! they hold an exact integer, unless an operation opts into truncation.
//! Numeric strings and booleans count as numbers only for operations whose
//! [`Coercion`] policy enables it.

use std::fmt;
use std::sync::Arc;

mod access;
mod channel;
mod marshal;
mod registry;
mod select;

pub use access::{classify, Broadcast, Coercion, Cursor, FloatToInt, FromArg, Mismatch};
pub use channel::{ArgStack, ArgumentChannel};
pub use marshal::{push_outputs, IntoOutputs, IntoValue, Outputs};
pub use registry::OperationTable;
pub use select::{Accepts, Candidate, Operation, Param, Routine};

/// Floating-point width carried by tagged values.
pub type Number = f64;

/// Integer width carried by tagged values.
pub type Integer = i64;

// ============================================================================
// Categories
// ============================================================================

/// Element kind of a vector value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Elem {
    Float,
    Int,
    Bool,
}

/// Closed-set classification of a single argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Past the top of the channel, or nil.
    Absent,
    Boolean,
    Integer,
    Float,
    String,
    /// Vector of length 2..=4 with the given element kind.
    Vector(u8, Elem),
    Quaternion,
    /// Matrix with (columns, rows), each in 2..=4.
    Matrix(u8, u8),
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Absent => write!(f, "no value"),
            Category::Boolean => write!(f, "boolean"),
            Category::Integer => write!(f, "integer"),
            Category::Float => write!(f, "number"),
            Category::String => write!(f, "string"),
            Category::Vector(n, Elem::Float) => write!(f, "vec{n}"),
            Category::Vector(n, Elem::Int) => write!(f, "ivec{n}"),
            Category::Vector(n, Elem::Bool) => write!(f, "bvec{n}"),
            Category::Quaternion => write!(f, "quat"),
            Category::Matrix(c, r) => write!(f, "mat{c}x{r}"),
        }
    }
}

// ============================================================================
// Values
// ============================================================================

/// A vector payload. The length lives in the type, so a `Vector<3>` can never
/// be read as four components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Vector<const N: usize> {
    Float([Number; N]),
    Int([Integer; N]),
    Bool([bool; N]),
}

impl<const N: usize> Vector<N> {
    pub fn elem(&self) -> Elem {
        match self {
            Vector::Float(_) => Elem::Float,
            Vector::Int(_) => Elem::Int,
            Vector::Bool(_) => Elem::Bool,
        }
    }

    /// Float components; integer vectors widen, boolean vectors do not.
    pub fn as_float(&self) -> Option<[Number; N]> {
        match self {
            Vector::Float(v) => Some(*v),
            Vector::Int(v) => Some(v.map(|x| x as Number)),
            Vector::Bool(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<[Integer; N]> {
        match self {
            Vector::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<[bool; N]> {
        match self {
            Vector::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Components as individual scalar values, keeping the element kind.
    pub fn components(&self) -> Vec<Value> {
        match self {
            Vector::Float(v) => v.iter().map(|x| Value::Float(*x)).collect(),
            Vector::Int(v) => v.iter().map(|x| Value::Int(*x)).collect(),
            Vector::Bool(v) => v.iter().map(|x| Value::Bool(*x)).collect(),
        }
    }
}

/// A quaternion stored as `[x, y, z, w]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat<T = Number>(pub [T; 4]);

impl<T: Copy> Quat<T> {
    /// Builds from glm constructor order `(w, x, y, z)`.
    pub fn from_wxyz(w: T, x: T, y: T, z: T) -> Self {
        Quat([x, y, z, w])
    }

    pub fn x(&self) -> T {
        self.0[0]
    }
    pub fn y(&self) -> T {
        self.0[1]
    }
    pub fn z(&self) -> T {
        self.0[2]
    }
    pub fn w(&self) -> T {
        self.0[3]
    }

    /// Vector part `[x, y, z]`.
    pub fn xyz(&self) -> [T; 3] {
        [self.0[0], self.0[1], self.0[2]]
    }
}

/// A float matrix, column-major: `M3x2` has 3 columns of 2 rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Matrix {
    M2x2([[Number; 2]; 2]),
    M2x3([[Number; 3]; 2]),
    M2x4([[Number; 4]; 2]),
    M3x2([[Number; 2]; 3]),
    M3x3([[Number; 3]; 3]),
    M3x4([[Number; 4]; 3]),
    M4x2([[Number; 2]; 4]),
    M4x3([[Number; 3]; 4]),
    M4x4([[Number; 4]; 4]),
}

macro_rules! each_matrix {
    ($m:expr, $cols:ident => $body:expr) => {
        match $m {
            Matrix::M2x2($cols) => $body,
            Matrix::M2x3($cols) => $body,
            Matrix::M2x4($cols) => $body,
            Matrix::M3x2($cols) => $body,
            Matrix::M3x3($cols) => $body,
            Matrix::M3x4($cols) => $body,
            Matrix::M4x2($cols) => $body,
            Matrix::M4x3($cols) => $body,
            Matrix::M4x4($cols) => $body,
        }
    };
}

impl Matrix {
    /// `(columns, rows)`.
    pub fn shape(&self) -> (u8, u8) {
        each_matrix!(self, m => (m.len() as u8, m[0].len() as u8))
    }

    pub fn get(&self, col: usize, row: usize) -> Option<Number> {
        each_matrix!(self, m => m.get(col).and_then(|c| c.get(row)).copied())
    }

    /// Builds a matrix of the given shape from an element function.
    /// Returns `None` for shapes outside 2..=4.
    pub fn from_fn(cols: u8, rows: u8, f: impl Fn(usize, usize) -> Number) -> Option<Matrix> {
        fn build<const C: usize, const R: usize>(
            f: impl Fn(usize, usize) -> Number,
        ) -> [[Number; R]; C] {
            std::array::from_fn(|c| std::array::from_fn(|r| f(c, r)))
        }
        Some(match (cols, rows) {
            (2, 2) => Matrix::M2x2(build(f)),
            (2, 3) => Matrix::M2x3(build(f)),
            (2, 4) => Matrix::M2x4(build(f)),
            (3, 2) => Matrix::M3x2(build(f)),
            (3, 3) => Matrix::M3x3(build(f)),
            (3, 4) => Matrix::M3x4(build(f)),
            (4, 2) => Matrix::M4x2(build(f)),
            (4, 3) => Matrix::M4x3(build(f)),
            (4, 4) => Matrix::M4x4(build(f)),
            _ => return None,
        })
    }

    /// Column `col` as a float vector value.
    pub fn column(&self, col: usize) -> Option<Value> {
        each_matrix!(self, m => m.get(col).map(|c| column_value(c)))
    }
}

fn column_value(column: &[Number]) -> Value {
    match *column {
        [x, y] => Value::Vec2(Vector::Float([x, y])),
        [x, y, z] => Value::Vec3(Vector::Float([x, y, z])),
        [x, y, z, w] => Value::Vec4(Vector::Float([x, y, z, w])),
        _ => Value::Nil,
    }
}

/// A tagged value flowing through an argument channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(Integer),
    Float(Number),
    Str(Arc<str>),
    Vec2(Vector<2>),
    Vec3(Vector<3>),
    Vec4(Vector<4>),
    Quat(Quat),
    Mat(Matrix),
}

impl Value {
    /// Tag inspection only; never looks at the payload.
    pub fn category(&self) -> Category {
        match self {
            Value::Nil => Category::Absent,
            Value::Bool(_) => Category::Boolean,
            Value::Int(_) => Category::Integer,
            Value::Float(_) => Category::Float,
            Value::Str(_) => Category::String,
            Value::Vec2(v) => Category::Vector(2, v.elem()),
            Value::Vec3(v) => Category::Vector(3, v.elem()),
            Value::Vec4(v) => Category::Vector(4, v.elem()),
            Value::Quat(_) => Category::Quaternion,
            Value::Mat(m) => {
                let (c, r) = m.shape();
                Category::Matrix(c, r)
            }
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Splits a composite into its parts: vector components (element kind
    /// preserved), quaternion `w, x, y, z`, or matrix columns. Scalars yield
    /// themselves.
    pub fn unpack(&self) -> Vec<Value> {
        match self {
            Value::Vec2(v) => v.components(),
            Value::Vec3(v) => v.components(),
            Value::Vec4(v) => v.components(),
            Value::Quat(q) => [q.w(), q.x(), q.y(), q.z()]
                .iter()
                .map(|x| Value::Float(*x))
                .collect(),
            Value::Mat(m) => {
                let (cols, _) = m.shape();
                (0..cols as usize).filter_map(|c| m.column(c)).collect()
            }
            other => vec![other.clone()],
        }
    }
}

fn write_vector<const N: usize>(f: &mut fmt::Formatter<'_>, v: &Vector<N>) -> fmt::Result {
    match v {
        Vector::Float(c) => {
            write!(f, "vec{N}(")?;
            write_list(f, c.iter().map(|x| format!("{x:.6}")))?;
        }
        Vector::Int(c) => {
            write!(f, "ivec{N}(")?;
            write_list(f, c.iter().map(|x| x.to_string()))?;
        }
        Vector::Bool(c) => {
            write!(f, "bvec{N}(")?;
            write_list(f, c.iter().map(|x| x.to_string()))?;
        }
    }
    write!(f, ")")
}

fn write_list(f: &mut fmt::Formatter<'_>, items: impl Iterator<Item = String>) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Vec2(v) => write_vector(f, v),
            Value::Vec3(v) => write_vector(f, v),
            Value::Vec4(v) => write_vector(f, v),
            Value::Quat(q) => write!(
                f,
                "quat({:.6}, {{{:.6}, {:.6}, {:.6}}})",
                q.w(),
                q.x(),
                q.y(),
                q.z()
            ),
            Value::Mat(m) => {
                let (cols, rows) = m.shape();
                write!(f, "mat{cols}x{rows}(")?;
                for c in 0..cols as usize {
                    if c > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "(")?;
                    write_list(
                        f,
                        (0..rows as usize)
                            .map(|r| format!("{:.6}", m.get(c, r).unwrap_or(Number::NAN))),
                    )?;
                    write!(f, ")")?;
                }
                write!(f, ")")
            }
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// A call aborted before producing any results.
///
/// Domain failures (a singular matrix, a ray that misses) are not errors:
/// those calls succeed with zero results.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    #[error("unknown operation: '{0}'")]
    UnknownOperation(String),

    /// An argument's category fits no overload at this position.
    #[error("bad argument #{position} to '{op}' ({expected}, got {got})")]
    TypeMismatch {
        op: &'static str,
        position: usize,
        expected: String,
        got: Category,
    },

    /// No overload takes this many arguments.
    #[error("'{op}' expects {}, got {got} arguments", .shapes.join(" or "))]
    ArityMismatch {
        op: &'static str,
        got: usize,
        shapes: Vec<String>,
    },

    /// The category fits, but the value cannot be converted without a
    /// disallowed narrowing.
    #[error("bad argument #{position} to '{op}' ({reason})")]
    Coercion {
        op: &'static str,
        position: usize,
        reason: String,
    },
}

impl DispatchError {
    pub fn op(&self) -> &str {
        match self {
            DispatchError::UnknownOperation(name) => name,
            DispatchError::TypeMismatch { op, .. }
            | DispatchError::ArityMismatch { op, .. }
            | DispatchError::Coercion { op, .. } => op,
        }
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;

// ============================================================================
// Tests
// ============================================================================
