//! Constructors for vectors, quaternions and matrices, and `unpack`.

use rhizome_dew_dispatch::{
    Accepts, Candidate, Category, Coercion, Cursor, DispatchResult, FromArg, Integer,
    IntoOutputs, Number, Operation, Outputs, Param, Quat, Value,
};

use crate::matrix::each_shape;
use crate::quaternion;

// ============================================================================
// Vectors
// ============================================================================

/// An element type a vector can be built from.
trait Component: Copy + Default + 'static {
    /// Reads one scalar argument.
    fn read(cursor: &mut Cursor<'_>) -> DispatchResult<Self>;

    /// Converts one component of a vector argument.
    fn convert(component: &Value) -> Self;
}

impl Component for Number {
    fn read(cursor: &mut Cursor<'_>) -> DispatchResult<Self> {
        if cursor.peek() == Category::Boolean {
            return cursor.next::<bool>().map(|b| if b { 1.0 } else { 0.0 });
        }
        cursor.next::<Number>()
    }

    fn convert(component: &Value) -> Self {
        match component {
            Value::Float(x) => *x,
            Value::Int(i) => *i as Number,
            Value::Bool(b) => Number::from(u8::from(*b)),
            _ => Number::NAN,
        }
    }
}

impl Component for Integer {
    fn read(cursor: &mut Cursor<'_>) -> DispatchResult<Self> {
        if cursor.peek() == Category::Boolean {
            return cursor.next::<bool>().map(Integer::from);
        }
        cursor.next::<Integer>()
    }

    fn convert(component: &Value) -> Self {
        match component {
            Value::Float(x) => x.trunc() as Integer,
            Value::Int(i) => *i,
            Value::Bool(b) => Integer::from(*b),
            _ => 0,
        }
    }
}

impl Component for bool {
    fn read(cursor: &mut Cursor<'_>) -> DispatchResult<Self> {
        if cursor.peek() == Category::Boolean {
            return cursor.next::<bool>();
        }
        cursor.next::<Number>().map(|x| x != 0.0)
    }

    fn convert(component: &Value) -> Self {
        match component {
            Value::Float(x) => *x != 0.0,
            Value::Int(i) => *i != 0,
            Value::Bool(b) => *b,
            _ => false,
        }
    }
}

fn components_param() -> Param {
    Param {
        variadic: true,
        ..Param::new(
            "number or vector",
            Accepts::NUMBER.union(Accepts::BOOLEAN).union(Accepts::VECTORS),
        )
        .optional()
    }
}

/// Flattens numbers and vectors into components. No arguments gives zero,
/// a single scalar is splatted, and extra components are dropped.
fn build_vector<T: Component, const N: usize>(c: &mut Cursor<'_>) -> DispatchResult<Outputs>
where
    [T; N]: IntoOutputs,
{
    let mut parts: Vec<T> = Vec::with_capacity(N);
    while c.remaining() > 0 && parts.len() < N {
        match c.peek() {
            Category::Integer | Category::Float | Category::Boolean => parts.push(T::read(c)?),
            Category::Vector(..) => {
                parts.extend(c.next::<Value>()?.unpack().iter().map(T::convert));
            }
            _ => return Err(c.type_error(c.index(), "number or vector expected")),
        }
    }
    let out: [T; N] = match parts.len() {
        0 => [T::default(); N],
        1 => [parts[0]; N],
        n if n >= N => std::array::from_fn(|i| parts[i]),
        _ => return Err(c.type_error(c.index(), "number or vector expected")),
    };
    Ok(out.into_outputs())
}

fn vector<T: Component, const N: usize>(name: &'static str) -> Operation
where
    [T; N]: IntoOutputs,
{
    Operation::new(name).overload(Candidate::raw(vec![components_param()], build_vector::<T, N>))
}

// ============================================================================
// Matrices
// ============================================================================

const MATRIX_NAMES: [&str; 9] = [
    "mat2x2", "mat2x3", "mat2x4", "mat3x2", "mat3x3", "mat3x4", "mat4x2", "mat4x3", "mat4x4",
];

fn diagonal<const C: usize, const R: usize>(d: Number) -> [[Number; R]; C] {
    std::array::from_fn(|c| std::array::from_fn(|r| if c == r { d } else { 0.0 }))
}

/// Copies the overlapping block of `source`; the rest comes from identity.
fn resize<const C: usize, const R: usize>(c: &mut Cursor<'_>) -> DispatchResult<Outputs>
where
    [[Number; R]; C]: IntoOutputs,
{
    let index = c.index();
    let Value::Mat(source) = c.next::<Value>()? else {
        return Err(c.type_error(index, "matrix expected"));
    };
    let identity = diagonal::<C, R>(1.0);
    let out: [[Number; R]; C] = std::array::from_fn(|col| {
        std::array::from_fn(|row| source.get(col, row).unwrap_or(identity[col][row]))
    });
    Ok(out.into_outputs())
}

fn columns<const C: usize, const R: usize>(c: &mut Cursor<'_>) -> DispatchResult<Outputs>
where
    [Number; R]: FromArg,
    [[Number; R]; C]: IntoOutputs,
{
    let mut out = [[0.0; R]; C];
    for column in out.iter_mut() {
        *column = c.next::<[Number; R]>()?;
    }
    Ok(out.into_outputs())
}

fn elements<const C: usize, const R: usize>(c: &mut Cursor<'_>) -> DispatchResult<Outputs>
where
    [[Number; R]; C]: IntoOutputs,
{
    let mut out = [[0.0; R]; C];
    for column in out.iter_mut() {
        for x in column.iter_mut() {
            *x = c.next::<Number>()?;
        }
    }
    Ok(out.into_outputs())
}

fn matrix<const C: usize, const R: usize>() -> Operation
where
    [Number; R]: FromArg,
    [[Number; R]; C]: IntoOutputs,
{
    let name = MATRIX_NAMES[(C - 2) * 3 + (R - 2)];
    let op = Operation::new(name)
        .overload(Candidate::raw(Vec::new(), |_| Ok(diagonal::<C, R>(1.0).into_outputs())))
        .overload(Candidate::raw(vec![Param::of::<Number>()], |c| {
            Ok(diagonal::<C, R>(c.next::<Number>()?).into_outputs())
        }))
        .overload(Candidate::raw(vec![Param::new("matrix", Accepts::MATRICES)], resize::<C, R>))
        .overload(Candidate::raw(vec![Param::of::<[Number; R]>(); C], columns::<C, R>))
        .overload(Candidate::raw(vec![Param::of::<Number>(); C * R], elements::<C, R>));
    match (C, R) {
        (3, 3) => op.overload(Candidate::new(quaternion::to_mat3::<Number>)),
        (4, 4) => op.overload(Candidate::new(quaternion::to_mat4::<Number>)),
        _ => op,
    }
}

// ============================================================================
// Manifest
// ============================================================================

pub fn operations() -> Vec<Operation> {
    let ivec = Coercion::STRICT.truncating();
    let mut ops = vec![
        vector::<Number, 2>("vec2"),
        vector::<Number, 3>("vec3"),
        vector::<Number, 4>("vec4"),
        vector::<Integer, 2>("ivec2").coercion(ivec),
        vector::<Integer, 3>("ivec3").coercion(ivec),
        vector::<Integer, 4>("ivec4").coercion(ivec),
        vector::<bool, 2>("bvec2"),
        vector::<bool, 3>("bvec3"),
        vector::<bool, 4>("bvec4"),
        Operation::new("quat")
            .overload(Candidate::new(quaternion::identity::<Number>))
            .overload(Candidate::new(|w: Number, x: Number, y: Number, z: Number| {
                Quat::from_wxyz(w, x, y, z)
            }))
            .overload(Candidate::new(|w: Number, v: [Number; 3]| {
                Quat::from_wxyz(w, v[0], v[1], v[2])
            }))
            .overload(Candidate::new(quaternion::from_euler::<Number>))
            .overload(Candidate::new(quaternion::from_vectors::<Number>))
            .overload(Candidate::new(quaternion::from_mat3::<Number>))
            .overload(Candidate::new(quaternion::from_mat4::<Number>))
            .overload(Candidate::new(|q: Quat| q)),
        Operation::new("unpack").overload(Candidate::new(|v: Value| v.unpack())),
    ];
    ops.extend(each_shape!(C, R => matrix::<C, R>()));
    ops
}

// ============================================================================
// Tests
// ============================================================================
