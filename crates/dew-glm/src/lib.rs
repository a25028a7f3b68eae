//! glm-style operations for the dew dispatch engine.
//!
//! Every operation is declared as data: an [`Operation`] holding an ordered
//! list of [`Candidate`] overloads, each bound to a generic kernel
//! instantiated per element type and dimension. The kernels themselves are
//! plain functions over arrays and live in the per-area modules.
//!
//! # Quick Start
//!
//! ```
//! use rhizome_dew_dispatch::{ArgStack, Value};
//! use rhizome_dew_glm::glm_registry;
//!
//! let table = glm_registry();
//! let mut stack = ArgStack::new([Value::from([3.0, 4.0])]);
//! table.call("length", &mut stack).unwrap();
//! assert_eq!(stack.results(), &[Value::Float(5.0)]);
//! ```
//!
//! # Features
//!
//! | Feature        | Operations                                          |
//! |----------------|-----------------------------------------------------|
//! | `quaternion`   | `conjugate`, `slerp`, `eulerAngles`, casts, ...     |
//! | `transform`    | `translate`, `rotate`, `perspective`, `lookAt`, ... |
//! | `packing`      | `packUnorm2x16`, `packHalf2x16`, ...                |
//! | `intersect`    | `intersectRayPlane`, `intersectRaySphere`, ...      |
//! | `legacy-names` | Enables [`GlmConfig::legacy_aliases`] by default    |
//!
//! Common, exponential, trigonometric, geometric, relational, matrix,
//! integer and constructor operations are always available.

use num_traits::Float;
use rhizome_dew_dispatch::{Accepts, Candidate, Coercion, Operation, OperationTable};

/// Expands `$body` once per vector width, with `$n` bound as a `const usize`
/// of 2, 3 and 4. Yields an array of the three results.
macro_rules! per_dim {
    ($n:ident => $body:expr) => {
        [
            {
                const $n: usize = 2;
                $body
            },
            {
                const $n: usize = 3;
                $body
            },
            {
                const $n: usize = 4;
                $body
            },
        ]
    };
}

pub mod common;
pub mod construct;
pub mod exponential;
pub mod geometric;
pub mod integer;
pub mod matrix;
pub mod quaternion;
pub mod relational;
pub mod trigonometric;

#[cfg(feature = "intersect")]
pub mod intersect;
#[cfg(feature = "packing")]
pub mod packing;
#[cfg(feature = "transform")]
pub mod transform;


// ============================================================================
// Configuration
// ============================================================================

/// Runtime options for building the operation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlmConfig {
    /// Strings that parse as numbers are accepted by the operations in
    /// [`NUMERIC_STRING_OPERATIONS`]. Every other operation stays strict.
    pub numeric_strings: bool,
    /// Register the older spellings (`mat4`, `not`, `not_equal`,
    /// `inverseSqrt`) as aliases.
    pub legacy_aliases: bool,
}

impl Default for GlmConfig {
    fn default() -> Self {
        Self {
            numeric_strings: false,
            legacy_aliases: cfg!(feature = "legacy-names"),
        }
    }
}

/// `(alias, target)` pairs registered when legacy aliases are enabled.
pub const LEGACY_ALIASES: &[(&str, &str)] = &[
    ("mat2", "mat2x2"),
    ("mat3", "mat3x3"),
    ("mat4", "mat4x4"),
    ("not", "not_"),
    ("not_equal", "notEqual"),
    ("inverseSqrt", "inversesqrt"),
];

/// Scalar functions that also exist in the host's own math library, and so
/// take numeric strings the way that library does when
/// [`GlmConfig::numeric_strings`] is set.
pub const NUMERIC_STRING_OPERATIONS: &[&str] = &[
    "abs", "ceil", "floor", "fmod", "modf", "min", "max", "sqrt", "exp", "log", "sin", "cos",
    "tan", "asin", "acos", "atan",
];

// ============================================================================
// Registry
// ============================================================================

/// Every operation enabled by the crate features, in registration order.
pub fn operations() -> Vec<Operation> {
    let mut ops = Vec::new();
    ops.extend(common::operations());
    ops.extend(exponential::operations());
    ops.extend(trigonometric::operations());
    ops.extend(geometric::operations());
    ops.extend(relational::operations());
    ops.extend(matrix::operations());
    ops.extend(integer::operations());
    ops.extend(construct::operations());
    #[cfg(feature = "quaternion")]
    ops.extend(quaternion::operations());
    #[cfg(feature = "transform")]
    ops.extend(transform::operations());
    #[cfg(feature = "packing")]
    ops.extend(packing::operations());
    #[cfg(feature = "intersect")]
    ops.extend(intersect::operations());
    ops
}

/// Builds the operation table with the default configuration.
pub fn glm_registry() -> OperationTable {
    glm_registry_with(GlmConfig::default())
}

/// Builds the operation table.
pub fn glm_registry_with(config: GlmConfig) -> OperationTable {
    let mut table = OperationTable::new();
    for op in operations() {
        if config.numeric_strings && NUMERIC_STRING_OPERATIONS.contains(&op.name()) {
            let policy = Coercion {
                numeric_strings: true,
                ..op.policy()
            };
            table.register(op.coercion(policy));
        } else {
            table.register(op);
        }
    }
    if config.legacy_aliases {
        for (alias, target) in LEGACY_ALIASES {
            table.alias(alias, target);
        }
    }
    tracing::debug!(operations = table.len(), "built glm operation table");
    table
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Integers and integer vectors: the `when_all` set for integer overloads.
pub(crate) const INTEGRAL: Accepts = Accepts::INTEGER.union(Accepts::INT_VECTORS);

/// Converts an `f64` constant into `T`.
pub(crate) fn lit<T: Float>(x: f64) -> T {
    T::from(x).unwrap_or_else(T::nan)
}

pub(crate) fn map2<T: Copy, U, const N: usize>(
    a: [T; N],
    b: [T; N],
    f: impl Fn(T, T) -> U,
) -> [U; N] {
    std::array::from_fn(|i| f(a[i], b[i]))
}

pub(crate) fn map3<T: Copy, const N: usize>(
    a: [T; N],
    b: [T; N],
    c: [T; N],
    f: impl Fn(T, T, T) -> T,
) -> [T; N] {
    std::array::from_fn(|i| f(a[i], b[i], c[i]))
}

/// A float operation applied per component: number and vec2..vec4.
pub(crate) fn componentwise(name: &'static str, f: fn(f64) -> f64) -> Operation {
    Operation::new(name)
        .overload(Candidate::new(move |x: f64| f(x)))
        .overloads(per_dim!(N => Candidate::new(move |v: [f64; N]| v.map(f))))
}

/// A binary float operation applied per component; a number second argument
/// is broadcast over a vector first argument.
pub(crate) fn componentwise2(name: &'static str, f: fn(f64, f64) -> f64) -> Operation {
    use rhizome_dew_dispatch::Broadcast;

    Operation::new(name)
        .overload(Candidate::new(move |a: f64, b: f64| f(a, b)))
        .overloads(per_dim!(N => Candidate::new(
            move |a: [f64; N], Broadcast(b): Broadcast<[f64; N]>| map2(a, b, f)
        )))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::OnceLock;

    use rhizome_dew_dispatch::{ArgStack, DispatchResult, OperationTable, Value};

    pub fn table() -> &'static OperationTable {
        static TABLE: OnceLock<OperationTable> = OnceLock::new();
        TABLE.get_or_init(super::glm_registry)
    }

    /// Calls `name` through the shared table and returns its outputs.
    pub fn call(name: &str, args: impl IntoIterator<Item = Value>) -> DispatchResult<Vec<Value>> {
        let mut stack = ArgStack::new(args);
        table().call(name, &mut stack)?;
        Ok(stack.into_results())
    }

    /// Flattens scalars and composites into floats for approximate checks.
    pub fn floats(value: &Value) -> Vec<f64> {
        match value {
            Value::Float(x) => vec![*x],
            Value::Int(i) => vec![*i as f64],
            Value::Bool(b) => vec![if *b { 1.0 } else { 0.0 }],
            Value::Nil | Value::Str(_) => Vec::new(),
            Value::Quat(q) => q.0.to_vec(),
            Value::Mat(m) => {
                let (cols, rows) = m.shape();
                (0..cols as usize)
                    .flat_map(|c| (0..rows as usize).map(move |r| (c, r)))
                    .filter_map(|(c, r)| m.get(c, r))
                    .collect()
            }
            other => other.unpack().iter().flat_map(floats).collect(),
        }
    }

    pub fn assert_close(actual: &Value, expected: &Value, context: &str) {
        assert_eq!(
            actual.category(),
            expected.category(),
            "{context}: expected {expected}, got {actual}"
        );
        for (a, e) in floats(actual).iter().zip(floats(expected).iter()) {
            let diff = (a - e).abs();
            assert!(
                diff < 1e-6 || (e.abs() > 1.0 && diff / e.abs() < 1e-6),
                "{context}: expected {expected}, got {actual} (diff: {diff})"
            );
        }
    }
}
