//! Overload candidates and selection by leading-argument category and count.

use std::fmt;

use crate::access::{classify, Coercion, Cursor, FromArg};
use crate::marshal::{push_outputs, IntoOutputs, Outputs};
use crate::{ArgumentChannel, Category, DispatchError, DispatchResult, Elem};

// ============================================================================
// Category sets
// ============================================================================

bitflags::bitflags! {
    /// A set of argument categories.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Accepts: u32 {
        const ABSENT = 1 << 0;
        const BOOLEAN = 1 << 1;
        const INTEGER = 1 << 2;
        const FLOAT = 1 << 3;
        const STRING = 1 << 4;
        const VEC2 = 1 << 5;
        const VEC3 = 1 << 6;
        const VEC4 = 1 << 7;
        const IVEC2 = 1 << 8;
        const IVEC3 = 1 << 9;
        const IVEC4 = 1 << 10;
        const BVEC2 = 1 << 11;
        const BVEC3 = 1 << 12;
        const BVEC4 = 1 << 13;
        const QUAT = 1 << 14;
        const MAT2X2 = 1 << 15;
        const MAT2X3 = 1 << 16;
        const MAT2X4 = 1 << 17;
        const MAT3X2 = 1 << 18;
        const MAT3X3 = 1 << 19;
        const MAT3X4 = 1 << 20;
        const MAT4X2 = 1 << 21;
        const MAT4X3 = 1 << 22;
        const MAT4X4 = 1 << 23;

        const NUMBER = Self::INTEGER.bits() | Self::FLOAT.bits();
        const FLOAT_VECTORS = Self::VEC2.bits() | Self::VEC3.bits() | Self::VEC4.bits();
        const INT_VECTORS = Self::IVEC2.bits() | Self::IVEC3.bits() | Self::IVEC4.bits();
        const BOOL_VECTORS = Self::BVEC2.bits() | Self::BVEC3.bits() | Self::BVEC4.bits();
        const VECTORS = Self::FLOAT_VECTORS.bits()
            | Self::INT_VECTORS.bits()
            | Self::BOOL_VECTORS.bits();
        const SQUARE = Self::MAT2X2.bits() | Self::MAT3X3.bits() | Self::MAT4X4.bits();
        const MATRICES = Self::SQUARE.bits()
            | Self::MAT2X3.bits()
            | Self::MAT2X4.bits()
            | Self::MAT3X2.bits()
            | Self::MAT3X4.bits()
            | Self::MAT4X2.bits()
            | Self::MAT4X3.bits();
        const PRESENT = Self::BOOLEAN.bits()
            | Self::NUMBER.bits()
            | Self::STRING.bits()
            | Self::VECTORS.bits()
            | Self::QUAT.bits()
            | Self::MATRICES.bits();
    }
}

impl Accepts {
    /// The single-category set for `category`.
    pub fn of(category: Category) -> Accepts {
        match category {
            Category::Absent => Accepts::ABSENT,
            Category::Boolean => Accepts::BOOLEAN,
            Category::Integer => Accepts::INTEGER,
            Category::Float => Accepts::FLOAT,
            Category::String => Accepts::STRING,
            Category::Vector(n, elem) => {
                let base = match elem {
                    Elem::Float => Accepts::VEC2,
                    Elem::Int => Accepts::IVEC2,
                    Elem::Bool => Accepts::BVEC2,
                };
                Accepts::from_bits_truncate(base.bits() << (n.saturating_sub(2)))
            }
            Category::Quaternion => Accepts::QUAT,
            Category::Matrix(c, r) => Accepts::from_bits_truncate(
                Accepts::MAT2X2.bits() << ((c.saturating_sub(2)) * 3 + r.saturating_sub(2)),
            ),
        }
    }
}

// ============================================================================
// Parameters
// ============================================================================

/// Descriptor of one declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    /// Name used in messages, e.g. `"vec3"` or `"number or vec3"`.
    pub name: &'static str,
    pub accepts: Accepts,
    pub optional: bool,
    /// Consumes every remaining argument.
    pub variadic: bool,
}

impl Param {
    pub const fn new(name: &'static str, accepts: Accepts) -> Self {
        Self {
            name,
            accepts,
            optional: false,
            variadic: false,
        }
    }

    pub fn of<T: FromArg>() -> Self {
        T::param()
    }

    /// Zero or more trailing arguments of `T`.
    pub fn rest<T: FromArg>() -> Self {
        Self {
            variadic: true,
            ..T::param()
        }
    }

    pub fn optional(self) -> Self {
        Self {
            optional: true,
            accepts: self.accepts | Accepts::ABSENT,
            ..self
        }
    }

    pub fn admits(&self, category: Category) -> bool {
        self.accepts.contains(Accepts::of(category))
    }
}

// ============================================================================
// Routines
// ============================================================================

/// A typed function usable as an overload body.
///
/// Implemented for every `Fn(A1, .., An) -> R` with up to eight parameters
/// where each `Ai: FromArg` and `R: IntoOutputs`. `Args` only exists to keep
/// the per-arity impls apart.
pub trait Routine<Args>: Send + Sync + 'static {
    fn params(&self) -> Vec<Param>;

    fn invoke(&self, cursor: &mut Cursor<'_>) -> DispatchResult<Outputs>;
}

macro_rules! impl_routine {
    ($($arg:ident),*) => {
        impl<Func, Ret, $($arg,)*> Routine<($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Ret + Send + Sync + 'static,
            Ret: IntoOutputs,
            $($arg: FromArg,)*
        {
            fn params(&self) -> Vec<Param> {
                vec![$($arg::param()),*]
            }

            #[allow(non_snake_case, unused_variables)]
            fn invoke(&self, cursor: &mut Cursor<'_>) -> DispatchResult<Outputs> {
                $(let $arg = cursor.next::<$arg>()?;)*
                Ok((self)($($arg),*).into_outputs())
            }
        }
    };
}

impl_routine!();
impl_routine!(A1);
impl_routine!(A1, A2);
impl_routine!(A1, A2, A3);
impl_routine!(A1, A2, A3, A4);
impl_routine!(A1, A2, A3, A4, A5);
impl_routine!(A1, A2, A3, A4, A5, A6);
impl_routine!(A1, A2, A3, A4, A5, A6, A7);
impl_routine!(A1, A2, A3, A4, A5, A6, A7, A8);

// ============================================================================
// Candidates
// ============================================================================

type Invoke = dyn Fn(&mut Cursor<'_>) -> DispatchResult<Outputs> + Send + Sync;

/// One overload of an operation.
pub struct Candidate {
    params: Vec<Param>,
    all: Option<Accepts>,
    invoke: Box<Invoke>,
}

impl Candidate {
    /// Binds a typed routine; parameters come from its argument types.
    pub fn new<Args, F: Routine<Args>>(routine: F) -> Self {
        let params = routine.params();
        Self {
            params,
            all: None,
            invoke: Box::new(move |cursor: &mut Cursor<'_>| routine.invoke(cursor)),
        }
    }

    /// Binds a body that reads its own arguments from the cursor.
    pub fn raw(
        params: Vec<Param>,
        body: impl Fn(&mut Cursor<'_>) -> DispatchResult<Outputs> + Send + Sync + 'static,
    ) -> Self {
        Self {
            params,
            all: None,
            invoke: Box::new(body),
        }
    }

    /// Matches only when every supplied argument classifies within `set`.
    pub fn when_all(mut self, set: Accepts) -> Self {
        self.all = Some(set);
        self
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// `(minimum, maximum)` argument count; no maximum when variadic.
    pub fn arity(&self) -> (usize, Option<usize>) {
        let min = self
            .params
            .iter()
            .filter(|p| !p.optional && !p.variadic)
            .count();
        let max = if self.params.iter().any(|p| p.variadic) {
            None
        } else {
            Some(self.params.len())
        };
        (min, max)
    }

    fn takes(&self, count: usize) -> bool {
        let (min, max) = self.arity();
        count >= min && max.map_or(true, |max| count <= max)
    }

    /// Declared parameter at `index`, repeating a trailing variadic.
    fn param_at(&self, index: usize) -> Option<&Param> {
        self.params
            .get(index)
            .or_else(|| self.params.last().filter(|p| p.variadic))
    }

    /// Human-readable parameter list, e.g. `(vec3, vec3)`.
    pub fn shape(&self) -> String {
        let names: Vec<String> = self
            .params
            .iter()
            .map(|p| {
                if p.variadic {
                    format!("{}...", p.name)
                } else if p.optional {
                    format!("[{}]", p.name)
                } else {
                    p.name.to_string()
                }
            })
            .collect();
        format!("({})", names.join(", "))
    }

    /// First position that rules this candidate out, if any. Only the two
    /// leading arguments are inspected, plus every argument under `when_all`.
    fn mismatch(
        &self,
        channel: &dyn ArgumentChannel,
        coercion: Coercion,
        supplied: usize,
    ) -> Option<usize> {
        for index in 0..2 {
            let category = classify(channel, index, coercion);
            match self.param_at(index) {
                Some(param) if !param.admits(category) => return Some(index),
                None if category != Category::Absent => return Some(index),
                _ => {}
            }
        }
        let all = self.all?;
        (0..supplied).find(|&i| !all.contains(Accepts::of(classify(channel, i, coercion))))
    }
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("shape", &self.shape())
            .field("all", &self.all)
            .finish()
    }
}

// ============================================================================
// Operations
// ============================================================================

/// A named operation: an ordered list of candidates.
///
/// Candidates are tried in declaration order and the first match wins, so
/// more specific overloads go first.
pub struct Operation {
    name: &'static str,
    expects: Option<&'static str>,
    coercion: Coercion,
    candidates: Vec<Candidate>,
}

impl Operation {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            expects: None,
            coercion: Coercion::default(),
            candidates: Vec::new(),
        }
    }

    /// Fixed "expected" text for type errors, e.g.
    /// `"vector or quaternion expected"`.
    pub fn expects(mut self, message: &'static str) -> Self {
        self.expects = Some(message);
        self
    }

    pub fn coercion(mut self, coercion: Coercion) -> Self {
        self.coercion = coercion;
        self
    }

    pub fn overload(mut self, candidate: Candidate) -> Self {
        self.candidates.push(candidate);
        self
    }

    pub fn overloads(mut self, candidates: impl IntoIterator<Item = Candidate>) -> Self {
        self.candidates.extend(candidates);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn policy(&self) -> Coercion {
        self.coercion
    }

    /// Picks the candidate for the arguments in `channel`.
    pub fn select(&self, channel: &dyn ArgumentChannel) -> DispatchResult<&Candidate> {
        let supplied = channel.supplied();
        let fitting: Vec<&Candidate> = self
            .candidates
            .iter()
            .filter(|c| c.takes(supplied))
            .collect();

        if fitting.is_empty() {
            return Err(DispatchError::ArityMismatch {
                op: self.name,
                got: supplied,
                shapes: self.candidates.iter().map(Candidate::shape).collect(),
            });
        }
        if self.candidates.len() == 1 {
            return Ok(fitting[0]);
        }

        let mut misses = Vec::with_capacity(fitting.len());
        for &candidate in &fitting {
            match candidate.mismatch(channel, self.coercion, supplied) {
                None => return Ok(candidate),
                Some(index) => misses.push((candidate, index)),
            }
        }
        let furthest = misses.iter().map(|&(_, index)| index).max().unwrap_or(0);
        // Only candidates that got this far say what the position takes.
        let survivors: Vec<&Candidate> = misses
            .iter()
            .filter(|&&(_, index)| index == furthest)
            .map(|&(candidate, _)| candidate)
            .collect();
        Err(DispatchError::TypeMismatch {
            op: self.name,
            position: furthest + 1,
            expected: self.expected_at(&survivors, furthest),
            got: classify(channel, furthest, self.coercion),
        })
    }

    fn expected_at(&self, candidates: &[&Candidate], index: usize) -> String {
        if let Some(message) = self.expects {
            return message.to_string();
        }
        let mut names: Vec<&str> = Vec::new();
        for param in candidates.iter().filter_map(|c| c.param_at(index)) {
            if !names.contains(&param.name) {
                names.push(param.name);
            }
        }
        match names.split_last() {
            None => "no value expected".to_string(),
            Some((last, [])) => format!("{last} expected"),
            Some((last, init)) => format!("{} or {last} expected", init.join(", ")),
        }
    }

    /// Selects, reads, invokes and pushes. Returns the number of results.
    ///
    /// Results are only pushed once the routine has returned, so a failed
    /// call leaves the channel's output untouched.
    #[tracing::instrument(level = "trace", skip_all, fields(op = self.name))]
    pub fn call(&self, channel: &mut dyn ArgumentChannel) -> DispatchResult<usize> {
        let outputs = {
            let candidate = self.select(&*channel)?;
            tracing::debug!(shape = %candidate.shape(), "selected overload");
            let mut cursor = Cursor::new(&*channel, self.name, self.coercion);
            (candidate.invoke)(&mut cursor)?
        };
        Ok(push_outputs(channel, outputs))
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("candidates", &self.candidates)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================


#[cfg(test)]
mod proptest_tests {
    use super::*;
    use crate::{ArgStack, Value, Vector};
    use proptest::prelude::*;

    fn any_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Nil),
            any::<bool>().prop_map(Value::Bool),
            (-1000i64..1000).prop_map(Value::Int),
            (-1000.0f64..1000.0).prop_map(Value::Float),
            prop::array::uniform2(-10.0f64..10.0).prop_map(|v| Value::Vec2(Vector::Float(v))),
            prop::array::uniform3(-10.0f64..10.0).prop_map(|v| Value::Vec3(Vector::Float(v))),
            prop::array::uniform3(-10i64..10).prop_map(|v| Value::Vec3(Vector::Int(v))),
        ]
    }

    fn mixed_op() -> Operation {
        Operation::new("mixed")
            .overload(Candidate::new(|a: i64, b: i64| a + b).when_all(Accepts::INTEGER))
            .overload(Candidate::new(|a: f64, b: f64| a + b))
            .overload(Candidate::new(|a: [f64; 3], b: [f64; 3]| a[0] + b[0]))
            .overload(Candidate::new(|a: [f64; 2]| a[0]))
    }

    fn selected_shape(op: &Operation, stack: &ArgStack) -> Option<String> {
        op.select(stack).ok().map(Candidate::shape)
    }

    proptest! {
        /// Selection depends only on categories and count, never on payloads.
        #[test]
        fn selection_is_deterministic(values in prop::collection::vec(any_value(), 0..4)) {
            let op = mixed_op();
            let stack = ArgStack::new(values.clone());
            prop_assert_eq!(selected_shape(&op, &stack), selected_shape(&op, &stack));

            let zeroed: Vec<Value> = values
                .iter()
                .map(|v| match v {
                    Value::Int(_) => Value::Int(0),
                    Value::Float(_) => Value::Float(0.0),
                    Value::Vec3(Vector::Float(_)) => Value::Vec3(Vector::Float([0.0; 3])),
                    other => other.clone(),
                })
                .collect();
            prop_assert_eq!(
                selected_shape(&op, &stack),
                selected_shape(&op, &ArgStack::new(zeroed))
            );
        }

        /// All-integer calls take the integer overload; any float falls through.
        #[test]
        fn integer_tie_break(
            a in -1000i64..1000,
            b in -1000i64..1000,
            float_first in any::<bool>(),
        ) {
            let op = mixed_op();
            let mut stack = ArgStack::new([Value::Int(a), Value::Int(b)]);
            op.call(&mut stack).unwrap();
            prop_assert_eq!(stack.results(), &[Value::Int(a + b)]);

            let args = if float_first {
                [Value::Float(a as f64), Value::Int(b)]
            } else {
                [Value::Int(a), Value::Float(b as f64)]
            };
            let mut stack = ArgStack::new(args);
            op.call(&mut stack).unwrap();
            prop_assert_eq!(stack.results(), &[Value::Float((a + b) as f64)]);
        }

        /// A failed call never pushes.
        #[test]
        fn errors_push_nothing(values in prop::collection::vec(any_value(), 0..4)) {
            let op = mixed_op();
            let mut stack = ArgStack::new(values);
            if op.call(&mut stack).is_err() {
                prop_assert!(stack.results().is_empty());
            }
        }
    }
}
