//! The argument channel: where tagged arguments come from and results go.

use crate::{Category, Value};

/// An ordered, index-addressed sequence of arguments plus an output sink.
///
/// Indices are 0-based. Reads past [`arg_count`](Self::arg_count) return
/// `None`, which the classifier reports as [`Category::Absent`].
pub trait ArgumentChannel {
    /// Number of arguments supplied by the caller.
    fn arg_count(&self) -> usize;

    /// The argument at `index`, or `None` past the top.
    fn arg(&self, index: usize) -> Option<&Value>;

    /// Appends one result.
    fn push(&mut self, value: Value);

    /// Raw tag of the argument at `index`. Nil and missing values are both
    /// [`Category::Absent`].
    fn tag_at(&self, index: usize) -> Category {
        self.arg(index).map_or(Category::Absent, Value::category)
    }

    /// Argument count with trailing nils trimmed, so `f(a, nil)` counts as
    /// one argument.
    fn supplied(&self) -> usize {
        let mut n = self.arg_count();
        while n > 0 && self.arg(n - 1).map_or(true, Value::is_nil) {
            n -= 1;
        }
        n
    }
}

/// In-memory channel: a vector of arguments and a vector of results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgStack {
    args: Vec<Value>,
    results: Vec<Value>,
}

impl ArgStack {
    pub fn new(args: impl IntoIterator<Item = Value>) -> Self {
        Self {
            args: args.into_iter().collect(),
            results: Vec::new(),
        }
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn results(&self) -> &[Value] {
        &self.results
    }

    pub fn into_results(self) -> Vec<Value> {
        self.results
    }
}

impl FromIterator<Value> for ArgStack {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl ArgumentChannel for ArgStack {
    fn arg_count(&self) -> usize {
        self.args.len()
    }

    fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    fn push(&mut self, value: Value) {
        self.results.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Elem, Vector};

    #[test]
    fn test_reads_past_top_are_absent() {
        let stack = ArgStack::new([Value::Int(1)]);
        assert_eq!(stack.arg_count(), 1);
        assert_eq!(stack.tag_at(0), Category::Integer);
        assert_eq!(stack.tag_at(1), Category::Absent);
        assert_eq!(stack.tag_at(100), Category::Absent);
    }

    #[test]
    fn test_nil_is_absent() {
        let stack = ArgStack::new([Value::Nil, Value::Vec2(Vector::Bool([true, false]))]);
        assert_eq!(stack.tag_at(0), Category::Absent);
        assert_eq!(stack.tag_at(1), Category::Vector(2, Elem::Bool));
    }

    #[test]
    fn test_supplied_trims_trailing_nils() {
        let stack =
            ArgStack::new([Value::Int(1), Value::Nil, Value::Int(2), Value::Nil, Value::Nil]);
        assert_eq!(stack.arg_count(), 5);
        assert_eq!(stack.supplied(), 3);
        assert_eq!(ArgStack::new([Value::Nil]).supplied(), 0);
    }

    #[test]
    fn test_push_keeps_order() {
        let mut stack = ArgStack::default();
        stack.push(Value::Int(1));
        stack.push(Value::Float(2.0));
        assert_eq!(stack.results(), &[Value::Int(1), Value::Float(2.0)]);
        assert!(stack.args().is_empty());
    }
}
