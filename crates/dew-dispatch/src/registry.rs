//! Name to operation lookup.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{ArgumentChannel, DispatchError, DispatchResult, Operation};

/// Registry of operations, built once and shared read-only across threads.
#[derive(Debug, Default, Clone)]
pub struct OperationTable {
    ops: HashMap<String, Arc<Operation>>,
}

impl OperationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers under the operation's own name, replacing any previous entry.
    pub fn register(&mut self, op: Operation) {
        let name = op.name().to_string();
        if self.ops.insert(name.clone(), Arc::new(op)).is_some() {
            tracing::warn!(op = %name, "replaced existing operation");
        }
    }

    /// Makes `target` also reachable as `alias`. Returns false if `target`
    /// is not registered.
    pub fn alias(&mut self, alias: &str, target: &str) -> bool {
        match self.ops.get(target).cloned() {
            Some(op) => {
                self.ops.insert(alias.to_string(), op);
                true
            }
            None => {
                tracing::warn!(alias, target, "alias target is not registered");
                false
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Operation>> {
        self.ops.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    /// All registered names, aliases included.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ops.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Looks up `name` and runs it against `channel`.
    pub fn call(&self, name: &str, channel: &mut dyn ArgumentChannel) -> DispatchResult<usize> {
        let op = self
            .get(name)
            .ok_or_else(|| DispatchError::UnknownOperation(name.to_string()))?;
        op.call(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArgStack, Candidate, Value};

    fn table() -> OperationTable {
        let mut table = OperationTable::new();
        table.register(Operation::new("neg").overload(Candidate::new(|x: f64| -x)));
        table
    }

    #[test]
    fn test_call_by_name() {
        let mut stack = ArgStack::new([Value::Float(2.0)]);
        assert_eq!(table().call("neg", &mut stack).unwrap(), 1);
        assert_eq!(stack.results(), &[Value::Float(-2.0)]);
    }

    #[test]
    fn test_unknown_operation() {
        let mut stack = ArgStack::default();
        let err = table().call("nope", &mut stack).unwrap_err();
        assert_eq!(err, DispatchError::UnknownOperation("nope".into()));
        assert_eq!(err.to_string(), "unknown operation: 'nope'");
    }

    #[test]
    fn test_alias_shares_operation() {
        let mut table = table();
        assert!(table.alias("negate", "neg"));
        assert!(!table.alias("x", "missing"));
        assert!(Arc::ptr_eq(
            table.get("neg").unwrap(),
            table.get("negate").unwrap()
        ));
        let mut names: Vec<_> = table.names().collect();
        names.sort_unstable();
        assert_eq!(names, ["neg", "negate"]);
    }

    #[test]
    fn test_register_replaces() {
        let mut table = table();
        table.register(Operation::new("neg").overload(Candidate::new(|x: i64| -x)));
        assert_eq!(table.len(), 1);
        let mut stack = ArgStack::new([Value::Int(3)]);
        table.call("neg", &mut stack).unwrap();
        assert_eq!(stack.results(), &[Value::Int(-3)]);
    }

    #[test]
    fn test_table_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OperationTable>();

        let table = Arc::new(table());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let table = Arc::clone(&table);
                std::thread::spawn(move || {
                    let mut stack = ArgStack::new([Value::Float(i as f64)]);
                    table.call("neg", &mut stack).unwrap();
                    stack.into_results()
                })
            })
            .collect();
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), vec![Value::Float(-(i as f64))]);
        }
    }
}
