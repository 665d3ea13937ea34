pub mod ast;
pub mod cache;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod stream;
pub mod traits;
pub mod types;

pub use ast::{CompiledPath, Filter, Operand, Operator, Segment};
pub use cache::{CacheStats, PathCache, DEFAULT_CACHE_CAPACITY, GLOBAL_CACHE};
pub use error::Error;
pub use runtime::patch::{parse_ops, PatchKind, PatchOp, PatchOutcome};
pub use runtime::paths::paths_of;
pub use stream::{extract, read, JsonCursor, TokenCursor};
pub use traits::{PropertyAccessor, RecordAccessor};
pub use types::{BeanRef, Map, Value};

use indexmap::IndexSet;
use std::sync::Arc;

/// Options fixed at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Drop nulls while mapping a property over a sequence.
    pub ignore_null_value: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self { ignore_null_value: true }
    }
}

/// Compile path text through the process-wide cache.
pub fn compile(path: &str) -> Result<Arc<CompiledPath>, Error> {
    GLOBAL_CACHE.compile(path)
}

pub fn compile_with(path: &str, options: CompileOptions) -> Result<Arc<CompiledPath>, Error> {
    GLOBAL_CACHE.compile_with(path, options.ignore_null_value)
}

/// Evaluate a path against a value tree.
pub fn eval(root: &Value, path: &str) -> Result<Value, Error> {
    compile(path)?.eval(root)
}

/// Parse `json` and evaluate `path` against it.
pub fn eval_json(json: &str, path: &str) -> Result<Value, Error> {
    eval(&Value::parse(json)?, path)
}

/// Whether the path selects anything: false for null and for an empty sequence.
pub fn contains(root: &Value, path: &str) -> Result<bool, Error> {
    compile(path)?.contains(root)
}

/// Whether `value` is the selected value or one of the selected elements.
pub fn contains_value(root: &Value, path: &str, value: &Value) -> Result<bool, Error> {
    compile(path)?.contains_value(root, value)
}

/// Size of the selected value; -1 for null and scalars.
pub fn size(root: &Value, path: &str) -> Result<i64, Error> {
    compile(path)?.size(root)
}

/// Keys of the selected object, or `None` when it is not key-bearing.
pub fn key_set(root: &Value, path: &str) -> Result<Option<IndexSet<String>>, Error> {
    compile(path)?.key_set(root)
}

/// Assign `value` everywhere the path points, creating missing containers.
pub fn set(root: &mut Value, path: &str, value: impl Into<Value>) -> Result<bool, Error> {
    compile(path)?.set(root, value.into())
}

pub fn remove(root: &mut Value, path: &str) -> Result<bool, Error> {
    compile(path)?.remove(root)
}

/// Append `values` to the sequence the path selects.
pub fn array_add(root: &mut Value, path: &str, values: &[Value]) -> Result<(), Error> {
    compile(path)?.array_add(root, values)
}

/// Apply patch operations to `root` and return the patched tree, or
/// `Boolean` with the answer when a `test` operation ends the batch.
pub fn patch(mut root: Value, ops: &[PatchOp]) -> Result<Value, Error> {
    match runtime::patch::apply(&mut root, ops)? {
        PatchOutcome::Applied => Ok(root),
        PatchOutcome::Tested(result) => Ok(Value::Boolean(result)),
    }
}

/// [`patch`] with the operations given as JSON text.
pub fn patch_json(root: Value, ops: &str) -> Result<Value, Error> {
    patch(root, &parse_ops(ops)?)
}

impl CompiledPath {
    pub fn eval(&self, root: &Value) -> Result<Value, Error> {
        runtime::eval(self, root)
    }

    pub fn contains(&self, root: &Value) -> Result<bool, Error> {
        Ok(match self.eval(root)? {
            Value::Null => false,
            Value::Array(items) => !items.is_empty(),
            _ => true,
        })
    }

    pub fn contains_value(&self, root: &Value, value: &Value) -> Result<bool, Error> {
        let selected = self.eval(root)?;
        if runtime::utils::values_equal(&selected, value) {
            return Ok(true);
        }
        Ok(match selected {
            Value::Array(items) => items.iter().any(|item| runtime::utils::values_equal(item, value)),
            _ => false,
        })
    }

    pub fn size(&self, root: &Value) -> Result<i64, Error> {
        if root.is_null() {
            return Ok(-1);
        }
        Ok(runtime::size_of(&self.eval(root)?))
    }

    pub fn key_set(&self, root: &Value) -> Result<Option<IndexSet<String>>, Error> {
        if root.is_null() {
            return Ok(None);
        }
        Ok(runtime::key_set(&self.eval(root)?).map(|keys| keys.into_iter().collect()))
    }

    pub fn set(&self, root: &mut Value, value: Value) -> Result<bool, Error> {
        runtime::set(self, root, value)
    }

    pub fn remove(&self, root: &mut Value) -> Result<bool, Error> {
        runtime::remove(self, root)
    }

    pub fn array_add(&self, root: &mut Value, values: &[Value]) -> Result<(), Error> {
        runtime::array_add(self, root, values)
    }

    /// Stream extraction from JSON text.
    pub fn extract(&self, json: &str) -> Result<Value, Error> {
        stream::extract(self, &mut JsonCursor::new(json))
    }
}
