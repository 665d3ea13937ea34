//! JSON-patch style batches whose paths are treepath expressions.

use crate::cache::GLOBAL_CACHE;
use crate::error::Error;
use crate::runtime::evaluation::eval;
use crate::runtime::mutation::{patch_add, remove, set};
use crate::runtime::utils::values_equal;
use crate::types::Value;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchKind {
    Add,
    Remove,
    Replace,
    Move,
    Copy,
    Test,
}

/// One operation, e.g. `{"op":"add","path":"$.a","value":1}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOp {
    pub op: PatchKind,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default)]
    pub value: Value,
}

impl PatchOp {
    pub fn new(op: PatchKind, path: impl Into<String>) -> Self {
        Self {
            op,
            path: path.into(),
            from: None,
            value: Value::Null,
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// Every operation ran.
    Applied,
    /// A `test` operation ended the batch with this answer.
    Tested(bool),
}

/// Apply `ops` in order. A `test` operation stops the batch and reports its
/// result; later operations are not applied.
pub fn apply(root: &mut Value, ops: &[PatchOp]) -> Result<PatchOutcome, Error> {
    for op in ops {
        debug!(op = ?op.op, path = %op.path, "applying patch operation");
        let path = GLOBAL_CACHE.compile(&op.path)?;
        match op.op {
            PatchKind::Add => {
                patch_add(&path, root, &op.value, false)?;
            }
            PatchKind::Replace => {
                patch_add(&path, root, &op.value, true)?;
            }
            PatchKind::Remove => {
                remove(&path, root)?;
            }
            PatchKind::Move | PatchKind::Copy => {
                let from_text = op.from.as_deref().ok_or_else(|| {
                    Error::mutation(format!("json patch {:?} requires 'from'", op.op).to_lowercase())
                })?;
                let from = GLOBAL_CACHE.compile(from_text)?;
                let moved = eval(&from, root)?;
                if op.op == PatchKind::Move && !remove(&from, root)? {
                    return Err(Error::mutation(format!(
                        "json patch move error : {} -> {}",
                        from_text, op.path
                    )));
                }
                set(&path, root, moved)?;
            }
            PatchKind::Test => {
                let actual = eval(&path, root)?;
                return Ok(PatchOutcome::Tested(values_equal(&actual, &op.value)));
            }
        }
    }
    Ok(PatchOutcome::Applied)
}

/// Parse a patch document: a single operation object or a sequence of them.
pub fn parse_ops(text: &str) -> Result<Vec<PatchOp>, Error> {
    let json: serde_json::Value = serde_json::from_str(text)?;
    Ok(match json {
        serde_json::Value::Array(_) => serde_json::from_value(json)?,
        _ => vec![serde_json::from_value(json)?],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(json: &str) -> Value {
        Value::parse(json).unwrap()
    }

    #[test]
    fn parses_single_and_batched_ops() {
        let one = parse_ops(r#"{"op":"remove","path":"$.a"}"#).unwrap();
        assert_eq!(one, vec![PatchOp::new(PatchKind::Remove, "$.a")]);
        let many = parse_ops(r#"[{"op":"copy","from":"$.a","path":"$.b"},{"op":"test","path":"$.b","value":1}]"#)
            .unwrap();
        assert_eq!(many[0].from.as_deref(), Some("$.a"));
        assert_eq!(many[1].value, Value::Integer(1));
        assert!(parse_ops(r#"{"op":"frobnicate","path":"$"}"#).is_err());
    }

    #[test]
    fn move_and_copy() {
        let mut root = doc(r#"{"a":{"x":1},"b":{}}"#);
        let ops = [
            PatchOp::new(PatchKind::Copy, "$.b.copy").with_from("$.a.x"),
            PatchOp::new(PatchKind::Move, "$.b.moved").with_from("$.a"),
        ];
        assert_eq!(apply(&mut root, &ops).unwrap(), PatchOutcome::Applied);
        assert_eq!(root, doc(r#"{"b":{"copy":1,"moved":{"x":1}}}"#));
    }

    #[test]
    fn move_from_missing_path_fails() {
        let mut root = doc(r#"{"a":1}"#);
        let ops = [PatchOp::new(PatchKind::Move, "$.b").with_from("$.nope")];
        let err = apply(&mut root, &ops).unwrap_err();
        assert_eq!(err, Error::mutation("json patch move error : $.nope -> $.b"));
    }

    #[test]
    fn test_stops_the_batch() {
        let mut root = doc(r#"{"a":1}"#);
        let ops = [
            PatchOp::new(PatchKind::Test, "$.a").with_value(2),
            PatchOp::new(PatchKind::Remove, "$.a"),
        ];
        assert_eq!(apply(&mut root, &ops).unwrap(), PatchOutcome::Tested(false));
        assert_eq!(root, doc(r#"{"a":1}"#));
    }

    #[test]
    fn add_builds_missing_objects() {
        let mut root = doc("{}");
        let ops = [PatchOp::new(PatchKind::Add, "$.a.b").with_value("v")];
        apply(&mut root, &ops).unwrap();
        assert_eq!(root, doc(r#"{"a":{"b":"v"}}"#));
    }
}
