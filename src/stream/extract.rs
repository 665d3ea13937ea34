use crate::ast::{CompiledPath, Segment};
use crate::cache::GLOBAL_CACHE;
use crate::error::Error;
use crate::runtime::evaluation::core::is_size_name;
use crate::runtime::evaluation::{eval, eval_segments, get_property, EvalContext};
use crate::types::Value;
use std::borrow::Cow;
use tracing::debug;

use super::cursor::{JsonCursor, SeekResult, TokenCursor, TokenKind};

/// Result of drilling one segment into the stream.
enum Drill {
    /// The cursor sits on the selected value.
    Positioned,
    /// The segment had to build its result.
    Materialized(Value),
}

/// Evaluate `path` against the document under `cursor`, reading only the
/// parts of the stream the path needs.
pub fn extract<C: TokenCursor>(path: &CompiledPath, cursor: &mut C) -> Result<Value, Error> {
    let segments = path.segments();
    if needs_full_document(path) {
        debug!(path = %path, "stream extraction falls back to full materialization");
        let root = cursor.read_value()?;
        return eval(path, &root);
    }

    for (i, segment) in segments.iter().enumerate() {
        if !drills(segment) {
            let current = cursor.read_value()?;
            return eval_rest(path, &current, &segments[i..]);
        }
        match drill(path, segment, cursor)? {
            Drill::Materialized(value) => return eval_rest(path, &value, &segments[i + 1..]),
            Drill::Positioned if eager_after(segments, i) => {
                let current = cursor.read_value()?;
                return eval_rest(path, &current, &segments[i + 1..]);
            }
            Drill::Positioned => {}
        }
    }
    cursor.read_value()
}

/// Compile `path` through the process cache and extract it from `json`.
pub fn read(json: &str, path: &str) -> Result<Value, Error> {
    let compiled = GLOBAL_CACHE.compile(path)?;
    extract(&compiled, &mut JsonCursor::new(json))
}

fn needs_full_document(path: &CompiledPath) -> bool {
    if path.has_ref_segment() {
        return true;
    }
    matches!(
        path.segments().last(),
        None | Some(
            Segment::Size
                | Segment::Type
                | Segment::Floor
                | Segment::Max
                | Segment::Min
                | Segment::KeySet
                | Segment::MultiIndex(_)
        )
    )
}

fn drills(segment: &Segment) -> bool {
    match segment {
        Segment::Property { name, deep: false, .. } => !is_size_name(name),
        Segment::Property { deep: true, .. } => true,
        Segment::ArrayIndex(index) => *index >= 0,
        _ => false,
    }
}

/// Whether the value reached by segment `i` is read whole instead of being
/// drilled further.
fn eager_after(segments: &[Segment], i: usize) -> bool {
    let Some(next) = segments.get(i + 1) else {
        return true;
    };
    if matches!(segments[i], Segment::Wildcard { .. } | Segment::MultiIndex(_)) {
        return true;
    }
    if matches!(segments[i], Segment::Property { deep: true, .. })
        && matches!(
            next,
            Segment::ArrayIndex(_)
                | Segment::MultiIndex(_)
                | Segment::MultiProperty(_)
                | Segment::Size
                | Segment::Property { .. }
                | Segment::Filter(_)
        )
    {
        return true;
    }
    match next {
        Segment::ArrayIndex(index) => *index < 0,
        Segment::Filter(_) | Segment::Wildcard { .. } | Segment::MultiIndex(_) => true,
        _ => false,
    }
}

fn eval_rest(path: &CompiledPath, value: &Value, rest: &[Segment]) -> Result<Value, Error> {
    let ctx = EvalContext::new(path, value);
    eval_segments(&ctx, rest, value).map(Cow::into_owned)
}

fn drill<C: TokenCursor>(path: &CompiledPath, segment: &Segment, cursor: &mut C) -> Result<Drill, Error> {
    match segment {
        Segment::Property { name, hash, deep: false } => match cursor.kind() {
            TokenKind::BeginObject => match cursor.seek_to_field(name, *hash, false)? {
                SeekResult::NotMatch => Ok(Drill::Materialized(Value::Null)),
                _ => Ok(Drill::Positioned),
            },
            TokenKind::BeginArray => map_property(path, name, *hash, cursor).map(Drill::Materialized),
            _ => {
                let current = cursor.read_value()?;
                Ok(Drill::Materialized(
                    get_property(&current, name, path.ignore_null_value()).into_owned(),
                ))
            }
        },
        Segment::Property { name, hash, deep: true } => {
            let mut found = Vec::new();
            while cursor.seek_to_field(name, *hash, true)? != SeekResult::NotMatch {
                match cursor.read_value()? {
                    Value::Array(items) => found.extend(items),
                    other => found.push(other),
                }
            }
            Ok(Drill::Materialized(Value::Array(found)))
        }
        Segment::ArrayIndex(index) => {
            if cursor.kind() != TokenKind::BeginArray {
                let current = cursor.read_value()?;
                return eval_rest(path, &current, std::slice::from_ref(segment)).map(Drill::Materialized);
            }
            let index = usize::try_from(*index).map_err(|_| Error::evaluation("negative index in stream drill"))?;
            if cursor.seek_to_index(index)? {
                Ok(Drill::Positioned)
            } else {
                Ok(Drill::Materialized(Value::Null))
            }
        }
        other => Err(Error::evaluation(format!("cannot drill {:?} in a stream", other))),
    }
}

/// A property over a sequence maps across its elements, splicing nested
/// sequences and dropping nulls when the path asks for it.
fn map_property<C: TokenCursor>(
    path: &CompiledPath,
    name: &str,
    hash: u64,
    cursor: &mut C,
) -> Result<Value, Error> {
    let ignore_null = path.ignore_null_value();
    let mut out = Vec::new();
    cursor.advance()?;
    loop {
        let value = match cursor.kind() {
            TokenKind::EndArray => {
                cursor.advance()?;
                break;
            }
            TokenKind::Comma => {
                cursor.advance()?;
                continue;
            }
            TokenKind::BeginObject => match cursor.seek_to_field(name, hash, false)? {
                SeekResult::NotMatch => Value::Null,
                _ => {
                    let value = cursor.read_value()?;
                    cursor.exit_container()?;
                    value
                }
            },
            _ => {
                let item = cursor.read_value()?;
                get_property(&item, name, ignore_null).into_owned()
            }
        };
        match value {
            Value::Array(nested) => out.extend(nested),
            Value::Null if ignore_null => {}
            other => out.push(other),
        }
    }
    Ok(Value::Array(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn both(json: &str, text: &str) -> (Value, Value) {
        let path = parse(text, true).unwrap();
        let streamed = extract(&path, &mut JsonCursor::new(json)).unwrap();
        let evaluated = eval(&path, &Value::parse(json).unwrap()).unwrap();
        (streamed, evaluated)
    }

    const DOC: &str = r#"{
        "store": {
            "book": [
                {"title": "A", "price": 8.95, "tags": ["x", "y"]},
                {"title": "B", "price": 12, "isbn": "123"},
                {"title": "C", "price": 22.99, "tags": "z"}
            ],
            "bicycle": {"color": "red", "price": 19.95}
        },
        "count": 3
    }"#;

    #[test]
    fn streamed_results_match_evaluation() {
        for text in [
            "$.count",
            "$.store.bicycle.color",
            "$.store.book[1].title",
            "$.store.book[-1].title",
            "$.store.book.title",
            "$.store.book.tags",
            "$.store.book.isbn",
            "$..price",
            "$..book[0]",
            "$.store.book[?(@.price > 10)].title",
            "$.store.book[*].price",
            "$.store.missing.x",
            "$.store.book[9].title",
            "$.store.book.size()",
            "$.count.x",
        ] {
            let (streamed, evaluated) = both(DOC, text);
            assert_eq!(streamed, evaluated, "path {}", text);
        }
    }

    #[test]
    fn reads_through_the_process_cache() {
        assert_eq!(read(DOC, "$.store.book[0].title").unwrap(), Value::from("A"));
        assert_eq!(read(DOC, "$.nothing").unwrap(), Value::Null);
    }
}
