use crate::ast::{CompiledPath, Segment};
use crate::error::Error;
use crate::runtime::utils::clamp_index;
use crate::types::Value;
use std::borrow::Cow;

use super::{filter, functions};

/// Root and options shared by every segment of one evaluation.
#[derive(Clone, Copy)]
pub struct EvalContext<'r> {
    pub root: &'r Value,
    pub ignore_null_value: bool,
}

impl<'r> EvalContext<'r> {
    pub fn new(path: &CompiledPath, root: &'r Value) -> Self {
        Self {
            root,
            ignore_null_value: path.ignore_null_value(),
        }
    }
}

/// Evaluate a compiled path against `root`.
pub fn eval(path: &CompiledPath, root: &Value) -> Result<Value, Error> {
    let ctx = EvalContext::new(path, root);
    eval_segments(&ctx, path.segments(), root).map(Cow::into_owned)
}

/// Apply `segments` left to right starting at `value`, borrowing from the
/// tree for as long as no segment has to build a new value.
pub fn eval_segments<'v>(
    ctx: &EvalContext<'_>,
    segments: &[Segment],
    value: &'v Value,
) -> Result<Cow<'v, Value>, Error> {
    let mut current = Cow::Borrowed(value);
    for segment in segments {
        current = match current {
            Cow::Borrowed(v) => apply_segment(ctx, segment, v)?,
            Cow::Owned(v) => Cow::Owned(apply_segment(ctx, segment, &v)?.into_owned()),
        };
    }
    Ok(current)
}

pub fn apply_segment<'v>(
    ctx: &EvalContext<'_>,
    segment: &Segment,
    value: &'v Value,
) -> Result<Cow<'v, Value>, Error> {
    Ok(match segment {
        Segment::Property { name, deep: false, .. } => get_property(value, name, ctx.ignore_null_value),
        Segment::Property { name, deep: true, .. } => {
            let mut out = Vec::new();
            deep_scan(value, name, &mut out);
            Cow::Owned(Value::Array(out))
        }
        Segment::MultiProperty(names) => Cow::Owned(Value::Array(
            names
                .iter()
                .map(|name| get_property(value, name, ctx.ignore_null_value).into_owned())
                .collect(),
        )),
        Segment::Wildcard { deep: false, .. } => child_values(value),
        Segment::Wildcard { deep: true, object_only } => {
            let mut out = Vec::new();
            deep_values(value, *object_only, &mut out);
            Cow::Owned(Value::Array(out))
        }
        Segment::ArrayIndex(index) => get_index(value, *index),
        Segment::MultiIndex(indices) => Cow::Owned(Value::Array(
            indices.iter().map(|i| get_index(value, *i).into_owned()).collect(),
        )),
        Segment::Range { start, end, step } => range(value, *start, *end, *step),
        Segment::Filter(f) => filter::filter_value(ctx, f, value)?,
        function => Cow::Owned(functions::apply_function(function, value)?),
    })
}

pub(crate) fn is_size_name(name: &str) -> bool {
    name == "size" || name == "length"
}

/// Non-deep property read. Over a sequence the property is mapped across the
/// elements and collection results are spliced into the output.
pub fn get_property<'v>(value: &'v Value, name: &str, ignore_null_value: bool) -> Cow<'v, Value> {
    match value {
        Value::Object(map) => match map.get(name) {
            Some(v) if !v.is_null() => Cow::Borrowed(v),
            _ if is_size_name(name) => Cow::Owned(Value::Integer(map.len() as i64)),
            Some(v) => Cow::Borrowed(v),
            None => Cow::Owned(Value::Null),
        },
        Value::Array(items) => {
            if is_size_name(name) {
                return Cow::Owned(Value::Integer(items.len() as i64));
            }
            let mut out = Vec::new();
            for item in items {
                match get_property(item, name, ignore_null_value).into_owned() {
                    Value::Array(nested) => out.extend(nested),
                    Value::Null if ignore_null_value => {}
                    v => out.push(v),
                }
            }
            Cow::Owned(Value::Array(out))
        }
        Value::Bean(bean) => Cow::Owned(bean.accessor().get(name).unwrap_or_default()),
        Value::String(text) => match parse_embedded_object(text) {
            Some(object) => Cow::Owned(get_property(&object, name, ignore_null_value).into_owned()),
            None => Cow::Owned(Value::Null),
        },
        _ => Cow::Owned(Value::Null),
    }
}

/// A string holding JSON object text is read as that object.
pub(crate) fn parse_embedded_object(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return None;
    }
    Value::parse(trimmed).ok().filter(|v| matches!(v, Value::Object(_)))
}

/// Collect every value stored under `name` at any depth, in pre-order.
/// A match is not searched further; collection matches are flattened.
pub fn deep_scan(value: &Value, name: &str, out: &mut Vec<Value>) {
    match value {
        Value::Object(map) => {
            for (key, v) in map {
                scan_entry(key, v, name, out);
            }
        }
        Value::Array(items) => {
            for item in items.iter().filter(|item| !item.is_primitive()) {
                deep_scan(item, name, out);
            }
        }
        Value::Bean(bean) => {
            for key in bean.accessor().property_names() {
                let v = bean.accessor().get(&key).unwrap_or_default();
                scan_entry(&key, &v, name, out);
            }
        }
        _ => {}
    }
}

fn scan_entry(key: &str, v: &Value, name: &str, out: &mut Vec<Value>) {
    if key == name {
        match v {
            Value::Array(items) => out.extend(items.iter().cloned()),
            other => out.push(other.clone()),
        }
    } else if !v.is_primitive() {
        deep_scan(v, name, out);
    }
}

fn child_values(value: &Value) -> Cow<'_, Value> {
    match value {
        Value::Object(map) => Cow::Owned(Value::Array(map.values().cloned().collect())),
        Value::Array(_) => Cow::Borrowed(value),
        Value::Bean(bean) => {
            let accessor = bean.accessor();
            Cow::Owned(Value::Array(
                accessor
                    .property_names()
                    .iter()
                    .map(|name| accessor.get(name).unwrap_or_default())
                    .collect(),
            ))
        }
        _ => Cow::Owned(Value::Null),
    }
}

fn for_each_child(value: &Value, f: &mut dyn FnMut(&Value)) {
    match value {
        Value::Object(map) => map.values().for_each(|v| f(v)),
        Value::Array(items) => items.iter().for_each(|v| f(v)),
        Value::Bean(bean) => {
            for name in bean.accessor().property_names() {
                f(&bean.accessor().get(&name).unwrap_or_default());
            }
        }
        _ => {}
    }
}

/// Deep wildcard: every leaf scalar, or with `object_only` every object
/// node (sequences are walked but not collected).
fn deep_values(value: &Value, object_only: bool, out: &mut Vec<Value>) {
    for_each_child(value, &mut |child| {
        if child.is_primitive() {
            if !object_only {
                out.push(child.clone());
            }
            return;
        }
        if object_only && !matches!(child, Value::Array(_)) {
            out.push(child.clone());
        }
        deep_values(child, object_only, out);
    });
}

pub fn get_index(value: &Value, index: i64) -> Cow<'_, Value> {
    match value {
        Value::Array(items) => match clamp_index(items.len(), index) {
            Some(i) => Cow::Borrowed(&items[i]),
            None => Cow::Owned(Value::Null),
        },
        Value::Object(map) => map
            .get(&index.to_string())
            .map_or(Cow::Owned(Value::Null), Cow::Borrowed),
        Value::Bean(bean) => Cow::Owned(bean.accessor().get(&index.to_string()).unwrap_or_default()),
        Value::Null => Cow::Owned(Value::Null),
        _ if index == 0 => Cow::Borrowed(value),
        _ => Cow::Owned(Value::Null),
    }
}

/// Positions selected by an inclusive `start:end:step` slice.
pub(crate) fn range_positions(len: usize, start: i64, end: i64, step: i64) -> Option<Vec<usize>> {
    // Widened so extreme bounds and steps cannot overflow.
    let len = len as i128;
    let (start, end, step) = (start as i128, end as i128, step as i128);
    let start = if start >= 0 { start } else { start + len };
    let end = if end >= 0 { end } else { end + len };
    if (end - start) / step + 1 == -1 {
        return None;
    }
    let mut positions = Vec::new();
    let mut i = start.max(0);
    while i <= end && i < len {
        positions.push(i as usize);
        i += step;
    }
    Some(positions)
}

fn range(value: &Value, start: i64, end: i64, step: i64) -> Cow<'_, Value> {
    let Value::Array(items) = value else {
        return Cow::Owned(Value::Null);
    };
    match range_positions(items.len(), start, end, step) {
        Some(positions) => Cow::Owned(Value::Array(
            positions.into_iter().map(|i| items[i].clone()).collect(),
        )),
        None => Cow::Owned(Value::Null),
    }
}
