use crate::lexer::is_ident_byte;
use crate::types::Value;
use indexmap::IndexMap;
use std::collections::HashSet;

/// Map every non-null node of `root` to a path that addresses it, in
/// pre-order: `/` for the root, then `/key` and `/seq/0` style paths.
/// A bean reachable twice is listed once.
pub fn paths_of(root: &Value) -> IndexMap<String, Value> {
    let mut out = IndexMap::new();
    let mut seen = HashSet::new();
    collect(root, "/", &mut out, &mut seen);
    out
}

fn collect(value: &Value, path: &str, out: &mut IndexMap<String, Value>, seen: &mut HashSet<usize>) {
    if value.is_null() {
        return;
    }
    if let Value::Bean(bean) = value {
        if !seen.insert(bean.addr()) {
            return;
        }
    }
    out.insert(path.to_string(), value.clone());

    let prefix = if path == "/" { "" } else { path };
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                collect(child, &format!("{}/{}", prefix, escape_key(key)), out, seen);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                collect(child, &format!("{}/{}", prefix, i), out, seen);
            }
        }
        Value::Bean(bean) => {
            let accessor = bean.accessor();
            for key in accessor.property_names() {
                let child = accessor.get(&key).unwrap_or_default();
                collect(&child, &format!("{}/{}", prefix, escape_key(&key)), out, seen);
            }
        }
        _ => {}
    }
}

/// Escape a key so it reads back as the same property name.
pub(crate) fn escape_key(key: &str) -> String {
    let canonical_int = !key.is_empty()
        && key.bytes().all(|b| b.is_ascii_digit())
        && (key == "0" || !key.starts_with('0'));
    if canonical_int {
        return key.to_string();
    }
    let mut escaped = String::with_capacity(key.len());
    for (i, ch) in key.char_indices() {
        let plain = if ch.is_ascii() {
            is_ident_byte(ch as u8) && !(i == 0 && ch.is_ascii_digit())
        } else {
            true
        };
        if !plain {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
