use crate::types::Value;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::cmp::Ordering;

/// Resolve a possibly negative index against `len`.
pub fn clamp_index(len: usize, idx: i64) -> Option<usize> {
    if idx >= 0 {
        let i = usize::try_from(idx).ok()?;
        if i < len {
            Some(i)
        } else {
            None
        }
    } else {
        let neg = usize::try_from(idx.unsigned_abs()).ok()?;
        if neg <= len {
            Some(len - neg)
        } else {
            None
        }
    }
}

pub fn as_decimal(v: &Value) -> Option<Decimal> {
    match v {
        Value::Integer(i) => Some(Decimal::from(*i)),
        Value::Decimal(d) => Some(*d),
        Value::Float(f) => Decimal::from_f64(*f),
        _ => None,
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Integer(i) => Some(*i as f64),
        Value::Decimal(d) => d.to_f64(),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

/// Integers compare as `i64`; anything involving a decimal compares exactly
/// in the decimal domain, falling back to `f64` only outside its range.
pub fn compare_numbers(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Some(x.cmp(y)),
        _ => match (as_decimal(a), as_decimal(b)) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => as_f64(a)?.partial_cmp(&as_f64(b)?),
        },
    }
}

/// Ordering used by `max()`/`min()` and reference comparisons.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Boolean(x), Value::Boolean(y)) => Some(x.cmp(y)),
        _ if a.is_number() && b.is_number() => compare_numbers(a, b),
        _ => None,
    }
}

/// Structural equality where `1`, `1.0` and `1.00` are the same number and
/// object key order does not matter.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(ax), Value::Array(ay)) => {
            ax.len() == ay.len() && ax.iter().zip(ay.iter()).all(|(u, v)| values_equal(u, v))
        }
        (Value::Object(mx), Value::Object(my)) => {
            mx.len() == my.len()
                && mx
                    .iter()
                    .all(|(k, v)| my.get(k).is_some_and(|other| values_equal(v, other)))
        }
        (Value::Bean(x), Value::Bean(y)) => x == y,
        _ if a.is_number() && b.is_number() => compare_numbers(a, b) == Some(Ordering::Equal),
        _ => false,
    }
}
