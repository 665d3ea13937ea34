use crate::ast::Segment;
use crate::error::Error;
use crate::runtime::utils::compare_values;
use crate::types::Value;
use rust_decimal::prelude::ToPrimitive;
use std::cmp::Ordering;

/// Size as reported by `size()`: -1 for null and scalars, element count for
/// sequences, non-null entry count for objects and beans.
pub fn size_of(value: &Value) -> i64 {
    match value {
        Value::Array(items) => items.len() as i64,
        Value::Object(map) => map.values().filter(|v| !v.is_null()).count() as i64,
        Value::Bean(bean) => bean.accessor().size() as i64,
        _ => -1,
    }
}

/// Keys of an object, or the names of a bean's non-null properties.
pub fn key_set(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Object(map) => Some(map.keys().cloned().collect()),
        Value::Bean(bean) => {
            let accessor = bean.accessor();
            Some(
                accessor
                    .property_names()
                    .into_iter()
                    .filter(|name| matches!(accessor.get(name), Some(v) if !v.is_null()))
                    .collect(),
            )
        }
        _ => None,
    }
}

pub fn apply_function(segment: &Segment, value: &Value) -> Result<Value, Error> {
    match segment {
        Segment::Size => Ok(Value::Integer(size_of(value))),
        Segment::Type => Ok(Value::from(value.type_name())),
        Segment::Floor => floor(value),
        Segment::Max => extreme(value, Ordering::Greater, "max"),
        Segment::Min => extreme(value, Ordering::Less, "min"),
        Segment::KeySet => Ok(key_set(value)
            .map(|keys| Value::Array(keys.into_iter().map(Value::String).collect()))
            .unwrap_or_default()),
        other => Err(Error::evaluation(format!("{:?} is not a path function", other))),
    }
}

fn floor(value: &Value) -> Result<Value, Error> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Array(items) => Ok(Value::Array(items.iter().map(floor_number).collect())),
        n if n.is_number() => Ok(floor_number(n)),
        other => Err(Error::evaluation(format!("floor() applied to {} value", other.type_name()))),
    }
}

// Non-numbers inside a sequence pass through unchanged.
fn floor_number(value: &Value) -> Value {
    match value {
        Value::Decimal(d) => {
            let floored = d.floor();
            floored
                .to_i64()
                .map_or(Value::Decimal(floored), Value::Integer)
        }
        Value::Float(f) => Value::Float(f.floor()),
        other => other.clone(),
    }
}

fn extreme(value: &Value, want: Ordering, name: &str) -> Result<Value, Error> {
    let items = match value {
        Value::Null => return Ok(Value::Null),
        Value::Array(items) => items,
        other => {
            return Err(Error::evaluation(format!(
                "{}() applied to {} value",
                name,
                other.type_name()
            )))
        }
    };
    let mut best: Option<&Value> = None;
    for item in items.iter().filter(|v| !v.is_null()) {
        best = match best {
            None => Some(item),
            Some(current) => match compare_values(item, current) {
                Some(ord) if ord == want => Some(item),
                Some(_) => Some(current),
                None => {
                    return Err(Error::evaluation(format!(
                        "{}() cannot compare {} with {}",
                        name,
                        item.type_name(),
                        current.type_name()
                    )))
                }
            },
        };
    }
    Ok(best.cloned().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn sizes() {
        assert_eq!(size_of(&Value::Null), -1);
        assert_eq!(size_of(&Value::from("abc")), -1);
        assert_eq!(size_of(&Value::parse(r#"{"a":1,"b":null}"#).unwrap()), 1);
        assert_eq!(size_of(&Value::parse("[null,null]").unwrap()), 2);
    }

    #[test]
    fn max_and_min() {
        let v = Value::parse("[3, null, 7.5, -1]").unwrap();
        assert_eq!(extreme(&v, Ordering::Greater, "max").unwrap(), Value::Decimal(Decimal::new(75, 1)));
        assert_eq!(extreme(&v, Ordering::Less, "min").unwrap(), Value::Integer(-1));
        let words = Value::parse(r#"["pear","apple"]"#).unwrap();
        assert_eq!(extreme(&words, Ordering::Less, "min").unwrap(), Value::from("apple"));
        let mixed = Value::parse(r#"[1,"a"]"#).unwrap();
        assert!(matches!(extreme(&mixed, Ordering::Greater, "max"), Err(Error::Evaluation(_))));
        assert_eq!(extreme(&Value::parse("[]").unwrap(), Ordering::Greater, "max").unwrap(), Value::Null);
    }

    #[test]
    fn floors() {
        assert_eq!(floor(&Value::Decimal(Decimal::new(29, 1))).unwrap(), Value::Integer(2));
        assert_eq!(floor(&Value::Decimal(Decimal::new(-21, 1))).unwrap(), Value::Integer(-3));
        assert_eq!(
            floor(&Value::parse(r#"[1.5,"x",4]"#).unwrap()).unwrap(),
            Value::parse(r#"[1,"x",4]"#).unwrap()
        );
        assert!(floor(&Value::from("x")).is_err());
    }
}
