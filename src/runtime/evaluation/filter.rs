use crate::ast::{Filter, Logic, Operand, Operator};
use crate::error::Error;
use crate::runtime::utils::{compare_numbers, values_equal};
use crate::types::Value;
use std::borrow::Cow;
use std::cmp::Ordering;

use super::core::{eval_segments, get_property, EvalContext};
use super::functions::size_of;

/// Apply a filter segment. Sequences keep their matching items; any other
/// value is kept if it matches itself.
pub fn filter_value<'v>(
    ctx: &EvalContext<'_>,
    filter: &Filter,
    value: &'v Value,
) -> Result<Cow<'v, Value>, Error> {
    match value {
        Value::Null => Ok(Cow::Owned(Value::Null)),
        Value::Array(items) => {
            let mut out = Vec::new();
            for item in items {
                if matches(ctx, filter, item)? {
                    out.push(item.clone());
                }
            }
            Ok(Cow::Owned(Value::Array(out)))
        }
        _ if matches(ctx, filter, value)? => Ok(Cow::Borrowed(value)),
        _ => Ok(Cow::Owned(Value::Null)),
    }
}

/// Test one item against a filter.
pub fn matches(ctx: &EvalContext<'_>, filter: &Filter, item: &Value) -> Result<bool, Error> {
    let result = match filter {
        Filter::NotNull(operand) => !operand_value(ctx, operand, item).is_null(),
        Filter::Null(operand) => operand_value(ctx, operand, item).is_null(),
        Filter::Int { operand, op, value } => {
            let v = operand_value(ctx, operand, item);
            numeric_holds(*op, &v, &Value::Integer(*value))
        }
        Filter::Decimal { operand, op, value } => {
            let v = operand_value(ctx, operand, item);
            numeric_holds(*op, &v, &Value::Decimal(*value))
        }
        Filter::Str { operand, op, value } => {
            let v = operand_value(ctx, operand, item);
            match op {
                Operator::Eq => v.as_str() == Some(value.as_str()),
                Operator::Ne => v.as_str() != Some(value.as_str()),
                _ => v
                    .scalar_text()
                    .is_some_and(|text| holds(*op, text.as_str().cmp(value.as_str()))),
            }
        }
        Filter::Bool { operand, value, equal } => {
            let v = operand_value(ctx, operand, item);
            (v.as_bool() == Some(*value)) == *equal
        }
        Filter::Like { operand, pattern, not } => {
            let v = operand_value(ctx, operand, item);
            if v.is_null() {
                return Ok(false);
            }
            match v.scalar_text() {
                Some(text) => pattern.matches(&text) != *not,
                None => *not,
            }
        }
        Filter::Rlike { operand, pattern, not } => {
            let v = operand_value(ctx, operand, item);
            if v.is_null() {
                return Ok(false);
            }
            match v.scalar_text() {
                Some(text) => pattern.is_match(&text) != *not,
                None => {
                    return Err(Error::evaluation(format!(
                        "rlike applied to {} value",
                        v.type_name()
                    )))
                }
            }
        }
        Filter::RegMatch { operand, pattern } => match operand_value(ctx, operand, item).as_ref() {
            Value::Null => false,
            Value::String(text) => pattern.is_match(text),
            other => {
                return Err(Error::evaluation(format!(
                    "'=~' applied to {} value",
                    other.type_name()
                )))
            }
        },
        Filter::IntIn { operand, values, not } => {
            let v = operand_value(ctx, operand, item);
            match v.as_ref() {
                Value::Null => false,
                n if n.is_number() => {
                    values.iter().any(|x| number_eq(n, *x)) != *not
                }
                _ => *not,
            }
        }
        Filter::StrIn { operand, values, not } => {
            let v = operand_value(ctx, operand, item);
            values.iter().any(|x| v.as_str() == Some(x.as_str())) != *not
        }
        Filter::NullableIntIn { operand, values, not } => {
            let v = operand_value(ctx, operand, item);
            match v.as_ref() {
                Value::Null => values.contains(&None) != *not,
                n if n.is_number() => values.iter().flatten().any(|x| number_eq(n, *x)) != *not,
                _ => *not,
            }
        }
        Filter::Between { operand, low, high, not } => {
            let v = operand_value(ctx, operand, item);
            match v.as_ref() {
                Value::Null => false,
                n if n.is_number() => {
                    let inside = compare_numbers(n, low).is_some_and(|o| o != Ordering::Less)
                        && compare_numbers(n, high).is_some_and(|o| o != Ordering::Greater);
                    inside != *not
                }
                _ => *not,
            }
        }
        Filter::Ref { operand, op, path } => {
            let v = operand_value(ctx, operand, item);
            if v.is_null() {
                return Ok(false);
            }
            let ref_ctx = EvalContext {
                root: ctx.root,
                ignore_null_value: path.ignore_null_value(),
            };
            let reference = eval_segments(&ref_ctx, path.segments(), ctx.root)?;
            reference_holds(*op, &v, &reference)
        }
        Filter::Group { left, right, logic } => match logic {
            Logic::And => matches(ctx, left, item)? && matches(ctx, right, item)?,
            Logic::Or => matches(ctx, left, item)? || matches(ctx, right, item)?,
        },
    };
    Ok(result)
}

fn operand_value<'v>(ctx: &EvalContext<'_>, operand: &Operand, item: &'v Value) -> Cow<'v, Value> {
    match operand {
        Operand::Property { name, .. } => get_property(item, name, ctx.ignore_null_value),
        Operand::Size => Cow::Owned(Value::Integer(size_of(item))),
        Operand::Type => Cow::Owned(Value::from(item.type_name())),
    }
}

fn holds(op: Operator, ord: Ordering) -> bool {
    match op {
        Operator::Eq => ord == Ordering::Equal,
        Operator::Ne => ord != Ordering::Equal,
        Operator::Gt => ord == Ordering::Greater,
        Operator::Ge => ord != Ordering::Less,
        Operator::Lt => ord == Ordering::Less,
        Operator::Le => ord != Ordering::Greater,
        _ => false,
    }
}

// Non-numbers never satisfy a numeric literal comparison, `!=` included.
fn numeric_holds(op: Operator, v: &Value, literal: &Value) -> bool {
    v.is_number() && compare_numbers(v, literal).is_some_and(|ord| holds(op, ord))
}

fn number_eq(v: &Value, x: i64) -> bool {
    compare_numbers(v, &Value::Integer(x)) == Some(Ordering::Equal)
}

fn reference_holds(op: Operator, v: &Value, reference: &Value) -> bool {
    match op {
        Operator::Eq => values_equal(v, reference),
        Operator::Ne => !values_equal(v, reference),
        _ => {
            let ord = match (v, reference) {
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ if v.is_number() && reference.is_number() => compare_numbers(v, reference),
                _ => None,
            };
            ord.is_some_and(|ord| holds(op, ord))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::runtime::evaluation::eval;

    fn run(text: &str, json: &str) -> Result<Value, Error> {
        let path = parse(text, true)?;
        eval(&path, &Value::parse(json)?)
    }

    #[test]
    fn scalar_target_matches_itself() {
        let json = r#"{"a":{"n":5}}"#;
        assert_eq!(run("$.a[?(@.n > 1)]", json).unwrap(), Value::parse(r#"{"n":5}"#).unwrap());
        assert_eq!(run("$.a[?(@.n > 9)]", json).unwrap(), Value::Null);
    }

    #[test]
    fn int_comparison_ignores_non_numbers() {
        let json = r#"[{"n":"5"},{"n":5},{"n":5.0},{}]"#;
        assert_eq!(run("$[?(@.n == 5)]", json).unwrap(), Value::parse(r#"[{"n":5},{"n":5.0}]"#).unwrap());
        assert_eq!(run("$[?(@.n != 5)]", json).unwrap(), Value::parse("[]").unwrap());
    }

    #[test]
    fn regex_rejects_containers() {
        let err = run("$[?(@.n =~ /a/)]", r#"[{"n":[1]}]"#).unwrap_err();
        assert!(matches!(err, Error::Evaluation(_)));
        let err = run("$[?(@.n rlike 'a')]", r#"[{"n":{"x":1}}]"#).unwrap_err();
        assert!(matches!(err, Error::Evaluation(_)));
        assert_eq!(run("$[?(@.n =~ /a/)]", r#"[{"m":1}]"#).unwrap(), Value::parse("[]").unwrap());
    }

    #[test]
    fn null_handling_in_lists() {
        let json = r#"[{"n":1},{"n":null},{"n":3}]"#;
        assert_eq!(
            run("$[?(@.n in (1, null))]", json).unwrap(),
            Value::parse(r#"[{"n":1},{"n":null}]"#).unwrap()
        );
        assert_eq!(
            run("$[?(@.n nin ('a','b'))]", json).unwrap(),
            Value::parse(json).unwrap()
        );
        assert_eq!(run("$[?(@.n in (1, 3))]", json).unwrap(), Value::parse(r#"[{"n":1},{"n":3}]"#).unwrap());
    }
}
