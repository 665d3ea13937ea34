use treepath::{compile, compile_with, eval, extract, read, CompileOptions, Error, JsonCursor, Value};

const DOC: &str = r#"
{
  "id": "order-7",
  "customer": {"name": "Lee", "address": {"city": "Lima", "zip": null}},
  "lines": [
    {"sku": "A1", "qty": 2, "price": 9.5, "tags": ["new"]},
    {"sku": "B2", "qty": 1, "price": 120},
    {"sku": "C3", "qty": 5, "price": 0.25, "tags": ["sale", "bulk"], "meta": {"sku": "inner"}}
  ],
  "notes": "{\"priority\": \"high\"}",
  "total": 140.25
}
"#;

fn both(text: &str) -> (Result<Value, Error>, Result<Value, Error>) {
    let path = compile(text).unwrap();
    let streamed = extract(&path, &mut JsonCursor::new(DOC));
    let evaluated = eval(&Value::parse(DOC).unwrap(), text);
    (streamed, evaluated)
}

#[test]
fn test_stream_matches_tree_evaluation() {
    let paths = [
        "$.id",
        "$.customer.name",
        "$.customer.address.city",
        "$.customer.address.zip",
        "$.customer.phone",
        "$.lines[0].sku",
        "$.lines[2].tags[1]",
        "$.lines[-1].sku",
        "$.lines[5].sku",
        "$.lines.sku",
        "$.lines.tags",
        "$.lines.meta.sku",
        "$.lines[*].qty",
        "$.lines[0,2].sku",
        "$.lines[1:2].sku",
        "$.lines[?(@.qty > 1)].sku",
        "$..sku",
        "$..tags[0]",
        "$..city",
        "$.notes.priority",
        "$.lines.size()",
        "$.lines.price.max()",
        "$.customer.keySet()",
        "$.lines[?(@.price > $.lines[0].price)].sku",
        "$",
        "*",
    ];
    for path in paths {
        let (streamed, evaluated) = both(path);
        assert_eq!(streamed.unwrap(), evaluated.unwrap(), "path {}", path);
    }
}

#[test]
fn test_stream_honours_keep_nulls() {
    let keep = compile_with("$.lines.tags", CompileOptions { ignore_null_value: false }).unwrap();
    let streamed = keep.extract(DOC).unwrap();
    assert_eq!(streamed, eval_keep(&keep));
    assert_eq!(
        streamed,
        Value::parse(r#"["new",null,"sale","bulk"]"#).unwrap()
    );
}

fn eval_keep(path: &treepath::CompiledPath) -> Value {
    path.eval(&Value::parse(DOC).unwrap()).unwrap()
}

#[test]
fn test_read_convenience() {
    assert_eq!(read(DOC, "$.lines[1].price").unwrap(), Value::Integer(120));
    assert_eq!(read(DOC, "$.total").unwrap(), Value::parse("140.25").unwrap());
    assert!(matches!(read(DOC, "$.["), Err(Error::Syntax { .. })));
}

#[test]
fn test_malformed_stream_is_a_json_error() {
    assert!(matches!(read(r#"{"a": [1, 2"#, "$.a[1]"), Ok(Value::Integer(2))));
    assert!(matches!(read(r#"{"a": [1, 2"#, "$.a"), Err(Error::Json(_))));
    assert!(matches!(read(r#"{"a" 1}"#, "$.b"), Err(Error::Json(_))));
}
