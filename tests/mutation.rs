use proptest::prelude::*;
use std::collections::BTreeMap;
use treepath::{array_add, contains, eval, remove, set, BeanRef, Error, Map, RecordAccessor, Value};

fn json(text: &str) -> Value {
    Value::parse(text).unwrap()
}

#[test]
fn test_set_creates_missing_path() {
    let mut root = json("{}");
    assert!(set(&mut root, "$.a.b", 1).unwrap());
    assert_eq!(root, json(r#"{"a":{"b":1}}"#));
    assert!(set(&mut root, "$.list[2]", "x").unwrap());
    assert_eq!(root, json(r#"{"a":{"b":1},"list":[null,null,"x"]}"#));
}

#[test]
fn test_set_overwrites_and_fans_out() {
    let mut root = json(r#"{"items":[{"n":1},{"n":2},{"n":3}]}"#);
    assert!(set(&mut root, "$.items[*].seen", true).unwrap());
    assert_eq!(eval(&root, "$.items.seen").unwrap(), json("[true,true,true]"));
    assert!(set(&mut root, "$.items[1:2].n", 0).unwrap());
    assert_eq!(eval(&root, "$.items.n").unwrap(), json("[1,0,0]"));
    assert!(set(&mut root, "$.items[?(@.n == 0)].zero", true).unwrap());
    assert_eq!(eval(&root, "$.items[?(@.zero)].n").unwrap(), json("[0,0]"));
}

#[test]
fn test_set_deep_replaces_every_match() {
    let mut root = json(r#"{"id":1,"a":{"id":2,"b":[{"id":3}]}}"#);
    assert!(set(&mut root, "$..id", 0).unwrap());
    assert_eq!(eval(&root, "$..id").unwrap(), json("[0,0,0]"));
}

#[test]
fn test_set_edge_cases() {
    let mut null = Value::Null;
    assert!(!set(&mut null, "$.a", 1).unwrap());
    let mut root = json(r#"{"s":"text","l":[1]}"#);
    assert!(matches!(set(&mut root, "$", 1), Err(Error::Mutation(_))));
    assert!(matches!(set(&mut root, "$.s.x", 1), Err(Error::Mutation(_))));
    assert!(!set(&mut root, "$.l[-5]", 1).unwrap());
    assert!(set(&mut root, "$.l[-1]", 9).unwrap());
    assert_eq!(eval(&root, "$.l").unwrap(), json("[9]"));
}

#[test]
fn test_set_refuses_unbounded_padding() {
    let mut root = json(r#"{"l":[]}"#);
    assert!(matches!(set(&mut root, "$.l[9223372036854775807]", 1), Err(Error::Mutation(_))));
    assert!(matches!(set(&mut root, "$.l[4000000000]", 1), Err(Error::Mutation(_))));
    assert!(matches!(set(&mut root, "$.l[4000000000].x", 1), Err(Error::Mutation(_))));
    assert_eq!(root, json(r#"{"l":[]}"#));
    assert!(set(&mut root, "$.l[3]", 1).unwrap());
    assert_eq!(root, json(r#"{"l":[null,null,null,1]}"#));
}

#[test]
fn test_remove_last_element() {
    let mut root = json("[10,20,30]");
    assert!(remove(&mut root, "$[-1]").unwrap());
    assert_eq!(root, json("[10,20]"));
    assert!(!remove(&mut root, "$[7]").unwrap());
}

#[test]
fn test_remove_properties_and_filters() {
    let mut root = json(r#"{"a":1,"b":null,"items":[{"n":1},{"n":2},{"n":3}]}"#);
    assert!(remove(&mut root, "$.a").unwrap());
    assert!(!remove(&mut root, "$.b").unwrap());
    assert!(!remove(&mut root, "$.missing").unwrap());
    assert!(remove(&mut root, "$.items[?(@.n >= 2)]").unwrap());
    assert_eq!(root, json(r#"{"items":[{"n":1}]}"#));
}

#[test]
fn test_remove_reports_unmatched_filters() {
    let mut root = json(r#"[{"n":1}]"#);
    assert!(!remove(&mut root, "$[?(@.n > 100)]").unwrap());
    assert_eq!(root, json(r#"[{"n":1}]"#));

    let mut root = json(r#"{"items":[{"n":1}]}"#);
    assert!(!remove(&mut root, "$.items[?(@.n > 100)]").unwrap());
    assert_eq!(root, json(r#"{"items":[{"n":1}]}"#));

    let mut root = json(r#"[{"items":[{"n":1}]},{"items":{"n":2}}]"#);
    assert!(!remove(&mut root, "$.items[?(@.n > 100)]").unwrap());
    assert!(remove(&mut root, "$.items[?(@.n == 2)]").unwrap());
    assert_eq!(root, json(r#"[{"items":[{"n":1}]}]"#));
}

#[test]
fn test_remove_deep_and_wildcard() {
    let mut root = json(r#"{"secret":1,"a":{"secret":2,"keep":[{"secret":3,"x":1}]}}"#);
    assert!(remove(&mut root, "$..secret").unwrap());
    assert_eq!(root, json(r#"{"a":{"keep":[{"x":1}]}}"#));
    assert!(remove(&mut root, "$.a.keep[*]").unwrap());
    assert_eq!(root, json(r#"{"a":{"keep":[]}}"#));
}

#[test]
fn test_array_add() {
    let mut root = json(r#"{"l":[1],"nested":[{"l":[]},{"l":[0]}]}"#);
    array_add(&mut root, "$.l", &[Value::Integer(2), Value::Integer(3)]).unwrap();
    assert_eq!(eval(&root, "$.l").unwrap(), json("[1,2,3]"));
    array_add(&mut root, "$.nested[*].l", &[Value::from("x")]).unwrap();
    assert_eq!(eval(&root, "$.nested[1].l").unwrap(), json(r#"[0,"x"]"#));
    assert!(matches!(
        array_add(&mut root, "$.nope", &[Value::Integer(1)]),
        Err(Error::Mutation(_))
    ));
    assert!(matches!(
        array_add(&mut root, "$.nested[0]", &[Value::Integer(1)]),
        Err(Error::Mutation(_))
    ));
}

#[test]
fn test_mutation_through_beans() {
    let open = BeanRef::new(RecordAccessor::new(Map::new()));
    let fixed = BeanRef::new(RecordAccessor::with_schema(["name"]));
    let mut fields = Map::new();
    fields.insert("open".to_string(), Value::Bean(open.clone()));
    fields.insert("fixed".to_string(), Value::Bean(fixed.clone()));
    let mut root = Value::Object(fields);

    assert!(set(&mut root, "$.open.meta.k", 1).unwrap());
    assert_eq!(open.accessor().get("meta"), Some(json(r#"{"k":1}"#)));
    assert!(set(&mut root, "$.fixed.name", "n").unwrap());
    assert_eq!(fixed.accessor().get("name"), Some(Value::from("n")));
    assert!(matches!(set(&mut root, "$.fixed.other", 1), Err(Error::Mutation(_))));

    assert!(remove(&mut root, "$.fixed.name").unwrap());
    assert_eq!(fixed.accessor().get("name"), Some(Value::Null));
    assert!(remove(&mut root, "$.open.meta").unwrap());
    assert_eq!(open.accessor().get("meta"), None);
}

#[derive(Debug, Clone)]
enum Step {
    Name(String),
    Index(usize),
}

fn path_text(steps: &[Step]) -> String {
    let mut text = String::from("$");
    for step in steps {
        match step {
            Step::Name(name) => {
                text.push('.');
                text.push_str(name);
            }
            Step::Index(i) => text.push_str(&format!("[{}]", i)),
        }
    }
    text
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof!["[a-e]{1,3}".prop_map(Step::Name), (0usize..4).prop_map(Step::Index)]
}

proptest! {
    #[test]
    fn prop_set_then_eval(steps in prop::collection::vec(step_strategy(), 1..6), v in any::<i64>()) {
        let path = path_text(&steps);
        let mut root = json("{}");
        prop_assert!(set(&mut root, &path, v).unwrap());
        prop_assert_eq!(eval(&root, &path).unwrap(), Value::Integer(v));
    }

    #[test]
    fn prop_remove_then_not_contains(
        top in prop::collection::btree_map("[a-e]", 0i64..100, 0..5),
        inner in prop::collection::btree_map("[a-e]", 0i64..100, 0..5),
        key in "[a-e]",
        nested in any::<bool>(),
    ) {
        let to_object = |m: &BTreeMap<String, i64>| {
            Value::Object(m.iter().map(|(k, v)| (k.clone(), Value::Integer(*v))).collect())
        };
        let mut fields = match to_object(&top) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        fields.insert("n".to_string(), to_object(&inner));
        let mut root = Value::Object(fields);
        let path = if nested { format!("$.n.{}", key) } else { format!("$.{}", key) };

        let existed = contains(&root, &path).unwrap();
        let removed = remove(&mut root, &path).unwrap();
        prop_assert_eq!(removed, existed);
        if removed {
            prop_assert!(!contains(&root, &path).unwrap());
        }
    }

    #[test]
    fn prop_eval_is_repeatable(steps in prop::collection::vec(step_strategy(), 1..4)) {
        let root = json(r#"{"a":[{"b":1},{"c":[2,3]}],"b":{"a":{"c":4}},"c":[[5],[6,7]]}"#);
        let path = path_text(&steps);
        prop_assert_eq!(eval(&root, &path).unwrap(), eval(&root, &path).unwrap());
    }
}
