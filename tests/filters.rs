use treepath::{eval, Value};

fn json(text: &str) -> Value {
    Value::parse(text).unwrap()
}

fn people() -> Value {
    json(
        r#"[
            {"name": "Ann",   "age": 31, "city": "Oslo",   "tags": ["a"], "score": 4.5},
            {"name": "bob",   "age": 17, "city": "Bergen", "tags": [],    "score": null},
            {"name": "Carla", "age": 45, "city": "oslo",   "tags": ["a", "b"]},
            {"name": "Dee",   "age": null}
        ]"#,
    )
}

fn names(path: &str) -> Vec<String> {
    let Value::Array(items) = eval(&people(), &format!("{}.name", path)).unwrap() else {
        panic!("expected a sequence for {}", path);
    };
    items
        .into_iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_integer_comparisons() {
    assert_eq!(names("$[?(@.age > 30)]"), vec!["Ann", "Carla"]);
    assert_eq!(names("$[?(@.age <= 31)]"), vec!["Ann", "bob"]);
    assert_eq!(names("$[?(@.age = 17)]"), vec!["bob"]);
    assert_eq!(names("$[?(age != 17)]"), vec!["Ann", "Carla"]);
}

#[test]
fn test_string_comparisons() {
    assert_eq!(names("$[?(@.city == 'Oslo')]"), vec!["Ann"]);
    assert_eq!(names("$[?(@.city != \"Oslo\")]"), vec!["bob", "Carla", "Dee"]);
    assert_eq!(names("$[?(@.name > 'B')]"), vec!["bob", "Carla", "Dee"]);
}

#[test]
fn test_like_and_rlike() {
    assert_eq!(names("$[?(@.name like 'C%')]"), vec!["Carla"]);
    assert_eq!(names("$[?(@.name like '%a%')]"), vec!["Carla"]);
    assert_eq!(names("$[?(@.name not like '%e%')]"), vec!["Ann", "bob", "Carla"]);
    assert_eq!(names("$[?(@.city rlike '[Oo]slo')]"), vec!["Ann", "Carla"]);
    assert_eq!(names("$[?(@.city not rlike 'O.*')]"), vec!["bob", "Carla"]);
    assert_eq!(names("$[?(@.name =~ /[a-c].*/i)]"), vec!["Ann", "bob", "Carla"]);
}

#[test]
fn test_like_doubled_percent_is_literal() {
    let root = json(r#"[{"s":"100%"},{"s":"1000"},{"s":"100% off"}]"#);
    assert_eq!(eval(&root, "$[?(@.s like '100%%')].s").unwrap(), json(r#"["100%"]"#));
    assert_eq!(eval(&root, "$[?(@.s like '100%%%')].s").unwrap(), json(r#"["100%","100% off"]"#));
    assert_eq!(
        eval(&root, "$[?(@.s not like '100%%')].s").unwrap(),
        json(r#"["1000","100% off"]"#)
    );
}

#[test]
fn test_in_lists() {
    assert_eq!(names("$[?(@.age in (17, 45))]"), vec!["bob", "Carla"]);
    assert_eq!(names("$[?(@.age nin (17, 45))]"), vec!["Ann"]);
    assert_eq!(names("$[?(@.city in ('Oslo', 'Bergen'))]"), vec!["Ann", "bob"]);
    assert_eq!(names("$[?(@.age in (null))]"), vec!["Dee"]);
    assert_eq!(names("$[?(@.age not in (null))]"), vec!["Ann", "bob", "Carla"]);
    assert_eq!(names("$[?(@.age in (31))]"), vec!["Ann"]);
}

#[test]
fn test_between() {
    assert_eq!(names("$[?(@.age between 17 and 31)]"), vec!["Ann", "bob"]);
    assert_eq!(names("$[?(@.age not between 17 and 31)]"), vec!["Carla"]);
    assert_eq!(names("$[?(@.score between 4 and 5)]"), vec!["Ann"]);
}

#[test]
fn test_existence_and_null_tests() {
    assert_eq!(names("$[?(@.score)]"), vec!["Ann"]);
    assert_eq!(names("$[?(@.score == null)]"), vec!["bob", "Carla", "Dee"]);
    assert_eq!(names("$[?(@.city != null)]"), vec!["Ann", "bob", "Carla"]);
}

#[test]
fn test_function_operands() {
    let lists = json(r#"[[1],[],[1,2]]"#);
    assert_eq!(eval(&lists, "$[?(@.size() > 0)]").unwrap(), json("[[1],[1,2]]"));
    assert_eq!(eval(&lists, "$[?(@.type() == 'array')]").unwrap(), lists);
}

#[test]
fn test_boolean_literals() {
    let root = json(r#"[{"id":1,"on":true},{"id":2,"on":false},{"id":3}]"#);
    assert_eq!(eval(&root, "$[?(@.on == true)].id").unwrap(), json("[1]"));
    assert_eq!(eval(&root, "$[?(@.on != true)].id").unwrap(), json("[2,3]"));
    assert_eq!(eval(&root, "$[?(@.on == false)].id").unwrap(), json("[2]"));
}

#[test]
fn test_grouping_chains_left_to_right() {
    assert_eq!(names("$[?(@.age > 40 || @.city == 'Oslo')]"), vec!["Ann", "Carla"]);
    assert_eq!(
        names("$[?(@.age > 16 && (@.city == 'Bergen' || @.city == 'oslo'))]"),
        vec!["bob", "Carla"]
    );
    assert_eq!(
        names("$[?(@.age < 20 || @.age > 40 && @.city == 'oslo')]"),
        vec!["Carla"]
    );
}

#[test]
fn test_reference_comparisons() {
    let root = json(r#"{"limit": 30, "home": "Oslo", "people": [{"n":"a","age":29,"city":"Oslo"},{"n":"b","age":31,"city":"Rome"}]}"#);
    assert_eq!(eval(&root, "$.people[?(@.age > $.limit)].n").unwrap(), json(r#"["b"]"#));
    assert_eq!(eval(&root, "$.people[?(@.city == $.home)].n").unwrap(), json(r#"["a"]"#));
    assert_eq!(eval(&root, "$.people[?(@.city != $.home)].n").unwrap(), json(r#"["b"]"#));
}

#[test]
fn test_filter_on_a_single_object() {
    let root = json(r#"{"cfg":{"mode":"fast"}}"#);
    assert_eq!(eval(&root, "$.cfg[?(@.mode == 'fast')]").unwrap(), json(r#"{"mode":"fast"}"#));
    assert_eq!(eval(&root, "$.cfg[?(@.mode == 'slow')]").unwrap(), Value::Null);
}
