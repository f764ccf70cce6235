use crate::ast::Statement;
use crate::error::ErrorKind;
use crate::eval::EvalConfig;
use crate::path::{Path, Segment};
use crate::tree::{Document, Node};
use crate::validate::validate_references;
use crate::value::{Map, Value};
use crate::{parse, OmlError};

// ── Shared fixture runners ──────────────────────────────────────────

/// Embed fixture files at compile time.
const EVAL_FIXTURES: &str = include_str!("../test-data/fixtures/eval.json");
const PARSE_ERROR_FIXTURES: &str = include_str!("../test-data/fixtures/parse-errors.json");

/// Convert a serde_json::Value (fixture "expected" format) to a Value.
/// Integral JSON numbers become ints, everything else with a fraction or
/// exponent becomes a float.
fn fixture_expected_to_value(expected: &serde_json::Value) -> Value {
    match expected {
        serde_json::Value::Null => Value::None,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap()),
        },
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => {
            Value::Array(items.iter().map(fixture_expected_to_value).collect())
        }
        serde_json::Value::Object(entries) => Value::Map(
            entries
                .iter()
                .map(|(key, value)| (key.clone(), fixture_expected_to_value(value)))
                .collect(),
        ),
    }
}

fn kind_of(result: crate::Result<Value>) -> ErrorKind {
    result.expect_err("expected an error").kind()
}

#[test]
fn test_fixture_eval() {
    let fixtures: Vec<serde_json::Value> = serde_json::from_str(EVAL_FIXTURES).unwrap();

    for fixture in &fixtures {
        let name = fixture["name"].as_str().unwrap();
        let input = fixture["input"].as_str().unwrap();
        let path = fixture["path"].as_str().unwrap();

        let doc = parse(input)
            .unwrap_or_else(|err| panic!("Fixture '{}': unexpected parse error: {}", name, err));
        let result = doc.evaluate(path);

        if let Some(kind) = fixture.get("error") {
            let err = result
                .expect_err(&format!("Fixture '{}': expected an error but evaluation succeeded", name));
            assert_eq!(
                format!("{:?}", err.kind()),
                kind.as_str().unwrap(),
                "Fixture '{}': wrong error: {}",
                name,
                err
            );
        } else {
            let expected = fixture_expected_to_value(&fixture["expected"]);
            let actual = result
                .unwrap_or_else(|err| panic!("Fixture '{}': unexpected error: {}", name, err));
            assert_eq!(actual, expected, "Fixture '{}': value mismatch", name);
        }
    }
}

#[test]
fn test_fixture_parse_errors() {
    let fixtures: Vec<serde_json::Value> = serde_json::from_str(PARSE_ERROR_FIXTURES).unwrap();

    for fixture in &fixtures {
        let name = fixture["name"].as_str().unwrap();
        let input = fixture["input"].as_str().unwrap();
        let line = fixture["line"].as_u64().unwrap() as usize;

        match parse(input) {
            Err(OmlError::Syntax(err)) => {
                assert_eq!(err.begin.line, line, "Fixture '{}': wrong line ({})", name, err);
                assert!(
                    err.begin.offset <= err.end.offset,
                    "Fixture '{}': inverted span",
                    name
                );
            }
            Err(other) => panic!("Fixture '{}': expected a syntax error, got {}", name, other),
            Ok(doc) => panic!("Fixture '{}': expected a syntax error, got {:?}", name, doc),
        }
    }
}

// ── Error Position/Span Tests ───────────────────────────────────────

fn syntax_error(input: &str) -> crate::SyntaxError {
    match parse(input) {
        Err(OmlError::Syntax(err)) => err,
        other => panic!("expected a syntax error for {:?}, got {:?}", input, other),
    }
}

#[test]
fn test_error_unclosed_bracket() {
    let err = syntax_error("a = [");
    assert_eq!(err.begin.line, 0);
    assert_eq!(err.message, "Unclosed '['");
    assert!(err.begin.offset <= err.end.offset);
}

#[test]
fn test_error_span_covers_region() {
    let err = syntax_error("a = [b");
    assert_eq!(err.begin.offset, 4);
    assert_eq!(err.end.offset, 6);
    assert_eq!(err.to_string(), "0:4-0:6: Unclosed '['");
}

#[test]
fn test_error_point_display() {
    let err = syntax_error("a = 1 2");
    assert_eq!(err.begin, err.end);
    assert_eq!(err.begin.column, 6);
    assert_eq!(err.to_string(), "0:6: Expected end of line after statement");
}

#[test]
fn test_error_on_second_line() {
    let err = syntax_error("valid = 1\ninvalid = [");
    assert_eq!(err.begin.line, 1);
    assert_eq!(err.begin.column, 10);
}

#[test]
fn test_error_span_unclosed_string() {
    let err = syntax_error("x = \"unterminated\n");
    assert_eq!(err.begin.line, 0);
    assert_eq!(err.end.line, 0);
    assert!(err.begin.offset < err.end.offset);
}

#[test]
fn test_syntax_error_wraps_into_oml_error() {
    let err = parse("a = (1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);
    assert!(err.to_string().starts_with("syntax error at 0:4"));
}

#[test]
fn test_deep_nesting_is_a_syntax_error() {
    let brackets = format!("a = {}1{}", "[".repeat(1000), "]".repeat(1000));
    assert_eq!(parse(&brackets).unwrap_err().kind(), ErrorKind::Syntax);

    let parens = format!("a = {}1{}", "(".repeat(1000), ")".repeat(1000));
    assert_eq!(parse(&parens).unwrap_err().kind(), ErrorKind::Syntax);

    let negations = format!("a = {}1", "!".repeat(1000));
    assert_eq!(parse(&negations).unwrap_err().kind(), ErrorKind::Syntax);

    let maps = format!("a = {}{}", "{k: ".repeat(1000), "}".repeat(1000));
    assert_eq!(parse(&maps).unwrap_err().kind(), ErrorKind::Syntax);
}

#[test]
fn test_moderate_nesting_parses() {
    let source = format!("a = {}1{}", "[".repeat(50), "]".repeat(50));
    let doc = parse(&source).unwrap();
    let path = vec!["0"; 50].join(".");
    assert_eq!(doc.evaluate(&format!("a.{}", path)).unwrap(), Value::Int(1));
}

// ── Parser & Tree Shape ─────────────────────────────────────────────

#[test]
fn test_statements_from_parser() {
    let statements = crate::parser::parse("[a]\nx = 1\n[[b.c]]\n").unwrap();
    assert_eq!(statements.len(), 3);
    assert!(matches!(&statements[0], Statement::Table { path, .. } if path == &["a"]));
    assert!(matches!(&statements[1], Statement::Assign { key, .. } if key == &["x"]));
    assert!(matches!(&statements[2], Statement::ArrayTable { path, .. } if path == &["b", "c"]));
}

#[test]
fn test_literals_are_structural_and_expressions_deferred() {
    let doc = parse("a = -5\nb = [1, {c: 2}]\nd = 1 + 1\ne = - 2.5\n").unwrap();
    let Node::Map(entries) = doc.root() else {
        panic!("root should be a map");
    };
    assert_eq!(entries["a"], Node::Literal(Value::Int(-5)));
    assert!(matches!(&entries["b"], Node::Array(items) if matches!(items[1], Node::Map(_))));
    assert!(entries["d"].is_deferred());
    assert_eq!(entries["e"], Node::Literal(Value::Float(-2.5)));
}

#[test]
fn test_parse_is_deterministic() {
    let source = "x = 1\n[t]\ny = x + 2\nz = [1, 2]\n";
    assert_eq!(parse(source).unwrap(), parse(source).unwrap());
}

#[test]
fn test_inline_and_statement_documents_agree() {
    let inline = parse("{a: 1, b: {c: 2, d: [true]}}").unwrap();
    let statements = parse("a = 1\n[b]\nc = 2\nd = [true]\n").unwrap();
    assert_eq!(inline.evaluate("").unwrap(), statements.evaluate("").unwrap());
}

#[test]
fn test_document_from_str() {
    let doc: Document = "answer = 6 * 7".parse().unwrap();
    assert_eq!(doc.evaluate("answer").unwrap(), Value::Int(42));
}

#[test]
fn test_document_from_value() {
    let mut entries = Map::new();
    entries.insert("name".to_string(), Value::from("svc"));
    entries.insert("ports".to_string(), Value::from(vec![Value::from(80)]));
    let mut doc = Document::from_value(Value::Map(entries.clone()));

    let Node::Map(root) = doc.root() else {
        panic!("root should be a map");
    };
    assert!(root.values().all(|node| !node.is_deferred()));
    assert_eq!(root["ports"].kind(), Some(crate::ValueKind::Array));

    let path = String::from("ports.1");
    doc.set_int(&path, 443).unwrap();
    assert_eq!(doc.evaluate(&path).unwrap(), Value::Int(443));
    assert_eq!(
        Document::from_value(Value::Map(entries)).evaluate("").unwrap().array_len_at("ports").unwrap(),
        1
    );
}

#[test]
fn test_empty_source_is_an_empty_map() {
    let doc = parse("  # nothing here\n").unwrap();
    assert_eq!(doc.evaluate("").unwrap(), Value::Map(Map::new()));
    assert_eq!(doc, Document::default());
}

#[test]
fn test_string_escapes() {
    let doc = parse(r#"v = "tab\there \u00e9 \"q\" \ud83d\ude00 \/""#).unwrap();
    assert_eq!(doc.evaluate("v").unwrap(), Value::from("tab\there é \"q\" 😀 /"));
}

#[test]
fn test_raw_strings_keep_backslashes() {
    let doc = parse(r#"a = 'C:\path\n'
b = 'it\'s'"#)
    .unwrap();
    assert_eq!(doc.evaluate("a").unwrap(), Value::from(r"C:\path\n"));
    assert_eq!(doc.evaluate("b").unwrap(), Value::from(r"it\'s"));
}

#[test]
fn test_lone_surrogate_is_rejected() {
    let err = syntax_error(r#"v = "\ud83d""#);
    assert!(err.message.contains("surrogate"));
}

// ── Paths ───────────────────────────────────────────────────────────

#[test]
fn test_path_parsing() {
    let path = Path::parse("servers.0.host").unwrap();
    assert_eq!(
        path.segments(),
        &[
            Segment::Field("servers".to_string()),
            Segment::Index(0),
            Segment::Field("host".to_string()),
        ]
    );
    assert_eq!(path.to_string(), "servers.0.host");
    assert!(Path::parse("").unwrap().is_root());
    assert_eq!(Path::parse("a.10").unwrap().last(), Some(&Segment::Index(10)));
}

#[test]
fn test_path_syntax_errors() {
    for bad in ["a..b", ".a", "a.", "a.01", "a.99999999999999999999999"] {
        let err = Path::parse(bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathSyntax, "path {:?}", bad);
    }
}

#[test]
fn test_path_composition() {
    let root = Path::root();
    let a = root.field("a");
    assert_eq!(a.to_string(), "a");
    let ab0 = a.field("b").index(0);
    assert_eq!(ab0.to_string(), "a.b.0");
    assert_eq!(root.join(&ab0), ab0);
    assert_eq!(a.join(&Path::parse("b.0").unwrap()), ab0);
    assert_eq!(ab0.parent(), Some(a.field("b")));
    assert_eq!(root.parent(), None);
    assert!(ab0.starts_with(&a));
    assert!(!a.starts_with(&ab0));
    assert_eq!(ab0.len(), 3);
}

#[test]
fn test_path_lookup_matches_relative_lookup() {
    let doc = parse("{a: {b: [10, {c: \"deep\"}]}}").unwrap();
    let whole = doc.evaluate("").unwrap();
    let p = Path::parse("a.b").unwrap();
    let q = Path::parse("1.c").unwrap();
    let direct = doc.evaluate(&p.join(&q)).unwrap();
    let relative = doc.evaluate(&p).unwrap().get(&q).unwrap().clone();
    assert_eq!(direct, relative);
    assert_eq!(whole.get(&p.join(&q)).unwrap(), &direct);
}

// ── Evaluation ──────────────────────────────────────────────────────

#[test]
fn test_scenario_nested_array() {
    let doc = parse("{a: {b: [1, 2, 3]}}").unwrap();
    assert_eq!(doc.evaluate("a.b.1").unwrap(), Value::Int(2));
    let whole = doc.evaluate("").unwrap();
    assert_eq!(whole.map_keys_at("a").unwrap(), vec!["b".to_string()]);
    assert_eq!(whole.array_len_at("a.b").unwrap(), 3);
    assert_eq!(whole.map_len_at("a").unwrap(), 1);
    assert_eq!(kind_of(doc.evaluate("a.b.5")), ErrorKind::IndexOutOfRange);
    assert_eq!(whole.array_len_at("a").unwrap_err().kind(), ErrorKind::NotAnArray);
    assert_eq!(whole.map_keys_at("a.b").unwrap_err().kind(), ErrorKind::NotAMap);
}

#[test]
fn test_scenario_reference_and_cycle() {
    let doc = parse("{x: 10, y: x}").unwrap();
    assert_eq!(doc.evaluate("y").unwrap(), Value::Int(10));

    let doc = parse("{x: y, y: x}").unwrap();
    let err = doc.evaluate("x").unwrap_err();
    assert_eq!(
        err,
        OmlError::CyclicReference {
            cycle: vec!["x".to_string(), "y".to_string(), "x".to_string()],
        }
    );
    assert_eq!(err.to_string(), "cyclic reference: x -> y -> x");
}

#[test]
fn test_error_messages_name_the_location() {
    let doc = parse("{a: {b: [1, 2, 3]}}").unwrap();
    assert_eq!(
        doc.evaluate("a.c").unwrap_err().to_string(),
        "no field \"c\" in map at \"a\""
    );
    assert_eq!(
        doc.evaluate("z").unwrap_err().to_string(),
        "no field \"z\" in map at <root>"
    );
    assert_eq!(
        doc.evaluate("a.b.5").unwrap_err().to_string(),
        "index 5 out of range for array of length 3 at \"a.b\""
    );
    assert_eq!(
        doc.evaluate("a.b.x").unwrap_err().to_string(),
        "expected a map at \"a.b\", found array"
    );
}

#[test]
fn test_map_keys_follow_insertion_order() {
    let doc = parse("zeta = 1\nalpha = 2\nmid = 3\nzeta = 4\n").unwrap();
    let whole = doc.evaluate("").unwrap();
    assert_eq!(whole.map_keys_at("").unwrap(), vec!["zeta", "alpha", "mid"]);
    assert_eq!(whole.int_at("zeta").unwrap(), 4);
}

#[test]
fn test_predicates_never_fail() {
    let value = parse("{a: {b: [1, 2.5, \"s\", none, true]}}")
        .unwrap()
        .evaluate("")
        .unwrap();
    assert!(value.is_int_at("a.b.0"));
    assert!(value.is_float_at("a.b.1"));
    assert!(value.is_str_at("a.b.2"));
    assert!(value.is_none_at("a.b.3"));
    assert!(value.is_bool_at("a.b.4"));
    assert!(value.is_array_at("a.b"));
    assert!(value.is_map_at("a"));
    assert!(!value.is_int_at("a.b.1"));
    assert!(!value.is_map_at("a.b.9"));
    assert!(!value.is_str_at("no.such.path"));
    assert!(!value.is_none_at("a..b"));
}

#[test]
fn test_typed_extractors_do_not_coerce() {
    let value = parse("{n: 1, x: 1.5, s: \"hi\", b: false}")
        .unwrap()
        .evaluate("")
        .unwrap();
    assert_eq!(value.int_at("n").unwrap(), 1);
    assert_eq!(value.float_at("x").unwrap(), 1.5);
    assert_eq!(value.str_at("s").unwrap(), "hi");
    assert!(!value.bool_at("b").unwrap());

    let err = value.float_at("n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    assert_eq!(err.to_string(), "expected float at \"n\", found int");
    assert_eq!(value.str_at("b").unwrap_err().kind(), ErrorKind::TypeMismatch);
    assert_eq!(value.int_at("missing").unwrap_err().kind(), ErrorKind::NoSuchField);
}

#[test]
fn test_value_accessors() {
    let value = Value::from(vec![Value::from(1), Value::from("two")]);
    assert_eq!(value[0].as_int(), Some(1));
    assert_eq!(value[1].as_str(), Some("two"));
    assert_eq!(value[0].as_float(), None);
    assert!(value.as_map().is_none());
    assert_eq!(value.as_array().map(<[Value]>::len), Some(2));
    assert_eq!(Value::from(None::<i64>), Value::None);
}

#[test]
#[should_panic(expected = "no field \"missing\" in map")]
fn test_index_by_missing_key_panics() {
    let value = parse("{a: 1}").unwrap().evaluate("").unwrap();
    let _ = &value["missing"];
}

#[test]
#[should_panic(expected = "out of range")]
fn test_index_past_end_panics() {
    let value = Value::from(vec![Value::from(1)]);
    let _ = &value[3];
}

#[test]
fn test_value_display() {
    let value = parse("{a: [1, 2.0, none], b: {c: \"text\"}, e: {}}")
        .unwrap()
        .evaluate("")
        .unwrap();
    assert_eq!(value.to_string(), "{ a: [1, 2.0, none], b: { c: text }, e: {} }");
}

#[test]
fn test_evaluation_returns_a_snapshot() {
    let doc = parse("a = {b: 1}").unwrap();
    let mut value = doc.evaluate("a").unwrap();
    value.set_int("b", 99).unwrap();
    assert_eq!(doc.evaluate("a.b").unwrap(), Value::Int(1));
}

#[test]
fn test_shift_out_of_range() {
    let doc = parse("a = 1 << 64\nb = -(-9223372036854775807 - 1)\n").unwrap();
    assert_eq!(kind_of(doc.evaluate("a")), ErrorKind::InvalidOperation);
    assert_eq!(kind_of(doc.evaluate("b")), ErrorKind::InvalidOperation);
}

#[test]
fn test_nan_compares_false() {
    let doc = parse("n = 0.0 / 0.0\nlt = n < 1\nge = n >= 1\n").unwrap();
    assert_eq!(doc.evaluate("lt").unwrap(), Value::Bool(false));
    assert_eq!(doc.evaluate("ge").unwrap(), Value::Bool(false));
}

fn reference_chain(len: usize) -> String {
    let mut source = String::from("v0 = 0\n");
    for i in 1..len {
        source.push_str(&format!("v{} = v{} + 1\n", i, i - 1));
    }
    source
}

#[test]
fn test_depth_limit() {
    assert_eq!(EvalConfig::default().max_depth, crate::eval::DEFAULT_MAX_DEPTH);

    let doc = parse(&reference_chain(10)).unwrap();
    let shallow = EvalConfig::default().with_max_depth(3);
    assert_eq!(doc.evaluate_with("v3", &shallow).unwrap(), Value::Int(3));
    let err = doc.evaluate_with("v4", &shallow).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DepthLimitExceeded);

    let long = parse(&reference_chain(150)).unwrap();
    assert_eq!(kind_of(long.evaluate("v149")), ErrorKind::DepthLimitExceeded);
    let deep = EvalConfig::default().with_max_depth(200);
    assert_eq!(long.evaluate_with("v149", &deep).unwrap(), Value::Int(149));
}

/// `v0 = 0`, then each `vN` negates `v(N-1)` `negations` times.
fn negation_chain(len: usize, negations: usize) -> String {
    let mut source = String::from("v0 = 0\n");
    for i in 1..len {
        source.push_str(&format!("v{} = {}v{}\n", i, "- ".repeat(negations), i - 1));
    }
    source
}

#[test]
fn test_deep_expressions_across_references_hit_the_limit() {
    let doc = parse(&negation_chain(3, 200)).unwrap();
    assert_eq!(doc.evaluate("v2").unwrap(), Value::Int(0));

    let doc = parse(&negation_chain(10, 200)).unwrap();
    let err = doc.evaluate("v9").unwrap_err();
    assert_eq!(
        err,
        OmlError::DepthLimitExceeded {
            path: "\"v7\"".to_string(),
            limit: crate::eval::DEFAULT_MAX_EXPR_DEPTH,
        }
    );

    let roomy = EvalConfig::default().with_max_expr_depth(4096);
    assert_eq!(
        parse(&negation_chain(4, 200)).unwrap().evaluate_with("v3", &roomy).unwrap(),
        Value::Int(0)
    );
}

#[test]
fn test_expression_depth_budget() {
    let doc = parse("v = 1 + 2 * 3").unwrap();
    let tight = EvalConfig::default().with_max_expr_depth(2);
    assert_eq!(
        doc.evaluate_with("v", &tight).unwrap_err().kind(),
        ErrorKind::DepthLimitExceeded
    );
    let enough = EvalConfig::default().with_max_expr_depth(3);
    assert_eq!(doc.evaluate_with("v", &enough).unwrap(), Value::Int(7));
    assert_eq!(
        EvalConfig::default().max_expr_depth,
        crate::eval::DEFAULT_MAX_EXPR_DEPTH
    );
}

#[test]
fn test_digit_only_keys_need_field_segments() {
    let doc = parse("\"0\" = 1\nitems = [\"a\"]\n").unwrap();
    assert_eq!(kind_of(doc.evaluate("0")), ErrorKind::NotAnArray);

    let by_field = Path::root().field("0");
    assert_eq!(doc.evaluate(&by_field).unwrap(), Value::Int(1));
    assert_eq!(by_field.to_string(), "0");
    assert_eq!(Path::parse("0").unwrap(), Path::root().index(0));
    assert_eq!(doc.evaluate("items.0").unwrap(), Value::from("a"));
}

#[test]
fn test_document_is_shared_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Document>();
    assert_send_sync::<Value>();

    let doc = parse("base = 10\nv = base * 2\n").unwrap();
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| doc.evaluate("v").unwrap()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Value::Int(20));
        }
    });
}

// ── Mutation ────────────────────────────────────────────────────────

#[test]
fn test_set_replaces_scalar() {
    let mut doc = parse("{a: {b: 1}}").unwrap();
    doc.set("a.b", "hello").unwrap();
    assert_eq!(doc.evaluate("a.b").unwrap(), Value::from("hello"));
}

#[test]
fn test_typed_setters() {
    let mut doc = parse("{a: {}}").unwrap();
    doc.set_bool("a.flag", true).unwrap();
    doc.set_int("a.count", -3).unwrap();
    doc.set_float("a.ratio", 0.25).unwrap();
    doc.set_string("a.name", "oml").unwrap();
    doc.set_none("a.nothing").unwrap();
    let a = doc.evaluate("a").unwrap();
    assert!(a.bool_at("flag").unwrap());
    assert_eq!(a.int_at("count").unwrap(), -3);
    assert_eq!(a.float_at("ratio").unwrap(), 0.25);
    assert_eq!(a.str_at("name").unwrap(), "oml");
    assert!(a.is_none_at("nothing"));
    assert_eq!(
        a.map_keys_at("").unwrap(),
        vec!["flag", "count", "ratio", "name", "nothing"]
    );
}

#[test]
fn test_set_none_keeps_the_entry() {
    let mut doc = parse("a = 1\nb = 2\n").unwrap();
    doc.set_none("a").unwrap();
    let whole = doc.evaluate("").unwrap();
    assert_eq!(whole.map_keys_at("").unwrap(), vec!["a", "b"]);
    assert!(whole.is_none_at("a"));
}

#[test]
fn test_overwrite_keeps_key_position() {
    let mut doc = parse("a = 1\nb = 2\nc = 3\n").unwrap();
    doc.set_int("a", 10).unwrap();
    doc.set_int("d", 4).unwrap();
    let whole = doc.evaluate("").unwrap();
    assert_eq!(whole.map_keys_at("").unwrap(), vec!["a", "b", "c", "d"]);
    assert_eq!(whole.int_at("a").unwrap(), 10);
}

#[test]
fn test_set_overrides_deferred_expression() {
    let mut doc = parse("x = 1 + 1\ny = x * 2\n").unwrap();
    assert_eq!(doc.evaluate("y").unwrap(), Value::Int(4));
    doc.set_int("x", 5).unwrap();
    assert_eq!(doc.evaluate("x").unwrap(), Value::Int(5));
    assert_eq!(doc.evaluate("y").unwrap(), Value::Int(10));
}

#[test]
fn test_set_cannot_reach_inside_deferred_node() {
    let mut doc = parse("m = {a: 1} + {b: 2}").unwrap();
    let err = doc.set("m.a", 2).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Mutation);
    assert_eq!(doc.evaluate("m.a").unwrap(), Value::Int(1));
}

#[test]
fn test_set_requires_existing_parent() {
    let mut doc = parse("a = 1\nm = {}\narr = [1]\n").unwrap();
    assert_eq!(doc.set("missing.key", 1).unwrap_err().kind(), ErrorKind::NoSuchField);
    assert_eq!(doc.set("a.b", 1).unwrap_err().kind(), ErrorKind::NotAMap);
    assert_eq!(doc.set("a.0", 1).unwrap_err().kind(), ErrorKind::NotAnArray);
    assert_eq!(doc.set("m.0", 1).unwrap_err().kind(), ErrorKind::NotAnArray);
    assert_eq!(doc.set("arr.x", 1).unwrap_err().kind(), ErrorKind::NotAMap);
    assert_eq!(doc.set("a..b", 1).unwrap_err().kind(), ErrorKind::PathSyntax);
    assert_eq!(doc, parse("a = 1\nm = {}\narr = [1]\n").unwrap());
}

#[test]
fn test_array_grows_only_at_its_end() {
    let mut doc = parse("arr = [1, 2]").unwrap();
    doc.set_string("arr.0", "first").unwrap();
    doc.set_int("arr.2", 3).unwrap();
    assert_eq!(
        doc.evaluate("arr").unwrap(),
        Value::from(vec![Value::from("first"), Value::from(2), Value::from(3)])
    );
    let err = doc.set_int("arr.5", 6).unwrap_err();
    assert_eq!(
        err,
        OmlError::IndexOutOfRange {
            path: "\"arr\"".to_string(),
            index: 5,
            len: 3,
        }
    );
}

#[test]
fn test_set_structured_value_is_addressable() {
    let mut doc = Document::default();
    let mut settings = Map::new();
    settings.insert("level".to_string(), Value::from("debug"));
    settings.insert("sinks".to_string(), Value::from(vec![Value::from("stdout")]));
    doc.set("logging", settings).unwrap();
    doc.set_string("logging.sinks.1", "file").unwrap();
    assert_eq!(doc.evaluate("logging.sinks.1").unwrap(), Value::from("file"));
    assert_eq!(doc.evaluate("logging.level").unwrap(), Value::from("debug"));
}

#[test]
fn test_set_empty_path_replaces_root() {
    let mut doc = parse("a = 1").unwrap();
    doc.set("", 7).unwrap();
    assert_eq!(doc.evaluate("").unwrap(), Value::Int(7));
    assert_eq!(kind_of(doc.evaluate("a")), ErrorKind::NotAMap);
}

#[test]
fn test_value_mutation() {
    let mut value = parse("{a: {b: [1]}}").unwrap().evaluate("").unwrap();
    value.set_int("a.b.1", 2).unwrap();
    value.set_bool("a.c", true).unwrap();
    assert_eq!(value.array_len_at("a.b").unwrap(), 2);
    assert!(value.bool_at("a.c").unwrap());
    assert_eq!(value.set("a.b.x", 1).unwrap_err().kind(), ErrorKind::NotAMap);
    assert_eq!(value.set("a.z.y", 1).unwrap_err().kind(), ErrorKind::NoSuchField);
    assert_eq!(value.set("a.b.9", 1).unwrap_err().kind(), ErrorKind::IndexOutOfRange);

    value.set("", "replaced").unwrap();
    assert_eq!(value, Value::from("replaced"));
}

#[test]
fn test_mutation_isolation() {
    let mut doc = parse("{a: {b: 1}}").unwrap();
    let before = doc.evaluate("a").unwrap();
    doc.set_int("a.b", 2).unwrap();
    assert_eq!(before.int_at("b").unwrap(), 1);

    let doc_copy = doc.clone();
    doc.set_int("a.b", 3).unwrap();
    assert_eq!(doc_copy.evaluate("a.b").unwrap(), Value::Int(2));
}

// ── JSON Serialization Tests ────────────────────────────────────────

#[test]
fn test_json_compact() {
    let value = parse("{a: 1, b: [true, none], c: \"q\\\"x\\n\", d: 1.0}")
        .unwrap()
        .evaluate("")
        .unwrap();
    assert_eq!(
        value.to_json(),
        r#"{"a":1,"b":[true,null],"c":"q\"x\n","d":1.0}"#
    );
}

#[test]
fn test_json_pretty() {
    let value = parse("{a: 1, b: [], c: {}, d: [2]}").unwrap().evaluate("").unwrap();
    assert_eq!(
        value.to_json_pretty(),
        "{\n  \"a\": 1,\n  \"b\": [],\n  \"c\": {},\n  \"d\": [\n    2\n  ]\n}"
    );
}

#[test]
fn test_json_numbers() {
    assert_eq!(Value::Float(2.0).to_json(), "2.0");
    assert_eq!(Value::Float(0.1).to_json(), "0.1");
    assert_eq!(Value::Float(1e20).to_json(), "1e20");
    assert_eq!(Value::Float(f64::NAN).to_json(), "null");
    assert_eq!(Value::Float(f64::INFINITY).to_json(), "null");
    assert_eq!(Value::Int(i64::MIN).to_json(), "-9223372036854775808");
}

#[test]
fn test_json_output_parses_back() {
    let source = "title = \"t\\u0001\"\n[n]\nx = 1.5e-7\ny = [1, 2.0, none, {z: -0.0}]\n";
    let value = parse(source).unwrap().evaluate("").unwrap();
    let reparsed = parse(&value.to_json()).unwrap().evaluate("").unwrap();
    assert_eq!(reparsed, value);
    let from_serde: serde_json::Value = serde_json::from_str(&value.to_json_pretty()).unwrap();
    assert_eq!(from_serde["n"]["x"], serde_json::json!(1.5e-7));
}

// ── Reference Validation ────────────────────────────────────────────

#[test]
fn test_validate_references_reports_in_document_order() {
    let doc = parse("a = 1\nb = a + 1\nc = missing\nd = [x, 2]\n[t]\ne = c\n").unwrap();
    let errors = validate_references(&doc);
    let paths: Vec<String> = errors.iter().map(|e| e.path.to_string()).collect();
    assert_eq!(paths, vec!["c", "d.0", "t.e"]);
    assert!(errors
        .iter()
        .all(|e| e.error.kind() == ErrorKind::NoSuchField));
    assert_eq!(
        errors[0].to_string(),
        "\"c\": no field \"missing\" in map at <root>"
    );
}

#[test]
fn test_validate_references_clean_document() {
    let doc = parse("a = 1\nb = a + 1\n[t]\nc = $\"{b}\"\n").unwrap();
    assert!(validate_references(&doc).is_empty());
}

#[test]
fn test_validate_references_reports_cycles() {
    let doc = parse("ok = 1\nx = y\ny = x\n").unwrap();
    let errors = validate_references(&doc);
    assert_eq!(errors.len(), 2);
    assert!(errors
        .iter()
        .all(|e| e.error.kind() == ErrorKind::CyclicReference));
}
