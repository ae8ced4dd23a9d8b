//! Conformance tests against the shared fixtures in `testdata/`

use nestkey_codec::{
    pack, parse_definitions, parse_schema, ContinuationRequest, FieldGenerator, Geometry,
    PackContext, PathPrefix,
};
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../testdata")
        .join(name);
    fs::read_to_string(&path).unwrap_or_else(|err| panic!("read {}: {}", path.display(), err))
}

fn fixture_json(name: &str) -> Value {
    serde_json::from_str(&fixture(name)).expect("valid fixture JSON")
}

#[test]
fn order_fixture_packs_to_expected() {
    let schema = parse_schema(&fixture("pack/order.schema.json")).expect("parse schema");
    let store = fixture_json("pack/order.store.json");
    let expected = fixture_json("pack/order.expected.json");
    let context = PackContext::default().with_metadata("site", "example.org");

    let packed = pack(&schema, &store, &context).expect("pack");
    assert_eq!(packed, expected);

    let keys: Vec<&String> = packed.as_object().expect("object").keys().collect();
    assert_eq!(keys, vec!["id", "title", "customer", "site", "lines"]);
}

#[test]
fn order_fixture_voided_line_aborts_whole_pack() {
    let schema = parse_schema(&fixture("pack/order.schema.json")).expect("parse schema");
    let mut store = fixture_json("pack/order.store.json");
    store["order"]["lines"][1]["void"] = json!(true);

    let context = PackContext::default().with_metadata("site", "example.org");
    assert_eq!(pack(&schema, &store, &context).expect("pack"), Value::Null);
}

#[test]
fn order_fixture_without_draft_status_keeps_trailing_keys() {
    let schema = parse_schema(&fixture("pack/order.schema.json")).expect("parse schema");
    let mut store = fixture_json("pack/order.store.json");
    store["order"]["status"] = json!("paid");
    store["order"]["lines"] = json!([]);

    let packed = pack(&schema, &store, &PackContext::default()).expect("pack");
    assert_eq!(packed["status"], json!("paid"));
    assert_eq!(packed["internal"], json!("hidden when draft"));
    assert_eq!(packed["site"], Value::Null);
    assert!(packed.get("lines").is_none(), "empty iterate is suppressed");
}

#[test]
fn survey_fixture_generates_nested_repeaters() {
    let definitions =
        parse_definitions(&fixture("fields/survey.fields.json")).expect("parse definitions");
    let store = fixture_json("fields/survey.store.json");
    let context = PackContext::new(Geometry::new(32, 5).expect("geometry"))
        .with_prefix(PathPrefix::new("form").expect("prefix"));

    let generator = FieldGenerator::new(&definitions, &store, &context).expect("generator");
    let fields = generator.generate().expect("generate");

    let rendered: Vec<(&str, &Value)> = fields
        .iter()
        .map(|field| (field.name.as_str(), &field.value))
        .collect();
    assert_eq!(
        rendered,
        vec![
            ("form[title]", &json!("Lunch")),
            ("form[questions][question_count]", &json!(2)),
            ("form[questions][items][text]", &json!("Soup?")),
            ("form[questions][items][answers][label]", &json!("Yes")),
            ("form[questions][items][answers][1][label]", &json!("No")),
            ("form[questions][items][1][text]", &json!("Bread?")),
            ("form[questions][items][1][answers][label]", &Value::Null),
            ("form[questions][items][1][answers][1][label]", &Value::Null),
        ]
    );
}

#[test]
fn survey_fixture_resumes_inner_and_outer_repeaters() {
    let definitions =
        parse_definitions(&fixture("fields/survey.fields.json")).expect("parse definitions");
    let store = fixture_json("fields/survey.store.json");
    let context = PackContext::new(Geometry::new(32, 5).expect("geometry"))
        .with_prefix(PathPrefix::new("form").expect("prefix"));
    let generator = FieldGenerator::new(&definitions, &store, &context).expect("generator");

    let inner = ContinuationRequest::from_params([
        ("path", "form[questions][items][1][answers][1][label]"),
        ("previous", "2"),
        ("additional", "1"),
    ])
    .expect("request");
    let names: Vec<String> = generator
        .resume(&inner)
        .expect("resume inner")
        .into_iter()
        .map(|field| field.name)
        .collect();
    assert_eq!(names, vec!["form[questions][items][1][answers][2][label]"]);

    let outer = ContinuationRequest::new("form[questions][items][1][text]")
        .with_previous(2)
        .with_additional(1);
    let names: Vec<String> = generator
        .resume(&outer)
        .expect("resume outer")
        .into_iter()
        .map(|field| field.name)
        .collect();
    assert_eq!(
        names,
        vec![
            "form[questions][items][2][text]",
            "form[questions][items][2][answers][label]",
            "form[questions][items][2][answers][1][label]",
        ]
    );
}
