use nexusquery::DbError;
use nexusquery::document::{Document, MAX_PATH_DEPTH, Value, parse_document_json};
use nexusquery::query::{Order, parse_sort, sort_documents, sort_values};

fn doc(json: &str) -> Document {
    parse_document_json(json).unwrap()
}

fn ids(docs: &[Document]) -> Vec<String> {
    docs.iter().map(|d| d.get("_id").map(ToString::to_string).unwrap_or_default()).collect()
}

#[test]
fn multi_key_sort_with_mixed_directions() {
    let mut docs = vec![
        doc(r#"{"_id": 1, "a": 2, "b": "x"}"#),
        doc(r#"{"_id": 2, "a": 1, "b": "y"}"#),
        doc(r#"{"_id": 3, "a": 2, "b": "z"}"#),
        doc(r#"{"_id": 4, "a": 1, "b": "a"}"#),
    ];
    let keys = parse_sort(&doc(r#"{"a": 1, "b": -1}"#), 32, MAX_PATH_DEPTH).unwrap();
    sort_documents(&mut docs, &keys);
    assert_eq!(ids(&docs), ["2", "4", "3", "1"]);
}

#[test]
fn ties_keep_input_order() {
    let mut docs: Vec<Document> = (0..6).map(|i| doc(&format!(r#"{{"_id": {i}, "k": {}}}"#, i % 2))).collect();
    let keys = parse_sort(&doc(r#"{"k": 1}"#), 32, MAX_PATH_DEPTH).unwrap();
    sort_documents(&mut docs, &keys);
    assert_eq!(ids(&docs), ["0", "2", "4", "1", "3", "5"]);
}

#[test]
fn nested_paths_and_missing_fields() {
    let mut docs = vec![
        doc(r#"{"_id": 1, "a": {"b": 3}}"#),
        doc(r#"{"_id": 2}"#),
        doc(r#"{"_id": 3, "a": {"b": null}}"#),
        doc(r#"{"_id": 4, "a": {"b": 1}}"#),
    ];
    let keys = parse_sort(&doc(r#"{"a.b": 1}"#), 32, MAX_PATH_DEPTH).unwrap();
    sort_documents(&mut docs, &keys);
    // Missing and null tie, so they keep their relative order.
    assert_eq!(ids(&docs), ["2", "3", "4", "1"]);
}

#[test]
fn arrays_sort_by_extreme_element() {
    let mut docs = vec![
        doc(r#"{"_id": 1, "v": [5, 1]}"#),
        doc(r#"{"_id": 2, "v": 3}"#),
        doc(r#"{"_id": 3, "v": []}"#),
        doc(r#"{"_id": 4, "v": [2, 9]}"#),
    ];
    let asc = parse_sort(&doc(r#"{"v": 1}"#), 32, MAX_PATH_DEPTH).unwrap();
    sort_documents(&mut docs, &asc);
    assert_eq!(ids(&docs), ["3", "1", "4", "2"]);
    let desc = parse_sort(&doc(r#"{"v": -1}"#), 32, MAX_PATH_DEPTH).unwrap();
    sort_documents(&mut docs, &desc);
    assert_eq!(ids(&docs), ["4", "1", "2", "3"]);
}

#[test]
fn sort_spec_validation() {
    let too_many = doc(r#"{"a": 1, "b": 1, "c": 1}"#);
    assert!(matches!(parse_sort(&too_many, 2, MAX_PATH_DEPTH), Err(DbError::SortKeyLimitExceeded { count: 3, max: 2 })));
    assert!(matches!(parse_sort(&doc(r#"{"a": 0}"#), 32, MAX_PATH_DEPTH), Err(DbError::BadValue { .. })));
    assert!(matches!(parse_sort(&doc(r#"{"a": "asc"}"#), 32, MAX_PATH_DEPTH), Err(DbError::BadValue { .. })));
    assert!(matches!(parse_sort(&doc(r#"{"$a": 1}"#), 32, MAX_PATH_DEPTH), Err(DbError::BadValue { .. })));
    assert!(matches!(parse_sort(&doc(r#"{"": 1}"#), 32, MAX_PATH_DEPTH), Err(DbError::BadValue { .. })));
    assert!(parse_sort(&doc(r#"{"a": 1.0, "b": -1}"#), 32, MAX_PATH_DEPTH).is_ok());
}

#[test]
fn dollar_only_rejected_at_segment_start() {
    let keys = parse_sort(&doc(r#"{"price$usd": 1, "a.b$": -1}"#), 32, MAX_PATH_DEPTH).unwrap();
    assert_eq!(keys[0].path.to_string(), "price$usd");
    assert_eq!(keys[1].order, Order::Desc);
    assert!(matches!(parse_sort(&doc(r#"{"a.$b": 1}"#), 32, MAX_PATH_DEPTH), Err(DbError::BadValue { .. })));
}

#[test]
fn bare_values_sort_by_type_then_value() {
    let mut vals = vec![
        Value::String("b".into()),
        Value::Int32(2),
        Value::Null,
        Value::Double(1.5),
        Value::Bool(true),
        Value::String("a".into()),
    ];
    sort_values(&mut vals, Order::Asc);
    let shown: Vec<String> = vals.iter().map(ToString::to_string).collect();
    assert_eq!(shown, ["null", "1.5", "2", "\"a\"", "\"b\"", "true"]);
}
