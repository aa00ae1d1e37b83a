use nexusquery::DbError;
use nexusquery::document::{Document, Value, parse_document_json};
use nexusquery::query::{FilterTree, filter_matches, match_arrays, match_documents, matches};

fn doc(json: &str) -> Document {
    parse_document_json(json).unwrap()
}

fn m(d: &str, f: &str) -> bool {
    filter_matches(&doc(d), &doc(f)).unwrap()
}

#[test]
fn array_operand_matches_whole_array_or_nested_element() {
    let filter = r#"{"a": [1, 2]}"#;
    assert!(m(r#"{"a": [[1, 2], [3, 4]]}"#, filter));
    assert!(m(r#"{"a": [1, 2]}"#, filter));
    assert!(!m(r#"{"a": [1, 2, 3]}"#, filter));
    assert!(!m(r#"{"a": [2, 1]}"#, filter));

    let ints = |xs: &[i32]| xs.iter().map(|&x| Value::Int32(x)).collect::<Vec<_>>();
    assert!(match_arrays(&ints(&[1, 2]), &[Value::Array(ints(&[1, 2])), Value::Array(ints(&[3, 4]))]));
    assert!(!match_arrays(&ints(&[1, 2]), &ints(&[1, 2, 3])));
}

#[test]
fn embedded_documents_ignore_key_order() {
    assert!(match_documents(&doc(r#"{"x": 1, "y": "a"}"#), &doc(r#"{"y": "a", "x": 1}"#)));
    assert!(!match_documents(&doc(r#"{"x": 1}"#), &doc(r#"{"x": 1, "y": 2}"#)));
    assert!(m(r#"{"e": {"x": 1, "y": 2}}"#, r#"{"e": {"y": 2, "x": 1}}"#));
    assert!(!m(r#"{"e": {"x": 1, "y": 2}}"#, r#"{"e": {"x": 1}}"#));
}

#[test]
fn scalar_equality_is_numeric() {
    assert!(m(r#"{"n": 1}"#, r#"{"n": 1.0}"#));
    assert!(m(r#"{"n": 4000000000}"#, r#"{"n": 4000000000.0}"#));
    assert!(m(r#"{"n": [5, 6]}"#, r#"{"n": 6}"#));
    assert!(!m(r#"{"n": "1"}"#, r#"{"n": 1}"#));
}

#[test]
fn null_matches_missing_field() {
    assert!(m(r#"{"a": 1}"#, r#"{"b": null}"#));
    assert!(m(r#"{"b": null}"#, r#"{"b": null}"#));
    assert!(!m(r#"{"b": 0}"#, r#"{"b": null}"#));
    assert!(!m(r#"{"a": 1}"#, r#"{"b": {"$ne": null}}"#));
}

#[test]
fn dotted_paths_fan_out_over_arrays() {
    let d = r#"{"items": [{"sku": "a", "qty": 1}, {"sku": "b", "qty": 5}]}"#;
    assert!(m(d, r#"{"items.sku": "b"}"#));
    assert!(m(d, r#"{"items.qty": {"$gt": 4}}"#));
    assert!(m(d, r#"{"items.1.sku": "b"}"#));
    assert!(!m(d, r#"{"items.0.sku": "b"}"#));
}

#[test]
fn range_operators_skip_other_types() {
    assert!(m(r#"{"v": 5}"#, r#"{"v": {"$gt": 4, "$lte": 5}}"#));
    assert!(!m(r#"{"v": "9"}"#, r#"{"v": {"$gt": 4}}"#));
    assert!(m(r#"{"v": "b"}"#, r#"{"v": {"$gte": "a"}}"#));
    assert!(m(r#"{"v": [1, 10]}"#, r#"{"v": {"$gt": 5}}"#));
}

#[test]
fn set_membership_operators() {
    assert!(m(r#"{"t": "x"}"#, r#"{"t": {"$in": ["x", "y"]}}"#));
    assert!(!m(r#"{"t": "z"}"#, r#"{"t": {"$in": ["x", "y"]}}"#));
    assert!(m(r#"{"t": "z"}"#, r#"{"t": {"$nin": ["x", "y"]}}"#));
    assert!(m(r#"{}"#, r#"{"t": {"$in": [null]}}"#));
    assert!(m(r#"{"tags": ["a", "b", "c"]}"#, r#"{"tags": {"$all": ["c", "a"]}}"#));
    assert!(!m(r#"{"tags": ["a", "b"]}"#, r#"{"tags": {"$all": ["c", "a"]}}"#));
    assert!(!m(r#"{"tags": ["a"]}"#, r#"{"tags": {"$all": []}}"#));
}

#[test]
fn exists_and_size() {
    assert!(m(r#"{"a": null}"#, r#"{"a": {"$exists": true}}"#));
    assert!(m(r#"{}"#, r#"{"a": {"$exists": false}}"#));
    assert!(m(r#"{"a": [1, 2, 3]}"#, r#"{"a": {"$size": 3}}"#));
    assert!(!m(r#"{"a": 3}"#, r#"{"a": {"$size": 3}}"#));
}

#[test]
fn logical_operators() {
    let d = r#"{"a": 1, "b": 2}"#;
    assert!(m(d, r#"{"$or": [{"a": 5}, {"b": 2}]}"#));
    assert!(!m(d, r#"{"$and": [{"a": 1}, {"b": 3}]}"#));
    assert!(m(d, r#"{"$nor": [{"a": 5}, {"b": 3}]}"#));
    assert!(m(d, r#"{"a": {"$not": {"$gt": 3}}}"#));
    assert!(!m(d, r#"{"a": {"$not": {"$lt": 3}}}"#));
    assert!(m(r#"{}"#, r#"{"a": {"$not": {"$gt": 3}}}"#));
}

#[test]
fn elem_match_requires_one_element_to_satisfy_all() {
    let d = r#"{"scores": [2, 9], "rows": [{"k": "a", "v": 1}, {"k": "b", "v": 7}]}"#;
    assert!(!m(d, r#"{"scores": {"$elemMatch": {"$gt": 3, "$lt": 8}}}"#));
    assert!(m(d, r#"{"scores": {"$elemMatch": {"$gt": 1, "$lt": 3}}}"#));
    assert!(m(d, r#"{"rows": {"$elemMatch": {"k": "b", "v": {"$gt": 5}}}}"#));
    assert!(!m(d, r#"{"rows": {"$elemMatch": {"k": "a", "v": {"$gt": 5}}}}"#));
}

#[test]
fn type_operator() {
    let d = r#"{"n": 1, "x": 1.5, "s": "a", "arr": ["a", 2], "nested": [[1]], "nil": null}"#;
    assert!(m(d, r#"{"n": {"$type": "int"}}"#));
    assert!(!m(d, r#"{"n": {"$type": "long"}}"#));
    assert!(m(d, r#"{"x": {"$type": 1}}"#));
    assert!(m(d, r#"{"x": {"$type": "number"}}"#));
    assert!(m(d, r#"{"s": {"$type": ["bool", "string"]}}"#));
    assert!(m(d, r#"{"arr": {"$type": "array"}}"#));
    assert!(m(d, r#"{"arr": {"$type": "int"}}"#));
    assert!(!m(d, r#"{"nested": {"$type": "int"}}"#));
    assert!(m(d, r#"{"nil": {"$type": "null"}}"#));
    assert!(!m(d, r#"{"missing": {"$type": "null"}}"#));
    assert!(m(d, r#"{"s": {"$not": {"$type": "int"}}}"#));
}

#[test]
fn mod_operator() {
    let d = r#"{"n": 10, "f": 10.9, "arr": [1, 7], "s": "10"}"#;
    assert!(m(d, r#"{"n": {"$mod": [4, 2]}}"#));
    assert!(!m(d, r#"{"n": {"$mod": [4, 1]}}"#));
    assert!(m(d, r#"{"f": {"$mod": [4, 2]}}"#));
    assert!(m(d, r#"{"n": {"$mod": [-3, 1]}}"#));
    assert!(m(d, r#"{"arr": {"$mod": [3, 1]}}"#));
    assert!(!m(d, r#"{"arr": {"$mod": [5, 3]}}"#));
    assert!(!m(d, r#"{"s": {"$mod": [4, 2]}}"#));
    assert!(!m(d, r#"{"missing": {"$mod": [4, 0]}}"#));
}

#[test]
fn bit_operators() {
    // 54 = 0b110110
    let d = r#"{"n": 54, "neg": -1, "f": 54.5, "arr": [1, 6]}"#;
    assert!(m(d, r#"{"n": {"$bitsAllSet": [1, 2]}}"#));
    assert!(m(d, r#"{"n": {"$bitsAllSet": 6}}"#));
    assert!(!m(d, r#"{"n": {"$bitsAllSet": 7}}"#));
    assert!(m(d, r#"{"n": {"$bitsAllClear": [0, 3]}}"#));
    assert!(m(d, r#"{"n": {"$bitsAnySet": [0, 1]}}"#));
    assert!(!m(d, r#"{"n": {"$bitsAnySet": 9}}"#));
    assert!(m(d, r#"{"n": {"$bitsAnyClear": 7}}"#));
    assert!(!m(d, r#"{"n": {"$bitsAnyClear": 6}}"#));
    assert!(m(d, r#"{"neg": {"$bitsAllSet": [0, 63, 100]}}"#));
    assert!(!m(d, r#"{"f": {"$bitsAnySet": 2}}"#));
    assert!(m(d, r#"{"arr": {"$bitsAllSet": 6}}"#));
    assert!(!m(d, r#"{"arr": {"$bitsAllSet": 7}}"#));
}

#[test]
fn regex_operator() {
    let d = r#"{"name": "Ada Lovelace", "tags": ["rust", "Go"], "n": 5}"#;
    assert!(m(d, r#"{"name": {"$regex": "^Ada"}}"#));
    assert!(!m(d, r#"{"name": {"$regex": "^ada"}}"#));
    assert!(m(d, r#"{"name": {"$regex": "^ada", "$options": "i"}}"#));
    assert!(m(d, r#"{"tags": {"$regex": "^go$", "$options": "i"}}"#));
    assert!(!m(d, r#"{"n": {"$regex": "5"}}"#));
    assert!(m(d, r#"{"name": {"$not": {"$regex": "^Bob"}}}"#));
    assert!(m(d, r#"{"tags": {"$elemMatch": {"$regex": "st$"}}}"#));
}

#[test]
fn compile_errors() {
    let compile = |json: &str| FilterTree::compile(&doc(json));
    assert!(matches!(compile(r#"{"a": {"$geoWithin": {}}}"#), Err(DbError::NotImplemented { .. })));
    assert!(matches!(compile(r#"{"a": {"$mod": [3]}}"#), Err(DbError::BadValue { .. })));
    assert!(matches!(compile(r#"{"a": {"$regex": 1}}"#), Err(DbError::BadValue { .. })));
    assert!(matches!(compile(r#"{"$or": {"a": 1}}"#), Err(DbError::BadValue { .. })));
    assert!(matches!(compile(r#"{"a": {"$nin": "x"}}"#), Err(DbError::BadValue { .. })));
    assert!(matches!(compile(r#"{"a..b": 1}"#), Err(DbError::BadValue { .. })));
}

#[test]
fn compiled_tree_is_reusable() {
    let tree = FilterTree::compile(&doc(r#"{"k": {"$gte": 2}}"#)).unwrap();
    let hits = (0..5).map(|i| doc(&format!(r#"{{"k": {i}}}"#))).filter(|d| matches(d, &tree)).count();
    assert_eq!(hits, 3);
}
