//! Tests for the payload guard

use super::*;
use proptest::prelude::*;
use serde_json::json;

#[test]
fn test_check_size_boundary() {
    let raw = RawResponse::new(200, vec![b'x'; 100]);
    assert!(check_size(&raw, 100));
    assert!(check_size(&raw, 101));
    assert!(!check_size(&raw, 99));
}

#[test]
fn test_check_size_rejects_truncated_read() {
    let mut raw = RawResponse::new(200, vec![b'x'; 10]);
    raw.truncated = true;
    assert!(!check_size(&raw, 1_000));
}

#[test]
fn test_parse_payload() {
    let raw = RawResponse::new(200, r#"{"data":[{"sku":"A"}]}"#);
    assert_eq!(parse_payload(&raw).unwrap(), json!({"data": [{"sku": "A"}]}));

    let raw = RawResponse::new(200, "{\"data\": [");
    assert!(parse_payload(&raw).is_err());

    let raw = RawResponse::new(200, "<html>busy</html>");
    assert!(parse_payload(&raw).is_err());
}

#[test]
fn test_check_depth_examples() {
    assert!(check_depth(&json!(42), 0));
    assert!(check_depth(&json!({"a": 1}), 1));
    assert!(!check_depth(&json!({"a": 1}), 0));

    let typical = json!({"data": [{"sku": "A", "quantity": 3}]});
    assert_eq!(nesting_depth(&typical), 3);
    assert!(check_depth(&typical, 5));
    assert!(check_depth(&typical, 3));
    assert!(!check_depth(&typical, 2));
}

#[test]
fn test_check_depth_counts_empty_containers() {
    assert_eq!(nesting_depth(&json!([])), 1);
    assert_eq!(nesting_depth(&json!({"a": {}})), 2);
    assert!(!check_depth(&json!([[[[[[]]]]]]), 5));
    assert!(check_depth(&json!([[[[[]]]]]), 5));
}

#[test]
fn test_check_depth_looks_at_every_branch() {
    let value = json!({
        "data": [
            {"sku": "A"},
            {"sku": "B", "meta": {"a": {"b": {"c": 1}}}}
        ]
    });
    assert_eq!(nesting_depth(&value), 6);
    assert!(!check_depth(&value, 5));
}

#[test]
fn test_json_shape() {
    let obj = json!({"k": 1});
    assert!(matches!(JsonShape::of(&obj), JsonShape::Object(m) if m.len() == 1));
    let arr = json!([1, 2]);
    assert!(matches!(JsonShape::of(&arr), JsonShape::Array(items) if items.len() == 2));
    assert_eq!(JsonShape::of(&json!(null)), JsonShape::Scalar);
    assert_eq!(JsonShape::of(&json!("s")), JsonShape::Scalar);
}

/// Wrap a scalar in `depth` containers, alternating object and array per
/// `choices`, with shallower siblings at each level.
fn nested(depth: usize, choices: &[bool]) -> Value {
    let mut value = json!("leaf");
    for level in 0..depth {
        let as_object = choices.get(level).copied().unwrap_or(true);
        value = if as_object {
            json!({"inner": value, "flat": level})
        } else {
            json!([level, value, "x"])
        };
    }
    value
}

fn arbitrary_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z]{0,8}".prop_map(Value::String),
    ];
    leaf.prop_recursive(8, 64, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn depth_check_matches_constructed_depth(
        depth in 0usize..12,
        max_depth in 0usize..10,
        choices in prop::collection::vec(any::<bool>(), 12),
    ) {
        let value = nested(depth, &choices);
        prop_assert_eq!(nesting_depth(&value), depth);
        prop_assert_eq!(check_depth(&value, max_depth), depth <= max_depth);
    }

    #[test]
    fn depth_check_agrees_with_measured_depth(
        value in arbitrary_json(),
        max_depth in 0usize..10,
    ) {
        prop_assert_eq!(check_depth(&value, max_depth), nesting_depth(&value) <= max_depth);
    }
}
