//! Masking tests - Sensitive field masking and truncation
//!
//! Validates that sensitive values never reach rendered output, that
//! masking is idempotent and that foreign or deeply nested values are
//! reduced to type tags.

use proptest::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::MaskingConfig;
use crate::serializer::{ContentSerializer, truncate};
use crate::value::{Record, Value};

fn arb_key() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("password".to_string()),
        Just("PassWord".to_string()),
        Just("apiKey".to_string()),
        Just("user_token".to_string()),
        Just("username".to_string()),
        Just("email".to_string()),
        "[a-z]{1,8}",
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::from),
    ];
    leaf.prop_recursive(4, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
            prop::collection::btree_map(arb_key(), inner.clone(), 0..4).prop_map(Value::from),
            prop::collection::vec((arb_key(), inner), 0..4).prop_map(|fields| {
                fields
                    .into_iter()
                    .fold(Record::new("app::Form"), |record, (name, value)| {
                        record.with_field(name, value)
                    })
                    .into()
            }),
        ]
    })
}

fn contains_sensitive_plaintext(value: &Value, serializer: &ContentSerializer) -> bool {
    let token = Value::from(serializer.policy().mask_token());
    match value {
        Value::List(items) => items.iter().any(|v| contains_sensitive_plaintext(v, serializer)),
        Value::Map(map) => map.iter().any(|(k, v)| {
            (serializer.policy().is_sensitive(k) && *v != token)
                || contains_sensitive_plaintext(v, serializer)
        }),
        Value::Object(record) => record.fields.iter().any(|(k, v)| {
            (serializer.policy().is_sensitive(k) && *v != token)
                || contains_sensitive_plaintext(v, serializer)
        }),
        _ => false,
    }
}

// =============================================================================
// Property-Based Tests
// =============================================================================

proptest! {
    /// Property: Masking is idempotent
    #[test]
    fn prop_masking_is_idempotent(value in arb_value()) {
        let serializer = ContentSerializer::default();
        let once = serializer.mask(&value);
        let twice = serializer.mask(&once);
        prop_assert_eq!(once, twice);
    }

    /// Property: No sensitive key keeps its original value after masking
    #[test]
    fn prop_masked_output_has_no_sensitive_plaintext(value in arb_value()) {
        let serializer = ContentSerializer::default();
        let masked = serializer.mask(&value);
        prop_assert!(!contains_sensitive_plaintext(&masked, &serializer));
    }

    /// Property: Disabled masking leaves values untouched
    #[test]
    fn prop_disabled_masking_is_identity(value in arb_value()) {
        let serializer = ContentSerializer::new(&MaskingConfig::default().with_enabled(false));
        prop_assert_eq!(serializer.mask(&value), value);
    }

    /// Property: Truncation keeps at most `max` characters plus the marker
    #[test]
    fn prop_truncation(text in "\\PC{0,40}", max in 1usize..30) {
        let out = truncate(&text, max);
        let chars = text.chars().count();
        if chars <= max {
            prop_assert_eq!(out.as_ref(), text.as_str());
        } else {
            let kept: String = text.chars().take(max).collect();
            prop_assert_eq!(out.into_owned(), format!("{kept}[TRUNCATED]"));
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[derive(Serialize)]
struct Credentials {
    username: String,
    password: String,
}

#[test]
fn test_username_password_masking() {
    let serializer = ContentSerializer::default();
    let value = Value::capture(&Credentials {
        username: "alice".to_string(),
        password: "hunter2".to_string(),
    });
    assert_eq!(
        serializer.serialize_value(&value, None, 0),
        r#"{"username":"alice","password":"***"}"#
    );
}

#[test]
fn test_truncation_example() {
    assert_eq!(truncate("abcdefgh", 5), "abcde[TRUNCATED]");
}

#[test]
fn test_map_keys_are_case_insensitive_and_patterns_apply() {
    let serializer = ContentSerializer::default();
    let map: BTreeMap<String, Value> = [
        ("PASSWORD".to_string(), Value::from("a")),
        ("userApiKey".to_string(), Value::from("b")),
        ("city".to_string(), Value::from("Oslo")),
    ]
    .into_iter()
    .collect();
    let masked = serializer.mask(&Value::from(map));
    assert_eq!(masked.get("PASSWORD"), Some(&Value::from("***")));
    assert_eq!(masked.get("userApiKey"), Some(&Value::from("***")));
    assert_eq!(masked.get("city"), Some(&Value::from("Oslo")));
}

#[test]
fn test_custom_mask_token() {
    let serializer =
        ContentSerializer::new(&MaskingConfig::default().with_mask_token("<hidden>"));
    let value: Value = Record::new("app::Login").with_field("secret", "x").into();
    assert_eq!(serializer.serialize_value(&value, None, 0), r#"{"secret":"<hidden>"}"#);
}

#[test]
fn test_foreign_types_become_tags() {
    let serializer = ContentSerializer::default();
    let masked = serializer.mask(&Value::capture(&Duration::from_secs(1)));
    let tag = masked.as_str().expect("foreign record renders as a tag");
    assert!(tag.starts_with("Duration@"), "{tag}");

    let opaque = Value::opaque(&serializer);
    let tag = serializer.mask(&opaque);
    assert!(tag.as_str().is_some_and(|t| t.starts_with("ContentSerializer@")));
}

#[test]
fn test_depth_guard_tags_deep_records() {
    let serializer = ContentSerializer::new(&MaskingConfig::default().with_max_depth(2));
    let deep: Value = Record::new("app::A")
        .with_field(
            "inner",
            Record::new("app::B").with_field("inner", Record::new("app::C").with_field("x", 1)),
        )
        .into();
    let masked = serializer.mask(&deep);
    let innermost = masked
        .get("inner")
        .and_then(|b| b.get("inner"))
        .and_then(Value::as_str)
        .expect("third level is tagged");
    assert!(innermost.starts_with("C@"), "{innermost}");
}

#[test]
fn test_masking_does_not_touch_the_original() {
    let serializer = ContentSerializer::default();
    let original: Value = Record::new("app::Login").with_field("password", "pw").into();
    let _ = serializer.mask(&original);
    assert_eq!(original.get("password"), Some(&Value::from("pw")));
}
