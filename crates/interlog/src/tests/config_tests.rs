//! Configuration tests - Defaults, builders and validation
//!
//! Tests that configuration defaults are sensible and validation rejects
//! values the runtime cannot work with.

use proptest::prelude::*;
use std::time::Duration;

use crate::config::{ConfigValidationError, EngineConfig, InterceptorConfig, MaskingConfig};
use crate::types::LogLevel;

// =============================================================================
// Property-Based Tests
// =============================================================================

proptest! {
    /// Property: Builder pattern preserves validity
    #[test]
    fn prop_builder_pattern_preserves_validity(
        capacity in 1usize..10_000,
        slow_ms in 1u64..60_000,
        max_len in 0usize..10_000,
        depth in 1usize..64,
        fail_safe in any::<bool>(),
    ) {
        let config = InterceptorConfig::new()
            .with_min_level(LogLevel::Debug)
            .with_slow_call_threshold(Some(Duration::from_millis(slow_ms)))
            .with_max_message_length(max_len)
            .with_engine(
                EngineConfig::new()
                    .with_fail_safe(fail_safe)
                    .with_cache_capacity(capacity),
            )
            .with_masking(MaskingConfig::new().with_max_depth(depth));

        prop_assert!(config.validate().is_ok());
        prop_assert_eq!(config.slow_call_threshold(), Some(Duration::from_millis(slow_ms)));
        prop_assert_eq!(config.engine.cache_capacity, Some(capacity));
    }

    /// Property: Exclusion patterns match their own site and wildcard children
    #[test]
    fn prop_exclusions(class in "[A-Z][a-z]{1,8}", method in "[a-z]{1,8}") {
        let site = format!("{class}.{method}");
        let exact = InterceptorConfig::new().with_exclusion(site.clone());
        let wildcard = InterceptorConfig::new().with_exclusion(format!("{class}.*"));
        let everything = InterceptorConfig::new().with_exclusion("*");

        prop_assert!(exact.is_excluded(&site));
        prop_assert!(wildcard.is_excluded(&site));
        prop_assert!(everything.is_excluded(&site));
        let sibling = format!("{class}x.{method}");
        prop_assert!(!wildcard.is_excluded(&sibling));
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn test_defaults_are_valid() {
    let config = InterceptorConfig::default();
    assert!(config.validate().is_ok());
    assert!(config.enabled);
    assert_eq!(config.min_level, LogLevel::Trace);
    assert_eq!(config.slow_call_threshold(), Some(Duration::from_millis(1000)));
    assert_eq!(config.max_message_length, 0);
    assert!(config.engine.fail_safe);
    assert!(config.engine.cache_enabled);
    assert_eq!(config.masking.mask_token, "***");
}

#[test]
fn test_invalid_values_rejected() {
    let cases = [
        (
            InterceptorConfig::new().with_engine(EngineConfig::new().with_cache_capacity(0)),
            ConfigValidationError::InvalidCacheCapacity,
        ),
        (
            InterceptorConfig::new().with_slow_call_threshold(Some(Duration::ZERO)),
            ConfigValidationError::InvalidSlowCallThreshold,
        ),
        (
            InterceptorConfig::new().with_masking(MaskingConfig::new().with_mask_token("")),
            ConfigValidationError::EmptyMaskToken,
        ),
        (
            InterceptorConfig::new().with_masking(MaskingConfig::new().with_max_depth(0)),
            ConfigValidationError::InvalidMaxDepth,
        ),
        (
            InterceptorConfig::new().with_exclusion("  "),
            ConfigValidationError::EmptyExclusion,
        ),
    ];
    for (config, expected) in cases {
        assert_eq!(config.validate(), Err(expected));
    }

    let bad_pattern = MaskingConfig::new().with_sensitive_pattern("(unclosed");
    assert!(matches!(
        bad_pattern.validate(),
        Err(ConfigValidationError::InvalidSensitivePattern { .. })
    ));
}

#[test]
fn test_tag_and_group_filters() {
    let config = InterceptorConfig::new()
        .with_enabled_tag("audit")
        .with_enabled_group("billing");
    let audit = ["audit".to_string()].into_iter().collect();
    let none = Default::default();

    assert!(config.accepts(&audit, "billing"));
    assert!(!config.accepts(&audit, "default"));
    assert!(!config.accepts(&none, "billing"));
    assert!(InterceptorConfig::new().accepts(&none, "default"));
}

#[test]
fn test_partial_config_deserializes_with_defaults() {
    let config: InterceptorConfig = serde_json::from_str(
        r#"{"min_level":"warn","exclusions":["Health.*"],"engine":{"fail_safe":false}}"#,
    )
    .unwrap();
    assert_eq!(config.min_level, LogLevel::Warn);
    assert_eq!(config.exclusions, vec!["Health.*".to_string()]);
    assert!(!config.engine.fail_safe);
    assert!(config.engine.cache_enabled);
    assert_eq!(config.masking, MaskingConfig::default());
}

#[test]
fn test_error_display() {
    assert_eq!(
        ConfigValidationError::EmptyMaskToken.to_string(),
        "mask_token must not be empty"
    );
}
