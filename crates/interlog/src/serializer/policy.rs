//! Sensitive field policy.

use dashmap::DashSet;
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

use crate::config::MaskingConfig;

/// Decides which field names are sensitive and which types are foreign.
///
/// Exact names are lowercased once at construction; custom names registered
/// later go into a concurrent set so registration never blocks readers.
#[derive(Debug)]
pub struct MaskingPolicy {
    enabled: bool,
    exact_lower: HashSet<String>,
    patterns: Vec<Regex>,
    custom_lower: DashSet<String>,
    mask_token: String,
    foreign_prefixes: Vec<String>,
    max_depth: usize,
}

impl Default for MaskingPolicy {
    fn default() -> Self {
        Self::new(&MaskingConfig::default())
    }
}

impl MaskingPolicy {
    /// Builds a policy from configuration.
    ///
    /// Patterns that fail to compile are skipped with a warning;
    /// [`MaskingConfig::validate`] reports them up front.
    pub fn new(config: &MaskingConfig) -> Self {
        let patterns = config
            .sensitive_patterns
            .iter()
            .filter_map(|pattern| {
                match RegexBuilder::new(pattern).case_insensitive(true).build() {
                    Ok(regex) => Some(regex),
                    Err(error) => {
                        tracing::warn!(pattern = %pattern, error = %error, "Skipping invalid sensitive field pattern");
                        None
                    }
                }
            })
            .collect();

        let custom_lower = DashSet::new();
        for field in &config.custom_fields {
            custom_lower.insert(field.to_lowercase());
        }

        Self {
            enabled: config.enabled,
            exact_lower: config
                .sensitive_fields
                .iter()
                .map(|s| s.to_lowercase())
                .collect(),
            patterns,
            custom_lower,
            mask_token: config.mask_token.clone(),
            foreign_prefixes: config.foreign_type_prefixes.clone(),
            max_depth: config.max_depth.max(1),
        }
    }

    /// Policy that masks nothing.
    pub fn disabled() -> Self {
        Self::new(&MaskingConfig::default().with_enabled(false))
    }

    /// Whether masking is applied.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Token that replaces sensitive values.
    pub fn mask_token(&self) -> &str {
        &self.mask_token
    }

    /// Maximum record nesting depth.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Returns true if values under `field` must be masked.
    pub fn is_sensitive(&self, field: &str) -> bool {
        let lower = field.to_lowercase();
        self.exact_lower.contains(&lower)
            || self.custom_lower.contains(&lower)
            || self.patterns.iter().any(|p| p.is_match(field))
    }

    /// Returns true if records of `type_name` must not be introspected.
    pub fn is_foreign(&self, type_name: &str) -> bool {
        self.foreign_prefixes
            .iter()
            .any(|prefix| type_name.starts_with(prefix.as_str()))
    }

    /// Adds a custom sensitive field name. Returns false if it was known.
    pub(crate) fn register_field(&self, field: &str) -> bool {
        self.custom_lower.insert(field.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_fields_are_case_insensitive() {
        let policy = MaskingPolicy::new(&MaskingConfig::empty().with_sensitive_field("Pin"));
        assert!(policy.is_sensitive("pin"));
        assert!(policy.is_sensitive("PIN"));
        assert!(!policy.is_sensitive("pinned_at"));
    }

    #[test]
    fn test_patterns_match_anywhere() {
        let policy = MaskingPolicy::default();
        assert!(policy.is_sensitive("UserPassword"));
        assert!(policy.is_sensitive("client_secret_hash"));
        assert!(policy.is_sensitive("API_KEY"));
        assert!(!policy.is_sensitive("username"));
    }

    #[test]
    fn test_foreign_prefixes() {
        let policy = MaskingPolicy::default();
        assert!(policy.is_foreign("core::time::Duration"));
        assert!(policy.is_foreign("tokio::sync::Mutex<u8>"));
        assert!(!policy.is_foreign("billing::Invoice"));
    }
}
