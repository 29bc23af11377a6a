//! Masking content serializer.
//!
//! [`ContentSerializer`] turns captured arguments and results into log text:
//! sensitive values are masked, foreign and opaque values are reduced to type
//! tags, the masked graph is rendered by a named formatter and the output is
//! truncated.
//!
//! # Example
//!
//! ```rust,ignore
//! use interlog::{ContentSerializer, MaskingConfig, Record, Value};
//!
//! let serializer = ContentSerializer::new(&MaskingConfig::default());
//! let user: Value = Record::new("app::User")
//!     .with_field("username", "alice")
//!     .with_field("password", "hunter2")
//!     .into();
//! assert_eq!(
//!     serializer.serialize_value(&user, None, 0),
//!     r#"{"username":"alice","password":"***"}"#
//! );
//! ```

mod format;
mod masker;
mod policy;

pub use format::{ArgumentFormatter, FormatterRegistry, JsonFormatter, KeyValueFormatter, truncate};
pub use masker::Masker;
pub use policy::MaskingPolicy;

use std::collections::BTreeSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::config::MaskingConfig;
use crate::constants::EXCLUDED_PLACEHOLDER;
use crate::lifecycle::{log_cache_cleared, log_sensitive_fields_registered};
use crate::types::CallSite;
use crate::value::Value;

/// Masks, formats and truncates argument and result payloads.
#[derive(Debug)]
pub struct ContentSerializer {
    masker: Masker,
    formatters: FormatterRegistry,
}

impl Default for ContentSerializer {
    fn default() -> Self {
        Self::new(&MaskingConfig::default())
    }
}

impl ContentSerializer {
    /// Creates a serializer from masking configuration.
    pub fn new(config: &MaskingConfig) -> Self {
        Self::with_policy(MaskingPolicy::new(config))
    }

    /// Creates a serializer around an existing policy.
    pub fn with_policy(policy: MaskingPolicy) -> Self {
        Self {
            masker: Masker::new(policy),
            formatters: FormatterRegistry::new(),
        }
    }

    /// The masking policy in use.
    pub fn policy(&self) -> &MaskingPolicy {
        self.masker.policy()
    }

    /// The formatter registry.
    pub fn formatters(&self) -> &FormatterRegistry {
        &self.formatters
    }

    /// Registers an additional formatter by its name.
    pub fn register_formatter(&self, formatter: impl ArgumentFormatter + 'static) {
        self.formatters.register(formatter);
    }

    /// Returns a masked copy of `value`.
    ///
    /// A panic while masking degrades to the value's type tag.
    pub fn mask(&self, value: &Value) -> Value {
        catch_unwind(AssertUnwindSafe(|| self.masker.mask(value))).unwrap_or_else(|_| {
            tracing::warn!(type_name = %value.type_label(), "Masking panicked, using type tag");
            Value::String(value.type_tag())
        })
    }

    /// Masks and formats a single value, typically a call result.
    ///
    /// `max_length` of 0 means unlimited.
    pub fn serialize_value(&self, value: &Value, formatter: Option<&str>, max_length: usize) -> String {
        let formatter = self.formatters.get(formatter);
        let masked = self.mask(value);
        let text = catch_unwind(AssertUnwindSafe(|| formatter.format_value(&masked)))
            .unwrap_or_else(|_| {
                tracing::warn!(formatter = %formatter.name(), "Formatter panicked, using type tag");
                value.type_tag()
            });
        truncate(&text, max_length).into_owned()
    }

    /// Masks and formats the argument list of a call.
    ///
    /// Arguments whose index is in `excluded` render as `[excluded]`;
    /// parameters the call site marks as ignored render as
    /// `[ignored:<reason>]`. Exclusion wins when both apply.
    pub fn serialize_args(
        &self,
        site: &CallSite,
        args: &[Value],
        excluded: &BTreeSet<usize>,
        formatter: Option<&str>,
        max_length: usize,
    ) -> String {
        let formatter = self.formatters.get(formatter);
        let prepared: Vec<Value> = args
            .iter()
            .enumerate()
            .map(|(index, arg)| {
                if excluded.contains(&index) {
                    Value::from(EXCLUDED_PLACEHOLDER)
                } else if let Some(reason) = site.ignore_reason(index) {
                    Value::String(format!("[ignored:{reason}]"))
                } else {
                    self.mask(arg)
                }
            })
            .collect();
        let text = catch_unwind(AssertUnwindSafe(|| formatter.format_args(&prepared)))
            .unwrap_or_else(|_| {
                tracing::warn!(formatter = %formatter.name(), site = %site, "Formatter panicked, using type tag");
                Value::List(Vec::new()).type_tag()
            });
        truncate(&text, max_length).into_owned()
    }

    /// Registers one custom sensitive field name.
    pub fn register_sensitive_field(&self, field: &str) {
        self.register_sensitive_fields([field]);
    }

    /// Registers custom sensitive field names; blank names are ignored.
    pub fn register_sensitive_fields<I, S>(&self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut count = 0;
        for field in fields {
            let field = field.as_ref().trim();
            if field.is_empty() {
                continue;
            }
            self.masker.register_sensitive_field(field);
            count += 1;
        }
        log_sensitive_fields_registered(count);
    }

    /// Number of cached per-type field plans.
    pub fn field_plan_count(&self) -> usize {
        self.masker.plan_count()
    }

    /// Drops the cached field plans.
    pub fn clear_caches(&self) {
        let dropped = self.masker.clear_plans();
        log_cache_cleared("field_plans", dropped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Record;

    fn user() -> Value {
        Record::new("app::User")
            .with_field("username", "alice")
            .with_field("password", "hunter2")
            .into()
    }

    #[test]
    fn test_serialize_value_masks_record_fields() {
        let serializer = ContentSerializer::default();
        assert_eq!(
            serializer.serialize_value(&user(), None, 0),
            r#"{"username":"alice","password":"***"}"#
        );
    }

    #[test]
    fn test_serialize_args_placeholders() {
        let serializer = ContentSerializer::default();
        let site = CallSite::new("Auth", "login").with_ignored_param(1, "secret");
        let args = vec![Value::from("alice"), Value::from("pw"), Value::from(3)];
        let excluded = BTreeSet::from([2]);
        assert_eq!(
            serializer.serialize_args(&site, &args, &excluded, None, 0),
            r#"["alice","[ignored:secret]","[excluded]"]"#
        );
        assert_eq!(
            serializer.serialize_args(&site, &args, &BTreeSet::new(), Some("key-value"), 0),
            "arg0=alice&arg1=[ignored:secret]&arg2=3"
        );
    }

    #[test]
    fn test_registered_field_is_masked_and_plans_reset() {
        let serializer = ContentSerializer::new(&MaskingConfig::empty());
        let value: Value = Record::new("app::Card").with_field("pin", "1234").into();
        assert_eq!(serializer.serialize_value(&value, None, 0), r#"{"pin":"1234"}"#);
        assert_eq!(serializer.field_plan_count(), 1);

        serializer.register_sensitive_fields(["PIN", " "]);
        assert_eq!(serializer.field_plan_count(), 0);
        assert_eq!(serializer.serialize_value(&value, None, 0), r#"{"pin":"***"}"#);
    }

    #[test]
    fn test_serialize_value_truncates() {
        let serializer = ContentSerializer::default();
        let text = serializer.serialize_value(&Value::from("abcdefgh"), None, 5);
        assert_eq!(text, "\"abcd[TRUNCATED]");
    }
}
