//! Configuration for the interceptor, the expression engine and masking.
//!
//! All configuration types implement `Default`, expose consuming `with_*`
//! builders, and derive serde traits so hosts can load them from whatever
//! format they already use. Call `validate()` after loading.
//!
//! # Example
//! ```rust,ignore
//! use interlog::{EngineConfig, InterceptorConfig, MaskingConfig};
//! use std::time::Duration;
//!
//! let config = InterceptorConfig::new()
//!     .with_engine(EngineConfig::new().with_cache_capacity(512))
//!     .with_masking(MaskingConfig::new().with_sensitive_field("pin"))
//!     .with_enabled_tag("audit")
//!     .with_exclusion("HealthService.*")
//!     .with_slow_call_threshold(Some(Duration::from_millis(250)));
//! config.validate().expect("config should be valid");
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use crate::constants::{
    DEFAULT_FOREIGN_TYPE_PREFIXES, DEFAULT_MASK_TOKEN, DEFAULT_MAX_DEPTH,
    DEFAULT_SENSITIVE_FIELDS, DEFAULT_SENSITIVE_PATTERNS, DEFAULT_SLOW_CALL_THRESHOLD_MS,
    DEFAULT_SLOW_EVALUATION_THRESHOLD_MS,
};
use crate::pattern::pattern_matches;
use crate::types::LogLevel;

/// Error type for configuration validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigValidationError {
    /// cache_capacity must be greater than 0 when set
    InvalidCacheCapacity,
    /// slow_evaluation_threshold_ms must be greater than 0 when set
    InvalidSlowEvaluationThreshold,
    /// slow_call_threshold_ms must be greater than 0 when set
    InvalidSlowCallThreshold,
    /// mask_token must not be empty
    EmptyMaskToken,
    /// max_depth must be greater than 0
    InvalidMaxDepth,
    /// A sensitive field pattern is not a valid regex
    InvalidSensitivePattern {
        /// The offending pattern.
        pattern: String,
        /// Compiler error message.
        reason: String,
    },
    /// An exclusion pattern is empty
    EmptyExclusion,
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCacheCapacity => {
                write!(f, "cache_capacity must be greater than 0")
            }
            Self::InvalidSlowEvaluationThreshold => {
                write!(f, "slow_evaluation_threshold_ms must be greater than 0")
            }
            Self::InvalidSlowCallThreshold => {
                write!(f, "slow_call_threshold_ms must be greater than 0")
            }
            Self::EmptyMaskToken => write!(f, "mask_token must not be empty"),
            Self::InvalidMaxDepth => write!(f, "max_depth must be greater than 0"),
            Self::InvalidSensitivePattern { pattern, reason } => {
                write!(f, "invalid sensitive field pattern `{}`: {}", pattern, reason)
            }
            Self::EmptyExclusion => write!(f, "exclusion patterns must not be empty"),
        }
    }
}

impl std::error::Error for ConfigValidationError {}

// =============================================================================
// EngineConfig
// =============================================================================

/// Configuration for the expression engine.
///
/// * `fail_safe` - Render diagnostics instead of returning errors. Default: true.
/// * `cache_enabled` - Memoize compiled expressions. Default: true.
/// * `cache_capacity` - Bound the cache with an LRU. Default: unbounded.
/// * `slow_evaluation_threshold_ms` - Warn when one evaluation takes longer.
///   The evaluation is never interrupted. Default: 1000 ms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Render diagnostics instead of returning errors (default: true)
    pub fail_safe: bool,
    /// Memoize compiled expressions (default: true)
    pub cache_enabled: bool,
    /// LRU capacity; `None` keeps every entry until cleared (default: None)
    pub cache_capacity: Option<usize>,
    /// Advisory slow-evaluation threshold in milliseconds (default: 1000)
    pub slow_evaluation_threshold_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fail_safe: true,
            cache_enabled: true,
            cache_capacity: None,
            slow_evaluation_threshold_ms: Some(DEFAULT_SLOW_EVALUATION_THRESHOLD_MS),
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration with fail-safe mode turned off.
    pub fn strict() -> Self {
        Self::default().with_fail_safe(false)
    }

    /// Set fail-safe mode.
    #[must_use = "This method returns a new EngineConfig and does not modify self"]
    pub fn with_fail_safe(mut self, fail_safe: bool) -> Self {
        self.fail_safe = fail_safe;
        self
    }

    /// Enable or disable the compiled-expression cache.
    #[must_use = "This method returns a new EngineConfig and does not modify self"]
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Bound the compiled-expression cache.
    #[must_use = "This method returns a new EngineConfig and does not modify self"]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    /// Set or clear the slow-evaluation warning threshold.
    #[must_use = "This method returns a new EngineConfig and does not modify self"]
    pub fn with_slow_evaluation_threshold(mut self, threshold: Option<Duration>) -> Self {
        self.slow_evaluation_threshold_ms = threshold.map(|d| d.as_millis() as u64);
        self
    }

    /// Slow-evaluation threshold as a `Duration`.
    pub fn slow_evaluation_threshold(&self) -> Option<Duration> {
        self.slow_evaluation_threshold_ms.map(Duration::from_millis)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.cache_capacity == Some(0) {
            return Err(ConfigValidationError::InvalidCacheCapacity);
        }
        if self.slow_evaluation_threshold_ms == Some(0) {
            return Err(ConfigValidationError::InvalidSlowEvaluationThreshold);
        }
        Ok(())
    }
}

// =============================================================================
// MaskingConfig
// =============================================================================

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Configuration for sensitive-field masking.
///
/// Field names are compared case-insensitively. Patterns are regexes matched
/// case-insensitively anywhere in the field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskingConfig {
    /// Whether masking is applied at all (default: true)
    pub enabled: bool,
    /// Token replacing sensitive values (default: "***")
    pub mask_token: String,
    /// Exact sensitive field names
    pub sensitive_fields: Vec<String>,
    /// Regex patterns for sensitive field names
    pub sensitive_patterns: Vec<String>,
    /// Additional application-specific field names
    pub custom_fields: Vec<String>,
    /// Type name prefixes that are rendered as type tags (default: std, tokio, ...)
    pub foreign_type_prefixes: Vec<String>,
    /// Record nesting depth rendered before falling back to type tags (default: 32)
    pub max_depth: usize,
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mask_token: DEFAULT_MASK_TOKEN.to_string(),
            sensitive_fields: owned(DEFAULT_SENSITIVE_FIELDS),
            sensitive_patterns: owned(DEFAULT_SENSITIVE_PATTERNS),
            custom_fields: Vec::new(),
            foreign_type_prefixes: owned(DEFAULT_FOREIGN_TYPE_PREFIXES),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl MaskingConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration with no default field names or patterns.
    pub fn empty() -> Self {
        Self {
            sensitive_fields: Vec::new(),
            sensitive_patterns: Vec::new(),
            ..Self::default()
        }
    }

    /// Enable or disable masking.
    #[must_use = "This method returns a new MaskingConfig and does not modify self"]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the mask token.
    #[must_use = "This method returns a new MaskingConfig and does not modify self"]
    pub fn with_mask_token(mut self, token: impl Into<String>) -> Self {
        self.mask_token = token.into();
        self
    }

    /// Add an application-specific sensitive field name.
    #[must_use = "This method returns a new MaskingConfig and does not modify self"]
    pub fn with_sensitive_field(mut self, field: impl Into<String>) -> Self {
        self.custom_fields.push(field.into());
        self
    }

    /// Add a sensitive field name pattern.
    #[must_use = "This method returns a new MaskingConfig and does not modify self"]
    pub fn with_sensitive_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.sensitive_patterns.push(pattern.into());
        self
    }

    /// Add a foreign type prefix.
    #[must_use = "This method returns a new MaskingConfig and does not modify self"]
    pub fn with_foreign_type_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.foreign_type_prefixes.push(prefix.into());
        self
    }

    /// Set the maximum record nesting depth.
    #[must_use = "This method returns a new MaskingConfig and does not modify self"]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the mask token is empty, `max_depth` is 0, or a
    /// pattern does not compile.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.mask_token.is_empty() {
            return Err(ConfigValidationError::EmptyMaskToken);
        }
        if self.max_depth == 0 {
            return Err(ConfigValidationError::InvalidMaxDepth);
        }
        for pattern in &self.sensitive_patterns {
            if let Err(e) = regex::Regex::new(pattern) {
                return Err(ConfigValidationError::InvalidSensitivePattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                });
            }
        }
        Ok(())
    }
}

// =============================================================================
// InterceptorConfig
// =============================================================================

/// Root configuration of an [`Interceptor`](crate::Interceptor).
///
/// * `enabled` - Master switch; when false calls run without any logging.
/// * `min_level` - Events below this level are dropped. Default: Trace.
/// * `enabled_tags` - When non-empty, only directives sharing a tag log.
/// * `enabled_groups` - When non-empty, only directives in these groups log.
/// * `exclusions` - `Class.method` patterns (`Svc.get`, `Svc.*`, `*`) never logged.
/// * `slow_call_threshold_ms` - Emit a warning for calls slower than this.
/// * `max_message_length` - Cut emitted text to this many characters; 0 = unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterceptorConfig {
    /// Master switch (default: true)
    pub enabled: bool,
    /// Minimum level of emitted events (default: Trace)
    pub min_level: LogLevel,
    /// Tags a directive must share at least one of, when non-empty
    pub enabled_tags: BTreeSet<String>,
    /// Groups a directive must belong to, when non-empty
    pub enabled_groups: BTreeSet<String>,
    /// `Class.method` patterns that are never logged
    pub exclusions: Vec<String>,
    /// Slow call warning threshold in milliseconds (default: 1000)
    pub slow_call_threshold_ms: Option<u64>,
    /// Maximum emitted message length in characters; 0 = unlimited (default: 0)
    pub max_message_length: usize,
    /// Expression engine configuration
    pub engine: EngineConfig,
    /// Masking configuration
    pub masking: MaskingConfig,
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_level: LogLevel::Trace,
            enabled_tags: BTreeSet::new(),
            enabled_groups: BTreeSet::new(),
            exclusions: Vec::new(),
            slow_call_threshold_ms: Some(DEFAULT_SLOW_CALL_THRESHOLD_MS),
            max_message_length: 0,
            engine: EngineConfig::default(),
            masking: MaskingConfig::default(),
        }
    }
}

impl InterceptorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable interception logging.
    #[must_use = "This method returns a new InterceptorConfig and does not modify self"]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the minimum level of emitted events.
    #[must_use = "This method returns a new InterceptorConfig and does not modify self"]
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Only log directives carrying `tag` (or another enabled tag).
    #[must_use = "This method returns a new InterceptorConfig and does not modify self"]
    pub fn with_enabled_tag(mut self, tag: impl Into<String>) -> Self {
        self.enabled_tags.insert(tag.into());
        self
    }

    /// Only log directives in `group` (or another enabled group).
    #[must_use = "This method returns a new InterceptorConfig and does not modify self"]
    pub fn with_enabled_group(mut self, group: impl Into<String>) -> Self {
        self.enabled_groups.insert(group.into());
        self
    }

    /// Never log call sites matching `pattern`.
    #[must_use = "This method returns a new InterceptorConfig and does not modify self"]
    pub fn with_exclusion(mut self, pattern: impl Into<String>) -> Self {
        self.exclusions.push(pattern.into());
        self
    }

    /// Set or clear the slow call threshold.
    #[must_use = "This method returns a new InterceptorConfig and does not modify self"]
    pub fn with_slow_call_threshold(mut self, threshold: Option<Duration>) -> Self {
        self.slow_call_threshold_ms = threshold.map(|d| d.as_millis() as u64);
        self
    }

    /// Set the maximum emitted message length.
    #[must_use = "This method returns a new InterceptorConfig and does not modify self"]
    pub fn with_max_message_length(mut self, max: usize) -> Self {
        self.max_message_length = max;
        self
    }

    /// Replace the expression engine configuration.
    #[must_use = "This method returns a new InterceptorConfig and does not modify self"]
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Replace the masking configuration.
    #[must_use = "This method returns a new InterceptorConfig and does not modify self"]
    pub fn with_masking(mut self, masking: MaskingConfig) -> Self {
        self.masking = masking;
        self
    }

    /// Slow call threshold as a `Duration`.
    pub fn slow_call_threshold(&self) -> Option<Duration> {
        self.slow_call_threshold_ms.map(Duration::from_millis)
    }

    /// Returns true if `qualified_name` matches an exclusion pattern.
    pub fn is_excluded(&self, qualified_name: &str) -> bool {
        self.exclusions
            .iter()
            .any(|pattern| pattern_matches(pattern, qualified_name))
    }

    /// Returns true if a directive with these tags and group passes the
    /// tag and group filters.
    pub fn accepts(&self, tags: &BTreeSet<String>, group: &str) -> bool {
        let tags_ok =
            self.enabled_tags.is_empty() || tags.iter().any(|t| self.enabled_tags.contains(t));
        let group_ok = self.enabled_groups.is_empty() || self.enabled_groups.contains(group);
        tags_ok && group_ok
    }

    /// Validate the configuration, including the nested engine and masking
    /// sections.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.slow_call_threshold_ms == Some(0) {
            return Err(ConfigValidationError::InvalidSlowCallThreshold);
        }
        if self.exclusions.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigValidationError::EmptyExclusion);
        }
        self.engine.validate()?;
        self.masking.validate()
    }
}
