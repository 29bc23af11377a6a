//! Dotted-path pattern matching.
//!
//! Used for global exclusions over `Class.method` names and for error kind
//! hierarchies, where `a.b` is a supertype of `a.b.c`.

/// Check if a pattern matches a dotted path.
///
/// Supports:
/// - Exact match: "UserService.get" matches "UserService.get"
/// - Wildcard suffix: "UserService.*" matches "UserService.get", "UserService.create", etc.
/// - Global wildcard: "*" matches everything
pub fn pattern_matches(pattern: &str, path: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    if let Some(prefix) = pattern.strip_suffix(".*") {
        // "UserService.*" matches "UserService" itself
        if path == prefix {
            return true;
        }
        return is_segment_prefix(prefix, path);
    }

    pattern == path
}

/// Returns true if `prefix` names a strict ancestor of `path`.
///
/// `runtime` is an ancestor of `runtime.illegal_state` but not of
/// `runtime_error` or of `runtime` itself.
pub fn is_segment_prefix(prefix: &str, path: &str) -> bool {
    !prefix.is_empty()
        && path.len() > prefix.len() + 1
        && path.starts_with(prefix)
        && path.as_bytes()[prefix.len()] == b'.'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_matches_exact() {
        assert!(pattern_matches("UserService.get", "UserService.get"));
        assert!(!pattern_matches("UserService.get", "UserService.create"));
    }

    #[test]
    fn test_pattern_matches_wildcard() {
        assert!(pattern_matches("UserService.*", "UserService.get"));
        assert!(pattern_matches("UserService.*", "UserService"));
        assert!(!pattern_matches("UserService.*", "OrderService.get"));
        assert!(!pattern_matches("UserService.*", "UserServiceImpl.get"));
    }

    #[test]
    fn test_pattern_matches_global() {
        assert!(pattern_matches("*", "anything"));
    }

    #[test]
    fn test_segment_prefix() {
        assert!(is_segment_prefix("runtime", "runtime.illegal_state"));
        assert!(is_segment_prefix("runtime", "runtime.a.b"));
        assert!(!is_segment_prefix("runtime", "runtime"));
        assert!(!is_segment_prefix("runtime", "runtime_error.x"));
        assert!(!is_segment_prefix("", "runtime"));
    }
}
