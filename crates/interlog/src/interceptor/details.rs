//! Details line attached to every event.
//!
//! `TraceId: abc | Tags: [audit, user] | Args: [7] | ExecutionTime: 12ms`

use std::collections::BTreeSet;

use crate::serializer::truncate;

/// Accumulates the `Label: value` segments of one event.
#[derive(Debug, Default)]
pub(crate) struct Details {
    segments: Vec<String>,
}

impl Details {
    pub(crate) fn new(trace_id: &str) -> Self {
        Self {
            segments: vec![format!("TraceId: {trace_id}")],
        }
    }

    pub(crate) fn tags(mut self, tags: &BTreeSet<String>) -> Self {
        if !tags.is_empty() {
            let joined = tags.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
            self.segments.push(format!("Tags: [{joined}]"));
        }
        self
    }

    pub(crate) fn push(mut self, label: &str, value: impl std::fmt::Display) -> Self {
        self.segments.push(format!("{label}: {value}"));
        self
    }

    pub(crate) fn render(&self) -> String {
        self.segments.join(" | ")
    }
}

/// Joins details and message and applies the configured length limit.
pub(crate) fn compose(details: &str, message: &str, max_length: usize) -> String {
    let text = if details.is_empty() {
        message.to_string()
    } else if message.is_empty() {
        details.to_string()
    } else {
        format!("{details} | {message}")
    };
    truncate(&text, max_length).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_details_segments() {
        let tags = BTreeSet::from(["user".to_string(), "audit".to_string()]);
        let details = Details::new("t-1")
            .tags(&tags)
            .push("ExecutionTime", "5ms")
            .render();
        assert_eq!(details, "TraceId: t-1 | Tags: [audit, user] | ExecutionTime: 5ms");
    }

    #[test]
    fn test_empty_tags_are_omitted() {
        assert_eq!(Details::new("t").tags(&BTreeSet::new()).render(), "TraceId: t");
    }

    #[test]
    fn test_compose() {
        assert_eq!(compose("TraceId: t", "Completed: get", 0), "TraceId: t | Completed: get");
        assert_eq!(compose("", "Completed: get", 0), "Completed: get");
        assert_eq!(compose("TraceId: t", "Completed", 5), "Trace[TRUNCATED]");
    }
}
