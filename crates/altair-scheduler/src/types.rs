use altair_core::Pod;
use std::fmt;

/// Scheduling context for one attempt, passed to predicates and scorers
#[derive(Debug, Clone)]
pub struct SchedulingContext {
    /// Pod being scheduled
    pub pod: Pod,
}

impl SchedulingContext {
    /// Create a new scheduling context
    pub fn new(pod: Pod) -> Self {
        Self { pod }
    }
}

/// Result of filtering a node
#[derive(Debug, Clone)]
pub struct FilterResult {
    /// Node name
    pub node_name: String,
    /// Whether the node passed the filter
    pub passed: bool,
    /// Reason for failure (if any)
    pub reason: Option<String>,
}

impl FilterResult {
    /// Create a passing filter result
    pub fn pass(node_name: String) -> Self {
        Self {
            node_name,
            passed: true,
            reason: None,
        }
    }

    /// Create a failing filter result
    pub fn fail(node_name: String, reason: String) -> Self {
        Self {
            node_name,
            passed: false,
            reason: Some(reason),
        }
    }
}

/// Progress of a scheduling attempt across the pipeline stages.
/// Used in logs; there is no retry or rollback between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Pending,
    Filtering,
    Filtered,
    Scoring,
    Scored,
    Binding,
    Bound,
    FilterFailed,
    BindFailed,
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "Pending",
            Self::Filtering => "Filtering",
            Self::Filtered => "Filtered",
            Self::Scoring => "Scoring",
            Self::Scored => "Scored",
            Self::Binding => "Binding",
            Self::Bound => "Bound",
            Self::FilterFailed => "FilterFailed",
            Self::BindFailed => "BindFailed",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_result() {
        let pass = FilterResult::pass("node1".to_string());
        assert!(pass.passed);
        assert!(pass.reason.is_none());

        let fail = FilterResult::fail("node2".to_string(), "Insufficient CPU".to_string());
        assert!(!fail.passed);
        assert_eq!(fail.reason, Some("Insufficient CPU".to_string()));
    }

    #[test]
    fn test_attempt_state_display() {
        assert_eq!(AttemptState::FilterFailed.to_string(), "FilterFailed");
        assert_eq!(AttemptState::Bound.to_string(), "Bound");
    }
}
