//! Error types surfaced by this crate.

use crate::metric::MetricKind;

/// Failure producing or registering a [`Matcher`](crate::matcher::Matcher) or
/// [`StatsIndex`](crate::index::StatsIndex).
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// An index with this name and kind is already registered.
    #[error("index `{name}` ({kind}) is already registered")]
    DuplicateIndexName {
        /// Name of the index that collided.
        name: String,
        /// Kind the index was registered for.
        kind: MetricKind,
    },
    /// Configuration did not resolve to a valid matcher.
    #[error("invalid matcher spec: {reason}")]
    InvalidMatcherSpec {
        /// Human-readable description of what was wrong.
        reason: String,
        /// Underlying regex compilation failure, if that was the cause.
        #[source]
        source: Option<regex::Error>,
    },
    /// Consumer-side configuration failed validation (e.g. an
    /// [`IdleActivityMonitor`](crate::monitor::IdleActivityMonitor) built with too short
    /// a sustained-idle duration).
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of what was wrong.
        reason: String,
    },
}

impl IndexError {
    pub(crate) fn invalid_matcher(reason: impl Into<String>) -> Self {
        Self::InvalidMatcherSpec {
            reason: reason.into(),
            source: None,
        }
    }

    pub(crate) fn bad_regex(pattern: &str, source: regex::Error) -> Self {
        Self::InvalidMatcherSpec {
            reason: format!("pattern `{pattern}` does not compile"),
            source: Some(source),
        }
    }

    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout this crate.
pub type IndexResult<T> = Result<T, IndexError>;
