//! Matcher abstraction: classifies a metric name as belonging to a subset.

use std::fmt::Write as _;

use regex::Regex;

use crate::{
    error::{IndexError, IndexResult},
    metric::{EncodedName, SymbolTable},
};

/// A predicate over metric names.
///
/// Closed set of three variants. Constructed once (from config or by hand) and immutable
/// afterwards; owned by the [`StatsIndex`](crate::index::StatsIndex) it was built for.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Matches names that start with `prefix` (if non-empty) and end with `suffix` (if
    /// non-empty). Both empty matches every name.
    PrefixSuffix {
        /// Required prefix, or empty for "any".
        prefix: String,
        /// Required suffix, or empty for "any".
        suffix: String,
    },
    /// Matches names the compiled regular expression finds a match in.
    Regex(Regex),
    /// Matches names any child matcher matches. An empty list matches nothing.
    Or(Vec<Matcher>),
}

impl Matcher {
    /// Builds a [`Self::PrefixSuffix`] matcher.
    pub fn prefix_suffix(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self::PrefixSuffix {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Builds a [`Self::PrefixSuffix`] matcher that only constrains the prefix.
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::prefix_suffix(prefix, "")
    }

    /// Builds a [`Self::PrefixSuffix`] matcher that only constrains the suffix.
    pub fn suffix(suffix: impl Into<String>) -> Self {
        Self::prefix_suffix("", suffix)
    }

    /// Builds a [`Self::Regex`] matcher, failing with [`IndexError::InvalidMatcherSpec`] if
    /// `pattern` does not compile.
    pub fn regex(pattern: impl AsRef<str>) -> IndexResult<Self> {
        let pattern = pattern.as_ref();
        Regex::new(pattern)
            .map(Self::Regex)
            .map_err(|err| IndexError::bad_regex(pattern, err))
    }

    /// Builds an [`Self::Or`] matcher over `children`. An empty vector matches nothing.
    pub fn or(children: Vec<Matcher>) -> Self {
        Self::Or(children)
    }

    /// Tests whether `name` belongs to this matcher's subset.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::PrefixSuffix { prefix, suffix } => {
                (prefix.is_empty() || name.starts_with(prefix.as_str()))
                    && (suffix.is_empty() || name.ends_with(suffix.as_str()))
            }
            Self::Regex(re) => re.is_match(name),
            Self::Or(children) => children.iter().any(|child| child.matches(name)),
        }
    }

    /// Fast-path version of [`Self::matches`] that works from an encoded name handle, decoding
    /// through `symbols` only when a variant has no cheaper way to decide.
    ///
    /// Must remain semantically equivalent to `self.matches(symbols.resolve(handle))`.
    pub fn matches_encoded(&self, handle: EncodedName, symbols: &dyn SymbolTable) -> bool {
        match symbols.resolve(handle) {
            Some(name) => self.matches(&name),
            None => false,
        }
    }

    /// Produces a stable, human-readable summary of this matcher, used by admin/debug surfaces.
    ///
    /// The exact wording is part of this crate's contract (pinned by tests), not merely a
    /// debugging aid.
    pub fn describe(&self) -> String {
        match self {
            Self::PrefixSuffix { prefix, suffix } => match (prefix.is_empty(), suffix.is_empty()) {
                (true, true) => "all".to_string(),
                (false, true) => format!("prefix='{prefix}'"),
                (true, false) => format!("suffix='{suffix}'"),
                (false, false) => format!("prefix='{prefix}' AND suffix='{suffix}'"),
            },
            Self::Regex(re) => format!("regex='{}'", re.as_str()),
            Self::Or(children) => {
                let mut description = String::from("(");
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        description.push_str(" OR ");
                    }
                    let _ = write!(description, "{}", child.describe());
                }
                description.push(')');
                description
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_matcher_matches_as_specified() {
        let matcher = Matcher::prefix("cluster.");
        assert!(matcher.matches("cluster.foo.upstream_rq"));
        assert!(matcher.matches("cluster.bar"));
        assert!(matcher.matches("cluster."));
        assert!(!matcher.matches("http.downstream_rq"));
        assert!(!matcher.matches("cluste.foo"));
        assert_eq!(matcher.describe(), "prefix='cluster.'");
    }

    #[test]
    fn overlapping_prefix_and_suffix() {
        let matcher = Matcher::prefix_suffix("abc", "bcd");
        assert!(matcher.matches("abcd"));
        assert!(matcher.matches("abcXbcd"));
        assert!(!matcher.matches("abc"));
        assert!(!matcher.matches("bcd"));
        assert_eq!(matcher.describe(), "prefix='abc' AND suffix='bcd'");
    }

    #[test]
    fn empty_prefix_suffix_matches_everything() {
        let matcher = Matcher::prefix_suffix("", "");
        assert!(matcher.matches(""));
        assert!(matcher.matches("anything at all"));
        assert_eq!(matcher.describe(), "all");
    }

    #[test]
    fn or_of_prefix_and_regex() {
        let matcher = Matcher::or(vec![
            Matcher::prefix("cluster."),
            Matcher::regex(r"^http\..+\.rq_total$").unwrap(),
        ]);
        assert!(matcher.matches("cluster.foo.bar"));
        assert!(matcher.matches("http.downstream.rq_total"));
        assert!(!matcher.matches("listener.foo"));
        assert!(!matcher.matches("http.downstream.rq_error"));
        assert_eq!(
            matcher.describe(),
            "(prefix='cluster.' OR regex='^http\\..+\\.rq_total$')"
        );
    }

    #[test]
    fn empty_or_matches_nothing() {
        let matcher = Matcher::or(vec![]);
        assert!(!matcher.matches("anything"));
        assert!(!matcher.matches(""));
        assert_eq!(matcher.describe(), "()");
    }

    #[test]
    fn malformed_regex_fails_to_construct() {
        let err = Matcher::regex("[unterminated").unwrap_err();
        assert!(matches!(err, IndexError::InvalidMatcherSpec { .. }));
    }

    #[test]
    fn describe_is_idempotent() {
        let matcher = Matcher::or(vec![Matcher::prefix("a"), Matcher::suffix("b")]);
        assert_eq!(matcher.describe(), matcher.describe());
    }

    #[test]
    fn suffix_only_matcher() {
        let matcher = Matcher::suffix(".rq_total");
        assert!(matcher.matches("cluster.foo.rq_total"));
        assert!(!matcher.matches("cluster.foo.rq_total.extra"));
        assert_eq!(matcher.describe(), "suffix='.rq_total'");
    }
}
