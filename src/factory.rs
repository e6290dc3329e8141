//! Builds matchers and registers indices from a declarative, `serde`-deserializable config.

use regex::escape;
use serde::Deserialize;

use crate::{
    error::{IndexError, IndexResult},
    matcher::Matcher,
    metric::{MetricKind, MetricRegistry},
    registry::IndexedRegistry,
};

/// Top-level wire format: a list of index declarations.
#[derive(Debug, Clone, Deserialize)]
pub struct IndicesConfig {
    /// The declared indices, in declaration order.
    pub indices: Vec<IndexConfig>,
}

/// One declared index.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    /// Index name, unique within its kind.
    pub name: String,
    /// Kind of metric this index covers. Histogram is accepted by this struct (it mirrors the
    /// full [`MetricKind`] enum) but rejected by [`IndexFactory::make_matcher`], since histogram
    /// indices are not supported in v1.
    pub metric_kind: MetricKind,
    /// The matcher declaration. Exactly one variant is ever populated.
    #[serde(flatten)]
    pub matcher: MatcherConfig,
}

/// Mirrors the "exactly one of" constraint on a matcher declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherConfig {
    /// `prefix_suffix: { prefix, suffix }`.
    PrefixSuffix {
        /// Required prefix, or absent/empty for "any".
        #[serde(default)]
        prefix: String,
        /// Required suffix, or absent/empty for "any".
        #[serde(default)]
        suffix: String,
    },
    /// `string_matcher: { ... }`, borrowed from the surrounding ecosystem's generic string
    /// matcher schema.
    StringMatcher(StringMatcherConfig),
}

/// The ecosystem-standard string matcher shape: exactly one of five ways to match a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringMatcherConfig {
    /// Matches only the exact string.
    Exact(String),
    /// Matches strings with this prefix.
    Prefix(String),
    /// Matches strings with this suffix.
    Suffix(String),
    /// Matches strings containing this substring anywhere.
    Contains(String),
    /// Matches a raw regular expression directly (already RE2/`regex`-compatible, not escaped).
    SafeRegex(String),
}

/// Stateless translator from [`IndicesConfig`] into registered indices.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexFactory;

impl IndexFactory {
    /// Creates a new factory. Stateless; exists only to give the build methods a receiver.
    pub fn new() -> Self {
        Self
    }

    /// Builds the [`Matcher`] described by one config entry.
    pub fn make_matcher(&self, entry: &IndexConfig) -> IndexResult<Matcher> {
        match &entry.matcher {
            MatcherConfig::PrefixSuffix { prefix, suffix } => {
                Ok(Matcher::prefix_suffix(prefix.clone(), suffix.clone()))
            }
            MatcherConfig::StringMatcher(string_matcher) => match string_matcher {
                StringMatcherConfig::Prefix(prefix) => Ok(Matcher::prefix(prefix.clone())),
                StringMatcherConfig::Suffix(suffix) => Ok(Matcher::suffix(suffix.clone())),
                StringMatcherConfig::SafeRegex(pattern) => Matcher::regex(pattern),
                StringMatcherConfig::Exact(value) => Matcher::regex(format!("^{}$", escape(value))),
                StringMatcherConfig::Contains(value) => {
                    Matcher::regex(format!(".*{}.*", escape(value)))
                }
            },
        }
    }

    /// Builds and registers every entry in `config`, stopping at the first failure.
    ///
    /// Entries built before a failure remain registered — callers wanting all-or-nothing
    /// semantics should build into a fresh `IndexedRegistry` and splice it in only on success.
    pub fn build_into<R: MetricRegistry>(
        &self,
        registry: &IndexedRegistry<R>,
        config: &IndicesConfig,
    ) -> IndexResult<()> {
        self.build(registry, config, false)
    }

    /// As [`Self::build_into`], but scans existing metrics for each newly registered index.
    pub fn build_into_with_existing<R: MetricRegistry>(
        &self,
        registry: &IndexedRegistry<R>,
        config: &IndicesConfig,
    ) -> IndexResult<()> {
        self.build(registry, config, true)
    }

    fn build<R: MetricRegistry>(
        &self,
        registry: &IndexedRegistry<R>,
        config: &IndicesConfig,
        with_existing: bool,
    ) -> IndexResult<()> {
        for entry in &config.indices {
            if entry.name.is_empty() {
                return Err(IndexError::invalid_matcher("index name must not be empty"));
            }
            let matcher = self.make_matcher(entry)?;
            match entry.metric_kind {
                MetricKind::Counter => {
                    if with_existing {
                        registry.register_counter_index_with_existing(entry.name.clone(), matcher)?;
                    } else {
                        registry.register_counter_index(entry.name.clone(), matcher)?;
                    }
                }
                MetricKind::Gauge => {
                    if with_existing {
                        registry.register_gauge_index_with_existing(entry.name.clone(), matcher)?;
                    } else {
                        registry.register_gauge_index(entry.name.clone(), matcher)?;
                    }
                }
                MetricKind::Histogram => {
                    return Err(IndexError::invalid_matcher(
                        "histogram indices are not supported",
                    ));
                }
            }
        }
        Ok(())
    }
}
