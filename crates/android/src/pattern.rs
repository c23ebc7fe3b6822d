//! Resource path patterns
//!
//! Globs over `/`-separated package paths, with the semantics of the Android
//! packaging DSL: `**` spans zero or more directories, `*` and `?` stay inside a
//! single path segment.

use apkpack_core::error::{Error, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const MATCH_OPTIONS: glob::MatchOptions = glob::MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A compiled resource path pattern
#[derive(Debug, Clone)]
pub struct ResourcePattern {
    raw: String,
    compiled: glob::Pattern,
}

impl ResourcePattern {
    /// Compile a pattern; a leading `/` is ignored
    pub fn new(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let normalized = trimmed.trim_start_matches('/');
        if normalized.is_empty() {
            return Err(Error::invalid_pattern(raw, "pattern is empty"));
        }

        let compiled =
            glob::Pattern::new(normalized).map_err(|e| Error::invalid_pattern(raw, e.msg))?;

        Ok(Self {
            raw: trimmed.to_string(),
            compiled,
        })
    }

    /// The pattern as declared
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether `path` (relative to the package root) matches
    pub fn matches(&self, path: &str) -> bool {
        self.compiled
            .matches_with(path.trim_start_matches('/'), MATCH_OPTIONS)
    }
}

impl PartialEq for ResourcePattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for ResourcePattern {}

impl FromStr for ResourcePattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for ResourcePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for ResourcePattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

/// An ordered list of patterns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PatternSet {
    patterns: Vec<ResourcePattern>,
}

impl PatternSet {
    /// Compile every pattern, failing on the first invalid one
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| ResourcePattern::new(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// First pattern, in declaration order, that matches `path`
    pub fn first_match(&self, path: &str) -> Option<&ResourcePattern> {
        self.patterns.iter().find(|p| p.matches(path))
    }

    /// Patterns in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &ResourcePattern> {
        self.patterns.iter()
    }

    /// Number of patterns
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether no pattern is declared
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
