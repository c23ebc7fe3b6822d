//! Packaging resource resolution
//!
//! Decides which single file lands at each path of the application package
//! when several dependencies contribute a file for the same path.
//!
//! Rules apply in the order the Android packaging DSL uses:
//! 1. `excludes`: the path is dropped, whatever the number of candidates
//! 2. a single candidate is always kept
//! 3. `pick_firsts`: the first candidate in enumeration order is kept
//! 4. `merges`: every candidate is kept and concatenated when staged
//! 5. anything else with two or more candidates is a fatal conflict
//!
//! Resolution never reorders its input. "First" means first in the sequence the
//! caller passes in.

use crate::error::{DuplicateResource, ResolveError};
use crate::pattern::PatternSet;
use apkpack_core::config::PackagingConfig;
use apkpack_core::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, warn};

/// A file that could be packaged at `path`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    /// Output path inside the package, `/`-separated
    pub path: String,
    /// File on disk supplying the content
    pub source: PathBuf,
    /// Dependency the file came from
    pub origin: String,
}

impl Candidate {
    /// Create a candidate
    pub fn new(path: impl Into<String>, source: impl Into<PathBuf>, origin: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
            origin: origin.into(),
        }
    }
}

/// Which rule settled a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Dropped from the package
    Exclude,
    /// First candidate kept
    PickFirst,
    /// All candidates concatenated
    Merge,
}

/// Conflict rules for packaged resources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackagingOptions {
    /// Checked first; matching paths are dropped
    pub excludes: PatternSet,
    /// Duplicates keep their first candidate
    pub pick_firsts: PatternSet,
    /// Duplicates are concatenated
    pub merges: PatternSet,
}

impl PackagingOptions {
    /// Options with only pick-first patterns
    pub fn pick_first<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            pick_firsts: PatternSet::new(patterns)?,
            ..Self::default()
        })
    }

    /// Compile the `[packaging]` section of the configuration
    pub fn from_config(config: &PackagingConfig) -> Result<Self> {
        Ok(Self {
            excludes: PatternSet::new(&config.excludes)?,
            pick_firsts: PatternSet::new(&config.pick_firsts)?,
            merges: PatternSet::new(&config.merges)?,
        })
    }

    /// The rule and pattern that apply to `path`, by precedence
    pub fn rule_for(&self, path: &str) -> Option<(Rule, &str)> {
        [
            (Rule::Exclude, &self.excludes),
            (Rule::PickFirst, &self.pick_firsts),
            (Rule::Merge, &self.merges),
        ]
        .into_iter()
        .find_map(|(rule, set)| set.first_match(path).map(|p| (rule, p.as_str())))
    }

    fn all_patterns(&self) -> impl Iterator<Item = &crate::pattern::ResourcePattern> {
        self.excludes
            .iter()
            .chain(self.pick_firsts.iter())
            .chain(self.merges.iter())
    }
}

/// How a single output path was settled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selection {
    /// Only one candidate existed
    Single { candidate: Candidate },
    /// Duplicates covered by a pick-first pattern
    PickedFirst {
        kept: Candidate,
        discarded: Vec<Candidate>,
        pattern: String,
    },
    /// Duplicates covered by a merge pattern, in enumeration order
    Merged { sources: Vec<Candidate>, pattern: String },
}

impl Selection {
    /// Candidates whose content ends up in the package, in order
    pub fn sources(&self) -> Vec<&Candidate> {
        match self {
            Selection::Single { candidate } => vec![candidate],
            Selection::PickedFirst { kept, .. } => vec![kept],
            Selection::Merged { sources, .. } => sources.iter().collect(),
        }
    }

    /// Candidates dropped for this path
    pub fn discarded(&self) -> &[Candidate] {
        match self {
            Selection::PickedFirst { discarded, .. } => discarded,
            _ => &[],
        }
    }

    /// Origin of the first packaged candidate
    pub fn origin(&self) -> &str {
        match self {
            Selection::Single { candidate } => &candidate.origin,
            Selection::PickedFirst { kept, .. } => &kept.origin,
            Selection::Merged { sources, .. } => {
                sources.first().map(|c| c.origin.as_str()).unwrap_or_default()
            }
        }
    }
}

/// Final mapping from output path to packaged content
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// One entry per output path
    pub entries: BTreeMap<String, Selection>,
    /// Candidates dropped by an exclude pattern
    pub excluded: Vec<Candidate>,
    /// Declared patterns that matched no candidate
    pub unused_patterns: Vec<String>,
}

impl Resolution {
    /// Selection for an output path
    pub fn get(&self, path: &str) -> Option<&Selection> {
        self.entries.get(path)
    }

    /// Number of packaged paths
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is packaged
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in path order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Selection)> {
        self.entries.iter().map(|(path, s)| (path.as_str(), s))
    }

    /// Number of candidates discarded by pick-first rules
    pub fn discarded_count(&self) -> usize {
        self.entries.values().map(|s| s.discarded().len()).sum()
    }
}

/// Resolve `candidates`, given in enumeration order, against `options`
///
/// Every unmatched duplicate is reported together; no partial mapping is
/// returned when any exists.
pub fn resolve<I>(options: &PackagingOptions, candidates: I) -> std::result::Result<Resolution, ResolveError>
where
    I: IntoIterator<Item = Candidate>,
{
    let mut groups: BTreeMap<String, Vec<Candidate>> = BTreeMap::new();
    for candidate in candidates {
        let key = candidate.path.trim_start_matches('/').to_string();
        groups.entry(key).or_default().push(candidate);
    }

    let mut resolution = Resolution::default();
    let mut duplicates = Vec::new();

    for (path, mut group) in groups {
        match options.rule_for(&path) {
            Some((Rule::Exclude, pattern)) => {
                debug!(%path, pattern, count = group.len(), "excluded");
                resolution.excluded.append(&mut group);
            }
            _ if group.len() == 1 => {
                let candidate = group.remove(0);
                resolution
                    .entries
                    .insert(path, Selection::Single { candidate });
            }
            Some((Rule::PickFirst, pattern)) => {
                let kept = group.remove(0);
                debug!(
                    %path,
                    pattern,
                    kept = %kept.origin,
                    discarded = group.len(),
                    "picked first candidate"
                );
                resolution.entries.insert(
                    path,
                    Selection::PickedFirst {
                        kept,
                        discarded: group,
                        pattern: pattern.to_string(),
                    },
                );
            }
            Some((Rule::Merge, pattern)) => {
                debug!(%path, pattern, count = group.len(), "merging candidates");
                resolution.entries.insert(
                    path,
                    Selection::Merged {
                        sources: group,
                        pattern: pattern.to_string(),
                    },
                );
            }
            None => {
                duplicates.push(DuplicateResource {
                    origins: group.into_iter().map(|c| c.origin).collect(),
                    path,
                });
            }
        }
    }

    if !duplicates.is_empty() {
        return Err(ResolveError::DuplicateResources(duplicates));
    }

    let all_paths: Vec<&str> = resolution
        .entries
        .keys()
        .map(String::as_str)
        .chain(resolution.excluded.iter().map(|c| c.path.trim_start_matches('/')))
        .collect();
    for pattern in options.all_patterns() {
        if !all_paths.iter().any(|path| pattern.matches(path)) {
            warn!(pattern = pattern.as_str(), "pattern matched no candidate");
            resolution.unused_patterns.push(pattern.as_str().to_string());
        }
    }

    Ok(resolution)
}
