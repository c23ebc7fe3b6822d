//! Error types for packaging resolution.

use serde::Serialize;
use thiserror::Error;

/// An output path claimed by more than one candidate with no rule covering it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateResource {
    /// Path inside the package
    pub path: String,
    /// Origins of every candidate, in enumeration order
    pub origins: Vec<String>,
}

/// Errors that can occur while resolving packaged resources.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// One or more output paths have conflicting candidates
    #[error("{} path(s) found in more than one dependency: {}", .0.len(), describe(.0))]
    DuplicateResources(Vec<DuplicateResource>),
}

impl ResolveError {
    /// The conflicting paths, for reporting
    pub fn duplicates(&self) -> &[DuplicateResource] {
        match self {
            ResolveError::DuplicateResources(duplicates) => duplicates,
        }
    }
}

fn describe(duplicates: &[DuplicateResource]) -> String {
    duplicates
        .iter()
        .map(|d| format!("'{}' ({})", d.path, d.origins.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<ResolveError> for apkpack_core::Error {
    fn from(err: ResolveError) -> Self {
        apkpack_core::Error::duplicate_resource(err.to_string())
    }
}
