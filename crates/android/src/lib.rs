//! Android native library packaging
//!
//! This crate decides what ends up under `lib/<abi>/` in an application
//! package when several dependencies ship the same shared library:
//! - Resource path patterns with Android packaging glob semantics
//! - The pick-first / exclude / merge resolver
//! - Candidate discovery from extracted dependencies
//! - ABI coverage reporting
//! - Build script inspection (`build.gradle.kts`)
//! - Staging of the resolved files

#![warn(missing_docs)]

pub mod abi;
pub mod candidates;
pub mod error;
pub mod gradle;
pub mod pattern;
pub mod resolver;
pub mod stage;

pub use error::{DuplicateResource, ResolveError};
pub use pattern::{PatternSet, ResourcePattern};
pub use resolver::{resolve, Candidate, PackagingOptions, Resolution, Rule, Selection};
