//! Terminal helpers for apkpack
//!
//! - Status lines that respect `--quiet`
//! - Human-readable sizes and counts
//! - Progress bars for staging

#![warn(missing_docs)]

pub mod output;
pub mod progress;
