//! Core utilities for apkpack
//!
//! This crate provides shared functionality used by the packaging tools:
//!
//! - **Error handling**: errors with codes, context, and recovery suggestions
//! - **Configuration**: `apkpack.toml` loading with validation
//! - **File scanning**: deterministic discovery of files under a dependency root
//!
//! # Example
//!
//! ```rust,no_run
//! use apkpack_core::config::Config;
//! use apkpack_core::file_scanner::scan_native_libraries;
//!
//! let config = Config::load(None).expect("invalid apkpack.toml");
//! for source in &config.schema.sources {
//!     let libs = scan_native_libraries(&source.path, &source.exclude).expect("scan failed");
//!     println!("{}: {} native libraries", source.name, libs.len());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod file_scanner;

pub use error::{Error, ErrorCode, Result, ResultExt};
