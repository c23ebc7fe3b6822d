//! Configuration loading and schema definitions
//!
//! `apkpack.toml` holds the packaging rules and the dependency sources to scan.

mod loader;
mod schema;

pub use loader::Config;
pub use schema::*;
