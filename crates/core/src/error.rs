//! Error handling with codes, context and recovery suggestions
//!
//! Every failure surfaced by the apkpack crates carries:
//! - An error code for programmatic handling
//! - Optional context describing what was being done
//! - An optional recovery suggestion
//! - A serializable report form for `--json` output

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // General errors (1xxx)
    /// Unclassified failure
    Unknown = 1000,
    /// Bug or serialization failure
    Internal = 1001,

    // IO errors (2xxx)
    /// Other I/O failure
    IoError = 2000,
    /// Missing file
    FileNotFound = 2001,
    /// Access refused
    PermissionDenied = 2002,
    /// Path that cannot be used
    InvalidPath = 2003,
    /// Missing directory
    DirectoryNotFound = 2004,

    // Configuration errors (3xxx)
    /// Unreadable configuration
    ConfigError = 3000,
    /// Configuration file named but absent
    ConfigNotFound = 3001,
    /// Malformed TOML
    ConfigParseError = 3002,
    /// Well-formed but unusable settings
    ConfigValidationError = 3003,

    // Pattern errors (4xxx)
    /// Pattern failure
    PatternError = 4000,
    /// Glob that does not compile
    InvalidPattern = 4001,

    // Packaging errors (5xxx)
    /// Packaging failure
    PackagingError = 5000,
    /// Duplicate package path with no rule
    DuplicateResource = 5001,
    /// Could not write the staging directory
    StagingFailed = 5002,

    // Build script errors (6xxx)
    /// Build script failure
    BuildScriptError = 6000,
    /// Build script without the expected blocks
    BuildScriptParseError = 6001,
}

impl ErrorCode {
    /// Get the numeric code
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Get a human-readable category
    pub fn category(&self) -> &'static str {
        match self.code() / 1000 {
            1 => "General",
            2 => "IO",
            3 => "Configuration",
            4 => "Pattern",
            5 => "Packaging",
            6 => "BuildScript",
            _ => "Unknown",
        }
    }

    /// Process exit code the CLI uses for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorCode::DuplicateResource => exit_codes::DUPLICATE_RESOURCE,
            ErrorCode::InvalidPattern | ErrorCode::PatternError => exit_codes::CONFIG_ERROR,
            code if code.category() == "Configuration" => exit_codes::CONFIG_ERROR,
            code if code.category() == "IO" => exit_codes::IO_ERROR,
            _ => exit_codes::FAILURE,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

/// Main error type with rich context
#[derive(Error, Debug)]
pub struct Error {
    /// Error code for programmatic handling
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Additional context
    pub context: Option<String>,
    /// Recovery suggestion
    pub suggestion: Option<String>,
    /// Source error
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ctx) = &self.context {
            write!(f, "\n  Context: {}", ctx)?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n  Suggestion: {}", suggestion)?;
        }
        Ok(())
    }
}

impl Error {
    /// Create a new error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            suggestion: None,
            source: None,
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Add a recovery suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Convert to a serializable report
    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code,
            code_str: self.code.to_string(),
            category: self.code.category().to_string(),
            message: self.message.clone(),
            context: self.context.clone(),
            suggestion: self.suggestion.clone(),
            source: self.source.as_ref().map(|e| e.to_string()),
        }
    }

    // Convenience constructors

    /// Missing file
    pub fn file_not_found(path: impl AsRef<std::path::Path>) -> Self {
        Self::new(
            ErrorCode::FileNotFound,
            format!("File not found: {}", path.as_ref().display()),
        )
        .with_suggestion("Check that the file exists and you have read permissions")
    }

    /// Missing dependency directory
    pub fn directory_not_found(path: impl AsRef<std::path::Path>) -> Self {
        Self::new(
            ErrorCode::DirectoryNotFound,
            format!("Directory not found: {}", path.as_ref().display()),
        )
        .with_suggestion("Extract the dependency archive or fix the source path in apkpack.toml")
    }

    /// Configuration failure
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Configuration file named but absent
    pub fn config_not_found(path: impl AsRef<std::path::Path>) -> Self {
        Self::new(
            ErrorCode::ConfigNotFound,
            format!("Configuration file not found: {}", path.as_ref().display()),
        )
        .with_suggestion("Create an apkpack.toml file or use --config to specify a path")
    }

    /// Unusable configuration value
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigValidationError, message)
    }

    /// Pattern that does not compile
    pub fn invalid_pattern(pattern: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::InvalidPattern,
            format!("Invalid resource pattern '{}': {}", pattern, reason),
        )
        .with_suggestion("Patterns use glob syntax, e.g. lib/**/libfoo.so")
    }

    /// Duplicate package path with no rule
    pub fn duplicate_resource(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DuplicateResource, message)
            .with_suggestion("Add a matching glob to [packaging].pick_firsts to keep the first copy")
    }

    /// Staging write failure
    pub fn staging(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StagingFailed, message)
    }

    /// Unparseable build script
    pub fn build_script(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BuildScriptParseError, message)
    }
}

/// Serializable error report for logging and JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Numeric code
    pub code: ErrorCode,
    /// Code as `E####`
    pub code_str: String,
    /// Code family
    pub category: String,
    /// Primary message
    pub message: String,
    /// Where the error occurred
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// How to recover
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Underlying cause
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Exit codes for CLI commands
pub mod exit_codes {
    /// Completed
    pub const SUCCESS: i32 = 0;
    /// Any other failure
    pub const FAILURE: i32 = 1;
    /// Unmatched duplicate resources
    pub const DUPLICATE_RESOURCE: i32 = 2;
    /// Configuration or pattern error
    pub const CONFIG_ERROR: i32 = 3;
    /// Filesystem error
    pub const IO_ERROR: i32 = 4;
}

// Implement From for common error types

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
            _ => ErrorCode::IoError,
        };
        Error::new(code, err.to_string()).with_source(err)
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        let message = match err.path() {
            Some(path) => format!("Failed to walk {}: {}", path.display(), err),
            None => format!("Failed to walk directory: {}", err),
        };
        Error::new(ErrorCode::IoError, message).with_source(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::new(ErrorCode::Internal, format!("JSON error: {}", err)).with_source(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::new(ErrorCode::ConfigParseError, format!("TOML parse error: {}", err))
            .with_source(err)
    }
}

impl From<glob::PatternError> for Error {
    fn from(err: glob::PatternError) -> Self {
        Error::new(ErrorCode::InvalidPattern, format!("Glob error: {}", err)).with_source(err)
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::new(ErrorCode::Internal, format!("Regex error: {}", err)).with_source(err)
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Attach context to the error
    fn context(self, context: impl Into<String>) -> Result<T>;
    /// Attach a recovery suggestion to the error
    fn with_suggestion(self, suggestion: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_suggestion(self, suggestion: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_suggestion(suggestion))
    }
}
