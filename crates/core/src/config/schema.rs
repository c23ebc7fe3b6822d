//! Configuration schema definitions
//!
//! Mirrors the `packaging { resources { ... } }` block of an Android build
//! script plus the list of dependency sources to scan.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigSchema {
    #[serde(default)]
    /// `[general]`
    pub general: GeneralConfig,

    #[serde(default)]
    /// `[packaging]`
    pub packaging: PackagingConfig,

    #[serde(default)]
    /// `[[sources]]`, in enumeration order
    pub sources: Vec<SourceConfig>,

    #[serde(default)]
    /// `[output]`
    pub output: OutputConfig,
}

impl ConfigSchema {
    /// Check the schema for values that would make resolution meaningless
    pub fn validate(&self) -> Result<()> {
        for (list, patterns) in [
            ("pick_firsts", &self.packaging.pick_firsts),
            ("excludes", &self.packaging.excludes),
            ("merges", &self.packaging.merges),
        ] {
            if patterns.iter().any(|p| p.trim().is_empty()) {
                return Err(Error::config_validation(format!(
                    "[packaging].{} contains an empty pattern",
                    list
                )));
            }
        }

        let mut names = BTreeSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(Error::config_validation(format!(
                    "source at {} has an empty name",
                    source.path.display()
                )));
            }
            if source.exclude.iter().any(|p| p.trim().is_empty()) {
                return Err(Error::config_validation(format!(
                    "source '{}' has an empty exclude pattern",
                    source.name
                )));
            }
            if !names.insert(source.name.as_str()) {
                return Err(Error::config_validation(format!(
                    "duplicate source name '{}'",
                    source.name
                ))
                .with_suggestion("Give every [[sources]] entry a unique name"));
            }
        }

        Ok(())
    }
}

/// General project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Project name
    #[serde(default = "default_project_name")]
    pub project_name: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
        }
    }
}

fn default_project_name() -> String {
    "project_application".to_string()
}

/// Resource conflict rules, in the order the Android packaging DSL applies them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagingConfig {
    /// Paths where only the first candidate is packaged
    #[serde(default = "default_pick_firsts")]
    pub pick_firsts: Vec<String>,

    /// Paths dropped from the package entirely
    #[serde(default)]
    pub excludes: Vec<String>,

    /// Paths whose candidates are concatenated
    #[serde(default)]
    pub merges: Vec<String>,
}

impl Default for PackagingConfig {
    fn default() -> Self {
        Self {
            pick_firsts: default_pick_firsts(),
            excludes: Vec::new(),
            merges: Vec::new(),
        }
    }
}

/// TensorFlow Lite libraries shipped by several plugins at once
fn default_pick_firsts() -> Vec<String> {
    vec![
        "lib/**/libtensorflowlite_jni.so",
        "lib/**/libxnnpack_delegate.so",
        "lib/**/libnnapi_delegate.so",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// A dependency contributing native libraries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Dependency name used in reports
    pub name: String,

    /// Root directory of the extracted dependency
    pub path: PathBuf,

    /// Globs, relative to `path`, of files never offered as candidates
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory the `stage` command writes to
    #[serde(default = "default_stage_dir")]
    pub stage_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            stage_dir: default_stage_dir(),
        }
    }
}

fn default_stage_dir() -> PathBuf {
    PathBuf::from("build/apkpack")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pick_firsts_cover_tflite() {
        let schema = ConfigSchema::default();
        assert_eq!(schema.packaging.pick_firsts.len(), 3);
        assert!(schema
            .packaging
            .pick_firsts
            .contains(&"lib/**/libtensorflowlite_jni.so".to_string()));
        assert!(schema.packaging.excludes.is_empty());
    }

    #[test]
    fn test_parse_full_schema() {
        let schema: ConfigSchema = toml::from_str(
            r#"
            [general]
            project_name = "demo"

            [packaging]
            pick_firsts = ["lib/**/libc++_shared.so"]
            excludes = ["lib/x86/**"]

            [[sources]]
            name = "tflite"
            path = "deps/tflite"

            [[sources]]
            name = "mlkit"
            path = "deps/mlkit"
            exclude = ["jni/mips/**"]

            [output]
            stage_dir = "out"
            "#,
        )
        .unwrap();

        assert_eq!(schema.general.project_name, "demo");
        assert_eq!(schema.packaging.pick_firsts, vec!["lib/**/libc++_shared.so"]);
        assert_eq!(schema.packaging.excludes, vec!["lib/x86/**"]);
        assert!(schema.packaging.merges.is_empty());
        assert_eq!(schema.sources.len(), 2);
        assert_eq!(schema.sources[1].name, "mlkit");
        assert!(schema.sources[0].exclude.is_empty());
        assert_eq!(schema.sources[1].exclude, vec!["jni/mips/**"]);
        assert_eq!(schema.output.stage_dir, PathBuf::from("out"));
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let schema: ConfigSchema = toml::from_str("").unwrap();
        assert_eq!(schema.packaging.pick_firsts, default_pick_firsts());
        assert_eq!(schema.output.stage_dir, PathBuf::from("build/apkpack"));
    }

    #[test]
    fn test_validate_rejects_empty_pattern() {
        let mut schema = ConfigSchema::default();
        schema.packaging.excludes.push("  ".to_string());
        let err = schema.validate().unwrap_err();
        assert!(err.message.contains("excludes"));
    }

    #[test]
    fn test_validate_rejects_empty_source_exclude() {
        let mut schema = ConfigSchema::default();
        schema.sources.push(SourceConfig {
            name: "dep".to_string(),
            path: PathBuf::from("deps/dep"),
            exclude: vec![String::new()],
        });
        let err = schema.validate().unwrap_err();
        assert!(err.message.contains("source 'dep'"));
    }

    #[test]
    fn test_validate_rejects_duplicate_source_names() {
        let mut schema = ConfigSchema::default();
        for path in ["a", "b"] {
            schema.sources.push(SourceConfig {
                name: "dep".to_string(),
                path: PathBuf::from(path),
                exclude: Vec::new(),
            });
        }
        let err = schema.validate().unwrap_err();
        assert!(err.message.contains("duplicate source name 'dep'"));
    }
}
