//! Candidate discovery from dependency directories
//!
//! A dependency source is an extracted AAR or a `jniLibs` tree. Native
//! libraries live under `jni/<abi>/` in an AAR and under `lib/<abi>/` in the
//! final package; both layouts map to `lib/<abi>/...`.

use crate::resolver::Candidate;
use apkpack_core::config::SourceConfig;
use apkpack_core::error::{Error, Result, ResultExt};
use apkpack_core::file_scanner::scan_native_libraries;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A named directory contributing native libraries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySource {
    /// Name used as the candidate origin
    pub name: String,
    /// Extracted dependency directory
    pub root: PathBuf,
    /// Globs of files under `root` to leave out
    pub exclude: Vec<String>,
}

impl DependencySource {
    /// A source with no excludes
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            exclude: Vec::new(),
        }
    }

    /// Build from a `[[sources]]` entry, resolving relative paths against `base_dir`
    pub fn from_config(config: &SourceConfig, base_dir: &Path) -> Self {
        let root = if config.path.is_absolute() {
            config.path.clone()
        } else {
            base_dir.join(&config.path)
        };
        Self {
            exclude: config.exclude.clone(),
            ..Self::new(config.name.clone(), root)
        }
    }

    /// Parse a `NAME=DIR` command line argument; a bare `DIR` is named after its last component
    pub fn parse_arg(arg: &str) -> Result<Self> {
        let (name, dir) = match arg.split_once('=') {
            Some((name, dir)) => (name.trim().to_string(), dir.trim()),
            None => {
                let dir = arg.trim();
                let name = Path::new(dir)
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or(dir)
                    .to_string();
                (name, dir)
            }
        };

        if name.is_empty() || dir.is_empty() {
            return Err(Error::config_validation(format!(
                "Invalid source '{}', expected NAME=DIR",
                arg
            )));
        }

        Ok(Self::new(name, dir))
    }
}

/// Map a path relative to a dependency root to its path inside the package
pub fn package_path(relative: &str) -> Option<String> {
    if let Some(rest) = relative.strip_prefix("jni/") {
        return Some(format!("lib/{}", rest));
    }
    if relative.starts_with("lib/") {
        return Some(relative.to_string());
    }
    None
}

/// Enumerate native library candidates
///
/// Sources are visited in the order given; files within a source in file-name
/// order. The resulting sequence defines "first" for pick-first resolution.
pub fn discover(sources: &[DependencySource]) -> Result<Vec<Candidate>> {
    let mut candidates = Vec::new();

    for source in sources {
        let files = scan_native_libraries(&source.root, &source.exclude)
            .context(format!("While scanning dependency '{}'", source.name))?;

        let before = candidates.len();
        for file in files {
            let Some(path) = package_path(&file.relative) else {
                debug!(source = %source.name, file = %file.relative, "not a packaged native library");
                continue;
            };
            candidates.push(Candidate::new(path, file.path, source.name.clone()));
        }

        info!(
            source = %source.name,
            root = %source.root.display(),
            libraries = candidates.len() - before,
            "scanned dependency"
        );
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use apkpack_core::ErrorCode;
    use tempfile::tempdir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, relative).unwrap();
    }

    #[test]
    fn test_package_path_maps_jni_to_lib() {
        assert_eq!(
            package_path("jni/arm64-v8a/libfoo.so").as_deref(),
            Some("lib/arm64-v8a/libfoo.so")
        );
        assert_eq!(
            package_path("lib/x86/libfoo.so").as_deref(),
            Some("lib/x86/libfoo.so")
        );
        assert_eq!(package_path("assets/libfoo.so"), None);
        assert_eq!(package_path("jnilib/libfoo.so"), None);
    }

    #[test]
    fn test_parse_arg() {
        let source = DependencySource::parse_arg("tflite=deps/tflite").unwrap();
        assert_eq!(source, DependencySource::new("tflite", "deps/tflite"));

        let source = DependencySource::parse_arg("deps/mlkit").unwrap();
        assert_eq!(source.name, "mlkit");
        assert_eq!(source.root, PathBuf::from("deps/mlkit"));

        assert!(DependencySource::parse_arg("=deps").is_err());
        assert!(DependencySource::parse_arg("name=").is_err());
    }

    #[test]
    fn test_from_config_resolves_relative_paths() {
        let config = SourceConfig {
            name: "a".to_string(),
            path: PathBuf::from("deps/a"),
            exclude: vec!["jni/mips/**".to_string()],
        };
        let source = DependencySource::from_config(&config, Path::new("/project"));
        assert_eq!(source.root, PathBuf::from("/project/deps/a"));
        assert_eq!(source.exclude, vec!["jni/mips/**"]);
    }

    #[test]
    fn test_discover_follows_source_order() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        touch(&b, "jni/arm64-v8a/libtensorflowlite_jni.so");
        touch(&a, "jni/arm64-v8a/libtensorflowlite_jni.so");
        touch(&a, "jni/arm64-v8a/libapp.so");
        touch(&a, "classes.jar");
        touch(&a, "assets/model.so");

        let sources = vec![DependencySource::new("b", &b), DependencySource::new("a", &a)];
        let candidates = discover(&sources).unwrap();

        let listed: Vec<(&str, &str)> = candidates
            .iter()
            .map(|c| (c.origin.as_str(), c.path.as_str()))
            .collect();
        assert_eq!(
            listed,
            vec![
                ("b", "lib/arm64-v8a/libtensorflowlite_jni.so"),
                ("a", "lib/arm64-v8a/libapp.so"),
                ("a", "lib/arm64-v8a/libtensorflowlite_jni.so"),
            ]
        );
        assert_eq!(
            candidates[0].source,
            b.join("jni/arm64-v8a/libtensorflowlite_jni.so")
        );
    }

    #[test]
    fn test_discover_applies_source_excludes() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "jni/x86/libfoo.so");
        touch(dir.path(), "jni/mips/libfoo.so");

        let mut source = DependencySource::new("a", dir.path());
        source.exclude.push("jni/mips/**".to_string());
        let candidates = discover(&[source]).unwrap();

        let paths: Vec<&str> = candidates.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["lib/x86/libfoo.so"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_duplicates_are_still_fatal() {
        use crate::resolver::{resolve, PackagingOptions};

        let dir = tempdir().unwrap();
        touch(dir.path(), "shared/libfoo.so");
        let mut sources = Vec::new();
        for name in ["a", "b"] {
            let abi_dir = dir.path().join(name).join("jni/x86");
            std::fs::create_dir_all(&abi_dir).unwrap();
            std::os::unix::fs::symlink(dir.path().join("shared/libfoo.so"), abi_dir.join("libfoo.so"))
                .unwrap();
            sources.push(DependencySource::new(name, dir.path().join(name)));
        }

        let candidates = discover(&sources).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].source, dir.path().join("a/jni/x86/libfoo.so"));

        let err = resolve(&PackagingOptions::default(), candidates).unwrap_err();
        assert_eq!(err.duplicates()[0].path, "lib/x86/libfoo.so");
        assert_eq!(err.duplicates()[0].origins, vec!["a", "b"]);
    }

    #[test]
    fn test_discover_missing_source_names_it() {
        let dir = tempdir().unwrap();
        let err = discover(&[DependencySource::new("ghost", dir.path().join("ghost"))])
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DirectoryNotFound);
        assert!(err.context.unwrap().contains("ghost"));
    }
}
