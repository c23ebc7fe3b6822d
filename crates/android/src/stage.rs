//! Staging of resolved native libraries
//!
//! Writes a resolution to disk in package layout so the result can be
//! inspected or handed to an archiver.

use crate::resolver::{Resolution, Selection};
use apkpack_core::error::{Error, ErrorCode, Result, ResultExt};
use serde::Serialize;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Summary of a staging run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageReport {
    /// Directory written to
    pub out_dir: PathBuf,
    /// Files written
    pub files: usize,
    /// Files built from several candidates
    pub merged: usize,
    /// Total bytes written
    pub bytes: u64,
}

/// Copy every resolved entry into `out_dir`
pub fn stage(resolution: &Resolution, out_dir: &Path) -> Result<StageReport> {
    stage_with_progress(resolution, out_dir, |_| {})
}

/// Like [`stage`], calling `on_file` with each output path once it is written
pub fn stage_with_progress<F>(resolution: &Resolution, out_dir: &Path, mut on_file: F) -> Result<StageReport>
where
    F: FnMut(&str),
{
    let mut report = StageReport {
        out_dir: out_dir.to_path_buf(),
        ..StageReport::default()
    };

    for (path, selection) in resolution.iter() {
        let dest = destination(out_dir, path)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| staging_error(&dest, e))?;
        }

        let bytes = match selection {
            Selection::Merged { sources, .. } => {
                // Every part must open before the output exists
                let inputs = sources
                    .iter()
                    .map(|candidate| {
                        File::open(&candidate.source)
                            .map_err(Error::from)
                            .context(format!("While merging into {}", path))
                    })
                    .collect::<Result<Vec<_>>>()?;

                let mut out = File::create(&dest).map_err(|e| staging_error(&dest, e))?;
                let mut written = 0;
                for mut input in inputs {
                    written += io::copy(&mut input, &mut out).map_err(|e| staging_error(&dest, e))?;
                }
                report.merged += 1;
                written
            }
            _ => {
                let Some(candidate) = selection.sources().into_iter().next() else {
                    continue;
                };
                fs::copy(&candidate.source, &dest)
                    .map_err(Error::from)
                    .context(format!("While staging {} from {}", path, candidate.origin))?
            }
        };

        debug!(%path, bytes, origin = selection.origin(), "staged");
        report.files += 1;
        report.bytes += bytes;
        on_file(path);
    }

    Ok(report)
}

/// Join a package path onto `out_dir`, refusing anything that escapes it
fn destination(out_dir: &Path, path: &str) -> Result<PathBuf> {
    let relative = Path::new(path.trim_start_matches('/'));
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if escapes || relative.as_os_str().is_empty() {
        return Err(Error::new(
            ErrorCode::InvalidPath,
            format!("Refusing to stage '{}' outside the output directory", path),
        ));
    }
    Ok(out_dir.join(relative))
}

fn staging_error(dest: &Path, err: io::Error) -> Error {
    Error::staging(format!("Failed to write {}: {}", dest.display(), err)).with_source(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::PatternSet;
    use crate::resolver::{resolve, Candidate, PackagingOptions};
    use tempfile::tempdir;

    fn write(root: &Path, relative: &str, content: &str) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_stage_copies_first_pick() {
        let dir = tempdir().unwrap();
        let a = write(dir.path(), "a/jni/x86/libtensorflowlite_jni.so", "from-a");
        let b = write(dir.path(), "b/jni/x86/libtensorflowlite_jni.so", "from-b-longer");
        let app = write(dir.path(), "a/jni/x86/libapp.so", "app");

        let options = PackagingOptions::pick_first(["lib/**/libtensorflowlite_jni.so"]).unwrap();
        let resolution = resolve(
            &options,
            vec![
                Candidate::new("lib/x86/libtensorflowlite_jni.so", a, "a"),
                Candidate::new("lib/x86/libtensorflowlite_jni.so", b, "b"),
                Candidate::new("lib/x86/libapp.so", app, "a"),
            ],
        )
        .unwrap();

        let out = dir.path().join("out");
        let mut seen = Vec::new();
        let report = stage_with_progress(&resolution, &out, |p| seen.push(p.to_string())).unwrap();

        assert_eq!(report.files, 2);
        assert_eq!(report.merged, 0);
        assert_eq!(report.bytes, ("from-a".len() + "app".len()) as u64);
        assert_eq!(
            fs::read_to_string(out.join("lib/x86/libtensorflowlite_jni.so")).unwrap(),
            "from-a"
        );
        assert_eq!(seen, vec!["lib/x86/libapp.so", "lib/x86/libtensorflowlite_jni.so"]);
    }

    #[test]
    fn test_stage_concatenates_merged_entries() {
        let dir = tempdir().unwrap();
        let first = write(dir.path(), "a/lib/NOTICE", "one\n");
        let second = write(dir.path(), "b/lib/NOTICE", "two\n");

        let options = PackagingOptions {
            merges: PatternSet::new(["lib/NOTICE"]).unwrap(),
            ..PackagingOptions::default()
        };
        let resolution = resolve(
            &options,
            vec![
                Candidate::new("lib/NOTICE", first, "a"),
                Candidate::new("lib/NOTICE", second, "b"),
            ],
        )
        .unwrap();

        let out = dir.path().join("out");
        let report = stage(&resolution, &out).unwrap();
        assert_eq!(report.merged, 1);
        assert_eq!(report.bytes, 8);
        assert_eq!(fs::read_to_string(out.join("lib/NOTICE")).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_stage_missing_source_fails() {
        let dir = tempdir().unwrap();
        let resolution = resolve(
            &PackagingOptions::default(),
            vec![Candidate::new("lib/x86/libgone.so", dir.path().join("gone.so"), "a")],
        )
        .unwrap();

        let err = stage(&resolution, &dir.path().join("out")).unwrap_err();
        assert_eq!(err.code, ErrorCode::FileNotFound);
        assert!(err.context.unwrap().contains("libgone.so"));
    }

    #[test]
    fn test_stage_merge_with_missing_part_writes_nothing() {
        let dir = tempdir().unwrap();
        let first = write(dir.path(), "a/lib/NOTICE", "one\n");

        let options = PackagingOptions {
            merges: PatternSet::new(["lib/NOTICE"]).unwrap(),
            ..PackagingOptions::default()
        };
        let resolution = resolve(
            &options,
            vec![
                Candidate::new("lib/NOTICE", first, "a"),
                Candidate::new("lib/NOTICE", dir.path().join("b/lib/NOTICE"), "b"),
            ],
        )
        .unwrap();

        let out = dir.path().join("out");
        let err = stage(&resolution, &out).unwrap_err();
        assert_eq!(err.code, ErrorCode::FileNotFound);
        assert!(err.context.unwrap().contains("lib/NOTICE"));
        assert!(!out.join("lib/NOTICE").exists());
    }

    #[test]
    fn test_destination_rejects_parent_components() {
        let out = Path::new("/out");
        assert_eq!(
            destination(out, "lib/x86/libfoo.so").unwrap(),
            PathBuf::from("/out/lib/x86/libfoo.so")
        );
        assert_eq!(
            destination(out, "../etc/passwd").unwrap_err().code,
            ErrorCode::InvalidPath
        );
        assert!(destination(out, "").is_err());
    }
}
