//! Batch validation of query files.

use crate::query::diagnostics::{validate_with, Diagnostic, Severity};
use crate::session::AnalysisSession;
use anyhow::{Context, Result};
use globset::{Glob, GlobMatcher};
use ignore::WalkBuilder;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default pattern for query files found while walking directories
pub const DEFAULT_GLOB: &str = "*.dts";

/// Diagnostics for one checked file
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    #[serde(skip)]
    pub text: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl FileReport {
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }
}

/// Expand `paths` into the files to check. Files are taken as given;
/// directories are walked honouring ignore files and filtered by `glob`.
pub fn collect_files(paths: &[PathBuf], glob: &str) -> Result<Vec<PathBuf>> {
    let matcher: GlobMatcher = Glob::new(glob)
        .with_context(|| format!("Invalid glob pattern {}", glob))?
        .compile_matcher();

    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let walker = WalkBuilder::new(path)
                .hidden(true)
                .git_ignore(true)
                .filter_entry(|entry| {
                    let name = entry.file_name().to_string_lossy();
                    !matches!(name.as_ref(), ".git" | "node_modules" | "target")
                })
                .build();

            let mut found: Vec<PathBuf> = walker
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.path().is_file())
                .filter(|entry| {
                    entry
                        .path()
                        .file_name()
                        .is_some_and(|name| matcher.is_match(name))
                })
                .map(|entry| entry.into_path())
                .collect();
            found.sort();
            debug!(dir = %path.display(), files = found.len(), "walked directory");
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

fn check_file(session: &AnalysisSession, path: &Path) -> Result<FileReport> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let diagnostics = validate_with(&text, session.config());
    Ok(FileReport {
        path: path.to_path_buf(),
        text,
        diagnostics,
    })
}

/// Validate every file, in parallel when the `parallel` feature is enabled.
/// Reports come back in the order of `files`.
pub fn check_files(session: &AnalysisSession, files: &[PathBuf]) -> Result<Vec<FileReport>> {
    info!(files = files.len(), "checking query files");

    #[cfg(feature = "parallel")]
    let reports = files
        .par_iter()
        .map(|path| check_file(session, path))
        .collect::<Result<Vec<_>>>();

    #[cfg(not(feature = "parallel"))]
    let reports = files
        .iter()
        .map(|path| check_file(session, path))
        .collect::<Result<Vec<_>>>();

    reports
}

/// Validate text that did not come from a file (stdin)
pub fn check_text(session: &AnalysisSession, label: &str, text: String) -> FileReport {
    FileReport {
        path: PathBuf::from(label),
        diagnostics: validate_with(&text, session.config()),
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_files_filters_by_glob() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.dts"), "apple").unwrap();
        fs::write(dir.path().join("a.dts"), "pear").unwrap();
        fs::write(dir.path().join("notes.txt"), "AND").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("c.dts"), "plum").unwrap();

        let files = collect_files(&[dir.path().to_path_buf()], DEFAULT_GLOB).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a.dts", "b.dts", "sub/c.dts"]);
    }

    #[test]
    fn test_explicit_file_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("query.txt");
        fs::write(&path, "x").unwrap();
        assert_eq!(collect_files(&[path.clone()], DEFAULT_GLOB).unwrap(), vec![path]);
    }

    #[test]
    fn test_invalid_glob() {
        assert!(collect_files(&[], "[").is_err());
    }

    #[test]
    fn test_check_files_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.dts");
        let bad = dir.path().join("bad.dts");
        fs::write(&good, "apple AND pear").unwrap();
        fs::write(&bad, "AND apple\n(pear").unwrap();

        let session = AnalysisSession::default();
        let reports = check_files(&session, &[bad.clone(), good.clone()]).unwrap();
        assert_eq!(reports[0].path, bad);
        assert_eq!(reports[0].count(Severity::Error), 2);
        assert!(reports[1].diagnostics.is_empty());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let session = AnalysisSession::default();
        let err = check_files(&session, &[PathBuf::from("/nonexistent/q.dts")]).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
