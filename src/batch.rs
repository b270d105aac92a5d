//! Parallel analysis of many files.
//!
//! Every file is an independent unit with its own result; one failure never
//! affects the others. Results keep the input order.

use crate::complexity::ComplexityLabel;
use crate::config::AnalysisConfig;
use crate::core::{Result, SourceUnit};
use crate::pipeline::{analyze, AnalysisReport};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

const SKIPPED_DIRECTORIES: &[&str] = &["__pycache__", "node_modules", "venv", "site-packages"];

#[derive(Debug)]
pub struct FileAnalysisResult {
    pub path: PathBuf,
    pub result: Result<AnalysisReport>,
    pub analysis_time: Duration,
}

/// Flat, serializable view of one batch entry.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BatchRow {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<ComplexityLabel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    pub matches: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileAnalysisResult {
    pub fn row(&self) -> BatchRow {
        match &self.result {
            Ok(report) => BatchRow {
                path: self.path.clone(),
                label: Some(report.classification.label),
                score: Some(report.classification.score),
                matches: report.matches.len(),
                error: None,
            },
            Err(e) => BatchRow {
                path: self.path.clone(),
                label: None,
                score: None,
                matches: 0,
                error: Some(e.to_string()),
            },
        }
    }
}

fn is_skipped(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRECTORIES.contains(&name.as_ref())
}

/// All `*.py` files under `root`, sorted.
pub fn discover_python_files(root: &Path) -> Vec<PathBuf> {
    let mut skipped_count = 0;
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| !is_skipped(entry))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                if skipped_count < 10 {
                    warn!("Skipping directory entry: {err}");
                }
                skipped_count += 1;
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(DirEntry::into_path)
        .filter(|path| path.extension().is_some_and(|ext| ext == "py"))
        .collect();
    files.sort();
    debug!(count = files.len(), root = %root.display(), "discovered python files");
    files
}

pub fn analyze_file(path: &Path, config: &AnalysisConfig) -> Result<AnalysisReport> {
    let source = fs::read_to_string(path)?;
    let unit = SourceUnit::parse_with_path(source, path)?;
    analyze(&unit, config)
}

pub fn analyze_batch(paths: &[PathBuf], config: &AnalysisConfig) -> Vec<FileAnalysisResult> {
    paths
        .par_iter()
        .map(|path| {
            let start = Instant::now();
            let result = analyze_file(path, config);
            if let Err(e) = &result {
                warn!(path = %path.display(), error = %e, "analysis failed");
            }
            FileAnalysisResult {
                path: path.clone(),
                result,
                analysis_time: start.elapsed(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Error;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discovery_skips_hidden_and_cache_dirs() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("pkg")).unwrap();
        fs::create_dir_all(dir.path().join(".venv")).unwrap();
        fs::create_dir_all(dir.path().join("__pycache__")).unwrap();
        fs::write(dir.path().join("b.py"), "x = 1\n").unwrap();
        fs::write(dir.path().join("pkg/a.py"), "y = 2\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "hi\n").unwrap();
        fs::write(dir.path().join(".venv/lib.py"), "z = 3\n").unwrap();
        fs::write(dir.path().join("__pycache__/c.py"), "z = 3\n").unwrap();

        let files = discover_python_files(dir.path());
        assert_eq!(files, vec![dir.path().join("b.py"), dir.path().join("pkg/a.py")]);
    }

    #[test]
    fn test_batch_isolates_failures() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.py");
        let bad = dir.path().join("bad.py");
        let missing = dir.path().join("missing.py");
        fs::write(&good, "for x in xs:\n    print(x)\n").unwrap();
        fs::write(&bad, "def broken(:\n").unwrap();

        let results = analyze_batch(
            &[good.clone(), bad.clone(), missing.clone()],
            &AnalysisConfig::default(),
        );
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].path, good);
        assert!(results[0].result.is_ok());
        assert!(matches!(results[1].result, Err(Error::Parse { .. })));
        assert!(matches!(results[2].result, Err(Error::Io(_))));

        let row = results[0].row();
        assert_eq!(row.label, Some(ComplexityLabel::Linear));
        assert_eq!(row.matches, 1);
        assert!(results[1].row().error.is_some());
    }
}
