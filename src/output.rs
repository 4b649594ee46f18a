//! Result types produced by the conversion pipeline.
//!
//! A run produces one [`FolderRun`] per input folder. Its [`FileSet`] is the
//! ordered list of usable text artifacts; the position of an entry in that
//! list is the index the comparison engine and the report use for it, so
//! entries are only ever appended, never reordered or removed.

use crate::error::SkipReason;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One successfully prepared source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Basename of the original source file, e.g. `gazing into the eternal.epub`.
    pub name: String,
    /// Absolute path of the non-empty text artifact.
    pub artifact: PathBuf,
}

/// Ordered `(display name, artifact path)` pairs for one folder.
///
/// Order matches directory-listing order; duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSet {
    entries: Vec<FileEntry>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry; its index is the current length.
    pub fn push(&mut self, name: impl Into<String>, artifact: impl Into<PathBuf>) -> usize {
        self.entries.push(FileEntry {
            name: name.into(),
            artifact: artifact.into(),
        });
        self.entries.len() - 1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FileEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileEntry> {
        self.entries.iter()
    }

    /// Display names in index order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a FileSet {
    type Item = &'a FileEntry;
    type IntoIter = std::slice::Iter<'a, FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// What happened to a single source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionOutcome {
    /// A fresh, non-empty artifact already existed; the converter was not run.
    CacheHit(PathBuf),
    /// The converter ran and produced a non-empty artifact.
    Converted(PathBuf),
    /// No usable artifact; the file is excluded from its [`FileSet`].
    Skipped(SkipReason),
}

impl ConversionOutcome {
    /// The usable artifact path, if any.
    pub fn artifact(&self) -> Option<&Path> {
        match self {
            ConversionOutcome::CacheHit(p) | ConversionOutcome::Converted(p) => Some(p),
            ConversionOutcome::Skipped(_) => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ConversionOutcome::Skipped(_))
    }
}

/// A source file that did not make it into the [`FileSet`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEntry {
    pub source: PathBuf,
    pub reason: SkipReason,
}

impl std::fmt::Display for SkippedEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "skipping '{}': {}", self.source.display(), self.reason)
    }
}

/// Everything the pipeline learned about one input folder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FolderRun {
    /// Absolute path of the processed folder.
    pub folder: PathBuf,
    /// Usable artifacts in processing order.
    pub files: FileSet,
    /// Sources that were excluded, with the reason.
    pub skipped: Vec<SkippedEntry>,
    /// Entries served from the cache subfolder.
    pub cache_hits: usize,
    /// Entries converted during this run.
    pub converted: usize,
}

impl FolderRun {
    /// Skipped entries that deserve a user-visible warning.
    pub fn warnings(&self) -> impl Iterator<Item = &SkippedEntry> {
        self.skipped.iter().filter(|s| s.reason.is_warning())
    }
}

/// Summary of a complete run, returned by [`crate::run::run`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Where the report was written.
    pub report_path: PathBuf,
    pub left: FolderRun,
    pub right: FolderRun,
    /// Number of left×right pairs with at least one match.
    pub pairs_with_matches: usize,
    /// Time spent inside the comparison engine.
    pub comparison_ms: u64,
    /// Wall-clock time of the whole run.
    pub total_duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_returns_stable_index() {
        let mut set = FileSet::new();
        assert_eq!(set.push("a.epub", "/c/a.txt"), 0);
        assert_eq!(set.push("b.epub", "/c/b.txt"), 1);
        assert_eq!(set.push("a.epub", "/c/a.txt"), 2, "duplicates are kept");
        assert_eq!(set.names(), vec!["a.epub", "b.epub", "a.epub"]);
        assert_eq!(set.get(1).map(|e| e.artifact.as_path()), Some(Path::new("/c/b.txt")));
    }

    #[test]
    fn outcome_artifact() {
        let hit = ConversionOutcome::CacheHit(PathBuf::from("/c/a.txt"));
        assert_eq!(hit.artifact(), Some(Path::new("/c/a.txt")));
        let skip = ConversionOutcome::Skipped(SkipReason::EmptyOutput);
        assert!(skip.is_skipped());
        assert_eq!(skip.artifact(), None);
    }

    #[test]
    fn skipped_entry_names_path() {
        let s = SkippedEntry {
            source: PathBuf::from("/books/b.epub"),
            reason: SkipReason::EmptyOutput,
        };
        let msg = s.to_string();
        assert!(msg.contains("/books/b.epub"));
        assert!(msg.contains("empty"));
    }

    #[test]
    fn warnings_hide_directories() {
        let run = FolderRun {
            skipped: vec![
                SkippedEntry {
                    source: PathBuf::from("/books/cache"),
                    reason: SkipReason::NotAFile,
                },
                SkippedEntry {
                    source: PathBuf::from("/books/x.epub"),
                    reason: SkipReason::EmptyOutput,
                },
            ],
            ..Default::default()
        };
        assert_eq!(run.warnings().count(), 1);
    }
}
