//! Error types for the ebook-crossfind library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`CrossfindError`] — **Fatal**: the run cannot proceed at all
//!   (missing folder, converter not executable, nothing to compare, the
//!   engine failed, the report could not be written). Returned as
//!   `Err(CrossfindError)` from [`crate::run::run`] and friends.
//!
//! * [`SkipReason`] — **Non-fatal**: a single source file could not be
//!   turned into a usable text artifact (DRM-protected book, converter
//!   produced nothing). Stored inside [`crate::output::SkippedEntry`] so the
//!   batch carries on with the remaining files.

use std::path::PathBuf;
use thiserror::Error;

/// Remediation hint attached to every failed conversion.
///
/// Protected titles are by far the most common reason `ebook-convert` exits
/// non-zero.
pub const DRM_HINT: &str = "This is most likely due to DRM issues. Try using the DeDRM plugin \
(https://apprenticealf.wordpress.com/2012/09/10/calibre-plugins-the-simplest-option-for-removing-most-ebook-drm/) \
for calibre and manually import the book";

/// All fatal errors returned by the ebook-crossfind library.
///
/// Per-file failures use [`SkipReason`] and never surface here.
#[derive(Debug, Error)]
pub enum CrossfindError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// Input folder does not exist.
    #[error("Folder not found: '{path}'\nCheck the path exists and is readable.")]
    FolderNotFound { path: PathBuf },

    /// Input path exists but is not a directory.
    #[error("'{path}' is not a folder.")]
    NotADirectory { path: PathBuf },

    /// Left and right folders resolve to the same directory.
    #[error("Left and right folders are the same directory: '{path}'\nCompare two different folders.")]
    IdenticalFolders { path: PathBuf },

    /// The converter executable is missing or cannot be executed.
    #[error("Cannot open '{path}' as an executable: {reason}\nPass the full path to ebook-convert with --converter.")]
    ConverterNotExecutable { path: PathBuf, reason: String },

    /// A folder produced no usable text artifacts.
    #[error("Did not find any files to compare against in '{path}'")]
    EmptyFileSet { path: PathBuf },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not list the entries of an input folder.
    #[error("Failed to list folder '{path}': {source}")]
    FolderReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A cached text artifact vanished or became unreadable before loading.
    #[error("Failed to read text artifact '{path}': {source}")]
    ArtifactReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the report file.
    #[error("Failed to write report '{path}': {source}")]
    ReportWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Comparison errors ─────────────────────────────────────────────────
    /// The comparison engine reported an error.
    #[error("Failed to compare: {0}")]
    EngineFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a source file was left out of its [`crate::output::FileSet`].
///
/// Only [`SkipReason::NotAFile`] is silent; the others are logged as warnings.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum SkipReason {
    /// Entry is a sub-folder or other non-regular file.
    #[error("not a regular file")]
    NotAFile,

    /// The converter could not be launched or exited non-zero.
    #[error("conversion failed: {detail}. {}", DRM_HINT)]
    ConversionFailed { detail: String },

    /// The converter reported success but wrote nothing usable.
    #[error("converter output is empty")]
    EmptyOutput,
}

impl SkipReason {
    /// `true` when the skip should be reported to the user.
    pub fn is_warning(&self) -> bool {
        !matches!(self, SkipReason::NotAFile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_set_names_folder() {
        let e = CrossfindError::EmptyFileSet {
            path: PathBuf::from("/books/left"),
        };
        assert!(e.to_string().contains("/books/left"), "got: {e}");
    }

    #[test]
    fn conversion_failed_carries_drm_hint() {
        let r = SkipReason::ConversionFailed {
            detail: "exit status: 1".into(),
        };
        let msg = r.to_string();
        assert!(msg.contains("exit status: 1"));
        assert!(msg.contains("DRM"));
        assert!(msg.contains("DeDRM"));
    }

    #[test]
    fn not_a_file_is_silent() {
        assert!(!SkipReason::NotAFile.is_warning());
        assert!(SkipReason::EmptyOutput.is_warning());
    }

    #[test]
    fn converter_error_display() {
        let e = CrossfindError::ConverterNotExecutable {
            path: PathBuf::from("/opt/calibre/ebook-convert"),
            reason: "permission denied".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("ebook-convert"));
        assert!(msg.contains("permission denied"));
    }
}
