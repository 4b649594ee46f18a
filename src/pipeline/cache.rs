//! Cache validation: decide whether a previously converted artifact can be reused.
//!
//! The cache is nothing more than the text files themselves. Validity is
//! recomputed from file metadata on every run; stale artifacts are never
//! deleted, the next conversion simply overwrites them.

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Outcome of checking a candidate artifact against its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// Artifact exists, is newer than the source and is non-empty.
    Usable,
    /// Artifact must not be used.
    Invalid(InvalidReason),
}

/// Why a cached artifact cannot be reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    /// Source is a folder or other non-regular entry. Nothing to convert.
    NotAFile,
    /// Source metadata could not be read; let the converter decide.
    SourceUnreadable(String),
    /// No artifact at the cache path.
    Missing,
    /// Artifact is not strictly newer than the source.
    Stale,
    /// Artifact has zero bytes.
    Empty,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidReason::NotAFile => f.write_str("source is not a regular file"),
            InvalidReason::SourceUnreadable(e) => write!(f, "source metadata unavailable: {e}"),
            InvalidReason::Missing => f.write_str("never converted"),
            InvalidReason::Stale => f.write_str("cache is invalid, source changed"),
            InvalidReason::Empty => f.write_str("cached output is empty"),
        }
    }
}

impl InvalidReason {
    /// Whether the pipeline should run the converter for this entry.
    pub fn needs_conversion(&self) -> bool {
        !matches!(self, InvalidReason::NotAFile)
    }
}

/// Check `candidate` against `source` using filesystem metadata only.
pub async fn validate(source: &Path, candidate: &Path) -> Validation {
    let src_meta = match tokio::fs::metadata(source).await {
        Ok(m) => m,
        Err(e) => return Validation::Invalid(InvalidReason::SourceUnreadable(e.to_string())),
    };
    if !src_meta.is_file() {
        return Validation::Invalid(InvalidReason::NotAFile);
    }

    let dst_meta = match tokio::fs::metadata(candidate).await {
        Ok(m) => m,
        Err(_) => return Validation::Invalid(InvalidReason::Missing),
    };

    // A platform without mtimes gives us no way to prove freshness.
    let (src_mtime, dst_mtime) = match (src_meta.modified(), dst_meta.modified()) {
        (Ok(s), Ok(d)) => (s, d),
        _ => return Validation::Invalid(InvalidReason::Stale),
    };
    if dst_mtime <= src_mtime {
        debug!("Cached version of '{}' is invalid", source.display());
        return Validation::Invalid(InvalidReason::Stale);
    }
    if dst_meta.len() == 0 {
        debug!("Cached version of '{}' is empty", source.display());
        return Validation::Invalid(InvalidReason::Empty);
    }

    Validation::Usable
}

/// Deterministic artifact location for a folder entry:
/// `<folder>/<cache_subfolder>/<basename-without-extension>.txt`.
pub fn cache_path_for(folder: &Path, cache_subfolder: &str, entry: &Path) -> PathBuf {
    let stem = entry
        .file_stem()
        .or_else(|| entry.file_name())
        .unwrap_or_else(|| OsStr::new("untitled"));
    let mut name = stem.to_os_string();
    name.push(".txt");
    folder.join(cache_subfolder).join(name)
}
