//! Conversion runner: turn one source document into a text artifact.
//!
//! The actual conversion is delegated to an external program (calibre's
//! `ebook-convert` by default) invoked as
//! `<program> <source> <destination> <extra args...>`. The runner only looks
//! at the exit status, the stderr text and the resulting file. Every failure
//! becomes a [`ConversionOutcome::Skipped`]; nothing here aborts a batch.

use crate::error::{CrossfindError, SkipReason, DRM_HINT};
use crate::output::ConversionOutcome;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{info, warn};

/// What the converter process reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterRun {
    /// Standard-error text, diagnostic only.
    pub stderr: String,
}

/// A program that converts one document into plain text.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Preflight check run once before any folder is processed.
    async fn check(&self) -> Result<(), CrossfindError> {
        Ok(())
    }

    /// Convert `source` into `destination`.
    ///
    /// `Err` carries a human-readable description of a launch failure or a
    /// non-zero exit.
    async fn run(&self, source: &Path, destination: &Path) -> Result<ConverterRun, String>;
}

/// Runs an external converter executable as a child process.
#[derive(Debug, Clone)]
pub struct ProcessConverter {
    program: PathBuf,
    extra_args: Vec<String>,
}

impl ProcessConverter {
    pub fn new(program: impl Into<PathBuf>, extra_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            extra_args,
        }
    }
}

#[async_trait]
impl Converter for ProcessConverter {
    async fn check(&self) -> Result<(), CrossfindError> {
        let not_executable = |reason: String| CrossfindError::ConverterNotExecutable {
            path: self.program.clone(),
            reason,
        };
        let meta = tokio::fs::metadata(&self.program)
            .await
            .map_err(|e| not_executable(e.to_string()))?;
        if !meta.is_file() {
            return Err(not_executable("not a regular file".into()));
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if meta.permissions().mode() & 0o111 == 0 {
                return Err(not_executable("missing execute permission".into()));
            }
        }
        Ok(())
    }

    async fn run(&self, source: &Path, destination: &Path) -> Result<ConverterRun, String> {
        let output = Command::new(&self.program)
            .arg(source)
            .arg(destination)
            .args(&self.extra_args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| format!("failed to launch '{}': {}", self.program.display(), e))?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(if stderr.is_empty() {
                output.status.to_string()
            } else {
                format!("{}: {}", output.status, stderr)
            });
        }
        Ok(ConverterRun { stderr })
    }
}

/// Convert a single source and classify the result.
///
/// The destination's parent directory is created first (an existing
/// directory is fine). The artifact is accepted only when the converter
/// succeeded and the destination exists with a non-zero size.
pub async fn convert_one(
    converter: &dyn Converter,
    source: &Path,
    destination: &Path,
) -> ConversionOutcome {
    if let Some(parent) = destination.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            warn!("Could not create cache folder '{}': {}", parent.display(), e);
        }
    }

    info!("Converting '{}' to text...", source.display());
    let run = match converter.run(source, destination).await {
        Ok(run) => run,
        Err(detail) => {
            warn!(
                "Can't convert '{}' to '{}': {}",
                source.display(),
                destination.display(),
                detail
            );
            warn!("skipping '{}': {}", source.display(), DRM_HINT);
            return ConversionOutcome::Skipped(SkipReason::ConversionFailed { detail });
        }
    };

    if !run.stderr.is_empty() {
        warn!("Converter reported errors for '{}': {}", source.display(), run.stderr);
    }

    match tokio::fs::metadata(destination).await {
        Ok(meta) if meta.len() > 0 => ConversionOutcome::Converted(destination.to_path_buf()),
        Ok(_) => {
            warn!(
                "Output is empty for '{}'. Please check '{}'",
                destination.display(),
                source.display()
            );
            ConversionOutcome::Skipped(SkipReason::EmptyOutput)
        }
        Err(e) => {
            warn!("Could not create output for '{}': {}", source.display(), e);
            ConversionOutcome::Skipped(SkipReason::EmptyOutput)
        }
    }
}
