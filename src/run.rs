//! Top-level entry points: prepare both folders, compare, write the report.
//!
//! [`run`] wires the configured converter executable and engine together.
//! [`run_with`] takes them as trait objects so tests and embedders can
//! substitute their own.

use crate::config::CrossfindConfig;
use crate::engine::{CommandEngine, ComparisonEngine, PhraseEngine};
use crate::error::CrossfindError;
use crate::output::RunSummary;
use crate::pipeline::converter::{Converter, ProcessConverter};
use crate::pipeline::{folder, load};
use crate::progress::{NoopProgressCallback, PipelineProgressCallback};
use crate::report;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Cross-compare the configured folders and write the HTML report.
///
/// # Errors
/// Returns `Err(CrossfindError)` for fatal errors only:
/// - converter missing or not executable
/// - left and right folder are the same
/// - a folder is missing, not a directory or unreadable
/// - either folder yields no usable text
/// - the engine fails or the report cannot be written
///
/// Per-file conversion failures are logged and listed in
/// [`crate::FolderRun::skipped`]; they never fail the run.
pub async fn run(config: &CrossfindConfig) -> Result<RunSummary, CrossfindError> {
    let converter = ProcessConverter::new(&config.converter, config.converter_args.clone());
    let engine: Box<dyn ComparisonEngine> = match &config.engine_command {
        Some(program) => Box::new(CommandEngine::new(program)),
        None => Box::new(PhraseEngine),
    };
    run_with(config, &converter, engine.as_ref()).await
}

/// Like [`run`], with an explicit converter and engine.
pub async fn run_with(
    config: &CrossfindConfig,
    converter: &dyn Converter,
    engine: &dyn ComparisonEngine,
) -> Result<RunSummary, CrossfindError> {
    let total_start = Instant::now();
    let noop = NoopProgressCallback;
    let progress: &dyn PipelineProgressCallback = match &config.progress_callback {
        Some(cb) => cb.as_ref(),
        None => &noop,
    };

    // ── Step 1: Converter preflight ──────────────────────────────────────
    converter.check().await?;

    // ── Step 2: Validate folders ─────────────────────────────────────────
    reject_identical(&config.left_folder, &config.right_folder)?;
    let left_folder = folder::resolve_folder(&config.left_folder).await?;
    let right_folder = folder::resolve_folder(&config.right_folder).await?;
    if same_target(&left_folder, &right_folder).await {
        return Err(CrossfindError::IdenticalFolders { path: left_folder });
    }

    // ── Step 3: Prepare left, then right ─────────────────────────────────
    let left = folder::process_folder(&left_folder, config, converter, progress).await?;
    let right = folder::process_folder(&right_folder, config, converter, progress).await?;
    for side in [&left, &right] {
        if side.files.is_empty() {
            return Err(CrossfindError::EmptyFileSet {
                path: side.folder.clone(),
            });
        }
    }

    // ── Step 4: Load texts ───────────────────────────────────────────────
    let left_texts = load::load_normalized(&left.files).await?;
    let right_texts = load::load_normalized(&right.files).await?;

    // ── Step 5: Compare ──────────────────────────────────────────────────
    info!(
        "Comparing {} × {} texts with the {} engine",
        left.files.len(),
        right.files.len(),
        engine.name()
    );
    progress.on_comparison_start(left.files.len(), right.files.len());
    let result = engine.compare(left_texts, right_texts, &config.compare).await?;
    progress.on_comparison_complete(result.execution_time_ms);

    // ── Step 6: Aggregate and write ──────────────────────────────────────
    let document = report::aggregate(
        &left.folder,
        &right.folder,
        &left.files,
        &right.files,
        &result,
        &config.compare,
    )?;
    let report_path = absolute(&config.report_path)?;
    report::write_report(&report_path, &document).await?;
    progress.on_report_written(&report_path);

    let summary = RunSummary {
        report_path,
        pairs_with_matches: document.pairs_with_matches(),
        comparison_ms: result.execution_time_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        left,
        right,
    };
    info!(
        "Run complete: {} of {} pairs share phrases ({}ms total)",
        summary.pairs_with_matches,
        document.summary.len(),
        summary.total_duration_ms
    );
    Ok(summary)
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime. Do not call from within an existing
/// async runtime; use [`run`] there instead.
pub fn run_sync(config: &CrossfindConfig) -> Result<RunSummary, CrossfindError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CrossfindError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run(config))
}

fn absolute(path: &Path) -> Result<PathBuf, CrossfindError> {
    std::path::absolute(path).map_err(|e| CrossfindError::ReportWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Lexical check, before anything touches the filesystem.
fn reject_identical(left: &Path, right: &Path) -> Result<(), CrossfindError> {
    let l = std::path::absolute(left).ok();
    let r = std::path::absolute(right).ok();
    match (l, r) {
        (Some(l), Some(r)) if l.components().eq(r.components()) => {
            Err(CrossfindError::IdenticalFolders { path: l })
        }
        _ => Ok(()),
    }
}

/// Catches `a` vs `a/../a` and symlinked folders once both exist.
async fn same_target(left: &Path, right: &Path) -> bool {
    match (
        tokio::fs::canonicalize(left).await,
        tokio::fs::canonicalize(right).await,
    ) {
        (Ok(l), Ok(r)) => {
            debug!("Canonical folders: '{}' and '{}'", l.display(), r.display());
            l == r
        }
        _ => false,
    }
}
