//! Sequential folder pipeline: cache check, then conversion, one file at a time.
//!
//! ## Why sequential?
//!
//! A single `ebook-convert` process can take hundreds of megabytes and a
//! full core. The folder is therefore turned into an explicit list of work
//! items up front and a single loop drains it, so at most one converter
//! process exists at any moment. The position of each accepted entry in
//! the resulting [`FileSet`] is its index for the rest of the run.

use crate::config::CrossfindConfig;
use crate::error::{CrossfindError, SkipReason};
use crate::output::{ConversionOutcome, FileSet, FolderRun, SkippedEntry};
use crate::pipeline::cache::{self, InvalidReason, Validation};
use crate::pipeline::converter::{self, Converter};
use crate::progress::PipelineProgressCallback;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One directory entry waiting to be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Basename shown in the report.
    pub name: String,
    /// Absolute path of the source document.
    pub source: PathBuf,
    /// Absolute path of its text artifact.
    pub artifact: PathBuf,
}

/// Resolve `folder` against the working directory and check it is a directory.
pub async fn resolve_folder(folder: &Path) -> Result<PathBuf, CrossfindError> {
    let absolute = if folder.is_absolute() {
        folder.to_path_buf()
    } else {
        std::path::absolute(folder).map_err(|e| CrossfindError::FolderReadFailed {
            path: folder.to_path_buf(),
            source: e,
        })?
    };

    match tokio::fs::metadata(&absolute).await {
        Ok(meta) if meta.is_dir() => Ok(absolute),
        Ok(_) => Err(CrossfindError::NotADirectory { path: absolute }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(CrossfindError::FolderNotFound { path: absolute })
        }
        Err(e) => Err(CrossfindError::FolderReadFailed {
            path: absolute,
            source: e,
        }),
    }
}

/// List `folder` once, in enumeration order, and compute every artifact path.
pub async fn plan_folder(folder: &Path, cache_subfolder: &str) -> Result<Vec<WorkItem>, CrossfindError> {
    let read_err = |e| CrossfindError::FolderReadFailed {
        path: folder.to_path_buf(),
        source: e,
    };
    let mut dir = tokio::fs::read_dir(folder).await.map_err(read_err)?;
    let mut items = Vec::new();
    while let Some(entry) = dir.next_entry().await.map_err(read_err)? {
        let file_name = entry.file_name();
        let source = folder.join(&file_name);
        items.push(WorkItem {
            name: file_name.to_string_lossy().into_owned(),
            artifact: cache::cache_path_for(folder, cache_subfolder, Path::new(&file_name)),
            source,
        });
    }
    Ok(items)
}

/// Process one work item: reuse its artifact or run the converter.
pub async fn process_item(item: &WorkItem, converter: &dyn Converter) -> ConversionOutcome {
    match cache::validate(&item.source, &item.artifact).await {
        Validation::Usable => {
            info!("Found cached version of '{}'", item.source.display());
            ConversionOutcome::CacheHit(item.artifact.clone())
        }
        Validation::Invalid(InvalidReason::NotAFile) => {
            debug!("Ignoring '{}': not a regular file", item.source.display());
            ConversionOutcome::Skipped(SkipReason::NotAFile)
        }
        Validation::Invalid(reason) => {
            debug!("Cache miss for '{}': {}", item.source.display(), reason);
            converter::convert_one(converter, &item.source, &item.artifact).await
        }
    }
}

/// Run the pipeline over every entry of `folder`.
///
/// # Errors
/// Fails only when the folder is missing, is not a directory or cannot be
/// listed. Per-file problems end up in [`FolderRun::skipped`].
pub async fn process_folder(
    folder: &Path,
    config: &CrossfindConfig,
    converter: &dyn Converter,
    progress: &dyn PipelineProgressCallback,
) -> Result<FolderRun, CrossfindError> {
    let folder = resolve_folder(folder).await?;
    let items = plan_folder(&folder, &config.cache_subfolder).await?;
    let total = items.len();
    info!("Processing {} entries in '{}'", total, folder.display());
    progress.on_folder_start(&folder, total);

    let mut run = FolderRun {
        folder: folder.clone(),
        files: FileSet::new(),
        ..Default::default()
    };

    for (index, item) in items.iter().enumerate() {
        progress.on_entry_start(index, total, &item.name);
        let outcome = process_item(item, converter).await;

        match &outcome {
            ConversionOutcome::CacheHit(artifact) => {
                run.cache_hits += 1;
                run.files.push(item.name.clone(), artifact.clone());
            }
            ConversionOutcome::Converted(artifact) => {
                run.converted += 1;
                run.files.push(item.name.clone(), artifact.clone());
            }
            ConversionOutcome::Skipped(reason) => {
                let skipped = SkippedEntry {
                    source: item.source.clone(),
                    reason: reason.clone(),
                };
                if reason.is_warning() {
                    warn!("{}", skipped);
                }
                run.skipped.push(skipped);
            }
        }

        progress.on_entry_complete(index, total, &item.name, &outcome);
    }

    info!(
        "Finished '{}': {} usable ({} cached, {} converted), {} skipped",
        folder.display(),
        run.files.len(),
        run.cache_hits,
        run.converted,
        run.warnings().count()
    );
    progress.on_folder_complete(&folder, run.files.len(), total);
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::converter::ConverterRun;
    use crate::progress::NoopProgressCallback;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every source it was asked to convert; fails for names containing "drm".
    #[derive(Default)]
    struct RecordingConverter {
        calls: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl Converter for RecordingConverter {
        async fn run(&self, source: &Path, destination: &Path) -> Result<ConverterRun, String> {
            self.calls.lock().unwrap().push(source.to_path_buf());
            if source.to_string_lossy().contains("drm") {
                return Err("exit status: 1".into());
            }
            std::fs::write(destination, "converted text").map_err(|e| e.to_string())?;
            Ok(ConverterRun { stderr: String::new() })
        }
    }

    #[tokio::test]
    async fn missing_folder_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let conv = RecordingConverter::default();
        let err = process_folder(
            &dir.path().join("nope"),
            &CrossfindConfig::default(),
            &conv,
            &NoopProgressCallback,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CrossfindError::FolderNotFound { .. }));
        assert!(conv.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_instead_of_folder_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.epub");
        std::fs::write(&file, "x").unwrap();
        let err = resolve_folder(&file).await.unwrap_err();
        assert!(matches!(err, CrossfindError::NotADirectory { .. }));
    }

    #[tokio::test]
    async fn plan_computes_cache_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("one.epub"), "x").unwrap();
        let items = plan_folder(dir.path(), "cache").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "one.epub");
        assert_eq!(items[0].artifact, dir.path().join("cache").join("one.txt"));
    }

    #[tokio::test]
    async fn failure_does_not_stop_later_entries() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["x-drm.epub", "y.epub", "z.epub"] {
            std::fs::write(dir.path().join(name), "book").unwrap();
        }
        let conv = RecordingConverter::default();
        let run = process_folder(dir.path(), &CrossfindConfig::default(), &conv, &NoopProgressCallback)
            .await
            .unwrap();

        assert_eq!(conv.calls.lock().unwrap().len(), 3, "every file attempted");
        assert_eq!(run.files.len(), 2);
        assert_eq!(run.converted, 2);
        let mut names = run.files.names();
        names.sort_unstable();
        assert_eq!(names, vec!["y.epub", "z.epub"]);
        let warnings: Vec<_> = run.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].to_string().contains("x-drm.epub"));
    }

    #[tokio::test]
    async fn sub_folders_are_silently_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("extras")).unwrap();
        std::fs::write(dir.path().join("a.epub"), "book").unwrap();
        let conv = RecordingConverter::default();
        let run = process_folder(dir.path(), &CrossfindConfig::default(), &conv, &NoopProgressCallback)
            .await
            .unwrap();

        assert_eq!(conv.calls.lock().unwrap().len(), 1);
        assert_eq!(run.files.names(), vec!["a.epub"]);
        assert_eq!(run.warnings().count(), 0);
    }

    #[tokio::test]
    async fn second_run_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.epub");
        std::fs::write(&src, "book").unwrap();
        filetime::set_file_mtime(&src, filetime::FileTime::from_unix_time(1_000_000, 0)).unwrap();

        let conv = RecordingConverter::default();
        let config = CrossfindConfig::default();
        let first = process_folder(dir.path(), &config, &conv, &NoopProgressCallback).await.unwrap();
        assert_eq!(first.converted, 1);

        let second = process_folder(dir.path(), &config, &conv, &NoopProgressCallback).await.unwrap();
        assert_eq!(second.cache_hits, 1);
        assert_eq!(second.converted, 0);
        assert_eq!(conv.calls.lock().unwrap().len(), 1, "converter not re-run");
        assert_eq!(first.files, second.files);
    }
}
