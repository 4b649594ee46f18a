//! Progress-callback trait for per-file pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::CrossfindConfigBuilder::progress_callback`] to receive
//! events as each folder is listed, each file is served from the cache or
//! converted, and the comparison runs.
//!
//! # Example
//!
//! ```rust
//! use ebook_crossfind::{ConversionOutcome, CrossfindConfig, PipelineProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     converted: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for CountingCallback {
//!     fn on_entry_complete(&self, _index: usize, _total: usize, name: &str, outcome: &ConversionOutcome) {
//!         if matches!(outcome, ConversionOutcome::Converted(_)) {
//!             let n = self.converted.fetch_add(1, Ordering::SeqCst) + 1;
//!             eprintln!("{name} converted ({n} so far)");
//!         }
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { converted: AtomicUsize::new(0) });
//! let config = CrossfindConfig::builder()
//!     .progress_callback(cb as Arc<dyn PipelineProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::ConversionOutcome;
use std::path::Path;
use std::sync::Arc;

/// Called by the pipeline as it works through both folders.
///
/// Events arrive strictly in order: the pipeline never processes two
/// entries at once. All methods have default no-op implementations so
/// callers only override what they care about.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once per folder after it has been listed.
    ///
    /// # Arguments
    /// * `folder`        — absolute folder path
    /// * `total_entries` — number of directory entries about to be processed
    fn on_folder_start(&self, folder: &Path, total_entries: usize) {
        let _ = (folder, total_entries);
    }

    /// Called before the cache check for an entry.
    ///
    /// # Arguments
    /// * `index` — 0-based position in the directory listing
    /// * `total` — entries in the folder
    /// * `name`  — basename of the entry
    fn on_entry_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called once the entry's outcome is known.
    fn on_entry_complete(&self, index: usize, total: usize, name: &str, outcome: &ConversionOutcome) {
        let _ = (index, total, name, outcome);
    }

    /// Called after the last entry of a folder.
    ///
    /// # Arguments
    /// * `accepted` — entries that made it into the folder's file set
    /// * `total`    — entries in the folder
    fn on_folder_complete(&self, folder: &Path, accepted: usize, total: usize) {
        let _ = (folder, accepted, total);
    }

    /// Called before the text sets are handed to the comparison engine.
    fn on_comparison_start(&self, left_files: usize, right_files: usize) {
        let _ = (left_files, right_files);
    }

    /// Called when the engine has returned.
    fn on_comparison_complete(&self, elapsed_ms: u64) {
        let _ = elapsed_ms;
    }

    /// Called after the report has been written.
    fn on_report_written(&self, path: &Path) {
        let _ = path;
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::CrossfindConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SkipReason;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        hits: AtomicUsize,
        skips: AtomicUsize,
        accepted: AtomicUsize,
    }

    impl PipelineProgressCallback for TrackingCallback {
        fn on_entry_start(&self, _index: usize, _total: usize, _name: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_entry_complete(&self, _index: usize, _total: usize, _name: &str, outcome: &ConversionOutcome) {
            match outcome {
                ConversionOutcome::CacheHit(_) => self.hits.fetch_add(1, Ordering::SeqCst),
                ConversionOutcome::Skipped(_) => self.skips.fetch_add(1, Ordering::SeqCst),
                ConversionOutcome::Converted(_) => 0,
            };
        }

        fn on_folder_complete(&self, _folder: &Path, accepted: usize, _total: usize) {
            self.accepted.store(accepted, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_folder_start(Path::new("/books"), 3);
        cb.on_entry_start(0, 3, "a.epub");
        cb.on_entry_complete(0, 3, "a.epub", &ConversionOutcome::Skipped(SkipReason::EmptyOutput));
        cb.on_folder_complete(Path::new("/books"), 0, 3);
        cb.on_comparison_start(1, 1);
        cb.on_comparison_complete(12);
        cb.on_report_written(Path::new("results.html"));
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_entry_start(0, 2, "a.epub");
        tracker.on_entry_complete(0, 2, "a.epub", &ConversionOutcome::CacheHit(PathBuf::from("/c/a.txt")));
        tracker.on_entry_start(1, 2, "b.epub");
        tracker.on_entry_complete(
            1,
            2,
            "b.epub",
            &ConversionOutcome::Skipped(SkipReason::ConversionFailed {
                detail: "exit status: 1".into(),
            }),
        );
        tracker.on_folder_complete(Path::new("/books"), 1, 2);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.hits.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.skips.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.accepted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn PipelineProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_folder_start(Path::new("/books"), 10);
        cb.on_entry_start(0, 10, "a.epub");
    }
}
