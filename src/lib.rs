//! # ebook-crossfind
//!
//! Find passages shared between two folders of e-books.
//!
//! ## Why this crate?
//!
//! Checking a stack of submissions against a stack of originals by hand does
//! not scale, and e-book formats (EPUB, MOBI, AZW3, PDF) are not text. This
//! crate converts every document to plain text with calibre's
//! `ebook-convert`, caches the result next to the source, compares every
//! left text against every right text and writes one self-contained HTML
//! report with cross-linked matches.
//!
//! ## Pipeline Overview
//!
//! ```text
//! left/ right/
//!  │
//!  ├─ 1. Preflight  converter executable, folders exist and differ
//!  ├─ 2. Prepare    per folder, one file at a time: cache check or convert
//!  ├─ 3. Load       read + normalise every accepted artifact
//!  ├─ 4. Compare    ComparisonEngine over left × right
//!  └─ 5. Report     summary + detail HTML, written atomically
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ebook_crossfind::{run, CrossfindConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CrossfindConfig::builder()
//!         .left_folder("originals")
//!         .right_folder("submissions")
//!         .build()?;
//!     let summary = run(&config).await?;
//!     eprintln!(
//!         "{} pairs share phrases, report at {}",
//!         summary.pairs_with_matches,
//!         summary.report_path.display()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `crossfind` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! ebook-crossfind = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod run;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{CompareOptions, CrossfindConfig, CrossfindConfigBuilder};
pub use engine::{CommandEngine, ComparisonEngine, ComparisonResult, MatchTable, PhraseEngine};
pub use error::{CrossfindError, SkipReason};
pub use output::{ConversionOutcome, FileEntry, FileSet, FolderRun, RunSummary, SkippedEntry};
pub use pipeline::converter::{Converter, ProcessConverter};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
pub use report::ReportDocument;
pub use run::{run, run_sync, run_with};
