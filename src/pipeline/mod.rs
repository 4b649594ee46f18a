//! Pipeline stages for preparing a folder of books for comparison.
//!
//! Each submodule implements exactly one step, so each is independently
//! testable.
//!
//! ## Data Flow
//!
//! ```text
//! folder ──▶ cache ──▶ converter ──▶ FileSet ──▶ load + normalize
//! (listing)  (mtime)   (ebook-convert)           (in-memory text)
//! ```
//!
//! 1. [`folder`]    — list a folder once and drain the work list strictly
//!    one entry at a time
//! 2. [`cache`]     — decide from file metadata whether an earlier artifact
//!    is still valid
//! 3. [`converter`] — run the external converter and classify its result
//! 4. [`load`]      — read accepted artifacts in index order
//! 5. [`normalize`] — whitespace cleanup applied to every loaded text

pub mod cache;
pub mod converter;
pub mod folder;
pub mod load;
pub mod normalize;
