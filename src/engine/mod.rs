//! Comparison engines: find shared phrases between two sets of texts.
//!
//! The pipeline only depends on the [`ComparisonEngine`] trait. Two
//! implementations ship with the crate:
//!
//! * [`PhraseEngine`] — built-in word-phrase matcher (default)
//! * [`CommandEngine`] — any external program speaking the JSON protocol
//!   described in [`external`]
//!
//! Both return a [`MatchTable`] indexed by the stable [`crate::FileSet`]
//! indices of the two sides, plus an optional pre-rendered HTML fragment.

pub mod external;
pub mod phrase;

use crate::config::CompareOptions;
use crate::error::CrossfindError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use external::CommandEngine;
pub use phrase::PhraseEngine;

/// A contiguous run of words on one side of a match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSpan {
    /// Matched words inside the span (mismatched words excluded).
    pub word_count: usize,
    /// Index of the first word of the span.
    #[serde(default)]
    pub first_word: usize,
    /// Byte offset of the span start in the normalised text.
    #[serde(default)]
    pub start: usize,
    /// Byte offset one past the span end.
    #[serde(default)]
    pub end: usize,
}

/// One matched phrase between a left and a right text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub left: MatchSpan,
    #[serde(default)]
    pub right: MatchSpan,
}

/// `matches[left][right]`: every match record for one pair of texts.
///
/// Missing rows or cells read as "no matches".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchTable {
    cells: Vec<Vec<Vec<MatchRecord>>>,
}

impl MatchTable {
    /// An all-empty table for `left × right` texts.
    pub fn new(left: usize, right: usize) -> Self {
        Self {
            cells: vec![vec![Vec::new(); right]; left],
        }
    }

    /// Match records for `(l, r)`; empty when out of range.
    pub fn get(&self, l: usize, r: usize) -> &[MatchRecord] {
        self.cells
            .get(l)
            .and_then(|row| row.get(r))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Replace the records for `(l, r)`, growing the table as needed.
    pub fn set(&mut self, l: usize, r: usize, records: Vec<MatchRecord>) {
        if self.cells.len() <= l {
            self.cells.resize_with(l + 1, Vec::new);
        }
        let row = &mut self.cells[l];
        if row.len() <= r {
            row.resize_with(r + 1, Vec::new);
        }
        row[r] = records;
    }

    /// `true` when the table has no rows or cells beyond `left × right`.
    pub fn fits(&self, left: usize, right: usize) -> bool {
        self.cells.len() <= left && self.cells.iter().all(|row| row.len() <= right)
    }
}

/// What an engine hands back to the report aggregator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    /// Time spent comparing, in milliseconds.
    #[serde(default)]
    pub execution_time_ms: u64,
    pub matches: MatchTable,
    /// Detailed comparison fragment, embedded verbatim in the report.
    #[serde(default)]
    pub html: String,
}

/// Compares every left text against every right text.
#[async_trait]
pub trait ComparisonEngine: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Compare the two ordered text sets.
    ///
    /// The returned table must be indexed by position in `left` / `right`.
    async fn compare(
        &self,
        left: Vec<String>,
        right: Vec<String>,
        options: &CompareOptions,
    ) -> Result<ComparisonResult, CrossfindError>;
}

/// Which pane of the detailed comparison an anchor points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// HTML id of one pane of the `(l, r)` detail section, e.g. `doc0-1L`.
///
/// Indices are separated so `(1, 12)` and `(11, 2)` never collide.
pub fn anchor_id(l: usize, r: usize, side: Side) -> String {
    let suffix = match side {
        Side::Left => 'L',
        Side::Right => 'R',
    };
    format!("doc{l}-{r}{suffix}")
}
