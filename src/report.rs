//! Report aggregation: combine both file sets with the engine's match data.
//!
//! The report is a single HTML file with inline CSS and no external
//! resources, so it can be mailed or archived on its own. It has four
//! parts: the input folders with their numbered file lists, one summary
//! block per left×right pair, the engine's detailed comparison fragment
//! (embedded verbatim) and the options the comparison ran with.

use crate::config::CompareOptions;
use crate::engine::{anchor_id, ComparisonResult, MatchTable, Side};
use crate::error::CrossfindError;
use crate::output::FileSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

/// Statistics for one `(left, right)` pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStatistic {
    /// Number of match records for the pair.
    pub incidents: usize,
    /// Sum of the left-side matched word counts.
    pub words: usize,
}

impl MatchStatistic {
    /// Derive the statistic for `(l, r)` from the raw table.
    pub fn from_table(table: &MatchTable, l: usize, r: usize) -> Self {
        let records = table.get(l, r);
        Self {
            incidents: records.len(),
            words: records.iter().map(|m| m.left.word_count).sum(),
        }
    }
}

/// One summary row of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairSummary {
    pub left_index: usize,
    pub left_name: String,
    pub right_index: usize,
    pub right_name: String,
    pub stats: MatchStatistic,
}

impl PairSummary {
    /// Only pairs with at least one incident link into the detail section.
    pub fn is_clickable(&self) -> bool {
        self.stats.incidents > 0
    }
}

/// The fully aggregated report, ready to render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDocument {
    pub left_folder: PathBuf,
    pub right_folder: PathBuf,
    pub left_names: Vec<String>,
    pub right_names: Vec<String>,
    pub generated_at: DateTime<Utc>,
    pub options: CompareOptions,
    /// Row-major: all right files for left #0, then left #1, …
    pub summary: Vec<PairSummary>,
    /// Engine-supplied detail fragment, embedded verbatim.
    pub detail_html: String,
    pub execution_time_ms: u64,
}

/// Build the report for `left × right`.
///
/// # Errors
/// [`CrossfindError::EmptyFileSet`] when either side has no files.
pub fn aggregate(
    left_folder: &Path,
    right_folder: &Path,
    left: &FileSet,
    right: &FileSet,
    result: &ComparisonResult,
    options: &CompareOptions,
) -> Result<ReportDocument, CrossfindError> {
    if left.is_empty() {
        return Err(CrossfindError::EmptyFileSet {
            path: left_folder.to_path_buf(),
        });
    }
    if right.is_empty() {
        return Err(CrossfindError::EmptyFileSet {
            path: right_folder.to_path_buf(),
        });
    }

    let mut summary = Vec::with_capacity(left.len() * right.len());
    for (l, left_entry) in left.iter().enumerate() {
        for (r, right_entry) in right.iter().enumerate() {
            summary.push(PairSummary {
                left_index: l,
                left_name: left_entry.name.clone(),
                right_index: r,
                right_name: right_entry.name.clone(),
                stats: MatchStatistic::from_table(&result.matches, l, r),
            });
        }
    }

    Ok(ReportDocument {
        left_folder: left_folder.to_path_buf(),
        right_folder: right_folder.to_path_buf(),
        left_names: left.names().into_iter().map(String::from).collect(),
        right_names: right.names().into_iter().map(String::from).collect(),
        generated_at: Utc::now(),
        options: options.clone(),
        summary,
        detail_html: result.html.clone(),
        execution_time_ms: result.execution_time_ms,
    })
}

const STYLE: &str = r##"* { box-sizing: border-box; }
html,body { height:100%; font-family:sans-serif; }
body { margin: 1em; }
.summary { margin:1em 1em; border:1px solid #aaa; text-align:center; display:inline-block; padding:3em; text-decoration:none; }
.summary span { color:#aaa; }
.summary .stats { color:red; padding-top:0.6em; }
div.summary .stats { color:#0A0; }
.doc { display:inline-block; width:49%; overflow:scroll; height:60%; max-height:800px; border:1px solid #aaa; padding:1em; white-space:pre-wrap; vertical-align:top; }
.doc>a[data-match]::before { content: "# " attr(data-match); border:1px solid #00a; background-color:#aaf; position:relative; top:-1em; font-size:0.6em; border-radius:4px; padding: 0.1em 1em; white-space: nowrap; }
.doc>a { text-decoration:none; } .doc>a:hover { text-decoration:underline; }
.match { color:#e33 }
.match-partial { color:#007F00 }
.match-removed { color:#333; background-color:#eee; font-size: 0.9em; font-style: italic; }
.match-removed::before { content: "..."; padding:0 1em 0 0; }
.match-removed::after { content: "..."; padding:0 0 0 1em; }
@media screen and (max-width: 700px) { .doc { display: block; width:90%; } }
"##;

fn esc(s: &str) -> std::borrow::Cow<'_, str> {
    html_escape::encode_text(s)
}

impl ReportDocument {
    /// Pairs with at least one incident.
    pub fn pairs_with_matches(&self) -> usize {
        self.summary.iter().filter(|p| p.is_clickable()).count()
    }

    /// Render the self-contained HTML document.
    pub fn render(&self) -> String {
        let mut html = String::with_capacity(8 * 1024 + self.detail_html.len());
        html.push_str("<!DOCTYPE html>\n<html><!-- Generated by ebook-crossfind -->\n<head><meta charset=\"UTF-8\">\n");
        html.push_str("<title>Comparison results</title>\n<style>\n");
        html.push_str(STYLE);
        html.push_str("</style>\n</head><body>\n<h1>Comparison results</h1>\n");

        render_file_list(&mut html, &self.left_folder, &self.left_names);
        render_file_list(&mut html, &self.right_folder, &self.right_names);
        let _ = writeln!(
            html,
            "<p>Date: {}</p>",
            self.generated_at.format("%a, %d %b %Y %H:%M:%S GMT")
        );
        let _ = writeln!(
            html,
            "<p>Comparison ran in {:.3}s</p>",
            self.execution_time_ms as f64 / 1000.0
        );

        html.push_str("\n<h2>Summary</h2>\n");
        for pair in &self.summary {
            render_summary_entry(&mut html, pair);
        }

        html.push_str("\n<h1>Detailed Comparison</h1>\n");
        html.push_str(&self.detail_html);
        html.push('\n');

        html.push_str("\n<h2>Options Used</h2>\n<p>\n");
        if let Ok(serde_json::Value::Object(map)) = serde_json::to_value(&self.options) {
            for (key, value) in map {
                let _ = writeln!(html, "{}: {}<br>", esc(&key), esc(&value.to_string()));
            }
        }
        html.push_str("</p>\n</body></html>\n");
        html
    }
}

fn render_file_list(html: &mut String, folder: &Path, names: &[String]) {
    let _ = writeln!(
        html,
        "<p>Files in <code>{}</code>:</p>\n<ol start=\"0\">",
        esc(&folder.display().to_string())
    );
    for name in names {
        let _ = writeln!(html, "<li>{}</li>", esc(name));
    }
    html.push_str("</ol>\n");
}

fn render_summary_entry(html: &mut String, pair: &PairSummary) {
    let body = format!(
        "<div class=\"left\">#{}. {}</div><span>vs.</span><div class=\"right\">#{}. {}</div>\
         <div class=\"stats\">{} Words in {} incidents</div>",
        pair.left_index,
        esc(&pair.left_name),
        pair.right_index,
        esc(&pair.right_name),
        pair.stats.words,
        pair.stats.incidents
    );
    if pair.is_clickable() {
        let _ = writeln!(
            html,
            "<a href=\"#{}\" class=\"summary\">{}</a>",
            anchor_id(pair.left_index, pair.right_index, Side::Left),
            body
        );
    } else {
        let _ = writeln!(html, "<div class=\"summary\">{}</div>", body);
    }
}

/// Write `document` to `path` as a whole.
///
/// Uses atomic write (temp file + rename) so a failure never leaves a
/// truncated report behind.
pub async fn write_report(path: &Path, document: &ReportDocument) -> Result<(), CrossfindError> {
    let write_err = |e| CrossfindError::ReportWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("html.tmp");
    tokio::fs::write(&tmp_path, document.render())
        .await
        .map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }

    info!("Report is available in '{}'", path.display());
    Ok(())
}
