//! Built-in phrase matcher.
//!
//! ## Algorithm
//!
//! Every text is split into words; with `ignore_case` / `ignore_punctuation`
//! each word is reduced to a comparison key (words that reduce to nothing,
//! such as a lone dash, are dropped). The right text is indexed by short
//! word n-grams ("anchors"). Walking the left text, every anchor hit is
//! extended word by word; a mismatch is bridged by re-synchronising on the
//! next word (substitution, left insertion or right insertion) as long as
//! fewer than `mismatch_tolerance` mismatches have been spent. The longest
//! extension wins, and it is kept when it covers at least `phrase_length`
//! matched words. Right-side words are claimed by at most one match.
//!
//! Pairs whose total matched words fall below `word_threshold` are reported
//! as having no matches.

use crate::config::CompareOptions;
use crate::engine::{anchor_id, ComparisonEngine, ComparisonResult, MatchRecord, MatchSpan, MatchTable, Side};
use crate::error::CrossfindError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::Instant;
use tracing::{debug, info};

/// Upper bound on the exact-match prefix used to find candidate phrases.
const ANCHOR_WORDS: usize = 4;

static RE_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+").unwrap());

/// The default [`ComparisonEngine`].
#[derive(Debug, Clone, Default)]
pub struct PhraseEngine;

impl PhraseEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ComparisonEngine for PhraseEngine {
    fn name(&self) -> &str {
        "phrase"
    }

    async fn compare(
        &self,
        left: Vec<String>,
        right: Vec<String>,
        options: &CompareOptions,
    ) -> Result<ComparisonResult, CrossfindError> {
        let options = options.clone();
        tokio::task::spawn_blocking(move || compare_blocking(&left, &right, &options))
            .await
            .map_err(|e| CrossfindError::Internal(format!("Comparison task panicked: {}", e)))
    }
}

/// Blocking implementation of [`PhraseEngine::compare`].
pub fn compare_blocking(left: &[String], right: &[String], options: &CompareOptions) -> ComparisonResult {
    let start = Instant::now();
    let left_words: Vec<Vec<Word>> = left.iter().map(|t| tokenize(t, options)).collect();
    let right_words: Vec<Vec<Word>> = right.iter().map(|t| tokenize(t, options)).collect();

    let mut matches = MatchTable::new(left.len(), right.len());
    let mut html = String::new();

    for (l, lw) in left_words.iter().enumerate() {
        for (r, rw) in right_words.iter().enumerate() {
            let records = match_pair(lw, rw, options);
            let total: usize = records.iter().map(|m| m.left.word_count).sum();
            if records.is_empty() || total < options.word_threshold {
                continue;
            }
            debug!("Pair #{l} vs #{r}: {} words in {} incidents", total, records.len());
            if options.build_report {
                render_pair(&mut html, l, r, &left[l], &right[r], &records);
            }
            matches.set(l, r, records);
        }
    }

    let execution_time_ms = start.elapsed().as_millis() as u64;
    info!(
        "Compared {} × {} texts in {}ms",
        left.len(),
        right.len(),
        execution_time_ms
    );
    ComparisonResult {
        execution_time_ms,
        matches,
        html,
    }
}

// ── Tokenisation ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
struct Word {
    key: String,
    start: usize,
    end: usize,
}

fn tokenize(text: &str, options: &CompareOptions) -> Vec<Word> {
    RE_WORD
        .find_iter(text)
        .filter_map(|m| {
            let raw = m.as_str();
            let key: String = if options.ignore_punctuation {
                raw.chars().filter(|c| c.is_alphanumeric()).collect()
            } else {
                raw.to_string()
            };
            if key.is_empty() {
                return None;
            }
            let key = if options.ignore_case { key.to_lowercase() } else { key };
            Some(Word {
                key,
                start: m.start(),
                end: m.end(),
            })
        })
        .collect()
}

// ── Matching ─────────────────────────────────────────────────────────────

/// Result of extending one anchor hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Extension {
    left_len: usize,
    right_len: usize,
    matched: usize,
}

fn match_pair(left: &[Word], right: &[Word], options: &CompareOptions) -> Vec<MatchRecord> {
    let k = options.phrase_length.clamp(1, ANCHOR_WORDS);
    if left.len() < k || right.len() < k {
        return Vec::new();
    }

    let lkeys: Vec<&str> = left.iter().map(|w| w.key.as_str()).collect();
    let rkeys: Vec<&str> = right.iter().map(|w| w.key.as_str()).collect();

    let mut anchors: HashMap<&[&str], Vec<usize>> = HashMap::new();
    for j in 0..=rkeys.len() - k {
        anchors.entry(&rkeys[j..j + k]).or_default().push(j);
    }

    let mut claimed = vec![false; right.len()];
    let mut records = Vec::new();
    let mut i = 0;
    while i + k <= lkeys.len() {
        let best = anchors.get(&lkeys[i..i + k]).and_then(|candidates| {
            candidates
                .iter()
                .filter(|&&j| !claimed[j])
                .map(|&j| (j, extend(&lkeys, &rkeys, &claimed, i, j, options.mismatch_tolerance)))
                .max_by_key(|(_, ext)| ext.matched)
        });

        match best {
            Some((j, ext)) if ext.matched >= options.phrase_length => {
                claimed[j..j + ext.right_len].iter_mut().for_each(|c| *c = true);
                records.push(MatchRecord {
                    left: span(left, i, ext.left_len, ext.matched),
                    right: span(right, j, ext.right_len, ext.matched),
                });
                i += ext.left_len;
            }
            _ => i += 1,
        }
    }
    records
}

/// Extend a phrase starting at `left[i]` / `right[j]`, bridging mismatches.
fn extend(left: &[&str], right: &[&str], claimed: &[bool], i: usize, j: usize, tolerance: usize) -> Extension {
    let same = |a: usize, b: usize| a < left.len() && b < right.len() && !claimed[b] && left[a] == right[b];

    let (mut a, mut b) = (i, j);
    let (mut end_a, mut end_b) = (i, j);
    let mut matched = 0;
    let mut mismatches = 0;

    while a < left.len() && b < right.len() {
        if same(a, b) {
            a += 1;
            b += 1;
            matched += 1;
            end_a = a;
            end_b = b;
            continue;
        }
        // A bridged right word still belongs to the phrase span.
        if mismatches >= tolerance || claimed[b] {
            break;
        }
        mismatches += 1;
        if same(a + 1, b + 1) {
            a += 1;
            b += 1;
        } else if same(a + 1, b) {
            a += 1;
        } else if same(a, b + 1) {
            b += 1;
        } else {
            break;
        }
    }

    Extension {
        left_len: end_a - i,
        right_len: end_b - j,
        matched,
    }
}

fn span(words: &[Word], first: usize, len: usize, matched: usize) -> MatchSpan {
    MatchSpan {
        word_count: matched,
        first_word: first,
        start: words[first].start,
        end: words[first + len - 1].end,
    }
}

// ── Detail rendering ─────────────────────────────────────────────────────

fn render_pair(html: &mut String, l: usize, r: usize, left: &str, right: &str, records: &[MatchRecord]) {
    let left_id = anchor_id(l, r, Side::Left);
    let right_id = anchor_id(l, r, Side::Right);
    let left_spans: Vec<(usize, usize, usize)> = records
        .iter()
        .enumerate()
        .map(|(n, m)| (m.left.start, m.left.end, n + 1))
        .collect();
    let mut right_spans: Vec<(usize, usize, usize)> = records
        .iter()
        .enumerate()
        .map(|(n, m)| (m.right.start, m.right.end, n + 1))
        .collect();
    right_spans.sort_unstable();

    let _ = writeln!(html, "<h2>#{l} vs. #{r}</h2>");
    let _ = writeln!(
        html,
        "<div class=\"doc\" id=\"{left_id}\">{}</div>",
        mark_text(left, &left_spans, &left_id, &right_id)
    );
    let _ = writeln!(
        html,
        "<div class=\"doc\" id=\"{right_id}\">{}</div>",
        mark_text(right, &right_spans, &right_id, &left_id)
    );
}

/// Escape `text`, wrapping each span in a numbered, cross-linked match marker.
fn mark_text(text: &str, spans: &[(usize, usize, usize)], own: &str, other: &str) -> String {
    let mut out = String::with_capacity(text.len() + spans.len() * 96);
    let mut pos = 0;
    for &(start, end, n) in spans {
        out.push_str(&html_escape::encode_text(&text[pos..start]));
        let _ = write!(
            out,
            "<a id=\"{own}-m{n}\" href=\"#{other}-m{n}\" data-match=\"{n}\"></a><span class=\"match\">{}</span>",
            html_escape::encode_text(&text[start..end])
        );
        pos = end;
    }
    out.push_str(&html_escape::encode_text(&text[pos..]));
    out
}
