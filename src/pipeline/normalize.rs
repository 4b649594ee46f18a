//! Text normalisation: whitespace cleanup before comparison.
//!
//! Converted books are full of `\r\n` line endings, runs of spaces used
//! for indentation and long blank stretches between chapters. None of that
//! matters to the matcher but it inflates memory and skews the rendered
//! report, so it is squeezed out here.
//!
//! ## Rule Order
//!
//! Carriage returns go first so `\r\n\r\n\r\n` is seen as three newlines by
//! the blank-line rule. The final trim runs last.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());
static RE_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static RE_TABS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\t{2,}").unwrap());

/// Clean raw artifact text.
///
/// Rules (applied in order):
/// 1. Remove every carriage return
/// 2. Collapse runs of 2+ spaces to one space
/// 3. Collapse runs of 3+ newlines to exactly two
/// 4. Collapse runs of 2+ tabs to one tab
/// 5. Trim leading and trailing whitespace
///
/// Idempotent: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(raw: &str) -> String {
    let s = raw.replace('\r', "");
    let s = RE_SPACES.replace_all(&s, " ");
    let s = RE_NEWLINES.replace_all(&s, "\n\n");
    let s = RE_TABS.replace_all(&s, "\t");
    s.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_carriage_returns() {
        assert_eq!(normalize("a\r\nb\rc"), "a\nbc");
    }

    #[test]
    fn test_collapses_spaces() {
        assert_eq!(normalize("a  b     c d"), "a b c d");
    }

    #[test]
    fn test_caps_blank_lines() {
        assert_eq!(normalize("a\n\n\n\n\nb\n\nc\nd"), "a\n\nb\n\nc\nd");
    }

    #[test]
    fn test_crlf_blank_lines() {
        assert_eq!(normalize("a\r\n\r\n\r\n\r\nb"), "a\n\nb");
    }

    #[test]
    fn test_collapses_tabs() {
        assert_eq!(normalize("a\t\t\tb\tc"), "a\tb\tc");
    }

    #[test]
    fn test_trims() {
        assert_eq!(normalize("  \n\t hello world \n\n "), "hello world");
        assert_eq!(normalize(" \r\n "), "");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "",
            "plain",
            "  lead and trail  ",
            "a \r\n\r\n\r\n b\t\t\t\tc   d",
            "x\n \n \n \ny",
            "\t\t \t\t  \n\n\n\n",
            "chapter 1\r\n\r\n\r\n\r\n    It was a dark   and stormy night.\r\n",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn test_no_long_runs_remain() {
        let out = normalize("a      b\n\n\n\n\n\nc\t\t\td\r\r\r");
        assert!(!out.contains("  "));
        assert!(!out.contains("\n\n\n"));
        assert!(!out.contains("\t\t"));
        assert!(!out.contains('\r'));
    }
}
