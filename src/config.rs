//! Configuration types for a cross-comparison run.
//!
//! All run behaviour is controlled through [`CrossfindConfig`], built via its
//! [`CrossfindConfigBuilder`]. Components receive the record explicitly; no
//! component reads process-wide state.

use crate::error::CrossfindError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[cfg(target_os = "windows")]
const DEFAULT_CONVERTER: &str = "C:\\Program Files (x86)\\Calibre2\\ebook-convert.exe";
#[cfg(target_os = "macos")]
const DEFAULT_CONVERTER: &str = "/Applications/calibre.app/Contents/console.app/Contents/MacOS/ebook-convert";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const DEFAULT_CONVERTER: &str = "/usr/bin/ebook-convert";

/// Configuration for one cross-comparison run.
///
/// Built via [`CrossfindConfig::builder()`] or using
/// [`CrossfindConfig::default()`].
///
/// # Example
/// ```rust
/// use ebook_crossfind::CrossfindConfig;
///
/// let config = CrossfindConfig::builder()
///     .left_folder("originals")
///     .right_folder("submissions")
///     .report_path("overlap.html")
///     .phrase_length(20)
///     .build()
///     .unwrap();
/// assert_eq!(config.compare.phrase_length, 20);
/// ```
#[derive(Clone)]
pub struct CrossfindConfig {
    /// Folder holding the reference documents. Default: `./left`.
    pub left_folder: PathBuf,

    /// Folder holding the documents compared against the left set. Default: `./right`.
    pub right_folder: PathBuf,

    /// Where the HTML report is written. Relative paths resolve against the
    /// working directory. Default: `results.html`.
    pub report_path: PathBuf,

    /// Name of the sub-folder (inside each input folder) holding converted
    /// text. Default: `cache`.
    pub cache_subfolder: String,

    /// Converter executable. Default: calibre's `ebook-convert` at its usual
    /// install location for the platform.
    pub converter: PathBuf,

    /// Extra arguments appended after `<source> <destination>`.
    /// Default: `--asciiize --unsmarten-punctuation`.
    pub converter_args: Vec<String>,

    /// Options handed to the comparison engine and printed in the report.
    pub compare: CompareOptions,

    /// External comparison engine executable. `None` uses the built-in
    /// [`crate::engine::PhraseEngine`].
    pub engine_command: Option<PathBuf>,

    /// Optional progress callback for per-file events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for CrossfindConfig {
    fn default() -> Self {
        Self {
            left_folder: PathBuf::from("./left"),
            right_folder: PathBuf::from("./right"),
            report_path: PathBuf::from("results.html"),
            cache_subfolder: "cache".to_string(),
            converter: PathBuf::from(DEFAULT_CONVERTER),
            converter_args: vec![
                "--asciiize".to_string(),
                "--unsmarten-punctuation".to_string(),
            ],
            compare: CompareOptions::default(),
            engine_command: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for CrossfindConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrossfindConfig")
            .field("left_folder", &self.left_folder)
            .field("right_folder", &self.right_folder)
            .field("report_path", &self.report_path)
            .field("cache_subfolder", &self.cache_subfolder)
            .field("converter", &self.converter)
            .field("converter_args", &self.converter_args)
            .field("compare", &self.compare)
            .field("engine_command", &self.engine_command)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl CrossfindConfig {
    /// Create a new builder for `CrossfindConfig`.
    pub fn builder() -> CrossfindConfigBuilder {
        CrossfindConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`CrossfindConfig`].
#[derive(Debug)]
pub struct CrossfindConfigBuilder {
    config: CrossfindConfig,
}

impl CrossfindConfigBuilder {
    pub fn left_folder(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.left_folder = path.into();
        self
    }

    pub fn right_folder(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.right_folder = path.into();
        self
    }

    pub fn report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.report_path = path.into();
        self
    }

    pub fn cache_subfolder(mut self, name: impl Into<String>) -> Self {
        self.config.cache_subfolder = name.into();
        self
    }

    pub fn converter(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.converter = path.into();
        self
    }

    /// Replace the converter's extra arguments.
    pub fn converter_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.converter_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn compare_options(mut self, options: CompareOptions) -> Self {
        self.config.compare = options;
        self
    }

    pub fn phrase_length(mut self, words: usize) -> Self {
        self.config.compare.phrase_length = words;
        self
    }

    pub fn word_threshold(mut self, words: usize) -> Self {
        self.config.compare.word_threshold = words;
        self
    }

    pub fn ignore_case(mut self, v: bool) -> Self {
        self.config.compare.ignore_case = v;
        self
    }

    pub fn ignore_punctuation(mut self, v: bool) -> Self {
        self.config.compare.ignore_punctuation = v;
        self
    }

    pub fn mismatch_tolerance(mut self, words: usize) -> Self {
        self.config.compare.mismatch_tolerance = words;
        self
    }

    pub fn build_report(mut self, v: bool) -> Self {
        self.config.compare.build_report = v;
        self
    }

    pub fn engine_command(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.engine_command = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CrossfindConfig, CrossfindError> {
        let c = &self.config;
        let cache = c.cache_subfolder.trim();
        if cache.is_empty() || cache == "." || cache == ".." {
            return Err(CrossfindError::InvalidConfig(format!(
                "cache sub-folder must be a plain folder name, got '{}'",
                c.cache_subfolder
            )));
        }
        if cache.contains(['/', '\\']) {
            return Err(CrossfindError::InvalidConfig(format!(
                "cache sub-folder must not contain path separators, got '{}'",
                c.cache_subfolder
            )));
        }
        if c.converter.as_os_str().is_empty() {
            return Err(CrossfindError::InvalidConfig(
                "converter path must not be empty".into(),
            ));
        }
        if c.compare.phrase_length == 0 {
            return Err(CrossfindError::InvalidConfig(
                "phrase length must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Comparison options ───────────────────────────────────────────────────

/// Options understood by every [`crate::engine::ComparisonEngine`].
///
/// Defaults are tuned for book-length texts: a 34-word phrase is long
/// enough that common idioms do not register, and pairs sharing fewer than
/// 100 words in total are treated as noise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareOptions {
    /// Minimum matching phrase length, in words. Default: 34.
    pub phrase_length: usize,
    /// Minimum total matched words for a pair to be reported. Default: 100.
    pub word_threshold: usize,
    /// Compare words case-insensitively. Default: true.
    pub ignore_case: bool,
    /// Strip punctuation from words before comparing. Default: true.
    pub ignore_punctuation: bool,
    /// Mismatched words tolerated inside one phrase. Default: 6.
    pub mismatch_tolerance: usize,
    /// Render the detailed side-by-side HTML fragment. Default: true.
    pub build_report: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            phrase_length: 34,
            word_threshold: 100,
            ignore_case: true,
            ignore_punctuation: true,
            mismatch_tolerance: 6,
            build_report: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_calibre_setup() {
        let c = CrossfindConfig::default();
        assert_eq!(c.cache_subfolder, "cache");
        assert_eq!(c.report_path, PathBuf::from("results.html"));
        assert_eq!(
            c.converter_args,
            vec!["--asciiize".to_string(), "--unsmarten-punctuation".to_string()]
        );
        assert!(c.converter.to_string_lossy().contains("ebook-convert"));
        assert_eq!(c.compare, CompareOptions::default());
    }

    #[test]
    fn builder_sets_fields() {
        let c = CrossfindConfig::builder()
            .left_folder("/a")
            .right_folder("/b")
            .cache_subfolder(".txtcache")
            .converter_args(["--max-line-length", "80"])
            .mismatch_tolerance(2)
            .ignore_case(false)
            .build()
            .unwrap();
        assert_eq!(c.left_folder, PathBuf::from("/a"));
        assert_eq!(c.cache_subfolder, ".txtcache");
        assert_eq!(c.converter_args.len(), 2);
        assert_eq!(c.compare.mismatch_tolerance, 2);
        assert!(!c.compare.ignore_case);
    }

    #[test]
    fn rejects_nested_cache_folder() {
        let err = CrossfindConfig::builder()
            .cache_subfolder("a/b")
            .build()
            .unwrap_err();
        assert!(matches!(err, CrossfindError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_empty_cache_folder() {
        assert!(CrossfindConfig::builder().cache_subfolder("  ").build().is_err());
        assert!(CrossfindConfig::builder().cache_subfolder("..").build().is_err());
    }

    #[test]
    fn rejects_zero_phrase_length() {
        assert!(CrossfindConfig::builder().phrase_length(0).build().is_err());
    }

    #[test]
    fn options_serialise_camel_case() {
        let json = serde_json::to_value(CompareOptions::default()).unwrap();
        assert_eq!(json["phraseLength"], 34);
        assert_eq!(json["mismatchTolerance"], 6);
        assert_eq!(json["buildReport"], true);
    }
}
