//! CLI binary for ebook-crossfind.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `CrossfindConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use ebook_crossfind::{
    run, ConversionOutcome, CrossfindConfig, PipelineProgressCallback, ProgressCallback, RunSummary,
    SkipReason,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar per folder, one log line per file,
/// then a spinner while the engine runs.
struct CliProgressCallback {
    bar: ProgressBar,
    entry_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(spinner_style());
        bar.set_prefix("Preparing");
        bar.set_message("Checking converter…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            entry_started: Mutex::new(None),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.entry_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS)
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.cyan} {prefix:.bold}  \
         [{bar:42.green/238}] {pos:>3}/{len} files  \
         ⏱ {elapsed_precise}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█▉▊▋▌▍▎▏  ")
    .tick_strings(TICKS)
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_folder_start(&self, folder: &Path, total_entries: usize) {
        self.bar.reset();
        self.bar.set_length(total_entries as u64);
        self.bar.set_style(bar_style());
        self.bar.set_prefix("Converting");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("{} ({} entries)", folder.display(), total_entries))
        ));
    }

    fn on_entry_start(&self, _index: usize, _total: usize, name: &str) {
        if let Ok(mut t) = self.entry_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(name.to_string());
    }

    fn on_entry_complete(&self, _index: usize, _total: usize, name: &str, outcome: &ConversionOutcome) {
        let secs = self.elapsed_secs();
        match outcome {
            ConversionOutcome::CacheHit(_) => self.bar.println(format!(
                "  {} {}  {}",
                green("✓"),
                name,
                dim("cached")
            )),
            ConversionOutcome::Converted(_) => self.bar.println(format!(
                "  {} {}  {}",
                green("✓"),
                name,
                dim(&format!("converted in {secs:.1}s"))
            )),
            ConversionOutcome::Skipped(SkipReason::NotAFile) => {}
            ConversionOutcome::Skipped(reason) => self.bar.println(format!(
                "  {} {}  {}",
                red("✗"),
                name,
                red(&reason.to_string())
            )),
        }
        self.bar.inc(1);
    }

    fn on_folder_complete(&self, _folder: &Path, accepted: usize, total: usize) {
        self.bar.println(format!(
            "  {} usable of {} entries",
            bold(&accepted.to_string()),
            total
        ));
    }

    fn on_comparison_start(&self, left_files: usize, right_files: usize) {
        self.bar.set_style(spinner_style());
        self.bar.set_prefix("Comparing");
        self.bar
            .set_message(format!("{left_files} × {right_files} texts…"));
    }

    fn on_comparison_complete(&self, elapsed_ms: u64) {
        self.bar.println(format!(
            "{} Comparison finished in {}",
            cyan("◆"),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0))
        ));
    }

    fn on_report_written(&self, _path: &Path) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Compare two folders, report in ./results.html
  crossfind originals/ submissions/

  # Custom report location
  crossfind originals/ submissions/ reports/overlap.html

  # Shorter phrases, stricter matching
  crossfind --phrase-length 20 --mismatch-tolerance 2 --case-sensitive left/ right/

  # Converter installed somewhere else
  crossfind --converter ~/calibre/ebook-convert left/ right/

  # Machine-readable summary on stdout
  crossfind --json --no-progress left/ right/ > summary.json

CACHE:
  Converted text is kept in <folder>/cache/<name>.txt and reused while it is
  newer than its source. Delete the cache folder to force reconversion.

DRM:
  Books protected by DRM cannot be converted and are skipped with a warning.
  See https://github.com/apprenticeharper/DeDRM_tools for removal tools.

ENVIRONMENT VARIABLES:
  CROSSFIND_CONVERTER     Converter executable (default: calibre ebook-convert)
  CROSSFIND_CACHE         Cache sub-folder name (default: cache)
  CROSSFIND_ENGINE        External comparison engine executable
  RUST_LOG                Override log filter (e.g. ebook_crossfind=debug)
"#;

/// Find passages shared between two folders of e-books.
#[derive(Parser, Debug)]
#[command(
    name = "crossfind",
    version,
    about = "Find passages shared between two folders of e-books",
    long_about = "Convert every e-book in two folders to plain text with calibre's ebook-convert, \
compare every left book against every right book and write an HTML report with the matching \
passages side by side.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Folder with the reference books.
    left: PathBuf,

    /// Folder with the books to check against the left folder.
    right: PathBuf,

    /// Where to write the HTML report.
    #[arg(default_value = "results.html", env = "CROSSFIND_REPORT")]
    report: PathBuf,

    /// Converter executable (calibre's ebook-convert).
    #[arg(long, alias = "calibre", env = "CROSSFIND_CONVERTER")]
    converter: Option<PathBuf>,

    /// Cache sub-folder name inside each input folder.
    #[arg(long, env = "CROSSFIND_CACHE", default_value = "cache")]
    cache: String,

    /// Extra converter argument; repeat for several. Replaces the defaults.
    #[arg(long = "converter-arg", value_name = "ARG", allow_hyphen_values = true)]
    converter_args: Vec<String>,

    /// Minimum matching phrase length, in words.
    #[arg(long, env = "CROSSFIND_PHRASE_LENGTH", default_value_t = 34,
          value_parser = clap::value_parser!(u32).range(1..))]
    phrase_length: u32,

    /// Minimum total matched words for a pair to be reported.
    #[arg(long, env = "CROSSFIND_WORD_THRESHOLD", default_value_t = 100)]
    word_threshold: usize,

    /// Compare words case-sensitively.
    #[arg(long)]
    case_sensitive: bool,

    /// Keep punctuation when comparing words.
    #[arg(long)]
    keep_punctuation: bool,

    /// Mismatched words tolerated inside one phrase.
    #[arg(long, env = "CROSSFIND_MISMATCH_TOLERANCE", default_value_t = 6)]
    mismatch_tolerance: usize,

    /// Skip the side-by-side detail section of the report.
    #[arg(long)]
    no_detail: bool,

    /// External comparison engine speaking the JSON protocol.
    #[arg(long, env = "CROSSFIND_ENGINE")]
    engine: Option<PathBuf>,

    /// Print the run summary as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "CROSSFIND_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CROSSFIND_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CROSSFIND_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO-level library logs are dropped while the progress bar is shown;
    // warnings (converter stderr, skipped books) are printed above it.
    let show_progress = !cli.quiet && !cli.no_progress;
    let progress = show_progress.then(CliProgressCallback::new);
    let writer = match &progress {
        Some(cb) => {
            let bar = cb.bar.clone();
            BoxMakeWriter::new(move || BarWriter {
                bar: bar.clone(),
                inner: io::stderr(),
            })
        }
        None => BoxMakeWriter::new(io::stderr),
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(log_filter(cli.verbose, cli.quiet, show_progress))
        }))
        .with_writer(writer)
        .init();

    if let Err(e) = execute(&cli, progress.clone()).await {
        if let Some(cb) = &progress {
            cb.bar.finish_and_clear();
        }
        eprintln!("{} {:#}", red("**ERROR"), e);
        std::process::exit(1);
    }
}

fn log_filter(verbose: bool, quiet: bool, show_progress: bool) -> &'static str {
    if verbose {
        "debug"
    } else if quiet {
        "error"
    } else if show_progress {
        "warn"
    } else {
        "info"
    }
}

/// Log writer that pauses the progress bar while a record is printed.
struct BarWriter<W> {
    bar: ProgressBar,
    inner: W,
}

impl<W: Write> Write for BarWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let inner = &mut self.inner;
        self.bar.suspend(|| inner.write_all(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

async fn execute(cli: &Cli, progress: Option<Arc<CliProgressCallback>>) -> Result<()> {
    let progress_cb: Option<ProgressCallback> =
        progress.map(|cb| cb as Arc<dyn PipelineProgressCallback>);

    let config = build_config(cli, progress_cb)?;
    let summary = run(&config).await.context("Comparison run failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?;
        println!("{json}");
    }
    if !cli.quiet {
        print_summary(&summary);
    }
    Ok(())
}

/// Map CLI args to `CrossfindConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<CrossfindConfig> {
    let mut builder = CrossfindConfig::builder()
        .left_folder(&cli.left)
        .right_folder(&cli.right)
        .report_path(&cli.report)
        .cache_subfolder(&cli.cache)
        .phrase_length(cli.phrase_length as usize)
        .word_threshold(cli.word_threshold)
        .ignore_case(!cli.case_sensitive)
        .ignore_punctuation(!cli.keep_punctuation)
        .mismatch_tolerance(cli.mismatch_tolerance)
        .build_report(!cli.no_detail);

    if let Some(ref converter) = cli.converter {
        builder = builder.converter(converter);
    }
    if !cli.converter_args.is_empty() {
        builder = builder.converter_args(cli.converter_args.iter().cloned());
    }
    if let Some(ref engine) = cli.engine {
        builder = builder.engine_command(engine);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(summary: &RunSummary) {
    for side in [&summary.left, &summary.right] {
        for skipped in side.warnings() {
            eprintln!("{} {}", cyan("⚠"), skipped);
        }
    }
    let skipped = summary.left.warnings().count() + summary.right.warnings().count();
    eprintln!(
        "{}  {} × {} books  {} pairs with matches  {}ms  →  {}",
        if skipped == 0 { green("✔") } else { cyan("⚠") },
        summary.left.files.len(),
        summary.right.files.len(),
        bold(&summary.pairs_with_matches.to_string()),
        summary.total_duration_ms,
        bold(&summary.report_path.display().to_string()),
    );
    eprintln!(
        "   {} cached  /  {} converted  /  {} skipped",
        dim(&(summary.left.cache_hits + summary.right.cache_hits).to_string()),
        dim(&(summary.left.converted + summary.right.converted).to_string()),
        dim(&skipped.to_string()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ebook_crossfind::pipeline::converter::{convert_one, Converter, ConverterRun};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Succeeds but complains on stderr, like calibre with a missing font.
    struct NoisyConverter;

    #[async_trait]
    impl Converter for NoisyConverter {
        async fn run(&self, _source: &Path, destination: &Path) -> Result<ConverterRun, String> {
            std::fs::write(destination, "text").map_err(|e| e.to_string())?;
            Ok(ConverterRun {
                stderr: "font 'Garamond' not found".into(),
            })
        }
    }

    #[test]
    fn log_filter_levels() {
        assert_eq!(log_filter(false, false, true), "warn");
        assert_eq!(log_filter(false, false, false), "info");
        assert_eq!(log_filter(false, true, false), "error");
        assert_eq!(log_filter(true, true, true), "debug");
    }

    #[tokio::test]
    async fn converter_stderr_is_shown_with_progress_bar() {
        let buf = SharedBuf::default();
        let sink = buf.clone();
        let bar = ProgressBar::hidden();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(log_filter(false, false, true)))
            .with_ansi(false)
            .with_writer(move || BarWriter {
                bar: bar.clone(),
                inner: sink.clone(),
            })
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let dir = tempfile::tempdir().unwrap();
        let outcome = convert_one(
            &NoisyConverter,
            &dir.path().join("a.epub"),
            &dir.path().join("cache").join("a.txt"),
        )
        .await;

        assert!(matches!(outcome, ConversionOutcome::Converted(_)));
        let logged = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("font 'Garamond' not found"), "got: {logged}");
        assert!(!logged.contains("Converting"), "info lines stay hidden");
    }
}
