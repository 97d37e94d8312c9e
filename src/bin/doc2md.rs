//! CLI binary for edgequake-doc2md.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `EngineConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_doc2md::convert::write_atomic;
use edgequake_doc2md::{
    ConversionProgressCallback, ConversionResult, DocumentEngine, EngineConfig, ProgressCallback,
    StreamInfo,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner naming the converter being tried,
/// plus one log line per failed attempt.
struct CliProgressCallback {
    bar: ProgressBar,
    started: Instant,
    failures: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Reading");
        bar.set_message("input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Instant::now(),
            failures: AtomicUsize::new(0),
        })
    }

    /// Clear the spinner when conversion ended without a winner.
    fn abandon(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, info: &StreamInfo) {
        let kind = match (info.mime_type.as_deref(), info.extension.as_deref()) {
            (Some(mime), _) => mime.to_string(),
            (None, Some(ext)) => ext.to_string(),
            (None, None) => "unknown type".to_string(),
        };
        self.bar.set_prefix("Detecting");
        self.bar.set_message(kind);
    }

    fn on_attempt_start(&self, converter: &str) {
        self.bar.set_prefix("Converting");
        self.bar.set_message(converter.to_string());
    }

    fn on_attempt_failed(&self, converter: &str, error: &str) {
        self.failures.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg = match error.char_indices().nth(79) {
            Some((idx, _)) => format!("{}\u{2026}", &error[..idx]),
            None => error.to_string(),
        };
        self.bar
            .println(format!("  {} {:<20} {}", red("✗"), converter, red(&msg)));
    }

    fn on_conversion_complete(&self, converter: &str, markdown_len: usize) {
        self.bar.finish_and_clear();
        let failed = self.failures.load(Ordering::SeqCst);
        eprintln!(
            "{} {}  {}  {}{}",
            green("✔"),
            bold(converter),
            dim(&format!("{markdown_len} chars")),
            dim(&format!("{:.1}s", self.started.elapsed().as_secs_f64())),
            if failed > 0 {
                format!("  ({} after {} failed)", cyan("fallback"), failed)
            } else {
                String::new()
            },
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic conversion (stdout)
  doc2md report.pdf

  # Convert to file
  doc2md slides.zip -o slides.md

  # Read from stdin, telling doc2md what it is
  cat data.csv | doc2md --extension csv

  # Convert from URL
  doc2md https://example.com/page.html -o page.md

  # Inline data
  doc2md 'data:text/plain;charset=utf-8,Hello%20world'

  # Caption images with a vision model
  doc2md --llm-provider openai --llm-model gpt-4.1-nano photo.jpg

  # JSON output with the detected title
  doc2md --json report.pdf > report.json

SUPPORTED FORMATS:
  PDF (.pdf)          text layer via pdfium, lines and paragraphs rebuilt
  HTML (.html, .htm)  headings, lists, links and tables kept
  CSV (.csv)          Markdown table
  Notebook (.ipynb)   Markdown cells verbatim, code cells fenced
  Image (.jpg, .png)  size, plus an LLM caption when a provider is set
  Zip (.zip)          every member converted in turn
  Text (.txt, .md, .json, ...)  decoded with the detected charset

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (for image captions)
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Caption provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Caption model ID
  PDFIUM_LIB_PATH         Path to libpdfium; the system library is used otherwise
  RUST_LOG                Override the log filter

PDF SUPPORT:
  PDF conversion needs the pdfium shared library. Without it the PDF
  converter fails with a missing-dependency error and every other format
  keeps working.
"#;

/// Convert documents, streams and URLs to Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "doc2md",
    version,
    about = "Convert documents, streams and URLs to Markdown",
    long_about = "Convert documents (local files, stdin, file:/data:/http(s): URIs) to clean \
Markdown. The input format is detected from its name, its declared type and its content; \
when the best-matching converter fails the next one is tried.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local path or file:, data:, http:, https: URI. Reads stdin when absent or "-".
    input: Option<String>,

    /// Write Markdown to this file instead of stdout.
    #[arg(short, long, env = "DOC2MD_OUTPUT")]
    output: Option<PathBuf>,

    /// Extension hint for the input (e.g. csv or .csv).
    #[arg(short = 'x', long)]
    extension: Option<String>,

    /// Mime type hint for the input (e.g. text/html).
    #[arg(short, long)]
    mime_type: Option<String>,

    /// Charset hint for text input (e.g. windows-1252).
    #[arg(short, long)]
    charset: Option<String>,

    /// Keep data: URIs in HTML output instead of truncating them.
    #[arg(long, env = "DOC2MD_KEEP_DATA_URIS")]
    keep_data_uris: bool,

    /// LLM provider for image captions: openai, anthropic, gemini, ollama.
    #[arg(long, env = "EDGEQUAKE_LLM_PROVIDER")]
    llm_provider: Option<String>,

    /// LLM model for image captions (default: gpt-4.1-nano).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    llm_model: Option<String>,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "DOC2MD_PASSWORD")]
    password: Option<String>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "DOC2MD_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Output the result as JSON (markdown + title) instead of Markdown.
    #[arg(long, env = "DOC2MD_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "DOC2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOC2MD_QUIET")]
    quiet: bool,
}

impl Cli {
    /// `None` means stdin.
    fn source(&self) -> Option<&str> {
        self.input.as_deref().filter(|s| *s != "-")
    }

    fn hint(&self) -> StreamInfo {
        let mut hint = StreamInfo::new();
        if let Some(ref ext) = self.extension {
            hint = hint.with_extension(ext);
        }
        if let Some(ref mime) = self.mime_type {
            hint = hint.with_mime_type(mime.clone());
        }
        if let Some(ref charset) = self.charset {
            hint = hint.with_charset(charset.clone());
        }
        hint
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters, so library INFO logs
    // are silenced while it runs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress = show_progress.then(CliProgressCallback::new);
    let config = build_config(
        &cli,
        progress
            .clone()
            .map(|cb| cb as Arc<dyn ConversionProgressCallback>),
    )?;
    let engine = DocumentEngine::new(config).context("Failed to initialise converters")?;

    let hint = cli.hint();
    let outcome = match cli.source() {
        Some(source) => engine.convert(source, &hint).await,
        None => {
            let mut bytes = Vec::new();
            io::stdin()
                .lock()
                .read_to_end(&mut bytes)
                .context("Failed to read stdin")?;
            engine.convert_bytes(bytes, &hint).await
        }
    };
    if let Some(ref cb) = progress {
        cb.abandon();
    }
    let result = outcome.context("Conversion failed")?;

    let rendered = render(&result, cli.json)?;
    match cli.output {
        Some(ref path) => {
            write_atomic(path, &rendered)
                .await
                .context("Failed to write output")?;
            if !cli.quiet {
                eprintln!(
                    "{}  {} chars  →  {}",
                    green("✔"),
                    result.markdown.len(),
                    bold(&path.display().to_string())
                );
            }
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(rendered.as_bytes())
                .context("Failed to write to stdout")?;
            // Ensure a trailing newline on stdout.
            if !rendered.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }
    }

    Ok(())
}

/// Markdown as-is, or the whole result as pretty JSON.
fn render(result: &ConversionResult, json: bool) -> Result<String> {
    if json {
        serde_json::to_string_pretty(result).context("Failed to serialise output")
    } else {
        Ok(result.markdown.clone())
    }
}

/// Map CLI args to `EngineConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<EngineConfig> {
    let mut builder = EngineConfig::builder()
        .download_timeout_secs(cli.download_timeout)
        .keep_data_uris(cli.keep_data_uris);

    if let Some(ref name) = cli.llm_provider {
        builder = builder.llm_provider_name(name.clone());
    }
    if let Some(ref model) = cli.llm_model {
        builder = builder.llm_model(model.clone());
    }
    if let Some(ref path) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(path.clone());
    }
    if let Some(ref password) = cli.password {
        builder = builder.pdf_password(password.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_means_stdin() {
        let cli = Cli::parse_from(["doc2md", "-"]);
        assert_eq!(cli.source(), None);
        let cli = Cli::parse_from(["doc2md"]);
        assert_eq!(cli.source(), None);
        let cli = Cli::parse_from(["doc2md", "a.pdf"]);
        assert_eq!(cli.source(), Some("a.pdf"));
    }

    #[test]
    fn hint_from_flags() {
        let cli = Cli::parse_from(["doc2md", "--extension", "CSV", "--charset", "latin1"]);
        let hint = cli.hint();
        assert_eq!(hint.extension.as_deref(), Some(".csv"));
        assert_eq!(hint.charset.as_deref(), Some("latin1"));
        assert!(hint.mime_type.is_none());
    }

    #[test]
    fn json_render_has_title() {
        let result = ConversionResult::new("# Hi").with_title("Hi");
        let json = render(&result, true).unwrap();
        assert!(json.contains("\"title\": \"Hi\""));
        assert_eq!(render(&result, false).unwrap(), "# Hi");
    }
}
