//! CLI binary for medrename.
//!
//! A thin shim over the library crate that maps CLI flags to `BatchConfig`
//! and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use medrename::source::input;
use medrename::{
    inspect_file, process_directory, BatchConfig, BatchProgressCallback, BatchReport,
    ExtractionConfig, Extractor, NameStyle, PdfTextSource, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One bar for the whole batch plus a log line per document.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix("Scanning");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:40.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        self.bar.set_length(total_documents as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Renaming");
    }

    fn on_document_start(&self, _index: usize, _total: usize, file: &str) {
        self.bar.set_message(file.to_string());
    }

    fn on_document_resolved(&self, _index: usize, _total: usize, file: &str, target: &str) {
        self.bar
            .println(format!("  {} {}  {} {}", green("✓"), dim(file), dim("→"), target));
        self.bar.inc(1);
    }

    fn on_document_unresolved(&self, _index: usize, _total: usize, file: &str, reason: &str) {
        let msg = truncate(reason, 80);
        self.bar
            .println(format!("  {} {}  {}", red("✗"), file, dim(&msg)));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_documents: usize, resolved: usize) {
        self.bar.finish_and_clear();
        let unresolved = total_documents.saturating_sub(resolved);
        if unresolved == 0 {
            eprintln!("{} {} files renamed", green("✔"), bold(&resolved.to_string()));
        } else {
            eprintln!(
                "{} {}/{} files renamed  ({} unresolved)",
                yellow("⚠"),
                bold(&resolved.to_string()),
                total_documents,
                red(&unresolved.to_string()),
            );
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max - 1).collect();
        format!("{head}\u{2026}")
    } else {
        s.to_string()
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Rename every PDF in PDFs2/ into PDFs2/Renamed/
  medrename PDFs2

  # Preview names without moving anything, with a CSV report
  medrename --dry-run --report report.csv PDFs2

  # Scanned documents: OCR the first page with a vision model
  medrename --ocr --provider openai --model gpt-4.1-mini PDFs2

  # Show what would be extracted from one file
  medrename --inspect PDFs2/scan_0042.pdf

OUTPUT:
  Renamed files:   <OUTPUT>/JOHN SMITH (03-04-1980) - Medical Records.pdf
  Collisions:      <OUTPUT>/JOHN SMITH (03-04-1980) (1) - Medical Records.pdf
  Unresolved list: <OUTPUT>/unresolved.txt (one original file name per line)

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY           OpenAI API key (OCR fallback)
  ANTHROPIC_API_KEY        Anthropic API key (OCR fallback)
  EDGEQUAKE_LLM_PROVIDER   Provider used when --provider is not given
  EDGEQUAKE_MODEL          Model used with EDGEQUAKE_LLM_PROVIDER
  PDFIUM_DYNAMIC_LIB_PATH  Path to libpdfium
  RUST_LOG                 Log filter override (e.g. medrename=debug)
"#;

/// Rename medical-record PDFs after the patient's name and date of birth.
#[derive(Parser, Debug)]
#[command(
    name = "medrename",
    version,
    about = "Rename medical-record PDFs after the patient's name and date of birth",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory containing the PDFs (or a single PDF with --inspect).
    input: PathBuf,

    /// Where renamed files go. Default: <INPUT>/Renamed.
    #[arg(short, long, env = "MEDRENAME_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Write a CSV report (File, Patient Name, DOB, PCP, IPA, Strategy, Confidence).
    #[arg(short, long, env = "MEDRENAME_REPORT")]
    report: Option<PathBuf>,

    /// File name of the unresolved list inside the output directory.
    #[arg(long, env = "MEDRENAME_UNRESOLVED_FILE", default_value = "unresolved.txt")]
    unresolved_file: String,

    /// Compute target names and the report, but move nothing.
    #[arg(long, env = "MEDRENAME_DRY_RUN")]
    dry_run: bool,

    /// Pages of text read per document.
    #[arg(long, env = "MEDRENAME_MAX_PAGES", default_value_t = 10,
          value_parser = clap::value_parser!(u32).range(1..=1000))]
    max_pages: u32,

    /// Name style in the target file name: upper, title, family-first.
    #[arg(long, env = "MEDRENAME_NAME_STYLE", default_value = "upper")]
    name_style: NameStyle,

    /// Text between the date and ".pdf".
    #[arg(long, env = "MEDRENAME_SUFFIX", default_value = " - Medical Records")]
    suffix: String,

    /// Maximum length of the name part, in characters.
    #[arg(long, env = "MEDRENAME_MAX_NAME_LEN", default_value_t = 150)]
    max_name_len: usize,

    /// Characters searched before a DOB label for a name (50–2000).
    #[arg(long, env = "MEDRENAME_LOOKBEHIND", default_value_t = 200)]
    lookbehind: usize,

    /// Leave files unresolved rather than pair the first name with the first DOB.
    #[arg(long, env = "MEDRENAME_NO_LOW_CONFIDENCE")]
    no_low_confidence: bool,

    /// File with extra blocklist phrases, one per line.
    #[arg(long, env = "MEDRENAME_BLOCKLIST")]
    blocklist: Option<PathBuf>,

    /// OCR the first page with a vision model when a PDF has no text layer.
    #[arg(long, env = "MEDRENAME_OCR")]
    ocr: bool,

    /// Vision provider: openai, anthropic, gemini, ollama, ...
    #[arg(long, env = "MEDRENAME_PROVIDER")]
    provider: Option<String>,

    /// Vision model ID (e.g. gpt-4.1-nano).
    #[arg(long, env = "MEDRENAME_MODEL")]
    model: Option<String>,

    /// Retries per OCR call.
    #[arg(long, env = "MEDRENAME_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Per-OCR-call timeout in seconds.
    #[arg(long, env = "MEDRENAME_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Longest edge of the page image sent to OCR, in pixels.
    #[arg(long, env = "MEDRENAME_MAX_PIXELS", default_value_t = 2000)]
    max_pixels: u32,

    /// Extract and print fields for a single PDF; nothing is moved.
    #[arg(long)]
    inspect: bool,

    /// Print the batch report (or --inspect result) as JSON on stdout.
    #[arg(long, env = "MEDRENAME_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "MEDRENAME_NO_PROGRESS")]
    no_progress: bool,

    /// Also write logs to this file.
    #[arg(long, env = "MEDRENAME_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MEDRENAME_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MEDRENAME_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs on the terminal; the log file, if
    // any, always gets at least INFO.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect;
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    init_logging(level, cli.verbose, cli.log_file.as_deref())?;

    let extraction = build_extraction_config(&cli)?;

    if cli.inspect {
        return run_inspect(&cli, extraction).await;
    }

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, extraction, progress_cb)?;
    let report = process_directory(&config).await.context("Batch failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        print_summary(&report, show_progress);
    }

    Ok(())
}

fn init_logging(level: &str, verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let stderr_filter = if verbose {
        EnvFilter::new(level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };
    let stderr_layer = fmt::layer().with_writer(io::stderr).with_filter(stderr_filter);

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            let file_level = if verbose { "debug" } else { "info" };
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(EnvFilter::new(file_level)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_extraction_config(cli: &Cli) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .lookbehind_chars(cli.lookbehind)
        .accept_low_confidence(!cli.no_low_confidence);

    if let Some(ref path) = cli.blocklist {
        let extra = read_blocklist(path)?;
        builder = builder.extend_blocklist(extra);
    }

    builder.build().context("Invalid extraction configuration")
}

fn read_blocklist(path: &Path) -> Result<Vec<String>> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read blocklist from {}", path.display()))?;
    Ok(parse_blocklist(&body))
}

/// One phrase per line; blank lines and `#` comments are ignored.
fn parse_blocklist(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Map CLI args to `BatchConfig`.
fn build_config(
    cli: &Cli,
    extraction: ExtractionConfig,
    progress: Option<ProgressCallback>,
) -> Result<BatchConfig> {
    let mut builder = BatchConfig::builder()
        .input_dir(&cli.input)
        .extraction(extraction)
        .max_pages(cli.max_pages as usize)
        .ocr(cli.ocr)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .max_rendered_pixels(cli.max_pixels)
        .name_style(cli.name_style)
        .file_suffix(cli.suffix.clone())
        .max_name_len(cli.max_name_len)
        .unresolved_file(cli.unresolved_file.clone())
        .dry_run(cli.dry_run);

    if let Some(ref dir) = cli.output_dir {
        builder = builder.output_dir(dir);
    }
    if let Some(ref path) = cli.report {
        builder = builder.report_path(path);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn run_inspect(cli: &Cli, extraction: ExtractionConfig) -> Result<()> {
    if !input::has_pdf_extension(&cli.input) || !cli.input.is_file() {
        anyhow::bail!("--inspect expects a PDF file, got {}", cli.input.display());
    }

    let config = build_config(cli, extraction, None)?;
    let source = PdfTextSource::from_config(&config).context("Failed to initialise PDF source")?;
    let extractor = Extractor::new(&config.extraction);

    let (text, analysis) = inspect_file(&source, &extractor, &cli.input)
        .await
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&analysis).context("Failed to serialise analysis")?
        );
        return Ok(());
    }

    println!("File:         {}", cli.input.display());
    println!("Text:         {} chars", text.chars().count());
    match analysis.outcome.identity() {
        Some(id) => {
            println!("Patient:      {}", id.name.display());
            println!("DOB:          {}", id.dob);
            println!("Strategy:     {} ({})", id.strategy, id.strategy.confidence());
            println!("Matcher:      {}", id.matcher);
        }
        None => println!("Patient:      {}", red("unresolved")),
    }
    let f = &analysis.fields;
    if let Some(ref n) = f.patient_name {
        println!("Member name:  {}", n.display());
    }
    if let Some(ref d) = f.dob {
        println!("Member DOB:   {}", d);
    }
    if let Some(ref p) = f.physician {
        println!("PCP:          {}", p);
    }
    if let Some(ref o) = f.organization {
        println!("IPA:          {}", o);
    }
    Ok(())
}

fn print_summary(report: &BatchReport, progress_shown: bool) {
    let s = &report.stats;
    if !progress_shown {
        eprintln!(
            "Renamed {}/{} files in {}ms",
            s.resolved(),
            s.total,
            s.duration_ms
        );
    }
    if s.low_confidence > 0 {
        eprintln!(
            "   {} renamed with low confidence (name and DOB found separately)",
            yellow(&s.low_confidence.to_string())
        );
    }
    if let Some(ref list) = report.unresolved_list {
        if s.unresolved + s.failed > 0 {
            eprintln!(
                "   {} unresolved  →  {}",
                red(&(s.unresolved + s.failed).to_string()),
                bold(&list.display().to_string())
            );
        }
    }
    if let Some(ref path) = report.report_path {
        eprintln!("   report  →  {}", bold(&path.display().to_string()));
    }
    if report.dry_run {
        eprintln!("   {}", dim("dry run: no files were moved"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_maps_to_config() {
        let cli = Cli::parse_from([
            "medrename",
            "PDFs2",
            "--dry-run",
            "--name-style",
            "title",
            "--max-pages",
            "3",
            "--lookbehind",
            "300",
            "--no-low-confidence",
        ]);
        let extraction = build_extraction_config(&cli).unwrap();
        assert_eq!(extraction.lookbehind_chars, 300);
        assert!(!extraction.accept_low_confidence);

        let config = build_config(&cli, extraction, None).unwrap();
        assert_eq!(config.input_dir, PathBuf::from("PDFs2"));
        assert_eq!(config.output_dir(), PathBuf::from("PDFs2/Renamed"));
        assert_eq!(config.name_style, NameStyle::Title);
        assert_eq!(config.max_pages, 3);
        assert!(config.dry_run);
        assert!(!config.ocr);
    }

    #[test]
    fn cli_rejects_bad_lookbehind() {
        let cli = Cli::parse_from(["medrename", "PDFs2", "--lookbehind", "10"]);
        assert!(build_extraction_config(&cli).is_err());
    }

    #[test]
    fn cli_rejects_bad_name_style() {
        assert!(Cli::try_parse_from(["medrename", "PDFs2", "--name-style", "fancy"]).is_err());
    }

    #[test]
    fn blocklist_file_format() {
        let phrases = parse_blocklist("# clinics\nCLINICA\n\n  urgent care  \n");
        assert_eq!(phrases, ["CLINICA", "urgent care"]);
    }

    #[test]
    fn truncate_long_reasons() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5).chars().count(), 5);
    }
}
