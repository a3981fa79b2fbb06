//! Configuration types for extraction and batch renaming.
//!
//! Two layers, each built through a validating builder:
//!
//! * [`ExtractionConfig`]: immutable tables and knobs for the text engine
//!   (blocklist, OCR substitutions, lookbehind window). No I/O.
//! * [`BatchConfig`]: everything around it: directories, PDF page limit,
//!   the OCR fallback provider, file-naming style, report paths.
//!
//! Setters clamp obviously out-of-range numbers; [`build`](BatchConfigBuilder::build)
//! rejects combinations that cannot work.

use crate::error::RenameError;
use crate::extract::name::default_blocklist;
use crate::extract::normalize::{default_substitutions, Substitution};
use crate::extract::PersonName;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Smallest and largest accepted lookbehind window, in characters.
pub const LOOKBEHIND_RANGE: (usize, usize) = (50, 2000);

/// Name of the output subdirectory created under the input directory.
pub const DEFAULT_OUTPUT_SUBDIR: &str = "Renamed";

// ── Extraction ───────────────────────────────────────────────────────────

/// Tables and knobs for the field-extraction engine.
///
/// # Example
/// ```rust
/// use medrename::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .lookbehind_chars(300)
///     .accept_low_confidence(false)
///     .build()
///     .unwrap();
/// assert_eq!(config.lookbehind_chars, 300);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Phrases that disqualify a name candidate (case-insensitive substring).
    pub blocklist: Vec<String>,

    /// OCR label fixes applied before any pattern runs.
    pub substitutions: Vec<Substitution>,

    /// Characters searched before each DOB label for a name. Default: 200.
    pub lookbehind_chars: usize,

    /// Whether a decoupled (strategy C) pairing may be used. Default: true.
    pub accept_low_confidence: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            blocklist: default_blocklist(),
            substitutions: default_substitutions(),
            lookbehind_chars: 200,
            accept_low_confidence: true,
        }
    }
}

impl ExtractionConfig {
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    /// Replace the blocklist.
    pub fn blocklist(mut self, entries: Vec<String>) -> Self {
        self.config.blocklist = entries;
        self
    }

    /// Add to the current blocklist.
    pub fn extend_blocklist<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.blocklist.extend(entries.into_iter().map(Into::into));
        self
    }

    pub fn substitutions(mut self, table: Vec<Substitution>) -> Self {
        self.config.substitutions = table;
        self
    }

    pub fn lookbehind_chars(mut self, n: usize) -> Self {
        self.config.lookbehind_chars = n;
        self
    }

    pub fn accept_low_confidence(mut self, v: bool) -> Self {
        self.config.accept_low_confidence = v;
        self
    }

    pub fn build(self) -> Result<ExtractionConfig, RenameError> {
        let (lo, hi) = LOOKBEHIND_RANGE;
        let n = self.config.lookbehind_chars;
        if !(lo..=hi).contains(&n) {
            return Err(RenameError::InvalidConfig(format!(
                "lookbehind window must be {lo}–{hi} characters, got {n}"
            )));
        }
        Ok(self.config)
    }
}

// ── Batch ────────────────────────────────────────────────────────────────

/// How the patient name is written into the target file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NameStyle {
    /// `JOHN SMITH` (default)
    #[default]
    Upper,
    /// `John Smith`
    Title,
    /// `SMITH JOHN`
    FamilyFirst,
}

impl NameStyle {
    pub fn apply(self, name: &PersonName) -> String {
        match self {
            NameStyle::Upper => name.upper(),
            NameStyle::Title => name.display(),
            NameStyle::FamilyFirst => name.family_first(),
        }
    }
}

impl std::str::FromStr for NameStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "upper" => Ok(NameStyle::Upper),
            "title" => Ok(NameStyle::Title),
            "family-first" | "last-first" => Ok(NameStyle::FamilyFirst),
            other => Err(format!(
                "unknown name style '{other}' (expected upper, title or family-first)"
            )),
        }
    }
}

/// Configuration for one batch run over a directory of PDFs.
///
/// # Example
/// ```rust
/// use medrename::{BatchConfig, NameStyle};
///
/// let config = BatchConfig::builder()
///     .input_dir("/data/PDFs2")
///     .name_style(NameStyle::Title)
///     .dry_run(true)
///     .build()
///     .unwrap();
/// assert!(config.output_dir().ends_with("Renamed"));
/// ```
#[derive(Clone)]
pub struct BatchConfig {
    /// Directory scanned (non-recursively) for `*.pdf`.
    pub input_dir: PathBuf,

    /// Where renamed files go. Default: `<input_dir>/Renamed`.
    pub output_dir: Option<PathBuf>,

    /// Engine configuration.
    pub extraction: ExtractionConfig,

    /// Pages of text read per document. Default: 10.
    ///
    /// Identity blocks sit on the first pages; long lab bundles otherwise
    /// cost seconds of text extraction for nothing.
    pub max_pages: usize,

    /// Transcribe the first page with a vision model when a PDF has no text
    /// layer. Default: false.
    pub ocr: bool,

    /// Vision model identifier, e.g. "gpt-4.1-nano".
    pub model: Option<String>,

    /// Provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for transcription. Default: 0.0.
    pub temperature: f32,

    /// Maximum tokens per transcription. Default: 4096.
    pub max_tokens: usize,

    /// Retries on a failed OCR call. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay, doubled per attempt. Default: 500 ms.
    pub retry_backoff_ms: u64,

    /// Per-OCR-call timeout. Default: 60 s.
    pub api_timeout_secs: u64,

    /// Longest edge of the rasterised page sent to OCR. Default: 2000 px.
    pub max_rendered_pixels: u32,

    /// Style of the name part of the target file name.
    pub name_style: NameStyle,

    /// Text between the date and `.pdf`. Default: `" - Medical Records"`.
    pub file_suffix: String,

    /// Cap on the base name, in characters. Default: 150.
    pub max_name_len: usize,

    /// Optional CSV report path.
    pub report_path: Option<PathBuf>,

    /// Unresolved list, written into the output directory. Default: `unresolved.txt`.
    pub unresolved_file: String,

    /// Compute names and write the report, but move nothing.
    pub dry_run: bool,

    /// Optional per-document progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::new(),
            output_dir: None,
            extraction: ExtractionConfig::default(),
            max_pages: 10,
            ocr: false,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            max_rendered_pixels: 2000,
            name_style: NameStyle::default(),
            file_suffix: " - Medical Records".to_string(),
            max_name_len: 150,
            report_path: None,
            unresolved_file: "unresolved.txt".to_string(),
            dry_run: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("extraction", &self.extraction)
            .field("max_pages", &self.max_pages)
            .field("ocr", &self.ocr)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("max_retries", &self.max_retries)
            .field("name_style", &self.name_style)
            .field("file_suffix", &self.file_suffix)
            .field("max_name_len", &self.max_name_len)
            .field("report_path", &self.report_path)
            .field("unresolved_file", &self.unresolved_file)
            .field("dry_run", &self.dry_run)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl BatchConfig {
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self::default(),
        }
    }

    /// The effective output directory.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.input_dir.join(DEFAULT_OUTPUT_SUBDIR))
    }

    pub fn unresolved_path(&self) -> PathBuf {
        self.output_dir().join(&self.unresolved_file)
    }
}

/// Builder for [`BatchConfig`].
#[derive(Debug)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.input_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    pub fn extraction(mut self, extraction: ExtractionConfig) -> Self {
        self.config.extraction = extraction;
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = n.max(1);
        self
    }

    pub fn ocr(mut self, enabled: bool) -> Self {
        self.config.ocr = enabled;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn name_style(mut self, style: NameStyle) -> Self {
        self.config.name_style = style;
        self
    }

    pub fn file_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.file_suffix = suffix.into();
        self
    }

    pub fn max_name_len(mut self, n: usize) -> Self {
        self.config.max_name_len = n;
        self
    }

    pub fn report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.report_path = Some(path.into());
        self
    }

    pub fn unresolved_file(mut self, name: impl Into<String>) -> Self {
        self.config.unresolved_file = name.into();
        self
    }

    pub fn dry_run(mut self, v: bool) -> Self {
        self.config.dry_run = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, RenameError> {
        let c = &self.config;
        if c.input_dir.as_os_str().is_empty() {
            return Err(RenameError::InvalidConfig("input directory is required".into()));
        }
        if c.max_name_len < 16 {
            return Err(RenameError::InvalidConfig(format!(
                "max name length must be at least 16, got {}",
                c.max_name_len
            )));
        }
        if !is_plain_file_name(&c.unresolved_file) {
            return Err(RenameError::InvalidConfig(format!(
                "unresolved list must be a plain file name, got '{}'",
                c.unresolved_file
            )));
        }
        let extraction = ExtractionConfigBuilder {
            config: c.extraction.clone(),
        }
        .build()?;
        let mut config = self.config;
        config.extraction = extraction;
        Ok(config)
    }
}

fn is_plain_file_name(name: &str) -> bool {
    let p = Path::new(name);
    !name.is_empty() && p.file_name().map(|f| f == p.as_os_str()).unwrap_or(false)
}
