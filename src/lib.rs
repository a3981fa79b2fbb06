//! # medrename
//!
//! Extract patient identity from medical PDFs and rename the files after it.
//!
//! Scanned referrals, lab reports and authorisation forms arrive with
//! meaningless names (`scan_0042.pdf`). This crate reads each document,
//! finds the patient's name and date of birth, and moves the file to
//! `JOHN SMITH (03-04-1980) - Medical Records.pdf`. Files it cannot identify
//! are listed in `unresolved.txt` for manual review.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Source     %PDF check, PDFium text layer (first N pages)
//!  │                └─ blank? first page → PNG → vision-model OCR
//!  ├─ 2. Normalize  OCR label fixes (D0B → DOB), whitespace collapse
//!  ├─ 3. Extract    strategy cascade A → B → C for (name, DOB)
//!  │                plus independent PCP / IPA extractors
//!  ├─ 4. Assemble   safe file name, collision suffix, move
//!  └─ 5. Report     unresolved list, optional CSV
//! ```
//!
//! The extraction engine ([`extract`]) is pure: text in, values out. It can
//! be used on its own without PDFium:
//!
//! ```rust
//! use medrename::Extractor;
//!
//! let outcome = Extractor::default().resolve("Patient Name: SMITH, JOHN\nDOB: 03/04/1980");
//! let id = outcome.identity().unwrap();
//! assert_eq!(id.name.display(), "John Smith");
//! assert_eq!(id.dob.to_string(), "03-04-1980");
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use medrename::{process_directory, BatchConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BatchConfig::builder()
//!         .input_dir("PDFs2")
//!         .report_path("PDFs2/Renamed/report.csv")
//!         .build()?;
//!     let report = process_directory(&config).await?;
//!     eprintln!("{}/{} renamed", report.stats.resolved(), report.stats.total);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `medrename` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod assemble;
pub mod batch;
pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod progress;
pub mod prompts;
pub mod source;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{inspect_file, process_directory, process_directory_with};
pub use config::{
    BatchConfig, BatchConfigBuilder, ExtractionConfig, ExtractionConfigBuilder, NameStyle,
};
pub use error::{DocumentError, FieldError, RenameError};
pub use extract::{
    Analysis, Confidence, DateValue, DocumentFields, ExtractionOutcome, Extractor, Identity,
    NameValidator, PersonName, Strategy,
};
pub use output::{BatchReport, BatchStats, DocumentRecord, DocumentStatus};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use source::{PdfTextSource, TextSource};
