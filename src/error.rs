//! Error types for the medrename library.
//!
//! Three tiers reflect three distinct failure scopes:
//!
//! * [`RenameError`] (fatal): the batch cannot proceed at all (input
//!   directory missing, output directory not creatable, bad configuration).
//!   Returned as `Err(RenameError)` from the top-level `process_*` functions.
//!
//! * [`DocumentError`] (per document): one file could not be read or
//!   moved. Stored inside [`crate::output::DocumentRecord`] so the batch keeps
//!   going and the file lands on the unresolved list.
//!
//! * [`FieldError`] (per candidate): a captured date or name did not pass
//!   normalisation. The extraction engine swallows these and moves on to the
//!   next candidate match; they surface only in trace logs and unit tests.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the medrename library.
#[derive(Debug, Error)]
pub enum RenameError {
    /// Input directory was not found.
    #[error("Input directory not found: '{path}'\nCheck the path exists and is a directory.")]
    InputDirNotFound { path: PathBuf },

    /// Could not list the input directory.
    #[error("Failed to read input directory '{path}': {source}")]
    InputDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create the output directory.
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not write the CSV report or the unresolved list.
    #[error("Failed to write report '{path}': {detail}")]
    ReportWriteFailed { path: PathBuf, detail: String },

    /// OCR fallback was requested but no vision provider could be created.
    #[error("OCR provider '{provider}' is not configured.\n{hint}")]
    OcrProviderUnavailable { provider: String, hint: String },

    /// PDFium could not be loaded.
    #[error("PDFium library not available: {0}\nSet PDFIUM_DYNAMIC_LIB_PATH or install libpdfium.")]
    PdfiumUnavailable(String),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

}

/// A non-fatal error for a single document.
///
/// The batch records it and continues with the next file.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum DocumentError {
    /// The file exists and was read, but is not a PDF.
    #[error("'{path}' is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// pdfium could not open the document.
    #[error("PDF '{path}' could not be opened: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// Neither the text layer nor the OCR fallback produced any text.
    #[error("No text could be extracted from '{path}': {detail}")]
    TextExtractionFailure { path: PathBuf, detail: String },

    /// The file could not be read from disk.
    #[error("Failed to read '{path}': {detail}")]
    ReadFailed { path: PathBuf, detail: String },

    /// Every collision counter for the target name is already taken.
    #[error("No free name for '{base}' in '{dir}' after {attempts} attempts")]
    NameExhausted {
        dir: PathBuf,
        base: String,
        attempts: usize,
    },

    /// The renamed file could not be placed in the output directory.
    #[error("Failed to move '{from}' to '{to}': {detail}")]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        detail: String,
    },
}

/// Rejection of a single captured candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// No day/month/year triple could be resolved, or the year is implausible.
    #[error("cannot parse date from {input:?}: {reason}")]
    DateParse { input: String, reason: String },

    /// The candidate is not a plausible person name.
    #[error("rejected name {candidate:?}: {reason}")]
    NameRejected { candidate: String, reason: String },
}

impl FieldError {
    pub(crate) fn date(input: &str, reason: impl Into<String>) -> Self {
        FieldError::DateParse {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}
