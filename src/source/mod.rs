//! Text sources: where the raw document text comes from.
//!
//! ```text
//! path ──▶ input (magic check) ──▶ pdf (text layer, first N pages)
//!                                      │ blank?
//!                                      ▼
//!                      pdf (render page 1) ──▶ encode ──▶ ocr (vision model)
//! ```
//!
//! 1. [`input`]   list `*.pdf`, verify `%PDF` magic
//! 2. [`pdf`]     PDFium text layer and rasterisation, on `spawn_blocking`
//! 3. [`encode`]  PNG → base64 `ImageData`
//! 4. [`ocr`]     vision-model transcription with retry/backoff
//! 5. [`cleanup`] zero-width characters, stray code fences
//!
//! The batch driver only sees the [`TextSource`] trait, so tests can feed it
//! canned text without PDFium or a network.

pub mod cleanup;
pub mod encode;
pub mod input;
pub mod ocr;
pub mod pdf;

use crate::config::BatchConfig;
use crate::error::{DocumentError, RenameError};
use ocr::VisionOcr;
use std::future::Future;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Produces the raw text of one document.
///
/// Pages are joined with `\n`. `Err` means no text could be obtained at all.
pub trait TextSource {
    fn extract_text(&self, path: &Path) -> impl Future<Output = Result<String, DocumentError>> + Send;
}

/// PDFium text layer with an optional vision-OCR fallback.
#[derive(Debug, Clone)]
pub struct PdfTextSource {
    max_pages: usize,
    max_rendered_pixels: u32,
    ocr: Option<VisionOcr>,
}

impl PdfTextSource {
    /// Text layer only.
    pub fn new(max_pages: usize) -> Self {
        Self {
            max_pages: max_pages.max(1),
            max_rendered_pixels: 2000,
            ocr: None,
        }
    }

    /// Attach an OCR fallback.
    pub fn with_ocr(mut self, ocr: VisionOcr, max_rendered_pixels: u32) -> Self {
        self.ocr = Some(ocr);
        self.max_rendered_pixels = max_rendered_pixels;
        self
    }

    /// Build from a batch config, verifying PDFium loads and, when OCR is
    /// enabled, that a vision provider can be created.
    pub fn from_config(config: &BatchConfig) -> Result<Self, RenameError> {
        pdf::load_pdfium()?;
        let source = Self::new(config.max_pages);
        if config.ocr {
            let ocr = VisionOcr::from_config(config)?;
            Ok(source.with_ocr(ocr, config.max_rendered_pixels))
        } else {
            Ok(source)
        }
    }

    pub fn ocr_enabled(&self) -> bool {
        self.ocr.is_some()
    }

    async fn ocr_first_page(&self, ocr: &VisionOcr, path: &Path) -> Result<String, DocumentError> {
        let fail = |detail: String| DocumentError::TextExtractionFailure {
            path: path.to_path_buf(),
            detail,
        };

        let image = pdf::render_first_page(path, self.max_rendered_pixels).await?;
        let data = encode::encode_page(&image).map_err(|e| fail(format!("image encoding failed: {e}")))?;
        let text = ocr.transcribe(data).await.map_err(fail)?;
        if text.trim().is_empty() {
            return Err(fail("OCR returned no text".into()));
        }
        info!("OCR produced {} chars for {}", text.len(), path.display());
        Ok(text)
    }
}

impl TextSource for PdfTextSource {
    async fn extract_text(&self, path: &Path) -> Result<String, DocumentError> {
        input::check_pdf(path)?;

        let text = cleanup::clean_page_text(&pdf::extract_text(path, self.max_pages).await?);
        if !text.trim().is_empty() {
            return Ok(text);
        }

        debug!("No text layer in {}", path.display());
        match &self.ocr {
            Some(ocr) => self.ocr_first_page(ocr, path).await,
            None => Err(DocumentError::TextExtractionFailure {
                path: path.to_path_buf(),
                detail: "no text layer and OCR is disabled".into(),
            }),
        }
    }
}

/// Extract text from PDF bytes held in memory.
///
/// The bytes are written to a managed temp file because PDFium opens paths;
/// the file is removed when this returns.
pub async fn extract_text_from_bytes<S: TextSource>(
    source: &S,
    bytes: &[u8],
) -> Result<String, DocumentError> {
    let internal = |e: std::io::Error| DocumentError::ReadFailed {
        path: "<memory>".into(),
        detail: format!("tempfile: {e}"),
    };
    let mut tmp = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .map_err(internal)?;
    tmp.write_all(bytes).map_err(internal)?;
    tmp.flush().map_err(internal)?;
    source.extract_text(tmp.path()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoSource;

    impl TextSource for EchoSource {
        async fn extract_text(&self, path: &Path) -> Result<String, DocumentError> {
            std::fs::read_to_string(path).map_err(|e| DocumentError::ReadFailed {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })
        }
    }

    #[tokio::test]
    async fn bytes_go_through_a_temp_file() {
        let text = extract_text_from_bytes(&EchoSource, b"SMITH, JOHN DOB: 03/04/1980")
            .await
            .unwrap();
        assert_eq!(text, "SMITH, JOHN DOB: 03/04/1980");
    }

    #[tokio::test]
    async fn non_pdf_rejected_before_pdfium() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, b"hello world").unwrap();
        let err = PdfTextSource::new(10).extract_text(&path).await.unwrap_err();
        assert!(matches!(err, DocumentError::NotAPdf { .. }));
    }

    #[test]
    fn text_only_source_has_no_ocr() {
        let s = PdfTextSource::new(0);
        assert!(!s.ocr_enabled());
        assert_eq!(s.max_pages, 1);
    }
}
