//! PDFium access: text layer extraction and first-page rasterisation.
//!
//! `pdfium-render` wraps a C++ library that is not async-safe, so every call
//! here runs on `tokio::task::spawn_blocking`.
//!
//! The library is located in this order:
//! 1. `PDFIUM_DYNAMIC_LIB_PATH` (path to the library file)
//! 2. the current directory
//! 3. system library search paths

use crate::error::{DocumentError, RenameError};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const PDFIUM_PATH_ENV: &str = "PDFIUM_DYNAMIC_LIB_PATH";

/// Bind to the PDFium shared library.
pub fn load_pdfium() -> Result<Pdfium, RenameError> {
    if let Ok(path) = std::env::var(PDFIUM_PATH_ENV) {
        debug!(%path, "Binding PDFium from env var");
        return Pdfium::bind_to_library(&path)
            .map(Pdfium::new)
            .map_err(|e| RenameError::PdfiumUnavailable(format!("{path}: {e}")));
    }

    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| RenameError::PdfiumUnavailable(e.to_string()))?;
    Ok(Pdfium::new(bindings))
}

/// Text of the first `max_pages` pages, joined by `\n`.
///
/// A page whose text layer cannot be read contributes nothing; a scanned
/// document therefore yields an empty or whitespace-only string.
pub async fn extract_text(path: &Path, max_pages: usize) -> Result<String, DocumentError> {
    let path = path.to_path_buf();
    let task_path = path.clone();
    tokio::task::spawn_blocking(move || extract_text_blocking(&task_path, max_pages))
        .await
        .map_err(|e| DocumentError::TextExtractionFailure {
            path,
            detail: format!("text task panicked: {e}"),
        })?
}

fn extract_text_blocking(path: &Path, max_pages: usize) -> Result<String, DocumentError> {
    let pdfium = load_pdfium().map_err(|e| DocumentError::TextExtractionFailure {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    let document = open(&pdfium, path)?;

    let pages = document.pages();
    let total = pages.len() as usize;
    let mut texts = Vec::with_capacity(total.min(max_pages));

    for (idx, page) in pages.iter().enumerate().take(max_pages) {
        match page.text() {
            Ok(text) => texts.push(text.all()),
            Err(e) => warn!(page = idx + 1, "Text layer unreadable: {e:?}"),
        }
    }

    let text = texts.join("\n");
    debug!(
        "Extracted {} chars from {}/{} pages of {}",
        text.len(),
        texts.len(),
        total,
        path.display()
    );
    Ok(text)
}

/// Render the first page with its longest edge capped at `max_pixels`.
pub async fn render_first_page(path: &Path, max_pixels: u32) -> Result<DynamicImage, DocumentError> {
    let path: PathBuf = path.to_path_buf();
    let task_path = path.clone();
    tokio::task::spawn_blocking(move || render_first_page_blocking(&task_path, max_pixels))
        .await
        .map_err(|e| DocumentError::TextExtractionFailure {
            path,
            detail: format!("render task panicked: {e}"),
        })?
}

fn render_first_page_blocking(path: &Path, max_pixels: u32) -> Result<DynamicImage, DocumentError> {
    let fail = |detail: String| DocumentError::TextExtractionFailure {
        path: path.to_path_buf(),
        detail,
    };

    let pdfium = load_pdfium().map_err(|e| fail(e.to_string()))?;
    let document = open(&pdfium, path)?;
    let page = document
        .pages()
        .get(0)
        .map_err(|e| fail(format!("no first page: {e:?}")))?;

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| fail(format!("rasterisation failed: {e:?}")))?;

    let image = bitmap.as_image();
    debug!("Rendered first page → {}x{} px", image.width(), image.height());
    Ok(image)
}

fn open<'a>(pdfium: &'a Pdfium, path: &Path) -> Result<PdfDocument<'a>, DocumentError> {
    pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| DocumentError::CorruptPdf {
            path: path.to_path_buf(),
            detail: format!("{e:?}"),
        })
}
