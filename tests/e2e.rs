//! End-to-end tests for medrename against real PDFs.
//!
//! These tests use PDF files in `./test_cases/` and need the PDFium shared
//! library; the OCR test also makes live vision-model calls. They are gated
//! behind the `E2E_ENABLED` environment variable so they do not run in CI
//! unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 LD_LIBRARY_PATH=. cargo test --test e2e -- --nocapture
//!
//! OCR fallback (scanned page without a text layer):
//!   E2E_ENABLED=1 OPENAI_API_KEY=sk-... cargo test --test e2e ocr -- --nocapture

use medrename::source::extract_text_from_bytes;
use medrename::{
    inspect_file, process_directory, BatchConfig, BatchProgressCallback, DocumentError,
    Extractor, NoopProgressCallback, PdfTextSource, TextSource,
};
use std::path::{Path, PathBuf};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip this test if E2E_ENABLED is not set *or* no file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP: test file not found: {}", p.display());
            return;
        }
        p
    }};
}

/// Copy every PDF under `from` into a fresh temp dir so renames do not touch
/// the fixtures.
fn staged_copy(from: &Path) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for entry in std::fs::read_dir(from).unwrap() {
        let path = entry.unwrap().path();
        if medrename::source::input::has_pdf_extension(&path) {
            std::fs::copy(&path, dir.path().join(path.file_name().unwrap())).unwrap();
        }
    }
    dir
}

// ── No PDFium required ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_bytes_without_magic_are_rejected() {
    let source = PdfTextSource::new(1);
    let err = extract_text_from_bytes(&source, b"<html></html>")
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentError::NotAPdf { .. }), "{err}");
}

#[tokio::test]
async fn test_missing_file_is_read_failure() {
    let source = PdfTextSource::new(1);
    let err = source
        .extract_text(Path::new("/definitely/not/here.pdf"))
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentError::ReadFailed { .. }), "{err}");
}

#[test]
fn test_noop_callback_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<NoopProgressCallback>();
    assert_send_sync::<std::sync::Arc<dyn BatchProgressCallback>>();
}

// ── PDFium ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_inspect_text_layer_pdf() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("lab_report.pdf"));
    let source = PdfTextSource::new(10);
    let (text, analysis) = inspect_file(&source, &Extractor::default(), &path)
        .await
        .expect("inspect failed");

    println!("{} chars, outcome: {:?}", text.len(), analysis.outcome);
    assert!(!text.trim().is_empty(), "text layer is empty");
    assert!(
        !text.contains('\u{200B}') && !text.contains('\0'),
        "text was not cleaned"
    );
    assert!(analysis.outcome.is_resolved(), "no identity in lab_report.pdf");
}

#[tokio::test]
async fn test_batch_over_fixture_directory() {
    let fixtures = e2e_skip_unless_ready!(test_cases_dir());
    let staged = staged_copy(&fixtures);
    let config = BatchConfig::builder()
        .input_dir(staged.path())
        .report_path(staged.path().join("report.csv"))
        .build()
        .unwrap();

    let report = process_directory(&config).await.expect("batch failed");
    println!("{:#?}", report.stats);

    assert_eq!(report.stats.total, report.records.len());
    assert!(report.stats.total > 0, "no fixtures staged");
    let list = std::fs::read_to_string(report.unresolved_list.as_ref().unwrap()).unwrap();
    assert_eq!(list.lines().count(), report.unresolved().count());
    for r in report.records.iter().filter(|r| r.target.is_some()) {
        assert!(r.target.as_ref().unwrap().is_file(), "{} not moved", r.file_name);
    }
}

// ── OCR fallback ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_ocr_scanned_page() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("scanned_referral.pdf"));
    if std::env::var("OPENAI_API_KEY").is_err() && std::env::var("EDGEQUAKE_LLM_PROVIDER").is_err()
    {
        println!("SKIP: no vision provider configured");
        return;
    }

    let config = BatchConfig::builder()
        .input_dir(test_cases_dir())
        .ocr(true)
        .build()
        .unwrap();
    let source = PdfTextSource::from_config(&config).expect("source init failed");
    assert!(source.ocr_enabled());

    let (text, analysis) = inspect_file(&source, &Extractor::new(&config.extraction), &path)
        .await
        .expect("OCR failed");
    println!("OCR text:\n{text}\n\n{:?}", analysis.outcome);
    assert!(!text.trim().is_empty());
    assert!(!text.trim_start().starts_with("```"), "fence not stripped");
}
