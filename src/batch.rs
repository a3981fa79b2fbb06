//! Batch driver: walk a directory, extract, rename, report.
//!
//! Documents are processed strictly one after another. Collision avoidance
//! checks the output directory and then claims a name; running two documents
//! at once would race on that check.
//!
//! Only setup failures are fatal (missing input directory, uncreatable output
//! directory, unwritable report). Everything that goes wrong with a single
//! document is recorded on its [`DocumentRecord`] and the batch moves on.

use crate::assemble::{self, TargetName};
use crate::config::BatchConfig;
use crate::error::RenameError;
use crate::extract::{Analysis, DocumentFields, ExtractionOutcome, Extractor};
use crate::output::{BatchReport, BatchStats, DocumentRecord};
use crate::source::{input, PdfTextSource, TextSource};
use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Process every PDF in `config.input_dir` using PDFium (and OCR if enabled).
///
/// # Errors
/// Returns `Err` only for fatal setup errors; per-document failures are in
/// the returned report.
pub async fn process_directory(config: &BatchConfig) -> Result<BatchReport, RenameError> {
    let source = PdfTextSource::from_config(config)?;
    process_directory_with(&source, config).await
}

/// [`process_directory`] with a caller-supplied [`TextSource`].
pub async fn process_directory_with<S: TextSource>(
    source: &S,
    config: &BatchConfig,
) -> Result<BatchReport, RenameError> {
    let total_start = Instant::now();
    let pdfs = input::list_pdfs(&config.input_dir)?;
    let output_dir = config.output_dir();
    info!(
        "Processing {} PDFs from {} → {}{}",
        pdfs.len(),
        config.input_dir.display(),
        output_dir.display(),
        if config.dry_run { " (dry run)" } else { "" }
    );

    if !config.dry_run {
        std::fs::create_dir_all(&output_dir).map_err(|e| RenameError::OutputDirFailed {
            path: output_dir.clone(),
            source: e,
        })?;
    }

    let extractor = Extractor::new(&config.extraction);
    let total = pdfs.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut claimed = HashSet::new();
    let mut records = Vec::with_capacity(total);

    for (i, path) in pdfs.iter().enumerate() {
        let index = i + 1;
        let file_name = file_name_of(path);
        if let Some(ref cb) = config.progress_callback {
            cb.on_document_start(index, total, &file_name);
        }

        let record =
            process_document(source, &extractor, config, &output_dir, &mut claimed, path).await;

        if let Some(ref cb) = config.progress_callback {
            match record.target_name() {
                Some(target) if !record.is_unresolved() => {
                    cb.on_document_resolved(index, total, &record.file_name, &target)
                }
                _ => cb.on_document_unresolved(index, total, &record.file_name, &reason(&record)),
            }
        }
        records.push(record);
    }

    let unresolved_names: Vec<String> = records
        .iter()
        .filter(|r| r.is_unresolved())
        .map(|r| r.file_name.clone())
        .collect();

    let unresolved_list = if config.dry_run {
        None
    } else {
        let path = config.unresolved_path();
        assemble::write_unresolved_list(&path, &unresolved_names)?;
        Some(path)
    };

    if let Some(ref report) = config.report_path {
        assemble::write_csv_report(report, &records)?;
    }

    let stats = BatchStats::from_records(&records, total_start.elapsed().as_millis() as u64);
    info!(
        "Batch complete: {}/{} renamed ({} low confidence), {} unresolved, {} failed, {}ms",
        stats.resolved(),
        stats.total,
        stats.low_confidence,
        stats.unresolved,
        stats.failed,
        stats.duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, stats.resolved());
    }

    Ok(BatchReport {
        records,
        stats,
        output_dir,
        unresolved_list,
        report_path: config.report_path.clone(),
        dry_run: config.dry_run,
    })
}

/// Extract and analyse one document without moving anything.
pub async fn inspect_file<S: TextSource>(
    source: &S,
    extractor: &Extractor,
    path: &Path,
) -> Result<(String, Analysis), crate::error::DocumentError> {
    let text = source.extract_text(path).await?;
    let analysis = extractor.analyze(&text);
    Ok((text, analysis))
}

async fn process_document<S: TextSource>(
    source: &S,
    extractor: &Extractor,
    config: &BatchConfig,
    output_dir: &Path,
    claimed: &mut HashSet<String>,
    path: &Path,
) -> DocumentRecord {
    let start = Instant::now();
    let file_name = file_name_of(path);
    let mut record = DocumentRecord {
        source: path.to_path_buf(),
        file_name,
        fields: DocumentFields::default(),
        outcome: ExtractionOutcome::Unresolved,
        target: None,
        error: None,
        text_len: 0,
        duration_ms: 0,
    };

    let text = match source.extract_text(path).await {
        Ok(t) => t,
        Err(e) => {
            warn!("{}: {}", record.file_name, e);
            record.error = Some(e);
            record.duration_ms = start.elapsed().as_millis() as u64;
            return record;
        }
    };
    record.text_len = text.chars().count();

    let Analysis { outcome, fields } = extractor.analyze(&text);
    record.fields = fields;
    record.outcome = outcome;

    if let Some(identity) = record.outcome.identity() {
        let name = TargetName::new(
            identity,
            config.name_style,
            &config.file_suffix,
            config.max_name_len,
        );
        let target = match assemble::unique_target(output_dir, &name, claimed) {
            Ok(t) => t,
            Err(e) => {
                warn!("{}: {}", record.file_name, e);
                record.error = Some(e);
                record.duration_ms = start.elapsed().as_millis() as u64;
                return record;
            }
        };
        if let Some(n) = target.file_name() {
            claimed.insert(n.to_string_lossy().into_owned());
        }

        if config.dry_run {
            record.target = Some(target);
        } else {
            match assemble::move_file(path, &target) {
                Ok(()) => record.target = Some(target),
                Err(e) => {
                    warn!("{}", e);
                    record.error = Some(e);
                }
            }
        }

        info!(
            strategy = %identity.strategy,
            "{} → {}",
            record.file_name,
            record.target_name().unwrap_or_else(|| "<not moved>".into())
        );
    } else {
        info!("{}: no identity found", record.file_name);
        debug!(text_len = record.text_len, "unresolved");
    }

    record.duration_ms = start.elapsed().as_millis() as u64;
    record
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn reason(record: &DocumentRecord) -> String {
    match &record.error {
        Some(e) => e.to_string(),
        None => "no name/date-of-birth pair found".to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocumentError;

    struct Fixed(&'static str);

    impl TextSource for Fixed {
        async fn extract_text(&self, _path: &Path) -> Result<String, DocumentError> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn exhausted_name_fails_only_that_document() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("a.pdf");
        std::fs::write(&pdf, b"%PDF-1.7\n").unwrap();
        let config = BatchConfig::builder()
            .input_dir(dir.path())
            .dry_run(true)
            .build()
            .unwrap();
        let extractor = Extractor::new(&config.extraction);
        let text = "SMITH, JOHN DOB: 03/04/1980";

        let identity = extractor.resolve(text).into_identity().unwrap();
        let name = TargetName::new(
            &identity,
            config.name_style,
            &config.file_suffix,
            config.max_name_len,
        );
        let mut claimed: HashSet<String> = (0..=assemble::MAX_COLLISIONS)
            .map(|n| name.candidate(n))
            .collect();

        let source = Fixed(text);
        let output_dir = config.output_dir();
        let record =
            process_document(&source, &extractor, &config, &output_dir, &mut claimed, &pdf).await;
        assert!(matches!(record.error, Some(DocumentError::NameExhausted { .. })));
        assert!(record.is_unresolved());
        assert!(record.target.is_none());
        assert!(pdf.exists());

        claimed.clear();
        let record =
            process_document(&source, &extractor, &config, &output_dir, &mut claimed, &pdf).await;
        assert!(record.error.is_none());
        assert_eq!(
            record.target_name().as_deref(),
            Some(name.candidate(0).as_str())
        );
    }
}
