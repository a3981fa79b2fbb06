//! Per-document records and batch-level results.

use crate::error::DocumentError;
use crate::extract::{Confidence, DocumentFields, ExtractionOutcome};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Where a document ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Renamed from a strategy A or B identity.
    Renamed,
    /// Renamed from a decoupled (strategy C) identity.
    RenamedLowConfidence,
    /// Text was read but no identity could be formed.
    Unresolved,
    /// The document could not be read or moved.
    Failed,
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocumentStatus::Renamed => "renamed",
            DocumentStatus::RenamedLowConfidence => "renamed (low confidence)",
            DocumentStatus::Unresolved => "unresolved",
            DocumentStatus::Failed => "failed",
        })
    }
}

/// Everything recorded about one input file.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRecord {
    /// Original path.
    pub source: PathBuf,

    /// Original file name, as written to the unresolved list and the report.
    pub file_name: String,

    /// Independently extracted fields (name, DOB, physician, IPA).
    pub fields: DocumentFields,

    /// Strategy cascade result.
    pub outcome: ExtractionOutcome,

    /// Final path (or, in a dry run, the path it would have had).
    pub target: Option<PathBuf>,

    /// Read or move failure, if any.
    pub error: Option<DocumentError>,

    /// Characters of raw text obtained.
    pub text_len: usize,

    /// Wall-clock time spent on this document.
    pub duration_ms: u64,
}

impl DocumentRecord {
    pub fn status(&self) -> DocumentStatus {
        if self.error.is_some() {
            return DocumentStatus::Failed;
        }
        match (&self.target, self.outcome.confidence()) {
            (Some(_), Some(Confidence::High)) => DocumentStatus::Renamed,
            (Some(_), Some(Confidence::Low)) => DocumentStatus::RenamedLowConfidence,
            _ => DocumentStatus::Unresolved,
        }
    }

    /// True when the file belongs on the unresolved list.
    pub fn is_unresolved(&self) -> bool {
        matches!(
            self.status(),
            DocumentStatus::Unresolved | DocumentStatus::Failed
        )
    }

    /// Target file name, if any.
    pub fn target_name(&self) -> Option<String> {
        self.target
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }
}

/// Aggregate counters for a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub total: usize,
    pub renamed: usize,
    pub low_confidence: usize,
    pub unresolved: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

impl BatchStats {
    pub fn from_records(records: &[DocumentRecord], duration_ms: u64) -> Self {
        let mut stats = Self {
            total: records.len(),
            duration_ms,
            ..Self::default()
        };
        for r in records {
            match r.status() {
                DocumentStatus::Renamed => stats.renamed += 1,
                DocumentStatus::RenamedLowConfidence => stats.low_confidence += 1,
                DocumentStatus::Unresolved => stats.unresolved += 1,
                DocumentStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    /// Documents that received a name, at any confidence.
    pub fn resolved(&self) -> usize {
        self.renamed + self.low_confidence
    }
}

/// The result of [`crate::process_directory`].
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub records: Vec<DocumentRecord>,
    pub stats: BatchStats,
    pub output_dir: PathBuf,
    /// Unresolved list written, if any.
    pub unresolved_list: Option<PathBuf>,
    /// CSV report written, if any.
    pub report_path: Option<PathBuf>,
    pub dry_run: bool,
}

impl BatchReport {
    pub fn unresolved(&self) -> impl Iterator<Item = &DocumentRecord> {
        self.records.iter().filter(|r| r.is_unresolved())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{DateValue, Identity, PersonName, Strategy};

    fn record(outcome: ExtractionOutcome, target: Option<&str>) -> DocumentRecord {
        DocumentRecord {
            source: PathBuf::from("in/a.pdf"),
            file_name: "a.pdf".into(),
            fields: DocumentFields::default(),
            outcome,
            target: target.map(PathBuf::from),
            error: None,
            text_len: 0,
            duration_ms: 1,
        }
    }

    fn identity(strategy: Strategy) -> Identity {
        Identity {
            name: PersonName::new("John", "Smith"),
            dob: DateValue::new(3, 4, 1980).unwrap(),
            strategy,
            matcher: "test",
        }
    }

    #[test]
    fn status_follows_outcome_and_target() {
        let hi = record(
            ExtractionOutcome::Resolved(identity(Strategy::CoOccurrence)),
            Some("out/x.pdf"),
        );
        assert_eq!(hi.status(), DocumentStatus::Renamed);
        assert_eq!(hi.target_name().as_deref(), Some("x.pdf"));

        let lo = record(
            ExtractionOutcome::ResolvedLowConfidence(identity(Strategy::Decoupled)),
            Some("out/y.pdf"),
        );
        assert_eq!(lo.status(), DocumentStatus::RenamedLowConfidence);
        assert!(!lo.is_unresolved());

        let none = record(ExtractionOutcome::Unresolved, None);
        assert_eq!(none.status(), DocumentStatus::Unresolved);
        assert!(none.is_unresolved());
    }

    #[test]
    fn error_wins_over_outcome() {
        let mut r = record(
            ExtractionOutcome::Resolved(identity(Strategy::DobProximity)),
            Some("out/x.pdf"),
        );
        r.error = Some(DocumentError::MoveFailed {
            from: "a".into(),
            to: "b".into(),
            detail: "busy".into(),
        });
        assert_eq!(r.status(), DocumentStatus::Failed);
    }

    #[test]
    fn stats_count_each_status() {
        let records = vec![
            record(
                ExtractionOutcome::Resolved(identity(Strategy::CoOccurrence)),
                Some("x.pdf"),
            ),
            record(
                ExtractionOutcome::ResolvedLowConfidence(identity(Strategy::Decoupled)),
                Some("y.pdf"),
            ),
            record(ExtractionOutcome::Unresolved, None),
        ];
        let stats = BatchStats::from_records(&records, 42);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.renamed, 1);
        assert_eq!(stats.low_confidence, 1);
        assert_eq!(stats.unresolved, 1);
        assert_eq!(stats.resolved(), 2);
        assert_eq!(stats.duration_ms, 42);
    }
}
