//! Output assembly: target names, collision handling, moves, reports.
//!
//! A resolved identity becomes `"{NAME} ({MM-DD-YYYY}){suffix}.pdf"`. The
//! base part is made filesystem-safe on every platform (the Windows forbidden
//! set is the strictest) and capped in length. When the name is taken, a
//! counter is inserted before the suffix: `… (1) - Medical Records.pdf`.

use crate::config::NameStyle;
use crate::error::{DocumentError, RenameError};
use crate::extract::Identity;
use crate::output::DocumentRecord;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Characters that may not appear in a file name on Windows, plus line breaks.
const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*', '\r', '\n'];

/// Upper bound on collision counters tried before giving up.
pub(crate) const MAX_COLLISIONS: usize = 10_000;

/// Replace forbidden characters with `-`, collapse whitespace, trim, and cap
/// at `max_len` characters. Tabs and other whitespace controls become spaces.
pub fn safe_base_name(raw: &str, max_len: usize) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| if is_forbidden(c) { '-' } else { c })
        .collect();
    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let capped: String = collapsed.chars().take(max_len).collect();
    capped.trim_end_matches([' ', '.']).to_string()
}

/// A target file name split around the point where a collision counter goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetName {
    base: String,
    suffix: String,
}

impl TargetName {
    pub fn new(identity: &Identity, style: NameStyle, suffix: &str, max_len: usize) -> Self {
        let raw = format!("{} ({})", style.apply(&identity.name), identity.dob);
        Self {
            base: safe_base_name(&raw, max_len),
            suffix: safe_suffix(suffix),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// `n == 0` is the plain name; `n >= 1` inserts ` (n)`.
    pub fn candidate(&self, n: usize) -> String {
        if n == 0 {
            format!("{}{}.pdf", self.base, self.suffix)
        } else {
            format!("{} ({}){}.pdf", self.base, n, self.suffix)
        }
    }
}

fn safe_suffix(suffix: &str) -> String {
    suffix
        .chars()
        .map(|c| match c {
            _ if is_forbidden(c) => '-',
            _ if c.is_whitespace() => ' ',
            _ => c,
        })
        .collect()
}

fn is_forbidden(c: char) -> bool {
    FORBIDDEN.contains(&c) || (c.is_control() && !c.is_whitespace())
}

/// First candidate that neither exists in `dir` nor is in `reserved`.
///
/// `reserved` holds names already handed out in this run, so a dry run
/// (which creates no files) still produces distinct names.
pub fn unique_target(
    dir: &Path,
    name: &TargetName,
    reserved: &HashSet<String>,
) -> Result<PathBuf, DocumentError> {
    for n in 0..=MAX_COLLISIONS {
        let candidate = name.candidate(n);
        let path = dir.join(&candidate);
        if !reserved.contains(&candidate) && !path.exists() {
            if n > 0 {
                debug!("Name collision resolved with suffix ({n}): {candidate}");
            }
            return Ok(path);
        }
    }
    Err(DocumentError::NameExhausted {
        dir: dir.to_path_buf(),
        base: name.base().to_string(),
        attempts: MAX_COLLISIONS + 1,
    })
}

/// Move `from` to `to`, falling back to copy + remove across filesystems.
pub fn move_file(from: &Path, to: &Path) -> Result<(), DocumentError> {
    let failed = |detail: String| DocumentError::MoveFailed {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        detail,
    };

    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            debug!("rename failed ({rename_err}), copying instead");
            fs::copy(from, to).map_err(|e| failed(format!("rename: {rename_err}; copy: {e}")))?;
            if let Err(e) = fs::remove_file(from) {
                warn!("Copied '{}' but could not remove the original: {e}", from.display());
            }
            Ok(())
        }
    }
}

/// Write one original file name per line.
pub fn write_unresolved_list(path: &Path, file_names: &[String]) -> Result<(), RenameError> {
    let mut body = file_names.join("\n");
    if !body.is_empty() {
        body.push('\n');
    }
    fs::write(path, body).map_err(|e| RenameError::ReportWriteFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    info!("Unresolved list: {} entries → {}", file_names.len(), path.display());
    Ok(())
}

/// One CSV row.
#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    #[serde(rename = "File")]
    file: &'a str,
    #[serde(rename = "Patient Name")]
    patient_name: String,
    #[serde(rename = "DOB")]
    dob: String,
    #[serde(rename = "PCP")]
    pcp: &'a str,
    #[serde(rename = "IPA")]
    ipa: &'a str,
    #[serde(rename = "Strategy")]
    strategy: String,
    #[serde(rename = "Confidence")]
    confidence: String,
}

impl<'a> ReportRow<'a> {
    /// The cascade identity takes precedence; otherwise the independently
    /// extracted name and date fill the columns.
    fn from_record(r: &'a DocumentRecord) -> Self {
        let identity = r.outcome.identity();
        let patient_name = identity
            .map(|id| id.name.display())
            .or_else(|| r.fields.patient_name.as_ref().map(|n| n.display()))
            .unwrap_or_default();
        let dob = identity
            .map(|id| id.dob.to_string())
            .or_else(|| r.fields.dob.map(|d| d.to_string()))
            .unwrap_or_default();
        Self {
            file: &r.file_name,
            patient_name,
            dob,
            pcp: r.fields.physician.as_deref().unwrap_or(""),
            ipa: r.fields.organization.as_deref().unwrap_or(""),
            strategy: identity.map(|id| id.strategy.to_string()).unwrap_or_default(),
            confidence: r.outcome.confidence().map(|c| c.to_string()).unwrap_or_default(),
        }
    }
}

/// Write the CSV report, one row per document.
pub fn write_csv_report(path: &Path, records: &[DocumentRecord]) -> Result<(), RenameError> {
    let fail = |detail: String| RenameError::ReportWriteFailed {
        path: path.to_path_buf(),
        detail,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| fail(e.to_string()))?;
    }

    let mut writer = csv::Writer::from_path(path).map_err(|e| fail(e.to_string()))?;
    if records.is_empty() {
        writer
            .write_record(["File", "Patient Name", "DOB", "PCP", "IPA", "Strategy", "Confidence"])
            .map_err(|e| fail(e.to_string()))?;
    }
    for r in records {
        writer
            .serialize(ReportRow::from_record(r))
            .map_err(|e| fail(e.to_string()))?;
    }
    writer.flush().map_err(|e| fail(e.to_string()))?;
    info!("Report: {} rows → {}", records.len(), path.display());
    Ok(())
}
