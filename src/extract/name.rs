//! Person names: canonical form, formatting, and plausibility checks.
//!
//! Medical documents print names family-first (`GARCIA, ANA`). Captures are
//! turned into a [`PersonName`] holding `(given, family)` and only formatted
//! at the edge, so the file-name style and the report style can differ.
//!
//! The validator is deliberately blunt: regexes that look for
//! `Word, Word` will happily capture `LOS ANGELES, CA` or
//! `LIPID PANEL, COMPREHENSIVE`. A short injected blocklist of institutional,
//! location and administrative phrases catches the bulk of those.

use crate::error::FieldError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

/// Phrases that never appear inside a real patient name.
pub const DEFAULT_BLOCKLIST: &[&str] = &[
    "DATE OF BIRTH",
    "DOB FEMALE",
    "DOB MALE",
    "PATIENT ID",
    "ACCOUNT NO",
    "LOS ANGELES",
    "LOS ",
    "CA ",
    "GLENDALE",
    "DOWNEY",
    "PASADENA",
    "ROSEMEAD",
    "CENTER",
    "HOSPITAL",
    "FAMILY HEALTH",
    "ENDOCRINOLOGY",
    "VISIT",
    "OFFICE",
    "STREET",
    "ST.",
    "BLVD",
    "AVENUE",
    "FAX",
    "COVER",
    "SHEET",
    "RESULT",
    "REPORT",
    "SUMMARY",
    "MRN",
    "ACC NO",
    "ACCNO",
    "BILLING",
    "LAB",
    "LIPID",
    "PANEL",
    "COMPREHENSIVE",
    "METABOLIC",
    "REQUEST",
    "INFORMATION",
];

const MIN_NAME_LEN: usize = 5;

static RE_DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{3,}").unwrap());

/// A person's name as `(given, family)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PersonName {
    given: String,
    family: String,
}

impl PersonName {
    /// Build from the two halves, collapsing inner whitespace.
    pub fn new(given: &str, family: &str) -> Self {
        Self {
            given: collapse(given),
            family: collapse(family),
        }
    }

    /// Split a `"Family, Given[, Middle]"` capture.
    ///
    /// Segments after the first comma are joined into the given part, so
    /// `"DOE, JANE, M"` yields given `"JANE M"`.
    pub fn from_family_given(raw: &str) -> Option<Self> {
        let mut parts = raw.split(',').map(str::trim).filter(|p| !p.is_empty());
        let family = parts.next()?;
        let given: Vec<&str> = parts.collect();
        if given.is_empty() {
            return None;
        }
        Some(Self::new(&given.join(" "), family))
    }

    pub fn given(&self) -> &str {
        &self.given
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    /// Drop lone single-letter tokens (middle initials) from both halves.
    pub fn without_initials(&self) -> Self {
        let strip = |s: &str| {
            s.split_whitespace()
                .filter(|w| w.trim_end_matches('.').chars().count() > 1)
                .collect::<Vec<_>>()
                .join(" ")
        };
        Self {
            given: strip(&self.given),
            family: strip(&self.family),
        }
    }

    /// `"First Last"`, title case.
    pub fn display(&self) -> String {
        title_case(&self.joined())
    }

    /// `"FIRST LAST"`.
    pub fn upper(&self) -> String {
        self.joined().to_uppercase()
    }

    /// `"LAST FIRST"`.
    pub fn family_first(&self) -> String {
        join_nonempty(&self.family, &self.given).to_uppercase()
    }

    fn joined(&self) -> String {
        join_nonempty(&self.given, &self.family)
    }
}

impl fmt::Display for PersonName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl Serialize for PersonName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn join_nonempty(a: &str, b: &str) -> String {
    [a, b]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Capitalise each word; letters following `'` or `-` are capitalised too
/// (`O'BRIEN-SMITH` → `O'Brien-Smith`).
pub fn title_case(s: &str) -> String {
    let lower = collapse(s).to_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut capitalise_next = true;
    for c in lower.chars() {
        if capitalise_next && c.is_alphabetic() {
            out.extend(c.to_uppercase());
            capitalise_next = false;
        } else {
            out.push(c);
        }
        if c == ' ' || c == '\'' || c == '-' {
            capitalise_next = true;
        }
    }
    out
}

/// Rejects strings that are not plausible person names.
///
/// Built once per process and shared read-only across documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameValidator {
    blocklist: Vec<String>,
}

impl Default for NameValidator {
    fn default() -> Self {
        Self::new(default_blocklist())
    }
}

impl NameValidator {
    /// Entries are upper-cased so matching is case-insensitive.
    pub fn new(blocklist: Vec<String>) -> Self {
        Self {
            blocklist: blocklist
                .into_iter()
                .filter(|b| !b.is_empty())
                .map(|b| b.to_uppercase())
                .collect(),
        }
    }

    pub fn blocklist(&self) -> &[String] {
        &self.blocklist
    }

    /// Check a candidate, explaining the first rule it breaks.
    pub fn check(&self, candidate: &str) -> Result<(), FieldError> {
        let reject = |reason: String| FieldError::NameRejected {
            candidate: candidate.to_string(),
            reason,
        };

        let up = candidate.trim().to_uppercase();
        if up.chars().count() < MIN_NAME_LEN {
            return Err(reject(format!("shorter than {MIN_NAME_LEN} characters")));
        }
        if !up.contains(' ') {
            return Err(reject("single token".into()));
        }
        if RE_DIGIT_RUN.is_match(&up) {
            return Err(reject("contains a run of 3+ digits".into()));
        }
        if let Some(hit) = self.blocklist.iter().find(|b| up.contains(b.as_str())) {
            return Err(reject(format!("contains blocked phrase {hit:?}")));
        }
        Ok(())
    }

    pub fn is_valid(&self, candidate: &str) -> bool {
        self.check(candidate).is_ok()
    }

    /// Validate a formed name in `"GIVEN FAMILY"` order.
    pub fn check_name(&self, name: &PersonName) -> Result<(), FieldError> {
        self.check(&name.upper())
    }
}

/// The built-in blocklist as owned values.
pub fn default_blocklist() -> Vec<String> {
    DEFAULT_BLOCKLIST.iter().map(|s| s.to_string()).collect()
}
