//! Strategy cascade: pair a patient name with a date of birth.
//!
//! Renaming needs *both* halves of the identity. The three strategies below
//! are tried strictly in order and the first one to yield a valid pair wins:
//!
//! ```text
//! NotTried ─▶ A: co-occurrence ─▶ B: DOB proximity ─▶ C: decoupled ─▶ Unresolved
//!                    │                   │                  │
//!                    ▼                   ▼                  ▼
//!                Resolved            Resolved      ResolvedLowConfidence
//! ```
//!
//! * **A** matches `Family, Given … DOB: value` as one span (lazy lookahead,
//!   newlines allowed).
//! * **B** anchors on each DOB label and searches the text immediately before
//!   it for a `Family, Given` pair, nearest first.
//! * **C** takes the first DOB in the document and, independently, the first
//!   labelled name. In a multi-patient document these can belong to different
//!   people, so C results are reported as low confidence and can be switched
//!   off with [`crate::config::ExtractionConfig::accept_low_confidence`].
//!
//! Within a strategy a candidate whose date does not normalise or whose name
//! fails validation is skipped; nothing here is fatal.

use super::date::{normalize_date, DateValue};
use super::matcher::{FieldMatch, MatcherChain};
use super::name::{NameValidator, PersonName};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::fmt;
use tracing::{debug, trace};

// ── Pattern tables ───────────────────────────────────────────────────────────

/// Strategy A. Groups: 1 = family, 2 = given, 3 = date text.
static NAME_DOB: Lazy<MatcherChain> = Lazy::new(|| {
    MatcherChain::from_patterns(&[
        (
            "family-given-dob",
            r"(?is)\b([A-Z][A-Za-z' \-]+),\s*([A-Z][A-Za-z' \-]+).*?\bDOB[:\s]*([0-9A-Za-z/,.\- ]{4,})",
        ),
        (
            "patient-name-dob",
            r"(?is)\bPatient\s*Name[:\s]*([A-Z][A-Za-z' \-]+),\s*([A-Z][A-Za-z' \-]+).*?\bDOB[:\s]*([0-9A-Za-z/,.\- ]{4,})",
        ),
        (
            "patient-id-dob",
            r"(?is)\bPatient[:\s]*(?:\d+\s*-\s*)?([A-Z][A-Za-z' \-]+),\s*([A-Z][A-Za-z' \-]+).*?\bDOB[:\s]*([0-9A-Za-z/,.\- ]{4,})",
        ),
        (
            "family-given-near-dob",
            r"(?is)\b([A-Z][A-Za-z' \-]+),\s*([A-Z][A-Za-z' \-]+)[^ \n]{0,60}?\b(?:DOB|D\.?O\.?B\.?)[:\s]*([0-9A-Za-z/,.\- ]{4,})",
        ),
    ])
});

/// Strategies B and C. Group 1 = date text.
static DOB_LABEL: Lazy<MatcherChain> = Lazy::new(|| {
    MatcherChain::from_patterns(&[
        (
            "dob-numeric",
            r"(?i)\bDOB[:\s]*([0-9]{1,2}[/-][0-9]{1,2}[/-][0-9]{2,4})",
        ),
        (
            "date-of-birth-numeric",
            r"(?i)\bDate\s+of\s+Birth[:\s]*([0-9]{1,2}[/-][0-9]{1,2}[/-][0-9]{2,4})",
        ),
        (
            "dob-textual",
            r"(?i)\bDOB[:\s]*([A-Za-z]{3,9}\.?\s+\d{1,2},?\s+\d{2,4})",
        ),
    ])
});

/// Strategy B, searched inside the lookbehind window. Groups: 1 = family, 2 = given.
static WINDOW_NAME_AT_LINE_END: Lazy<MatcherChain> = Lazy::new(|| {
    MatcherChain::from_patterns(&[(
        "family-given-line-end",
        r"(?im)([A-Z][A-Za-z' \-]+),\s*([A-Z][A-Za-z' \-]+)\s*$",
    )])
});

static WINDOW_NAME_ANYWHERE: Lazy<MatcherChain> = Lazy::new(|| {
    MatcherChain::from_patterns(&[(
        "family-given",
        r"(?i)([A-Z][A-Za-z' \-]+),\s*([A-Z][A-Za-z' \-]+)",
    )])
});

/// Strategy C. Groups: 1 = family, 2 = given.
static NAME_ONLY: Lazy<MatcherChain> = Lazy::new(|| {
    MatcherChain::from_patterns(&[
        (
            "patient-name",
            r"(?i)\bPatient\s*Name[:\s]*([A-Z][A-Za-z' \-]+),\s*([A-Z][A-Za-z' \-]+)\b",
        ),
        (
            "patient-id",
            r"(?i)\bPatient[:\s]*(?:\d+\s*-\s*)?([A-Z][A-Za-z' \-]+),\s*([A-Z][A-Za-z' \-]+)\b",
        ),
        (
            "family-given-before-dob",
            r"(?i)\b([A-Z][A-Za-z' \-]+),\s*([A-Z][A-Za-z' \-]+)\s*(?:DOB|D\.?O\.?B\.?)\b",
        ),
    ])
});

// ── Result types ─────────────────────────────────────────────────────────────

/// Which fallback produced an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// A: name and DOB inside one matched span.
    CoOccurrence,
    /// B: name found in the window preceding a DOB label.
    DobProximity,
    /// C: first name and first DOB, paired regardless of distance.
    Decoupled,
}

impl Strategy {
    /// Cascade order.
    pub const CASCADE: [Strategy; 3] = [
        Strategy::CoOccurrence,
        Strategy::DobProximity,
        Strategy::Decoupled,
    ];

    pub fn confidence(self) -> Confidence {
        match self {
            Strategy::CoOccurrence | Strategy::DobProximity => Confidence::High,
            Strategy::Decoupled => Confidence::Low,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::CoOccurrence => "co-occurrence",
            Strategy::DobProximity => "dob-proximity",
            Strategy::Decoupled => "decoupled",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Low,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Confidence::High => "high",
            Confidence::Low => "low",
        })
    }
}

/// A resolved (name, date of birth) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub name: PersonName,
    pub dob: DateValue,
    pub strategy: Strategy,
    /// Label of the pattern that produced the pair.
    pub matcher: &'static str,
}

/// Result of running the cascade on one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "identity", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    /// Strategy A or B succeeded.
    Resolved(Identity),
    /// Only strategy C succeeded; name and date may belong to different people.
    ResolvedLowConfidence(Identity),
    /// All strategies were exhausted.
    Unresolved,
}

impl ExtractionOutcome {
    fn from_identity(identity: Identity) -> Self {
        match identity.strategy.confidence() {
            Confidence::High => ExtractionOutcome::Resolved(identity),
            Confidence::Low => ExtractionOutcome::ResolvedLowConfidence(identity),
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            ExtractionOutcome::Resolved(id) | ExtractionOutcome::ResolvedLowConfidence(id) => {
                Some(id)
            }
            ExtractionOutcome::Unresolved => None,
        }
    }

    pub fn into_identity(self) -> Option<Identity> {
        match self {
            ExtractionOutcome::Resolved(id) | ExtractionOutcome::ResolvedLowConfidence(id) => {
                Some(id)
            }
            ExtractionOutcome::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.identity().is_some()
    }

    pub fn confidence(&self) -> Option<Confidence> {
        self.identity().map(|id| id.strategy.confidence())
    }
}

// ── Cascade ──────────────────────────────────────────────────────────────────

/// Runs the three strategies over already-normalised text.
#[derive(Debug, Clone)]
pub struct StrategyCascade<'v> {
    validator: &'v NameValidator,
    lookbehind_chars: usize,
    allow_decoupled: bool,
}

impl<'v> StrategyCascade<'v> {
    pub fn new(validator: &'v NameValidator, lookbehind_chars: usize, allow_decoupled: bool) -> Self {
        Self {
            validator,
            lookbehind_chars,
            allow_decoupled,
        }
    }

    /// Try A, then B, then C; stop at the first valid pair.
    pub fn resolve(&self, text: &str) -> ExtractionOutcome {
        if text.trim().is_empty() {
            debug!("empty text, no strategy attempted");
            return ExtractionOutcome::Unresolved;
        }

        for strategy in Strategy::CASCADE {
            if strategy == Strategy::Decoupled && !self.allow_decoupled {
                debug!("decoupled fallback disabled");
                break;
            }
            match self.attempt(strategy, text) {
                Some(identity) => {
                    debug!(%strategy, matcher = identity.matcher, "resolved");
                    return ExtractionOutcome::from_identity(identity);
                }
                None => debug!(%strategy, "no valid pair"),
            }
        }
        ExtractionOutcome::Unresolved
    }

    /// Run a single strategy in isolation.
    pub fn attempt(&self, strategy: Strategy, text: &str) -> Option<Identity> {
        match strategy {
            Strategy::CoOccurrence => self.co_occurrence(text),
            Strategy::DobProximity => self.dob_proximity(text),
            Strategy::Decoupled => self.decoupled(text),
        }
    }

    /// Strategy A.
    pub fn co_occurrence(&self, text: &str) -> Option<Identity> {
        NAME_DOB.find_map(text, |m| {
            let dob = parse_dob(m, 3)?;
            let name = self.family_given(m)?;
            Some(Identity {
                name,
                dob,
                strategy: Strategy::CoOccurrence,
                matcher: m.matcher,
            })
        })
    }

    /// Strategy B.
    pub fn dob_proximity(&self, text: &str) -> Option<Identity> {
        DOB_LABEL.find_map(text, |m| {
            let dob = parse_dob(m, 1)?;
            let window = window_before(text, m.start, self.lookbehind_chars);
            let at_line_end: Vec<_> = WINDOW_NAME_AT_LINE_END.all(window).collect();
            let anywhere: Vec<_> = WINDOW_NAME_ANYWHERE.all(window).collect();
            // Closest to the label first.
            let name = at_line_end
                .iter()
                .rev()
                .chain(anywhere.iter().rev())
                .find_map(|nm| self.family_given(nm))?;
            Some(Identity {
                name,
                dob,
                strategy: Strategy::DobProximity,
                matcher: m.matcher,
            })
        })
    }

    /// Strategy C.
    pub fn decoupled(&self, text: &str) -> Option<Identity> {
        let dob = DOB_LABEL.find_map(text, |m| parse_dob(m, 1))?;
        NAME_ONLY.find_map(text, |m| {
            let name = self.family_given(m)?;
            Some(Identity {
                name,
                dob,
                strategy: Strategy::Decoupled,
                matcher: m.matcher,
            })
        })
    }

    /// Groups 1 and 2 as `(family, given)`, validated.
    fn family_given(&self, m: &FieldMatch<'_>) -> Option<PersonName> {
        let name = PersonName::new(m.trimmed(2), m.trimmed(1));
        match self.validator.check_name(&name) {
            Ok(()) => Some(name),
            Err(e) => {
                trace!(matcher = m.matcher, "{e}");
                None
            }
        }
    }
}

fn parse_dob(m: &FieldMatch<'_>, group: usize) -> Option<DateValue> {
    match normalize_date(m.trimmed(group)) {
        Ok(d) => Some(d),
        Err(e) => {
            trace!(matcher = m.matcher, "{e}");
            None
        }
    }
}

/// Up to `chars` characters immediately before byte offset `end`.
fn window_before(text: &str, end: usize, chars: usize) -> &str {
    let head = &text[..end];
    if chars == 0 {
        return "";
    }
    let start = head
        .char_indices()
        .rev()
        .nth(chars - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &head[start..]
}
