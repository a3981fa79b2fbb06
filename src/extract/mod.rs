//! The field-extraction engine.
//!
//! Pure text in, structured values out. Nothing in this module touches the
//! filesystem, the network or PDFium, so every behaviour is unit-testable
//! with string fixtures.
//!
//! ```text
//! raw text ──▶ normalize ──┬──▶ strategy cascade ──▶ ExtractionOutcome
//!                          └──▶ field extractors ──▶ DocumentFields
//! ```
//!
//! Submodules, leaf first:
//!
//! 1. [`normalize`] OCR label fixes and whitespace collapse
//! 2. [`date`]      loose date capture → `MM-DD-YYYY`
//! 3. [`name`]      `Family, Given` → [`PersonName`], plausibility checks
//! 4. [`matcher`]   named, priority-ordered regex matchers
//! 5. [`fields`]    independent per-field extractors
//! 6. [`strategy`]  the A → B → C fallback cascade

pub mod date;
pub mod fields;
pub mod matcher;
pub mod name;
pub mod normalize;
pub mod strategy;

pub use date::{normalize_date, DateValue};
pub use fields::DocumentFields;
pub use matcher::{FieldMatch, Matcher, MatcherChain, PatternMatcher};
pub use name::{NameValidator, PersonName};
pub use normalize::{Substitution, TextNormalizer};
pub use strategy::{Confidence, ExtractionOutcome, Identity, Strategy, StrategyCascade};

use crate::config::ExtractionConfig;
use serde::Serialize;

/// Everything the engine learned about one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub outcome: ExtractionOutcome,
    pub fields: DocumentFields,
}

/// A configured engine. Cheap to share by reference across documents.
#[derive(Debug, Clone)]
pub struct Extractor {
    normalizer: TextNormalizer,
    validator: NameValidator,
    lookbehind_chars: usize,
    accept_low_confidence: bool,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

impl Extractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            normalizer: TextNormalizer::new(config.substitutions.clone()),
            validator: NameValidator::new(config.blocklist.clone()),
            lookbehind_chars: config.lookbehind_chars,
            accept_low_confidence: config.accept_low_confidence,
        }
    }

    pub fn validator(&self) -> &NameValidator {
        &self.validator
    }

    pub fn normalize(&self, raw: &str) -> String {
        self.normalizer.normalize(raw)
    }

    /// Normalise raw text and run the strategy cascade.
    pub fn resolve(&self, raw: &str) -> ExtractionOutcome {
        self.cascade().resolve(&self.normalize(raw))
    }

    /// Normalise raw text and run the independent field extractors.
    pub fn fields(&self, raw: &str) -> DocumentFields {
        fields::extract_fields(&self.normalize(raw), &self.validator)
    }

    /// Both of the above over a single normalisation pass.
    pub fn analyze(&self, raw: &str) -> Analysis {
        let text = self.normalize(raw);
        Analysis {
            outcome: self.cascade().resolve(&text),
            fields: fields::extract_fields(&text, &self.validator),
        }
    }

    /// The cascade over already-normalised text.
    pub fn cascade(&self) -> StrategyCascade<'_> {
        StrategyCascade::new(
            &self.validator,
            self.lookbehind_chars,
            self.accept_low_confidence,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_normalizes_first() {
        let ex = Extractor::default();
        let outcome = ex.resolve("SMITH,\tJOHN   D0B:  03/04/1980\r\n");
        let id = outcome.identity().unwrap();
        assert_eq!(id.name.display(), "John Smith");
        assert_eq!(id.dob.to_string(), "03-04-1980");
    }

    #[test]
    fn analyze_fills_both_views() {
        let ex = Extractor::default();
        let a = ex.analyze("MEMB NAME: DOE, JANE\nDOB: 05/10/1985\nHEALTHCARE PARTNERS IPA\n");
        assert!(a.outcome.is_resolved());
        assert_eq!(a.fields.dob.unwrap().to_string(), "05-10-1985");
        assert_eq!(a.fields.organization.as_deref(), Some("Healthcare Partners Ipa"));
    }

    #[test]
    fn custom_blocklist_flows_through() {
        let config = ExtractionConfig::builder()
            .blocklist(vec!["SMITH".into()])
            .build()
            .unwrap();
        let ex = Extractor::new(&config);
        assert_eq!(
            ex.resolve("SMITH, JOHN DOB: 03/04/1980"),
            ExtractionOutcome::Unresolved
        );
    }
}
