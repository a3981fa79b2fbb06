//! Independent per-field extractors.
//!
//! Each extractor walks its own [`MatcherChain`] against the whole normalised
//! text and returns the first candidate that survives cleanup and
//! validation. They do not depend on each other; the strategy orchestrator in
//! [`super::strategy`] is what pairs a name with a date.
//!
//! These extractors target authorisation/referral forms, which label fields
//! explicitly (`MEMB NAME:`, `DATE OF BIRTH:`, `REFERRING PHYSICIAN … NAME:`).
//! Lab reports and visit notes rarely do, which is why the name/DOB pair for
//! renaming goes through the strategy cascade instead.

use super::date::{normalize_date, DateValue};
use super::matcher::MatcherChain;
use super::name::{title_case, NameValidator, PersonName};
use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::trace;

/// Letters OCR commonly returns in place of digits, with their digit.
const OCR_DIGIT_CONFUSIONS: &[(char, char)] = &[
    ('O', '0'),
    ('o', '0'),
    ('Q', '0'),
    ('I', '1'),
    ('l', '1'),
    ('|', '1'),
    ('S', '5'),
    ('s', '5'),
    ('C', '6'),
    ('B', '8'),
    ('Z', '2'),
    ('z', '2'),
];

/// Words that end a member-name payload when a form prints the next field on
/// the same line (`MEMB NAME: DOE, JANE DOB …`).
const NAME_STOP_WORDS: &[&str] = &[
    "DOB", "DATE", "SEX", "GENDER", "ID", "MEMBER", "PHONE", "ADDRESS", "AGE",
];

static PATIENT_NAME: Lazy<MatcherChain> = Lazy::new(|| {
    MatcherChain::from_patterns(&[
        (
            "member-name",
            r"(?i)\bMEM[BSN](?:ER)?\s*NAME[:\s]*([A-ZÁÉÍÓÚÑ ,.'\-]+)",
        ),
        (
            "patient-name",
            r"(?i)\bPATIENT\s*NAME[:\s]*([A-ZÁÉÍÓÚÑ ,.'\-]+)",
        ),
    ])
});

static DATE_OF_BIRTH: Lazy<MatcherChain> = Lazy::new(|| {
    MatcherChain::from_patterns(&[
        (
            "dob-ocr-run",
            r"(?i:DATE\s*OF\s*BIRTH|BIRTH\s*DATE|\bDOB\b)[:\s]*([0-9OoQIl|SsCBZz/.\-]{6,12})",
        ),
        (
            "dob-textual",
            r"(?i:DATE\s*OF\s*BIRTH|BIRTH\s*DATE|\bDOB\b)[:\s]*([A-Za-z]{3,9}\.?\s+\d{1,2},?\s+\d{4})",
        ),
    ])
});

static PHYSICIAN: Lazy<MatcherChain> = Lazy::new(|| {
    MatcherChain::from_patterns(&[
        (
            "referring-physician",
            r"(?is)REFERRING\s+PHYSICIAN.*?NAME[:\s]*([A-ZÁÉÍÓÚÑ ,.'\-]+)",
        ),
        (
            "primary-care-physician",
            r"(?is)PRIMARY\s+CARE\s+PHYSICIAN.*?NAME[:\s]*([A-ZÁÉÍÓÚÑ ,.'\-]+)",
        ),
    ])
});

static ORGANIZATION: Lazy<MatcherChain> = Lazy::new(|| {
    MatcherChain::from_patterns(&[
        ("ipa-line", r"(?im)^[ \t]*([A-Z0-9 ,.'&/\-]+IPA)[ \t]*$"),
        (
            "medical-group",
            r"(?i)([A-Z][A-Z0-9 ,.'&/\-]*MEDICAL\s+GROUP[^\n]*)",
        ),
    ])
});

/// All four fields of one document, each independently optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentFields {
    pub patient_name: Option<PersonName>,
    pub dob: Option<DateValue>,
    pub physician: Option<String>,
    pub organization: Option<String>,
}

impl DocumentFields {
    pub fn is_empty(&self) -> bool {
        self.patient_name.is_none()
            && self.dob.is_none()
            && self.physician.is_none()
            && self.organization.is_none()
    }
}

/// Run every field extractor over normalised text.
pub fn extract_fields(text: &str, validator: &NameValidator) -> DocumentFields {
    DocumentFields {
        patient_name: extract_patient_name(text, validator),
        dob: extract_dob(text),
        physician: extract_physician(text),
        organization: extract_organization(text),
    }
}

/// Translate digit-confusable letters: `"O5/1O/1985"` → `"05/10/1985"`.
pub fn translate_ocr_digits(run: &str) -> String {
    run.chars()
        .map(|c| {
            OCR_DIGIT_CONFUSIONS
                .iter()
                .find(|(letter, _)| *letter == c)
                .map(|(_, digit)| *digit)
                .unwrap_or(c)
        })
        .collect()
}

/// Labelled member/patient name, `"Family, Given[, M]"` → `Given Family`.
pub fn extract_patient_name(text: &str, validator: &NameValidator) -> Option<PersonName> {
    PATIENT_NAME.find_map(text, |m| {
        let payload = cut_at_stop_word(m.trimmed(1));
        let name = PersonName::from_family_given(payload)?.without_initials();
        match validator.check_name(&name) {
            Ok(()) => Some(name),
            Err(e) => {
                trace!(matcher = m.matcher, "{e}");
                None
            }
        }
    })
}

/// Labelled date of birth, tolerant of OCR letter-for-digit swaps.
pub fn extract_dob(text: &str) -> Option<DateValue> {
    DATE_OF_BIRTH.find_map(text, |m| {
        let raw = m.trimmed(1);
        let candidate = if m.matcher == "dob-ocr-run" {
            translate_ocr_digits(raw)
        } else {
            raw.to_string()
        };
        normalize_date(&candidate)
            .map_err(|e| trace!(matcher = m.matcher, "{e}"))
            .ok()
    })
}

/// Referring or primary-care physician, title cased.
pub fn extract_physician(text: &str) -> Option<String> {
    PHYSICIAN.find_map(text, |m| {
        let raw = m.trimmed(1).replace("NAME", "").replace(':', "");
        let cleaned = title_case(raw.trim_matches(|c: char| c == ',' || c.is_whitespace()));
        (!cleaned.is_empty()).then_some(cleaned)
    })
}

/// IPA or medical-group line, title cased.
pub fn extract_organization(text: &str) -> Option<String> {
    ORGANIZATION.find_map(text, |m| {
        let cleaned = title_case(m.trimmed(1));
        (!cleaned.is_empty()).then_some(cleaned)
    })
}

fn cut_at_stop_word(payload: &str) -> &str {
    let mut offset = 0;
    for word in payload.split(' ') {
        let bare = word
            .trim_matches(|c: char| c == ',' || c == '.' || c == ':')
            .to_uppercase();
        if NAME_STOP_WORDS.contains(&bare.as_str()) {
            return payload[..offset].trim_end();
        }
        offset += word.len() + 1;
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTH_FORM: &str = "\
HEALTHCARE PARTNERS IPA
AUTHORIZATION REQUEST
MEMB NAME: DOE, JANE M
DATE OF BIRTH: O5/1O/1985
REFERRING PHYSICIAN INFORMATION
NPI 1234567890
NAME: NGUYEN, DAVID
PRIMARY CARE PHYSICIAN
NAME: PATEL, ASHA
";

    #[test]
    fn translate_example() {
        assert_eq!(translate_ocr_digits("O5/1O/1985"), "05/10/1985");
        assert_eq!(translate_ocr_digits("l2/3l/l9S9"), "12/31/1959");
        assert_eq!(translate_ocr_digits("03/04/1980"), "03/04/1980");
    }

    #[test]
    fn full_auth_form() {
        let fields = extract_fields(AUTH_FORM, &NameValidator::default());
        assert_eq!(fields.patient_name.unwrap().display(), "Jane Doe");
        assert_eq!(fields.dob.unwrap().to_string(), "05-10-1985");
        assert_eq!(fields.physician.as_deref(), Some("Nguyen, David"));
        assert_eq!(
            fields.organization.as_deref(),
            Some("Healthcare Partners Ipa")
        );
    }

    #[test]
    fn member_name_ocr_label_variant() {
        let n = extract_patient_name("MEMS NAME: RIVERA, LUIS", &NameValidator::default());
        assert_eq!(n.unwrap().display(), "Luis Rivera");
    }

    #[test]
    fn member_name_stops_at_next_label() {
        let n = extract_patient_name(
            "MEMBER NAME: RIVERA, LUIS A DOB 01/02/1990",
            &NameValidator::default(),
        );
        assert_eq!(n.unwrap().display(), "Luis Rivera");
    }

    #[test]
    fn member_name_rejected_by_validator() {
        let n = extract_patient_name("PATIENT NAME: LIPID, PANEL", &NameValidator::default());
        assert!(n.is_none());
    }

    #[test]
    fn dob_undelimited_run() {
        assert_eq!(
            extract_dob("DATE OF BIRTH: 05101985").unwrap().to_string(),
            "05-10-1985"
        );
    }

    #[test]
    fn dob_textual() {
        assert_eq!(
            extract_dob("DOB: Sep 10, 1985").unwrap().to_string(),
            "09-10-1985"
        );
    }

    #[test]
    fn dob_absent() {
        assert!(extract_dob("no dates here").is_none());
        assert!(extract_dob("").is_none());
    }

    #[test]
    fn physician_falls_back_to_pcp() {
        let text = "PRIMARY CARE PHYSICIAN\nOffice 12\nNAME: PATEL, ASHA\n";
        assert_eq!(extract_physician(text).as_deref(), Some("Patel, Asha"));
    }

    #[test]
    fn organization_medical_group() {
        let text = "Referral\nANGELES COMMUNITY MEDICAL GROUP, INC\n";
        assert_eq!(
            extract_organization(text).as_deref(),
            Some("Angeles Community Medical Group, Inc")
        );
    }

    #[test]
    fn empty_text_gives_empty_fields() {
        assert!(extract_fields("", &NameValidator::default()).is_empty());
    }
}
