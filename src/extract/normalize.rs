//! Text normalisation: repair common OCR noise before any pattern runs.
//!
//! Every field pattern in this crate keys on a handful of literal labels
//! (`DOB`, `Patient Name`, …). OCR engines routinely read the `O` of `DOB` as
//! a zero or sprinkle dots between the letters, and scanned PDFs mix `\r\n`,
//! tabs and runs of spaces freely. Fixing those few artefacts once, up front,
//! keeps the extraction patterns simple.
//!
//! ## Rule Order
//!
//! 1. Literal OCR substitutions (plain substring replacement, no regex)
//! 2. Line endings (`\r\n`, `\r` → `\n`)
//! 3. Collapse runs of spaces/tabs to one space (newlines untouched)
//!
//! The three rules are re-applied until the text stops changing, so
//! `normalize(normalize(x)) == normalize(x)` holds even when collapsing
//! whitespace exposes a new substitution (`"D  0 B"` → `"D 0 B"` → `"DOB"`).
//!
//! A table with no fixed point (one that lengthens the text, or cycles
//! between equal-length strings) is cut off: a pass that grows the text is
//! discarded, and at most one pass per input byte is run.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default OCR substitutions for the `DOB` label.
pub const DEFAULT_OCR_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("D0B", "DOB"),
    ("D0 B", "DOB"),
    ("D.O.B", "DOB"),
    ("D 0 B", "DOB"),
    (" O/", " 0/"),
];

static RE_HORIZONTAL_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());

/// One literal `from → to` replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    pub from: String,
    pub to: String,
}

impl Substitution {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Applies the substitution table plus whitespace cleanup.
///
/// The table is injected at construction so deployments can add their own
/// scanner quirks without touching the extraction logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNormalizer {
    substitutions: Vec<Substitution>,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new(default_substitutions())
    }
}

impl TextNormalizer {
    /// Empty `from` entries are dropped; they would match everywhere.
    pub fn new(substitutions: Vec<Substitution>) -> Self {
        Self {
            substitutions: substitutions
                .into_iter()
                .filter(|s| !s.from.is_empty())
                .collect(),
        }
    }

    pub fn substitutions(&self) -> &[Substitution] {
        &self.substitutions
    }

    /// Normalise raw document text. Never fails; empty in, empty out.
    pub fn normalize(&self, raw: &str) -> String {
        let pass_limit = raw.len() + 2;
        let mut current = self.single_pass(raw);
        for _ in 1..pass_limit {
            let next = self.single_pass(&current);
            if next == current {
                return current;
            }
            if next.len() > current.len() {
                warn!("substitution table lengthens text; stopping normalisation");
                return current;
            }
            current = next;
        }
        warn!(passes = pass_limit, "substitution table did not converge");
        current
    }

    fn single_pass(&self, input: &str) -> String {
        let s = self.apply_substitutions(input);
        let s = normalise_line_endings(&s);
        collapse_horizontal_whitespace(&s)
    }

    fn apply_substitutions(&self, input: &str) -> String {
        self.substitutions
            .iter()
            .fold(input.to_string(), |acc, sub| acc.replace(&sub.from, &sub.to))
    }
}

/// The built-in table as owned values.
pub fn default_substitutions() -> Vec<Substitution> {
    DEFAULT_OCR_SUBSTITUTIONS
        .iter()
        .map(|(from, to)| Substitution::new(*from, *to))
        .collect()
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn collapse_horizontal_whitespace(input: &str) -> String {
    RE_HORIZONTAL_WS.replace_all(input, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixes_dob_confusions() {
        let n = TextNormalizer::default();
        assert_eq!(n.normalize("D0B: 01/02/1990"), "DOB: 01/02/1990");
        assert_eq!(n.normalize("D.O.B: 01/02/1990"), "DOB: 01/02/1990");
        assert_eq!(n.normalize("D 0 B 01/02/1990"), "DOB 01/02/1990");
        assert_eq!(n.normalize("D0 B 01/02/1990"), "DOB 01/02/1990");
    }

    #[test]
    fn leaves_similar_text_alone() {
        let n = TextNormalizer::default();
        assert_eq!(n.normalize("DOBBS, MARY"), "DOBBS, MARY");
        assert_eq!(n.normalize("D0OR"), "D0OR");
    }

    #[test]
    fn line_endings_become_single_newlines() {
        let n = TextNormalizer::default();
        assert_eq!(n.normalize("a\r\nb\rc\nd"), "a\nb\nc\nd");
    }

    #[test]
    fn collapses_spaces_and_tabs_but_not_newlines() {
        let n = TextNormalizer::default();
        assert_eq!(n.normalize("SMITH,\t\t JOHN   \n\nDOB"), "SMITH, JOHN \n\nDOB");
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert_eq!(TextNormalizer::default().normalize(""), "");
    }

    #[test]
    fn idempotent_when_collapse_exposes_substitution() {
        let n = TextNormalizer::default();
        let once = n.normalize("D  0 B:\t03/04/1980\r\n");
        assert_eq!(once, "DOB: 03/04/1980\n");
        assert_eq!(n.normalize(&once), once);
    }

    #[test]
    fn idempotent_on_mixed_noise() {
        let n = TextNormalizer::default();
        let samples = [
            "Patient  Name:\tSMITH, JOHN\r\nD.O.B.  O/12/1980",
            "  leading\t\tand trailing  \r",
            "D0BD0B D 0 B",
        ];
        for s in samples {
            let once = n.normalize(s);
            assert_eq!(n.normalize(&once), once, "input: {s:?}");
        }
    }

    #[test]
    fn custom_table_is_honoured() {
        let n = TextNormalizer::new(vec![
            Substitution::new("MEMS NAME", "MEMB NAME"),
            Substitution::new("", "x"),
        ]);
        assert_eq!(n.substitutions().len(), 1);
        assert_eq!(n.normalize("MEMS NAME: DOE, JANE"), "MEMB NAME: DOE, JANE");
        // default DOB fixes are not applied when replaced by a custom table
        assert_eq!(n.normalize("D0B"), "D0B");
    }

    #[test]
    fn custom_table_reaches_fixed_point() {
        let n = TextNormalizer::new(vec![
            Substitution::new("D0OB", "DOB"),
            Substitution::new("0O", "0"),
        ]);
        let raw = format!("D0{}B", "O".repeat(12));
        let once = n.normalize(&raw);
        assert_eq!(once, "DOB");
        assert_eq!(n.normalize(&once), once);
    }

    #[test]
    fn growing_table_terminates() {
        let n = TextNormalizer::new(vec![Substitution::new("A", "AA")]);
        assert_eq!(n.normalize("xAx"), "xAAx");
    }
}
