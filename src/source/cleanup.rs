//! Deterministic cleanup of extracted text before it reaches the engine.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\n(.*)\n```\s*$").unwrap());

const INVISIBLE: [char; 6] = [
    '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
];

/// Text-layer output: drop zero-width characters and NULs that break
/// word boundaries in the patterns.
pub fn clean_page_text(input: &str) -> String {
    input.replace(INVISIBLE, "").replace('\0', "")
}

/// Vision-model output: additionally strip an outer code fence the model
/// may add despite the prompt.
pub fn clean_transcription(input: &str) -> String {
    let trimmed = input.trim();
    let unfenced = match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps[1].to_string(),
        None => trimmed.to_string(),
    };
    clean_page_text(&unfenced)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_zero_width() {
        assert_eq!(clean_page_text("D\u{200B}OB: 1/2/1990\0"), "DOB: 1/2/1990");
    }

    #[test]
    fn strips_fences() {
        assert_eq!(clean_transcription("```text\nSMITH, JOHN\n```\n"), "SMITH, JOHN");
        assert_eq!(clean_transcription("```\nA\nB\n```"), "A\nB");
        assert_eq!(clean_transcription("  plain  "), "plain");
    }
}
