//! Prompts for the vision-model OCR fallback.
//!
//! The model is used as a transcriber only. Field extraction stays in the
//! deterministic engine, so the prompt asks for the page text verbatim and
//! nothing else: labels such as `DOB:` and the `Family, Given` comma order
//! must survive untouched for the patterns to find them.

/// System prompt sent with the first-page image of a scanned document.
pub const OCR_SYSTEM_PROMPT: &str = r#"You are a precise OCR engine for scanned medical documents.

Transcribe ALL text visible in the page image, exactly as printed.

Rules:
1. Keep the original reading order, one printed line per output line.
2. Keep labels and punctuation exactly (e.g. "DOB:", "Patient Name:", "SMITH, JOHN").
3. Copy dates, numbers and identifiers digit for digit. Do not reformat them.
4. Do not correct spelling, expand abbreviations, or translate.
5. Do not summarise, describe images, or add commentary.
6. Do not wrap the output in code fences.
7. If the page contains no legible text, output nothing."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_preserves_labels() {
        assert!(OCR_SYSTEM_PROMPT.contains("DOB:"));
        assert!(OCR_SYSTEM_PROMPT.contains("code fences"));
    }
}
