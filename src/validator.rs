//! Three-tier upload admission (C2, §4.2).
//!
//! Each tier is a hard gate, evaluated in order: extension allow-list →
//! magic-byte signature match → successful non-empty extraction. Policy is
//! per-format: PDF is **strict** (all three tiers), structured formats
//! (JSON/XML) are **structured** (extraction success doubles as a parse
//! check), plain text and source code are **lenient** (no signature to
//! check, tier 2 is skipped).

use crate::error::CoreError;
use crate::extractor::{self, SUPPORTED_EXTENSIONS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Policy {
    Strict,
    Structured,
    Lenient,
}

fn policy_for(extension: &str) -> Policy {
    match extension {
        "pdf" => Policy::Strict,
        "json" | "xml" => Policy::Structured,
        _ => Policy::Lenient,
    }
}

/// Runs all three validator tiers, returning the extracted text on success.
///
/// This is the only place extraction is invoked on untrusted input: tier 3
/// doubles as "extraction succeeded", so callers never extract twice.
pub fn validate_and_extract(bytes: &[u8], extension: &str) -> Result<String, CoreError> {
    let ext = extension.trim_start_matches('.').to_lowercase();

    // Tier 1: extension allow-list.
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(CoreError::UnsupportedFormat(ext));
    }

    let policy = policy_for(&ext);

    // Tier 2: magic-byte / signature match.
    if policy != Policy::Lenient || has_known_signature(&ext) {
        check_signature(bytes, &ext)?;
    }

    // Tier 3: extraction must succeed and yield non-empty text.
    let text = extractor::extract_text(bytes, &ext)?;
    if text.trim().is_empty() {
        return Err(CoreError::EmptyExtraction);
    }

    Ok(text)
}

/// Whether `extension` has a magic-byte signature to check at all (text
/// formats have none and are accepted outright under the lenient policy).
fn has_known_signature(extension: &str) -> bool {
    matches!(extension, "pdf")
}

fn check_signature(bytes: &[u8], extension: &str) -> Result<(), CoreError> {
    let ok = match extension {
        "pdf" => bytes.starts_with(b"%PDF"),
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(CoreError::SignatureMismatch(extension.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsupported_extension() {
        let err = validate_and_extract(b"whatever", "exe").unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedFormat(_)));
    }

    #[test]
    fn rejects_pdf_with_wrong_signature() {
        let err = validate_and_extract(b"not a pdf at all", "pdf").unwrap_err();
        assert!(matches!(err, CoreError::SignatureMismatch(_)));
    }

    #[test]
    fn rejects_empty_extraction() {
        let err = validate_and_extract(b"   \n\t  ", "txt").unwrap_err();
        assert!(matches!(err, CoreError::EmptyExtraction));
    }

    #[test]
    fn accepts_plain_text() {
        let text = validate_and_extract(b"hello world", "txt").unwrap();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn structured_json_rejects_malformed_input() {
        let err = validate_and_extract(b"{not json", "json").unwrap_err();
        assert!(matches!(err, CoreError::ExtractionFailed(_)));
    }
}
