//! Hierarchical-boundary text chunker (C4, §4.4).
//!
//! Splits extracted document text into overlapping windows of ≈2000
//! characters with 200-character overlap. Window ends are snapped to the
//! best available boundary in a hierarchy: paragraph (`\n\n`) → sentence
//! (`. `, `? `, `! `) → word (whitespace) → hard character cut.
//!
//! Concatenating the non-overlap region of every chunk, in order, reproduces
//! the input text exactly — the chunker never drops or duplicates content
//! outside the deliberate overlap window.

pub const DEFAULT_CHUNK_CHARS: usize = 2000;
pub const DEFAULT_OVERLAP_CHARS: usize = 200;

/// How far back from a target boundary to search for a natural split point.
const LOOKBACK_FRACTION: f64 = 0.25;

#[derive(Debug, Clone)]
pub struct TextChunk {
    pub index: i64,
    pub text: String,
}

/// Splits `text` into chunks of `chunk_chars` with `overlap_chars` overlap.
///
/// Returns indices contiguous from 0. Empty input yields a single empty
/// chunk so callers never have to special-case a document with no chunks.
pub fn chunk_text(text: &str, chunk_chars: usize, overlap_chars: usize) -> Vec<TextChunk> {
    if text.is_empty() {
        return vec![TextChunk {
            index: 0,
            text: String::new(),
        }];
    }

    let bytes_len = text.len();
    let overlap = overlap_chars.min(chunk_chars.saturating_sub(1)).max(0);
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index = 0i64;

    while start < bytes_len {
        let target_end = (start + chunk_chars).min(bytes_len);
        let end = if target_end >= bytes_len {
            bytes_len
        } else {
            find_boundary(text, start, target_end)
        };

        let piece = char_boundary_safe(text, start, end);
        chunks.push(TextChunk {
            index,
            text: text[start..piece].to_string(),
        });
        index += 1;

        if piece >= bytes_len {
            break;
        }

        let next_start = piece.saturating_sub(overlap);
        start = if next_start <= start { piece } else { next_start };
    }

    if chunks.is_empty() {
        chunks.push(TextChunk {
            index: 0,
            text: text.to_string(),
        });
    }

    chunks
}

/// Finds the best split boundary in `[start, target_end]`, preferring
/// paragraph breaks, then sentence breaks, then word breaks, over a hard cut.
///
/// Shared with the embedder's recursive token-limit-recovery split (§4.5),
/// which uses the same hierarchy on a single oversized chunk.
pub fn find_boundary(text: &str, start: usize, target_end: usize) -> usize {
    let window_len = target_end.saturating_sub(start);
    let lookback = ((window_len as f64) * LOOKBACK_FRACTION) as usize;
    let search_start = target_end.saturating_sub(lookback).max(start);
    let window = char_boundary_window(text, search_start, target_end);

    if let Some(pos) = window.rfind("\n\n") {
        return char_boundary_safe(text, start, search_start + pos + 2);
    }
    for sep in [". ", "? ", "! "] {
        if let Some(pos) = window.rfind(sep) {
            return char_boundary_safe(text, start, search_start + pos + sep.len());
        }
    }
    if let Some(pos) = window.rfind(char::is_whitespace) {
        return char_boundary_safe(text, start, search_start + pos + 1);
    }

    char_boundary_safe(text, start, target_end)
}

/// Splits `text` at the best boundary into exactly two pieces, for the
/// embedder's recursive token-limit recovery. Falls back to a hard
/// character-count midpoint if no natural boundary exists.
pub fn split_in_half(text: &str) -> (String, String) {
    if text.is_empty() {
        return (String::new(), String::new());
    }
    let midpoint = text.len() / 2;
    let boundary = find_boundary(text, 0, midpoint.max(1));
    let boundary = if boundary == 0 || boundary >= text.len() {
        char_boundary_safe(text, 0, midpoint.max(1))
    } else {
        boundary
    };
    (text[..boundary].to_string(), text[boundary..].to_string())
}

fn char_boundary_window(text: &str, start: usize, end: usize) -> &str {
    let start = char_boundary_safe(text, 0, start);
    let end = char_boundary_safe(text, 0, end);
    &text[start..end]
}

/// Snaps `pos` down to the nearest UTF-8 char boundary at or before `pos`,
/// never below `min`.
fn char_boundary_safe(text: &str, min: usize, pos: usize) -> usize {
    let mut p = pos.min(text.len());
    while p > min && !text.is_char_boundary(p) {
        p -= 1;
    }
    p.max(min)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconstruct(text: &str, chunks: &[TextChunk], overlap: usize) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i + 1 == chunks.len() {
                out.push_str(&chunk.text);
            } else {
                let keep = chunk.text.len().saturating_sub(overlap);
                let keep = char_boundary_safe(&chunk.text, 0, keep);
                out.push_str(&chunk.text[..keep]);
            }
        }
        let _ = text;
        out
    }

    #[test]
    fn short_text_is_single_chunk() {
        let chunks = chunk_text("hello world", 2000, 200);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello world");
    }

    #[test]
    fn empty_text_yields_one_empty_chunk() {
        let chunks = chunk_text("", 2000, 200);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "");
    }

    #[test]
    fn indices_are_contiguous() {
        let text = "word ".repeat(2000);
        let chunks = chunk_text(&text, 2000, 200);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i as i64);
        }
    }

    #[test]
    fn non_overlap_regions_reconstruct_source_text() {
        let paragraphs: Vec<String> = (0..40)
            .map(|i| format!("Paragraph {i}. It has two sentences! Does it not?"))
            .collect();
        let text = paragraphs.join("\n\n");
        let chunks = chunk_text(&text, 200, 40);
        assert!(chunks.len() > 1);
        let reconstructed = reconstruct(&text, &chunks, 40);
        assert_eq!(reconstructed, text);
    }

    #[test]
    fn prefers_paragraph_boundary_when_available() {
        let text = format!("{}\n\n{}", "a".repeat(1900), "b".repeat(1900));
        let chunks = chunk_text(&text, 2000, 200);
        assert_eq!(chunks[0].text.trim_end(), "a".repeat(1900));
    }

    #[test]
    fn hard_cuts_when_no_boundary_exists() {
        let text = "x".repeat(5000);
        let chunks = chunk_text(&text, 2000, 200);
        assert!(chunks.len() >= 3);
    }
}
