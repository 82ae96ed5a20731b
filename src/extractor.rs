//! Multi-format text extraction (C1, §4.1).
//!
//! Converts an uploaded blob of a declared format into normalized UTF-8
//! text: PDF and HTML become Markdown-like text, JSON and XML become YAML
//! (denser, less-noisy tokenization than the raw serialization), and
//! everything else — plain text, Markdown, YAML, CSV, logs, and source
//! code — passes through as a UTF-8 decode.

use crate::error::CoreError;

/// The seventeen extensions the validator's allow-list admits (§4.2 tier 1).
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "pdf", "html", "htm", "txt", "md", "json", "xml", "yaml", "yml", "csv", "log", "py", "js",
    "ts", "java", "go", "rs",
];

/// Coarse extraction strategy an extension maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionKind {
    Pdf,
    Html,
    JsonToYaml,
    XmlToYaml,
    PassThrough,
}

/// Classifies a lowercase file extension (without the leading dot).
pub fn classify(extension: &str) -> Option<ExtractionKind> {
    match extension {
        "pdf" => Some(ExtractionKind::Pdf),
        "html" | "htm" => Some(ExtractionKind::Html),
        "json" => Some(ExtractionKind::JsonToYaml),
        "xml" => Some(ExtractionKind::XmlToYaml),
        ext if SUPPORTED_EXTENSIONS.contains(&ext) => Some(ExtractionKind::PassThrough),
        _ => None,
    }
}

/// Extracts plain UTF-8 text from `bytes` given its declared `extension`.
pub fn extract_text(bytes: &[u8], extension: &str) -> Result<String, CoreError> {
    let ext = extension.trim_start_matches('.').to_lowercase();
    let kind = classify(&ext).ok_or_else(|| CoreError::UnsupportedFormat(ext.clone()))?;

    match kind {
        ExtractionKind::Pdf => extract_pdf(bytes),
        ExtractionKind::Html => extract_html(bytes),
        ExtractionKind::JsonToYaml => extract_json_as_yaml(bytes),
        ExtractionKind::XmlToYaml => extract_xml_as_yaml(bytes),
        ExtractionKind::PassThrough => extract_passthrough(bytes),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, CoreError> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| CoreError::ExtractionFailed(format!("PDF extraction failed: {e}")))
}

fn extract_passthrough(bytes: &[u8]) -> Result<String, CoreError> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| CoreError::ExtractionFailed(format!("invalid UTF-8: {e}")))
}

fn extract_json_as_yaml(bytes: &[u8]) -> Result<String, CoreError> {
    let text = extract_passthrough(bytes)?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| CoreError::ExtractionFailed(format!("invalid JSON: {e}")))?;
    serde_yaml::to_string(&value)
        .map_err(|e| CoreError::ExtractionFailed(format!("YAML serialization failed: {e}")))
}

fn extract_xml_as_yaml(bytes: &[u8]) -> Result<String, CoreError> {
    let value = parse_xml_to_value(bytes)?;
    serde_yaml::to_string(&value)
        .map_err(|e| CoreError::ExtractionFailed(format!("YAML serialization failed: {e}")))
}

/// Parses an XML document into a generic [`serde_json::Value`] tree: each
/// element becomes an object with a `"#text"` entry for text content and one
/// entry per distinct child tag name (repeated tags collapse into an array).
fn parse_xml_to_value(bytes: &[u8]) -> Result<serde_json::Value, CoreError> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    // Stack of (tag_name, accumulated object).
    let mut stack: Vec<(String, serde_json::Map<String, serde_json::Value>)> = Vec::new();
    let mut root: Option<serde_json::Value> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                stack.push((name, serde_json::Map::new()));
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                insert_child(&mut stack, &mut root, name, serde_json::Value::Null);
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().unwrap_or_default().trim().to_string();
                if !text.is_empty() {
                    if let Some((_, obj)) = stack.last_mut() {
                        obj.insert("#text".to_string(), serde_json::Value::String(text));
                    }
                }
            }
            Ok(Event::End(_)) => {
                if let Some((name, obj)) = stack.pop() {
                    let value = if obj.len() == 1 {
                        obj.values().next().cloned().unwrap_or(serde_json::Value::Null)
                    } else {
                        serde_json::Value::Object(obj)
                    };
                    insert_child(&mut stack, &mut root, name, value);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(CoreError::ExtractionFailed(format!("malformed XML: {e}"))),
            _ => {}
        }
        buf.clear();
    }

    root.ok_or_else(|| CoreError::ExtractionFailed("empty XML document".to_string()))
}

fn insert_child(
    stack: &mut [(String, serde_json::Map<String, serde_json::Value>)],
    root: &mut Option<serde_json::Value>,
    name: String,
    value: serde_json::Value,
) {
    match stack.last_mut() {
        Some((_, parent)) => match parent.get_mut(&name) {
            Some(serde_json::Value::Array(arr)) => arr.push(value),
            Some(existing) => {
                let prev = existing.clone();
                *existing = serde_json::Value::Array(vec![prev, value]);
            }
            None => {
                parent.insert(name, value);
            }
        },
        None => *root = Some(value),
    }
}

/// Extracts Markdown-like text from HTML: strips `<script>`/`<style>`,
/// preserves headings, paragraphs, and list items as Markdown-ish lines.
fn extract_html(bytes: &[u8]) -> Result<String, CoreError> {
    let html = extract_passthrough(bytes)?;
    let document = scraper::Html::parse_document(&html);
    let body_selector = scraper::Selector::parse("body").unwrap();
    let root = document
        .select(&body_selector)
        .next()
        .unwrap_or_else(|| document.root_element());

    let mut out = String::new();
    render_node(root, &mut out);
    Ok(out.trim().to_string())
}

fn render_node(element: scraper::ElementRef, out: &mut String) {
    let tag = element.value().name();
    if matches!(tag, "script" | "style" | "noscript") {
        return;
    }

    let prefix = match tag {
        "h1" => Some("# "),
        "h2" => Some("## "),
        "h3" => Some("### "),
        "h4" => Some("#### "),
        "h5" => Some("##### "),
        "h6" => Some("###### "),
        "li" => Some("- "),
        _ => None,
    };

    if let Some(p) = prefix {
        out.push_str(p);
    }

    for child in element.children() {
        match child.value() {
            scraper::node::Node::Text(text) => out.push_str(text),
            scraper::node::Node::Element(_) => {
                if let Some(child_elem) = scraper::ElementRef::wrap(child) {
                    render_node(child_elem, out);
                }
            }
            _ => {}
        }
    }

    if matches!(
        tag,
        "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li" | "div" | "tr" | "br"
    ) {
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = extract_text(b"binary junk", "exe").unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedFormat(_)));
    }

    #[test]
    fn invalid_pdf_fails_extraction() {
        let err = extract_text(b"not a pdf", "pdf").unwrap_err();
        assert!(matches!(err, CoreError::ExtractionFailed(_)));
    }

    #[test]
    fn plain_text_passes_through_unchanged() {
        let text = extract_text(b"hello world", "txt").unwrap();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn json_becomes_yaml() {
        let text = extract_text(br#"{"a": 1, "b": [2, 3]}"#, "json").unwrap();
        assert!(text.contains("a: 1"));
    }

    #[test]
    fn invalid_json_fails_extraction() {
        let err = extract_text(b"{not json", "json").unwrap_err();
        assert!(matches!(err, CoreError::ExtractionFailed(_)));
    }

    #[test]
    fn xml_becomes_yaml() {
        let text = extract_text(b"<root><title>Hi</title></root>", "xml").unwrap();
        assert!(text.contains("title"));
    }

    #[test]
    fn html_strips_script_and_preserves_headings() {
        let text = extract_text(
            b"<html><body><h1>Title</h1><script>evil()</script><p>Body text</p></body></html>",
            "html",
        )
        .unwrap();
        assert!(text.contains("# Title"));
        assert!(text.contains("Body text"));
        assert!(!text.contains("evil"));
    }

    #[test]
    fn source_code_passes_through() {
        let text = extract_text(b"fn main() {}", "rs").unwrap();
        assert_eq!(text, "fn main() {}");
    }
}
