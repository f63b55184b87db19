//! Document reference extraction from narrative insight text.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use querystream_core::constants::DOCUMENTS_URL_PREFIX;
use querystream_core::DocumentReference;

/// Characters after a `Document N:` line searched for its `File:` line.
const FILE_LOOKAHEAD_CHARS: usize = 200;

static DOCUMENT_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Document \d+: ([^<\n]+?)(?:\n|<br>|$)").expect("valid document title regex")
});

static FILE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)File: ([^<\n]+\.(?:docx?|pdf|xlsx?|pptx?))").expect("valid file line regex")
});

static BARE_FILENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([^<\n\s]+\.(?:docx?|pdf|xlsx?|pptx?))").expect("valid filename regex")
});

/// Human-readable document type for a filename's extension.
pub fn document_type(filename: &str) -> &'static str {
    let ext = filename
        .rsplit('.')
        .next()
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "PDF Document",
        "doc" | "docx" => "Word Document",
        "xls" | "xlsx" => "Excel Spreadsheet",
        "ppt" | "pptx" => "PowerPoint Presentation",
        "txt" => "Text Document",
        _ => "Document",
    }
}

/// Deep link for a referenced document.
pub fn document_url(filename: &str) -> String {
    format!("{}{}", DOCUMENTS_URL_PREFIX, urlencoding::encode(filename))
}

/// Slice of `text` starting at `start` and spanning at most `max_chars` characters.
fn char_window(text: &str, start: usize, max_chars: usize) -> &str {
    let rest = &text[start..];
    let end = rest
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    &rest[..end]
}

/// Scan `text` for document mentions, first occurrence of a filename wins.
///
/// Patterns are applied in order: `Document N: Title` followed by a
/// `File: name.ext` line, then `File: name.ext`, then any bare `name.ext`.
pub fn extract_document_references(text: &str) -> Vec<DocumentReference> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut references = Vec::new();

    let mut push = |title: String, filename: String| {
        if filename.is_empty() || !seen.insert(filename.clone()) {
            return;
        }
        references.push(DocumentReference {
            title,
            url: document_url(&filename),
            document_type: document_type(&filename).to_string(),
            filename,
        });
    };

    for caps in DOCUMENT_TITLE.captures_iter(text) {
        let (Some(whole), Some(title)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let window = char_window(text, whole.end(), FILE_LOOKAHEAD_CHARS);
        if let Some(filename) = FILE_LINE.captures(window).and_then(|c| c.get(1)) {
            push(title.as_str().trim().to_string(), filename.as_str().trim().to_string());
        }
    }

    for pattern in [&*FILE_LINE, &*BARE_FILENAME] {
        for caps in pattern.captures_iter(text) {
            if let Some(filename) = caps.get(1) {
                let filename = filename.as_str().trim().to_string();
                push(filename.clone(), filename);
            }
        }
    }

    references
}
