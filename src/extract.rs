//! Text extraction for uploaded documents.
//!
//! Only plain-text formats are supported. Pages are delimited by form feed
//! characters, which is how most text exports of paginated documents mark
//! page breaks.

use std::path::Path;

use thiserror::Error;

/// Extensions accepted as plain text.
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "md"];

const PAGE_BREAK: char = '\u{000C}';

/// Errors that can occur during text extraction.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("No text content in {0}")]
    Empty(String),
}

/// Result of text extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub text: String,
    pub page_count: u32,
}

/// Whether `filename` has an extension this module can read.
pub fn is_supported(filename: &str) -> bool {
    extension_of(filename)
        .map(|ext| TEXT_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Extract text from raw file bytes. `filename` selects the format.
pub fn extract_bytes(filename: &str, content: &[u8]) -> Result<ExtractionResult, ExtractionError> {
    if !is_supported(filename) {
        return Err(ExtractionError::UnsupportedFileType(
            extension_of(filename).unwrap_or_else(|| filename.to_string()),
        ));
    }

    let decoded = String::from_utf8_lossy(content);
    let text = decoded
        .trim_start_matches('\u{FEFF}')
        .replace("\r\n", "\n")
        .trim()
        .to_string();

    if text.is_empty() {
        return Err(ExtractionError::Empty(filename.to_string()));
    }

    let page_count = text
        .split(PAGE_BREAK)
        .filter(|page| !page.trim().is_empty())
        .count()
        .max(1) as u32;

    Ok(ExtractionResult { text, page_count })
}
