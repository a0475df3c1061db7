//! PDF Text Extraction
//!
//! Concatenates the text of every page in page order. A malformed document or
//! a page without extractable text fails the whole extraction; a document with
//! no pages yields an empty string.

use lopdf::Document;
use std::path::Path;

use crate::types::ServiceError;

/// Extract all page text from an already-parsed document
pub fn extract_document_text(doc: &Document) -> Result<String, ServiceError> {
    let mut text = String::new();

    // BTreeMap keys are page numbers in ascending order
    for page_number in doc.get_pages().keys() {
        let page_text = doc
            .extract_text(&[*page_number])
            .map_err(|e| ServiceError::Extraction(format!("page {}: {}", page_number, e)))?;

        if page_text.trim().is_empty() {
            return Err(ServiceError::Extraction(format!(
                "page {} has no extractable text",
                page_number
            )));
        }
        text.push_str(&page_text);
    }

    tracing::debug!(pages = doc.get_pages().len(), chars = text.len(), "Extracted PDF text");
    Ok(text)
}

/// Parse PDF bytes and extract their text
pub fn extract_text_from_bytes(bytes: &[u8]) -> Result<String, ServiceError> {
    let doc = Document::load_mem(bytes).map_err(|e| ServiceError::Extraction(e.to_string()))?;
    extract_document_text(&doc)
}

/// Read a PDF file and extract its text
pub fn extract_text_from_path(path: &Path) -> Result<String, ServiceError> {
    let bytes = std::fs::read(path)
        .map_err(|e| ServiceError::Extraction(format!("{}: {}", path.display(), e)))?;
    extract_text_from_bytes(&bytes)
}
