//! Text Extractor: turns an uploaded CV or JD (PDF, DOCX, plain text) into prompt-ready text.
//!
//! Extraction never touches the filesystem: uploads arrive as bytes from the
//! multipart request and are parsed in memory on the blocking pool.

mod docx;

use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

/// Maximum characters of each document kept for prompting.
pub const MAX_CHARS: usize = 15_000;
/// Extracted text shorter than this is treated as a failed extraction.
pub const MIN_CHARS: usize = 20;
/// Per-document upload cap.
pub const MAX_DOCUMENT_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type for '{0}'. Upload a PDF, DOCX or TXT file.")]
    UnsupportedFormat(String),

    #[error("'{document}' is {size} bytes; the limit is {limit} bytes")]
    TooLarge {
        document: String,
        size: usize,
        limit: usize,
    },

    #[error("Could not read PDF '{document}': {reason}")]
    Pdf { document: String, reason: String },

    #[error("Could not read DOCX '{document}': {reason}")]
    Docx { document: String, reason: String },

    #[error("Could not extract enough text from '{document}'. Try a different format.")]
    InsufficientText { document: String },

    #[error("Extraction of '{document}' was aborted: {reason}")]
    Aborted { document: String, reason: String },
}

/// Supported upload kinds, decided by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentKind {
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let lower = file_name.to_lowercase();
        match lower.rsplit_once('.').map(|(_, ext)| ext) {
            Some("pdf") => Some(DocumentKind::Pdf),
            // Legacy .doc goes through the DOCX reader and fails there with a readable error.
            Some("docx") | Some("doc") => Some(DocumentKind::Docx),
            Some("txt") | Some("text") | Some("md") => Some(DocumentKind::PlainText),
            _ => None,
        }
    }
}

/// A file received from the client, before extraction.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub file_name: String,
    pub data: Bytes,
}

impl UploadedDocument {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
        }
    }
}

/// Extracts and length-checks a document. The full text is returned; callers
/// cut it to `MAX_CHARS` once it has been screened.
///
/// Parsing runs on the blocking pool; a parser panic surfaces as
/// `ExtractionError::Aborted` rather than tearing down the request task.
pub async fn extract_document(document: UploadedDocument) -> Result<String, ExtractionError> {
    let file_name = document.file_name.clone();
    let text = tokio::task::spawn_blocking(move || extract_text(&document))
        .await
        .map_err(|e| ExtractionError::Aborted {
            document: file_name.clone(),
            reason: e.to_string(),
        })??;

    if text.trim().chars().count() < MIN_CHARS {
        return Err(ExtractionError::InsufficientText {
            document: file_name,
        });
    }

    debug!(document = %file_name, chars = text.chars().count(), "Document extracted");
    Ok(text)
}

/// Synchronous, untruncated extraction keyed on the file extension.
pub fn extract_text(document: &UploadedDocument) -> Result<String, ExtractionError> {
    let kind = DocumentKind::from_file_name(&document.file_name)
        .ok_or_else(|| ExtractionError::UnsupportedFormat(document.file_name.clone()))?;

    if document.data.len() > MAX_DOCUMENT_BYTES {
        return Err(ExtractionError::TooLarge {
            document: document.file_name.clone(),
            size: document.data.len(),
            limit: MAX_DOCUMENT_BYTES,
        });
    }

    match kind {
        DocumentKind::Pdf => {
            pdf_extract::extract_text_from_mem(&document.data).map_err(|e| ExtractionError::Pdf {
                document: document.file_name.clone(),
                reason: e.to_string(),
            })
        }
        DocumentKind::Docx => {
            docx::extract_paragraphs(&document.data).map_err(|reason| ExtractionError::Docx {
                document: document.file_name.clone(),
                reason,
            })
        }
        DocumentKind::PlainText => Ok(decode_plain_text(&document.data)),
    }
}

/// UTF-8 decode that drops undecodable bytes instead of failing.
fn decode_plain_text(data: &[u8]) -> String {
    String::from_utf8_lossy(data)
        .chars()
        .filter(|&c| c != char::REPLACEMENT_CHARACTER)
        .collect()
}

/// Returns at most `max_chars` characters of `text`, cut on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
