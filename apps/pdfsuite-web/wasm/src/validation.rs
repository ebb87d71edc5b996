//! PDF validation and info extraction
//!
//! Reports what the UI shows before a tool runs: page count, version,
//! whether a password is needed and the Info dictionary title/author.

use lopdf::{Document, Object};
use pdfsuite_core::services::{Decryptor, PageMetrics};
use pdfsuite_core::{PdfDocument, PdfSuiteError};
use serde::Serialize;

/// How far from the end of the file `%%EOF` may sit.
const EOF_SEARCH_WINDOW: usize = 1024;

/// PDF file information extracted during validation
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PdfInfo {
    /// Number of pages in the document
    pub page_count: u32,
    /// PDF version string (e.g., "1.7")
    pub version: String,
    /// Whether opening the document needs a password
    pub encrypted: bool,
    /// File size in bytes
    pub size_bytes: usize,
    pub valid: bool,
    /// Document title from metadata (if available)
    pub title: Option<String>,
    /// Document author from metadata (if available)
    pub author: Option<String>,
}

/// Validate a PDF file and extract basic info
///
/// Documents locked behind a user password still validate; their metadata
/// is encrypted and is left out.
pub fn validate_pdf(bytes: &[u8]) -> Result<PdfInfo, PdfSuiteError> {
    let document = PdfDocument::open(bytes)?;

    let page_count = document.page_count() as u32;
    if page_count == 0 {
        return Err(PdfSuiteError::InvalidFormat("PDF has no pages".to_string()));
    }

    let encrypted = document.is_encrypted();
    let (title, author) = if encrypted {
        (None, None)
    } else {
        extract_metadata(document.as_lopdf())
    };

    Ok(PdfInfo {
        page_count,
        version: document.version().to_string(),
        encrypted,
        size_bytes: bytes.len(),
        valid: true,
        title,
        author,
    })
}

/// Extract title and author from the trailer's Info dictionary
fn extract_metadata(document: &Document) -> (Option<String>, Option<String>) {
    let info = match document
        .trailer
        .get(b"Info")
        .and_then(Object::as_reference)
        .and_then(|id| document.get_dictionary(id))
    {
        Ok(info) => info,
        Err(_) => return (None, None),
    };

    let field = |key: &[u8]| {
        info.get(key)
            .and_then(Object::as_str)
            .ok()
            .map(decode_text_string)
            .filter(|s| !s.is_empty())
    };
    (field(b"Title"), field(b"Author"))
}

/// Text strings are either UTF-16BE with a BOM or PDFDocEncoding.
fn decode_text_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Quick validation without full parsing (for large files)
pub fn quick_validate(bytes: &[u8]) -> Result<(), PdfSuiteError> {
    if bytes.len() < 8 {
        return Err(PdfSuiteError::InvalidFormat(
            "File too small to be a valid PDF".to_string(),
        ));
    }

    if !bytes.starts_with(b"%PDF-") {
        return Err(PdfSuiteError::InvalidFormat(
            "Not a valid PDF file (missing %PDF- header)".to_string(),
        ));
    }

    let tail = &bytes[bytes.len().saturating_sub(EOF_SEARCH_WINDOW)..];
    if !tail.windows(5).any(|w| w == b"%%EOF") {
        return Err(PdfSuiteError::InvalidFormat(
            "PDF appears truncated (missing %%EOF marker)".to_string(),
        ));
    }

    Ok(())
}
