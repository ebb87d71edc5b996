//! WASM bindings for the PDF utility suite
//!
//! Document state lives in Rust; JavaScript handles DOM events, file I/O
//! and the pieces only the browser has (page rendering, OCR).
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { PageEditor, executeCommand } from './pkg/pdfsuite_wasm.js';
//!
//! await init();
//!
//! // One-shot tools
//! const result = executeCommand(JSON.stringify({
//!     type: "Rotate", file: Array.from(bytes), rotations: { "0": 90 },
//! }));
//!
//! // Interactive editing
//! const editor = new PageEditor("file.pdf", bytes);
//! editor.setViewport(0, 1.5, 0);
//! editor.addText(0, 120, 80, "Approved", 14, "#1a7f37", 1, 0);
//! downloadBlob(editor.commit(), "edited.pdf");
//! ```

pub mod editor;
pub mod page_info;
pub mod pipeline;
pub mod reader;
pub mod session;
pub mod validation;

use pdfsuite_core::reader::{group_lines, TextBlock, TextItem};
use pdfsuite_core::{execute_with_clock, PdfCommand, PdfSuiteError, ProcessResult};
use serde::Serialize;
use wasm_bindgen::prelude::*;

pub use editor::PageEditor;
pub use page_info::{PageInfo, PageOrientation};
pub use pipeline::CancelHandle;
pub use reader::RsvpPlayer;
pub use session::{PdfSuiteSession, SessionMode};
pub use validation::PdfInfo;

/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Returns Ok(()) if the file looks like a complete PDF
#[wasm_bindgen]
pub fn quick_validate(bytes: &[u8]) -> Result<(), JsValue> {
    validation::quick_validate(bytes).map_err(to_js_error)
}

/// PDF info without creating a session
#[wasm_bindgen]
pub fn get_pdf_info(bytes: &[u8]) -> Result<JsValue, JsValue> {
    let info = validation::validate_pdf(bytes).map_err(to_js_error)?;
    to_js(&info)
}

#[wasm_bindgen]
pub fn get_page_count(bytes: &[u8]) -> Result<u32, JsValue> {
    pdfsuite_core::get_page_count(bytes)
        .map(|count| count as u32)
        .map_err(to_js_error)
}

/// 0-based page indices selected by a range string like "1-3, 5"
#[wasm_bindgen(js_name = parsePageRanges)]
pub fn parse_page_ranges(range_str: &str, page_count: usize) -> Vec<u32> {
    pdfsuite_core::parse_page_ranges(range_str, page_count)
        .into_iter()
        .map(|i| i as u32)
        .collect()
}

/// First problem in a range string as an inline hint, or undefined if it is clean
#[wasm_bindgen(js_name = validatePageRange)]
pub fn validate_page_range(range_str: &str, page_count: usize) -> Option<String> {
    pdfsuite_core::ranges::validate_page_range(range_str, page_count)
}

/// Run a JSON-encoded command and return the JSON-encoded result
///
/// Failures, including malformed commands, come back as `success: false`.
#[wasm_bindgen(js_name = executeCommand)]
pub fn execute_command(command_json: &str) -> String {
    execute_json(command_json, js_sys::Date::now)
}

/// Group positioned text items (one array per page) into lines and page breaks
#[wasm_bindgen(js_name = groupTextLines)]
pub fn group_text_lines(pages: JsValue) -> Result<JsValue, JsValue> {
    let pages: Vec<Vec<TextItem>> = serde_wasm_bindgen::from_value(pages)
        .map_err(|e| JsValue::from_str(&format!("Invalid text items: {}", e)))?;
    to_js(&group_lines(&pages))
}

/// Word document with one paragraph per line block and page breaks between pages
#[wasm_bindgen(js_name = blocksToDocx)]
pub fn blocks_to_docx(blocks: JsValue) -> Result<js_sys::Uint8Array, JsValue> {
    let blocks: Vec<TextBlock> = serde_wasm_bindgen::from_value(blocks)
        .map_err(|e| JsValue::from_str(&format!("Invalid text blocks: {}", e)))?;
    let bytes = pdfsuite_core::tools::blocks_to_docx(&blocks).map_err(to_js_error)?;
    Ok(js_sys::Uint8Array::from(bytes.as_slice()))
}

/// Word document built from the PDF's own text layer
#[wasm_bindgen(js_name = pdfToDocx)]
pub fn pdf_to_docx(bytes: &[u8]) -> Result<js_sys::Uint8Array, JsValue> {
    let docx = pdfsuite_core::tools::pdf_to_docx(bytes).map_err(to_js_error)?;
    Ok(js_sys::Uint8Array::from(docx.as_slice()))
}

#[wasm_bindgen]
pub fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

fn execute_json(command_json: &str, now_ms: impl Fn() -> f64) -> String {
    let result = match serde_json::from_str::<PdfCommand>(command_json) {
        Ok(command) => execute_with_clock(command, now_ms),
        Err(e) => ProcessResult {
            success: false,
            data: None,
            files: Vec::new(),
            fields: None,
            error: Some(PdfSuiteError::from(e).to_string()),
            metrics: None,
        },
    };
    serde_json::to_string(&result).unwrap_or_else(|e| {
        format!(
            r#"{{"success":false,"data":null,"error":"{}","metrics":null}}"#,
            e.to_string().replace('"', "'")
        )
    })
}

pub(crate) fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

pub(crate) fn to_js_error(error: PdfSuiteError) -> JsValue {
    JsValue::from_str(&error.to_string())
}


#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use test_support::create_test_pdf;

    fn clock() -> f64 {
        0.0
    }

    #[test]
    fn test_get_version() {
        assert!(!get_version().is_empty());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1048576), "1.0 MB");
        assert_eq!(format_bytes(2621440), "2.5 MB");
    }

    #[test]
    fn test_parse_page_ranges_is_zero_based() {
        assert_eq!(parse_page_ranges("1, 3-4", 10), vec![0, 2, 3]);
        assert!(parse_page_ranges("11", 10).is_empty());
    }

    #[test]
    fn test_execute_json_rotate() {
        let command = serde_json::json!({
            "type": "Rotate",
            "file": create_test_pdf(2),
            "rotations": { "1": 90 },
        });
        let out: serde_json::Value =
            serde_json::from_str(&execute_json(&command.to_string(), clock)).unwrap();
        assert_eq!(out["success"], true);
        assert_eq!(out["metrics"]["page_count"], 2);
        assert!(out["data"].as_str().unwrap().len() > 0);
    }

    #[test]
    fn test_grouped_blocks_serialize_for_docx_export() {
        let blocks = group_lines(&[vec![TextItem {
            text: "Hello".into(),
            x: 0.0,
            y: 700.0,
        }]]);
        let json = serde_json::to_value(&blocks).unwrap();
        assert_eq!(json, serde_json::json!([{ "type": "line", "text": "Hello" }]));
        let round: Vec<TextBlock> = serde_json::from_value(json).unwrap();
        let docx = pdfsuite_core::tools::blocks_to_docx(&round).unwrap();
        assert!(docx.starts_with(b"PK"));
    }

    #[test]
    fn test_execute_json_rejects_malformed_command() {
        let out: serde_json::Value =
            serde_json::from_str(&execute_json(r#"{"type":"Explode"}"#, clock)).unwrap();
        assert_eq!(out["success"], false);
        assert!(out["error"]
            .as_str()
            .unwrap()
            .starts_with("Serialization error"));
    }

    proptest! {
        #[test]
        fn prop_parsed_pages_are_sorted_and_in_range(range in "[0-9, -]{0,20}", count in 1usize..50) {
            let pages = parse_page_ranges(&range, count);
            prop_assert!(pages.iter().all(|&p| (p as usize) < count));
            prop_assert!(pages.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
