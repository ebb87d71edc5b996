//! Stateful split/merge session
//!
//! Documents and the page selection are held in Rust; JavaScript only
//! forwards user input and downloads the result.

use crate::page_info::PageInfo;
use crate::validation::{validate_pdf, PdfInfo};
use crate::{to_js, to_js_error};
use pdfsuite_core::ranges::{parse_page_ranges, require_pages};
use pdfsuite_core::{tools, PdfDocument, PdfSuiteError};
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[derive(Default)]
struct DocumentEntry {
    name: String,
    bytes: Vec<u8>,
    info: PdfInfo,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentInfoJs {
    name: String,
    page_count: u32,
    size_bytes: usize,
    version: String,
    encrypted: bool,
}

/// Session mode determines available operations
#[wasm_bindgen]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Split mode: single document, extract pages
    Split,
    /// Merge mode: multiple documents, combine
    Merge,
}

#[wasm_bindgen]
pub struct PdfSuiteSession {
    mode: SessionMode,
    documents: Vec<DocumentEntry>,
    /// 0-based page indices, sorted and unique
    selected_pages: Vec<usize>,
    progress_callback: Option<js_sys::Function>,
}

#[wasm_bindgen]
impl PdfSuiteSession {
    #[wasm_bindgen(constructor)]
    pub fn new(mode: SessionMode) -> Self {
        Self {
            mode,
            documents: Vec::new(),
            selected_pages: Vec::new(),
            progress_callback: None,
        }
    }

    #[wasm_bindgen(getter)]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Callback signature: (current: number, total: number, message: string) => void
    #[wasm_bindgen(js_name = setProgressCallback)]
    pub fn set_progress_callback(&mut self, callback: js_sys::Function) {
        self.progress_callback = Some(callback);
    }

    /// Add a document to the session; returns its info
    #[wasm_bindgen(js_name = addDocument)]
    pub fn add_document(&mut self, name: &str, bytes: &[u8]) -> Result<JsValue, JsValue> {
        let info = self
            .add_document_internal(name, bytes)
            .map_err(to_js_error)?;
        to_js(&info)
    }

    #[wasm_bindgen(js_name = removeDocument)]
    pub fn remove_document(&mut self, index: usize) -> Result<(), JsValue> {
        self.remove_document_internal(index).map_err(to_js_error)
    }

    /// `new_order` lists current indices in the desired order
    #[wasm_bindgen(js_name = reorderDocuments)]
    pub fn reorder_documents(&mut self, new_order: &[usize]) -> Result<(), JsValue> {
        self.reorder_documents_internal(new_order)
            .map_err(to_js_error)
    }

    /// Input: "1-3, 5, 8-10" format
    #[wasm_bindgen(js_name = setPageSelection)]
    pub fn set_page_selection(&mut self, range_str: &str) -> Result<(), JsValue> {
        self.set_page_selection_internal(range_str)
            .map_err(to_js_error)
    }

    /// Selected pages, 1-indexed for display
    #[wasm_bindgen(js_name = getSelectedPages)]
    pub fn get_selected_pages(&self) -> Vec<u32> {
        self.selected_pages.iter().map(|&i| i as u32 + 1).collect()
    }

    #[wasm_bindgen(js_name = getPageInfo)]
    pub fn get_page_info(&self, doc_index: usize, page_num: u32) -> Result<JsValue, JsValue> {
        let entry = self.entry(doc_index).map_err(to_js_error)?;
        let doc = PdfDocument::open(&entry.bytes).map_err(to_js_error)?;
        let info = PageInfo::from_document(&doc, page_num).map_err(to_js_error)?;
        to_js(&info)
    }

    #[wasm_bindgen(js_name = getDocumentInfos)]
    pub fn get_document_infos(&self) -> Result<JsValue, JsValue> {
        let infos: Vec<_> = self
            .documents
            .iter()
            .map(|d| DocumentInfoJs {
                name: d.name.clone(),
                page_count: d.info.page_count,
                size_bytes: d.bytes.len(),
                version: d.info.version.clone(),
                encrypted: d.info.encrypted,
            })
            .collect();
        to_js(&infos)
    }

    #[wasm_bindgen(js_name = getTotalPageCount)]
    pub fn get_total_page_count(&self) -> u32 {
        self.documents.iter().map(|d| d.info.page_count).sum()
    }

    #[wasm_bindgen(js_name = getDocumentCount)]
    pub fn get_document_count(&self) -> usize {
        self.documents.len()
    }

    #[wasm_bindgen(js_name = canExecute)]
    pub fn can_execute(&self) -> bool {
        match self.mode {
            SessionMode::Split => !self.documents.is_empty() && !self.selected_pages.is_empty(),
            SessionMode::Merge => self.documents.len() >= 2,
        }
    }

    /// Execute the operation and return the resulting PDF
    pub fn execute(&self) -> Result<js_sys::Uint8Array, JsValue> {
        let result = self.execute_internal().map_err(to_js_error)?;
        Ok(js_sys::Uint8Array::from(result.as_slice()))
    }
}

impl PdfSuiteSession {
    fn add_document_internal(&mut self, name: &str, bytes: &[u8]) -> Result<PdfInfo, PdfSuiteError> {
        if self.mode == SessionMode::Split && !self.documents.is_empty() {
            return Err(PdfSuiteError::OperationError(
                "Split mode only allows one document. Remove existing document first.".to_string(),
            ));
        }

        let info = validate_pdf(bytes)?;
        if info.encrypted {
            return Err(PdfSuiteError::PasswordRequired);
        }

        self.documents.push(DocumentEntry {
            name: name.to_string(),
            bytes: bytes.to_vec(),
            info: info.clone(),
        });

        // Split mode starts with every page selected
        if self.mode == SessionMode::Split {
            self.selected_pages = (0..info.page_count as usize).collect();
        }
        tracing::debug!(name, pages = info.page_count, "Added document");
        Ok(info)
    }

    fn remove_document_internal(&mut self, index: usize) -> Result<(), PdfSuiteError> {
        self.entry(index)?;
        self.documents.remove(index);
        if self.documents.is_empty() {
            self.selected_pages.clear();
        }
        Ok(())
    }

    fn reorder_documents_internal(&mut self, new_order: &[usize]) -> Result<(), PdfSuiteError> {
        if self.mode != SessionMode::Merge {
            return Err(invalid("Reorder only available in merge mode"));
        }
        if new_order.len() != self.documents.len() {
            return Err(invalid("Invalid order: wrong number of indices"));
        }

        let mut seen = vec![false; self.documents.len()];
        for &idx in new_order {
            match seen.get_mut(idx) {
                None => return Err(invalid("Invalid order: index out of bounds")),
                Some(true) => return Err(invalid("Invalid order: duplicate index")),
                Some(slot) => *slot = true,
            }
        }

        let mut reordered = Vec::with_capacity(self.documents.len());
        for &idx in new_order {
            reordered.push(std::mem::take(&mut self.documents[idx]));
        }
        self.documents = reordered;
        Ok(())
    }

    fn set_page_selection_internal(&mut self, range_str: &str) -> Result<(), PdfSuiteError> {
        if self.mode != SessionMode::Split {
            return Err(invalid("Page selection only available in split mode"));
        }
        let entry = self.entry(0)?;
        let pages = parse_page_ranges(range_str, entry.info.page_count as usize);
        self.selected_pages = require_pages(pages)?;
        Ok(())
    }

    fn execute_internal(&self) -> Result<Vec<u8>, PdfSuiteError> {
        if !self.can_execute() {
            return Err(invalid("Session not ready for execution"));
        }

        self.report_progress(0, 100, "Starting...");
        let result = match self.mode {
            SessionMode::Split => {
                self.report_progress(10, 100, "Extracting pages...");
                PdfDocument::load(&self.documents[0].bytes)?
                    .extract_pages(&self.selected_pages)?
                    .save()?
            }
            SessionMode::Merge => {
                self.report_progress(10, 100, "Merging...");
                let files: Vec<Vec<u8>> = self.documents.iter().map(|d| d.bytes.clone()).collect();
                tools::merge(&files)?
            }
        };
        self.report_progress(100, 100, "Complete");
        Ok(result)
    }

    fn entry(&self, index: usize) -> Result<&DocumentEntry, PdfSuiteError> {
        self.documents
            .get(index)
            .ok_or_else(|| invalid("Document index out of bounds"))
    }

    fn report_progress(&self, current: u32, total: u32, message: &str) {
        if let Some(callback) = &self.progress_callback {
            let _ = callback.call3(
                &JsValue::NULL,
                &JsValue::from(current),
                &JsValue::from(total),
                &JsValue::from_str(message),
            );
        }
    }
}

fn invalid(message: &str) -> PdfSuiteError {
    PdfSuiteError::OperationError(message.to_string())
}
