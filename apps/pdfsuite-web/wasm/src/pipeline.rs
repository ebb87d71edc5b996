//! Page pipelines driven by JavaScript rendering and OCR
//!
//! Rasterizing needs the browser's PDF renderer and recognition needs an
//! OCR engine, so both arrive as callbacks returning promises:
//!
//! ```javascript
//! const cancel = new CancelHandle();
//! const pdf = await compressPdf(pageCount, render, "high", onProgress, cancel);
//! // render(pageIndex, { scale, format, quality }) => Promise<{ widthPx, heightPx, bytes }>
//! // recognize(bytes, mimeType, language) => Promise<{ text, confidence }>
//! ```

use crate::to_js_error;
use async_trait::async_trait;
use pdfsuite_core::pipeline::{
    compress_document, ocr_document, render_pages_to_images, CompressionLevel, OcrOptions,
    PageProgress,
};
use pdfsuite_core::services::{
    PageRenderer, RasterSurface, Recognition, RenderRequest, TextRecognizer,
};
use pdfsuite_core::PdfSuiteError;
use tokio_util::sync::CancellationToken;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, JsFuture};

/// Cancels a running pipeline before its next page.
#[wasm_bindgen]
#[derive(Clone, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

#[wasm_bindgen]
impl CancelHandle {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[wasm_bindgen(getter, js_name = isCancelled)]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

struct JsRenderer {
    render: js_sys::Function,
}

#[async_trait(?Send)]
impl PageRenderer for JsRenderer {
    async fn render(
        &self,
        page_index: usize,
        request: RenderRequest,
    ) -> Result<RasterSurface, PdfSuiteError> {
        let request_js = serde_wasm_bindgen::to_value(&request)
            .map_err(|e| PdfSuiteError::SerializationError(e.to_string()))?;
        let value = await_call(
            &self.render,
            &JsValue::from(page_index as u32),
            &request_js,
            &JsValue::UNDEFINED,
        )
        .await?;

        Ok(RasterSurface {
            width_px: number_field(&value, "widthPx")? as u32,
            height_px: number_field(&value, "heightPx")? as u32,
            format: request.format,
            bytes: js_sys::Uint8Array::new(&field(&value, "bytes")?).to_vec(),
        })
    }
}

struct JsRecognizer {
    recognize: js_sys::Function,
}

#[async_trait(?Send)]
impl TextRecognizer for JsRecognizer {
    async fn recognize(
        &self,
        image: &RasterSurface,
        language: &str,
    ) -> Result<Recognition, PdfSuiteError> {
        let bytes = js_sys::Uint8Array::from(image.bytes.as_slice());
        let value = await_call(
            &self.recognize,
            &bytes.into(),
            &JsValue::from_str(image.format.mime_type()),
            &JsValue::from_str(language),
        )
        .await?;
        serde_wasm_bindgen::from_value(value)
            .map_err(|e| PdfSuiteError::SerializationError(e.to_string()))
    }
}

/// Call a JS function and await its result, whether or not it returns a promise.
async fn await_call(
    function: &js_sys::Function,
    a: &JsValue,
    b: &JsValue,
    c: &JsValue,
) -> Result<JsValue, PdfSuiteError> {
    let returned = function
        .call3(&JsValue::NULL, a, b, c)
        .map_err(js_failure)?;
    JsFuture::from(js_sys::Promise::resolve(&returned))
        .await
        .map_err(js_failure)
}

fn field(value: &JsValue, key: &str) -> Result<JsValue, PdfSuiteError> {
    js_sys::Reflect::get(value, &JsValue::from_str(key)).map_err(js_failure)
}

fn number_field(value: &JsValue, key: &str) -> Result<f64, PdfSuiteError> {
    field(value, key)?
        .as_f64()
        .ok_or_else(|| PdfSuiteError::OperationError(format!("Rendered page is missing {}", key)))
}

fn js_failure(e: JsValue) -> PdfSuiteError {
    PdfSuiteError::OperationError(e.as_string().unwrap_or_else(|| format!("{:?}", e)))
}

fn progress_reporter(callback: Option<js_sys::Function>) -> impl FnMut(PageProgress) {
    move |progress: PageProgress| {
        if let Some(callback) = &callback {
            let _ = callback.call2(
                &JsValue::NULL,
                &JsValue::from(progress.completed as u32),
                &JsValue::from(progress.total as u32),
            );
        }
    }
}

fn parse_level(level: &str) -> Result<CompressionLevel, PdfSuiteError> {
    match level.to_ascii_lowercase().as_str() {
        "low" => Ok(CompressionLevel::Low),
        "" | "medium" => Ok(CompressionLevel::Medium),
        "high" => Ok(CompressionLevel::High),
        other => Err(PdfSuiteError::Config(format!(
            "Unknown compression level: {}",
            other
        ))),
    }
}

/// Re-render every page as JPEG; resolves to the new PDF bytes
#[wasm_bindgen(js_name = compressPdf)]
pub fn compress_pdf(
    page_count: usize,
    render: js_sys::Function,
    level: &str,
    progress: Option<js_sys::Function>,
    cancel: &CancelHandle,
) -> js_sys::Promise {
    let level = parse_level(level);
    let token = cancel.token.clone();
    future_to_promise(async move {
        let renderer = JsRenderer { render };
        let bytes = compress_document(
            &renderer,
            page_count,
            level.map_err(to_js_error)?,
            &token,
            progress_reporter(progress),
        )
        .await
        .map_err(to_js_error)?;
        Ok(js_sys::Uint8Array::from(bytes.as_slice()).into())
    })
}

/// Recognize the text of every page; resolves to the joined text
#[wasm_bindgen(js_name = ocrPdf)]
pub fn ocr_pdf(
    page_count: usize,
    render: js_sys::Function,
    recognize: js_sys::Function,
    language: Option<String>,
    progress: Option<js_sys::Function>,
    cancel: &CancelHandle,
) -> js_sys::Promise {
    let mut options = OcrOptions::default();
    if let Some(language) = language.filter(|l| !l.trim().is_empty()) {
        options.language = language;
    }
    let token = cancel.token.clone();
    future_to_promise(async move {
        let renderer = JsRenderer { render };
        let recognizer = JsRecognizer { recognize };
        let text = ocr_document(
            &renderer,
            &recognizer,
            page_count,
            &options,
            &token,
            progress_reporter(progress),
        )
        .await
        .map_err(to_js_error)?;
        Ok(JsValue::from_str(&text))
    })
}

/// Render every page to PNG; resolves to an array of Uint8Array
#[wasm_bindgen(js_name = renderPagesToImages)]
pub fn render_pages(
    page_count: usize,
    render: js_sys::Function,
    progress: Option<js_sys::Function>,
    cancel: &CancelHandle,
) -> js_sys::Promise {
    let token = cancel.token.clone();
    future_to_promise(async move {
        let renderer = JsRenderer { render };
        let surfaces =
            render_pages_to_images(&renderer, page_count, &token, progress_reporter(progress))
                .await
                .map_err(to_js_error)?;
        let images = js_sys::Array::new();
        for surface in &surfaces {
            images.push(&js_sys::Uint8Array::from(surface.bytes.as_slice()));
        }
        Ok(images.into())
    })
}
