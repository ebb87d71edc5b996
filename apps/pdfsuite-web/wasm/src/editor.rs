//! Page editor bindings
//!
//! Wraps the core edit session together with the document bytes it edits.
//! All positions coming from JavaScript are in screen pixels relative to the
//! rendered page's top-left corner; conversion to points happens here.

use crate::{to_js, to_js_error};
use pdfsuite_core::fonts::StandardFont;
use pdfsuite_core::marks::{ApplyScope, ImageMark, TextMark};
use pdfsuite_core::raster::RasterImage;
use pdfsuite_core::session::ObjectId;
use pdfsuite_core::{
    DocumentPoint, EditSession, PdfSuiteError, PlacedObject, RedactionRegion, Rgb, Rotation,
    ScreenRect, ViewportState,
};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct PageEditor {
    bytes: Vec<u8>,
    session: EditSession,
}

#[wasm_bindgen]
impl PageEditor {
    #[wasm_bindgen(constructor)]
    pub fn new(name: &str, bytes: &[u8]) -> Result<PageEditor, JsValue> {
        Self::open(name, bytes).map_err(to_js_error)
    }

    #[wasm_bindgen(getter, js_name = pageCount)]
    pub fn page_count(&self) -> u32 {
        self.session.page_count() as u32
    }

    #[wasm_bindgen(getter, js_name = documentName)]
    pub fn document_name(&self) -> String {
        self.session.document_name().to_string()
    }

    #[wasm_bindgen(getter, js_name = isProcessing)]
    pub fn is_processing(&self) -> bool {
        self.session.is_processing()
    }

    #[wasm_bindgen(js_name = getDocumentBytes)]
    pub fn get_document_bytes(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(self.bytes.as_slice())
    }

    /// Record the zoom and extra rotation a page is shown with; returns the viewport
    #[wasm_bindgen(js_name = setViewport)]
    pub fn set_viewport(&mut self, page: usize, zoom: f64, rotation: i32) -> Result<JsValue, JsValue> {
        let viewport = self
            .set_viewport_internal(page, zoom, rotation)
            .map_err(to_js_error)?;
        to_js(&viewport)
    }

    #[wasm_bindgen(js_name = screenToDocument)]
    pub fn screen_to_document(&self, page: usize, x: f64, y: f64) -> Result<JsValue, JsValue> {
        let point = self
            .session
            .screen_to_document(page, pdfsuite_core::ScreenPoint::new(x, y))
            .map_err(to_js_error)?;
        to_js(&point)
    }

    /// Place text whose box top-left is at (x, y) on screen; returns the object id
    #[wasm_bindgen(js_name = addText)]
    #[allow(clippy::too_many_arguments)]
    pub fn add_text(
        &mut self,
        page: usize,
        x: f64,
        y: f64,
        text: &str,
        font_size: f64,
        color: &str,
        opacity: f64,
        rotation: f64,
    ) -> Result<f64, JsValue> {
        self.add_text_internal(page, x, y, text, font_size, color, opacity, rotation)
            .map(|id| id as f64)
            .map_err(to_js_error)
    }

    /// Place an image from a data URL, `width` pixels wide on screen
    #[wasm_bindgen(js_name = addImage)]
    pub fn add_image(
        &mut self,
        page: usize,
        x: f64,
        y: f64,
        width: f64,
        data_url: &str,
        opacity: f64,
    ) -> Result<f64, JsValue> {
        self.add_image_internal(page, x, y, width, data_url, opacity)
            .map(|id| id as f64)
            .map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = removeObject)]
    pub fn remove_object(&mut self, id: f64) -> bool {
        self.session.remove(id as ObjectId)
    }

    #[wasm_bindgen(js_name = getObjectCount)]
    pub fn get_object_count(&self) -> usize {
        self.session.objects().len()
    }

    #[wasm_bindgen(js_name = getObjectsJson)]
    pub fn get_objects_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.session.objects())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Frame the area to cover; `apply_to_all` repeats it on every page
    #[wasm_bindgen(js_name = selectRegion)]
    pub fn select_region(
        &mut self,
        page: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        apply_to_all: bool,
    ) -> Result<JsValue, JsValue> {
        let region = self
            .select_region_internal(page, ScreenRect::new(x, y, width, height), apply_to_all)
            .map_err(to_js_error)?;
        to_js(&region)
    }

    #[wasm_bindgen(js_name = clearRegion)]
    pub fn clear_region(&mut self) {
        self.session.clear_region();
    }

    /// Burn the placed objects and region into the document and return it
    pub fn commit(&mut self) -> Result<js_sys::Uint8Array, JsValue> {
        self.commit_internal().map_err(to_js_error)?;
        Ok(self.get_document_bytes())
    }

    #[wasm_bindgen(js_name = toJson)]
    pub fn to_json(&self) -> Result<String, JsValue> {
        self.session.to_json().map_err(to_js_error)
    }
}

impl PageEditor {
    fn open(name: &str, bytes: &[u8]) -> Result<Self, PdfSuiteError> {
        Ok(Self {
            session: EditSession::open(name, bytes)?,
            bytes: bytes.to_vec(),
        })
    }

    fn set_viewport_internal(
        &mut self,
        page: usize,
        zoom: f64,
        rotation: i32,
    ) -> Result<ViewportState, PdfSuiteError> {
        if !(zoom.is_finite() && zoom > 0.0) {
            return Err(PdfSuiteError::NotRendered);
        }
        let rotation = Rotation::from_degrees(i64::from(rotation))?;
        self.session.set_viewport(page, zoom, rotation)
    }

    /// Bottom-left corner, in points, of a box drawn on screen.
    fn anchor_point(&self, page: usize, screen_box: ScreenRect) -> Result<DocumentPoint, PdfSuiteError> {
        Ok(self.session.mapper(page)?.rect_to_document(screen_box)?.origin())
    }

    fn zoom(&self, page: usize) -> Result<f64, PdfSuiteError> {
        self.session
            .viewport(page)
            .map(|v| v.zoom)
            .ok_or(PdfSuiteError::NotRendered)
    }

    #[allow(clippy::too_many_arguments)]
    fn add_text_internal(
        &mut self,
        page: usize,
        x: f64,
        y: f64,
        text: &str,
        font_size: f64,
        color: &str,
        opacity: f64,
        rotation: f64,
    ) -> Result<ObjectId, PdfSuiteError> {
        let screen_height = font_size * self.zoom(page)?;
        let position = self.anchor_point(page, ScreenRect::new(x, y, 0.0, screen_height))?;
        self.session.place(PlacedObject::Text(TextMark {
            page_index: page,
            position,
            content: text.to_string(),
            font: StandardFont::Helvetica,
            font_size,
            color: Rgb::from_hex(color),
            opacity,
            rotation,
        }))
    }

    fn add_image_internal(
        &mut self,
        page: usize,
        x: f64,
        y: f64,
        width: f64,
        data_url: &str,
        opacity: f64,
    ) -> Result<ObjectId, PdfSuiteError> {
        let image = RasterImage::from_data_url(data_url)?;
        let zoom = self.zoom(page)?;
        let doc_width = width / zoom;
        let screen_height = image.height_for_width(doc_width) * zoom;
        let position = self.anchor_point(page, ScreenRect::new(x, y, width, screen_height))?;
        self.session.place(PlacedObject::Image(ImageMark {
            page_index: page,
            position,
            width: doc_width,
            image,
            opacity,
            rotation: 0.0,
        }))
    }

    fn select_region_internal(
        &mut self,
        page: usize,
        screen_box: ScreenRect,
        apply_to_all: bool,
    ) -> Result<RedactionRegion, PdfSuiteError> {
        let scope = if apply_to_all {
            ApplyScope::All
        } else {
            ApplyScope::Page
        };
        self.session.select_region(page, screen_box, scope)
    }

    fn commit_internal(&mut self) -> Result<(), PdfSuiteError> {
        self.bytes = self.session.commit(&self.bytes)?;
        Ok(())
    }
}
