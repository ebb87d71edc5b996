//! Serializable editing state for one open document
//!
//! The session owns everything the UI needs to map pointer positions and
//! commit edits: page geometry, per-page viewports, the placed objects in
//! z-order and the redaction box being drawn.

use crate::compositor::{apply_to_pages, Placement};
use crate::coords::CoordinateMapper;
use crate::document::PdfDocument;
use crate::error::PdfSuiteError;
use crate::geometry::{DocumentPoint, PageGeometry, Rotation, ScreenPoint, ScreenRect, ViewportState};
use crate::marks::{ApplyScope, PlacedObject, RedactionRegion};
use crate::ranges::TargetPages;
use crate::services::PageMetrics;
use serde::{Deserialize, Serialize};

pub type ObjectId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionObject {
    pub id: ObjectId,
    pub object: PlacedObject,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditSession {
    document_name: String,
    pages: Vec<PageGeometry>,
    viewports: Vec<Option<ViewportState>>,
    next_id: ObjectId,
    objects: Vec<SessionObject>,
    active_region: Option<RedactionRegion>,
    processing: bool,
}

impl EditSession {
    pub fn new(document_name: &str, pages: Vec<PageGeometry>) -> Self {
        Self {
            document_name: document_name.to_string(),
            viewports: vec![None; pages.len()],
            pages,
            ..Self::default()
        }
    }

    /// Start a session for a document, reading its page geometry.
    pub fn open(document_name: &str, bytes: &[u8]) -> Result<Self, PdfSuiteError> {
        let doc = PdfDocument::load(bytes)?;
        let pages = (0..doc.page_count())
            .map(|i| doc.page_geometry(i))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(name = document_name, pages = pages.len(), "Opened edit session");
        Ok(Self::new(document_name, pages))
    }

    pub fn document_name(&self) -> &str {
        &self.document_name
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_geometry(&self, page: usize) -> Result<PageGeometry, PdfSuiteError> {
        self.pages
            .get(page)
            .copied()
            .ok_or(PdfSuiteError::OutOfRangeSelection)
    }

    /// Record how a page is currently shown.
    pub fn set_viewport(
        &mut self,
        page: usize,
        zoom: f64,
        display_rotation: Rotation,
    ) -> Result<ViewportState, PdfSuiteError> {
        let geometry = self.page_geometry(page)?;
        let viewport = ViewportState::from_geometry(&geometry, zoom, display_rotation);
        if self.viewports.len() < self.pages.len() {
            self.viewports.resize(self.pages.len(), None);
        }
        self.viewports[page] = Some(viewport);
        Ok(viewport)
    }

    pub fn viewport(&self, page: usize) -> Option<&ViewportState> {
        self.viewports.get(page).and_then(Option::as_ref)
    }

    /// Mapper for a page. Pages that have never been shown yield `NotRendered`.
    pub fn mapper(&self, page: usize) -> Result<CoordinateMapper, PdfSuiteError> {
        let geometry = self.page_geometry(page)?;
        let viewport = self.viewport(page).ok_or(PdfSuiteError::NotRendered)?;
        CoordinateMapper::new(geometry, viewport.displayed_size(), viewport.rotation)
    }

    pub fn screen_to_document(
        &self,
        page: usize,
        point: ScreenPoint,
    ) -> Result<DocumentPoint, PdfSuiteError> {
        self.mapper(page)?.to_document(point)
    }

    /// Add an object on top of the others; returns its id.
    pub fn place(&mut self, object: PlacedObject) -> Result<ObjectId, PdfSuiteError> {
        self.ensure_idle()?;
        self.page_geometry(object.page_index())?;
        let id = self.next_id;
        self.next_id += 1;
        self.objects.push(SessionObject { id, object });
        Ok(id)
    }

    pub fn remove(&mut self, id: ObjectId) -> bool {
        match self.objects.iter().position(|o| o.id == id) {
            Some(pos) => {
                self.objects.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Placed objects in z-order, bottom first.
    pub fn objects(&self) -> &[SessionObject] {
        &self.objects
    }

    pub fn objects_for_page(&self, page: usize) -> Vec<&SessionObject> {
        self.objects
            .iter()
            .filter(|o| o.object.page_index() == page)
            .collect()
    }

    /// Set the redaction box from a selection drawn on screen.
    pub fn select_region(
        &mut self,
        page: usize,
        screen_box: ScreenRect,
        scope: ApplyScope,
    ) -> Result<RedactionRegion, PdfSuiteError> {
        self.ensure_idle()?;
        let region = RedactionRegion::from_screen_box(page, screen_box, &self.mapper(page)?, scope)?;
        self.active_region = Some(region);
        Ok(region)
    }

    pub fn active_region(&self) -> Option<&RedactionRegion> {
        self.active_region.as_ref()
    }

    pub fn clear_region(&mut self) {
        self.active_region = None;
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// Mark the session busy. Fails if another operation is running.
    pub fn begin(&mut self) -> Result<(), PdfSuiteError> {
        self.ensure_idle()?;
        self.processing = true;
        Ok(())
    }

    pub fn finish(&mut self) {
        self.processing = false;
    }

    /// Apply every placed object and the active redaction to `bytes`.
    ///
    /// On success the objects and region are consumed; on failure they are
    /// kept so the user can retry.
    pub fn commit(&mut self, bytes: &[u8]) -> Result<Vec<u8>, PdfSuiteError> {
        self.begin()?;
        let result = self.render_edits(bytes);
        self.finish();

        if result.is_ok() {
            tracing::info!(
                name = %self.document_name,
                objects = self.objects.len(),
                "Committed edits"
            );
            self.objects.clear();
            self.active_region = None;
        }
        result
    }

    fn render_edits(&self, bytes: &[u8]) -> Result<Vec<u8>, PdfSuiteError> {
        let mut doc = PdfDocument::load(bytes)?;
        if doc.page_count() != self.pages.len() {
            return Err(PdfSuiteError::OperationError(format!(
                "Document has {} pages but the session expects {}",
                doc.page_count(),
                self.pages.len()
            )));
        }

        for entry in &self.objects {
            let target = TargetPages::single(entry.object.page_index());
            apply_to_pages(&mut doc, &Placement::from_placed(&entry.object), &target)?;
        }
        if let Some(region) = &self.active_region {
            let target = match region.apply_to {
                ApplyScope::Page => TargetPages::single(region.page_index),
                ApplyScope::All => TargetPages::All,
            };
            apply_to_pages(&mut doc, &Placement::Redaction { rect: region.rect }, &target)?;
        }
        doc.save()
    }

    pub fn to_json(&self) -> Result<String, PdfSuiteError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PdfSuiteError> {
        Ok(serde_json::from_str(json)?)
    }

    fn ensure_idle(&self) -> Result<(), PdfSuiteError> {
        if self.processing {
            Err(PdfSuiteError::Busy)
        } else {
            Ok(())
        }
    }
}
