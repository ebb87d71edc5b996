//! lopdf-backed document: loading, page metrics and in-memory drawing
//!
//! Every drawing call appends a self-contained content stream wrapped in
//! `q ... Q`. The page's original content is wrapped once as well, so
//! graphics state left dangling by the producer cannot leak into our marks.

use crate::error::PdfSuiteError;
use crate::fonts::{encode_win_ansi, StandardFont, TextMetrics};
use crate::forms::{extract_form_fields, FormField};
use crate::geometry::{DocumentPoint, DocumentRect, PageGeometry, Rotation, Size};
use crate::marks::Rgb;
use crate::raster::RasterImage;
use crate::services::{
    Decryptor, DocumentMutator, FontMetrics, FormIntrospection, ImageHandle, PageMetrics,
    TextStyle,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::{BTreeMap, HashMap, HashSet};

/// How far into the file the `%PDF-` marker may appear.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Depth limit when walking `/Parent` chains.
const MAX_TREE_DEPTH: usize = 64;

/// Page attributes that a page may inherit from its ancestors.
pub(crate) const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

pub struct PdfDocument {
    pub(crate) doc: Document,
    pub(crate) page_ids: Vec<ObjectId>,
    locked: bool,
    fonts: HashMap<StandardFont, ObjectId>,
    graphics_states: HashMap<u32, ObjectId>,
    images: Vec<ObjectId>,
    isolated_pages: HashSet<ObjectId>,
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("version", &self.doc.version)
            .field("pages", &self.page_ids.len())
            .field("locked", &self.locked)
            .finish()
    }
}

impl PdfDocument {
    /// An empty document with a root page tree and no pages.
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Vec::<Object>::new(),
                "Count" => 0,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        Self::from_document(doc)
    }

    pub(crate) fn from_document(doc: Document) -> Self {
        let page_ids = doc.get_pages().into_values().collect();
        Self {
            doc,
            page_ids,
            locked: false,
            fonts: HashMap::new(),
            graphics_states: HashMap::new(),
            images: Vec::new(),
            isolated_pages: HashSet::new(),
        }
    }

    /// Parse a document, leaving it locked if it needs a password.
    ///
    /// Encrypted files whose user password is empty open without prompting.
    pub fn open(bytes: &[u8]) -> Result<Self, PdfSuiteError> {
        let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
        if !window.windows(5).any(|w| w == b"%PDF-") {
            return Err(PdfSuiteError::InvalidFormat(
                "Not a valid PDF file (missing %PDF- header)".to_string(),
            ));
        }

        let doc = Document::load_mem(bytes).map_err(classify_load_error)?;
        let mut this = Self::from_document(doc);
        if this.doc.is_encrypted() {
            this.locked = this.try_decrypt("").is_err();
            tracing::debug!(locked = this.locked, "Opened encrypted document");
        }
        Ok(this)
    }

    /// Parse a document that must be usable right away.
    pub fn load(bytes: &[u8]) -> Result<Self, PdfSuiteError> {
        let this = Self::open(bytes)?;
        if this.locked {
            return Err(PdfSuiteError::PasswordRequired);
        }
        tracing::debug!(pages = this.page_ids.len(), "Loaded document");
        Ok(this)
    }

    /// Parse and decrypt with a user-supplied password.
    pub fn unlock(bytes: &[u8], password: &str) -> Result<Self, PdfSuiteError> {
        let mut this = Self::open(bytes)?;
        this.decrypt(password)?;
        Ok(this)
    }

    fn try_decrypt(&mut self, password: &str) -> Result<(), lopdf::Error> {
        self.doc.decrypt(password)?;
        self.doc.trailer.remove(b"Encrypt");
        Ok(())
    }

    pub fn version(&self) -> &str {
        &self.doc.version
    }

    pub fn as_lopdf(&self) -> &Document {
        &self.doc
    }

    /// Serialize the document with compressed streams.
    pub fn save(&mut self) -> Result<Vec<u8>, PdfSuiteError> {
        self.ensure_available()?;
        self.doc.compress();
        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| PdfSuiteError::OperationError(format!("Failed to save PDF: {}", e)))?;
        Ok(buffer)
    }

    pub(crate) fn ensure_available(&self) -> Result<(), PdfSuiteError> {
        if self.locked {
            Err(PdfSuiteError::DocumentUnavailable)
        } else {
            Ok(())
        }
    }

    pub(crate) fn page_id(&self, index: usize) -> Result<ObjectId, PdfSuiteError> {
        self.page_ids
            .get(index)
            .copied()
            .ok_or(PdfSuiteError::OutOfRangeSelection)
    }

    /// Append a blank page of the given size; returns its index.
    pub fn add_page(&mut self, size: Size) -> Result<usize, PdfSuiteError> {
        let pages_id = root_pages_id(&self.doc)?;
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), real(size.width), real(size.height)],
            "Resources" => Dictionary::new(),
        });

        let pages = self.doc.get_dictionary_mut(pages_id)?;
        let mut kids = match pages.get(b"Kids") {
            Ok(Object::Array(kids)) => kids.clone(),
            _ => Vec::new(),
        };
        kids.push(Object::Reference(page_id));
        let count = kids.len() as i64;
        pages.set("Kids", kids);
        pages.set("Count", count);

        self.page_ids.push(page_id);
        Ok(self.page_ids.len() - 1)
    }

    /// Add `delta` degrees to each listed page's rotation. Unknown pages are ignored.
    pub fn rotate_pages(&mut self, deltas: &BTreeMap<usize, i64>) -> Result<usize, PdfSuiteError> {
        self.ensure_available()?;
        let mut planned = Vec::with_capacity(deltas.len());
        for (&index, &delta) in deltas {
            if index >= self.page_ids.len() {
                tracing::debug!(index, "Ignoring rotation for missing page");
                continue;
            }
            let current = self.page_geometry(index)?.rotation;
            planned.push((index, current.then(Rotation::from_degrees(delta)?)));
        }
        for &(index, rotation) in &planned {
            self.set_page_rotation(index, rotation)?;
        }
        Ok(planned.len())
    }

    /// Plain text of one page.
    pub fn extract_text(&self, index: usize) -> Result<String, PdfSuiteError> {
        self.ensure_available()?;
        if index >= self.page_ids.len() {
            return Err(PdfSuiteError::OutOfRangeSelection);
        }
        Ok(self.doc.extract_text(&[index as u32 + 1])?)
    }

    fn font_id(&mut self, font: StandardFont) -> ObjectId {
        if let Some(&id) = self.fonts.get(&font) {
            return id;
        }
        let id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        self.fonts.insert(font, id);
        id
    }

    fn graphics_state_id(&mut self, opacity: f64) -> ObjectId {
        let key = (opacity * 1000.0).round() as u32;
        if let Some(&id) = self.graphics_states.get(&key) {
            return id;
        }
        let id = self.doc.add_object(dictionary! {
            "Type" => "ExtGState",
            "ca" => real(opacity),
            "CA" => real(opacity),
        });
        self.graphics_states.insert(key, id);
        id
    }

    /// Register `target` under `name` in the page's resource `category`.
    ///
    /// Resources are copied onto the page itself, so dictionaries shared
    /// with other pages or inherited from the tree stay untouched.
    fn add_resource(
        &mut self,
        page_id: ObjectId,
        category: &str,
        name: &str,
        target: ObjectId,
    ) -> Result<(), PdfSuiteError> {
        let mut resources = inherited_attribute(&self.doc, page_id, b"Resources")
            .map(|o| resolve(&self.doc, o).as_dict().cloned().unwrap_or_default())
            .unwrap_or_default();
        let mut entries = resources
            .get(category.as_bytes())
            .map(|o| resolve(&self.doc, o).as_dict().cloned().unwrap_or_default())
            .unwrap_or_default();
        entries.set(name, Object::Reference(target));
        resources.set(category, Object::Dictionary(entries));
        self.doc
            .get_dictionary_mut(page_id)?
            .set("Resources", Object::Dictionary(resources));
        Ok(())
    }

    /// Current content streams of a page as a flat list of references.
    fn content_refs(&self, page_id: ObjectId) -> Result<Vec<Object>, PdfSuiteError> {
        let page = self.doc.get_dictionary(page_id)?;
        Ok(match page.get(b"Contents") {
            Ok(Object::Array(items)) => items.clone(),
            Ok(Object::Reference(id)) => match self.doc.get_object(*id) {
                Ok(Object::Array(items)) => items.clone(),
                _ => vec![Object::Reference(*id)],
            },
            _ => Vec::new(),
        })
    }

    fn isolate_existing_content(&mut self, page_id: ObjectId) -> Result<(), PdfSuiteError> {
        if !self.isolated_pages.insert(page_id) {
            return Ok(());
        }
        let existing = self.content_refs(page_id)?;
        if existing.is_empty() {
            return Ok(());
        }
        let open = self.doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let close = self.doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
        let mut contents = Vec::with_capacity(existing.len() + 2);
        contents.push(Object::Reference(open));
        contents.extend(existing);
        contents.push(Object::Reference(close));
        self.doc
            .get_dictionary_mut(page_id)?
            .set("Contents", Object::Array(contents));
        Ok(())
    }

    fn append_operations(
        &mut self,
        page_id: ObjectId,
        operations: Vec<Operation>,
    ) -> Result<(), PdfSuiteError> {
        self.isolate_existing_content(page_id)?;
        let bytes = Content { operations }.encode()?;
        let stream_id = self.doc.add_object(Stream::new(Dictionary::new(), bytes));
        let mut contents = self.content_refs(page_id)?;
        contents.push(Object::Reference(stream_id));
        self.doc
            .get_dictionary_mut(page_id)?
            .set("Contents", Object::Array(contents));
        Ok(())
    }
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl PageMetrics for PdfDocument {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// MediaBox and `/Rotate` are looked up through the page tree; a page
    /// without a usable MediaBox is treated as US Letter.
    fn page_geometry(&self, index: usize) -> Result<PageGeometry, PdfSuiteError> {
        let page_id = self.page_id(index)?;

        let rotation = inherited_attribute(&self.doc, page_id, b"Rotate")
            .and_then(number)
            .map(|degrees| {
                Rotation::from_degrees(degrees as i64).unwrap_or_else(|_| {
                    tracing::warn!(page = index, degrees, "Ignoring non-right-angle /Rotate");
                    Rotation::Deg0
                })
            })
            .unwrap_or_default();

        let media_box = inherited_attribute(&self.doc, page_id, b"MediaBox")
            .and_then(|o| resolve(&self.doc, o).as_array().ok())
            .and_then(|a| parse_box(a.as_slice()));

        let geometry = match media_box {
            Some([x0, y0, x1, y1]) => PageGeometry::new((x1 - x0).abs(), (y1 - y0).abs(), rotation)
                .unwrap_or(PageGeometry {
                    rotation,
                    ..PageGeometry::letter()
                }),
            None => PageGeometry {
                rotation,
                ..PageGeometry::letter()
            },
        };
        Ok(geometry)
    }
}

impl FontMetrics for PdfDocument {
    fn measure_text(&self, text: &str, font: StandardFont, size: f64) -> TextMetrics {
        font.measure(text, size)
    }
}

impl DocumentMutator for PdfDocument {
    fn is_available(&self) -> bool {
        !self.locked
    }

    fn embed_image(&mut self, image: &RasterImage) -> Result<ImageHandle, PdfSuiteError> {
        self.ensure_available()?;
        let encoded = image.encode()?;

        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => encoded.width as i64,
            "Height" => encoded.height as i64,
            "ColorSpace" => encoded.color_space,
            "BitsPerComponent" => 8,
            "Filter" => encoded.filter,
        };
        if let Some(mask) = encoded.soft_mask {
            let mask_dict = dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => encoded.width as i64,
                "Height" => encoded.height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            };
            let mask_id = self
                .doc
                .add_object(Stream::new(mask_dict, mask).with_compression(false));
            dict.set("SMask", mask_id);
        }
        let id = self
            .doc
            .add_object(Stream::new(dict, encoded.data).with_compression(false));

        self.images.push(id);
        Ok(ImageHandle::new(self.images.len() as u32 - 1))
    }

    fn draw_text(
        &mut self,
        page: usize,
        origin: DocumentPoint,
        text: &str,
        style: &TextStyle,
    ) -> Result<(), PdfSuiteError> {
        self.ensure_available()?;
        let page_id = self.page_id(page)?;
        let font_id = self.font_id(style.font);
        let gs_id = self.graphics_state_id(style.opacity);
        let font_name = format!("PSF{}", font_id.0);
        let gs_name = format!("PSGS{}", gs_id.0);
        self.add_resource(page_id, "Font", &font_name, font_id)?;
        self.add_resource(page_id, "ExtGState", &gs_name, gs_id)?;

        let operations = vec![
            Operation::new("q", vec![]),
            Operation::new("gs", vec![Object::Name(gs_name.into_bytes())]),
            Operation::new("cm", placement_matrix(origin.x, origin.y, style.rotation, 1.0, 1.0)),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(font_name.into_bytes()), real(style.size)]),
            Operation::new("rg", color_operands(style.color)),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ];
        self.append_operations(page_id, operations)
    }

    fn draw_image(
        &mut self,
        page: usize,
        rect: DocumentRect,
        image: ImageHandle,
        opacity: f64,
        rotation: f64,
    ) -> Result<(), PdfSuiteError> {
        self.ensure_available()?;
        let page_id = self.page_id(page)?;
        let image_id = *self.images.get(image.id() as usize).ok_or_else(|| {
            PdfSuiteError::OperationError(format!("Unknown image handle {}", image.id()))
        })?;
        let gs_id = self.graphics_state_id(opacity);
        let image_name = format!("PSIm{}", image_id.0);
        let gs_name = format!("PSGS{}", gs_id.0);
        self.add_resource(page_id, "XObject", &image_name, image_id)?;
        self.add_resource(page_id, "ExtGState", &gs_name, gs_id)?;

        let operations = vec![
            Operation::new("q", vec![]),
            Operation::new("gs", vec![Object::Name(gs_name.into_bytes())]),
            Operation::new(
                "cm",
                placement_matrix(rect.x, rect.y, rotation, rect.width, rect.height),
            ),
            Operation::new("Do", vec![Object::Name(image_name.into_bytes())]),
            Operation::new("Q", vec![]),
        ];
        self.append_operations(page_id, operations)
    }

    fn draw_filled_rect(
        &mut self,
        page: usize,
        rect: DocumentRect,
        color: Rgb,
    ) -> Result<(), PdfSuiteError> {
        self.ensure_available()?;
        let page_id = self.page_id(page)?;
        let operations = vec![
            Operation::new("q", vec![]),
            Operation::new("rg", color_operands(color)),
            Operation::new(
                "re",
                vec![
                    real(rect.x),
                    real(rect.y),
                    real(rect.width),
                    real(rect.height),
                ],
            ),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ];
        self.append_operations(page_id, operations)
    }

    fn set_page_rotation(&mut self, page: usize, rotation: Rotation) -> Result<(), PdfSuiteError> {
        self.ensure_available()?;
        let page_id = self.page_id(page)?;
        self.doc
            .get_dictionary_mut(page_id)?
            .set("Rotate", rotation.degrees());
        Ok(())
    }
}

impl FormIntrospection for PdfDocument {
    fn form_fields(&self) -> Result<Vec<FormField>, PdfSuiteError> {
        extract_form_fields(&self.doc)
    }
}

impl Decryptor for PdfDocument {
    fn is_encrypted(&self) -> bool {
        self.locked
    }

    fn decrypt(&mut self, password: &str) -> Result<(), PdfSuiteError> {
        if !self.locked {
            return Ok(());
        }
        self.try_decrypt(password).map_err(|e| {
            tracing::debug!(error = %e, "Decryption failed");
            PdfSuiteError::WrongPassword
        })?;
        self.locked = false;
        Ok(())
    }
}

fn classify_load_error(e: lopdf::Error) -> PdfSuiteError {
    let message = e.to_string();
    let lower = message.to_ascii_lowercase();
    if ["encrypt", "decrypt", "password"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        PdfSuiteError::PasswordRequired
    } else {
        PdfSuiteError::InvalidFormat(message)
    }
}

pub(crate) fn root_pages_id(doc: &Document) -> Result<ObjectId, PdfSuiteError> {
    Ok(doc.catalog()?.get(b"Pages")?.as_reference()?)
}

/// Look `key` up on the page, then on each ancestor in the page tree.
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Follow one indirect reference.
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

fn parse_box(array: &[Object]) -> Option<[f64; 4]> {
    if array.len() != 4 {
        return None;
    }
    let mut out = [0.0; 4];
    for (slot, obj) in out.iter_mut().zip(array) {
        *slot = number(obj)?;
    }
    Some(out)
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn color_operands(color: Rgb) -> Vec<Object> {
    vec![real(color.r), real(color.g), real(color.b)]
}

/// Translate to `(x, y)`, rotate counter-clockwise by `degrees`, then scale.
fn placement_matrix(x: f64, y: f64, degrees: f64, sx: f64, sy: f64) -> Vec<Object> {
    let (sin, cos) = degrees.to_radians().sin_cos();
    vec![
        real(sx * cos),
        real(sx * sin),
        real(-sy * sin),
        real(sy * cos),
        real(x),
        real(y),
    ]
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::raster::fixtures::png_rgba;
    use pretty_assertions::assert_eq;

    fn shown_strings(ops: &[Operation]) -> Vec<Vec<u8>> {
        ops.iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match op.operands.first() {
                Some(Object::String(bytes, _)) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_load_rejects_non_pdf() {
        let err = PdfDocument::load(b"hello world, definitely not a pdf").unwrap_err();
        assert!(matches!(err, PdfSuiteError::InvalidFormat(_)));
    }

    #[test]
    fn test_load_rejects_truncated_pdf() {
        let err = PdfDocument::load(b"%PDF-1.7\n garbage").unwrap_err();
        assert!(matches!(
            err,
            PdfSuiteError::InvalidFormat(_) | PdfSuiteError::PasswordRequired
        ));
    }

    #[test]
    fn test_load_save_preserves_pages_and_sizes() {
        let mut doc = PdfDocument::load(&create_test_pdf(3, "Doc")).unwrap();
        assert_eq!(doc.page_count(), 3);
        let saved = doc.save().unwrap();

        let reloaded = PdfDocument::load(&saved).unwrap();
        assert_eq!(reloaded.page_count(), 3);
        for i in 0..3 {
            assert_eq!(reloaded.page_geometry(i).unwrap(), PageGeometry::letter());
        }
    }

    #[test]
    fn test_geometry_inherits_media_box_and_rotation() {
        let mut doc = PdfDocument::load(&create_test_pdf(2, "Doc")).unwrap();
        let pages_id = root_pages_id(&doc.doc).unwrap();
        doc.doc
            .get_dictionary_mut(pages_id)
            .unwrap()
            .set("Rotate", -90);
        let first = doc.page_id(0).unwrap();
        doc.doc
            .get_dictionary_mut(first)
            .unwrap()
            .set("MediaBox", vec![0.into(), 0.into(), 842.into(), 595.into()]);

        let g0 = doc.page_geometry(0).unwrap();
        assert_eq!((g0.width, g0.height, g0.rotation), (842.0, 595.0, Rotation::Deg270));
        let g1 = doc.page_geometry(1).unwrap();
        assert_eq!((g1.width, g1.height), (612.0, 792.0));
    }

    #[test]
    fn test_page_geometry_out_of_range() {
        let doc = PdfDocument::load(&create_test_pdf(1, "Doc")).unwrap();
        assert!(matches!(
            doc.page_geometry(1),
            Err(PdfSuiteError::OutOfRangeSelection)
        ));
    }

    #[test]
    fn test_draw_text_survives_save() {
        let mut doc = PdfDocument::load(&create_test_pdf(1, "Doc")).unwrap();
        let style = TextStyle {
            font: StandardFont::HelveticaBold,
            size: 50.0,
            color: Rgb::from_hex("#cccccc"),
            opacity: 0.5,
            rotation: 45.0,
        };
        doc.draw_text(0, DocumentPoint::new(100.0, 300.0), "CONFIDENTIAL", &style)
            .unwrap();
        let saved = doc.save().unwrap();

        let reloaded = Document::load_mem(&saved).unwrap();
        let ops = page_operators(&reloaded, 1);
        let strings = shown_strings(&ops);
        assert!(strings.contains(&b"Doc Page 1".to_vec()));
        assert!(strings.contains(&b"CONFIDENTIAL".to_vec()));

        // Original content is isolated and every q has its Q
        let saves = ops.iter().filter(|op| op.operator == "q").count();
        let restores = ops.iter().filter(|op| op.operator == "Q").count();
        assert_eq!(saves, restores);
        assert_eq!(ops.first().map(|op| op.operator.as_str()), Some("q"));
    }

    #[test]
    fn test_draw_text_adds_font_and_opacity_resources() {
        let mut doc = PdfDocument::load(&create_test_pdf(2, "Doc")).unwrap();
        let style = TextStyle {
            font: StandardFont::Helvetica,
            size: 12.0,
            color: Rgb::BLACK,
            opacity: 0.25,
            rotation: 0.0,
        };
        doc.draw_text(1, DocumentPoint::new(10.0, 10.0), "hi", &style)
            .unwrap();

        let page = doc.doc.get_dictionary(doc.page_id(1).unwrap()).unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
        // The inherited F1 is kept next to the new font
        assert!(fonts.has(b"F1"));
        assert_eq!(fonts.len(), 2);
        assert!(resources.get(b"ExtGState").is_ok());

        // The untouched page still inherits the shared resources
        let other = doc.doc.get_dictionary(doc.page_id(0).unwrap()).unwrap();
        assert!(other.get(b"Resources").is_err());
    }

    #[test]
    fn test_embed_and_draw_image() {
        let mut doc = PdfDocument::load(&create_test_pdf(1, "Doc")).unwrap();
        let image = RasterImage::decode(&png_rgba(4, 2, 100)).unwrap();
        let handle = doc.embed_image(&image).unwrap();
        doc.draw_image(0, DocumentRect::new(10.0, 20.0, 40.0, 20.0), handle, 1.0, 0.0)
            .unwrap();

        let saved = doc.save().unwrap();
        let reloaded = Document::load_mem(&saved).unwrap();
        let ops = page_operators(&reloaded, 1);
        assert!(ops.iter().any(|op| op.operator == "Do"));

        let has_smask = reloaded.objects.values().any(|obj| match obj {
            Object::Stream(s) => s.dict.get(b"SMask").is_ok(),
            _ => false,
        });
        assert!(has_smask);
    }

    #[test]
    fn test_unknown_image_handle_fails() {
        let mut doc = PdfDocument::load(&create_test_pdf(1, "Doc")).unwrap();
        let err = doc
            .draw_image(0, DocumentRect::default(), ImageHandle::new(7), 1.0, 0.0)
            .unwrap_err();
        assert!(matches!(err, PdfSuiteError::OperationError(_)));
    }

    #[test]
    fn test_filled_rect_is_white_fill() {
        let mut doc = PdfDocument::load(&create_test_pdf(1, "Doc")).unwrap();
        doc.draw_filled_rect(0, DocumentRect::new(1.0, 2.0, 3.0, 4.0), Rgb::WHITE)
            .unwrap();
        let ops = page_operators(&doc.doc, 1);
        let fill = ops.iter().position(|op| op.operator == "f").unwrap();
        assert_eq!(ops[fill - 1].operator, "re");
        assert_eq!(ops[fill - 2].operator, "rg");
        assert!(!ops.iter().any(|op| op.operator == "S"));
    }

    #[test]
    fn test_rotate_pages_adds_delta() {
        let mut doc = PdfDocument::load(&create_test_pdf(3, "Doc")).unwrap();
        let deltas = BTreeMap::from([(0, 90), (2, -90), (9, 90)]);
        assert_eq!(doc.rotate_pages(&deltas).unwrap(), 2);
        doc.rotate_pages(&BTreeMap::from([(0, 270)])).unwrap();

        assert_eq!(doc.page_geometry(0).unwrap().rotation, Rotation::Deg0);
        assert_eq!(doc.page_geometry(1).unwrap().rotation, Rotation::Deg0);
        assert_eq!(doc.page_geometry(2).unwrap().rotation, Rotation::Deg270);
    }

    #[test]
    fn test_rotate_rejects_odd_angles() {
        let mut doc = PdfDocument::load(&create_test_pdf(1, "Doc")).unwrap();
        let err = doc.rotate_pages(&BTreeMap::from([(0, 45)])).unwrap_err();
        assert!(matches!(err, PdfSuiteError::UnsupportedRotation(45)));
    }

    #[test]
    fn test_new_document_with_pages() {
        let mut doc = PdfDocument::new();
        assert_eq!(doc.page_count(), 0);
        doc.add_page(Size::new(300.0, 200.0)).unwrap();
        doc.add_page(Size::new(595.0, 842.0)).unwrap();
        let saved = doc.save().unwrap();

        let reloaded = PdfDocument::load(&saved).unwrap();
        assert_eq!(reloaded.page_count(), 2);
        let g = reloaded.page_geometry(0).unwrap();
        assert_eq!((g.width, g.height), (300.0, 200.0));
    }

    #[test]
    fn test_no_form_fields_in_plain_document() {
        let doc = PdfDocument::load(&create_test_pdf(1, "Doc")).unwrap();
        assert!(doc.form_fields().unwrap().is_empty());
    }

    #[test]
    fn test_unencrypted_document_is_available() {
        let mut doc = PdfDocument::load(&create_test_pdf(1, "Doc")).unwrap();
        assert!(doc.is_available());
        assert!(!Decryptor::is_encrypted(&doc));
        // Decrypting a plain document is a no-op
        doc.decrypt("anything").unwrap();
    }

    #[test]
    fn test_placement_matrix_rotation() {
        let m = placement_matrix(5.0, 6.0, 90.0, 2.0, 3.0);
        let values: Vec<f32> = m
            .iter()
            .map(|o| match o {
                Object::Real(r) => *r,
                _ => f32::NAN,
            })
            .collect();
        assert!(values[0].abs() < 1e-6);
        assert!((values[1] - 2.0).abs() < 1e-6);
        assert!((values[2] + 3.0).abs() < 1e-6);
        assert!(values[3].abs() < 1e-6);
        assert_eq!((values[4], values[5]), (5.0, 6.0));
    }
}
