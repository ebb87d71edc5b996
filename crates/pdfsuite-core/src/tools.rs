//! The user-facing tools: each takes document bytes and returns new bytes
//!
//! Every tool loads a fresh [`PdfDocument`], edits it in memory and saves.
//! A failure anywhere leaves the caller's input untouched.

use crate::assembly::{merge_documents, NamedDocument};
use crate::compositor::{apply_to_pages, Placement, Positioning, DEFAULT_MARGIN};
use crate::document::PdfDocument;
use crate::error::PdfSuiteError;
use crate::fonts::StandardFont;
use crate::forms::FormField;
use crate::geometry::{DocumentPoint, DocumentRect, Size};
use crate::marks::{Anchor, ApplyScope, RedactionRegion, Rgb};
use crate::ranges::{parse_page_ranges, require_pages, TargetPages};
use crate::raster::{RasterFormat, RasterImage};
use crate::reader::{document_text_items, group_lines, TextBlock};
use crate::services::{
    DocumentMutator, Encryptor, FormIntrospection, PageMetrics, Permissions, TextStyle,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// ISO A4 in points.
pub const A4: Size = Size {
    width: 595.28,
    height: 841.89,
};

/// What a watermark stamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WatermarkContent {
    Text { text: String },
    Image { image: RasterImage },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkOptions {
    /// Hex text color.
    pub color: String,
    /// Font size for text, width in points for images.
    pub size: f64,
    pub opacity: f64,
    pub rotation: f64,
    pub position: Anchor,
    pub margin: f64,
    /// Explicit bottom-left origin; both must be set to override `position`.
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub pages: TargetPages,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            color: "#cccccc".to_string(),
            size: 50.0,
            opacity: 0.5,
            rotation: 0.0,
            position: Anchor::Center,
            margin: DEFAULT_MARGIN,
            x: None,
            y: None,
            pages: TargetPages::All,
        }
    }
}

impl WatermarkOptions {
    fn positioning(&self) -> Positioning {
        Positioning {
            anchor: self.position,
            margin: self.margin,
            origin: match (self.x, self.y) {
                (Some(x), Some(y)) => Some(DocumentPoint::new(x, y)),
                _ => None,
            },
        }
    }
}

pub fn watermark(
    bytes: &[u8],
    content: &WatermarkContent,
    options: &WatermarkOptions,
) -> Result<Vec<u8>, PdfSuiteError> {
    let mut doc = PdfDocument::load(bytes)?;
    let positioning = options.positioning();
    let placement = match content {
        WatermarkContent::Text { text } => Placement::Text {
            content: text,
            style: TextStyle {
                font: StandardFont::HelveticaBold,
                size: options.size,
                color: Rgb::from_hex(&options.color),
                opacity: options.opacity,
                rotation: options.rotation,
            },
            positioning,
        },
        WatermarkContent::Image { image } => Placement::Image {
            image,
            width: options.size,
            opacity: options.opacity,
            rotation: options.rotation,
            positioning,
        },
    };

    let edited = apply_to_pages(&mut doc, &placement, &options.pages)?;
    tracing::info!(pages = edited, "Applied watermark");
    doc.save()
}

/// Cover each region with opaque white. Regions on missing pages are ignored.
pub fn remove_watermark(
    bytes: &[u8],
    regions: &[RedactionRegion],
) -> Result<Vec<u8>, PdfSuiteError> {
    let mut doc = PdfDocument::load(bytes)?;
    let mut edited = 0;
    for region in regions {
        let target = match region.apply_to {
            ApplyScope::Page => TargetPages::single(region.page_index),
            ApplyScope::All => TargetPages::All,
        };
        edited += apply_to_pages(&mut doc, &Placement::Redaction { rect: region.rect }, &target)?;
    }
    tracing::info!(regions = regions.len(), edits = edited, "Removed watermark regions");
    doc.save()
}

/// A drawn signature, positioned in points from the page's top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignaturePlacement {
    pub page_index: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// `data:image/png;base64,...`
    pub data_url: String,
}

pub fn sign(bytes: &[u8], signatures: &[SignaturePlacement]) -> Result<Vec<u8>, PdfSuiteError> {
    let mut doc = PdfDocument::load(bytes)?;

    let mut planned = Vec::with_capacity(signatures.len());
    for signature in signatures {
        let image = RasterImage::from_data_url(&signature.data_url)?;
        if image.format() != RasterFormat::Png {
            return Err(PdfSuiteError::UnsupportedAsset(
                "Signatures must be PNG images".into(),
            ));
        }
        let page = doc.page_geometry(signature.page_index)?;
        let rect = DocumentRect::new(
            signature.x,
            page.height - signature.y - signature.height,
            signature.width,
            signature.height,
        );
        planned.push((signature.page_index, rect, image));
    }

    for (page, rect, image) in &planned {
        let handle = doc.embed_image(image)?;
        doc.draw_image(*page, *rect, handle, 1.0, 0.0)?;
        tracing::debug!(page, "Placed signature");
    }
    tracing::info!(signatures = planned.len(), "Signed document");
    doc.save()
}

/// Add each delta (degrees, multiple of 90) to the page's current rotation.
pub fn rotate(bytes: &[u8], deltas: &BTreeMap<usize, i64>) -> Result<Vec<u8>, PdfSuiteError> {
    let mut doc = PdfDocument::load(bytes)?;
    let rotated = doc.rotate_pages(deltas)?;
    tracing::info!(pages = rotated, "Rotated pages");
    doc.save()
}

/// Page size policy for [`images_to_pdf`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageFit {
    /// Each page is exactly the size of its image.
    #[default]
    Fit,
    /// A4 pages with the image centred and scaled to fit inside the margin.
    A4,
}

/// Build a document with one page per image. Unsupported images are skipped.
pub fn images_to_pdf(images: &[Vec<u8>], fit: PageFit) -> Result<Vec<u8>, PdfSuiteError> {
    let mut doc = PdfDocument::new();

    for (position, bytes) in images.iter().enumerate() {
        let image = match RasterImage::decode(bytes) {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(image = position, error = %e, "Skipping unsupported image");
                continue;
            }
        };
        let width = f64::from(image.width());
        let height = f64::from(image.height());

        let (page_size, rect) = match fit {
            PageFit::Fit => (
                Size::new(width, height),
                DocumentRect::new(0.0, 0.0, width, height),
            ),
            PageFit::A4 => {
                let scale = ((A4.width - DEFAULT_MARGIN * 2.0) / width)
                    .min((A4.height - DEFAULT_MARGIN * 2.0) / height);
                let (w, h) = (width * scale, height * scale);
                (
                    A4,
                    DocumentRect::new((A4.width - w) / 2.0, (A4.height - h) / 2.0, w, h),
                )
            }
        };

        let page = doc.add_page(page_size)?;
        let handle = doc.embed_image(&image)?;
        doc.draw_image(page, rect, handle, 1.0, 0.0)?;
    }

    if doc.page_count() == 0 {
        return Err(PdfSuiteError::UnsupportedAsset(
            "No JPEG or PNG images to convert".into(),
        ));
    }
    tracing::info!(pages = doc.page_count(), ?fit, "Converted images to PDF");
    doc.save()
}

pub fn extract_form_fields(bytes: &[u8]) -> Result<Vec<FormField>, PdfSuiteError> {
    let doc = PdfDocument::load(bytes)?;
    let fields = doc.form_fields()?;
    tracing::info!(fields = fields.len(), "Extracted form fields");
    Ok(fields)
}

/// Decrypt with `password` and save without encryption.
pub fn unprotect(bytes: &[u8], password: &str) -> Result<Vec<u8>, PdfSuiteError> {
    let mut doc = PdfDocument::unlock(bytes, password)?;
    doc.save()
}

/// Encrypt with the same user and owner password.
pub fn protect(
    bytes: &[u8],
    password: &str,
    permissions: &Permissions,
    encryptor: &dyn Encryptor,
) -> Result<Vec<u8>, PdfSuiteError> {
    let saved = PdfDocument::load(bytes)?.save()?;
    encryptor.encrypt(&saved, password, password, permissions)
}

pub fn merge(files: &[Vec<u8>]) -> Result<Vec<u8>, PdfSuiteError> {
    let documents = files
        .iter()
        .map(|bytes| PdfDocument::load(bytes))
        .collect::<Result<Vec<_>, _>>()?;
    merge_documents(documents)?.save()
}

pub fn split_all(bytes: &[u8]) -> Result<Vec<NamedDocument>, PdfSuiteError> {
    let parts = PdfDocument::load(bytes)?.split_all()?;
    tracing::info!(parts = parts.len(), "Split document");
    Ok(parts)
}

/// Keep the pages named by a range string like `"1-3, 5"`.
pub fn extract(bytes: &[u8], ranges: &str) -> Result<Vec<u8>, PdfSuiteError> {
    let doc = PdfDocument::load(bytes)?;
    let indices = require_pages(parse_page_ranges(ranges, doc.page_count()))?;
    doc.extract_pages(&indices)?.save()
}

/// Lay out text blocks as a Word document: one paragraph per line and a
/// page break for each [`TextBlock::PageBreak`].
pub fn blocks_to_docx(blocks: &[TextBlock]) -> Result<Vec<u8>, PdfSuiteError> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    docx_from_blocks(blocks)
        .build()
        .pack(&mut buffer)
        .map_err(|e| PdfSuiteError::OperationError(format!("Failed to write DOCX: {}", e)))?;
    tracing::info!(blocks = blocks.len(), size = buffer.get_ref().len(), "Wrote DOCX");
    Ok(buffer.into_inner())
}

fn docx_from_blocks(blocks: &[TextBlock]) -> docx_rs::Docx {
    blocks.iter().fold(docx_rs::Docx::new(), |docx, block| {
        let run = match block {
            TextBlock::Line(text) => docx_rs::Run::new().add_text(text.as_str()),
            TextBlock::PageBreak => docx_rs::Run::new().add_break(docx_rs::BreakType::Page),
        };
        docx.add_paragraph(docx_rs::Paragraph::new().add_run(run))
    })
}

/// Convert a document's text to DOCX, keeping its line and page structure.
pub fn pdf_to_docx(bytes: &[u8]) -> Result<Vec<u8>, PdfSuiteError> {
    let doc = PdfDocument::load(bytes)?;
    let blocks = group_lines(&document_text_items(&doc)?);
    blocks_to_docx(&blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::fixtures::{create_test_pdf, page_operators};
    use crate::geometry::Rotation;
    use crate::raster::fixtures::{png_rgb, png_rgba};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use lopdf::{Document, Object};
    use pretty_assertions::assert_eq;

    fn strings_on(doc: &Document, page: u32) -> Vec<Vec<u8>> {
        page_operators(doc, page)
            .into_iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match op.operands.into_iter().next() {
                Some(Object::String(bytes, _)) => Some(bytes),
                _ => None,
            })
            .collect()
    }

    fn last_cm(doc: &Document, page: u32) -> Vec<f32> {
        page_operators(doc, page)
            .into_iter()
            .filter(|op| op.operator == "cm")
            .last()
            .map(|op| op.operands.iter().map(|o| o.as_float().unwrap()).collect())
            .unwrap_or_default()
    }

    fn count_ops(doc: &Document, page: u32, operator: &str) -> usize {
        page_operators(doc, page)
            .iter()
            .filter(|op| op.operator == operator)
            .count()
    }

    #[test]
    fn test_watermark_every_page() {
        let input = create_test_pdf(5, "Doc");
        let content = WatermarkContent::Text {
            text: "CONFIDENTIAL".into(),
        };
        let output = watermark(&input, &content, &WatermarkOptions::default()).unwrap();

        let doc = Document::load_mem(&output).unwrap();
        assert_eq!(doc.get_pages().len(), 5);
        for page in 1..=5 {
            let strings = strings_on(&doc, page);
            assert!(strings.contains(&b"CONFIDENTIAL".to_vec()), "page {}", page);
            assert!(strings.contains(&format!("Doc Page {}", page).into_bytes()));
        }
    }

    #[test]
    fn test_watermark_selected_pages_only() {
        let input = create_test_pdf(3, "Doc");
        let content = WatermarkContent::Text { text: "DRAFT".into() };
        let options = WatermarkOptions {
            pages: TargetPages::Indices(vec![1, 7]),
            ..Default::default()
        };
        let doc = Document::load_mem(&watermark(&input, &content, &options).unwrap()).unwrap();
        assert!(!strings_on(&doc, 1).contains(&b"DRAFT".to_vec()));
        assert!(strings_on(&doc, 2).contains(&b"DRAFT".to_vec()));
        assert!(!strings_on(&doc, 3).contains(&b"DRAFT".to_vec()));
    }

    #[test]
    fn test_watermark_explicit_origin() {
        let input = create_test_pdf(1, "Doc");
        let content = WatermarkContent::Text { text: "X".into() };
        let options = WatermarkOptions {
            x: Some(33.0),
            y: Some(44.0),
            ..Default::default()
        };
        let doc = Document::load_mem(&watermark(&input, &content, &options).unwrap()).unwrap();
        let cm = last_cm(&doc, 1);
        assert_eq!((cm[4], cm[5]), (33.0, 44.0));
    }

    #[test]
    fn test_image_watermark_keeps_aspect_ratio() {
        let input = create_test_pdf(1, "Doc");
        let image = RasterImage::decode(&png_rgb(40, 20)).unwrap();
        let options = WatermarkOptions {
            size: 100.0,
            position: Anchor::BottomLeft,
            ..Default::default()
        };
        let output = watermark(&input, &WatermarkContent::Image { image }, &options).unwrap();
        let doc = Document::load_mem(&output).unwrap();
        let cm = last_cm(&doc, 1);
        assert_eq!(cm, vec![100.0, 0.0, 0.0, 50.0, 20.0, 20.0]);
    }

    #[test]
    fn test_watermark_options_from_partial_json() {
        let options: WatermarkOptions =
            serde_json::from_str(r#"{"position":"top-right","opacity":0.2}"#).unwrap();
        assert_eq!(options.position, Anchor::TopRight);
        assert_eq!(options.opacity, 0.2);
        assert_eq!(options.color, "#cccccc");
        assert_eq!(options.size, 50.0);
    }

    #[test]
    fn test_remove_watermark_ignores_missing_pages() {
        let input = create_test_pdf(2, "Doc");
        let regions = [
            RedactionRegion {
                page_index: 0,
                rect: DocumentRect::new(10.0, 10.0, 100.0, 50.0),
                apply_to: ApplyScope::Page,
            },
            RedactionRegion {
                page_index: 9,
                rect: DocumentRect::new(10.0, 10.0, 100.0, 50.0),
                apply_to: ApplyScope::Page,
            },
        ];
        let doc = Document::load_mem(&remove_watermark(&input, &regions).unwrap()).unwrap();
        assert_eq!(count_ops(&doc, 1, "f"), 1);
        assert_eq!(count_ops(&doc, 2, "f"), 0);
    }

    #[test]
    fn test_remove_watermark_all_pages() {
        let input = create_test_pdf(3, "Doc");
        let regions = [RedactionRegion {
            page_index: 0,
            rect: DocumentRect::new(0.0, 0.0, 612.0, 40.0),
            apply_to: ApplyScope::All,
        }];
        let doc = Document::load_mem(&remove_watermark(&input, &regions).unwrap()).unwrap();
        for page in 1..=3 {
            assert_eq!(count_ops(&doc, page, "f"), 1);
        }
    }

    #[test]
    fn test_sign_converts_top_left_position() {
        let input = create_test_pdf(1, "Doc");
        let signature = SignaturePlacement {
            page_index: 0,
            x: 50.0,
            y: 100.0,
            width: 120.0,
            height: 50.0,
            data_url: format!("data:image/png;base64,{}", STANDARD.encode(png_rgba(12, 5, 0))),
        };
        let doc = Document::load_mem(&sign(&input, &[signature]).unwrap()).unwrap();
        let cm = last_cm(&doc, 1);
        assert_eq!(cm, vec![120.0, 0.0, 0.0, 50.0, 50.0, 642.0]);
    }

    #[test]
    fn test_sign_rejects_missing_page() {
        let input = create_test_pdf(1, "Doc");
        let signature = SignaturePlacement {
            page_index: 3,
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            data_url: format!("data:image/png;base64,{}", STANDARD.encode(png_rgb(2, 2))),
        };
        assert!(matches!(
            sign(&input, &[signature]),
            Err(PdfSuiteError::OutOfRangeSelection)
        ));
    }

    #[test]
    fn test_rotate_tool() {
        let input = create_test_pdf(2, "Doc");
        let output = rotate(&input, &BTreeMap::from([(1, 90)])).unwrap();
        let doc = PdfDocument::load(&output).unwrap();
        assert_eq!(doc.page_geometry(0).unwrap().rotation, Rotation::Deg0);
        assert_eq!(doc.page_geometry(1).unwrap().rotation, Rotation::Deg90);
    }

    #[test]
    fn test_images_to_pdf_fit() {
        let images = vec![png_rgb(30, 10), b"not an image".to_vec(), png_rgba(5, 8, 128)];
        let output = images_to_pdf(&images, PageFit::Fit).unwrap();
        let doc = PdfDocument::load(&output).unwrap();
        assert_eq!(doc.page_count(), 2);
        let g = doc.page_geometry(0).unwrap();
        assert_eq!((g.width, g.height), (30.0, 10.0));
        let g = doc.page_geometry(1).unwrap();
        assert_eq!((g.width, g.height), (5.0, 8.0));
    }

    #[test]
    fn test_images_to_pdf_a4_centres_image() {
        let output = images_to_pdf(&[png_rgb(100, 100)], PageFit::A4).unwrap();
        let doc = PdfDocument::load(&output).unwrap();
        let g = doc.page_geometry(0).unwrap();
        assert!((g.width - A4.width).abs() < 0.01);
        assert!((g.height - A4.height).abs() < 0.01);

        let cm = last_cm(doc.as_lopdf(), 1);
        let side = (A4.width - 40.0) as f32;
        assert!((cm[0] - side).abs() < 0.01);
        assert!((cm[3] - side).abs() < 0.01);
        assert!((cm[4] - 20.0).abs() < 0.01);
        assert!((cm[5] - ((A4.height as f32 - side) / 2.0)).abs() < 0.01);
    }

    #[test]
    fn test_images_to_pdf_nothing_usable() {
        let err = images_to_pdf(&[b"GIF89a".to_vec()], PageFit::Fit).unwrap_err();
        assert!(matches!(err, PdfSuiteError::UnsupportedAsset(_)));
    }

    #[test]
    fn test_unprotect_plain_document() {
        let input = create_test_pdf(2, "Doc");
        let output = unprotect(&input, "secret").unwrap();
        assert_eq!(PdfDocument::load(&output).unwrap().page_count(), 2);
    }

    struct Reversing;

    impl Encryptor for Reversing {
        fn encrypt(
            &self,
            bytes: &[u8],
            user: &str,
            owner: &str,
            permissions: &Permissions,
        ) -> Result<Vec<u8>, PdfSuiteError> {
            assert_eq!(user, owner);
            assert_eq!(*permissions, Permissions::default());
            Ok(bytes.iter().rev().copied().collect())
        }
    }

    #[test]
    fn test_protect_delegates_to_encryptor() {
        let input = create_test_pdf(1, "Doc");
        let output = protect(&input, "pw", &Permissions::default(), &Reversing).unwrap();
        let restored: Vec<u8> = output.into_iter().rev().collect();
        assert!(restored.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_extract_by_range_string() {
        let input = create_test_pdf(3, "Doc");
        let output = extract(&input, "2").unwrap();
        let doc = Document::load_mem(&output).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        assert_eq!(strings_on(&doc, 1), vec![b"Doc Page 2".to_vec()]);

        assert!(matches!(
            extract(&input, "7-9"),
            Err(PdfSuiteError::OutOfRangeSelection)
        ));
    }

    #[test]
    fn test_merge_and_split_tools() {
        let merged = merge(&[create_test_pdf(2, "A"), create_test_pdf(1, "B")]).unwrap();
        let parts = split_all(&merged).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2].name, "page-3.pdf");
        let last = Document::load_mem(&parts[2].bytes).unwrap();
        assert_eq!(strings_on(&last, 1), vec![b"B Page 1".to_vec()]);
    }

    /// Each paragraph's text, or `None` for a page-break paragraph.
    fn paragraphs(docx: &docx_rs::Docx) -> Vec<Option<String>> {
        docx.document
            .children
            .iter()
            .filter_map(|child| match child {
                docx_rs::DocumentChild::Paragraph(p) => Some(p),
                _ => None,
            })
            .map(|p| {
                let mut text = String::new();
                let mut page_break = false;
                for child in &p.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        for run_child in &run.children {
                            match run_child {
                                docx_rs::RunChild::Text(t) => text.push_str(&t.text),
                                docx_rs::RunChild::Break(_) => page_break = true,
                                _ => {}
                            }
                        }
                    }
                }
                (!page_break).then_some(text)
            })
            .collect()
    }

    #[test]
    fn test_docx_has_paragraph_per_line_and_break_per_page() {
        let blocks = vec![
            TextBlock::Line("Title".into()),
            TextBlock::Line("Body text".into()),
            TextBlock::PageBreak,
            TextBlock::Line("Second page".into()),
        ];
        assert_eq!(
            paragraphs(&docx_from_blocks(&blocks)),
            vec![
                Some("Title".to_string()),
                Some("Body text".to_string()),
                None,
                Some("Second page".to_string()),
            ]
        );
    }

    #[test]
    fn test_blocks_to_docx_writes_zip_package() {
        let bytes = blocks_to_docx(&[TextBlock::Line("Hello".into())]).unwrap();
        assert!(bytes.starts_with(b"PK"));
        assert!(bytes
            .windows(b"word/document.xml".len())
            .any(|w| w == b"word/document.xml"));
    }

    #[test]
    fn test_pdf_to_docx_keeps_page_structure() {
        let doc = PdfDocument::load(&create_test_pdf(2, "Word")).unwrap();
        let blocks = group_lines(&document_text_items(&doc).unwrap());
        assert_eq!(
            paragraphs(&docx_from_blocks(&blocks)),
            vec![
                Some("Word Page 1".to_string()),
                None,
                Some("Word Page 2".to_string()),
            ]
        );
        assert!(pdf_to_docx(&create_test_pdf(2, "Word")).unwrap().starts_with(b"PK"));
    }
}
