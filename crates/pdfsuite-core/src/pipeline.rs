//! Multi-page pipelines over a host page renderer
//!
//! Pages are processed strictly one after another. The cancellation token is
//! checked before each page and progress is reported after each page.

use crate::document::PdfDocument;
use crate::error::PdfSuiteError;
use crate::geometry::{DocumentRect, Size};
use crate::raster::RasterImage;
use crate::services::{
    DocumentMutator, PageRenderer, RasterSurface, RenderRequest, TextRecognizer,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Render scale used for recognition and image export.
pub const DETAIL_SCALE: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageProgress {
    pub completed: usize,
    pub total: usize,
}

impl PageProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrOptions {
    pub language: String,
    pub scale: f64,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            scale: DETAIL_SCALE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    Low,
    #[default]
    Medium,
    High,
}

/// JPEG quality and render scale for one compression pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionSettings {
    pub quality: f64,
    pub scale: f64,
}

impl CompressionLevel {
    pub fn settings(self) -> CompressionSettings {
        let (quality, scale) = match self {
            CompressionLevel::Low => (0.8, 1.5),
            CompressionLevel::Medium => (0.6, 1.0),
            CompressionLevel::High => (0.4, 0.8),
        };
        CompressionSettings { quality, scale }
    }
}

impl From<CompressionLevel> for CompressionSettings {
    fn from(level: CompressionLevel) -> Self {
        level.settings()
    }
}

fn check_cancelled(cancel: &CancellationToken, page: usize) -> Result<(), PdfSuiteError> {
    if cancel.is_cancelled() {
        tracing::info!(page, "Pipeline cancelled");
        return Err(PdfSuiteError::Cancelled);
    }
    Ok(())
}

/// Recognize the text of every page, labelled `--- Page N ---`.
pub async fn ocr_document<R, T, P>(
    renderer: &R,
    recognizer: &T,
    page_count: usize,
    options: &OcrOptions,
    cancel: &CancellationToken,
    mut progress: P,
) -> Result<String, PdfSuiteError>
where
    R: PageRenderer + ?Sized,
    T: TextRecognizer + ?Sized,
    P: FnMut(PageProgress),
{
    let mut combined = String::new();
    for index in 0..page_count {
        check_cancelled(cancel, index)?;
        let surface = renderer
            .render(index, RenderRequest::png(options.scale))
            .await?;
        let recognition = recognizer.recognize(&surface, &options.language).await?;
        tracing::debug!(page = index, confidence = recognition.confidence, "Recognized page");

        combined.push_str(&format!(
            "--- Page {} ---\n\n{}\n\n",
            index + 1,
            recognition.text
        ));
        progress(PageProgress {
            completed: index + 1,
            total: page_count,
        });
    }
    Ok(combined)
}

/// Rebuild the document from JPEG renders of each page.
///
/// Pages keep their size in points; only the content is rasterized.
pub async fn compress_document<R, P>(
    renderer: &R,
    page_count: usize,
    settings: impl Into<CompressionSettings>,
    cancel: &CancellationToken,
    mut progress: P,
) -> Result<Vec<u8>, PdfSuiteError>
where
    R: PageRenderer + ?Sized,
    P: FnMut(PageProgress),
{
    let settings = settings.into();
    if !(settings.scale > 0.0 && settings.scale.is_finite()) {
        return Err(PdfSuiteError::Config(format!(
            "Compression scale must be positive, got {}",
            settings.scale
        )));
    }
    if page_count == 0 {
        return Err(PdfSuiteError::OperationError(
            "Document has no pages".into(),
        ));
    }

    let mut output = PdfDocument::new();
    for index in 0..page_count {
        check_cancelled(cancel, index)?;
        let surface = renderer
            .render(index, RenderRequest::jpeg(settings.scale, settings.quality))
            .await?;
        let image = RasterImage::decode(&surface.bytes)?;

        let size = Size::new(
            f64::from(surface.width_px) / settings.scale,
            f64::from(surface.height_px) / settings.scale,
        );
        let page = output.add_page(size)?;
        let handle = output.embed_image(&image)?;
        output.draw_image(
            page,
            DocumentRect::new(0.0, 0.0, size.width, size.height),
            handle,
            1.0,
            0.0,
        )?;
        tracing::debug!(page = index, bytes = surface.bytes.len(), "Compressed page");

        progress(PageProgress {
            completed: index + 1,
            total: page_count,
        });
    }

    let bytes = output.save()?;
    tracing::info!(pages = page_count, bytes = bytes.len(), "Compressed document");
    Ok(bytes)
}

/// PNG renders of every page at [`DETAIL_SCALE`].
pub async fn render_pages_to_images<R, P>(
    renderer: &R,
    page_count: usize,
    cancel: &CancellationToken,
    mut progress: P,
) -> Result<Vec<RasterSurface>, PdfSuiteError>
where
    R: PageRenderer + ?Sized,
    P: FnMut(PageProgress),
{
    let mut surfaces = Vec::with_capacity(page_count);
    for index in 0..page_count {
        check_cancelled(cancel, index)?;
        surfaces.push(renderer.render(index, RenderRequest::png(DETAIL_SCALE)).await?);
        progress(PageProgress {
            completed: index + 1,
            total: page_count,
        });
    }
    Ok(surfaces)
}
