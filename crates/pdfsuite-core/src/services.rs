//! Seams to the collaborators the tools depend on
//!
//! [`crate::document::PdfDocument`] implements the document-side traits.
//! Rendering, recognition, encryption and export belong to the host.

use crate::error::PdfSuiteError;
use crate::fonts::{StandardFont, TextMetrics};
use crate::forms::FormField;
use crate::geometry::{DocumentPoint, DocumentRect, PageGeometry, Rotation};
use crate::marks::Rgb;
use crate::raster::RasterImage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub trait PageMetrics {
    fn page_count(&self) -> usize;

    /// Geometry of the 0-based page `index`.
    fn page_geometry(&self, index: usize) -> Result<PageGeometry, PdfSuiteError>;
}

pub trait FontMetrics {
    fn measure_text(&self, text: &str, font: StandardFont, size: f64) -> TextMetrics;
}

/// Opaque reference to an image already embedded in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHandle(u32);

impl ImageHandle {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn id(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font: StandardFont,
    pub size: f64,
    pub color: Rgb,
    pub opacity: f64,
    /// Counter-clockwise degrees about the text origin.
    pub rotation: f64,
}

/// In-memory page editing. Nothing is persisted until the document is saved.
pub trait DocumentMutator: PageMetrics {
    /// False for documents that are still encrypted or failed to load.
    fn is_available(&self) -> bool;

    fn embed_image(&mut self, image: &RasterImage) -> Result<ImageHandle, PdfSuiteError>;

    /// Draw text with its baseline starting at `origin`.
    fn draw_text(
        &mut self,
        page: usize,
        origin: DocumentPoint,
        text: &str,
        style: &TextStyle,
    ) -> Result<(), PdfSuiteError>;

    fn draw_image(
        &mut self,
        page: usize,
        rect: DocumentRect,
        image: ImageHandle,
        opacity: f64,
        rotation: f64,
    ) -> Result<(), PdfSuiteError>;

    /// Opaque fill with no border.
    fn draw_filled_rect(
        &mut self,
        page: usize,
        rect: DocumentRect,
        color: Rgb,
    ) -> Result<(), PdfSuiteError>;

    fn set_page_rotation(&mut self, page: usize, rotation: Rotation) -> Result<(), PdfSuiteError>;
}

pub trait FormIntrospection {
    fn form_fields(&self) -> Result<Vec<FormField>, PdfSuiteError>;
}

pub trait Decryptor {
    fn is_encrypted(&self) -> bool;

    /// Remove encryption in place. A bad password yields `WrongPassword`.
    fn decrypt(&mut self, password: &str) -> Result<(), PdfSuiteError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrintPermission {
    None,
    LowResolution,
    HighResolution,
}

/// What a reader may do with an encrypted document without the owner password.
///
/// The default allows high resolution printing and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Permissions {
    pub printing: PrintPermission,
    pub modifying: bool,
    pub copying: bool,
    pub annotating: bool,
    pub filling_forms: bool,
    pub content_accessibility: bool,
    pub document_assembly: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            printing: PrintPermission::HighResolution,
            modifying: false,
            copying: false,
            annotating: false,
            filling_forms: false,
            content_accessibility: false,
            document_assembly: false,
        }
    }
}

impl Permissions {
    /// The signed `/P` entry of the encryption dictionary.
    pub fn to_p_value(&self) -> i32 {
        // Bits 7-8 and 13-32 are reserved and must be set
        let mut bits: u32 = 0xFFFF_F0C0;
        let flags = [
            (self.printing != PrintPermission::None, 1 << 2),
            (self.modifying, 1 << 3),
            (self.copying, 1 << 4),
            (self.annotating, 1 << 5),
            (self.filling_forms, 1 << 8),
            (self.content_accessibility, 1 << 9),
            (self.document_assembly, 1 << 10),
            (self.printing == PrintPermission::HighResolution, 1 << 11),
        ];
        for (allowed, bit) in flags {
            if allowed {
                bits |= bit;
            }
        }
        bits as i32
    }
}

pub trait Encryptor {
    fn encrypt(
        &self,
        bytes: &[u8],
        user_password: &str,
        owner_password: &str,
        permissions: &Permissions,
    ) -> Result<Vec<u8>, PdfSuiteError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceFormat {
    #[default]
    Png,
    Jpeg,
}

impl SurfaceFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            SurfaceFormat::Png => "image/png",
            SurfaceFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            SurfaceFormat::Png => "png",
            SurfaceFormat::Jpeg => "jpg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub scale: f64,
    pub format: SurfaceFormat,
    /// JPEG quality in `(0, 1]`; ignored for PNG.
    pub quality: f64,
}

impl RenderRequest {
    pub fn png(scale: f64) -> Self {
        Self {
            scale,
            format: SurfaceFormat::Png,
            quality: 1.0,
        }
    }

    pub fn jpeg(scale: f64, quality: f64) -> Self {
        Self {
            scale,
            format: SurfaceFormat::Jpeg,
            quality,
        }
    }
}

/// An encoded raster of one rendered page.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterSurface {
    pub width_px: u32,
    pub height_px: u32,
    pub format: SurfaceFormat,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
    pub text: String,
    pub confidence: f64,
}

#[async_trait(?Send)]
pub trait PageRenderer {
    async fn render(
        &self,
        page_index: usize,
        request: RenderRequest,
    ) -> Result<RasterSurface, PdfSuiteError>;
}

#[async_trait(?Send)]
pub trait TextRecognizer {
    async fn recognize(
        &self,
        image: &RasterSurface,
        language: &str,
    ) -> Result<Recognition, PdfSuiteError>;
}

/// Hands a finished artifact to the user (download, file write).
pub trait Exporter {
    fn export(&mut self, name: &str, bytes: &[u8], mime_type: &str) -> Result<(), PdfSuiteError>;
}
