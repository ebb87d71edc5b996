//! Placed objects: the text and image marks a user drops on pages, plus redaction regions

use crate::coords::CoordinateMapper;
use crate::error::PdfSuiteError;
use crate::fonts::StandardFont;
use crate::geometry::{DocumentPoint, DocumentRect, ScreenRect};
use crate::raster::RasterImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// RGB color with 0-1 components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Parse "#rrggbb" or "rrggbb". Malformed input falls back to black.
    pub fn from_hex(color: &str) -> Self {
        let hex = color.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Self::BLACK;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match (channel(0), channel(2), channel(4)) {
            (Some(r), Some(g), Some(b)) => Self::new(
                f64::from(r) / 255.0,
                f64::from(g) / 255.0,
                f64::from(b) / 255.0,
            ),
            _ => Self::BLACK,
        }
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Where on the page an object is pinned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    #[default]
    Center,
    TopLeft,
    TopCenter,
    TopRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
    LeftCenter,
    RightCenter,
}

impl Anchor {
    pub const ALL: [Anchor; 9] = [
        Anchor::Center,
        Anchor::TopLeft,
        Anchor::TopCenter,
        Anchor::TopRight,
        Anchor::BottomLeft,
        Anchor::BottomCenter,
        Anchor::BottomRight,
        Anchor::LeftCenter,
        Anchor::RightCenter,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Anchor::Center => "center",
            Anchor::TopLeft => "top-left",
            Anchor::TopCenter => "top-center",
            Anchor::TopRight => "top-right",
            Anchor::BottomLeft => "bottom-left",
            Anchor::BottomCenter => "bottom-center",
            Anchor::BottomRight => "bottom-right",
            Anchor::LeftCenter => "left-center",
            Anchor::RightCenter => "right-center",
        }
    }

    /// Lenient lookup: unknown names resolve to [`Anchor::Center`].
    pub fn parse_lenient(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }
}

impl FromStr for Anchor {
    type Err = PdfSuiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Anchor::ALL
            .into_iter()
            .find(|a| a.as_str() == name)
            .ok_or_else(|| PdfSuiteError::Config(format!("Unknown anchor '{}'", s)))
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_opacity() -> f64 {
    1.0
}

/// Text placed on a page. `position` is the bottom-left of the text box in points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMark {
    pub page_index: usize,
    pub position: DocumentPoint,
    pub content: String,
    #[serde(default)]
    pub font: StandardFont,
    pub font_size: f64,
    #[serde(default)]
    pub color: Rgb,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default)]
    pub rotation: f64,
}

/// Image placed on a page. Height always follows the image's aspect ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMark {
    pub page_index: usize,
    pub position: DocumentPoint,
    pub width: f64,
    pub image: RasterImage,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default)]
    pub rotation: f64,
}

impl ImageMark {
    pub fn height(&self) -> f64 {
        self.image.height_for_width(self.width)
    }

    pub fn rect(&self) -> DocumentRect {
        DocumentRect::new(self.position.x, self.position.y, self.width, self.height())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PlacedObject {
    Text(TextMark),
    Image(ImageMark),
}

impl PlacedObject {
    pub fn page_index(&self) -> usize {
        match self {
            PlacedObject::Text(t) => t.page_index,
            PlacedObject::Image(i) => i.page_index,
        }
    }

    /// Opacity clamped into `[0, 1]`.
    pub fn opacity(&self) -> f64 {
        let raw = match self {
            PlacedObject::Text(t) => t.opacity,
            PlacedObject::Image(i) => i.opacity,
        };
        clamp_opacity(raw)
    }
}

pub fn clamp_opacity(opacity: f64) -> f64 {
    if opacity.is_nan() {
        1.0
    } else {
        opacity.clamp(0.0, 1.0)
    }
}

/// Scope of a redaction box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyScope {
    #[default]
    Page,
    All,
}

/// A rectangle to be covered with opaque white.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RedactionRegion {
    pub page_index: usize,
    pub rect: DocumentRect,
    #[serde(default)]
    pub apply_to: ApplyScope,
}

impl RedactionRegion {
    /// Map an on-screen selection box into a redaction region.
    ///
    /// The box's bottom edge becomes the region's origin, so the white fill
    /// covers exactly what the user framed.
    pub fn from_screen_box(
        page_index: usize,
        screen_box: ScreenRect,
        mapper: &CoordinateMapper,
        apply_to: ApplyScope,
    ) -> Result<Self, PdfSuiteError> {
        Ok(Self {
            page_index,
            rect: mapper.rect_to_document(screen_box)?,
            apply_to,
        })
    }
}
