//! Page composition: anchored placement and application of marks to page selections
//!
//! [`apply_to_pages`] plans every draw before issuing the first one, so a
//! bad selection or an unreadable page fails before the document is touched.

use crate::error::PdfSuiteError;
use crate::fonts::StandardFont;
use crate::geometry::{DocumentPoint, DocumentRect, Size};
use crate::marks::{clamp_opacity, Anchor, PlacedObject, Rgb};
use crate::ranges::TargetPages;
use crate::raster::RasterImage;
use crate::services::{DocumentMutator, FontMetrics, TextStyle};
use serde::{Deserialize, Serialize};

/// Clearance from the page edge used by every anchor except `Center`.
pub const DEFAULT_MARGIN: f64 = 20.0;

/// Bottom-left origin for an object of `object` size on a page of `page` size.
///
/// An explicit `override_origin` wins over the anchor.
pub fn compute_anchored_position(
    object: Size,
    page: Size,
    anchor: Anchor,
    margin: f64,
    override_origin: Option<DocumentPoint>,
) -> DocumentPoint {
    if let Some(origin) = override_origin {
        return origin;
    }

    let left = margin;
    let center_x = (page.width - object.width) / 2.0;
    let right = page.width - object.width - margin;
    let bottom = margin;
    let center_y = (page.height - object.height) / 2.0;
    let top = page.height - object.height - margin;

    let (x, y) = match anchor {
        Anchor::Center => (center_x, center_y),
        Anchor::TopLeft => (left, top),
        Anchor::TopCenter => (center_x, top),
        Anchor::TopRight => (right, top),
        Anchor::LeftCenter => (left, center_y),
        Anchor::RightCenter => (right, center_y),
        Anchor::BottomLeft => (left, bottom),
        Anchor::BottomCenter => (center_x, bottom),
        Anchor::BottomRight => (right, bottom),
    };
    DocumentPoint::new(x, y)
}

/// How a placement finds its origin on each page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Positioning {
    #[serde(default)]
    pub anchor: Anchor,
    #[serde(default = "default_margin")]
    pub margin: f64,
    /// Explicit bottom-left origin in points; overrides the anchor on every page.
    #[serde(default)]
    pub origin: Option<DocumentPoint>,
}

fn default_margin() -> f64 {
    DEFAULT_MARGIN
}

impl Default for Positioning {
    fn default() -> Self {
        Self {
            anchor: Anchor::Center,
            margin: DEFAULT_MARGIN,
            origin: None,
        }
    }
}

impl Positioning {
    pub fn anchored(anchor: Anchor) -> Self {
        Self {
            anchor,
            ..Self::default()
        }
    }

    pub fn at(origin: DocumentPoint) -> Self {
        Self {
            origin: Some(origin),
            ..Self::default()
        }
    }
}

/// One mark to stamp onto every selected page.
#[derive(Debug, Clone, Copy)]
pub enum Placement<'a> {
    Text {
        content: &'a str,
        style: TextStyle,
        positioning: Positioning,
    },
    Image {
        image: &'a RasterImage,
        width: f64,
        opacity: f64,
        rotation: f64,
        positioning: Positioning,
    },
    Redaction {
        rect: DocumentRect,
    },
}

impl<'a> Placement<'a> {
    /// Placement for an object the user dropped at an exact spot.
    pub fn from_placed(object: &'a PlacedObject) -> Self {
        match object {
            PlacedObject::Text(t) => Placement::Text {
                content: &t.content,
                style: TextStyle {
                    font: t.font,
                    size: t.font_size,
                    color: t.color,
                    opacity: t.opacity,
                    rotation: t.rotation,
                },
                positioning: Positioning::at(t.position),
            },
            PlacedObject::Image(i) => Placement::Image {
                image: &i.image,
                width: i.width,
                opacity: i.opacity,
                rotation: i.rotation,
                positioning: Positioning::at(i.position),
            },
        }
    }

    /// Stamp text in the default bold watermark face.
    pub fn watermark_text(content: &'a str, size: f64, color: Rgb, opacity: f64) -> Self {
        Placement::Text {
            content,
            style: TextStyle {
                font: StandardFont::HelveticaBold,
                size,
                color,
                opacity,
                rotation: 0.0,
            },
            positioning: Positioning::default(),
        }
    }
}

/// One resolved draw call, carrying everything the document needs.
enum Draw<'a> {
    Text {
        origin: DocumentPoint,
        content: &'a str,
        style: TextStyle,
    },
    Image {
        rect: DocumentRect,
        image: &'a RasterImage,
        opacity: f64,
        rotation: f64,
    },
    Fill(DocumentRect),
}

/// Apply `placement` to every page in `target`, in ascending page order.
///
/// Indices outside the document are skipped. Returns the number of pages edited.
pub fn apply_to_pages<D>(
    document: &mut D,
    placement: &Placement<'_>,
    target: &TargetPages,
) -> Result<usize, PdfSuiteError>
where
    D: DocumentMutator + FontMetrics + ?Sized,
{
    if !document.is_available() {
        return Err(PdfSuiteError::DocumentUnavailable);
    }

    let pages = target.resolve(document.page_count());

    let mut plan = Vec::with_capacity(pages.len());
    for &index in &pages {
        let page = document.page_geometry(index)?;
        let draw = match placement {
            Placement::Text {
                content,
                style,
                positioning,
            } => {
                let metrics = document.measure_text(content, style.font, style.size);
                let origin = compute_anchored_position(
                    Size::new(metrics.width, metrics.ascent_height),
                    page.size(),
                    positioning.anchor,
                    positioning.margin,
                    positioning.origin,
                );
                Draw::Text {
                    origin,
                    content: *content,
                    style: TextStyle {
                        opacity: clamp_opacity(style.opacity),
                        ..*style
                    },
                }
            }
            Placement::Image {
                image,
                width,
                opacity,
                rotation,
                positioning,
            } => {
                let size = Size::new(*width, image.height_for_width(*width));
                let origin = compute_anchored_position(
                    size,
                    page.size(),
                    positioning.anchor,
                    positioning.margin,
                    positioning.origin,
                );
                Draw::Image {
                    rect: DocumentRect::new(origin.x, origin.y, size.width, size.height),
                    image: *image,
                    opacity: clamp_opacity(*opacity),
                    rotation: *rotation,
                }
            }
            Placement::Redaction { rect } => Draw::Fill(rect.clamp_to(&page)),
        };
        plan.push((index, draw));
    }

    let mut handle = None;
    for (index, draw) in &plan {
        match draw {
            Draw::Text {
                origin,
                content,
                style,
            } => document.draw_text(*index, *origin, content, style)?,
            Draw::Image {
                rect,
                image,
                opacity,
                rotation,
            } => {
                let embedded = match handle {
                    Some(embedded) => embedded,
                    None => *handle.insert(document.embed_image(image)?),
                };
                document.draw_image(*index, *rect, embedded, *opacity, *rotation)?;
            }
            Draw::Fill(rect) => document.draw_filled_rect(*index, *rect, Rgb::WHITE)?,
        }
        tracing::debug!(page = index, "Applied placement");
    }

    Ok(plan.len())
}
