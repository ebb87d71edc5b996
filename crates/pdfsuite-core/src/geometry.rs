//! Geometry primitives shared by the mapper and the compositor
//!
//! Two coordinate spaces are in play:
//! - Screen space: pixels, origin at the top-left of the rendered page, Y down.
//! - Document space: points (1/72 inch), origin at the bottom-left, Y up.

use crate::error::PdfSuiteError;
use serde::{Deserialize, Serialize};

/// Right-angle rotation, clockwise, as stored in a page's `/Rotate` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Build from any multiple of 90, normalizing negative and >= 360 values.
    pub fn from_degrees(degrees: i64) -> Result<Self, PdfSuiteError> {
        match degrees.rem_euclid(360) {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            _ => Err(PdfSuiteError::UnsupportedRotation(degrees)),
        }
    }

    pub fn degrees(self) -> i64 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    fn quarter_turns(self) -> u8 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 1,
            Rotation::Deg180 => 2,
            Rotation::Deg270 => 3,
        }
    }

    /// Apply `other` after `self`.
    pub fn then(self, other: Rotation) -> Rotation {
        match (self.quarter_turns() + other.quarter_turns()) % 4 {
            0 => Rotation::Deg0,
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            _ => Rotation::Deg270,
        }
    }

    /// True for 90 and 270, where displayed width and height swap.
    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

impl TryFrom<i64> for Rotation {
    type Error = PdfSuiteError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Rotation::from_degrees(value)
    }
}

impl From<Rotation> for i64 {
    fn from(r: Rotation) -> Self {
        r.degrees()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Intrinsic page size in points plus its stored rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotation: Rotation,
}

impl PageGeometry {
    pub fn new(width: f64, height: f64, rotation: Rotation) -> Result<Self, PdfSuiteError> {
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(PdfSuiteError::InvalidFormat(format!(
                "Page size must be positive, got {}x{}",
                width, height
            )));
        }
        Ok(Self {
            width,
            height,
            rotation,
        })
    }

    /// US Letter, the fallback when a page carries no usable MediaBox.
    pub fn letter() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
            rotation: Rotation::Deg0,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Size at which a rendered page surface is currently shown, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplaySize {
    pub width: f64,
    pub height: f64,
}

impl DisplaySize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// A surface that has not been laid out yet reports a zero size.
    pub fn is_rendered(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// On-screen rendering context for one page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub width: f64,
    pub height: f64,
    pub zoom: f64,
    #[serde(default)]
    pub rotation: Rotation,
}

impl ViewportState {
    /// Derive the viewport for a page rendered at `zoom` with an extra visual rotation.
    pub fn from_geometry(geometry: &PageGeometry, zoom: f64, display_rotation: Rotation) -> Self {
        let effective = geometry.rotation.then(display_rotation);
        let (w, h) = if effective.is_quarter_turn() {
            (geometry.height, geometry.width)
        } else {
            (geometry.width, geometry.height)
        };
        Self {
            width: w * zoom,
            height: h * zoom,
            zoom,
            rotation: display_rotation,
        }
    }

    pub fn displayed_size(&self) -> DisplaySize {
        DisplaySize::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Screen rectangle; `(x, y)` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentPoint {
    pub x: f64,
    pub y: f64,
}

impl DocumentPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn clamp_to(self, geometry: &PageGeometry) -> Self {
        Self {
            x: self.x.clamp(0.0, geometry.width),
            y: self.y.clamp(0.0, geometry.height),
        }
    }
}

/// Document rectangle; `(x, y)` is the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DocumentRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn origin(&self) -> DocumentPoint {
        DocumentPoint::new(self.x, self.y)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    /// Whether the rectangle lies inside the page bounds.
    pub fn fits_within(&self, geometry: &PageGeometry) -> bool {
        const EPS: f64 = 1e-9;
        self.x >= -EPS
            && self.y >= -EPS
            && self.right() <= geometry.width + EPS
            && self.top() <= geometry.height + EPS
    }

    /// Clip the rectangle to the page bounds; a rectangle fully outside collapses to zero size.
    pub fn clamp_to(&self, geometry: &PageGeometry) -> Self {
        let x0 = self.x.clamp(0.0, geometry.width);
        let y0 = self.y.clamp(0.0, geometry.height);
        let x1 = self.right().clamp(0.0, geometry.width);
        let y1 = self.top().clamp(0.0, geometry.height);
        Self {
            x: x0,
            y: y0,
            width: (x1 - x0).max(0.0),
            height: (y1 - y0).max(0.0),
        }
    }
}
