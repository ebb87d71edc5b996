//! Page-level information extraction

use pdfsuite_core::services::PageMetrics;
use pdfsuite_core::{PageGeometry, PdfDocument, PdfSuiteError};
use serde::Serialize;

/// Information about a single PDF page
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Page number (1-indexed)
    pub page_num: u32,
    /// Page width in points (1 point = 1/72 inch)
    pub width: f64,
    /// Page height in points
    pub height: f64,
    /// Page rotation in degrees (0, 90, 180, 270)
    pub rotation: i64,
    /// Orientation as displayed, after rotation
    pub orientation: PageOrientation,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub enum PageOrientation {
    Portrait,
    Landscape,
    Square,
}

impl PageInfo {
    pub fn from_geometry(page_num: u32, geometry: &PageGeometry) -> Self {
        let (shown_width, shown_height) = if geometry.rotation.is_quarter_turn() {
            (geometry.height, geometry.width)
        } else {
            (geometry.width, geometry.height)
        };

        let orientation = if (shown_width - shown_height).abs() < 1.0 {
            PageOrientation::Square
        } else if shown_width > shown_height {
            PageOrientation::Landscape
        } else {
            PageOrientation::Portrait
        };

        Self {
            page_num,
            width: geometry.width,
            height: geometry.height,
            rotation: geometry.rotation.degrees(),
            orientation,
        }
    }

    /// Extract page info for a 1-indexed page
    pub fn from_document(doc: &PdfDocument, page_num: u32) -> Result<Self, PdfSuiteError> {
        let index = (page_num as usize)
            .checked_sub(1)
            .ok_or(PdfSuiteError::OutOfRangeSelection)?;
        Ok(Self::from_geometry(page_num, &doc.page_geometry(index)?))
    }

    pub fn all_from_document(doc: &PdfDocument) -> Result<Vec<Self>, PdfSuiteError> {
        (1..=doc.page_count() as u32)
            .map(|page_num| Self::from_document(doc, page_num))
            .collect()
    }
}
