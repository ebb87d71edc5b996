//! Coordinate transformation between screen and PDF coordinate systems
//!
//! Screen space has a top-left origin in pixels; document space has a
//! bottom-left origin in points. The free functions handle an upright page.
//! [`CoordinateMapper`] additionally accounts for the page's stored rotation
//! combined with any visual rotation applied by the viewer.

use crate::error::PdfSuiteError;
use crate::geometry::{
    DisplaySize, DocumentPoint, DocumentRect, PageGeometry, Rotation, ScreenPoint, ScreenRect,
};

fn ratios(displayed: DisplaySize, page: &PageGeometry) -> Result<(f64, f64), PdfSuiteError> {
    if !displayed.is_rendered() {
        return Err(PdfSuiteError::NotRendered);
    }
    Ok((page.width / displayed.width, page.height / displayed.height))
}

/// Convert a screen point (top-left origin, pixels) to document coordinates (bottom-left origin, points)
pub fn forward(
    point: ScreenPoint,
    displayed: DisplaySize,
    page: &PageGeometry,
) -> Result<DocumentPoint, PdfSuiteError> {
    let (ratio_x, ratio_y) = ratios(displayed, page)?;
    Ok(DocumentPoint {
        x: point.x * ratio_x,
        y: page.height - point.y * ratio_y,
    })
}

/// Convert document coordinates back to a screen point
pub fn inverse(
    point: DocumentPoint,
    displayed: DisplaySize,
    page: &PageGeometry,
) -> Result<ScreenPoint, PdfSuiteError> {
    let (ratio_x, ratio_y) = ratios(displayed, page)?;
    Ok(ScreenPoint {
        x: point.x / ratio_x,
        y: displayed.height - point.y / ratio_y,
    })
}

/// Map the top-left of an object whose pivot is its bottom-left corner.
///
/// The screen Y fed to the flip is the object's bottom edge, so the
/// resulting document Y sits at the object's visual base.
pub fn forward_anchored(
    top_left: ScreenPoint,
    object_screen_height: f64,
    displayed: DisplaySize,
    page: &PageGeometry,
) -> Result<DocumentPoint, PdfSuiteError> {
    forward(
        ScreenPoint::new(top_left.x, top_left.y + object_screen_height),
        displayed,
        page,
    )
}

/// Convert a screen rectangle into a document rectangle anchored at its bottom-left corner
pub fn forward_rect(
    rect: ScreenRect,
    displayed: DisplaySize,
    page: &PageGeometry,
) -> Result<DocumentRect, PdfSuiteError> {
    let (ratio_x, ratio_y) = ratios(displayed, page)?;
    let origin = forward_anchored(ScreenPoint::new(rect.x, rect.y), rect.height, displayed, page)?;
    Ok(DocumentRect {
        x: origin.x,
        y: origin.y,
        width: rect.width * ratio_x,
        height: rect.height * ratio_y,
    })
}

/// Convert a document rectangle back into a screen rectangle
pub fn inverse_rect(
    rect: DocumentRect,
    displayed: DisplaySize,
    page: &PageGeometry,
) -> Result<ScreenRect, PdfSuiteError> {
    let (ratio_x, ratio_y) = ratios(displayed, page)?;
    // The document top edge becomes the screen top edge
    let top_left = inverse(DocumentPoint::new(rect.x, rect.top()), displayed, page)?;
    Ok(ScreenRect {
        x: top_left.x,
        y: top_left.y,
        width: rect.width / ratio_x,
        height: rect.height / ratio_y,
    })
}

/// Mapper for a page shown with a (possibly) rotated surface.
///
/// The effective rotation is the page's stored `/Rotate` followed by the
/// viewer's display rotation, applied as one transform.
#[derive(Debug, Clone, Copy)]
pub struct CoordinateMapper {
    page: PageGeometry,
    displayed: DisplaySize,
    rotation: Rotation,
}

impl CoordinateMapper {
    pub fn new(
        page: PageGeometry,
        displayed: DisplaySize,
        display_rotation: Rotation,
    ) -> Result<Self, PdfSuiteError> {
        if !displayed.is_rendered() {
            return Err(PdfSuiteError::NotRendered);
        }
        Ok(Self {
            page,
            displayed,
            rotation: page.rotation.then(display_rotation),
        })
    }

    pub fn effective_rotation(&self) -> Rotation {
        self.rotation
    }

    /// Display size of the surface before rotation was applied.
    fn upright_size(&self) -> DisplaySize {
        if self.rotation.is_quarter_turn() {
            DisplaySize::new(self.displayed.height, self.displayed.width)
        } else {
            self.displayed
        }
    }

    /// Undo the clockwise display rotation.
    fn unrotate(&self, p: ScreenPoint) -> ScreenPoint {
        let (w, h) = (self.displayed.width, self.displayed.height);
        match self.rotation {
            Rotation::Deg0 => p,
            Rotation::Deg90 => ScreenPoint::new(p.y, w - p.x),
            Rotation::Deg180 => ScreenPoint::new(w - p.x, h - p.y),
            Rotation::Deg270 => ScreenPoint::new(h - p.y, p.x),
        }
    }

    fn rotate(&self, p: ScreenPoint) -> ScreenPoint {
        let (w, h) = (self.displayed.width, self.displayed.height);
        match self.rotation {
            Rotation::Deg0 => p,
            Rotation::Deg90 => ScreenPoint::new(w - p.y, p.x),
            Rotation::Deg180 => ScreenPoint::new(w - p.x, h - p.y),
            Rotation::Deg270 => ScreenPoint::new(p.y, h - p.x),
        }
    }

    pub fn to_document(&self, point: ScreenPoint) -> Result<DocumentPoint, PdfSuiteError> {
        forward(self.unrotate(point), self.upright_size(), &self.page)
    }

    pub fn to_screen(&self, point: DocumentPoint) -> Result<ScreenPoint, PdfSuiteError> {
        let upright = inverse(point, self.upright_size(), &self.page)?;
        Ok(self.rotate(upright))
    }

    /// Map both corners and take their bounding box, which is exact for right-angle rotations.
    pub fn rect_to_document(&self, rect: ScreenRect) -> Result<DocumentRect, PdfSuiteError> {
        let a = self.to_document(ScreenPoint::new(rect.x, rect.y))?;
        let b = self.to_document(ScreenPoint::new(rect.x + rect.width, rect.y + rect.height))?;
        Ok(DocumentRect {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        })
    }

    pub fn rect_to_screen(&self, rect: DocumentRect) -> Result<ScreenRect, PdfSuiteError> {
        let a = self.to_screen(rect.origin())?;
        let b = self.to_screen(DocumentPoint::new(rect.right(), rect.top()))?;
        Ok(ScreenRect {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letter() -> PageGeometry {
        PageGeometry::letter()
    }

    #[test]
    fn test_forward_center() {
        let p = forward(
            ScreenPoint::new(300.0, 396.0),
            DisplaySize::new(600.0, 792.0),
            &letter(),
        )
        .unwrap();
        assert!((p.x - 306.0).abs() < 0.1);
        assert!((p.y - 396.0).abs() < 0.1);
    }

    #[test]
    fn test_corners() {
        let displayed = DisplaySize::new(600.0, 800.0);

        // Top-left screen (0, 0) should map to top-left PDF (0, 792)
        let p = forward(ScreenPoint::new(0.0, 0.0), displayed, &letter()).unwrap();
        assert!((p.x - 0.0).abs() < 0.1);
        assert!((p.y - 792.0).abs() < 0.1);

        // Bottom-right screen should map to bottom-right PDF
        let p = forward(ScreenPoint::new(600.0, 800.0), displayed, &letter()).unwrap();
        assert!((p.x - 612.0).abs() < 0.1);
        assert!((p.y - 0.0).abs() < 0.1);
    }

    #[test]
    fn test_y_axis_flip() {
        let p = inverse(
            DocumentPoint::new(0.0, 100.0),
            DisplaySize::new(612.0, 792.0),
            &letter(),
        )
        .unwrap();
        assert_eq!(p.y, 692.0);
    }

    #[test]
    fn test_zero_display_size_is_not_rendered() {
        let err = forward(ScreenPoint::new(1.0, 1.0), DisplaySize::new(0.0, 0.0), &letter());
        assert!(matches!(err, Err(PdfSuiteError::NotRendered)));
        let err = inverse(DocumentPoint::new(1.0, 1.0), DisplaySize::new(10.0, 0.0), &letter());
        assert!(matches!(err, Err(PdfSuiteError::NotRendered)));
        let err = CoordinateMapper::new(letter(), DisplaySize::new(0.0, 10.0), Rotation::Deg0);
        assert!(matches!(err, Err(PdfSuiteError::NotRendered)));
    }

    #[test]
    fn test_forward_anchored_uses_bottom_edge() {
        // Page displayed at 2x: an object 40px tall at y=100px has its base at 140px
        let displayed = DisplaySize::new(1224.0, 1584.0);
        let p = forward_anchored(ScreenPoint::new(100.0, 100.0), 40.0, displayed, &letter()).unwrap();
        assert!((p.x - 50.0).abs() < 1e-9);
        assert!((p.y - (792.0 - 70.0)).abs() < 1e-9);
    }

    #[test]
    fn test_forward_rect_matches_redaction_mapping() {
        // pdfY = pageHeight - (y * ratioY) - (h * ratioY)
        let displayed = DisplaySize::new(306.0, 396.0);
        let rect = forward_rect(ScreenRect::new(10.0, 20.0, 200.0, 100.0), displayed, &letter()).unwrap();
        assert!((rect.x - 20.0).abs() < 1e-9);
        assert!((rect.y - (792.0 - 40.0 - 200.0)).abs() < 1e-9);
        assert!((rect.width - 400.0).abs() < 1e-9);
        assert!((rect.height - 200.0).abs() < 1e-9);

        let back = inverse_rect(rect, displayed, &letter()).unwrap();
        assert!((back.x - 10.0).abs() < 1e-9);
        assert!((back.y - 20.0).abs() < 1e-9);
        assert!((back.width - 200.0).abs() < 1e-9);
        assert!((back.height - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_mapper_unrotated_matches_free_functions() {
        let displayed = DisplaySize::new(918.0, 1188.0);
        let mapper = CoordinateMapper::new(letter(), displayed, Rotation::Deg0).unwrap();
        let p = ScreenPoint::new(123.0, 456.0);
        assert_eq!(
            mapper.to_document(p).unwrap(),
            forward(p, displayed, &letter()).unwrap()
        );
    }

    #[test]
    fn test_mapper_quarter_turn_corners() {
        // Letter rotated 90 clockwise is shown 792 wide, 612 tall.
        // The PDF top-left corner (0, 792) lands at the screen top-right.
        let displayed = DisplaySize::new(792.0, 612.0);
        let mapper = CoordinateMapper::new(letter(), displayed, Rotation::Deg90).unwrap();

        let p = mapper.to_document(ScreenPoint::new(792.0, 0.0)).unwrap();
        assert!((p.x - 0.0).abs() < 1e-9);
        assert!((p.y - 792.0).abs() < 1e-9);

        // Screen top-left is the PDF bottom-left
        let p = mapper.to_document(ScreenPoint::new(0.0, 0.0)).unwrap();
        assert!((p.x - 0.0).abs() < 1e-9);
        assert!((p.y - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_mapper_stored_rotation_cancelled_by_display() {
        let page = PageGeometry::new(612.0, 792.0, Rotation::Deg270).unwrap();
        let displayed = DisplaySize::new(612.0, 792.0);
        let mapper = CoordinateMapper::new(page, displayed, Rotation::Deg90).unwrap();
        assert_eq!(mapper.effective_rotation(), Rotation::Deg0);
        let p = mapper.to_document(ScreenPoint::new(0.0, 0.0)).unwrap();
        assert!((p.y - 792.0).abs() < 1e-9);
    }

    #[test]
    fn test_mapper_rect_half_turn() {
        let displayed = DisplaySize::new(612.0, 792.0);
        let mapper = CoordinateMapper::new(letter(), displayed, Rotation::Deg180).unwrap();
        // Under a half turn the screen top-left shows the PDF bottom-right corner
        let rect = mapper
            .rect_to_document(ScreenRect::new(0.0, 0.0, 100.0, 50.0))
            .unwrap();
        assert!((rect.x - 512.0).abs() < 1e-9);
        assert!((rect.y - 0.0).abs() < 1e-9);
        assert!((rect.width - 100.0).abs() < 1e-9);
        assert!((rect.height - 50.0).abs() < 1e-9);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    // Strategy for valid positive dimensions
    fn dimension() -> impl Strategy<Value = f64> {
        1.0f64..2000.0
    }

    fn percentage() -> impl Strategy<Value = f64> {
        0.0f64..=1.0
    }

    fn rotation() -> impl Strategy<Value = Rotation> {
        prop_oneof![
            Just(Rotation::Deg0),
            Just(Rotation::Deg90),
            Just(Rotation::Deg180),
            Just(Rotation::Deg270),
        ]
    }

    proptest! {
        /// Property: screen -> document -> screen returns the original point
        #[test]
        fn roundtrip_screen_document_screen(
            container_w in dimension(),
            container_h in dimension(),
            pdf_w in dimension(),
            pdf_h in dimension(),
            x_pct in percentage(),
            y_pct in percentage(),
        ) {
            let page = PageGeometry::new(pdf_w, pdf_h, Rotation::Deg0).unwrap();
            let displayed = DisplaySize::new(container_w, container_h);
            let p = ScreenPoint::new(x_pct * container_w, y_pct * container_h);

            let doc = forward(p, displayed, &page).unwrap();
            let back = inverse(doc, displayed, &page).unwrap();

            let tolerance = 0.0001;
            prop_assert!((back.x - p.x).abs() < tolerance, "X roundtrip: {} -> {} -> {}", p.x, doc.x, back.x);
            prop_assert!((back.y - p.y).abs() < tolerance, "Y roundtrip: {} -> {} -> {}", p.y, doc.y, back.y);
        }

        /// Property: document -> screen -> document returns the original point
        #[test]
        fn roundtrip_document_screen_document(
            container_w in dimension(),
            container_h in dimension(),
            pdf_w in dimension(),
            pdf_h in dimension(),
            x_pct in percentage(),
            y_pct in percentage(),
        ) {
            let page = PageGeometry::new(pdf_w, pdf_h, Rotation::Deg0).unwrap();
            let displayed = DisplaySize::new(container_w, container_h);
            let d = DocumentPoint::new(x_pct * pdf_w, y_pct * pdf_h);

            let s = inverse(d, displayed, &page).unwrap();
            let back = forward(s, displayed, &page).unwrap();

            let tolerance = 0.0001;
            prop_assert!((back.x - d.x).abs() < tolerance);
            prop_assert!((back.y - d.y).abs() < tolerance);
        }

        /// Property: moving down on screen moves down in the document
        #[test]
        fn y_axis_movement_direction(
            container_w in dimension(),
            container_h in dimension(),
            pdf_w in dimension(),
            pdf_h in dimension(),
            y1_pct in 0.0f64..0.5,
        ) {
            let page = PageGeometry::new(pdf_w, pdf_h, Rotation::Deg0).unwrap();
            let displayed = DisplaySize::new(container_w, container_h);
            let a = forward(ScreenPoint::new(0.0, y1_pct * container_h), displayed, &page).unwrap();
            let b = forward(ScreenPoint::new(0.0, (y1_pct + 0.1) * container_h), displayed, &page).unwrap();
            prop_assert!(b.y < a.y);
        }

        /// Property: the rotated mapper round-trips for every right angle
        #[test]
        fn rotated_mapper_roundtrip(
            pdf_w in dimension(),
            pdf_h in dimension(),
            zoom in 0.25f64..4.0,
            stored in rotation(),
            display in rotation(),
            x_pct in percentage(),
            y_pct in percentage(),
        ) {
            let page = PageGeometry::new(pdf_w, pdf_h, stored).unwrap();
            let viewport = crate::geometry::ViewportState::from_geometry(&page, zoom, display);
            let mapper = CoordinateMapper::new(page, viewport.displayed_size(), display).unwrap();

            let p = ScreenPoint::new(x_pct * viewport.width, y_pct * viewport.height);
            let doc = mapper.to_document(p).unwrap();
            let back = mapper.to_screen(doc).unwrap();

            let tolerance = 0.0001;
            prop_assert!((back.x - p.x).abs() < tolerance, "X: {} -> {:?} -> {}", p.x, doc, back.x);
            prop_assert!((back.y - p.y).abs() < tolerance, "Y: {} -> {:?} -> {}", p.y, doc, back.y);
            prop_assert!(doc.x >= -tolerance && doc.x <= pdf_w + tolerance);
            prop_assert!(doc.y >= -tolerance && doc.y <= pdf_h + tolerance);
        }
    }
}
