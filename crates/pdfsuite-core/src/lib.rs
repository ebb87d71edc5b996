//! Client-side PDF utility suite
//!
//! The core of the crate maps on-screen positions into PDF user space
//! ([`coords`]), positions and stamps marks on selected pages
//! ([`compositor`]) and parses page-range strings ([`ranges`]). The
//! [`document`] module provides a lopdf-backed implementation of the
//! document services those modules are written against, and [`tools`]
//! builds the user-facing operations on top.
//!
//! Rendering, OCR, encryption and file export are supplied by the host
//! through the traits in [`services`].

pub mod assembly;
pub mod command;
pub mod compositor;
pub mod config;
pub mod coords;
pub mod document;
pub mod error;
pub mod fonts;
pub mod forms;
pub mod geometry;
pub mod marks;
pub mod pipeline;
pub mod ranges;
pub mod raster;
pub mod reader;
pub mod services;
pub mod session;
pub mod tools;

#[cfg(not(target_arch = "wasm32"))]
pub use command::execute;
pub use command::{execute_with_clock, PdfCommand, ProcessMetrics, ProcessResult};
pub use compositor::{apply_to_pages, compute_anchored_position, Placement, Positioning};
pub use config::SuiteConfig;
pub use coords::CoordinateMapper;
pub use document::PdfDocument;
pub use error::PdfSuiteError;
pub use geometry::{
    DisplaySize, DocumentPoint, DocumentRect, PageGeometry, Rotation, ScreenPoint, ScreenRect,
    Size, ViewportState,
};
pub use marks::{Anchor, PlacedObject, RedactionRegion, Rgb};
pub use ranges::{parse_page_ranges, TargetPages};
pub use session::EditSession;

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<usize, PdfSuiteError> {
    use services::PageMetrics;
    Ok(PdfDocument::load(bytes)?.page_count())
}
