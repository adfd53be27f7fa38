//! Documents module - rendering of PDF reports, commercial offers and
//! Excel workbooks.
//!
//! - `report` - paginated report with sections, images and page footers
//! - `offer` - commercial offer on company letterhead with an optional appendix
//! - `spreadsheet` - multi-sheet `.xlsx` workbook from JSON rows
//!
//! PDF rendering is synchronous; callers fetch images first and run the
//! generators on a blocking thread.

pub mod canvas;
pub mod common;
pub mod metrics;
pub mod offer;
pub mod report;
pub mod spreadsheet;

pub use offer::{Offer, OfferGenerator};
pub use report::{ReportContent, ReportGenerator, ReportJob, ReportSection};
pub use spreadsheet::{build_workbook, parse_sheets, workbook_filename, SheetSpec, SpreadsheetError};

use thiserror::Error;

/// Errors that can occur during document generation.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("PDF generation failed: {0}")]
    Pdf(String),
    #[error("{0}")]
    Spreadsheet(#[from] SpreadsheetError),
}

/// Result of a successful document generation.
#[derive(Debug)]
pub struct GeneratedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl GeneratedDocument {
    pub fn size(&self) -> String {
        common::format_kib(self.bytes.len())
    }
}

/// Outcome of fetching the image attached to a section.
#[derive(Debug, Clone)]
pub enum SectionImage {
    None,
    Loaded(Vec<u8>),
    Failed(String),
}

/// Checks a request before anything is rendered.
pub trait Validator {
    fn validate(&self) -> Result<(), String>;
}

/// Renders a request into a document.
pub trait Generator<Req> {
    fn generate(&self, request: Req) -> Result<GeneratedDocument, DocumentError>;
}
