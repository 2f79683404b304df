//! Prescription document renderers.
//!
//! Turns a finished [`PrescriptionDocument`] into a print preview page or a
//! downloadable A4 PDF. Renderers never fetch anything; load the document
//! with [`PrescriptionDocument::load`] first.

pub mod html;
pub mod layout;
#[cfg(feature = "pdf")]
pub mod pdf;

pub use html::HtmlRenderer;
#[cfg(feature = "pdf")]
pub use pdf::PdfRenderer;

use rx_desk_core::document::PrescriptionDocument;
use thiserror::Error;

/// Rendering errors.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Rendered output ready to be written or served.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub file_name: String,
    pub media_type: &'static str,
    pub bytes: Vec<u8>,
}

pub trait DocumentRenderer {
    fn render(&self, doc: &PrescriptionDocument) -> RenderResult<RenderedDocument>;
}

/// The view model itself as pretty JSON, for shells that lay out their own page.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl DocumentRenderer for JsonRenderer {
    fn render(&self, doc: &PrescriptionDocument) -> RenderResult<RenderedDocument> {
        Ok(RenderedDocument {
            file_name: doc.file_name().replace(".pdf", ".json"),
            media_type: "application/json",
            bytes: serde_json::to_vec_pretty(doc)?,
        })
    }
}
