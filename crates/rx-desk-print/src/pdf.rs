//! PDF download via `printpdf`.

use std::io::BufWriter;

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference};
use rx_desk_core::document::PrescriptionDocument;

use crate::layout::{layout_document, Layout, PAGE_HEIGHT_MM, PAGE_WIDTH_MM};
use crate::{DocumentRenderer, RenderError, RenderResult, RenderedDocument};

/// A4 portrait PDF painted from [`layout_document`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRenderer;

impl PdfRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Paint a computed layout. Returns PDF bytes.
    pub fn paint(&self, layout: &Layout) -> RenderResult<Vec<u8>> {
        let (doc, page1, layer1) = PdfDocument::new(
            &layout.title,
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "Layer 1",
        );
        let font = builtin_font(&doc, BuiltinFont::Helvetica)?;
        let bold = builtin_font(&doc, BuiltinFont::HelveticaBold)?;

        let mut layers = vec![doc.get_page(page1).get_layer(layer1)];
        for index in 1..layout.pages.len() {
            let (page, layer) = doc.add_page(
                Mm(PAGE_WIDTH_MM),
                Mm(PAGE_HEIGHT_MM),
                format!("Page {} Layer 1", index + 1),
            );
            layers.push(doc.get_page(page).get_layer(layer));
        }

        for (page, layer) in layout.pages.iter().zip(&layers) {
            for run in &page.runs {
                let face = if run.bold { &bold } else { &font };
                layer.use_text(&run.text, run.size_pt, Mm(run.x_mm), Mm(run.y_mm), face);
            }
        }

        let mut buf = BufWriter::new(Vec::new());
        doc.save(&mut buf)
            .map_err(|e| RenderError::Pdf(format!("PDF save error: {e}")))?;
        buf.into_inner()
            .map_err(|e| RenderError::Pdf(format!("PDF buffer error: {e}")))
    }
}

fn builtin_font(doc: &PdfDocumentReference, font: BuiltinFont) -> RenderResult<IndirectFontRef> {
    doc.add_builtin_font(font)
        .map_err(|e| RenderError::Pdf(format!("PDF font error: {e}")))
}

impl DocumentRenderer for PdfRenderer {
    fn render(&self, doc: &PrescriptionDocument) -> RenderResult<RenderedDocument> {
        let layout = layout_document(doc);
        let bytes = self.paint(&layout)?;
        tracing::debug!(pages = layout.pages.len(), bytes = bytes.len(), "rendered PDF");
        Ok(RenderedDocument {
            file_name: doc.file_name(),
            media_type: "application/pdf",
            bytes,
        })
    }
}
