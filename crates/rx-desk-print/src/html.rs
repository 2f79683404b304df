//! Standalone HTML print preview.

use std::fmt::Write;

use rx_desk_core::document::{PrescriptionDocument, NO_MEDICINES, PATIENT_UNAVAILABLE};

use crate::{DocumentRenderer, RenderResult, RenderedDocument};

const STYLE: &str = r#"
body { font-family: Helvetica, Arial, sans-serif; padding: 20px; }
.prescription-document { max-width: 800px; margin: 0 auto; }
table { width: 100%; border-collapse: collapse; margin-top: 12px; }
th, td { border: 1px solid #444; padding: 6px; text-align: left; }
.signature { margin-top: 48px; text-align: right; }
.signature-line { border-top: 1px solid #000; width: 200px; margin-left: auto; }
.actions { text-align: center; margin-top: 24px; }
@media print { .no-print { display: none; } }
"#;

/// Escape text for element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Print preview page with Print and Close buttons.
#[derive(Debug, Clone, Default)]
pub struct HtmlRenderer {
    /// Open the browser print dialog on load
    pub auto_print: bool,
}

impl HtmlRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_auto_print(mut self, auto_print: bool) -> Self {
        self.auto_print = auto_print;
        self
    }

    /// The document markup alone, without page chrome.
    pub fn body(&self, doc: &PrescriptionDocument) -> String {
        let mut html = String::new();
        // Writing into a String cannot fail.
        let _ = write_body(&mut html, doc);
        html
    }

    pub fn page(&self, doc: &PrescriptionDocument) -> String {
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>{}</title>\n", escape_html(&doc.title())));
        html.push_str(&format!("<style>{}</style>\n</head>\n<body>\n", STYLE));
        html.push_str(&self.body(doc));
        html.push_str(
            "<div class=\"no-print actions\">\n\
             <button onclick=\"window.print();\">Print</button>\n\
             <button onclick=\"window.close();\">Close</button>\n\
             </div>\n",
        );
        if self.auto_print {
            html.push_str(
                "<script>window.onload = function() { try { window.print(); } catch (e) {} };</script>\n",
            );
        }
        html.push_str("</body>\n</html>\n");
        html
    }
}

fn write_body(out: &mut String, doc: &PrescriptionDocument) -> std::fmt::Result {
    writeln!(out, "<div class=\"prescription-document\">")?;
    writeln!(out, "<h2>Medical Prescription</h2>")?;

    writeln!(out, "<h4>Prescription Details</h4>")?;
    writeln!(
        out,
        "<p><strong>Prescription ID:</strong> {}</p>",
        escape_html(doc.prescription_id.as_deref().unwrap_or(""))
    )?;
    writeln!(out, "<p><strong>Date:</strong> {}</p>", doc.date_text())?;

    writeln!(out, "<h4>Patient Information</h4>")?;
    match &doc.patient {
        Some(p) => {
            writeln!(out, "<p><strong>Name:</strong> {}</p>", escape_html(&p.name))?;
            writeln!(
                out,
                "<p><strong>Patient ID:</strong> {}</p>",
                escape_html(p.patient_id.as_deref().unwrap_or(""))
            )?;
            if let Some(age) = p.age {
                writeln!(out, "<p><strong>Age:</strong> {} years</p>", age)?;
            }
            writeln!(
                out,
                "<p><strong>Gender:</strong> {}</p>",
                escape_html(p.gender.as_deref().unwrap_or(""))
            )?;
        }
        None => writeln!(out, "<p>{}</p>", PATIENT_UNAVAILABLE)?,
    }

    writeln!(out, "<hr>\n<h4>Prescribed Medicines</h4>")?;
    if doc.items.is_empty() {
        writeln!(out, "<p>{}</p>", NO_MEDICINES)?;
    } else {
        writeln!(
            out,
            "<table>\n<thead><tr><th>Medicine</th><th>Dosage</th><th>Frequency</th><th>Duration</th></tr></thead>\n<tbody>"
        )?;
        for line in &doc.items {
            writeln!(
                out,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{} days</td></tr>",
                escape_html(&line.medicine),
                escape_html(&line.dosage),
                escape_html(&line.frequency),
                line.duration_days
            )?;
        }
        writeln!(out, "</tbody>\n</table>")?;
    }

    writeln!(out, "<hr>\n<h4>Notes</h4>")?;
    writeln!(out, "<p>{}</p>", escape_html(doc.notes_text()))?;
    writeln!(
        out,
        "<div class=\"signature\"><p>Doctor's Signature</p><div class=\"signature-line\"></div></div>"
    )?;
    writeln!(out, "</div>")
}

impl DocumentRenderer for HtmlRenderer {
    fn render(&self, doc: &PrescriptionDocument) -> RenderResult<RenderedDocument> {
        let page = self.page(doc);
        tracing::debug!(bytes = page.len(), "rendered print preview");
        Ok(RenderedDocument {
            file_name: doc.file_name().replace(".pdf", ".html"),
            media_type: "text/html",
            bytes: page.into_bytes(),
        })
    }
}
