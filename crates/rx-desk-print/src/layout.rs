//! Page layout for printed prescriptions.
//!
//! Produces positioned text runs on A4 pages; the PDF renderer only paints
//! them. Coordinates are millimetres from the bottom-left corner, matching
//! PDF user space.

use rx_desk_core::document::{PrescriptionDocument, NO_MEDICINES, PATIENT_UNAVAILABLE};

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_MM: f32 = 15.0;
pub const CONTENT_WIDTH_MM: f32 = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;

const TITLE_PT: f32 = 18.0;
const HEADING_PT: f32 = 12.0;
const BODY_PT: f32 = 10.0;
const LINE_MM: f32 = 6.0;
const SECTION_GAP_MM: f32 = 4.0;

/// Average Helvetica glyph width as a fraction of the point size.
const AVG_GLYPH_EM: f32 = 0.5;
const PT_TO_MM: f32 = 0.3528;

/// Medicine table columns: header and left offset within the content box.
const COLUMNS: [(&str, f32); 4] = [
    ("Medicine", 0.0),
    ("Dosage", 70.0),
    ("Frequency", 110.0),
    ("Duration", 150.0),
];

/// Space kept clear between adjacent table cells.
const CELL_GUTTER_MM: f32 = 2.0;

/// Characters per wrapped notes line.
const NOTES_WRAP: usize = 95;

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x_mm: f32,
    pub y_mm: f32,
    pub size_pt: f32,
    pub bold: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub runs: Vec<TextRun>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub title: String,
    pub pages: Vec<Page>,
}

/// Estimated rendered width of `text` in millimetres.
pub fn text_width_mm(text: &str, size_pt: f32) -> f32 {
    text.chars().count() as f32 * size_pt * AVG_GLYPH_EM * PT_TO_MM
}

/// Left edge that centers `text` on the page.
pub fn centered_x(text: &str, size_pt: f32) -> f32 {
    ((PAGE_WIDTH_MM - text_width_mm(text, size_pt)) / 2.0).max(MARGIN_MM)
}

/// Greedy word wrap at `max_chars`.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.len() + word.len() + 1 > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Usable width of table column `index`.
fn column_width_mm(index: usize) -> f32 {
    let start = COLUMNS[index].1;
    let end = COLUMNS
        .get(index + 1)
        .map_or(CONTENT_WIDTH_MM, |(_, offset)| *offset);
    end - start - CELL_GUTTER_MM
}

/// Wrap `text` so no line is wider than `width_mm`; overlong words are split.
pub fn fit_cell(text: &str, width_mm: f32, size_pt: f32) -> Vec<String> {
    let glyph_mm = size_pt * AVG_GLYPH_EM * PT_TO_MM;
    let max_chars = ((width_mm / glyph_mm).floor() as usize).max(1);

    let mut lines = Vec::new();
    for line in wrap_text(text, max_chars) {
        let chars: Vec<char> = line.chars().collect();
        if chars.len() <= max_chars {
            lines.push(line);
            continue;
        }
        for chunk in chars.chunks(max_chars) {
            lines.push(chunk.iter().collect());
        }
    }
    lines
}

/// Cursor that starts a new page when the next line would cross the bottom margin.
struct Cursor {
    pages: Vec<Page>,
    y: f32,
}

impl Cursor {
    fn new() -> Self {
        Self {
            pages: vec![Page::default()],
            y: PAGE_HEIGHT_MM - MARGIN_MM,
        }
    }

    fn ensure(&mut self, height: f32) {
        if self.y - height < MARGIN_MM {
            self.pages.push(Page::default());
            self.y = PAGE_HEIGHT_MM - MARGIN_MM;
        }
    }

    fn put(&mut self, text: impl Into<String>, x_mm: f32, size_pt: f32, bold: bool) {
        let y_mm = self.y - size_pt * PT_TO_MM;
        if let Some(page) = self.pages.last_mut() {
            page.runs.push(TextRun {
                text: text.into(),
                x_mm,
                y_mm,
                size_pt,
                bold,
            });
        }
    }

    fn line(&mut self, text: impl Into<String>, size_pt: f32, bold: bool) {
        self.ensure(LINE_MM);
        self.put(text, MARGIN_MM, size_pt, bold);
        self.y -= LINE_MM;
    }

    fn gap(&mut self) {
        self.y -= SECTION_GAP_MM;
    }
}

/// Lay out the whole document.
pub fn layout_document(doc: &PrescriptionDocument) -> Layout {
    let mut cursor = Cursor::new();

    let heading = "Medical Prescription";
    cursor.ensure(LINE_MM * 2.0);
    cursor.put(heading, centered_x(heading, TITLE_PT), TITLE_PT, true);
    cursor.y -= LINE_MM * 2.0;

    cursor.line("Prescription Details", HEADING_PT, true);
    cursor.line(
        format!(
            "Prescription ID: {}",
            doc.prescription_id.as_deref().unwrap_or("-")
        ),
        BODY_PT,
        false,
    );
    cursor.line(format!("Date: {}", doc.date_text()), BODY_PT, false);
    cursor.gap();

    cursor.line("Patient Information", HEADING_PT, true);
    match &doc.patient {
        Some(patient) => {
            cursor.line(format!("Name: {}", patient.name), BODY_PT, false);
            cursor.line(
                format!("Patient ID: {}", patient.patient_id.as_deref().unwrap_or("-")),
                BODY_PT,
                false,
            );
            let age = patient
                .age
                .map(|a| format!("{} years", a))
                .unwrap_or_else(|| "-".to_string());
            cursor.line(format!("Age: {}", age), BODY_PT, false);
            cursor.line(
                format!("Gender: {}", patient.gender.as_deref().unwrap_or("-")),
                BODY_PT,
                false,
            );
        }
        None => cursor.line(PATIENT_UNAVAILABLE, BODY_PT, false),
    }
    cursor.gap();

    cursor.line("Prescribed Medicines", HEADING_PT, true);
    if doc.items.is_empty() {
        cursor.line(NO_MEDICINES, BODY_PT, false);
    } else {
        table_header(&mut cursor);
        for item in &doc.items {
            let cells: Vec<Vec<String>> = [
                item.medicine.clone(),
                item.dosage.clone(),
                item.frequency.clone(),
                format!("{} days", item.duration_days),
            ]
            .iter()
            .enumerate()
            .map(|(i, cell)| fit_cell(cell, column_width_mm(i), BODY_PT))
            .collect();
            let height = cells.iter().map(Vec::len).max().unwrap_or(1) as f32 * LINE_MM;

            if cursor.y - height < MARGIN_MM {
                cursor.ensure(height);
                table_header(&mut cursor);
            }
            let top = cursor.y;
            for ((_, offset), lines) in COLUMNS.iter().zip(cells) {
                cursor.y = top;
                for line in lines {
                    cursor.put(line, MARGIN_MM + offset, BODY_PT, false);
                    cursor.y -= LINE_MM;
                }
            }
            cursor.y = top - height;
        }
    }
    cursor.gap();

    cursor.line("Notes", HEADING_PT, true);
    for line in wrap_text(doc.notes_text(), NOTES_WRAP) {
        cursor.line(line, BODY_PT, false);
    }

    cursor.gap();
    cursor.gap();
    let signature = "Doctor's Signature";
    cursor.ensure(LINE_MM * 2.0);
    let right = PAGE_WIDTH_MM - MARGIN_MM - text_width_mm(signature, BODY_PT);
    cursor.put("________________________", right - 10.0, BODY_PT, false);
    cursor.y -= LINE_MM;
    cursor.put(signature, right, BODY_PT, false);

    Layout {
        title: doc.title(),
        pages: cursor.pages,
    }
}

fn table_header(cursor: &mut Cursor) {
    cursor.ensure(LINE_MM * 2.0);
    for (label, offset) in COLUMNS {
        cursor.put(label, MARGIN_MM + offset, BODY_PT, true);
    }
    cursor.y -= LINE_MM;
}
