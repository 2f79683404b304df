//! Printable prescription view model.
//!
//! [`PrescriptionDocument`] is everything a renderer needs; renderers never
//! touch the client.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::client::{ClientError, EntityClient};
use crate::models::{Patient, Prescription};

pub const PATIENT_UNAVAILABLE: &str = "Patient information not available";
pub const NO_NOTES: &str = "No additional notes";
pub const NO_MEDICINES: &str = "No medicines prescribed";

/// Document loader errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    #[error("Prescription not found: {0}")]
    NotFound(i64),

    #[error("Failed to load prescription: {0}")]
    Fetch(#[from] ClientError),
}

pub type DocumentResult<T> = Result<T, DocumentError>;

/// Patient block printed in the document header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientSummary {
    pub name: String,
    pub patient_id: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
}

impl From<&Patient> for PatientSummary {
    fn from(p: &Patient) -> Self {
        Self {
            name: p.full_name(),
            patient_id: p.patient_id.clone(),
            age: p.age,
            gender: p.gender.clone(),
        }
    }
}

/// One row of the medicine table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentLine {
    pub medicine: String,
    pub dosage: String,
    pub frequency: String,
    pub duration_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrescriptionDocument {
    pub prescription_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub patient: Option<PatientSummary>,
    pub items: Vec<DocumentLine>,
}

impl PrescriptionDocument {
    pub fn build(prescription: &Prescription, patient: Option<&Patient>) -> Self {
        let notes = prescription
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        Self {
            prescription_id: prescription.prescription_id.clone(),
            date: prescription.visit_date,
            notes,
            patient: patient.map(PatientSummary::from),
            items: prescription
                .prescription_items
                .iter()
                .map(|item| DocumentLine {
                    medicine: item.display_name(),
                    dosage: item.dosage.clone(),
                    frequency: item.frequency.clone(),
                    duration_days: item.duration,
                })
                .collect(),
        }
    }

    /// Fetch the prescription, then its patient.
    ///
    /// A missing patient leaves the patient block unavailable rather than
    /// failing the whole document.
    pub fn load(client: &dyn EntityClient, id: i64) -> DocumentResult<Self> {
        let prescription = client
            .get_prescription(id)?
            .ok_or(DocumentError::NotFound(id))?;

        let patient = match client.get_patient(prescription.patient_id) {
            Ok(patient) => patient,
            Err(e) => {
                tracing::warn!(
                    patient_id = prescription.patient_id,
                    error = %e,
                    "patient lookup failed for prescription document"
                );
                None
            }
        };

        Ok(Self::build(&prescription, patient.as_ref()))
    }

    pub fn notes_text(&self) -> &str {
        self.notes.as_deref().unwrap_or(NO_NOTES)
    }

    /// "YYYY-MM-DD", or empty when the visit date is unknown.
    pub fn date_text(&self) -> String {
        self.date
            .map(crate::models::dates::to_form_date)
            .unwrap_or_default()
    }

    pub fn title(&self) -> String {
        match &self.prescription_id {
            Some(id) => format!("Prescription {}", id),
            None => "Prescription".to_string(),
        }
    }

    /// Download name: `Prescription-<id>.pdf`.
    pub fn file_name(&self) -> String {
        format!(
            "Prescription-{}.pdf",
            self.prescription_id.as_deref().unwrap_or("download")
        )
    }
}
