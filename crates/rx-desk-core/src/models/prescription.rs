//! Prescription models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A prescription with its ordered line items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    /// System-assigned id - absent until created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Human-facing identifier, assigned by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescription_id: Option<String>,
    /// Patient system id
    pub patient_id: i64,
    #[serde(default, alias = "prescriptionDate", with = "super::dates::optional")]
    pub visit_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Line items in entry order
    #[serde(default, alias = "medicineItems")]
    pub prescription_items: Vec<PrescriptionItem>,
}

/// One medicine entry within a prescription.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionItem {
    pub medicine_id: i64,
    /// Medicine name captured when the item was added; never re-resolved
    #[serde(default)]
    pub medicine_name: String,
    pub dosage: String,
    pub frequency: String,
    /// Duration in days
    pub duration: i64,
}

impl Prescription {
    /// Create a new, unsaved prescription for a patient.
    pub fn new(patient_id: i64, visit_date: Option<NaiveDate>) -> Self {
        Self {
            id: None,
            prescription_id: None,
            patient_id,
            visit_date,
            notes: None,
            prescription_items: Vec::new(),
        }
    }

    /// Whether any line item references the given medicine.
    pub fn references_medicine(&self, medicine_id: i64) -> bool {
        self.prescription_items
            .iter()
            .any(|item| item.medicine_id == medicine_id)
    }
}

impl PrescriptionItem {
    /// Label for display and print: the captured name, or the id if none was captured.
    pub fn display_name(&self) -> String {
        if self.medicine_name.trim().is_empty() {
            self.medicine_id.to_string()
        } else {
            self.medicine_name.clone()
        }
    }
}
