//! Patient models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A registered patient as exchanged with the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// System-assigned id - absent until created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Human-facing identifier (e.g. "P123456"), generated once at creation
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Free text: "Male", "Female", "Other"
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default, with = "super::dates::optional")]
    pub date_of_birth: Option<NaiveDate>,
    /// Age in whole years, derived from date of birth at save time
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl Patient {
    /// Create a new, unsaved patient with required fields.
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            ..Default::default()
        }
    }

    /// "First Last", trimmed.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Case-insensitive match against name, patient id and contact number.
    ///
    /// An empty query matches every patient.
    pub fn matches_query(&self, query: &str) -> bool {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return true;
        }
        let contains = |value: &str| value.to_lowercase().contains(&q);
        contains(&self.full_name())
            || self.patient_id.as_deref().is_some_and(contains)
            || self.contact_number.as_deref().is_some_and(contains)
    }
}
