//! Backend entity client.
//!
//! [`EntityClient`] is the single seam between the workflows and persistence.
//! [`HttpEntityClient`] talks to the REST backend; the SQLite
//! [`LocalStore`](crate::db::LocalStore) implements the same contract.

pub mod endpoints;
mod http;
#[cfg(test)]
pub(crate) mod mock;

pub use http::HttpEntityClient;

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{Medicine, Patient, Prescription};

/// Client errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("Cannot reach backend at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Backend returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Local store error: {0}")]
    Store(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Typed CRUD over patients, medicines and prescriptions.
///
/// `get_*` return `Ok(None)` for absent records; `update_*` and `delete_*`
/// report an absent record as [`ClientError::NotFound`].
pub trait EntityClient: Send + Sync {
    fn list_patients(&self) -> ClientResult<Vec<Patient>>;
    fn get_patient(&self, id: i64) -> ClientResult<Option<Patient>>;
    fn create_patient(&self, patient: &Patient) -> ClientResult<Patient>;
    fn update_patient(&self, id: i64, patient: &Patient) -> ClientResult<Patient>;
    fn delete_patient(&self, id: i64) -> ClientResult<()>;

    fn list_medicines(&self) -> ClientResult<Vec<Medicine>>;
    fn get_medicine(&self, id: i64) -> ClientResult<Option<Medicine>>;
    fn create_medicine(&self, medicine: &Medicine) -> ClientResult<Medicine>;
    fn update_medicine(&self, id: i64, medicine: &Medicine) -> ClientResult<Medicine>;
    fn delete_medicine(&self, id: i64) -> ClientResult<()>;

    fn list_prescriptions(&self) -> ClientResult<Vec<Prescription>>;
    fn get_prescription(&self, id: i64) -> ClientResult<Option<Prescription>>;
    fn create_prescription(&self, prescription: &Prescription) -> ClientResult<Prescription>;
    fn update_prescription(&self, id: i64, prescription: &Prescription)
        -> ClientResult<Prescription>;
    fn delete_prescription(&self, id: i64) -> ClientResult<()>;

    /// All prescriptions of one patient.
    fn list_prescriptions_for_patient(&self, patient_id: i64) -> ClientResult<Vec<Prescription>>;

    /// Prescriptions of one patient with visit date in `start..=end`.
    fn search_prescriptions_by_date_range(
        &self,
        patient_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ClientResult<Vec<Prescription>>;

    /// Prescriptions of one patient dated more than `years` years ago.
    fn list_prescriptions_older_than(
        &self,
        patient_id: i64,
        years: u32,
    ) -> ClientResult<Vec<Prescription>>;
}
