//! Patient and medicine form save/load.

use thiserror::Error;

use crate::client::{ClientError, EntityClient};
use crate::deriver::{PatientDeriver, SaveMode};
use crate::models::{Medicine, Patient};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormError {
    #[error("{0}")]
    Validation(String),

    #[error("Failed to fetch {0} data")]
    Fetch(&'static str),

    #[error("{0} not found: {1}")]
    NotFound(&'static str, i64),

    #[error("Failed to save {0}")]
    Save(&'static str, #[source] ClientError),
}

pub type FormResult<T> = Result<T, FormError>;

/// Load a patient for editing.
pub fn load_patient(client: &dyn EntityClient, id: i64) -> FormResult<Patient> {
    client
        .get_patient(id)
        .map_err(|e| fetch_failed("patient", e))?
        .ok_or(FormError::NotFound("Patient", id))
}

/// Load a medicine for editing.
pub fn load_medicine(client: &dyn EntityClient, id: i64) -> FormResult<Medicine> {
    client
        .get_medicine(id)
        .map_err(|e| fetch_failed("medicine", e))?
        .ok_or(FormError::NotFound("Medicine", id))
}

/// Derive age and patient id, then create or update.
///
/// A patient with a system id is updated; otherwise it is created. Updates
/// keep the patient id already on record, whatever the form sends.
pub fn save_patient(
    client: &dyn EntityClient,
    deriver: &PatientDeriver,
    mut patient: Patient,
) -> FormResult<Patient> {
    if patient.first_name.trim().is_empty() || patient.last_name.trim().is_empty() {
        return Err(FormError::Validation(
            "First name and last name are required".into(),
        ));
    }

    let mode = match patient.id {
        Some(id) => {
            let stored = load_patient(client, id)?;
            if stored.patient_id.is_some() {
                patient.patient_id = stored.patient_id;
            }
            SaveMode::Update
        }
        None => SaveMode::Create,
    };
    deriver.derive(&mut patient, mode);

    let result = match patient.id {
        Some(id) => client.update_patient(id, &patient),
        None => client.create_patient(&patient),
    };
    result
        .map(|saved| {
            tracing::info!(id = ?saved.id, patient_id = ?saved.patient_id, "patient saved");
            saved
        })
        .map_err(|e| save_failed("patient", e))
}

pub fn save_medicine(client: &dyn EntityClient, medicine: Medicine) -> FormResult<Medicine> {
    if medicine.name.trim().is_empty() {
        return Err(FormError::Validation("Medicine name is required".into()));
    }

    let result = match medicine.id {
        Some(id) => client.update_medicine(id, &medicine),
        None => client.create_medicine(&medicine),
    };
    result
        .map(|saved| {
            tracing::info!(id = ?saved.id, name = %saved.name, "medicine saved");
            saved
        })
        .map_err(|e| save_failed("medicine", e))
}

fn fetch_failed(kind: &'static str, e: ClientError) -> FormError {
    tracing::warn!(error = %e, kind, "form load failed");
    FormError::Fetch(kind)
}

fn save_failed(kind: &'static str, e: ClientError) -> FormError {
    tracing::warn!(error = %e, kind, "form save failed");
    FormError::Save(kind, e)
}
