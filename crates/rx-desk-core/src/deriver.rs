//! Derived patient fields.
//!
//! Runs right before a patient is persisted: recomputes the age from the date
//! of birth and, for new records, synthesizes the human-facing patient id.

use chrono::{Datelike, NaiveDate};

use crate::clock::{system_clock, SharedClock};
use crate::models::Patient;

/// Prefix of generated patient ids.
pub const DEFAULT_PATIENT_ID_PREFIX: &str = "P";

/// Number of low-order timestamp digits kept in a generated id.
const PATIENT_ID_DIGITS: usize = 6;

/// Whether the record is being created or edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    Create,
    Update,
}

/// Age in whole years on `today`.
///
/// The year difference is decremented while this year's birthday is still
/// ahead. Birth dates in the future yield 0.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> u32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age.max(0) as u32
}

/// `prefix` followed by the last six decimal digits of the timestamp.
pub fn generate_patient_id(prefix: &str, timestamp_millis: i64) -> String {
    let modulus = 10_i64.pow(PATIENT_ID_DIGITS as u32);
    format!(
        "{}{:0width$}",
        prefix,
        timestamp_millis.rem_euclid(modulus),
        width = PATIENT_ID_DIGITS
    )
}

/// Applies derived fields to patients before save.
#[derive(Clone)]
pub struct PatientDeriver {
    clock: SharedClock,
    prefix: String,
}

impl Default for PatientDeriver {
    fn default() -> Self {
        Self::new(system_clock(), DEFAULT_PATIENT_ID_PREFIX)
    }
}

impl PatientDeriver {
    pub fn new(clock: SharedClock, prefix: impl Into<String>) -> Self {
        Self {
            clock,
            prefix: prefix.into(),
        }
    }

    /// Fill in age and (on create) the patient id.
    pub fn derive(&self, patient: &mut Patient, mode: SaveMode) {
        if let Some(birth) = patient.date_of_birth {
            patient.age = Some(age_on(birth, self.clock.today()));
        }

        let has_id = patient
            .patient_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty());
        if mode == SaveMode::Create && !has_id {
            let id = generate_patient_id(&self.prefix, self.clock.timestamp_millis());
            tracing::debug!(patient_id = %id, "generated patient id");
            patient.patient_id = Some(id);
        }
    }
}
