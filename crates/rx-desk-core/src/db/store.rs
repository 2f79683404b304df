//! [`EntityClient`] over the local SQLite database.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;

use super::{Database, DbError, DbResult};
use crate::client::{ClientError, ClientResult, EntityClient};
use crate::clock::{system_clock, SharedClock};
use crate::history::older_than_cutoff;
use crate::models::{Medicine, Patient, Prescription};

impl From<DbError> for ClientError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => ClientError::NotFound(what),
            other => ClientError::Store(other.to_string()),
        }
    }
}

/// Offline backend with the same contract as the REST client.
pub struct LocalStore {
    db: Mutex<Database>,
    clock: SharedClock,
}

impl LocalStore {
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Ok(Self::with_database(Database::open(path)?, system_clock()))
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::with_database(Database::open_in_memory()?, system_clock()))
    }

    /// Wrap an open database; `clock` anchors "older than" queries.
    pub fn with_database(db: Database, clock: SharedClock) -> Self {
        Self {
            db: Mutex::new(db),
            clock,
        }
    }

    fn db(&self) -> ClientResult<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|_| ClientError::Store("database lock poisoned".into()))
    }
}

fn found(updated: bool, kind: &str, id: i64) -> ClientResult<()> {
    if updated {
        Ok(())
    } else {
        Err(ClientError::NotFound(format!("{} {}", kind, id)))
    }
}

fn reload<T>(record: Option<T>, kind: &str, id: i64) -> ClientResult<T> {
    record.ok_or_else(|| ClientError::NotFound(format!("{} {}", kind, id)))
}

impl EntityClient for LocalStore {
    fn list_patients(&self) -> ClientResult<Vec<Patient>> {
        Ok(self.db()?.list_patients()?)
    }

    fn get_patient(&self, id: i64) -> ClientResult<Option<Patient>> {
        Ok(self.db()?.get_patient(id)?)
    }

    fn create_patient(&self, patient: &Patient) -> ClientResult<Patient> {
        let db = self.db()?;
        let id = db.insert_patient(patient)?;
        tracing::info!(id, patient_id = ?patient.patient_id, "patient stored");
        reload(db.get_patient(id)?, "patient", id)
    }

    fn update_patient(&self, id: i64, patient: &Patient) -> ClientResult<Patient> {
        let db = self.db()?;
        found(db.update_patient(id, patient)?, "patient", id)?;
        reload(db.get_patient(id)?, "patient", id)
    }

    fn delete_patient(&self, id: i64) -> ClientResult<()> {
        found(self.db()?.delete_patient(id)?, "patient", id)
    }

    fn list_medicines(&self) -> ClientResult<Vec<Medicine>> {
        Ok(self.db()?.list_medicines()?)
    }

    fn get_medicine(&self, id: i64) -> ClientResult<Option<Medicine>> {
        Ok(self.db()?.get_medicine(id)?)
    }

    fn create_medicine(&self, medicine: &Medicine) -> ClientResult<Medicine> {
        let db = self.db()?;
        let id = db.insert_medicine(medicine)?;
        tracing::info!(id, name = %medicine.name, "medicine stored");
        reload(db.get_medicine(id)?, "medicine", id)
    }

    fn update_medicine(&self, id: i64, medicine: &Medicine) -> ClientResult<Medicine> {
        let db = self.db()?;
        found(db.update_medicine(id, medicine)?, "medicine", id)?;
        reload(db.get_medicine(id)?, "medicine", id)
    }

    fn delete_medicine(&self, id: i64) -> ClientResult<()> {
        found(self.db()?.delete_medicine(id)?, "medicine", id)
    }

    fn list_prescriptions(&self) -> ClientResult<Vec<Prescription>> {
        Ok(self.db()?.list_prescriptions()?)
    }

    fn get_prescription(&self, id: i64) -> ClientResult<Option<Prescription>> {
        Ok(self.db()?.get_prescription(id)?)
    }

    fn create_prescription(&self, prescription: &Prescription) -> ClientResult<Prescription> {
        let db = self.db()?;
        let id = db.insert_prescription(prescription)?;
        tracing::info!(
            id,
            patient_id = prescription.patient_id,
            items = prescription.prescription_items.len(),
            "prescription stored"
        );
        reload(db.get_prescription(id)?, "prescription", id)
    }

    fn update_prescription(
        &self,
        id: i64,
        prescription: &Prescription,
    ) -> ClientResult<Prescription> {
        let db = self.db()?;
        found(db.update_prescription(id, prescription)?, "prescription", id)?;
        reload(db.get_prescription(id)?, "prescription", id)
    }

    fn delete_prescription(&self, id: i64) -> ClientResult<()> {
        found(self.db()?.delete_prescription(id)?, "prescription", id)
    }

    fn list_prescriptions_for_patient(&self, patient_id: i64) -> ClientResult<Vec<Prescription>> {
        Ok(self.db()?.list_prescriptions_for_patient(patient_id)?)
    }

    fn search_prescriptions_by_date_range(
        &self,
        patient_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ClientResult<Vec<Prescription>> {
        Ok(self.db()?.list_prescriptions_between(patient_id, start, end)?)
    }

    fn list_prescriptions_older_than(
        &self,
        patient_id: i64,
        years: u32,
    ) -> ClientResult<Vec<Prescription>> {
        let cutoff = older_than_cutoff(self.clock.today(), years);
        Ok(self.db()?.list_prescriptions_before(patient_id, cutoff)?)
    }
}
