//! Patient database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{constraint_or, Database, DbResult};
use crate::models::Patient;

const PATIENT_COLUMNS: &str = r#"
    id, patient_id, first_name, last_name, gender, date_of_birth,
    age, contact_number, email, address
"#;

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        gender: row.get(4)?,
        date_of_birth: row.get(5)?,
        age: row.get(6)?,
        contact_number: row.get(7)?,
        email: row.get(8)?,
        address: row.get(9)?,
    })
}

impl Database {
    /// Insert a new patient, returning its row id.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO patients (
                patient_id, first_name, last_name, gender, date_of_birth,
                age, contact_number, email, address
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                patient.patient_id,
                patient.first_name,
                patient.last_name,
                patient.gender,
                patient.date_of_birth,
                patient.age,
                patient.contact_number,
                patient.email,
                patient.address,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Replace the editable fields of an existing patient.
    ///
    /// A stored `patient_id` is never overwritten; the incoming one only fills
    /// a record that has none yet.
    pub fn update_patient(&self, id: i64, patient: &Patient) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE patients SET
                patient_id = COALESCE(patient_id, ?2),
                first_name = ?3,
                last_name = ?4,
                gender = ?5,
                date_of_birth = ?6,
                age = ?7,
                contact_number = ?8,
                email = ?9,
                address = ?10,
                updated_at = datetime('now')
            WHERE id = ?1
            "#,
            params![
                id,
                patient.patient_id,
                patient.first_name,
                patient.last_name,
                patient.gender,
                patient.date_of_birth,
                patient.age,
                patient.contact_number,
                patient.email,
                patient.address,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a patient by system id.
    pub fn get_patient(&self, id: i64) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM patients WHERE id = ?", PATIENT_COLUMNS),
                [id],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all patients in registration order.
    pub fn list_patients(&self) -> DbResult<Vec<Patient>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM patients ORDER BY id", PATIENT_COLUMNS))?;
        let rows = stmt.query_map([], patient_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn patient_exists(&self, id: i64) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM patients WHERE id = ?",
            [id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Delete a patient.
    ///
    /// Fails with `Constraint` while prescriptions still reference the patient.
    pub fn delete_patient(&self, id: i64) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM patients WHERE id = ?", [id])
            .map_err(|e| constraint_or(e, format!("patient {} has prescriptions", id)))?;
        Ok(rows_affected > 0)
    }
}
