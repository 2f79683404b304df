//! Prescription database operations.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{constraint_or, Database, DbError, DbResult};
use crate::models::{Prescription, PrescriptionItem};

/// Human-facing id for a stored prescription, e.g. `RX000042`.
pub fn local_prescription_id(id: i64) -> String {
    format!("RX{:06}", id)
}

const PRESCRIPTION_COLUMNS: &str =
    "id, prescription_id, patient_id, visit_date, notes, items";

impl Database {
    /// Insert a prescription, assigning its human-facing id.
    pub fn insert_prescription(&self, prescription: &Prescription) -> DbResult<i64> {
        let items_json = serde_json::to_string(&prescription.prescription_items)?;
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            r#"
            INSERT INTO prescriptions (patient_id, visit_date, notes, items)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                prescription.patient_id,
                prescription.visit_date,
                prescription.notes,
                items_json,
            ],
        )
        .map_err(|e| {
            constraint_or(e, format!("unknown patient {}", prescription.patient_id))
        })?;
        let id = tx.last_insert_rowid();
        let prescription_id = prescription
            .prescription_id
            .clone()
            .unwrap_or_else(|| local_prescription_id(id));
        tx.execute(
            "UPDATE prescriptions SET prescription_id = ?2 WHERE id = ?1",
            params![id, prescription_id],
        )?;

        tx.commit()?;
        Ok(id)
    }

    /// Replace header and items; the human-facing id is kept.
    pub fn update_prescription(&self, id: i64, prescription: &Prescription) -> DbResult<bool> {
        let items_json = serde_json::to_string(&prescription.prescription_items)?;
        let rows_affected = self
            .conn
            .execute(
                r#"
                UPDATE prescriptions SET
                    patient_id = ?2,
                    visit_date = ?3,
                    notes = ?4,
                    items = ?5,
                    updated_at = datetime('now')
                WHERE id = ?1
                "#,
                params![
                    id,
                    prescription.patient_id,
                    prescription.visit_date,
                    prescription.notes,
                    items_json,
                ],
            )
            .map_err(|e| {
                constraint_or(e, format!("unknown patient {}", prescription.patient_id))
            })?;
        Ok(rows_affected > 0)
    }

    pub fn get_prescription(&self, id: i64) -> DbResult<Option<Prescription>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM prescriptions WHERE id = ?",
                    PRESCRIPTION_COLUMNS
                ),
                [id],
                PrescriptionRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// All prescriptions, newest visit first.
    pub fn list_prescriptions(&self) -> DbResult<Vec<Prescription>> {
        self.query_prescriptions(
            &format!(
                "SELECT {} FROM prescriptions ORDER BY visit_date DESC, id DESC",
                PRESCRIPTION_COLUMNS
            ),
            params![],
        )
    }

    pub fn list_prescriptions_for_patient(&self, patient_id: i64) -> DbResult<Vec<Prescription>> {
        self.query_prescriptions(
            &format!(
                r#"
                SELECT {} FROM prescriptions
                WHERE patient_id = ?1
                ORDER BY visit_date DESC, id DESC
                "#,
                PRESCRIPTION_COLUMNS
            ),
            params![patient_id],
        )
    }

    /// Prescriptions with visit date in `start..=end`.
    pub fn list_prescriptions_between(
        &self,
        patient_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DbResult<Vec<Prescription>> {
        self.query_prescriptions(
            &format!(
                r#"
                SELECT {} FROM prescriptions
                WHERE patient_id = ?1 AND visit_date BETWEEN ?2 AND ?3
                ORDER BY visit_date DESC, id DESC
                "#,
                PRESCRIPTION_COLUMNS
            ),
            params![patient_id, start, end],
        )
    }

    /// Prescriptions with visit date strictly before `cutoff`.
    pub fn list_prescriptions_before(
        &self,
        patient_id: i64,
        cutoff: NaiveDate,
    ) -> DbResult<Vec<Prescription>> {
        self.query_prescriptions(
            &format!(
                r#"
                SELECT {} FROM prescriptions
                WHERE patient_id = ?1 AND visit_date < ?2
                ORDER BY visit_date DESC, id DESC
                "#,
                PRESCRIPTION_COLUMNS
            ),
            params![patient_id, cutoff],
        )
    }

    pub fn delete_prescription(&self, id: i64) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM prescriptions WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    fn query_prescriptions(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> DbResult<Vec<Prescription>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, PrescriptionRow::from_row)?;

        let mut prescriptions = Vec::new();
        for row in rows {
            prescriptions.push(row?.try_into()?);
        }
        Ok(prescriptions)
    }
}

/// Raw row; `items` is still JSON.
struct PrescriptionRow {
    id: i64,
    prescription_id: Option<String>,
    patient_id: i64,
    visit_date: Option<NaiveDate>,
    notes: Option<String>,
    items: String,
}

impl PrescriptionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            prescription_id: row.get(1)?,
            patient_id: row.get(2)?,
            visit_date: row.get(3)?,
            notes: row.get(4)?,
            items: row.get(5)?,
        })
    }
}

impl TryFrom<PrescriptionRow> for Prescription {
    type Error = DbError;

    fn try_from(row: PrescriptionRow) -> Result<Self, Self::Error> {
        let prescription_items: Vec<PrescriptionItem> = serde_json::from_str(&row.items)?;
        Ok(Prescription {
            id: Some(row.id),
            prescription_id: row.prescription_id,
            patient_id: row.patient_id,
            visit_date: row.visit_date,
            notes: row.notes,
            prescription_items,
        })
    }
}
