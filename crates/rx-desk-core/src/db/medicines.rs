//! Medicine catalog database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::Medicine;

fn medicine_from_row(row: &Row<'_>) -> rusqlite::Result<Medicine> {
    Ok(Medicine {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        manufacturer: row.get(3)?,
        category: row.get(4)?,
        is_active: row.get(5)?,
    })
}

impl Database {
    /// Insert a medicine, returning its row id.
    pub fn insert_medicine(&self, medicine: &Medicine) -> DbResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO medicines (name, description, manufacturer, category, is_active)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                medicine.name,
                medicine.description,
                medicine.manufacturer,
                medicine.category,
                medicine.is_active,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_medicine(&self, id: i64, medicine: &Medicine) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE medicines SET
                name = ?2,
                description = ?3,
                manufacturer = ?4,
                category = ?5,
                is_active = ?6,
                updated_at = datetime('now')
            WHERE id = ?1
            "#,
            params![
                id,
                medicine.name,
                medicine.description,
                medicine.manufacturer,
                medicine.category,
                medicine.is_active,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    pub fn get_medicine(&self, id: i64) -> DbResult<Option<Medicine>> {
        self.conn
            .query_row(
                r#"
                SELECT id, name, description, manufacturer, category, is_active
                FROM medicines
                WHERE id = ?
                "#,
                [id],
                medicine_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List the whole catalog, active and inactive, by name.
    pub fn list_medicines(&self) -> DbResult<Vec<Medicine>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, name, description, manufacturer, category, is_active
            FROM medicines
            ORDER BY name COLLATE NOCASE, id
            "#,
        )?;
        let rows = stmt.query_map([], medicine_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn delete_medicine(&self, id: i64) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM medicines WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}
