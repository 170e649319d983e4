//! Supplier directory. Creation is idempotent on name; deletion is
//! refused while any QBID still references the supplier.

use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};

use crate::db::InventoryDb;
use crate::error::{Result, StoreError};

/// Input for [`InventoryDb::create_supplier`] and
/// [`InventoryDb::update_supplier`].
#[derive(Clone, Debug, Default)]
pub struct SupplierFields {
    pub contact: Option<String>,
    pub material: Option<String>,
    pub quarry_location: Option<String>,
    pub notes: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// A supplier row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Supplier {
    pub id: i64,
    pub name: String,
    pub contact: Option<String>,
    pub material: Option<String>,
    pub quarry_location: Option<String>,
    pub notes: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

fn row_to_supplier(row: &rusqlite::Row<'_>) -> rusqlite::Result<Supplier> {
    Ok(Supplier {
        id: row.get(0)?,
        name: row.get(1)?,
        contact: row.get(2)?,
        material: row.get(3)?,
        quarry_location: row.get(4)?,
        notes: row.get(5)?,
        address: row.get(6)?,
        phone: row.get(7)?,
        email: row.get(8)?,
    })
}

const SUPPLIER_SELECT: &str = "SELECT id, name, contact, material, quarry_location, notes, \
     address, phone, email FROM suppliers";

impl InventoryDb {
    /// Create a supplier, or return the existing one with the same name.
    pub fn create_supplier(&self, name: &str, fields: &SupplierFields) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::invalid("supplier name is required"));
        }
        if let Some(existing) = self.find_supplier_by_name(name)? {
            return Ok(existing.id);
        }
        self.conn.execute(
            "INSERT INTO suppliers (name, contact, material, quarry_location, notes, address, \
             phone, email) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                name,
                fields.contact,
                fields.material,
                fields.quarry_location,
                fields.notes,
                fields.address,
                fields.phone,
                fields.email,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(supplier_id = id, name, "supplier created");
        Ok(id)
    }

    pub fn get_supplier(&self, id: i64) -> Result<Option<Supplier>> {
        let sql = format!("{SUPPLIER_SELECT} WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], row_to_supplier)
            .optional()?)
    }

    pub fn find_supplier_by_name(&self, name: &str) -> Result<Option<Supplier>> {
        let sql = format!("{SUPPLIER_SELECT} WHERE name = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![name.trim()], row_to_supplier)
            .optional()?)
    }

    /// All suppliers, by name.
    pub fn list_suppliers(&self) -> Result<Vec<Supplier>> {
        let sql = format!("{SUPPLIER_SELECT} ORDER BY name");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_supplier)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Patch-merge a supplier's fields. The name is immutable here; it is
    /// the idempotency key.
    pub fn update_supplier(&self, id: i64, fields: &SupplierFields) -> Result<Supplier> {
        let existing = self
            .get_supplier(id)?
            .ok_or_else(|| StoreError::not_found("supplier", id.to_string()))?;
        self.conn.execute(
            "UPDATE suppliers SET contact = ?1, material = ?2, quarry_location = ?3, \
             notes = ?4, address = ?5, phone = ?6, email = ?7 WHERE id = ?8",
            params![
                fields.contact.as_deref().or(existing.contact.as_deref()),
                fields.material.as_deref().or(existing.material.as_deref()),
                fields
                    .quarry_location
                    .as_deref()
                    .or(existing.quarry_location.as_deref()),
                fields.notes.as_deref().or(existing.notes.as_deref()),
                fields.address.as_deref().or(existing.address.as_deref()),
                fields.phone.as_deref().or(existing.phone.as_deref()),
                fields.email.as_deref().or(existing.email.as_deref()),
                id,
            ],
        )?;
        self.get_supplier(id)?
            .ok_or_else(|| StoreError::not_found("supplier", id.to_string()))
    }

    /// Delete a supplier. Refused while QBIDs still reference it.
    pub fn delete_supplier(&self, id: i64) -> Result<()> {
        if self.get_supplier(id)?.is_none() {
            return Err(StoreError::not_found("supplier", id.to_string()));
        }
        let qbids: i64 = self.conn.query_row(
            "SELECT COUNT(1) FROM qbids WHERE supplier_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        if qbids > 0 {
            return Err(StoreError::SupplierInUse { id, qbids });
        }
        self.conn
            .execute("DELETE FROM suppliers WHERE id = ?1", params![id])?;
        tracing::info!(supplier_id = id, "supplier deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qbids::NewQbid;

    #[test]
    fn test_create_is_idempotent_on_name() {
        let db = InventoryDb::in_memory().unwrap();
        let a = db
            .create_supplier("Hosur Granites", &SupplierFields::default())
            .unwrap();
        let b = db
            .create_supplier("  Hosur Granites  ", &SupplierFields::default())
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(db.list_suppliers().unwrap().len(), 1);
    }

    #[test]
    fn test_blank_name_rejected() {
        let db = InventoryDb::in_memory().unwrap();
        assert!(matches!(
            db.create_supplier("   ", &SupplierFields::default()),
            Err(StoreError::Invalid { .. })
        ));
    }

    #[test]
    fn test_update_merges() {
        let db = InventoryDb::in_memory().unwrap();
        let id = db
            .create_supplier(
                "Hosur Granites",
                &SupplierFields {
                    phone: Some("04344-000000".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        let rec = db
            .update_supplier(
                id,
                &SupplierFields {
                    quarry_location: Some("Hosur".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(rec.phone.as_deref(), Some("04344-000000"));
        assert_eq!(rec.quarry_location.as_deref(), Some("Hosur"));
    }

    #[test]
    fn test_delete_refused_while_referenced() {
        let db = InventoryDb::in_memory().unwrap();
        let id = db
            .create_supplier("Hosur Granites", &SupplierFields::default())
            .unwrap();
        let qbid = db
            .create_qbid(&NewQbid {
                supplier_id: Some(id),
                material_type: Some("Paradiso Multi".into()),
                ..Default::default()
            })
            .unwrap();
        assert!(matches!(
            db.delete_supplier(id),
            Err(StoreError::SupplierInUse { qbids: 1, .. })
        ));
        db.delete_qbid(&qbid).unwrap();
        db.delete_supplier(id).unwrap();
    }
}
