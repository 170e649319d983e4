//! Material reference data.
//!
//! Materials are created lazily the first time a name is referenced; the
//! short code is derived once at insert and persisted. QBID allocation
//! prefers the persisted code, but only when it is a full 4-character code
//! (shorter values predate the codec and count as not-yet-computed).

use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};

use stoneyard_types::material;

use crate::db::InventoryDb;
use crate::error::{Result, StoreError};

/// A material row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Material {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub short_code: Option<String>,
}

fn row_to_material(row: &rusqlite::Row<'_>) -> rusqlite::Result<Material> {
    Ok(Material {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        short_code: row.get(3)?,
    })
}

impl InventoryDb {
    /// Find a material by exact name, creating it (with a derived short
    /// code) when missing. Returns its id.
    pub fn ensure_material(&self, name: &str) -> Result<i64> {
        let n = name.trim();
        if n.is_empty() {
            return Err(StoreError::invalid("material name required"));
        }
        if let Some(m) = self.find_material_by_name(n)? {
            return Ok(m.id);
        }
        let short = material::short_code(n);
        self.conn.execute(
            "INSERT INTO materials (name, short_code) VALUES (?1, ?2)",
            params![n, short],
        )?;
        tracing::info!(name = n, short, "material created");
        Ok(self.conn.last_insert_rowid())
    }

    /// Get a material by id.
    pub fn get_material(&self, id: i64) -> Result<Option<Material>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, description, short_code FROM materials WHERE id = ?1",
                params![id],
                row_to_material,
            )
            .optional()?;
        Ok(row)
    }

    /// Get a material by exact name.
    pub fn find_material_by_name(&self, name: &str) -> Result<Option<Material>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, description, short_code FROM materials WHERE name = ?1",
                params![name.trim()],
                row_to_material,
            )
            .optional()?;
        Ok(row)
    }

    /// All materials, ordered by name.
    pub fn list_materials(&self) -> Result<Vec<Material>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, description, short_code FROM materials ORDER BY name")?;
        let rows = stmt.query_map([], row_to_material)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Lowercase short code used in QBIDs for a resolved material.
    ///
    /// Precedence: explicit override, then a persisted `short_code` of at
    /// least 4 characters, then recomputation from the name.
    pub(crate) fn qbid_short_for(
        &self,
        override_code: Option<&str>,
        material: Option<&Material>,
        raw_name: Option<&str>,
    ) -> String {
        if let Some(code) = override_code {
            let code = code.trim();
            if !code.is_empty() {
                return material::short_code_lower(code);
            }
        }
        if let Some(m) = material {
            if let Some(code) = m.short_code.as_deref() {
                if code.trim().len() >= 4 {
                    return material::short_code_lower(code);
                }
            }
            return material::short_code_lower(&m.name);
        }
        material::short_code_lower(raw_name.unwrap_or("MAT"))
    }
}
