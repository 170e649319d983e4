//! Slab tier: deterministic SLID allocation under a block, slab CRUD,
//! per-slab finish events, and the usage summary the exclusivity guard
//! reads.

use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stoneyard_types::{ParsedBlockId, alloc, slid_for};

use crate::db::InventoryDb;
use crate::error::{Result, StoreError};

/// Input for [`InventoryDb::create_slab`]. The SLID is allocated by the
/// store.
#[derive(Clone, Debug, Default)]
pub struct NewSlab {
    pub block_id: String,
    pub thickness_mm: Option<f64>,
    pub machine_id: Option<String>,
    pub slabs_yield: Option<i64>,
    pub batch_id: Option<String>,
    pub yard_location: Option<String>,
    pub status: Option<String>,
    pub qc_status: Option<String>,
    pub stone_type: Option<String>,
}

/// Partial update for [`InventoryDb::update_slab`].
#[derive(Clone, Debug, Default)]
pub struct SlabPatch {
    pub thickness_mm: Option<f64>,
    pub machine_id: Option<String>,
    pub slabs_yield: Option<i64>,
    pub batch_id: Option<String>,
    pub yard_location: Option<String>,
    pub status: Option<String>,
    pub qc_status: Option<String>,
    /// Settable freely; reservation conflicts surface at derived-product
    /// writes, not here.
    pub stone_type: Option<String>,
}

/// A slab row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SlabRecord {
    pub slid: String,
    pub block_id: Option<String>,
    pub thickness_mm: Option<f64>,
    pub machine_id: Option<String>,
    pub slabs_yield: Option<i64>,
    pub batch_id: Option<String>,
    pub yard_location: Option<String>,
    pub status: Option<String>,
    pub qc_status: Option<String>,
    pub stone_type: Option<String>,
}

/// Derived-product counts for one slab, per family.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct SlabUsage {
    pub tiles: i64,
    pub cobbles: i64,
    pub monuments: i64,
    pub pavers: i64,
}

impl SlabUsage {
    pub fn total(&self) -> i64 {
        self.tiles + self.cobbles + self.monuments + self.pavers
    }
}

/// A finish/process event on one slab.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SlabEvent {
    pub id: String,
    pub slid: String,
    pub action: String,
    pub payload: Option<serde_json::Value>,
    pub created_at: i64,
}

const SLAB_SELECT: &str = "SELECT slid, block_id, thickness_mm, machine_id, slabs_yield, \
     batch_id, yard_location, status, qc_status, stone_type FROM slabs";

fn row_to_slab(row: &rusqlite::Row<'_>) -> rusqlite::Result<SlabRecord> {
    Ok(SlabRecord {
        slid: row.get(0)?,
        block_id: row.get(1)?,
        thickness_mm: row.get(2)?,
        machine_id: row.get(3)?,
        slabs_yield: row.get(4)?,
        batch_id: row.get(5)?,
        yard_location: row.get(6)?,
        status: row.get(7)?,
        qc_status: row.get(8)?,
        stone_type: row.get(9)?,
    })
}

/// Random fallback for blocks that predate the structured grammar.
fn random_slid() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("SLID-{}", hex[..8].to_ascii_uppercase())
}

impl InventoryDb {
    /// Create a slab under a block.
    ///
    /// When the block identifier parses, the SLID is deterministic: the
    /// highest existing slab sequence under that block plus one, computed
    /// inside the insert transaction. Unparseable (legacy) blocks get a
    /// random SLID instead.
    pub fn create_slab(&self, new: &NewSlab) -> Result<String> {
        let block_id = new.block_id.trim();
        if self.get_block(block_id)?.is_none() {
            return Err(StoreError::not_found("block", block_id));
        }

        let tx = self.conn.unchecked_transaction()?;
        let slid = match ParsedBlockId::parse(block_id) {
            Some(parsed) => {
                let existing: Vec<String> = {
                    let mut stmt = tx.prepare("SELECT slid FROM slabs WHERE block_id = ?1")?;
                    let rows = stmt.query_map(params![block_id], |row| row.get(0))?;
                    rows.collect::<rusqlite::Result<_>>()?
                };
                let seq = alloc::next_slab_seq(
                    existing.iter().map(String::as_str),
                    &parsed.base,
                    parsed.seq,
                );
                tracing::debug!(%block_id, seq, "slab sequence allocated");
                slid_for(block_id, seq).unwrap_or_else(random_slid)
            }
            None => random_slid(),
        };

        tx.execute(
            "INSERT INTO slabs (slid, block_id, thickness_mm, machine_id, slabs_yield, \
             batch_id, yard_location, status, qc_status, stone_type) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                slid,
                block_id,
                new.thickness_mm,
                new.machine_id,
                new.slabs_yield,
                new.batch_id,
                new.yard_location,
                new.status,
                new.qc_status,
                new.stone_type,
            ],
        )?;
        tx.commit()?;

        tracing::info!(%slid, %block_id, "slab created");
        Ok(slid)
    }

    /// Get a slab; lookup tolerates casing and surrounding whitespace.
    pub fn get_slab(&self, slid: &str) -> Result<Option<SlabRecord>> {
        let sql = format!("{SLAB_SELECT} WHERE UPPER(TRIM(slid)) = UPPER(TRIM(?1))");
        let row = self
            .conn
            .query_row(&sql, params![slid], row_to_slab)
            .optional()?;
        Ok(row)
    }

    /// All slabs, by identifier.
    pub fn list_slabs(&self) -> Result<Vec<SlabRecord>> {
        let sql = format!("{SLAB_SELECT} ORDER BY slid");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_slab)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Slabs of one block, by identifier.
    pub fn slabs_of_block(&self, block_id: &str) -> Result<Vec<SlabRecord>> {
        let sql = format!("{SLAB_SELECT} WHERE block_id = ?1 ORDER BY slid");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![block_id], row_to_slab)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Apply a patch to a slab.
    pub fn update_slab(&self, slid: &str, patch: &SlabPatch) -> Result<SlabRecord> {
        let existing = self
            .get_slab(slid)?
            .ok_or_else(|| StoreError::not_found("slab", slid))?;

        self.conn.execute(
            "UPDATE slabs SET thickness_mm = ?1, machine_id = ?2, slabs_yield = ?3, \
             batch_id = ?4, yard_location = ?5, status = ?6, qc_status = ?7, stone_type = ?8 \
             WHERE slid = ?9",
            params![
                patch.thickness_mm.or(existing.thickness_mm),
                patch.machine_id.as_deref().or(existing.machine_id.as_deref()),
                patch.slabs_yield.or(existing.slabs_yield),
                patch.batch_id.as_deref().or(existing.batch_id.as_deref()),
                patch
                    .yard_location
                    .as_deref()
                    .or(existing.yard_location.as_deref()),
                patch.status.as_deref().or(existing.status.as_deref()),
                patch.qc_status.as_deref().or(existing.qc_status.as_deref()),
                patch.stone_type.as_deref().or(existing.stone_type.as_deref()),
                existing.slid,
            ],
        )?;
        self.get_slab(&existing.slid)?
            .ok_or_else(|| StoreError::not_found("slab", slid))
    }

    /// Delete a slab, its events, its dispatches, and any derived-product
    /// rows cut from it.
    pub fn delete_slab(&self, slid: &str) -> Result<()> {
        let existing = self
            .get_slab(slid)?
            .ok_or_else(|| StoreError::not_found("slab", slid))?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM dispatches WHERE slid = ?1", params![existing.slid])?;
        tx.execute("DELETE FROM slab_events WHERE slid = ?1", params![existing.slid])?;
        for table in ["tiles", "cobbles", "monuments", "pavers"] {
            tx.execute(
                &format!("DELETE FROM {table} WHERE slid = ?1"),
                params![existing.slid],
            )?;
        }
        tx.execute("DELETE FROM slabs WHERE slid = ?1", params![existing.slid])?;
        tx.commit()?;

        tracing::info!(slid = %existing.slid, "slab deleted");
        Ok(())
    }

    /// How many derived products each family has cut from this slab.
    pub fn slab_usage(&self, slid: &str) -> Result<SlabUsage> {
        let existing = self
            .get_slab(slid)?
            .ok_or_else(|| StoreError::not_found("slab", slid))?;
        let count = |table: &str| -> Result<i64> {
            let n: i64 = self.conn.query_row(
                &format!("SELECT COUNT(1) FROM {table} WHERE slid = ?1"),
                params![existing.slid],
                |row| row.get(0),
            )?;
            Ok(n)
        };
        Ok(SlabUsage {
            tiles: count("tiles")?,
            cobbles: count("cobbles")?,
            monuments: count("monuments")?,
            pavers: count("pavers")?,
        })
    }

    /// Append a finish/process event to a slab's trail.
    pub fn add_finish_event(
        &self,
        slid: &str,
        action: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<String> {
        let existing = self
            .get_slab(slid)?
            .ok_or_else(|| StoreError::not_found("slab", slid))?;
        if action.trim().is_empty() {
            return Err(StoreError::invalid("action is required"));
        }
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO slab_events (id, slid, action, payload) VALUES (?1, ?2, ?3, ?4)",
            params![id, existing.slid, action.trim(), payload.map(|p| p.to_string())],
        )?;
        Ok(id)
    }

    /// Finish events for one slab, newest first.
    pub fn slab_events(&self, slid: &str) -> Result<Vec<SlabEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, slid, action, payload, created_at FROM slab_events \
             WHERE slid = ?1 ORDER BY created_at DESC, id",
        )?;
        let rows = stmt.query_map(params![slid], |row| {
            let payload: Option<String> = row.get(3)?;
            Ok(SlabEvent {
                id: row.get(0)?,
                slid: row.get(1)?,
                action: row.get(2)?,
                payload: payload.and_then(|p| serde_json::from_str(&p).ok()),
                created_at: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }
}
