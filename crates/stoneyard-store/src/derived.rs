//! Derived products: tiles, cobbles, monuments, pavers.
//!
//! All four families share one source guard. A product is cut either from
//! a slab (the normal path) or directly from a block that has no slabs.
//! One slab feeds at most one product across ALL families, and a slab
//! whose `stone_type` names another family's marker is reserved for that
//! family. The guard runs on create and on any update that re-points the
//! product at a different slab or block; every check happens before the
//! row is written.

use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stoneyard_types::ProductFamily;

use crate::db::InventoryDb;
use crate::error::{Result, StoreError};

const FAMILY_TABLES: [(&str, &str); 4] = [
    ("tiles", "tile_id"),
    ("cobbles", "cobble_id"),
    ("monuments", "monument_id"),
    ("pavers", "paver_id"),
];

/// Outcome of the source guard: the lineage columns to persist.
struct ResolvedSource {
    block_id: Option<String>,
    slid: Option<String>,
    source: &'static str,
}

fn product_id(family: ProductFamily) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}-{}", family.id_prefix(), hex[..8].to_ascii_uppercase())
}

impl InventoryDb {
    /// Validate and resolve the slab/block source for one derived product.
    ///
    /// `exclude` names the row being updated so it does not count against
    /// its own slab. Callers hold an open transaction on the connection, so
    /// these checks and the write that follows commit as one unit.
    fn resolve_derived_source(
        &self,
        family: ProductFamily,
        block_id: Option<&str>,
        slid: Option<&str>,
        stone_type: Option<&str>,
        exclude: Option<(&str, &str)>,
    ) -> Result<ResolvedSource> {
        let block_id = block_id.map(str::trim).filter(|s| !s.is_empty());
        let slid = slid.map(str::trim).filter(|s| !s.is_empty());

        let Some(slid) = slid else {
            // Block-only path: allowed while the block has no slabs.
            let Some(block_id) = block_id else {
                return Err(StoreError::invalid("block_id or slid is required"));
            };
            if self.get_block(block_id)?.is_none() {
                return Err(StoreError::not_found("block", block_id));
            }
            let slabs: i64 = self.conn.query_row(
                "SELECT COUNT(1) FROM slabs WHERE block_id = ?1",
                params![block_id],
                |row| row.get(0),
            )?;
            if slabs > 0 {
                return Err(StoreError::BlockHasSlabs {
                    block_id: block_id.to_string(),
                });
            }
            return Ok(ResolvedSource {
                block_id: Some(block_id.to_string()),
                slid: None,
                source: "block",
            });
        };

        let slab = self
            .get_slab(slid)?
            .ok_or_else(|| StoreError::not_found("slab", slid))?;

        if let (Some(given), Some(actual)) = (block_id, slab.block_id.as_deref()) {
            if given != actual {
                return Err(StoreError::BlockMismatch {
                    slid: slab.slid.clone(),
                    expected: actual.to_string(),
                    given: given.to_string(),
                });
            }
        }

        let slab_stone = slab
            .stone_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if family.requires_slab_stone_type() && slab_stone.is_none() {
            return Err(StoreError::SlabStoneTypeRequired {
                slid: slab.slid.clone(),
                family,
            });
        }
        if let Some(stone) = slab_stone {
            if let Some(reserved) = ProductFamily::from_marker(stone) {
                if reserved != family {
                    return Err(StoreError::SlabReserved {
                        slid: slab.slid.clone(),
                        reserved,
                        requested: family,
                    });
                }
            }
            if let Some(requested) = stone_type.map(str::trim).filter(|s| !s.is_empty()) {
                if !requested.eq_ignore_ascii_case(stone) {
                    return Err(StoreError::StoneTypeMismatch {
                        slid: slab.slid.clone(),
                        slab_type: stone.to_string(),
                        requested: requested.to_string(),
                    });
                }
            }
        }

        // One slab, one product, across all families.
        for (table, id_col) in FAMILY_TABLES {
            let mut sql = format!("SELECT COUNT(1) FROM {table} WHERE slid = ?1");
            let in_use: i64 = match exclude {
                Some((ex_table, ex_id)) if ex_table == table => {
                    sql.push_str(&format!(" AND {id_col} != ?2"));
                    self.conn
                        .query_row(&sql, params![slab.slid, ex_id], |row| row.get(0))?
                }
                _ => self
                    .conn
                    .query_row(&sql, params![slab.slid], |row| row.get(0))?,
            };
            if in_use > 0 {
                return Err(StoreError::SlabInUse {
                    slid: slab.slid.clone(),
                });
            }
        }

        Ok(ResolvedSource {
            block_id: slab.block_id.clone(),
            slid: Some(slab.slid),
            source: "slab",
        })
    }

    /// Guard inputs for an update: merged slid/block, where an explicit new
    /// slid drops the stored block so it re-resolves from the slab.
    fn merged_source<'a>(
        patch_block: Option<&'a str>,
        patch_slid: Option<&'a str>,
        stored_block: Option<&'a str>,
        stored_slid: Option<&'a str>,
    ) -> (Option<&'a str>, Option<&'a str>) {
        let slid = patch_slid.or(stored_slid);
        let block = patch_block.or(if patch_slid.is_some() {
            None
        } else {
            stored_block
        });
        (block, slid)
    }
}

// ── Tiles ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub struct NewTile {
    pub block_id: Option<String>,
    pub slid: Option<String>,
    /// Validated against the slab's stone type; not persisted on the row.
    pub stone_type: Option<String>,
    pub thickness_mm: Option<f64>,
    pub length_mm: Option<f64>,
    pub width_mm: Option<f64>,
    pub finish: Option<String>,
    pub yield_count: Option<i64>,
    pub batch_id: Option<String>,
    pub yard_location: Option<String>,
    pub status: Option<String>,
    pub qc_status: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct TilePatch {
    pub block_id: Option<String>,
    pub slid: Option<String>,
    pub stone_type: Option<String>,
    /// Rejected when set; the source kind is fixed at create.
    pub source: Option<String>,
    pub thickness_mm: Option<f64>,
    pub length_mm: Option<f64>,
    pub width_mm: Option<f64>,
    pub finish: Option<String>,
    pub yield_count: Option<i64>,
    pub batch_id: Option<String>,
    pub yard_location: Option<String>,
    pub status: Option<String>,
    pub qc_status: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TileRecord {
    pub tile_id: String,
    pub block_id: Option<String>,
    pub slid: Option<String>,
    pub source: Option<String>,
    pub thickness_mm: Option<f64>,
    pub length_mm: Option<f64>,
    pub width_mm: Option<f64>,
    pub finish: Option<String>,
    pub yield_count: Option<i64>,
    pub batch_id: Option<String>,
    pub yard_location: Option<String>,
    pub status: Option<String>,
    pub qc_status: Option<String>,
}

fn row_to_tile(row: &rusqlite::Row<'_>) -> rusqlite::Result<TileRecord> {
    Ok(TileRecord {
        tile_id: row.get(0)?,
        block_id: row.get(1)?,
        slid: row.get(2)?,
        source: row.get(3)?,
        thickness_mm: row.get(4)?,
        length_mm: row.get(5)?,
        width_mm: row.get(6)?,
        finish: row.get(7)?,
        yield_count: row.get(8)?,
        batch_id: row.get(9)?,
        yard_location: row.get(10)?,
        status: row.get(11)?,
        qc_status: row.get(12)?,
    })
}

const TILE_SELECT: &str = "SELECT tile_id, block_id, slid, source, thickness_mm, length_mm, \
     width_mm, finish, yield_count, batch_id, yard_location, status, qc_status FROM tiles";

impl InventoryDb {
    pub fn create_tile(&self, new: &NewTile) -> Result<String> {
        // Guard and insert commit as one unit.
        let tx = self.conn.unchecked_transaction()?;
        let src = self.resolve_derived_source(
            ProductFamily::Tiles,
            new.block_id.as_deref(),
            new.slid.as_deref(),
            new.stone_type.as_deref(),
            None,
        )?;
        let id = product_id(ProductFamily::Tiles);
        tx.execute(
            "INSERT INTO tiles (tile_id, block_id, slid, source, thickness_mm, length_mm, \
             width_mm, finish, yield_count, batch_id, yard_location, status, qc_status) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                id,
                src.block_id,
                src.slid,
                src.source,
                new.thickness_mm,
                new.length_mm,
                new.width_mm,
                new.finish,
                new.yield_count,
                new.batch_id,
                new.yard_location,
                new.status,
                new.qc_status,
            ],
        )?;
        tx.commit()?;
        tracing::info!(tile_id = %id, slid = ?src.slid, "tile created");
        Ok(id)
    }

    pub fn get_tile(&self, id: &str) -> Result<Option<TileRecord>> {
        let sql = format!("{TILE_SELECT} WHERE tile_id = ?1");
        Ok(self.conn.query_row(&sql, params![id], row_to_tile).optional()?)
    }

    pub fn list_tiles(&self) -> Result<Vec<TileRecord>> {
        let sql = format!("{TILE_SELECT} ORDER BY tile_id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_tile)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    pub fn update_tile(&self, id: &str, patch: &TilePatch) -> Result<TileRecord> {
        let tx = self.conn.unchecked_transaction()?;
        let existing = self
            .get_tile(id)?
            .ok_or_else(|| StoreError::not_found("tile", id))?;
        if patch.source.is_some() {
            return Err(StoreError::SourceReadOnly { id: id.to_string() });
        }
        let (block_id, slid, source) = if patch.slid.is_some() || patch.block_id.is_some() {
            let (block_in, slid_in) = Self::merged_source(
                patch.block_id.as_deref(),
                patch.slid.as_deref(),
                existing.block_id.as_deref(),
                existing.slid.as_deref(),
            );
            let src = self.resolve_derived_source(
                ProductFamily::Tiles,
                block_in,
                slid_in,
                patch.stone_type.as_deref(),
                Some(("tiles", id)),
            )?;
            (src.block_id, src.slid, Some(src.source.to_string()))
        } else {
            (existing.block_id.clone(), existing.slid.clone(), existing.source.clone())
        };

        tx.execute(
            "UPDATE tiles SET block_id = ?1, slid = ?2, source = ?3, thickness_mm = ?4, \
             length_mm = ?5, width_mm = ?6, finish = ?7, yield_count = ?8, batch_id = ?9, \
             yard_location = ?10, status = ?11, qc_status = ?12 WHERE tile_id = ?13",
            params![
                block_id,
                slid,
                source,
                patch.thickness_mm.or(existing.thickness_mm),
                patch.length_mm.or(existing.length_mm),
                patch.width_mm.or(existing.width_mm),
                patch.finish.as_deref().or(existing.finish.as_deref()),
                patch.yield_count.or(existing.yield_count),
                patch.batch_id.as_deref().or(existing.batch_id.as_deref()),
                patch
                    .yard_location
                    .as_deref()
                    .or(existing.yard_location.as_deref()),
                patch.status.as_deref().or(existing.status.as_deref()),
                patch.qc_status.as_deref().or(existing.qc_status.as_deref()),
                id,
            ],
        )?;
        tx.commit()?;
        self.get_tile(id)?.ok_or_else(|| StoreError::not_found("tile", id))
    }

    pub fn delete_tile(&self, id: &str) -> Result<()> {
        let n = self
            .conn
            .execute("DELETE FROM tiles WHERE tile_id = ?1", params![id])?;
        if n == 0 {
            return Err(StoreError::not_found("tile", id));
        }
        Ok(())
    }
}

// ── Cobbles ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub struct NewCobble {
    pub block_id: Option<String>,
    pub slid: Option<String>,
    pub stone_type: Option<String>,
    pub length_mm: Option<f64>,
    pub width_mm: Option<f64>,
    pub height_mm: Option<f64>,
    pub shape: Option<String>,
    pub finish: Option<String>,
    pub pieces_count: Option<i64>,
    pub batch_id: Option<String>,
    pub yard_location: Option<String>,
    pub status: Option<String>,
    pub qc_status: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct CobblePatch {
    pub block_id: Option<String>,
    pub slid: Option<String>,
    pub stone_type: Option<String>,
    pub source: Option<String>,
    pub length_mm: Option<f64>,
    pub width_mm: Option<f64>,
    pub height_mm: Option<f64>,
    pub shape: Option<String>,
    pub finish: Option<String>,
    pub pieces_count: Option<i64>,
    pub batch_id: Option<String>,
    pub yard_location: Option<String>,
    pub status: Option<String>,
    pub qc_status: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CobbleRecord {
    pub cobble_id: String,
    pub block_id: Option<String>,
    pub slid: Option<String>,
    pub source: Option<String>,
    pub length_mm: Option<f64>,
    pub width_mm: Option<f64>,
    pub height_mm: Option<f64>,
    pub shape: Option<String>,
    pub finish: Option<String>,
    pub pieces_count: Option<i64>,
    pub batch_id: Option<String>,
    pub yard_location: Option<String>,
    pub status: Option<String>,
    pub qc_status: Option<String>,
}

fn row_to_cobble(row: &rusqlite::Row<'_>) -> rusqlite::Result<CobbleRecord> {
    Ok(CobbleRecord {
        cobble_id: row.get(0)?,
        block_id: row.get(1)?,
        slid: row.get(2)?,
        source: row.get(3)?,
        length_mm: row.get(4)?,
        width_mm: row.get(5)?,
        height_mm: row.get(6)?,
        shape: row.get(7)?,
        finish: row.get(8)?,
        pieces_count: row.get(9)?,
        batch_id: row.get(10)?,
        yard_location: row.get(11)?,
        status: row.get(12)?,
        qc_status: row.get(13)?,
    })
}

const COBBLE_SELECT: &str = "SELECT cobble_id, block_id, slid, source, length_mm, width_mm, \
     height_mm, shape, finish, pieces_count, batch_id, yard_location, status, qc_status \
     FROM cobbles";

impl InventoryDb {
    pub fn create_cobble(&self, new: &NewCobble) -> Result<String> {
        let tx = self.conn.unchecked_transaction()?;
        let src = self.resolve_derived_source(
            ProductFamily::Cobbles,
            new.block_id.as_deref(),
            new.slid.as_deref(),
            new.stone_type.as_deref(),
            None,
        )?;
        let id = product_id(ProductFamily::Cobbles);
        tx.execute(
            "INSERT INTO cobbles (cobble_id, block_id, slid, source, length_mm, width_mm, \
             height_mm, shape, finish, pieces_count, batch_id, yard_location, status, qc_status) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                id,
                src.block_id,
                src.slid,
                src.source,
                new.length_mm,
                new.width_mm,
                new.height_mm,
                new.shape,
                new.finish,
                new.pieces_count,
                new.batch_id,
                new.yard_location,
                new.status,
                new.qc_status,
            ],
        )?;
        tx.commit()?;
        tracing::info!(cobble_id = %id, slid = ?src.slid, "cobble created");
        Ok(id)
    }

    pub fn get_cobble(&self, id: &str) -> Result<Option<CobbleRecord>> {
        let sql = format!("{COBBLE_SELECT} WHERE cobble_id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], row_to_cobble)
            .optional()?)
    }

    pub fn list_cobbles(&self) -> Result<Vec<CobbleRecord>> {
        let sql = format!("{COBBLE_SELECT} ORDER BY cobble_id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_cobble)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    pub fn update_cobble(&self, id: &str, patch: &CobblePatch) -> Result<CobbleRecord> {
        let tx = self.conn.unchecked_transaction()?;
        let existing = self
            .get_cobble(id)?
            .ok_or_else(|| StoreError::not_found("cobble", id))?;
        if patch.source.is_some() {
            return Err(StoreError::SourceReadOnly { id: id.to_string() });
        }
        let (block_id, slid, source) = if patch.slid.is_some() || patch.block_id.is_some() {
            let (block_in, slid_in) = Self::merged_source(
                patch.block_id.as_deref(),
                patch.slid.as_deref(),
                existing.block_id.as_deref(),
                existing.slid.as_deref(),
            );
            let src = self.resolve_derived_source(
                ProductFamily::Cobbles,
                block_in,
                slid_in,
                patch.stone_type.as_deref(),
                Some(("cobbles", id)),
            )?;
            (src.block_id, src.slid, Some(src.source.to_string()))
        } else {
            (existing.block_id.clone(), existing.slid.clone(), existing.source.clone())
        };

        tx.execute(
            "UPDATE cobbles SET block_id = ?1, slid = ?2, source = ?3, length_mm = ?4, \
             width_mm = ?5, height_mm = ?6, shape = ?7, finish = ?8, pieces_count = ?9, \
             batch_id = ?10, yard_location = ?11, status = ?12, qc_status = ?13 \
             WHERE cobble_id = ?14",
            params![
                block_id,
                slid,
                source,
                patch.length_mm.or(existing.length_mm),
                patch.width_mm.or(existing.width_mm),
                patch.height_mm.or(existing.height_mm),
                patch.shape.as_deref().or(existing.shape.as_deref()),
                patch.finish.as_deref().or(existing.finish.as_deref()),
                patch.pieces_count.or(existing.pieces_count),
                patch.batch_id.as_deref().or(existing.batch_id.as_deref()),
                patch
                    .yard_location
                    .as_deref()
                    .or(existing.yard_location.as_deref()),
                patch.status.as_deref().or(existing.status.as_deref()),
                patch.qc_status.as_deref().or(existing.qc_status.as_deref()),
                id,
            ],
        )?;
        tx.commit()?;
        self.get_cobble(id)?
            .ok_or_else(|| StoreError::not_found("cobble", id))
    }

    pub fn delete_cobble(&self, id: &str) -> Result<()> {
        let n = self
            .conn
            .execute("DELETE FROM cobbles WHERE cobble_id = ?1", params![id])?;
        if n == 0 {
            return Err(StoreError::not_found("cobble", id));
        }
        Ok(())
    }
}

// ── Monuments ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub struct NewMonument {
    pub block_id: Option<String>,
    pub slid: Option<String>,
    pub stone_type: Option<String>,
    pub length_mm: Option<f64>,
    pub width_mm: Option<f64>,
    pub height_mm: Option<f64>,
    pub style: Option<String>,
    pub customer: Option<String>,
    pub order_no: Option<String>,
    pub batch_id: Option<String>,
    pub yard_location: Option<String>,
    pub status: Option<String>,
    pub qc_status: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct MonumentPatch {
    pub block_id: Option<String>,
    pub slid: Option<String>,
    pub stone_type: Option<String>,
    pub source: Option<String>,
    pub length_mm: Option<f64>,
    pub width_mm: Option<f64>,
    pub height_mm: Option<f64>,
    pub style: Option<String>,
    pub customer: Option<String>,
    pub order_no: Option<String>,
    pub batch_id: Option<String>,
    pub yard_location: Option<String>,
    pub status: Option<String>,
    pub qc_status: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MonumentRecord {
    pub monument_id: String,
    pub block_id: Option<String>,
    pub slid: Option<String>,
    pub source: Option<String>,
    pub length_mm: Option<f64>,
    pub width_mm: Option<f64>,
    pub height_mm: Option<f64>,
    pub style: Option<String>,
    pub customer: Option<String>,
    pub order_no: Option<String>,
    pub batch_id: Option<String>,
    pub yard_location: Option<String>,
    pub status: Option<String>,
    pub qc_status: Option<String>,
}

fn row_to_monument(row: &rusqlite::Row<'_>) -> rusqlite::Result<MonumentRecord> {
    Ok(MonumentRecord {
        monument_id: row.get(0)?,
        block_id: row.get(1)?,
        slid: row.get(2)?,
        source: row.get(3)?,
        length_mm: row.get(4)?,
        width_mm: row.get(5)?,
        height_mm: row.get(6)?,
        style: row.get(7)?,
        customer: row.get(8)?,
        order_no: row.get(9)?,
        batch_id: row.get(10)?,
        yard_location: row.get(11)?,
        status: row.get(12)?,
        qc_status: row.get(13)?,
    })
}

const MONUMENT_SELECT: &str = "SELECT monument_id, block_id, slid, source, length_mm, width_mm, \
     height_mm, style, customer, order_no, batch_id, yard_location, status, qc_status \
     FROM monuments";

impl InventoryDb {
    pub fn create_monument(&self, new: &NewMonument) -> Result<String> {
        let tx = self.conn.unchecked_transaction()?;
        let src = self.resolve_derived_source(
            ProductFamily::Monuments,
            new.block_id.as_deref(),
            new.slid.as_deref(),
            new.stone_type.as_deref(),
            None,
        )?;
        let id = product_id(ProductFamily::Monuments);
        tx.execute(
            "INSERT INTO monuments (monument_id, block_id, slid, source, length_mm, width_mm, \
             height_mm, style, customer, order_no, batch_id, yard_location, status, qc_status) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                id,
                src.block_id,
                src.slid,
                src.source,
                new.length_mm,
                new.width_mm,
                new.height_mm,
                new.style,
                new.customer,
                new.order_no,
                new.batch_id,
                new.yard_location,
                new.status,
                new.qc_status,
            ],
        )?;
        tx.commit()?;
        tracing::info!(monument_id = %id, slid = ?src.slid, "monument created");
        Ok(id)
    }

    pub fn get_monument(&self, id: &str) -> Result<Option<MonumentRecord>> {
        let sql = format!("{MONUMENT_SELECT} WHERE monument_id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], row_to_monument)
            .optional()?)
    }

    pub fn list_monuments(&self) -> Result<Vec<MonumentRecord>> {
        let sql = format!("{MONUMENT_SELECT} ORDER BY monument_id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_monument)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    pub fn update_monument(&self, id: &str, patch: &MonumentPatch) -> Result<MonumentRecord> {
        let tx = self.conn.unchecked_transaction()?;
        let existing = self
            .get_monument(id)?
            .ok_or_else(|| StoreError::not_found("monument", id))?;
        if patch.source.is_some() {
            return Err(StoreError::SourceReadOnly { id: id.to_string() });
        }
        let (block_id, slid, source) = if patch.slid.is_some() || patch.block_id.is_some() {
            let (block_in, slid_in) = Self::merged_source(
                patch.block_id.as_deref(),
                patch.slid.as_deref(),
                existing.block_id.as_deref(),
                existing.slid.as_deref(),
            );
            let src = self.resolve_derived_source(
                ProductFamily::Monuments,
                block_in,
                slid_in,
                patch.stone_type.as_deref(),
                Some(("monuments", id)),
            )?;
            (src.block_id, src.slid, Some(src.source.to_string()))
        } else {
            (existing.block_id.clone(), existing.slid.clone(), existing.source.clone())
        };

        tx.execute(
            "UPDATE monuments SET block_id = ?1, slid = ?2, source = ?3, length_mm = ?4, \
             width_mm = ?5, height_mm = ?6, style = ?7, customer = ?8, order_no = ?9, \
             batch_id = ?10, yard_location = ?11, status = ?12, qc_status = ?13 \
             WHERE monument_id = ?14",
            params![
                block_id,
                slid,
                source,
                patch.length_mm.or(existing.length_mm),
                patch.width_mm.or(existing.width_mm),
                patch.height_mm.or(existing.height_mm),
                patch.style.as_deref().or(existing.style.as_deref()),
                patch.customer.as_deref().or(existing.customer.as_deref()),
                patch.order_no.as_deref().or(existing.order_no.as_deref()),
                patch.batch_id.as_deref().or(existing.batch_id.as_deref()),
                patch
                    .yard_location
                    .as_deref()
                    .or(existing.yard_location.as_deref()),
                patch.status.as_deref().or(existing.status.as_deref()),
                patch.qc_status.as_deref().or(existing.qc_status.as_deref()),
                id,
            ],
        )?;
        tx.commit()?;
        self.get_monument(id)?
            .ok_or_else(|| StoreError::not_found("monument", id))
    }

    pub fn delete_monument(&self, id: &str) -> Result<()> {
        let n = self
            .conn
            .execute("DELETE FROM monuments WHERE monument_id = ?1", params![id])?;
        if n == 0 {
            return Err(StoreError::not_found("monument", id));
        }
        Ok(())
    }
}

// ── Pavers ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub struct NewPaver {
    pub block_id: Option<String>,
    pub slid: Option<String>,
    pub stone_type: Option<String>,
    pub thickness_mm: Option<f64>,
    pub length_mm: Option<f64>,
    pub width_mm: Option<f64>,
    pub height_mm: Option<f64>,
    pub finish: Option<String>,
    pub pattern: Option<String>,
    pub pieces_count: Option<i64>,
    pub batch_id: Option<String>,
    pub yard_location: Option<String>,
    pub status: Option<String>,
    pub qc_status: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct PaverPatch {
    pub block_id: Option<String>,
    pub slid: Option<String>,
    pub stone_type: Option<String>,
    pub source: Option<String>,
    pub thickness_mm: Option<f64>,
    pub length_mm: Option<f64>,
    pub width_mm: Option<f64>,
    pub height_mm: Option<f64>,
    pub finish: Option<String>,
    pub pattern: Option<String>,
    pub pieces_count: Option<i64>,
    pub batch_id: Option<String>,
    pub yard_location: Option<String>,
    pub status: Option<String>,
    pub qc_status: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaverRecord {
    pub paver_id: String,
    pub block_id: Option<String>,
    pub slid: Option<String>,
    pub source: Option<String>,
    pub thickness_mm: Option<f64>,
    pub length_mm: Option<f64>,
    pub width_mm: Option<f64>,
    pub height_mm: Option<f64>,
    pub finish: Option<String>,
    pub pattern: Option<String>,
    pub pieces_count: Option<i64>,
    pub batch_id: Option<String>,
    pub yard_location: Option<String>,
    pub status: Option<String>,
    pub qc_status: Option<String>,
}

fn row_to_paver(row: &rusqlite::Row<'_>) -> rusqlite::Result<PaverRecord> {
    Ok(PaverRecord {
        paver_id: row.get(0)?,
        block_id: row.get(1)?,
        slid: row.get(2)?,
        source: row.get(3)?,
        thickness_mm: row.get(4)?,
        length_mm: row.get(5)?,
        width_mm: row.get(6)?,
        height_mm: row.get(7)?,
        finish: row.get(8)?,
        pattern: row.get(9)?,
        pieces_count: row.get(10)?,
        batch_id: row.get(11)?,
        yard_location: row.get(12)?,
        status: row.get(13)?,
        qc_status: row.get(14)?,
    })
}

const PAVER_SELECT: &str = "SELECT paver_id, block_id, slid, source, thickness_mm, length_mm, \
     width_mm, height_mm, finish, pattern, pieces_count, batch_id, yard_location, status, \
     qc_status FROM pavers";

impl InventoryDb {
    pub fn create_paver(&self, new: &NewPaver) -> Result<String> {
        let tx = self.conn.unchecked_transaction()?;
        let src = self.resolve_derived_source(
            ProductFamily::Pavers,
            new.block_id.as_deref(),
            new.slid.as_deref(),
            new.stone_type.as_deref(),
            None,
        )?;
        let id = product_id(ProductFamily::Pavers);
        tx.execute(
            "INSERT INTO pavers (paver_id, block_id, slid, source, thickness_mm, length_mm, \
             width_mm, height_mm, finish, pattern, pieces_count, batch_id, yard_location, \
             status, qc_status) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                id,
                src.block_id,
                src.slid,
                src.source,
                new.thickness_mm,
                new.length_mm,
                new.width_mm,
                new.height_mm,
                new.finish,
                new.pattern,
                new.pieces_count,
                new.batch_id,
                new.yard_location,
                new.status,
                new.qc_status,
            ],
        )?;
        tx.commit()?;
        tracing::info!(paver_id = %id, slid = ?src.slid, "paver created");
        Ok(id)
    }

    pub fn get_paver(&self, id: &str) -> Result<Option<PaverRecord>> {
        let sql = format!("{PAVER_SELECT} WHERE paver_id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], row_to_paver)
            .optional()?)
    }

    pub fn list_pavers(&self) -> Result<Vec<PaverRecord>> {
        let sql = format!("{PAVER_SELECT} ORDER BY paver_id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_paver)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    pub fn update_paver(&self, id: &str, patch: &PaverPatch) -> Result<PaverRecord> {
        let tx = self.conn.unchecked_transaction()?;
        let existing = self
            .get_paver(id)?
            .ok_or_else(|| StoreError::not_found("paver", id))?;
        if patch.source.is_some() {
            return Err(StoreError::SourceReadOnly { id: id.to_string() });
        }
        let (block_id, slid, source) = if patch.slid.is_some() || patch.block_id.is_some() {
            let (block_in, slid_in) = Self::merged_source(
                patch.block_id.as_deref(),
                patch.slid.as_deref(),
                existing.block_id.as_deref(),
                existing.slid.as_deref(),
            );
            let src = self.resolve_derived_source(
                ProductFamily::Pavers,
                block_in,
                slid_in,
                patch.stone_type.as_deref(),
                Some(("pavers", id)),
            )?;
            (src.block_id, src.slid, Some(src.source.to_string()))
        } else {
            (existing.block_id.clone(), existing.slid.clone(), existing.source.clone())
        };

        tx.execute(
            "UPDATE pavers SET block_id = ?1, slid = ?2, source = ?3, thickness_mm = ?4, \
             length_mm = ?5, width_mm = ?6, height_mm = ?7, finish = ?8, pattern = ?9, \
             pieces_count = ?10, batch_id = ?11, yard_location = ?12, status = ?13, \
             qc_status = ?14 WHERE paver_id = ?15",
            params![
                block_id,
                slid,
                source,
                patch.thickness_mm.or(existing.thickness_mm),
                patch.length_mm.or(existing.length_mm),
                patch.width_mm.or(existing.width_mm),
                patch.height_mm.or(existing.height_mm),
                patch.finish.as_deref().or(existing.finish.as_deref()),
                patch.pattern.as_deref().or(existing.pattern.as_deref()),
                patch.pieces_count.or(existing.pieces_count),
                patch.batch_id.as_deref().or(existing.batch_id.as_deref()),
                patch
                    .yard_location
                    .as_deref()
                    .or(existing.yard_location.as_deref()),
                patch.status.as_deref().or(existing.status.as_deref()),
                patch.qc_status.as_deref().or(existing.qc_status.as_deref()),
                id,
            ],
        )?;
        tx.commit()?;
        self.get_paver(id)?
            .ok_or_else(|| StoreError::not_found("paver", id))
    }

    pub fn delete_paver(&self, id: &str) -> Result<()> {
        let n = self
            .conn
            .execute("DELETE FROM pavers WHERE paver_id = ?1", params![id])?;
        if n == 0 {
            return Err(StoreError::not_found("paver", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::NewBlock;
    use crate::qbids::NewQbid;
    use crate::slabs::{NewSlab, SlabPatch};

    /// One QBID, one block, one slab with the given stone type.
    fn slab_with_stone(db: &InventoryDb, stone: Option<&str>) -> (String, String) {
        let qbid = db
            .create_qbid(&NewQbid {
                material_type: Some("Paradiso Multi".into()),
                splitable_blk_count: Some(2),
                ..Default::default()
            })
            .unwrap();
        let block = db.split_blocks(&qbid, &[], None).unwrap().remove(0);
        let slid = db
            .create_slab(&NewSlab {
                block_id: block.clone(),
                stone_type: stone.map(String::from),
                ..Default::default()
            })
            .unwrap();
        (block, slid)
    }

    // ── Stone-type presence ─────────────────────────────────────────────

    #[test]
    fn test_tile_requires_slab_stone_type() {
        let db = InventoryDb::in_memory().unwrap();
        let (_, slid) = slab_with_stone(&db, None);
        assert!(matches!(
            db.create_tile(&NewTile {
                slid: Some(slid),
                ..Default::default()
            }),
            Err(StoreError::SlabStoneTypeRequired {
                family: ProductFamily::Tiles,
                ..
            })
        ));
    }

    #[test]
    fn test_monument_exempt_from_stone_type_requirement() {
        let db = InventoryDb::in_memory().unwrap();
        let (_, slid) = slab_with_stone(&db, None);
        let id = db
            .create_monument(&NewMonument {
                slid: Some(slid.clone()),
                ..Default::default()
            })
            .unwrap();
        assert!(id.starts_with("MON-"));
        let rec = db.get_monument(&id).unwrap().unwrap();
        assert_eq!(rec.slid.as_deref(), Some(slid.as_str()));
        assert_eq!(rec.source.as_deref(), Some("slab"));
    }

    // ── Reservation & mismatch ──────────────────────────────────────────

    #[test]
    fn test_reserved_slab_rejects_other_family() {
        let db = InventoryDb::in_memory().unwrap();
        let (_, slid) = slab_with_stone(&db, Some("cobbles"));
        assert!(matches!(
            db.create_tile(&NewTile {
                slid: Some(slid.clone()),
                ..Default::default()
            }),
            Err(StoreError::SlabReserved { .. })
        ));
        // The reserving family itself may use it.
        db.create_cobble(&NewCobble {
            slid: Some(slid),
            ..Default::default()
        })
        .unwrap();
    }

    #[test]
    fn test_caller_stone_type_must_match_slab() {
        let db = InventoryDb::in_memory().unwrap();
        let (_, slid) = slab_with_stone(&db, Some("granite"));
        assert!(matches!(
            db.create_tile(&NewTile {
                slid: Some(slid.clone()),
                stone_type: Some("marble".into()),
                ..Default::default()
            }),
            Err(StoreError::StoneTypeMismatch { .. })
        ));
        // Case-insensitive match passes.
        db.create_tile(&NewTile {
            slid: Some(slid),
            stone_type: Some("GRANITE".into()),
            ..Default::default()
        })
        .unwrap();
    }

    // ── Exclusivity ─────────────────────────────────────────────────────

    #[test]
    fn test_one_slab_one_product_across_families() {
        let db = InventoryDb::in_memory().unwrap();
        let (_, slid) = slab_with_stone(&db, Some("granite"));
        db.create_tile(&NewTile {
            slid: Some(slid.clone()),
            ..Default::default()
        })
        .unwrap();
        assert!(matches!(
            db.create_paver(&NewPaver {
                slid: Some(slid.clone()),
                ..Default::default()
            }),
            Err(StoreError::SlabInUse { .. })
        ));
        // Same family too.
        assert!(matches!(
            db.create_tile(&NewTile {
                slid: Some(slid),
                ..Default::default()
            }),
            Err(StoreError::SlabInUse { .. })
        ));
    }

    #[test]
    fn test_update_does_not_collide_with_itself() {
        let db = InventoryDb::in_memory().unwrap();
        let (block, slid) = slab_with_stone(&db, Some("granite"));
        let id = db
            .create_tile(&NewTile {
                slid: Some(slid.clone()),
                ..Default::default()
            })
            .unwrap();
        // Re-pointing at its own slab (via the block field) is a no-op, not
        // a conflict.
        let rec = db
            .update_tile(
                &id,
                &TilePatch {
                    slid: Some(slid.clone()),
                    block_id: Some(block),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(rec.slid.as_deref(), Some(slid.as_str()));
    }

    #[test]
    fn test_update_to_used_slab_rejected() {
        let db = InventoryDb::in_memory().unwrap();
        let (_, s1) = slab_with_stone(&db, Some("granite"));
        let (_, s2) = slab_with_stone(&db, Some("granite"));
        db.create_tile(&NewTile {
            slid: Some(s1.clone()),
            ..Default::default()
        })
        .unwrap();
        let id = db
            .create_tile(&NewTile {
                slid: Some(s2),
                ..Default::default()
            })
            .unwrap();
        assert!(matches!(
            db.update_tile(
                &id,
                &TilePatch {
                    slid: Some(s1),
                    ..Default::default()
                }
            ),
            Err(StoreError::SlabInUse { .. })
        ));
    }

    // ── Source shapes ───────────────────────────────────────────────────

    #[test]
    fn test_block_mismatch_rejected() {
        let db = InventoryDb::in_memory().unwrap();
        let (_, slid) = slab_with_stone(&db, Some("granite"));
        db.create_block(&NewBlock {
            block_id: "BLK-OTHER-00001-A".into(),
            ..Default::default()
        })
        .unwrap();
        assert!(matches!(
            db.create_tile(&NewTile {
                slid: Some(slid),
                block_id: Some("BLK-OTHER-00001-A".into()),
                ..Default::default()
            }),
            Err(StoreError::BlockMismatch { .. })
        ));
    }

    #[test]
    fn test_block_only_path_rejects_block_with_slabs() {
        let db = InventoryDb::in_memory().unwrap();
        let (block, _) = slab_with_stone(&db, Some("granite"));
        assert!(matches!(
            db.create_tile(&NewTile {
                block_id: Some(block),
                ..Default::default()
            }),
            Err(StoreError::BlockHasSlabs { .. })
        ));
    }

    #[test]
    fn test_block_only_path_allowed_without_slabs() {
        let db = InventoryDb::in_memory().unwrap();
        db.create_block(&NewBlock {
            block_id: "BLK-FREE-00001-A".into(),
            ..Default::default()
        })
        .unwrap();
        let id = db
            .create_cobble(&NewCobble {
                block_id: Some("BLK-FREE-00001-A".into()),
                ..Default::default()
            })
            .unwrap();
        let rec = db.get_cobble(&id).unwrap().unwrap();
        assert_eq!(rec.source.as_deref(), Some("block"));
        assert!(rec.slid.is_none());
    }

    #[test]
    fn test_source_requires_block_or_slid() {
        let db = InventoryDb::in_memory().unwrap();
        assert!(matches!(
            db.create_paver(&NewPaver::default()),
            Err(StoreError::Invalid { .. })
        ));
    }

    #[test]
    fn test_source_field_read_only_after_create() {
        let db = InventoryDb::in_memory().unwrap();
        let (_, slid) = slab_with_stone(&db, Some("granite"));
        let id = db
            .create_tile(&NewTile {
                slid: Some(slid),
                ..Default::default()
            })
            .unwrap();
        assert!(matches!(
            db.update_tile(
                &id,
                &TilePatch {
                    source: Some("block".into()),
                    ..Default::default()
                }
            ),
            Err(StoreError::SourceReadOnly { .. })
        ));
    }

    #[test]
    fn test_freed_slab_usable_after_product_delete() {
        let db = InventoryDb::in_memory().unwrap();
        let (_, slid) = slab_with_stone(&db, Some("granite"));
        let id = db
            .create_tile(&NewTile {
                slid: Some(slid.clone()),
                ..Default::default()
            })
            .unwrap();
        db.delete_tile(&id).unwrap();
        db.create_paver(&NewPaver {
            slid: Some(slid),
            ..Default::default()
        })
        .unwrap();
    }

    #[test]
    fn test_slab_stone_type_editable_until_reserved_conflict() {
        let db = InventoryDb::in_memory().unwrap();
        let (_, slid) = slab_with_stone(&db, None);
        // Marking the slab reserves it for one family.
        db.update_slab(
            &slid,
            &SlabPatch {
                stone_type: Some("monuments".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(matches!(
            db.create_cobble(&NewCobble {
                slid: Some(slid.clone()),
                ..Default::default()
            }),
            Err(StoreError::SlabReserved { .. })
        ));
        db.create_monument(&NewMonument {
            slid: Some(slid),
            ..Default::default()
        })
        .unwrap();
    }
}
