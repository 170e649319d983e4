//! Block tier: splitting a QBID into blocks, gap-filling generation,
//! direct block CRUD, and the cascading block delete.
//!
//! The split and generate paths never renumber survivors: sequence numbers
//! are recovered by parsing the identifiers already under the parent, so a
//! deleted block frees its slot and a repeated generate only fills holes.

use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};

use stoneyard_types::{
    BlockIdStyle, ParsedQbid, alloc, block_id_for, legacy_block_id, qbid_base, short_code,
};

use crate::db::InventoryDb;
use crate::error::{Result, StoreError};
use crate::qbids::QbidRecord;

/// Per-child overrides for [`InventoryDb::split_blocks`].
#[derive(Clone, Debug, Default)]
pub struct BlockSeed {
    pub grade: Option<String>,
    pub length_mm: Option<f64>,
    pub width_mm: Option<f64>,
    pub height_mm: Option<f64>,
    pub yard_location: Option<String>,
    pub notes: Option<String>,
}

/// Input for [`InventoryDb::create_block`]: a caller-chosen identifier plus
/// optional descriptive fields.
#[derive(Clone, Debug, Default)]
pub struct NewBlock {
    pub block_id: String,
    pub parent_qbid: Option<String>,
    pub grade: Option<String>,
    pub material: Option<String>,
    pub description: Option<String>,
    pub receipt_id: Option<String>,
    pub receipt_date: Option<String>,
    pub source_id: Option<String>,
    pub source_name: Option<String>,
    pub length_mm: Option<f64>,
    pub width_mm: Option<f64>,
    pub height_mm: Option<f64>,
    pub no_slabs: Option<i64>,
    pub no_wastage_slabs: Option<i64>,
    pub yard_location: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// Partial update for [`InventoryDb::update_block`]. `None` keeps the
/// stored value; `parent_qbid` re-parents and maintains the lineage link.
#[derive(Clone, Debug, Default)]
pub struct BlockPatch {
    pub parent_qbid: Option<String>,
    pub grade: Option<String>,
    pub material: Option<String>,
    pub description: Option<String>,
    pub receipt_id: Option<String>,
    pub receipt_date: Option<String>,
    pub source_id: Option<String>,
    pub source_name: Option<String>,
    pub length_mm: Option<f64>,
    pub width_mm: Option<f64>,
    pub height_mm: Option<f64>,
    pub no_slabs: Option<i64>,
    pub no_wastage_slabs: Option<i64>,
    pub yard_location: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// A block row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockRecord {
    pub block_id: String,
    pub parent_qbid: Option<String>,
    pub grade: Option<String>,
    pub short_code: Option<String>,
    pub receipt_id: Option<String>,
    pub receipt_date: Option<String>,
    pub source_id: Option<String>,
    pub source_name: Option<String>,
    pub material: Option<String>,
    pub description: Option<String>,
    pub length_mm: Option<f64>,
    pub width_mm: Option<f64>,
    pub height_mm: Option<f64>,
    pub volume_m3: Option<f64>,
    pub no_slabs: Option<i64>,
    pub no_wastage_slabs: Option<i64>,
    pub yard_location: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

const BLOCK_SELECT: &str = "SELECT b.block_id, b.parent_qbid, b.grade, b.short_code, \
     b.receipt_id, b.receipt_date, b.source_id, b.source_name, \
     COALESCE(b.material, m.name), b.description, \
     b.length_mm, b.width_mm, b.height_mm, b.volume_m3, \
     b.no_slabs, b.no_wastage_slabs, b.yard_location, b.status, b.notes \
     FROM blocks b \
     LEFT JOIN qbids q ON b.parent_qbid = q.qbid \
     LEFT JOIN materials m ON q.material_id = m.id";

fn row_to_block(row: &rusqlite::Row<'_>) -> rusqlite::Result<BlockRecord> {
    Ok(BlockRecord {
        block_id: row.get(0)?,
        parent_qbid: row.get(1)?,
        grade: row.get(2)?,
        short_code: row.get(3)?,
        receipt_id: row.get(4)?,
        receipt_date: row.get(5)?,
        source_id: row.get(6)?,
        source_name: row.get(7)?,
        material: row.get(8)?,
        description: row.get(9)?,
        length_mm: row.get(10)?,
        width_mm: row.get(11)?,
        height_mm: row.get(12)?,
        volume_m3: row.get(13)?,
        no_slabs: row.get(14)?,
        no_wastage_slabs: row.get(15)?,
        yard_location: row.get(16)?,
        status: row.get(17)?,
        notes: row.get(18)?,
    })
}

fn volume_of(length: Option<f64>, width: Option<f64>, height: Option<f64>) -> Option<f64> {
    match (length, width, height) {
        (Some(l), Some(w), Some(h)) if l > 0.0 && w > 0.0 && h > 0.0 => Some(l * w * h / 1e9),
        _ => None,
    }
}

fn parent_material(parent: &QbidRecord) -> Option<String> {
    parent
        .material_name
        .clone()
        .or_else(|| parent.material_type.clone())
}

impl InventoryDb {
    /// Short code for a parent's material, preferring the persisted
    /// `materials.short_code` over recomputation from the name; pre-grammar
    /// rows were labeled with the persisted code.
    fn material_short_of(&self, parent: &QbidRecord, material: Option<&str>) -> Result<String> {
        let persisted = match parent.material_id {
            Some(id) => self.get_material(id)?,
            None => match material {
                Some(name) => self.find_material_by_name(name)?,
                None => None,
            },
        };
        if let Some(code) = persisted.and_then(|m| m.short_code) {
            let code = code.trim().to_string();
            if !code.is_empty() {
                return Ok(code);
            }
        }
        Ok(short_code(material.unwrap_or("")))
    }

    /// Split a QBID into its blocks in one shot.
    ///
    /// Rejected once any child exists. With no seeds, one empty seed per
    /// capacity slot is used (a single seed when no cap is set). Identifiers
    /// run 1..=n in the requested style, letter by default.
    pub fn split_blocks(
        &self,
        qbid: &str,
        seeds: &[BlockSeed],
        style: Option<BlockIdStyle>,
    ) -> Result<Vec<String>> {
        let parent = self
            .get_qbid(qbid)?
            .ok_or_else(|| StoreError::not_found("qbid", qbid))?;

        let existing = self.count_blocks_of(qbid)?;
        if existing > 0 {
            return Err(StoreError::AlreadySplit {
                qbid: qbid.to_string(),
                existing,
            });
        }

        let cap = parent.splitable_blk_count.filter(|c| *c >= 1);
        let seeds: Vec<BlockSeed> = if seeds.is_empty() {
            vec![BlockSeed::default(); cap.unwrap_or(1) as usize]
        } else {
            seeds.to_vec()
        };
        if let Some(cap) = cap {
            if seeds.len() as i64 > cap {
                return Err(StoreError::CapacityExceeded {
                    qbid: qbid.to_string(),
                    cap,
                    have: seeds.len() as i64,
                });
            }
        }

        let style = style.unwrap_or_default();
        let material = parent_material(&parent);
        let short = self.material_short_of(&parent, material.as_deref())?;
        let block_short = material.as_ref().map(|_| short.clone());

        let tx = self.conn.unchecked_transaction()?;
        let mut created = Vec::with_capacity(seeds.len());
        for (i, seed) in seeds.iter().enumerate() {
            let seq = i as u32 + 1;
            let block_id = block_id_for(qbid, seq, style)
                .unwrap_or_else(|| legacy_block_id(&short, qbid, seq));
            let volume = volume_of(seed.length_mm, seed.width_mm, seed.height_mm);
            tx.execute(
                "INSERT INTO blocks (block_id, parent_qbid, grade, short_code, material, \
                 length_mm, width_mm, height_mm, volume_m3, yard_location, status, notes) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    block_id,
                    qbid,
                    seed.grade.as_deref().or(parent.grade.as_deref()),
                    block_short,
                    material,
                    seed.length_mm,
                    seed.width_mm,
                    seed.height_mm,
                    volume,
                    seed.yard_location,
                    "Dressed",
                    seed.notes,
                ],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO parent_child (parent_qbid, child_block_id) VALUES (?1, ?2)",
                params![qbid, block_id],
            )?;
            created.push(block_id);
        }
        tx.commit()?;

        tracing::info!(%qbid, count = created.len(), %style, "qbid split into blocks");
        Ok(created)
    }

    /// Fill the unoccupied block slots of a QBID up to its split cap.
    ///
    /// Occupied sequence numbers are recovered from the existing
    /// identifiers, so a deleted block's number is reissued and survivors
    /// keep theirs. Repeating the call on a full lineage reports
    /// [`StoreError::NoFreeSlots`].
    pub fn generate_blocks(&self, qbid: &str) -> Result<Vec<String>> {
        let parent = self
            .get_qbid(qbid)?
            .ok_or_else(|| StoreError::not_found("qbid", qbid))?;
        let cap = parent
            .splitable_blk_count
            .filter(|c| *c >= 1)
            .ok_or_else(|| StoreError::SplitCapUnset {
                qbid: qbid.to_string(),
            })?;

        let material = parent_material(&parent);
        let short = self.material_short_of(&parent, material.as_deref())?;
        let block_short = material.as_ref().map(|_| short.clone());

        let tx = self.conn.unchecked_transaction()?;
        let existing: Vec<String> = {
            let mut stmt = tx.prepare("SELECT block_id FROM blocks WHERE parent_qbid = ?1")?;
            let rows = stmt.query_map(params![qbid], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<_>>()?
        };
        let remaining = cap - existing.len() as i64;
        if remaining <= 0 {
            return Err(StoreError::NoFreeSlots {
                qbid: qbid.to_string(),
            });
        }

        let existing_refs = existing.iter().map(String::as_str);
        let candidates: Vec<String> = if ParsedQbid::parse(qbid).is_some() {
            let base = qbid_base(qbid);
            let style = alloc::block_style(existing.iter().map(String::as_str));
            alloc::missing_block_seqs(existing_refs, &base, cap as u32)
                .into_iter()
                .take(remaining as usize)
                .filter_map(|seq| block_id_for(qbid, seq, style))
                .collect()
        } else {
            // Parents predating the grammar get append-only letter IDs.
            let start = existing.len() as u32 + 1;
            (start..=cap as u32)
                .map(|i| legacy_block_id(&short, qbid, i))
                .collect()
        };

        let mut created = Vec::new();
        for block_id in candidates {
            let changed = tx.execute(
                "INSERT OR IGNORE INTO blocks (block_id, parent_qbid, grade, short_code, \
                 material, status) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    block_id,
                    qbid,
                    parent.grade,
                    block_short,
                    material,
                    "Dressed",
                ],
            )?;
            if changed == 1 {
                tx.execute(
                    "INSERT OR IGNORE INTO parent_child (parent_qbid, child_block_id) \
                     VALUES (?1, ?2)",
                    params![qbid, block_id],
                )?;
                created.push(block_id);
            }
        }
        tx.commit()?;

        tracing::info!(%qbid, count = created.len(), "blocks generated");
        Ok(created)
    }

    /// Insert a block with a caller-chosen identifier.
    pub fn create_block(&self, new: &NewBlock) -> Result<String> {
        let block_id = new.block_id.trim();
        if block_id.is_empty() {
            return Err(StoreError::invalid("block_id is required"));
        }
        if self.get_block(block_id)?.is_some() {
            return Err(StoreError::DuplicateId {
                id: block_id.to_string(),
            });
        }

        if let Some(parent) = new.parent_qbid.as_deref() {
            let rec = self
                .get_qbid(parent)?
                .ok_or_else(|| StoreError::not_found("qbid", parent))?;
            let cap = rec
                .splitable_blk_count
                .filter(|c| *c >= 1)
                .ok_or_else(|| StoreError::SplitCapUnset {
                    qbid: parent.to_string(),
                })?;
            let have = self.count_blocks_of(parent)?;
            if have >= cap {
                return Err(StoreError::CapacityExceeded {
                    qbid: parent.to_string(),
                    cap,
                    have: have + 1,
                });
            }
        }

        let volume = volume_of(new.length_mm, new.width_mm, new.height_mm);
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO blocks (block_id, parent_qbid, grade, short_code, receipt_id, \
             receipt_date, source_id, source_name, material, description, length_mm, width_mm, \
             height_mm, volume_m3, no_slabs, no_wastage_slabs, yard_location, status, notes) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, \
             ?17, ?18, ?19)",
            params![
                block_id,
                new.parent_qbid,
                new.grade,
                new.material.as_deref().map(short_code),
                new.receipt_id,
                new.receipt_date,
                new.source_id,
                new.source_name,
                new.material,
                new.description,
                new.length_mm,
                new.width_mm,
                new.height_mm,
                volume,
                new.no_slabs,
                new.no_wastage_slabs,
                new.yard_location,
                new.status.as_deref().unwrap_or("Dressed"),
                new.notes,
            ],
        )?;
        if let Some(parent) = new.parent_qbid.as_deref() {
            tx.execute(
                "INSERT OR IGNORE INTO parent_child (parent_qbid, child_block_id) VALUES (?1, ?2)",
                params![parent, block_id],
            )?;
        }
        tx.commit()?;

        tracing::info!(%block_id, parent = ?new.parent_qbid, "block created");
        Ok(block_id.to_string())
    }

    /// Get a block by id.
    pub fn get_block(&self, block_id: &str) -> Result<Option<BlockRecord>> {
        let sql = format!("{BLOCK_SELECT} WHERE b.block_id = ?1");
        let row = self
            .conn
            .query_row(&sql, params![block_id], row_to_block)
            .optional()?;
        Ok(row)
    }

    /// All blocks, by identifier.
    pub fn list_blocks(&self) -> Result<Vec<BlockRecord>> {
        let sql = format!("{BLOCK_SELECT} ORDER BY b.block_id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_block)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Blocks parented to a QBID, by identifier.
    pub fn children_of(&self, qbid: &str) -> Result<Vec<BlockRecord>> {
        let sql = format!("{BLOCK_SELECT} WHERE b.parent_qbid = ?1 ORDER BY b.block_id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![qbid], row_to_block)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Apply a patch to a block. Re-parenting keeps the lineage link table
    /// in step within the same transaction.
    pub fn update_block(&self, block_id: &str, patch: &BlockPatch) -> Result<BlockRecord> {
        let existing = self
            .get_block(block_id)?
            .ok_or_else(|| StoreError::not_found("block", block_id))?;

        let new_parent = match patch.parent_qbid.as_deref() {
            Some(p) if Some(p) != existing.parent_qbid.as_deref() => {
                if self.get_qbid(p)?.is_none() {
                    return Err(StoreError::not_found("qbid", p));
                }
                Some(p.to_string())
            }
            _ => None,
        };

        let merged_parent = new_parent
            .clone()
            .or_else(|| existing.parent_qbid.clone());
        let length = patch.length_mm.or(existing.length_mm);
        let width = patch.width_mm.or(existing.width_mm);
        let height = patch.height_mm.or(existing.height_mm);
        let volume = volume_of(length, width, height).or(existing.volume_m3);

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE blocks SET parent_qbid = ?1, grade = ?2, receipt_id = ?3, \
             receipt_date = ?4, source_id = ?5, source_name = ?6, material = ?7, \
             description = ?8, length_mm = ?9, width_mm = ?10, height_mm = ?11, \
             volume_m3 = ?12, no_slabs = ?13, no_wastage_slabs = ?14, yard_location = ?15, \
             status = ?16, notes = ?17 WHERE block_id = ?18",
            params![
                merged_parent,
                patch.grade.as_deref().or(existing.grade.as_deref()),
                patch.receipt_id.as_deref().or(existing.receipt_id.as_deref()),
                patch
                    .receipt_date
                    .as_deref()
                    .or(existing.receipt_date.as_deref()),
                patch.source_id.as_deref().or(existing.source_id.as_deref()),
                patch
                    .source_name
                    .as_deref()
                    .or(existing.source_name.as_deref()),
                patch.material.as_deref().or(existing.material.as_deref()),
                patch
                    .description
                    .as_deref()
                    .or(existing.description.as_deref()),
                length,
                width,
                height,
                volume,
                patch.no_slabs.or(existing.no_slabs),
                patch.no_wastage_slabs.or(existing.no_wastage_slabs),
                patch
                    .yard_location
                    .as_deref()
                    .or(existing.yard_location.as_deref()),
                patch.status.as_deref().or(existing.status.as_deref()),
                patch.notes.as_deref().or(existing.notes.as_deref()),
                block_id,
            ],
        )?;
        if let Some(new_parent) = &new_parent {
            if let Some(old_parent) = &existing.parent_qbid {
                tx.execute(
                    "DELETE FROM parent_child WHERE parent_qbid = ?1 AND child_block_id = ?2",
                    params![old_parent, block_id],
                )?;
            }
            tx.execute(
                "INSERT OR IGNORE INTO parent_child (parent_qbid, child_block_id) VALUES (?1, ?2)",
                params![new_parent, block_id],
            )?;
        }
        tx.commit()?;

        self.get_block(block_id)?
            .ok_or_else(|| StoreError::not_found("block", block_id))
    }

    /// Delete a block and everything made from it: slabs with their events
    /// and dispatches, plus every derived-product row of the block.
    pub fn delete_block(&self, block_id: &str) -> Result<()> {
        if self.get_block(block_id)?.is_none() {
            return Err(StoreError::not_found("block", block_id));
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM dispatches WHERE slid IN (SELECT slid FROM slabs WHERE block_id = ?1)",
            params![block_id],
        )?;
        tx.execute(
            "DELETE FROM slab_events WHERE slid IN (SELECT slid FROM slabs WHERE block_id = ?1)",
            params![block_id],
        )?;
        for table in ["tiles", "cobbles", "monuments", "pavers"] {
            tx.execute(
                &format!("DELETE FROM {table} WHERE block_id = ?1"),
                params![block_id],
            )?;
        }
        tx.execute("DELETE FROM slabs WHERE block_id = ?1", params![block_id])?;
        tx.execute(
            "DELETE FROM parent_child WHERE child_block_id = ?1",
            params![block_id],
        )?;
        tx.execute(
            "DELETE FROM events WHERE ref_type = 'blocks' AND ref_id = ?1",
            params![block_id],
        )?;
        tx.execute("DELETE FROM blocks WHERE block_id = ?1", params![block_id])?;
        tx.commit()?;

        tracing::info!(%block_id, "block deleted");
        Ok(())
    }
}
