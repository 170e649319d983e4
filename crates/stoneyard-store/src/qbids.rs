//! QBID lifecycle: creation with deterministic ID allocation, the derived
//! lock state, patch updates, and cascading deletion.
//!
//! A QBID is `OPEN` until any child block or slab exists, then `LOCKED`.
//! The state is never stored — it is recomputed from row existence at each
//! write, so a stale flag can never let an update slip through. Locked
//! QBIDs accept cost fields only; any other populated field rejects the
//! whole update with the offending names.

use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};

use stoneyard_types::{ParsedQbid, alloc, estimate_weight};

use crate::db::InventoryDb;
use crate::error::{Result, StoreError};
use crate::materials::Material;

/// Weight difference (kg) under which a resubmitted weight is assumed to be
/// a stale form value rather than a deliberate edit.
const WEIGHT_EDIT_TOLERANCE_KG: f64 = 5.0;

/// Input for [`InventoryDb::create_qbid`]. The identifier is allocated by
/// the store; everything else is optional.
#[derive(Clone, Debug, Default)]
pub struct NewQbid {
    pub supplier: Option<String>,
    pub supplier_id: Option<i64>,
    pub quarry: Option<String>,
    pub weight_kg: Option<f64>,
    pub size_mm: Option<String>,
    pub grade: Option<String>,
    pub received_date: Option<String>,
    pub material_type: Option<String>,
    pub material_id: Option<i64>,
    /// Explicit short-code override; skips derivation entirely.
    pub material_short: Option<String>,
    pub splitable_blk_count: Option<i64>,
    pub stone_type: Option<String>,
    pub gross_cost: Option<f64>,
    pub transport_cost: Option<f64>,
    pub other_cost: Option<f64>,
}

/// Partial update for [`InventoryDb::update_qbid`]. `None` keeps the
/// stored value.
#[derive(Clone, Debug, Default)]
pub struct QbidPatch {
    pub supplier: Option<String>,
    pub supplier_id: Option<i64>,
    pub quarry: Option<String>,
    pub weight_kg: Option<f64>,
    pub size_mm: Option<String>,
    pub grade: Option<String>,
    pub received_date: Option<String>,
    pub material_type: Option<String>,
    pub material_id: Option<i64>,
    pub splitable_blk_count: Option<i64>,
    pub stone_type: Option<String>,
    pub gross_cost: Option<f64>,
    pub transport_cost: Option<f64>,
    pub other_cost: Option<f64>,
    /// Opt out of weight auto-recompute when size or stone type changes.
    pub manual_weight: bool,
}

impl QbidPatch {
    /// Names of populated fields that a locked QBID refuses.
    fn locked_field_names(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut add = |set: bool, name: &str| {
            if set {
                out.push(name.to_string());
            }
        };
        add(self.supplier.is_some(), "supplier");
        add(self.supplier_id.is_some(), "supplier_id");
        add(self.quarry.is_some(), "quarry");
        add(self.weight_kg.is_some(), "weight_kg");
        add(self.size_mm.is_some(), "size_mm");
        add(self.grade.is_some(), "grade");
        add(self.received_date.is_some(), "received_date");
        add(self.material_type.is_some(), "material_type");
        add(self.material_id.is_some(), "material_id");
        add(self.splitable_blk_count.is_some(), "splitable_blk_count");
        add(self.stone_type.is_some(), "stone_type");
        out
    }

    fn has_cost_fields(&self) -> bool {
        self.gross_cost.is_some() || self.transport_cost.is_some() || self.other_cost.is_some()
    }
}

/// A QBID row with joined material and supplier names.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QbidRecord {
    pub qbid: String,
    pub supplier: Option<String>,
    pub supplier_id: Option<i64>,
    pub supplier_name: Option<String>,
    pub quarry: Option<String>,
    pub weight_kg: Option<f64>,
    pub size_mm: Option<String>,
    pub grade: Option<String>,
    pub received_date: Option<String>,
    pub material_type: Option<String>,
    pub material_id: Option<i64>,
    pub material_name: Option<String>,
    pub splitable_blk_count: Option<i64>,
    pub stone_type: Option<String>,
    pub gross_cost: Option<f64>,
    pub transport_cost: Option<f64>,
    pub other_cost: Option<f64>,
    pub total_cost: Option<f64>,
}

/// Derived lock state of a QBID, evaluated fresh from row existence.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct LockState {
    pub has_blocks: bool,
    pub has_slabs: bool,
    pub locked: bool,
}

/// A QBID with remaining block-generation capacity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationEligible {
    pub qbid: String,
    pub material_name: Option<String>,
    pub splitable_blk_count: i64,
    pub generated_blocks: i64,
    pub remaining_blocks: i64,
}

const QBID_SELECT: &str = "SELECT q.qbid, q.supplier, q.supplier_id, \
     COALESCE(s.name, q.supplier), q.quarry, q.weight_kg, q.size_mm, q.grade, \
     q.received_date, q.material_type, q.material_id, m.name, \
     q.splitable_blk_count, q.stone_type, \
     q.gross_cost, q.transport_cost, q.other_cost, q.total_cost \
     FROM qbids q \
     LEFT JOIN materials m ON q.material_id = m.id \
     LEFT JOIN suppliers s ON q.supplier_id = s.id";

fn row_to_qbid(row: &rusqlite::Row<'_>) -> rusqlite::Result<QbidRecord> {
    Ok(QbidRecord {
        qbid: row.get(0)?,
        supplier: row.get(1)?,
        supplier_id: row.get(2)?,
        supplier_name: row.get(3)?,
        quarry: row.get(4)?,
        weight_kg: row.get(5)?,
        size_mm: row.get(6)?,
        grade: row.get(7)?,
        received_date: row.get(8)?,
        material_type: row.get(9)?,
        material_id: row.get(10)?,
        material_name: row.get(11)?,
        splitable_blk_count: row.get(12)?,
        stone_type: row.get(13)?,
        gross_cost: row.get(14)?,
        transport_cost: row.get(15)?,
        other_cost: row.get(16)?,
        total_cost: row.get(17)?,
    })
}

impl InventoryDb {
    /// Create a QBID, allocating the next identifier in its material's
    /// namespace inside the insert transaction.
    ///
    /// Weight falls back to the size+stone estimate when the caller's value
    /// is absent or non-positive; costs default to zero and `total_cost`
    /// is always their sum.
    pub fn create_qbid(&self, new: &NewQbid) -> Result<String> {
        let (material_id, material) = self.resolve_material(new.material_id, new.material_type.as_deref())?;
        let short = self.qbid_short_for(
            new.material_short.as_deref(),
            material.as_ref(),
            new.material_type.as_deref(),
        );

        let gross = new.gross_cost.unwrap_or(0.0);
        let transport = new.transport_cost.unwrap_or(0.0);
        let other = new.other_cost.unwrap_or(0.0);
        let total = gross + transport + other;

        let mut weight = new.weight_kg.filter(|w| *w > 0.0);
        if weight.is_none() {
            if let (Some(size), Some(stone)) = (new.size_mm.as_deref(), new.stone_type.as_deref()) {
                weight = estimate_weight(size, stone).map(|e| e.weight_kg);
            }
        }

        let tx = self.conn.unchecked_transaction()?;
        let seq = {
            let mut stmt = tx.prepare("SELECT qbid FROM qbids WHERE LOWER(qbid) LIKE ?1")?;
            let existing: Vec<String> = stmt
                .query_map(params![format!("qbid-{short}-%")], |row| row.get(0))?
                .collect::<rusqlite::Result<_>>()?;
            alloc::next_qbid_seq(existing.iter().map(String::as_str), &short)
        };
        let qbid = ParsedQbid {
            short: short.clone(),
            seq,
        }
        .to_string();

        tx.execute(
            "INSERT INTO qbids (qbid, supplier, supplier_id, quarry, weight_kg, size_mm, \
             grade, received_date, material_type, material_id, splitable_blk_count, stone_type, \
             gross_cost, transport_cost, other_cost, total_cost) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                qbid,
                new.supplier,
                new.supplier_id,
                new.quarry,
                weight,
                new.size_mm,
                new.grade,
                new.received_date,
                new.material_type,
                material_id,
                new.splitable_blk_count,
                new.stone_type,
                gross,
                transport,
                other,
                total,
            ],
        )?;
        tx.commit()?;

        tracing::info!(%qbid, short, seq, "qbid created");
        Ok(qbid)
    }

    /// Get a QBID by id.
    pub fn get_qbid(&self, qbid: &str) -> Result<Option<QbidRecord>> {
        let sql = format!("{QBID_SELECT} WHERE q.qbid = ?1");
        let row = self
            .conn
            .query_row(&sql, params![qbid], row_to_qbid)
            .optional()?;
        Ok(row)
    }

    /// All QBIDs, newest received first.
    pub fn list_qbids(&self) -> Result<Vec<QbidRecord>> {
        let sql = format!("{QBID_SELECT} ORDER BY q.received_date DESC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_qbid)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// QBIDs with a split count set and unfilled block slots.
    pub fn list_generation_eligible(&self) -> Result<Vec<GenerationEligible>> {
        let mut stmt = self.conn.prepare(
            "SELECT q.qbid, m.name, COALESCE(q.splitable_blk_count, 0), COALESCE(bc.cnt, 0) \
             FROM qbids q \
             LEFT JOIN (SELECT parent_qbid, COUNT(1) as cnt FROM blocks \
                        WHERE parent_qbid IS NOT NULL GROUP BY parent_qbid) bc \
               ON bc.parent_qbid = q.qbid \
             LEFT JOIN materials m ON q.material_id = m.id \
             WHERE COALESCE(q.splitable_blk_count, 0) >= 1 \
               AND COALESCE(q.splitable_blk_count, 0) - COALESCE(bc.cnt, 0) > 0 \
             ORDER BY q.received_date DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            let cap: i64 = row.get(2)?;
            let generated: i64 = row.get(3)?;
            Ok(GenerationEligible {
                qbid: row.get(0)?,
                material_name: row.get(1)?,
                splitable_blk_count: cap,
                generated_blocks: generated,
                remaining_blocks: cap - generated,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Derived lock state for a QBID.
    pub fn lock_state(&self, qbid: &str) -> Result<LockState> {
        if self.get_qbid(qbid)?.is_none() {
            return Err(StoreError::not_found("qbid", qbid));
        }
        let has_blocks = self.count_blocks_of(qbid)? > 0;
        let has_slabs = self.count_slabs_under(qbid)? > 0;
        Ok(LockState {
            has_blocks,
            has_slabs,
            locked: has_blocks || has_slabs,
        })
    }

    /// Apply a patch to a QBID.
    ///
    /// Locked QBIDs accept cost components only; `total_cost` is always
    /// recomputed from the merged components so the cost-sum invariant
    /// holds after every write. Open QBIDs merge all fields, with weight
    /// auto-recompute when size or stone type changes (unless the caller
    /// set `manual_weight`, or resubmitted a weight that differs from the
    /// stored one by more than the stale-form tolerance).
    pub fn update_qbid(&self, qbid: &str, patch: &QbidPatch) -> Result<QbidRecord> {
        let existing = self
            .get_qbid(qbid)?
            .ok_or_else(|| StoreError::not_found("qbid", qbid))?;

        let locked = self.count_blocks_of(qbid)? > 0 || self.count_slabs_under(qbid)? > 0;
        if locked {
            let rejected = patch.locked_field_names();
            if !rejected.is_empty() {
                return Err(StoreError::LockedFields {
                    qbid: qbid.to_string(),
                    rejected,
                });
            }
            if !patch.has_cost_fields() {
                return Err(StoreError::invalid("no updatable cost fields provided"));
            }
            return self.update_qbid_costs(&existing, patch);
        }

        self.update_qbid_open(&existing, patch)
    }

    /// Cost-only update path for locked QBIDs.
    fn update_qbid_costs(&self, existing: &QbidRecord, patch: &QbidPatch) -> Result<QbidRecord> {
        let gross = patch.gross_cost.or(existing.gross_cost);
        let transport = patch.transport_cost.or(existing.transport_cost);
        let other = patch.other_cost.or(existing.other_cost);
        let total = gross.unwrap_or(0.0) + transport.unwrap_or(0.0) + other.unwrap_or(0.0);

        self.conn.execute(
            "UPDATE qbids SET gross_cost = ?1, transport_cost = ?2, other_cost = ?3, \
             total_cost = ?4 WHERE qbid = ?5",
            params![gross, transport, other, total, existing.qbid],
        )?;
        tracing::info!(qbid = %existing.qbid, total, "qbid costs updated (locked)");
        self.get_qbid(&existing.qbid)?
            .ok_or_else(|| StoreError::not_found("qbid", &existing.qbid))
    }

    /// Full patch-merge path for open QBIDs.
    fn update_qbid_open(&self, existing: &QbidRecord, patch: &QbidPatch) -> Result<QbidRecord> {
        let (resolved_mid, _) = self.resolve_material(patch.material_id, patch.material_type.as_deref())?;
        let material_id = resolved_mid.or(existing.material_id);

        let merged_size = patch.size_mm.as_deref().or(existing.size_mm.as_deref());
        let merged_stone = patch.stone_type.as_deref().or(existing.stone_type.as_deref());
        let size_changed = patch.size_mm.is_some()
            && patch.size_mm.as_deref().unwrap_or("")
                != existing.size_mm.as_deref().unwrap_or("");
        let stone_changed = patch.stone_type.is_some()
            && patch.stone_type.as_deref().unwrap_or("")
                != existing.stone_type.as_deref().unwrap_or("");

        let mut weight = patch.weight_kg.or(existing.weight_kg);
        let explicit_edit = match (patch.weight_kg, existing.weight_kg) {
            (Some(w), Some(prev)) => (w - prev).abs() > WEIGHT_EDIT_TOLERANCE_KG,
            _ => false,
        };
        let recompute = if !patch.manual_weight && (size_changed || stone_changed) {
            // Forms commonly resubmit the stale weight alongside an edited
            // size; a materially different weight is taken as deliberate.
            !explicit_edit
        } else {
            weight.is_none_or(|w| w <= 0.0)
        };
        if recompute {
            if let (Some(size), Some(stone)) = (merged_size, merged_stone) {
                if let Some(est) = estimate_weight(size, stone) {
                    weight = Some(est.weight_kg);
                }
            }
        }

        let gross = patch.gross_cost.or(existing.gross_cost);
        let transport = patch.transport_cost.or(existing.transport_cost);
        let other = patch.other_cost.or(existing.other_cost);
        let total = gross.unwrap_or(0.0) + transport.unwrap_or(0.0) + other.unwrap_or(0.0);

        self.conn.execute(
            "UPDATE qbids SET supplier = ?1, supplier_id = ?2, quarry = ?3, weight_kg = ?4, \
             size_mm = ?5, grade = ?6, received_date = ?7, material_type = ?8, material_id = ?9, \
             splitable_blk_count = ?10, stone_type = ?11, gross_cost = ?12, transport_cost = ?13, \
             other_cost = ?14, total_cost = ?15 WHERE qbid = ?16",
            params![
                patch.supplier.as_deref().or(existing.supplier.as_deref()),
                patch.supplier_id.or(existing.supplier_id),
                patch.quarry.as_deref().or(existing.quarry.as_deref()),
                weight,
                merged_size,
                patch.grade.as_deref().or(existing.grade.as_deref()),
                patch
                    .received_date
                    .as_deref()
                    .or(existing.received_date.as_deref()),
                patch
                    .material_type
                    .as_deref()
                    .or(existing.material_type.as_deref()),
                material_id,
                patch.splitable_blk_count.or(existing.splitable_blk_count),
                merged_stone,
                gross,
                transport,
                other,
                total,
                existing.qbid,
            ],
        )?;
        tracing::info!(qbid = %existing.qbid, "qbid updated");
        self.get_qbid(&existing.qbid)?
            .ok_or_else(|| StoreError::not_found("qbid", &existing.qbid))
    }

    /// Delete a QBID and its entire remaining subtree.
    ///
    /// Rejected while child blocks exist; the blocks must be deleted (or
    /// never created) first. The cascade covers slab-side leftovers from
    /// legacy data and the QBID's own events, all in one transaction.
    pub fn delete_qbid(&self, qbid: &str) -> Result<()> {
        if self.get_qbid(qbid)?.is_none() {
            return Err(StoreError::not_found("qbid", qbid));
        }
        let count = self.count_blocks_of(qbid)?;
        if count > 0 {
            return Err(StoreError::HasChildBlocks {
                qbid: qbid.to_string(),
                count,
            });
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM dispatches WHERE slid IN (SELECT slid FROM slabs WHERE block_id IN \
             (SELECT block_id FROM blocks WHERE parent_qbid = ?1))",
            params![qbid],
        )?;
        tx.execute(
            "DELETE FROM slab_events WHERE slid IN (SELECT slid FROM slabs WHERE block_id IN \
             (SELECT block_id FROM blocks WHERE parent_qbid = ?1))",
            params![qbid],
        )?;
        tx.execute(
            "DELETE FROM slabs WHERE block_id IN \
             (SELECT block_id FROM blocks WHERE parent_qbid = ?1)",
            params![qbid],
        )?;
        tx.execute("DELETE FROM parent_child WHERE parent_qbid = ?1", params![qbid])?;
        tx.execute("DELETE FROM blocks WHERE parent_qbid = ?1", params![qbid])?;
        tx.execute(
            "DELETE FROM events WHERE ref_type = 'qbids' AND ref_id = ?1",
            params![qbid],
        )?;
        tx.execute("DELETE FROM qbids WHERE qbid = ?1", params![qbid])?;
        tx.commit()?;

        tracing::info!(%qbid, "qbid deleted");
        Ok(())
    }

    /// Number of blocks parented to a QBID.
    pub(crate) fn count_blocks_of(&self, qbid: &str) -> Result<i64> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(1) FROM blocks WHERE parent_qbid = ?1",
            params![qbid],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    /// Number of slabs under any block of a QBID.
    pub(crate) fn count_slabs_under(&self, qbid: &str) -> Result<i64> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(1) FROM slabs WHERE block_id IN \
             (SELECT block_id FROM blocks WHERE parent_qbid = ?1)",
            params![qbid],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    /// Resolve a material reference: explicit id first, then lazy creation
    /// from a raw name.
    fn resolve_material(
        &self,
        material_id: Option<i64>,
        material_type: Option<&str>,
    ) -> Result<(Option<i64>, Option<Material>)> {
        if let Some(id) = material_id {
            return Ok((Some(id), self.get_material(id)?));
        }
        if let Some(name) = material_type.map(str::trim).filter(|n| !n.is_empty()) {
            let id = self.ensure_material(name)?;
            return Ok((Some(id), self.get_material(id)?));
        }
        Ok((None, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paradiso_qbid(db: &InventoryDb) -> String {
        db.create_qbid(&NewQbid {
            material_type: Some("Paradiso Multi".into()),
            ..Default::default()
        })
        .unwrap()
    }

    // ── Creation & allocation ───────────────────────────────────────────

    #[test]
    fn test_create_allocates_sequential_ids() {
        let db = InventoryDb::in_memory().unwrap();
        assert_eq!(paradiso_qbid(&db), "qbid-parm-00001");
        assert_eq!(paradiso_qbid(&db), "qbid-parm-00002");

        let other = db
            .create_qbid(&NewQbid {
                material_type: Some("Kuppam Green".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(other, "qbid-kupg-00001");
    }

    #[test]
    fn test_create_without_material_uses_fallback_namespace() {
        let db = InventoryDb::in_memory().unwrap();
        let qbid = db.create_qbid(&NewQbid::default()).unwrap();
        assert_eq!(qbid, "qbid-mat-00001");
    }

    #[test]
    fn test_create_defaults_costs_to_zero_sum() {
        let db = InventoryDb::in_memory().unwrap();
        let qbid = paradiso_qbid(&db);
        let rec = db.get_qbid(&qbid).unwrap().unwrap();
        assert_eq!(rec.gross_cost, Some(0.0));
        assert_eq!(rec.total_cost, Some(0.0));
    }

    #[test]
    fn test_create_estimates_missing_weight() {
        let db = InventoryDb::in_memory().unwrap();
        let qbid = db
            .create_qbid(&NewQbid {
                material_type: Some("Paradiso".into()),
                size_mm: Some("1000x1000x1000".into()),
                stone_type: Some("granite".into()),
                ..Default::default()
            })
            .unwrap();
        let rec = db.get_qbid(&qbid).unwrap().unwrap();
        assert_eq!(rec.weight_kg, Some(2700.0));
    }

    #[test]
    fn test_create_keeps_caller_weight() {
        let db = InventoryDb::in_memory().unwrap();
        let qbid = db
            .create_qbid(&NewQbid {
                weight_kg: Some(12000.0),
                size_mm: Some("1000x1000x1000".into()),
                stone_type: Some("granite".into()),
                ..Default::default()
            })
            .unwrap();
        let rec = db.get_qbid(&qbid).unwrap().unwrap();
        assert_eq!(rec.weight_kg, Some(12000.0));
    }

    #[test]
    fn test_create_leaves_weight_unset_when_unestimable() {
        let db = InventoryDb::in_memory().unwrap();
        let qbid = db
            .create_qbid(&NewQbid {
                size_mm: Some("not-a-size".into()),
                stone_type: Some("granite".into()),
                ..Default::default()
            })
            .unwrap();
        let rec = db.get_qbid(&qbid).unwrap().unwrap();
        assert_eq!(rec.weight_kg, None);
    }

    // ── Open updates ────────────────────────────────────────────────────

    #[test]
    fn test_update_merges_and_recomputes_total() {
        let db = InventoryDb::in_memory().unwrap();
        let qbid = paradiso_qbid(&db);
        let rec = db
            .update_qbid(
                &qbid,
                &QbidPatch {
                    grade: Some("A".into()),
                    gross_cost: Some(100.0),
                    transport_cost: Some(25.0),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(rec.grade.as_deref(), Some("A"));
        assert_eq!(rec.total_cost, Some(125.0));
        // Untouched fields survive.
        assert_eq!(rec.material_type.as_deref(), Some("Paradiso Multi"));
    }

    #[test]
    fn test_update_recomputes_weight_on_size_change() {
        let db = InventoryDb::in_memory().unwrap();
        let qbid = db
            .create_qbid(&NewQbid {
                size_mm: Some("1000x1000x1000".into()),
                stone_type: Some("granite".into()),
                ..Default::default()
            })
            .unwrap();
        // Stale form resubmits the old weight next to the new size.
        let rec = db
            .update_qbid(
                &qbid,
                &QbidPatch {
                    size_mm: Some("2000x1000x1000".into()),
                    weight_kg: Some(2700.0),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(rec.weight_kg, Some(5400.0));
    }

    #[test]
    fn test_update_respects_deliberate_weight_edit() {
        let db = InventoryDb::in_memory().unwrap();
        let qbid = db
            .create_qbid(&NewQbid {
                size_mm: Some("1000x1000x1000".into()),
                stone_type: Some("granite".into()),
                ..Default::default()
            })
            .unwrap();
        let rec = db
            .update_qbid(
                &qbid,
                &QbidPatch {
                    size_mm: Some("2000x1000x1000".into()),
                    weight_kg: Some(9999.0),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(rec.weight_kg, Some(9999.0));
    }

    #[test]
    fn test_update_manual_flag_blocks_recompute() {
        let db = InventoryDb::in_memory().unwrap();
        let qbid = db
            .create_qbid(&NewQbid {
                size_mm: Some("1000x1000x1000".into()),
                stone_type: Some("granite".into()),
                ..Default::default()
            })
            .unwrap();
        let rec = db
            .update_qbid(
                &qbid,
                &QbidPatch {
                    size_mm: Some("2000x1000x1000".into()),
                    weight_kg: Some(2701.0),
                    manual_weight: true,
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(rec.weight_kg, Some(2701.0));
    }

    #[test]
    fn test_update_missing_qbid_is_not_found() {
        let db = InventoryDb::in_memory().unwrap();
        assert!(matches!(
            db.update_qbid("qbid-none-00001", &QbidPatch::default()),
            Err(StoreError::NotFound { .. })
        ));
    }

    // ── Deletion ────────────────────────────────────────────────────────

    #[test]
    fn test_delete_open_qbid() {
        let db = InventoryDb::in_memory().unwrap();
        let qbid = paradiso_qbid(&db);
        db.delete_qbid(&qbid).unwrap();
        assert!(db.get_qbid(&qbid).unwrap().is_none());
    }
}
