//! Back-office mutations that bypass the normal lock rules but carry their
//! own guards and leave an audit event behind.
//!
//! Split cap and stone type stay editable while a QBID only has blocks;
//! both freeze once any slab exists, because slab identifiers and derived
//! weights have been cut from those values by then.

use rusqlite::params;
use serde::{Deserialize, Serialize};

use stoneyard_types::{StoneType, estimate_weight};

use crate::db::InventoryDb;
use crate::error::{Result, StoreError};
use crate::qbids::QbidRecord;

/// Outcome of [`InventoryDb::recompute_weights`].
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct RecomputeReport {
    pub updated: usize,
    pub skipped: usize,
}

impl InventoryDb {
    /// Set a QBID's split capacity, recording the old and new values.
    ///
    /// Lowering the cap below the current block count is allowed; it only
    /// stops further generation.
    pub fn set_split_cap(&self, qbid: &str, cap: i64) -> Result<QbidRecord> {
        let existing = self
            .get_qbid(qbid)?
            .ok_or_else(|| StoreError::not_found("qbid", qbid))?;
        if cap < 0 {
            return Err(StoreError::invalid("split cap must be non-negative"));
        }
        if self.count_slabs_under(qbid)? > 0 {
            return Err(StoreError::SlabsExist {
                qbid: qbid.to_string(),
            });
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE qbids SET splitable_blk_count = ?1 WHERE qbid = ?2",
            params![cap, qbid],
        )?;
        self.record_event(
            "qbids",
            qbid,
            "ADMIN_SET_SPLIT_CAP",
            Some(&serde_json::json!({
                "old": existing.splitable_blk_count,
                "new": cap,
            })),
        )?;
        tx.commit()?;

        tracing::info!(%qbid, cap, "split cap set");
        self.get_qbid(qbid)?
            .ok_or_else(|| StoreError::not_found("qbid", qbid))
    }

    /// Set or clear a QBID's stone type, recording the change.
    ///
    /// The value must name a known stone. Setting a stone when the weight
    /// is still unset (and a size is present) fills the weight in.
    pub fn set_stone_type(&self, qbid: &str, stone_type: Option<&str>) -> Result<QbidRecord> {
        let existing = self
            .get_qbid(qbid)?
            .ok_or_else(|| StoreError::not_found("qbid", qbid))?;
        let stone = match stone_type.map(str::trim).filter(|s| !s.is_empty()) {
            Some(value) => Some(StoneType::from_str(value).ok_or_else(|| {
                StoreError::InvalidStoneType {
                    value: value.to_string(),
                }
            })?),
            None => None,
        };
        if self.count_slabs_under(qbid)? > 0 {
            return Err(StoreError::SlabsExist {
                qbid: qbid.to_string(),
            });
        }

        let mut weight = existing.weight_kg;
        if let (Some(stone), Some(size)) = (stone, existing.size_mm.as_deref()) {
            if weight.is_none_or(|w| w <= 0.0) {
                if let Some(est) = estimate_weight(size, stone.as_str()) {
                    weight = Some(est.weight_kg);
                }
            }
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE qbids SET stone_type = ?1, weight_kg = ?2 WHERE qbid = ?3",
            params![stone.map(|s| s.as_str()), weight, qbid],
        )?;
        self.record_event(
            "qbids",
            qbid,
            "ADMIN_SET_STONE_TYPE",
            Some(&serde_json::json!({
                "old": existing.stone_type,
                "new": stone.map(|s| s.as_str()),
            })),
        )?;
        tx.commit()?;

        tracing::info!(%qbid, stone = ?stone.map(|s| s.as_str()), "stone type set");
        self.get_qbid(qbid)?
            .ok_or_else(|| StoreError::not_found("qbid", qbid))
    }

    /// Re-estimate weights from size + stone type across QBIDs.
    ///
    /// `targets` empty means every QBID. With `only_when_zero`, rows whose
    /// weight is already set are skipped. Rows without enough data to
    /// estimate count as skipped.
    pub fn recompute_weights(
        &self,
        targets: &[String],
        only_when_zero: bool,
    ) -> Result<RecomputeReport> {
        let candidates: Vec<QbidRecord> = if targets.is_empty() {
            self.list_qbids()?
        } else {
            let mut out = Vec::with_capacity(targets.len());
            for qbid in targets {
                out.push(
                    self.get_qbid(qbid)?
                        .ok_or_else(|| StoreError::not_found("qbid", qbid))?,
                );
            }
            out
        };

        let mut report = RecomputeReport::default();
        let tx = self.conn.unchecked_transaction()?;
        for rec in candidates {
            if only_when_zero && rec.weight_kg.is_some_and(|w| w > 0.0) {
                report.skipped += 1;
                continue;
            }
            let estimate = match (rec.size_mm.as_deref(), rec.stone_type.as_deref()) {
                (Some(size), Some(stone)) => estimate_weight(size, stone),
                _ => None,
            };
            match estimate {
                Some(est) => {
                    tx.execute(
                        "UPDATE qbids SET weight_kg = ?1 WHERE qbid = ?2",
                        params![est.weight_kg, rec.qbid],
                    )?;
                    report.updated += 1;
                }
                None => report.skipped += 1,
            }
        }
        tx.commit()?;

        tracing::info!(updated = report.updated, skipped = report.skipped, "weights recomputed");
        Ok(report)
    }

    /// Backfill NULL split counts to 0; `targets` empty means every QBID.
    pub fn zero_unset_split_counts(&self, targets: &[String]) -> Result<usize> {
        let changed = if targets.is_empty() {
            self.conn.execute(
                "UPDATE qbids SET splitable_blk_count = 0 WHERE splitable_blk_count IS NULL",
                [],
            )?
        } else {
            let mut total = 0;
            let tx = self.conn.unchecked_transaction()?;
            for qbid in targets {
                total += tx.execute(
                    "UPDATE qbids SET splitable_blk_count = 0 \
                     WHERE splitable_blk_count IS NULL AND qbid = ?1",
                    params![qbid],
                )?;
            }
            tx.commit()?;
            total
        };
        Ok(changed)
    }
}
