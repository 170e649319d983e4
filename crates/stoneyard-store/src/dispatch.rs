//! Outbound dispatches. Two item shapes: a bare slab, or a derived
//! product. Either way the row carries a trace slid back to the source
//! slab when one exists, and an item is dispatched at most once.

use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stoneyard_types::ProductFamily;

use crate::db::InventoryDb;
use crate::error::{Result, StoreError};

/// What is being dispatched.
#[derive(Clone, Debug)]
pub enum DispatchItem {
    Slab { slid: String },
    Product { family: ProductFamily, id: String },
}

/// Input for [`InventoryDb::dispatch`].
#[derive(Clone, Debug)]
pub struct NewDispatch {
    pub item: DispatchItem,
    pub customer: Option<String>,
    pub bundle_no: Option<String>,
    pub container_no: Option<String>,
}

/// A dispatch row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub id: String,
    pub slid: Option<String>,
    pub item_type: Option<String>,
    pub item_id: Option<String>,
    pub customer: Option<String>,
    pub bundle_no: Option<String>,
    pub container_no: Option<String>,
    pub dispatched_at: i64,
}

fn row_to_dispatch(row: &rusqlite::Row<'_>) -> rusqlite::Result<DispatchRecord> {
    Ok(DispatchRecord {
        id: row.get(0)?,
        slid: row.get(1)?,
        item_type: row.get(2)?,
        item_id: row.get(3)?,
        customer: row.get(4)?,
        bundle_no: row.get(5)?,
        container_no: row.get(6)?,
        dispatched_at: row.get(7)?,
    })
}

const DISPATCH_SELECT: &str = "SELECT id, slid, item_type, item_id, customer, bundle_no, \
     container_no, dispatched_at FROM dispatches";

impl InventoryDb {
    /// Dispatch an item. The item must exist and must not have been
    /// dispatched before: slabs dedup on their slid, products on
    /// `(item_type, item_id)`.
    pub fn dispatch(&self, new: &NewDispatch) -> Result<String> {
        // Dedup check and insert commit as one unit.
        let tx = self.conn.unchecked_transaction()?;
        let (item_type, item_id, trace_slid) = match &new.item {
            DispatchItem::Slab { slid } => {
                let slab = self
                    .get_slab(slid)?
                    .ok_or_else(|| StoreError::not_found("slab", slid))?;
                let dup: i64 = self.conn.query_row(
                    "SELECT COUNT(1) FROM dispatches WHERE item_type = 'slab' AND slid = ?1",
                    params![slab.slid],
                    |row| row.get(0),
                )?;
                if dup > 0 {
                    return Err(StoreError::AlreadyDispatched {
                        item_type: "slab".to_string(),
                        item_id: slab.slid.clone(),
                    });
                }
                ("slab".to_string(), slab.slid.clone(), Some(slab.slid))
            }
            DispatchItem::Product { family, id } => {
                let slid = self
                    .product_slid(*family, id)?
                    .ok_or_else(|| StoreError::not_found(family.dispatch_name(), id))?;
                let item_type = family.dispatch_name().to_string();
                let dup: i64 = self.conn.query_row(
                    "SELECT COUNT(1) FROM dispatches WHERE item_type = ?1 AND item_id = ?2",
                    params![item_type, id],
                    |row| row.get(0),
                )?;
                if dup > 0 {
                    return Err(StoreError::AlreadyDispatched {
                        item_type,
                        item_id: id.clone(),
                    });
                }
                (item_type, id.clone(), slid)
            }
        };

        let id = Uuid::new_v4().to_string();
        tx.execute(
            "INSERT INTO dispatches (id, slid, item_type, item_id, customer, bundle_no, \
             container_no) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                trace_slid,
                item_type,
                item_id,
                new.customer,
                new.bundle_no,
                new.container_no,
            ],
        )?;
        tx.commit()?;
        tracing::info!(dispatch_id = %id, %item_type, %item_id, "item dispatched");
        Ok(id)
    }

    /// All dispatches, newest first.
    pub fn list_dispatches(&self) -> Result<Vec<DispatchRecord>> {
        let sql = format!("{DISPATCH_SELECT} ORDER BY dispatched_at DESC, id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_dispatch)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    pub fn get_dispatch(&self, id: &str) -> Result<Option<DispatchRecord>> {
        let sql = format!("{DISPATCH_SELECT} WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], row_to_dispatch)
            .optional()?)
    }

    /// Delete a dispatch, releasing its item for re-dispatch.
    pub fn delete_dispatch(&self, id: &str) -> Result<()> {
        let n = self
            .conn
            .execute("DELETE FROM dispatches WHERE id = ?1", params![id])?;
        if n == 0 {
            return Err(StoreError::not_found("dispatch", id));
        }
        Ok(())
    }

    /// Source slid of a derived product; `None` when the product does not
    /// exist. A product cut straight from a block yields `Some(None)`.
    fn product_slid(&self, family: ProductFamily, id: &str) -> Result<Option<Option<String>>> {
        let rec = match family {
            ProductFamily::Tiles => self.get_tile(id)?.map(|t| t.slid),
            ProductFamily::Cobbles => self.get_cobble(id)?.map(|c| c.slid),
            ProductFamily::Monuments => self.get_monument(id)?.map(|m| m.slid),
            ProductFamily::Pavers => self.get_paver(id)?.map(|p| p.slid),
        };
        Ok(rec)
    }
}
