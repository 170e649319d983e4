//! Generic audit trail. Admin mutations write here automatically; callers
//! can append their own entries against any (ref_type, ref_id) pair.
//! Payloads are opaque JSON.

use rusqlite::params;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::InventoryDb;
use crate::error::{Result, StoreError};

/// An audit event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub ref_type: String,
    pub ref_id: String,
    pub event_type: String,
    pub payload: Option<serde_json::Value>,
    pub created_at: i64,
}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventRecord> {
    let payload: Option<String> = row.get(4)?;
    Ok(EventRecord {
        id: row.get(0)?,
        ref_type: row.get(1)?,
        ref_id: row.get(2)?,
        event_type: row.get(3)?,
        payload: payload.and_then(|p| serde_json::from_str(&p).ok()),
        created_at: row.get(5)?,
    })
}

const EVENT_SELECT: &str =
    "SELECT id, ref_type, ref_id, event_type, payload, created_at FROM events";

impl InventoryDb {
    /// Append an audit event.
    pub fn record_event(
        &self,
        ref_type: &str,
        ref_id: &str,
        event_type: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<String> {
        if ref_type.trim().is_empty() || ref_id.trim().is_empty() || event_type.trim().is_empty() {
            return Err(StoreError::invalid(
                "ref_type, ref_id and event_type are required",
            ));
        }
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO events (id, ref_type, ref_id, event_type, payload) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                ref_type.trim(),
                ref_id.trim(),
                event_type.trim(),
                payload.map(|p| p.to_string()),
            ],
        )?;
        Ok(id)
    }

    /// All events, newest first.
    pub fn list_events(&self) -> Result<Vec<EventRecord>> {
        let sql = format!("{EVENT_SELECT} ORDER BY created_at DESC, id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_event)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Events for one entity, newest first.
    pub fn events_for(&self, ref_type: &str, ref_id: &str) -> Result<Vec<EventRecord>> {
        let sql = format!(
            "{EVENT_SELECT} WHERE ref_type = ?1 AND ref_id = ?2 ORDER BY created_at DESC, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![ref_type, ref_id], row_to_event)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    pub fn delete_event(&self, id: &str) -> Result<()> {
        let n = self
            .conn
            .execute("DELETE FROM events WHERE id = ?1", params![id])?;
        if n == 0 {
            return Err(StoreError::not_found("event", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_round_trip() {
        let db = InventoryDb::in_memory().unwrap();
        db.record_event(
            "qbids",
            "qbid-parm-00001",
            "NOTE",
            Some(&serde_json::json!({ "text": "relabelled" })),
        )
        .unwrap();
        let events = db.events_for("qbids", "qbid-parm-00001").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "NOTE");
        assert_eq!(events[0].payload.as_ref().unwrap()["text"], "relabelled");
    }

    #[test]
    fn test_event_requires_identity() {
        let db = InventoryDb::in_memory().unwrap();
        assert!(matches!(
            db.record_event("", "x", "NOTE", None),
            Err(StoreError::Invalid { .. })
        ));
    }

    #[test]
    fn test_events_scoped_by_ref() {
        let db = InventoryDb::in_memory().unwrap();
        db.record_event("qbids", "a", "NOTE", None).unwrap();
        db.record_event("blocks", "a", "NOTE", None).unwrap();
        assert_eq!(db.events_for("qbids", "a").unwrap().len(), 1);
        assert_eq!(db.list_events().unwrap().len(), 2);
    }
}
