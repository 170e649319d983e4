//! SQLite persistence for the quarry inventory.
//!
//! One connection, one logical store. Every allocate+insert pair runs
//! inside a single transaction on this connection, so "read max sequence,
//! compute next, insert" is atomic and no counter is ever cached in
//! process memory.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{Connection, params};

use crate::error::{Result, StoreError};

/// Database handle for inventory persistence.
pub struct InventoryDb {
    pub(crate) conn: Connection,
}

/// Current schema version, written to `PRAGMA user_version`.
const SCHEMA_VERSION: i64 = 1;

const SCHEMA_V1: &str = r#"
-- Reference data
CREATE TABLE IF NOT EXISTS materials (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    short_code TEXT
);

CREATE TABLE IF NOT EXISTS suppliers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    contact TEXT,
    material TEXT,
    quarry_location TEXT,
    notes TEXT,
    address TEXT,
    phone TEXT,
    email TEXT
);

-- Lineage root: one row per received lot
CREATE TABLE IF NOT EXISTS qbids (
    qbid TEXT PRIMARY KEY,
    supplier TEXT,
    supplier_id INTEGER,
    quarry TEXT,
    weight_kg REAL,
    size_mm TEXT,
    grade TEXT,
    received_date TEXT,
    material_type TEXT,
    material_id INTEGER,
    splitable_blk_count INTEGER,
    stone_type TEXT,
    gross_cost REAL,
    transport_cost REAL,
    other_cost REAL,
    total_cost REAL,
    created_at INTEGER DEFAULT (unixepoch()),
    FOREIGN KEY(material_id) REFERENCES materials(id),
    FOREIGN KEY(supplier_id) REFERENCES suppliers(id)
);
CREATE INDEX IF NOT EXISTS idx_qbids_received ON qbids(received_date DESC);

CREATE TABLE IF NOT EXISTS blocks (
    block_id TEXT PRIMARY KEY,
    parent_qbid TEXT,
    grade TEXT,
    short_code TEXT,
    receipt_id TEXT,
    receipt_date TEXT,
    source_id TEXT,
    source_name TEXT,
    material TEXT,
    description TEXT,
    length_mm REAL,
    width_mm REAL,
    height_mm REAL,
    volume_m3 REAL,
    no_slabs INTEGER,
    no_wastage_slabs INTEGER,
    yard_location TEXT,
    status TEXT,
    notes TEXT,
    FOREIGN KEY(parent_qbid) REFERENCES qbids(qbid)
);
CREATE INDEX IF NOT EXISTS idx_blocks_parent ON blocks(parent_qbid);

-- Denormalized lineage index, maintained alongside blocks
CREATE TABLE IF NOT EXISTS parent_child (
    parent_qbid TEXT NOT NULL,
    child_block_id TEXT NOT NULL,
    PRIMARY KEY (parent_qbid, child_block_id)
);

CREATE TABLE IF NOT EXISTS slabs (
    slid TEXT PRIMARY KEY,
    block_id TEXT,
    thickness_mm REAL,
    machine_id TEXT,
    slabs_yield INTEGER,
    batch_id TEXT,
    yard_location TEXT,
    status TEXT,
    qc_status TEXT,
    stone_type TEXT,
    FOREIGN KEY(block_id) REFERENCES blocks(block_id)
);
CREATE INDEX IF NOT EXISTS idx_slabs_block ON slabs(block_id);

-- Derived products: one table per family
CREATE TABLE IF NOT EXISTS tiles (
    tile_id TEXT PRIMARY KEY,
    block_id TEXT,
    slid TEXT,
    source TEXT,
    thickness_mm REAL,
    length_mm REAL,
    width_mm REAL,
    finish TEXT,
    yield_count INTEGER,
    batch_id TEXT,
    yard_location TEXT,
    status TEXT,
    qc_status TEXT,
    FOREIGN KEY(block_id) REFERENCES blocks(block_id),
    FOREIGN KEY(slid) REFERENCES slabs(slid)
);
CREATE INDEX IF NOT EXISTS idx_tiles_slid ON tiles(slid);

CREATE TABLE IF NOT EXISTS cobbles (
    cobble_id TEXT PRIMARY KEY,
    block_id TEXT,
    slid TEXT,
    source TEXT,
    length_mm REAL,
    width_mm REAL,
    height_mm REAL,
    shape TEXT,
    finish TEXT,
    pieces_count INTEGER,
    batch_id TEXT,
    yard_location TEXT,
    status TEXT,
    qc_status TEXT,
    FOREIGN KEY(block_id) REFERENCES blocks(block_id),
    FOREIGN KEY(slid) REFERENCES slabs(slid)
);
CREATE INDEX IF NOT EXISTS idx_cobbles_slid ON cobbles(slid);

CREATE TABLE IF NOT EXISTS monuments (
    monument_id TEXT PRIMARY KEY,
    block_id TEXT,
    slid TEXT,
    source TEXT,
    length_mm REAL,
    width_mm REAL,
    height_mm REAL,
    style TEXT,
    customer TEXT,
    order_no TEXT,
    batch_id TEXT,
    yard_location TEXT,
    status TEXT,
    qc_status TEXT,
    FOREIGN KEY(block_id) REFERENCES blocks(block_id),
    FOREIGN KEY(slid) REFERENCES slabs(slid)
);
CREATE INDEX IF NOT EXISTS idx_monuments_slid ON monuments(slid);

CREATE TABLE IF NOT EXISTS pavers (
    paver_id TEXT PRIMARY KEY,
    block_id TEXT,
    slid TEXT,
    source TEXT,
    thickness_mm REAL,
    length_mm REAL,
    width_mm REAL,
    height_mm REAL,
    finish TEXT,
    pattern TEXT,
    pieces_count INTEGER,
    batch_id TEXT,
    yard_location TEXT,
    status TEXT,
    qc_status TEXT,
    FOREIGN KEY(block_id) REFERENCES blocks(block_id),
    FOREIGN KEY(slid) REFERENCES slabs(slid)
);
CREATE INDEX IF NOT EXISTS idx_pavers_slid ON pavers(slid);

-- Audit trail
CREATE TABLE IF NOT EXISTS events (
    id TEXT PRIMARY KEY,
    ref_type TEXT NOT NULL,
    ref_id TEXT NOT NULL,
    event_type TEXT NOT NULL,
    payload TEXT,
    created_at INTEGER DEFAULT (unixepoch())
);
CREATE INDEX IF NOT EXISTS idx_events_ref ON events(ref_type, ref_id);

CREATE TABLE IF NOT EXISTS slab_events (
    id TEXT PRIMARY KEY,
    slid TEXT NOT NULL,
    action TEXT NOT NULL,
    payload TEXT,
    created_at INTEGER DEFAULT (unixepoch())
);
CREATE INDEX IF NOT EXISTS idx_slab_events_slid ON slab_events(slid);

CREATE TABLE IF NOT EXISTS dispatches (
    id TEXT PRIMARY KEY,
    slid TEXT,
    item_type TEXT,
    item_id TEXT,
    customer TEXT,
    bundle_no TEXT,
    container_no TEXT,
    dispatched_at INTEGER DEFAULT (unixepoch())
);
CREATE INDEX IF NOT EXISTS idx_dispatches_item ON dispatches(item_type, item_id);
"#;

/// Tables reported by [`InventoryDb::table_counts`], lineage order.
const TABLES: [&str; 13] = [
    "materials",
    "suppliers",
    "qbids",
    "blocks",
    "parent_child",
    "slabs",
    "tiles",
    "cobbles",
    "monuments",
    "pavers",
    "events",
    "slab_events",
    "dispatches",
];

impl InventoryDb {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Bring the schema up to the current version.
    ///
    /// Versioned via `PRAGMA user_version`; each step runs as one batch.
    /// No column probing — an older database is identified by its version
    /// number alone.
    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let from = self.schema_version()?;
        if from < 1 {
            self.conn.execute_batch(SCHEMA_V1)?;
            self.conn
                .pragma_update(None, "user_version", SCHEMA_VERSION)?;
            tracing::info!(from, to = SCHEMA_VERSION, "schema migrated");
        }
        Ok(())
    }

    /// Current `PRAGMA user_version` of the store.
    pub fn schema_version(&self) -> Result<i64> {
        let v: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(v)
    }

    /// Row counts per table, in lineage order.
    pub fn table_counts(&self) -> Result<Vec<(&'static str, i64)>> {
        let mut out = Vec::with_capacity(TABLES.len());
        for table in TABLES {
            let count: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?;
            out.push((table, count));
        }
        Ok(out)
    }

    /// Insert the development fixture: the Paradiso material, one QBID in
    /// the pre-grammar format, and its three blocks. Safe to repeat.
    pub fn seed_demo(&self) -> Result<()> {
        let material_id = self.ensure_material("Paradiso")?;
        self.conn.execute(
            "INSERT OR IGNORE INTO qbids (qbid, supplier, material_type, material_id, \
             splitable_blk_count) VALUES ('QBID-DEMO1', 'Demo Quarry', 'Paradiso', ?1, 3)",
            params![material_id],
        )?;
        match self.generate_blocks("QBID-DEMO1") {
            Ok(_) | Err(StoreError::NoFreeSlots { .. }) => {}
            Err(e) => return Err(e),
        }
        tracing::info!("demo fixture seeded");
        Ok(())
    }
}

/// Shared handle for concurrent access to one store.
///
/// The mutex serializes writers within the process; SQLite's transaction
/// provides the on-disk atomicity for each allocate+insert pair.
pub type SharedInventoryDb = Arc<Mutex<InventoryDb>>;

/// Open a store at `path` behind a shared handle.
pub fn shared_inventory_db<P: AsRef<Path>>(path: P) -> Result<SharedInventoryDb> {
    Ok(Arc::new(Mutex::new(InventoryDb::open(path)?)))
}

/// In-memory shared store (for testing).
pub fn shared_inventory_db_in_memory() -> Result<SharedInventoryDb> {
    Ok(Arc::new(Mutex::new(InventoryDb::in_memory()?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_sets_version() {
        let db = InventoryDb::in_memory().unwrap();
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let db = InventoryDb::in_memory().unwrap();
        db.migrate().unwrap();
        db.migrate().unwrap();
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_open_reopen_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.db");

        {
            let db = InventoryDb::open(&path).unwrap();
            assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
        }
        let db = InventoryDb::open(&path).unwrap();
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_table_counts_cover_all_tables() {
        let db = InventoryDb::in_memory().unwrap();
        let counts = db.table_counts().unwrap();
        assert_eq!(counts.len(), 13);
        assert!(counts.iter().all(|(_, n)| *n == 0));
    }

    #[test]
    fn test_seed_demo_is_idempotent() {
        let db = InventoryDb::in_memory().unwrap();
        db.seed_demo().unwrap();
        db.seed_demo().unwrap();
        assert_eq!(db.children_of("QBID-DEMO1").unwrap().len(), 3);
        assert_eq!(db.list_materials().unwrap().len(), 1);
    }

    #[test]
    fn test_shared_handle() {
        let shared = shared_inventory_db_in_memory().unwrap();
        let db = shared.lock();
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
    }
}
