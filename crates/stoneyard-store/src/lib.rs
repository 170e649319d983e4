//! SQLite-backed inventory store for the stoneyard lineage.
//!
//! One [`InventoryDb`] owns the connection; every entity module hangs its
//! operations off that handle. The lineage runs QBID → block → slab →
//! derived product, and two engine rules are threaded through all of it:
//!
//! - **Lock**: a QBID freezes (cost fields excepted) the moment any child
//!   block or slab exists. The state is derived from row existence on
//!   every write, never stored.
//! - **Exclusivity**: one slab feeds at most one derived product across
//!   all four families, and a slab can be reserved for a family through
//!   its stone_type marker.
//!
//! Identifier allocation is pure "max existing + 1" (`stoneyard-types`),
//! always evaluated inside the transaction that inserts the winner.

pub mod admin;
pub mod blocks;
pub mod db;
pub mod derived;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod materials;
pub mod qbids;
pub mod slabs;
pub mod suppliers;

pub use admin::RecomputeReport;
pub use blocks::{BlockPatch, BlockRecord, BlockSeed, NewBlock};
pub use db::{InventoryDb, SharedInventoryDb, shared_inventory_db, shared_inventory_db_in_memory};
pub use derived::{
    CobblePatch, CobbleRecord, MonumentPatch, MonumentRecord, NewCobble, NewMonument, NewPaver,
    NewTile, PaverPatch, PaverRecord, TilePatch, TileRecord,
};
pub use dispatch::{DispatchItem, DispatchRecord, NewDispatch};
pub use error::{Result, StoreError};
pub use events::EventRecord;
pub use materials::Material;
pub use qbids::{GenerationEligible, LockState, NewQbid, QbidPatch, QbidRecord};
pub use slabs::{NewSlab, SlabEvent, SlabPatch, SlabRecord, SlabUsage};
pub use suppliers::{Supplier, SupplierFields};
