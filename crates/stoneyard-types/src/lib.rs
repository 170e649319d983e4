//! Identifier grammar, material codec, and weight estimation for the
//! stoneyard inventory.
//!
//! This crate is the pure layer: total parsers for the three identifier
//! tiers, the material short-code codec, bijective base-26 letter suffixes,
//! sequence-allocation rules, and the stone density table. No I/O — the
//! store calls these from inside its transactions.
//!
//! # Identifier tiers
//!
//! ```text
//! QBID   qbid-parm-00001             raw stone receipt (per-material seq)
//!   └── Block  BLK-PARM-00001-A      sawn block (per-QBID seq, letter or numeric)
//!         └── Slab  SLID-PARM-00001-001-004   sawn slab (per-block seq)
//!               └── TILE-/COB-/MON-/PAV-…     derived product (random suffix)
//! ```
//!
//! Every parser is total: identifiers that predate the grammar yield `None`
//! and are skipped by the allocators instead of failing them.

pub mod alloc;
pub mod ids;
pub mod material;
pub mod stone;
pub mod weight;

// Re-export primary types at crate root for convenience.
pub use alloc::{block_style, missing_block_seqs, next_qbid_seq, next_slab_seq, used_block_seqs};
pub use ids::{
    BlockIdStyle, ParsedBlockId, ParsedQbid, ParsedSlid, block_id_for, index_from_letters,
    legacy_block_id, letters_from_index, qbid_base, slid_for,
};
pub use material::{short_code, short_code_lower};
pub use stone::{ProductFamily, StoneType};
pub use weight::{SizeMm, WeightEstimate, estimate_weight, parse_size_mm};
