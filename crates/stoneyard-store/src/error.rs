//! Error taxonomy for store operations.
//!
//! Every lineage-integrity check is a synchronous pre-condition: the store
//! evaluates it before writing, and a violation rolls back the whole
//! transaction. Variants carry enough structure for a caller to correct the
//! request (which fields were rejected, which family holds a reservation).

use thiserror::Error;

use stoneyard_types::ProductFamily;

/// Errors surfaced by inventory store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A locked QBID update touched non-cost fields; `rejected` is the full
    /// list of offending field names.
    #[error(
        "{qbid} is locked once child blocks or slabs exist; only cost fields may change (rejected: {})",
        rejected.join(", ")
    )]
    LockedFields { qbid: String, rejected: Vec<String> },

    /// A block insert would push the parent past its declared split count.
    #[error("{qbid} split cap reached ({have} of {cap} blocks)")]
    CapacityExceeded { qbid: String, cap: i64, have: i64 },

    /// The parent has no usable split count.
    #[error("{qbid} does not have splitable_blk_count >= 1")]
    SplitCapUnset { qbid: String },

    /// Split is one-shot; the QBID already has children.
    #[error("{qbid} already has {existing} child blocks; split cannot add more")]
    AlreadySplit { qbid: String, existing: i64 },

    /// Generate found every sequence slot occupied.
    #[error("all blocks already generated for {qbid}")]
    NoFreeSlots { qbid: String },

    /// QBID deletion is disabled while child blocks exist.
    #[error("{qbid} has {count} child blocks; deletion is disabled")]
    HasChildBlocks { qbid: String, count: i64 },

    /// The family demands a slab stone_type before deriving from it.
    #[error("slab stone_type is required when creating {family} from {slid}")]
    SlabStoneTypeRequired { slid: String, family: ProductFamily },

    /// The slab is reserved for a different derived-product family.
    #[error("{slid} is reserved for {reserved}; cannot create {requested} from it")]
    SlabReserved {
        slid: String,
        reserved: ProductFamily,
        requested: ProductFamily,
    },

    /// Caller-supplied stone_type conflicts with the slab's.
    #[error("slab stone_type ({slab_type}) incompatible with requested stone_type ({requested}) for {slid}")]
    StoneTypeMismatch {
        slid: String,
        slab_type: String,
        requested: String,
    },

    /// The slab already sourced a derived product (any family).
    #[error("{slid} already has a derived product; a slab sources at most one")]
    SlabInUse { slid: String },

    /// Supplied block_id disagrees with the slab's actual parent.
    #[error("block_id {given} does not match {slid}'s block ({expected})")]
    BlockMismatch {
        slid: String,
        expected: String,
        given: String,
    },

    /// Block-only derived creation is closed once the block has slabs.
    #[error("{block_id} has slabs; create derived products from slabs using their SLID")]
    BlockHasSlabs { block_id: String },

    /// The physical item was already dispatched.
    #[error("{item_type} {item_id} has already been dispatched")]
    AlreadyDispatched { item_type: String, item_id: String },

    /// Supplier deletion is blocked while QBIDs reference it.
    #[error("supplier {id} is referenced by {qbids} QBIDs")]
    SupplierInUse { id: i64, qbids: i64 },

    /// The derived-product `source` column never changes after create.
    #[error("source is read-only for {id}")]
    SourceReadOnly { id: String },

    /// Admin mutations of a QBID are locked once slabs exist under it.
    #[error("{qbid} is locked once slabs exist under it")]
    SlabsExist { qbid: String },

    /// Insert hit an identifier that already exists.
    #[error("id already exists: {id}")]
    DuplicateId { id: String },

    /// Stone type outside the density table.
    #[error("invalid stone_type: {value}")]
    InvalidStoneType { value: String },

    /// Malformed or missing input.
    #[error("{message}")]
    Invalid { message: String },

    /// Underlying SQLite failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// Shorthand for a [`StoreError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Shorthand for a [`StoreError::Invalid`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = StoreError::LockedFields {
            qbid: "qbid-parm-00001".into(),
            rejected: vec!["supplier".into(), "grade".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("qbid-parm-00001"));
        assert!(msg.contains("supplier, grade"));

        let err = StoreError::SlabReserved {
            slid: "SLID-PARM-00001-001-001".into(),
            reserved: ProductFamily::Tiles,
            requested: ProductFamily::Cobbles,
        };
        let msg = err.to_string();
        assert!(msg.contains("reserved for tiles"));
        assert!(msg.contains("cobbles"));

        let err = StoreError::CapacityExceeded {
            qbid: "qbid-parm-00001".into(),
            cap: 3,
            have: 3,
        };
        assert!(err.to_string().contains("3 of 3"));
    }

    #[test]
    fn test_helper_constructors() {
        let err = StoreError::not_found("block", "BLK-X-1-A");
        assert_eq!(err.to_string(), "block not found: BLK-X-1-A");

        let err = StoreError::invalid("block_id or slid required");
        assert_eq!(err.to_string(), "block_id or slid required");
    }
}
