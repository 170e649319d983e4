//! Stone classification: the density table behind weight estimation and
//! the four derived-product families cut from slabs.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::EnumString;

// ── Stone types ─────────────────────────────────────────────────────────────

/// Stone families with known bulk densities.
///
/// Stored as lowercase text; parsing is case-insensitive and anything
/// outside this table is "unknown" rather than an error, since legacy rows
/// carry free-text stone labels.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum StoneType {
    Granite,
    Marble,
    Quartz,
    Quartzite,
    Limestone,
    Travertine,
    Sandstone,
    Slate,
    Basalt,
    Gabbro,
}

impl StoneType {
    /// Every known stone, in display order.
    pub const ALL: [StoneType; 10] = [
        StoneType::Granite,
        StoneType::Marble,
        StoneType::Quartz,
        StoneType::Quartzite,
        StoneType::Limestone,
        StoneType::Travertine,
        StoneType::Sandstone,
        StoneType::Slate,
        StoneType::Basalt,
        StoneType::Gabbro,
    ];

    /// Bulk density in kg/m³.
    pub fn density_kg_m3(&self) -> f64 {
        match self {
            StoneType::Granite => 2700.0,
            StoneType::Marble => 2710.0,
            StoneType::Quartz => 2650.0,
            StoneType::Quartzite => 2650.0,
            StoneType::Limestone => 2500.0,
            StoneType::Travertine => 2500.0,
            StoneType::Sandstone => 2300.0,
            StoneType::Slate => 2800.0,
            StoneType::Basalt => 3000.0,
            StoneType::Gabbro => 3000.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StoneType::Granite => "granite",
            StoneType::Marble => "marble",
            StoneType::Quartz => "quartz",
            StoneType::Quartzite => "quartzite",
            StoneType::Limestone => "limestone",
            StoneType::Travertine => "travertine",
            StoneType::Sandstone => "sandstone",
            StoneType::Slate => "slate",
            StoneType::Basalt => "basalt",
            StoneType::Gabbro => "gabbro",
        }
    }

    /// Case-insensitive parse (input trimmed); `None` for unknown stone.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as std::str::FromStr>::from_str(s.trim()).ok()
    }

    /// Comma-separated list of every known stone name.
    pub fn known_names() -> String {
        Self::ALL
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for StoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Product families ────────────────────────────────────────────────────────

/// The four derived-product families cut from slabs.
///
/// A slab whose `stone_type` equals a family's marker string is reserved
/// for that family. Parsing accepts both the plural marker ("tiles") and
/// the singular dispatch name ("tile").
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum ProductFamily {
    #[strum(serialize = "tiles", serialize = "tile")]
    Tiles,
    #[strum(serialize = "cobbles", serialize = "cobble")]
    Cobbles,
    #[strum(serialize = "monuments", serialize = "monument")]
    Monuments,
    #[strum(serialize = "pavers", serialize = "paver")]
    Pavers,
}

impl ProductFamily {
    pub const ALL: [ProductFamily; 4] = [
        ProductFamily::Tiles,
        ProductFamily::Cobbles,
        ProductFamily::Monuments,
        ProductFamily::Pavers,
    ];

    /// The reservation marker a slab's `stone_type` may carry.
    pub fn marker(&self) -> &'static str {
        match self {
            ProductFamily::Tiles => "tiles",
            ProductFamily::Cobbles => "cobbles",
            ProductFamily::Monuments => "monuments",
            ProductFamily::Pavers => "pavers",
        }
    }

    /// Singular name used by dispatch records.
    pub fn dispatch_name(&self) -> &'static str {
        match self {
            ProductFamily::Tiles => "tile",
            ProductFamily::Cobbles => "cobble",
            ProductFamily::Monuments => "monument",
            ProductFamily::Pavers => "paver",
        }
    }

    /// Prefix of generated product identifiers.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            ProductFamily::Tiles => "TILE",
            ProductFamily::Cobbles => "COB",
            ProductFamily::Monuments => "MON",
            ProductFamily::Pavers => "PAV",
        }
    }

    /// Whether creating this product from a slab demands the slab's
    /// `stone_type` be set. Monuments are the historical exception.
    pub fn requires_slab_stone_type(&self) -> bool {
        !matches!(self, ProductFamily::Monuments)
    }

    /// Which family, if any, a slab `stone_type` value reserves.
    pub fn from_marker(stone_type: &str) -> Option<Self> {
        let t = stone_type.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.marker() == t)
    }

    /// Case-insensitive parse of marker or dispatch name.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as std::str::FromStr>::from_str(s.trim()).ok()
    }
}

impl fmt::Display for ProductFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

// ============================================================================
// Tests
// ============================================================================
