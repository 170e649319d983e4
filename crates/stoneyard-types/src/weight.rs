//! Size parsing and weight estimation.
//!
//! Sizes are entered as `L x W x H` in millimetres ("3200x1800x1600";
//! separators `x`, `×`, or `*`, any casing, whitespace ignored). Weight is
//! bulk density times volume, rounded to the nearest kilogram.

use serde::{Deserialize, Serialize};

use crate::stone::StoneType;

/// A parsed `L×W×H` size in millimetres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SizeMm {
    pub length_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
}

impl SizeMm {
    /// Volume in cubic metres.
    pub fn volume_m3(&self) -> f64 {
        self.length_mm * self.width_mm * self.height_mm / 1e9
    }
}

/// Parse a size triplet: exactly three strictly-positive finite numbers.
pub fn parse_size_mm(input: &str) -> Option<SizeMm> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return None;
    }
    let parts: Vec<&str> = cleaned.split(['x', 'X', '×', '*']).collect();
    if parts.len() != 3 {
        return None;
    }
    let mut dims = [0f64; 3];
    for (dim, part) in dims.iter_mut().zip(&parts) {
        let v: f64 = part.parse().ok()?;
        if !v.is_finite() || v <= 0.0 {
            return None;
        }
        *dim = v;
    }
    Some(SizeMm {
        length_mm: dims[0],
        width_mm: dims[1],
        height_mm: dims[2],
    })
}

/// The inputs and result of one weight estimation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightEstimate {
    pub weight_kg: f64,
    pub volume_m3: f64,
    pub density_kg_m3: f64,
}

/// Estimate weight from a size string and a stone type name.
///
/// `None` when either side is missing or malformed — callers decide
/// whether that means "keep the stored value" or "leave unset".
pub fn estimate_weight(size_mm: &str, stone_type: &str) -> Option<WeightEstimate> {
    let size = parse_size_mm(size_mm)?;
    let stone = StoneType::from_str(stone_type)?;
    let density = stone.density_kg_m3();
    let volume = size.volume_m3();
    Some(WeightEstimate {
        weight_kg: (volume * density).round(),
        volume_m3: volume,
        density_kg_m3: density,
    })
}

// ============================================================================
// Tests
// ============================================================================
