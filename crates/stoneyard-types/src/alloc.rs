//! Pure sequence-allocation rules.
//!
//! Every "next ID" decision reduces to: parse the identifiers already in
//! the namespace, take the maximum sequence, add one. These functions are
//! the pure half of that split. The store calls them inside the same
//! transaction that inserts the winner, so no counter is ever cached and
//! deleting the highest ID simply frees its number for reuse.

use std::collections::BTreeSet;

use crate::ids::{BlockIdStyle, ParsedBlockId, ParsedQbid, ParsedSlid};

/// Next QBID sequence for a material short code: max existing + 1.
///
/// Identifiers outside the grammar, or under a different short, are ignored.
pub fn next_qbid_seq<'a>(existing: impl IntoIterator<Item = &'a str>, short: &str) -> u32 {
    existing
        .into_iter()
        .filter_map(ParsedQbid::parse)
        .filter(|p| p.short == short)
        .map(|p| p.seq)
        .max()
        .unwrap_or(0)
        + 1
}

/// Next slab sequence under one block's SLID prefix.
///
/// Candidates are uppercased before parsing, so slabs stored with odd
/// casing still count against the sequence.
pub fn next_slab_seq<'a>(
    existing: impl IntoIterator<Item = &'a str>,
    base: &str,
    block_seq: u32,
) -> u32 {
    existing
        .into_iter()
        .filter_map(|s| ParsedSlid::parse(&s.to_ascii_uppercase()))
        .filter(|p| p.base == base && p.block_seq == block_seq)
        .map(|p| p.slab_seq)
        .max()
        .unwrap_or(0)
        + 1
}

/// Suffix style continuation for a lineage.
///
/// Letter wins whenever any letter-suffixed block exists; a lineage with
/// only numeric suffixes stays numeric; fresh lineages default to letter.
/// The scan is deliberately looser than the full grammar (`BLK-` prefix
/// plus suffix shape) so that near-miss legacy IDs still vote.
pub fn block_style<'a>(existing: impl IntoIterator<Item = &'a str>) -> BlockIdStyle {
    let mut has_numeric = false;
    let mut has_letter = false;
    for id in existing {
        if !has_blk_prefix(id) {
            continue;
        }
        has_numeric = has_numeric || has_numeric_suffix(id);
        has_letter = has_letter || has_letter_suffix(id);
    }
    if has_letter || !has_numeric {
        BlockIdStyle::Letter
    } else {
        BlockIdStyle::Numeric
    }
}

/// Sequence numbers already occupied under `base`, clamped to `1..=cap`.
///
/// Only fully structured IDs with a matching base count; anything else
/// occupies no slot.
pub fn used_block_seqs<'a>(
    existing: impl IntoIterator<Item = &'a str>,
    base: &str,
    cap: u32,
) -> BTreeSet<u32> {
    existing
        .into_iter()
        .filter_map(ParsedBlockId::parse)
        .filter(|p| p.base == base && p.seq >= 1 && p.seq <= cap)
        .map(|p| p.seq)
        .collect()
}

/// Unoccupied slots in `1..=cap`, ascending.
pub fn missing_block_seqs<'a>(
    existing: impl IntoIterator<Item = &'a str>,
    base: &str,
    cap: u32,
) -> Vec<u32> {
    let used = used_block_seqs(existing, base, cap);
    (1..=cap).filter(|n| !used.contains(n)).collect()
}

fn has_blk_prefix(id: &str) -> bool {
    id.get(..4).is_some_and(|head| head.eq_ignore_ascii_case("BLK-"))
}

fn has_numeric_suffix(id: &str) -> bool {
    let b = id.as_bytes();
    b.len() >= 4
        && b[b.len() - 4] == b'-'
        && b[b.len() - 3..].iter().all(|c| c.is_ascii_digit())
}

fn has_letter_suffix(id: &str) -> bool {
    id.rsplit_once('-').is_some_and(|(_, suffix)| {
        !suffix.is_empty() && suffix.len() <= 6 && suffix.bytes().all(|c| c.is_ascii_uppercase())
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ── QBID allocation ─────────────────────────────────────────────────

    #[test]
    fn test_next_qbid_seq_empty_namespace() {
        assert_eq!(next_qbid_seq([], "parm"), 1);
    }

    #[test]
    fn test_next_qbid_seq_takes_max_plus_one() {
        let ids = ["qbid-parm-00001", "qbid-parm-00005", "qbid-parm-00003"];
        assert_eq!(next_qbid_seq(ids, "parm"), 6);
    }

    #[test]
    fn test_next_qbid_seq_ignores_other_shorts_and_legacy() {
        let ids = [
            "qbid-parm-00002",
            "qbid-kupg-00009",
            "QBID-DEMO1",
            "qbid-parm-junk",
        ];
        assert_eq!(next_qbid_seq(ids, "parm"), 3);
    }

    #[test]
    fn test_next_qbid_seq_reuses_freed_top_slot() {
        // After the newest receipt is deleted its number comes back.
        let ids = ["qbid-parm-00001", "qbid-parm-00002"];
        assert_eq!(next_qbid_seq(ids, "parm"), 3);
        let after_delete = ["qbid-parm-00001"];
        assert_eq!(next_qbid_seq(after_delete, "parm"), 2);
    }

    // ── Slab allocation ─────────────────────────────────────────────────

    #[test]
    fn test_next_slab_seq_scoped_to_block() {
        let slids = [
            "SLID-PARM-00001-001-001",
            "SLID-PARM-00001-001-004",
            "SLID-PARM-00001-002-009",
            "SLID-KUPG-00001-001-020",
        ];
        assert_eq!(next_slab_seq(slids, "PARM-00001", 1), 5);
        assert_eq!(next_slab_seq(slids, "PARM-00001", 2), 10);
        assert_eq!(next_slab_seq(slids, "PARM-00001", 3), 1);
    }

    #[test]
    fn test_next_slab_seq_uppercases_candidates() {
        let slids = ["slid-parm-00001-001-002"];
        assert_eq!(next_slab_seq(slids, "PARM-00001", 1), 3);
    }

    // ── Style detection ─────────────────────────────────────────────────

    #[test]
    fn test_block_style_defaults_to_letter() {
        assert_eq!(block_style([]), BlockIdStyle::Letter);
    }

    #[test]
    fn test_block_style_continues_numeric() {
        let ids = ["BLK-PARM-00001-001", "BLK-PARM-00001-002"];
        assert_eq!(block_style(ids), BlockIdStyle::Numeric);
    }

    #[test]
    fn test_block_style_letter_wins_mixed() {
        let ids = ["BLK-PARM-00001-001", "BLK-PARM-00001-B"];
        assert_eq!(block_style(ids), BlockIdStyle::Letter);
    }

    #[test]
    fn test_block_style_ignores_foreign_ids() {
        let ids = ["PARA-DEMO1-BLOCK-A", "whatever-001"];
        assert_eq!(block_style(ids), BlockIdStyle::Letter);
    }

    // ── Slot accounting ─────────────────────────────────────────────────

    #[test]
    fn test_used_block_seqs_filters_base_and_cap() {
        let ids = [
            "BLK-PARM-00001-A",
            "BLK-PARM-00001-003",
            "BLK-PARM-00001-Z",
            "BLK-KUPG-00001-B",
            "not-a-block",
        ];
        let used = used_block_seqs(ids, "PARM-00001", 5);
        assert_eq!(used.into_iter().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_missing_block_seqs_fills_gaps_in_order() {
        let ids = ["BLK-PARM-00001-A", "BLK-PARM-00001-C"];
        assert_eq!(missing_block_seqs(ids, "PARM-00001", 4), vec![2, 4]);
    }

    #[test]
    fn test_missing_block_seqs_full_lineage_is_empty() {
        let ids = ["BLK-PARM-00001-A", "BLK-PARM-00001-B"];
        assert!(missing_block_seqs(ids, "PARM-00001", 2).is_empty());
    }
}
