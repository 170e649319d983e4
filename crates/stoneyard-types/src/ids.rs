//! Identifier grammar for the quarry lineage.
//!
//! Three structured shapes, one per tier:
//!
//! | Tier  | Shape                          | Example                    |
//! |-------|--------------------------------|----------------------------|
//! | QBID  | `qbid-<short>-<seq>`           | `qbid-parm-00001`          |
//! | Block | `BLK-<BASE>-<seq or letters>`  | `BLK-PARM-00001-A`         |
//! | Slab  | `SLID-<BASE>-<blk>-<n>`        | `SLID-PARM-00001-001-004`  |
//!
//! `<BASE>` is the parent QBID without its `qbid-` prefix, uppercased.
//! Block suffixes come in two styles: zero-padded digits (`-001`) or
//! bijective base-26 letters (`-A` … `-Z`, `-AA`). QBIDs parse
//! case-insensitively; block and slab grammar is uppercase-only, so
//! identifiers minted before this scheme simply parse to `None`.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::material;

/// Strip `prefix` from the front of `s`, ASCII case-insensitively.
fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

// ── QBID ────────────────────────────────────────────────────────────────────

/// A QBID that follows the structured grammar.
///
/// Parsing is the namespace membership test: allocators skip any stored
/// identifier this cannot represent.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ParsedQbid {
    /// Material short code, lowercased (1–12 alphanumerics).
    pub short: String,
    /// Receipt sequence within the material namespace.
    pub seq: u32,
}

impl ParsedQbid {
    /// Parse `qbid-<short>-<seq>`, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        let rest = strip_prefix_ci(s.trim(), "qbid-")?;
        let (short, seq) = rest.split_once('-')?;
        if short.is_empty() || short.len() > 12 {
            return None;
        }
        if !short.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        if seq.is_empty() || !seq.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(Self {
            short: short.to_ascii_lowercase(),
            seq: seq.parse().ok()?,
        })
    }
}

impl fmt::Display for ParsedQbid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "qbid-{}-{:05}", self.short, self.seq)
    }
}

/// The `<BASE>` embedded in child identifiers: the QBID without its
/// `qbid-` prefix, uppercased. `qbid-parm-00001` → `PARM-00001`.
pub fn qbid_base(qbid: &str) -> String {
    let t = qbid.trim();
    strip_prefix_ci(t, "qbid-").unwrap_or(t).to_ascii_uppercase()
}

// ── Block IDs ───────────────────────────────────────────────────────────────

/// Which suffix shape a lineage uses for its block identifiers.
#[derive(
    Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum BlockIdStyle {
    /// Zero-padded three-digit suffix: `BLK-PARM-00001-001`.
    Numeric,
    /// Bijective base-26 letter suffix: `BLK-PARM-00001-A`.
    #[default]
    Letter,
}

impl BlockIdStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockIdStyle::Numeric => "numeric",
            BlockIdStyle::Letter => "letter",
        }
    }

    /// Case-insensitive parse; `None` for unknown styles.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as std::str::FromStr>::from_str(s.trim()).ok()
    }
}

impl fmt::Display for BlockIdStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A block identifier that follows the structured grammar.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ParsedBlockId {
    /// Parent namespace: `<SHORT>-<digits>`, uppercase.
    pub base: String,
    /// Block sequence within the parent (letters decode bijectively).
    pub seq: u32,
    /// Suffix shape the identifier was written in.
    pub style: BlockIdStyle,
}

impl ParsedBlockId {
    /// Parse `BLK-<BASE>-<seq>` where `<BASE>` is `[A-Z0-9]{1,20}-<digits>`
    /// and `<seq>` is either exactly three digits or 1–6 uppercase letters.
    pub fn parse(s: &str) -> Option<Self> {
        let rest = s.trim().strip_prefix("BLK-")?;
        let (base, suffix) = rest.rsplit_once('-')?;
        let (head, digits) = base.split_once('-')?;
        if head.is_empty() || head.len() > 20 {
            return None;
        }
        if !head
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        {
            return None;
        }
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        let (seq, style) = if suffix.len() == 3 && suffix.chars().all(|c| c.is_ascii_digit()) {
            (suffix.parse().ok()?, BlockIdStyle::Numeric)
        } else if !suffix.is_empty() && suffix.len() <= 6 {
            (index_from_letters(suffix)?, BlockIdStyle::Letter)
        } else {
            return None;
        };

        Some(Self {
            base: base.to_string(),
            seq,
            style,
        })
    }

    /// Render a block ID for `base` in the given style.
    pub fn format(base: &str, seq: u32, style: BlockIdStyle) -> String {
        match style {
            BlockIdStyle::Numeric => format!("BLK-{base}-{seq:03}"),
            BlockIdStyle::Letter => format!("BLK-{base}-{}", letters_from_index(seq)),
        }
    }
}

impl fmt::Display for ParsedBlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Self::format(&self.base, self.seq, self.style))
    }
}

/// Structured block ID for a parseable parent QBID. `None` when the parent
/// predates the grammar.
pub fn block_id_for(parent_qbid: &str, seq: u32, style: BlockIdStyle) -> Option<String> {
    ParsedQbid::parse(parent_qbid)?;
    Some(ParsedBlockId::format(&qbid_base(parent_qbid), seq, style))
}

/// Letter-style fallback for parents that predate the structured grammar:
/// `<SHORT>-<BASE>-BLOCK-<letters>`.
///
/// Takes the resolved short code; callers prefer a persisted code over one
/// derived from the material name, matching how pre-grammar rows were
/// labeled.
pub fn legacy_block_id(material_short: &str, parent_qbid: &str, index: u32) -> String {
    let short = material_short.trim();
    format!(
        "{}-{}-BLOCK-{}",
        if short.is_empty() {
            material::short_code(short)
        } else {
            short.to_string()
        },
        qbid_base(parent_qbid),
        letters_from_index(index)
    )
}

// ── Bijective base-26 letters ───────────────────────────────────────────────

/// Bijective base-26 encoding: 1 → `A`, 26 → `Z`, 27 → `AA`, 28 → `AB`.
/// Indexes below 1 clamp to 1.
pub fn letters_from_index(index: u32) -> String {
    let mut n = index.max(1);
    let mut out = String::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        out.insert(0, (b'A' + rem) as char);
        n = (n - 1) / 26;
    }
    out
}

/// Inverse of [`letters_from_index`]. Rejects empty input and anything
/// outside `A-Z`.
pub fn index_from_letters(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut idx: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_uppercase() {
            return None;
        }
        idx = idx.checked_mul(26)?.checked_add(c as u32 - 'A' as u32 + 1)?;
    }
    Some(idx)
}

// ── Slab IDs ────────────────────────────────────────────────────────────────

/// A slab identifier that follows the structured grammar.
///
/// The block position is always rendered numerically, even when the block
/// itself carries a letter suffix: slab `004` of block `BLK-PARM-00001-A`
/// is `SLID-PARM-00001-001-004`.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ParsedSlid {
    /// Parent namespace, same `<BASE>` as the block tier.
    pub base: String,
    /// Position of the block within the QBID.
    pub block_seq: u32,
    /// Position of the slab within the block.
    pub slab_seq: u32,
}

impl ParsedSlid {
    /// Parse `SLID-<BASE>-<blk>-<n>` with three-digit block and slab parts.
    pub fn parse(s: &str) -> Option<Self> {
        let rest = s.trim().strip_prefix("SLID-")?;
        let (rest, slab) = rest.rsplit_once('-')?;
        let (base, block) = rest.rsplit_once('-')?;
        if !is_three_digits(block) || !is_three_digits(slab) {
            return None;
        }
        let (head, digits) = base.split_once('-')?;
        if head.is_empty() || head.len() > 20 {
            return None;
        }
        if !head
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        {
            return None;
        }
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(Self {
            base: base.to_string(),
            block_seq: block.parse().ok()?,
            slab_seq: slab.parse().ok()?,
        })
    }
}

impl fmt::Display for ParsedSlid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SLID-{}-{:03}-{:03}",
            self.base, self.block_seq, self.slab_seq
        )
    }
}

fn is_three_digits(s: &str) -> bool {
    s.len() == 3 && s.chars().all(|c| c.is_ascii_digit())
}

/// Structured SLID for a slab of `block_id`, or `None` when the block
/// predates the grammar (callers fall back to a random SLID).
pub fn slid_for(block_id: &str, slab_seq: u32) -> Option<String> {
    let block = ParsedBlockId::parse(block_id)?;
    Some(
        ParsedSlid {
            base: block.base,
            block_seq: block.seq,
            slab_seq,
        }
        .to_string(),
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ── QBID parsing ────────────────────────────────────────────────────

    #[test]
    fn test_qbid_parse_canonical() {
        let p = ParsedQbid::parse("qbid-parm-00001").unwrap();
        assert_eq!(p.short, "parm");
        assert_eq!(p.seq, 1);
    }

    #[test]
    fn test_qbid_parse_is_case_insensitive() {
        let p = ParsedQbid::parse("QBID-PARM-00023").unwrap();
        assert_eq!(p.short, "parm");
        assert_eq!(p.seq, 23);
    }

    #[test]
    fn test_qbid_parse_trims_and_allows_digit_shorts() {
        let p = ParsedQbid::parse("  qbid-g2b-00007  ").unwrap();
        assert_eq!(p.short, "g2b");
        assert_eq!(p.seq, 7);
    }

    #[test]
    fn test_qbid_parse_rejects_legacy_shapes() {
        assert!(ParsedQbid::parse("QBID-DEMO1").is_none());
        assert!(ParsedQbid::parse("qbid-parm-").is_none());
        assert!(ParsedQbid::parse("qbid--00001").is_none());
        assert!(ParsedQbid::parse("qbid-parm-00a01").is_none());
        assert!(ParsedQbid::parse("qbid-waytoolongshort-00001").is_none());
        assert!(ParsedQbid::parse("blk-parm-00001").is_none());
        assert!(ParsedQbid::parse("").is_none());
    }

    #[test]
    fn test_qbid_display_pads_to_five() {
        let p = ParsedQbid {
            short: "parm".into(),
            seq: 12,
        };
        assert_eq!(p.to_string(), "qbid-parm-00012");

        let wide = ParsedQbid {
            short: "parm".into(),
            seq: 123456,
        };
        assert_eq!(wide.to_string(), "qbid-parm-123456");
    }

    #[test]
    fn test_qbid_base_strips_and_uppercases() {
        assert_eq!(qbid_base("qbid-parm-00001"), "PARM-00001");
        assert_eq!(qbid_base("QBID-DEMO1"), "DEMO1");
        assert_eq!(qbid_base("  legacy-id  "), "LEGACY-ID");
    }

    // ── Block parsing ───────────────────────────────────────────────────

    #[test]
    fn test_block_parse_numeric() {
        let p = ParsedBlockId::parse("BLK-PARM-00001-003").unwrap();
        assert_eq!(p.base, "PARM-00001");
        assert_eq!(p.seq, 3);
        assert_eq!(p.style, BlockIdStyle::Numeric);
    }

    #[test]
    fn test_block_parse_letter() {
        let p = ParsedBlockId::parse("BLK-PARM-00001-A").unwrap();
        assert_eq!(p.seq, 1);
        assert_eq!(p.style, BlockIdStyle::Letter);

        let p = ParsedBlockId::parse("BLK-PARM-00001-AA").unwrap();
        assert_eq!(p.seq, 27);
    }

    #[test]
    fn test_block_parse_is_case_sensitive() {
        assert!(ParsedBlockId::parse("blk-parm-00001-a").is_none());
        assert!(ParsedBlockId::parse("BLK-parm-00001-A").is_none());
    }

    #[test]
    fn test_block_parse_rejects_malformed() {
        assert!(ParsedBlockId::parse("BLK-PARM-00001").is_none());
        assert!(ParsedBlockId::parse("BLK-PARM-00001-01").is_none());
        assert!(ParsedBlockId::parse("BLK-PARM-00001-0001").is_none());
        assert!(ParsedBlockId::parse("BLK-PARM-00001-ABCDEFG").is_none());
        assert!(ParsedBlockId::parse("BLK-PARM-00001-A1").is_none());
        assert!(ParsedBlockId::parse("BLK-PA-RM-1-001").is_none());
        assert!(ParsedBlockId::parse("PARM-00001-001").is_none());
    }

    #[test]
    fn test_block_format_round_trips() {
        let id = ParsedBlockId::format("PARM-00001", 4, BlockIdStyle::Numeric);
        assert_eq!(id, "BLK-PARM-00001-004");
        assert_eq!(ParsedBlockId::parse(&id).unwrap().seq, 4);

        let id = ParsedBlockId::format("PARM-00001", 28, BlockIdStyle::Letter);
        assert_eq!(id, "BLK-PARM-00001-AB");
        assert_eq!(ParsedBlockId::parse(&id).unwrap().seq, 28);
    }

    #[test]
    fn test_block_id_for_requires_structured_parent() {
        assert_eq!(
            block_id_for("qbid-parm-00001", 2, BlockIdStyle::Letter).as_deref(),
            Some("BLK-PARM-00001-B")
        );
        assert!(block_id_for("QBID-DEMO1", 2, BlockIdStyle::Letter).is_none());
    }

    #[test]
    fn test_legacy_block_id_shape() {
        assert_eq!(
            legacy_block_id("PARA", "QBID-DEMO1", 1),
            "PARA-DEMO1-BLOCK-A"
        );
        // Blank short codes fall back to the letterless material code.
        assert_eq!(legacy_block_id("", "QBID-DEMO1", 2), "MAT-DEMO1-BLOCK-B");
    }

    // ── Letter codec ────────────────────────────────────────────────────

    #[test]
    fn test_letters_from_index() {
        assert_eq!(letters_from_index(1), "A");
        assert_eq!(letters_from_index(2), "B");
        assert_eq!(letters_from_index(26), "Z");
        assert_eq!(letters_from_index(27), "AA");
        assert_eq!(letters_from_index(28), "AB");
        assert_eq!(letters_from_index(52), "AZ");
        assert_eq!(letters_from_index(53), "BA");
        assert_eq!(letters_from_index(702), "ZZ");
        assert_eq!(letters_from_index(703), "AAA");
    }

    #[test]
    fn test_letters_clamp_below_one() {
        assert_eq!(letters_from_index(0), "A");
    }

    #[test]
    fn test_index_from_letters() {
        assert_eq!(index_from_letters("A"), Some(1));
        assert_eq!(index_from_letters("Z"), Some(26));
        assert_eq!(index_from_letters("AA"), Some(27));
        assert_eq!(index_from_letters("ZZ"), Some(702));
        assert_eq!(index_from_letters(""), None);
        assert_eq!(index_from_letters("a"), None);
        assert_eq!(index_from_letters("A1"), None);
    }

    #[test]
    fn test_letter_codec_round_trips() {
        for n in 1..=1000 {
            assert_eq!(index_from_letters(&letters_from_index(n)), Some(n));
        }
    }

    // ── SLID parsing ────────────────────────────────────────────────────

    #[test]
    fn test_slid_parse_canonical() {
        let p = ParsedSlid::parse("SLID-PARM-00001-001-004").unwrap();
        assert_eq!(p.base, "PARM-00001");
        assert_eq!(p.block_seq, 1);
        assert_eq!(p.slab_seq, 4);
    }

    #[test]
    fn test_slid_parse_rejects_malformed() {
        assert!(ParsedSlid::parse("SLID-PARM-00001-001").is_none());
        assert!(ParsedSlid::parse("SLID-PARM-00001-1-004").is_none());
        assert!(ParsedSlid::parse("SLID-PARM-00001-001-04").is_none());
        assert!(ParsedSlid::parse("SLID-ABCDEF12").is_none());
        assert!(ParsedSlid::parse("slid-parm-00001-001-004").is_none());
    }

    #[test]
    fn test_slid_display_round_trips() {
        let p = ParsedSlid {
            base: "PARM-00001".into(),
            block_seq: 2,
            slab_seq: 13,
        };
        let s = p.to_string();
        assert_eq!(s, "SLID-PARM-00001-002-013");
        assert_eq!(ParsedSlid::parse(&s).unwrap(), p);
    }

    #[test]
    fn test_slid_for_uses_numeric_block_position() {
        assert_eq!(
            slid_for("BLK-PARM-00001-A", 4).as_deref(),
            Some("SLID-PARM-00001-001-004")
        );
        assert_eq!(
            slid_for("BLK-PARM-00001-002", 1).as_deref(),
            Some("SLID-PARM-00001-002-001")
        );
        assert!(slid_for("PARA-DEMO1-BLOCK-A", 1).is_none());
    }

    // ── Style enum ──────────────────────────────────────────────────────

    #[test]
    fn test_style_default_is_letter() {
        assert_eq!(BlockIdStyle::default(), BlockIdStyle::Letter);
    }

    #[test]
    fn test_style_parse() {
        assert_eq!(BlockIdStyle::from_str("letter"), Some(BlockIdStyle::Letter));
        assert_eq!(
            BlockIdStyle::from_str("NUMERIC"),
            Some(BlockIdStyle::Numeric)
        );
        assert_eq!(BlockIdStyle::from_str("roman"), None);
    }

    #[test]
    fn test_style_serde_names() {
        assert_eq!(
            serde_json::to_string(&BlockIdStyle::Letter).unwrap(),
            "\"letter\""
        );
    }
}
