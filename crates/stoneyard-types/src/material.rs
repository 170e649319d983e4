//! Material short-code derivation.
//!
//! Every material name compresses to the short code embedded in QBIDs: the
//! first three letters of the first word plus the first letter of the second
//! ("Paradiso Multi" → `PARM`). Single-word names borrow their own fourth
//! letter instead ("Paradiso" → `PARA`). Codes are at most four characters;
//! names with no letters at all fall back to `MAT`.

/// Word separators accepted in material names.
fn is_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | '/' | '_' | '-')
}

/// Uppercase a word, keeping only ASCII letters.
fn alpha_upper(word: &str) -> String {
    word.chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Uppercase short code for a material name, at most four characters.
///
/// "Paradiso Multi" → `PARM`, "Kuppam-Green" → `KUPG`, "Paradiso" → `PARA`,
/// anything letterless → `MAT`.
pub fn short_code(name: &str) -> String {
    let mut words = name.trim().split(is_separator).filter(|w| !w.is_empty());
    let first = words.next().map(alpha_upper).unwrap_or_default();
    let second = words.next().map(alpha_upper).unwrap_or_default();

    let mut code: String = first.chars().take(3).collect();
    match second.chars().next() {
        Some(c) => code.push(c),
        None => code.extend(first.chars().nth(3)),
    }

    if code.is_empty() {
        "MAT".to_string()
    } else {
        code
    }
}

/// Lowercase variant used inside QBIDs themselves: `short_code`, lowered,
/// restricted to `[a-z0-9]`, falling back to `mat`.
pub fn short_code_lower(name: &str) -> String {
    let code: String = short_code(name)
        .chars()
        .map(|c| c.to_ascii_lowercase())
        .filter(char::is_ascii_alphanumeric)
        .collect();

    if code.is_empty() {
        "mat".to_string()
    } else {
        code
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ── Two-word names ──────────────────────────────────────────────────

    #[test]
    fn test_two_words_take_three_plus_one() {
        assert_eq!(short_code("Paradiso Multi"), "PARM");
        assert_eq!(short_code("Paradiso Classic"), "PARC");
        assert_eq!(short_code("Kuppam Green"), "KUPG");
    }

    #[test]
    fn test_separator_variants() {
        assert_eq!(short_code("Kuppam-Green"), "KUPG");
        assert_eq!(short_code("Kuppam_Green"), "KUPG");
        assert_eq!(short_code("Kuppam/Green"), "KUPG");
        assert_eq!(short_code("Kuppam,Green"), "KUPG");
        assert_eq!(short_code("Kuppam  ,  Green"), "KUPG");
    }

    #[test]
    fn test_extra_words_ignored() {
        assert_eq!(short_code("Paradiso Multi Premium"), "PARM");
    }

    // ── Single-word names ───────────────────────────────────────────────

    #[test]
    fn test_single_word_borrows_fourth_letter() {
        assert_eq!(short_code("Paradiso"), "PARA");
        assert_eq!(short_code("Granite"), "GRAN");
    }

    #[test]
    fn test_short_single_word_stays_short() {
        assert_eq!(short_code("Red"), "RED");
        assert_eq!(short_code("Ab"), "AB");
    }

    // ── Degenerate input ────────────────────────────────────────────────

    #[test]
    fn test_letterless_falls_back() {
        assert_eq!(short_code(""), "MAT");
        assert_eq!(short_code("   "), "MAT");
        assert_eq!(short_code("123"), "MAT");
        assert_eq!(short_code("-- / --"), "MAT");
    }

    #[test]
    fn test_digits_are_stripped_from_words() {
        // Digit-only second word contributes nothing, so the fourth letter
        // of the first word steps in.
        assert_eq!(short_code("Granite 2"), "GRAN");
        assert_eq!(short_code("G2 Black"), "GB");
    }

    #[test]
    fn test_case_is_normalized() {
        assert_eq!(short_code("paradiso multi"), "PARM");
        assert_eq!(short_code("PARADISO MULTI"), "PARM");
    }

    // ── Lowercase variant ───────────────────────────────────────────────

    #[test]
    fn test_lower_variant() {
        assert_eq!(short_code_lower("Paradiso Multi"), "parm");
        assert_eq!(short_code_lower("Kuppam Green"), "kupg");
        assert_eq!(short_code_lower(""), "mat");
    }

    #[test]
    fn test_lower_accepts_precomputed_codes() {
        // Callers may pass an already-derived code back through.
        assert_eq!(short_code_lower("PARM"), "parm");
        assert_eq!(short_code_lower("parm"), "parm");
    }
}
