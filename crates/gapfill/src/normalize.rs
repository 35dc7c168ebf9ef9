//! Value and key normalization.
//!
//! Every comparison the engine makes goes through these functions, so they
//! must stay pure: the output depends on the input text only.

/// Tokens that spreadsheet exports leave behind in place of an empty cell.
///
/// Compared against the normalized, lowercased cell text.
pub const MISSING_TOKENS: &[&str] = &["", "nan", "none", "-", "n/a", "null"];

/// Trim surrounding whitespace and collapse internal runs to one space.
pub fn normalize_text(raw: Option<&str>) -> String {
    match raw {
        Some(s) => s.split_whitespace().collect::<Vec<_>>().join(" "),
        None => String::new(),
    }
}

/// Normalize a join key, optionally stripping leading zeros.
///
/// Stripping also drops whitespace it uncovers, so `"00 12"` becomes `"12"`.
/// An empty result means the row is unkeyed.
pub fn normalize_key(raw: Option<&str>, keep_leading_zeros: bool) -> String {
    let text = normalize_text(raw);
    if keep_leading_zeros {
        text
    } else {
        text.trim_start_matches(['0', ' ']).to_string()
    }
}

/// Normalize one segment of a composite key (text normalization plus case folding).
pub fn normalize_segment(raw: Option<&str>) -> String {
    normalize_text(raw).to_lowercase()
}

/// Check if a cell value counts as missing.
pub fn is_missing(raw: Option<&str>) -> bool {
    let folded = normalize_text(raw).to_lowercase();
    MISSING_TOKENS.contains(&folded.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text(Some("  Main \t  Street\n 12 ")), "Main Street 12");
        assert_eq!(normalize_text(None), "");
        assert_eq!(normalize_text(Some("   ")), "");
    }

    #[test]
    fn test_normalize_key_leading_zeros() {
        assert_eq!(normalize_key(Some(" 000123 "), true), "000123");
        assert_eq!(normalize_key(Some(" 000123 "), false), "123");
        assert_eq!(normalize_key(Some("0000"), false), "");
        assert_eq!(normalize_key(Some("00 12"), false), "12");
        assert_eq!(normalize_key(Some(" 0 0 12 a"), false), "12 a");
        assert_eq!(normalize_key(Some("00 12"), true), "00 12");
    }

    #[test]
    fn test_normalize_segment_folds_case() {
        assert_eq!(normalize_segment(Some(" ACME  GmbH ")), "acme gmbh");
    }

    #[test]
    fn test_is_missing() {
        for v in ["", "NaN", "None", "-", "N/A", "null", "  NULL ", " n/a"] {
            assert!(is_missing(Some(v)), "{v:?} should be missing");
        }
        assert!(is_missing(None));
        assert!(!is_missing(Some("0")));
        assert!(!is_missing(Some("false")));
        assert!(!is_missing(Some("NA")));
    }
}
