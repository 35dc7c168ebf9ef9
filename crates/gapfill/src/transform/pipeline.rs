//! Value transforms applied while auto-filling.
//!
//! All functions here are pure; the only external dependency, the postal-code
//! lookup, is passed in and may be absent.

use once_cell::sync::Lazy;
use regex::Regex;

use super::geocode::RegionLookup;
use crate::normalize::is_missing;

// =============================================================================
// COLUMN LABELS
// =============================================================================
// Lowercase column names the transforms recognize, matched case-insensitively.

/// Street columns eligible for street / house number splitting.
pub const STREET_LABELS: &[&str] = &["street", "straße", "strasse"];

/// House number columns receiving the split-off number.
pub const HOUSE_NUMBER_LABELS: &[&str] = &["housenumber", "hausnummer"];

/// Phone columns eligible for normalization.
pub const PHONE_LABELS: &[&str] = &[
    "phone",
    "phonegeneral",
    "telefon",
    "festnetz",
    "mobil",
    "mobilgeneral",
];

/// Postal code columns, in lookup preference order.
pub const POSTAL_CODE_LABELS: &[&str] = &["zipcode", "plz", "postalcode"];

/// Country column filled with the configured default.
pub const COUNTRY_LABELS: &[&str] = &["country"];

/// State column filled from the postal code lookup.
pub const STATE_LABELS: &[&str] = &["state"];

/// Country scope for postal-code lookups.
pub const POSTAL_COUNTRY: &str = "DE";

/// Check if a column name is in a label set.
pub fn is_label(column: &str, labels: &[&str]) -> bool {
    labels.contains(&column.to_lowercase().as_str())
}

// =============================================================================
// PATTERNS
// =============================================================================

static STREET_HOUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.*?)\s+(\d+[a-zA-Z]?(?:[-/]\d+[a-zA-Z]?)?)\s*$").unwrap()
});

// "(0)" marks the trunk prefix that is dropped when dialing internationally
static TRUNK_ZERO: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\s*0\s*\)").unwrap());

static NON_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\D+").unwrap());

// =============================================================================
// TRANSFORMS
// =============================================================================

/// Split an address line into street name and trailing house number.
///
/// Without a recognizable trailing number the whole trimmed value is the street.
pub fn split_street_house(value: Option<&str>) -> (String, String) {
    let s = value.unwrap_or("").trim();
    if s.is_empty() {
        return (String::new(), String::new());
    }
    match STREET_HOUSE.captures(s) {
        Some(caps) => (
            caps[1].trim().to_string(),
            caps[2].trim().to_string(),
        ),
        None => (s.to_string(), String::new()),
    }
}

/// Reduce a phone number to digits, keeping a leading `+`.
pub fn normalize_phone(value: Option<&str>) -> String {
    let s = value.unwrap_or("").trim();
    if s.is_empty() {
        return String::new();
    }
    if s.starts_with('+') {
        let without_trunk = TRUNK_ZERO.replace_all(s, "");
        format!("+{}", NON_DIGIT.replace_all(&without_trunk, ""))
    } else {
        NON_DIGIT.replace_all(s, "").into_owned()
    }
}

/// Use `default_value` when `current` is missing.
pub fn fill_country_default(current: Option<&str>, default_value: &str) -> String {
    if is_missing(current) {
        default_value.to_string()
    } else {
        current.unwrap_or("").to_string()
    }
}

/// Look up the state for a five-digit postal code.
///
/// Returns `None` when the code is malformed, no lookup is available, or the
/// lookup has no answer.
pub fn state_from_postal_code(zip: Option<&str>, lookup: Option<&dyn RegionLookup>) -> Option<String> {
    let digits = NON_DIGIT.replace_all(zip?, "");
    if digits.len() != 5 {
        return None;
    }
    let region = lookup?.region_for(&digits, POSTAL_COUNTRY)?;
    let region = region.trim();
    if region.is_empty() {
        None
    } else {
        Some(region.to_string())
    }
}
