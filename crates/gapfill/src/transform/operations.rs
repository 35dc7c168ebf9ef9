//! Transform rules and the records describing edits.

use serde::{Deserialize, Serialize};

/// A named, toggle-able value transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformRule {
    /// Split "Street 12a" into street and house number columns.
    SplitStreetHouse,
    /// Reduce phone numbers to digits (keeping a leading `+`).
    NormalizePhone,
    /// Fill an empty country column with the configured default.
    FillCountryDefault,
    /// Fill an empty state column from the postal code.
    InferStateFromZip,
}

impl TransformRule {
    /// All rules, in application order.
    pub const ALL: [TransformRule; 4] = [
        TransformRule::SplitStreetHouse,
        TransformRule::NormalizePhone,
        TransformRule::FillCountryDefault,
        TransformRule::InferStateFromZip,
    ];

    /// Stable name used in settings files and change descriptions.
    pub fn name(&self) -> &'static str {
        match self {
            TransformRule::SplitStreetHouse => "split_street_house",
            TransformRule::NormalizePhone => "normalize_phone",
            TransformRule::FillCountryDefault => "fill_country_default",
            TransformRule::InferStateFromZip => "infer_state_from_zip",
        }
    }

    /// Parse a rule from its stable name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.name() == name)
    }
}

/// Which transform rules are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformRules {
    pub split_street_house: bool,
    pub normalize_phone: bool,
    pub fill_country_default: bool,
    pub infer_state_from_zip: bool,
}

impl Default for TransformRules {
    fn default() -> Self {
        Self {
            split_street_house: true,
            normalize_phone: true,
            fill_country_default: false,
            infer_state_from_zip: false,
        }
    }
}

impl TransformRules {
    /// All rules disabled.
    pub fn none() -> Self {
        Self {
            split_street_house: false,
            normalize_phone: false,
            fill_country_default: false,
            infer_state_from_zip: false,
        }
    }

    pub fn is_enabled(&self, rule: TransformRule) -> bool {
        match rule {
            TransformRule::SplitStreetHouse => self.split_street_house,
            TransformRule::NormalizePhone => self.normalize_phone,
            TransformRule::FillCountryDefault => self.fill_country_default,
            TransformRule::InferStateFromZip => self.infer_state_from_zip,
        }
    }

    pub fn set(&mut self, rule: TransformRule, enabled: bool) {
        match rule {
            TransformRule::SplitStreetHouse => self.split_street_house = enabled,
            TransformRule::NormalizePhone => self.normalize_phone = enabled,
            TransformRule::FillCountryDefault => self.fill_country_default = enabled,
            TransformRule::InferStateFromZip => self.infer_state_from_zip = enabled,
        }
    }

    /// Builder form of [`TransformRules::set`].
    pub fn with(mut self, rule: TransformRule, enabled: bool) -> Self {
        self.set(rule, enabled);
        self
    }
}

/// One proposed or applied edit to a primary cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Normalized key of the edited row.
    pub key: String,
    /// Position of the edited primary row.
    pub primary_row_index: usize,
    /// Primary column written.
    pub target_column: String,
    /// Value written.
    pub new_value: String,
    /// Where the value came from, e.g. `secondary[3]:Tel (normalize_phone)`.
    pub source_description: String,
}

/// How an auto-fill attempt on one row ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillOutcome {
    /// Matching secondary rows were found and processed.
    Matched,
    /// No secondary row shares the key.
    NoMatch,
    /// The row has no key, or does not exist.
    Unkeyed,
}

/// Result of an auto-fill run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillReport {
    /// Fields filled from linked secondary columns.
    pub fields_filled: usize,
    /// Rows that had at least one matching secondary row.
    pub rows_matched: usize,
    /// Rows without any matching secondary row.
    pub rows_unmatched: usize,
    /// Every cell written, including derived ones (house number, country, state).
    pub changes: Vec<ChangeRecord>,
}

impl FillReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self {
            fields_filled: 0,
            rows_matched: 0,
            rows_unmatched: 0,
            changes: Vec::new(),
        }
    }

    /// Fold a single-row result into this report.
    pub fn absorb(&mut self, outcome: FillOutcome, row: FillReport) {
        match outcome {
            FillOutcome::Matched => self.rows_matched += 1,
            FillOutcome::NoMatch => self.rows_unmatched += 1,
            FillOutcome::Unkeyed => {}
        }
        self.fields_filled += row.fields_filled;
        self.changes.extend(row.changes);
    }

    /// Outcome of a single-row report.
    pub fn outcome(&self) -> FillOutcome {
        if self.rows_matched > 0 {
            FillOutcome::Matched
        } else if self.rows_unmatched > 0 {
            FillOutcome::NoMatch
        } else {
            FillOutcome::Unkeyed
        }
    }
}

impl Default for FillReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_names_round_trip() {
        for rule in TransformRule::ALL {
            assert_eq!(TransformRule::from_name(rule.name()), Some(rule));
        }
        assert_eq!(TransformRule::from_name("bogus"), None);
    }

    #[test]
    fn test_default_toggles() {
        let rules = TransformRules::default();
        assert!(rules.is_enabled(TransformRule::SplitStreetHouse));
        assert!(rules.is_enabled(TransformRule::NormalizePhone));
        assert!(!rules.is_enabled(TransformRule::FillCountryDefault));
        assert!(!rules.is_enabled(TransformRule::InferStateFromZip));
    }

    #[test]
    fn test_partial_toggles_deserialize() {
        let rules: TransformRules = serde_json::from_str(r#"{"fill_country_default": true}"#).unwrap();
        assert!(rules.fill_country_default);
        assert!(rules.split_street_house);
    }

    #[test]
    fn test_report_absorb() {
        let mut total = FillReport::new();
        let mut row = FillReport::new();
        row.fields_filled = 2;
        row.rows_matched = 1;
        total.absorb(row.outcome(), row);
        total.absorb(FillOutcome::NoMatch, FillReport::new());
        assert_eq!(total.fields_filled, 2);
        assert_eq!(total.rows_matched, 1);
        assert_eq!(total.rows_unmatched, 1);
    }
}
