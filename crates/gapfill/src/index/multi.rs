//! Composite-key matching against several secondary sources.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::input::{Dataset, Row};
use crate::normalize::normalize_segment;

/// Separator between composite key segments.
pub const KEY_SEPARATOR: &str = "|";

/// Composite-key fields for the primary dataset and for each source.
///
/// Field lists may differ in length and content between sources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchProfile {
    /// Fields forming the primary key.
    pub primary_fields: Vec<String>,
    /// Fields forming each source's key, by source id.
    pub source_fields: IndexMap<String, Vec<String>>,
}

impl MatchProfile {
    pub fn new(primary_fields: Vec<String>) -> Self {
        Self {
            primary_fields,
            source_fields: IndexMap::new(),
        }
    }

    pub fn with_source(mut self, source_id: impl Into<String>, fields: Vec<String>) -> Self {
        self.source_fields.insert(source_id.into(), fields);
        self
    }

    /// Key fields for a source (empty if not configured).
    pub fn fields_for(&self, source_id: &str) -> &[String] {
        self.source_fields
            .get(source_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Build the composite key of a row.
///
/// Absent fields contribute an empty segment so keys keep their shape. A key
/// whose segments are all empty identifies nothing and is returned as `None`,
/// so blank rows never match each other. A plain join would give them the key
/// `"||"` and match every blank row to every other.
pub fn composite_key(row: Row<'_>, fields: &[String]) -> Option<String> {
    if fields.is_empty() {
        return None;
    }
    let segments: Vec<String> = fields
        .iter()
        .map(|f| normalize_segment(row.get(f)))
        .collect();
    if segments.iter().all(String::is_empty) {
        return None;
    }
    Some(segments.join(KEY_SEPARATOR))
}

/// Per-source composite key grouping.
#[derive(Debug, Clone)]
pub struct MultiSourceIndex {
    profile: MatchProfile,
    sources: IndexMap<String, Dataset>,
    indexes: IndexMap<String, HashMap<String, Vec<usize>>>,
}

impl MultiSourceIndex {
    /// Index every source by its configured key fields.
    ///
    /// A source with no configured fields gets an empty index and never matches.
    pub fn build(sources: IndexMap<String, Dataset>, profile: MatchProfile) -> Self {
        let mut indexes = IndexMap::new();
        for (source_id, dataset) in &sources {
            let fields = profile.fields_for(source_id);
            let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
            if !fields.is_empty() {
                for row in dataset.iter_rows() {
                    if let Some(key) = composite_key(row, fields) {
                        groups.entry(key).or_default().push(row.index());
                    }
                }
            }
            debug!(source = %source_id, keys = groups.len(), "Indexed source");
            indexes.insert(source_id.clone(), groups);
        }

        info!(sources = sources.len(), "Built multi-source index");
        Self {
            profile,
            sources,
            indexes,
        }
    }

    /// Replace the profile and rebuild all source indexes.
    pub fn set_profile(&mut self, profile: MatchProfile) {
        let sources = std::mem::take(&mut self.sources);
        *self = Self::build(sources, profile);
    }

    /// The match profile in use.
    pub fn profile(&self) -> &MatchProfile {
        &self.profile
    }

    /// Source datasets in configuration order.
    pub fn sources(&self) -> &IndexMap<String, Dataset> {
        &self.sources
    }

    /// Look up one source dataset.
    pub fn source(&self, source_id: &str) -> Option<&Dataset> {
        self.sources.get(source_id)
    }

    /// Matching row positions per source for one primary row.
    ///
    /// Every source appears in the result; the lists are empty when the row
    /// index is out of range or the primary key is empty.
    pub fn match_for_primary_row(
        &self,
        primary: &Dataset,
        row_index: usize,
    ) -> IndexMap<String, Vec<usize>> {
        let key = primary
            .row(row_index)
            .and_then(|row| composite_key(row, &self.profile.primary_fields));

        self.indexes
            .iter()
            .map(|(source_id, groups)| {
                let hits = key
                    .as_ref()
                    .and_then(|k| groups.get(k))
                    .cloned()
                    .unwrap_or_default();
                (source_id.clone(), hits)
            })
            .collect()
    }

    /// Matched rows across all sources, sources in order and rows in dataset order.
    pub fn matched_rows(&self, primary: &Dataset, row_index: usize) -> Vec<(&str, Row<'_>)> {
        let matches = self.match_for_primary_row(primary, row_index);
        let mut rows = Vec::new();
        for (source_id, dataset) in &self.sources {
            let Some(hits) = matches.get(source_id) else {
                continue;
            };
            for &i in hits {
                if let Some(row) = dataset.row(i) {
                    rows.push((source_id.as_str(), row));
                }
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn primary() -> Dataset {
        Dataset::from_rows(
            &["name", "city", "phone"],
            &[&["ACME  GmbH", "Berlin", ""], &["", "", ""], &["Other", "Köln", ""]],
        )
    }

    fn sources() -> IndexMap<String, Dataset> {
        let mut sources = IndexMap::new();
        sources.insert(
            "crm".to_string(),
            Dataset::from_rows(
                &["Firma", "Ort", "Tel"],
                &[&["acme gmbh", " berlin", "030 1"], &["ACME GmbH", "BERLIN", "030 2"]],
            ),
        );
        sources.insert(
            "erp".to_string(),
            Dataset::from_rows(&["company"], &[&["acme gmbh"]]),
        );
        sources.insert(
            "unconfigured".to_string(),
            Dataset::from_rows(&["name"], &[&["ACME GmbH"]]),
        );
        sources
    }

    fn profile() -> MatchProfile {
        MatchProfile::new(fields(&["name", "city"]))
            .with_source("crm", fields(&["Firma", "Ort"]))
            .with_source("erp", fields(&["company", "location"]))
    }

    #[test]
    fn test_composite_key_shape() {
        let ds = primary();
        let row = ds.row(0).unwrap();
        assert_eq!(
            composite_key(row, &fields(&["name", "missing", "city"])),
            Some("acme gmbh||berlin".to_string())
        );
        assert_eq!(composite_key(ds.row(1).unwrap(), &fields(&["name", "city"])), None);
        assert_eq!(composite_key(row, &[]), None);
    }

    #[test]
    fn test_match_per_source() {
        let index = MultiSourceIndex::build(sources(), profile());
        let matches = index.match_for_primary_row(&primary(), 0);

        assert_eq!(matches.len(), 3);
        assert_eq!(matches["crm"], vec![0, 1]);
        // erp lacks a "location" column, so its key is "acme gmbh|" and does not match
        assert!(matches["erp"].is_empty());
        assert!(matches["unconfigured"].is_empty());
    }

    #[test]
    fn test_missing_field_segment_matches_shape() {
        let profile = MatchProfile::new(fields(&["name", "zip"]))
            .with_source("erp", fields(&["company", "location"]));
        let index = MultiSourceIndex::build(sources(), profile);
        let matches = index.match_for_primary_row(&primary(), 0);
        assert_eq!(matches["erp"], vec![0]);
    }

    #[test]
    fn test_invalid_row_or_empty_key() {
        let index = MultiSourceIndex::build(sources(), profile());
        for row in [1, 99] {
            let matches = index.match_for_primary_row(&primary(), row);
            assert_eq!(matches.len(), 3);
            assert!(matches.values().all(Vec::is_empty));
        }
    }

    #[test]
    fn test_matched_rows_in_source_order() {
        let index = MultiSourceIndex::build(sources(), profile());
        let primary = primary();
        let rows = index.matched_rows(&primary, 0);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, "crm");
        assert_eq!(rows[0].1.get("Tel"), Some("030 1"));
    }

    #[test]
    fn test_set_profile_rebuilds() {
        let mut index = MultiSourceIndex::build(sources(), MatchProfile::default());
        assert!(index.match_for_primary_row(&primary(), 0)["crm"].is_empty());
        index.set_profile(profile());
        assert_eq!(index.match_for_primary_row(&primary(), 0)["crm"], vec![0, 1]);
    }
}
