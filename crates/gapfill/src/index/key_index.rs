//! Single-secondary key matching.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::links::FieldLinks;
use crate::error::{GapfillError, Result};
use crate::input::{Dataset, Row};
use crate::normalize::{is_missing, normalize_key, normalize_text};

/// Which columns carry the join key on each side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Key column in the primary dataset.
    pub primary_key: String,
    /// Key column in the secondary dataset.
    pub secondary_key: String,
    /// Keep leading zeros when normalizing keys.
    pub keep_leading_zeros: bool,
}

impl KeyConfig {
    pub fn new(primary_key: impl Into<String>, secondary_key: impl Into<String>) -> Self {
        Self {
            primary_key: primary_key.into(),
            secondary_key: secondary_key.into(),
            keep_leading_zeros: true,
        }
    }

    pub fn with_keep_leading_zeros(mut self, keep: bool) -> Self {
        self.keep_leading_zeros = keep;
        self
    }
}

/// One candidate value for a primary field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillCandidate {
    /// Normalized candidate value.
    pub value: String,
    /// Secondary column the value came from.
    pub source_column: String,
    /// Position of the secondary row.
    pub row_index: usize,
}

/// Key grouping over one secondary dataset, matched against a primary dataset.
///
/// Owns the secondary dataset. The primary dataset stays with the caller, so
/// operations that read primary values take it as an argument; its keys are
/// cached and must be refreshed with [`KeyIndex::refresh_primary`] whenever the
/// primary key column changes.
#[derive(Debug, Clone)]
pub struct KeyIndex {
    config: KeyConfig,
    secondary: Dataset,
    primary_keys: Vec<String>,
    groups: HashMap<String, Vec<usize>>,
}

impl KeyIndex {
    /// Build the index. Fails only if a key column does not exist.
    pub fn build(primary: &Dataset, secondary: Dataset, config: KeyConfig) -> Result<Self> {
        let mut index = Self {
            config,
            secondary,
            primary_keys: Vec::new(),
            groups: HashMap::new(),
        };
        index.rebuild(primary)?;
        Ok(index)
    }

    /// Replace the key configuration and rebuild everything.
    pub fn set_config(&mut self, primary: &Dataset, config: KeyConfig) -> Result<()> {
        self.config = config;
        self.rebuild(primary)
    }

    /// Replace the secondary dataset and rebuild everything.
    pub fn set_secondary(&mut self, primary: &Dataset, secondary: Dataset) -> Result<()> {
        self.secondary = secondary;
        self.rebuild(primary)
    }

    /// Recompute primary keys after the primary dataset changed.
    pub fn refresh_primary(&mut self, primary: &Dataset) -> Result<()> {
        self.primary_keys = column_keys(
            primary,
            "primary",
            &self.config.primary_key,
            self.config.keep_leading_zeros,
        )?;
        Ok(())
    }

    fn rebuild(&mut self, primary: &Dataset) -> Result<()> {
        let secondary_keys = column_keys(
            &self.secondary,
            "secondary",
            &self.config.secondary_key,
            self.config.keep_leading_zeros,
        )?;
        self.refresh_primary(primary)?;

        let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
        for (row, key) in secondary_keys.into_iter().enumerate() {
            if !key.is_empty() {
                groups.entry(key).or_default().push(row);
            }
        }
        self.groups = groups;

        info!(
            primary_rows = self.primary_keys.len(),
            secondary_rows = self.secondary.row_count(),
            distinct_keys = self.groups.len(),
            "Built key index"
        );
        Ok(())
    }

    /// The key configuration in use.
    pub fn config(&self) -> &KeyConfig {
        &self.config
    }

    /// The secondary dataset.
    pub fn secondary(&self) -> &Dataset {
        &self.secondary
    }

    /// Normalized key of a primary row (empty if unkeyed or out of range).
    pub fn primary_key_at(&self, row: usize) -> &str {
        self.primary_keys.get(row).map(String::as_str).unwrap_or("")
    }

    /// Keys of primary rows with at least one missing value among `columns`.
    ///
    /// One entry per qualifying row, in dataset order; a key repeats if several
    /// primary rows share it. Unkeyed rows are skipped, and columns the primary
    /// dataset does not have are ignored.
    pub fn missing_keys(&self, primary: &Dataset, columns: &[String]) -> Vec<String> {
        let present: Vec<usize> = columns
            .iter()
            .filter_map(|c| primary.column_index(c))
            .collect();

        let mut keys = Vec::new();
        for (row, key) in self.primary_keys.iter().enumerate() {
            if key.is_empty() {
                continue;
            }
            if present.iter().any(|&col| is_missing(primary.get(row, col))) {
                keys.push(key.clone());
            }
        }
        keys
    }

    /// Position of the first primary row with this key.
    ///
    /// Later primary rows sharing the key are not reachable through this lookup.
    pub fn primary_row_for_key(&self, key: &str) -> Option<usize> {
        if key.is_empty() {
            return None;
        }
        self.primary_keys.iter().position(|k| k == key)
    }

    /// Positions of all secondary rows with this key, in dataset order.
    pub fn secondary_row_indices(&self, key: &str) -> &[usize] {
        self.groups.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All secondary rows with this key, in dataset order.
    pub fn secondary_rows_for_key(&self, key: &str) -> Vec<Row<'_>> {
        self.secondary_row_indices(key)
            .iter()
            .filter_map(|&i| self.secondary.row(i))
            .collect()
    }

    /// Every non-missing linked value for each target column.
    ///
    /// Target columns without a link (or whose linked column is absent from the
    /// secondary dataset) are left out. Ties are not resolved here.
    pub fn fill_candidates(
        &self,
        key: &str,
        targets: &[String],
        links: &FieldLinks,
    ) -> IndexMap<String, Vec<FillCandidate>> {
        let rows = self.secondary_rows_for_key(key);
        let mut out = IndexMap::new();

        for target in targets {
            let Some(source_column) = links.target(target) else {
                continue;
            };
            if !self.secondary.has_column(source_column) {
                continue;
            }
            let candidates: Vec<FillCandidate> = rows
                .iter()
                .filter_map(|row| {
                    let raw = row.get(source_column);
                    if is_missing(raw) {
                        return None;
                    }
                    Some(FillCandidate {
                        value: normalize_text(raw),
                        source_column: source_column.to_string(),
                        row_index: row.index(),
                    })
                })
                .collect();
            out.insert(target.clone(), candidates);
        }
        out
    }
}

/// Normalized key of every row for one column.
fn column_keys(
    dataset: &Dataset,
    role: &str,
    column: &str,
    keep_leading_zeros: bool,
) -> Result<Vec<String>> {
    let col = dataset
        .column_index(column)
        .ok_or_else(|| GapfillError::MissingColumn {
            dataset: format!("{} dataset", role),
            column: column.to_string(),
        })?;
    Ok((0..dataset.row_count())
        .map(|row| normalize_key(dataset.get(row, col), keep_leading_zeros))
        .collect())
}
