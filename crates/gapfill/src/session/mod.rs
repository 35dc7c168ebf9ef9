//! Reconciliation sessions: one primary dataset, its secondary indexes, and the
//! auto-fill workflow over them.
//!
//! A session exclusively owns the primary dataset while it is being edited and
//! hands it back through [`ReconciliationSession::into_primary`]. It holds no
//! locks; embedders must serialize mutating calls.
//!
//! # Example
//!
//! ```
//! use gapfill::{Dataset, FieldLinks, KeyConfig, ReconciliationSession};
//!
//! let primary = Dataset::from_rows(&["id", "phone"], &[&["1", ""]]);
//! let secondary = Dataset::from_rows(&["cust", "Tel"], &[&["1", "030 123"]]);
//!
//! let mut session = ReconciliationSession::new(primary);
//! session.attach_secondary(secondary, KeyConfig::new("id", "cust")).unwrap();
//! session.set_links(FieldLinks::new().with_link("phone", "Tel"));
//!
//! let report = session.autofill_all().unwrap();
//! assert_eq!(report.fields_filled, 1);
//! assert_eq!(session.primary().value(0, "phone"), Some("030123"));
//! ```

mod fill;
mod queue;

use indexmap::IndexMap;
use tracing::info;

use crate::error::{GapfillError, Result};
use crate::index::{FieldLinks, FillCandidate, KeyConfig, KeyIndex, MatchProfile, MultiSourceIndex};
use crate::input::{Dataset, KEY_COLUMN, Row};
use crate::transform::{ChangeRecord, FillReport, RegionLookup, TransformRules};

use fill::{FillPolicy, MatchedRow};
pub use queue::FlaggedKeyQueue;

/// Default value for the country column.
pub const DEFAULT_COUNTRY: &str = "Deutschland";

/// Label used for single-secondary rows in change descriptions.
const SECONDARY_LABEL: &str = "secondary";

/// Orchestrates matching and auto-fill over one primary dataset.
pub struct ReconciliationSession {
    primary: Dataset,
    index: Option<KeyIndex>,
    sources: Option<MultiSourceIndex>,
    links: FieldLinks,
    rules: TransformRules,
    country_default: String,
    region_lookup: Option<Box<dyn RegionLookup>>,
    queue: FlaggedKeyQueue,
}

impl ReconciliationSession {
    /// Start a session over a primary dataset.
    pub fn new(primary: Dataset) -> Self {
        Self {
            primary,
            index: None,
            sources: None,
            links: FieldLinks::new(),
            rules: TransformRules::default(),
            country_default: DEFAULT_COUNTRY.to_string(),
            region_lookup: None,
            queue: FlaggedKeyQueue::default(),
        }
    }

    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------

    /// Index a secondary dataset by key. Any previous scan is discarded.
    pub fn attach_secondary(&mut self, secondary: Dataset, config: KeyConfig) -> Result<()> {
        self.index = Some(KeyIndex::build(&self.primary, secondary, config)?);
        self.queue = FlaggedKeyQueue::default();
        Ok(())
    }

    /// Change the key columns and rebuild the index.
    pub fn set_key_config(&mut self, config: KeyConfig) -> Result<()> {
        let index = self.index.as_mut().ok_or_else(no_secondary)?;
        index.set_config(&self.primary, config)?;
        self.queue = FlaggedKeyQueue::default();
        Ok(())
    }

    /// Index several sources by composite key.
    pub fn attach_sources(&mut self, sources: IndexMap<String, Dataset>, profile: MatchProfile) {
        self.sources = Some(MultiSourceIndex::build(sources, profile));
    }

    /// Change the composite key fields and rebuild the source indexes.
    pub fn set_match_profile(&mut self, profile: MatchProfile) -> Result<()> {
        let sources = self.sources.as_mut().ok_or_else(no_sources)?;
        sources.set_profile(profile);
        Ok(())
    }

    pub fn set_links(&mut self, links: FieldLinks) {
        self.links = links;
    }

    pub fn link(&mut self, primary: impl Into<String>, secondary: impl Into<String>) {
        self.links.link(primary, secondary);
    }

    pub fn links(&self) -> &FieldLinks {
        &self.links
    }

    pub fn set_rules(&mut self, rules: TransformRules) {
        self.rules = rules;
    }

    pub fn rules(&self) -> TransformRules {
        self.rules
    }

    pub fn set_country_default(&mut self, value: impl Into<String>) {
        self.country_default = value.into();
    }

    pub fn country_default(&self) -> &str {
        &self.country_default
    }

    /// Install a postal-code lookup. Without one, state inference does nothing.
    pub fn set_region_lookup(&mut self, lookup: impl RegionLookup + 'static) {
        self.region_lookup = Some(Box::new(lookup));
    }

    // -------------------------------------------------------------------------
    // Data access
    // -------------------------------------------------------------------------

    pub fn primary(&self) -> &Dataset {
        &self.primary
    }

    /// End the session and take the (possibly edited) primary dataset back.
    pub fn into_primary(self) -> Dataset {
        self.primary
    }

    pub fn key_index(&self) -> Option<&KeyIndex> {
        self.index.as_ref()
    }

    pub fn source_index(&self) -> Option<&MultiSourceIndex> {
        self.sources.as_ref()
    }

    /// Primary key column of the single-secondary index, if attached.
    pub fn key_column(&self) -> Option<&str> {
        self.index.as_ref().map(|i| i.config().primary_key.as_str())
    }

    /// Edit one primary cell. Editing the key column refreshes the index.
    pub fn set_cell(&mut self, row: usize, column: &str, value: impl Into<String>) -> Result<()> {
        self.primary.set(row, column, value)?;
        if self.key_column() == Some(column) {
            self.refresh_primary_keys()?;
        }
        Ok(())
    }

    /// Append a column to the primary dataset.
    ///
    /// Returns `false` if the column already exists.
    pub fn add_column(&mut self, name: &str, default: &str) -> Result<bool> {
        let added = self.primary.add_column(name, default)?;
        if added {
            info!(column = name.trim(), "Added primary column");
        }
        Ok(added)
    }

    /// Apply externally chosen edits, e.g. one candidate picked per field.
    ///
    /// Every record is validated before anything is written; returns the number
    /// of cells written.
    pub fn apply_changes(&mut self, changes: &[ChangeRecord]) -> Result<usize> {
        for change in changes {
            if !self.primary.has_column(&change.target_column) {
                return Err(GapfillError::MissingColumn {
                    dataset: "primary dataset".to_string(),
                    column: change.target_column.clone(),
                });
            }
            if change.primary_row_index >= self.primary.row_count() {
                return Err(GapfillError::Config(format!(
                    "Change targets row {} but the primary dataset has {} rows",
                    change.primary_row_index,
                    self.primary.row_count()
                )));
            }
        }

        let mut touched_key = false;
        for change in changes {
            self.primary.set(
                change.primary_row_index,
                &change.target_column,
                change.new_value.clone(),
            )?;
            touched_key |= self.key_column() == Some(change.target_column.as_str());
        }
        if touched_key {
            self.refresh_primary_keys()?;
        }
        info!(changes = changes.len(), "Applied changes");
        Ok(changes.len())
    }

    fn refresh_primary_keys(&mut self) -> Result<()> {
        if let Some(index) = self.index.as_mut() {
            index.refresh_primary(&self.primary)?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Scanning and navigation
    // -------------------------------------------------------------------------

    /// Primary columns checked by a default scan: everything but the key.
    pub fn default_scan_columns(&self) -> Vec<String> {
        let key = self.key_column();
        self.primary
            .headers
            .iter()
            .filter(|h| h.as_str() != KEY_COLUMN && Some(h.as_str()) != key)
            .cloned()
            .collect()
    }

    /// Queue the keys of primary rows missing any of `columns`.
    pub fn scan(&mut self, columns: &[String]) -> Result<&FlaggedKeyQueue> {
        let index = self.index.as_ref().ok_or_else(no_secondary)?;
        let keys = index.missing_keys(&self.primary, columns);
        info!(flagged = keys.len(), columns = columns.len(), "Scanned for missing fields");
        self.queue = FlaggedKeyQueue::new(keys);
        Ok(&self.queue)
    }

    /// Scan using [`ReconciliationSession::default_scan_columns`].
    pub fn scan_default(&mut self) -> Result<&FlaggedKeyQueue> {
        let columns = self.default_scan_columns();
        self.scan(&columns)
    }

    pub fn queue(&self) -> &FlaggedKeyQueue {
        &self.queue
    }

    pub fn next_key(&mut self) -> Option<&str> {
        self.queue.next_key()
    }

    pub fn prev_key(&mut self) -> Option<&str> {
        self.queue.prev_key()
    }

    pub fn current_key(&self) -> Option<&str> {
        self.queue.current()
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    /// First primary row with this key.
    pub fn primary_row_for_key(&self, key: &str) -> Option<usize> {
        self.index.as_ref()?.primary_row_for_key(key)
    }

    /// Secondary rows sharing this key (empty without an index).
    pub fn secondary_rows_for_key(&self, key: &str) -> Vec<Row<'_>> {
        self.index
            .as_ref()
            .map(|i| i.secondary_rows_for_key(key))
            .unwrap_or_default()
    }

    /// All fill candidates for `targets`, or every non-key column when `None`.
    pub fn candidates(
        &self,
        key: &str,
        targets: Option<&[String]>,
    ) -> Result<IndexMap<String, Vec<FillCandidate>>> {
        let index = self.index.as_ref().ok_or_else(no_secondary)?;
        let defaults;
        let targets = match targets {
            Some(t) => t,
            None => {
                defaults = self.default_scan_columns();
                &defaults
            }
        };
        Ok(index.fill_candidates(key, targets, &self.links))
    }

    /// Matching row positions per source for one primary row.
    pub fn matches_for_row(&self, row: usize) -> Result<IndexMap<String, Vec<usize>>> {
        let sources = self.sources.as_ref().ok_or_else(no_sources)?;
        Ok(sources.match_for_primary_row(&self.primary, row))
    }

    /// Secondary rows containing `needle` anywhere.
    pub fn search_secondary(&self, needle: &str) -> Vec<usize> {
        self.index
            .as_ref()
            .map(|i| i.secondary().rows_containing(needle))
            .unwrap_or_default()
    }

    /// Next secondary cell containing `needle`, wrapping around.
    pub fn find_next_in_secondary(
        &self,
        needle: &str,
        after: Option<(usize, usize)>,
    ) -> Option<(usize, usize)> {
        self.index.as_ref()?.secondary().find_next(needle, after)
    }

    // -------------------------------------------------------------------------
    // Auto-fill
    // -------------------------------------------------------------------------

    /// Auto-fill the first primary row carrying `key`.
    ///
    /// An unknown key or a key without secondary matches fills nothing.
    pub fn autofill_key(&mut self, key: &str) -> Result<FillReport> {
        let index = self.index.as_ref().ok_or_else(no_secondary)?;
        let Some(row) = index.primary_row_for_key(key) else {
            return Ok(FillReport::new());
        };
        let report = self.autofill_row(row)?;
        info!(key, fields = report.fields_filled, outcome = ?report.outcome(), "Auto-filled key");
        Ok(report)
    }

    /// Auto-fill the key at the current queue position.
    pub fn autofill_current(&mut self) -> Result<FillReport> {
        match self.queue.current().map(str::to_string) {
            Some(key) => self.autofill_key(&key),
            None => Ok(FillReport::new()),
        }
    }

    /// Auto-fill one primary row from the single-secondary index.
    pub fn autofill_row(&mut self, row: usize) -> Result<FillReport> {
        let index = self.index.as_ref().ok_or_else(no_secondary)?;
        let key = index.primary_key_at(row).to_string();
        if key.is_empty() {
            return Ok(FillReport::new());
        }

        let skip = vec![index.config().primary_key.clone()];
        let matches: Vec<MatchedRow<'_>> = index
            .secondary_rows_for_key(&key)
            .into_iter()
            .map(|row| MatchedRow {
                source: SECONDARY_LABEL,
                row,
            })
            .collect();

        let policy = FillPolicy {
            links: &self.links,
            rules: self.rules,
            country_default: &self.country_default,
            lookup: self.region_lookup.as_deref(),
        };
        Ok(policy.fill_row(&mut self.primary, row, &key, &skip, &matches))
    }

    /// Auto-fill every keyed primary row.
    ///
    /// Fails before touching any data if no links are configured.
    pub fn autofill_all(&mut self) -> Result<FillReport> {
        if self.links.is_empty() {
            return Err(GapfillError::Config(
                "No field links defined; link primary columns to secondary columns first"
                    .to_string(),
            ));
        }
        if self.index.is_none() {
            return Err(no_secondary());
        }

        let mut total = FillReport::new();
        for row in 0..self.primary.row_count() {
            let report = self.autofill_row(row)?;
            total.absorb(report.outcome(), report);
        }

        // Key columns are skipped by the policy, so cached primary keys stay valid
        info!(
            fields = total.fields_filled,
            matched = total.rows_matched,
            unmatched = total.rows_unmatched,
            "Auto-filled all rows"
        );
        Ok(total)
    }

    /// Auto-fill one primary row from every composite-key source.
    pub fn autofill_row_from_sources(&mut self, row: usize) -> Result<FillReport> {
        let sources = self.sources.as_ref().ok_or_else(no_sources)?;
        let Some(primary_row) = self.primary.row(row) else {
            return Ok(FillReport::new());
        };
        let Some(key) = crate::index::composite_key(primary_row, &sources.profile().primary_fields)
        else {
            return Ok(FillReport::new());
        };

        let skip = sources.profile().primary_fields.clone();
        let matches: Vec<MatchedRow<'_>> = sources
            .matched_rows(&self.primary, row)
            .into_iter()
            .map(|(source, row)| MatchedRow { source, row })
            .collect();

        let policy = FillPolicy {
            links: &self.links,
            rules: self.rules,
            country_default: &self.country_default,
            lookup: self.region_lookup.as_deref(),
        };
        let report = policy.fill_row(&mut self.primary, row, &key, &skip, &matches);
        info!(row, fields = report.fields_filled, "Auto-filled row from sources");
        Ok(report)
    }
}

fn no_secondary() -> GapfillError {
    GapfillError::Config("No secondary dataset attached".to_string())
}

fn no_sources() -> GapfillError {
    GapfillError::Config("No match sources attached".to_string())
}
