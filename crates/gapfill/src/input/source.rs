//! Tabular data and source metadata.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GapfillError, Result};

/// Reserved name of the engine's working key column.
///
/// Never created by the engine, and dropped from every persisted output.
pub const KEY_COLUMN: &str = "_KEY_";

/// Metadata about a loaded source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// File name without path.
    pub file: String,
    /// Full path to the file.
    pub path: PathBuf,
    /// Sheet the data was read from.
    pub sheet: String,
    /// SHA-256 hash of the file contents.
    pub hash: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Detected format (csv, tsv, xlsx, etc.).
    pub format: String,
    /// Number of data rows (excluding header).
    pub row_count: usize,
    /// Number of columns.
    pub column_count: usize,
    /// When the file was loaded.
    pub loaded_at: DateTime<Utc>,
}

impl SourceMetadata {
    /// Create metadata for a file that has been loaded.
    pub fn new(
        path: PathBuf,
        sheet: String,
        hash: String,
        size_bytes: u64,
        format: String,
        dataset: &Dataset,
    ) -> Self {
        let file = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            file,
            path,
            sheet,
            hash,
            size_bytes,
            format,
            row_count: dataset.row_count(),
            column_count: dataset.column_count(),
            loaded_at: Utc::now(),
        }
    }
}

/// An ordered table of text cells.
///
/// Columns are unique and keep insertion order; rows are never reordered or
/// removed by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    /// Column headers.
    pub headers: Vec<String>,
    /// Row data as strings (row-major order).
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    /// Create a new dataset. Short rows are padded, long rows truncated.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Build a dataset from string slices, mostly useful in tests and fixtures.
    pub fn from_rows(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Get the number of rows (excluding header).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Find the position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Check whether a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Find a column whose name case-insensitively matches one of `labels`.
    ///
    /// Labels are tried in order, so earlier labels take precedence. `labels`
    /// must already be lowercase.
    pub fn find_column(&self, labels: &[&str]) -> Option<&str> {
        labels.iter().find_map(|label| {
            self.headers
                .iter()
                .find(|h| h.to_lowercase() == *label)
                .map(String::as_str)
        })
    }

    /// All columns whose names case-insensitively match one of `labels`.
    pub fn find_columns(&self, labels: &[&str]) -> Vec<String> {
        self.headers
            .iter()
            .filter(|h| labels.contains(&h.to_lowercase().as_str()))
            .cloned()
            .collect()
    }

    /// Get a specific cell value by position.
    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(col).map(|s| s.as_str()))
    }

    /// Get a cell value by column name.
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.get(row, col)
    }

    /// Borrow a row view, if the index is in range.
    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        if index < self.rows.len() {
            Some(Row { dataset: self, index })
        } else {
            None
        }
    }

    /// Iterate over all rows in order.
    pub fn iter_rows(&self) -> impl Iterator<Item = Row<'_>> {
        (0..self.rows.len()).map(move |index| Row { dataset: self, index })
    }

    /// Overwrite a cell. Fails if the row or column does not exist.
    pub fn set(&mut self, row: usize, column: &str, value: impl Into<String>) -> Result<()> {
        let col = self
            .column_index(column)
            .ok_or_else(|| GapfillError::MissingColumn {
                dataset: "dataset".to_string(),
                column: column.to_string(),
            })?;
        let len = self.rows.len();
        let cells = self.rows.get_mut(row).ok_or_else(|| {
            GapfillError::Config(format!("Row {} out of range ({} rows)", row, len))
        })?;
        cells[col] = value.into();
        Ok(())
    }

    /// Append a column, filling every row with `default`.
    ///
    /// Returns `false` without touching the data if the column already exists.
    pub fn add_column(&mut self, name: &str, default: &str) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() || name == KEY_COLUMN {
            return Err(GapfillError::InvalidColumn(name.to_string()));
        }
        if self.has_column(name) {
            return Ok(false);
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(default.to_string());
        }
        Ok(true)
    }

    /// Positions of rows with any cell containing `needle` as an exact substring.
    pub fn rows_containing(&self, needle: &str) -> Vec<usize> {
        if needle.is_empty() {
            return Vec::new();
        }
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().any(|cell| cell.contains(needle)))
            .map(|(i, _)| i)
            .collect()
    }

    /// Next `(row, column)` after `after` whose cell contains `needle`.
    ///
    /// Scans in row-major order and wraps around to the start; `after = None`
    /// starts at the first cell.
    pub fn find_next(&self, needle: &str, after: Option<(usize, usize)>) -> Option<(usize, usize)> {
        let width = self.headers.len();
        let total = self.rows.len() * width;
        if needle.is_empty() || total == 0 {
            return None;
        }
        let start = match after {
            Some((row, col)) => (row * width + col + 1) % total,
            None => 0,
        };
        (0..total)
            .map(|offset| (start + offset) % total)
            .map(|flat| (flat / width, flat % width))
            .find(|&(row, col)| self.rows[row][col].contains(needle))
    }

    /// Copy of the dataset without the reserved key column.
    pub fn without_key_column(&self) -> Dataset {
        match self.column_index(KEY_COLUMN) {
            None => self.clone(),
            Some(idx) => {
                let mut headers = self.headers.clone();
                headers.remove(idx);
                let rows = self
                    .rows
                    .iter()
                    .map(|r| {
                        let mut r = r.clone();
                        r.remove(idx);
                        r
                    })
                    .collect();
                Dataset { headers, rows }
            }
        }
    }
}

/// A borrowed view of one dataset row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    dataset: &'a Dataset,
    index: usize,
}

impl<'a> Row<'a> {
    /// Position of the row in its dataset.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Cell value by column name; `None` if the column does not exist.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.dataset.value(self.index, column)
    }

    /// Whether the row's dataset has the given column.
    pub fn has_column(&self, column: &str) -> bool {
        self.dataset.has_column(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::from_rows(&["id", "Street"], &[&["1", "Main 1"], &["2"]])
    }

    #[test]
    fn test_rows_are_padded() {
        let ds = sample();
        assert_eq!(ds.get(1, 1), Some(""));
        assert_eq!(ds.value(0, "Street"), Some("Main 1"));
        assert_eq!(ds.value(0, "missing"), None);
    }

    #[test]
    fn test_find_column_case_insensitive() {
        let ds = sample();
        assert_eq!(ds.find_column(&["street"]), Some("Street"));
        assert_eq!(ds.find_column(&["phone"]), None);
    }

    #[test]
    fn test_add_column() {
        let mut ds = sample();
        assert!(ds.add_column(" note ", "x").unwrap());
        assert_eq!(ds.value(1, "note"), Some("x"));
        assert!(!ds.add_column("note", "y").unwrap());
        assert_eq!(ds.value(1, "note"), Some("x"));
        assert!(ds.add_column(KEY_COLUMN, "").is_err());
        assert!(ds.add_column("  ", "").is_err());
    }

    #[test]
    fn test_set_unknown_column() {
        let mut ds = sample();
        assert!(matches!(
            ds.set(0, "nope", "x"),
            Err(GapfillError::MissingColumn { .. })
        ));
        ds.set(0, "Street", "Other 2").unwrap();
        assert_eq!(ds.value(0, "Street"), Some("Other 2"));
    }

    #[test]
    fn test_set_row_out_of_range() {
        let mut ds = sample();
        let err = ds.set(9, "Street", "x").unwrap_err();
        assert!(matches!(err, GapfillError::Config(ref msg) if msg.contains("9") && msg.contains("2 rows")));
    }

    #[test]
    fn test_find_column_label_precedence() {
        let ds = Dataset::from_rows(&["PLZ", "zipCode"], &[]);
        assert_eq!(ds.find_column(&["zipcode", "plz"]), Some("zipCode"));
        assert_eq!(ds.find_column(&["plz", "zipcode"]), Some("PLZ"));
    }

    #[test]
    fn test_search() {
        let ds = Dataset::from_rows(
            &["a", "b"],
            &[&["acme", "x"], &["y", "ACME"], &["z", "acme corp"]],
        );
        assert_eq!(ds.rows_containing("acme"), vec![0, 2]);
        assert!(ds.rows_containing("").is_empty());

        assert_eq!(ds.find_next("acme", None), Some((0, 0)));
        assert_eq!(ds.find_next("acme", Some((0, 0))), Some((2, 1)));
        assert_eq!(ds.find_next("acme", Some((2, 1))), Some((0, 0)));
        assert_eq!(ds.find_next("nothing", None), None);
    }

    #[test]
    fn test_without_key_column() {
        let ds = Dataset::from_rows(&["id", KEY_COLUMN, "name"], &[&["1", "1", "A"]]);
        let out = ds.without_key_column();
        assert_eq!(out.headers, vec!["id", "name"]);
        assert_eq!(out.rows[0], vec!["1", "A"]);
    }

    #[test]
    fn test_row_view() {
        let ds = sample();
        let row = ds.row(0).unwrap();
        assert_eq!(row.index(), 0);
        assert_eq!(row.get("id"), Some("1"));
        assert!(ds.row(5).is_none());
    }
}
