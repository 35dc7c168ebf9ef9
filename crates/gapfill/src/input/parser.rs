//! Loading tables from delimited text files and spreadsheets.

use std::collections::HashSet;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::source::{Dataset, SourceMetadata};
use crate::error::{GapfillError, Result};

/// Delimiters to try when auto-detecting.
const DELIMITERS: &[u8] = &[b'\t', b',', b';', b'|'];

/// Extensions handled by the spreadsheet reader.
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Extensions handled by the delimited-text reader.
const TEXT_EXTENSIONS: &[&str] = &["csv", "tsv", "txt"];

/// File kind, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Workbook,
    Delimited,
}

impl FileKind {
    /// Classify a path by its extension.
    pub fn of(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if WORKBOOK_EXTENSIONS.contains(&ext.as_str()) {
            Ok(FileKind::Workbook)
        } else if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            Ok(FileKind::Delimited)
        } else {
            Err(GapfillError::UnsupportedFormat(format!(
                "'{}' (expected one of {:?} or {:?})",
                path.display(),
                WORKBOOK_EXTENSIONS,
                TEXT_EXTENSIONS
            )))
        }
    }
}

/// Parser configuration.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Delimiter for text files (None = auto-detect).
    pub delimiter: Option<u8>,
    /// Quote character for text files.
    pub quote: u8,
    /// Maximum rows to read (None = all).
    pub max_rows: Option<usize>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            quote: b'"',
            max_rows: None,
        }
    }
}

/// Loads tabular files into [`Dataset`]s with every cell as text.
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Create a new parser with default configuration.
    pub fn new() -> Self {
        Self {
            config: ParserConfig::default(),
        }
    }

    /// Create a parser with custom configuration.
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// List the sheets available in a file.
    ///
    /// Delimited text files expose one sheet named after the file stem.
    pub fn list_sheets(&self, path: impl AsRef<Path>) -> Result<Vec<String>> {
        let path = path.as_ref();
        match FileKind::of(path)? {
            FileKind::Workbook => {
                let workbook = open_workbook_auto(path)?;
                Ok(workbook.sheet_names().to_vec())
            }
            FileKind::Delimited => Ok(vec![text_sheet_name(path)]),
        }
    }

    /// Load one sheet, using the 1-based `header_row` as column names.
    pub fn load(
        &self,
        path: impl AsRef<Path>,
        sheet: &str,
        header_row: usize,
    ) -> Result<(Dataset, SourceMetadata)> {
        let path = path.as_ref();
        if header_row == 0 {
            return Err(GapfillError::Config(
                "Header row is 1-based and must be at least 1".to_string(),
            ));
        }

        let contents = fs::read(path).map_err(|e| GapfillError::io(path, e))?;
        let mut hasher = Sha256::new();
        hasher.update(&contents);
        let hash = format!("sha256:{:x}", hasher.finalize());

        let (grid, format) = match FileKind::of(path)? {
            FileKind::Workbook => (self.read_sheet(path, sheet)?, workbook_format(path)),
            FileKind::Delimited => {
                let delimiter = match self.config.delimiter {
                    Some(d) => d,
                    None => detect_delimiter(&contents)?,
                };
                let format = match delimiter {
                    b'\t' => "tsv",
                    b',' => "csv",
                    b';' => "csv-semicolon",
                    b'|' => "psv",
                    _ => "delimited",
                }
                .to_string();
                (self.read_delimited(&contents, delimiter)?, format)
            }
        };

        let dataset = self.grid_to_dataset(grid, header_row)?;
        info!(
            file = %path.display(),
            sheet,
            rows = dataset.row_count(),
            columns = dataset.column_count(),
            "Loaded table"
        );

        let metadata = SourceMetadata::new(
            path.to_path_buf(),
            sheet.to_string(),
            hash,
            contents.len() as u64,
            format,
            &dataset,
        );
        Ok((dataset, metadata))
    }

    /// Read every cell of a workbook sheet as text, anchored at A1.
    fn read_sheet(&self, path: &Path, sheet: &str) -> Result<Vec<Vec<String>>> {
        let mut workbook = open_workbook_auto(path)?;
        if !workbook.sheet_names().iter().any(|s| s == sheet) {
            return Err(GapfillError::Config(format!(
                "Sheet '{}' not found in '{}'",
                sheet,
                path.display()
            )));
        }
        let range = workbook.worksheet_range(sheet)?;
        Ok(range_to_grid(&range))
    }

    /// Read a delimited text buffer into raw rows (header included).
    fn read_delimited(&self, bytes: &[u8], delimiter: u8) -> Result<Vec<Vec<String>>> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .quote(self.config.quote)
            .flexible(true)
            .from_reader(bytes);

        let mut grid = Vec::new();
        for result in reader.records() {
            let record = result?;
            grid.push(record.iter().map(|s| s.to_string()).collect());
        }
        Ok(grid)
    }

    /// Split a raw grid into headers and rows.
    fn grid_to_dataset(&self, mut grid: Vec<Vec<String>>, header_row: usize) -> Result<Dataset> {
        let header_idx = header_row - 1;
        if grid.len() <= header_idx {
            return Err(GapfillError::EmptyData(format!(
                "Header row {} is past the end of the data ({} rows)",
                header_row,
                grid.len()
            )));
        }

        let mut rows = grid.split_off(header_idx + 1);
        let raw_headers = grid.pop().unwrap_or_default();
        let headers = unique_headers(&raw_headers);
        if headers.is_empty() {
            return Err(GapfillError::EmptyData("No columns found".to_string()));
        }

        if let Some(max) = self.config.max_rows {
            rows.truncate(max);
        }
        // Trailing blank lines are an export artifact, not records.
        while rows
            .last()
            .is_some_and(|r| r.iter().all(|c| c.trim().is_empty()))
        {
            rows.pop();
        }

        debug!(header_row, columns = headers.len(), "Resolved headers");
        Ok(Dataset::new(headers, rows))
    }
}

/// Every sheet of a workbook as raw text grids, in workbook order.
pub(crate) fn read_all_sheets(path: &Path) -> Result<Vec<(String, Vec<Vec<String>>)>> {
    let mut workbook = open_workbook_auto(path)?;
    let names = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook.worksheet_range(&name)?;
        sheets.push((name, range_to_grid(&range)));
    }
    Ok(sheets)
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Trim header names, name blank ones and de-duplicate repeats.
fn unique_headers(raw: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .enumerate()
        .map(|(i, h)| {
            let base = match h.trim() {
                "" => format!("Unnamed: {}", i),
                trimmed => trimmed.to_string(),
            };
            let mut name = base.clone();
            let mut n = 1;
            while !seen.insert(name.clone()) {
                name = format!("{}.{}", base, n);
                n += 1;
            }
            name
        })
        .collect()
}

/// Convert a calamine range into text rows starting at cell A1.
fn range_to_grid(range: &calamine::Range<Data>) -> Vec<Vec<String>> {
    let Some((start_row, start_col)) = range.start() else {
        return Vec::new();
    };
    let (height, width) = range.get_size();
    let total_cols = start_col as usize + width;

    let mut grid = vec![vec![String::new(); total_cols]; start_row as usize];
    for row in range.rows().take(height) {
        let mut cells = vec![String::new(); start_col as usize];
        cells.extend(row.iter().map(cell_to_string));
        grid.push(cells);
    }
    grid
}

/// Text form of workbook date cells.
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render a spreadsheet cell as text.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                n.to_string()
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::DateTime(dt) if !dt.is_duration() => match dt.as_datetime() {
            Some(datetime) => datetime.format(DATETIME_FORMAT).to_string(),
            None => dt.as_f64().to_string(),
        },
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#{:?}", e),
    }
}

fn text_sheet_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Sheet1".to_string())
}

fn workbook_format(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| "xlsx".to_string())
}

/// Detect the delimiter by analyzing the first few lines.
fn detect_delimiter(bytes: &[u8]) -> Result<u8> {
    let reader = BufReader::new(bytes);
    let lines: Vec<String> = reader
        .lines()
        .take(10)
        .filter_map(|l| l.ok())
        .filter(|l| !l.trim().is_empty())
        .collect();

    if lines.is_empty() {
        return Err(GapfillError::EmptyData("No lines to analyze".to_string()));
    }

    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delim in DELIMITERS {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_delimiter_in_line(line, delim))
            .collect();

        let first_count = counts[0];
        if first_count == 0 {
            continue;
        }

        // Consistent counts win; tab gets a small bonus since it rarely appears in values
        let consistent = counts.iter().all(|&c| c == first_count);
        let score = if consistent {
            first_count * 1000 + if delim == b'\t' { 100 } else { 0 }
        } else {
            first_count
        };

        if score > best_score {
            best_score = score;
            best_delimiter = delim;
        }
    }

    Ok(best_delimiter)
}

/// Count delimiter occurrences in a line, respecting quotes.
fn count_delimiter_in_line(line: &str, delimiter: u8) -> usize {
    let delim_char = delimiter as char;
    let mut count = 0;
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == delim_char && !in_quotes => count += 1,
            _ => {}
        }
    }

    count
}
