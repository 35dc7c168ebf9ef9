//! Writing the primary dataset back to disk.
//!
//! Three modes: a timestamped new file, an exact path, and in place with an
//! optional backup. `.csv`/`.tsv`/`.txt` targets are written as delimited text,
//! `.xlsx` targets as workbooks. The reserved key column is never written.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use rust_xlsxwriter::Workbook;
use tracing::{debug, info, warn};

use crate::error::{GapfillError, Result};
use crate::input::{Dataset, read_all_sheets};

/// Minute-granular timestamp used in output and backup names.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H%M";

/// Sheet name used when a workbook has none to replace.
pub const DEFAULT_SHEET: &str = "Sheet1";

/// How a target path is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Xlsx,
    Delimited(u8),
}

impl OutputFormat {
    fn of(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" => Ok(OutputFormat::Xlsx),
            "csv" => Ok(OutputFormat::Delimited(b',')),
            "tsv" | "txt" => Ok(OutputFormat::Delimited(b'\t')),
            _ => Err(GapfillError::UnsupportedFormat(format!(
                "cannot write '{}': use .xlsx, .csv or .tsv",
                path.display()
            ))),
        }
    }
}

/// Write to `{directory}/{base_name}_filled_{timestamp}.xlsx`.
///
/// Fails with [`GapfillError::OutputExists`] if that name is already taken,
/// which happens when saving twice within the same minute.
pub fn save_as_new(primary: &Dataset, directory: &Path, base_name: &str) -> Result<PathBuf> {
    save_as_new_at(primary, directory, base_name, Local::now().naive_local())
}

/// [`save_as_new`] with an explicit timestamp.
pub fn save_as_new_at(
    primary: &Dataset,
    directory: &Path,
    base_name: &str,
    now: NaiveDateTime,
) -> Result<PathBuf> {
    let path = directory.join(format!(
        "{}_filled_{}.xlsx",
        base_name,
        now.format(TIMESTAMP_FORMAT)
    ));
    if path.exists() {
        return Err(GapfillError::OutputExists { path });
    }
    save_as_path(primary, &path)
}

/// Write to exactly `path`, replacing whatever is there.
pub fn save_as_path(primary: &Dataset, path: &Path) -> Result<PathBuf> {
    let data = primary.without_key_column();
    let bytes = match OutputFormat::of(path)? {
        OutputFormat::Xlsx => workbook_bytes(&[(DEFAULT_SHEET.to_string(), grid_of(&data))])?,
        OutputFormat::Delimited(delimiter) => delimited_bytes(&data, delimiter, path)?,
    };
    write_bytes(path, &bytes)?;
    info!(file = %path.display(), rows = data.row_count(), "Saved dataset");
    Ok(path.to_path_buf())
}

/// Replace one sheet of `path` with the dataset, keeping the other sheets.
///
/// With `make_backup`, the current file bytes are first copied to a
/// timestamped sibling. The replaced sheet becomes the first sheet. Sheets
/// other than the replaced one keep their values but not their formatting.
pub fn save_in_place(
    primary: &Dataset,
    path: &Path,
    sheet: Option<&str>,
    make_backup: bool,
) -> Result<PathBuf> {
    save_in_place_at(primary, path, sheet, make_backup, Local::now().naive_local())
}

/// [`save_in_place`] with an explicit timestamp for the backup name.
pub fn save_in_place_at(
    primary: &Dataset,
    path: &Path,
    sheet: Option<&str>,
    make_backup: bool,
    now: NaiveDateTime,
) -> Result<PathBuf> {
    let format = OutputFormat::of(path)?;
    let exists = path.exists();

    if make_backup && exists {
        let backup = backup_path(path, now);
        let bytes = fs::read(path).map_err(|e| GapfillError::io(path, e))?;
        write_bytes(&backup, &bytes)?;
        info!(backup = %backup.display(), "Wrote backup");
    }

    let data = primary.without_key_column();
    let bytes = match format {
        OutputFormat::Delimited(delimiter) => {
            if sheet.is_some() {
                debug!("Delimited files have a single sheet; sheet name ignored");
            }
            delimited_bytes(&data, delimiter, path)?
        }
        OutputFormat::Xlsx => {
            let existing = if exists {
                read_all_sheets(path)?
            } else {
                Vec::new()
            };
            let target = sheet
                .map(str::to_string)
                .or_else(|| existing.first().map(|(name, _)| name.clone()))
                .unwrap_or_else(|| DEFAULT_SHEET.to_string());
            if sheet.is_some() && exists && !existing.iter().any(|(name, _)| *name == target) {
                warn!(sheet = %target, "Sheet not in workbook, adding it");
            }

            let mut sheets = vec![(target.clone(), grid_of(&data))];
            sheets.extend(existing.into_iter().filter(|(name, _)| *name != target));
            debug!(sheets = sheets.len(), "Rewriting workbook");
            workbook_bytes(&sheets)?
        }
    };

    write_bytes(path, &bytes)?;
    info!(file = %path.display(), rows = data.row_count(), "Saved in place");
    Ok(path.to_path_buf())
}

/// Sibling backup name: `{stem}_backup_{timestamp}{ext}`.
pub fn backup_path(path: &Path, now: NaiveDateTime) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    path.with_file_name(format!(
        "{}_backup_{}{}",
        stem,
        now.format(TIMESTAMP_FORMAT),
        ext
    ))
}

fn grid_of(data: &Dataset) -> Vec<Vec<String>> {
    let mut grid = Vec::with_capacity(data.row_count() + 1);
    grid.push(data.headers.clone());
    grid.extend(data.rows.iter().cloned());
    grid
}

fn workbook_bytes(sheets: &[(String, Vec<Vec<String>>)]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    for (name, grid) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(name)?;
        for (r, row) in grid.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                worksheet.write_string(r as u32, c as u16, value)?;
            }
        }
    }
    Ok(workbook.save_to_buffer()?)
}

fn delimited_bytes(data: &Dataset, delimiter: u8, path: &Path) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    writer.write_record(&data.headers)?;
    for row in &data.rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| GapfillError::io(path, e.into_error()))
}

/// Write the whole buffer at once so a locked target fails before truncation.
fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| GapfillError::io(parent, e))?;
        }
    }
    fs::write(path, bytes).map_err(|e| GapfillError::io(path, e))
}
