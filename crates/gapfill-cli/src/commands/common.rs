//! Helpers shared by the commands: loading tables, settings and saving.

use std::path::{Path, PathBuf};

use gapfill::{Dataset, KeyConfig, Parser, ReconciliationSession, Settings, output};

use crate::cli::{OutputArgs, TableArgs};

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Settings from `--settings` or the default location.
pub fn load_settings(path: Option<&Path>) -> Settings {
    match path {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
}

/// Load one sheet (default: the first) with the given header row.
pub fn load_table(
    parser: &Parser,
    path: &Path,
    sheet: Option<&str>,
    header_row: usize,
) -> Result<(Dataset, String), Box<dyn std::error::Error>> {
    let sheet = match sheet {
        Some(s) => s.to_string(),
        None => parser
            .list_sheets(path)?
            .into_iter()
            .next()
            .ok_or_else(|| format!("No sheets in {}", path.display()))?,
    };
    let (dataset, _) = parser.load(path, &sheet, header_row)?;
    Ok((dataset, sheet))
}

/// Load both tables and attach the secondary by key.
///
/// Returns the session and the primary sheet name.
pub fn open_session(
    tables: &TableArgs,
    settings: &Settings,
) -> Result<(ReconciliationSession, String), Box<dyn std::error::Error>> {
    let parser = Parser::new();
    let (primary, sheet) = load_table(&parser, &tables.primary, tables.sheet.as_deref(), tables.header_row)?;
    let (secondary, _) = load_table(
        &parser,
        &tables.secondary,
        tables.secondary_sheet.as_deref(),
        tables.header_row,
    )?;

    let mut session = ReconciliationSession::new(primary);
    settings.apply_to(&mut session);
    let config = KeyConfig::new(&tables.primary_key, &tables.secondary_key)
        .with_keep_leading_zeros(!tables.strip_leading_zeros);
    session.attach_secondary(secondary, config)?;
    Ok((session, sheet))
}

/// Save per the output flags. `None` when no output was requested.
pub fn save(
    args: &OutputArgs,
    primary: &Dataset,
    source: &Path,
    sheet: &str,
) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
    let path = if let Some(dir) = &args.out_dir {
        let base = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        output::save_as_new(primary, dir, &base)?
    } else if let Some(path) = &args.output {
        output::save_as_path(primary, path)?
    } else if args.in_place {
        output::save_in_place(primary, source, Some(sheet), !args.no_backup)?
    } else {
        return Ok(None);
    };
    Ok(Some(path))
}
