//! Match command - composite-key matching against several sources.

use std::path::{Path, PathBuf};

use colored::Colorize;
use gapfill::{MatchProfile, Parser, ReconciliationSession};
use indexmap::IndexMap;

use super::common::{CommandResult, load_settings, load_table, save};
use crate::cli::OutputArgs;

/// Arguments for the match command.
pub struct MatchOptions {
    pub primary: PathBuf,
    pub sheet: Option<String>,
    pub sources: Vec<(String, String)>,
    pub primary_fields: Vec<String>,
    pub source_fields: Vec<(String, String)>,
    pub row: usize,
    pub fill: bool,
    pub json: bool,
}

pub fn run(options: MatchOptions, output: OutputArgs, settings_path: Option<&Path>) -> CommandResult {
    let settings = load_settings(settings_path);
    let parser = Parser::new();
    let (primary, sheet) = load_table(&parser, &options.primary, options.sheet.as_deref(), 1)?;

    let mut sources = IndexMap::new();
    for (id, spec) in &options.sources {
        let (path, source_sheet) = match spec.split_once('#') {
            Some((path, sheet)) => (path, Some(sheet)),
            None => (spec.as_str(), None),
        };
        let (dataset, _) = load_table(&parser, Path::new(path), source_sheet, 1)?;
        sources.insert(id.clone(), dataset);
    }

    let mut profile: MatchProfile = settings.match_profile();
    if !options.primary_fields.is_empty() {
        profile.primary_fields = options.primary_fields.clone();
    }
    for (id, fields) in &options.source_fields {
        let fields = fields.split(',').map(|f| f.trim().to_string()).collect();
        profile.source_fields.insert(id.clone(), fields);
    }
    if profile.primary_fields.is_empty() {
        return Err("No primary match fields. Use --primary-fields or the settings file.".into());
    }
    if options.row >= primary.row_count() {
        return Err(format!(
            "Row {} is out of range ({} rows)",
            options.row,
            primary.row_count()
        )
        .into());
    }

    let mut session = ReconciliationSession::new(primary);
    settings.apply_to(&mut session);
    session.attach_sources(sources, profile);
    let matches = session.matches_for_row(options.row)?;

    let report = if options.fill {
        Some(session.autofill_row_from_sources(options.row)?)
    } else {
        None
    };
    let saved = match &report {
        Some(r) if !r.changes.is_empty() => save(&output, session.primary(), &options.primary, &sheet)?,
        _ => None,
    };

    if options.json {
        let out = serde_json::json!({
            "row": options.row,
            "matches": matches,
            "report": report,
            "saved": saved,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{} {}", "Matches for primary row".cyan().bold(), options.row);
    for (source, rows) in &matches {
        let rows_text = if rows.is_empty() {
            "none".red().to_string()
        } else {
            rows.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", ").green().to_string()
        };
        println!("  {}: {}", source.white().bold(), rows_text);
    }

    if let Some(report) = report {
        println!();
        println!("Fields filled: {}", report.fields_filled.to_string().green());
        for change in &report.changes {
            println!(
                "  {} = {} {}",
                change.target_column.yellow(),
                change.new_value,
                format!("<- {}", change.source_description).dimmed()
            );
        }
        if let Some(path) = saved {
            println!("{} {}", "Saved".green().bold(), path.display());
        }
    }
    Ok(())
}
