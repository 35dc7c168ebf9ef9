//! Fill command - auto-fill missing fields and save.

use std::path::{Path, PathBuf};

use colored::Colorize;
use gapfill::{FillReport, GeoNamesTable, HttpRegionLookup, TransformRule};

use super::common::{CommandResult, load_settings, open_session, save};
use crate::cli::{OutputArgs, TableArgs};

/// Options for the fill command beyond the tables and output.
pub struct FillOptions {
    pub key: Option<String>,
    pub all: bool,
    pub links: Vec<(String, String)>,
    pub enable: Vec<TransformRule>,
    pub disable: Vec<TransformRule>,
    pub country_default: Option<String>,
    pub geonames: Option<PathBuf>,
    pub online_lookup: bool,
    pub json: bool,
}

pub fn run(
    tables: TableArgs,
    options: FillOptions,
    output: OutputArgs,
    settings_path: Option<&Path>,
) -> CommandResult {
    let settings = load_settings(settings_path);
    let (mut session, sheet) = open_session(&tables, &settings)?;

    for (primary, secondary) in options.links {
        session.link(primary, secondary);
    }
    let mut rules = session.rules();
    for rule in options.enable {
        rules.set(rule, true);
    }
    for rule in options.disable {
        rules.set(rule, false);
    }
    session.set_rules(rules);
    if let Some(country) = options.country_default {
        session.set_country_default(country);
    }
    if let Some(path) = &options.geonames {
        session.set_region_lookup(GeoNamesTable::load(path)?);
    } else if options.online_lookup {
        session.set_region_lookup(HttpRegionLookup::new()?);
    }

    let report = if options.all {
        session.autofill_all()?
    } else if let Some(key) = &options.key {
        if session.primary_row_for_key(key).is_none() {
            return Err(format!("Key '{}' not found in {}", key, tables.primary.display()).into());
        }
        session.autofill_key(key)?
    } else {
        return Err("Use --key KEY or --all".into());
    };

    let saved = if report.changes.is_empty() {
        None
    } else {
        save(&output, session.primary(), &tables.primary, &sheet)?
    };

    if options.json {
        let out = serde_json::json!({
            "report": report,
            "saved": saved,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    print_report(&report);
    println!();
    match saved {
        Some(path) => println!("{} {}", "Saved".green().bold(), path.display()),
        None if report.changes.is_empty() => println!("{}", "Nothing to fill; no file written".dimmed()),
        None => println!(
            "{}",
            "Not saved. Use --out-dir, --output or --in-place to write the result.".yellow()
        ),
    }
    Ok(())
}

fn print_report(report: &FillReport) {
    println!("{}", "Auto-fill summary:".cyan().bold());
    println!("  Fields filled:  {}", report.fields_filled.to_string().green());
    println!("  Rows matched:   {}", report.rows_matched.to_string().white());
    println!("  Rows unmatched: {}", report.rows_unmatched.to_string().red());

    if report.changes.is_empty() {
        return;
    }
    println!();
    println!("{}", "Changes:".yellow().bold());
    for change in &report.changes {
        println!(
            "  {} {} = {} {}",
            format!("[{}]", change.key).white().bold(),
            change.target_column.yellow(),
            change.new_value,
            format!("<- {}", change.source_description).dimmed()
        );
    }
}
