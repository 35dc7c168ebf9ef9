//! Scan command - list the keys of primary rows with missing fields.

use std::path::Path;

use colored::Colorize;

use super::common::{CommandResult, load_settings, open_session};
use crate::cli::TableArgs;

pub fn run(
    tables: TableArgs,
    columns: Vec<String>,
    json_output: bool,
    settings_path: Option<&Path>,
) -> CommandResult {
    let settings = load_settings(settings_path);
    let (mut session, _) = open_session(&tables, &settings)?;

    let columns = if columns.is_empty() {
        session.default_scan_columns()
    } else {
        columns
    };
    let keys = session.scan(&columns)?.keys().to_vec();

    if json_output {
        let out = serde_json::json!({
            "columns": columns,
            "flagged": keys.len(),
            "keys": keys,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "{} {} of {} rows",
        "Flagged".cyan().bold(),
        keys.len().to_string().white().bold(),
        session.primary().row_count()
    );
    println!("Checked: {}", columns.join(", ").dimmed());
    println!();
    for (i, key) in keys.iter().enumerate() {
        let row = session.primary_row_for_key(key);
        let missing: Vec<&str> = row
            .map(|r| {
                columns
                    .iter()
                    .filter(|c| session.primary().has_column(c))
                    .filter(|c| gapfill::normalize::is_missing(session.primary().value(r, c)))
                    .map(String::as_str)
                    .collect()
            })
            .unwrap_or_default();
        let matches = session.secondary_rows_for_key(key).len();
        let badge = if matches == 0 {
            "no match".red()
        } else {
            format!("{} match(es)", matches).green()
        };
        println!(
            "  {:>4}. {} [{}] missing: {}",
            i + 1,
            key.white().bold(),
            badge,
            missing.join(", ").yellow()
        );
    }
    Ok(())
}
