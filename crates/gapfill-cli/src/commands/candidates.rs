//! Candidates command - show every fill value on offer for one key.

use std::path::Path;

use colored::Colorize;

use super::common::{CommandResult, load_settings, open_session};
use crate::cli::TableArgs;

pub fn run(
    tables: TableArgs,
    key: String,
    links: Vec<(String, String)>,
    json_output: bool,
    settings_path: Option<&Path>,
) -> CommandResult {
    let settings = load_settings(settings_path);
    let (mut session, _) = open_session(&tables, &settings)?;
    for (primary, secondary) in links {
        session.link(primary, secondary);
    }
    if session.links().is_empty() {
        return Err("No field links defined. Use --link PRIMARY=SECONDARY or the settings file.".into());
    }

    let candidates = session.candidates(&key, None)?;

    if json_output {
        let out = serde_json::json!({
            "key": key,
            "primary_row": session.primary_row_for_key(&key),
            "candidates": candidates,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let matched = session.secondary_rows_for_key(&key).len();
    println!(
        "{} {} ({} secondary rows)",
        "Candidates for".cyan().bold(),
        key.white().bold(),
        matched
    );
    if matched == 0 {
        println!("  {}", "No secondary rows share this key".red());
        return Ok(());
    }

    for (target, options) in &candidates {
        let current = session
            .primary_row_for_key(&key)
            .and_then(|r| session.primary().value(r, target))
            .unwrap_or("");
        println!();
        println!("{} {}", target.yellow().bold(), format!("(now: '{}')", current).dimmed());
        if options.is_empty() {
            println!("  {}", "-".dimmed());
        }
        for option in options {
            println!(
                "  {} {}",
                option.value.white(),
                format!("[row {}, {}]", option.row_index, option.source_column).dimmed()
            );
        }
    }
    Ok(())
}
