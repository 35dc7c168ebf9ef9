//! Sheets command - list the sheets of a file.

use std::path::PathBuf;

use colored::Colorize;
use gapfill::Parser;

use super::common::CommandResult;

pub fn run(file: PathBuf) -> CommandResult {
    let sheets = Parser::new().list_sheets(&file)?;

    println!("{} {}", "Sheets in".cyan().bold(), file.display().to_string().white());
    for (i, name) in sheets.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, name);
    }
    Ok(())
}
