//! CLI argument definitions using clap.

use clap::{ArgAction, Args, Parser, Subcommand};
use gapfill::TransformRule;
use std::path::PathBuf;

/// Gapfill: fill missing fields in a primary table from secondary tables
#[derive(Parser)]
#[command(name = "gapfill")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log detail (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Settings file (default: ~/.gapfill/settings.json)
    #[arg(long, global = true, value_name = "FILE")]
    pub settings: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the sheets of a workbook or text file
    Sheets {
        /// Path to the data file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Flag primary rows with missing fields
    Scan {
        #[command(flatten)]
        tables: TableArgs,

        /// Columns to check (default: every column except the key)
        #[arg(short, long, value_delimiter = ',')]
        columns: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show every fill candidate for one key
    Candidates {
        #[command(flatten)]
        tables: TableArgs,

        /// Key to look up (as it appears after normalization)
        #[arg(short, long)]
        key: String,

        /// Link a primary column to a secondary column (PRIMARY=SECONDARY)
        #[arg(short, long, value_parser = parse_pair)]
        link: Vec<(String, String)>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Auto-fill missing fields and save the result
    Fill {
        #[command(flatten)]
        tables: TableArgs,

        /// Fill only the row with this key
        #[arg(short, long, conflicts_with = "all", required_unless_present = "all")]
        key: Option<String>,

        /// Fill every keyed row
        #[arg(long)]
        all: bool,

        /// Link a primary column to a secondary column (PRIMARY=SECONDARY)
        #[arg(short, long, value_parser = parse_pair)]
        link: Vec<(String, String)>,

        /// Enable a transform rule
        #[arg(long, value_parser = parse_rule)]
        enable: Vec<TransformRule>,

        /// Disable a transform rule
        #[arg(long, value_parser = parse_rule)]
        disable: Vec<TransformRule>,

        /// Value for empty country cells
        #[arg(long)]
        country_default: Option<String>,

        /// GeoNames postal-code dump for state lookups
        #[arg(long, value_name = "FILE", conflicts_with = "online_lookup")]
        geonames: Option<PathBuf>,

        /// Look states up online
        #[arg(long)]
        online_lookup: bool,

        #[command(flatten)]
        output: OutputArgs,

        /// Print the change list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Match one primary row against several sources by composite key
    Match {
        /// Primary data file
        #[arg(value_name = "PRIMARY")]
        primary: PathBuf,

        /// Primary sheet (default: first sheet)
        #[arg(long)]
        sheet: Option<String>,

        /// Source table (ID=PATH or ID=PATH#SHEET)
        #[arg(short, long, value_parser = parse_pair, required = true)]
        source: Vec<(String, String)>,

        /// Primary match fields (default: from settings)
        #[arg(long, value_delimiter = ',')]
        primary_fields: Vec<String>,

        /// Match fields for one source (ID=FIELD,FIELD)
        #[arg(long, value_parser = parse_pair)]
        source_fields: Vec<(String, String)>,

        /// Primary row (0-based)
        #[arg(short, long)]
        row: usize,

        /// Also fill the row from the matched sources and save it
        #[arg(long, requires = "output_target")]
        fill: bool,

        #[command(flatten)]
        output: OutputArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the effective settings or write defaults
    Settings {
        /// Write default settings to the settings file
        #[arg(long)]
        init: bool,

        /// Overwrite an existing settings file with --init
        #[arg(long, requires = "init")]
        force: bool,
    },
}

/// A primary and a secondary table joined by key columns.
#[derive(Args)]
pub struct TableArgs {
    /// Primary data file
    #[arg(value_name = "PRIMARY")]
    pub primary: PathBuf,

    /// Secondary data file
    #[arg(value_name = "SECONDARY")]
    pub secondary: PathBuf,

    /// Primary sheet (default: first sheet)
    #[arg(long)]
    pub sheet: Option<String>,

    /// Secondary sheet (default: first sheet)
    #[arg(long)]
    pub secondary_sheet: Option<String>,

    /// 1-based header row for both tables
    #[arg(long, default_value = "1")]
    pub header_row: usize,

    /// Key column in the primary table
    #[arg(long)]
    pub primary_key: String,

    /// Key column in the secondary table
    #[arg(long)]
    pub secondary_key: String,

    /// Treat "007" and "7" as the same key
    #[arg(long)]
    pub strip_leading_zeros: bool,
}

/// Where filled data is written.
#[derive(Args)]
#[group(id = "output_target")]
pub struct OutputArgs {
    /// Write a new timestamped .xlsx into this directory
    #[arg(long, value_name = "DIR", conflicts_with_all = ["output", "in_place"])]
    pub out_dir: Option<PathBuf>,

    /// Write to exactly this path (.xlsx, .csv or .tsv)
    #[arg(short, long, value_name = "FILE", conflicts_with = "in_place")]
    pub output: Option<PathBuf>,

    /// Overwrite the primary file, replacing only its sheet
    #[arg(long)]
    pub in_place: bool,

    /// Skip the backup copy when saving in place
    #[arg(long, requires = "in_place")]
    pub no_backup: bool,
}

/// Parse `LEFT=RIGHT`.
fn parse_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((left, right)) if !left.trim().is_empty() && !right.trim().is_empty() => {
            Ok((left.trim().to_string(), right.trim().to_string()))
        }
        _ => Err(format!("Expected LEFT=RIGHT, got '{}'", s)),
    }
}

fn parse_rule(s: &str) -> Result<TransformRule, String> {
    TransformRule::from_name(s).ok_or_else(|| {
        let names: Vec<&str> = TransformRule::ALL.iter().map(|r| r.name()).collect();
        format!("Unknown rule '{}'. Use one of: {}", s, names.join(", "))
    })
}
