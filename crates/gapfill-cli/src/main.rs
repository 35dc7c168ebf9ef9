//! Gapfill CLI - batch driver for the reconciliation engine.

mod cli;
mod commands;
mod logging;

use clap::Parser;
use cli::{Cli, Commands};
use commands::fill::FillOptions;
use commands::match_cmd::MatchOptions;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let settings = cli.settings.as_deref();

    let result = match cli.command {
        Commands::Sheets { file } => commands::sheets::run(file),

        Commands::Scan {
            tables,
            columns,
            json,
        } => commands::scan::run(tables, columns, json, settings),

        Commands::Candidates {
            tables,
            key,
            link,
            json,
        } => commands::candidates::run(tables, key, link, json, settings),

        Commands::Fill {
            tables,
            key,
            all,
            link,
            enable,
            disable,
            country_default,
            geonames,
            online_lookup,
            output,
            json,
        } => commands::fill::run(
            tables,
            FillOptions {
                key,
                all,
                links: link,
                enable,
                disable,
                country_default,
                geonames,
                online_lookup,
                json,
            },
            output,
            settings,
        ),

        Commands::Match {
            primary,
            sheet,
            source,
            primary_fields,
            source_fields,
            row,
            fill,
            output,
            json,
        } => commands::match_cmd::run(
            MatchOptions {
                primary,
                sheet,
                sources: source,
                primary_fields,
                source_fields,
                row,
                fill,
                json,
            },
            output,
            settings,
        ),

        Commands::Settings { init, force } => commands::settings::run(init, force, settings),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
