mod amount;
mod classifier;
mod cli;
mod columns;
mod db;
mod error;
mod fmt;
mod importer;
mod models;
mod overrides;
mod reader;
mod reports;
mod settings;

use clap::Parser;

use cli::{ChartCommands, Cli, CodesCommands, Commands, ReportCommands, RulesCommands, UnitsCommands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Units { command } => match command {
            UnitsCommands::Add { name } => cli::units::add(&name),
            UnitsCommands::List => cli::units::list(),
            UnitsCommands::Rename { old, new } => cli::units::rename(&old, &new),
            UnitsCommands::Remove { name } => cli::units::remove(&name),
        },
        Commands::Import {
            files,
            unit,
            month,
            kind,
            header_hints,
        } => cli::import::run(&files, &unit, &month, &kind, &header_hints),
        Commands::Codes { command } => match command {
            CodesCommands::Set { code, kind } => cli::codes::set(&code, &kind),
            CodesCommands::List => cli::codes::list(),
        },
        Commands::Chart { command } => match command {
            ChartCommands::Set {
                account,
                group,
                subgroup,
            } => cli::chart::set(&account, &group, &subgroup),
            ChartCommands::List => cli::chart::list(),
        },
        Commands::Rules { command } => match command {
            RulesCommands::Add {
                pattern,
                replace,
                field,
                match_type,
                unit,
            } => cli::rules::add(&pattern, &replace, &field, &match_type, unit.as_deref()),
            RulesCommands::List => cli::rules::list(),
            RulesCommands::Remove { id } => cli::rules::remove(id),
            RulesCommands::Rewrite { unit, old, new } => cli::rules::rewrite(&unit, &old, &new),
        },
        Commands::Report { command } => match command {
            ReportCommands::Kpis { unit, month } => cli::report::kpis(&unit, &month),
            ReportCommands::Compare {
                unit,
                month,
                baseline,
            } => cli::report::compare(&unit, &month, &baseline),
            ReportCommands::Trend {
                unit,
                collector,
                month,
            } => cli::report::trend(&unit, &collector, &month),
            ReportCommands::Revenue { unit, month } => cli::report::revenue(&unit, &month),
            ReportCommands::Expenses { unit, month } => cli::report::expenses(&unit, &month),
        },
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
