use std::path::PathBuf;

use colored::Colorize;

use crate::cli::parse_month;
use crate::db::get_connection;
use crate::error::{ApuraError, Result};
use crate::importer::{import_files, FileStatus};
use crate::models::SourceKind;
use crate::settings::db_path;

pub fn run(
    files: &[String],
    unit: &str,
    month: &str,
    kind: &str,
    header_hints: &[String],
) -> Result<()> {
    let (year, month) = parse_month(month)?;
    let kind = SourceKind::from_key(kind)
        .ok_or_else(|| ApuraError::Other(format!("Unknown kind '{kind}': expected revenue or expense")))?;
    let paths: Vec<PathBuf> = files.iter().map(PathBuf::from).collect();

    let conn = get_connection(&db_path())?;
    let result = import_files(&conn, unit, year, month, kind, &paths, header_hints)?;

    println!(
        "{} — {} {:04}-{:02}",
        unit.bold(),
        kind.name(),
        year,
        month
    );
    for outcome in &result.files {
        match &outcome.status {
            FileStatus::Imported { inserted, skipped } => {
                let mut line = format!("  {} {}: {} rows", "✓".green(), outcome.file, inserted);
                if *skipped > 0 {
                    line.push_str(&format!(" ({skipped} already present)"));
                }
                println!("{line}");
            }
            FileStatus::DuplicateFile => {
                println!("  {} {}: already imported, skipped", "→".yellow(), outcome.file);
            }
            FileStatus::Failed(reason) => {
                println!("  {} {}: {}", "✗".red(), outcome.file, reason);
            }
        }
    }
    println!("Imported {} rows.", result.rows_inserted);
    Ok(())
}
