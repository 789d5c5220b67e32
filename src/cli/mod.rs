pub mod chart;
pub mod codes;
pub mod import;
pub mod init;
pub mod report;
pub mod rules;
pub mod status;
pub mod units;

use clap::{Parser, Subcommand};

use crate::error::{ApuraError, Result};

#[derive(Parser)]
#[command(name = "apura", about = "Monthly results from messy revenue and expense spreadsheets.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up apura: choose a data directory and initialize the database.
    Init {
        /// Path for apura data (default: ~/Documents/apura)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Manage business units.
    Units {
        #[command(subcommand)]
        command: UnitsCommands,
    },
    /// Import one or more CSV files for a unit and period.
    Import {
        /// CSV files to import
        #[arg(required = true)]
        files: Vec<String>,
        /// Unit name (created on first use)
        #[arg(long)]
        unit: String,
        /// Target period: YYYY-MM
        #[arg(long)]
        month: String,
        /// Source kind: revenue or expense
        #[arg(long)]
        kind: String,
        /// Header fragment hint for files with preamble rows (repeatable)
        #[arg(long = "header-hint")]
        header_hints: Vec<String>,
    },
    /// Manage the revenue code map (bruta/deducao).
    Codes {
        #[command(subcommand)]
        command: CodesCommands,
    },
    /// Manage the expense chart (account to group/subgroup).
    Chart {
        #[command(subcommand)]
        command: ChartCommands,
    },
    /// Manage description rewrite rules.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// Generate reports.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Show database location, units, and ingested periods.
    Status,
}

#[derive(Subcommand)]
pub enum UnitsCommands {
    /// Add a business unit.
    Add {
        /// Unit name, e.g. 'Matriz'
        name: String,
    },
    /// List all units.
    List,
    /// Rename a unit, keeping its data.
    Rename {
        old: String,
        new: String,
    },
    /// Remove a unit and all of its imported data.
    Remove {
        name: String,
    },
}

#[derive(Subcommand)]
pub enum CodesCommands {
    /// Map a revenue code to a kind.
    Set {
        /// Revenue code, e.g. VAM
        code: String,
        /// Kind: bruta or deducao
        #[arg(long)]
        kind: String,
    },
    /// List the code map.
    List,
}

#[derive(Subcommand)]
pub enum ChartCommands {
    /// Map an account name to a group and subgroup.
    Set {
        /// Account name as it appears in expense files
        account: String,
        #[arg(long)]
        group: String,
        #[arg(long)]
        subgroup: String,
    },
    /// List the chart, including compiled-in defaults.
    List,
}

#[derive(Subcommand)]
pub enum RulesCommands {
    /// Add a rewrite rule.
    Add {
        /// Value the rule matches against
        pattern: String,
        /// Replacement description
        #[arg(long)]
        replace: String,
        /// Field to match: description, subaccount, account
        #[arg(long, default_value = "description")]
        field: String,
        /// Match type: equals, contains, regex
        #[arg(long = "match-type", default_value = "equals")]
        match_type: String,
        /// Restrict the rule to one unit (default: global)
        #[arg(long)]
        unit: Option<String>,
    },
    /// List all rewrite rules.
    List,
    /// Remove a rule by ID.
    Remove {
        id: i64,
    },
    /// Record a description edit as a unit-scoped equals rule.
    Rewrite {
        #[arg(long)]
        unit: String,
        /// Description as imported
        old: String,
        /// Description it should read as
        new: String,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Period KPIs: gross, deductions, net, expenses, result.
    Kpis {
        #[arg(long)]
        unit: String,
        /// Period: YYYY-MM
        #[arg(long)]
        month: String,
    },
    /// Compare two periods with signed deltas.
    Compare {
        #[arg(long)]
        unit: String,
        /// Current period: YYYY-MM
        #[arg(long)]
        month: String,
        /// Baseline period: YYYY-MM
        #[arg(long)]
        baseline: String,
    },
    /// Twelve-month trailing net revenue for one collector.
    Trend {
        #[arg(long)]
        unit: String,
        #[arg(long)]
        collector: String,
        /// Reference period: YYYY-MM
        #[arg(long)]
        month: String,
    },
    /// Revenue per collector and code.
    Revenue {
        #[arg(long)]
        unit: String,
        #[arg(long)]
        month: String,
    },
    /// Classified expense breakdown.
    Expenses {
        #[arg(long)]
        unit: String,
        #[arg(long)]
        month: String,
    },
}

/// Parse a `YYYY-MM` period argument.
pub fn parse_month(raw: &str) -> Result<(i32, u32)> {
    let parts: Vec<&str> = raw.split('-').collect();
    if parts.len() == 2 {
        if let (Ok(year), Ok(month)) = (parts[0].parse::<i32>(), parts[1].parse::<u32>()) {
            if (1..=12).contains(&month) {
                return Ok((year, month));
            }
        }
    }
    Err(ApuraError::Other(format!(
        "Invalid period '{raw}': expected YYYY-MM"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2025-06").unwrap(), (2025, 6));
        assert_eq!(parse_month("2024-12").unwrap(), (2024, 12));
        assert!(parse_month("2025-13").is_err());
        assert!(parse_month("2025").is_err());
        assert!(parse_month("junho").is_err());
    }
}
