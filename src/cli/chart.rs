use comfy_table::{Cell, Table};

use crate::classifier::{upsert_account, Chart};
use crate::db::get_connection;
use crate::error::Result;
use crate::settings::db_path;

pub fn set(account: &str, group: &str, subgroup: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    upsert_account(&conn, account, group, subgroup)?;
    println!("{} -> {} / {}", account.trim().to_uppercase(), group, subgroup);
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = get_connection(&db_path())?;
    let chart = Chart::load(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["Group", "Subgroup", "Account"]);
    for (account, group, subgroup) in chart.sorted_entries() {
        table.add_row(vec![Cell::new(group), Cell::new(subgroup), Cell::new(account)]);
    }
    println!("{table}");
    println!("{} accounts mapped.", chart.len());
    Ok(())
}
