use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::db::get_connection;
use crate::error::Result;
use crate::settings::db_path;

pub fn run() -> Result<()> {
    let path = db_path();
    if !path.exists() {
        println!("No database found. Run: apura init");
        return Ok(());
    }
    let conn = get_connection(&path)?;

    let units: i64 = conn.query_row("SELECT COUNT(*) FROM units WHERE active = 1", [], |r| r.get(0))?;
    let rules: i64 = conn.query_row("SELECT COUNT(*) FROM override_rules", [], |r| r.get(0))?;
    let revenue_rows: i64 = conn.query_row("SELECT COUNT(*) FROM revenue_rows", [], |r| r.get(0))?;
    let expense_rows: i64 = conn.query_row("SELECT COUNT(*) FROM expense_rows", [], |r| r.get(0))?;

    println!("Database: {}", path.display().to_string().bold());
    println!("Units: {units}  Rules: {rules}  Revenue rows: {revenue_rows}  Expense rows: {expense_rows}");

    let mut stmt = conn.prepare(
        "SELECT u.name, i.period_year, i.period_month, \
                SUM(CASE WHEN i.kind = 'revenue_notice' THEN 1 ELSE 0 END), \
                SUM(CASE WHEN i.kind = 'expense_detail' THEN 1 ELSE 0 END) \
         FROM imports i INNER JOIN units u ON u.id = i.unit_id \
         GROUP BY u.name, i.period_year, i.period_month \
         ORDER BY u.name, i.period_year DESC, i.period_month DESC",
    )?;
    let periods = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i32>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if periods.is_empty() {
        println!("\nNothing imported yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Unit", "Period", "Revenue imports", "Expense imports"]);
    for (unit, year, month, rev, exp) in &periods {
        table.add_row(vec![
            Cell::new(unit),
            Cell::new(format!("{year:04}-{month:02}")),
            Cell::new(rev),
            Cell::new(exp),
        ]);
    }
    println!("\n{table}");
    Ok(())
}
