use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::db::{find_unit, get_connection, upsert_unit};
use crate::error::{ApuraError, Result};
use crate::settings::db_path;

pub fn add(name: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    upsert_unit(&conn, name)?;
    println!("Unit '{}' ready.", name.bold());
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = get_connection(&db_path())?;
    let mut stmt = conn.prepare(
        "SELECT u.name, COUNT(DISTINCT i.period_year || '-' || i.period_month), COUNT(i.id) \
         FROM units u LEFT JOIN imports i ON i.unit_id = u.id \
         WHERE u.active = 1 GROUP BY u.id ORDER BY u.name",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if rows.is_empty() {
        println!("No units yet. Add one with: apura units add <name>");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Unit", "Periods", "Imports"]);
    for (name, periods, imports) in &rows {
        table.add_row(vec![Cell::new(name), Cell::new(periods), Cell::new(imports)]);
    }
    println!("{table}");
    Ok(())
}

pub fn rename(old: &str, new: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let id = find_unit(&conn, old)?;
    conn.execute("UPDATE units SET name = ?1 WHERE id = ?2", rusqlite::params![new, id])
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                ApuraError::Other(format!("A unit named '{new}' already exists"))
            }
            other => ApuraError::Db(other),
        })?;
    println!("Renamed '{old}' to '{new}'. Imported data stays attached.");
    Ok(())
}

pub fn remove(name: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let id = find_unit(&conn, name)?;
    // FK cascade drops the unit's imports and rows with it.
    conn.execute("DELETE FROM units WHERE id = ?1", [id])?;
    println!("Removed unit '{name}' and all of its data.");
    Ok(())
}
