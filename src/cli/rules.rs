use comfy_table::{Cell, Table};

use crate::db::{find_unit, get_connection};
use crate::error::{ApuraError, Result};
use crate::models::MatchField;
use crate::overrides::{add_rule, delete_rule, record_description_edit};
use crate::settings::db_path;

pub fn add(
    pattern: &str,
    replace: &str,
    field: &str,
    match_type: &str,
    unit: Option<&str>,
) -> Result<()> {
    let field = MatchField::from_key(field)
        .ok_or_else(|| ApuraError::Other(format!("Unknown field '{field}'")))?;
    if !matches!(match_type, "equals" | "contains" | "regex") {
        return Err(ApuraError::Other(format!(
            "Unknown match type '{match_type}': expected equals, contains or regex"
        )));
    }

    let conn = get_connection(&db_path())?;
    let unit_id = match unit {
        Some(name) => Some(find_unit(&conn, name)?),
        None => None,
    };
    let id = add_rule(&conn, unit_id, field, match_type, pattern, replace)?;
    println!("Rule {id} added.");
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = get_connection(&db_path())?;
    let mut stmt = conn.prepare(
        "SELECT r.id, COALESCE(u.name, '(global)'), r.match_field, r.match_type, \
                r.match_value, r.replacement \
         FROM override_rules r LEFT JOIN units u ON u.id = r.unit_id ORDER BY r.id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if rows.is_empty() {
        println!("No rewrite rules.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Scope", "Field", "Match", "Value", "Replacement"]);
    for (id, scope, field, match_type, value, replacement) in &rows {
        table.add_row(vec![
            Cell::new(id),
            Cell::new(scope),
            Cell::new(field),
            Cell::new(match_type),
            Cell::new(value),
            Cell::new(replacement),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn remove(id: i64) -> Result<()> {
    let conn = get_connection(&db_path())?;
    delete_rule(&conn, id)?;
    println!("Rule {id} removed.");
    Ok(())
}

pub fn rewrite(unit: &str, old: &str, new: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let unit_id = find_unit(&conn, unit)?;
    if record_description_edit(&conn, unit_id, old, new)? {
        println!("'{old}' will now read as '{new}' in {unit}.");
    } else {
        println!("No change.");
    }
    Ok(())
}
