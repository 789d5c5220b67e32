use comfy_table::{Cell, Table};

use crate::db::get_connection;
use crate::error::{ApuraError, Result};
use crate::settings::db_path;

pub fn set(code: &str, kind: &str) -> Result<()> {
    let sign = match kind {
        "bruta" => 1i64,
        "deducao" => -1i64,
        other => {
            return Err(ApuraError::Other(format!(
                "Unknown kind '{other}': expected bruta or deducao"
            )))
        }
    };
    let code = code.trim().to_uppercase();
    let conn = get_connection(&db_path())?;
    conn.execute(
        "INSERT INTO code_map (code, kind, sign) VALUES (?1, ?2, ?3) \
         ON CONFLICT(code) DO UPDATE SET kind = excluded.kind, sign = excluded.sign",
        rusqlite::params![code, kind, sign],
    )?;
    println!("Code {code} mapped to {kind}.");
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = get_connection(&db_path())?;
    let mut stmt = conn.prepare("SELECT code, kind, sign FROM code_map ORDER BY kind, code")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, i64>(2)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut table = Table::new();
    table.set_header(vec!["Code", "Kind", "Sign"]);
    for (code, kind, sign) in &rows {
        table.add_row(vec![Cell::new(code), Cell::new(kind), Cell::new(sign)]);
    }
    println!("{table}");
    Ok(())
}
