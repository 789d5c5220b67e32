use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS units (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    unit_id INTEGER NOT NULL,
    period_year INTEGER NOT NULL,
    period_month INTEGER NOT NULL,
    kind TEXT NOT NULL,
    source_file TEXT,
    uploaded_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (unit_id) REFERENCES units(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS revenue_rows (
    id INTEGER PRIMARY KEY,
    import_id INTEGER NOT NULL,
    date TEXT NOT NULL,
    year INTEGER NOT NULL,
    month INTEGER NOT NULL,
    collector TEXT,
    code TEXT,
    payment_channel TEXT,
    description TEXT,
    amount REAL,
    source_file TEXT,
    raw_json TEXT,
    row_hash TEXT UNIQUE,
    FOREIGN KEY (import_id) REFERENCES imports(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS expense_rows (
    id INTEGER PRIMARY KEY,
    import_id INTEGER NOT NULL,
    date TEXT NOT NULL,
    year INTEGER NOT NULL,
    month INTEGER NOT NULL,
    account TEXT,
    subaccount TEXT,
    description TEXT,
    amount REAL,
    source_file TEXT,
    raw_json TEXT,
    row_hash TEXT UNIQUE,
    FOREIGN KEY (import_id) REFERENCES imports(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS code_map (
    code TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    sign INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS account_map (
    account TEXT PRIMARY KEY,
    group_name TEXT NOT NULL,
    subgroup_name TEXT NOT NULL,
    updated_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS override_rules (
    id INTEGER PRIMARY KEY,
    unit_id INTEGER,
    match_field TEXT NOT NULL,
    match_type TEXT NOT NULL,
    match_value TEXT NOT NULL,
    replacement TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (unit_id) REFERENCES units(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS ingest_log (
    id INTEGER PRIMARY KEY,
    unit_id INTEGER NOT NULL,
    period_year INTEGER NOT NULL,
    period_month INTEGER NOT NULL,
    kind TEXT NOT NULL,
    file_name TEXT,
    file_hash TEXT,
    rows_inserted INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    UNIQUE(unit_id, period_year, period_month, kind, file_hash),
    FOREIGN KEY (unit_id) REFERENCES units(id) ON DELETE CASCADE
);
";

/// Revenue transaction codes seeded on init: (code, kind, canonical sign).
/// `bruta` rows add to gross revenue, `deducao` rows reduce it.
pub const DEFAULT_CODES: &[(&str, &str, i64)] = &[
    ("VAM", "bruta", 1),
    ("TAC", "bruta", 1),
    ("CAR", "bruta", 1),
    ("VRA", "deducao", -1),
    ("VIR", "deducao", -1),
    ("DRF", "deducao", -1),
    ("AIR", "deducao", -1),
    ("DAR", "deducao", -1),
    ("DEL", "deducao", -1),
    ("AJT", "deducao", -1),
    ("SAF", "deducao", -1),
    ("DAS", "deducao", -1),
    ("FPP", "deducao", -1),
];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    for (code, kind, sign) in DEFAULT_CODES {
        conn.execute(
            "INSERT OR IGNORE INTO code_map (code, kind, sign) VALUES (?1, ?2, ?3)",
            rusqlite::params![code, kind, sign],
        )?;
    }
    Ok(())
}

/// Find a unit by name, creating it if missing. Units come into existence
/// on first reference from an import.
pub fn upsert_unit(conn: &Connection, name: &str) -> Result<i64> {
    let name = name.trim();
    conn.execute("INSERT OR IGNORE INTO units (name) VALUES (?1)", [name])?;
    let id = conn.query_row("SELECT id FROM units WHERE name = ?1", [name], |r| r.get(0))?;
    Ok(id)
}

/// Look up a unit by name without creating it.
pub fn find_unit(conn: &Connection, name: &str) -> Result<i64> {
    conn.query_row("SELECT id FROM units WHERE name = ?1", [name.trim()], |r| r.get(0))
        .map_err(|_| crate::error::ApuraError::UnknownUnit(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &[
            "units", "imports", "revenue_rows", "expense_rows",
            "code_map", "account_map", "override_rules", "ingest_log",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
        let count: i64 = conn.query_row("SELECT count(*) FROM code_map", [], |r| r.get(0)).unwrap();
        assert_eq!(count, DEFAULT_CODES.len() as i64);
    }

    #[test]
    fn test_seeded_code_map() {
        let (_dir, conn) = test_db();
        let (kind, sign): (String, i64) = conn
            .query_row("SELECT kind, sign FROM code_map WHERE code = 'VAM'", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(kind, "bruta");
        assert_eq!(sign, 1);
        let (kind, sign): (String, i64) = conn
            .query_row("SELECT kind, sign FROM code_map WHERE code = 'VRA'", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(kind, "deducao");
        assert_eq!(sign, -1);
    }

    #[test]
    fn test_upsert_unit_is_stable() {
        let (_dir, conn) = test_db();
        let a = upsert_unit(&conn, "Campinas").unwrap();
        let b = upsert_unit(&conn, " Campinas ").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_find_unit_unknown() {
        let (_dir, conn) = test_db();
        assert!(find_unit(&conn, "Nope").is_err());
    }

    #[test]
    fn test_unit_delete_cascades() {
        let (_dir, conn) = test_db();
        let unit_id = upsert_unit(&conn, "Campinas").unwrap();
        conn.execute(
            "INSERT INTO imports (unit_id, period_year, period_month, kind) VALUES (?1, 2025, 6, 'revenue_notice')",
            [unit_id],
        )
        .unwrap();
        conn.execute("DELETE FROM units WHERE id = ?1", [unit_id]).unwrap();
        let imports: i64 = conn.query_row("SELECT count(*) FROM imports", [], |r| r.get(0)).unwrap();
        assert_eq!(imports, 0);
    }
}
