use std::path::{Path, PathBuf};

use rusqlite::Connection;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::amount::parse_decimal;
use crate::columns::{detect_columns, ColumnMap};
use crate::db::upsert_unit;
use crate::error::{ApuraError, Result};
use crate::models::{ExpenseRecord, RevenueRecord, SourceKind};
use crate::reader::{read_table, RawTable};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn parse_date_dayfirst(raw: &str) -> Option<chrono::NaiveDate> {
    let raw = raw.trim();
    for fmt in ["%d/%m/%Y", "%d/%m/%y", "%Y-%m-%d", "%d-%m-%Y"] {
        if let Ok(d) = chrono::NaiveDate::parse_from_str(raw, fmt) {
            return Some(d);
        }
    }
    None
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Content hash of a normalized record: SHA-256 over its canonical JSON
/// form (stable field order, source file excluded).
fn hash_record<T: Serialize>(record: &T) -> Result<String> {
    let json = serde_json::to_string(record)
        .map_err(|e| ApuraError::Other(format!("row serialization failed: {e}")))?;
    Ok(sha256_hex(json.as_bytes()))
}

fn raw_payload(table: &RawTable, row: &[String]) -> String {
    let map: std::collections::BTreeMap<&str, &str> = table
        .headers
        .iter()
        .map(String::as_str)
        .zip(row.iter().map(String::as_str))
        .collect();
    serde_json::to_string(&map).unwrap_or_default()
}

fn is_duplicate_ingest(
    conn: &Connection,
    unit_id: i64,
    year: i32,
    month: u32,
    kind: SourceKind,
    file_hash: &str,
) -> Result<bool> {
    let mut stmt = conn.prepare_cached(
        "SELECT 1 FROM ingest_log WHERE unit_id = ?1 AND period_year = ?2 \
         AND period_month = ?3 AND kind = ?4 AND file_hash = ?5 LIMIT 1",
    )?;
    Ok(stmt.exists(rusqlite::params![unit_id, year, month, kind.key(), file_hash])?)
}

fn cell<'a>(row: &'a [String], idx: Option<usize>) -> Option<&'a str> {
    let value = row.get(idx?)?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

// ---------------------------------------------------------------------------
// Row normalization
// ---------------------------------------------------------------------------

/// Resolve a row's period: its own date column when parseable, otherwise
/// the batch's target period with day 01.
fn resolve_period(
    row: &[String],
    cols: &ColumnMap,
    batch_year: i32,
    batch_month: u32,
) -> (String, i32, u32) {
    if let Some(date) = cell(row, cols.date).and_then(parse_date_dayfirst) {
        use chrono::Datelike;
        return (date.format("%Y-%m-%d").to_string(), date.year(), date.month());
    }
    (format!("{batch_year:04}-{batch_month:02}-01"), batch_year, batch_month)
}

fn revenue_record(
    row: &[String],
    cols: &ColumnMap,
    year: i32,
    month: u32,
    source_file: &str,
) -> RevenueRecord {
    let (date, y, m) = resolve_period(row, cols, year, month);
    RevenueRecord {
        date,
        year: y,
        month: m,
        collector: cell(row, cols.collector).map(str::to_string),
        code: cell(row, cols.code).map(|c| c.trim().to_uppercase()),
        payment_channel: cell(row, cols.payment_channel).map(str::to_string),
        description: cell(row, cols.description).map(str::to_string),
        amount: cell(row, cols.amount).and_then(parse_decimal),
        source_file: source_file.to_string(),
    }
}

fn expense_record(
    row: &[String],
    cols: &ColumnMap,
    year: i32,
    month: u32,
    source_file: &str,
) -> ExpenseRecord {
    let (date, y, m) = resolve_period(row, cols, year, month);
    ExpenseRecord {
        date,
        year: y,
        month: m,
        account: cell(row, cols.account).map(str::to_string),
        subaccount: cell(row, cols.subaccount).map(str::to_string),
        description: cell(row, cols.description).map(str::to_string),
        amount: cell(row, cols.amount).and_then(parse_decimal),
        source_file: source_file.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Batch import
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum FileStatus {
    Imported { inserted: usize, skipped: usize },
    /// Same content already ingested for this (unit, period, kind).
    DuplicateFile,
    /// Parse or IO failure; the rest of the batch continues.
    Failed(String),
}

#[derive(Debug)]
pub struct FileOutcome {
    pub file: String,
    pub status: FileStatus,
}

#[derive(Debug)]
pub struct BatchResult {
    pub import_id: i64,
    pub files: Vec<FileOutcome>,
    pub rows_inserted: usize,
}

/// Ingest one or more files for a unit and target period. The unit is
/// created on first reference. Each file is deduplicated by content hash,
/// parsed, normalized, and inserted in a single transaction; a failing file
/// rolls back only its own rows.
pub fn import_files(
    conn: &Connection,
    unit_name: &str,
    year: i32,
    month: u32,
    kind: SourceKind,
    files: &[PathBuf],
    header_hints: &[String],
) -> Result<BatchResult> {
    let unit_id = upsert_unit(conn, unit_name)?;

    let source_label = if files.len() == 1 {
        base_name(&files[0])
    } else {
        "multiple".to_string()
    };
    conn.execute(
        "INSERT INTO imports (unit_id, period_year, period_month, kind, source_file) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![unit_id, year, month, kind.key(), source_label],
    )?;
    let import_id = conn.last_insert_rowid();

    let mut outcomes = Vec::new();
    let mut rows_inserted = 0usize;

    for path in files {
        let file = base_name(path);
        let status = match ingest_file(conn, unit_id, import_id, year, month, kind, path, header_hints) {
            Ok(status) => status,
            Err(e) => FileStatus::Failed(e.to_string()),
        };
        if let FileStatus::Imported { inserted, .. } = status {
            rows_inserted += inserted;
        }
        outcomes.push(FileOutcome { file, status });
    }

    Ok(BatchResult {
        import_id,
        files: outcomes,
        rows_inserted,
    })
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("(unnamed)")
        .to_string()
}

#[allow(clippy::too_many_arguments)]
fn ingest_file(
    conn: &Connection,
    unit_id: i64,
    import_id: i64,
    year: i32,
    month: u32,
    kind: SourceKind,
    path: &Path,
    header_hints: &[String],
) -> Result<FileStatus> {
    let bytes = std::fs::read(path)?;
    let file_hash = sha256_hex(&bytes);

    if is_duplicate_ingest(conn, unit_id, year, month, kind, &file_hash)? {
        return Ok(FileStatus::DuplicateFile);
    }

    let table = read_table(&bytes, header_hints)?;
    let cols = detect_columns(&table);
    let file = base_name(path);

    // All rows of a file commit together or not at all.
    let tx = conn.unchecked_transaction()?;
    let mut inserted = 0usize;
    let mut skipped = 0usize;

    for row in &table.rows {
        let changed = match kind {
            SourceKind::RevenueNotice => {
                let rec = revenue_record(row, &cols, year, month, &file);
                let row_hash = hash_record(&rec)?;
                tx.execute(
                    "INSERT OR IGNORE INTO revenue_rows \
                     (import_id, date, year, month, collector, code, payment_channel, \
                      description, amount, source_file, raw_json, row_hash) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    rusqlite::params![
                        import_id,
                        rec.date,
                        rec.year,
                        rec.month,
                        rec.collector,
                        rec.code,
                        rec.payment_channel,
                        rec.description,
                        rec.amount,
                        rec.source_file,
                        raw_payload(&table, row),
                        row_hash,
                    ],
                )?
            }
            SourceKind::ExpenseDetail => {
                let rec = expense_record(row, &cols, year, month, &file);
                let row_hash = hash_record(&rec)?;
                tx.execute(
                    "INSERT OR IGNORE INTO expense_rows \
                     (import_id, date, year, month, account, subaccount, description, \
                      amount, source_file, raw_json, row_hash) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    rusqlite::params![
                        import_id,
                        rec.date,
                        rec.year,
                        rec.month,
                        rec.account,
                        rec.subaccount,
                        rec.description,
                        rec.amount,
                        rec.source_file,
                        raw_payload(&table, row),
                        row_hash,
                    ],
                )?
            }
        };
        if changed > 0 {
            inserted += 1;
        } else {
            skipped += 1;
        }
    }

    tx.execute(
        "INSERT OR IGNORE INTO ingest_log \
         (unit_id, period_year, period_month, kind, file_name, file_hash, rows_inserted) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![unit_id, year, month, kind.key(), file, file_hash, inserted as i64],
    )?;
    tx.commit()?;

    Ok(FileStatus::Imported { inserted, skipped })
}
