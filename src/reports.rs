use rusqlite::Connection;

use crate::classifier::{classify_expense, Chart};
use crate::error::Result;
use crate::models::ExpenseRow;
use crate::overrides::{apply_rules, load_rules};

// ---------------------------------------------------------------------------
// KPIs
// ---------------------------------------------------------------------------

/// Period rollup for one unit: gross revenue, deductions (negative), their
/// sum, and classified expenses (negative). Empty periods are all zeros.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kpis {
    pub gross: f64,
    pub deductions: f64,
    pub net: f64,
    pub expenses: f64,
}

impl Kpis {
    pub fn result(&self) -> f64 {
        self.net + self.expenses
    }
}

fn revenue_totals(
    conn: &Connection,
    unit_id: i64,
    year: i32,
    month: u32,
    collector: Option<&str>,
) -> Result<(f64, f64)> {
    let collector_clause = if collector.is_some() {
        " AND n.collector = ?4"
    } else {
        ""
    };
    // Canonical signs from code_map: bruta rows count positive, deducao
    // rows negative, regardless of the sign the file carried. Unmapped
    // codes land in neither bucket. NULL amounts contribute zero.
    let sql = format!(
        "SELECT \
           COALESCE(SUM(CASE WHEN cm.kind = 'bruta' THEN ABS(COALESCE(n.amount, 0)) ELSE 0 END), 0), \
           COALESCE(SUM(CASE WHEN cm.kind = 'deducao' THEN -ABS(COALESCE(n.amount, 0)) ELSE 0 END), 0) \
         FROM revenue_rows n \
         LEFT JOIN code_map cm ON UPPER(n.code) = cm.code \
         INNER JOIN imports i ON i.id = n.import_id \
         WHERE i.unit_id = ?1 AND i.period_year = ?2 AND i.period_month = ?3{collector_clause}"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let totals = if let Some(c) = collector {
        stmt.query_row(rusqlite::params![unit_id, year, month, c], |r| {
            Ok((r.get(0)?, r.get(1)?))
        })?
    } else {
        stmt.query_row(rusqlite::params![unit_id, year, month], |r| {
            Ok((r.get(0)?, r.get(1)?))
        })?
    };
    Ok(totals)
}

/// Load a unit's expense rows for one period, with override rules applied
/// to the projection (stored rows stay untouched).
pub fn load_expense_rows(conn: &Connection, unit_id: i64, year: i32, month: u32) -> Result<Vec<ExpenseRow>> {
    let mut stmt = conn.prepare_cached(
        "SELECT d.id, d.account, d.subaccount, d.description, d.amount \
         FROM expense_rows d INNER JOIN imports i ON i.id = d.import_id \
         WHERE i.unit_id = ?1 AND i.period_year = ?2 AND i.period_month = ?3 \
         ORDER BY d.id",
    )?;
    let mut rows: Vec<ExpenseRow> = stmt
        .query_map(rusqlite::params![unit_id, year, month], |row| {
            Ok(ExpenseRow {
                id: row.get(0)?,
                account: row.get(1)?,
                subaccount: row.get(2)?,
                description: row.get(3)?,
                amount: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let rules = load_rules(conn, Some(unit_id))?;
    apply_rules(&rules, &mut rows);
    Ok(rows)
}

pub fn period_kpis(conn: &Connection, unit_id: i64, year: i32, month: u32) -> Result<Kpis> {
    let (gross, deductions) = revenue_totals(conn, unit_id, year, month, None)?;

    let chart = Chart::load(conn)?;
    let expenses: f64 = load_expense_rows(conn, unit_id, year, month)?
        .iter()
        .filter_map(|row| classify_expense(&chart, row))
        .filter_map(|c| c.amount)
        .sum();

    Ok(Kpis {
        gross,
        deductions,
        net: gross + deductions,
        expenses,
    })
}

// ---------------------------------------------------------------------------
// Waterfall
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct WaterfallStep {
    pub label: &'static str,
    pub value: f64,
    pub is_total: bool,
}

/// Decompose the period result into waterfall steps: gross, deductions,
/// expenses, then the running total.
pub fn waterfall(kpis: &Kpis) -> Vec<WaterfallStep> {
    vec![
        WaterfallStep { label: "Receita Bruta", value: kpis.gross, is_total: false },
        WaterfallStep { label: "Deduções", value: kpis.deductions, is_total: false },
        WaterfallStep { label: "Despesas", value: kpis.expenses, is_total: false },
        WaterfallStep { label: "Resultado", value: kpis.result(), is_total: true },
    ]
}

// ---------------------------------------------------------------------------
// Period comparison
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct KpiDelta {
    pub gross: f64,
    pub deductions: f64,
    pub net: f64,
    pub expenses: f64,
}

pub struct Comparison {
    pub current: Kpis,
    pub baseline: Kpis,
    pub delta: KpiDelta,
}

pub fn compare_periods(
    conn: &Connection,
    unit_id: i64,
    current: (i32, u32),
    baseline: (i32, u32),
) -> Result<Comparison> {
    let a = period_kpis(conn, unit_id, current.0, current.1)?;
    let b = period_kpis(conn, unit_id, baseline.0, baseline.1)?;
    Ok(Comparison {
        current: a,
        baseline: b,
        delta: KpiDelta {
            gross: a.gross - b.gross,
            deductions: a.deductions - b.deductions,
            net: a.net - b.net,
            expenses: a.expenses - b.expenses,
        },
    })
}

// ---------------------------------------------------------------------------
// Trailing series per collector
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
pub struct TrendPoint {
    pub year: i32,
    pub month: u32,
    pub net: f64,
}

fn months_back(year: i32, month: u32, back: u32) -> (i32, u32) {
    let total = year * 12 + month as i32 - 1 - back as i32;
    (total.div_euclid(12), (total.rem_euclid(12) + 1) as u32)
}

/// Twelve-month trailing net revenue for one collector, oldest month
/// first, ending at the reference period. Months without data are zero.
pub fn collector_trend(
    conn: &Connection,
    unit_id: i64,
    collector: &str,
    year: i32,
    month: u32,
) -> Result<Vec<TrendPoint>> {
    let mut series = Vec::with_capacity(12);
    for back in (0..12).rev() {
        let (y, m) = months_back(year, month, back);
        let (gross, deductions) = revenue_totals(conn, unit_id, y, m, Some(collector))?;
        series.push(TrendPoint { year: y, month: m, net: gross + deductions });
    }
    Ok(series)
}

// ---------------------------------------------------------------------------
// Breakdowns
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct RevenueLine {
    pub collector: String,
    pub code: String,
    pub kind: String,
    pub total: f64,
}

/// Revenue per (collector, code) for a period. Unmapped codes report kind
/// `outro`: excluded from the KPI buckets but kept for traceability.
pub fn revenue_breakdown(conn: &Connection, unit_id: i64, year: i32, month: u32) -> Result<Vec<RevenueLine>> {
    let mut stmt = conn.prepare_cached(
        "SELECT COALESCE(n.collector, '(sem arrecadadora)'), \
                UPPER(COALESCE(n.code, '')), \
                COALESCE(cm.kind, 'outro'), \
                SUM(COALESCE(n.amount, 0)) \
         FROM revenue_rows n \
         LEFT JOIN code_map cm ON UPPER(n.code) = cm.code \
         INNER JOIN imports i ON i.id = n.import_id \
         WHERE i.unit_id = ?1 AND i.period_year = ?2 AND i.period_month = ?3 \
         GROUP BY 1, 2, 3 ORDER BY 1, 4 DESC",
    )?;
    let lines = stmt
        .query_map(rusqlite::params![unit_id, year, month], |row| {
            Ok(RevenueLine {
                collector: row.get(0)?,
                code: row.get(1)?,
                kind: row.get(2)?,
                total: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(lines)
}

#[derive(Debug)]
pub struct ExpenseLine {
    pub group: String,
    pub subgroup: String,
    pub total: f64,
    pub count: i64,
}

/// Classified expense totals per (group, subgroup), most negative first.
/// Transfers are discarded; NULL amounts count toward `count` but not the
/// total.
pub fn expense_breakdown(conn: &Connection, unit_id: i64, year: i32, month: u32) -> Result<Vec<ExpenseLine>> {
    let chart = Chart::load(conn)?;
    let rows = load_expense_rows(conn, unit_id, year, month)?;

    let mut lines: Vec<ExpenseLine> = Vec::new();
    for row in &rows {
        let Some(classified) = classify_expense(&chart, row) else {
            continue;
        };
        let idx = lines
            .iter()
            .position(|l| l.group == classified.group && l.subgroup == classified.subgroup)
            .unwrap_or_else(|| {
                lines.push(ExpenseLine {
                    group: classified.group.clone(),
                    subgroup: classified.subgroup.clone(),
                    total: 0.0,
                    count: 0,
                });
                lines.len() - 1
            });
        lines[idx].total += classified.amount.unwrap_or(0.0);
        lines[idx].count += 1;
    }

    lines.sort_by(|a, b| a.total.partial_cmp(&b.total).unwrap_or(std::cmp::Ordering::Equal));
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db, upsert_unit};
    use crate::overrides::record_description_edit;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn add_import(conn: &Connection, unit_id: i64, year: i32, month: u32, kind: &str) -> i64 {
        conn.execute(
            "INSERT INTO imports (unit_id, period_year, period_month, kind) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![unit_id, year, month, kind],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    fn add_revenue(conn: &Connection, import_id: i64, collector: &str, code: &str, amount: Option<f64>) {
        let hash = format!("{import_id}-{collector}-{code}-{amount:?}-{}", conn.last_insert_rowid());
        conn.execute(
            "INSERT INTO revenue_rows (import_id, date, year, month, collector, code, amount, row_hash) \
             VALUES (?1, '2025-06-01', 2025, 6, ?2, ?3, ?4, ?5)",
            rusqlite::params![import_id, collector, code, amount, hash],
        )
        .unwrap();
    }

    fn add_expense(conn: &Connection, import_id: i64, account: Option<&str>, desc: &str, amount: Option<f64>) {
        let hash = format!("{import_id}-{account:?}-{desc}-{amount:?}-{}", conn.last_insert_rowid());
        conn.execute(
            "INSERT INTO expense_rows (import_id, date, year, month, account, description, amount, row_hash) \
             VALUES (?1, '2025-06-01', 2025, 6, ?2, ?3, ?4, ?5)",
            rusqlite::params![import_id, account, desc, amount, hash],
        )
        .unwrap();
    }

    #[test]
    fn test_kpis_gross_deductions_net() {
        let (_dir, conn) = test_db();
        let unit = upsert_unit(&conn, "U").unwrap();
        let imp = add_import(&conn, unit, 2025, 6, "revenue_notice");
        add_revenue(&conn, imp, "Banco A", "VAM", Some(1000.0));
        add_revenue(&conn, imp, "Banco A", "VRA", Some(200.0));

        let kpis = period_kpis(&conn, unit, 2025, 6).unwrap();
        assert_eq!(kpis.gross, 1000.0);
        assert_eq!(kpis.deductions, -200.0);
        assert_eq!(kpis.net, 800.0);
    }

    #[test]
    fn test_deduction_sign_is_canonical() {
        let (_dir, conn) = test_db();
        let unit = upsert_unit(&conn, "U").unwrap();
        let imp = add_import(&conn, unit, 2025, 6, "revenue_notice");
        // File carried the deduction already negative; canonical sign holds.
        add_revenue(&conn, imp, "Banco A", "VRA", Some(-200.0));
        let kpis = period_kpis(&conn, unit, 2025, 6).unwrap();
        assert_eq!(kpis.deductions, -200.0);
    }

    #[test]
    fn test_unmapped_code_excluded_from_buckets() {
        let (_dir, conn) = test_db();
        let unit = upsert_unit(&conn, "U").unwrap();
        let imp = add_import(&conn, unit, 2025, 6, "revenue_notice");
        add_revenue(&conn, imp, "Banco A", "VAM", Some(100.0));
        add_revenue(&conn, imp, "Banco A", "ZZZ", Some(999.0));

        let kpis = period_kpis(&conn, unit, 2025, 6).unwrap();
        assert_eq!(kpis.gross, 100.0);
        assert_eq!(kpis.deductions, 0.0);

        let lines = revenue_breakdown(&conn, unit, 2025, 6).unwrap();
        let zzz = lines.iter().find(|l| l.code == "ZZZ").unwrap();
        assert_eq!(zzz.kind, "outro");
        assert_eq!(zzz.total, 999.0);
    }

    #[test]
    fn test_empty_period_is_all_zero() {
        let (_dir, conn) = test_db();
        let unit = upsert_unit(&conn, "U").unwrap();
        let kpis = period_kpis(&conn, unit, 2030, 1).unwrap();
        assert_eq!(kpis.gross, 0.0);
        assert_eq!(kpis.deductions, 0.0);
        assert_eq!(kpis.net, 0.0);
        assert_eq!(kpis.expenses, 0.0);
        assert_eq!(kpis.result(), 0.0);
    }

    #[test]
    fn test_null_amounts_contribute_zero() {
        let (_dir, conn) = test_db();
        let unit = upsert_unit(&conn, "U").unwrap();
        let imp = add_import(&conn, unit, 2025, 6, "revenue_notice");
        add_revenue(&conn, imp, "Banco A", "VAM", Some(50.0));
        add_revenue(&conn, imp, "Banco A", "VAM", None);
        let kpis = period_kpis(&conn, unit, 2025, 6).unwrap();
        assert_eq!(kpis.gross, 50.0);
    }

    #[test]
    fn test_expenses_classified_and_sign_normalized() {
        let (_dir, conn) = test_db();
        let unit = upsert_unit(&conn, "U").unwrap();
        let imp = add_import(&conn, unit, 2025, 6, "expense_detail");
        add_expense(&conn, imp, Some("ALUGUEL"), "ALUGUEL JUNHO", Some(2500.0));
        add_expense(&conn, imp, None, "TRANSFERÊNCIA ENTRE CONTAS", Some(9999.0));

        let kpis = period_kpis(&conn, unit, 2025, 6).unwrap();
        // Rent forced negative; the transfer is discarded entirely.
        assert_eq!(kpis.expenses, -2500.0);
    }

    #[test]
    fn test_waterfall_steps() {
        let kpis = Kpis { gross: 1000.0, deductions: -200.0, net: 800.0, expenses: -300.0 };
        let steps = waterfall(&kpis);
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[3].label, "Resultado");
        assert_eq!(steps[3].value, 500.0);
        assert!(steps[3].is_total);
    }

    #[test]
    fn test_compare_periods_deltas() {
        let (_dir, conn) = test_db();
        let unit = upsert_unit(&conn, "U").unwrap();
        let imp_a = add_import(&conn, unit, 2025, 6, "revenue_notice");
        add_revenue(&conn, imp_a, "Banco A", "VAM", Some(1000.0));
        let imp_b = add_import(&conn, unit, 2025, 5, "revenue_notice");
        add_revenue(&conn, imp_b, "Banco A", "VAM", Some(600.0));

        let cmp = compare_periods(&conn, unit, (2025, 6), (2025, 5)).unwrap();
        assert_eq!(cmp.current.gross, 1000.0);
        assert_eq!(cmp.baseline.gross, 600.0);
        assert_eq!(cmp.delta.gross, 400.0);
        assert_eq!(cmp.delta.net, 400.0);
    }

    #[test]
    fn test_months_back_wraps_year() {
        assert_eq!(months_back(2025, 6, 0), (2025, 6));
        assert_eq!(months_back(2025, 6, 5), (2025, 1));
        assert_eq!(months_back(2025, 6, 6), (2024, 12));
        assert_eq!(months_back(2025, 6, 11), (2024, 7));
    }

    #[test]
    fn test_collector_trend_walks_back_twelve_months() {
        let (_dir, conn) = test_db();
        let unit = upsert_unit(&conn, "U").unwrap();
        let imp_now = add_import(&conn, unit, 2025, 6, "revenue_notice");
        add_revenue(&conn, imp_now, "Banco A", "VAM", Some(100.0));
        let imp_old = add_import(&conn, unit, 2024, 7, "revenue_notice");
        add_revenue(&conn, imp_old, "Banco A", "VAM", Some(40.0));
        add_revenue(&conn, imp_old, "Banco B", "VAM", Some(7.0));

        let series = collector_trend(&conn, unit, "Banco A", 2025, 6).unwrap();
        assert_eq!(series.len(), 12);
        assert_eq!(series[0], TrendPoint { year: 2024, month: 7, net: 40.0 });
        assert_eq!(series[11], TrendPoint { year: 2025, month: 6, net: 100.0 });
        // Months in between have no data and report zero.
        assert_eq!(series[5].net, 0.0);
    }

    #[test]
    fn test_expense_breakdown_groups_and_orders() {
        let (_dir, conn) = test_db();
        let unit = upsert_unit(&conn, "U").unwrap();
        let imp = add_import(&conn, unit, 2025, 6, "expense_detail");
        add_expense(&conn, imp, Some("ALUGUEL"), "aluguel", Some(2500.0));
        add_expense(&conn, imp, Some("ENERGIA ELETRICA"), "cpfl", Some(400.0));
        add_expense(&conn, imp, Some("ENERGIA ELETRICA"), "cpfl 2", Some(100.0));

        let lines = expense_breakdown(&conn, unit, 2025, 6).unwrap();
        assert_eq!(lines.len(), 2);
        // Most negative first.
        assert_eq!(lines[0].subgroup, "OCUPAÇÃO");
        assert_eq!(lines[0].total, -2500.0);
        assert_eq!(lines[1].subgroup, "UTILIDADES");
        assert_eq!(lines[1].total, -500.0);
        assert_eq!(lines[1].count, 2);
    }

    #[test]
    fn test_overrides_affect_classification_at_read_time() {
        let (_dir, conn) = test_db();
        let unit = upsert_unit(&conn, "U").unwrap();
        let imp = add_import(&conn, unit, 2025, 6, "expense_detail");
        add_expense(&conn, imp, None, "PGTO DIVERSO", Some(300.0));

        // Uncategorized before the edit.
        let before = expense_breakdown(&conn, unit, 2025, 6).unwrap();
        assert_eq!(before[0].group, crate::classifier::UNCATEGORIZED_GROUP);

        // A review edit rewrites the description; keyword fallback now hits.
        record_description_edit(&conn, unit, "PGTO DIVERSO", "ALUGUEL SALA").unwrap();
        let after = expense_breakdown(&conn, unit, 2025, 6).unwrap();
        assert_eq!(after[0].subgroup, "OCUPAÇÃO");

        // Stored row is untouched.
        let stored: String = conn
            .query_row("SELECT description FROM expense_rows", [], |r| r.get(0))
            .unwrap();
        assert_eq!(stored, "PGTO DIVERSO");
    }
}
