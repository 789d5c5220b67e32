use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::parse_month;
use crate::db::{find_unit, get_connection};
use crate::error::Result;
use crate::fmt::money;
use crate::reports;
use crate::settings::db_path;

pub fn kpis(unit: &str, month: &str) -> Result<()> {
    let (year, m) = parse_month(month)?;
    let conn = get_connection(&db_path())?;
    let unit_id = find_unit(&conn, unit)?;
    let kpis = reports::period_kpis(&conn, unit_id, year, m)?;

    let mut table = Table::new();
    table.set_header(vec!["", "Amount"]);
    for step in reports::waterfall(&kpis) {
        let label = if step.is_total {
            if step.value >= 0.0 {
                step.label.green().bold()
            } else {
                step.label.red().bold()
            }
        } else {
            step.label.normal()
        };
        table.add_row(vec![Cell::new(label), Cell::new(money(step.value))]);
    }
    println!("{} — {:04}-{:02}\n{table}", unit.bold(), year, m);
    println!("Receita Líquida: {}", money(kpis.net));
    Ok(())
}

pub fn compare(unit: &str, month: &str, baseline: &str) -> Result<()> {
    let (cy, cm) = parse_month(month)?;
    let (by, bm) = parse_month(baseline)?;
    let conn = get_connection(&db_path())?;
    let unit_id = find_unit(&conn, unit)?;
    let cmp = reports::compare_periods(&conn, unit_id, (cy, cm), (by, bm))?;

    let mut table = Table::new();
    table.set_header(vec![
        "KPI".to_string(),
        format!("{cy:04}-{cm:02}"),
        format!("{by:04}-{bm:02}"),
        "Δ".to_string(),
    ]);
    let rows = [
        ("Receita Bruta", cmp.current.gross, cmp.baseline.gross, cmp.delta.gross),
        ("Deduções", cmp.current.deductions, cmp.baseline.deductions, cmp.delta.deductions),
        ("Receita Líquida", cmp.current.net, cmp.baseline.net, cmp.delta.net),
        ("Despesas", cmp.current.expenses, cmp.baseline.expenses, cmp.delta.expenses),
        (
            "Resultado",
            cmp.current.result(),
            cmp.baseline.result(),
            cmp.current.result() - cmp.baseline.result(),
        ),
    ];
    for (label, cur, base, delta) in rows {
        let delta_cell = if delta >= 0.0 {
            Cell::new(format!("+{}", money(delta)).green())
        } else {
            Cell::new(money(delta).red())
        };
        table.add_row(vec![
            Cell::new(label),
            Cell::new(money(cur)),
            Cell::new(money(base)),
            delta_cell,
        ]);
    }
    println!("{} — comparação\n{table}", unit.bold());
    Ok(())
}

pub fn trend(unit: &str, collector: &str, month: &str) -> Result<()> {
    let (year, m) = parse_month(month)?;
    let conn = get_connection(&db_path())?;
    let unit_id = find_unit(&conn, unit)?;
    let series = reports::collector_trend(&conn, unit_id, collector, year, m)?;

    let mut table = Table::new();
    table.set_header(vec!["Month", "Net"]);
    for point in &series {
        table.add_row(vec![
            Cell::new(format!("{:04}-{:02}", point.year, point.month)),
            Cell::new(money(point.net)),
        ]);
    }
    println!("{} — {} (12 meses)\n{table}", unit.bold(), collector);
    Ok(())
}

pub fn revenue(unit: &str, month: &str) -> Result<()> {
    let (year, m) = parse_month(month)?;
    let conn = get_connection(&db_path())?;
    let unit_id = find_unit(&conn, unit)?;
    let lines = reports::revenue_breakdown(&conn, unit_id, year, m)?;

    let mut table = Table::new();
    table.set_header(vec!["Collector", "Code", "Kind", "Total"]);
    for line in &lines {
        let kind_cell = match line.kind.as_str() {
            "bruta" => Cell::new("bruta".green()),
            "deducao" => Cell::new("deducao".red()),
            other => Cell::new(other.yellow()),
        };
        table.add_row(vec![
            Cell::new(&line.collector),
            Cell::new(&line.code),
            kind_cell,
            Cell::new(money(line.total)),
        ]);
    }
    println!("{} — receitas {:04}-{:02}\n{table}", unit.bold(), year, m);
    Ok(())
}

pub fn expenses(unit: &str, month: &str) -> Result<()> {
    let (year, m) = parse_month(month)?;
    let conn = get_connection(&db_path())?;
    let unit_id = find_unit(&conn, unit)?;
    let lines = reports::expense_breakdown(&conn, unit_id, year, m)?;

    let total: f64 = lines.iter().map(|l| l.total).sum();
    let mut table = Table::new();
    table.set_header(vec!["Group", "Subgroup", "Amount", "Rows"]);
    for line in &lines {
        table.add_row(vec![
            Cell::new(&line.group),
            Cell::new(&line.subgroup),
            Cell::new(money(line.total.abs())),
            Cell::new(line.count),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(""),
        Cell::new(money(total.abs())),
        Cell::new(""),
    ]);
    println!("{} — despesas {:04}-{:02}\n{table}", unit.bold(), year, m);
    Ok(())
}
