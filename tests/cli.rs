use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;

/// Build an `apura` command with HOME pointed at an isolated temp dir so
/// settings and data never touch the real user profile.
fn apura(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("apura").unwrap();
    cmd.env("HOME", home).env("NO_COLOR", "1");
    cmd
}

fn init(home: &Path) {
    let data = home.join("data");
    apura(home)
        .args(["init", "--data-dir", data.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized apura"));
}

fn write_revenue_csv(dir: &Path, name: &str) -> String {
    let path = dir.join(name);
    std::fs::write(
        &path,
        "Data;Arrecadadora;Tipo de Repasse;Valor\n\
         05/06/2025;Banco A;VAM;1.000,00\n\
         10/06/2025;Banco A;VRA;200,00\n",
    )
    .unwrap();
    path.to_string_lossy().to_string()
}

fn write_expense_csv(dir: &Path, name: &str) -> String {
    let path = dir.join(name);
    std::fs::write(
        &path,
        "Data;Conta;Descrição;Valor\n\
         03/06/2025;ALUGUEL;Aluguel da sala;2.500,00\n\
         07/06/2025;;PGTO AVULSO;300,00\n",
    )
    .unwrap();
    path.to_string_lossy().to_string()
}

#[test]
fn init_then_status_reports_empty_db() {
    let tmp = tempfile::tempdir().unwrap();
    init(tmp.path());
    apura(tmp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing imported yet"));
}

#[test]
fn import_and_kpis_end_to_end() {
    let tmp = tempfile::tempdir().unwrap();
    init(tmp.path());
    let csv = write_revenue_csv(tmp.path(), "notas.csv");

    apura(tmp.path())
        .args(["import", &csv, "--unit", "Matriz", "--month", "2025-06", "--kind", "revenue"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 rows"));

    // VAM 1000 counts as gross, VRA 200 as a deduction: net 800.
    apura(tmp.path())
        .args(["report", "kpis", "--unit", "Matriz", "--month", "2025-06"])
        .assert()
        .success()
        .stdout(predicate::str::contains("R$ 1.000,00"))
        .stdout(predicate::str::contains("-R$ 200,00"))
        .stdout(predicate::str::contains("R$ 800,00"));
}

#[test]
fn reimporting_the_same_file_inserts_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    init(tmp.path());
    let csv = write_revenue_csv(tmp.path(), "notas.csv");
    let import = |home: &Path| {
        apura(home)
            .args(["import", &csv, "--unit", "Matriz", "--month", "2025-06", "--kind", "revenue"])
            .assert()
            .success()
    };
    import(tmp.path()).stdout(predicate::str::contains("Imported 2 rows"));
    import(tmp.path())
        .stdout(predicate::str::contains("already imported"))
        .stdout(predicate::str::contains("Imported 0 rows"));
}

#[test]
fn expense_report_classifies_and_respects_rewrites() {
    let tmp = tempfile::tempdir().unwrap();
    init(tmp.path());
    let csv = write_expense_csv(tmp.path(), "detalhamento.csv");

    apura(tmp.path())
        .args(["import", &csv, "--unit", "Matriz", "--month", "2025-06", "--kind", "expense"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 rows"));

    // The rent row classifies via the chart; the other row is uncategorized.
    apura(tmp.path())
        .args(["report", "expenses", "--unit", "Matriz", "--month", "2025-06"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OCUPAÇÃO"))
        .stdout(predicate::str::contains("NÃO CLASSIFICADAS"));

    // A rewrite reroutes the stray row through the keyword fallback.
    apura(tmp.path())
        .args(["rules", "rewrite", "--unit", "Matriz", "PGTO AVULSO", "ENERGIA ELETRICA"])
        .assert()
        .success();
    apura(tmp.path())
        .args(["report", "expenses", "--unit", "Matriz", "--month", "2025-06"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NÃO CLASSIFICADAS").not());
}

#[test]
fn unknown_unit_fails_with_a_clear_error() {
    let tmp = tempfile::tempdir().unwrap();
    init(tmp.path());
    apura(tmp.path())
        .args(["report", "kpis", "--unit", "Nowhere", "--month", "2025-06"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nowhere"));
}

#[test]
fn units_lifecycle() {
    let tmp = tempfile::tempdir().unwrap();
    init(tmp.path());
    apura(tmp.path()).args(["units", "add", "Filial Sul"]).assert().success();
    apura(tmp.path())
        .args(["units", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Filial Sul"));
    apura(tmp.path())
        .args(["units", "rename", "Filial Sul", "Filial Leste"])
        .assert()
        .success();
    apura(tmp.path()).args(["units", "remove", "Filial Leste"]).assert().success();
    apura(tmp.path())
        .args(["units", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Filial").not());
}
