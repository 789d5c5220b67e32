use std::collections::HashMap;

use regex::Regex;
use rusqlite::Connection;

use crate::error::Result;
use crate::models::ExpenseRow;

/// Default chart of accounts: exact account text (upper-cased) to a
/// (group, subgroup) taxonomy node. User edits live in the `account_map`
/// table and are merged over these at load time.
const DEFAULT_CHART: &[(&str, &str, &str)] = &[
    ("ALUGUEL", "DESPESAS OPERACIONAIS", "OCUPAÇÃO"),
    ("CONDOMINIO", "DESPESAS OPERACIONAIS", "OCUPAÇÃO"),
    ("ENERGIA ELETRICA", "DESPESAS OPERACIONAIS", "UTILIDADES"),
    ("AGUA E ESGOTO", "DESPESAS OPERACIONAIS", "UTILIDADES"),
    ("TELEFONIA", "DESPESAS OPERACIONAIS", "COMUNICAÇÃO"),
    ("INTERNET", "DESPESAS OPERACIONAIS", "COMUNICAÇÃO"),
    ("MATERIAL DE ESCRITORIO", "DESPESAS OPERACIONAIS", "MATERIAIS"),
    ("MATERIAL DE LIMPEZA", "DESPESAS OPERACIONAIS", "MATERIAIS"),
    ("MANUTENCAO PREDIAL", "DESPESAS OPERACIONAIS", "MANUTENÇÃO"),
    ("COMBUSTIVEL", "DESPESAS OPERACIONAIS", "DESLOCAMENTO"),
    ("SALARIOS", "DESPESAS COM PESSOAL", "SALÁRIOS"),
    ("FGTS", "DESPESAS COM PESSOAL", "ENCARGOS"),
    ("INSS", "DESPESAS COM PESSOAL", "ENCARGOS"),
    ("VALE TRANSPORTE", "DESPESAS COM PESSOAL", "BENEFÍCIOS"),
    ("VALE REFEICAO", "DESPESAS COM PESSOAL", "BENEFÍCIOS"),
    ("PUBLICIDADE", "DESPESAS COMERCIAIS", "PUBLICIDADE"),
    ("ROYALTIES", "DESPESAS COMERCIAIS", "ROYALTIES"),
    ("TARIFAS BANCARIAS", "DESPESAS FINANCEIRAS", "TARIFAS"),
    ("JUROS E MULTAS", "DESPESAS FINANCEIRAS", "JUROS"),
    ("DAS", "IMPOSTOS E TAXAS", "SIMPLES NACIONAL"),
    ("ISS", "IMPOSTOS E TAXAS", "MUNICIPAIS"),
    ("IPTU", "IMPOSTOS E TAXAS", "MUNICIPAIS"),
    ("EQUIPAMENTOS DE INFORMATICA", "INVESTIMENTOS", "EQUIPAMENTOS"),
    ("MOVEIS E UTENSILIOS", "INVESTIMENTOS", "INSTALAÇÕES"),
    ("PRO-LABORE", "DISTRIBUIÇÃO DE RESULTADOS", "PRÓ-LABORE"),
    ("DISTRIBUICAO DE LUCROS", "DISTRIBUIÇÃO DE RESULTADOS", "LUCROS"),
    ("ESTORNO DE RECEBIMENTO", "RECEITAS NÃO OPERACIONAIS", "ESTORNOS"),
];

/// Fallback keyword map, scanned in this order against the upper-cased
/// description when the account is not in the chart. First match wins, so
/// the order here is an observable contract.
const KEYWORD_MAP: &[(&str, &str, &str)] = &[
    ("FOLHA", "DESPESAS COM PESSOAL", "SALÁRIOS"),
    ("SALARIO", "DESPESAS COM PESSOAL", "SALÁRIOS"),
    ("RESCIS", "DESPESAS COM PESSOAL", "RESCISÕES"),
    ("FGTS", "DESPESAS COM PESSOAL", "ENCARGOS"),
    ("INSS", "DESPESAS COM PESSOAL", "ENCARGOS"),
    ("VALE", "DESPESAS COM PESSOAL", "BENEFÍCIOS"),
    ("ALUGUEL", "DESPESAS OPERACIONAIS", "OCUPAÇÃO"),
    ("CONDOMIN", "DESPESAS OPERACIONAIS", "OCUPAÇÃO"),
    ("ENERGIA", "DESPESAS OPERACIONAIS", "UTILIDADES"),
    ("AGUA", "DESPESAS OPERACIONAIS", "UTILIDADES"),
    ("TELEFON", "DESPESAS OPERACIONAIS", "COMUNICAÇÃO"),
    ("CELULAR", "DESPESAS OPERACIONAIS", "COMUNICAÇÃO"),
    ("INTERNET", "DESPESAS OPERACIONAIS", "COMUNICAÇÃO"),
    ("LIMPEZA", "DESPESAS OPERACIONAIS", "MATERIAIS"),
    ("MANUTEN", "DESPESAS OPERACIONAIS", "MANUTENÇÃO"),
    ("COMBUSTIVEL", "DESPESAS OPERACIONAIS", "DESLOCAMENTO"),
    ("FRETE", "DESPESAS OPERACIONAIS", "LOGÍSTICA"),
    ("CORREIOS", "DESPESAS OPERACIONAIS", "LOGÍSTICA"),
    ("MARKETING", "DESPESAS COMERCIAIS", "PUBLICIDADE"),
    ("PUBLICIDADE", "DESPESAS COMERCIAIS", "PUBLICIDADE"),
    ("ANUNCIO", "DESPESAS COMERCIAIS", "PUBLICIDADE"),
    ("ROYALT", "DESPESAS COMERCIAIS", "ROYALTIES"),
    ("DARF", "IMPOSTOS E TAXAS", "FEDERAIS"),
    ("IMPOSTO", "IMPOSTOS E TAXAS", "FEDERAIS"),
    ("TRIBUTO", "IMPOSTOS E TAXAS", "FEDERAIS"),
    ("TARIFA", "DESPESAS FINANCEIRAS", "TARIFAS"),
    ("JUROS", "DESPESAS FINANCEIRAS", "JUROS"),
    ("MULTA", "DESPESAS FINANCEIRAS", "JUROS"),
    ("PRO-LABORE", "DISTRIBUIÇÃO DE RESULTADOS", "PRÓ-LABORE"),
    ("PROLABORE", "DISTRIBUIÇÃO DE RESULTADOS", "PRÓ-LABORE"),
    ("LUCRO", "DISTRIBUIÇÃO DE RESULTADOS", "LUCROS"),
    ("COMPUTADOR", "INVESTIMENTOS", "EQUIPAMENTOS"),
    ("IMPRESSORA", "INVESTIMENTOS", "EQUIPAMENTOS"),
    ("EQUIPAMENTO", "INVESTIMENTOS", "EQUIPAMENTOS"),
];

/// Descriptions matching this pattern with no chart/keyword hit are
/// inter-account transfers, not P&L events; the row is discarded from
/// classification (it stays in storage).
const TRANSFER_PATTERN: &str =
    r"(?i)TRANSF(ER[EÊ]NCIA)?\.?\s+ENTRE\s+CONTAS|APLICA[ÇC][ÃA]O\s+AUTOM|RESGATE\s+AUTOM";

pub const UNCATEGORIZED_GROUP: &str = "OUTRAS DESPESAS";
pub const UNCATEGORIZED_SUBGROUP: &str = "NÃO CLASSIFICADAS";

/// The merged chart of accounts: compiled-in defaults with user rows from
/// `account_map` layered on top.
pub struct Chart {
    entries: HashMap<String, (String, String)>,
    transfer: Regex,
}

impl Chart {
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut entries: HashMap<String, (String, String)> = DEFAULT_CHART
            .iter()
            .map(|(a, g, s)| (a.to_string(), (g.to_string(), s.to_string())))
            .collect();

        let mut stmt = conn.prepare("SELECT account, group_name, subgroup_name FROM account_map")?;
        let user_rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        for row in user_rows {
            let (account, group, subgroup) = row?;
            entries.insert(canonical_account(&account), (group, subgroup));
        }

        // Pattern is a compile-time constant; it always parses.
        let transfer = Regex::new(TRANSFER_PATTERN)
            .map_err(|e| crate::error::ApuraError::Other(e.to_string()))?;
        Ok(Self { entries, transfer })
    }

    pub fn lookup(&self, account: &str) -> Option<&(String, String)> {
        self.entries.get(&canonical_account(account))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries sorted by (group, subgroup, account), for display.
    pub fn sorted_entries(&self) -> Vec<(&str, &str, &str)> {
        let mut rows: Vec<(&str, &str, &str)> = self
            .entries
            .iter()
            .map(|(account, (group, subgroup))| (account.as_str(), group.as_str(), subgroup.as_str()))
            .collect();
        rows.sort_by_key(|&(account, group, subgroup)| (group, subgroup, account));
        rows
    }
}

pub fn canonical_account(account: &str) -> String {
    account.trim().to_uppercase()
}

/// Persist a user chart edit; overrides the default chart on next load.
pub fn upsert_account(conn: &Connection, account: &str, group: &str, subgroup: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO account_map (account, group_name, subgroup_name) VALUES (?1, ?2, ?3) \
         ON CONFLICT(account) DO UPDATE SET group_name = excluded.group_name, \
         subgroup_name = excluded.subgroup_name, updated_at = datetime('now')",
        rusqlite::params![canonical_account(account), group, subgroup],
    )?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub group: String,
    pub subgroup: String,
    /// Sign-normalized amount; `None` when the source value was unparseable
    /// (stored for audit, excluded from sums).
    pub amount: Option<f64>,
}

/// Resolve an expense row to its taxonomy node and normalized amount.
/// Returns `None` for pure inter-account transfers, which are dropped from
/// every rollup.
pub fn classify_expense(chart: &Chart, row: &ExpenseRow) -> Option<Classified> {
    let description = row.description.as_deref().unwrap_or("");

    let (group, subgroup) = match row.account.as_deref().and_then(|a| chart.lookup(a)) {
        Some((g, s)) => (g.clone(), s.clone()),
        None => {
            let upper = description.to_uppercase();
            match KEYWORD_MAP.iter().find(|(kw, _, _)| upper.contains(kw)) {
                Some((_, g, s)) => (g.to_string(), s.to_string()),
                None if chart.transfer.is_match(description) => return None,
                None => (UNCATEGORIZED_GROUP.to_string(), UNCATEGORIZED_SUBGROUP.to_string()),
            }
        }
    };

    let amount = row.amount.map(|v| normalize_sign(&group, v));
    Some(Classified { group, subgroup, amount })
}

/// Sign-normalization policy: revenue groups are forced positive; expense,
/// tax, investment and distribution groups are forced negative; anything
/// else keeps the parsed sign.
pub fn normalize_sign(group: &str, value: f64) -> f64 {
    let upper = group.to_uppercase();
    if upper.contains("RECEITA") {
        value.abs()
    } else if ["DESPESA", "IMPOSTO", "INVESTIMENTO", "DISTRIBUI"]
        .iter()
        .any(|m| upper.contains(m))
    {
        -value.abs()
    } else {
        value
    }
}
