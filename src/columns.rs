use regex::Regex;

use crate::reader::RawTable;

/// Semantic roles a header column can play. Pattern lists are ordered; the
/// first header matching any pattern for a role wins. Roles are detected
/// independently, so one column may serve more than one role (e.g. a
/// "Descrição" column doubling as account and description).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Date,
    Amount,
    Code,
    Description,
    Account,
    Subaccount,
    Collector,
    PaymentChannel,
}

/// Case-insensitive header patterns per role, carried over from the
/// spreadsheet variants these exports come from.
fn patterns(role: Role) -> &'static [&'static str] {
    match role {
        Role::Date => &[r"data", r"compet[eê]ncia", r"compet", r"emiss[aã]o", r"m[eê]s", r"periodo"],
        Role::Amount => &[r"^valor", r"vlr", r"montante", r"total"],
        Role::Code => &[r"^cod", r"codigo", r"c[oó]digo", r"tipo.*(repasse|receita|mov)"],
        Role::Description => &[r"hist[oó]rico", r"descri", r"observa", r"memo", r"detalhe", r"obs"],
        Role::Account => &[r"^conta", r"plano.*contas", r"r[oó]tulo.*linha", r"categoria", r"centro.*custo", r"descri"],
        Role::Subaccount => &[r"subconta", r"sub-conta", r"classe", r"subcategoria"],
        Role::Collector => &[r"arrecad"],
        Role::PaymentChannel => &[r"meio", r"forma.*pag", r"bandeira", r"canal"],
    }
}

/// Header-to-role bindings for one parsed table. An unbound role means the
/// caller falls back to a default (batch period for dates, `None` for
/// descriptive fields) instead of failing the file.
#[derive(Debug, Default)]
pub struct ColumnMap {
    pub date: Option<usize>,
    pub amount: Option<usize>,
    pub code: Option<usize>,
    pub description: Option<usize>,
    pub account: Option<usize>,
    pub subaccount: Option<usize>,
    pub collector: Option<usize>,
    pub payment_channel: Option<usize>,
}

fn detect_role(headers: &[String], role: Role) -> Option<usize> {
    for pat in patterns(role) {
        let re = Regex::new(&format!("(?i){pat}")).ok()?;
        if let Some(idx) = headers.iter().position(|h| re.is_match(h)) {
            return Some(idx);
        }
    }
    None
}

pub fn detect_columns(table: &RawTable) -> ColumnMap {
    let h = &table.headers;
    ColumnMap {
        date: detect_role(h, Role::Date),
        amount: detect_role(h, Role::Amount),
        code: detect_role(h, Role::Code),
        description: detect_role(h, Role::Description),
        account: detect_role(h, Role::Account),
        subaccount: detect_role(h, Role::Subaccount),
        collector: detect_role(h, Role::Collector),
        payment_channel: detect_role(h, Role::PaymentChannel),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str]) -> RawTable {
        RawTable {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: vec![],
        }
    }

    #[test]
    fn test_revenue_notice_headers() {
        let t = table(&["Data", "Arrecadadora", "Código", "Meio de Pagamento", "Histórico", "Valor"]);
        let cols = detect_columns(&t);
        assert_eq!(cols.date, Some(0));
        assert_eq!(cols.collector, Some(1));
        assert_eq!(cols.code, Some(2));
        assert_eq!(cols.payment_channel, Some(3));
        assert_eq!(cols.description, Some(4));
        assert_eq!(cols.amount, Some(5));
    }

    #[test]
    fn test_expense_ledger_headers() {
        let t = table(&["Competência", "Conta", "Subconta", "Observação", "Vlr Pago"]);
        let cols = detect_columns(&t);
        assert_eq!(cols.date, Some(0));
        assert_eq!(cols.account, Some(1));
        assert_eq!(cols.subaccount, Some(2));
        assert_eq!(cols.description, Some(3));
        assert_eq!(cols.amount, Some(4));
    }

    #[test]
    fn test_pattern_order_within_role() {
        // "^valor" outranks "total": a table with both binds to Valor.
        let t = table(&["Total Geral", "Valor Líquido"]);
        let cols = detect_columns(&t);
        assert_eq!(cols.amount, Some(1));
    }

    #[test]
    fn test_case_insensitive() {
        let t = table(&["DATA", "VALOR"]);
        let cols = detect_columns(&t);
        assert_eq!(cols.date, Some(0));
        assert_eq!(cols.amount, Some(1));
    }

    #[test]
    fn test_unbound_roles_stay_none() {
        let t = table(&["Data", "Valor"]);
        let cols = detect_columns(&t);
        assert_eq!(cols.collector, None);
        assert_eq!(cols.code, None);
        assert_eq!(cols.subaccount, None);
    }

    #[test]
    fn test_code_from_movement_type_column() {
        let t = table(&["Tipo de Repasse", "Valor"]);
        let cols = detect_columns(&t);
        assert_eq!(cols.code, Some(0));
    }

    #[test]
    fn test_one_column_multiple_roles() {
        // "descri" is a pattern for both description and (as last resort)
        // account, so a lone "Descrição" column serves both roles.
        let t = table(&["Descrição", "Valor"]);
        let cols = detect_columns(&t);
        assert_eq!(cols.description, Some(0));
        assert_eq!(cols.account, Some(0));
    }
}
