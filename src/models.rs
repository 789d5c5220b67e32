use serde::Serialize;

/// Source kind of an import batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Revenue notices ("notas de negócio"): collector, code, amount.
    RevenueNotice,
    /// Expense ledger ("detalhamento financeiro"): account, subaccount, amount.
    ExpenseDetail,
}

impl SourceKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::RevenueNotice => "revenue_notice",
            Self::ExpenseDetail => "expense_detail",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::RevenueNotice => "Notas de Negócio",
            Self::ExpenseDetail => "Detalhamento Financeiro",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "revenue_notice" | "revenue" => Some(Self::RevenueNotice),
            "expense_detail" | "expense" => Some(Self::ExpenseDetail),
            _ => None,
        }
    }
}

/// One normalized line from a revenue-notice file, before DB insert.
///
/// Serialization order of the fields is the canonical order for the row
/// content hash; do not reorder them. `source_file` is excluded from the
/// hash so the same row re-uploaded under a renamed file still dedups.
#[derive(Debug, Clone, Serialize)]
pub struct RevenueRecord {
    pub date: String,
    pub year: i32,
    pub month: u32,
    pub collector: Option<String>,
    pub code: Option<String>,
    pub payment_channel: Option<String>,
    pub description: Option<String>,
    pub amount: Option<f64>,
    #[serde(skip)]
    pub source_file: String,
}

/// One normalized line from an expense-ledger file, before DB insert.
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseRecord {
    pub date: String,
    pub year: i32,
    pub month: u32,
    pub account: Option<String>,
    pub subaccount: Option<String>,
    pub description: Option<String>,
    pub amount: Option<f64>,
    #[serde(skip)]
    pub source_file: String,
}

/// An expense row as read back for classification and reporting.
#[derive(Debug, Clone)]
pub struct ExpenseRow {
    pub id: i64,
    pub account: Option<String>,
    pub subaccount: Option<String>,
    pub description: Option<String>,
    pub amount: Option<f64>,
}

/// Field an override rule matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchField {
    Description,
    Subaccount,
    Account,
}

impl MatchField {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Subaccount => "subaccount",
            Self::Account => "account",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "description" => Some(Self::Description),
            "subaccount" => Some(Self::Subaccount),
            "account" => Some(Self::Account),
            _ => None,
        }
    }
}

/// A persisted description-rewrite rule. `unit_id` of `None` means global.
#[derive(Debug, Clone)]
pub struct OverrideRule {
    pub id: i64,
    pub unit_id: Option<i64>,
    pub match_field: MatchField,
    pub match_type: String,
    pub match_value: String,
    pub replacement: String,
}
