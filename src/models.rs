use serde::{Deserialize, Serialize};

/// One row of a `ledger csv` export.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRow {
    pub date: String,
    pub description: String,
    pub category: String,
    pub commodity: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MmexCategory {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Transfer,
}

impl TransactionKind {
    /// The MMEX `TRANSCODE` value.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Deposit => "Deposit",
            Self::Withdrawal => "Withdrawal",
            Self::Transfer => "Transfer",
        }
    }
}

/// Intermediate CSV row written by `convert` and consumed by `migrate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertedRow {
    #[serde(rename = "Data")]
    pub date: String,
    #[serde(rename = "Stato")]
    pub status: String,
    #[serde(rename = "Tipo")]
    pub kind: String,
    #[serde(rename = "Conto")]
    pub account: String,
    #[serde(rename = "ToConto")]
    pub to_account: String,
    #[serde(rename = "Beneficiario")]
    pub payee: String,
    #[serde(rename = "Importo")]
    pub amount: f64,
    #[serde(rename = "Valuta")]
    pub currency: String,
    #[serde(rename = "Categoria")]
    pub category: String,
    #[serde(rename = "Sotto-Categoria")]
    pub subcategory: String,
    #[serde(rename = "Note")]
    pub note: String,
}

impl ConvertedRow {
    pub const HEADERS: [&'static str; 11] = [
        "Data",
        "Stato",
        "Tipo",
        "Conto",
        "ToConto",
        "Beneficiario",
        "Importo",
        "Valuta",
        "Categoria",
        "Sotto-Categoria",
        "Note",
    ];

    /// Colon-joined category path as stored in `CATEGORY_V1`.
    pub fn category_path(&self) -> String {
        if self.subcategory.is_empty() {
            self.category.clone()
        } else {
            format!("{}:{}", self.category, self.subcategory)
        }
    }
}

/// A `CHECKINGACCOUNT_V1` record, in table column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct CheckingRow {
    pub transid: i64,
    pub accountid: i64,
    pub toaccountid: i64,
    pub payeeid: i64,
    pub transcode: String,
    pub transamount: f64,
    pub status: String,
    pub transactionnumber: String,
    pub notes: String,
    pub categid: i64,
    pub transdate: String,
    pub lastupdatedtime: String,
    pub deletedtime: String,
    pub followupid: i64,
    pub totransamount: f64,
    pub color: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(category: &str, subcategory: &str) -> ConvertedRow {
        ConvertedRow {
            date: "2022-01-03".into(),
            status: "R".into(),
            kind: "Withdrawal".into(),
            account: "Intesa".into(),
            to_account: String::new(),
            payee: String::new(),
            amount: 12.5,
            currency: "EUR".into(),
            category: category.into(),
            subcategory: subcategory.into(),
            note: "Spesa".into(),
        }
    }

    #[test]
    fn test_category_path_joins_subcategory() {
        assert_eq!(row("Food", "Groceries").category_path(), "Food:Groceries");
        assert_eq!(row("Food:Groceries", "Organic").category_path(), "Food:Groceries:Organic");
    }

    #[test]
    fn test_category_path_without_subcategory() {
        assert_eq!(row("Income", "").category_path(), "Income");
    }
}
