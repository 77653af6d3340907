use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{MigrateError, Result};
use crate::models::LedgerRow;

// `ledger csv` column positions: date, code, payee, account, commodity, amount, cleared, note
const COL_DATE: usize = 0;
const COL_DESCRIPTION: usize = 2;
const COL_CATEGORY: usize = 3;
const COL_COMMODITY: usize = 4;
const COL_AMOUNT: usize = 5;
const LEDGER_COLUMNS: usize = 8;

/// Rewrite digit grouping and decimal marks into a plain `1234.56`. With both
/// `,` and `.` present the rightmost one is the decimal mark; a lone `,` is a
/// decimal mark.
fn normalize_separators(s: &str) -> String {
    match (s.rfind(','), s.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(_), None) if s.matches(',').count() == 1 => s.replace(',', "."),
        (Some(_), None) => s.replace(',', ""),
        _ => s.to_string(),
    }
}

pub fn parse_amount(raw: &str) -> Result<f64> {
    let s = normalize_separators(&raw.replace('"', ""));
    let s = s.trim();
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return inner
            .trim()
            .parse::<f64>()
            .map(|v| -v)
            .map_err(|_| MigrateError::InvalidAmount(raw.to_string()));
    }
    s.parse()
        .map_err(|_| MigrateError::InvalidAmount(raw.to_string()))
}

/// Read a headerless 8-column `ledger csv` export.
pub fn read_ledger(file_path: &Path) -> Result<Vec<LedgerRow>> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));
    let mut rows = Vec::new();

    for (line, result) in rdr.records().enumerate() {
        let record = result?;
        if record.len() < LEDGER_COLUMNS {
            log::warn!(
                "{}:{}: expected {LEDGER_COLUMNS} columns, found {}; skipping",
                file_path.display(),
                line + 1,
                record.len()
            );
            continue;
        }
        rows.push(LedgerRow {
            date: record[COL_DATE].trim().to_string(),
            description: record[COL_DESCRIPTION].trim().to_string(),
            category: record[COL_CATEGORY].trim().to_string(),
            commodity: record[COL_COMMODITY].trim().to_string(),
            amount: parse_amount(&record[COL_AMOUNT])?,
        });
    }
    log::debug!("read {} ledger rows from {}", rows.len(), file_path.display());
    Ok(rows)
}

/// Distinct category strings in first-seen order.
pub fn distinct_categories(rows: &[LedgerRow]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    rows.iter()
        .filter(|r| seen.insert(r.category.as_str()))
        .map(|r| r.category.clone())
        .collect()
}

pub fn cents(amount: f64) -> i64 {
    (amount.abs() * 100.0).round() as i64
}

pub struct Grouped {
    /// Two-leg groups, ordered by (date, description, amount).
    pub transactions: Vec<Vec<LedgerRow>>,
    pub discarded: usize,
}

/// Group rows into logical transactions keyed by date, description and
/// absolute amount. Starting-balance rows are dropped; groups that do not
/// have exactly two legs are discarded.
pub fn group_transactions(rows: &[LedgerRow], starting_balance_description: &str) -> Grouped {
    let mut groups: BTreeMap<(String, String, i64), Vec<LedgerRow>> = BTreeMap::new();
    for row in rows {
        if row.description == starting_balance_description {
            continue;
        }
        groups
            .entry((row.date.clone(), row.description.clone(), cents(row.amount)))
            .or_default()
            .push(row.clone());
    }

    let mut transactions = Vec::new();
    let mut discarded = 0usize;
    for ((date, description, _), legs) in groups {
        if legs.len() == 2 {
            transactions.push(legs);
        } else {
            log::warn!(
                "discarding {date} '{description}': {} legs, expected 2",
                legs.len()
            );
            discarded += 1;
        }
    }
    Grouped {
        transactions,
        discarded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg(date: &str, description: &str, category: &str, amount: f64) -> LedgerRow {
        LedgerRow {
            date: date.into(),
            description: description.into(),
            category: category.into(),
            commodity: "€".into(),
            amount,
        }
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("12.5").unwrap(), 12.5);
        assert_eq!(parse_amount("  -42.50  ").unwrap(), -42.5);
        assert_eq!(parse_amount("1,234.56").unwrap(), 1234.56);
        assert_eq!(parse_amount("(50.00)").unwrap(), -50.0);
    }

    #[test]
    fn test_parse_amount_decimal_comma() {
        assert_eq!(parse_amount("12,50").unwrap(), 12.5);
        assert_eq!(parse_amount("-0,99").unwrap(), -0.99);
        assert_eq!(parse_amount("1.234,56").unwrap(), 1234.56);
        assert_eq!(parse_amount("(1.000,00)").unwrap(), -1000.0);
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert!(matches!(parse_amount("abc"), Err(MigrateError::InvalidAmount(_))));
    }

    #[test]
    fn test_read_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2022.csv");
        let content = "\
\"2022/01/03\",\"\",\"Spesa\",\"Spese:Cibo\",\"€\",\"12.5\",\"*\",\"\"
\"2022/01/03\",\"\",\"Spesa\",\"Assets:Intesa XME\",\"€\",\"-12.5\",\"*\",\"\"
\"2022/01/04\",\"\",\"short row\"
";
        std::fs::write(&path, content).unwrap();
        let rows = read_ledger(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].category, "Spese:Cibo");
        assert_eq!(rows[1].amount, -12.5);
        assert_eq!(rows[1].date, "2022/01/03");
    }

    #[test]
    fn test_distinct_categories_keeps_first_seen_order() {
        let rows = vec![
            leg("2022/01/01", "a", "B", 1.0),
            leg("2022/01/01", "a", "A", -1.0),
            leg("2022/01/02", "b", "B", 2.0),
        ];
        assert_eq!(distinct_categories(&rows), vec!["B", "A"]);
    }

    #[test]
    fn test_group_pairs_opposite_legs() {
        let rows = vec![
            leg("2022/01/03", "Spesa", "Spese:Cibo", 12.5),
            leg("2022/01/03", "Spesa", "Assets:Intesa", -12.5),
            leg("2022/01/02", "Stipendio", "Guadagni:Lavoro", -1000.0),
            leg("2022/01/02", "Stipendio", "Assets:Intesa", 1000.0),
        ];
        let grouped = group_transactions(&rows, "Starting balances");
        assert_eq!(grouped.transactions.len(), 2);
        assert_eq!(grouped.discarded, 0);
        assert_eq!(grouped.transactions[0][0].description, "Stipendio");
    }

    #[test]
    fn test_group_discards_odd_leg_counts() {
        let rows = vec![
            leg("2022/01/03", "Split", "Spese:Cibo", 10.0),
            leg("2022/01/03", "Split", "Spese:Casa", 10.0),
            leg("2022/01/03", "Split", "Assets:Intesa", -10.0),
            leg("2022/01/05", "Lonely", "Spese:Casa", 3.0),
        ];
        let grouped = group_transactions(&rows, "Starting balances");
        assert!(grouped.transactions.is_empty());
        assert_eq!(grouped.discarded, 2);
    }

    #[test]
    fn test_group_drops_starting_balances() {
        let rows = vec![
            leg("2022/01/01", "Starting balances", "Assets:Intesa", 100.0),
            leg("2022/01/01", "Starting balances", "StartingBalance", -100.0),
        ];
        let grouped = group_transactions(&rows, "Starting balances");
        assert!(grouped.transactions.is_empty());
        assert_eq!(grouped.discarded, 0);
    }
}
