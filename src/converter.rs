use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;

use crate::categories::{last_segment, root_segment, split_leaf};
use crate::error::{MigrateError, Result};
use crate::ledger::group_transactions;
use crate::models::{ConvertedRow, LedgerRow, TransactionKind};
use crate::settings::Settings;

/// Classification tokens and output constants for one conversion run.
pub struct ConvertOptions {
    pub income_root: String,
    pub expense_root: String,
    pub asset_root: String,
    pub starting_balance_description: String,
    pub transfer_category: String,
    pub currency: String,
    pub status: String,
}

impl From<&Settings> for ConvertOptions {
    fn from(s: &Settings) -> Self {
        Self {
            income_root: s.income_root.clone(),
            expense_root: s.expense_root.clone(),
            asset_root: s.asset_root.clone(),
            starting_balance_description: s.starting_balance_description.clone(),
            transfer_category: s.transfer_category.clone(),
            currency: s.currency.clone(),
            status: s.status.clone(),
        }
    }
}

/// Case-insensitive substring renames for account names.
pub struct AccountRenamer {
    rules: Vec<(Regex, String)>,
}

impl AccountRenamer {
    pub fn new(renames: &BTreeMap<String, String>) -> Result<Self> {
        let mut rules = Vec::new();
        for (from, to) in renames {
            let re = Regex::new(&format!("(?i){}", regex::escape(from)))
                .map_err(|e| MigrateError::Settings(format!("bad rename '{from}': {e}")))?;
            rules.push((re, to.clone()));
        }
        Ok(Self { rules })
    }

    /// Applies the first rule that matches.
    pub fn apply(&self, name: &str) -> String {
        for (re, to) in &self.rules {
            if re.is_match(name) {
                return re.replace_all(name, regex::NoExpand(to.as_str())).into_owned();
            }
        }
        name.to_string()
    }
}

pub fn detect_kind(legs: &[LedgerRow], income_root: &str, expense_root: &str) -> TransactionKind {
    let roots: Vec<String> = legs
        .iter()
        .map(|l| root_segment(&l.category).to_lowercase())
        .collect();
    if roots.iter().any(|r| *r == income_root.to_lowercase()) {
        TransactionKind::Deposit
    } else if roots.iter().any(|r| *r == expense_root.to_lowercase()) {
        TransactionKind::Withdrawal
    } else {
        TransactionKind::Transfer
    }
}

fn is_asset_leg(leg: &LedgerRow, asset_root: &str) -> bool {
    leg.category.contains(asset_root)
}

fn resolve_category(
    legs: &[LedgerRow],
    kind: TransactionKind,
    mapping: &BTreeMap<String, String>,
    opts: &ConvertOptions,
) -> Result<(String, String)> {
    if kind == TransactionKind::Transfer {
        return Ok((opts.transfer_category.clone(), opts.transfer_category.clone()));
    }
    match legs.iter().find(|l| !is_asset_leg(l, &opts.asset_root)) {
        Some(leg) => {
            let mapped = mapping
                .get(&leg.category)
                .ok_or_else(|| MigrateError::UnmappedCategory(leg.category.clone()))?;
            Ok(split_leaf(mapped))
        }
        None => Ok((String::new(), String::new())),
    }
}

fn resolve_accounts(legs: &[LedgerRow], kind: TransactionKind, asset_root: &str) -> (String, String) {
    if kind == TransactionKind::Transfer {
        let from = legs.iter().find(|l| l.amount < 0.0);
        let to = legs.iter().find(|l| l.amount > 0.0);
        return (
            from.map(|l| last_segment(&l.category).to_string()).unwrap_or_default(),
            to.map(|l| last_segment(&l.category).to_string()).unwrap_or_default(),
        );
    }
    let from = legs
        .iter()
        .find(|l| is_asset_leg(l, asset_root))
        .map(|l| last_segment(&l.category).to_string())
        .unwrap_or_default();
    (from, String::new())
}

/// Convert one two-leg ledger transaction into an intermediate row.
pub fn convert_transaction(
    legs: &[LedgerRow],
    mapping: &BTreeMap<String, String>,
    renamer: &AccountRenamer,
    opts: &ConvertOptions,
) -> Result<ConvertedRow> {
    let first = &legs[0];
    if legs.iter().any(|l| l.commodity != first.commodity) {
        log::warn!(
            "{} '{}' mixes commodities; writing {}",
            first.date,
            first.description,
            opts.currency
        );
    }
    let kind = detect_kind(legs, &opts.income_root, &opts.expense_root);
    let (category, subcategory) = resolve_category(legs, kind, mapping, opts)?;
    let (account, to_account) = resolve_accounts(legs, kind, &opts.asset_root);

    Ok(ConvertedRow {
        date: first.date.replace('/', "-"),
        status: opts.status.clone(),
        kind: kind.code().to_string(),
        account: renamer.apply(&account),
        to_account: renamer.apply(&to_account),
        payee: String::new(),
        amount: first.amount.abs(),
        currency: opts.currency.clone(),
        category,
        subcategory,
        note: renamer.apply(&first.description),
    })
}

pub struct ConvertResult {
    pub rows: Vec<ConvertedRow>,
    pub discarded: usize,
}

pub fn convert_rows(
    rows: &[LedgerRow],
    mapping: &BTreeMap<String, String>,
    renamer: &AccountRenamer,
    opts: &ConvertOptions,
) -> Result<ConvertResult> {
    let grouped = group_transactions(rows, &opts.starting_balance_description);
    let rows = grouped
        .transactions
        .iter()
        .map(|legs| convert_transaction(legs, mapping, renamer, opts))
        .collect::<Result<Vec<_>>>()?;
    Ok(ConvertResult {
        rows,
        discarded: grouped.discarded,
    })
}

pub fn write_converted(path: &Path, rows: &[ConvertedRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    wtr.write_record(ConvertedRow::HEADERS)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
