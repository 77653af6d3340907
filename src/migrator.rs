use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::categories::CategoryTree;
use crate::db::{insert_checking_row, load_accounts, load_categories, load_payees, load_transaction_ids};
use crate::error::{MigrateError, Result};
use crate::models::{CheckingRow, ConvertedRow};

pub const AUDIT_PREFIX: &str = "mmex_";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// First id not sitting at its own sorted position, or `ids.len()` when the
/// sequence has no gap. The id is inserted so later calls skip it.
pub fn allocate_transaction_id(ids: &mut Vec<i64>) -> i64 {
    let id = ids
        .iter()
        .enumerate()
        .find(|(idx, id)| *idx as i64 != **id)
        .map(|(idx, _)| idx as i64)
        .unwrap_or(ids.len() as i64);
    let pos = ids.partition_point(|x| *x <= id);
    ids.insert(pos, id);
    id
}

/// Snapshot of MMEX reference tables taken once per run.
pub struct Lookups {
    pub categories: CategoryTree,
    pub accounts: HashMap<String, i64>,
    pub payees: HashMap<String, i64>,
    pub transaction_ids: Vec<i64>,
}

impl Lookups {
    pub fn load(conn: &Connection) -> Result<Self> {
        let lookups = Self {
            categories: CategoryTree::new(load_categories(conn)?),
            accounts: load_accounts(conn)?,
            payees: load_payees(conn)?,
            transaction_ids: load_transaction_ids(conn)?,
        };
        log::info!(
            "loaded {} categories, {} accounts, {} payees, {} transactions",
            lookups.categories.len(),
            lookups.accounts.len(),
            lookups.payees.len(),
            lookups.transaction_ids.len()
        );
        Ok(lookups)
    }
}

pub struct MigrateOptions {
    pub unknown_account_id: i64,
    pub unknown_payee_id: i64,
}

#[derive(Debug, Default)]
pub struct MigrateResult {
    pub inserted: usize,
    pub account_fallbacks: usize,
    pub payee_fallbacks: usize,
}

fn lookup_or(
    index: &HashMap<String, i64>,
    name: &str,
    fallback: i64,
    what: &str,
    misses: &mut usize,
) -> i64 {
    if let Some(id) = index.get(name) {
        return *id;
    }
    if !name.is_empty() {
        log::warn!("unknown {what} '{name}', using {fallback}");
        *misses += 1;
    }
    fallback
}

pub fn build_row(
    row: &ConvertedRow,
    lookups: &mut Lookups,
    opts: &MigrateOptions,
    updated_at: &str,
    result: &mut MigrateResult,
) -> Result<CheckingRow> {
    let path = row.category_path();
    let categid = lookups
        .categories
        .resolve(&path)
        .ok_or(MigrateError::UnknownCategory(path))?;
    let accountid = *lookups
        .accounts
        .get(&row.account)
        .ok_or_else(|| MigrateError::UnknownAccount(row.account.clone()))?;
    let toaccountid = lookup_or(
        &lookups.accounts,
        &row.to_account,
        opts.unknown_account_id,
        "account",
        &mut result.account_fallbacks,
    );
    let payeeid = lookup_or(
        &lookups.payees,
        &row.payee,
        opts.unknown_payee_id,
        "payee",
        &mut result.payee_fallbacks,
    );
    let transid = allocate_transaction_id(&mut lookups.transaction_ids);

    Ok(CheckingRow {
        transid,
        accountid,
        toaccountid,
        payeeid,
        transcode: row.kind.clone(),
        transamount: row.amount,
        status: row.status.clone(),
        transactionnumber: String::new(),
        notes: row.note.clone(),
        categid,
        transdate: row.date.clone(),
        lastupdatedtime: updated_at.to_string(),
        deletedtime: String::new(),
        followupid: -1,
        totransamount: row.amount,
        color: -1,
    })
}

pub fn read_converted(path: &Path) -> Result<Vec<ConvertedRow>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let rows = rdr
        .deserialize()
        .collect::<std::result::Result<Vec<ConvertedRow>, _>>()?;
    Ok(rows)
}

pub fn audit_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    input.with_file_name(format!("{AUDIT_PREFIX}{name}"))
}

fn write_audit(path: &Path, rows: &[CheckingRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Resolve every row of one converted CSV, write the audit copy next to it,
/// then append the rows to `CHECKINGACCOUNT_V1`.
pub fn migrate_file(
    conn: &Connection,
    path: &Path,
    lookups: &mut Lookups,
    opts: &MigrateOptions,
) -> Result<MigrateResult> {
    let converted = read_converted(path)?;
    let updated_at = chrono::Local::now().format(DATETIME_FORMAT).to_string();
    let mut result = MigrateResult::default();

    let rows = converted
        .iter()
        .map(|r| build_row(r, lookups, opts, &updated_at, &mut result))
        .collect::<Result<Vec<_>>>()?;

    let audit = audit_path(path);
    write_audit(&audit, &rows)?;
    log::info!("wrote {} rows to {}", rows.len(), audit.display());

    for row in &rows {
        insert_checking_row(conn, row)?;
        result.inserted += 1;
    }
    Ok(result)
}

/// Converted CSVs in a directory: names containing a digit, audit copies
/// excluded, sorted.
pub fn discover_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let is_csv = path
            .extension()
            .map_or(false, |e| e.eq_ignore_ascii_case("csv"));
        if is_csv && !name.starts_with(AUDIT_PREFIX) && name.chars().any(|c| c.is_ascii_digit()) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
