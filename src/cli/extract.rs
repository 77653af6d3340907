use std::path::PathBuf;

use crate::error::Result;
use crate::extractor::{CategoryExtractor, LedgerCategoriesExtractor, MmexCategoriesExtractor};
use crate::settings::{shellexpand_path, Settings};

fn output_or(output: Option<String>, default: PathBuf) -> PathBuf {
    output
        .map(|o| PathBuf::from(shellexpand_path(&o)))
        .unwrap_or(default)
}

pub fn ledger(settings: &Settings, files: &[String], output: Option<String>) -> Result<()> {
    let output_path = output_or(output, settings.ledger_categories_path());
    let mut stored = 0;
    for file in files {
        let extractor = LedgerCategoriesExtractor {
            path: PathBuf::from(shellexpand_path(file)),
            output_path: output_path.clone(),
            asset_root: settings.asset_root.clone(),
            starting_balance_account: settings.starting_balance_account.clone(),
        };
        stored = extractor.execute()?;
    }
    println!("{stored} ledger categories in {}", output_path.display());
    Ok(())
}

pub fn mmex(settings: &Settings, db: Option<&str>, output: Option<String>) -> Result<()> {
    let output_path = output_or(output, settings.mmex_categories_path());
    let extractor = MmexCategoriesExtractor {
        path: settings.mmex_db_path(db)?,
        output_path: output_path.clone(),
    };
    let stored = extractor.execute()?;
    println!("{stored} MMEX categories in {}", output_path.display());
    Ok(())
}
