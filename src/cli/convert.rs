use std::path::{Path, PathBuf};

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::converter::{convert_rows, write_converted, AccountRenamer, ConvertOptions};
use crate::error::{MigrateError, Result};
use crate::fmt::amount;
use crate::ledger::read_ledger;
use crate::mapper::read_mapping;
use crate::settings::{shellexpand_path, Settings};

fn ledger_exports(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().map_or(false, |e| e.eq_ignore_ascii_case("csv")))
        .collect();
    files.sort();
    Ok(files)
}

pub fn run(
    settings: &Settings,
    files: &[String],
    mapping: Option<String>,
    output_dir: Option<String>,
) -> Result<()> {
    let inputs: Vec<PathBuf> = if files.is_empty() {
        if settings.ledger_dir.is_empty() {
            return Err(MigrateError::Settings(
                "no ledger files given and no ledger_dir configured".into(),
            ));
        }
        ledger_exports(Path::new(&settings.ledger_dir))?
    } else {
        files.iter().map(|f| PathBuf::from(shellexpand_path(f))).collect()
    };
    let mapping_path = mapping
        .map(|m| PathBuf::from(shellexpand_path(&m)))
        .unwrap_or_else(|| settings.mapping_path());
    let output_dir = output_dir
        .map(|d| PathBuf::from(shellexpand_path(&d)))
        .unwrap_or_else(|| settings.data_path());

    let mapping = read_mapping(&mapping_path)?;
    let renamer = AccountRenamer::new(&settings.account_renames)?;
    let opts = ConvertOptions::from(settings);

    let mut table = Table::new();
    table.set_header(vec!["Input", "Output", "Transactions", "Discarded", "Total"]);
    let mut discarded_total = 0usize;
    for input in &inputs {
        let rows = read_ledger(input)?;
        let result = convert_rows(&rows, &mapping, &renamer, &opts)?;
        let file_name = input
            .file_name()
            .ok_or_else(|| MigrateError::Other(format!("not a file: {}", input.display())))?;
        let output = output_dir.join(file_name);
        write_converted(&output, &result.rows)?;
        log::info!("converted {} -> {}", input.display(), output.display());

        let total: f64 = result.rows.iter().map(|r| r.amount).sum();
        discarded_total += result.discarded;
        table.add_row(vec![
            Cell::new(input.display()),
            Cell::new(output.display()),
            Cell::new(result.rows.len()),
            Cell::new(result.discarded),
            Cell::new(amount(total, &settings.currency)),
        ]);
    }
    println!("{table}");
    if discarded_total > 0 {
        println!(
            "{}",
            format!("{discarded_total} ledger groups did not have exactly two legs and were skipped")
                .yellow()
        );
    }
    Ok(())
}
