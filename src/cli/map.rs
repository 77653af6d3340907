use std::path::PathBuf;

use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::extractor::{read_categories, write_json};
use crate::mapper::{embedder_for, map_categories};
use crate::settings::{shellexpand_path, Settings};

pub fn run(
    settings: &Settings,
    ledger: Option<String>,
    mmex: Option<String>,
    output: Option<String>,
    model: Option<String>,
) -> Result<()> {
    let expand = |p: String| PathBuf::from(shellexpand_path(&p));
    let ledger_path = ledger.map(expand).unwrap_or_else(|| settings.ledger_categories_path());
    let mmex_path = mmex.map(expand).unwrap_or_else(|| settings.mmex_categories_path());
    let output_path = output.map(expand).unwrap_or_else(|| settings.mapping_path());
    let model = model.unwrap_or_else(|| settings.model.clone());

    let ledger_categories = read_categories(&ledger_path)?;
    let mmex_categories = read_categories(&mmex_path)?;

    let mut embedder = embedder_for(&model)?;
    let mapped = map_categories(&ledger_categories, &mmex_categories, embedder.as_mut())?;
    write_json(&output_path, &mapped)?;

    let mut table = Table::new();
    table.set_header(vec!["Ledger", "MMEX"]);
    for (ledger, mmex) in &mapped {
        table.add_row(vec![Cell::new(ledger), Cell::new(mmex)]);
    }
    println!("Category mapping\n{table}");

    let unmapped = ledger_categories
        .iter()
        .filter(|c| !mapped.contains_key(*c))
        .count();
    println!(
        "{} of {} ledger categories mapped; wrote {}",
        mapped.len(),
        ledger_categories.len(),
        output_path.display()
    );
    if unmapped > 0 {
        println!("{unmapped} ledger categories have no MMEX match");
    }
    Ok(())
}
