use std::path::PathBuf;

use colored::Colorize;

use crate::db::get_connection;
use crate::error::Result;
use crate::migrator::{discover_inputs, migrate_file, Lookups, MigrateOptions};
use crate::settings::{shellexpand_path, Settings};

pub fn run(settings: &Settings, inputs: &[String], db: Option<&str>) -> Result<()> {
    let roots: Vec<PathBuf> = if inputs.is_empty() {
        vec![settings.data_path()]
    } else {
        inputs.iter().map(|i| PathBuf::from(shellexpand_path(i))).collect()
    };
    let mut files = Vec::new();
    for root in roots {
        if root.is_dir() {
            files.extend(discover_inputs(&root)?);
        } else {
            files.push(root);
        }
    }
    if files.is_empty() {
        println!("No converted CSVs to migrate.");
        return Ok(());
    }

    let conn = get_connection(&settings.mmex_db_path(db)?)?;
    let mut lookups = Lookups::load(&conn)?;
    let opts = MigrateOptions {
        unknown_account_id: settings.unknown_account_id,
        unknown_payee_id: settings.unknown_payee_id,
    };

    for file in &files {
        let result = migrate_file(&conn, file, &mut lookups, &opts)?;
        println!("{}: {} rows inserted", file.display(), result.inserted);
        if result.account_fallbacks > 0 {
            println!(
                "{}",
                format!(
                    "  {} unknown destination accounts set to {}",
                    result.account_fallbacks, opts.unknown_account_id
                )
                .yellow()
            );
        }
        if result.payee_fallbacks > 0 {
            println!(
                "{}",
                format!(
                    "  {} unknown payees set to {}",
                    result.payee_fallbacks, opts.unknown_payee_id
                )
                .yellow()
            );
        }
    }
    Ok(())
}
