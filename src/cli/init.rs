use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::settings::{save_settings, shellexpand_path, Settings};

pub fn run(
    mut settings: Settings,
    config: Option<&Path>,
    data_dir: Option<String>,
    ledger_dir: Option<String>,
    mmex_db: Option<String>,
) -> Result<()> {
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    if let Some(dir) = ledger_dir {
        settings.ledger_dir = shellexpand_path(&dir);
    }
    if let Some(db) = mmex_db {
        settings.mmex_db = shellexpand_path(&db);
    }

    let path = save_settings(&settings, config)?;
    std::fs::create_dir_all(PathBuf::from(&settings.data_dir))?;

    println!("Wrote settings to {}", path.display());
    println!("Data dir:   {}", settings.data_dir);
    if !settings.mmex_db.is_empty() {
        println!("MMEX db:    {}", settings.mmex_db);
    }
    Ok(())
}
