use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_data_dir_string")]
    pub data_dir: String,
    #[serde(default)]
    pub ledger_dir: String,
    #[serde(default)]
    pub mmex_db: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default = "default_income_root")]
    pub income_root: String,
    #[serde(default = "default_expense_root")]
    pub expense_root: String,
    #[serde(default = "default_asset_root")]
    pub asset_root: String,
    #[serde(default = "default_starting_balance_account")]
    pub starting_balance_account: String,
    #[serde(default = "default_starting_balance_description")]
    pub starting_balance_description: String,
    #[serde(default = "default_transfer_category")]
    pub transfer_category: String,
    #[serde(default = "default_unknown_account_id")]
    pub unknown_account_id: i64,
    #[serde(default = "default_unknown_payee_id")]
    pub unknown_payee_id: i64,
    #[serde(default = "default_account_renames")]
    pub account_renames: BTreeMap<String, String>,
}

fn default_data_dir_string() -> String {
    default_data_dir().to_string_lossy().to_string()
}

fn default_model() -> String {
    "paraphrase-multilingual-minilm-l12-v2".to_string()
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn default_status() -> String {
    "R".to_string()
}

fn default_income_root() -> String {
    "guadagni".to_string()
}

fn default_expense_root() -> String {
    "spese".to_string()
}

fn default_asset_root() -> String {
    "Assets".to_string()
}

fn default_starting_balance_account() -> String {
    "StartingBalance".to_string()
}

fn default_starting_balance_description() -> String {
    "Starting balances".to_string()
}

fn default_transfer_category() -> String {
    "Trasferimento".to_string()
}

fn default_unknown_account_id() -> i64 {
    -1
}

fn default_unknown_payee_id() -> i64 {
    2
}

fn default_account_renames() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("Intesa XME".to_string(), "Intesa".to_string()),
        ("Contanti Sant'Arcangelo".to_string(), "Casa".to_string()),
    ])
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir_string(),
            ledger_dir: String::new(),
            mmex_db: String::new(),
            model: default_model(),
            currency: default_currency(),
            status: default_status(),
            income_root: default_income_root(),
            expense_root: default_expense_root(),
            asset_root: default_asset_root(),
            starting_balance_account: default_starting_balance_account(),
            starting_balance_description: default_starting_balance_description(),
            transfer_category: default_transfer_category(),
            unknown_account_id: default_unknown_account_id(),
            unknown_payee_id: default_unknown_payee_id(),
            account_renames: default_account_renames(),
        }
    }
}

impl Settings {
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn ledger_categories_path(&self) -> PathBuf {
        self.data_path().join("ledger_categories.json")
    }

    pub fn mmex_categories_path(&self) -> PathBuf {
        self.data_path().join("mmex_categories.json")
    }

    pub fn mapping_path(&self) -> PathBuf {
        self.data_path().join("mapped_categories.json")
    }

    /// The MMEX database, from an explicit flag or the settings file.
    pub fn mmex_db_path(&self, flag: Option<&str>) -> Result<PathBuf> {
        match flag {
            Some(p) => Ok(PathBuf::from(shellexpand_path(p))),
            None if !self.mmex_db.is_empty() => Ok(PathBuf::from(&self.mmex_db)),
            None => Err(MigrateError::Settings(
                "no MMEX database configured (pass --db or run `init --mmex-db`)".into(),
            )),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("ledger-to-mmex")
}

fn settings_path(config: Option<&Path>) -> PathBuf {
    config
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config_dir().join("settings.json"))
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("ledger-to-mmex")
}

pub fn load_settings(config: Option<&Path>) -> Settings {
    let path = settings_path(config);
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("ignoring unreadable settings {}: {e}", path.display());
            Settings::default()
        })
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings, config: Option<&Path>) -> Result<PathBuf> {
    let path = settings_path(config);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| MigrateError::Settings(e.to_string()))?;
    std::fs::write(&path, format!("{json}\n"))?;
    Ok(path)
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
