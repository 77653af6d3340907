pub mod convert;
pub mod extract;
pub mod init;
pub mod map;
pub mod migrate;
pub mod renumber;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ledger-to-mmex",
    about = "Migrate ledger-cli CSV exports into a Money Manager EX database."
)]
pub struct Cli {
    /// Settings file (default: ~/.config/ledger-to-mmex/settings.json)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write the settings file and create the data directory.
    Init {
        /// Directory for extracted categories, mappings and converted CSVs
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Directory holding the yearly `ledger csv` exports
        #[arg(long = "ledger-dir")]
        ledger_dir: Option<String>,
        /// Path to the MMEX database (.mmb)
        #[arg(long = "mmex-db")]
        mmex_db: Option<String>,
    },
    /// Extract category paths to JSON.
    Extract {
        #[command(subcommand)]
        command: ExtractCommands,
    },
    /// Match MMEX categories onto ledger categories by embedding similarity.
    Map {
        /// Ledger categories JSON (default: <data_dir>/ledger_categories.json)
        #[arg(long)]
        ledger: Option<String>,
        /// MMEX categories JSON (default: <data_dir>/mmex_categories.json)
        #[arg(long)]
        mmex: Option<String>,
        /// Output mapping JSON (default: <data_dir>/mapped_categories.json)
        #[arg(long)]
        output: Option<String>,
        /// Embedding model name, or `hash` for token hashing
        #[arg(long)]
        model: Option<String>,
    },
    /// Convert ledger exports into MMEX-shaped CSVs.
    Convert {
        /// Ledger CSV exports (default: every .csv in the ledger dir)
        files: Vec<String>,
        /// Category mapping JSON (default: <data_dir>/mapped_categories.json)
        #[arg(long)]
        mapping: Option<String>,
        /// Output directory (default: <data_dir>)
        #[arg(long = "output-dir")]
        output_dir: Option<String>,
    },
    /// Append converted CSVs to CHECKINGACCOUNT_V1.
    Migrate {
        /// Converted CSV files or directories (default: <data_dir>)
        inputs: Vec<String>,
        /// MMEX database (default: from settings)
        #[arg(long)]
        db: Option<String>,
    },
    /// Renumber MMEX transaction ids in date order.
    Renumber {
        /// MMEX database (default: from settings)
        #[arg(long)]
        db: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ExtractCommands {
    /// Category paths from ledger CSV exports.
    Ledger {
        /// Ledger CSV exports
        #[arg(required = true)]
        files: Vec<String>,
        /// Output JSON (default: <data_dir>/ledger_categories.json)
        #[arg(long)]
        output: Option<String>,
    },
    /// Category paths from the MMEX CATEGORY_V1 table.
    Mmex {
        /// MMEX database (default: from settings)
        #[arg(long)]
        db: Option<String>,
        /// Output JSON (default: <data_dir>/mmex_categories.json)
        #[arg(long)]
        output: Option<String>,
    },
}
