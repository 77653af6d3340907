mod categories;
mod cli;
mod converter;
mod db;
mod error;
mod extractor;
mod fmt;
mod ledger;
mod mapper;
mod migrator;
mod models;
mod renumber;
mod settings;

use std::path::PathBuf;

use clap::Parser;

use cli::{Cli, Commands, ExtractCommands};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.config.as_deref().map(|c| PathBuf::from(settings::shellexpand_path(c)));
    let settings = settings::load_settings(config.as_deref());

    let result = match cli.command {
        Commands::Init {
            data_dir,
            ledger_dir,
            mmex_db,
        } => cli::init::run(settings, config.as_deref(), data_dir, ledger_dir, mmex_db),
        Commands::Extract { command } => match command {
            ExtractCommands::Ledger { files, output } => cli::extract::ledger(&settings, &files, output),
            ExtractCommands::Mmex { db, output } => cli::extract::mmex(&settings, db.as_deref(), output),
        },
        Commands::Map {
            ledger,
            mmex,
            output,
            model,
        } => cli::map::run(&settings, ledger, mmex, output, model),
        Commands::Convert {
            files,
            mapping,
            output_dir,
        } => cli::convert::run(&settings, &files, mapping, output_dir),
        Commands::Migrate { inputs, db } => cli::migrate::run(&settings, &inputs, db.as_deref()),
        Commands::Renumber { db } => cli::renumber::run(&settings, db.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
