use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Output file is not a {expected} file: {path}")]
    FileExtension { path: String, expected: &'static str },

    #[error("No categories extracted from {0}")]
    EmptyCategories(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Ledger category has no mapping: {0}")]
    UnmappedCategory(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Unknown embedding model: {0}")]
    UnknownModel(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, MigrateError>;
