//! Shared error type for the alumtrack crates

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout alumtrack-common
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while bootstrapping or configuring an alumtrack service
#[derive(Error, Debug)]
pub enum Error {
    /// SQLite pool or schema statement failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem access failed (root folder, config file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML config file exists but could not be parsed
    #[error("Malformed config file {path}: {source}")]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Configuration value is missing or out of range
    #[error("Configuration error: {0}")]
    Config(String),

    /// A stored value could not be mapped back into a domain type
    #[error("Corrupt stored value in {column}: {detail}")]
    CorruptValue { column: &'static str, detail: String },
}
