use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error hashing {path}: {source}")]
    Hash {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error walking storage directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Import error in {file}, line {line}: {message}")]
    Import {
        file: String,
        line: u64,
        message: String,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn import(file: impl Into<String>, line: u64, message: impl Into<String>) -> Self {
        Error::Import {
            file: file.into(),
            line,
            message: message.into(),
        }
    }
}
