//! Error types for the qanx command-line tool

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    /// Ledger or crypto error from the core library
    #[error("{0}")]
    Core(#[from] qanx_core::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Allocation file could not be read or written
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// State file missing
    #[error("No ledger state at {0} - run 'qanx init' first")]
    StateNotInitialized(String),

    /// State file present and no overwrite requested
    #[error("Ledger state already exists at {0}")]
    StateExists(String),

    /// Date is neither YYYY-MM-DD nor UNIX seconds
    #[error("Invalid date or timestamp: {0}")]
    InvalidTime(String),

    /// Malformed row in an allocation CSV
    #[error("Invalid allocation on line {line}: {reason}")]
    InvalidRow { line: u64, reason: String },

    /// No key file, environment key or prompt input
    #[error("No signing key provided")]
    MissingKey,
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Serialization(e.to_string())
    }
}
