use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bootstrap schema failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// A schema change referenced a table or column that does not exist.
    #[error("{0}")]
    Schema(String),
}

impl StoreError {
    /// The engine's own wording, without our prefix, for operator-facing
    /// error banners.
    pub fn native_message(&self) -> String {
        match self {
            StoreError::Sqlite(e) => e.to_string(),
            StoreError::Schema(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
