use serde::Serialize;
use thiserror::Error;

/// Broad category of a migration failure, used by the admin surface to
/// decide how loudly to report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The step ladder itself is broken (missing or invalid step).
    Configuration,
    /// The schema-altering call failed.
    ExternalOperation,
    /// Another operator advanced the version underneath us.
    Concurrency,
    /// The version store could not be read or written.
    Storage,
}

/// Errors recorded by the migration runner.
///
/// Display strings are shown to operators verbatim in the error banner.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MigrationError {
    /// No step is registered for a version on the ladder.
    #[error("Unable to find migration to version {version}.")]
    MissingStep { version: u32 },

    /// A step was rejected while building the registry.
    #[error("Invalid migration step {version}: {reason}")]
    InvalidStep { version: u32, reason: String },

    /// A run was asked to go past the configured target version.
    #[error("Cannot migrate to version {requested}; the latest version is {target}.")]
    TargetBeyondLatest { requested: u32, target: u32 },

    /// The step's external operation failed; `message` is the native error.
    #[error("Unable to complete migration to version {version}. Error: {message}")]
    Step { version: u32, message: String },

    /// The stored version moved between reading it and writing the new one.
    #[error("Schema version changed during migration (expected {expected}, found {found}).")]
    VersionConflict { expected: u32, found: u32 },

    #[error("Unable to access the schema version: {message}")]
    Storage { message: String },
}

impl MigrationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MigrationError::MissingStep { .. }
            | MigrationError::InvalidStep { .. }
            | MigrationError::TargetBeyondLatest { .. } => ErrorKind::Configuration,
            MigrationError::Step { .. } => ErrorKind::ExternalOperation,
            MigrationError::VersionConflict { .. } => ErrorKind::Concurrency,
            MigrationError::Storage { .. } => ErrorKind::Storage,
        }
    }

    pub(crate) fn storage(err: impl std::fmt::Display) -> Self {
        MigrationError::Storage {
            message: err.to_string(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MigrationError>;
