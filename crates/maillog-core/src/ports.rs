//! Collaborator interfaces the runner depends on.
//!
//! The runner never talks to a database directly.  It reads and writes the
//! schema version through a [`VersionStore`] and performs schema changes
//! through a [`SchemaExecutor`]; `maillog-store` provides the SQLite-backed
//! implementations, tests provide in-memory fakes.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// A persisted integer setting keyed by name.
pub trait VersionStore {
    type Error: std::error::Error;

    /// Read the value stored under `key`, or 0 when nothing is stored.
    fn get_int(&self, key: &str) -> Result<u32, Self::Error>;

    /// Unconditionally store `value` under `key`.
    fn set_int(&self, key: &str, value: u32) -> Result<(), Self::Error>;

    /// Store `new` under `key` only if the current value equals `expected`
    /// (an absent value counts as 0).  Returns whether the write happened.
    fn compare_and_set(&self, key: &str, expected: u32, new: u32) -> Result<bool, Self::Error>;
}

impl<T: VersionStore + ?Sized> VersionStore for &T {
    type Error = T::Error;

    fn get_int(&self, key: &str) -> Result<u32, Self::Error> {
        (**self).get_int(key)
    }

    fn set_int(&self, key: &str, value: u32) -> Result<(), Self::Error> {
        (**self).set_int(key, value)
    }

    fn compare_and_set(&self, key: &str, expected: u32, new: u32) -> Result<bool, Self::Error> {
        (**self).compare_and_set(key, expected, new)
    }
}

/// Target character set and collation for a column change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodingSpec {
    pub charset: String,
    pub collation: String,
}

/// A column whose encoding is being changed, with the type it is re-declared as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub data_type: &'static str,
}

impl ColumnSpec {
    pub const fn new(name: &'static str, data_type: &'static str) -> Self {
        Self { name, data_type }
    }
}

/// Failure reported by a [`SchemaExecutor`].  The message is the storage
/// engine's own error text and is surfaced to operators unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ExecutorError {
    pub message: String,
}

impl ExecutorError {
    pub fn new(message: impl fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Runs schema-altering statements against the mail log storage.
pub trait SchemaExecutor {
    /// The storage's default collation, e.g. `utf8mb4_unicode_520_ci`.
    fn default_collation(&self) -> String;

    /// Re-declare `columns` of `table` with the given encoding.
    ///
    /// Implementations must apply the change atomically: either every column
    /// is converted or none is.
    fn alter_columns(
        &self,
        table: &str,
        encoding: &EncodingSpec,
        columns: &[ColumnSpec],
    ) -> Result<(), ExecutorError>;
}

impl<T: SchemaExecutor + ?Sized> SchemaExecutor for &T {
    fn default_collation(&self) -> String {
        (**self).default_collation()
    }

    fn alter_columns(
        &self,
        table: &str,
        encoding: &EncodingSpec,
        columns: &[ColumnSpec],
    ) -> Result<(), ExecutorError> {
        (**self).alter_columns(table, encoding, columns)
    }
}
