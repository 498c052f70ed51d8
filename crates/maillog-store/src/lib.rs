//! # maillog-store
//!
//! SQLite storage behind the mail log migration runner.
//!
//! The crate exposes a synchronous [`Database`] handle wrapping a
//! `rusqlite::Connection`, plus the two adapters the runner needs:
//! [`OptionStore`], the key-value `options` table used as the version store,
//! and [`SqliteSchemaExecutor`], which applies column encoding changes.

pub mod database;
pub mod migrations;
pub mod models;
pub mod options;
pub mod schema;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
pub use options::OptionStore;
pub use schema::SqliteSchemaExecutor;
