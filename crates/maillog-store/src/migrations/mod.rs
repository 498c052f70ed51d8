//! Bootstrap schema for the local store.
//!
//! These are the store's own tables, created on every [`Database::open_at`]
//! and guarded by `PRAGMA user_version` so each runs exactly once.  They are
//! unrelated to the operator-triggered mail log ladder in `maillog-core`,
//! whose version lives in the `options` table instead.
//!
//! [`Database::open_at`]: crate::Database::open_at

pub mod v001_initial;

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current bootstrap schema version.  Bump this and add a new module whenever
/// the store's own tables change.
pub const CURRENT_VERSION: u32 = 1;

/// Create any missing bootstrap tables on the open connection.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    tracing::debug!(
        current_version = current,
        target_version = CURRENT_VERSION,
        "checking bootstrap schema"
    );

    if current < 1 {
        tracing::info!("applying bootstrap v001_initial");
        v001_initial::up(conn).map_err(|e| StoreError::Migration(e.to_string()))?;
        conn.pragma_update(None, "user_version", 1)?;
    }

    Ok(())
}
