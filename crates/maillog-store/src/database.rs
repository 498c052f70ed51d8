//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees that
//! the bootstrap schema exists before any other operation.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use rusqlite::Connection;

use crate::error::{Result, StoreError};
use crate::migrations;

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the default application database.
    ///
    /// The database file is placed in the platform-appropriate data directory:
    /// - Linux:   `~/.local/share/maillog/maillog.db`
    /// - macOS:   `~/Library/Application Support/com.maillog.maillog/maillog.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\maillog\maillog\data\maillog.db`
    pub fn new() -> Result<Self> {
        let db_path = Self::default_path()?;

        if let Some(dir) = db_path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        tracing::info!(path = %db_path.display(), "opening database");

        Self::open_at(&db_path)
    }

    /// Path used by [`Database::new`].
    pub fn default_path() -> Result<PathBuf> {
        let project_dirs =
            ProjectDirs::from("com", "maillog", "maillog").ok_or(StoreError::NoDataDir)?;
        Ok(project_dirs.data_dir().join("maillog.db"))
    }

    /// Open (or create) a database at an explicit path.
    ///
    /// This is useful for tests and for pointing the admin tool at an
    /// existing installation.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Recommended SQLite settings.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        Self::init(conn)
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        migrations::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Return a reference to the underlying `rusqlite::Connection`.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }
}
