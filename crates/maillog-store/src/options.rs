use maillog_core::VersionStore;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

use crate::database::Database;
use crate::error::{Result, StoreError};

impl Database {
    pub fn get_option(&self, name: &str) -> Result<Option<String>> {
        Ok(read_option(self.conn(), name)?)
    }

    /// Insert or overwrite a setting.
    pub fn update_option(&self, name: &str, value: &str, autoload: bool) -> Result<()> {
        write_option(self.conn(), name, value, autoload)?;
        Ok(())
    }
}

fn read_option(conn: &Connection, name: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT option_value FROM options WHERE option_name = ?1",
        params![name],
        |row| row.get(0),
    )
    .optional()
}

fn write_option(conn: &Connection, name: &str, value: &str, autoload: bool) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO options (option_name, option_value, autoload) VALUES (?1, ?2, ?3)
         ON CONFLICT(option_name) DO UPDATE SET
             option_value = excluded.option_value,
             autoload = excluded.autoload",
        params![name, value, autoload],
    )?;
    Ok(())
}

// Stored settings are free-form text; anything that is not a plain
// non-negative integer reads as 0, like an unset value.
fn parse_int(name: &str, raw: Option<String>) -> u32 {
    let Some(raw) = raw else {
        return 0;
    };

    raw.trim().parse::<u32>().unwrap_or_else(|_| {
        tracing::warn!(option = name, value = %raw, "non-integer option value, treating as 0");
        0
    })
}

/// [`VersionStore`] over the `options` table.
///
/// Version options are written with autoload disabled: they are only read
/// on the mail log admin screen.
pub struct OptionStore<'a> {
    db: &'a Database,
}

impl<'a> OptionStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }
}

impl VersionStore for OptionStore<'_> {
    type Error = StoreError;

    fn get_int(&self, key: &str) -> Result<u32> {
        Ok(parse_int(key, self.db.get_option(key)?))
    }

    fn set_int(&self, key: &str, value: u32) -> Result<()> {
        self.db.update_option(key, &value.to_string(), false)
    }

    fn compare_and_set(&self, key: &str, expected: u32, new: u32) -> Result<bool> {
        // IMMEDIATE takes the write lock up front, so no other connection can
        // commit between our read and our write.
        let tx = Transaction::new_unchecked(self.db.conn(), TransactionBehavior::Immediate)?;

        let current = parse_int(key, read_option(&tx, key)?);
        if current != expected {
            tracing::debug!(option = key, expected, current, "compare-and-set lost");
            return Ok(false);
        }

        write_option(&tx, key, &new.to_string(), false)?;
        tx.commit()?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "wp_mail_logging_db_version";

    #[test]
    fn test_absent_option_reads_as_zero() {
        let db = Database::open_in_memory().unwrap();
        let store = OptionStore::new(&db);
        assert_eq!(store.get_int(KEY).unwrap(), 0);
    }

    #[test]
    fn test_set_then_get() {
        let db = Database::open_in_memory().unwrap();
        let store = OptionStore::new(&db);

        store.set_int(KEY, 3).unwrap();
        assert_eq!(store.get_int(KEY).unwrap(), 3);
        assert_eq!(db.get_option(KEY).unwrap().as_deref(), Some("3"));

        let autoload: bool = db
            .conn()
            .query_row(
                "SELECT autoload FROM options WHERE option_name = ?1",
                params![KEY],
                |row| row.get(0),
            )
            .unwrap();
        assert!(!autoload);
    }

    #[test]
    fn test_garbage_reads_as_zero() {
        let db = Database::open_in_memory().unwrap();
        db.update_option(KEY, "not-a-number", true).unwrap();

        assert_eq!(OptionStore::new(&db).get_int(KEY).unwrap(), 0);
    }

    #[test]
    fn test_compare_and_set_from_absent() {
        let db = Database::open_in_memory().unwrap();
        let store = OptionStore::new(&db);

        assert!(store.compare_and_set(KEY, 0, 1).unwrap());
        assert_eq!(store.get_int(KEY).unwrap(), 1);
    }

    #[test]
    fn test_compare_and_set_rejects_stale_expectation() {
        let db = Database::open_in_memory().unwrap();
        let store = OptionStore::new(&db);
        store.set_int(KEY, 1).unwrap();

        assert!(!store.compare_and_set(KEY, 0, 1).unwrap());
        assert_eq!(store.get_int(KEY).unwrap(), 1);
    }

    #[test]
    fn test_compare_and_set_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.db");
        let first = Database::open_at(&path).unwrap();
        let second = Database::open_at(&path).unwrap();

        assert!(OptionStore::new(&first).compare_and_set(KEY, 0, 1).unwrap());
        assert!(!OptionStore::new(&second).compare_and_set(KEY, 0, 1).unwrap());
        assert_eq!(OptionStore::new(&second).get_int(KEY).unwrap(), 1);
    }
}
