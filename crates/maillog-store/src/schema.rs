//! Column encoding changes for SQLite.
//!
//! SQLite stores all text as UTF-8 and has no per-column charset, so the
//! charset/collation each mail log column was declared with is kept in the
//! `column_encodings` catalog.  [`SqliteSchemaExecutor`] rewrites that
//! catalog in a single transaction after checking every column exists; the
//! equivalent MySQL statement is logged alongside.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use maillog_core::ddl::alter_columns_statement;
use maillog_core::{ColumnSpec, EncodingSpec, ExecutorError, SchemaExecutor};
use rusqlite::{params, Connection};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::ColumnEncoding;

impl Database {
    /// Recorded encodings for every catalogued column of `table`.
    pub fn column_encodings(&self, table: &str) -> Result<Vec<ColumnEncoding>> {
        let mut stmt = self.conn().prepare(
            "SELECT table_name, column_name, data_type, charset, collation, updated_at
             FROM column_encodings WHERE table_name = ?1 ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map(params![table], row_to_encoding)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}

fn row_to_encoding(row: &rusqlite::Row<'_>) -> rusqlite::Result<ColumnEncoding> {
    let updated_str: String = row.get(5)?;
    let updated_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&updated_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(ColumnEncoding {
        table_name: row.get(0)?,
        column_name: row.get(1)?,
        data_type: row.get(2)?,
        charset: row.get(3)?,
        collation: row.get(4)?,
        updated_at,
    })
}

fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let rows = stmt.query_map(params![table], |row| row.get::<_, String>(0))?;
    rows.collect()
}

/// [`SchemaExecutor`] over the local SQLite store.
pub struct SqliteSchemaExecutor<'a> {
    db: &'a Database,
    default_collation: String,
}

impl<'a> SqliteSchemaExecutor<'a> {
    /// `default_collation` plays the role of the server's connection
    /// collation; it decides whether the utf8mb4 step has anything to do.
    pub fn new(db: &'a Database, default_collation: impl Into<String>) -> Self {
        Self {
            db,
            default_collation: default_collation.into(),
        }
    }

    fn apply(&self, table: &str, encoding: &EncodingSpec, columns: &[ColumnSpec]) -> Result<()> {
        tracing::debug!(
            sql = %alter_columns_statement(table, encoding, columns),
            "altering column encodings"
        );

        let tx = self.db.conn().unchecked_transaction()?;

        let existing = table_columns(&tx, table)?;
        if existing.is_empty() {
            return Err(StoreError::Schema(format!("Table '{table}' doesn't exist")));
        }

        let now = Utc::now().to_rfc3339();
        for column in columns {
            if !existing.contains(column.name) {
                return Err(StoreError::Schema(format!(
                    "Unknown column '{}' in '{table}'",
                    column.name
                )));
            }

            tx.execute(
                "INSERT INTO column_encodings
                     (table_name, column_name, data_type, charset, collation, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(table_name, column_name) DO UPDATE SET
                     data_type = excluded.data_type,
                     charset = excluded.charset,
                     collation = excluded.collation,
                     updated_at = excluded.updated_at",
                params![
                    table,
                    column.name,
                    column.data_type,
                    encoding.charset,
                    encoding.collation,
                    now,
                ],
            )?;
        }

        tx.commit()?;

        tracing::info!(
            table,
            columns = columns.len(),
            charset = %encoding.charset,
            collation = %encoding.collation,
            "column encodings updated"
        );
        Ok(())
    }
}

impl SchemaExecutor for SqliteSchemaExecutor<'_> {
    fn default_collation(&self) -> String {
        self.default_collation.clone()
    }

    fn alter_columns(
        &self,
        table: &str,
        encoding: &EncodingSpec,
        columns: &[ColumnSpec],
    ) -> std::result::Result<(), ExecutorError> {
        self.apply(table, encoding, columns)
            .map_err(|e| ExecutorError::new(e.native_message()))
    }
}
