//! v001 -- Initial schema creation.
//!
//! Creates the `options` key-value table, the mail log table and the
//! `column_encodings` catalog.  The catalog starts out describing the legacy
//! `utf8` columns that the first mail log migration converts.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Options (persisted settings, one row per name)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS options (
    option_name  TEXT PRIMARY KEY NOT NULL,
    option_value TEXT NOT NULL,
    autoload     INTEGER NOT NULL DEFAULT 1   -- boolean 0/1
);

-- ----------------------------------------------------------------
-- Mail log
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS wpml_mails (
    mail_id        INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp      TEXT NOT NULL,             -- ISO-8601 / RFC-3339
    host           TEXT NOT NULL DEFAULT '',
    receiver       TEXT NOT NULL DEFAULT '',
    subject        TEXT NOT NULL DEFAULT '',
    message        TEXT,
    headers        TEXT,
    attachments    TEXT NOT NULL DEFAULT '',
    error          TEXT DEFAULT '',
    plugin_version TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_wpml_mails_timestamp ON wpml_mails(timestamp DESC);

-- ----------------------------------------------------------------
-- Column encodings (charset/collation per text column)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS column_encodings (
    table_name  TEXT NOT NULL,
    column_name TEXT NOT NULL,
    data_type   TEXT NOT NULL,
    charset     TEXT NOT NULL,
    collation   TEXT NOT NULL,
    updated_at  TEXT NOT NULL,

    PRIMARY KEY (table_name, column_name)
);

INSERT OR IGNORE INTO column_encodings
    (table_name, column_name, data_type, charset, collation, updated_at)
VALUES
    ('wpml_mails', 'host',           'VARCHAR(200)', 'utf8', 'utf8_general_ci', '1970-01-01T00:00:00+00:00'),
    ('wpml_mails', 'receiver',       'VARCHAR(200)', 'utf8', 'utf8_general_ci', '1970-01-01T00:00:00+00:00'),
    ('wpml_mails', 'subject',        'VARCHAR(200)', 'utf8', 'utf8_general_ci', '1970-01-01T00:00:00+00:00'),
    ('wpml_mails', 'message',        'TEXT',         'utf8', 'utf8_general_ci', '1970-01-01T00:00:00+00:00'),
    ('wpml_mails', 'headers',        'TEXT',         'utf8', 'utf8_general_ci', '1970-01-01T00:00:00+00:00'),
    ('wpml_mails', 'attachments',    'VARCHAR(800)', 'utf8', 'utf8_general_ci', '1970-01-01T00:00:00+00:00'),
    ('wpml_mails', 'error',          'VARCHAR(400)', 'utf8', 'utf8_general_ci', '1970-01-01T00:00:00+00:00'),
    ('wpml_mails', 'plugin_version', 'VARCHAR(200)', 'utf8', 'utf8_general_ci', '1970-01-01T00:00:00+00:00');
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
