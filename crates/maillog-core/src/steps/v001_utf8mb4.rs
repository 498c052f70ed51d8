//! v001 -- Convert the mail log text columns to utf8mb4.
//!
//! Tables created before the storage defaulted to utf8mb4 keep their old
//! per-column charset, which mangles 4-byte characters (emoji, some CJK) in
//! logged subjects and bodies.  The step only acts when the storage's default
//! collation is itself a utf8mb4 one; otherwise there is nothing to align
//! the columns with.

use crate::constants::{MAIL_LOG_TABLE, TARGET_CHARSET};
use crate::ports::{ColumnSpec, EncodingSpec, ExecutorError, SchemaExecutor};
use crate::step::{MigrationStep, StepEffect};

/// Text columns of the mail log table and the types they are re-declared as.
pub const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("host", "VARCHAR(200)"),
    ColumnSpec::new("receiver", "VARCHAR(200)"),
    ColumnSpec::new("subject", "VARCHAR(200)"),
    ColumnSpec::new("message", "TEXT"),
    ColumnSpec::new("headers", "TEXT"),
    ColumnSpec::new("attachments", "VARCHAR(800)"),
    ColumnSpec::new("error", "VARCHAR(400)"),
    ColumnSpec::new("plugin_version", "VARCHAR(200)"),
];

/// Migration from 0 to 1.
pub struct Utf8mb4Columns;

impl Utf8mb4Columns {
    /// Encoding the columns are converted to for the given default collation,
    /// or `None` when the collation is not utf8mb4-capable.
    pub fn target_encoding(default_collation: &str) -> Option<EncodingSpec> {
        if !default_collation.contains(TARGET_CHARSET) {
            return None;
        }

        Some(EncodingSpec {
            charset: TARGET_CHARSET.to_string(),
            collation: default_collation.to_string(),
        })
    }
}

impl MigrationStep for Utf8mb4Columns {
    fn version(&self) -> u32 {
        1
    }

    fn description(&self) -> &str {
        "convert mail log text columns to utf8mb4"
    }

    fn up(&self, executor: &dyn SchemaExecutor) -> Result<StepEffect, ExecutorError> {
        let collation = executor.default_collation();

        let Some(encoding) = Self::target_encoding(&collation) else {
            return Ok(StepEffect::Skipped {
                reason: format!("default collation `{collation}` is not {TARGET_CHARSET}"),
            });
        };

        executor.alter_columns(MAIL_LOG_TABLE, &encoding, COLUMNS)?;
        Ok(StepEffect::Applied)
    }
}
