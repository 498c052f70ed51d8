//! MySQL rendering of a column encoding change.
//!
//! Executors backed by MySQL run this statement as-is; the SQLite executor
//! logs it alongside its own catalog update so the two stay comparable.

use crate::ports::{ColumnSpec, EncodingSpec};

/// Render `ALTER TABLE … MODIFY …` for every column in one statement.
pub fn alter_columns_statement(
    table: &str,
    encoding: &EncodingSpec,
    columns: &[ColumnSpec],
) -> String {
    let modifies = columns
        .iter()
        .map(|column| {
            format!(
                "MODIFY `{}` {} CHARACTER SET {} COLLATE {}",
                column.name, column.data_type, encoding.charset, encoding.collation
            )
        })
        .collect::<Vec<_>>()
        .join(",\n    ");

    format!("ALTER TABLE {table}\n    {modifies};")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_every_column() {
        let encoding = EncodingSpec {
            charset: "utf8mb4".into(),
            collation: "utf8mb4_unicode_ci".into(),
        };
        let columns = [
            ColumnSpec::new("host", "VARCHAR(200)"),
            ColumnSpec::new("message", "TEXT"),
        ];

        let sql = alter_columns_statement("wp_wpml_mails", &encoding, &columns);

        assert_eq!(
            sql,
            "ALTER TABLE wp_wpml_mails\n    \
             MODIFY `host` VARCHAR(200) CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci,\n    \
             MODIFY `message` TEXT CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci;"
        );
    }
}
