/// Option key under which the applied schema version is stored.
pub const OPTION_NAME: &str = "wp_mail_logging_db_version";

/// Action name that migration tokens are scoped to.
pub const MIGRATION_ACTION: &str = "wp_mail_logging_migration_nonce";

/// Version of the latest registered migration step.
pub const LATEST_VERSION: u32 = 1;

/// Table the migration ladder operates on.
pub const MAIL_LOG_TABLE: &str = "wpml_mails";

/// Admin tab that hosts the upgrade button.
pub const SETTINGS_TAB: &str = "settings";

/// Character set every text column ends up in after step 1.
pub const TARGET_CHARSET: &str = "utf8mb4";
