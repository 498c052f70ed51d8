//! Admin tool configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the tool can run against a local
//! store with zero configuration.

use std::fmt;
use std::path::PathBuf;

use crate::error::AdminError;

/// Admin tool configuration.
#[derive(Clone)]
pub struct AdminConfig {
    /// SQLite database holding the options and mail log tables.
    /// Env: `MAILLOG_DB_PATH`
    /// Default: platform data directory (`maillog.db`).
    pub db_path: Option<PathBuf>,

    /// Default collation of the mail log storage.
    /// Env: `MAILLOG_DB_COLLATE`
    /// Default: `utf8mb4_unicode_520_ci`
    pub db_collate: String,

    /// Key for signing upgrade nonces (hex-encoded, 64 chars).
    /// Env: `MAILLOG_NONCE_SECRET`
    /// Default: a random key persisted in the options table.
    pub nonce_secret: Option<[u8; 32]>,

    /// How long an upgrade link stays valid, in seconds.
    /// Env: `MAILLOG_NONCE_LIFETIME_SECS`
    /// Default: `86400`
    pub nonce_lifetime_secs: i64,

    /// Base URL of the mail log admin page.
    /// Env: `MAILLOG_ADMIN_URL`
    /// Default: `admin.php?page=wpml_plugin_log`
    pub admin_url: String,

    /// Screen id of the mail log admin page.
    /// Env: `MAILLOG_PAGE_ID`
    /// Default: `tools_page_wpml_plugin_log`
    pub page_id: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            db_collate: "utf8mb4_unicode_520_ci".to_string(),
            nonce_secret: None,
            nonce_lifetime_secs: 86_400,
            admin_url: "admin.php?page=wpml_plugin_log".to_string(),
            page_id: "tools_page_wpml_plugin_log".to_string(),
        }
    }
}

// The nonce secret stays out of logs.
impl fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminConfig")
            .field("db_path", &self.db_path)
            .field("db_collate", &self.db_collate)
            .field("nonce_secret", &self.nonce_secret.map(|_| "<redacted>"))
            .field("nonce_lifetime_secs", &self.nonce_lifetime_secs)
            .field("admin_url", &self.admin_url)
            .field("page_id", &self.page_id)
            .finish()
    }
}

impl AdminConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("MAILLOG_DB_PATH") {
            if !path.is_empty() {
                config.db_path = Some(PathBuf::from(path));
            }
        }

        if let Some(collate) = lookup("MAILLOG_DB_COLLATE") {
            if !collate.is_empty() {
                config.db_collate = collate;
            }
        }

        if let Some(hex_key) = lookup("MAILLOG_NONCE_SECRET") {
            match parse_hex_secret(&hex_key) {
                Ok(key) => config.nonce_secret = Some(key),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Invalid MAILLOG_NONCE_SECRET, using the stored secret"
                    );
                }
            }
        }

        if let Some(val) = lookup("MAILLOG_NONCE_LIFETIME_SECS") {
            match val.parse::<i64>() {
                Ok(secs) if secs >= 2 => config.nonce_lifetime_secs = secs,
                _ => {
                    tracing::warn!(
                        value = %val,
                        "Invalid MAILLOG_NONCE_LIFETIME_SECS, using default"
                    );
                }
            }
        }

        if let Some(url) = lookup("MAILLOG_ADMIN_URL") {
            config.admin_url = url;
        }

        if let Some(id) = lookup("MAILLOG_PAGE_ID") {
            config.page_id = id;
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

/// Parse a 64-character hex string into a 32-byte key.
pub fn parse_hex_secret(hex: &str) -> Result<[u8; 32], AdminError> {
    let hex = hex.trim();
    if hex.len() != 64 {
        return Err(AdminError::InvalidSecret(format!(
            "expected 64 hex chars, got {}",
            hex.len()
        )));
    }

    let bytes = hex::decode(hex).map_err(|e| AdminError::InvalidSecret(e.to_string()))?;
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    Ok(key)
}
