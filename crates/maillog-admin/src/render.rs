//! Plain-text rendering of the admin notices.

use std::fmt::Write;

use maillog_core::Notices;

/// Render the notices for a terminal.  `upgrade_url` is only used when the
/// upgrade button is shown.
pub fn render(notices: &Notices, settings_url: &str, upgrade_url: &str) -> String {
    let mut out = String::new();

    if notices.upgrade_available {
        let _ = writeln!(
            out,
            "[warning] A database upgrade is available. Open {settings_url} to start the upgrade."
        );
    }

    if let Some(error) = &notices.error {
        let _ = writeln!(out, "[error] {error}");
    }

    if notices.upgrade_button {
        let _ = writeln!(out, "Database upgrade");
        let _ = writeln!(
            out,
            "Important! Please secure a backup of your database before performing the upgrade."
        );
        let _ = writeln!(out, "Upgrade: {upgrade_url}");
    }

    out
}
