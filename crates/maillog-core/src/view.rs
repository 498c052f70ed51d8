//! What the admin surface should show for the current screen.

use serde::Serialize;

use crate::constants::SETTINGS_TAB;
use crate::outcome::MigrationOutcome;

/// The admin screen a request is rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewContext {
    /// Screen identifier, e.g. `tools_page_wpml_plugin_log`.
    pub screen: String,
    /// Active sub-tab on that screen, if any.
    pub tab: Option<String>,
}

impl ViewContext {
    pub fn new(screen: impl Into<String>) -> Self {
        Self {
            screen: screen.into(),
            tab: None,
        }
    }

    pub fn with_tab(mut self, tab: impl Into<String>) -> Self {
        self.tab = Some(tab.into());
        self
    }

    pub fn is_screen(&self, page_id: &str) -> bool {
        self.screen == page_id
    }

    pub fn is_tab(&self, tab: &str) -> bool {
        self.tab.as_deref() == Some(tab)
    }
}

/// Notices to render for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Notices {
    /// "A database upgrade is available" warning.
    pub upgrade_available: bool,
    /// The upgrade button section on the settings tab.
    pub upgrade_button: bool,
    /// Error banner text from the last failed run.
    pub error: Option<String>,
}

impl Notices {
    /// Decide which notices apply.
    ///
    /// On the mail log settings tab the button replaces the warning.  The
    /// error banner is shown everywhere, including that tab, since that is
    /// where the operator lands after clicking the button.
    pub fn collect(
        page_id: &str,
        view: &ViewContext,
        migration_needed: bool,
        outcome: Option<&MigrationOutcome>,
    ) -> Self {
        let on_settings = view.is_screen(page_id) && view.is_tab(SETTINGS_TAB);

        Self {
            upgrade_available: migration_needed && !on_settings,
            upgrade_button: migration_needed && on_settings,
            error: outcome.and_then(MigrationOutcome::error_message),
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.upgrade_available && !self.upgrade_button && self.error.is_none()
    }
}
