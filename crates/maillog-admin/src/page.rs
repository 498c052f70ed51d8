//! The mail log admin page.
//!
//! Decides, per request, whether the migration runner is consulted at all,
//! turns a migration request into an [`AuthorizedRequest`] through the gate,
//! and builds what the page shows.
//!
//! [`AuthorizedRequest`]: maillog_core::AuthorizedRequest

use maillog_core::constants::{MIGRATION_ACTION, SETTINGS_TAB};
use maillog_core::{
    AuthorizationGate, MigrationRunner, Notices, SchemaExecutor, VersionStore, ViewContext,
};
use tracing::{debug, warn};

/// One admin request as seen by the page.
#[derive(Debug, Clone)]
pub struct AdminRequest {
    pub view: ViewContext,
    /// The `migration` query parameter was set.
    pub migration: bool,
    /// The `nonce` query parameter, if any.
    pub nonce: Option<String>,
    /// Operator session the request belongs to.
    pub session: String,
}

impl AdminRequest {
    /// A plain page view.
    pub fn view(view: ViewContext, session: impl Into<String>) -> Self {
        Self {
            view,
            migration: false,
            nonce: None,
            session: session.into(),
        }
    }

    /// A click on the upgrade button.
    pub fn migrate(view: ViewContext, session: impl Into<String>, nonce: impl Into<String>) -> Self {
        Self {
            view,
            migration: true,
            nonce: Some(nonce.into()),
            session: session.into(),
        }
    }
}

pub struct AdminPage<'g, S, E, G> {
    runner: MigrationRunner<S, E>,
    gate: &'g G,
    page_id: String,
    admin_url: String,
}

impl<'g, S, E, G> AdminPage<'g, S, E, G>
where
    S: VersionStore,
    E: SchemaExecutor,
    G: AuthorizationGate,
{
    pub fn new(
        runner: MigrationRunner<S, E>,
        gate: &'g G,
        page_id: impl Into<String>,
        admin_url: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            gate,
            page_id: page_id.into(),
            admin_url: admin_url.into(),
        }
    }

    pub fn runner(&self) -> &MigrationRunner<S, E> {
        &self.runner
    }

    pub fn runner_mut(&mut self) -> &mut MigrationRunner<S, E> {
        &mut self.runner
    }

    /// Handle the screen being loaded.
    ///
    /// Only the mail log screen checks the schema version.  A migration only
    /// runs when one is due and the request carries a nonce the gate accepts
    /// for this session; anything else leaves the store untouched.
    pub fn init(&mut self, request: &AdminRequest) {
        if !request.view.is_screen(&self.page_id) {
            debug!(screen = %request.view.screen, "not the mail log screen");
            return;
        }

        if !self.runner.is_migration_due() || !request.migration {
            return;
        }

        let Some(token) = request.nonce.as_deref() else {
            warn!(session = %request.session, "migration requested without a nonce");
            return;
        };

        match self.gate.authorize(MIGRATION_ACTION, &request.session, token) {
            Some(authorized) => self.runner.request_migration(authorized),
            None => warn!(
                session = %request.session,
                "migration requested with an invalid or expired nonce"
            ),
        }
    }

    /// Notices for the given view.
    pub fn notices(&self, view: &ViewContext) -> Notices {
        Notices::collect(
            &self.page_id,
            view,
            self.runner.is_migration_needed(),
            self.runner.outcome(),
        )
    }

    /// Link to the settings tab, where the upgrade button lives.
    pub fn settings_url(&self) -> String {
        add_query_args(&self.admin_url, &[("tab", SETTINGS_TAB)])
    }

    /// Link behind the upgrade button, carrying a fresh nonce for `session`.
    pub fn upgrade_url(&self, session: &str) -> String {
        let nonce = self.gate.issue(MIGRATION_ACTION, session);
        add_query_args(
            &self.admin_url,
            &[("tab", SETTINGS_TAB), ("migration", "1"), ("nonce", &nonce)],
        )
    }
}

/// Append percent-encoded query arguments to `base`, which may already
/// carry a query string.
fn add_query_args(base: &str, args: &[(&str, &str)]) -> String {
    let mut url = base.to_string();
    for (key, value) in args {
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(&urlencoding::encode(key));
        url.push('=');
        url.push_str(&urlencoding::encode(value));
    }
    url
}
