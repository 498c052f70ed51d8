//! # maillog-admin
//!
//! Command-line stand-in for the mail log admin screen.
//!
//! Each invocation is one admin request:
//! - `status` views the mail log screen and prints any upgrade notice
//! - `settings` views the settings tab, including the upgrade button
//! - `upgrade --nonce …` is the button's target and runs the migration
//! - `sql` prints the MySQL statement the utf8mb4 step corresponds to

mod config;
mod error;
mod gate;
mod page;
mod render;

use clap::{Parser, Subcommand};
use maillog_core::constants::{MAIL_LOG_TABLE, SETTINGS_TAB};
use maillog_core::ddl::alter_columns_statement;
use maillog_core::steps::v001_utf8mb4::{Utf8mb4Columns, COLUMNS};
use maillog_core::{MigrationOutcome, MigrationRunner, Notices, RunnerState, ViewContext};
use maillog_store::{Database, OptionStore, SqliteSchemaExecutor};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::AdminConfig;
use crate::gate::NonceGate;
use crate::page::{AdminPage, AdminRequest};

#[derive(Parser)]
#[command(name = "maillog-admin", version, about = "Mail log database upgrade tool")]
struct Cli {
    /// Operator session the request belongs to.
    #[arg(long, env = "MAILLOG_SESSION", default_value = "admin", global = true)]
    session: String,

    /// Print a JSON report instead of text notices.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// View the mail log screen.
    Status {
        /// Active tab on the mail log screen.
        #[arg(long)]
        tab: Option<String>,
    },
    /// View the settings tab, including the upgrade button.
    Settings,
    /// Perform the database upgrade.
    Upgrade {
        /// Nonce from the upgrade link.
        #[arg(long)]
        nonce: String,
    },
    /// Print the MySQL statement for the utf8mb4 column upgrade.
    Sql,
}

#[derive(Serialize)]
struct StatusReport<'a> {
    current_version: Option<u32>,
    target_version: u32,
    state: RunnerState,
    notices: &'a Notices,
    outcome: Option<&'a MigrationOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    upgrade_url: Option<&'a str>,
}

fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,maillog_admin=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = AdminConfig::from_env();
    debug!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Build the request this invocation stands for
    // -----------------------------------------------------------------------
    let screen = ViewContext::new(config.page_id.clone());
    let request = match cli.command {
        Command::Sql => {
            print_sql(&config.db_collate);
            return Ok(());
        }
        Command::Status { tab } => {
            let view = match tab {
                Some(tab) => screen.with_tab(tab),
                None => screen,
            };
            AdminRequest::view(view, cli.session.clone())
        }
        Command::Settings => AdminRequest::view(screen.with_tab(SETTINGS_TAB), cli.session.clone()),
        Command::Upgrade { nonce } => {
            AdminRequest::migrate(screen.with_tab(SETTINGS_TAB), cli.session.clone(), nonce)
        }
    };

    // -----------------------------------------------------------------------
    // 4. Open the store and wire the runner
    // -----------------------------------------------------------------------
    let db = match &config.db_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    if let Some(path) = db.path() {
        info!(path = %path.display(), "opened database");
    }

    let secret = match config.nonce_secret {
        Some(secret) => secret,
        None => gate::load_or_create_secret(&db)?,
    };
    let gate = NonceGate::new(secret, config.nonce_lifetime_secs);

    let runner = MigrationRunner::new(
        OptionStore::new(&db),
        SqliteSchemaExecutor::new(&db, config.db_collate.clone()),
    );
    let mut page = AdminPage::new(runner, &gate, config.page_id.clone(), config.admin_url.clone());

    // -----------------------------------------------------------------------
    // 5. Handle the request and render
    // -----------------------------------------------------------------------
    page.init(&request);

    let notices = page.notices(&request.view);
    let upgrade_url = notices
        .upgrade_button
        .then(|| page.upgrade_url(&request.session));

    if cli.json {
        let current_version = page.runner_mut().current_version().ok();
        let report = StatusReport {
            current_version,
            target_version: page.runner().target_version(),
            state: page.runner().state(),
            notices: &notices,
            outcome: page.runner().outcome(),
            upgrade_url: upgrade_url.as_deref(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!(
            "{}",
            render::render(
                &notices,
                &page.settings_url(),
                upgrade_url.as_deref().unwrap_or_default()
            )
        );
    }

    Ok(())
}

fn print_sql(default_collation: &str) {
    match Utf8mb4Columns::target_encoding(default_collation) {
        Some(encoding) => println!(
            "{}",
            alter_columns_statement(MAIL_LOG_TABLE, &encoding, COLUMNS)
        ),
        None => println!(
            "-- default collation `{default_collation}` is not utf8mb4; the upgrade has nothing to convert"
        ),
    }
}
