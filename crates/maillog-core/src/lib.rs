//! # maillog-core
//!
//! Schema-version bookkeeping for the mail log table.
//!
//! The crate owns the migration state machine and nothing else: it decides
//! whether the stored schema version lags behind [`constants::LATEST_VERSION`],
//! walks the ladder of registered [`MigrationStep`]s when an operator asks for
//! it, and keeps the outcome in memory for the admin surface to render.
//! Persistence, schema changes and authorization are reached through the
//! traits in [`ports`] and [`auth`], so the crate has no database dependency.

pub mod auth;
pub mod constants;
pub mod ddl;
pub mod outcome;
pub mod ports;
pub mod registry;
pub mod runner;
pub mod step;
pub mod steps;
pub mod view;

mod error;

pub use auth::{AuthorizationGate, AuthorizedRequest};
pub use error::{ErrorKind, MigrationError, Result};
pub use outcome::MigrationOutcome;
pub use ports::{ColumnSpec, EncodingSpec, ExecutorError, SchemaExecutor, VersionStore};
pub use registry::MigrationRegistry;
pub use runner::{MigrationRunner, RunnerState};
pub use step::{MigrationStep, StepEffect};
pub use view::{Notices, ViewContext};
