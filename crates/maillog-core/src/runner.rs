//! The migration state machine.
//!
//! ```text
//! NotChecked → UpToDate
//!            → MigrationDue → Migrating → Migrated
//!                                       → Failed
//! ```
//!
//! A runner lives for one admin request.  It reads the stored version lazily
//! and caches it, reports whether a migration is due, and on an authorized
//! request walks the step ladder from the stored version up to the target.
//! Failures never escape as errors: they are recorded in the
//! [`MigrationOutcome`] for the admin surface to render, and the stored
//! version is left at the last step that completed, so the next request can
//! try again.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::auth::AuthorizedRequest;
use crate::constants::{LATEST_VERSION, MIGRATION_ACTION, OPTION_NAME};
use crate::error::{MigrationError, Result};
use crate::outcome::MigrationOutcome;
use crate::ports::{SchemaExecutor, VersionStore};
use crate::registry::MigrationRegistry;
use crate::step::StepEffect;

/// Where the runner is in its per-request lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerState {
    NotChecked,
    UpToDate,
    MigrationDue,
    Migrating,
    Migrated,
    Failed,
}

pub struct MigrationRunner<S, E> {
    store: S,
    executor: E,
    registry: MigrationRegistry,
    target: u32,
    /// Stored version, read on first use.
    current_version: Option<u32>,
    migration_needed: bool,
    state: RunnerState,
    outcome: Option<MigrationOutcome>,
}

impl<S: VersionStore, E: SchemaExecutor> MigrationRunner<S, E> {
    /// Runner over the shipped step ladder, targeting [`LATEST_VERSION`].
    pub fn new(store: S, executor: E) -> Self {
        Self::with_registry(store, executor, MigrationRegistry::standard())
    }

    pub fn with_registry(store: S, executor: E, registry: MigrationRegistry) -> Self {
        Self {
            store,
            executor,
            registry,
            target: LATEST_VERSION,
            current_version: None,
            migration_needed: false,
            state: RunnerState::NotChecked,
            outcome: None,
        }
    }

    /// Override the target version.
    pub fn with_target(mut self, target: u32) -> Self {
        self.target = target;
        self
    }

    pub fn target_version(&self) -> u32 {
        self.target
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    /// Outcome of the last run in this request, if any.
    pub fn outcome(&self) -> Option<&MigrationOutcome> {
        self.outcome.as_ref()
    }

    /// The "migration needed" flag set by [`Self::is_migration_due`].
    pub fn is_migration_needed(&self) -> bool {
        self.migration_needed
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Stored schema version, read once and cached.
    pub fn current_version(&mut self) -> Result<u32> {
        match self.current_version {
            Some(version) => Ok(version),
            None => self.refresh_version(),
        }
    }

    fn refresh_version(&mut self) -> Result<u32> {
        let version = self
            .store
            .get_int(OPTION_NAME)
            .map_err(MigrationError::storage)?;
        self.current_version = Some(version);
        Ok(version)
    }

    /// Whether the stored version lags behind the target.
    ///
    /// Sets the "migration needed" flag.  Never writes to the store, and
    /// returns the same answer on every call until a run succeeds.
    pub fn is_migration_due(&mut self) -> bool {
        let current = match self.current_version() {
            Ok(version) => version,
            Err(error) => {
                self.migration_needed = false;
                let target = self.target;
                self.fail(target, error);
                return false;
            }
        };

        let due = current < self.target;
        self.migration_needed = due;

        if !matches!(self.state, RunnerState::Migrated | RunnerState::Failed) {
            self.state = if due {
                RunnerState::MigrationDue
            } else {
                RunnerState::UpToDate
            };
        }

        debug!(
            current_version = current,
            target_version = self.target,
            due,
            "checked schema version"
        );

        due
    }

    /// Run the pending migrations on behalf of an authorized operator.
    ///
    /// The stored version is re-read first; if another request already
    /// brought it up to date, nothing happens.
    pub fn request_migration(&mut self, request: AuthorizedRequest) {
        if !request.is_for(MIGRATION_ACTION) {
            warn!(
                action = request.action(),
                "ignoring authorized request for a different action"
            );
            return;
        }

        let current = match self.refresh_version() {
            Ok(version) => version,
            Err(error) => {
                let target = self.target;
                self.fail(target, error);
                return;
            }
        };

        if current >= self.target {
            debug!(
                current_version = current,
                "migration requested but schema is already up to date"
            );
            self.migration_needed = false;
            self.state = RunnerState::UpToDate;
            return;
        }

        info!(
            session = request.session(),
            current_version = current,
            target_version = self.target,
            "operator requested schema migration"
        );

        let target = self.target;
        self.run(target);
    }

    /// Apply every step from the stored version + 1 up to `target`.
    ///
    /// The whole ladder is checked before anything executes, so a missing
    /// step fails the run without touching the schema or the version.
    /// `target` may not exceed the runner's configured target.
    pub fn run(&mut self, target: u32) {
        if target > self.target {
            let latest = self.target;
            self.fail(
                target,
                MigrationError::TargetBeyondLatest {
                    requested: target,
                    target: latest,
                },
            );
            return;
        }

        let from = match self.refresh_version() {
            Ok(version) => version,
            Err(error) => {
                self.fail(target, error);
                return;
            }
        };

        if from >= target {
            debug!(current_version = from, target_version = target, "nothing to migrate");
            self.migration_needed = from < self.target;
            self.state = RunnerState::UpToDate;
            return;
        }

        if let Some(&version) = self.registry.missing_between(from, target).first() {
            self.fail(version, MigrationError::MissingStep { version });
            return;
        }

        self.state = RunnerState::Migrating;

        for version in from + 1..=target {
            if let Err(error) = self.migrate_step(version) {
                self.fail(version, error);
                return;
            }
        }

        info!(from, to = target, "schema migration complete");

        self.migration_needed = target < self.target;
        self.state = RunnerState::Migrated;
        self.outcome = Some(MigrationOutcome::Success { from, to: target });
    }

    /// Execute one step and, only once it succeeded, advance the stored
    /// version from `version - 1` to `version`.
    fn migrate_step(&mut self, version: u32) -> Result<()> {
        let step = self
            .registry
            .get(version)
            .ok_or(MigrationError::MissingStep { version })?;

        info!(version, description = step.description(), "applying migration");

        let effect = step
            .up(&self.executor)
            .map_err(|e| MigrationError::Step {
                version,
                message: e.message,
            })?;

        if let StepEffect::Skipped { reason } = &effect {
            info!(version, %reason, "migration step had nothing to do");
        }

        let expected = version - 1;
        let swapped = self
            .store
            .compare_and_set(OPTION_NAME, expected, version)
            .map_err(MigrationError::storage)?;

        if !swapped {
            let found = self
                .store
                .get_int(OPTION_NAME)
                .map_err(MigrationError::storage)?;
            return Err(MigrationError::VersionConflict { expected, found });
        }

        self.current_version = Some(version);
        Ok(())
    }

    fn fail(&mut self, version: u32, error: MigrationError) {
        warn!(version, kind = ?error.kind(), %error, "schema migration failed");

        // Whatever was cached may be stale now; re-read on next use.
        self.current_version = None;
        self.state = RunnerState::Failed;
        self.outcome = Some(MigrationOutcome::Failure { version, error });
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    use super::*;
    use crate::error::ErrorKind;
    use crate::ports::{ColumnSpec, EncodingSpec, ExecutorError};
    use crate::step::MigrationStep;

    #[derive(Debug, thiserror::Error)]
    #[error("store offline")]
    struct Offline;

    #[derive(Default)]
    struct MemoryStore {
        values: RefCell<HashMap<String, u32>>,
        offline: Cell<bool>,
        reads: Cell<usize>,
        /// Simulates another operator bumping the version right before our write.
        race_to: Cell<Option<u32>>,
    }

    impl MemoryStore {
        fn at(version: u32) -> Self {
            let store = Self::default();
            store
                .values
                .borrow_mut()
                .insert(OPTION_NAME.to_string(), version);
            store
        }

        fn version(&self) -> u32 {
            self.values.borrow().get(OPTION_NAME).copied().unwrap_or(0)
        }
    }

    impl VersionStore for MemoryStore {
        type Error = Offline;

        fn get_int(&self, key: &str) -> std::result::Result<u32, Offline> {
            if self.offline.get() {
                return Err(Offline);
            }
            self.reads.set(self.reads.get() + 1);
            Ok(self.values.borrow().get(key).copied().unwrap_or(0))
        }

        fn set_int(&self, key: &str, value: u32) -> std::result::Result<(), Offline> {
            self.values.borrow_mut().insert(key.to_string(), value);
            Ok(())
        }

        fn compare_and_set(
            &self,
            key: &str,
            expected: u32,
            new: u32,
        ) -> std::result::Result<bool, Offline> {
            if let Some(raced) = self.race_to.take() {
                self.set_int(key, raced)?;
            }
            let current = self.values.borrow().get(key).copied().unwrap_or(0);
            if current != expected {
                return Ok(false);
            }
            self.set_int(key, new)?;
            Ok(true)
        }
    }

    struct FakeExecutor {
        collation: String,
        failures: RefCell<Vec<String>>,
        calls: Cell<usize>,
    }

    impl FakeExecutor {
        fn ok() -> Self {
            Self {
                collation: "utf8mb4_unicode_520_ci".into(),
                failures: RefCell::new(Vec::new()),
                calls: Cell::new(0),
            }
        }

        fn failing_once(message: &str) -> Self {
            let executor = Self::ok();
            executor.failures.borrow_mut().push(message.to_string());
            executor
        }
    }

    impl SchemaExecutor for FakeExecutor {
        fn default_collation(&self) -> String {
            self.collation.clone()
        }

        fn alter_columns(
            &self,
            _table: &str,
            _encoding: &EncodingSpec,
            _columns: &[ColumnSpec],
        ) -> std::result::Result<(), ExecutorError> {
            self.calls.set(self.calls.get() + 1);
            match self.failures.borrow_mut().pop() {
                Some(message) => Err(ExecutorError::new(message)),
                None => Ok(()),
            }
        }
    }

    fn authorized() -> AuthorizedRequest {
        AuthorizedRequest::new(MIGRATION_ACTION, "admin")
    }

    #[test]
    fn test_due_when_behind_target() {
        let mut runner = MigrationRunner::new(MemoryStore::default(), FakeExecutor::ok());

        assert_eq!(runner.state(), RunnerState::NotChecked);
        assert!(runner.is_migration_due());
        assert!(runner.is_migration_needed());
        assert_eq!(runner.state(), RunnerState::MigrationDue);
    }

    #[test]
    fn test_not_due_at_target() {
        let mut runner =
            MigrationRunner::new(MemoryStore::at(LATEST_VERSION), FakeExecutor::ok());

        assert!(!runner.is_migration_due());
        assert!(!runner.is_migration_needed());
        assert_eq!(runner.state(), RunnerState::UpToDate);
    }

    #[test]
    fn test_due_check_is_idempotent_and_cached() {
        let mut runner = MigrationRunner::new(MemoryStore::default(), FakeExecutor::ok());

        for _ in 0..5 {
            assert!(runner.is_migration_due());
        }
        assert_eq!(runner.store().reads.get(), 1);
        assert_eq!(runner.store().version(), 0);
    }

    #[test]
    fn test_successful_migration_advances_version() {
        let mut runner = MigrationRunner::new(MemoryStore::default(), FakeExecutor::ok());
        assert!(runner.is_migration_due());

        runner.request_migration(authorized());

        assert_eq!(runner.store().version(), 1);
        assert_eq!(runner.executor().calls.get(), 1);
        assert_eq!(
            runner.outcome(),
            Some(&MigrationOutcome::Success { from: 0, to: 1 })
        );
        assert_eq!(runner.state(), RunnerState::Migrated);
        assert!(!runner.is_migration_needed());
        assert!(!runner.is_migration_due());
    }

    #[test]
    fn test_executor_failure_keeps_version() {
        let mut runner = MigrationRunner::new(
            MemoryStore::default(),
            FakeExecutor::failing_once("disk full"),
        );
        assert!(runner.is_migration_due());

        runner.request_migration(authorized());

        assert_eq!(runner.store().version(), 0);
        assert_eq!(runner.state(), RunnerState::Failed);

        let outcome = runner.outcome().unwrap();
        assert!(!outcome.is_success());
        let message = outcome.error_message().unwrap();
        assert!(message.contains("disk full"));
        assert!(message.contains("version 1"));
        assert!(matches!(
            outcome,
            MigrationOutcome::Failure { version: 1, error } if error.kind() == ErrorKind::ExternalOperation
        ));

        // Still due: the warning keeps showing.
        assert!(runner.is_migration_due());
    }

    #[test]
    fn test_retry_after_failure_runs_step_again() {
        let mut runner = MigrationRunner::new(
            MemoryStore::default(),
            FakeExecutor::failing_once("Lock wait timeout exceeded"),
        );

        runner.request_migration(authorized());
        assert_eq!(runner.store().version(), 0);

        runner.request_migration(authorized());
        assert_eq!(runner.executor().calls.get(), 2);
        assert_eq!(runner.store().version(), 1);
        assert!(runner.outcome().unwrap().is_success());
    }

    #[test]
    fn test_missing_step_is_configuration_error() {
        let mut runner =
            MigrationRunner::new(MemoryStore::default(), FakeExecutor::ok()).with_target(2);
        assert!(runner.is_migration_due());

        runner.request_migration(authorized());

        assert_eq!(runner.store().version(), 0);
        assert_eq!(runner.executor().calls.get(), 0);
        let outcome = runner.outcome().unwrap();
        assert_eq!(
            outcome,
            &MigrationOutcome::Failure {
                version: 2,
                error: MigrationError::MissingStep { version: 2 },
            }
        );
        assert_eq!(
            outcome.error_message().as_deref(),
            Some("Unable to find migration to version 2.")
        );
    }

    #[test]
    fn test_skipped_step_still_marks_version() {
        let mut executor = FakeExecutor::ok();
        executor.collation = "latin1_swedish_ci".into();
        let mut runner = MigrationRunner::new(MemoryStore::default(), executor);

        runner.request_migration(authorized());

        assert_eq!(runner.executor().calls.get(), 0);
        assert_eq!(runner.store().version(), 1);
        assert!(!runner.is_migration_due());
    }

    #[test]
    fn test_request_for_other_action_has_no_effect() {
        let mut runner = MigrationRunner::new(MemoryStore::default(), FakeExecutor::ok());
        assert!(runner.is_migration_due());

        runner.request_migration(AuthorizedRequest::new("delete_all_mails", "admin"));

        assert_eq!(runner.store().version(), 0);
        assert!(runner.outcome().is_none());
        assert_eq!(runner.state(), RunnerState::MigrationDue);
    }

    #[test]
    fn test_request_revalidates_stored_version() {
        let mut runner = MigrationRunner::new(MemoryStore::default(), FakeExecutor::ok());
        assert!(runner.is_migration_due());

        // Another request finished the migration in the meantime.
        runner.store().set_int(OPTION_NAME, 1).unwrap();
        runner.request_migration(authorized());

        assert_eq!(runner.executor().calls.get(), 0);
        assert!(runner.outcome().is_none());
        assert_eq!(runner.state(), RunnerState::UpToDate);
        assert!(!runner.is_migration_needed());
    }

    #[test]
    fn test_concurrent_bump_is_a_conflict() {
        let store = MemoryStore::default();
        store.race_to.set(Some(1));
        let mut runner = MigrationRunner::new(store, FakeExecutor::ok());

        runner.request_migration(authorized());

        assert_eq!(runner.store().version(), 1);
        assert_eq!(
            runner.outcome().and_then(MigrationOutcome::error),
            Some(&MigrationError::VersionConflict {
                expected: 0,
                found: 1
            })
        );
        // The cache was dropped, so the next check sees the other operator's write.
        assert!(!runner.is_migration_due());
    }

    #[test]
    fn test_unreadable_store_is_reported_not_due() {
        let store = MemoryStore::default();
        store.offline.set(true);
        let mut runner = MigrationRunner::new(store, FakeExecutor::ok());

        assert!(!runner.is_migration_due());
        let error = runner.outcome().and_then(MigrationOutcome::error).unwrap();
        assert_eq!(error.kind(), ErrorKind::Storage);
        assert!(error.to_string().contains("store offline"));
    }

    #[test]
    fn test_version_never_exceeds_target() {
        let mut runner = MigrationRunner::new(MemoryStore::default(), FakeExecutor::ok());

        runner.request_migration(authorized());
        runner.request_migration(authorized());
        runner.run(LATEST_VERSION);

        assert_eq!(runner.store().version(), LATEST_VERSION);
        assert_eq!(runner.executor().calls.get(), 1);
    }

    #[test]
    fn test_run_past_configured_target_is_rejected() {
        let log = std::rc::Rc::new(RefCell::new(Vec::new()));
        let mut runner = MigrationRunner::with_registry(
            MemoryStore::default(),
            FakeExecutor::ok(),
            ladder(&log, None),
        )
        .with_target(1);

        runner.run(3);

        assert!(log.borrow().is_empty());
        assert_eq!(runner.store().version(), 0);
        assert!(runner.store().version() <= runner.target_version());
        let error = runner.outcome().and_then(MigrationOutcome::error).unwrap();
        assert_eq!(
            error,
            &MigrationError::TargetBeyondLatest {
                requested: 3,
                target: 1
            }
        );
        assert_eq!(error.kind(), ErrorKind::Configuration);

        // The configured target still runs normally afterwards.
        runner.run(1);
        assert_eq!(*log.borrow(), vec![1]);
        assert_eq!(runner.store().version(), 1);
    }

    struct Recorded {
        version: u32,
        log: std::rc::Rc<RefCell<Vec<u32>>>,
        fail: bool,
    }

    impl MigrationStep for Recorded {
        fn version(&self) -> u32 {
            self.version
        }

        fn description(&self) -> &str {
            "recorded"
        }

        fn up(
            &self,
            _executor: &dyn SchemaExecutor,
        ) -> std::result::Result<StepEffect, ExecutorError> {
            self.log.borrow_mut().push(self.version);
            if self.fail {
                return Err(ExecutorError::new("Duplicate column name 'status'"));
            }
            Ok(StepEffect::Applied)
        }
    }

    fn ladder(log: &std::rc::Rc<RefCell<Vec<u32>>>, failing: Option<u32>) -> MigrationRegistry {
        let mut registry = MigrationRegistry::new();
        // Registered out of order on purpose.
        for version in [3, 1, 2] {
            registry
                .register(Box::new(Recorded {
                    version,
                    log: log.clone(),
                    fail: failing == Some(version),
                }))
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_ladder_walks_every_version_in_order() {
        let log = std::rc::Rc::new(RefCell::new(Vec::new()));
        let mut runner = MigrationRunner::with_registry(
            MemoryStore::at(1),
            FakeExecutor::ok(),
            ladder(&log, None),
        )
        .with_target(3);

        assert!(runner.is_migration_due());
        runner.request_migration(authorized());

        assert_eq!(*log.borrow(), vec![2, 3]);
        assert_eq!(runner.store().version(), 3);
        assert_eq!(
            runner.outcome(),
            Some(&MigrationOutcome::Success { from: 1, to: 3 })
        );
    }

    #[test]
    fn test_ladder_stops_at_first_failure() {
        let log = std::rc::Rc::new(RefCell::new(Vec::new()));
        let mut runner = MigrationRunner::with_registry(
            MemoryStore::default(),
            FakeExecutor::ok(),
            ladder(&log, Some(2)),
        )
        .with_target(3);

        runner.request_migration(authorized());

        assert_eq!(*log.borrow(), vec![1, 2]);
        assert_eq!(runner.store().version(), 1);
        let outcome = runner.outcome().unwrap();
        assert!(matches!(outcome, MigrationOutcome::Failure { version: 2, .. }));
        assert!(outcome
            .error_message()
            .unwrap()
            .ends_with("Error: Duplicate column name 'status'"));
    }
}
