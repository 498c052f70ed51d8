use crate::ports::{ExecutorError, SchemaExecutor};

/// What a step did when it ran successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepEffect {
    /// The schema change was performed.
    Applied,
    /// Nothing needed changing; the version is still marked as applied.
    Skipped { reason: String },
}

/// A single forward-only upgrade, identified by the version it upgrades *to*.
pub trait MigrationStep {
    /// Version the schema is at once this step has run.
    fn version(&self) -> u32;

    /// Human-readable description for logging.
    fn description(&self) -> &str;

    /// Execute the step.  Must not touch the version store.
    fn up(&self, executor: &dyn SchemaExecutor) -> Result<StepEffect, ExecutorError>;
}
