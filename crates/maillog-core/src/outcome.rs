use serde::Serialize;

use crate::error::MigrationError;

/// Result of the most recent run, kept in memory for the admin surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MigrationOutcome {
    /// Every pending step ran and the version was advanced.
    Success { from: u32, to: u32 },
    /// The run stopped at `version`; the stored version was not advanced past
    /// the last step that completed.
    Failure { version: u32, error: MigrationError },
}

impl MigrationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, MigrationOutcome::Success { .. })
    }

    /// Operator-facing error text, if the run failed.
    pub fn error_message(&self) -> Option<String> {
        match self {
            MigrationOutcome::Success { .. } => None,
            MigrationOutcome::Failure { error, .. } => Some(error.to_string()),
        }
    }

    pub fn error(&self) -> Option<&MigrationError> {
        match self {
            MigrationOutcome::Success { .. } => None,
            MigrationOutcome::Failure { error, .. } => Some(error),
        }
    }
}
