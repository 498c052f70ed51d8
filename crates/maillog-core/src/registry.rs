//! Version → step lookup table.
//!
//! Built once at startup.  Gaps in the ladder are detected up front by
//! [`MigrationRegistry::missing_between`] instead of being skipped at run time.

use std::collections::BTreeMap;

use tracing::error;

use crate::error::{MigrationError, Result};
use crate::step::MigrationStep;
use crate::steps;

#[derive(Default)]
pub struct MigrationRegistry {
    steps: BTreeMap<u32, Box<dyn MigrationStep>>,
}

impl MigrationRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every shipped step.
    ///
    /// A step `register` rejects is left out, which surfaces as a missing
    /// step the first time a run needs it.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for step in steps::all() {
            if let Err(err) = registry.register(step) {
                error!(%err, "shipped migration step rejected");
            }
        }
        registry
    }

    /// Add a step.  Version 0 is the unmigrated baseline and cannot be
    /// registered; each version may only be registered once.
    pub fn register(&mut self, step: Box<dyn MigrationStep>) -> Result<()> {
        let version = step.version();

        if version == 0 {
            return Err(MigrationError::InvalidStep {
                version,
                reason: "version 0 is the unmigrated baseline".into(),
            });
        }

        if self.steps.contains_key(&version) {
            return Err(MigrationError::InvalidStep {
                version,
                reason: "a step for this version is already registered".into(),
            });
        }

        self.steps.insert(version, step);
        Ok(())
    }

    pub fn get(&self, version: u32) -> Option<&dyn MigrationStep> {
        self.steps.get(&version).map(|step| step.as_ref())
    }

    /// Versions in `from+1..=to` with no registered step.
    pub fn missing_between(&self, from: u32, to: u32) -> Vec<u32> {
        (from.saturating_add(1)..=to)
            .filter(|version| !self.steps.contains_key(version))
            .collect()
    }
}
