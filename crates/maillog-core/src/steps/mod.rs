//! Concrete migration steps, one module per version.
//!
//! Add a `vNNN_*` module and list it in [`all`] whenever the mail log schema
//! changes, then bump [`crate::constants::LATEST_VERSION`].

pub mod v001_utf8mb4;

use crate::step::MigrationStep;

/// Every shipped step, in ladder order.
pub fn all() -> Vec<Box<dyn MigrationStep>> {
    vec![Box::new(v001_utf8mb4::Utf8mb4Columns)]
}
