//! Migration module for environment schema versions
//!
//! Environments carry a `lastMigration` id. Loading or importing an
//! environment runs every migration step whose id is above that value, in
//! ascending order, then types the result as an [`Environment`].
//!
//! ## Migration Strategy
//!
//! When the environment schema changes:
//! 1. Add a step function to `migrate.rs` and append it to `MIGRATIONS` with the next id
//! 2. If the change ships in a release, add the release to `LEGACY_MIGRATION_INDEX`
//!    only when older export formats of that release must be readable
//! 3. Add tests for the new step
//!
//! Steps work on the raw JSON document so they can read shapes the typed
//! model no longer has. Every step is idempotent: it only fills in or moves
//! fields that are missing in the target shape.
//!
//! Legacy exports (the single-item format with a sentinel `id`) are converted
//! once into a current [`Bundle`](crate::bundle::Bundle) by
//! [`into_current_bundle`]; nothing else in the crate knows about them.
//!
//! [`Environment`]: crate::environment::Environment

mod conversions;
mod legacy_types;
mod migrate;
mod normalize;

pub use conversions::{convert_legacy_bundle, into_current_bundle, is_legacy_bundle};
pub use legacy_types::{
    LEGACY_EXPORT_ID, LEGACY_MIGRATION_INDEX, LegacyBundle, LegacySubject, legacy_last_migration,
};
pub use migrate::{
    HIGHEST_MIGRATION_ID, MIGRATIONS, Migration, last_migration_of, migrate_environment,
    migrate_environments,
};
