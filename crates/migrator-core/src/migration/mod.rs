//! Migration reconciliation.
//!
//! The [`MigrationReconciler`] compares what the two stores hold for a
//! release, invokes the migration only while the release is still legacy-only,
//! and derives the status record from what it observes afterwards.

mod invoker;
mod memory;
mod reconciler;

pub use invoker::{ConvertOptions, HttpMigrationInvoker, MigrationInvoker};
pub use memory::MemoryMigrator;
pub use reconciler::{CreateOutcome, MigrationReconciler, Observation};
