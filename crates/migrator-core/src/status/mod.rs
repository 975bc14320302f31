//! Persistence of tracked migrations between reconciliation passes.
//!
//! Records are only written after a pass has finished successfully, so a
//! failed or cancelled pass leaves the previous status in place.

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryStatusStore;
pub use sqlite::SqliteStatusStore;
pub use traits::{StatusStore, TrackedResource};
