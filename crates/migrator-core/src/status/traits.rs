//! Status store trait and the tracked record it persists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::release::{MigrationStatus, ResourceId, ResourceSpec};

/// One tracked migration: declared spec plus the last derived status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TrackedResource {
    pub id: ResourceId,
    pub spec: ResourceSpec,
    pub status: MigrationStatus,
    pub updated_at: DateTime<Utc>,
}

impl TrackedResource {
    pub fn new(spec: ResourceSpec, status: MigrationStatus) -> Self {
        Self {
            id: spec.id(),
            spec,
            status,
            updated_at: Utc::now(),
        }
    }
}

/// Persists tracked migrations between passes.
///
/// Every write replaces a whole record, so a reader never sees a status that
/// mixes two passes. All operations are synchronous to match rusqlite's API.
pub trait StatusStore: Send + Sync {
    /// Start tracking a resource.
    ///
    /// Fails with `DuplicateRelease` if the id is already tracked.
    fn insert(&self, resource: &TrackedResource) -> Result<()>;

    fn load(&self, id: &ResourceId) -> Result<Option<TrackedResource>>;

    /// Replace an existing record.
    ///
    /// Fails with `ResourceNotFound` if the id is not tracked.
    fn save(&self, resource: &TrackedResource) -> Result<()>;

    /// Stop tracking a resource. Returns whether it was tracked.
    fn remove(&self, id: &ResourceId) -> Result<bool>;

    /// All tracked resources, ordered by id.
    fn list(&self) -> Result<Vec<TrackedResource>>;
}
