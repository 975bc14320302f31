//! In-process status store.

use std::collections::BTreeMap;
use std::sync::Mutex;

use super::traits::{StatusStore, TrackedResource};
use crate::error::{MigratorError, Result};
use crate::release::ResourceId;

/// Keeps tracked migrations in memory; contents are lost with the process.
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    records: Mutex<BTreeMap<ResourceId, TrackedResource>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<ResourceId, TrackedResource>>> {
        self.records
            .lock()
            .map_err(|e| MigratorError::Other(format!("Status store lock poisoned: {}", e)))
    }
}

impl StatusStore for MemoryStatusStore {
    fn insert(&self, resource: &TrackedResource) -> Result<()> {
        let mut records = self.records()?;
        if records.contains_key(&resource.id) {
            return Err(MigratorError::DuplicateRelease {
                id: resource.id.to_string(),
            });
        }
        records.insert(resource.id.clone(), resource.clone());
        Ok(())
    }

    fn load(&self, id: &ResourceId) -> Result<Option<TrackedResource>> {
        Ok(self.records()?.get(id).cloned())
    }

    fn save(&self, resource: &TrackedResource) -> Result<()> {
        match self.records()?.get_mut(&resource.id) {
            Some(existing) => {
                *existing = resource.clone();
                Ok(())
            }
            None => Err(MigratorError::ResourceNotFound {
                id: resource.id.to_string(),
            }),
        }
    }

    fn remove(&self, id: &ResourceId) -> Result<bool> {
        Ok(self.records()?.remove(id).is_some())
    }

    fn list(&self) -> Result<Vec<TrackedResource>> {
        Ok(self.records()?.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::{MigrationStatus, ResourceSpec};

    #[test]
    fn test_insert_rejects_duplicates() {
        let store = MemoryStatusStore::new();
        let resource = TrackedResource::new(ResourceSpec::new("app-a", "apps"), MigrationStatus::default());

        store.insert(&resource).unwrap();
        assert!(matches!(
            store.insert(&resource),
            Err(MigratorError::DuplicateRelease { .. })
        ));
    }

    #[test]
    fn test_save_requires_tracked_record() {
        let store = MemoryStatusStore::new();
        let mut resource =
            TrackedResource::new(ResourceSpec::new("app-a", "apps"), MigrationStatus::default());

        assert!(matches!(
            store.save(&resource),
            Err(MigratorError::ResourceNotFound { .. })
        ));

        store.insert(&resource).unwrap();
        resource.status.current_exists = true;
        resource.status.migration_complete = true;
        store.save(&resource).unwrap();
        assert_eq!(store.load(&resource.id).unwrap(), Some(resource.clone()));

        assert!(store.remove(&resource.id).unwrap());
        assert!(!store.remove(&resource.id).unwrap());
        assert!(store.list().unwrap().is_empty());
    }
}
