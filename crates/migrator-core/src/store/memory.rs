//! In-process release store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::probe::{LookupError, ReleaseLookup, ReleaseRecord};

type ReleaseKey = (String, String);

/// Release records keyed by `(namespace, name)`.
///
/// Clones share the same contents. `set_unavailable(true)` makes every lookup
/// fail as a backend error, standing in for an unreachable store.
#[derive(Debug, Clone, Default)]
pub struct MemoryReleaseStore {
    releases: Arc<RwLock<BTreeMap<ReleaseKey, ReleaseRecord>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryReleaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record under `namespace`, replacing any existing one.
    pub fn insert(&self, namespace: &str, record: ReleaseRecord) {
        let key = (namespace.to_string(), record.name.clone());
        self.write().insert(key, record);
    }

    pub fn get(&self, namespace: &str, name: &str) -> Option<ReleaseRecord> {
        self.read()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn contains(&self, namespace: &str, name: &str) -> bool {
        self.get(namespace, name).is_some()
    }

    pub fn remove(&self, namespace: &str, name: &str) -> Option<ReleaseRecord> {
        self.write()
            .remove(&(namespace.to_string(), name.to_string()))
    }

    /// Copy of the full contents, ordered by namespace then name.
    pub fn snapshot(&self) -> BTreeMap<ReleaseKey, ReleaseRecord> {
        self.read().clone()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn is_unavailable(&self) -> bool {
        self.unavailable.load(Ordering::SeqCst)
    }

    // A poisoned lock only means a writer panicked mid-insert; the map is
    // still structurally valid.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<ReleaseKey, ReleaseRecord>> {
        self.releases.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<ReleaseKey, ReleaseRecord>> {
        self.releases.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ReleaseLookup for MemoryReleaseStore {
    async fn lookup(
        &self,
        namespace: &str,
        name: &str,
    ) -> std::result::Result<ReleaseRecord, LookupError> {
        if self.is_unavailable() {
            return Err(LookupError::Backend(format!(
                "store unavailable while looking up {namespace}/{name}"
            )));
        }
        self.get(namespace, name).ok_or(LookupError::NotFound)
    }
}
