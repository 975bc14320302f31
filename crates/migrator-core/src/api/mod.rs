//! Resource lifecycle API: create, read, update, delete, exists, import.
//!
//! `MigrationApi` is what a declarative-resource driver talks to. It connects
//! to the stores for each pass, runs the reconciler, and persists the result
//! only once the pass has succeeded.

mod builder;

pub use builder::MigrationApiBuilder;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::debug;

use crate::cancel::CancellationToken;
use crate::error::{MigratorError, Result};
use crate::migration::MigrationReconciler;
use crate::release::{ResourceId, ResourceSpec};
use crate::status::{StatusStore, TrackedResource};
use crate::store::StoreConnector;

type PassRegistry = Mutex<HashMap<ResourceId, CancellationToken>>;

/// Main entry point for driving release migrations.
pub struct MigrationApi {
    connector: Arc<dyn StoreConnector>,
    status_store: Arc<dyn StatusStore>,
    /// Cancellation tokens of running passes, one per resource id.
    passes: PassRegistry,
}

/// Unregisters a running pass when dropped.
struct PassGuard<'a> {
    passes: &'a PassRegistry,
    id: ResourceId,
    token: CancellationToken,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut passes) = self.passes.lock() {
            passes.remove(&self.id);
        }
    }
}

impl MigrationApi {
    /// Create a builder for MigrationApi.
    pub fn builder() -> MigrationApiBuilder {
        MigrationApiBuilder::new()
    }

    pub(crate) fn new(connector: Arc<dyn StoreConnector>, status_store: Arc<dyn StatusStore>) -> Self {
        Self {
            connector,
            status_store,
            passes: Mutex::new(HashMap::new()),
        }
    }

    /// Register a pass for `id`. Passes for the same id never overlap.
    fn begin_pass(&self, id: &ResourceId) -> Result<PassGuard<'_>> {
        let mut passes = self
            .passes
            .lock()
            .map_err(|e| MigratorError::Other(format!("Pass registry lock poisoned: {}", e)))?;
        if passes.contains_key(id) {
            return Err(MigratorError::PassInProgress { id: id.to_string() });
        }
        let token = CancellationToken::new();
        passes.insert(id.clone(), token.clone());
        Ok(PassGuard {
            passes: &self.passes,
            id: id.clone(),
            token,
        })
    }

    fn load_tracked(&self, id: &ResourceId) -> Result<TrackedResource> {
        self.status_store
            .load(id)?
            .ok_or_else(|| MigratorError::ResourceNotFound { id: id.to_string() })
    }

    fn ensure_untracked(&self, id: &ResourceId) -> Result<()> {
        if self.status_store.load(id)?.is_some() {
            return Err(MigratorError::DuplicateRelease { id: id.to_string() });
        }
        Ok(())
    }

    /// Start tracking a release and migrate it if it is still legacy-only.
    pub async fn create(&self, spec: ResourceSpec) -> Result<TrackedResource> {
        spec.validate()?;
        let id = spec.id();
        self.ensure_untracked(&id)?;

        let pass = self.begin_pass(&id)?;
        let handles = self.connector.connect(&spec.release())?;
        let outcome = MigrationReconciler::new(&handles, &pass.token)
            .create(&spec)
            .await?;

        let resource = TrackedResource::new(spec, outcome.status);
        self.status_store.insert(&resource)?;
        Ok(resource)
    }

    /// Re-derive the status of a tracked release from the stores.
    pub async fn read(&self, id: &ResourceId) -> Result<TrackedResource> {
        let mut resource = self.load_tracked(id)?;

        let pass = self.begin_pass(id)?;
        let handles = self.connector.connect(&resource.spec.release())?;
        let status = MigrationReconciler::new(&handles, &pass.token)
            .read(&resource.spec.release())
            .await?;

        resource.status = status;
        resource.updated_at = Utc::now();
        self.status_store.save(&resource)?;
        Ok(resource)
    }

    /// Change mutable options. Never probes or migrates.
    pub async fn update(&self, id: &ResourceId, desired: ResourceSpec) -> Result<TrackedResource> {
        let mut resource = self.load_tracked(id)?;
        MigrationReconciler::update(&resource.spec, &desired)?;

        let _pass = self.begin_pass(id)?;
        resource.spec = desired;
        resource.updated_at = Utc::now();
        self.status_store.save(&resource)?;
        Ok(resource)
    }

    /// Stop tracking a release. Store contents are never touched.
    ///
    /// Returns whether the release was tracked.
    pub async fn delete(&self, id: &ResourceId) -> Result<bool> {
        let _pass = self.begin_pass(id)?;
        MigrationReconciler::delete(id);
        self.status_store.remove(id)
    }

    /// Whether the current store holds the tracked release.
    pub async fn exists(&self, id: &ResourceId) -> Result<bool> {
        let resource = self.load_tracked(id)?;
        let handles = self.connector.connect(&resource.spec.release())?;
        let cancel = CancellationToken::new();
        MigrationReconciler::new(&handles, &cancel)
            .exists(&resource.spec.release())
            .await
    }

    /// Adopt an existing release by its `<namespace>/<name>` id with default
    /// options. Only reads the stores.
    pub async fn import(&self, id: &str) -> Result<TrackedResource> {
        let id: ResourceId = id.parse()?;
        let spec = ResourceSpec::new(id.name.clone(), id.namespace.clone());
        spec.validate()?;
        self.ensure_untracked(&id)?;

        let pass = self.begin_pass(&id)?;
        let handles = self.connector.connect(&spec.release())?;
        let status = MigrationReconciler::new(&handles, &pass.token)
            .read(&spec.release())
            .await?;

        debug!("[import: {}] {:?}", id, status);
        let resource = TrackedResource::new(spec, status);
        self.status_store.insert(&resource)?;
        Ok(resource)
    }

    pub fn list(&self) -> Result<Vec<TrackedResource>> {
        self.status_store.list()
    }

    /// Cancel the running pass for `id`, if any.
    ///
    /// The pass stops at its next checkpoint and records no status.
    pub fn cancel_pass(&self, id: &ResourceId) -> bool {
        match self.passes.lock() {
            Ok(passes) => match passes.get(id) {
                Some(token) => {
                    token.cancel();
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }
}
