//! Per-pass wiring of store probes and the migration invoker.
//!
//! A connector resolves the configuration for one release and hands back the
//! collaborators a reconciliation pass works with. Configuration errors
//! surface here, before anything is probed.

use std::sync::Arc;

use reqwest::Client;

use super::http::{build_client, HttpReleaseLookup};
use super::memory::MemoryReleaseStore;
use super::probe::{ReleaseProbe, StoreProbe};
use crate::config::{StoreConfigSource, StoreKind};
use crate::error::Result;
use crate::migration::{HttpMigrationInvoker, MemoryMigrator, MigrationInvoker};
use crate::release::ReleaseRef;

/// Collaborators for one reconciliation pass.
#[derive(Clone)]
pub struct StoreHandles {
    pub legacy: Arc<dyn StoreProbe>,
    pub current: Arc<dyn StoreProbe>,
    pub invoker: Arc<dyn MigrationInvoker>,
}

/// Builds [`StoreHandles`] for a release.
pub trait StoreConnector: Send + Sync {
    fn connect(&self, release: &ReleaseRef) -> Result<StoreHandles>;
}

/// Reaches both stores and the migration service over HTTP.
pub struct HttpStoreConnector {
    config: Arc<dyn StoreConfigSource>,
    client: Client,
}

impl HttpStoreConnector {
    pub fn new(config: Arc<dyn StoreConfigSource>) -> Result<Self> {
        Ok(Self {
            config,
            client: build_client()?,
        })
    }
}

impl StoreConnector for HttpStoreConnector {
    fn connect(&self, release: &ReleaseRef) -> Result<StoreHandles> {
        let legacy = self.config.legacy_endpoint(&release.legacy_namespace)?;
        let current = self.config.current_endpoint(&release.namespace)?;
        let migrator = self.config.migrator_endpoint(&release.legacy_namespace)?;

        Ok(StoreHandles {
            legacy: Arc::new(ReleaseProbe::new(
                StoreKind::Legacy,
                HttpReleaseLookup::new(StoreKind::Legacy, self.client.clone(), legacy),
            )),
            current: Arc::new(ReleaseProbe::new(
                StoreKind::Current,
                HttpReleaseLookup::new(StoreKind::Current, self.client.clone(), current),
            )),
            invoker: Arc::new(HttpMigrationInvoker::new(self.client.clone(), migrator)),
        })
    }
}

/// Serves every release from in-process stores.
#[derive(Clone)]
pub struct MemoryStoreConnector {
    legacy: MemoryReleaseStore,
    current: MemoryReleaseStore,
    migrator: Arc<MemoryMigrator>,
}

impl MemoryStoreConnector {
    pub fn new(legacy: MemoryReleaseStore, current: MemoryReleaseStore) -> Self {
        let migrator = Arc::new(MemoryMigrator::new(legacy.clone(), current.clone()));
        Self {
            legacy,
            current,
            migrator,
        }
    }

    pub fn legacy(&self) -> &MemoryReleaseStore {
        &self.legacy
    }

    pub fn current(&self) -> &MemoryReleaseStore {
        &self.current
    }

    pub fn migrator(&self) -> &Arc<MemoryMigrator> {
        &self.migrator
    }
}

impl StoreConnector for MemoryStoreConnector {
    fn connect(&self, _release: &ReleaseRef) -> Result<StoreHandles> {
        Ok(StoreHandles {
            legacy: Arc::new(ReleaseProbe::new(StoreKind::Legacy, self.legacy.clone())),
            current: Arc::new(ReleaseProbe::new(StoreKind::Current, self.current.clone())),
            invoker: self.migrator.clone(),
        })
    }
}
