//! In-process migration between two memory stores.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use super::invoker::{ConvertOptions, MigrationInvoker};
use crate::error::{MigratorError, Result};
use crate::store::{MemoryReleaseStore, ReleaseRecord};

/// Moves releases from a legacy [`MemoryReleaseStore`] to a current one.
///
/// Legacy records live under their tracking namespace and carry the namespace
/// the release is deployed to; the converted record is written there.
#[derive(Debug)]
pub struct MemoryMigrator {
    legacy: MemoryReleaseStore,
    current: MemoryReleaseStore,
    invocations: AtomicUsize,
    failure: Mutex<Option<String>>,
}

impl MemoryMigrator {
    pub fn new(legacy: MemoryReleaseStore, current: MemoryReleaseStore) -> Self {
        Self {
            legacy,
            current,
            invocations: AtomicUsize::new(0),
            failure: Mutex::new(None),
        }
    }

    /// Number of `convert` calls so far, failed ones included.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Make every following `convert` fail with `message`, or succeed again
    /// with `None`.
    pub fn fail_with(&self, message: Option<&str>) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = message.map(str::to_string);
    }
}

#[async_trait]
impl MigrationInvoker for MemoryMigrator {
    async fn convert(&self, options: &ConvertOptions) -> Result<()> {
        self.invocations.fetch_add(1, Ordering::SeqCst);

        let failed = |message: String| MigratorError::MigrationInvocation {
            release: options.release_name.clone(),
            message,
        };

        if let Some(message) = self
            .failure
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            return Err(failed(message));
        }

        let legacy = self
            .legacy
            .get(&options.legacy_namespace, &options.release_name)
            .filter(|record| !record.versions.is_empty())
            .ok_or_else(|| {
                failed(format!(
                    "no versions of the release in legacy namespace {}",
                    options.legacy_namespace
                ))
            })?;

        let target = legacy.namespace.clone();
        let existing = self.current.get(&target, &options.release_name);
        if existing.is_some() && !options.ignore_already_migrated {
            return Err(failed(format!(
                "release already exists in namespace {target}"
            )));
        }

        let mut versions = legacy.versions.clone();
        versions.sort_unstable();
        let keep = options.max_release_versions as usize;
        let carried = versions.split_off(versions.len().saturating_sub(keep));

        let mut merged = existing.map(|record| record.versions).unwrap_or_default();
        merged.extend(carried.iter().copied());
        merged.sort_unstable();
        merged.dedup();

        debug!(
            "Copying {} versions of {} into {}",
            carried.len(),
            options.release_name,
            target
        );
        self.current.insert(
            &target,
            ReleaseRecord {
                name: options.release_name.clone(),
                namespace: target.clone(),
                versions: merged,
            },
        );

        if options.delete_legacy_after_migration {
            debug!(
                "Deleting legacy versions of {} from {}",
                options.release_name, options.legacy_namespace
            );
            self.legacy
                .remove(&options.legacy_namespace, &options.release_name);
        }

        Ok(())
    }
}
