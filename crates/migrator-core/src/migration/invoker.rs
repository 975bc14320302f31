//! The migration invoker contract and its HTTP client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::StoreEndpoint;
use crate::error::{MigratorError, Result};
use crate::release::{MigrationOptions, ReleaseRef};

/// Everything the migration needs to copy one release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConvertOptions {
    pub release_name: String,
    pub legacy_namespace: String,
    pub delete_legacy_after_migration: bool,
    pub max_release_versions: u32,
    pub ignore_already_migrated: bool,
}

impl ConvertOptions {
    pub fn new(release: &ReleaseRef, options: &MigrationOptions) -> Self {
        Self {
            release_name: release.name.clone(),
            legacy_namespace: release.legacy_namespace.clone(),
            delete_legacy_after_migration: options.delete_legacy_after_migration,
            max_release_versions: options.max_release_versions,
            ignore_already_migrated: options.ignore_already_migrated,
        }
    }
}

/// Copies a release from the legacy store to the current store.
///
/// Atomic-or-failed: on `Ok` the current store holds the release. Whether an
/// already-migrated release is an error is decided here, by
/// `ignore_already_migrated`, not by the caller.
#[async_trait]
pub trait MigrationInvoker: Send + Sync {
    async fn convert(&self, options: &ConvertOptions) -> Result<()>;
}

/// Invokes a remote migration service: `POST {base}/convert` with the
/// options as a JSON body.
pub struct HttpMigrationInvoker {
    client: Client,
    endpoint: StoreEndpoint,
}

impl HttpMigrationInvoker {
    pub fn new(client: Client, endpoint: StoreEndpoint) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl MigrationInvoker for HttpMigrationInvoker {
    async fn convert(&self, options: &ConvertOptions) -> Result<()> {
        let url = self.endpoint.url_for(&["convert"]);
        debug!("POST {} for release {}", url, options.release_name);

        let failed = |message: String| MigratorError::MigrationInvocation {
            release: options.release_name.clone(),
            message,
        };

        let response = self
            .client
            .post(&url)
            .timeout(self.endpoint.timeout)
            .json(options)
            .send()
            .await
            .map_err(|e| failed(format!("POST {} failed: {}", url, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(failed(if body.is_empty() {
            format!("migration service returned {}", status)
        } else {
            format!("migration service returned {}: {}", status, body.trim())
        }))
    }
}
