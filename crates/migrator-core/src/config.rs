//! Centralized configuration for the release migrator.
//!
//! Holds resource defaults, network timeouts and the store endpoint
//! configuration that is passed explicitly into every reconciliation pass.

use std::time::Duration;

use url::Url;

use crate::error::{MigratorError, Result};

/// Defaults applied to optional resource fields.
pub struct ResourceDefaults;

impl ResourceDefaults {
    pub const LEGACY_NAMESPACE: &'static str = "kube-system";
    pub const MAX_RELEASE_VERSIONS: u32 = 10;
    pub const DELETE_LEGACY_AFTER_MIGRATION: bool = false;
    pub const IGNORE_ALREADY_MIGRATED: bool = false;
}

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const PROBE_TIMEOUT: Duration = Duration::from_secs(15);
    /// Conversions copy every carried-over version, so they get a longer budget.
    pub const MIGRATION_TIMEOUT: Duration = Duration::from_secs(300);
    pub const USER_AGENT: &'static str = "Release-Migrator/1.0";
}

/// Shared file and path names.
pub struct PathsConfig;

impl PathsConfig {
    pub const STATUS_DB_FILENAME: &'static str = "migrations.sqlite";
}

/// The two release stores a migration moves between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Legacy,
    Current,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Legacy => "legacy",
            StoreKind::Current => "current",
        }
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a store (or the migration service) is reached, and how long a
/// single request may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEndpoint {
    pub base_url: Url,
    pub timeout: Duration,
}

impl StoreEndpoint {
    /// Parse and validate an endpoint. Only http and https are accepted.
    pub fn parse(raw: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(raw).map_err(|e| MigratorError::Config {
            message: format!("Invalid store URL {raw:?}: {e}"),
        })?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(MigratorError::Config {
                message: format!(
                    "Unsupported scheme {:?} in store URL {raw:?}",
                    base_url.scheme()
                ),
            });
        }

        if timeout.is_zero() {
            return Err(MigratorError::Config {
                message: format!("Timeout for {raw:?} must be non-zero"),
            });
        }

        Ok(Self { base_url, timeout })
    }

    /// Build a request URL below the base, percent-encoding each segment.
    pub fn url_for(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.as_str().trim_end_matches('/').to_string();
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }
}

/// Resolves store configuration per namespace.
///
/// The legacy store is keyed by its tracking namespace, the current store by
/// the release namespace.
pub trait StoreConfigSource: Send + Sync {
    fn legacy_endpoint(&self, legacy_namespace: &str) -> Result<StoreEndpoint>;

    fn current_endpoint(&self, namespace: &str) -> Result<StoreEndpoint>;

    /// Endpoint of the migration service that performs the data copy.
    fn migrator_endpoint(&self, legacy_namespace: &str) -> Result<StoreEndpoint>;
}

/// One fixed endpoint per store, regardless of namespace.
#[derive(Debug, Clone)]
pub struct StaticStoreConfig {
    legacy: StoreEndpoint,
    current: StoreEndpoint,
    migrator: StoreEndpoint,
}

impl StaticStoreConfig {
    /// Validate all three URLs up front so a malformed configuration fails
    /// before the first probe.
    pub fn new(legacy_url: &str, current_url: &str, migrator_url: &str) -> Result<Self> {
        Ok(Self {
            legacy: StoreEndpoint::parse(legacy_url, NetworkConfig::PROBE_TIMEOUT)?,
            current: StoreEndpoint::parse(current_url, NetworkConfig::PROBE_TIMEOUT)?,
            migrator: StoreEndpoint::parse(migrator_url, NetworkConfig::MIGRATION_TIMEOUT)?,
        })
    }
}

impl StoreConfigSource for StaticStoreConfig {
    fn legacy_endpoint(&self, _legacy_namespace: &str) -> Result<StoreEndpoint> {
        Ok(self.legacy.clone())
    }

    fn current_endpoint(&self, _namespace: &str) -> Result<StoreEndpoint> {
        Ok(self.current.clone())
    }

    fn migrator_endpoint(&self, _legacy_namespace: &str) -> Result<StoreEndpoint> {
        Ok(self.migrator.clone())
    }
}
