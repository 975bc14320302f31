//! Builder for configuring MigrationApi initialization.

use std::path::PathBuf;
use std::sync::Arc;

use crate::api::MigrationApi;
use crate::config::StoreConfigSource;
use crate::error::{MigratorError, Result};
use crate::status::{MemoryStatusStore, SqliteStatusStore, StatusStore};
use crate::store::{HttpStoreConnector, StoreConnector};

/// Builder for configuring MigrationApi initialization.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use release_migrator::{MigrationApi, StaticStoreConfig};
///
/// let config = StaticStoreConfig::new(
///     "http://legacy.internal",
///     "http://current.internal",
///     "http://migrator.internal",
/// )?;
/// let api = MigrationApi::builder()
///     .with_store_config(Arc::new(config))
///     .with_status_db("./data/migrations.sqlite")
///     .build()?;
/// ```
#[derive(Default)]
pub struct MigrationApiBuilder {
    connector: Option<Arc<dyn StoreConnector>>,
    store_config: Option<Arc<dyn StoreConfigSource>>,
    status_store: Option<Arc<dyn StatusStore>>,
    status_db: Option<PathBuf>,
}

impl MigrationApiBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a ready-made connector (for example in-memory stores).
    ///
    /// Takes precedence over `with_store_config`.
    pub fn with_connector(mut self, connector: Arc<dyn StoreConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Reach the stores over HTTP using this configuration.
    pub fn with_store_config(mut self, config: Arc<dyn StoreConfigSource>) -> Self {
        self.store_config = Some(config);
        self
    }

    /// Persist tracked migrations with a custom store.
    ///
    /// Takes precedence over `with_status_db`.
    pub fn with_status_store(mut self, store: Arc<dyn StatusStore>) -> Self {
        self.status_store = Some(store);
        self
    }

    /// Persist tracked migrations in a SQLite database at `path`.
    ///
    /// Default: in-memory, lost when the process exits.
    pub fn with_status_db(mut self, path: impl Into<PathBuf>) -> Self {
        self.status_db = Some(path.into());
        self
    }

    pub fn build(self) -> Result<MigrationApi> {
        let connector: Arc<dyn StoreConnector> = match (self.connector, self.store_config) {
            (Some(connector), _) => connector,
            (None, Some(config)) => Arc::new(HttpStoreConnector::new(config)?),
            (None, None) => {
                return Err(MigratorError::Config {
                    message: "No store connector or store configuration provided".to_string(),
                })
            }
        };

        let status_store: Arc<dyn StatusStore> = match (self.status_store, self.status_db) {
            (Some(store), _) => store,
            (None, Some(path)) => Arc::new(SqliteStatusStore::new(path)?),
            (None, None) => Arc::new(MemoryStatusStore::new()),
        };

        Ok(MigrationApi::new(connector, status_store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticStoreConfig;
    use crate::store::{MemoryReleaseStore, MemoryStoreConnector};
    use tempfile::TempDir;

    #[test]
    fn test_build_requires_stores() {
        assert!(matches!(
            MigrationApiBuilder::new().build(),
            Err(MigratorError::Config { .. })
        ));
    }

    #[test]
    fn test_build_with_http_config_and_db() {
        let temp_dir = TempDir::new().unwrap();
        let config = StaticStoreConfig::new(
            "http://legacy.local",
            "http://current.local",
            "http://migrator.local",
        )
        .unwrap();

        let api = MigrationApi::builder()
            .with_store_config(Arc::new(config))
            .with_status_db(temp_dir.path().join("migrations.sqlite"))
            .build()
            .unwrap();

        assert!(api.list().unwrap().is_empty());
        assert!(temp_dir.path().join("migrations.sqlite").exists());
    }

    #[test]
    fn test_build_with_memory_connector() {
        let connector = MemoryStoreConnector::new(MemoryReleaseStore::new(), MemoryReleaseStore::new());
        let api = MigrationApi::builder()
            .with_connector(Arc::new(connector))
            .build()
            .unwrap();
        assert!(api.list().unwrap().is_empty());
    }
}
