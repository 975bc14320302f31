//! Release Migrator - headless library for moving releases between stores.
//!
//! A tracked migration names one release. Each reconciliation pass probes the
//! legacy store and the current store, invokes the migration only while the
//! release is still legacy-only, and derives a status record from what the
//! stores hold afterwards. Repeated passes converge without re-running a
//! migration that already happened.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use release_migrator::{MigrationApi, ResourceSpec, StaticStoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> release_migrator::Result<()> {
//!     let config = StaticStoreConfig::new(
//!         "http://legacy.internal",
//!         "http://current.internal",
//!         "http://migrator.internal",
//!     )?;
//!     let api = MigrationApi::builder()
//!         .with_store_config(Arc::new(config))
//!         .with_status_db("./migrations.sqlite")
//!         .build()?;
//!
//!     let tracked = api.create(ResourceSpec::new("app-a", "apps")).await?;
//!     println!("{}: {:?}", tracked.id, tracked.status);
//!
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod migration;
pub mod release;
pub mod status;
pub mod store;

mod api;

pub use api::{MigrationApi, MigrationApiBuilder};
pub use cancel::{CancellationToken, CancelledError};
pub use config::{
    NetworkConfig, PathsConfig, ResourceDefaults, StaticStoreConfig, StoreConfigSource,
    StoreEndpoint, StoreKind,
};
pub use error::{MigratorError, Result};
pub use migration::{
    ConvertOptions, CreateOutcome, HttpMigrationInvoker, MemoryMigrator, MigrationInvoker,
    MigrationReconciler, Observation,
};
pub use release::{MigrationOptions, MigrationStatus, ReleaseRef, ResourceId, ResourceSpec};
pub use status::{MemoryStatusStore, SqliteStatusStore, StatusStore, TrackedResource};
pub use store::{
    HttpReleaseLookup, HttpStoreConnector, LookupError, MemoryReleaseStore, MemoryStoreConnector,
    ProbeOutcome, ReleaseLookup, ReleaseProbe, ReleaseRecord, StoreConnector, StoreHandles,
    StoreProbe,
};
