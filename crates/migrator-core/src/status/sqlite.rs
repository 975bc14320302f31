//! SQLite-backed status store.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use super::traits::{StatusStore, TrackedResource};
use crate::error::{MigratorError, Result};
use crate::release::{MigrationStatus, ResourceId, ResourceSpec};

const SELECT_COLUMNS: &str = r#"
    SELECT name, namespace, legacy_namespace, delete_legacy_after_migration,
           ignore_already_migrated, max_release_versions, legacy_exists,
           current_exists, migration_complete, cleanup_complete, updated_at
    FROM tracked_migrations
"#;

/// Tracked migrations in a single SQLite table keyed by `<namespace>/<name>`.
///
/// Thread-safe via internal mutex on the connection.
pub struct SqliteStatusStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStatusStore {
    /// Open (or create) the database at `db_path`.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| MigratorError::Config {
                message: format!(
                    "Failed to create status directory {}: {}",
                    parent.display(),
                    e
                ),
            })?;
        }

        let conn = Connection::open(db_path).map_err(|e| MigratorError::Database {
            message: format!("Failed to open status database: {}", e),
            source: Some(e),
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| MigratorError::Database {
                message: format!("Failed to set pragmas: {}", e),
                source: Some(e),
            })?;

        Self::with_connection(conn)
    }

    /// In-memory database, mostly useful for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tracked_migrations (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                namespace TEXT NOT NULL,
                legacy_namespace TEXT NOT NULL,
                delete_legacy_after_migration INTEGER NOT NULL,
                ignore_already_migrated INTEGER NOT NULL,
                max_release_versions INTEGER NOT NULL,
                legacy_exists INTEGER NOT NULL,
                current_exists INTEGER NOT NULL,
                migration_complete INTEGER NOT NULL,
                cleanup_complete INTEGER NOT NULL,
                updated_at TEXT NOT NULL,
                CHECK (cleanup_complete = 0 OR migration_complete = 1)
            );
            "#,
        )
        .map_err(|e| MigratorError::Database {
            message: format!("Failed to initialize status schema: {}", e),
            source: Some(e),
        })?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| MigratorError::Database {
            message: format!("Failed to lock database: {}", e),
            source: None,
        })
    }

    fn read_row(row: &Row<'_>) -> rusqlite::Result<(ResourceSpec, MigrationStatus, String)> {
        let spec = ResourceSpec {
            name: row.get(0)?,
            namespace: row.get(1)?,
            legacy_namespace: row.get(2)?,
            delete_legacy_after_migration: row.get(3)?,
            ignore_already_migrated: row.get(4)?,
            max_release_versions: row.get(5)?,
        };
        let status = MigrationStatus {
            legacy_exists: row.get(6)?,
            current_exists: row.get(7)?,
            migration_complete: row.get(8)?,
            cleanup_complete: row.get(9)?,
        };
        Ok((spec, status, row.get(10)?))
    }

    fn to_resource(
        (spec, status, updated_at): (ResourceSpec, MigrationStatus, String),
    ) -> Result<TrackedResource> {
        let updated_at = DateTime::parse_from_rfc3339(&updated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| MigratorError::Database {
                message: format!("Corrupt updated_at {:?} for {}: {}", updated_at, spec.id(), e),
                source: None,
            })?;
        Ok(TrackedResource {
            id: spec.id(),
            spec,
            status,
            updated_at,
        })
    }
}

impl StatusStore for SqliteStatusStore {
    fn insert(&self, resource: &TrackedResource) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let id = resource.id.to_string();

        let exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM tracked_migrations WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(MigratorError::DuplicateRelease { id });
        }

        let spec = &resource.spec;
        let status = &resource.status;
        tx.execute(
            r#"
            INSERT INTO tracked_migrations (
                id, name, namespace, legacy_namespace, delete_legacy_after_migration,
                ignore_already_migrated, max_release_versions, legacy_exists,
                current_exists, migration_complete, cleanup_complete, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                id,
                spec.name,
                spec.namespace,
                spec.legacy_namespace,
                spec.delete_legacy_after_migration,
                spec.ignore_already_migrated,
                spec.max_release_versions,
                status.legacy_exists,
                status.current_exists,
                status.migration_complete,
                status.cleanup_complete,
                resource.updated_at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;

        debug!("Tracking {}", id);
        Ok(())
    }

    fn load(&self, id: &ResourceId) -> Result<Option<TrackedResource>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![id.to_string()],
                Self::read_row,
            )
            .optional()
            .map_err(|e| MigratorError::Database {
                message: format!("Failed to load {}: {}", id, e),
                source: Some(e),
            })?;

        row.map(Self::to_resource).transpose()
    }

    fn save(&self, resource: &TrackedResource) -> Result<()> {
        let conn = self.lock()?;
        let spec = &resource.spec;
        let status = &resource.status;

        // A single UPDATE replaces the whole record atomically.
        let updated = conn.execute(
            r#"
            UPDATE tracked_migrations SET
                legacy_namespace = ?2,
                delete_legacy_after_migration = ?3,
                ignore_already_migrated = ?4,
                max_release_versions = ?5,
                legacy_exists = ?6,
                current_exists = ?7,
                migration_complete = ?8,
                cleanup_complete = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
            params![
                resource.id.to_string(),
                spec.legacy_namespace,
                spec.delete_legacy_after_migration,
                spec.ignore_already_migrated,
                spec.max_release_versions,
                status.legacy_exists,
                status.current_exists,
                status.migration_complete,
                status.cleanup_complete,
                resource.updated_at.to_rfc3339(),
            ],
        )?;

        if updated == 0 {
            return Err(MigratorError::ResourceNotFound {
                id: resource.id.to_string(),
            });
        }
        Ok(())
    }

    fn remove(&self, id: &ResourceId) -> Result<bool> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM tracked_migrations WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(removed > 0)
    }

    fn list(&self) -> Result<Vec<TrackedResource>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY id"))?;
        let rows = stmt
            .query_map([], Self::read_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(Self::to_resource).collect()
    }
}
