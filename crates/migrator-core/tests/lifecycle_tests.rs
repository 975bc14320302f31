//! Integration tests for the MigrationApi resource lifecycle.
//!
//! These tests drive create/read/update/delete/import through the public API
//! against in-memory stores and check the convergence guarantees a
//! declarative-resource driver relies on.

use std::sync::Arc;

use release_migrator::{
    MemoryReleaseStore, MemoryStoreConnector, MigrationApi, MigrationStatus, MigratorError,
    ReleaseRecord, ResourceId, ResourceSpec, SqliteStatusStore,
};
use tempfile::TempDir;

/// Fresh API over empty in-memory stores.
fn create_test_env() -> (MemoryStoreConnector, MigrationApi) {
    let connector = MemoryStoreConnector::new(MemoryReleaseStore::new(), MemoryReleaseStore::new());
    let api = MigrationApi::builder()
        .with_connector(Arc::new(connector.clone()))
        .build()
        .expect("Failed to build api");
    (connector, api)
}

fn seed_legacy(connector: &MemoryStoreConnector, name: &str, versions: Vec<u32>) {
    connector.legacy().insert(
        "kube-system",
        ReleaseRecord {
            name: name.into(),
            namespace: "apps".into(),
            versions,
        },
    );
}

fn seed_current(connector: &MemoryStoreConnector, name: &str, versions: Vec<u32>) {
    connector.current().insert(
        "apps",
        ReleaseRecord {
            name: name.into(),
            namespace: "apps".into(),
            versions,
        },
    );
}

#[tokio::test]
async fn test_legacy_only_release_is_migrated_once() {
    let (connector, api) = create_test_env();
    seed_legacy(&connector, "app-a", vec![1, 2, 3, 4, 5]);

    let created = api.create(ResourceSpec::new("app-a", "apps")).await.unwrap();

    assert_eq!(
        created.status,
        MigrationStatus {
            legacy_exists: true,
            current_exists: true,
            migration_complete: true,
            cleanup_complete: false,
        }
    );
    assert_eq!(created.id.to_string(), "apps/app-a");
    assert_eq!(connector.migrator().invocations(), 1);
    assert_eq!(
        connector.current().get("apps", "app-a").unwrap().versions,
        vec![1, 2, 3, 4, 5]
    );

    // Later passes converge without migrating again.
    let read = api.read(&created.id).await.unwrap();
    assert_eq!(read.status, created.status);
    assert_eq!(connector.migrator().invocations(), 1);
}

#[tokio::test]
async fn test_legacy_deleted_after_migration_when_requested() {
    let (connector, api) = create_test_env();
    seed_legacy(&connector, "app-a", vec![1, 2, 3, 4, 5]);

    let mut spec = ResourceSpec::new("app-a", "apps");
    spec.delete_legacy_after_migration = true;
    let created = api.create(spec).await.unwrap();

    assert_eq!(
        created.status,
        MigrationStatus {
            legacy_exists: false,
            current_exists: true,
            migration_complete: true,
            cleanup_complete: true,
        }
    );
    assert!(!connector.legacy().contains("kube-system", "app-a"));
}

#[tokio::test]
async fn test_max_release_versions_limits_carried_history() {
    let (connector, api) = create_test_env();
    seed_legacy(&connector, "app-a", (1..=15).collect());

    let mut spec = ResourceSpec::new("app-a", "apps");
    spec.max_release_versions = 4;
    api.create(spec).await.unwrap();

    assert_eq!(
        connector.current().get("apps", "app-a").unwrap().versions,
        vec![12, 13, 14, 15]
    );
}

#[tokio::test]
async fn test_already_migrated_release_is_not_invoked() {
    let (connector, api) = create_test_env();
    seed_current(&connector, "app-a", vec![1, 2]);

    let created = api.create(ResourceSpec::new("app-a", "apps")).await.unwrap();

    assert!(created.status.migration_complete);
    assert!(!created.status.legacy_exists);
    assert_eq!(connector.migrator().invocations(), 0);
}

#[tokio::test]
async fn test_retained_legacy_copy_is_left_alone_by_default() {
    let (connector, api) = create_test_env();
    seed_legacy(&connector, "app-a", vec![1, 2]);
    seed_current(&connector, "app-a", vec![1, 2]);

    let created = api.create(ResourceSpec::new("app-a", "apps")).await.unwrap();

    assert!(created.status.migration_complete);
    assert!(!created.status.cleanup_complete);
    assert_eq!(connector.migrator().invocations(), 0);
}

#[tokio::test]
async fn test_retained_legacy_copy_cleaned_up_with_ignore_flag() {
    let (connector, api) = create_test_env();
    seed_legacy(&connector, "app-a", vec![1, 2]);
    seed_current(&connector, "app-a", vec![1, 2]);

    let mut spec = ResourceSpec::new("app-a", "apps");
    spec.delete_legacy_after_migration = true;
    spec.ignore_already_migrated = true;
    let created = api.create(spec).await.unwrap();

    assert_eq!(connector.migrator().invocations(), 1);
    assert!(created.status.cleanup_complete);
    assert!(!connector.legacy().contains("kube-system", "app-a"));
}

#[tokio::test]
async fn test_retained_legacy_copy_reports_cleanup_pending() {
    let (connector, api) = create_test_env();
    seed_legacy(&connector, "app-a", vec![1, 2]);
    seed_current(&connector, "app-a", vec![1, 2]);

    let mut spec = ResourceSpec::new("app-a", "apps");
    spec.delete_legacy_after_migration = true;
    let created = api.create(spec).await.unwrap();

    assert_eq!(
        created.status,
        MigrationStatus {
            legacy_exists: true,
            current_exists: true,
            migration_complete: true,
            cleanup_complete: false,
        }
    );
    assert_eq!(connector.migrator().invocations(), 0);
    assert!(connector.legacy().contains("kube-system", "app-a"));
    assert_eq!(api.list().unwrap().len(), 1);
}

#[tokio::test]
async fn test_current_release_without_versions_counts_as_migrated() {
    let (connector, api) = create_test_env();
    seed_legacy(&connector, "app-a", vec![1, 2]);
    seed_current(&connector, "app-a", vec![]);

    let created = api.create(ResourceSpec::new("app-a", "apps")).await.unwrap();

    assert!(created.status.current_exists);
    assert!(created.status.migration_complete);
    assert_eq!(connector.migrator().invocations(), 0);
}

#[tokio::test]
async fn test_release_missing_everywhere_fails() {
    let (connector, api) = create_test_env();

    let err = api
        .create(ResourceSpec::new("app-a", "apps"))
        .await
        .unwrap_err();
    assert!(matches!(err, MigratorError::NotFoundEverywhere { .. }));
    assert!(api.list().unwrap().is_empty());

    let err = api.import("apps/app-a").await.unwrap_err();
    assert!(matches!(err, MigratorError::NotFoundEverywhere { .. }));
    assert_eq!(connector.migrator().invocations(), 0);
}

#[tokio::test]
async fn test_read_fails_once_release_vanishes() {
    let (connector, api) = create_test_env();
    seed_current(&connector, "app-a", vec![1]);
    let created = api.create(ResourceSpec::new("app-a", "apps")).await.unwrap();

    connector.current().remove("apps", "app-a");

    let err = api.read(&created.id).await.unwrap_err();
    assert!(matches!(err, MigratorError::NotFoundEverywhere { .. }));
    assert_eq!(api.list().unwrap()[0].status, created.status);
}

#[tokio::test]
async fn test_read_is_idempotent() {
    let (connector, api) = create_test_env();
    seed_legacy(&connector, "app-a", vec![1]);
    let created = api.create(ResourceSpec::new("app-a", "apps")).await.unwrap();

    let first = api.read(&created.id).await.unwrap();
    let second = api.read(&created.id).await.unwrap();

    assert_eq!(first.status, second.status);
    assert_eq!(first.spec, second.spec);
}

#[tokio::test]
async fn test_cleanup_never_reported_without_migration() {
    let (connector, api) = create_test_env();
    seed_legacy(&connector, "legacy-only", vec![1]);
    seed_legacy(&connector, "both", vec![1]);
    seed_current(&connector, "both", vec![1]);
    seed_current(&connector, "current-only", vec![1]);

    for name in ["legacy-only", "both", "current-only"] {
        let tracked = api.import(&format!("apps/{name}")).await.unwrap();
        let status = tracked.status;
        assert!(
            !status.cleanup_complete || status.migration_complete,
            "{name}: {status:?}"
        );
    }

    let pending = api
        .read(&"apps/legacy-only".parse().unwrap())
        .await
        .unwrap();
    assert!(!pending.status.migration_complete);
    assert!(!pending.status.cleanup_complete);
}

#[tokio::test]
async fn test_update_never_invokes_migration() {
    let (connector, api) = create_test_env();
    seed_legacy(&connector, "app-a", vec![1, 2, 3]);
    let created = api.create(ResourceSpec::new("app-a", "apps")).await.unwrap();
    let before = connector.current().snapshot();

    let mut desired = created.spec.clone();
    desired.ignore_already_migrated = true;
    desired.max_release_versions = 1;
    let updated = api.update(&created.id, desired.clone()).await.unwrap();

    assert_eq!(updated.spec, desired);
    assert_eq!(updated.status, created.status);
    assert_eq!(connector.migrator().invocations(), 1);
    assert_eq!(connector.current().snapshot(), before);
}

#[tokio::test]
async fn test_update_of_immutable_field_requires_replacement() {
    let (connector, api) = create_test_env();
    seed_legacy(&connector, "app-a", vec![1]);
    let created = api.create(ResourceSpec::new("app-a", "apps")).await.unwrap();

    let mut desired = created.spec.clone();
    desired.legacy_namespace = "tiller".into();

    let err = api.update(&created.id, desired).await.unwrap_err();
    assert!(matches!(err, MigratorError::ReplacementRequired { .. }));
    assert_eq!(connector.migrator().invocations(), 1);
}

#[tokio::test]
async fn test_delete_leaves_stores_untouched() {
    let (connector, api) = create_test_env();
    seed_legacy(&connector, "app-a", vec![1, 2]);
    let created = api.create(ResourceSpec::new("app-a", "apps")).await.unwrap();

    let legacy_before = connector.legacy().snapshot();
    let current_before = connector.current().snapshot();

    assert!(api.delete(&created.id).await.unwrap());

    assert_eq!(connector.legacy().snapshot(), legacy_before);
    assert_eq!(connector.current().snapshot(), current_before);
    assert!(api.list().unwrap().is_empty());

    // Re-adopting after delete sees the same stores.
    let imported = api.import("apps/app-a").await.unwrap();
    assert_eq!(imported.status, created.status);
}

#[tokio::test]
async fn test_probe_failure_aborts_without_status() {
    let (connector, api) = create_test_env();
    seed_legacy(&connector, "app-a", vec![1]);
    connector.legacy().set_unavailable(true);

    let err = api
        .create(ResourceSpec::new("app-a", "apps"))
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(connector.migrator().invocations(), 0);
    assert!(api.list().unwrap().is_empty());
}

#[tokio::test]
async fn test_migration_failure_records_nothing() {
    let (connector, api) = create_test_env();
    seed_legacy(&connector, "app-a", vec![1]);
    connector.migrator().fail_with(Some("tiller unreachable"));

    let err = api
        .create(ResourceSpec::new("app-a", "apps"))
        .await
        .unwrap_err();
    assert!(matches!(err, MigratorError::MigrationInvocation { .. }));
    assert!(api.list().unwrap().is_empty());

    // Once the migration service recovers, create converges.
    connector.migrator().fail_with(None);
    let created = api.create(ResourceSpec::new("app-a", "apps")).await.unwrap();
    assert!(created.status.migration_complete);
    assert_eq!(connector.migrator().invocations(), 2);
}

#[tokio::test]
async fn test_exists_reflects_current_store() {
    let (connector, api) = create_test_env();
    seed_legacy(&connector, "app-a", vec![1]);
    seed_current(&connector, "app-b", vec![1]);

    let a = api.import("apps/app-a").await.unwrap();
    let b = api.import("apps/app-b").await.unwrap();

    assert!(!api.exists(&a.id).await.unwrap());
    assert!(api.exists(&b.id).await.unwrap());
}

#[tokio::test]
async fn test_status_persists_in_sqlite() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("migrations.sqlite");
    let connector = MemoryStoreConnector::new(MemoryReleaseStore::new(), MemoryReleaseStore::new());
    seed_legacy(&connector, "app-a", vec![1, 2]);

    let id: ResourceId = "apps/app-a".parse().unwrap();
    {
        let api = MigrationApi::builder()
            .with_connector(Arc::new(connector.clone()))
            .with_status_store(Arc::new(SqliteStatusStore::new(&db_path).unwrap()))
            .build()
            .unwrap();
        api.create(ResourceSpec::new("app-a", "apps")).await.unwrap();
    }

    let api = MigrationApi::builder()
        .with_connector(Arc::new(connector.clone()))
        .with_status_db(&db_path)
        .build()
        .unwrap();
    let tracked = api.read(&id).await.unwrap();

    assert!(tracked.status.migration_complete);
    assert!(matches!(
        api.create(ResourceSpec::new("app-a", "apps")).await,
        Err(MigratorError::DuplicateRelease { .. })
    ));
    assert_eq!(connector.migrator().invocations(), 1);
}
