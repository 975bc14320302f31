//! The reconciliation state machine for a single release.
//!
//! State is the observed `(legacy_exists, current_exists)` pair:
//!
//! | legacy | current | meaning                 | create action                         |
//! |--------|---------|-------------------------|---------------------------------------|
//! | false  | false   | absent everywhere       | fail with `NotFoundEverywhere`        |
//! | true   | false   | not yet migrated        | invoke the migration                  |
//! | false  | true    | already migrated        | nothing                               |
//! | true   | true    | legacy copy retained    | invoke only if ignore is set          |

use tracing::{debug, info, warn};

use super::invoker::ConvertOptions;
use crate::cancel::CancellationToken;
use crate::error::{MigratorError, Result};
use crate::release::{MigrationOptions, MigrationStatus, ReleaseRef, ResourceId, ResourceSpec};
use crate::store::StoreHandles;

/// What the two stores reported for a release in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub legacy_exists: bool,
    pub current_exists: bool,
}

impl Observation {
    /// Status for this observation, `None` when neither store has the release.
    pub fn status(&self) -> Option<MigrationStatus> {
        MigrationStatus::from_existence(self.legacy_exists, self.current_exists)
    }

    /// Whether a create pass has to call the migration for this observation.
    ///
    /// A release that is already in the current store is only handed to the
    /// migration again when the caller opted into re-running over migrated
    /// versions. Otherwise a retained legacy copy is reported as pending
    /// cleanup.
    pub fn needs_migration(&self, options: &MigrationOptions) -> bool {
        match (self.legacy_exists, self.current_exists) {
            (true, false) => true,
            (true, true) => options.ignore_already_migrated,
            (false, _) => false,
        }
    }
}

/// Result of a create pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOutcome {
    pub id: ResourceId,
    pub status: MigrationStatus,
    /// Whether this pass called the migration.
    pub migrated: bool,
}

/// Runs reconciliation passes against one set of store handles.
///
/// Handles and the cancellation token are passed in per pass; the reconciler
/// holds no state of its own between passes.
pub struct MigrationReconciler<'a> {
    handles: &'a StoreHandles,
    cancel: &'a CancellationToken,
}

impl<'a> MigrationReconciler<'a> {
    pub fn new(handles: &'a StoreHandles, cancel: &'a CancellationToken) -> Self {
        Self { handles, cancel }
    }

    /// Probe both stores concurrently.
    ///
    /// Either probe failing aborts the pass with that probe's error.
    pub async fn observe(&self, release: &ReleaseRef) -> Result<Observation> {
        let (legacy, current) = tokio::join!(
            self.handles.legacy.probe(release),
            self.handles.current.probe(release)
        );
        Ok(Observation {
            legacy_exists: legacy?.exists(),
            current_exists: current?.exists(),
        })
    }

    /// Side-effect free pass: derive the status from what the stores hold.
    pub async fn read(&self, release: &ReleaseRef) -> Result<MigrationStatus> {
        let log_id = format!("[read: {}]", release);
        debug!("{} Started", log_id);

        self.cancel.check()?;
        let observation = self.observe(release).await?;
        let status = observation.status().ok_or_else(|| {
            debug!("{} Release found in neither store", log_id);
            MigratorError::NotFoundEverywhere {
                release: release.to_string(),
            }
        })?;
        self.cancel.check()?;

        debug!("{} Done: {:?}", log_id, status);
        Ok(status)
    }

    /// The only pass with side effects: migrate if the release still needs it,
    /// then re-observe and derive the status.
    pub async fn create(&self, spec: &ResourceSpec) -> Result<CreateOutcome> {
        let release = spec.release();
        let options = spec.options();
        let log_id = format!("[create: {}]", release);
        debug!("{} Started", log_id);

        self.cancel.check()?;
        let before = self.observe(&release).await?;
        if before.status().is_none() {
            debug!("{} Release found in neither store", log_id);
            return Err(MigratorError::NotFoundEverywhere {
                release: release.to_string(),
            });
        }

        let migrated = before.needs_migration(&options);
        if migrated {
            self.cancel.check()?;
            info!(
                "{} Migrating from legacy namespace {} (max {} versions, delete legacy: {})",
                log_id,
                release.legacy_namespace,
                options.max_release_versions,
                options.delete_legacy_after_migration
            );
            self.handles
                .invoker
                .convert(&ConvertOptions::new(&release, &options))
                .await?;
        } else {
            debug!("{} No migration needed: {:?}", log_id, before);
        }

        let after = self.observe(&release).await?;
        if migrated && !after.current_exists {
            return Err(MigratorError::MigrationUnconfirmed {
                release: release.to_string(),
            });
        }
        if migrated && options.delete_legacy_after_migration && after.legacy_exists {
            warn!(
                "{} Legacy cleanup was requested but the legacy store still holds the release",
                log_id
            );
        }

        let status = after.status().ok_or_else(|| MigratorError::NotFoundEverywhere {
            release: release.to_string(),
        })?;
        self.cancel.check()?;

        debug!("{} Done: {:?}", log_id, status);
        Ok(CreateOutcome {
            id: spec.id(),
            status,
            migrated,
        })
    }

    /// Whether the current store holds the release. The legacy store is not
    /// consulted.
    pub async fn exists(&self, release: &ReleaseRef) -> Result<bool> {
        self.cancel.check()?;
        let found = self.handles.current.probe(release).await?.exists();
        debug!("[exists: {}] {}", release, found);
        Ok(found)
    }

    /// Check that `desired` can be applied in place over `current`.
    ///
    /// Updates never touch the stores: new options only shape a future
    /// migration invocation, they do not trigger one.
    pub fn update(current: &ResourceSpec, desired: &ResourceSpec) -> Result<()> {
        desired.validate()?;
        let fields = current.replacement_fields(desired);
        if !fields.is_empty() {
            return Err(MigratorError::ReplacementRequired {
                fields: fields.into_iter().map(str::to_string).collect(),
            });
        }
        debug!("[update: {}] Options changed, no store action", current.id());
        Ok(())
    }

    /// Forget a migration. Release data in either store is left alone:
    /// migration is one-way and tearing down the tracking record must not
    /// undo or damage it.
    pub fn delete(id: &ResourceId) {
        debug!("[delete: {}] Dropping tracking record only", id);
    }
}
