//! Release identity, migration options and the computed status record.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{ResourceDefaults, StoreKind};
use crate::error::{MigratorError, Result};

/// Identifies a release across both stores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReleaseRef {
    pub name: String,
    /// Namespace of the release in the current store.
    pub namespace: String,
    /// Tracking namespace of the legacy store.
    pub legacy_namespace: String,
}

impl ReleaseRef {
    /// Namespace a lookup in the given store is scoped to.
    pub fn scope(&self, store: StoreKind) -> &str {
        match store {
            StoreKind::Legacy => &self.legacy_namespace,
            StoreKind::Current => &self.namespace,
        }
    }

    pub fn id(&self) -> ResourceId {
        ResourceId {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }
}

impl fmt::Display for ReleaseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Options forwarded to the next migration invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MigrationOptions {
    pub delete_legacy_after_migration: bool,
    pub ignore_already_migrated: bool,
    pub max_release_versions: u32,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            delete_legacy_after_migration: ResourceDefaults::DELETE_LEGACY_AFTER_MIGRATION,
            ignore_already_migrated: ResourceDefaults::IGNORE_ALREADY_MIGRATED,
            max_release_versions: ResourceDefaults::MAX_RELEASE_VERSIONS,
        }
    }
}

/// Computed status of a migration, derived from what the stores report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MigrationStatus {
    pub legacy_exists: bool,
    pub current_exists: bool,
    pub migration_complete: bool,
    pub cleanup_complete: bool,
}

impl MigrationStatus {
    /// Derive the status from observed existence.
    ///
    /// Returns `None` when neither store holds the release; there is no
    /// status to record in that case. Cleanup is only ever reported on top of
    /// a completed migration.
    pub fn from_existence(legacy_exists: bool, current_exists: bool) -> Option<Self> {
        if !legacy_exists && !current_exists {
            return None;
        }
        Some(Self {
            legacy_exists,
            current_exists,
            migration_complete: current_exists,
            cleanup_complete: current_exists && !legacy_exists,
        })
    }
}

/// Stable identifier of a tracked migration: `<namespace>/<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId {
    pub namespace: String,
    pub name: String,
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl FromStr for ResourceId {
    type Err = MigratorError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || MigratorError::InvalidResourceId { id: s.to_string() };
        let (namespace, name) = s.split_once('/').ok_or_else(invalid)?;
        if namespace.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }
        Ok(Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }
}

impl TryFrom<String> for ResourceId {
    type Error = MigratorError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.to_string()
    }
}

fn default_legacy_namespace() -> String {
    ResourceDefaults::LEGACY_NAMESPACE.to_string()
}

fn default_max_release_versions() -> u32 {
    ResourceDefaults::MAX_RELEASE_VERSIONS
}

/// Declared configuration of a migration resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResourceSpec {
    pub name: String,
    pub namespace: String,
    #[serde(default = "default_legacy_namespace", alias = "legacyNamespace")]
    pub legacy_namespace: String,
    #[serde(default, alias = "deleteLegacyAfterMigration")]
    pub delete_legacy_after_migration: bool,
    #[serde(default, alias = "ignoreAlreadyMigrated")]
    pub ignore_already_migrated: bool,
    #[serde(default = "default_max_release_versions", alias = "maxReleaseVersions")]
    pub max_release_versions: u32,
}

impl ResourceSpec {
    /// Spec with every optional field at its default.
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        let options = MigrationOptions::default();
        Self {
            name: name.into(),
            namespace: namespace.into(),
            legacy_namespace: default_legacy_namespace(),
            delete_legacy_after_migration: options.delete_legacy_after_migration,
            ignore_already_migrated: options.ignore_already_migrated,
            max_release_versions: options.max_release_versions,
        }
    }

    pub fn id(&self) -> ResourceId {
        ResourceId {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }

    pub fn release(&self) -> ReleaseRef {
        ReleaseRef {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            legacy_namespace: self.legacy_namespace.clone(),
        }
    }

    pub fn options(&self) -> MigrationOptions {
        MigrationOptions {
            delete_legacy_after_migration: self.delete_legacy_after_migration,
            ignore_already_migrated: self.ignore_already_migrated,
            max_release_versions: self.max_release_versions,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("name", &self.name),
            ("namespace", &self.namespace),
            ("legacy_namespace", &self.legacy_namespace),
        ] {
            if value.trim().is_empty() {
                return Err(MigratorError::Validation {
                    field: field.to_string(),
                    message: "must not be empty".to_string(),
                });
            }
            if value.contains('/') {
                return Err(MigratorError::Validation {
                    field: field.to_string(),
                    message: format!("{value:?} must not contain '/'"),
                });
            }
        }

        if self.max_release_versions == 0 {
            return Err(MigratorError::Validation {
                field: "max_release_versions".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// Immutable fields that differ between `self` and `desired`.
    ///
    /// Any entry means the change cannot be applied in place.
    pub fn replacement_fields(&self, desired: &ResourceSpec) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name != desired.name {
            fields.push("name");
        }
        if self.namespace != desired.namespace {
            fields.push("namespace");
        }
        if self.legacy_namespace != desired.legacy_namespace {
            fields.push("legacy_namespace");
        }
        if self.delete_legacy_after_migration != desired.delete_legacy_after_migration {
            fields.push("delete_legacy_after_migration");
        }
        fields
    }
}
