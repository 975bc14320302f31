//! Store probing: one capability, configured once per store kind.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::StoreKind;
use crate::error::{MigratorError, Result};
use crate::release::ReleaseRef;

/// A release as reported by a store lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReleaseRecord {
    pub name: String,
    /// Namespace the release is deployed to.
    pub namespace: String,
    /// Revision numbers held by the store.
    #[serde(default)]
    pub versions: Vec<u32>,
}

/// Why a lookup produced no record.
///
/// `NotFound` is an answer, `Backend` is a failure to get one. The two must
/// never be conflated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    NotFound,
    Backend(String),
}

impl std::fmt::Display for LookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupError::NotFound => write!(f, "release not found"),
            LookupError::Backend(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for LookupError {}

/// Store-specific release lookup.
#[async_trait]
pub trait ReleaseLookup: Send + Sync {
    /// Fetch a release by name within a namespace.
    async fn lookup(
        &self,
        namespace: &str,
        name: &str,
    ) -> std::result::Result<ReleaseRecord, LookupError>;
}

/// Result of probing one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Found,
    NotFound,
}

impl ProbeOutcome {
    pub fn exists(self) -> bool {
        matches!(self, ProbeOutcome::Found)
    }
}

/// Answers whether a release exists in one store.
#[async_trait]
pub trait StoreProbe: Send + Sync {
    fn kind(&self) -> StoreKind;

    /// Infrastructure failures are returned as `MigratorError::Probe`, never
    /// as `ProbeOutcome::NotFound`.
    async fn probe(&self, release: &ReleaseRef) -> Result<ProbeOutcome>;
}

/// The `StoreProbe` for either store, parameterized by its lookup.
///
/// The store kind selects the scope namespace: the legacy tracking namespace
/// or the release namespace.
pub struct ReleaseProbe<L> {
    kind: StoreKind,
    lookup: L,
}

impl<L: ReleaseLookup> ReleaseProbe<L> {
    pub fn new(kind: StoreKind, lookup: L) -> Self {
        Self { kind, lookup }
    }
}

#[async_trait]
impl<L: ReleaseLookup> StoreProbe for ReleaseProbe<L> {
    fn kind(&self) -> StoreKind {
        self.kind
    }

    async fn probe(&self, release: &ReleaseRef) -> Result<ProbeOutcome> {
        let scope = release.scope(self.kind);
        match self.lookup.lookup(scope, &release.name).await {
            // A legacy record without versions has nothing left to migrate.
            Ok(record) if self.kind == StoreKind::Legacy && record.versions.is_empty() => {
                debug!("{} store holds {}/{} with no versions", self.kind, scope, release.name);
                Ok(ProbeOutcome::NotFound)
            }
            Ok(record) => {
                debug!(
                    "{} store holds {}/{} ({} versions)",
                    self.kind,
                    scope,
                    release.name,
                    record.versions.len()
                );
                Ok(ProbeOutcome::Found)
            }
            Err(LookupError::NotFound) => Ok(ProbeOutcome::NotFound),
            Err(LookupError::Backend(message)) => Err(MigratorError::Probe {
                store: self.kind,
                release: release.to_string(),
                message,
            }),
        }
    }
}
