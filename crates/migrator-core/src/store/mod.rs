//! Release store access.
//!
//! Both stores are probed through the same [`StoreProbe`] capability; only the
//! lookup behind it and the namespace it is scoped to differ:
//! - legacy store: release-version lookup in the legacy tracking namespace
//! - current store: release lookup in the release namespace
//!
//! A lookup distinguishes "no such release" from a failure to reach the store,
//! and that distinction survives all the way up to the reconciler.

mod connector;
mod http;
mod memory;
mod probe;

pub use connector::{HttpStoreConnector, MemoryStoreConnector, StoreConnector, StoreHandles};
pub use http::{build_client, HttpReleaseLookup};
pub use memory::MemoryReleaseStore;
pub use probe::{LookupError, ProbeOutcome, ReleaseLookup, ReleaseProbe, ReleaseRecord, StoreProbe};
