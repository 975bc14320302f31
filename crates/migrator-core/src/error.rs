//! Error types for the release migrator.
//!
//! Every failure of a reconciliation pass is returned to the caller as a
//! `MigratorError`. Nothing is swallowed or downgraded to a log line.

use thiserror::Error;

use crate::config::StoreKind;

/// Main error type for the release migrator.
#[derive(Debug, Error)]
pub enum MigratorError {
    // Store errors
    #[error("Failed to probe {store} store for release {release}: {message}")]
    Probe {
        store: StoreKind,
        release: String,
        message: String,
    },

    #[error("Release {release} was not found in either the legacy or the current store")]
    NotFoundEverywhere { release: String },

    // Migration errors
    #[error("Migration of release {release} failed: {message}")]
    MigrationInvocation { release: String, message: String },

    #[error("Migration of release {release} reported success but the current store does not hold it")]
    MigrationUnconfirmed { release: String },

    #[error("Reconciliation pass cancelled")]
    Cancelled,

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Validation errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Changing {} requires replacing the resource", .fields.join(", "))]
    ReplacementRequired { fields: Vec<String> },

    #[error("Invalid resource id {id:?}: expected <namespace>/<name>")]
    InvalidResourceId { id: String },

    #[error("Invalid params: {message}")]
    InvalidParams { message: String },

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    // Tracking record errors
    #[error("No tracked migration for {id}")]
    ResourceNotFound { id: String },

    #[error("Release {id} is already tracked by another migration")]
    DuplicateRelease { id: String },

    #[error("A reconciliation pass for {id} is already running")]
    PassInProgress { id: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for migrator operations.
pub type Result<T> = std::result::Result<T, MigratorError>;

impl From<serde_json::Error> for MigratorError {
    fn from(err: serde_json::Error) -> Self {
        MigratorError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for MigratorError {
    fn from(err: rusqlite::Error) -> Self {
        MigratorError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl MigratorError {
    /// Convert to a JSON-RPC error code.
    ///
    /// Custom error codes (application-defined, -32000 to -32099):
    /// - -32000: Store unreachable or failing
    /// - -32001: Release not found in either store
    /// - -32002: No tracked migration for the id
    /// - -32003: Migration failed or could not be confirmed
    /// - -32004: Cancelled
    /// - -32005: Validation error
    /// - -32006: Change requires replacing the resource
    /// - -32007: Conflicts with an existing tracked release or running pass
    ///
    /// Standard codes: -32601 unknown method, -32602 invalid params, -32603 internal.
    pub fn to_rpc_error_code(&self) -> i32 {
        match self {
            MigratorError::Probe { .. } => -32000,

            MigratorError::NotFoundEverywhere { .. } => -32001,

            MigratorError::ResourceNotFound { .. } => -32002,

            MigratorError::MigrationInvocation { .. }
            | MigratorError::MigrationUnconfirmed { .. } => -32003,

            MigratorError::Cancelled => -32004,

            MigratorError::Validation { .. }
            | MigratorError::InvalidResourceId { .. }
            | MigratorError::Config { .. } => -32005,

            MigratorError::ReplacementRequired { .. } => -32006,

            MigratorError::DuplicateRelease { .. } | MigratorError::PassInProgress { .. } => -32007,

            MigratorError::MethodNotFound { .. } => -32601,

            MigratorError::InvalidParams { .. } => -32602,

            _ => -32603,
        }
    }

    /// Check if the caller's scheduler may retry the pass.
    ///
    /// Only infrastructure failures qualify. The reconciler itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MigratorError::Probe { .. })
    }
}
