//! Error types for rbac-core

use std::path::PathBuf;

use rbac_model::{Scope, Side};

/// Result type for rbac-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while diffing, planning or syncing
///
/// Only read-side and precondition failures surface here. Per-operation write
/// failures during a sync are collected into the
/// [`SyncResult`](crate::SyncResult) instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// One side returned data the model cannot accept. Not retryable.
    #[error("Malformed permission data from {side}: {source}")]
    MalformedPermission {
        side: Side,
        #[source]
        source: rbac_model::Error,
    },

    /// A read failed or timed out. Retryable by the caller with backoff.
    #[error("{side} store unavailable: {message}")]
    StoreUnavailable { side: Side, message: String },

    /// A write for one role failed or timed out
    #[error("Write to {side} failed for role '{role}': {message}")]
    StoreWrite {
        side: Side,
        role: String,
        message: String,
    },

    /// No explicit direction and the sync mode does not imply one
    #[error("RBAC sync is not enabled for this environment (mode: console_only)")]
    SyncDisabled,

    /// The plan changed between preview and apply
    #[error("Sync plan for {scope} changed since preview: expected {expected}, found {actual}")]
    StalePlan {
        scope: Scope,
        expected: String,
        actual: String,
    },

    /// A plan was handed to an executor for a different scope or direction
    #[error("Plan targets {plan_scope} ({plan_direction}) but sync requested {scope} ({direction})")]
    PlanMismatch {
        plan_scope: Scope,
        plan_direction: String,
        scope: Scope,
        direction: String,
    },

    /// A store was wired to the wrong side of the engine
    #[error("Expected a {expected} store but got a {actual} store")]
    StoreSideMismatch { expected: Side, actual: Side },

    /// Configuration file not found at expected path
    #[error("Configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration values are out of range
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Invalid tenant or namespace
    #[error(transparent)]
    Model(#[from] rbac_model::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
}

impl Error {
    /// Map a store read failure onto the engine taxonomy
    ///
    /// An unparseable document is bad data, not an outage, so it is reported
    /// as [`Error::MalformedPermission`].
    pub(crate) fn from_read(side: Side, err: rbac_store::Error) -> Self {
        let message = match err {
            rbac_store::Error::Unavailable { message, .. } => message,
            rbac_store::Error::DocumentParse { .. } => {
                return Self::MalformedPermission {
                    side,
                    source: rbac_model::Error::malformed_document(err.to_string()),
                };
            }
            other => other.to_string(),
        };
        Self::StoreUnavailable { side, message }
    }

    /// Map a store write failure onto the engine taxonomy
    pub(crate) fn from_write(side: Side, role: &str, err: rbac_store::Error) -> Self {
        let message = match err {
            rbac_store::Error::Write { message, .. } => message,
            other => other.to_string(),
        };
        Self::StoreWrite {
            side,
            role: role.to_string(),
            message,
        }
    }

    /// True for failures the caller may retry later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. } | Self::StalePlan { .. })
    }
}
