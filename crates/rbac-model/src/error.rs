//! Error types for rbac-model

/// Result type for rbac-model operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building canonical permission state
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Raw permission data has a shape the model cannot accept
    #[error("Malformed permission for role '{role}': {reason}")]
    MalformedPermission { role: String, reason: String },

    /// A stored permissions document could not be read as role → actions
    #[error("Malformed permissions document: {reason}")]
    MalformedDocument { reason: String },

    /// Tenant or namespace name is not a valid scope component
    #[error("Invalid scope {field} '{value}': {reason}")]
    InvalidScope {
        field: &'static str,
        value: String,
        reason: String,
    },
}

impl Error {
    pub fn malformed(role: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedPermission {
            role: role.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed_document(reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            reason: reason.into(),
        }
    }
}
