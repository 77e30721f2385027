//! Error types for rbac-store

use std::path::PathBuf;

/// Result type for rbac-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by permission store adapters
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A read could not be served (transport, auth, timeout, unreadable data)
    #[error("{store} store unavailable: {message}")]
    Unavailable { store: String, message: String },

    /// A grant or revoke for one role failed
    #[error("{store} store rejected write for role '{role}': {message}")]
    Write {
        store: String,
        role: String,
        message: String,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} permissions document at {path}: {message}")]
    DocumentParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Failed to serialize {format} permissions document for {path}: {message}")]
    DocumentSerialize {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Unsupported permissions document format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },

    /// The caller stopped waiting before the document was replaced
    #[error("Write to {path} abandoned before commit")]
    Abandoned { path: PathBuf },

    #[error(transparent)]
    Model(#[from] rbac_model::Error),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn unavailable(store: impl ToString, message: impl ToString) -> Self {
        Self::Unavailable {
            store: store.to_string(),
            message: message.to_string(),
        }
    }

    pub fn write(store: impl ToString, role: impl Into<String>, message: impl ToString) -> Self {
        Self::Write {
            store: store.to_string(),
            role: role.into(),
            message: message.to_string(),
        }
    }

    /// True for read-side failures a caller may retry with backoff
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
