//! Store client error types.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a store client. The facade forwards these unchanged.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store answered with a non-success status.
    #[error("store API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Credentials were missing or rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// `insert` hit an existing key.
    #[error("entity already exists: {0}")]
    AlreadyExists(String),

    /// The response body could not be mapped onto the entity model.
    #[error("invalid store response: {0}")]
    InvalidResponse(String),

    /// The client could not be built from the given options.
    #[error("invalid client configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport failure, kept with its source chain.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Types(#[from] datastore_types::TypesError),
}

impl StoreError {
    /// Returns true for failures caused by credentials rather than data.
    pub fn is_auth(&self) -> bool {
        match self {
            StoreError::Auth(_) => true,
            StoreError::Api { status, .. } => matches!(status, 401 | 403),
            StoreError::Http(e) => e.status().is_some_and(|s| matches!(s.as_u16(), 401 | 403)),
            _ => false,
        }
    }
}
