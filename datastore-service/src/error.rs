use datastore_client::StoreError;
use datastore_config::ResolveError;
use datastore_types::TypesError;
use std::sync::Arc;
use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Why a facade could not become ready.
#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("failed to build the datastore client: {0}")]
    Connect(#[from] StoreError),

    /// The resolution task panicked or was shut down with its runtime.
    #[error("configuration resolution was interrupted: {0}")]
    Interrupted(String),
}

/// Errors surfaced by facade operations. A miss is never an error.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Configuration resolution failed. Shared by every call on the instance.
    #[error("datastore is not configured: {0}")]
    ConfigFailed(#[source] Arc<InitError>),

    /// The store call failed; the cause is kept as-is.
    #[error("{operation} on kind `{kind}` ({target}) failed: {source}")]
    Store {
        operation: &'static str,
        kind: String,
        target: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Types(#[from] TypesError),
}

impl ServiceError {
    /// The underlying store error, if this is one.
    #[must_use]
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Store { source, .. } => Some(source),
            _ => None,
        }
    }

    /// The initialization failure, if this is one.
    #[must_use]
    pub fn init_error(&self) -> Option<&Arc<InitError>> {
        match self {
            Self::ConfigFailed(cause) => Some(cause),
            _ => None,
        }
    }
}
