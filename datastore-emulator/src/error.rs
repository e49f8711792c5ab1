use datastore_client::StoreError;
use datastore_types::TypesError;
use thiserror::Error;

pub type EmulatorResult<T> = Result<T, EmulatorError>;

#[derive(Debug, Error)]
pub enum EmulatorError {
    /// The emulator answered the reset request with a failure.
    #[error("emulator at {host} refused reset ({status}): {body}")]
    Reset {
        host: String,
        status: u16,
        body: String,
    },

    /// A condition polled with `eventually` never held.
    #[error("condition still failing after {attempts} attempts: {last}")]
    NotSettled { attempts: u32, last: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Types(#[from] TypesError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
