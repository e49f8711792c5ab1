//! Test support for the Cloud Datastore facade.
//!
//! - [`EmulatorManager`] resets an emulator and seeds or reads fixtures
//!   directly through the store client, bypassing the facade
//! - [`eventually`] polls a check until it holds, for query paths that are
//!   only eventually consistent
//! - [`EmulatorServer`] runs a local, in-process emulator so the REST client
//!   and the harness can be exercised without the Google emulator

mod error;
mod manager;
mod server;
mod wait;

pub use error::{EmulatorError, EmulatorResult};
pub use manager::EmulatorManager;
pub use server::{DEFAULT_PAGE_SIZE, EmulatorServer, build_router};
pub use wait::{WaitConfig, eventually};
