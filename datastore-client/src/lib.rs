//! Store client boundary for the Cloud Datastore facade.
//!
//! The facade never talks to the store directly; it goes through the
//! [`StoreClient`] trait, which offers exactly four operations:
//! key lookup, filtered scan, upsert (`save`) and `insert`.
//!
//! Two implementations are provided:
//! - [`HttpStoreClient`] speaks the Cloud Datastore REST v1 API, either
//!   against Google or against a local emulator (`api_endpoint`)
//! - [`MemoryStoreClient`] keeps entities in process, for tests and for the
//!   local emulator server
//!
//! A [`ClientConnector`] turns resolved [`DatastoreOptions`] into a client,
//! which lets callers swap the transport without touching the facade.

mod client;
mod error;
mod http;
mod memory;
mod options;
pub mod wire;

pub use client::{ClientConnector, HttpConnector, StoreClient};
pub use error::{StoreError, StoreResult};
pub use http::HttpStoreClient;
pub use memory::MemoryStoreClient;
pub use options::{
    Credentials, DEFAULT_API_ENDPOINT, DEFAULT_TIMEOUT_SECS, DatastoreOptions, EMULATOR_HOST_ENV,
    PROJECT_ID_ENV,
};
