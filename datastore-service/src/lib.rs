//! Data access facade over Cloud Datastore.
//!
//! [`CloudDatastoreService`] offers a small CRUD contract partitioned by
//! kind: lookup by key, lookup and scan by single-field equality, and
//! full-replacement upsert. A miss is `Ok(None)` or an empty vector, never an
//! error.
//!
//! Wiring goes through [`CloudDatastoreModule`]:
//!
//! ```no_run
//! use datastore_service::{CloudDatastoreModule, DatastoreOptions, Providers};
//! use datastore_types::Fields;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let datastore = CloudDatastoreModule::for_root(DatastoreOptions::for_emulator(
//!     "localhost:8081",
//!     "demo",
//! ))
//! .build(Providers::new());
//!
//! let key = datastore
//!     .save("Account", Some(1.into()), Fields::new().with("email", "a@x.com"))
//!     .await?;
//! let account = datastore.find_one_by_key("Account", 1).await?;
//! assert_eq!(account.map(|e| e.key), Some(key));
//! # Ok(())
//! # }
//! ```

mod error;
mod module;
mod service;

pub use datastore_client::{ClientConnector, DatastoreOptions, HttpConnector};
pub use datastore_config::{AsyncOptions, OptionsFactory, Providers};
pub use error::{InitError, ServiceError, ServiceResult};
pub use module::{CloudDatastoreModule, DatastoreModule};
pub use service::{CloudDatastoreService, Phase};
