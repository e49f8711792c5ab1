//! Configuration resolution for the Cloud Datastore facade.
//!
//! A facade needs exactly one [`DatastoreOptions`] value before it can serve
//! requests. This crate produces it in one of two ways, chosen at wiring time:
//!
//! - **Immediate**: the options are known up front ([`OptionsSource::Immediate`])
//! - **Deferred**: the options come from asynchronous work that may depend on
//!   other values of the application ([`AsyncOptions`]):
//!   - a factory closure fed with named dependencies from [`Providers`]
//!   - an [`OptionsFactory`] already registered in [`Providers`]
//!   - a type built from [`Providers`] through [`FromProviders`]
//!
//! [`AsyncOptions::into_source`] enforces that exactly one deferred strategy is
//! supplied and fails with [`ConfigError`] otherwise, before anything touches
//! the store. [`OptionsSource::resolve`] then dispatches to the chosen
//! strategy; its failures are [`ResolveError`]s.
//!
//! # Example
//!
//! ```
//! use datastore_config::{AsyncOptions, DatastoreOptions, Providers};
//!
//! # futures::executor::block_on(async {
//! let mut providers = Providers::new();
//! providers.insert("project", String::from("my-project"));
//!
//! let source = AsyncOptions::new()
//!     .use_factory(|deps| async move {
//!         let project = deps.get::<String>("project")?;
//!         Ok(DatastoreOptions {
//!             project_id: Some(project.as_ref().clone()),
//!             ..Default::default()
//!         })
//!     })
//!     .inject(["project"])
//!     .into_source()
//!     .unwrap();
//!
//! let options = source.resolve(&providers).await.unwrap();
//! assert_eq!(options.project_id.as_deref(), Some("my-project"));
//! # });
//! ```

mod error;
mod factory;
mod providers;
mod source;

pub use datastore_client::DatastoreOptions;
pub use error::{ConfigError, ConfigResult, ResolveError, ResolveResult};
pub use factory::{ClassRef, FactoryFn, FromProviders, OptionsFactory};
pub use providers::{Providers, ResolvedDeps};
pub use source::{AsyncOptions, OptionsSource};
