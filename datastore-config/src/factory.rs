//! Deferred options producers.

use crate::error::{ResolveError, ResolveResult};
use crate::providers::{Providers, ResolvedDeps};
use async_trait::async_trait;
use datastore_client::DatastoreOptions;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// An object able to produce datastore options, possibly asynchronously
/// (reading a secret manager, another service, a config file...).
#[async_trait]
pub trait OptionsFactory: Send + Sync {
    async fn create_options(&self) -> anyhow::Result<DatastoreOptions>;
}

/// Types that `use_class` can build from the registry.
pub trait FromProviders: Sized {
    fn from_providers(providers: &Providers) -> anyhow::Result<Self>;
}

/// Closure form of a factory: receives the injected dependencies.
pub type FactoryFn =
    Arc<dyn Fn(ResolvedDeps) -> BoxFuture<'static, anyhow::Result<DatastoreOptions>> + Send + Sync>;

type Constructor = fn(&Providers) -> anyhow::Result<Arc<dyn OptionsFactory>>;

/// A type-level reference to an [`OptionsFactory`] implementation.
#[derive(Clone, Copy)]
pub struct ClassRef {
    type_name: &'static str,
    construct: Constructor,
}

impl ClassRef {
    #[must_use]
    pub fn of<T: OptionsFactory + FromProviders + 'static>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            construct: construct::<T>,
        }
    }

    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Builds a fresh instance from the registry.
    pub fn instantiate(&self, providers: &Providers) -> ResolveResult<Arc<dyn OptionsFactory>> {
        (self.construct)(providers).map_err(|source| ResolveError::Construct {
            type_name: self.type_name,
            source,
        })
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClassRef").field(&self.type_name).finish()
    }
}

fn construct<T: OptionsFactory + FromProviders + 'static>(
    providers: &Providers,
) -> anyhow::Result<Arc<dyn OptionsFactory>> {
    Ok(Arc::new(T::from_providers(providers)?))
}
