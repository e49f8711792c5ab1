//! Strategy selection and dispatch.

use crate::error::{ConfigError, ConfigResult, ResolveError, ResolveResult};
use crate::factory::{ClassRef, FactoryFn, FromProviders, OptionsFactory};
use crate::providers::{Providers, ResolvedDeps};
use datastore_client::DatastoreOptions;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Builder for deferred options. Exactly one of `use_factory`,
/// `use_existing` or `use_class` must be supplied.
#[derive(Clone, Default)]
pub struct AsyncOptions {
    factory: Option<FactoryFn>,
    inject: Vec<String>,
    existing: Option<String>,
    class: Option<ClassRef>,
}

impl AsyncOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the options with `factory`, fed the values named by
    /// [`inject`](Self::inject).
    #[must_use]
    pub fn use_factory<F, Fut>(mut self, factory: F) -> Self
    where
        F: Fn(ResolvedDeps) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<DatastoreOptions>> + Send + 'static,
    {
        self.factory = Some(Arc::new(move |deps| factory(deps).boxed()));
        self
    }

    /// Names of the dependencies passed to the `use_factory` closure.
    #[must_use]
    pub fn inject<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inject.extend(names.into_iter().map(Into::into));
        self
    }

    /// Delegate to an options factory already registered under `name`.
    #[must_use]
    pub fn use_existing(mut self, name: impl Into<String>) -> Self {
        self.existing = Some(name.into());
        self
    }

    /// Build a fresh `T` from the registry and ask it for the options.
    #[must_use]
    pub fn use_class<T: OptionsFactory + FromProviders + 'static>(mut self) -> Self {
        self.class = Some(ClassRef::of::<T>());
        self
    }

    /// Validates the strategy choice.
    pub fn into_source(self) -> ConfigResult<OptionsSource> {
        let mut chosen = Vec::new();
        if self.factory.is_some() {
            chosen.push("use_factory");
        }
        if self.existing.is_some() {
            chosen.push("use_existing");
        }
        if self.class.is_some() {
            chosen.push("use_class");
        }
        if chosen.len() > 1 {
            return Err(ConfigError::ConflictingStrategies(chosen));
        }

        if let Some(factory) = self.factory {
            return Ok(OptionsSource::Factory {
                factory,
                inject: self.inject,
            });
        }
        if !self.inject.is_empty() {
            warn!(
                inject = ?self.inject,
                "inject is only used together with use_factory; ignoring"
            );
        }
        if let Some(name) = self.existing {
            return Ok(OptionsSource::Existing(name));
        }
        if let Some(class) = self.class {
            return Ok(OptionsSource::Class(class));
        }
        Err(ConfigError::NoStrategy)
    }
}

impl fmt::Debug for AsyncOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncOptions")
            .field("use_factory", &self.factory.is_some())
            .field("inject", &self.inject)
            .field("use_existing", &self.existing)
            .field("use_class", &self.class)
            .finish()
    }
}

/// Where a facade's options come from.
#[derive(Clone)]
pub enum OptionsSource {
    Immediate(DatastoreOptions),
    Factory {
        factory: FactoryFn,
        inject: Vec<String>,
    },
    Existing(String),
    Class(ClassRef),
}

impl OptionsSource {
    #[must_use]
    pub const fn strategy(&self) -> &'static str {
        match self {
            Self::Immediate(_) => "immediate",
            Self::Factory { .. } => "use_factory",
            Self::Existing(_) => "use_existing",
            Self::Class(_) => "use_class",
        }
    }

    #[must_use]
    pub const fn is_deferred(&self) -> bool {
        !matches!(self, Self::Immediate(_))
    }

    /// Produces the options. Immediate options are returned as-is.
    pub async fn resolve(&self, providers: &Providers) -> ResolveResult<DatastoreOptions> {
        debug!(strategy = self.strategy(), "resolving datastore options");
        match self {
            Self::Immediate(options) => Ok(options.clone()),
            Self::Factory { factory, inject } => {
                let deps = providers.resolve_deps(inject)?;
                factory(deps).await.map_err(ResolveError::Factory)
            }
            Self::Existing(name) => providers
                .factory(name)?
                .create_options()
                .await
                .map_err(ResolveError::Factory),
            Self::Class(class) => class
                .instantiate(providers)?
                .create_options()
                .await
                .map_err(ResolveError::Factory),
        }
    }

    /// [`resolve`](Self::resolve) bounded by `limit`, when given.
    pub async fn resolve_within(
        &self,
        providers: &Providers,
        limit: Option<Duration>,
    ) -> ResolveResult<DatastoreOptions> {
        match limit {
            Some(limit) => tokio::time::timeout(limit, self.resolve(providers))
                .await
                .map_err(|_| ResolveError::Timeout(limit))?,
            None => self.resolve(providers).await,
        }
    }
}

impl From<DatastoreOptions> for OptionsSource {
    fn from(options: DatastoreOptions) -> Self {
        Self::Immediate(options)
    }
}

impl fmt::Debug for OptionsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate(options) => f.debug_tuple("Immediate").field(options).finish(),
            Self::Factory { inject, .. } => {
                f.debug_struct("Factory").field("inject", inject).finish()
            }
            Self::Existing(name) => f.debug_tuple("Existing").field(name).finish(),
            Self::Class(class) => f.debug_tuple("Class").field(class).finish(),
        }
    }
}
