//! Wiring: choosing how a facade gets its options.

use crate::error::ServiceResult;
use crate::service::CloudDatastoreService;
use datastore_client::{ClientConnector, DatastoreOptions, HttpConnector};
use datastore_config::{AsyncOptions, ConfigResult, OptionsSource, Providers};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Entry points for wiring a [`CloudDatastoreService`].
pub struct CloudDatastoreModule;

impl CloudDatastoreModule {
    /// Options known up front.
    #[must_use]
    pub fn for_root(options: DatastoreOptions) -> DatastoreModule {
        DatastoreModule::new(OptionsSource::Immediate(options))
    }

    /// Options produced later by exactly one deferred strategy.
    ///
    /// Fails here, before any store access, when the strategy choice is
    /// missing or ambiguous.
    pub fn for_root_async(options: AsyncOptions) -> ConfigResult<DatastoreModule> {
        Ok(DatastoreModule::new(options.into_source()?))
    }
}

/// A validated wiring, ready to build facades.
#[derive(Clone)]
pub struct DatastoreModule {
    source: OptionsSource,
    connector: Arc<dyn ClientConnector>,
    resolve_timeout: Option<Duration>,
}

impl DatastoreModule {
    fn new(source: OptionsSource) -> Self {
        Self {
            source,
            connector: Arc::new(HttpConnector),
            resolve_timeout: None,
        }
    }

    /// Replaces the REST transport.
    #[must_use]
    pub fn with_connector(mut self, connector: impl ClientConnector + 'static) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    /// Bounds deferred resolution.
    #[must_use]
    pub const fn with_resolve_timeout(mut self, limit: Duration) -> Self {
        self.resolve_timeout = Some(limit);
        self
    }

    #[must_use]
    pub const fn source(&self) -> &OptionsSource {
        &self.source
    }

    /// Builds a facade. Nothing is resolved until first use.
    #[must_use]
    pub fn build(&self, providers: Providers) -> CloudDatastoreService {
        CloudDatastoreService::new(
            self.source.clone(),
            providers,
            Arc::clone(&self.connector),
            self.resolve_timeout,
        )
    }

    /// Builds a facade and resolves its configuration right away.
    pub async fn init(&self, providers: Providers) -> ServiceResult<CloudDatastoreService> {
        let service = self.build(providers);
        service.initialize().await?;
        Ok(service)
    }
}

impl fmt::Debug for DatastoreModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatastoreModule")
            .field("source", &self.source)
            .field("resolve_timeout", &self.resolve_timeout)
            .finish_non_exhaustive()
    }
}
