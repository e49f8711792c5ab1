//! The CRUD facade.

use crate::error::{InitError, ServiceError, ServiceResult};
use crate::module::CloudDatastoreModule;
use datastore_client::{ClientConnector, DatastoreOptions, StoreClient, StoreError};
use datastore_config::{OptionsSource, Providers};
use datastore_types::{Entity, Fields, Filter, Identifier, Key, Query, Value};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Where a facade is in its configuration lifecycle.
///
/// `Ready` and `ConfigFailed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    Unconfigured = 0,
    Resolving = 1,
    Ready = 2,
    ConfigFailed = 3,
}

impl Phase {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Resolving,
            2 => Self::Ready,
            3 => Self::ConfigFailed,
            _ => Self::Unconfigured,
        }
    }
}

type ClientSlot = Result<Arc<dyn StoreClient>, Arc<InitError>>;

struct Inner {
    source: OptionsSource,
    providers: Providers,
    connector: Arc<dyn ClientConnector>,
    resolve_timeout: Option<Duration>,
    client: OnceCell<ClientSlot>,
    phase: AtomicU8,
}

impl Inner {
    fn set_phase(&self, phase: Phase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    async fn connect(&self) -> ClientSlot {
        self.set_phase(Phase::Resolving);
        debug!(strategy = self.source.strategy(), "Resolving datastore configuration");

        let outcome = self.try_connect().await;
        match &outcome {
            Ok(client) => {
                self.set_phase(Phase::Ready);
                info!(
                    provider = client.provider_name(),
                    strategy = self.source.strategy(),
                    "Datastore facade ready"
                );
            }
            Err(e) => {
                self.set_phase(Phase::ConfigFailed);
                warn!(error = %e, "Datastore configuration failed");
            }
        }
        outcome.map_err(Arc::new)
    }

    async fn try_connect(&self) -> Result<Arc<dyn StoreClient>, InitError> {
        let options = self
            .source
            .resolve_within(&self.providers, self.resolve_timeout)
            .await?;
        Ok(self.connector.connect(&options)?)
    }
}

/// Kind-partitioned CRUD over the store.
///
/// Cheap to clone; clones share the client and the configuration outcome.
/// Configuration is resolved once, on first use or on
/// [`initialize`](Self::initialize), and the result is kept for the lifetime
/// of the instance: after a failure every operation fails with the same
/// cause and never reaches the store.
#[derive(Clone)]
pub struct CloudDatastoreService {
    inner: Arc<Inner>,
}

impl CloudDatastoreService {
    pub(crate) fn new(
        source: OptionsSource,
        providers: Providers,
        connector: Arc<dyn ClientConnector>,
        resolve_timeout: Option<Duration>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                providers,
                connector,
                resolve_timeout,
                client: OnceCell::new(),
                phase: AtomicU8::new(Phase::Unconfigured as u8),
            }),
        }
    }

    /// Wraps an already built client. The facade starts `Ready`.
    pub fn from_client(client: Arc<dyn StoreClient>) -> Self {
        let service = Self::new(
            OptionsSource::Immediate(DatastoreOptions::default()),
            Providers::new(),
            Arc::new(FixedConnector(Arc::clone(&client))),
            None,
        );
        if service.inner.client.set(Ok(client)).is_ok() {
            service.inner.set_phase(Phase::Ready);
        }
        service
    }

    /// Facade configured from `DATASTORE_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        CloudDatastoreModule::for_root(DatastoreOptions::from_env()).build(Providers::new())
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.inner.phase.load(Ordering::Acquire))
    }

    /// Drives configuration resolution now instead of on first use.
    pub async fn initialize(&self) -> ServiceResult<()> {
        self.client().await.map(|_| ())
    }

    async fn client(&self) -> ServiceResult<Arc<dyn StoreClient>> {
        if let Some(slot) = self.inner.client.get() {
            return slot.clone().map_err(ServiceError::ConfigFailed);
        }
        // Runs on its own task; a dropped caller does not cancel resolution.
        let inner = Arc::clone(&self.inner);
        let slot = tokio::spawn(async move {
            inner.client.get_or_init(|| inner.connect()).await.clone()
        })
        .await
        .unwrap_or_else(|e| Err(Arc::new(InitError::Interrupted(e.to_string()))));
        slot.map_err(ServiceError::ConfigFailed)
    }

    /// Point lookup. `Ok(None)` when no entity has this key.
    pub async fn find_one_by_key(
        &self,
        kind: &str,
        identifier: impl Into<Identifier>,
    ) -> ServiceResult<Option<Entity>> {
        let key = Key::complete(kind, identifier)?;
        let client = self.client().await?;
        let found = client
            .get(std::slice::from_ref(&key))
            .await
            .map_err(|e| store_error("lookup", &key, e))?;
        debug!(%key, hit = !found.is_empty(), "Lookup");
        Ok(found.into_iter().find(|entity| entity.key == key))
    }

    /// First entity of `kind` whose `field` equals `value`, in store order.
    pub async fn find_one_by_field(
        &self,
        kind: &str,
        field: &str,
        value: impl Into<Value>,
    ) -> ServiceResult<Option<Entity>> {
        let found = self.scan(kind, field, value.into()).await?;
        Ok(found.into_iter().next())
    }

    /// Every entity of `kind` whose `field` equals `value`.
    pub async fn find_all_by_field(
        &self,
        kind: &str,
        field: &str,
        value: impl Into<Value>,
    ) -> ServiceResult<Vec<Entity>> {
        self.scan(kind, field, value.into()).await
    }

    async fn scan(&self, kind: &str, field: &str, value: Value) -> ServiceResult<Vec<Entity>> {
        let query = Query::new(kind)?.with_filter(Filter::eq(field, value.clone()));
        let client = self.client().await?;
        let found = client.run_query(&query).await.map_err(|e| ServiceError::Store {
            operation: "query",
            kind: kind.to_string(),
            target: format!("{field} = {value}"),
            source: e,
        })?;
        debug!(kind, field, matches = found.len(), "Query");
        Ok(found)
    }

    /// Full-replacement upsert. Without an identifier the store allocates a
    /// numeric id. Returns the complete key written.
    pub async fn save(
        &self,
        kind: &str,
        identifier: Option<Identifier>,
        fields: Fields,
    ) -> ServiceResult<Key> {
        let key = Key::new(kind, identifier)?;
        let client = self.client().await?;
        let written = client
            .save(vec![Entity::new(key.clone(), fields)])
            .await
            .map_err(|e| store_error("save", &key, e))?;
        let saved = written.into_iter().next().ok_or_else(|| {
            store_error(
                "save",
                &key,
                StoreError::InvalidResponse("commit returned no key".into()),
            )
        })?;
        debug!(key = %saved, "Saved");
        Ok(saved)
    }

    /// [`save`](Self::save) for any serde type that maps to a flat object.
    pub async fn save_as<T: Serialize + ?Sized>(
        &self,
        kind: &str,
        identifier: Option<Identifier>,
        data: &T,
    ) -> ServiceResult<Key> {
        let fields = Fields::from_serialize(data)?;
        self.save(kind, identifier, fields).await
    }
}

impl fmt::Debug for CloudDatastoreService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudDatastoreService")
            .field("strategy", &self.inner.source.strategy())
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

fn store_error(operation: &'static str, key: &Key, source: StoreError) -> ServiceError {
    ServiceError::Store {
        operation,
        kind: key.kind().to_string(),
        target: key.to_string(),
        source,
    }
}

/// Hands out a client built elsewhere.
struct FixedConnector(Arc<dyn StoreClient>);

impl ClientConnector for FixedConnector {
    fn connect(
        &self,
        _options: &DatastoreOptions,
    ) -> datastore_client::StoreResult<Arc<dyn StoreClient>> {
        Ok(Arc::clone(&self.0))
    }
}
