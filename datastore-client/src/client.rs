//! Store client abstraction.

use crate::error::StoreResult;
use crate::http::HttpStoreClient;
use crate::options::DatastoreOptions;
use async_trait::async_trait;
use datastore_types::{Entity, Key, Query};
use std::sync::Arc;

/// The four operations the facade and the test harness rely on.
///
/// Implementations own transport, retries and authentication. Callers never
/// see store-internal metadata: every read returns `(Key, Fields)` pairs.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Name of the backing implementation, for logs.
    fn provider_name(&self) -> &'static str;

    /// Point lookup. Missing keys are simply absent from the result.
    async fn get(&self, keys: &[Key]) -> StoreResult<Vec<Entity>>;

    /// Scans one kind, in store-defined order.
    async fn run_query(&self, query: &Query) -> StoreResult<Vec<Entity>>;

    /// Upserts entities, replacing any existing field set. Incomplete keys get
    /// a store-allocated id. Returns the complete keys, in input order.
    async fn save(&self, entities: Vec<Entity>) -> StoreResult<Vec<Key>>;

    /// Inserts entities, failing with `AlreadyExists` on an existing key.
    async fn insert(&self, entities: Vec<Entity>) -> StoreResult<Vec<Key>>;
}

/// Builds a store client from resolved options.
pub trait ClientConnector: Send + Sync {
    fn connect(&self, options: &DatastoreOptions) -> StoreResult<Arc<dyn StoreClient>>;
}

/// Connects through [`HttpStoreClient`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConnector;

impl ClientConnector for HttpConnector {
    fn connect(&self, options: &DatastoreOptions) -> StoreResult<Arc<dyn StoreClient>> {
        Ok(Arc::new(HttpStoreClient::new(options.clone())?))
    }
}
