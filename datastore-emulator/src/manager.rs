//! Fixture management against a running emulator.

use crate::error::{EmulatorError, EmulatorResult};
use datastore_client::{DatastoreOptions, HttpStoreClient, StoreClient};
use datastore_types::{Entity, Fields, Identifier, Key, Query};
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, info};

/// Seeds, inspects and resets an emulator, bypassing the facade.
///
/// The host is always given explicitly; the process environment is never
/// consulted.
pub struct EmulatorManager {
    host: String,
    project_id: String,
    http: Client,
    store: Arc<dyn StoreClient>,
}

impl EmulatorManager {
    /// Talks to the emulator at `host` (`host:port`) through the REST client.
    pub fn new(host: impl Into<String>, project_id: impl Into<String>) -> EmulatorResult<Self> {
        let host = host.into();
        let project_id = project_id.into();
        let store = HttpStoreClient::new(DatastoreOptions::for_emulator(
            host.clone(),
            project_id.clone(),
        ))?;
        Ok(Self::with_store(host, project_id, Arc::new(store)))
    }

    /// Uses `store` for fixtures and `host` only for resets.
    pub fn with_store(
        host: impl Into<String>,
        project_id: impl Into<String>,
        store: Arc<dyn StoreClient>,
    ) -> Self {
        Self {
            host: host.into(),
            project_id: project_id.into(),
            http: Client::new(),
            store,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Options for a facade pointed at the same emulator and project.
    pub fn options(&self) -> DatastoreOptions {
        DatastoreOptions::for_emulator(self.host.clone(), self.project_id.clone())
    }

    pub fn store(&self) -> Arc<dyn StoreClient> {
        Arc::clone(&self.store)
    }

    fn reset_url(&self) -> String {
        let base = if self.host.contains("://") {
            self.host.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", self.host.trim_end_matches('/'))
        };
        format!("{base}/reset")
    }

    /// Empties the emulator. Resolves once the emulator acknowledged.
    pub async fn reset(&self) -> EmulatorResult<()> {
        let response = self.http.post(self.reset_url()).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmulatorError::Reset {
                host: self.host.clone(),
                status: status.as_u16(),
                body,
            });
        }
        info!("Emulator at {} reset", self.host);
        Ok(())
    }

    /// Inserts `fields` under `(kind, identifier)`. Fails if the key exists.
    pub async fn create_entity_with_key(
        &self,
        kind: &str,
        identifier: impl Into<Identifier>,
        fields: Fields,
    ) -> EmulatorResult<Key> {
        let key = Key::complete(kind, identifier)?;
        self.insert_one(Entity::new(key, fields)).await
    }

    /// Inserts `fields` under `kind`, with a store-allocated id unless one is
    /// given.
    pub async fn create_entity(
        &self,
        kind: &str,
        fields: Fields,
        identifier: Option<Identifier>,
    ) -> EmulatorResult<Key> {
        let key = Key::new(kind, identifier)?;
        self.insert_one(Entity::new(key, fields)).await
    }

    /// Inserts every payload under `kind` in one batch, each with a
    /// store-allocated id. Keys come back in input order.
    pub async fn create_entities(
        &self,
        kind: &str,
        payloads: Vec<Fields>,
    ) -> EmulatorResult<Vec<Key>> {
        let key = Key::incomplete(kind)?;
        let entities = payloads
            .into_iter()
            .map(|fields| Entity::new(key.clone(), fields))
            .collect();
        let keys = self.store.insert(entities).await?;
        debug!("Seeded {} {} entities", keys.len(), kind);
        Ok(keys)
    }

    /// Every entity of `kind`, keys included.
    pub async fn get_all(&self, kind: &str) -> EmulatorResult<Vec<Entity>> {
        Ok(self.store.run_query(&Query::new(kind)?).await?)
    }

    /// Drops the key half of a read result.
    pub fn strip_key(entity: Entity) -> Fields {
        entity.into_fields()
    }

    async fn insert_one(&self, entity: Entity) -> EmulatorResult<Key> {
        let mut keys = self.store.insert(vec![entity]).await?;
        let key = keys.pop().ok_or_else(|| {
            datastore_client::StoreError::InvalidResponse("insert returned no key".into())
        })?;
        debug!(%key, "Seeded entity");
        Ok(key)
    }
}

impl std::fmt::Debug for EmulatorManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmulatorManager")
            .field("host", &self.host)
            .field("project_id", &self.project_id)
            .field("store", &self.store.provider_name())
            .finish_non_exhaustive()
    }
}
