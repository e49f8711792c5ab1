//! In-process store.
//!
//! Strongly consistent, key-ordered, and shared by reference. Backs the
//! facade's unit tests and the local emulator server.

use crate::client::StoreClient;
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use datastore_types::{Entity, Fields, Identifier, Key, Kind, Query};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

type KindTable = BTreeMap<Identifier, Fields>;

/// [`StoreClient`] holding every entity in memory.
#[derive(Debug)]
pub struct MemoryStoreClient {
    kinds: RwLock<HashMap<Kind, KindTable>>,
    next_id: AtomicI64,
}

impl Default for MemoryStoreClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStoreClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            kinds: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Drops every entity of every kind.
    pub async fn clear(&self) {
        self.kinds.write().await.clear();
        debug!("Memory store cleared");
    }

    /// Number of entities stored under `kind`.
    pub async fn count(&self, kind: &Kind) -> usize {
        self.kinds.read().await.get(kind).map_or(0, BTreeMap::len)
    }

    /// Picks the next free numeric id for `table`.
    fn allocate_id(&self, table: &KindTable) -> Identifier {
        loop {
            let candidate = Identifier::Id(self.next_id.fetch_add(1, Ordering::Relaxed));
            if !table.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    fn write_all(
        &self,
        kinds: &mut HashMap<Kind, KindTable>,
        entities: Vec<Entity>,
    ) -> Vec<Key> {
        entities
            .into_iter()
            .map(|Entity { key, fields }| {
                let table = kinds.entry(key.kind().clone()).or_default();
                let identifier = match key.identifier() {
                    Some(identifier) => identifier.clone(),
                    None => self.allocate_id(table),
                };
                table.insert(identifier.clone(), fields);
                key.with_identifier(identifier)
            })
            .collect()
    }
}

#[async_trait]
impl StoreClient for MemoryStoreClient {
    fn provider_name(&self) -> &'static str {
        "In-memory"
    }

    async fn get(&self, keys: &[Key]) -> StoreResult<Vec<Entity>> {
        let kinds = self.kinds.read().await;
        Ok(keys
            .iter()
            .filter_map(|key| {
                let identifier = key.identifier()?;
                let fields = kinds.get(key.kind())?.get(identifier)?;
                Some(Entity::new(key.clone(), fields.clone()))
            })
            .collect())
    }

    async fn run_query(&self, query: &Query) -> StoreResult<Vec<Entity>> {
        let kinds = self.kinds.read().await;
        let Some(table) = kinds.get(query.kind()) else {
            return Ok(Vec::new());
        };

        Ok(table
            .iter()
            .filter(|(_, fields)| query.filter().is_none_or(|filter| filter.matches(fields)))
            .map(|(identifier, fields)| {
                Entity::new(
                    Key::from_parts(query.kind().clone(), Some(identifier.clone())),
                    fields.clone(),
                )
            })
            .collect())
    }

    async fn save(&self, entities: Vec<Entity>) -> StoreResult<Vec<Key>> {
        let mut kinds = self.kinds.write().await;
        Ok(self.write_all(&mut kinds, entities))
    }

    async fn insert(&self, entities: Vec<Entity>) -> StoreResult<Vec<Key>> {
        let mut kinds = self.kinds.write().await;

        // The batch is all-or-nothing, so check every key before writing any.
        for entity in &entities {
            let exists = entity.key.identifier().is_some_and(|identifier| {
                kinds
                    .get(entity.key.kind())
                    .is_some_and(|table| table.contains_key(identifier))
            });
            if exists {
                return Err(StoreError::AlreadyExists(entity.key.to_string()));
            }
        }

        Ok(self.write_all(&mut kinds, entities))
    }
}
