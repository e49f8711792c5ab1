//! Cloud Datastore REST v1 client.
//!
//! Works against Google (`https://datastore.googleapis.com`, bearer token)
//! and against the emulator (plain HTTP, no auth).

use crate::client::StoreClient;
use crate::error::{StoreError, StoreResult};
use crate::options::DatastoreOptions;
use crate::wire::{
    CommitRequest, CommitResponse, ErrorResponse, KindExpression, LookupRequest, LookupResponse,
    MODE_NON_TRANSACTIONAL, MoreResults, Mutation, OP_EQUAL, PartitionId, PropertyFilter,
    PropertyReference, RunQueryRequest, RunQueryResponse, WireEntity, WireFilter, WireKey,
    WireQuery, encode_value,
};
use async_trait::async_trait;
use datastore_types::{Entity, Key, Query};
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound on lookup round-trips spent re-requesting deferred keys.
const MAX_DEFERRED_ROUNDS: usize = 16;

/// REST-backed [`StoreClient`].
pub struct HttpStoreClient {
    client: Client,
    base_url: String,
    project_id: String,
    partition: PartitionId,
    access_token: Option<String>,
}

impl HttpStoreClient {
    /// Creates a client bound to the project described by `options`.
    pub fn new(options: DatastoreOptions) -> StoreResult<Self> {
        let project_id = options.resolve_project_id()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .build()?;

        if options.access_token.is_none()
            && (options.credentials.is_some() || options.key_file.is_some())
        {
            warn!(
                "Service-account credentials are not exchanged for tokens by this client; \
                 set access_token to authenticate"
            );
        }

        let base_url = options.endpoint_url();
        debug!("Datastore client bound to project {} at {}", project_id, base_url);

        Ok(Self {
            client,
            base_url,
            partition: PartitionId {
                project_id: Some(project_id.clone()),
                namespace_id: options.namespace.clone(),
            },
            project_id,
            access_token: options.access_token,
        })
    }

    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/v1/projects/{}:{}",
            self.base_url,
            urlencoding::encode(&self.project_id),
            method
        )
    }

    async fn call<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> StoreResult<R> {
        let mut request = self.client.post(self.method_url(method)).json(body);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(error_from_response(method, response).await);
        }

        response.json().await.map_err(|e| {
            StoreError::InvalidResponse(format!("failed to parse {method} response: {e}"))
        })
    }

    async fn commit(&self, entities: Vec<Entity>, insert: bool) -> StoreResult<Vec<Key>> {
        let mutations = entities
            .iter()
            .map(|entity| {
                let wire = WireEntity::from_entity(entity, &self.partition);
                if insert {
                    Mutation {
                        insert: Some(wire),
                        upsert: None,
                    }
                } else {
                    Mutation {
                        insert: None,
                        upsert: Some(wire),
                    }
                }
            })
            .collect();

        let request = CommitRequest {
            mode: MODE_NON_TRANSACTIONAL.to_string(),
            mutations,
        };
        let response: CommitResponse = self.call("commit", &request).await?;

        if response.mutation_results.len() != entities.len() {
            return Err(StoreError::InvalidResponse(format!(
                "commit returned {} results for {} mutations",
                response.mutation_results.len(),
                entities.len()
            )));
        }

        entities
            .into_iter()
            .zip(response.mutation_results)
            .map(|(entity, result)| match result.key {
                Some(key) => key.to_key(),
                None if entity.key.is_complete() => Ok(entity.key),
                None => Err(StoreError::InvalidResponse(
                    "commit did not allocate an id for an incomplete key".to_string(),
                )),
            })
            .collect()
    }
}

#[async_trait]
impl StoreClient for HttpStoreClient {
    fn provider_name(&self) -> &'static str {
        "Cloud Datastore REST"
    }

    async fn get(&self, keys: &[Key]) -> StoreResult<Vec<Entity>> {
        let mut pending: Vec<WireKey> = keys
            .iter()
            .map(|key| WireKey::from_key(key, &self.partition))
            .collect();
        let mut found = Vec::new();

        for _ in 0..MAX_DEFERRED_ROUNDS {
            if pending.is_empty() {
                return Ok(found);
            }
            debug!("Looking up {} key(s)", pending.len());

            let response: LookupResponse = self
                .call("lookup", &LookupRequest { keys: pending })
                .await?;

            for result in response.found {
                found.push(result.entity.into_entity()?);
            }
            pending = response.deferred;
        }

        Err(StoreError::InvalidResponse(format!(
            "{} key(s) still deferred after {MAX_DEFERRED_ROUNDS} lookups",
            pending.len()
        )))
    }

    async fn run_query(&self, query: &Query) -> StoreResult<Vec<Entity>> {
        let filter = query.filter().map(|filter| WireFilter {
            property_filter: PropertyFilter {
                property: PropertyReference {
                    name: filter.field.clone(),
                },
                op: OP_EQUAL.to_string(),
                value: encode_value(&filter.value),
            },
        });

        let mut entities = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let request = RunQueryRequest {
                partition_id: Some(self.partition.clone()),
                query: WireQuery {
                    kind: vec![KindExpression {
                        name: query.kind().to_string(),
                    }],
                    filter: filter.clone(),
                    start_cursor: cursor.take(),
                },
            };

            let response: RunQueryResponse = self.call("runQuery", &request).await?;
            let batch = response.batch;

            for result in batch.entity_results {
                entities.push(result.entity.into_entity()?);
            }

            match (batch.more_results, batch.end_cursor) {
                (MoreResults::NotFinished, Some(end_cursor)) => cursor = Some(end_cursor),
                _ => break,
            }
        }

        debug!("Query on {} returned {} entities", query.kind(), entities.len());
        Ok(entities)
    }

    async fn save(&self, entities: Vec<Entity>) -> StoreResult<Vec<Key>> {
        self.commit(entities, false).await
    }

    async fn insert(&self, entities: Vec<Entity>) -> StoreResult<Vec<Key>> {
        self.commit(entities, true).await
    }
}

/// Maps a non-success response onto the error taxonomy.
async fn error_from_response(method: &str, response: Response) -> StoreError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let (message, api_status) = match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(parsed) => (parsed.error.message, parsed.error.status),
        Err(_) => (body, None),
    };

    match (status, api_status.as_deref()) {
        (401 | 403, _) => StoreError::Auth(format!("{method} rejected: {message}")),
        (409, Some("ALREADY_EXISTS")) => StoreError::AlreadyExists(message),
        _ => StoreError::Api {
            status,
            message: format!("{method} failed: {message}"),
        },
    }
}
