//! A local emulator speaking the REST subset the client uses.
//!
//! Serves `:lookup`, `:runQuery` and `:commit` under
//! `/v1/projects/{project}` plus `POST /reset`, backed by a
//! [`MemoryStoreClient`]. Projects are not partitioned.

use crate::error::{EmulatorError, EmulatorResult};
use crate::manager::EmulatorManager;
use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::post,
};
use datastore_client::wire::{
    CommitRequest, CommitResponse, EntityResult, ErrorBody, ErrorResponse, LookupRequest,
    LookupResponse, MoreResults, MutationResult, OP_EQUAL, PartitionId, QueryResultBatch,
    RunQueryRequest, RunQueryResponse, WireEntity, WireKey, decode_value,
};
use datastore_client::{DatastoreOptions, MemoryStoreClient, StoreClient, StoreError};
use datastore_types::{Entity, Filter, Query, TypesError};
use serde::de::DeserializeOwned;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Entity results per query batch.
pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Clone)]
struct ServerState {
    store: Arc<MemoryStoreClient>,
    page_size: usize,
}

/// Build the emulator router over `store`.
pub fn build_router(store: Arc<MemoryStoreClient>, page_size: usize) -> Router {
    Router::new()
        .route("/reset", post(reset_handler))
        .route("/v1/projects/{target}", post(project_handler))
        .with_state(ServerState {
            store,
            page_size: page_size.max(1),
        })
}

/// Google-style error reply.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn invalid(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "INVALID_ARGUMENT",
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "NOT_FOUND",
            message: message.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AlreadyExists(key) => Self {
                status: StatusCode::CONFLICT,
                code: "ALREADY_EXISTS",
                message: format!("entity already exists: {key}"),
            },
            StoreError::InvalidResponse(message) => Self::invalid(message),
            StoreError::Types(e) => Self::invalid(e.to_string()),
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "INTERNAL",
                message: other.to_string(),
            },
        }
    }
}

impl From<TypesError> for ApiError {
    fn from(e: TypesError) -> Self {
        Self::invalid(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.status.as_u16(),
                message: self.message,
                status: Some(self.code.to_string()),
            },
        };
        (self.status, Json(body)).into_response()
    }
}

async fn reset_handler(State(state): State<ServerState>) -> &'static str {
    state.store.clear().await;
    "Reset\n"
}

async fn project_handler(
    State(state): State<ServerState>,
    Path(target): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let Some((project, method)) = target.split_once(':') else {
        return Err(ApiError::not_found(format!("no method in `{target}`")));
    };
    debug!(project, method, "Emulator request");

    match method {
        "lookup" => Ok(Json(lookup(&state, parse(&body)?).await?).into_response()),
        "runQuery" => Ok(Json(run_query(&state, parse(&body)?).await?).into_response()),
        "commit" => Ok(Json(commit(&state, parse(&body)?).await?).into_response()),
        other => Err(ApiError::not_found(format!("unknown method `{other}`"))),
    }
}

fn parse<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::invalid(format!("malformed request: {e}")))
}

fn partition_of(key: Option<&WireKey>) -> PartitionId {
    key.and_then(|k| k.partition_id.clone()).unwrap_or_default()
}

fn entity_result(entity: &Entity, partition: &PartitionId) -> EntityResult {
    EntityResult {
        entity: WireEntity::from_entity(entity, partition),
        version: None,
    }
}

async fn lookup(state: &ServerState, request: LookupRequest) -> Result<LookupResponse, ApiError> {
    let partitions: Vec<PartitionId> =
        request.keys.iter().map(|k| partition_of(Some(k))).collect();
    let keys = request
        .keys
        .iter()
        .map(WireKey::to_key)
        .collect::<Result<Vec<_>, _>>()?;

    let stored = state.store.get(&keys).await?;
    let mut found = Vec::new();
    let mut missing = Vec::new();
    for (key, partition) in keys.iter().zip(&partitions) {
        match stored.iter().find(|entity| &entity.key == key) {
            Some(entity) => found.push(entity_result(entity, partition)),
            None => missing.push(EntityResult {
                entity: WireEntity {
                    key: Some(WireKey::from_key(key, partition)),
                    properties: serde_json::Map::new(),
                },
                version: None,
            }),
        }
    }

    Ok(LookupResponse {
        found,
        missing,
        deferred: Vec::new(),
    })
}

async fn run_query(
    state: &ServerState,
    request: RunQueryRequest,
) -> Result<RunQueryResponse, ApiError> {
    let partition = request.partition_id.unwrap_or_default();
    let wire = request.query;
    let kind = wire
        .kind
        .first()
        .ok_or_else(|| ApiError::invalid("query has no kind"))?;

    let mut query = Query::new(&kind.name)?;
    if let Some(filter) = wire.filter {
        let property = filter.property_filter;
        if property.op != OP_EQUAL {
            return Err(ApiError::invalid(format!(
                "unsupported filter operator `{}`",
                property.op
            )));
        }
        let value = decode_value(&property.value)?;
        query = query.with_filter(Filter::eq(property.property.name, value));
    }

    let offset = match wire.start_cursor.as_deref() {
        Some(cursor) => cursor
            .parse::<usize>()
            .map_err(|_| ApiError::invalid(format!("bad cursor `{cursor}`")))?,
        None => 0,
    };

    let results = state.store.run_query(&query).await?;
    let end = offset.saturating_add(state.page_size).min(results.len());
    let page = results.get(offset..end).unwrap_or_default();

    Ok(RunQueryResponse {
        batch: QueryResultBatch {
            entity_results: page.iter().map(|e| entity_result(e, &partition)).collect(),
            end_cursor: Some(end.max(offset).to_string()),
            more_results: if end < results.len() {
                MoreResults::NotFinished
            } else {
                MoreResults::NoMoreResults
            },
        },
    })
}

/// Applies a batch of inserts or a batch of upserts, whole or not at all.
/// Mixed batches are refused.
async fn commit(state: &ServerState, request: CommitRequest) -> Result<CommitResponse, ApiError> {
    let mut batch_insert = None;
    let mut partitions = Vec::with_capacity(request.mutations.len());
    let mut entities = Vec::with_capacity(request.mutations.len());
    for mutation in request.mutations {
        let (insert, wire) = match (mutation.insert, mutation.upsert) {
            (Some(wire), None) => (true, wire),
            (None, Some(wire)) => (false, wire),
            _ => {
                return Err(ApiError::invalid(
                    "mutation must carry exactly one of insert or upsert",
                ));
            }
        };
        if *batch_insert.get_or_insert(insert) != insert {
            return Err(ApiError::invalid("a commit may not mix insert and upsert mutations"));
        }
        partitions.push(partition_of(wire.key.as_ref()));
        entities.push(wire.into_entity()?);
    }
    let allocated: Vec<bool> = entities.iter().map(|e| !e.key.is_complete()).collect();

    let keys = if batch_insert.unwrap_or(false) {
        state.store.insert(entities).await?
    } else {
        state.store.save(entities).await?
    };

    Ok(CommitResponse {
        mutation_results: keys
            .iter()
            .zip(allocated)
            .zip(&partitions)
            .map(|((key, allocated), partition)| MutationResult {
                key: allocated.then(|| WireKey::from_key(key, partition)),
            })
            .collect(),
    })
}

/// The emulator running on a background task. Stops when dropped.
pub struct EmulatorServer {
    addr: SocketAddr,
    store: Arc<MemoryStoreClient>,
    task: Option<JoinHandle<()>>,
}

impl EmulatorServer {
    /// Starts on an OS-assigned loopback port.
    pub async fn start() -> EmulatorResult<Self> {
        Self::bind(SocketAddr::from(([127, 0, 0, 1], 0)), DEFAULT_PAGE_SIZE).await
    }

    pub async fn bind(addr: SocketAddr, page_size: usize) -> EmulatorResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let store = Arc::new(MemoryStoreClient::new());
        let app = build_router(Arc::clone(&store), page_size);

        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                warn!("Emulator server stopped: {}", e);
            }
        });
        info!("Local emulator listening on {}", addr);

        Ok(Self {
            addr,
            store,
            task: Some(task),
        })
    }

    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `host:port`, as expected by `DATASTORE_EMULATOR_HOST`.
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    /// The backing store, for direct inspection.
    pub const fn store(&self) -> &Arc<MemoryStoreClient> {
        &self.store
    }

    pub fn options(&self, project_id: impl Into<String>) -> DatastoreOptions {
        DatastoreOptions::for_emulator(self.host(), project_id)
    }

    /// A harness talking to this server over HTTP.
    pub fn manager(&self, project_id: impl Into<String>) -> EmulatorResult<EmulatorManager> {
        EmulatorManager::new(self.host(), project_id)
    }

    /// Serves until the background task ends.
    pub async fn join(mut self) -> EmulatorResult<()> {
        match self.task.take() {
            Some(task) => task.await.map_err(|e| EmulatorError::Io(std::io::Error::other(e))),
            None => Ok(()),
        }
    }
}

impl Drop for EmulatorServer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for EmulatorServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmulatorServer")
            .field("addr", &self.addr)
            .finish_non_exhaustive()
    }
}
