use datastore_client::{HttpStoreClient, StoreClient, StoreError};
use datastore_emulator::{EmulatorError, EmulatorManager, EmulatorServer};
use datastore_types::{Entity, Fields, Filter, Key, Kind, Query};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::net::SocketAddr;

async fn post(server: &EmulatorServer, path: &str, body: serde_json::Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{}{}", server.host(), path))
        .json(&body)
        .send()
        .await
        .unwrap()
}

// ── Routes ───────────────────────────────────────────────────────

#[tokio::test]
async fn reset_clears_the_backing_store() {
    let server = EmulatorServer::start().await.unwrap();
    server
        .store()
        .save(vec![Entity::new(
            Key::incomplete("Account").unwrap(),
            Fields::new().with("email", "a@x.com"),
        )])
        .await
        .unwrap();

    let resp = reqwest::Client::new()
        .post(format!("http://{}/reset", server.host()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(server.store().count(&Kind::new("Account").unwrap()).await, 0);
}

#[tokio::test]
async fn lookup_reports_found_and_missing_keys() {
    let server = EmulatorServer::start().await.unwrap();
    server
        .store()
        .save(vec![Entity::new(
            Key::complete("Account", 1).unwrap(),
            Fields::new().with("email", "a@x.com"),
        )])
        .await
        .unwrap();

    let resp = post(
        &server,
        "/v1/projects/demo:lookup",
        json!({
            "keys": [
                { "path": [{ "kind": "Account", "id": "1" }] },
                { "path": [{ "kind": "Account", "name": "ghost" }] }
            ]
        }),
    )
    .await;
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["found"].as_array().unwrap().len(), 1);
    assert_eq!(
        body["found"][0]["entity"]["properties"]["email"],
        json!({ "stringValue": "a@x.com" })
    );
    assert_eq!(
        body["missing"][0]["entity"]["key"]["path"][0]["name"],
        json!("ghost")
    );
}

#[tokio::test]
async fn lookup_echoes_each_keys_own_partition() {
    let server = EmulatorServer::start().await.unwrap();
    server
        .store()
        .save(vec![Entity::new(
            Key::complete("Account", 1).unwrap(),
            Fields::new().with("email", "a@x.com"),
        )])
        .await
        .unwrap();

    let resp = post(
        &server,
        "/v1/projects/demo:lookup",
        json!({
            "keys": [
                {
                    "partitionId": { "projectId": "demo", "namespaceId": "first" },
                    "path": [{ "kind": "Account", "name": "ghost" }]
                },
                {
                    "partitionId": { "projectId": "demo", "namespaceId": "second" },
                    "path": [{ "kind": "Account", "id": "1" }]
                }
            ]
        }),
    )
    .await;
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(
        body["found"][0]["entity"]["key"]["partitionId"]["namespaceId"],
        json!("second")
    );
    assert_eq!(
        body["missing"][0]["entity"]["key"]["partitionId"]["namespaceId"],
        json!("first")
    );
}

#[tokio::test]
async fn mixed_commit_is_refused_without_writing() {
    let server = EmulatorServer::start().await.unwrap();
    let resp = post(
        &server,
        "/v1/projects/demo:commit",
        json!({
            "mode": "NON_TRANSACTIONAL",
            "mutations": [
                { "upsert": {
                    "key": { "path": [{ "kind": "Account", "name": "kept-out" }] },
                    "properties": { "email": { "stringValue": "a@x.com" } }
                } },
                { "insert": {
                    "key": { "path": [{ "kind": "Account", "name": "fresh" }] },
                    "properties": { "email": { "stringValue": "b@x.com" } }
                } }
            ]
        }),
    )
    .await;
    assert_eq!(resp.status(), 400);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["status"], json!("INVALID_ARGUMENT"));
    assert_eq!(server.store().count(&Kind::new("Account").unwrap()).await, 0);
}

#[tokio::test]
async fn insert_batch_with_a_conflict_writes_nothing() {
    let server = EmulatorServer::start().await.unwrap();
    server
        .store()
        .save(vec![Entity::new(
            Key::complete("Account", "taken").unwrap(),
            Fields::new().with("email", "a@x.com"),
        )])
        .await
        .unwrap();

    let resp = post(
        &server,
        "/v1/projects/demo:commit",
        json!({
            "mode": "NON_TRANSACTIONAL",
            "mutations": [
                { "insert": {
                    "key": { "path": [{ "kind": "Account", "name": "fresh" }] },
                    "properties": {}
                } },
                { "insert": {
                    "key": { "path": [{ "kind": "Account", "name": "taken" }] },
                    "properties": {}
                } }
            ]
        }),
    )
    .await;
    assert_eq!(resp.status(), 409);
    assert_eq!(server.store().count(&Kind::new("Account").unwrap()).await, 1);
}

#[tokio::test]
async fn unknown_method_is_not_found() {
    let server = EmulatorServer::start().await.unwrap();
    let resp = post(&server, "/v1/projects/demo:allocateIds", json!({})).await;
    assert_eq!(resp.status(), 404);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["status"], json!("NOT_FOUND"));
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let server = EmulatorServer::start().await.unwrap();
    let resp = post(&server, "/v1/projects/demo:commit", json!({ "mutations": 3 })).await;
    assert_eq!(resp.status(), 400);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["status"], json!("INVALID_ARGUMENT"));
}

#[tokio::test]
async fn unsupported_operator_is_rejected() {
    let server = EmulatorServer::start().await.unwrap();
    let resp = post(
        &server,
        "/v1/projects/demo:runQuery",
        json!({
            "query": {
                "kind": [{ "name": "Account" }],
                "filter": { "propertyFilter": {
                    "property": { "name": "level" },
                    "op": "GREATER_THAN",
                    "value": { "integerValue": "3" }
                } }
            }
        }),
    )
    .await;
    assert_eq!(resp.status(), 400);
}

// ── Through the REST client ──────────────────────────────────────

#[tokio::test]
async fn insert_conflict_maps_to_already_exists() {
    let server = EmulatorServer::start().await.unwrap();
    let client = HttpStoreClient::new(server.options("demo")).unwrap();
    let entity = Entity::new(
        Key::complete("Account", "dup").unwrap(),
        Fields::new().with("email", "a@x.com"),
    );

    client.insert(vec![entity.clone()]).await.unwrap();
    let err = client.insert(vec![entity]).await.unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists(_)));
}

#[tokio::test]
async fn small_pages_are_followed_to_the_end() {
    let server = EmulatorServer::bind(SocketAddr::from(([127, 0, 0, 1], 0)), 2)
        .await
        .unwrap();
    let client = HttpStoreClient::new(server.options("demo")).unwrap();

    let entities = (0..7)
        .map(|i| {
            Entity::new(
                Key::incomplete("Account").unwrap(),
                Fields::new().with("level", i % 2).with("n", i),
            )
        })
        .collect();
    client.save(entities).await.unwrap();

    let all = client.run_query(&Query::new("Account").unwrap()).await.unwrap();
    assert_eq!(all.len(), 7);

    let odd = client
        .run_query(&Query::new("Account").unwrap().with_filter(Filter::eq("level", 1)))
        .await
        .unwrap();
    assert_eq!(odd.len(), 3);
}

#[tokio::test]
async fn mixed_types_round_trip_through_the_wire() {
    let server = EmulatorServer::start().await.unwrap();
    let client = HttpStoreClient::new(server.options("demo")).unwrap();
    let fields = Fields::new()
        .with("active", true)
        .with("ratio", 0.25)
        .with("count", -12_i64)
        .with("note", Option::<String>::None)
        .with("name", "ada");

    let keys = client
        .save(vec![Entity::new(Key::complete("Profile", "ada").unwrap(), fields.clone())])
        .await
        .unwrap();
    let found = client.get(&keys).await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].fields, fields);
}

// ── Manager ──────────────────────────────────────────────────────

#[tokio::test]
async fn reset_against_a_dead_host_fails() {
    let manager = EmulatorManager::new("127.0.0.1:1", "demo").unwrap();
    let err = manager.reset().await.unwrap_err();
    assert!(matches!(err, EmulatorError::Http(_)));
}

#[tokio::test]
async fn manager_targets_the_given_host() {
    let server = EmulatorServer::start().await.unwrap();
    let manager = server.manager("demo").unwrap();

    assert_eq!(manager.host(), server.host());
    assert_eq!(manager.options(), server.options("demo"));

    manager
        .create_entity("Account", Fields::new().with("email", "a@x.com"), None)
        .await
        .unwrap();
    assert_eq!(server.store().count(&Kind::new("Account").unwrap()).await, 1);
}
