//! Identity Toolkit client against a local mock of the REST API.
//! Request shapes, auth headers and provider error mapping.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use axum::Router;
use claims_gateway::config::DirectoryConfig;
use claims_gateway::identity::{
    AuthDirectory, CallerResolver, Claims, DirectoryError, IdentityToolkitDirectory, RoleFlag,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const SERVER_TOKEN: &str = "server-token";

#[derive(Clone, Default)]
struct Mock {
    updates: Arc<Mutex<Vec<Value>>>,
}

fn provider_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({"error": {"code": status.as_u16(), "message": message}})),
    )
        .into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {SERVER_TOKEN}"))
}

async fn admin_lookup(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return provider_error(StatusCode::UNAUTHORIZED, "CREDENTIAL_MISSING");
    }
    match body["email"][0].as_str() {
        Some("a@x.com") => Json(json!({
            "kind": "identitytoolkit#GetAccountInfoResponse",
            "users": [{
                "localId": "uid-a",
                "email": "a@x.com",
                "customAttributes": "{\"admin\":true,\"author\":true}"
            }]
        }))
        .into_response(),
        Some("plain@x.com") => Json(json!({
            "users": [{"localId": "uid-plain", "email": "plain@x.com"}]
        }))
        .into_response(),
        Some("not-an-email") => provider_error(StatusCode::BAD_REQUEST, "INVALID_EMAIL"),
        _ => Json(json!({"kind": "identitytoolkit#GetAccountInfoResponse"})).into_response(),
    }
}

async fn admin_update(
    State(mock): State<Mock>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return provider_error(StatusCode::UNAUTHORIZED, "CREDENTIAL_MISSING");
    }
    if body["localId"] == "missing" {
        return provider_error(StatusCode::BAD_REQUEST, "USER_NOT_FOUND");
    }
    mock.updates.lock().unwrap().push(body.clone());
    Json(json!({"localId": body["localId"]})).into_response()
}

async fn token_lookup(
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    if query.get("key").map(String::as_str) != Some("web-key") {
        return provider_error(StatusCode::BAD_REQUEST, "API key not valid. Please pass a valid API key.");
    }
    match body["idToken"].as_str() {
        Some("good-token") => Json(json!({
            "users": [{
                "localId": "uid-owner",
                "email": "owner@x.com",
                "customAttributes": "{\"author\":true}"
            }]
        }))
        .into_response(),
        Some("expired-token") => provider_error(StatusCode::BAD_REQUEST, "TOKEN_EXPIRED"),
        _ => provider_error(StatusCode::BAD_REQUEST, "INVALID_ID_TOKEN"),
    }
}

async fn start_mock() -> (Mock, String) {
    let mock = Mock::default();
    let app = Router::new()
        .route("/v1/projects/demo/accounts:lookup", post(admin_lookup))
        .route("/v1/projects/demo/accounts:update", post(admin_update))
        .route("/v1/accounts:lookup", post(token_lookup))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (mock, format!("http://{addr}"))
}

fn client(endpoint: &str, access_token: Option<&str>) -> IdentityToolkitDirectory {
    IdentityToolkitDirectory::new(&DirectoryConfig {
        backend: "identity_toolkit".into(),
        endpoint: Some(endpoint.to_owned()),
        project_id: Some("demo".into()),
        api_key: Some("web-key".into()),
        access_token: access_token.map(str::to_owned),
        users: Vec::new(),
    })
    .unwrap()
}

#[tokio::test]
async fn lookup_by_email_parses_user_record() {
    let (_mock, endpoint) = start_mock().await;
    let dir = client(&endpoint, Some(SERVER_TOKEN));

    let identity = dir.lookup_by_email("a@x.com").await.unwrap();
    assert_eq!(identity.uid, "uid-a");
    assert_eq!(identity.email.as_deref(), Some("a@x.com"));
    assert!(identity.claims.is_admin());
    assert_eq!(identity.claims.get(RoleFlag::Author), Some(true));

    let plain = dir.lookup_by_email("plain@x.com").await.unwrap();
    assert!(plain.claims.is_empty());
}

#[tokio::test]
async fn empty_lookup_is_user_not_found() {
    let (_mock, endpoint) = start_mock().await;
    let dir = client(&endpoint, Some(SERVER_TOKEN));
    let err = dir.lookup_by_email("ghost@x.com").await.unwrap_err();
    assert!(matches!(err, DirectoryError::UserNotFound(ref e) if e == "ghost@x.com"));
}

#[tokio::test]
async fn provider_errors_keep_status_and_message() {
    let (_mock, endpoint) = start_mock().await;
    let dir = client(&endpoint, Some(SERVER_TOKEN));
    match dir.lookup_by_email("not-an-email").await.unwrap_err() {
        DirectoryError::Provider { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "INVALID_EMAIL");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn admin_calls_without_access_token_are_rejected() {
    let (_mock, endpoint) = start_mock().await;
    let dir = client(&endpoint, None);
    let err = dir.lookup_by_email("a@x.com").await.unwrap_err();
    assert!(matches!(err, DirectoryError::Provider { status: 401, .. }));
}

#[tokio::test]
async fn replace_claims_sends_custom_attributes_string() {
    let (mock, endpoint) = start_mock().await;
    let dir = client(&endpoint, Some(SERVER_TOKEN));

    let claims = Claims::new()
        .with(RoleFlag::Author, false)
        .with(RoleFlag::Admin, false)
        .with(RoleFlag::Guest, true);
    dir.replace_claims("uid-a", &claims).await.unwrap();

    let updates = mock.updates.lock().unwrap().clone();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["localId"], "uid-a");
    let attrs = updates[0]["customAttributes"].as_str().unwrap();
    assert_eq!(Claims::from_attributes(attrs).unwrap(), claims);
}

#[tokio::test]
async fn replace_claims_for_missing_uid_is_not_found() {
    let (mock, endpoint) = start_mock().await;
    let dir = client(&endpoint, Some(SERVER_TOKEN));
    let err = dir
        .replace_claims("missing", &Claims::new().with(RoleFlag::Admin, true))
        .await
        .unwrap_err();
    assert!(matches!(err, DirectoryError::UserNotFound(_)));
    assert!(mock.updates.lock().unwrap().is_empty());
}

#[tokio::test]
async fn caller_tokens_are_resolved_by_the_provider() {
    let (_mock, endpoint) = start_mock().await;
    let dir = client(&endpoint, Some(SERVER_TOKEN));

    let caller = dir.resolve("good-token").await.unwrap();
    assert_eq!(caller.uid, "uid-owner");
    assert_eq!(caller.email.as_deref(), Some("owner@x.com"));
    assert!(!caller.is_admin());

    for token in ["expired-token", "garbage"] {
        assert!(matches!(dir.resolve(token).await, Err(DirectoryError::InvalidToken)));
    }
}

#[tokio::test]
async fn unreachable_provider_is_a_transport_error() {
    // Bind then drop to get a port with nothing listening.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let dir = client(&format!("http://{addr}"), Some(SERVER_TOKEN));
    let err = dir.lookup_by_email("a@x.com").await.unwrap_err();
    assert!(matches!(err, DirectoryError::Transport(_)));
}
