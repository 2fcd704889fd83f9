use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use axum_hwshare::allocation::AllocationEngine;
use axum_hwshare::config::{AuthConfig, Config, RedisConfig, ServerConfig};
use axum_hwshare::router;
use axum_hwshare::services::{AuthService, MemoryStore, Store};

fn app() -> Router {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let config = Config {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        },
        redis: RedisConfig {
            url: "redis://unused".into(),
        },
        auth: AuthConfig {
            bcrypt_cost: 4, // minimum cost, tests only
            token_ttl_secs: 3600,
        },
    };
    let engine = AllocationEngine::new(store.clone());
    let auth = AuthService::new(store, &config.auth);
    router((engine, auth, config))
}

async fn send(
    app: &Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn register(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/register",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn register_login_and_reserve_hardware() {
    let app = app();
    let token = register(&app, "alice", "secret1").await;

    let (status, body) = send(
        &app,
        "POST",
        "/login",
        None,
        Some(json!({ "username": "alice", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token2 = body["token"].as_str().unwrap().to_string();
    assert_ne!(token, token2);

    // Provision a pool and a project
    let (status, _) = send(
        &app,
        "POST",
        "/hardware",
        Some(&token),
        Some(json!({ "name": "HWSet1", "capacity": 100 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        "POST",
        "/projects",
        Some(&token),
        Some(json!({ "name": "demo", "description": "test project" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let project_id = body["projects"][0]["id"].as_str().unwrap().to_string();
    assert_eq!(project_id, "alice_1");

    // Check out, check in, then over-ask
    let (status, body) = send(
        &app,
        "POST",
        "/checkout",
        Some(&token),
        Some(json!({ "name": "HWSet1", "amount": 30, "projectId": project_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], 70);
    assert_eq!(body["checked_out"], 30);

    let (status, body) = send(
        &app,
        "POST",
        "/checkin",
        Some(&token),
        Some(json!({ "name": "HWSet1", "amount": 10, "projectId": project_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], 80);
    assert_eq!(body["checked_out"], 20);

    let (status, body) = send(
        &app,
        "POST",
        "/checkout",
        Some(&token),
        Some(json!({ "name": "HWSet1", "amount": 90, "projectId": project_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("insufficient"));

    // The listing reflects the surviving allocation
    let (status, body) = send(&app, "GET", "/hardware", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["available"], 80);
    assert_eq!(body[0]["capacity"], 100);
}

#[tokio::test]
async fn registration_validation_and_conflicts() {
    let app = app();

    let (status, _) = send(
        &app,
        "POST",
        "/register",
        None,
        Some(json!({ "username": "bo", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    register(&app, "bob", "secret1").await;

    let (status, _) = send(
        &app,
        "POST",
        "/register",
        None,
        Some(json!({ "username": "bob", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = app();

    let (status, _) = send(&app, "GET", "/hardware", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/hardware", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = register(&app, "carol", "secret1").await;
    let (status, _) = send(&app, "GET", "/hardware", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    // Logout invalidates the token
    let (status, _) = send(&app, "POST", "/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", "/hardware", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn membership_toggle_round_trip() {
    let app = app();
    let alice = register(&app, "alice", "secret1").await;
    let bob = register(&app, "bob", "secret1").await;

    let (_, body) = send(
        &app,
        "POST",
        "/projects",
        Some(&alice),
        Some(json!({ "name": "shared", "description": "" })),
    )
    .await;
    let project_id = body["projects"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/projects/toggle",
        Some(&bob),
        Some(json!({ "projectid": project_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["new_status"], true);
    assert_eq!(body["projects"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        "POST",
        "/projects/toggle",
        Some(&bob),
        Some(json!({ "projectid": project_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["new_status"], false);
    assert_eq!(body["projects"].as_array().unwrap().len(), 0);

    // Filtered listing only shows the member's projects
    let (_, body) = send(&app, "GET", "/projects?user=alice", Some(&alice), None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    let (_, body) = send(&app, "GET", "/projects?user=bob", Some(&bob), None).await;
    assert_eq!(body.as_array().unwrap().len(), 0);
}
