#![allow(dead_code)]

pub mod fixtures;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use bridge::telegram::Credentials;
use bridge::{create_router, AppState, ClientManager};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use fixtures::FakeTelegram;

pub fn credentials() -> Credentials {
    Credentials {
        api_id: 123456,
        api_hash: "0123456789abcdef0123456789abcdef".to_string(),
        phone: "+15550001111".to_string(),
    }
}

pub fn manager(fake: &Arc<FakeTelegram>) -> Arc<ClientManager> {
    Arc::new(ClientManager::new(fake.clone()))
}

pub async fn configured_manager(fake: &Arc<FakeTelegram>) -> Arc<ClientManager> {
    let manager = manager(fake);
    manager.configure(credentials()).await;
    manager
}

pub fn app(fake: &Arc<FakeTelegram>, api_key: Option<&str>) -> Router {
    create_router(AppState::new(manager(fake), api_key.map(str::to_string)))
}

/// Sends one request through the router and decodes the JSON reply
/// (`Value::Null` for an empty or non-JSON body).
pub async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    call_with_token(app, method, uri, body, None).await
}

pub async fn call_with_token(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
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
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, value)
}
