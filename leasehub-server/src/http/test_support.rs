//! Router test helpers: a state backed by an unconnected client, so only
//! requests rejected before touching the database can be exercised here.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use mongodb::options::{ClientOptions, ServerAddress};
use mongodb::Client;
use serde_json::Value;
use tower::ServiceExt;

use super::extractors::API_KEY_HEADER;
use super::server::{build_router, AppState};
use crate::config::AppConfig;
use crate::notify::{LogMailer, LogSms};

pub const TEST_KEY: &str = "test-key";

pub fn test_app() -> Router {
    let options = ClientOptions::builder()
        .hosts(vec![ServerAddress::Tcp {
            host: "localhost".into(),
            port: Some(27017),
        }])
        .build();
    let client = Client::with_options(options).expect("client options");
    let state = AppState {
        db: client.database("leasehub_test"),
        config: AppConfig::for_tests(TEST_KEY),
        mailer: Arc::new(LogMailer),
        sms: Arc::new(LogSms),
    };
    build_router(Arc::new(state), false)
}

pub fn get(uri: &str, key: Option<&str>) -> Request<Body> {
    request(Method::GET, uri, key, None)
}

/// Keyed request with an optional JSON body.
pub fn send(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    request(method, uri, Some(TEST_KEY), body)
}

fn request(method: Method, uri: &str, key: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = key {
        builder = builder.header(API_KEY_HEADER, key);
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request")
}

pub async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(req).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}
