//! Liveness and readiness checks (no API key)

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::db::ping;
use crate::http::server::AppState;

const PING_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Serialize)]
pub struct Liveness {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Readiness {
    pub status: &'static str,
    pub database: String,
}

/// GET /health
async fn live() -> Json<Liveness> {
    Json(Liveness {
        status: "ok",
        service: "leasehub",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /health/ready - 503 until MongoDB answers a ping
async fn ready(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Readiness>) {
    let database = state.db.name().to_owned();
    match tokio::time::timeout(PING_TIMEOUT, ping(&state.db)).await {
        Ok(Ok(())) => (StatusCode::OK, Json(Readiness { status: "ready", database })),
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "readiness ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Readiness { status: "unavailable", database }),
            )
        }
        Err(_) => {
            tracing::warn!(timeout = ?PING_TIMEOUT, "readiness ping timed out");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Readiness { status: "unavailable", database }),
            )
        }
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(live))
        .route("/health/ready", get(ready))
}

#[cfg(test)]
mod tests {
    use crate::http::test_support::{call, get, test_app};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn liveness_needs_no_key() {
        let (status, body) = call(test_app(), get("/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "leasehub");
    }

    #[tokio::test]
    async fn readiness_reports_unreachable_database() {
        // test_app points at a client that is never connected
        let (status, body) = call(test_app(), get("/health/ready", None)).await;
        if status == StatusCode::OK {
            // a local MongoDB happens to be running
            assert_eq!(body["status"], "ready");
        } else {
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(body["status"], "unavailable");
            assert_eq!(body["database"], "leasehub_test");
        }
    }
}
