//! Axum server setup
//!
//! Server skeleton with:
//! - Localhost-only CORS by default
//! - Tracing middleware
//! - API key check on everything under `/api`
//! - Graceful shutdown on SIGTERM/Ctrl+C

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::middleware::from_extractor_with_state;
use axum::Router;
use mongodb::Database;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::extractors::{ApiKey, RoleApiKey};
use super::routes;
use crate::config::AppConfig;
use crate::notify::{self, Mailer, SmsSender};

const LOCAL_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://localhost:3030",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:3030",
];

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:3030)
    pub bind_addr: SocketAddr,

    /// Allow permissive CORS (default: false = localhost only)
    ///
    /// WARNING: Setting this to true allows any origin.
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3030)),
            cors_permissive: false,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: AppConfig,
    pub mailer: Arc<dyn Mailer>,
    pub sms: Arc<dyn SmsSender>,
}

impl AppState {
    /// State with providers chosen from `config`.
    pub fn new(db: Database, config: AppConfig) -> Self {
        let (mailer, sms) = notify::from_config(&config);
        Self {
            db,
            config,
            mailer,
            sms,
        }
    }
}

fn cors_layer(permissive: bool) -> CorsLayer {
    if permissive {
        tracing::warn!("CORS: Permissive mode enabled - all origins allowed");
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(LOCAL_ORIGINS.map(HeaderValue::from_static))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Full application router; `/health` is open, `/api/*` needs the key.
pub fn build_router(state: Arc<AppState>, cors_permissive: bool) -> Router {
    let keyed = Router::new()
        .merge(routes::properties::router())
        .merge(routes::users::router())
        .merge(routes::auth::router())
        .merge(routes::profiles::router())
        .merge(routes::master::router())
        .merge(routes::visitors::router())
        .merge(routes::otp::router())
        .merge(routes::leads::router())
        .merge(routes::notifications::router())
        .merge(routes::wishlist::router())
        .merge(routes::misc::router())
        .route_layer(from_extractor_with_state::<ApiKey, _>(state.clone()));

    let admin = Router::new()
        .merge(routes::roles::router())
        .merge(routes::menus::router())
        .route_layer(from_extractor_with_state::<RoleApiKey, _>(state.clone()));

    Router::new()
        .merge(routes::health::router())
        .nest("/api", keyed.merge(admin))
        .layer(cors_layer(cors_permissive))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server.
///
/// # Example
///
/// ```ignore
/// let db = connect(&config.mongodb_uri, &config.database).await?;
/// run_server(AppState::new(db, config), ServerConfig::default()).await?;
/// ```
pub async fn run_server(state: AppState, config: ServerConfig) -> Result<(), ServerError> {
    let app = build_router(Arc::new(state), config.cors_permissive);

    // Bind listener
    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    // Run with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_support::{call, get, test_app, TEST_KEY};
    use axum::http::StatusCode;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 3030);
        assert!(!config.cors_permissive);
    }

    #[tokio::test]
    async fn health_needs_no_key() {
        let (status, body) = call(test_app(), get("/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn api_requires_key() {
        let (status, body) = call(test_app(), get("/api/getLeadsDataWithRequesterId", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Unauthorized: Invalid API Key");

        let (status, body) =
            call(test_app(), get("/api/getLeadsDataWithRequesterId", Some("wrong"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Invalid API Auth Key");
    }

    #[tokio::test]
    async fn role_routes_accept_query_key() {
        let uri = format!("/api/getRoleMenuWithId?authkey={TEST_KEY}");
        let (status, body) = call(test_app(), get(&uri, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "_id must be provided");

        let (status, _) = call(test_app(), get("/api/getRoleMenuWithId?authkey=nope", None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
