//! leasehub-server: HTTP API for the leasing platform
//!
//! MongoDB repositories, mail/SMS notifiers and the axum router that
//! exposes properties, staff, visitors, leads and wishlists.

pub mod config;
pub mod db;
pub mod http;
pub mod notify;

pub use config::{AppConfig, ConfigError};
pub use http::{build_router, run_server, ApiError, AppState, ServerConfig, ServerError};
