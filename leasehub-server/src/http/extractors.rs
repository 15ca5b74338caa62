//! Custom Axum extractors

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::error::ApiError;
use super::server::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

fn check_key(supplied: Option<&str>, expected: &str) -> Result<(), ApiError> {
    match supplied {
        None | Some("") => Err(ApiError::Unauthorized),
        Some(key) if key == expected => Ok(()),
        Some(_) => Err(ApiError::Forbidden),
    }
}

fn header_key(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
}

/// Shared-secret check on the `x-api-key` header
pub struct ApiKey;

impl FromRequestParts<Arc<AppState>> for ApiKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        check_key(header_key(parts), &state.config.api_key)?;
        Ok(Self)
    }
}

#[derive(Deserialize)]
struct AuthKeyQuery {
    authkey: Option<String>,
}

/// Like [`ApiKey`], but the key may also arrive as the `authkey` query
/// parameter (roles and menus).
pub struct RoleApiKey;

impl FromRequestParts<Arc<AppState>> for RoleApiKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let from_query = Query::<AuthKeyQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.authkey);
        let supplied = header_key(parts)
            .filter(|key| !key.is_empty())
            .or(from_query.as_deref());
        check_key(supplied, &state.config.api_key)?;
        Ok(Self)
    }
}

/// JSON body whose rejection uses the API error envelope.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            tracing::debug!(error = %rejection, "rejected request body");
            ApiError::bad_request("Invalid JSON body")
        })?;
        Ok(Self(value))
    }
}
