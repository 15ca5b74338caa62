//! Staff login
//!
//! Checks the password and resolves the user's role and navigation menu.
//! No session is issued; callers keep using the API key.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Router;
use serde::Deserialize;
use serde_json::json;

use leasehub_core::validation::normalize_email;
use leasehub_core::{doc_json, Envelope};

use super::users::verify_password;
use super::{ok, Reply};
use crate::db::repos::{MenuRepo, ProfileRepo, RoleRepo, UserRepo};
use crate::http::error::ApiError;
use crate::http::extractors::JsonBody;
use crate::http::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// POST /login
async fn login(State(state): State<Arc<AppState>>, JsonBody(req): JsonBody<LoginRequest>) -> Reply {
    let email = req.email.as_deref().map(normalize_email).unwrap_or_default();
    let password = req.password.unwrap_or_default();
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required."));
    }

    let user = UserRepo::new(&state.db)
        .credentials(&email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;
    if !verify_password(&password, &user.password) {
        tracing::info!(email = %email, "login rejected");
        return Err(ApiError::InvalidCredentials);
    }
    let user_id = user.id.ok_or(ApiError::InvalidCredentials)?;

    let profile = ProfileRepo::new(&state.db)
        .by_user(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Login failed: User profile not found."))?;
    let role = RoleRepo::new(&state.db)
        .get_typed(profile.role_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Login failed: Could not determine user role."))?;
    let menu = MenuRepo::new(&state.db)
        .for_role(&role)
        .await?
        .ok_or_else(|| ApiError::not_found("Login failed: Could not fetch menu data."))?;

    tracing::info!(user_id = %user_id, role = %role.role_name, "login");
    ok(Envelope::ok("Login successful").data(json!({
        "userId": user_id.to_hex(),
        "email": user.email,
        "role": role.role_name,
        "menuData": doc_json(menu),
    })))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/login", post(login))
}
