//! Staff user endpoints
//!
//! Passwords are stored as argon2 PHC strings and never returned.

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::{Query, State};
use axum::routing::{get, post, put};
use axum::Router;
use bson::{Bson, DateTime};
use serde::Deserialize;
use serde_json::Value;

use leasehub_core::models::NewUser;
use leasehub_core::validation::normalize_email;
use leasehub_core::{json_to_document, Envelope, Pagination};

use super::{created, id_param, ok, Created, Reply};
use crate::db::repos::UserRepo;
use crate::http::error::ApiError;
use crate::http::extractors::JsonBody;
use crate::http::server::AppState;

pub(crate) fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal {
            message: format!("password hashing failed: {e}"),
        })
}

/// False for a wrong password and for a stored value that is not a PHC
/// string.
pub(crate) fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserIdQuery {
    #[serde(rename = "userId", alias = "Id")]
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MobileQuery {
    pub mobile: Option<String>,
    pub page: Option<String>,
    pub size: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub user_id: Option<String>,
    pub update_data: Option<Value>,
}

/// GET /getUsersDataWithEmail
async fn by_email(State(state): State<Arc<AppState>>, Query(q): Query<EmailQuery>) -> Reply {
    let email = q
        .email
        .as_deref()
        .map(normalize_email)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::bad_request("Bad Request: Email parameter is required"))?;
    let user = UserRepo::new(&state.db)
        .find_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::not_found("No user found with this email"))?;
    ok(Envelope::ok("User fetched successfully").document(user))
}

/// GET /getUsersDataWithId
async fn by_id(State(state): State<Arc<AppState>>, Query(q): Query<UserIdQuery>) -> Reply {
    let id = id_param(q.user_id.as_deref(), "Id parameter is required", "Invalid user ID format")?;
    let user = UserRepo::new(&state.db)
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    ok(Envelope::ok("User fetched successfully").document(user))
}

/// GET /getUsersDataWithMobile - partial match, strict paging
async fn by_mobile(State(state): State<Arc<AppState>>, Query(q): Query<MobileQuery>) -> Reply {
    let page = Pagination::strict(q.page.as_deref(), q.size.as_deref())?;
    let mobile = q.mobile.as_deref().map(str::trim).unwrap_or_default();
    let result = UserRepo::new(&state.db).search_by_mobile(mobile, page).await?;
    ok(Envelope::ok("Users fetched successfully").paginated(result))
}

/// POST /postUsersData
async fn create(State(state): State<Arc<AppState>>, JsonBody(input): JsonBody<NewUser>) -> Created {
    let valid = input.validate()?;
    let repo = UserRepo::new(&state.db);
    if repo.exists(&valid.email, valid.mobile.as_deref()).await? {
        return Err(ApiError::conflict("User already exists in database"));
    }
    let hash = hash_password(&valid.password)?;
    let user = repo
        .create(&valid.into_user(hash, DateTime::now()))
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => ApiError::conflict("User already exists in database"),
            other => other,
        })?;
    created(Envelope::ok("User created successfully").document(user))
}

/// PUT /putUsersDataWithId - `{userId, updateData}`
async fn update(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<UpdateUserRequest>,
) -> Reply {
    let (Some(raw_id), Some(update_data)) = (req.user_id.as_deref(), req.update_data) else {
        return Err(ApiError::bad_request("userId and updateData are required"));
    };
    let id = id_param(Some(raw_id), "userId and updateData are required", "Invalid userId format")?;

    let mut patch = json_to_document(update_data)?;
    if let Some(Bson::String(password)) = patch.get("password") {
        let hash = hash_password(password)?;
        patch.insert("password", hash);
    }
    if let Some(Bson::String(email)) = patch.get("email") {
        let email = normalize_email(email);
        patch.insert("email", email);
    }

    let user = UserRepo::new(&state.db)
        .update(id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    ok(Envelope::ok("User updated successfully").document(user))
}

/// User routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/getUsersDataWithEmail", get(by_email))
        .route("/getUsersDataWithId", get(by_id))
        .route("/getUsersDataWithMobile", get(by_mobile))
        .route("/postUsersData", post(create))
        .route("/putUsersDataWithId", put(update))
}
