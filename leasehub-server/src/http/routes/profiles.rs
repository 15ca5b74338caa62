//! Staff profile endpoints

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post, put};
use axum::Router;
use bson::DateTime;
use serde::Deserialize;
use serde_json::Value;

use leasehub_core::models::NewProfile;
use leasehub_core::validation::require_object_id;
use leasehub_core::{json_to_document, Envelope, RoleKind, ValidationError};

use super::users::UserIdQuery;
use super::{created, id_param, ok, Created, Reply};
use crate::db::repos::{ProfileRepo, RoleRepo};
use crate::http::error::ApiError;
use crate::http::extractors::JsonBody;
use crate::http::server::AppState;

const NO_PROFILE: &str = "No profile found for this userId";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub user_id: Option<String>,
    pub update_data: Option<Value>,
}

/// GET /getUsersProfileDataWithUserId
async fn by_user(State(state): State<Arc<AppState>>, Query(q): Query<UserIdQuery>) -> Reply {
    let user_id = id_param(q.user_id.as_deref(), "userId is required", "Invalid userId format")?;
    let profile = ProfileRepo::new(&state.db)
        .doc_by_user(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found(NO_PROFILE))?;
    ok(Envelope::ok("Profile fetched successfully").document(profile))
}

/// POST /postUsersProfileData
///
/// The role decides whether a manager is mandatory, so it is resolved
/// before the rest of the payload is validated.
async fn create(
    State(state): State<Arc<AppState>>,
    JsonBody(input): JsonBody<NewProfile>,
) -> Created {
    let role_id = require_object_id("roleId", input.role_id.as_deref())
        .map_err(|_| ValidationError::message("Valid roleId (ObjectId) is required"))?;
    let role = RoleRepo::new(&state.db)
        .get_typed(role_id)
        .await?
        .ok_or_else(|| ApiError::bad_request("Role not found for the provided roleId"))?;
    let is_handler = RoleKind::from_name(&role.role_name).is_handler();

    let profile = input.into_profile(is_handler, DateTime::now())?;
    let stored = ProfileRepo::new(&state.db)
        .create(&profile)
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => ApiError::conflict("Profile already exists for this user"),
            other => other,
        })?;
    tracing::info!(user_id = %profile.user_id, role = %role.role_name, "profile created");
    created(Envelope::ok("User profile created successfully").document(stored))
}

/// PUT /putUsersProfileDataWithUserId - `{userId, updateData}`
async fn update(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<UpdateProfileRequest>,
) -> Reply {
    let user_id = id_param(req.user_id.as_deref(), "userId is required", "Invalid userId format")?;
    let patch = match req.update_data {
        Some(data @ Value::Object(_)) => json_to_document(data)?,
        _ => return Err(ApiError::bad_request("updateData is required and must be an object")),
    };
    let profile = ProfileRepo::new(&state.db)
        .update_by_user(user_id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found(NO_PROFILE))?;
    ok(Envelope::ok("User profile updated successfully").document(profile))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/getUsersProfileDataWithUserId", get(by_user))
        .route("/postUsersProfileData", post(create))
        .route("/putUsersProfileDataWithUserId", put(update))
}

#[cfg(test)]
mod tests {
    use crate::http::test_support::{call, send, test_app};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn lookup_validates_user_id() {
        let (status, body) = call(
            test_app(),
            send(Method::GET, "/api/getUsersProfileDataWithUserId?userId=abc", None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid userId format");
    }

    #[tokio::test]
    async fn create_requires_role_id() {
        let (status, body) = call(
            test_app(),
            send(
                Method::POST,
                "/api/postUsersProfileData",
                Some(json!({ "userId": "64b7f0c2a1b2c3d4e5f60718" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Valid roleId (ObjectId) is required");
    }

    #[tokio::test]
    async fn update_needs_object_patch() {
        let (status, body) = call(
            test_app(),
            send(
                Method::PUT,
                "/api/putUsersProfileDataWithUserId",
                Some(json!({ "userId": "64b7f0c2a1b2c3d4e5f60718", "updateData": [1, 2] })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "updateData is required and must be an object");
    }
}
