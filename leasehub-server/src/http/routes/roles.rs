//! Role administration
//!
//! Mounted on the admin router, so the key may also arrive as `authkey`.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post, put};
use axum::Router;
use bson::{DateTime, Document};
use serde::Deserialize;
use serde_json::{json, Value};

use leasehub_core::models::{NewRole, Role};
use leasehub_core::{doc_json, Envelope};

use super::{created, id_param, ok, Created, Reply};
use crate::db::repos::{DbError, MenuRepo, ProfileRepo, RoleRepo};
use crate::http::error::ApiError;
use crate::http::extractors::JsonBody;
use crate::http::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RoleIdQuery {
    #[serde(rename = "RoleID", alias = "roleId")]
    pub role_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleRequest {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    pub role_name: Option<String>,
    pub menu_id: Option<String>,
    pub is_verified: Option<Value>,
}

impl UpdateRoleRequest {
    /// Only non-empty names and boolean flags are applied.
    fn patch(&self) -> Document {
        let mut patch = Document::new();
        if let Some(name) = self.role_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            patch.insert("roleName", name);
        }
        if let Some(menu) = self.menu_id.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            patch.insert("menuId", menu);
        }
        if let Some(Value::Bool(flag)) = self.is_verified {
            patch.insert("isVerified", flag);
        }
        patch
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRoleRequest {
    pub user_id: Option<String>,
    pub role_id: Option<String>,
}

/// GET /getRolesData
async fn list(State(state): State<Arc<AppState>>) -> Reply {
    let roles = RoleRepo::new(&state.db).list().await?;
    let message = if roles.is_empty() { "No data found" } else { "Data fetched successfully" };
    ok(Envelope::ok(message).documents(roles))
}

/// GET /getRoleDataWithId - a single role, or all of them without `RoleID`
async fn by_id(State(state): State<Arc<AppState>>, Query(q): Query<RoleIdQuery>) -> Reply {
    let repo = RoleRepo::new(&state.db);
    if q.role_id.as_deref().map_or(true, |r| r.trim().is_empty()) {
        return ok(Envelope::ok("Roles fetched successfully").documents(repo.list().await?));
    }
    let id = id_param(q.role_id.as_deref(), "RoleID is required", "Invalid RoleID format")?;
    let role = repo
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("No role found for the given ID"))?;
    ok(Envelope::ok("Role fetched successfully").document(role))
}

/// POST /postRolesData
async fn create(State(state): State<Arc<AppState>>, JsonBody(input): JsonBody<NewRole>) -> Created {
    let role = input.into_role(DateTime::now())?;
    let stored = RoleRepo::new(&state.db).create(&role).await?;
    tracing::info!(role = %role.role_name, "role created");
    created(Envelope::ok("Role created successfully").document(stored))
}

/// PUT /putRolesData - `{id, roleName?, menuId?, isVerified?}`
async fn update(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<UpdateRoleRequest>,
) -> Reply {
    let id = id_param(req.id.as_deref(), "Role ID is required", "Invalid Role ID format")?;
    let role = RoleRepo::new(&state.db)
        .update(id, req.patch())
        .await?
        .ok_or_else(|| ApiError::not_found("Role not found"))?;
    ok(Envelope::ok("Role updated successfully").document(role))
}

/// PUT /putRoleWithUserId - move a user's profile to another role
async fn assign_to_user(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<AssignRoleRequest>,
) -> Reply {
    const MISSING: &str = "userId and roleId are required";
    const INVALID: &str = "Invalid userId or roleId format";
    let user_id = id_param(req.user_id.as_deref(), MISSING, INVALID)?;
    let role_id = id_param(req.role_id.as_deref(), MISSING, INVALID)?;

    if RoleRepo::new(&state.db).get(role_id).await?.is_none() {
        return Err(ApiError::not_found("Role not found"));
    }
    let profile = ProfileRepo::new(&state.db)
        .set_role(user_id, role_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User profile not found"))?;
    tracing::info!(user_id = %user_id, role_id = %role_id, "role reassigned");
    ok(Envelope::ok("User role updated successfully").document(profile))
}

/// GET /getRoleMenuWithId - the role together with its menu document
async fn with_menu(State(state): State<Arc<AppState>>, Query(q): Query<RoleIdQuery>) -> Reply {
    let id = id_param(q.role_id.as_deref(), "_id must be provided", "Invalid _id format")?;
    let role_doc = RoleRepo::new(&state.db)
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("No data found for the given _id"))?;
    let role: Role = bson::from_document(role_doc.clone()).map_err(DbError::from)?;
    let menu = MenuRepo::new(&state.db).for_role(&role).await?;
    ok(Envelope::ok("Data fetched successfully").data(json!({
        "role": doc_json(role_doc),
        "menu": menu.map(doc_json),
    })))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/getRolesData", get(list))
        .route("/getRoleDataWithId", get(by_id))
        .route("/postRolesData", post(create))
        .route("/putRolesData", put(update))
        .route("/putRoleWithUserId", put(assign_to_user))
        .route("/getRoleMenuWithId", get(with_menu))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use crate::http::test_support::{call, send, test_app};
    use axum::http::{Method, StatusCode};

    #[test]
    fn update_patch_skips_blank_and_non_bool() {
        let req = UpdateRoleRequest {
            id: None,
            role_name: Some("  ".into()),
            menu_id: Some("64b7f0c2a1b2c3d4e5f60718".into()),
            is_verified: Some(json!("yes")),
        };
        assert_eq!(req.patch(), doc! { "menuId": "64b7f0c2a1b2c3d4e5f60718" });

        let req = UpdateRoleRequest {
            is_verified: Some(json!(false)),
            ..UpdateRoleRequest::default()
        };
        assert_eq!(req.patch(), doc! { "isVerified": false });
    }

    #[tokio::test]
    async fn create_requires_boolean_flag() {
        let (status, body) = call(
            test_app(),
            send(
                Method::POST,
                "/api/postRolesData",
                Some(json!({ "roleName": "admin", "menuId": "m1", "isVerified": "true" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "isVerified Parameter is Missing - Boolean");
    }

    #[tokio::test]
    async fn update_requires_id() {
        let (status, body) = call(
            test_app(),
            send(Method::PUT, "/api/putRolesData", Some(json!({ "roleName": "manager" }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Role ID is required");
    }

    #[tokio::test]
    async fn reassignment_validates_ids() {
        let (status, body) = call(
            test_app(),
            send(
                Method::PUT,
                "/api/putRoleWithUserId",
                Some(json!({ "userId": "nope", "roleId": "64b7f0c2a1b2c3d4e5f60718" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid userId or roleId format");
    }
}
