//! Navigation menus, one document per role

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post, put};
use axum::Router;
use serde::Deserialize;
use serde_json::Value;

use leasehub_core::models::role::parse_menu_entries;
use leasehub_core::Envelope;

use super::{created, id_param, ok, Created, Reply};
use crate::db::repos::MenuRepo;
use crate::http::error::ApiError;
use crate::http::extractors::JsonBody;
use crate::http::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct MenuBody {
    pub menus: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MenuIdQuery {
    pub id: Option<String>,
}

/// GET /coreMenuData
async fn list(State(state): State<Arc<AppState>>) -> Reply {
    let menus = MenuRepo::new(&state.db).list().await?;
    let message = if menus.is_empty() { "No menus found" } else { "Menus fetched successfully" };
    ok(Envelope::ok(message).documents(menus))
}

/// POST /postMenuData
async fn create(State(state): State<Arc<AppState>>, JsonBody(body): JsonBody<MenuBody>) -> Created {
    let entries = parse_menu_entries(body.menus.as_ref())?;
    let menu = MenuRepo::new(&state.db).create(entries).await?;
    created(Envelope::ok("Menu created successfully").document(menu))
}

/// PUT /putMenuDataWithId?id - replaces the whole entry list
async fn update(
    State(state): State<Arc<AppState>>,
    Query(q): Query<MenuIdQuery>,
    JsonBody(body): JsonBody<MenuBody>,
) -> Reply {
    const INVALID_ID: &str = "Valid menu document ID is required";
    let id = id_param(q.id.as_deref(), INVALID_ID, INVALID_ID)?;
    if !matches!(&body.menus, Some(Value::Array(items)) if !items.is_empty()) {
        return Err(ApiError::bad_request("Menus array is required for update"));
    }
    let entries = parse_menu_entries(body.menus.as_ref())?;
    let menu = MenuRepo::new(&state.db)
        .replace_entries(id, entries)
        .await?
        .ok_or_else(|| ApiError::not_found("Menu document not found"))?;
    ok(Envelope::ok("Menu updated successfully").document(menu))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/coreMenuData", get(list))
        .route("/postMenuData", post(create))
        .route("/putMenuDataWithId", put(update))
}

#[cfg(test)]
mod tests {
    use crate::http::test_support::{call, send, test_app};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn create_checks_entries() {
        let (status, body) = call(
            test_app(),
            send(
                Method::POST,
                "/api/postMenuData",
                Some(json!({ "menus": [{ "menu": "Leads", "subMenu": "all" }] })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "'subMenu' must be an array");
    }

    #[tokio::test]
    async fn update_requires_valid_id() {
        let (status, body) = call(
            test_app(),
            send(Method::PUT, "/api/putMenuDataWithId?id=42", Some(json!({ "menus": [] }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Valid menu document ID is required");
    }

    #[tokio::test]
    async fn update_requires_entries() {
        let (status, body) = call(
            test_app(),
            send(
                Method::PUT,
                "/api/putMenuDataWithId?id=64b7f0c2a1b2c3d4e5f60718",
                Some(json!({ "menus": [] })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Menus array is required for update");
    }
}
