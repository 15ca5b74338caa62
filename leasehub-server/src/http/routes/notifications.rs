//! In-app notifications for staff and visitors

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::Router;
use bson::oid::ObjectId;
use serde::Deserialize;
use serde_json::Value;

use leasehub_core::{Envelope, PageQuery};

use super::{id_param, ok, Reply};
use crate::db::repos::NotificationRepo;
use crate::http::error::ApiError;
use crate::http::extractors::JsonBody;
use crate::http::server::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    pub user_id: Option<String>,
    #[serde(flatten)]
    pub page: PageQuery,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub notification_ids: Option<Value>,
}

impl MarkReadRequest {
    fn ids(&self) -> Result<Vec<ObjectId>, ApiError> {
        let items = match &self.notification_ids {
            Some(Value::Array(items)) if !items.is_empty() => items,
            _ => return Err(ApiError::bad_request("notificationIds array is required")),
        };
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .and_then(|raw| ObjectId::parse_str(raw.trim()).ok())
                    .ok_or_else(|| ApiError::bad_request("Invalid notification id format"))
            })
            .collect()
    }
}

/// GET /notifications?userId - newest first
async fn list(State(state): State<Arc<AppState>>, Query(q): Query<NotificationQuery>) -> Reply {
    let user_id = id_param(q.user_id.as_deref(), "userId is required", "Invalid userId format")?;
    let page = q.page.with_default_size(10);
    let result = NotificationRepo::new(&state.db).list(user_id, page).await?;
    ok(Envelope::ok("Notifications fetched successfully").paginated(result))
}

/// POST /notifications and /notifications/mark-as-read
async fn mark_read(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<MarkReadRequest>,
) -> Reply {
    let ids = req.ids()?;
    let modified = NotificationRepo::new(&state.db).mark_read(&ids).await?;
    tracing::debug!(requested = ids.len(), modified, "notifications marked read");
    ok(Envelope::ok("Notifications marked as read").with("modifiedCount", modified))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/notifications", get(list).post(mark_read))
        .route("/notifications/mark-as-read", post(mark_read))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_support::{call, send, test_app};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[test]
    fn ids_must_be_a_non_empty_array_of_object_ids() {
        let empty = MarkReadRequest { notification_ids: Some(json!([])) };
        assert!(empty.ids().is_err());

        let bad = MarkReadRequest { notification_ids: Some(json!(["zzz"])) };
        assert!(bad.ids().is_err());

        let id = ObjectId::new();
        let good = MarkReadRequest { notification_ids: Some(json!([id.to_hex()])) };
        assert_eq!(good.ids().unwrap(), vec![id]);
    }

    #[tokio::test]
    async fn listing_requires_user() {
        let (status, body) = call(test_app(), send(Method::GET, "/api/notifications", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "userId is required");
    }

    #[tokio::test]
    async fn both_mark_read_paths_validate() {
        for path in ["/api/notifications", "/api/notifications/mark-as-read"] {
            let (status, body) =
                call(test_app(), send(Method::POST, path, Some(json!({ "notificationIds": [] })))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["message"], "notificationIds array is required");
        }
    }
}
