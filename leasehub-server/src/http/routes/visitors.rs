//! Visitor accounts (end customers browsing the listings)

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post, put};
use axum::Router;
use bson::{doc, DateTime, Document};
use serde::Deserialize;
use serde_json::Value;

use leasehub_core::models::NewVisitor;
use leasehub_core::validation::normalize_email;
use leasehub_core::{json_to_document, Envelope, Pagination};

use super::properties::{IdQuery, ListQuery};
use super::{created, id_param, ok, Created, Reply};
use crate::db::repos::VisitorRepo;
use crate::http::error::ApiError;
use crate::http::extractors::JsonBody;
use crate::http::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct MobileQuery {
    pub mobile: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

fn required<'q>(raw: Option<&'q str>, missing: &str) -> Result<&'q str, ApiError> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request(missing))
}

fn patch_from(body: Value) -> Result<Document, ApiError> {
    match body {
        Value::Object(_) => Ok(json_to_document(body)?),
        _ => Err(ApiError::bad_request("Request body must be a JSON object")),
    }
}

/// GET /coreVisitUsersData
async fn list(State(state): State<Arc<AppState>>, Query(q): Query<ListQuery>) -> Reply {
    let page = Pagination::strict(q.page.as_deref(), q.size.as_deref())?;
    let result = VisitorRepo::new(&state.db).list(q.search.as_deref(), page).await?;
    ok(Envelope::ok("Visitor data fetched successfully").paginated(result))
}

/// GET /getVisitUsersDataWithId
async fn by_id(State(state): State<Arc<AppState>>, Query(q): Query<IdQuery>) -> Reply {
    let id = id_param(q.id.as_deref(), "Id parameter is required", "Invalid Visitor ID format")?;
    let visitor = VisitorRepo::new(&state.db)
        .doc_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Visitor not found"))?;
    ok(Envelope::ok("Visitor fetched successfully").document(visitor))
}

/// GET /getVisitUsersDataWithMobile
async fn by_mobile(State(state): State<Arc<AppState>>, Query(q): Query<MobileQuery>) -> Reply {
    let mobile = required(q.mobile.as_deref(), "Mobile parameter is required")?;
    let visitor = VisitorRepo::new(&state.db)
        .by_mobile(mobile)
        .await?
        .ok_or_else(|| ApiError::not_found("No visitor found with this mobile number"))?;
    ok(Envelope::ok("Visitor fetched successfully").document(visitor))
}

/// POST /postVisitUsersData
async fn create(State(state): State<Arc<AppState>>, JsonBody(input): JsonBody<NewVisitor>) -> Created {
    const EXISTS: &str = "Visitor already exists in database";
    let visitor = input.into_visitor(DateTime::now())?;
    let repo = VisitorRepo::new(&state.db);
    if repo.exists(&visitor.email, visitor.mobile.as_deref()).await? {
        return Err(ApiError::conflict(EXISTS));
    }
    let stored = repo.create(&visitor).await.map_err(|e| match ApiError::from(e) {
        ApiError::Conflict(_) => ApiError::conflict(EXISTS),
        other => other,
    })?;
    created(Envelope::ok("Visitor created successfully").document(stored))
}

async fn apply_update(state: &AppState, filter: Document, body: Value, missing: &str) -> Reply {
    let visitor = VisitorRepo::new(&state.db)
        .update(filter, patch_from(body)?)
        .await?
        .ok_or_else(|| ApiError::not_found(missing))?;
    ok(Envelope::ok("Visitor data updated successfully").document(visitor))
}

/// PUT /putVisitUsersDataWithId
async fn update_by_id(
    State(state): State<Arc<AppState>>,
    Query(q): Query<IdQuery>,
    JsonBody(body): JsonBody<Value>,
) -> Reply {
    let id = id_param(
        q.id.as_deref(),
        "Visitor ID parameter is required",
        "Invalid Visitor ID format",
    )?;
    apply_update(&state, doc! { "_id": id }, body, "Visitor not found with given ID").await
}

/// PUT /putVisitUsersDataWithEmail
async fn update_by_email(
    State(state): State<Arc<AppState>>,
    Query(q): Query<EmailQuery>,
    JsonBody(body): JsonBody<Value>,
) -> Reply {
    let email = normalize_email(required(q.email.as_deref(), "Email parameter is required")?);
    apply_update(&state, doc! { "email": email }, body, "Visitor not found with given email").await
}

/// PUT /putVisitUsersDataWithMobile
async fn update_by_mobile(
    State(state): State<Arc<AppState>>,
    Query(q): Query<MobileQuery>,
    JsonBody(body): JsonBody<Value>,
) -> Reply {
    let mobile = required(q.mobile.as_deref(), "Mobile parameter is required")?;
    apply_update(
        &state,
        doc! { "mobile": mobile },
        body,
        "Visitor not found with given mobile number",
    )
    .await
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/coreVisitUsersData", get(list))
        .route("/getVisitUsersDataWithId", get(by_id))
        .route("/getVisitUsersDataWithMobile", get(by_mobile))
        .route("/postVisitUsersData", post(create))
        .route("/putVisitUsersDataWithId", put(update_by_id))
        .route("/putVisitUsersDataWithEmail", put(update_by_email))
        .route("/putVisitUsersDataWithMobile", put(update_by_mobile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_support::{call, send, test_app};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[test]
    fn patch_must_be_object() {
        assert!(patch_from(json!(["city"])).is_err());
        let patch = patch_from(json!({ "city": "Pune" })).unwrap();
        assert_eq!(patch.get_str("city").unwrap(), "Pune");
    }

    #[tokio::test]
    async fn mobile_lookup_requires_mobile() {
        let (status, body) =
            call(test_app(), send(Method::GET, "/api/getVisitUsersDataWithMobile", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Mobile parameter is required");
    }

    #[tokio::test]
    async fn update_by_id_checks_format() {
        let (status, body) = call(
            test_app(),
            send(
                Method::PUT,
                "/api/putVisitUsersDataWithId?Id=123",
                Some(json!({ "city": "Pune" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid Visitor ID format");
    }

    #[tokio::test]
    async fn create_rejects_bad_email() {
        let (status, body) = call(
            test_app(),
            send(
                Method::POST,
                "/api/postVisitUsersData",
                Some(json!({ "fullName": "Ravi", "email": "not-an-email" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }
}
