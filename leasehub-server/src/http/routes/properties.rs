//! Property endpoints, one set per office subtype
//!
//! Every handler is generic over [`PropertyKind`]; [`router`] mounts the
//! same set under each subtype's path segment.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use bson::DateTime;
use serde::Deserialize;
use serde_json::{json, Value};

use leasehub_core::models::property::sanitize_update;
use leasehub_core::models::wishlist::{property_code, PROPERTY_SEQUENCE};
use leasehub_core::models::{
    CoWorkingSpace, ManagedOffice, OfficeSpace, PropertyInput, PropertyKind, PropertyType,
};
use leasehub_core::{
    deck_file_name, json_to_document, property_deck, read_first_sheet, reconcile,
    AllPropertiesSearch, Envelope, ImportContext, PageQuery, Pagination, PropertySearch,
    SheetError, PPTX_CONTENT_TYPE,
};

use super::{created, id_param, ok, Created, Reply};
use crate::db::repos::{search_all_properties, CounterRepo, PropertyRepo, UserRepo};
use crate::http::error::ApiError;
use crate::http::extractors::JsonBody;
use crate::http::server::AppState;

/// Spreadsheets may be larger than the default request body limit.
const UPLOAD_LIMIT: usize = 10 * 1024 * 1024;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub size: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IdQuery {
    #[serde(rename = "Id", alias = "id")]
    pub id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeckQuery {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

fn lower_label<K: PropertyKind>() -> String {
    K::LABEL.to_lowercase()
}

/// GET /core{K}Data - newest first, strict paging
async fn core_list<K: PropertyKind>(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> Reply {
    let page = Pagination::strict(q.page.as_deref(), q.size.as_deref())?;
    let result = PropertyRepo::<K>::new(&state.db)
        .list(q.search.as_deref(), page)
        .await?;
    ok(Envelope::ok(format!("{} data fetched successfully", K::LABEL)).paginated(result))
}

/// GET /search{K}Data
async fn search<K: PropertyKind>(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PropertySearch>,
) -> Reply {
    let result = PropertyRepo::<K>::new(&state.db).search(&q).await?;
    ok(Envelope::ok("Search results fetched successfully").paginated(result))
}

/// GET /get{K}DataWithId
async fn get_one<K: PropertyKind>(
    State(state): State<Arc<AppState>>,
    Query(q): Query<IdQuery>,
) -> Reply {
    let id = id_param(q.id.as_deref(), "ID is required", "Invalid ID format")?;
    let doc = PropertyRepo::<K>::new(&state.db)
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No {} found with this ID", lower_label::<K>())))?;
    ok(Envelope::ok(format!("{} fetched successfully", K::LABEL)).document(doc))
}

/// POST /post{K}Data
async fn create<K: PropertyKind>(
    State(state): State<Arc<AppState>>,
    JsonBody(input): JsonBody<PropertyInput<K>>,
) -> Created {
    let draft = input.into_draft()?;
    let repo = PropertyRepo::<K>::new(&state.db);
    if repo
        .exists_same(&draft.building_name, draft.location.address.as_deref())
        .await?
    {
        return Err(ApiError::conflict(format!("{} already exists", K::LABEL)));
    }

    let sequence = CounterRepo::new(&state.db).next_value(PROPERTY_SEQUENCE).await?;
    let property = draft.into_property(property_code(sequence), DateTime::now());
    let doc = repo.insert(&property).await?;
    tracing::info!(kind = %K::TYPE, property_id = %property.property_id, "property created");
    created(Envelope::ok(format!("{} created successfully", K::LABEL)).document(doc))
}

/// PUT /put{K}DataWithId - body is a partial document
async fn update<K: PropertyKind>(
    State(state): State<Arc<AppState>>,
    Query(q): Query<IdQuery>,
    JsonBody(body): JsonBody<Value>,
) -> Reply {
    let id = id_param(q.id.as_deref(), "Id is required", "Invalid Id format")?;
    let patch = sanitize_update(json_to_document(body)?, DateTime::now())?;
    let doc = PropertyRepo::<K>::new(&state.db)
        .update(id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No {} found with this Id", lower_label::<K>())))?;
    ok(Envelope::ok(format!("{} updated successfully", K::LABEL)).document(doc))
}

/// DELETE /delete{K}DataWithId
async fn remove<K: PropertyKind>(
    State(state): State<Arc<AppState>>,
    Query(q): Query<IdQuery>,
) -> Reply {
    let invalid = format!("Invalid {} ID", K::LABEL);
    let id = id_param(q.id.as_deref(), &invalid, &invalid)?;
    let doc = PropertyRepo::<K>::new(&state.db)
        .delete(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} not found", K::LABEL)))?;
    ok(Envelope::ok(format!("{} deleted successfully", K::LABEL)).document(doc))
}

/// PATCH /deactivate{K}DataWithId
async fn deactivate<K: PropertyKind>(
    State(state): State<Arc<AppState>>,
    Query(q): Query<IdQuery>,
) -> Reply {
    let invalid = format!("Invalid {} ID", K::LABEL);
    let id = id_param(q.id.as_deref(), &invalid, &invalid)?;
    let doc = PropertyRepo::<K>::new(&state.db)
        .deactivate(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} not found", K::LABEL)))?;
    ok(Envelope::ok(format!("{} deactivated successfully", K::LABEL)).document(doc))
}

fn upload_error(message: impl Into<String>, details: Value) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "success": false, "message": message.into(), "details": details })),
    )
        .into_response()
}

/// POST /post{K}DataWithExcel - multipart field `file`
async fn import_sheet<K: PropertyKind>(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            upload = Some(bytes);
            break;
        }
    }
    let Some(bytes) = upload else {
        return Ok(upload_error("No file uploaded. Use form field named 'file'.", Value::Null));
    };

    let sheet = match read_first_sheet(&bytes) {
        Ok(sheet) => sheet,
        Err(err @ (SheetError::NoSheets | SheetError::Empty)) => {
            return Ok(upload_error(err.to_string(), Value::Null));
        }
        Err(err) => {
            tracing::warn!(detail = %err.detail(), "could not parse upload");
            return Ok(upload_error(err.to_string(), json!({ "error": err.detail() })));
        }
    };

    let repo = PropertyRepo::<K>::new(&state.db);
    let mut ctx = ImportContext::default().with_existing_names(repo.existing_names().await?);
    for agent in UserRepo::new(&state.db).all_contacts().await? {
        ctx = ctx.with_agent(agent.id, &agent.email);
    }

    let mut plan = reconcile::<K>(&sheet.rows, &ctx);
    let accepted = std::mem::take(&mut plan.accepted);

    let mut rows = Vec::with_capacity(accepted.len());
    if !accepted.is_empty() {
        let count = i64::try_from(accepted.len()).unwrap_or(i64::MAX);
        let last = CounterRepo::new(&state.db)
            .reserve(PROPERTY_SEQUENCE, count)
            .await?;
        let now = DateTime::now();
        for (sequence, row) in (last - count + 1..).zip(accepted) {
            rows.push((row.row, row.draft.into_property(property_code(sequence), now)));
        }
    }

    let (inserted, insert_failures) = match repo.insert_many(rows).await {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::error!(error = %err, kind = %K::TYPE, "bulk insert failed");
            let results = plan.results(0, Vec::new());
            return Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "message": "Database error during insertMany.",
                    "details": { "message": err.to_string() },
                    "results": results,
                })),
            )
                .into_response());
        }
    };

    let results = plan.results(inserted, insert_failures);
    tracing::info!(
        kind = %K::TYPE,
        inserted = results.successfully_inserted,
        duplicates = results.duplicates_found,
        failed = results.failed_entries,
        "spreadsheet imported"
    );
    let body = Envelope::ok("Excel file processed.").with("results", json!(results));
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

async fn deck_bytes<K: PropertyKind>(
    state: &AppState,
    id: bson::oid::ObjectId,
) -> Result<(Vec<u8>, String), ApiError> {
    let property = PropertyRepo::<K>::new(&state.db)
        .get_typed(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} not found", K::LABEL)))?;
    let bytes = property_deck(&property)
        .to_pptx()
        .map_err(|e| ApiError::Internal { message: e.to_string() })?;
    Ok((bytes, deck_file_name(&property.building_name)))
}

/// GET /generate-ppt?id=..&type=..
async fn generate_deck(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DeckQuery>,
) -> Result<Response, ApiError> {
    let id = id_param(q.id.as_deref(), "Property ID is required", "Invalid property ID")?;
    let kind = match q.kind.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        None => PropertyType::Managed,
        Some(raw) => PropertyType::parse(raw)
            .ok_or_else(|| ApiError::bad_request(format!("Unknown property type '{}'", raw)))?,
    };
    let (bytes, file_name) = match kind {
        PropertyType::Managed => deck_bytes::<ManagedOffice>(&state, id).await?,
        PropertyType::Office => deck_bytes::<OfficeSpace>(&state, id).await?,
        PropertyType::CoWorking => deck_bytes::<CoWorkingSpace>(&state, id).await?,
    };
    let disposition = format!("attachment; filename=\"{}\"", file_name);
    Ok((
        [
            (header::CONTENT_TYPE, PPTX_CONTENT_TYPE.to_owned()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// GET /searchAllProperties - every subtype at once
async fn search_all(
    State(state): State<Arc<AppState>>,
    Query(q): Query<AllPropertiesSearch>,
) -> Reply {
    let page = PageQuery {
        page: q.page.clone(),
        size: q.size.clone(),
    }
    .with_default_size(10);
    let result = search_all_properties(&state.db, &q, page).await?;
    ok(Envelope::ok("All properties fetched").paginated(result))
}

fn kind_routes<K: PropertyKind>(segment: &str) -> Router<Arc<AppState>> {
    Router::new()
        .route(&format!("/core{segment}Data"), get(core_list::<K>))
        .route(&format!("/search{segment}Data"), get(search::<K>))
        .route(&format!("/get{segment}DataWithId"), get(get_one::<K>))
        .route(&format!("/post{segment}Data"), post(create::<K>))
        .route(&format!("/put{segment}DataWithId"), put(update::<K>))
        .route(&format!("/delete{segment}DataWithId"), delete(remove::<K>))
        .route(&format!("/deactivate{segment}DataWithId"), patch(deactivate::<K>))
        .route(
            &format!("/post{segment}DataWithExcel"),
            post(import_sheet::<K>).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
}

/// Property routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(kind_routes::<ManagedOffice>("ManagedOffice"))
        .merge(kind_routes::<OfficeSpace>("OfficeSpace"))
        .merge(kind_routes::<CoWorkingSpace>("CoWorkingSpace"))
        .route("/searchManageOfficeData", get(search::<ManagedOffice>))
        .route(
            "/postManagedOfficeDataUsingExcel",
            post(import_sheet::<ManagedOffice>).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
        .route("/generate-ppt", get(generate_deck))
        .route("/searchAllProperties", get(search_all))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_support::{call, send, test_app};
    use axum::http::Method;

    #[tokio::test]
    async fn core_list_requires_strict_paging() {
        let (status, body) = call(
            test_app(),
            send(Method::GET, "/api/coreManagedOfficeData?page=0&size=10", None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "Invalid page or size parameter. Both must be positive integers greater than zero."
        );
    }

    #[tokio::test]
    async fn get_by_id_validates_id() {
        let (status, body) =
            call(test_app(), send(Method::GET, "/api/getOfficeSpaceDataWithId", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "ID is required");

        let (status, body) = call(
            test_app(),
            send(Method::GET, "/api/getCoWorkingSpaceDataWithId?Id=zzz", None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid ID format");
    }

    #[tokio::test]
    async fn create_validates_before_touching_storage() {
        let (status, body) = call(
            test_app(),
            send(
                Method::POST,
                "/api/postManagedOfficeData",
                Some(json!({ "buildingName": "  " })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "buildingName is required");
    }

    #[tokio::test]
    async fn update_rejects_too_many_images() {
        let images: Vec<String> = (0..7).map(|i| format!("https://cdn.example/{i}.jpg")).collect();
        let uri = format!("/api/putOfficeSpaceDataWithId?Id={}", bson::oid::ObjectId::new().to_hex());
        let (status, body) = call(
            test_app(),
            send(Method::PUT, &uri, Some(json!({ "images": images }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Maximum 6 images allowed");
    }

    #[tokio::test]
    async fn deck_needs_known_type() {
        let uri = format!(
            "/api/generate-ppt?id={}&type=warehouse",
            bson::oid::ObjectId::new().to_hex()
        );
        let (status, _) = call(test_app(), send(Method::GET, &uri, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(test_app(), send(Method::GET, "/api/generate-ppt", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Property ID is required");
    }

    #[test]
    fn labels_for_messages() {
        assert_eq!(lower_label::<ManagedOffice>(), "managed office");
        assert_eq!(lower_label::<CoWorkingSpace>(), "co-working space");
    }
}
