//! Staff directory views used by the admin console

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;

use leasehub_core::{Envelope, Pagination};

use super::properties::ListQuery;
use super::{ok, Reply};
use crate::db::repos::MasterRepo;
use crate::http::server::AppState;

/// GET /getMasterUsersData - profiles with their user, strict paging
async fn list(State(state): State<Arc<AppState>>, Query(q): Query<ListQuery>) -> Reply {
    let page = Pagination::strict(q.page.as_deref(), q.size.as_deref())?;
    let result = MasterRepo::new(&state.db).list(q.search.as_deref(), page).await?;
    ok(Envelope::ok("Master user data fetched successfully").paginated(result))
}

/// GET /getFlattenedMasterUsersData
async fn flattened(State(state): State<Arc<AppState>>) -> Reply {
    let rows = MasterRepo::new(&state.db).flattened().await?;
    let total = u64::try_from(rows.len()).unwrap_or(u64::MAX);
    ok(Envelope::ok("Flattened master user data fetched successfully")
        .documents(rows)
        .total(total))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/getMasterUsersData", get(list))
        .route("/getFlattenedMasterUsersData", get(flattened))
}

#[cfg(test)]
mod tests {
    use crate::http::test_support::{call, send, test_app};
    use axum::http::{Method, StatusCode};
    use serde_json::Value;

    #[tokio::test]
    async fn paging_is_strict() {
        let (status, body) = call(
            test_app(),
            send(Method::GET, "/api/getMasterUsersData?page=0&size=10", None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "Invalid page or size parameter. Both must be positive integers greater than zero."
        );
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn flattened_total_counts_rows() {
        let (status, body) = call(
            test_app(),
            send(Method::GET, "/api/getFlattenedMasterUsersData", None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let rows = body["data"].as_array().map(Vec::len).unwrap_or(0);
        assert_eq!(body["total"], Value::from(rows));
    }
}
