//! Visitor wishlists

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{delete, get, post};
use axum::Router;
use bson::oid::ObjectId;
use serde::Deserialize;
use serde_json::json;

use leasehub_core::{doc_json, to_api_json, Envelope};

use super::{created, id_param, ok, Created, Reply};
use crate::db::repos::{find_property_summary, property_name, WishlistRepo};
use crate::http::error::ApiError;
use crate::http::extractors::JsonBody;
use crate::http::server::AppState;

const UNKNOWN_PROPERTY: &str = "Unknown Property";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistKey {
    pub visitor_id: Option<String>,
    pub property_id: Option<String>,
}

impl WishlistKey {
    fn ids(&self) -> Result<(ObjectId, ObjectId), ApiError> {
        const MISSING: &str = "visitorId and propertyId are required.";
        let visitor = id_param(self.visitor_id.as_deref(), MISSING, "Invalid visitorId format")?;
        let property = id_param(self.property_id.as_deref(), MISSING, "Invalid propertyId format")?;
        Ok((visitor, property))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorQuery {
    pub visitor_id: Option<String>,
}

/// POST /postWishlistData
async fn add(State(state): State<Arc<AppState>>, JsonBody(key): JsonBody<WishlistKey>) -> Created {
    let (visitor_id, property_id) = key.ids()?;
    let entry = WishlistRepo::new(&state.db).add(visitor_id, property_id).await?;

    let summary = find_property_summary(&state.db, property_id).await?.map(|(_, doc)| doc);
    let name = summary
        .as_ref()
        .and_then(|doc| doc.get_str("buildingName").ok())
        .unwrap_or(UNKNOWN_PROPERTY)
        .to_owned();
    let location = summary
        .and_then(|mut doc| doc.remove("location"))
        .map(to_api_json)
        .unwrap_or(serde_json::Value::Null);

    created(
        Envelope::ok(format!("Property '{name}' added to wishlist.")).data(json!({
            "wishlist": doc_json(entry),
            "property": { "propertyName": name, "propertyLocation": location },
        })),
    )
}

/// DELETE /deleteWishlistData
async fn remove(State(state): State<Arc<AppState>>, JsonBody(key): JsonBody<WishlistKey>) -> Reply {
    let (visitor_id, property_id) = key.ids()?;
    let deleted = WishlistRepo::new(&state.db)
        .remove(visitor_id, property_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Wishlist entry not found."))?;
    let name = property_name(&state.db, property_id)
        .await?
        .unwrap_or_else(|| UNKNOWN_PROPERTY.to_owned());
    ok(Envelope::ok(format!("Property '{name}' removed from wishlist.")).document(deleted))
}

/// GET /getWishlistData?visitorId
async fn list(State(state): State<Arc<AppState>>, Query(q): Query<VisitorQuery>) -> Reply {
    let visitor_id = id_param(q.visitor_id.as_deref(), "visitorId is required.", "Invalid visitorId format")?;
    let items = WishlistRepo::new(&state.db).list(visitor_id).await?;
    let message = if items.is_empty() {
        "No wishlist items found."
    } else {
        "Wishlist items fetched successfully."
    };
    ok(Envelope::ok(message).documents(items))
}

/// GET /isInWishlist?visitorId&propertyId
async fn contains(State(state): State<Arc<AppState>>, Query(key): Query<WishlistKey>) -> Reply {
    let (visitor_id, property_id) = key.ids()?;
    let present = WishlistRepo::new(&state.db).contains(visitor_id, property_id).await?;
    ok(Envelope::ok("Wishlist status fetched successfully.").with("isInWishlist", present))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/postWishlistData", post(add))
        .route("/deleteWishlistData", delete(remove))
        .route("/getWishlistData", get(list))
        .route("/isInWishlist", get(contains))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_support::{call, send, test_app};
    use axum::http::{Method, StatusCode};

    #[test]
    fn key_requires_both_ids() {
        let key = WishlistKey {
            visitor_id: Some(ObjectId::new().to_hex()),
            property_id: None,
        };
        match key.ids().unwrap_err() {
            ApiError::BadRequest(message) => {
                assert_eq!(message, "visitorId and propertyId are required.")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn membership_check_validates_ids() {
        let (status, body) = call(
            test_app(),
            send(Method::GET, "/api/isInWishlist?visitorId=1&propertyId=2", None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid visitorId format");
    }

    #[tokio::test]
    async fn listing_requires_visitor() {
        let (status, body) = call(test_app(), send(Method::GET, "/api/getWishlistData", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "visitorId is required.");
    }

    #[tokio::test]
    async fn delete_reads_json_body() {
        let (status, body) = call(
            test_app(),
            send(Method::DELETE, "/api/deleteWishlistData", Some(json!({ "visitorId": "" }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "visitorId and propertyId are required.");
    }
}
