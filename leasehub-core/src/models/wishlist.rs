//! Wishlist entries and the sequence counter

use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// Sequence used for human-readable property ids
pub const PROPERTY_SEQUENCE: &str = "propertyId";

/// Unique per (visitorId, propertyId).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wishlist {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub visitor_id: ObjectId,
    pub property_id: ObjectId,
    #[serde(default = "DateTime::now")]
    pub created_at: DateTime,
    #[serde(default = "DateTime::now")]
    pub updated_at: DateTime,
}

impl Wishlist {
    pub const COLLECTION: &'static str = "wishlists";
}

/// Atomic increment source, one document per sequence name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    pub sequence_value: i64,
}

impl Counter {
    pub const COLLECTION: &'static str = "counters";
}

/// Format a sequence value as a property id (`P17`).
pub fn property_code(sequence: i64) -> String {
    format!("P{}", sequence)
}
