//! Route handlers organized by resource

pub mod auth;
pub mod health;
pub mod leads;
pub mod master;
pub mod menus;
pub mod misc;
pub mod notifications;
pub mod otp;
pub mod profiles;
pub mod properties;
pub mod roles;
pub mod users;
pub mod visitors;
pub mod wishlist;

use axum::http::StatusCode;
use axum::Json;
use bson::oid::ObjectId;

use leasehub_core::Envelope;

use super::error::ApiError;

/// Handler result carrying the standard envelope
pub type Reply = Result<Json<Envelope>, ApiError>;

/// Same, for handlers answering 201
pub type Created = Result<(StatusCode, Json<Envelope>), ApiError>;

pub(crate) fn ok(envelope: Envelope) -> Reply {
    Ok(Json(envelope))
}

pub(crate) fn created(envelope: Envelope) -> Created {
    Ok((StatusCode::CREATED, Json(envelope)))
}

/// Parse a required id parameter, with route-specific wording for the
/// missing and malformed cases.
pub(crate) fn id_param(raw: Option<&str>, missing: &str, invalid: &str) -> Result<ObjectId, ApiError> {
    let raw = raw
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request(missing))?;
    ObjectId::parse_str(raw).map_err(|_| ApiError::bad_request(invalid))
}
