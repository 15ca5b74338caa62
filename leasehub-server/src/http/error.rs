//! API error types with IntoResponse
//!
//! Every failure is rendered as `{ success: false, message }` with the
//! matching status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use leasehub_core::{LeadPolicyError, SheetError, ValidationError};

use crate::db::repos::{DbError, LeadError};
use crate::notify::NotifyError;

pub const MISSING_KEY: &str = "Unauthorized: Invalid API Key";
pub const WRONG_KEY: &str = "Invalid API Auth Key";
pub const BAD_CREDENTIALS: &str = "Invalid email or password.";

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Validation failed (400)
    Validation(ValidationError),

    /// Request refused with a specific message (400)
    BadRequest(String),

    /// No API key supplied (401)
    Unauthorized,

    /// Login with an unknown email or wrong password (401)
    InvalidCredentials,

    /// API key does not match (403)
    Forbidden,

    /// Resource not found (404)
    NotFound(String),

    /// Unique constraint would be violated (409)
    Conflict(String),

    /// Database error (500, logged)
    Database(DbError),

    /// Mail or SMS provider failed (500)
    Upstream { message: &'static str, source: NotifyError },

    /// Internal error (500)
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Upstream { .. } | Self::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Validation(e) => json!({ "success": false, "message": e.to_string() }),
            Self::BadRequest(message) | Self::NotFound(message) | Self::Conflict(message) => {
                json!({ "success": false, "message": message })
            }
            Self::Unauthorized => json!({ "success": false, "message": MISSING_KEY }),
            Self::InvalidCredentials => json!({ "success": false, "message": BAD_CREDENTIALS }),
            Self::Forbidden => json!({ "success": false, "message": WRONG_KEY }),
            Self::Database(e) => {
                // Log the actual error, return generic message
                tracing::error!("Database error: {}", e);
                json!({ "success": false, "message": "Internal Server Error" })
            }
            Self::Upstream { message, source } => {
                tracing::error!(error = %source, "{}", message);
                json!({ "success": false, "message": message, "error": source.to_string() })
            }
            Self::Internal { message } => {
                tracing::error!("Internal error: {}", message);
                json!({ "success": false, "message": "Internal Server Error" })
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound { resource, id } => {
                Self::NotFound(format!("No {} found with id {}", resource, id))
            }
            DbError::Duplicate { resource } => Self::Conflict(format!("{} already exists", resource)),
            _ => Self::Database(e),
        }
    }
}

impl From<LeadPolicyError> for ApiError {
    fn from(e: LeadPolicyError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<LeadError> for ApiError {
    fn from(e: LeadError) -> Self {
        match e {
            LeadError::Rejected(message) => Self::BadRequest(message.to_owned()),
            LeadError::Policy(policy) => policy.into(),
            LeadError::Missing(message) => Self::NotFound(message.to_owned()),
            LeadError::Db(db) => db.into(),
        }
    }
}

impl From<SheetError> for ApiError {
    fn from(e: SheetError) -> Self {
        tracing::warn!(detail = %e.detail(), "rejected spreadsheet upload");
        Self::BadRequest(e.to_string())
    }
}

impl From<NotifyError> for ApiError {
    fn from(source: NotifyError) -> Self {
        Self::Upstream {
            message: "Failed to send email.",
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_error_is_400() {
        let (status, body) =
            body_of(ApiError::Validation(ValidationError::Empty { field: "email" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "email is required");
    }

    #[tokio::test]
    async fn key_errors() {
        let (status, body) = body_of(ApiError::Unauthorized).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], MISSING_KEY);

        let (status, body) = body_of(ApiError::Forbidden).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], WRONG_KEY);
    }

    #[tokio::test]
    async fn duplicates_are_409() {
        let err = ApiError::from(DbError::Duplicate { resource: "visitor" });
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn lead_errors_map_by_kind() {
        let policy = ApiError::from(LeadError::Policy(LeadPolicyError::CannotAssign));
        assert_eq!(policy.status(), StatusCode::BAD_REQUEST);

        let (status, body) = body_of(LeadError::Missing("Visitor not found.").into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Visitor not found.");
    }

    #[tokio::test]
    async fn internal_details_are_hidden() {
        let (status, body) = body_of(ApiError::Internal {
            message: "argon2 exploded".into(),
        })
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal Server Error");
    }
}
