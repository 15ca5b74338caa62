//! Visitor sign-in with one-time passwords
//!
//! Email codes log a visitor in or register them; SMS codes mark an
//! existing visitor's mobile as verified. A code is consumed only when it
//! is accepted.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use bson::DateTime;
use serde::Deserialize;

use leasehub_core::models::VerifyEmailOtp;
use leasehub_core::validation::{is_valid_email, normalize_email};
use leasehub_core::{generate_otp, otp, Envelope, OtpCheck};

use super::{ok, Reply};
use crate::db::repos::{OtpKey, OtpRepo, VisitorRepo};
use crate::http::error::ApiError;
use crate::http::extractors::JsonBody;
use crate::http::server::AppState;
use crate::notify::OutgoingEmail;

const OTP_GONE: &str = "OTP not found or has expired. Please request a new one.";
const FALLBACK_NAME: &str = "Valued Visitor";

#[derive(Debug, Default, Deserialize)]
pub struct EmailOtpRequest {
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SmsOtpRequest {
    pub mobile: Option<String>,
    pub otp: Option<String>,
}

/// POST /send-email-otp and /send-email-otp-advanced
///
/// Unlike notification mail this waits for the provider, so the caller
/// learns whether the code went out.
async fn send_email_otp(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<EmailOtpRequest>,
) -> Reply {
    let email = req
        .email
        .as_deref()
        .map(normalize_email)
        .filter(|e| is_valid_email(e))
        .ok_or_else(|| ApiError::bad_request("A valid email address is required."))?;

    let code = generate_otp();
    OtpRepo::new(&state.db).upsert(OtpKey::Email(&email), &code).await?;

    let visitor = VisitorRepo::new(&state.db).by_email(&email).await?;
    let to_name = visitor
        .as_ref()
        .and_then(|v| v.get_str("fullName").ok())
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(FALLBACK_NAME)
        .to_owned();

    state
        .mailer
        .send(&OutgoingEmail {
            to_email: email.clone(),
            to_name,
            subject: "Your Verification Code".into(),
            message: format!("Your OTP is: {code}"),
        })
        .await
        .map_err(|source| ApiError::Upstream {
            message: "Failed to send OTP email.",
            source,
        })?;

    tracing::info!(email = %email, new_visitor = visitor.is_none(), "email otp issued");
    ok(Envelope::ok("OTP has been sent to your email.").with("isNewVisitor", visitor.is_none()))
}

/// POST /verify-email-otp
async fn verify_email_otp(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<VerifyEmailOtp>,
) -> Result<(StatusCode, Json<Envelope>), ApiError> {
    let email = req.email.as_deref().map(normalize_email).unwrap_or_default();
    let supplied = req.otp.as_deref().map(str::trim).unwrap_or_default();
    if email.is_empty() || supplied.is_empty() {
        return Err(ApiError::bad_request("Email and OTP are required."));
    }

    let otps = OtpRepo::new(&state.db);
    let key = OtpKey::Email(&email);
    let stored = otps.find(key).await?.ok_or_else(|| ApiError::not_found(OTP_GONE))?;
    match otp::check(&stored.otp, supplied, stored.created_at, DateTime::now()) {
        OtpCheck::Valid => {}
        OtpCheck::Mismatch => return Err(ApiError::bad_request("Invalid OTP")),
        OtpCheck::Expired => {
            otps.delete(key).await?;
            return Err(ApiError::not_found(OTP_GONE));
        }
    }

    let visitors = VisitorRepo::new(&state.db);
    if let Some(visitor) = visitors.by_email(&email).await? {
        otps.delete(key).await?;
        return Ok((
            StatusCode::OK,
            Json(Envelope::ok("Login successful!").document(visitor)),
        ));
    }

    let registration = req.registration()?;
    if visitors.by_mobile(&registration.mobile).await?.is_some() {
        return Err(ApiError::conflict("This mobile number is already registered."));
    }
    otps.delete(key).await?;

    let visitor = VerifyEmailOtp::into_visitor(email.clone(), registration, DateTime::now());
    let stored = visitors.create(&visitor).await.map_err(|e| match ApiError::from(e) {
        ApiError::Conflict(_) => {
            ApiError::conflict("An account with this email or mobile number already exists.")
        }
        other => other,
    })?;
    tracing::info!(email = %email, "visitor registered");
    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok("Registration successful!").document(stored)),
    ))
}

/// POST /sendOtp
async fn send_sms_otp(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<SmsOtpRequest>,
) -> Reply {
    let mobile = req
        .mobile
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::bad_request("Mobile number required"))?;

    let code = generate_otp();
    OtpRepo::new(&state.db).upsert(OtpKey::Mobile(mobile), &code).await?;
    state
        .sms
        .send_otp(mobile, &code)
        .await
        .map_err(|source| ApiError::Upstream {
            message: "SMS failed",
            source,
        })?;
    ok(Envelope::ok("OTP sent successfully"))
}

/// POST /verifyOtp
async fn verify_sms_otp(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<SmsOtpRequest>,
) -> Reply {
    const REJECTED: &str = "Invalid or expired OTP";
    let mobile = req.mobile.as_deref().map(str::trim).unwrap_or_default();
    let supplied = req.otp.as_deref().map(str::trim).unwrap_or_default();

    let visitors = VisitorRepo::new(&state.db);
    if mobile.is_empty() || visitors.by_mobile(mobile).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    let otps = OtpRepo::new(&state.db);
    let key = OtpKey::Mobile(mobile);
    let stored = otps.find(key).await?.ok_or_else(|| ApiError::bad_request(REJECTED))?;
    if otp::check(&stored.otp, supplied, stored.created_at, DateTime::now()) != OtpCheck::Valid {
        return Err(ApiError::bad_request(REJECTED));
    }
    otps.delete(key).await?;

    let visitor = visitors
        .mark_verified_by_mobile(mobile)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    ok(Envelope::ok("OTP verified successfully").document(visitor))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/send-email-otp", post(send_email_otp))
        .route("/send-email-otp-advanced", post(send_email_otp))
        .route("/verify-email-otp", post(verify_email_otp))
        .route("/sendOtp", post(send_sms_otp))
        .route("/verifyOtp", post(verify_sms_otp))
}

#[cfg(test)]
mod tests {
    use crate::http::test_support::{call, send, test_app};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn email_otp_requires_valid_address() {
        for path in ["/api/send-email-otp", "/api/send-email-otp-advanced"] {
            let (status, body) =
                call(test_app(), send(Method::POST, path, Some(json!({ "email": "nobody" })))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["message"], "A valid email address is required.");
        }
    }

    #[tokio::test]
    async fn verify_requires_email_and_code() {
        let (status, body) = call(
            test_app(),
            send(Method::POST, "/api/verify-email-otp", Some(json!({ "email": "a@b.co" }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Email and OTP are required.");
    }

    #[tokio::test]
    async fn sms_requires_mobile() {
        let (status, body) =
            call(test_app(), send(Method::POST, "/api/sendOtp", Some(json!({})))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Mobile number required");
    }
}
