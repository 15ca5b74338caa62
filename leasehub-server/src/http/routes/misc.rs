//! Sequences, reporting and direct email

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use leasehub_core::validation::is_valid_email;
use leasehub_core::Envelope;

use super::{ok, Reply};
use crate::db::repos::{AnalyticsRepo, CounterRepo};
use crate::http::error::ApiError;
use crate::http::extractors::JsonBody;
use crate::http::server::AppState;
use crate::notify::OutgoingEmail;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceQuery {
    pub sequence_name: Option<String>,
}

/// Body of `/send-email`; field names match the mail template params.
#[derive(Debug, Default, Deserialize)]
pub struct SendEmailRequest {
    pub to_email: Option<String>,
    pub to_name: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

impl SendEmailRequest {
    fn into_email(self) -> Result<OutgoingEmail, ApiError> {
        let to_email = self
            .to_email
            .map(|e| e.trim().to_owned())
            .filter(|e| is_valid_email(e))
            .ok_or_else(|| ApiError::bad_request("A valid to_email is required."))?;
        let subject = self.subject.unwrap_or_default();
        let message = self.message.unwrap_or_default();
        if subject.trim().is_empty() || message.trim().is_empty() {
            return Err(ApiError::bad_request("subject and message are required."));
        }
        Ok(OutgoingEmail {
            to_name: self.to_name.unwrap_or_default(),
            to_email,
            subject,
            message,
        })
    }
}

/// GET /getNextSequence?sequenceName
async fn next_sequence(State(state): State<Arc<AppState>>, Query(q): Query<SequenceQuery>) -> Reply {
    let name = q
        .sequence_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::bad_request("sequenceName is required."))?;
    let value = CounterRepo::new(&state.db).next_value(name).await?;
    ok(Envelope::ok("Sequence value generated").with("sequenceValue", value))
}

/// GET /analytics/lead-summary
async fn lead_summary(State(state): State<Arc<AppState>>) -> Reply {
    let summary = AnalyticsRepo::new(&state.db).lead_summary().await?;
    let data = serde_json::to_value(summary).map_err(|e| ApiError::Internal {
        message: format!("lead summary serialization failed: {e}"),
    })?;
    ok(Envelope::ok("Lead summary fetched successfully").data(data))
}

/// POST /send-email - synchronous, reports provider failures
async fn send_email(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<SendEmailRequest>,
) -> Reply {
    let email = req.into_email()?;
    state.mailer.send(&email).await?;
    ok(Envelope::ok("Email sent successfully."))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/getNextSequence", get(next_sequence))
        .route("/analytics/lead-summary", get(lead_summary))
        .route("/send-email", post(send_email))
}
