//! Lead capture, assignment and follow-up
//!
//! Notification emails go out only after the database work committed,
//! on detached tasks; their failures are logged and never change the
//! response.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, patch, post};
use axum::Router;
use bson::DateTime;
use serde::Deserialize;

use leasehub_core::models::{LeadStatus, NewLead};
use leasehub_core::{Envelope, PageQuery};

use super::{created, id_param, ok, Created, Reply};
use crate::db::repos::{DbError, LeadRepo, UserRepo};
use crate::http::error::ApiError;
use crate::http::extractors::JsonBody;
use crate::http::server::AppState;
use crate::notify::{spawn_email, OutgoingEmail};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub lead_id: Option<String>,
    pub assigned_agent_id: Option<String>,
    pub requester_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadListQuery {
    pub requester_id: Option<String>,
    pub status: Option<String>,
    #[serde(flatten)]
    pub page: PageQuery,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub lead_id: Option<String>,
    pub requester_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusBody {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest {
    pub lead_id: Option<String>,
    pub message: Option<String>,
    pub sender_id: Option<String>,
}

fn new_lead_email(name: &str, property: &str) -> String {
    format!(
        "Hi {name},\n\nA new lead has been received for the property: {property}.\n\n\
         Please log in to the dashboard to view the details."
    )
}

fn assignment_email(name: &str, property: &str) -> String {
    format!(
        "Hi {name},\n\nYou have been assigned a new lead for the property: {property}.\n\n\
         Please log in to the dashboard to view the details."
    )
}

/// POST /postLeadData
async fn create(State(state): State<Arc<AppState>>, JsonBody(input): JsonBody<NewLead>) -> Created {
    let lead = input.into_lead(DateTime::now())?;
    let outcome = LeadRepo::new(&state.db).create(lead).await?;

    let contacts = UserRepo::new(&state.db).contacts(&outcome.recipients).await?;
    for contact in contacts.into_iter().filter(|c| !c.email.is_empty()) {
        spawn_email(
            state.mailer.clone(),
            OutgoingEmail {
                message: new_lead_email(&contact.full_name, &outcome.property_name),
                to_email: contact.email,
                to_name: contact.full_name,
                subject: "New Lead Received".into(),
            },
        );
    }

    let lead = bson::to_document(&outcome.lead).map_err(DbError::from)?;
    created(Envelope::ok("Lead created and notifications + emails sent.").document(lead))
}

/// PATCH /assignLead
async fn assign(State(state): State<Arc<AppState>>, JsonBody(req): JsonBody<AssignRequest>) -> Reply {
    const MISSING: &str = "leadId, assignedAgentId, and requesterId are required.";
    let lead_id = id_param(req.lead_id.as_deref(), MISSING, "Invalid leadId format")?;
    let agent_id = id_param(req.assigned_agent_id.as_deref(), MISSING, "Invalid assignedAgentId format")?;
    let requester_id = id_param(req.requester_id.as_deref(), MISSING, "Invalid requesterId format")?;

    let outcome = LeadRepo::new(&state.db)
        .assign(lead_id, agent_id, requester_id)
        .await?;

    if let Some(agent) = UserRepo::new(&state.db).contact(outcome.agent_id).await? {
        if !agent.email.is_empty() {
            spawn_email(
                state.mailer.clone(),
                OutgoingEmail {
                    message: assignment_email(&agent.full_name, &outcome.property_name),
                    to_email: agent.email,
                    to_name: agent.full_name,
                    subject: "New Lead Assignment".into(),
                },
            );
        }
    }

    ok(Envelope::ok("Lead assigned successfully. Notification + email sent.").document(outcome.lead))
}

/// GET /getLeadsDataWithRequesterId
async fn list(State(state): State<Arc<AppState>>, Query(q): Query<LeadListQuery>) -> Reply {
    let requester_id = id_param(q.requester_id.as_deref(), "Invalid requesterId", "Invalid requesterId")?;
    let status = match q.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(raw.parse::<LeadStatus>()?),
        None => None,
    };
    let page = q.page.with_default_size(10);
    let result = LeadRepo::new(&state.db).list_for(requester_id, status, page).await?;
    ok(Envelope::ok("Leads fetched successfully").paginated(result))
}

/// PATCH /patchLeadStatus?leadId&requesterId
async fn update_status(
    State(state): State<Arc<AppState>>,
    Query(q): Query<StatusQuery>,
    JsonBody(body): JsonBody<StatusBody>,
) -> Reply {
    const MISSING: &str = "leadId and status are required";
    let raw_status = body
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request(MISSING))?;
    let lead_id = id_param(q.lead_id.as_deref(), MISSING, "Invalid leadId format")?;
    let requester_id = id_param(q.requester_id.as_deref(), "requesterId is required", "Invalid requesterId")?;
    let status: LeadStatus = raw_status.parse()?;

    let lead = LeadRepo::new(&state.db).set_status(lead_id, requester_id, status).await?;
    tracing::info!(lead_id = %lead_id, status = %status, "lead status changed");
    ok(Envelope::ok("Lead status updated successfully").document(lead))
}

/// POST /replyToVisitor
async fn reply(State(state): State<Arc<AppState>>, JsonBody(req): JsonBody<ReplyRequest>) -> Created {
    const MISSING: &str = "leadId, message, and senderId are required.";
    let message = req
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::bad_request(MISSING))?;
    let lead_id = id_param(req.lead_id.as_deref(), MISSING, "Invalid leadId format")?;
    let sender_id = id_param(req.sender_id.as_deref(), MISSING, "Invalid senderId format")?;

    let notification = LeadRepo::new(&state.db).reply(lead_id, sender_id, message).await?;
    let data = bson::to_document(&notification).map_err(DbError::from)?;
    created(Envelope::ok("Reply sent successfully.").document(data))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/postLeadData", post(create))
        .route("/assignLead", patch(assign))
        .route("/getLeadsDataWithRequesterId", get(list))
        .route("/patchLeadStatus", patch(update_status))
        .route("/replyToVisitor", post(reply))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_support::{call, send, test_app};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    const ID: &str = "64b7f0c2a1b2c3d4e5f60718";

    #[test]
    fn email_bodies_name_the_property() {
        let body = new_lead_email("Meera", "Tower A");
        assert!(body.starts_with("Hi Meera,"));
        assert!(body.contains("the property: Tower A."));
        assert!(assignment_email("Meera", "Tower A").contains("assigned a new lead"));
    }

    #[tokio::test]
    async fn create_requires_ids() {
        let (status, body) = call(
            test_app(),
            send(Method::POST, "/api/postLeadData", Some(json!({ "propertyId": ID }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn assign_requires_all_ids() {
        let (status, body) = call(
            test_app(),
            send(Method::PATCH, "/api/assignLead", Some(json!({ "leadId": ID }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "leadId, assignedAgentId, and requesterId are required.");
    }

    #[tokio::test]
    async fn listing_rejects_unknown_status() {
        let uri = format!("/api/getLeadsDataWithRequesterId?requesterId={ID}&status=lost");
        let (status, body) = call(test_app(), send(Method::GET, &uri, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "invalid status value: 'lost'");
    }

    #[tokio::test]
    async fn status_patch_needs_status() {
        let uri = format!("/api/patchLeadStatus?leadId={ID}&requesterId={ID}");
        let (status, body) = call(test_app(), send(Method::PATCH, &uri, Some(json!({})))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "leadId and status are required");
    }

    #[tokio::test]
    async fn reply_requires_message() {
        let (status, body) = call(
            test_app(),
            send(
                Method::POST,
                "/api/replyToVisitor",
                Some(json!({ "leadId": ID, "senderId": ID, "message": "  " })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "leadId, message, and senderId are required.");
    }
}
