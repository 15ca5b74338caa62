//! Leads and the notifications they generate

use std::fmt;
use std::str::FromStr;

use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::validation::{require_object_id, ValidationError};

/// Placeholder when a lead's property cannot be resolved
pub const UNSPECIFIED_PROPERTY: &str = "an unspecified property";

/// Lead lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    #[default]
    New,
    Hold,
    Converted,
    Rejected,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 4] = [Self::New, Self::Hold, Self::Converted, Self::Rejected];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Hold => "hold",
            Self::Converted => "converted",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| ValidationError::InvalidVariant {
                field: "status",
                value: s.to_owned(),
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub property_id: ObjectId,
    pub visitor_id: ObjectId,
    pub assigned_agent_id: ObjectId,
    #[serde(default)]
    pub status: LeadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default = "DateTime::now")]
    pub created_at: DateTime,
    #[serde(default = "DateTime::now")]
    pub updated_at: DateTime,
}

impl Lead {
    pub const COLLECTION: &'static str = "leads";
}

/// Lead creation payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLead {
    pub property_id: Option<String>,
    pub visitor_id: Option<String>,
    pub assigned_agent_id: Option<String>,
    pub message: Option<String>,
}

impl NewLead {
    pub fn into_lead(self, now: DateTime) -> Result<Lead, ValidationError> {
        Ok(Lead {
            id: None,
            property_id: require_object_id("propertyId", self.property_id.as_deref())?,
            visitor_id: require_object_id("visitorId", self.visitor_id.as_deref())?,
            assigned_agent_id: require_object_id(
                "assignedAgentId",
                self.assigned_agent_id.as_deref(),
            )?,
            status: LeadStatus::New,
            message: self.message.filter(|m| !m.trim().is_empty()),
            created_at: now,
            updated_at: now,
        })
    }
}

/// What caused a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Lead,
    Assignment,
    Reply,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<ObjectId>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<NotificationKind>,
    #[serde(default = "DateTime::now")]
    pub created_at: DateTime,
    #[serde(default = "DateTime::now")]
    pub updated_at: DateTime,
}

impl Notification {
    pub const COLLECTION: &'static str = "notifications";

    pub fn unread(
        user_id: ObjectId,
        message: String,
        lead_id: Option<ObjectId>,
        kind: NotificationKind,
        now: DateTime,
    ) -> Self {
        Self {
            id: None,
            user_id,
            message,
            is_read: false,
            lead_id,
            kind: Some(kind),
            created_at: now,
            updated_at: now,
        }
    }
}

pub fn new_lead_message(visitor_name: &str, visitor_email: &str, property: &str) -> String {
    format!(
        "A new lead from {} ({}) has been received for property: {}.",
        visitor_name, visitor_email, property
    )
}

pub fn assignment_message(property: &str, requester_name: &str) -> String {
    format!(
        "You have been assigned a new lead for property: {} by {}.",
        property, requester_name
    )
}

pub fn reply_message(sender_name: &str, message: &str) -> String {
    format!("You have a new message from {}: \"{}\"", sender_name, message)
}
