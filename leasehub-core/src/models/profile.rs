//! Staff profiles: role assignment and reporting line

use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::validation::{parse_object_id, require_object_id, ValidationError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PastCompany {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

/// One profile per user, enforced by a unique index on `userId`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub role_id: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<ObjectId>,
    #[serde(default)]
    pub past_company: PastCompany,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub completed_leads_count: i64,
    /// City a manager is responsible for; used to route new-lead notices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_location: Option<String>,
    #[serde(default = "DateTime::now")]
    pub created_at: DateTime,
    #[serde(default = "DateTime::now")]
    pub updated_at: DateTime,
}

impl UserProfile {
    pub const COLLECTION: &'static str = "userprofiles";
}

/// Profile creation payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProfile {
    pub user_id: Option<String>,
    pub role_id: Option<String>,
    pub manager_id: Option<String>,
    pub past_company: Option<PastCompany>,
    pub rating: Option<f64>,
    pub managed_location: Option<String>,
}

impl NewProfile {
    /// Validate ids and rating. Whether a manager is required depends on
    /// the role, which the caller resolves and passes as `is_handler`.
    pub fn into_profile(self, is_handler: bool, now: DateTime) -> Result<UserProfile, ValidationError> {
        let user_id = require_object_id("userId", self.user_id.as_deref())
            .map_err(|_| ValidationError::message("Valid userId (ObjectId) is required"))?;
        let role_id = require_object_id("roleId", self.role_id.as_deref())
            .map_err(|_| ValidationError::message("Valid roleId (ObjectId) is required"))?;

        let manager_id = match self.manager_id.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(parse_object_id("managerId", raw)?),
            _ => None,
        };
        if is_handler && manager_id.is_none() {
            return Err(ValidationError::message(
                "A valid managerId is required for users with the 'handler' role.",
            ));
        }

        let rating = self.rating.unwrap_or(0.0);
        if !(0.0..=5.0).contains(&rating) {
            return Err(ValidationError::message("rating must be between 0 and 5"));
        }

        Ok(UserProfile {
            id: None,
            user_id,
            role_id,
            manager_id,
            past_company: self.past_company.unwrap_or_default(),
            rating,
            completed_leads_count: 0,
            managed_location: self.managed_location.filter(|l| !l.trim().is_empty()),
            created_at: now,
            updated_at: now,
        })
    }
}
