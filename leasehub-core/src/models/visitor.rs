//! Visitors (end customers) and their one-time passwords

use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::validation::{is_valid_email, normalize_email, require_non_empty, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visitor {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default = "DateTime::now")]
    pub created_at: DateTime,
    #[serde(default = "DateTime::now")]
    pub updated_at: DateTime,
}

impl Visitor {
    pub const COLLECTION: &'static str = "visitusers";

    /// Name used in notification and email text.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("Valued Visitor")
    }
}

/// Visitor creation payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVisitor {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub city: Option<String>,
    #[serde(default)]
    pub verified: bool,
}

impl NewVisitor {
    pub fn into_visitor(self, now: DateTime) -> Result<Visitor, ValidationError> {
        let email = require_non_empty("email", self.email.as_deref())?;
        if !is_valid_email(email) {
            return Err(ValidationError::message("A valid email address is required."));
        }
        Ok(Visitor {
            id: None,
            full_name: clean(self.full_name),
            email: normalize_email(email),
            mobile: clean(self.mobile),
            city: clean(self.city),
            verified: self.verified,
            created_at: now,
            updated_at: now,
        })
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Pending one-time password, keyed by email or by mobile number.
///
/// A TTL index on `createdAt` removes records after five minutes; the
/// expiry is also checked on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Otp {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    pub otp: String,
    pub created_at: DateTime,
}

impl Otp {
    pub const COLLECTION: &'static str = "otps";
}

/// Body of the email OTP verification request. Registration fields are
/// only needed when the email has no visitor yet.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailOtp {
    pub email: Option<String>,
    pub otp: Option<String>,
    pub full_name: Option<String>,
    pub mobile: Option<String>,
    pub city: Option<String>,
}

/// Registration details extracted from [`VerifyEmailOtp`].
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub full_name: String,
    pub mobile: String,
    pub city: Option<String>,
}

impl VerifyEmailOtp {
    pub fn registration(&self) -> Result<Registration, ValidationError> {
        match (clean(self.full_name.clone()), clean(self.mobile.clone())) {
            (Some(full_name), Some(mobile)) => Ok(Registration {
                full_name,
                mobile,
                city: clean(self.city.clone()),
            }),
            _ => Err(ValidationError::message(
                "Full name and mobile number are required for new visitor registration.",
            )),
        }
    }

    pub fn into_visitor(email: String, registration: Registration, now: DateTime) -> Visitor {
        Visitor {
            id: None,
            full_name: Some(registration.full_name),
            email,
            mobile: Some(registration.mobile),
            city: registration.city,
            verified: true,
            created_at: now,
            updated_at: now,
        }
    }
}
