//! Staff accounts

use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::validation::{is_valid_email, normalize_email, require_non_empty, ValidationError};

/// Minimum accepted password length
const MIN_PASSWORD_LEN: usize = 3;

/// Stored user document. `password` holds an argon2 PHC string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub full_name: String,
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_terminated: bool,
    #[serde(default = "DateTime::now")]
    pub created_at: DateTime,
    #[serde(default = "DateTime::now")]
    pub updated_at: DateTime,
}

impl User {
    pub const COLLECTION: &'static str = "users";
}

fn default_true() -> bool {
    true
}

/// Signup payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub mobile: Option<String>,
    pub profile_image: Option<String>,
}

/// Signup payload after validation; the password is still plain text.
#[derive(Debug, Clone)]
pub struct ValidNewUser {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub mobile: Option<String>,
    pub profile_image: Option<String>,
}

impl NewUser {
    pub fn validate(self) -> Result<ValidNewUser, ValidationError> {
        let full_name = require_non_empty("fullName", self.full_name.as_deref())?.to_owned();
        let email = require_non_empty("email", self.email.as_deref())?;
        if !is_valid_email(email) {
            return Err(ValidationError::InvalidFormat {
                field: "email",
                reason: "must be a valid email address",
            });
        }
        let password = self.password.unwrap_or_default();
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::message(
                "Password must be at least 3 characters long",
            ));
        }
        Ok(ValidNewUser {
            full_name,
            email: normalize_email(email),
            password,
            mobile: self.mobile.map(|m| m.trim().to_owned()).filter(|m| !m.is_empty()),
            profile_image: self.profile_image,
        })
    }
}

impl ValidNewUser {
    pub fn into_user(self, password_hash: String, now: DateTime) -> User {
        User {
            id: None,
            full_name: self.full_name,
            email: self.email,
            password: password_hash,
            mobile: self.mobile,
            profile_image: self.profile_image,
            is_active: true,
            is_terminated: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup() -> NewUser {
        NewUser {
            full_name: Some("Ravi Kumar".into()),
            email: Some(" Ravi@Leasing.in".into()),
            password: Some("secret".into()),
            mobile: Some(" 9876543210 ".into()),
            profile_image: None,
        }
    }

    #[test]
    fn normalizes_email_and_mobile() {
        let valid = signup().validate().unwrap();
        assert_eq!(valid.email, "ravi@leasing.in");
        assert_eq!(valid.mobile.as_deref(), Some("9876543210"));
    }

    #[test]
    fn rejects_short_password() {
        let err = NewUser {
            password: Some("ab".into()),
            ..signup()
        }
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("at least 3"));
    }

    #[test]
    fn requires_name_and_email() {
        assert!(NewUser {
            full_name: None,
            ..signup()
        }
        .validate()
        .is_err());
        assert!(NewUser {
            email: Some("not-an-email".into()),
            ..signup()
        }
        .validate()
        .is_err());
    }
}
