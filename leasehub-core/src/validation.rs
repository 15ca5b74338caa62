//! Validation error types and shared input checks

use std::fmt;

use bson::oid::ObjectId;
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum number of images stored on a property.
pub const MAX_IMAGES: usize = 6;

/// Loose email shape accepted by the OTP and signup flows.
pub static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\S+@\S+\.\S+").expect("invalid email regex"));

/// Image URLs must be absolute http(s) links without whitespace.
pub static IMAGE_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://\S+$").expect("invalid image url regex"));

/// Validation error for request input and domain documents
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Field is missing or empty when it shouldn't be
    Empty { field: &'static str },

    /// Field exceeds maximum length
    TooLong { field: &'static str, max: usize },

    /// String doesn't match required format
    InvalidFormat { field: &'static str, reason: &'static str },

    /// Invalid enum variant
    InvalidVariant { field: &'static str, value: String },

    /// Not a 24-hex ObjectId
    InvalidObjectId { field: &'static str },

    /// A rule with its own client-facing wording
    Message(String),
}

impl ValidationError {
    pub fn message(msg: impl Into<String>) -> Self {
        Self::Message(msg.into())
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{} is required", field),
            Self::TooLong { field, max } => {
                write!(f, "{} exceeds maximum length of {} characters", field, max)
            }
            Self::InvalidFormat { field, reason } => {
                write!(f, "{}: {}", field, reason)
            }
            Self::InvalidVariant { field, value } => {
                write!(f, "invalid {} value: '{}'", field, value)
            }
            Self::InvalidObjectId { field } => write!(f, "Invalid {} format", field),
            Self::Message(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Parse a hex ObjectId supplied by a client.
pub fn parse_object_id(field: &'static str, raw: &str) -> Result<ObjectId, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    ObjectId::parse_str(raw).map_err(|_| ValidationError::InvalidObjectId { field })
}

/// Same as [`parse_object_id`] for optional query/body values.
pub fn require_object_id(
    field: &'static str,
    raw: Option<&str>,
) -> Result<ObjectId, ValidationError> {
    parse_object_id(field, raw.unwrap_or_default())
}

/// Trim a required string, rejecting blanks.
pub fn require_non_empty<'a>(
    field: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str, ValidationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::Empty { field }),
    }
}

/// Emails are stored trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

/// Enforce the image count and URL rules.
pub fn validate_images(images: &[String]) -> Result<(), ValidationError> {
    if images.len() > MAX_IMAGES {
        return Err(ValidationError::message("Maximum 6 images allowed"));
    }
    if !images.iter().all(|url| IMAGE_URL_RE.is_match(url)) {
        return Err(ValidationError::message("All images must be valid URLs"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ValidationError::TooLong {
            field: "title",
            max: 256,
        };
        assert_eq!(
            err.to_string(),
            "title exceeds maximum length of 256 characters"
        );
        assert_eq!(
            ValidationError::message("Invalid OTP").to_string(),
            "Invalid OTP"
        );
    }

    #[test]
    fn object_ids() {
        assert!(parse_object_id("leadId", "64b7f0c2a1b2c3d4e5f60718").is_ok());
        assert_eq!(
            parse_object_id("leadId", "nope"),
            Err(ValidationError::InvalidObjectId { field: "leadId" })
        );
        assert_eq!(
            require_object_id("leadId", None),
            Err(ValidationError::Empty { field: "leadId" })
        );
    }

    #[test]
    fn images_limit_and_shape() {
        let ok: Vec<String> = (0..6).map(|i| format!("https://cdn.example/{i}.jpg")).collect();
        assert!(validate_images(&ok).is_ok());

        let mut too_many = ok.clone();
        too_many.push("https://cdn.example/7.jpg".into());
        assert!(validate_images(&too_many).is_err());

        let bad = vec!["ftp://cdn.example/a.jpg".to_string()];
        assert!(validate_images(&bad).is_err());
    }

    #[test]
    fn emails() {
        assert!(is_valid_email("ana@leasing.in"));
        assert!(!is_valid_email("ana.leasing.in"));
        assert_eq!(normalize_email("  Ana@Leasing.IN "), "ana@leasing.in");
    }

    #[test]
    fn non_empty() {
        assert_eq!(require_non_empty("fullName", Some("  Ana ")), Ok("Ana"));
        assert!(require_non_empty("fullName", Some("   ")).is_err());
        assert!(require_non_empty("fullName", None).is_err());
    }
}
