//! Runtime configuration loaded from the environment
//!
//! - `MONGODB_URI` (required)
//! - `MONGODB_DB` (default `leasehub`)
//! - `API_AUTH_KEY` (required): shared secret expected in `x-api-key`
//! - `EMAILJS_SERVICE_ID`, `EMAILJS_TEMPLATE_ID`, `EMAILJS_PUBLIC_KEY`,
//!   `EMAILJS_PRIVATE_KEY`: outbound email; all four or none
//! - `FAST2SMS_API_KEY`: outbound SMS
//!
//! Without provider keys, mail and SMS are logged instead of sent.

use thiserror::Error;

pub const DEFAULT_DATABASE: &str = "leasehub";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
}

/// EmailJS REST credentials
#[derive(Debug, Clone, PartialEq)]
pub struct EmailJsConfig {
    pub service_id: String,
    pub template_id: String,
    pub public_key: String,
    pub private_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub mongodb_uri: String,
    pub database: String,
    pub api_key: String,
    pub emailjs: Option<EmailJsConfig>,
    pub fast2sms_key: Option<String>,
}

impl AppConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup (used by tests and the
    /// CLI, which layers flags over the environment).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let emailjs = match (
            get("EMAILJS_SERVICE_ID"),
            get("EMAILJS_TEMPLATE_ID"),
            get("EMAILJS_PUBLIC_KEY"),
            get("EMAILJS_PRIVATE_KEY"),
        ) {
            (Some(service_id), Some(template_id), Some(public_key), Some(private_key)) => {
                Some(EmailJsConfig {
                    service_id,
                    template_id,
                    public_key,
                    private_key,
                })
            }
            _ => None,
        };

        Ok(Self {
            mongodb_uri: get("MONGODB_URI").ok_or(ConfigError::Missing("MONGODB_URI"))?,
            database: get("MONGODB_DB").unwrap_or_else(|| DEFAULT_DATABASE.to_owned()),
            api_key: get("API_AUTH_KEY").ok_or(ConfigError::Missing("API_AUTH_KEY"))?,
            emailjs,
            fast2sms_key: get("FAST2SMS_API_KEY"),
        })
    }

    /// Minimal config for tests
    pub fn for_tests(api_key: &str) -> Self {
        Self {
            mongodb_uri: "mongodb://localhost:27017".to_owned(),
            database: DEFAULT_DATABASE.to_owned(),
            api_key: api_key.to_owned(),
            emailjs: None,
            fast2sms_key: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn required_keys() {
        let err = AppConfig::from_lookup(lookup(&[("API_AUTH_KEY", "k")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("MONGODB_URI"));

        let err = AppConfig::from_lookup(lookup(&[("MONGODB_URI", "mongodb://db")])).unwrap_err();
        assert_eq!(err.to_string(), "API_AUTH_KEY must be set");
    }

    #[test]
    fn defaults_and_partial_providers() {
        let config = AppConfig::from_lookup(lookup(&[
            ("MONGODB_URI", "mongodb://db"),
            ("API_AUTH_KEY", "k"),
            ("EMAILJS_SERVICE_ID", "svc"),
            ("FAST2SMS_API_KEY", "  "),
        ]))
        .unwrap();
        assert_eq!(config.database, "leasehub");
        assert!(config.emailjs.is_none());
        assert!(config.fast2sms_key.is_none());
    }

    #[test]
    fn full_emailjs() {
        let config = AppConfig::from_lookup(lookup(&[
            ("MONGODB_URI", "mongodb://db"),
            ("MONGODB_DB", "leasing"),
            ("API_AUTH_KEY", "k"),
            ("EMAILJS_SERVICE_ID", "svc"),
            ("EMAILJS_TEMPLATE_ID", "tpl"),
            ("EMAILJS_PUBLIC_KEY", "pub"),
            ("EMAILJS_PRIVATE_KEY", "priv"),
        ]))
        .unwrap();
        assert_eq!(config.database, "leasing");
        assert_eq!(config.emailjs.unwrap().template_id, "tpl");
    }
}
