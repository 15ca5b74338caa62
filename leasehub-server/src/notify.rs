//! Outbound email and SMS
//!
//! Providers sit behind the [`Mailer`] and [`SmsSender`] traits so the
//! HTTP layer and tests can swap in the log-only implementations.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::config::{AppConfig, EmailJsConfig};

const EMAILJS_ENDPOINT: &str = "https://api.emailjs.com/api/v1.0/email/send";
const FAST2SMS_ENDPOINT: &str = "https://www.fast2sms.com/dev/bulkV2";

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// One email, in the shape the template expects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub message: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), NotifyError>;
}

#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Deliver a one-time password to `mobile`.
    async fn send_otp(&self, mobile: &str, code: &str) -> Result<(), NotifyError>;
}

/// EmailJS REST API
pub struct EmailJsMailer {
    client: reqwest::Client,
    config: EmailJsConfig,
}

impl EmailJsMailer {
    pub fn new(client: reqwest::Client, config: EmailJsConfig) -> Self {
        Self { client, config }
    }

    fn payload(&self, email: &OutgoingEmail) -> serde_json::Value {
        json!({
            "service_id": self.config.service_id,
            "template_id": self.config.template_id,
            "user_id": self.config.public_key,
            "accessToken": self.config.private_key,
            "template_params": email,
        })
    }
}

#[async_trait]
impl Mailer for EmailJsMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(EMAILJS_ENDPOINT)
            .json(&self.payload(email))
            .send()
            .await?;
        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::Rejected { status, body })
    }
}

/// Fast2SMS OTP route
pub struct Fast2SmsSender {
    client: reqwest::Client,
    api_key: String,
}

impl Fast2SmsSender {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl SmsSender for Fast2SmsSender {
    async fn send_otp(&self, mobile: &str, code: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .get(FAST2SMS_ENDPOINT)
            .query(&[
                ("authorization", self.api_key.as_str()),
                ("route", "otp"),
                ("variables_values", code),
                ("numbers", mobile),
            ])
            .send()
            .await?;
        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::Rejected { status, body })
    }
}

/// Logs instead of sending; used when no provider is configured.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), NotifyError> {
        info!(to = %email.to_email, subject = %email.subject, "email not sent: no provider configured");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct LogSms;

#[async_trait]
impl SmsSender for LogSms {
    async fn send_otp(&self, mobile: &str, _code: &str) -> Result<(), NotifyError> {
        info!(mobile, "sms not sent: no provider configured");
        Ok(())
    }
}

/// Pick providers from configuration, falling back to logging.
pub fn from_config(config: &AppConfig) -> (Arc<dyn Mailer>, Arc<dyn SmsSender>) {
    let client = reqwest::Client::new();
    let mailer: Arc<dyn Mailer> = match &config.emailjs {
        Some(emailjs) => Arc::new(EmailJsMailer::new(client.clone(), emailjs.clone())),
        None => Arc::new(LogMailer),
    };
    let sms: Arc<dyn SmsSender> = match &config.fast2sms_key {
        Some(key) => Arc::new(Fast2SmsSender::new(client, key.clone())),
        None => Arc::new(LogSms),
    };
    (mailer, sms)
}

/// Send without waiting; failures are logged and otherwise ignored.
pub fn spawn_email(mailer: Arc<dyn Mailer>, email: OutgoingEmail) {
    tokio::spawn(async move {
        if let Err(err) = mailer.send(&email).await {
            error!(to = %email.to_email, subject = %email.subject, error = %err, "email dispatch failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emailjs_payload_shape() {
        let mailer = EmailJsMailer::new(
            reqwest::Client::new(),
            EmailJsConfig {
                service_id: "svc".into(),
                template_id: "tpl".into(),
                public_key: "pub".into(),
                private_key: "priv".into(),
            },
        );
        let payload = mailer.payload(&OutgoingEmail {
            to_email: "asha@leasing.in".into(),
            to_name: "Asha".into(),
            subject: "New Lead Received".into(),
            message: "Hi Asha".into(),
        });
        assert_eq!(payload["user_id"], "pub");
        assert_eq!(payload["accessToken"], "priv");
        assert_eq!(payload["template_params"]["to_name"], "Asha");
    }

    #[tokio::test]
    async fn missing_providers_fall_back_to_logging() {
        let config = AppConfig::for_tests("k");
        let (mailer, sms) = from_config(&config);
        let email = OutgoingEmail {
            to_email: "a@b.co".into(),
            to_name: "A".into(),
            subject: "s".into(),
            message: "m".into(),
        };
        assert!(mailer.send(&email).await.is_ok());
        assert!(sms.send_otp("9000000001", "123456").await.is_ok());
    }
}
