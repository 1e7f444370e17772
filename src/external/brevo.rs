use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::config::EmailConfig;
use crate::error::{AppError, AppResult};
use crate::external::notifier::{Notification, Notifier};

const BREVO_SEND_URL: &str = "https://api.brevo.com/v3/smtp/email";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoEmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoSendEmailBody {
    sender: BrevoEmailAddress,
    to: Vec<BrevoEmailAddress>,
    subject: String,
    text_content: String,
}

/// Transactional email over the Brevo HTTP API.
#[derive(Clone)]
pub struct BrevoEmailService {
    client: Client,
    config: EmailConfig,
}

impl BrevoEmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn build_body(&self, to_email: &str, subject: &str, text: &str) -> BrevoSendEmailBody {
        BrevoSendEmailBody {
            sender: BrevoEmailAddress {
                email: self.config.sender_email.clone(),
                name: self.config.sender_name.clone(),
            },
            to: vec![BrevoEmailAddress {
                email: to_email.to_string(),
                name: None,
            }],
            subject: subject.to_string(),
            text_content: text.to_string(),
        }
    }

    pub async fn send_email(&self, to_email: &str, subject: &str, text: &str) -> AppResult<()> {
        let body = self.build_body(to_email, subject, text);

        let response = self
            .client
            .post(BREVO_SEND_URL)
            .header("api-key", &self.config.api_key)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            log::info!("Verification email sent to: {to_email}");
            return Ok(());
        }

        let error_text = response.text().await.unwrap_or_default();
        Err(AppError::ExternalApiError(format!(
            "Email sending failed (status={status}): {error_text}"
        )))
    }
}

#[async_trait]
impl Notifier for BrevoEmailService {
    async fn send(&self, notification: &Notification) -> AppResult<()> {
        self.send_email(
            &notification.destination,
            &notification.subject,
            &notification.body,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let svc = BrevoEmailService::new(EmailConfig {
            api_key: "key".into(),
            sender_email: "noreply@cinema.test".into(),
            sender_name: None,
        });
        let body = svc.build_body("alice@x.com", "Email Verification Code", "hi");
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["sender"]["email"], "noreply@cinema.test");
        assert!(value["sender"].get("name").is_none());
        assert_eq!(value["to"][0]["email"], "alice@x.com");
        assert_eq!(value["textContent"], "hi");
    }
}
