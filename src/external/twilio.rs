use async_trait::async_trait;
use reqwest::Client;

use crate::config::TwilioConfig;
use crate::error::{AppError, AppResult};
use crate::external::notifier::{Notification, Notifier};

#[derive(Clone)]
pub struct TwilioService {
    client: Client,
    config: TwilioConfig,
}

impl TwilioService {
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub async fn send_sms(&self, phone: &str, body: &str) -> AppResult<()> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.config.account_sid
        );

        let params = [
            ("To", phone),
            ("From", self.config.from_phone.as_str()),
            ("Body", body),
        ];

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await?;

        if response.status().is_success() {
            log::info!("Verification SMS sent successfully: {phone}");
            Ok(())
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(AppError::ExternalApiError(format!(
                "SMS sending failed: {error_text}"
            )))
        }
    }
}

#[async_trait]
impl Notifier for TwilioService {
    async fn send(&self, notification: &Notification) -> AppResult<()> {
        self.send_sms(&notification.destination, &notification.body)
            .await
    }
}
